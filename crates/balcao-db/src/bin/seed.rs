//! # Seed Data Generator
//!
//! Populates the database with test products for development.
//!
//! ## Usage
//! ```bash
//! # Generate 500 products (default)
//! cargo run -p balcao-db --bin seed
//!
//! # Generate custom amount
//! cargo run -p balcao-db --bin seed -- --count 1000
//!
//! # Specify database path
//! cargo run -p balcao-db --bin seed -- --db ./data/balcao.db
//! ```
//!
//! ## Generated Products
//! Creates realistic small-market product data across categories:
//! - Bebidas (refrigerantes, sucos, água)
//! - Mercearia (arroz, feijão, massas, café)
//! - Limpeza (detergente, sabão, amaciante)
//! - Higiene (sabonete, creme dental, shampoo)
//! - Padaria (pães, bolos, biscoitos)
//!
//! Each product has a pseudo-random price (R$1.99 - R$9.99 plus size addon),
//! stock 0-100 and a low-stock threshold of 5.

use chrono::Utc;
use std::env;
use uuid::Uuid;

use balcao_core::Product;
use balcao_db::{Database, DbConfig};

/// Product categories with realistic Brazilian market names
const CATEGORIES: &[(&str, &[&str])] = &[
    (
        "BEB",
        &[
            "Coca-Cola",
            "Guaraná Antarctica",
            "Fanta Laranja",
            "Sprite",
            "Suco de Laranja",
            "Suco de Uva",
            "Água Mineral",
            "Água com Gás",
            "Chá Mate",
            "Energético",
            "Cerveja Pilsen",
            "Refrigerante de Limão",
        ],
    ),
    (
        "MER",
        &[
            "Arroz Branco 5kg",
            "Feijão Carioca 1kg",
            "Macarrão Espaguete",
            "Café Torrado 500g",
            "Açúcar Refinado 1kg",
            "Sal Refinado 1kg",
            "Óleo de Soja 900ml",
            "Farinha de Trigo 1kg",
            "Molho de Tomate",
            "Leite Integral 1L",
            "Achocolatado em Pó",
            "Aveia em Flocos",
        ],
    ),
    (
        "LMP",
        &[
            "Detergente Neutro",
            "Sabão em Pó 1kg",
            "Amaciante 2L",
            "Água Sanitária 1L",
            "Desinfetante",
            "Esponja de Aço",
            "Esponja Multiuso",
            "Papel Toalha",
            "Saco de Lixo 50L",
            "Limpa Vidros",
        ],
    ),
    (
        "HIG",
        &[
            "Sabonete",
            "Creme Dental",
            "Escova de Dente",
            "Shampoo 350ml",
            "Condicionador 350ml",
            "Papel Higiênico 4un",
            "Desodorante Aerosol",
            "Fio Dental",
            "Cotonetes",
            "Álcool em Gel",
        ],
    ),
    (
        "PAD",
        &[
            "Pão Francês kg",
            "Pão de Forma",
            "Pão de Queijo kg",
            "Bolo de Chocolate",
            "Biscoito Recheado",
            "Biscoito Água e Sal",
            "Rosquinha de Coco",
            "Torrada Integral",
        ],
    ),
];

/// Size/pack variants with price addons in centavos
const SIZES: &[(&str, i64)] = &[
    ("", 0),
    ("Pequeno", 0),
    ("Grande", 200),
    ("2L", 150),
    ("600ml", 50),
    ("Pack c/6", 400),
];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    // Parse command line arguments
    let args: Vec<String> = env::args().collect();

    let mut count: usize = 500;
    let mut db_path = String::from("./balcao_dev.db");

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--count" | "-c" => {
                if i + 1 < args.len() {
                    count = args[i + 1].parse().unwrap_or(500);
                    i += 1;
                }
            }
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Balcao POS Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -c, --count <N>    Number of products to generate (default: 500)");
                println!("  -d, --db <PATH>    Database file path (default: ./balcao_dev.db)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("🌱 Balcao POS Seed Data Generator");
    println!("=================================");
    println!("Database: {}", db_path);
    println!("Products: {}", count);
    println!();

    // Connect to database
    let config = DbConfig::new(&db_path);
    let db = Database::new(config).await?;

    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    // Check existing products
    let existing = db.products().count().await?;
    if existing > 0 {
        println!("⚠ Database already has {} products", existing);
        println!("  Skipping seed to avoid duplicates.");
        println!("  Delete the database file to regenerate.");
        return Ok(());
    }

    // Generate products
    println!();
    println!("Generating products...");

    let mut generated = 0;
    let start = std::time::Instant::now();

    for (category_idx, (category_code, products)) in CATEGORIES.iter().enumerate() {
        for (product_idx, product_name) in products.iter().enumerate() {
            for (size_idx, (size_name, price_addon)) in SIZES.iter().enumerate() {
                if generated >= count {
                    break;
                }

                let product = generate_product(
                    category_code,
                    product_name,
                    size_name,
                    *price_addon,
                    category_idx * 1000 + product_idx * 20 + size_idx,
                );

                if let Err(e) = db.products().insert(&product).await {
                    eprintln!("Failed to insert {}: {}", product.name, e);
                    continue;
                }

                generated += 1;

                if generated % 100 == 0 {
                    println!("  Generated {} products...", generated);
                }
            }

            if generated >= count {
                break;
            }
        }

        if generated >= count {
            break;
        }
    }

    let elapsed = start.elapsed();
    println!();
    println!("✓ Generated {} products in {:?}", generated, elapsed);

    let low = db.reports().low_stock_count().await?;
    println!("  {} products at or below the low-stock threshold", low);

    println!();
    println!("✓ Seed complete!");

    Ok(())
}

/// Generates a single product with realistic data.
fn generate_product(
    category: &str,
    name: &str,
    size: &str,
    price_addon: i64,
    seed: usize,
) -> Product {
    let now = Utc::now();

    // Barcode in EAN-13 shape (checksum not valid)
    let barcode = Some(format!("789{:010}", seed));

    // Price: base R$1.99-R$9.99 + size addon
    let base_price = 199 + ((seed * 17) % 800) as i64;
    let price_cents = base_price + price_addon;

    // Cost 60-80% of price
    let cost_pct = 60 + (seed % 20) as i64;
    let cost_cents = price_cents * cost_pct / 100;

    // Stock 0-100
    let stock_quantity = (seed % 101) as i64;

    let full_name = if size.is_empty() {
        name.to_string()
    } else {
        format!("{} {}", name, size)
    };

    Product {
        id: Uuid::new_v4().to_string(),
        company_id: None,
        name: full_name,
        description: None,
        barcode,
        brand: Some(format!("Marca {}", category)),
        price_cents,
        cost_cents,
        stock_quantity,
        min_stock_quantity: 5,
        unit: "un".to_string(),
        is_active: true,
        created_at: now,
        updated_at: now,
    }
}
