//! # Sale Engine
//!
//! The single authoritative operation that turns a cart into durable state.
//!
//! ## Commit Procedure
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     SaleEngine::commit                                  │
//! │                                                                         │
//! │  1. Validate (no I/O): non-empty lines, quantity bounds,               │
//! │     0 <= discount <= subtotal                                          │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  2. BEGIN TRANSACTION                                                  │
//! │     ├── INSERT sale header (status = finalized)                        │
//! │     │   └── retry with fresh sale_number on UNIQUE collision (≤ 3)     │
//! │     │       The first write acquires the database write lock, so       │
//! │     │       concurrent commits are serialized from here on.            │
//! │     │                                                                   │
//! │     ├── per line: guarded decrement                                    │
//! │     │   UPDATE products SET stock = stock - q                          │
//! │     │   WHERE id = ? AND is_active = 1 AND stock >= q                  │
//! │     │   └── 0 rows → NotFound / Inactive / InsufficientStock           │
//! │     │       (authoritative re-check; the cart snapshot is advisory)    │
//! │     │                                                                   │
//! │     ├── per line: INSERT sale_item (name/price snapshot)               │
//! │     └── per line: INSERT stock_movement (kind = sale, delta = -q,      │
//! │                   before/after read back post-decrement)               │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  3. COMMIT - or roll the WHOLE thing back on any failure.              │
//! │     No sale, no items, no stock change, no ledger rows remain.         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Two concurrent commits racing for the last unit of a product cannot both
//! succeed: the second one's guarded decrement observes the first one's
//! committed stock and affects zero rows.
//!
//! ## Cancellation
//! A finalized sale transitions to cancelled by appending compensating
//! movements (delta = +q per line) and restoring stock in one transaction.
//! The original sale, items and movements are never rewritten.

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use thiserror::Error;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::DbError;
use crate::repository::{movement, sale};
use balcao_core::validation::{validate_discount, validate_price_cents};
use balcao_core::{
    CartItem, MovementKind, PaymentMethod, Sale, SaleItem, SaleStatus, StockMovement,
    MAX_ITEM_QUANTITY, MAX_SALE_NUMBER_ATTEMPTS,
};

// =============================================================================
// Commit Error Taxonomy
// =============================================================================

/// Every way a commit or cancellation can fail.
///
/// All variants except `Storage` are detected before any durable write or
/// abort the transaction cleanly; a failed operation leaves zero new rows.
/// `Storage` failures are also all-or-nothing, so the caller may retry the
/// whole commit.
#[derive(Debug, Error)]
pub enum CommitError {
    /// Caller error: no cart lines. Rejected before any I/O.
    #[error("Cart is empty")]
    EmptyCart,

    /// Caller error: a line quantity is out of bounds.
    #[error("Invalid quantity {0}: must be between 1 and {MAX_ITEM_QUANTITY}")]
    InvalidQuantity(i64),

    /// Caller error: a line carries a negative unit price.
    #[error("Invalid unit price {0}: must be non-negative")]
    InvalidPrice(i64),

    /// Caller error: a stock adjustment with a zero delta has no effect
    /// and would only pollute the ledger.
    #[error("Stock adjustment delta must be non-zero")]
    ZeroAdjustment,

    /// Caller error: discount out of bounds.
    #[error("Invalid discount {discount_cents}: must be between 0 and subtotal {subtotal_cents}")]
    InvalidDiscount {
        discount_cents: i64,
        subtotal_cents: i64,
    },

    /// A line references a product that does not exist.
    #[error("Product not found: {0}")]
    ProductNotFound(String),

    /// A line references a soft-deactivated product.
    #[error("Product is inactive: {0}")]
    ProductInactive(String),

    /// The authoritative stock re-check failed. The caller should re-fetch
    /// current stock and prompt the user, not blindly retry with the same
    /// quantities.
    #[error("Insufficient stock for product {product_id}: available {available}, requested {requested}")]
    InsufficientStock {
        product_id: String,
        available: i64,
        requested: i64,
    },

    /// Sale number generation kept colliding; surfaced after bounded
    /// internal retries.
    #[error("Could not allocate a unique sale number after {attempts} attempts")]
    SaleNumberCollision { attempts: u32 },

    /// Cancellation target does not exist.
    #[error("Sale not found: {0}")]
    SaleNotFound(String),

    /// Cancellation target is not in a cancellable state.
    #[error("Sale {sale_id} is {status:?}, cannot cancel")]
    InvalidSaleStatus {
        sale_id: String,
        status: SaleStatus,
    },

    /// Storage/transport failure; the commit is all-or-nothing, so retrying
    /// the whole operation is safe.
    #[error(transparent)]
    Storage(#[from] DbError),
}

/// Result type for engine operations.
pub type CommitResult<T> = Result<T, CommitError>;

// =============================================================================
// Commit Request
// =============================================================================

/// One candidate line item, carried over from the cart.
///
/// The unit price is the cart's frozen price; stock is deliberately NOT
/// carried, because the engine re-reads it authoritatively.
#[derive(Debug, Clone)]
pub struct CommitLine {
    pub product_id: String,
    pub quantity: i64,
    pub unit_price_cents: i64,
}

impl CommitLine {
    fn subtotal_cents(&self) -> i64 {
        self.unit_price_cents * self.quantity
    }
}

impl From<&CartItem> for CommitLine {
    fn from(item: &CartItem) -> Self {
        CommitLine {
            product_id: item.product_id.clone(),
            quantity: item.quantity,
            unit_price_cents: item.unit_price_cents,
        }
    }
}

/// Everything the engine needs to commit a sale.
///
/// Seller and customer identities are explicit parameters; the engine never
/// reads ambient session state.
#[derive(Debug, Clone)]
pub struct CommitRequest {
    pub lines: Vec<CommitLine>,
    pub seller_id: String,
    pub customer_id: Option<String>,
    pub payment_method: PaymentMethod,
    /// Absolute discount in centavos; `0 <= discount <= subtotal`.
    pub discount_cents: i64,
    pub notes: Option<String>,
    pub company_id: Option<String>,
}

impl CommitRequest {
    /// Builds a request from a cart session.
    ///
    /// The cart itself stays untouched; the caller clears it only after a
    /// successful commit.
    pub fn from_cart(
        cart: &balcao_core::Cart,
        seller_id: impl Into<String>,
        payment_method: PaymentMethod,
        discount_cents: i64,
    ) -> Self {
        CommitRequest {
            lines: cart.items.iter().map(CommitLine::from).collect(),
            seller_id: seller_id.into(),
            customer_id: None,
            payment_method,
            discount_cents,
            notes: None,
            company_id: None,
        }
    }

    /// Sets the optional customer reference.
    pub fn customer(mut self, customer_id: impl Into<String>) -> Self {
        self.customer_id = Some(customer_id.into());
        self
    }

    /// Sets free-form notes.
    pub fn notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }
}

// =============================================================================
// Sale Engine
// =============================================================================

/// The authoritative writer for sales, stock and the ledger.
#[derive(Debug, Clone)]
pub struct SaleEngine {
    pool: SqlitePool,
}

impl SaleEngine {
    /// Creates a new SaleEngine on the shared pool.
    pub fn new(pool: SqlitePool) -> Self {
        SaleEngine { pool }
    }

    /// Atomically commits a sale.
    ///
    /// See the module docs for the full procedure. On success the returned
    /// [`Sale`] is durable; on any error nothing was written.
    pub async fn commit(&self, request: CommitRequest) -> CommitResult<Sale> {
        // ---- Step 1: pure validation, before any I/O --------------------
        if request.lines.is_empty() {
            return Err(CommitError::EmptyCart);
        }

        for line in &request.lines {
            if line.quantity < 1 || line.quantity > MAX_ITEM_QUANTITY {
                return Err(CommitError::InvalidQuantity(line.quantity));
            }
            if validate_price_cents(line.unit_price_cents).is_err() {
                return Err(CommitError::InvalidPrice(line.unit_price_cents));
            }
        }

        let subtotal_cents: i64 = request.lines.iter().map(|l| l.subtotal_cents()).sum();

        if validate_discount(request.discount_cents, subtotal_cents).is_err() {
            return Err(CommitError::InvalidDiscount {
                discount_cents: request.discount_cents,
                subtotal_cents,
            });
        }

        let total_cents = subtotal_cents - request.discount_cents;

        debug!(
            lines = request.lines.len(),
            subtotal = subtotal_cents,
            discount = request.discount_cents,
            "Committing sale"
        );

        // ---- Step 2: the single atomic transaction ----------------------
        let mut tx = self.pool.begin().await.map_err(DbError::from)?;

        let now = Utc::now();
        let mut sale = Sale {
            id: Uuid::new_v4().to_string(),
            sale_number: generate_sale_number(),
            seller_id: request.seller_id.clone(),
            customer_id: request.customer_id.clone(),
            subtotal_cents,
            discount_cents: request.discount_cents,
            total_cents,
            payment_method: request.payment_method,
            status: SaleStatus::Finalized,
            notes: request.notes.clone(),
            company_id: request.company_id.clone(),
            created_at: now,
            updated_at: now,
        };

        // Header first: acquires the write lock up front and enforces
        // sale_number uniqueness under it, with bounded regeneration.
        let mut attempts: u32 = 0;
        loop {
            match sale::insert_sale(&mut tx, &sale).await {
                Ok(()) => break,
                Err(e) if e.is_unique_violation_on("sale_number") => {
                    attempts += 1;
                    if attempts >= MAX_SALE_NUMBER_ATTEMPTS {
                        warn!(attempts, "Sale number generation exhausted");
                        return Err(CommitError::SaleNumberCollision { attempts });
                    }
                    sale.sale_number = generate_sale_number();
                }
                Err(e) => return Err(e.into()),
            }
        }

        for line in &request.lines {
            // Authoritative re-check: decrement only if enough stock remains.
            let (name, quantity_after) =
                decrement_stock(&mut tx, &line.product_id, line.quantity, now).await?;

            let item = SaleItem {
                id: Uuid::new_v4().to_string(),
                sale_id: sale.id.clone(),
                product_id: line.product_id.clone(),
                product_name: name,
                unit_price_cents: line.unit_price_cents,
                quantity: line.quantity,
                subtotal_cents: line.subtotal_cents(),
                created_at: now,
            };
            sale::insert_item(&mut tx, &item).await?;

            movement::append(
                &mut tx,
                &StockMovement {
                    id: Uuid::new_v4().to_string(),
                    product_id: line.product_id.clone(),
                    kind: MovementKind::Sale,
                    quantity_delta: -line.quantity,
                    quantity_before: quantity_after + line.quantity,
                    quantity_after,
                    reason: None,
                    sale_id: Some(sale.id.clone()),
                    actor_id: Some(request.seller_id.clone()),
                    created_at: now,
                },
            )
            .await?;
        }

        tx.commit().await.map_err(DbError::from)?;

        info!(
            sale_id = %sale.id,
            sale_number = %sale.sale_number,
            total = %sale.total(),
            items = request.lines.len(),
            "Sale committed"
        );

        Ok(sale)
    }

    /// Cancels a finalized sale, restoring stock through compensating
    /// movements.
    ///
    /// Append-only audit discipline: the original sale header flips status
    /// (and `updated_at`), but its line items and movements are untouched.
    pub async fn cancel(&self, sale_id: &str, actor_id: &str) -> CommitResult<Sale> {
        debug!(sale_id = %sale_id, "Cancelling sale");

        let mut tx = self.pool.begin().await.map_err(DbError::from)?;

        let now = Utc::now();

        // Guarded transition: only a finalized sale can be cancelled.
        let updated = sqlx::query(
            "UPDATE sales SET status = 'cancelled', updated_at = ?2 \
             WHERE id = ?1 AND status = 'finalized'",
        )
        .bind(sale_id)
        .bind(now)
        .execute(&mut *tx)
        .await
        .map_err(DbError::from)?;

        if updated.rows_affected() == 0 {
            return match sale::get_by_id_tx(&mut tx, sale_id).await? {
                None => Err(CommitError::SaleNotFound(sale_id.to_string())),
                Some(s) => Err(CommitError::InvalidSaleStatus {
                    sale_id: sale_id.to_string(),
                    status: s.status,
                }),
            };
        }

        let items = sale::get_items_tx(&mut tx, sale_id).await?;

        for item in &items {
            let restored = sqlx::query(
                "UPDATE products SET stock_quantity = stock_quantity + ?2, updated_at = ?3 \
                 WHERE id = ?1",
            )
            .bind(&item.product_id)
            .bind(item.quantity)
            .bind(now)
            .execute(&mut *tx)
            .await
            .map_err(DbError::from)?;

            if restored.rows_affected() == 0 {
                return Err(CommitError::ProductNotFound(item.product_id.clone()));
            }

            let quantity_after: i64 =
                sqlx::query_scalar("SELECT stock_quantity FROM products WHERE id = ?1")
                    .bind(&item.product_id)
                    .fetch_one(&mut *tx)
                    .await
                    .map_err(DbError::from)?;

            movement::append(
                &mut tx,
                &StockMovement {
                    id: Uuid::new_v4().to_string(),
                    product_id: item.product_id.clone(),
                    kind: MovementKind::SaleCancel,
                    quantity_delta: item.quantity,
                    quantity_before: quantity_after - item.quantity,
                    quantity_after,
                    reason: Some("sale cancelled".to_string()),
                    sale_id: Some(sale_id.to_string()),
                    actor_id: Some(actor_id.to_string()),
                    created_at: now,
                },
            )
            .await?;
        }

        let sale = sale::get_by_id_tx(&mut tx, sale_id)
            .await?
            .ok_or_else(|| CommitError::SaleNotFound(sale_id.to_string()))?;

        tx.commit().await.map_err(DbError::from)?;

        info!(sale_id = %sale_id, items = items.len(), "Sale cancelled, stock restored");

        Ok(sale)
    }

    /// Manually adjusts a product's stock with an audited ledger row.
    ///
    /// Used for receiving, shrinkage and recounts. Negative adjustments are
    /// guarded the same way sales are: stock never goes below zero.
    pub async fn adjust_stock(
        &self,
        product_id: &str,
        delta: i64,
        reason: impl Into<String>,
        actor_id: &str,
    ) -> CommitResult<StockMovement> {
        if delta == 0 {
            return Err(CommitError::ZeroAdjustment);
        }

        let mut tx = self.pool.begin().await.map_err(DbError::from)?;

        let now = Utc::now();

        let updated = sqlx::query(
            "UPDATE products SET stock_quantity = stock_quantity + ?2, updated_at = ?3 \
             WHERE id = ?1 AND stock_quantity + ?2 >= 0",
        )
        .bind(product_id)
        .bind(delta)
        .bind(now)
        .execute(&mut *tx)
        .await
        .map_err(DbError::from)?;

        if updated.rows_affected() == 0 {
            let current: Option<i64> =
                sqlx::query_scalar("SELECT stock_quantity FROM products WHERE id = ?1")
                    .bind(product_id)
                    .fetch_optional(&mut *tx)
                    .await
                    .map_err(DbError::from)?;

            return match current {
                None => Err(CommitError::ProductNotFound(product_id.to_string())),
                Some(available) => Err(CommitError::InsufficientStock {
                    product_id: product_id.to_string(),
                    available,
                    requested: -delta,
                }),
            };
        }

        let quantity_after: i64 =
            sqlx::query_scalar("SELECT stock_quantity FROM products WHERE id = ?1")
                .bind(product_id)
                .fetch_one(&mut *tx)
                .await
                .map_err(DbError::from)?;

        let movement = StockMovement {
            id: Uuid::new_v4().to_string(),
            product_id: product_id.to_string(),
            kind: MovementKind::Adjustment,
            quantity_delta: delta,
            quantity_before: quantity_after - delta,
            quantity_after,
            reason: Some(reason.into()),
            sale_id: None,
            actor_id: Some(actor_id.to_string()),
            created_at: now,
        };

        movement::append(&mut tx, &movement).await?;

        tx.commit().await.map_err(DbError::from)?;

        info!(
            product_id = %product_id,
            delta,
            stock = quantity_after,
            "Stock adjusted"
        );

        Ok(movement)
    }
}

// =============================================================================
// Internals
// =============================================================================

/// Guarded decrement: succeeds only against an active product with enough
/// stock, then returns the frozen name and the post-decrement quantity.
///
/// The zero-rows path does one extra read to tell the caller exactly why.
async fn decrement_stock(
    conn: &mut SqliteConnection,
    product_id: &str,
    quantity: i64,
    now: chrono::DateTime<Utc>,
) -> CommitResult<(String, i64)> {
    let updated = sqlx::query(
        "UPDATE products SET stock_quantity = stock_quantity - ?2, updated_at = ?3 \
         WHERE id = ?1 AND is_active = 1 AND stock_quantity >= ?2",
    )
    .bind(product_id)
    .bind(quantity)
    .bind(now)
    .execute(&mut *conn)
    .await
    .map_err(DbError::from)?;

    if updated.rows_affected() == 0 {
        let row: Option<(i64, bool)> = sqlx::query_as(
            "SELECT stock_quantity, is_active FROM products WHERE id = ?1",
        )
        .bind(product_id)
        .fetch_optional(&mut *conn)
        .await
        .map_err(DbError::from)?;

        return match row {
            None => Err(CommitError::ProductNotFound(product_id.to_string())),
            Some((_, false)) => Err(CommitError::ProductInactive(product_id.to_string())),
            Some((available, true)) => {
                warn!(
                    product_id = %product_id,
                    available,
                    requested = quantity,
                    "Authoritative stock re-check failed"
                );
                Err(CommitError::InsufficientStock {
                    product_id: product_id.to_string(),
                    available,
                    requested: quantity,
                })
            }
        };
    }

    let (name, quantity_after): (String, i64) =
        sqlx::query_as("SELECT name, stock_quantity FROM products WHERE id = ?1")
            .bind(product_id)
            .fetch_one(&mut *conn)
            .await
            .map_err(DbError::from)?;

    Ok((name, quantity_after))
}

/// Generates a sale number: `YYYYMMDD-XXXXXX` (date + random hex suffix).
///
/// Uniqueness is enforced by the `sales.sale_number` UNIQUE index; the
/// commit loop regenerates on collision.
fn generate_sale_number() -> String {
    let date_part = Utc::now().format("%Y%m%d");
    let suffix = Uuid::new_v4().simple().to_string()[..6].to_uppercase();
    format!("{}-{}", date_part, suffix)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use crate::repository::product::generate_product_id;
    use balcao_core::{Cart, Product};
    use chrono::Utc;

    async fn test_db() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    fn test_product(name: &str, price_cents: i64, stock: i64) -> Product {
        let now = Utc::now();
        Product {
            id: generate_product_id(),
            company_id: None,
            name: name.to_string(),
            description: None,
            barcode: None,
            brand: None,
            price_cents,
            cost_cents: price_cents / 2,
            stock_quantity: stock,
            min_stock_quantity: 2,
            unit: "un".to_string(),
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    fn line(product: &Product, quantity: i64) -> CommitLine {
        CommitLine {
            product_id: product.id.clone(),
            quantity,
            unit_price_cents: product.price_cents,
        }
    }

    fn request(lines: Vec<CommitLine>, discount_cents: i64) -> CommitRequest {
        CommitRequest {
            lines,
            seller_id: "seller-1".to_string(),
            customer_id: None,
            payment_method: PaymentMethod::Cash,
            discount_cents,
            notes: None,
            company_id: None,
        }
    }

    #[tokio::test]
    async fn test_commit_totals_and_durable_rows() {
        let db = test_db().await;
        let coffee = test_product("Café 500g", 1000, 10);
        let sugar = test_product("Açúcar 1kg", 500, 8);
        db.products().insert(&coffee).await.unwrap();
        db.products().insert(&sugar).await.unwrap();

        // 2 × R$10.00 + 1 × R$5.00, discount R$3.00
        let sale = db
            .engine()
            .commit(request(vec![line(&coffee, 2), line(&sugar, 1)], 300))
            .await
            .unwrap();

        assert_eq!(sale.subtotal_cents, 2500);
        assert_eq!(sale.discount_cents, 300);
        assert_eq!(sale.total_cents, 2200);
        assert_eq!(sale.status, SaleStatus::Finalized);

        // Durable and readable back
        let stored = db.sales().get_by_id(&sale.id).await.unwrap().unwrap();
        assert_eq!(stored.total_cents, 2200);

        let items = db.sales().get_items(&sale.id).await.unwrap();
        assert_eq!(items.len(), 2);
        let coffee_item = items.iter().find(|i| i.product_id == coffee.id).unwrap();
        assert_eq!(coffee_item.product_name, "Café 500g");
        assert_eq!(coffee_item.subtotal_cents, 2000);

        // Stock decremented, one ledger row per line
        assert_eq!(db.products().get_stock(&coffee.id).await.unwrap(), 8);
        assert_eq!(db.products().get_stock(&sugar.id).await.unwrap(), 7);

        let movements = db.movements().list_for_sale(&sale.id).await.unwrap();
        assert_eq!(movements.len(), 2);
        let coffee_move = movements.iter().find(|m| m.product_id == coffee.id).unwrap();
        assert_eq!(coffee_move.kind, MovementKind::Sale);
        assert_eq!(coffee_move.quantity_delta, -2);
        assert_eq!(coffee_move.quantity_before, 10);
        assert_eq!(coffee_move.quantity_after, 8);
    }

    #[tokio::test]
    async fn test_empty_cart_rejected_before_io() {
        let db = test_db().await;

        let err = db.engine().commit(request(vec![], 0)).await.unwrap_err();
        assert!(matches!(err, CommitError::EmptyCart));
        assert_eq!(db.sales().count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_invalid_discount_rejected() {
        let db = test_db().await;
        let product = test_product("Leite 1L", 600, 5);
        db.products().insert(&product).await.unwrap();

        // Discount exceeding subtotal
        let err = db
            .engine()
            .commit(request(vec![line(&product, 1)], 700))
            .await
            .unwrap_err();
        assert!(matches!(err, CommitError::InvalidDiscount { .. }));

        // Negative discount
        let err = db
            .engine()
            .commit(request(vec![line(&product, 1)], -1))
            .await
            .unwrap_err();
        assert!(matches!(err, CommitError::InvalidDiscount { .. }));

        // Discount equal to subtotal is a valid free sale
        let sale = db
            .engine()
            .commit(request(vec![line(&product, 1)], 600))
            .await
            .unwrap();
        assert_eq!(sale.total_cents, 0);
    }

    #[tokio::test]
    async fn test_insufficient_stock_rolls_back_everything() {
        let db = test_db().await;
        let plenty = test_product("Arroz 5kg", 2000, 50);
        let scarce = test_product("Azeite 500ml", 3000, 3);
        db.products().insert(&plenty).await.unwrap();
        db.products().insert(&scarce).await.unwrap();

        let sales_before = db.sales().count().await.unwrap();
        let items_before = db.sales().count_items().await.unwrap();
        let moves_before = db.movements().count().await.unwrap();

        // Second line requests 5 with only 3 available; first line already
        // decremented inside the transaction and must be rolled back too.
        let err = db
            .engine()
            .commit(request(vec![line(&plenty, 2), line(&scarce, 5)], 0))
            .await
            .unwrap_err();

        match err {
            CommitError::InsufficientStock {
                product_id,
                available,
                requested,
            } => {
                assert_eq!(product_id, scarce.id);
                assert_eq!(available, 3);
                assert_eq!(requested, 5);
            }
            other => panic!("expected InsufficientStock, got {other:?}"),
        }

        // Zero new rows of any kind, stock untouched
        assert_eq!(db.sales().count().await.unwrap(), sales_before);
        assert_eq!(db.sales().count_items().await.unwrap(), items_before);
        assert_eq!(db.movements().count().await.unwrap(), moves_before);
        assert_eq!(db.products().get_stock(&plenty.id).await.unwrap(), 50);
        assert_eq!(db.products().get_stock(&scarce.id).await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_inactive_and_missing_products_fail_commit() {
        let db = test_db().await;
        let product = test_product("Sabonete", 300, 10);
        db.products().insert(&product).await.unwrap();
        db.products().soft_delete(&product.id).await.unwrap();

        let err = db
            .engine()
            .commit(request(vec![line(&product, 1)], 0))
            .await
            .unwrap_err();
        assert!(matches!(err, CommitError::ProductInactive(id) if id == product.id));

        let ghost = CommitLine {
            product_id: "no-such-product".to_string(),
            quantity: 1,
            unit_price_cents: 100,
        };
        let err = db.engine().commit(request(vec![ghost], 0)).await.unwrap_err();
        assert!(matches!(err, CommitError::ProductNotFound(_)));
    }

    #[tokio::test]
    async fn test_stock_equals_initial_plus_delta_sum() {
        let db = test_db().await;
        let product = test_product("Detergente", 250, 20);
        db.products().insert(&product).await.unwrap();

        let engine = db.engine();
        let sale = engine.commit(request(vec![line(&product, 4)], 0)).await.unwrap();
        engine.commit(request(vec![line(&product, 3)], 0)).await.unwrap();
        engine
            .adjust_stock(&product.id, 10, "recebimento", "seller-1")
            .await
            .unwrap();
        engine.cancel(&sale.id, "seller-1").await.unwrap();

        // -4 -3 +10 +4 = +7
        let delta = db.movements().delta_sum(&product.id).await.unwrap();
        assert_eq!(delta, 7);
        assert_eq!(db.products().get_stock(&product.id).await.unwrap(), 20 + delta);
    }

    #[tokio::test]
    async fn test_cancel_restores_stock_with_compensating_movements() {
        let db = test_db().await;
        let product = test_product("Café 500g", 1890, 10);
        db.products().insert(&product).await.unwrap();

        let sale = db
            .engine()
            .commit(request(vec![line(&product, 4)], 0))
            .await
            .unwrap();
        assert_eq!(db.products().get_stock(&product.id).await.unwrap(), 6);

        let cancelled = db.engine().cancel(&sale.id, "manager-1").await.unwrap();
        assert_eq!(cancelled.status, SaleStatus::Cancelled);
        assert_eq!(db.products().get_stock(&product.id).await.unwrap(), 10);

        // Original movement untouched, compensating row appended
        let movements = db.movements().list_for_sale(&sale.id).await.unwrap();
        assert_eq!(movements.len(), 2);
        assert_eq!(movements[0].kind, MovementKind::Sale);
        assert_eq!(movements[0].quantity_delta, -4);
        assert_eq!(movements[1].kind, MovementKind::SaleCancel);
        assert_eq!(movements[1].quantity_delta, 4);
        assert_eq!(movements[1].actor_id.as_deref(), Some("manager-1"));

        // Items are preserved for the audit trail
        assert_eq!(db.sales().get_items(&sale.id).await.unwrap().len(), 1);

        // Cancelling twice fails with the current status
        let err = db.engine().cancel(&sale.id, "manager-1").await.unwrap_err();
        assert!(matches!(
            err,
            CommitError::InvalidSaleStatus {
                status: SaleStatus::Cancelled,
                ..
            }
        ));

        // Unknown sale id
        let err = db.engine().cancel("nope", "manager-1").await.unwrap_err();
        assert!(matches!(err, CommitError::SaleNotFound(_)));
    }

    #[tokio::test]
    async fn test_negative_unit_price_rejected_before_io() {
        let db = test_db().await;
        let product = test_product("Molho de Tomate", 450, 10);
        db.products().insert(&product).await.unwrap();

        let bad_line = CommitLine {
            product_id: product.id.clone(),
            quantity: 1,
            unit_price_cents: -450,
        };
        let err = db.engine().commit(request(vec![bad_line], 0)).await.unwrap_err();
        assert!(matches!(err, CommitError::InvalidPrice(-450)));

        // Typed rejection, not a schema constraint trip: nothing was written
        assert_eq!(db.sales().count().await.unwrap(), 0);
        assert_eq!(db.products().get_stock(&product.id).await.unwrap(), 10);
    }

    #[tokio::test]
    async fn test_zero_delta_adjustment_rejected() {
        let db = test_db().await;
        let product = test_product("Aveia em Flocos", 890, 6);
        db.products().insert(&product).await.unwrap();

        let err = db
            .engine()
            .adjust_stock(&product.id, 0, "recontagem", "manager-1")
            .await
            .unwrap_err();
        assert!(matches!(err, CommitError::ZeroAdjustment));
        assert_eq!(
            err.to_string(),
            "Stock adjustment delta must be non-zero"
        );

        // No ledger row for a no-op
        assert_eq!(db.movements().count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_adjust_stock_guards_and_ledger() {
        let db = test_db().await;
        let product = test_product("Amaciante 2L", 1200, 2);
        db.products().insert(&product).await.unwrap();

        let movement = db
            .engine()
            .adjust_stock(&product.id, -2, "quebra", "manager-1")
            .await
            .unwrap();
        assert_eq!(movement.kind, MovementKind::Adjustment);
        assert_eq!(movement.quantity_before, 2);
        assert_eq!(movement.quantity_after, 0);
        assert_eq!(db.products().get_stock(&product.id).await.unwrap(), 0);

        // Going below zero is refused
        let err = db
            .engine()
            .adjust_stock(&product.id, -1, "quebra", "manager-1")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            CommitError::InsufficientStock { available: 0, .. }
        ));

        let err = db
            .engine()
            .adjust_stock("no-such", 5, "recebimento", "manager-1")
            .await
            .unwrap_err();
        assert!(matches!(err, CommitError::ProductNotFound(_)));
    }

    #[tokio::test]
    async fn test_concurrent_commits_race_for_last_unit() {
        // Real concurrency needs a file-backed pool; an in-memory database
        // is pinned to one connection.
        let path = std::env::temp_dir().join(format!("balcao-race-{}.db", Uuid::new_v4()));
        let db = Database::new(DbConfig::new(&path).max_connections(4))
            .await
            .unwrap();

        let product = test_product("Última Unidade", 990, 1);
        db.products().insert(&product).await.unwrap();

        let engine_a = db.engine();
        let engine_b = db.engine();
        let req_a = request(vec![line(&product, 1)], 0);
        let req_b = request(vec![line(&product, 1)], 0);

        let (a, b) = tokio::join!(engine_a.commit(req_a), engine_b.commit(req_b));

        // Exactly one wins; the loser sees the authoritative re-check fail.
        let ok_count = [a.is_ok(), b.is_ok()].iter().filter(|x| **x).count();
        assert_eq!(ok_count, 1);
        for result in [a, b] {
            if let Err(err) = result {
                assert!(
                    matches!(err, CommitError::InsufficientStock { available: 0, .. }),
                    "loser should fail stock re-check, got {err:?}"
                );
            }
        }

        assert_eq!(db.products().get_stock(&product.id).await.unwrap(), 0);
        assert_eq!(db.sales().count().await.unwrap(), 1);
        assert_eq!(db.movements().count().await.unwrap(), 1);

        db.close().await;
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_sale_number_format() {
        let number = generate_sale_number();
        let (date, suffix) = number.split_once('-').unwrap();

        assert_eq!(date.len(), 8);
        assert!(date.chars().all(|c| c.is_ascii_digit()));
        assert_eq!(suffix.len(), 6);
        assert!(suffix.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_commit_request_from_cart() {
        let product = Product {
            id: "p1".to_string(),
            company_id: None,
            name: "Café 500g".to_string(),
            description: None,
            barcode: None,
            brand: None,
            price_cents: 1890,
            cost_cents: 1200,
            stock_quantity: 10,
            min_stock_quantity: 2,
            unit: "un".to_string(),
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        let mut cart = Cart::new();
        cart.add_item(&product, 2).unwrap();

        let request = CommitRequest::from_cart(&cart, "seller-1", PaymentMethod::Cash, 0)
            .customer("customer-9")
            .notes("balcão");

        assert_eq!(request.lines.len(), 1);
        assert_eq!(request.lines[0].quantity, 2);
        assert_eq!(request.lines[0].unit_price_cents, 1890);
        assert_eq!(request.customer_id.as_deref(), Some("customer-9"));

        // Building the request leaves the cart intact
        assert_eq!(cart.total_quantity(), 2);
    }
}
