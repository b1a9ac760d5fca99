//! # Domain Types
//!
//! Core domain types used throughout Balcao POS.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    Product      │   │      Sale       │   │  StockMovement  │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id (UUID)      │   │  id (UUID)      │   │  id (UUID)      │       │
//! │  │  stock_quantity │   │  sale_number    │   │  quantity_delta │       │
//! │  │  min_stock      │   │  status         │   │  before / after │       │
//! │  │  price_cents    │   │  total_cents    │   │  sale_id (FK?)  │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │   StockStatus   │   │   SaleStatus    │   │ PaymentMethod   │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  Low            │   │  Finalized      │   │  Cash, Other    │       │
//! │  │  Medium / High  │   │  Cancelled      │   │  Debit/Credit   │       │
//! │  └─────────────────┘   └─────────────────┘   │  InstantTransfer│       │
//! │                        └─────────────────────└─────────────────┘       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Dual-Key Identity Pattern
//! Every entity has:
//! - `id`: UUID v4 - immutable, used for database relations
//! - Business ID where it matters: (sale_number, barcode) - human-readable

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::money::Money;

// =============================================================================
// Product
// =============================================================================

/// A product available for sale.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Product {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Company this product belongs to (multi-tenant schema, optional at runtime).
    pub company_id: Option<String>,

    /// Display name shown to the seller and on receipts.
    pub name: String,

    /// Optional description for product details.
    pub description: Option<String>,

    /// Barcode (EAN-13, UPC-A, etc.).
    pub barcode: Option<String>,

    /// Brand name, if any.
    pub brand: Option<String>,

    /// Unit price in centavos (smallest currency unit).
    pub price_cents: i64,

    /// Cost in centavos (for profit margin calculations).
    pub cost_cents: i64,

    /// Current stock level. Mutated only by the sale engine or an
    /// explicit audited adjustment, never by catalog edits.
    pub stock_quantity: i64,

    /// Minimum stock threshold used for low-stock classification.
    pub min_stock_quantity: i64,

    /// Unit of measure ("un", "kg", "L", ...).
    pub unit: String,

    /// Whether product is active (soft delete).
    pub is_active: bool,

    /// When the product was created.
    pub created_at: DateTime<Utc>,

    /// When the product was last updated.
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Returns the price as a Money type.
    #[inline]
    pub fn price(&self) -> Money {
        Money::from_cents(self.price_cents)
    }

    /// Advisory check: can the requested quantity be sold against the
    /// currently known stock? The authoritative check happens inside the
    /// sale engine's transaction.
    pub fn can_sell(&self, quantity: i64) -> bool {
        self.is_active && quantity >= 1 && self.stock_quantity >= quantity
    }

    /// Classifies the current stock level against the minimum threshold.
    #[inline]
    pub fn stock_status(&self) -> StockStatus {
        StockStatus::classify(self.stock_quantity, self.min_stock_quantity)
    }
}

// =============================================================================
// Stock Status
// =============================================================================

/// Non-authoritative stock classification for dashboards and listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StockStatus {
    /// At or below the minimum threshold.
    Low,
    /// Above the minimum but at or below twice the minimum.
    Medium,
    /// Comfortably stocked.
    High,
}

impl StockStatus {
    /// `Low` if `stock <= minimum`, `Medium` if `stock <= 2 * minimum`,
    /// else `High`.
    pub fn classify(stock: i64, minimum: i64) -> Self {
        if stock <= minimum {
            StockStatus::Low
        } else if stock <= minimum * 2 {
            StockStatus::Medium
        } else {
            StockStatus::High
        }
    }
}

// =============================================================================
// Sale Status
// =============================================================================

/// The status of a sale transaction.
///
/// Sales are created directly in `Finalized` state; carts are ephemeral and
/// no durable draft state exists. The only transition is
/// `Finalized -> Cancelled`, which reverses stock via compensating movements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "snake_case")]
pub enum SaleStatus {
    /// Sale has been committed; stock decremented, ledger written.
    Finalized,
    /// Sale was cancelled; stock restored by compensating movements.
    Cancelled,
}

// =============================================================================
// Payment Method
// =============================================================================

/// How the customer paid. Closed set so exhaustiveness is compile-checked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    /// Physical cash payment.
    Cash,
    /// Debit card on external terminal.
    DebitCard,
    /// Credit card on external terminal.
    CreditCard,
    /// Instant bank transfer (Pix).
    InstantTransfer,
    /// Anything else (store credit, voucher, ...).
    Other,
}

// =============================================================================
// Sale
// =============================================================================

/// A committed sale transaction.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Sale {
    pub id: String,
    /// Human-readable, unique, date-derived number (e.g. `20260831-3F9A2C`).
    pub sale_number: String,
    /// Seller identity, passed explicitly into the engine - never read from
    /// ambient state.
    pub seller_id: String,
    pub customer_id: Option<String>,
    pub subtotal_cents: i64,
    /// Absolute discount; `0 <= discount <= subtotal`.
    pub discount_cents: i64,
    /// Always `subtotal - discount`.
    pub total_cents: i64,
    pub payment_method: PaymentMethod,
    pub status: SaleStatus,
    pub notes: Option<String>,
    pub company_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Sale {
    /// Returns the grand total as Money.
    #[inline]
    pub fn total(&self) -> Money {
        Money::from_cents(self.total_cents)
    }
}

// =============================================================================
// Sale Item
// =============================================================================

/// A line item in a sale.
/// Uses snapshot pattern to freeze product data at time of sale.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct SaleItem {
    pub id: String,
    pub sale_id: String,
    pub product_id: String,
    /// Product name at time of sale (frozen).
    pub product_name: String,
    /// Unit price in centavos at time of sale (frozen).
    pub unit_price_cents: i64,
    /// Quantity sold; always >= 1.
    pub quantity: i64,
    /// Line total (unit_price * quantity).
    pub subtotal_cents: i64,
    pub created_at: DateTime<Utc>,
}

impl SaleItem {
    /// Returns the unit price as Money.
    #[inline]
    pub fn unit_price(&self) -> Money {
        Money::from_cents(self.unit_price_cents)
    }

    /// Returns the line subtotal as Money.
    #[inline]
    pub fn subtotal(&self) -> Money {
        Money::from_cents(self.subtotal_cents)
    }
}

// =============================================================================
// Stock Movement
// =============================================================================

/// Why a stock movement happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum MovementKind {
    /// Stock decremented by a committed sale.
    Sale,
    /// Compensating movement written when a sale is cancelled.
    SaleCancel,
    /// Manual, audited stock adjustment (receiving, shrinkage, recount).
    Adjustment,
}

/// One append-only entry in the stock ledger.
///
/// ## Invariant
/// `quantity_after = quantity_before + quantity_delta`, and `quantity_after`
/// equals the product's stock immediately after the movement is applied.
/// A stock change without its movement row (or vice versa) is a consistency
/// violation; both are always written in the same transaction.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct StockMovement {
    pub id: String,
    pub product_id: String,
    pub kind: MovementKind,
    /// Signed delta: negative for sales, positive for cancellations/restocks.
    pub quantity_delta: i64,
    pub quantity_before: i64,
    pub quantity_after: i64,
    pub reason: Option<String>,
    /// Set when the movement was triggered by a sale or its cancellation.
    pub sale_id: Option<String>,
    /// Who caused the movement (seller, stock clerk).
    pub actor_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn product(stock: i64, min: i64) -> Product {
        Product {
            id: "p1".to_string(),
            company_id: None,
            name: "Arroz 5kg".to_string(),
            description: None,
            barcode: None,
            brand: None,
            price_cents: 2599,
            cost_cents: 1800,
            stock_quantity: stock,
            min_stock_quantity: min,
            unit: "un".to_string(),
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_stock_status_classify() {
        assert_eq!(StockStatus::classify(3, 5), StockStatus::Low);
        assert_eq!(StockStatus::classify(5, 5), StockStatus::Low);
        assert_eq!(StockStatus::classify(8, 5), StockStatus::Medium);
        assert_eq!(StockStatus::classify(10, 5), StockStatus::Medium);
        assert_eq!(StockStatus::classify(11, 5), StockStatus::High);
    }

    #[test]
    fn test_product_can_sell() {
        let p = product(3, 1);
        assert!(p.can_sell(1));
        assert!(p.can_sell(3));
        assert!(!p.can_sell(4));
        assert!(!p.can_sell(0));

        let mut inactive = product(10, 1);
        inactive.is_active = false;
        assert!(!inactive.can_sell(1));
    }

    #[test]
    fn test_enum_wire_forms() {
        let m = serde_json::to_string(&PaymentMethod::InstantTransfer).unwrap();
        assert_eq!(m, "\"instant_transfer\"");

        let s = serde_json::to_string(&SaleStatus::Finalized).unwrap();
        assert_eq!(s, "\"finalized\"");

        let k = serde_json::to_string(&MovementKind::SaleCancel).unwrap();
        assert_eq!(k, "\"sale_cancel\"");
    }
}
