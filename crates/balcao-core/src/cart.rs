//! # Cart Session
//!
//! Transient, client-held staging area for one checkout interaction.
//!
//! ## Two-Layer Stock Checking
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     Cart Session Operations                             │
//! │                                                                         │
//! │  Caller Action            Cart Operation          Check Performed       │
//! │  ─────────────            ──────────────          ───────────────       │
//! │                                                                         │
//! │  Pick Product ──────────► add_item() ───────────► advisory snapshot    │
//! │                                                                         │
//! │  Change Quantity ───────► update_quantity() ────► advisory snapshot    │
//! │                                                                         │
//! │  Remove / Clear ────────► remove_item/clear ────► none (always ok)     │
//! │                                                                         │
//! │  Finalize ──────────────► SaleEngine::commit ───► AUTHORITATIVE        │
//! │                           (balcao-db)             re-check inside the  │
//! │                                                   transaction          │
//! │                                                                         │
//! │  The cart check is optimistic and uses the stock snapshot captured     │
//! │  when the product was added. Never merge the two layers: the advisory  │
//! │  check alone cannot prevent lost-update races between checkouts.       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The cart is exclusively owned by one checkout interaction, never
//! persisted, and left intact by the caller when a commit fails so the user
//! can adjust quantities and retry.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};
use crate::types::Product;
use crate::validation::validate_quantity;
use crate::{MAX_CART_ITEMS, MAX_ITEM_QUANTITY};

// =============================================================================
// Cart Item
// =============================================================================

/// An item staged in the cart.
///
/// ## Design Notes
/// - `unit_price_cents`: frozen when the product is added; this is the price
///   the sale engine will snapshot into the line item
/// - `stock_snapshot`: the stock level known when the product was added,
///   used only for the advisory check
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CartItem {
    /// Product ID (UUID)
    pub product_id: String,

    /// Product name at time of adding (frozen)
    pub product_name: String,

    /// Price in centavos at time of adding (frozen)
    pub unit_price_cents: i64,

    /// Stock level known at time of adding (advisory only)
    pub stock_snapshot: i64,

    /// Quantity in cart; always >= 1
    pub quantity: i64,

    /// When this item was added to cart
    pub added_at: DateTime<Utc>,
}

impl CartItem {
    /// Creates a new cart item from a product and quantity.
    pub fn from_product(product: &Product, quantity: i64) -> Self {
        CartItem {
            product_id: product.id.clone(),
            product_name: product.name.clone(),
            unit_price_cents: product.price_cents,
            stock_snapshot: product.stock_quantity,
            quantity,
            added_at: Utc::now(),
        }
    }

    /// Calculates the line subtotal (unit price × quantity).
    pub fn subtotal_cents(&self) -> i64 {
        self.unit_price_cents * self.quantity
    }
}

// =============================================================================
// Cart
// =============================================================================

/// The cart session.
///
/// ## Invariants
/// - Items are unique by `product_id` (adding same product merges quantity)
/// - Quantity is always >= 1 (updating to <= 0 removes the line)
/// - Maximum items: [`MAX_CART_ITEMS`]
/// - Maximum quantity per item: [`MAX_ITEM_QUANTITY`]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Cart {
    /// Items in the cart
    pub items: Vec<CartItem>,

    /// When the cart was created/last cleared
    pub created_at: DateTime<Utc>,
}

impl Cart {
    /// Creates a new empty cart.
    pub fn new() -> Self {
        Cart {
            items: Vec::new(),
            created_at: Utc::now(),
        }
    }

    /// Adds a product to the cart or merges into an existing line.
    ///
    /// ## Behavior
    /// - If product already in cart: increases quantity, re-checking the
    ///   cumulative quantity against the stock snapshot
    /// - If product not in cart: adds a new line with a fresh snapshot
    ///
    /// The stock check here is advisory; the sale engine re-checks
    /// authoritatively at commit.
    pub fn add_item(&mut self, product: &Product, quantity: i64) -> CoreResult<()> {
        validate_quantity(quantity)?;

        if !product.is_active {
            return Err(CoreError::ProductInactive(product.id.clone()));
        }

        if let Some(item) = self.items.iter_mut().find(|i| i.product_id == product.id) {
            let new_qty = item.quantity + quantity;
            if new_qty > MAX_ITEM_QUANTITY {
                return Err(CoreError::QuantityTooLarge {
                    requested: new_qty,
                    max: MAX_ITEM_QUANTITY,
                });
            }
            if new_qty > item.stock_snapshot {
                return Err(CoreError::InsufficientStock {
                    product_id: product.id.clone(),
                    available: item.stock_snapshot,
                    requested: new_qty,
                });
            }
            item.quantity = new_qty;
            return Ok(());
        }

        if self.items.len() >= MAX_CART_ITEMS {
            return Err(CoreError::CartTooLarge {
                max: MAX_CART_ITEMS,
            });
        }

        if quantity > product.stock_quantity {
            return Err(CoreError::InsufficientStock {
                product_id: product.id.clone(),
                available: product.stock_quantity,
                requested: quantity,
            });
        }

        self.items.push(CartItem::from_product(product, quantity));
        Ok(())
    }

    /// Updates the quantity of an item in the cart.
    ///
    /// ## Behavior
    /// - If quantity is <= 0: removes the line (no-op when absent)
    /// - Otherwise re-validates against the known stock snapshot
    pub fn update_quantity(&mut self, product_id: &str, quantity: i64) -> CoreResult<()> {
        if quantity <= 0 {
            self.remove_item(product_id);
            return Ok(());
        }

        if quantity > MAX_ITEM_QUANTITY {
            return Err(CoreError::QuantityTooLarge {
                requested: quantity,
                max: MAX_ITEM_QUANTITY,
            });
        }

        let item = self
            .items
            .iter_mut()
            .find(|i| i.product_id == product_id)
            .ok_or_else(|| CoreError::ProductNotInCart(product_id.to_string()))?;

        if quantity > item.stock_snapshot {
            return Err(CoreError::InsufficientStock {
                product_id: product_id.to_string(),
                available: item.stock_snapshot,
                requested: quantity,
            });
        }

        item.quantity = quantity;
        Ok(())
    }

    /// Removes an item from the cart by product ID.
    ///
    /// Unconditional: removing a product that is not in the cart is a no-op,
    /// so the caller never has to check membership first.
    pub fn remove_item(&mut self, product_id: &str) {
        self.items.retain(|i| i.product_id != product_id);
    }

    /// Clears all items from the cart.
    pub fn clear(&mut self) {
        self.items.clear();
        self.created_at = Utc::now();
    }

    /// Returns the number of unique items in the cart.
    pub fn item_count(&self) -> usize {
        self.items.len()
    }

    /// Returns the total quantity of all items.
    pub fn total_quantity(&self) -> i64 {
        self.items.iter().map(|i| i.quantity).sum()
    }

    /// Calculates the cart subtotal. Pure, no side effects.
    pub fn subtotal_cents(&self) -> i64 {
        self.items.iter().map(|i| i.subtotal_cents()).sum()
    }

    /// Checks if the cart is empty.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl Default for Cart {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
