//! # Stock Movement Repository
//!
//! The append-only stock ledger.
//!
//! Every change to a product's `stock_quantity` has exactly one row here,
//! written in the same transaction as the change itself. The ledger is never
//! updated or deleted; cancellations append compensating rows. A product's
//! stock always equals the sum of its signed deltas from creation.

use sqlx::{SqliteConnection, SqlitePool};

use crate::error::DbResult;
use balcao_core::StockMovement;

const MOVEMENT_COLUMNS: &str = "id, product_id, kind, quantity_delta, quantity_before, \
     quantity_after, reason, sale_id, actor_id, created_at";

/// Repository for stock ledger reads.
#[derive(Debug, Clone)]
pub struct MovementRepository {
    pool: SqlitePool,
}

impl MovementRepository {
    /// Creates a new MovementRepository.
    pub fn new(pool: SqlitePool) -> Self {
        MovementRepository { pool }
    }

    /// Lists movements for a product, oldest first.
    pub async fn list_for_product(
        &self,
        product_id: &str,
        limit: u32,
    ) -> DbResult<Vec<StockMovement>> {
        let sql = format!(
            "SELECT {MOVEMENT_COLUMNS} FROM stock_movements \
             WHERE product_id = ?1 ORDER BY created_at, id LIMIT ?2"
        );

        let movements = sqlx::query_as::<_, StockMovement>(&sql)
            .bind(product_id)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;

        Ok(movements)
    }

    /// Lists movements linked to a sale (commit and any cancellation).
    pub async fn list_for_sale(&self, sale_id: &str) -> DbResult<Vec<StockMovement>> {
        let sql = format!(
            "SELECT {MOVEMENT_COLUMNS} FROM stock_movements \
             WHERE sale_id = ?1 ORDER BY created_at, id"
        );

        let movements = sqlx::query_as::<_, StockMovement>(&sql)
            .bind(sale_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(movements)
    }

    /// Sum of signed deltas for a product since creation.
    ///
    /// By the ledger invariant this always equals the product's current
    /// stock minus its initial stock; tests use it to verify the invariant.
    pub async fn delta_sum(&self, product_id: &str) -> DbResult<i64> {
        let sum: Option<i64> = sqlx::query_scalar(
            "SELECT SUM(quantity_delta) FROM stock_movements WHERE product_id = ?1",
        )
        .bind(product_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(sum.unwrap_or(0))
    }

    /// Counts all movements (for diagnostics and row-diff tests).
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM stock_movements")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}

// =============================================================================
// Transaction-Scoped Write Helper (engine only)
// =============================================================================

/// Appends a movement row inside the engine's transaction.
///
/// Only fails on storage unavailability; the schema re-checks the
/// before/after arithmetic with a CHECK constraint.
pub(crate) async fn append(
    conn: &mut SqliteConnection,
    movement: &StockMovement,
) -> DbResult<()> {
    sqlx::query(
        r#"
        INSERT INTO stock_movements (
            id, product_id, kind, quantity_delta,
            quantity_before, quantity_after, reason,
            sale_id, actor_id, created_at
        ) VALUES (
            ?1, ?2, ?3, ?4,
            ?5, ?6, ?7,
            ?8, ?9, ?10
        )
        "#,
    )
    .bind(&movement.id)
    .bind(&movement.product_id)
    .bind(movement.kind)
    .bind(movement.quantity_delta)
    .bind(movement.quantity_before)
    .bind(movement.quantity_after)
    .bind(&movement.reason)
    .bind(&movement.sale_id)
    .bind(&movement.actor_id)
    .bind(movement.created_at)
    .execute(conn)
    .await?;

    Ok(())
}
