//! # Reporting Surface
//!
//! Read-only aggregate queries over committed sales.
//!
//! Everything here is derived from durable rows; cancelled sales are
//! excluded from revenue aggregates but still visible through the sale
//! repository. Reports never write.

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use serde::Serialize;
use sqlx::SqlitePool;

use crate::error::DbResult;
use balcao_core::{Money, Sale};

const SALE_COLUMNS: &str = "id, sale_number, seller_id, customer_id, subtotal_cents, \
     discount_cents, total_cents, payment_method, status, notes, company_id, \
     created_at, updated_at";

// =============================================================================
// Report Rows
// =============================================================================

/// Revenue aggregate for one calendar day (UTC), finalized sales only.
#[derive(Debug, Clone, Serialize)]
pub struct DailySummary {
    pub date: NaiveDate,
    pub sale_count: i64,
    /// Sum of sale subtotals, before discounts.
    pub gross_cents: i64,
    pub discount_cents: i64,
    /// Sum of sale totals, what actually changed hands.
    pub net_cents: i64,
    pub average_ticket_cents: i64,
}

impl DailySummary {
    /// Net revenue as money.
    pub fn net(&self) -> Money {
        Money::from_cents(self.net_cents)
    }
}

/// Sales ranking row: how much of a product moved in a period.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct TopProduct {
    pub product_id: String,
    pub product_name: String,
    pub quantity_sold: i64,
    pub revenue_cents: i64,
}

// =============================================================================
// Reports
// =============================================================================

/// Read-only reporting queries.
#[derive(Debug, Clone)]
pub struct Reports {
    pool: SqlitePool,
}

impl Reports {
    /// Creates a new Reports handle.
    pub fn new(pool: SqlitePool) -> Self {
        Reports { pool }
    }

    /// Aggregates finalized sales for one UTC calendar day.
    ///
    /// A day with no sales returns an all-zero summary rather than an error.
    pub async fn daily_summary(&self, date: NaiveDate) -> DbResult<DailySummary> {
        let (start, end) = day_bounds(date);

        let row: (i64, Option<i64>, Option<i64>, Option<i64>) = sqlx::query_as(
            "SELECT COUNT(*), SUM(subtotal_cents), SUM(discount_cents), SUM(total_cents) \
             FROM sales \
             WHERE status = 'finalized' AND created_at >= ?1 AND created_at < ?2",
        )
        .bind(start)
        .bind(end)
        .fetch_one(&self.pool)
        .await?;

        let (sale_count, gross, discount, net) = row;
        let net_cents = net.unwrap_or(0);

        Ok(DailySummary {
            date,
            sale_count,
            gross_cents: gross.unwrap_or(0),
            discount_cents: discount.unwrap_or(0),
            net_cents,
            average_ticket_cents: if sale_count > 0 {
                net_cents / sale_count
            } else {
                0
            },
        })
    }

    /// Lists sales created within `[start, end)`, newest first.
    ///
    /// Includes cancelled sales; callers filter by status if they need
    /// revenue-relevant rows only.
    pub async fn sales_between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> DbResult<Vec<Sale>> {
        let sql = format!(
            "SELECT {SALE_COLUMNS} FROM sales \
             WHERE created_at >= ?1 AND created_at < ?2 \
             ORDER BY created_at DESC, id"
        );

        let sales = sqlx::query_as::<_, Sale>(&sql)
            .bind(start)
            .bind(end)
            .fetch_all(&self.pool)
            .await?;

        Ok(sales)
    }

    /// Best-selling products within `[start, end)`, by quantity sold.
    ///
    /// Joins through sale headers so cancelled sales drop out; names come
    /// from the line-item snapshot, so renamed or deactivated products
    /// report under the name they were sold as.
    pub async fn top_products(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        limit: u32,
    ) -> DbResult<Vec<TopProduct>> {
        let rows = sqlx::query_as::<_, TopProduct>(
            "SELECT si.product_id, si.product_name, \
                    SUM(si.quantity) AS quantity_sold, \
                    SUM(si.subtotal_cents) AS revenue_cents \
             FROM sale_items si \
             JOIN sales s ON s.id = si.sale_id \
             WHERE s.status = 'finalized' AND s.created_at >= ?1 AND s.created_at < ?2 \
             GROUP BY si.product_id, si.product_name \
             ORDER BY quantity_sold DESC, revenue_cents DESC \
             LIMIT ?3",
        )
        .bind(start)
        .bind(end)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    /// Number of active products at or below their minimum stock threshold.
    pub async fn low_stock_count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM products \
             WHERE is_active = 1 AND stock_quantity <= min_stock_quantity",
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }
}

/// `[midnight, next midnight)` in UTC for a calendar day.
fn day_bounds(date: NaiveDate) -> (DateTime<Utc>, DateTime<Utc>) {
    let start = Utc.from_utc_datetime(&date.and_hms_opt(0, 0, 0).unwrap_or_default());
    (start, start + chrono::Duration::days(1))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{CommitLine, CommitRequest};
    use crate::pool::{Database, DbConfig};
    use crate::repository::product::generate_product_id;
    use balcao_core::{PaymentMethod, Product};

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
    async fn test_daily_summary_and_top_products() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let coffee = test_product("Café 500g", 1000, 20);
        let milk = test_product("Leite 1L", 500, 20);
        db.products().insert(&coffee).await.unwrap();
        db.products().insert(&milk).await.unwrap();

        let make_line = |p: &Product, q: i64| CommitLine {
            product_id: p.id.clone(),
            quantity: q,
            unit_price_cents: p.price_cents,
        };

        let engine = db.engine();
        engine
            .commit(request(vec![make_line(&coffee, 3), make_line(&milk, 1)], 500))
            .await
            .unwrap();
        let cancelled = engine
            .commit(request(vec![make_line(&milk, 5)], 0))
            .await
            .unwrap();
        engine.cancel(&cancelled.id, "seller-1").await.unwrap();

        let today = Utc::now().date_naive();
        let summary = db.reports().daily_summary(today).await.unwrap();

        // Only the finalized sale counts: 3×1000 + 1×500 - 500
        assert_eq!(summary.sale_count, 1);
        assert_eq!(summary.gross_cents, 3500);
        assert_eq!(summary.discount_cents, 500);
        assert_eq!(summary.net_cents, 3000);
        assert_eq!(summary.average_ticket_cents, 3000);

        let (start, end) = day_bounds(today);
        let top = db.reports().top_products(start, end, 10).await.unwrap();
        assert_eq!(top.len(), 2);
        assert_eq!(top[0].product_id, coffee.id);
        assert_eq!(top[0].quantity_sold, 3);
        assert_eq!(top[0].revenue_cents, 3000);
        // The cancelled 5-unit milk sale does not inflate the ranking
        assert_eq!(top[1].quantity_sold, 1);

        // Both sales are still visible in the raw listing
        assert_eq!(db.reports().sales_between(start, end).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_low_stock_count() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let mut low = test_product("Fio Dental", 700, 1);
        low.min_stock_quantity = 5;
        let fine = test_product("Shampoo", 1500, 50);
        db.products().insert(&low).await.unwrap();
        db.products().insert(&fine).await.unwrap();

        assert_eq!(db.reports().low_stock_count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_empty_day_summary_is_all_zero() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();

        let date = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap();
        let summary = db.reports().daily_summary(date).await.unwrap();

        assert_eq!(summary.sale_count, 0);
        assert_eq!(summary.net_cents, 0);
        assert_eq!(summary.average_ticket_cents, 0);
    }

    #[test]
    fn test_day_bounds_cover_exactly_one_day() {
        let date = NaiveDate::from_ymd_opt(2026, 8, 31).unwrap();
        let (start, end) = day_bounds(date);

        assert_eq!(start.to_rfc3339(), "2026-08-31T00:00:00+00:00");
        assert_eq!(end - start, chrono::Duration::days(1));
    }

    #[test]
    fn test_empty_summary_shape() {
        let summary = DailySummary {
            date: NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(),
            sale_count: 0,
            gross_cents: 0,
            discount_cents: 0,
            net_cents: 0,
            average_ticket_cents: 0,
        };

        assert!(summary.net().is_zero());
    }
}
