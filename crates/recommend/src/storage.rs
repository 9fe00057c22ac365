//! Recommendation Storage (C4): upsert and read of generated rows keyed by
//! (date, route, customer, item).

use crate::types::{RecommendationRow, Tier};
use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::{PgPool, Row};
use std::str::FromStr;
use vansales_core::error::Result;
use vansales_core::Error;

#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct FilterOptions {
    pub routes: Vec<String>,
    pub customers: Vec<String>,
    pub items: Vec<String>,
}

#[async_trait]
pub trait RecommendationStorage: Send + Sync {
    async fn get(&self, date: NaiveDate, route: &str) -> Result<Vec<RecommendationRow>>;
    async fn save(&self, date: NaiveDate, route: &str, rows: &[RecommendationRow]) -> Result<()>;
    async fn get_filter_options(
        &self,
        date: NaiveDate,
        route: Option<&str>,
        customer: Option<&str>,
    ) -> Result<FilterOptions>;
    /// Deletes persisted rows older than the retention window. Best-effort
    /// housekeeping, not a correctness requirement of any single request.
    async fn delete_older_than(&self, cutoff: NaiveDate) -> Result<u64>;
}

pub struct PostgresRecommendationStorage {
    pool: PgPool,
}

impl PostgresRecommendationStorage {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RecommendationStorage for PostgresRecommendationStorage {
    async fn get(&self, date: NaiveDate, route: &str) -> Result<Vec<RecommendationRow>> {
        let rows = sqlx::query(
            "SELECT date, route, customer, item, recommended_quantity, tier, van_load, \
             priority_score, avg_quantity_per_visit, days_since_last_purchase, \
             purchase_cycle_days, frequency_percent, generated_at, generated_by \
             FROM recommendations WHERE date = $1 AND route = $2 \
             ORDER BY customer ASC, item ASC",
        )
        .bind(date)
        .bind(route)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|row| {
                let tier_str: String = row.try_get("tier")?;
                let tier = Tier::from_str(&tier_str)?;
                Ok(RecommendationRow {
                    date: row.try_get("date")?,
                    route: row.try_get("route")?,
                    customer: row.try_get("customer")?,
                    item: row.try_get("item")?,
                    recommended_quantity: row.try_get("recommended_quantity")?,
                    tier,
                    van_load: row.try_get("van_load")?,
                    priority_score: row.try_get("priority_score")?,
                    avg_quantity_per_visit: row.try_get("avg_quantity_per_visit")?,
                    days_since_last_purchase: row.try_get("days_since_last_purchase")?,
                    purchase_cycle_days: row.try_get("purchase_cycle_days")?,
                    frequency_percent: row.try_get("frequency_percent")?,
                    generated_at: row.try_get("generated_at")?,
                    generated_by: row.try_get("generated_by")?,
                })
            })
            .collect()
    }

    async fn save(&self, date: NaiveDate, route: &str, rows: &[RecommendationRow]) -> Result<()> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| Error::StorageError(e.to_string()))?;

        sqlx::query("DELETE FROM recommendations WHERE date = $1 AND route = $2")
            .bind(date)
            .bind(route)
            .execute(&mut *tx)
            .await
            .map_err(|e| Error::StorageError(e.to_string()))?;

        for row in rows {
            sqlx::query(
                "INSERT INTO recommendations \
                 (date, route, customer, item, recommended_quantity, tier, van_load, \
                  priority_score, avg_quantity_per_visit, days_since_last_purchase, \
                  purchase_cycle_days, frequency_percent, generated_at, generated_by) \
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)",
            )
            .bind(row.date)
            .bind(&row.route)
            .bind(&row.customer)
            .bind(&row.item)
            .bind(row.recommended_quantity)
            .bind(row.tier.to_string())
            .bind(row.van_load)
            .bind(row.priority_score)
            .bind(row.avg_quantity_per_visit)
            .bind(row.days_since_last_purchase)
            .bind(row.purchase_cycle_days)
            .bind(row.frequency_percent)
            .bind(row.generated_at)
            .bind(&row.generated_by)
            .execute(&mut *tx)
            .await
            .map_err(|e| Error::StorageError(e.to_string()))?;
        }

        tx.commit().await.map_err(|e| Error::StorageError(e.to_string()))?;
        Ok(())
    }

    async fn get_filter_options(
        &self,
        date: NaiveDate,
        route: Option<&str>,
        customer: Option<&str>,
    ) -> Result<FilterOptions> {
        let routes: Vec<String> = sqlx::query("SELECT DISTINCT route FROM recommendations WHERE date = $1 ORDER BY route")
            .bind(date)
            .fetch_all(&self.pool)
            .await?
            .into_iter()
            .map(|r| r.try_get::<String, _>("route"))
            .collect::<std::result::Result<_, _>>()?;

        let customers: Vec<String> = if let Some(route) = route {
            sqlx::query(
                "SELECT DISTINCT customer FROM recommendations WHERE date = $1 AND route = $2 ORDER BY customer",
            )
            .bind(date)
            .bind(route)
            .fetch_all(&self.pool)
            .await?
            .into_iter()
            .map(|r| r.try_get::<String, _>("customer"))
            .collect::<std::result::Result<_, _>>()?
        } else {
            Vec::new()
        };

        let items: Vec<String> = if let (Some(route), Some(customer)) = (route, customer) {
            sqlx::query(
                "SELECT DISTINCT item FROM recommendations WHERE date = $1 AND route = $2 AND customer = $3 ORDER BY item",
            )
            .bind(date)
            .bind(route)
            .bind(customer)
            .fetch_all(&self.pool)
            .await?
            .into_iter()
            .map(|r| r.try_get::<String, _>("item"))
            .collect::<std::result::Result<_, _>>()?
        } else {
            Vec::new()
        };

        Ok(FilterOptions { routes, customers, items })
    }

    async fn delete_older_than(&self, cutoff: NaiveDate) -> Result<u64> {
        let result = sqlx::query("DELETE FROM recommendations WHERE date < $1")
            .bind(cutoff)
            .execute(&self.pool)
            .await
            .map_err(|e| Error::StorageError(e.to_string()))?;
        Ok(result.rows_affected())
    }
}
