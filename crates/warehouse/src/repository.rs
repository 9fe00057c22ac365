//! Data access layer: parametrized, date-bounded queries against the sales
//! warehouse. Every scan over a fact table carries an explicit date
//! predicate — the fact table spans years, and nothing in this product ever
//! needs more than about a year of history.

use crate::types::{ForecastRow, JourneyEntry, SalesFact};
use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::{PgPool, Row};
use vansales_core::error::Result;
use vansales_core::Error;

/// Maximum span a single history scan is allowed to cover. Anything wider is
/// rejected before a query is even built, per the loader-layer contract.
pub const MAX_HISTORY_DAYS: i64 = 365;

#[async_trait]
pub trait WarehouseRepository: Send + Sync {
    async fn fetch_sales_history(
        &self,
        route: &str,
        since: NaiveDate,
        until: NaiveDate,
    ) -> Result<Vec<SalesFact>>;

    async fn fetch_customer_history(
        &self,
        since: NaiveDate,
        until: NaiveDate,
    ) -> Result<Vec<SalesFact>>;

    async fn fetch_forecast(&self, route: &str, from: NaiveDate, to: NaiveDate) -> Result<Vec<ForecastRow>>;

    async fn fetch_journey_plan(
        &self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<JourneyEntry>>;

    async fn health(&self) -> Result<()>;
}

pub struct PostgresWarehouseRepository {
    pool: PgPool,
}

impl PostgresWarehouseRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn check_window(since: NaiveDate, until: NaiveDate) -> Result<()> {
        if until < since {
            return Err(Error::invalid_input("date window end precedes start"));
        }
        if (until - since).num_days() > MAX_HISTORY_DAYS {
            return Err(Error::invalid_input(format!(
                "history scans are bounded to {MAX_HISTORY_DAYS} days"
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl WarehouseRepository for PostgresWarehouseRepository {
    async fn fetch_sales_history(
        &self,
        route: &str,
        since: NaiveDate,
        until: NaiveDate,
    ) -> Result<Vec<SalesFact>> {
        Self::check_window(since, until)?;

        let rows = sqlx::query(
            "SELECT date, route, customer, item, quantity, unit_price \
             FROM sales_facts \
             WHERE route = $1 AND date BETWEEN $2 AND $3",
        )
        .bind(route)
        .bind(since)
        .bind(until)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(row_to_sales_fact).collect()
    }

    async fn fetch_customer_history(
        &self,
        since: NaiveDate,
        until: NaiveDate,
    ) -> Result<Vec<SalesFact>> {
        Self::check_window(since, until)?;

        let rows = sqlx::query(
            "SELECT date, route, customer, item, quantity, unit_price \
             FROM sales_facts \
             WHERE date BETWEEN $1 AND $2",
        )
        .bind(since)
        .bind(until)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(row_to_sales_fact).collect()
    }

    async fn fetch_forecast(&self, route: &str, from: NaiveDate, to: NaiveDate) -> Result<Vec<ForecastRow>> {
        let rows = sqlx::query(
            "SELECT date, route, item, predicted_quantity, prediction_type \
             FROM forecast WHERE route = $1 AND date BETWEEN $2 AND $3",
        )
        .bind(route)
        .bind(from)
        .bind(to)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|row| {
                Ok(ForecastRow {
                    date: row.try_get("date")?,
                    route: row.try_get("route")?,
                    item: row.try_get("item")?,
                    predicted_quantity: row.try_get("predicted_quantity")?,
                    prediction_type: row.try_get("prediction_type")?,
                })
            })
            .collect::<std::result::Result<Vec<_>, sqlx::Error>>()
            .map_err(Error::from)
    }

    async fn fetch_journey_plan(
        &self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<JourneyEntry>> {
        Self::check_window(from, to)?;

        let rows = sqlx::query("SELECT route, customer, date FROM journey_plan WHERE date BETWEEN $1 AND $2")
            .bind(from)
            .bind(to)
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter()
            .map(|row| {
                Ok(JourneyEntry {
                    route: row.try_get("route")?,
                    customer: row.try_get("customer")?,
                    date: row.try_get("date")?,
                })
            })
            .collect::<std::result::Result<Vec<_>, sqlx::Error>>()
            .map_err(Error::from)
    }

    async fn health(&self) -> Result<()> {
        sqlx::query("SELECT 1").fetch_one(&self.pool).await?;
        Ok(())
    }
}

fn row_to_sales_fact(row: sqlx::postgres::PgRow) -> Result<SalesFact> {
    Ok(SalesFact {
        date: row.try_get("date")?,
        route: row.try_get("route")?,
        customer: row.try_get("customer")?,
        item: row.try_get("item")?,
        quantity: row.try_get("quantity")?,
        unit_price: row.try_get("unit_price")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_window_wider_than_cap() {
        let since = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let until = NaiveDate::from_ymd_opt(2025, 6, 1).unwrap();
        assert!(PostgresWarehouseRepository::check_window(since, until).is_err());
    }

    #[test]
    fn rejects_inverted_window() {
        let since = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
        let until = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        assert!(PostgresWarehouseRepository::check_window(since, until).is_err());
    }

    #[test]
    fn accepts_window_within_cap() {
        let since = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let until = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
        assert!(PostgresWarehouseRepository::check_window(since, until).is_ok());
    }
}
