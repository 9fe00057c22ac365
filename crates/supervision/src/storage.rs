//! Persistence for supervision sessions (§4.5.4): one transaction writes the
//! session row, its visits, and its item details together, with an
//! optimistic-concurrency check on the session row.

use crate::types::{ItemDetail, SessionRecord, SessionSnapshot, SessionStatus, Visit};
use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::{PgPool, Row};
use std::str::FromStr;
use vansales_core::error::Result;
use vansales_core::Error;
use vansales_recommend::Tier;

#[async_trait]
pub trait SupervisionStorage: Send + Sync {
    async fn load(&self, route: &str, date: NaiveDate) -> Result<Option<SessionSnapshot>>;
    /// Inserts a brand-new session row, or updates an existing one guarded by
    /// `record_version`. A zero-row UPDATE surfaces `VersionConflict`.
    async fn save(&self, snapshot: &SessionSnapshot) -> Result<()>;
}

pub struct PostgresSupervisionStorage {
    pool: PgPool,
}

impl PostgresSupervisionStorage {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SupervisionStorage for PostgresSupervisionStorage {
    async fn load(&self, route: &str, date: NaiveDate) -> Result<Option<SessionSnapshot>> {
        let session_row = sqlx::query(
            "SELECT session_id, route, date, status, customers_planned, customers_visited, \
             skus_recommended, skus_sold, qty_recommended, qty_actual, redistribution_count, \
             redistribution_qty, performance_score, record_version, narrative, started_at, completed_at \
             FROM supervision_sessions WHERE route = $1 AND date = $2",
        )
        .bind(route)
        .bind(date)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = session_row else { return Ok(None) };
        let status_str: String = row.try_get("status")?;
        let session = SessionRecord {
            session_id: row.try_get("session_id")?,
            route: row.try_get("route")?,
            date: row.try_get("date")?,
            status: SessionStatus::from_str(&status_str)?,
            customers_planned: row.try_get("customers_planned")?,
            customers_visited: row.try_get("customers_visited")?,
            skus_recommended: row.try_get("skus_recommended")?,
            skus_sold: row.try_get("skus_sold")?,
            qty_recommended: row.try_get("qty_recommended")?,
            qty_actual: row.try_get("qty_actual")?,
            redistribution_count: row.try_get("redistribution_count")?,
            redistribution_qty: row.try_get("redistribution_qty")?,
            performance_score: row.try_get("performance_score")?,
            record_version: row.try_get("record_version")?,
            narrative: row.try_get("narrative")?,
            started_at: row.try_get("started_at")?,
            completed_at: row.try_get("completed_at")?,
        };

        let visit_rows = sqlx::query(
            "SELECT customer, visit_sequence, visit_timestamp, skus_recommended, skus_sold, \
             qty_recommended, qty_actual, redistribution_count, redistribution_qty, \
             customer_performance_score, narrative FROM supervision_visits WHERE session_id = $1",
        )
        .bind(&session.session_id)
        .fetch_all(&self.pool)
        .await?;

        let visits = visit_rows
            .into_iter()
            .map(|row| {
                Ok(Visit {
                    customer: row.try_get("customer")?,
                    visit_sequence: row.try_get("visit_sequence")?,
                    visit_timestamp: row.try_get("visit_timestamp")?,
                    skus_recommended: row.try_get("skus_recommended")?,
                    skus_sold: row.try_get("skus_sold")?,
                    qty_recommended: row.try_get("qty_recommended")?,
                    qty_actual: row.try_get("qty_actual")?,
                    redistribution_count: row.try_get("redistribution_count")?,
                    redistribution_qty: row.try_get("redistribution_qty")?,
                    customer_performance_score: row.try_get("customer_performance_score")?,
                    narrative: row.try_get("narrative")?,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let detail_rows = sqlx::query(
            "SELECT customer, item, original_recommended_qty, adjusted_recommended_qty, \
             original_actual_qty, final_actual_qty, was_manually_edited, was_item_sold, tier, \
             priority_score, van_inventory_qty, days_since_last_purchase, purchase_cycle_days, \
             purchase_frequency_pct FROM supervision_item_details WHERE session_id = $1",
        )
        .bind(&session.session_id)
        .fetch_all(&self.pool)
        .await?;

        let item_details = detail_rows
            .into_iter()
            .map(|row| {
                let tier_str: String = row.try_get("tier")?;
                Ok(ItemDetail {
                    customer: row.try_get("customer")?,
                    item: row.try_get("item")?,
                    original_recommended_qty: row.try_get("original_recommended_qty")?,
                    adjusted_recommended_qty: row.try_get("adjusted_recommended_qty")?,
                    original_actual_qty: row.try_get("original_actual_qty")?,
                    final_actual_qty: row.try_get("final_actual_qty")?,
                    was_manually_edited: row.try_get("was_manually_edited")?,
                    was_item_sold: row.try_get("was_item_sold")?,
                    tier: Tier::from_str(&tier_str)?,
                    priority_score: row.try_get("priority_score")?,
                    van_inventory_qty: row.try_get("van_inventory_qty")?,
                    days_since_last_purchase: row.try_get("days_since_last_purchase")?,
                    purchase_cycle_days: row.try_get("purchase_cycle_days")?,
                    purchase_frequency_pct: row.try_get("purchase_frequency_pct")?,
                    avg_quantity_per_visit: 0,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Some(SessionSnapshot { session, visits, item_details }))
    }

    async fn save(&self, snapshot: &SessionSnapshot) -> Result<()> {
        let mut tx = self.pool.begin().await.map_err(|e| Error::SaveFailed(e.to_string()))?;
        let s = &snapshot.session;

        if s.record_version == 0 {
            sqlx::query(
                "INSERT INTO supervision_sessions \
                 (session_id, route, date, status, customers_planned, customers_visited, \
                  skus_recommended, skus_sold, qty_recommended, qty_actual, redistribution_count, \
                  redistribution_qty, performance_score, record_version, narrative, started_at, completed_at) \
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, 1, $14, $15, $16)",
            )
            .bind(&s.session_id)
            .bind(&s.route)
            .bind(s.date)
            .bind(s.status.to_string())
            .bind(s.customers_planned)
            .bind(s.customers_visited)
            .bind(s.skus_recommended)
            .bind(s.skus_sold)
            .bind(s.qty_recommended)
            .bind(s.qty_actual)
            .bind(s.redistribution_count)
            .bind(s.redistribution_qty)
            .bind(s.performance_score)
            .bind(&s.narrative)
            .bind(s.started_at)
            .bind(s.completed_at)
            .execute(&mut *tx)
            .await
            .map_err(|e| Error::SaveFailed(e.to_string()))?;
        } else {
            let result = sqlx::query(
                "UPDATE supervision_sessions SET status = $1, customers_planned = $2, \
                 customers_visited = $3, skus_recommended = $4, skus_sold = $5, qty_recommended = $6, \
                 qty_actual = $7, redistribution_count = $8, redistribution_qty = $9, \
                 performance_score = $10, record_version = record_version + 1, narrative = $11, \
                 completed_at = $12 \
                 WHERE session_id = $13 AND record_version = $14",
            )
            .bind(s.status.to_string())
            .bind(s.customers_planned)
            .bind(s.customers_visited)
            .bind(s.skus_recommended)
            .bind(s.skus_sold)
            .bind(s.qty_recommended)
            .bind(s.qty_actual)
            .bind(s.redistribution_count)
            .bind(s.redistribution_qty)
            .bind(s.performance_score)
            .bind(&s.narrative)
            .bind(s.completed_at)
            .bind(&s.session_id)
            .bind(s.record_version)
            .execute(&mut *tx)
            .await
            .map_err(|e| Error::SaveFailed(e.to_string()))?;

            if result.rows_affected() == 0 {
                tx.rollback().await.ok();
                return Err(Error::VersionConflict { expected: s.record_version, actual: s.record_version + 1 });
            }
        }

        sqlx::query("DELETE FROM supervision_visits WHERE session_id = $1")
            .bind(&s.session_id)
            .execute(&mut *tx)
            .await
            .map_err(|e| Error::SaveFailed(e.to_string()))?;

        for v in &snapshot.visits {
            sqlx::query(
                "INSERT INTO supervision_visits \
                 (session_id, customer, visit_sequence, visit_timestamp, skus_recommended, skus_sold, \
                  qty_recommended, qty_actual, redistribution_count, redistribution_qty, \
                  customer_performance_score, narrative) \
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)",
            )
            .bind(&s.session_id)
            .bind(&v.customer)
            .bind(v.visit_sequence)
            .bind(v.visit_timestamp)
            .bind(v.skus_recommended)
            .bind(v.skus_sold)
            .bind(v.qty_recommended)
            .bind(v.qty_actual)
            .bind(v.redistribution_count)
            .bind(v.redistribution_qty)
            .bind(v.customer_performance_score)
            .bind(&v.narrative)
            .execute(&mut *tx)
            .await
            .map_err(|e| Error::SaveFailed(e.to_string()))?;
        }

        sqlx::query("DELETE FROM supervision_item_details WHERE session_id = $1")
            .bind(&s.session_id)
            .execute(&mut *tx)
            .await
            .map_err(|e| Error::SaveFailed(e.to_string()))?;

        for d in &snapshot.item_details {
            sqlx::query(
                "INSERT INTO supervision_item_details \
                 (session_id, customer, item, original_recommended_qty, adjusted_recommended_qty, \
                  original_actual_qty, final_actual_qty, was_manually_edited, was_item_sold, tier, \
                  priority_score, van_inventory_qty, days_since_last_purchase, purchase_cycle_days, \
                  purchase_frequency_pct) \
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)",
            )
            .bind(&s.session_id)
            .bind(&d.customer)
            .bind(&d.item)
            .bind(d.original_recommended_qty)
            .bind(d.adjusted_recommended_qty)
            .bind(d.original_actual_qty)
            .bind(d.final_actual_qty)
            .bind(d.was_manually_edited)
            .bind(d.was_item_sold)
            .bind(d.tier.to_string())
            .bind(d.priority_score)
            .bind(d.van_inventory_qty)
            .bind(d.days_since_last_purchase)
            .bind(d.purchase_cycle_days)
            .bind(d.purchase_frequency_pct)
            .execute(&mut *tx)
            .await
            .map_err(|e| Error::SaveFailed(e.to_string()))?;
        }

        tx.commit().await.map_err(|e| Error::SaveFailed(e.to_string()))?;
        Ok(())
    }
}
