//! Row shapes for the three supervision tables plus the in-memory session
//! state built from them.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use vansales_recommend::Tier;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionStatus {
    Active,
    Completed,
}

impl std::fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            SessionStatus::Active => "ACTIVE",
            SessionStatus::Completed => "COMPLETED",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for SessionStatus {
    type Err = vansales_core::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ACTIVE" => Ok(SessionStatus::Active),
            "COMPLETED" => Ok(SessionStatus::Completed),
            other => Err(vansales_core::Error::invalid_input(format!("unknown session status {other}"))),
        }
    }
}

/// One visited customer's counters as of their most recent `process_visit`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Visit {
    pub customer: String,
    pub visit_sequence: i32,
    pub visit_timestamp: DateTime<Utc>,
    pub skus_recommended: i32,
    pub skus_sold: i32,
    pub qty_recommended: i64,
    pub qty_actual: i64,
    pub redistribution_count: i32,
    pub redistribution_qty: i64,
    pub customer_performance_score: f64,
    pub narrative: Option<String>,
}

/// One (customer, item) line, seeded from the recommendation snapshot at
/// `init` and updated by visits and redistribution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemDetail {
    pub customer: String,
    pub item: String,
    pub original_recommended_qty: i32,
    pub adjusted_recommended_qty: i32,
    pub original_actual_qty: Option<i32>,
    pub final_actual_qty: i32,
    pub was_manually_edited: bool,
    pub was_item_sold: bool,
    pub tier: Tier,
    pub priority_score: f64,
    pub van_inventory_qty: i32,
    pub days_since_last_purchase: i64,
    pub purchase_cycle_days: f64,
    pub purchase_frequency_pct: f64,
    /// Historical average quantity per visit; the redistribution ceiling
    /// (§4.5.2 step 4). Not persisted as its own column - it is derived
    /// again from the recommendation snapshot on every session load.
    #[serde(skip)]
    pub avg_quantity_per_visit: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionRecord {
    pub session_id: String,
    pub route: String,
    pub date: NaiveDate,
    pub status: SessionStatus,
    pub customers_planned: i32,
    pub customers_visited: i32,
    pub skus_recommended: i32,
    pub skus_sold: i32,
    pub qty_recommended: i64,
    pub qty_actual: i64,
    pub redistribution_count: i32,
    pub redistribution_qty: i64,
    pub performance_score: f64,
    pub record_version: i32,
    pub narrative: Option<String>,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

/// Full contents persisted for (or reconstructed as) one session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub session: SessionRecord,
    pub visits: Vec<Visit>,
    pub item_details: Vec<ItemDetail>,
}

/// What `process_visit` hands back to the caller beyond the updated session
/// state: items the visited customer under-bought whose surplus could not be
/// fully pushed onto other unvisited customers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemsNotRedistributed {
    pub item: String,
    pub unredistributed_qty: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessVisitOutcome {
    pub visit: Visit,
    pub items_not_redistributed: Vec<ItemsNotRedistributed>,
}
