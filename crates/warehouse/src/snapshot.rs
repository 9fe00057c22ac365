//! In-memory tabular snapshots the engine reads from. Columns are pinned at
//! load time — there is no dynamic, duck-typed frame here, just plain
//! structs in a `Vec`.

use crate::types::{ForecastRow, JourneyEntry, SalesFact};
use chrono::{DateTime, Utc};
use std::collections::HashMap;

#[derive(Debug, Clone, Default)]
pub struct DemandHistorySnapshot {
    pub rows: Vec<SalesFact>,
    pub as_of: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default)]
pub struct DemandForecastSnapshot {
    pub rows: Vec<ForecastRow>,
    pub as_of: Option<DateTime<Utc>>,
}

/// Per-customer sales history, indexed for the feature-extraction hot path.
#[derive(Debug, Clone, Default)]
pub struct CustomerHistorySnapshot {
    pub by_customer: HashMap<String, Vec<SalesFact>>,
    pub as_of: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default)]
pub struct JourneyPlanSnapshot {
    pub rows: Vec<JourneyEntry>,
    pub as_of: Option<DateTime<Utc>>,
}

impl CustomerHistorySnapshot {
    pub fn from_rows(rows: Vec<SalesFact>) -> Self {
        let mut by_customer: HashMap<String, Vec<SalesFact>> = HashMap::new();
        for row in rows {
            by_customer.entry(row.customer.clone()).or_default().push(row);
        }
        Self { by_customer, as_of: Some(Utc::now()) }
    }

    pub fn for_customer(&self, customer: &str) -> &[SalesFact] {
        self.by_customer.get(customer).map(Vec::as_slice).unwrap_or(&[])
    }
}

#[derive(Debug, Clone, Default)]
pub struct Snapshots {
    pub demand_history: DemandHistorySnapshot,
    pub demand_forecast: DemandForecastSnapshot,
    pub customer_history: CustomerHistorySnapshot,
    pub journey_plan: JourneyPlanSnapshot,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct SnapshotRowCounts {
    pub demand_history: usize,
    pub demand_forecast: usize,
    pub customer_history: usize,
    pub journey_plan: usize,
}

impl Snapshots {
    pub fn row_counts(&self) -> SnapshotRowCounts {
        SnapshotRowCounts {
            demand_history: self.demand_history.rows.len(),
            demand_forecast: self.demand_forecast.rows.len(),
            customer_history: self.customer_history.by_customer.values().map(Vec::len).sum(),
            journey_plan: self.journey_plan.rows.len(),
        }
    }

    pub fn roster(&self, route: &str, date: chrono::NaiveDate) -> Vec<String> {
        let mut customers: Vec<String> = self
            .journey_plan
            .rows
            .iter()
            .filter(|e| e.route == route && e.date == date)
            .map(|e| e.customer.clone())
            .collect();
        customers.sort();
        customers.dedup();
        customers
    }
}
