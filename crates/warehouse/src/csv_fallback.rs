//! Cold-start fallback: when the warehouse cannot be reached at startup, load
//! the most recent on-disk CSV snapshot instead of coming up with nothing.
//! Not part of the primary data plane and never required to be in sync.

use crate::snapshot::{CustomerHistorySnapshot, DemandForecastSnapshot, DemandHistorySnapshot, JourneyPlanSnapshot};
use crate::types::{ForecastRow, JourneyEntry, SalesFact};
use chrono::Utc;
use std::path::Path;
use tracing::warn;
use vansales_core::error::Result;

pub fn load_sales_csv(path: &Path) -> Result<Vec<SalesFact>> {
    let mut reader = csv::Reader::from_path(path).map_err(|e| {
        warn!(?path, error = %e, "failed to open cold-start sales CSV");
        vansales_core::Error::StorageError(e.to_string())
    })?;

    let mut rows = Vec::new();
    for record in reader.deserialize() {
        let row: SalesFact = record.map_err(|e| vansales_core::Error::StorageError(e.to_string()))?;
        rows.push(row);
    }
    Ok(rows)
}

pub fn load_forecast_csv(path: &Path) -> Result<Vec<ForecastRow>> {
    let mut reader = csv::Reader::from_path(path).map_err(|e| vansales_core::Error::StorageError(e.to_string()))?;
    let mut rows = Vec::new();
    for record in reader.deserialize() {
        let row: ForecastRow = record.map_err(|e| vansales_core::Error::StorageError(e.to_string()))?;
        rows.push(row);
    }
    Ok(rows)
}

pub fn load_journey_csv(path: &Path) -> Result<Vec<JourneyEntry>> {
    let mut reader = csv::Reader::from_path(path).map_err(|e| vansales_core::Error::StorageError(e.to_string()))?;
    let mut rows = Vec::new();
    for record in reader.deserialize() {
        let row: JourneyEntry = record.map_err(|e| vansales_core::Error::StorageError(e.to_string()))?;
        rows.push(row);
    }
    Ok(rows)
}

/// Attempts to build every snapshot from a directory of CSVs named
/// `sales.csv`, `forecast.csv`, and `journey_plan.csv`. Missing files yield
/// empty snapshots rather than failing the whole fallback.
pub fn load_cold_cache_dir(dir: &Path) -> (DemandHistorySnapshot, DemandForecastSnapshot, CustomerHistorySnapshot, JourneyPlanSnapshot) {
    let as_of = Some(Utc::now());

    let sales = load_sales_csv(&dir.join("sales.csv")).unwrap_or_default();
    let forecast = load_forecast_csv(&dir.join("forecast.csv")).unwrap_or_default();
    let journey = load_journey_csv(&dir.join("journey_plan.csv")).unwrap_or_default();

    let demand_history = DemandHistorySnapshot { rows: sales.clone(), as_of };
    let demand_forecast = DemandForecastSnapshot { rows: forecast, as_of };
    let customer_history = CustomerHistorySnapshot::from_rows(sales);
    let journey_plan = JourneyPlanSnapshot { rows: journey, as_of };

    (demand_history, demand_forecast, customer_history, journey_plan)
}
