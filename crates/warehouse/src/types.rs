//! Core warehouse entities. Identifiers are plain strings: the system treats
//! route, customer, and item codes as opaque stable keys supplied by upstream
//! master data, never as something this crate mints or validates the shape of.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

pub type RouteId = String;
pub type CustomerId = String;
pub type ItemId = String;

/// A declared planned visit: (route, customer, date) appears at most once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct JourneyEntry {
    pub route: RouteId,
    pub customer: CustomerId,
    pub date: NaiveDate,
}

/// Source of truth for what was actually bought on a given date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct SalesFact {
    pub date: NaiveDate,
    pub route: RouteId,
    pub customer: CustomerId,
    pub item: ItemId,
    pub quantity: i32,
    pub unit_price: Decimal,
}

/// Upstream, read-only forecast row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct ForecastRow {
    pub date: NaiveDate,
    pub route: RouteId,
    pub item: ItemId,
    pub predicted_quantity: i32,
    pub prediction_type: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Item {
    pub item: ItemId,
    pub name: Option<String>,
    pub category: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LoadingStatus {
    InProgress,
    Complete,
    Failed,
}

impl std::fmt::Display for LoadingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            LoadingStatus::InProgress => "in_progress",
            LoadingStatus::Complete => "complete",
            LoadingStatus::Failed => "failed",
        };
        write!(f, "{s}")
    }
}

pub(crate) fn now() -> DateTime<Utc> {
    Utc::now()
}
