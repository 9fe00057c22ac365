use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Tier {
    MustStock,
    ShouldStock,
    Consider,
    Monitor,
    NewCustomer,
}

impl std::fmt::Display for Tier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Tier::MustStock => "MUST_STOCK",
            Tier::ShouldStock => "SHOULD_STOCK",
            Tier::Consider => "CONSIDER",
            Tier::Monitor => "MONITOR",
            Tier::NewCustomer => "NEW_CUSTOMER",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for Tier {
    type Err = vansales_core::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "MUST_STOCK" => Ok(Tier::MustStock),
            "SHOULD_STOCK" => Ok(Tier::ShouldStock),
            "CONSIDER" => Ok(Tier::Consider),
            "MONITOR" => Ok(Tier::Monitor),
            "NEW_CUSTOMER" => Ok(Tier::NewCustomer),
            other => Err(vansales_core::Error::invalid_input(format!("unknown tier {other}"))),
        }
    }
}

/// One generated row: a recommended quantity of one item for one customer
/// on one (route, date), bounded by the van's allocation for that item.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecommendationRow {
    pub date: NaiveDate,
    pub route: String,
    pub customer: String,
    pub item: String,
    pub recommended_quantity: i32,
    pub tier: Tier,
    pub van_load: i32,
    pub priority_score: f64,
    pub avg_quantity_per_visit: i32,
    pub days_since_last_purchase: i64,
    pub purchase_cycle_days: f64,
    pub frequency_percent: f64,
    pub generated_at: DateTime<Utc>,
    pub generated_by: String,
}
