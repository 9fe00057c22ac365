pub mod config;
pub mod database;
pub mod error;

pub use config::Settings;
pub use database::{PoolHealth, WarehousePool};
pub use error::{Error, ErrorCategory, Result};

pub use chrono::{DateTime, Utc};
pub use uuid::Uuid;
