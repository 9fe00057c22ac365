//! Warehouse connection pool.
//!
//! One Postgres pool, sized for a single warehouse database: a small set of
//! base connections kept warm, with overflow allowed up to a hard cap during
//! a morning spike (the scheduler's daily pre-generation run plus whatever
//! supervisors are active). There is no per-tenant or per-schema pooling here
//! - that concern belongs to a different kind of system than this one.

use crate::config::DatabaseSettings;
use crate::error::Result;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::time::Duration;
use tracing::info;

#[derive(Clone)]
pub struct WarehousePool {
    pool: PgPool,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct PoolHealth {
    pub pool_size: u32,
    pub in_use: u32,
    pub healthy: bool,
}

impl WarehousePool {
    pub async fn new(settings: &DatabaseSettings) -> Result<Self> {
        let max_connections = settings.connection_pool_size + settings.connection_pool_overflow;
        info!(
            base = settings.connection_pool_size,
            max = max_connections,
            "connecting warehouse pool"
        );

        let pool = PgPoolOptions::new()
            .min_connections(settings.connection_pool_size)
            .max_connections(max_connections)
            .acquire_timeout(Duration::from_secs(settings.checkout_timeout_secs))
            .connect(&settings.url)
            .await?;

        Ok(Self { pool })
    }

    pub fn get(&self) -> &PgPool {
        &self.pool
    }

    pub async fn health(&self) -> PoolHealth {
        let healthy = sqlx::query("SELECT 1").fetch_one(&self.pool).await.is_ok();
        PoolHealth {
            pool_size: self.pool.size(),
            in_use: self.pool.size() - self.pool.num_idle() as u32,
            healthy,
        }
    }
}
