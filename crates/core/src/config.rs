//! Hierarchical configuration for the recommendation and supervision service.
//!
//! Load order, lowest to highest precedence:
//! 1. `config/default.toml`
//! 2. `config/{environment}.toml`, environment selected by `APP_ENVIRONMENT` (default `development`)
//! 3. Environment variables prefixed `APP_`, nested keys separated by `__`
//!
//! Loading fails fast: an invalid pool size, an inverted perfect-zone band, or
//! a scheduler hour outside 0-23 refuses to start rather than running with
//! nonsensical values.

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub database: DatabaseSettings,
    pub engine: EngineSettings,
    pub scheduler: SchedulerSettings,
    pub narrative: NarrativeSettings,
    pub server: ServerSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseSettings {
    pub url: String,
    /// Base reusable warehouse connections.
    pub connection_pool_size: u32,
    /// Additional connections allowed on spike, on top of the base size.
    pub connection_pool_overflow: u32,
    /// Seconds a caller waits for a connection before `BackendUnavailable`.
    pub checkout_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EngineSettings {
    /// Window for history-based features, in days.
    pub history_days: i64,
    /// +/- days loaded around today for the journey plan.
    pub journey_window_days: i64,
    /// Cap on NEW_CUSTOMER proposed quantity.
    pub trial_quantity_ceiling: i32,
    /// Accuracy ratio lower bound of the "perfect zone".
    pub perfect_zone_low: f64,
    /// Accuracy ratio upper bound of the "perfect zone".
    pub perfect_zone_high: f64,
    /// Ratio at which accuracy decays to zero above the perfect zone.
    pub accuracy_decay_high: f64,
    /// Days after which persisted recommendation rows may be evicted.
    pub recommendation_retention_days: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SchedulerSettings {
    pub hour: u32,
    pub minute: u32,
    pub routes: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NarrativeSettings {
    pub customer_cooldown_secs: u64,
    pub route_cooldown_secs: u64,
    pub ttl_hours: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    pub port: u16,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            history_days: 365,
            journey_window_days: 30,
            trial_quantity_ceiling: 3,
            perfect_zone_low: 0.75,
            perfect_zone_high: 1.20,
            accuracy_decay_high: 2.0,
            recommendation_retention_days: 90,
        }
    }
}

impl Default for SchedulerSettings {
    fn default() -> Self {
        Self { hour: 3, minute: 0, routes: Vec::new() }
    }
}

impl Default for NarrativeSettings {
    fn default() -> Self {
        Self { customer_cooldown_secs: 5, route_cooldown_secs: 10, ttl_hours: 24 }
    }
}

impl Settings {
    pub fn load() -> Result<Self, config::ConfigError> {
        let environment = std::env::var("APP_ENVIRONMENT").unwrap_or_else(|_| "development".into());

        let settings = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{environment}")).required(false))
            .add_source(config::Environment::with_prefix("APP").separator("__"))
            .build()?;

        let settings: Settings = settings.try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<(), config::ConfigError> {
        let mut errors = Vec::new();

        if self.database.connection_pool_size == 0 {
            errors.push("database.connection_pool_size must be at least 1".to_string());
        }
        if self.engine.perfect_zone_low >= self.engine.perfect_zone_high {
            errors.push("engine.perfect_zone_low must be less than engine.perfect_zone_high".to_string());
        }
        if self.engine.accuracy_decay_high <= self.engine.perfect_zone_high {
            errors.push("engine.accuracy_decay_high must be greater than engine.perfect_zone_high".to_string());
        }
        if self.scheduler.hour > 23 {
            errors.push("scheduler.hour must be in 0..=23".to_string());
        }
        if self.scheduler.minute > 59 {
            errors.push("scheduler.minute must be in 0..=59".to_string());
        }
        if self.engine.trial_quantity_ceiling < 1 {
            errors.push("engine.trial_quantity_ceiling must be at least 1".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(config::ConfigError::Message(errors.join("; ")))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(perfect_low: f64, perfect_high: f64, scheduler_hour: u32) -> Settings {
        Settings {
            database: DatabaseSettings {
                url: "postgres://localhost/test".into(),
                connection_pool_size: 5,
                connection_pool_overflow: 10,
                checkout_timeout_secs: 30,
            },
            engine: EngineSettings { perfect_zone_low: perfect_low, perfect_zone_high: perfect_high, ..Default::default() },
            scheduler: SchedulerSettings { hour: scheduler_hour, ..Default::default() },
            narrative: NarrativeSettings::default(),
            server: ServerSettings { port: 8080 },
        }
    }

    #[test]
    fn rejects_inverted_perfect_zone() {
        assert!(settings(1.2, 0.75, 3).validate().is_err());
    }

    #[test]
    fn rejects_out_of_range_scheduler_hour() {
        assert!(settings(0.75, 1.2, 25).validate().is_err());
    }

    #[test]
    fn accepts_defaults() {
        assert!(settings(0.75, 1.2, 3).validate().is_ok());
    }
}
