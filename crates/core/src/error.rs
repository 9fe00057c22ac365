//! Crate-wide error type shared by every component of the recommendation
//! and supervision pipeline.
//!
//! Mirrors the error taxonomy the rest of the system is specified against:
//! each variant maps to exactly one caller-visible error kind, and
//! `category()` / `is_retryable()` / `http_status()` let the HTTP layer and
//! the test suite agree on one mapping instead of duplicating match arms.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("invalid input: {message}")]
    InvalidInput { message: String },

    #[error("data not ready: {0}")]
    DataNotReady(String),

    #[error("insufficient data: {0}")]
    InsufficientData(String),

    #[error("no recommendations for route {route} on {date}")]
    NoRecommendations { route: String, date: String },

    #[error("backend unavailable: {0}")]
    BackendUnavailable(String),

    #[error("storage error: {0}")]
    StorageError(String),

    #[error("session busy: {0}")]
    Busy(String),

    #[error("version conflict: expected {expected}, found {actual}")]
    VersionConflict { expected: i32, actual: i32 },

    #[error("rate limited, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("upstream busy: {0}")]
    UpstreamBusy(String),

    #[error("save failed: {0}")]
    SaveFailed(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("configuration error: {0}")]
    Configuration(#[from] config::ConfigError),

    #[error("internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Coarse grouping used for logging level and metrics, not for the wire format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Validation,
    Transient,
    Domain,
    Storage,
    Concurrency,
    RateLimit,
    Internal,
}

impl Error {
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput { message: message.into() }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::InvalidInput { .. } => ErrorCategory::Validation,
            Error::DataNotReady(_) => ErrorCategory::Transient,
            Error::InsufficientData(_) | Error::NoRecommendations { .. } => ErrorCategory::Domain,
            Error::BackendUnavailable(_) | Error::StorageError(_) | Error::Database(_) => {
                ErrorCategory::Storage
            }
            Error::Busy(_) | Error::VersionConflict { .. } => ErrorCategory::Concurrency,
            Error::RateLimited { .. } | Error::UpstreamBusy(_) => ErrorCategory::RateLimit,
            Error::SaveFailed(_) | Error::Serialization(_) | Error::Configuration(_) | Error::Internal(_) => {
                ErrorCategory::Internal
            }
        }
    }

    /// Whether a caller can reasonably retry the same call unchanged.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Error::DataNotReady(_)
                | Error::BackendUnavailable(_)
                | Error::Busy(_)
                | Error::RateLimited { .. }
                | Error::UpstreamBusy(_)
        )
    }

    #[cfg(feature = "axum")]
    pub fn http_status(&self) -> axum::http::StatusCode {
        use axum::http::StatusCode;
        match self {
            Error::InvalidInput { .. } => StatusCode::BAD_REQUEST,
            Error::DataNotReady(_) => StatusCode::SERVICE_UNAVAILABLE,
            Error::InsufficientData(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Error::NoRecommendations { .. } => StatusCode::NOT_FOUND,
            Error::BackendUnavailable(_) | Error::StorageError(_) | Error::Database(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            Error::Busy(_) => StatusCode::CONFLICT,
            Error::VersionConflict { .. } => StatusCode::CONFLICT,
            Error::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            Error::UpstreamBusy(_) => StatusCode::SERVICE_UNAVAILABLE,
            Error::SaveFailed(_) | Error::Serialization(_) | Error::Configuration(_) | Error::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

#[cfg(feature = "axum")]
impl axum::response::IntoResponse for Error {
    fn into_response(self) -> axum::response::Response {
        use axum::Json;
        use serde_json::json;

        let status = self.http_status();
        let retry_after = match &self {
            Error::RateLimited { retry_after_secs } => Some(*retry_after_secs),
            _ => None,
        };

        let body = Json(json!({
            "error": {
                "message": self.to_string(),
                "kind": error_kind(&self),
                "retry_after_secs": retry_after,
            }
        }));

        (status, body).into_response()
    }
}

#[cfg(feature = "axum")]
fn error_kind(err: &Error) -> &'static str {
    match err {
        Error::InvalidInput { .. } => "invalid_input",
        Error::DataNotReady(_) => "data_not_ready",
        Error::InsufficientData(_) => "insufficient_data",
        Error::NoRecommendations { .. } => "no_recommendations",
        Error::BackendUnavailable(_) => "backend_unavailable",
        Error::StorageError(_) | Error::Database(_) => "storage_error",
        Error::Busy(_) => "busy",
        Error::VersionConflict { .. } => "version_conflict",
        Error::RateLimited { .. } => "rate_limited",
        Error::UpstreamBusy(_) => "upstream_busy",
        Error::SaveFailed(_) => "save_failed",
        Error::Serialization(_) | Error::Configuration(_) | Error::Internal(_) => "internal",
    }
}
