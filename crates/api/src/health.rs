//! Liveness and readiness endpoints.
//!
//! `/health` always returns 200 while the process is up. `/ready` additionally
//! checks the warehouse pool and the in-memory snapshot load - a pod should
//! not receive traffic until both are healthy.

use crate::state::AppState;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;
use vansales_warehouse::LoadingStatus;

pub async fn health_check() -> impl IntoResponse {
    Json(json!({
        "status": "healthy",
        "service": "vansales-api",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

pub async fn readiness_check(State(state): State<AppState>) -> impl IntoResponse {
    let pool_health = state.warehouse_pool.health().await;
    let snapshots_ready = state.data_manager.loading_status() == LoadingStatus::Complete;
    let row_counts = state.data_manager.row_counts().await;

    let ready = pool_health.healthy && snapshots_ready;
    let status = if ready { StatusCode::OK } else { StatusCode::SERVICE_UNAVAILABLE };

    (
        status,
        Json(json!({
            "ready": ready,
            "checks": {
                "database": pool_health.healthy,
                "snapshots_loaded": snapshots_ready,
            },
            "row_counts": row_counts,
        })),
    )
}
