//! Live-supervision endpoints: load a route/date into the active session
//! registry, record a visit, save (complete) a session, or abandon it.

use crate::state::AppState;
use axum::extract::{Path, State};
use axum::response::Json;
use axum::routing::{get, post};
use axum::Router;
use chrono::NaiveDate;
use serde::Deserialize;
use std::collections::HashMap;
use vansales_core::error::Result;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/supervision/:route/:date", get(load_supervision))
        .route("/supervision/:route/:date/visits/:customer", post(process_visit))
        .route("/supervision/:route/:date/save", post(save_session))
        .route("/supervision/:route/:date/abandon", post(abandon_session))
}

async fn load_supervision(
    State(state): State<AppState>,
    Path((route, date)): Path<(String, NaiveDate)>,
) -> Result<Json<serde_json::Value>> {
    let result = state.orchestrator.load_supervision(&route, date).await?;
    Ok(Json(serde_json::json!(result)))
}

#[derive(Debug, Deserialize)]
pub struct ProcessVisitRequest {
    pub actual_sales: HashMap<String, i32>,
}

async fn process_visit(
    State(state): State<AppState>,
    Path((route, date, customer)): Path<(String, NaiveDate, String)>,
    Json(payload): Json<ProcessVisitRequest>,
) -> Result<Json<serde_json::Value>> {
    let outcome = state.orchestrator.process_visit(&route, date, &customer, &payload.actual_sales).await?;
    Ok(Json(serde_json::json!(outcome)))
}

async fn save_session(
    State(state): State<AppState>,
    Path((route, date)): Path<(String, NaiveDate)>,
) -> Result<Json<serde_json::Value>> {
    let snapshot = state.orchestrator.save_session(&route, date).await?;
    Ok(Json(serde_json::json!(snapshot)))
}

async fn abandon_session(
    State(state): State<AppState>,
    Path((route, date)): Path<(String, NaiveDate)>,
) -> Result<Json<serde_json::Value>> {
    state.orchestrator.abandon_session(&route, date).await;
    Ok(Json(serde_json::json!({ "abandoned": true })))
}
