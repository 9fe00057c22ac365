//! Narrative endpoints: on-demand prose for one customer's visit or a
//! route's overall performance, subject to the collaborator's caching,
//! rate limiting, and cancellation.

use crate::state::AppState;
use axum::extract::State;
use axum::response::Json;
use axum::routing::post;
use axum::Router;
use serde::Deserialize;
use vansales_core::error::Result;
use vansales_narrative::{CustomerSnapshot, RouteSnapshot};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/narrative/customer", post(analyze_customer))
        .route("/narrative/route", post(analyze_route))
}

#[derive(Debug, Deserialize)]
pub struct CustomerNarrativeRequest {
    pub session_id: String,
    pub customer: String,
    pub items: Vec<(String, i32, i32)>,
    pub score: f64,
}

async fn analyze_customer(
    State(state): State<AppState>,
    Json(payload): Json<CustomerNarrativeRequest>,
) -> Result<Json<serde_json::Value>> {
    let snapshot = CustomerSnapshot {
        session_id: payload.session_id,
        customer: payload.customer,
        items: payload.items,
        score: payload.score,
    };
    let text = state.orchestrator.analyze_customer(snapshot).await?;
    Ok(Json(serde_json::json!({ "narrative": text })))
}

#[derive(Debug, Deserialize)]
pub struct RouteNarrativeRequest {
    pub session_id: String,
    pub route: String,
    pub customers: Vec<(String, f64)>,
    pub route_score: f64,
}

async fn analyze_route(
    State(state): State<AppState>,
    Json(payload): Json<RouteNarrativeRequest>,
) -> Result<Json<serde_json::Value>> {
    let snapshot = RouteSnapshot {
        session_id: payload.session_id,
        route: payload.route,
        customers: payload.customers,
        route_score: payload.route_score,
    };
    let text = state.orchestrator.analyze_route(snapshot).await?;
    Ok(Json(serde_json::json!({ "narrative": text })))
}
