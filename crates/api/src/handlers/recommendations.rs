//! Recommendation endpoints: fetch-or-generate, and the manual trigger an
//! operator can use to force a route's pre-generation outside the scheduler.

use crate::orchestrator::RecommendationFilters;
use crate::state::AppState;
use axum::extract::{Path, Query, State};
use axum::response::Json;
use axum::routing::{get, post};
use axum::Router;
use chrono::NaiveDate;
use serde::Deserialize;
use vansales_core::error::Result;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/recommendations/:route/:date", get(get_recommendations))
        .route("/recommendations/:route/:date/generate", post(generate_recommendations))
}

#[derive(Debug, Deserialize)]
pub struct RecommendationQuery {
    pub customers: Option<String>,
    pub items: Option<String>,
}

fn split_csv(value: Option<String>) -> Option<Vec<String>> {
    value.map(|v| v.split(',').map(|s| s.trim().to_string()).filter(|s| !s.is_empty()).collect())
}

async fn get_recommendations(
    State(state): State<AppState>,
    Path((route, date)): Path<(String, NaiveDate)>,
    Query(query): Query<RecommendationQuery>,
) -> Result<Json<serde_json::Value>> {
    let filters = RecommendationFilters {
        routes: Some(vec![route.clone()]),
        customers: split_csv(query.customers),
        items: split_csv(query.items),
    };

    let result = state.orchestrator.get_recommendations(date, &route, filters).await?;
    Ok(Json(serde_json::json!(result)))
}

async fn generate_recommendations(
    State(state): State<AppState>,
    Path((route, date)): Path<(String, NaiveDate)>,
) -> Result<Json<serde_json::Value>> {
    let results = state.orchestrator.pre_generate_daily(date, std::slice::from_ref(&route)).await;
    Ok(Json(serde_json::json!(results)))
}
