//! HTTP server for the per-customer/per-SKU order recommendation and
//! live-supervision pipeline.
//!
//! Requests flow through: request-id tagging, then HTTP tracing, then the
//! route handlers, which call straight into the `Orchestrator`. There is no
//! auth layer here - this process sits behind whatever gateway already
//! authenticates van-sales supervisors.

mod handlers;
mod health;
mod middleware;
mod orchestrator;
mod scheduler;
mod state;

use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use orchestrator::{Narrator, Orchestrator};
use std::net::SocketAddr;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer};
use tracing::{info, Level};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use vansales_core::error::Error;
use vansales_core::{Settings, WarehousePool};
use vansales_narrative::{AnalysisBackend, CustomerSnapshot, NarrativeCollaborator, RouteSnapshot};
use vansales_recommend::{PostgresRecommendationStorage, RecommendationEngine};
use vansales_supervision::{PostgresSupervisionStorage, ScoringParams};
use vansales_warehouse::{DataManager, PostgresWarehouseRepository};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();
    info!("starting van-sales recommendation server");

    let settings = Settings::load()?;
    info!("configuration loaded");

    let warehouse_pool = WarehousePool::new(&settings.database).await?;
    info!("warehouse pool connected");

    let repository = Arc::new(PostgresWarehouseRepository::new(warehouse_pool.get().clone()));
    let data_manager = DataManager::new(
        repository,
        settings.engine.history_days,
        settings.engine.journey_window_days,
        std::env::var("COLD_CACHE_DIR").ok().map(std::path::PathBuf::from),
    );
    data_manager.spawn_initial_load();
    info!("data manager started background load");

    let engine = RecommendationEngine::new(settings.engine.clone());
    let recommendation_storage = Arc::new(PostgresRecommendationStorage::new(warehouse_pool.get().clone()));
    let supervision_storage = Arc::new(PostgresSupervisionStorage::new(warehouse_pool.get().clone()));

    let scoring = ScoringParams {
        perfect_zone_low: settings.engine.perfect_zone_low,
        perfect_zone_high: settings.engine.perfect_zone_high,
        accuracy_decay_high: settings.engine.accuracy_decay_high,
    };

    let narrative: Arc<dyn Narrator> = Arc::new(NarrativeCollaborator::with_settings(
        UnimplementedBackend,
        std::time::Duration::from_secs(settings.narrative.customer_cooldown_secs),
        std::time::Duration::from_secs(settings.narrative.route_cooldown_secs),
        std::time::Duration::from_secs(settings.narrative.ttl_hours * 3600),
    ));

    let orchestrator = Arc::new(Orchestrator::new(
        Arc::clone(&data_manager),
        engine,
        recommendation_storage,
        supervision_storage,
        narrative,
        scoring,
    ));

    scheduler::spawn(Arc::clone(&orchestrator), settings.scheduler.clone(), settings.engine.recommendation_retention_days);
    info!(hour = settings.scheduler.hour, minute = settings.scheduler.minute, "daily pre-generation scheduler armed");

    let app_state = state::AppState { orchestrator, data_manager, warehouse_pool };

    let app = build_router(app_state);
    let addr = SocketAddr::from(([0, 0, 0, 0], settings.server.port));
    info!(%addr, "listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).with_graceful_shutdown(shutdown_signal()).await?;

    info!("server shutdown complete");
    Ok(())
}

fn build_router(state: state::AppState) -> Router {
    let api_routes = Router::new()
        .merge(handlers::recommendations::routes())
        .merge(handlers::supervision::routes())
        .merge(handlers::narrative::routes());

    Router::new()
        .nest("/api/v1", api_routes)
        .route("/health", get(health::health_check))
        .route("/ready", get(health::readiness_check))
        .layer(
            ServiceBuilder::new()
                .layer(axum::middleware::from_fn(middleware::request_id_middleware))
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                        .on_request(DefaultOnRequest::new().level(Level::INFO))
                        .on_response(DefaultOnResponse::new().level(Level::INFO)),
                ),
        )
        .with_state(state)
        .fallback(not_found)
}

async fn not_found() -> impl IntoResponse {
    (StatusCode::NOT_FOUND, Json(serde_json::json!({ "error": "resource not found" })))
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "vansales_api=info,tower_http=info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();
}

async fn shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        signal::ctrl_c().await.expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("received ctrl-c"),
        _ = terminate => info!("received terminate signal"),
    }
}

/// The prose-generation method itself is out of scope: this stub refuses
/// every request so misconfiguration is loud instead of silently cached.
struct UnimplementedBackend;

#[async_trait::async_trait]
impl AnalysisBackend for UnimplementedBackend {
    async fn generate_customer(&self, _snapshot: &CustomerSnapshot) -> vansales_core::error::Result<String> {
        Err(Error::BackendUnavailable("no narrative analysis backend is configured".into()))
    }

    async fn generate_route(&self, _snapshot: &RouteSnapshot) -> vansales_core::error::Result<String> {
        Err(Error::BackendUnavailable("no narrative analysis backend is configured".into()))
    }
}
