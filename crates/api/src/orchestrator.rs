//! The Orchestrator (C8): wires the Data Manager, Recommendation Engine,
//! Recommendation Storage, Supervision Session, and Narrative Collaborator
//! behind the handful of operations the HTTP layer actually calls.

use async_trait::async_trait;
use chrono::NaiveDate;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use vansales_core::error::Result;
use vansales_core::Error;
use vansales_narrative::{AnalysisBackend, CustomerSnapshot, NarrativeCollaborator, RouteSnapshot};
use vansales_recommend::{GenerationLock, RecommendationEngine, RecommendationRow, RecommendationStorage};
use vansales_supervision::{ProcessVisitOutcome, ScoringParams, SessionRegistry, SessionSnapshot, SupervisionStorage};
use vansales_warehouse::DataManager;

#[derive(Debug, Clone, Default)]
pub struct RecommendationFilters {
    pub routes: Option<Vec<String>>,
    pub customers: Option<Vec<String>>,
    pub items: Option<Vec<String>>,
}

#[derive(Debug, Clone, serde::Serialize)]
pub enum RecommendationSource {
    Database,
    Generated,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct GetRecommendationsResult {
    pub rows: Vec<RecommendationRow>,
    pub source: RecommendationSource,
}

#[derive(Debug, Clone, serde::Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PreGenerateOutcome {
    Skipped { existing_count: usize },
    Generated { row_count: usize, duration_ms: u64 },
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct PreGenerateResult {
    pub route: String,
    pub outcome: PreGenerateOutcome,
}

#[derive(Debug, Clone, serde::Serialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum SupervisionLoad {
    Historical { session: SessionSnapshot },
    Live { session_id: Option<String> },
}

/// Narrative collaborator behind a trait object so the orchestrator does not
/// need to be generic over the analysis backend.
#[async_trait]
pub trait Narrator: Send + Sync {
    async fn analyze_customer(&self, snapshot: CustomerSnapshot) -> Result<String>;
    async fn analyze_route(&self, snapshot: RouteSnapshot) -> Result<String>;
    fn abandon_session(&self, session_id: &str);
}

#[async_trait]
impl<B: AnalysisBackend + 'static> Narrator for NarrativeCollaborator<B> {
    async fn analyze_customer(&self, snapshot: CustomerSnapshot) -> Result<String> {
        NarrativeCollaborator::analyze_customer(self, snapshot).await
    }

    async fn analyze_route(&self, snapshot: RouteSnapshot) -> Result<String> {
        NarrativeCollaborator::analyze_route(self, snapshot).await
    }

    fn abandon_session(&self, session_id: &str) {
        NarrativeCollaborator::abandon_session(self, session_id)
    }
}

pub struct Orchestrator {
    data_manager: Arc<DataManager>,
    engine: RecommendationEngine,
    storage: Arc<dyn RecommendationStorage>,
    generation_lock: GenerationLock,
    supervision_storage: Arc<dyn SupervisionStorage>,
    registry: SessionRegistry,
    narrative: Arc<dyn Narrator>,
    scoring: ScoringParams,
}

impl Orchestrator {
    pub fn new(
        data_manager: Arc<DataManager>,
        engine: RecommendationEngine,
        storage: Arc<dyn RecommendationStorage>,
        supervision_storage: Arc<dyn SupervisionStorage>,
        narrative: Arc<dyn Narrator>,
        scoring: ScoringParams,
    ) -> Self {
        Self {
            data_manager,
            engine,
            storage,
            generation_lock: GenerationLock::new(),
            supervision_storage,
            registry: SessionRegistry::new(),
            narrative,
            scoring,
        }
    }

    pub async fn get_recommendations(
        &self,
        date: NaiveDate,
        route: &str,
        filters: RecommendationFilters,
    ) -> Result<GetRecommendationsResult> {
        let existing = self.storage.get(date, route).await?;
        let (rows, source) = if !existing.is_empty() {
            (existing, RecommendationSource::Database)
        } else {
            let key_lock = self.generation_lock.key(route, date);
            let _guard = key_lock.lock().await;

            let existing = self.storage.get(date, route).await?;
            if !existing.is_empty() {
                (existing, RecommendationSource::Database)
            } else {
                let snapshots = self.data_manager.snapshots().await?;
                let generated = self.engine.generate(route, date, &snapshots)?;
                self.storage.save(date, route, &generated).await?;
                (generated, RecommendationSource::Generated)
            }
        };

        Ok(GetRecommendationsResult { rows: apply_filters(rows, &filters), source })
    }

    pub async fn pre_generate_daily(&self, date: NaiveDate, routes: &[String]) -> Vec<PreGenerateResult> {
        let mut results = Vec::with_capacity(routes.len());

        for route in routes {
            let existing = match self.storage.get(date, route).await {
                Ok(rows) => rows,
                Err(err) => {
                    tracing::warn!(%route, %err, "pre-generation storage read failed");
                    continue;
                }
            };

            if !existing.is_empty() {
                results.push(PreGenerateResult {
                    route: route.clone(),
                    outcome: PreGenerateOutcome::Skipped { existing_count: existing.len() },
                });
                continue;
            }

            let started = Instant::now();
            let outcome = match self.data_manager.snapshots().await {
                Ok(snapshots) => match self.engine.generate(route, date, &snapshots) {
                    Ok(rows) => match self.storage.save(date, route, &rows).await {
                        Ok(()) => PreGenerateOutcome::Generated {
                            row_count: rows.len(),
                            duration_ms: started.elapsed().as_millis() as u64,
                        },
                        Err(err) => {
                            tracing::warn!(%route, %err, "pre-generation save failed");
                            continue;
                        }
                    },
                    Err(err) => {
                        tracing::warn!(%route, %err, "pre-generation failed");
                        continue;
                    }
                },
                Err(err) => {
                    tracing::warn!(%route, %err, "pre-generation skipped: data not ready");
                    continue;
                }
            };

            results.push(PreGenerateResult { route: route.clone(), outcome });
        }

        results
    }

    /// Deletes persisted recommendation rows older than `retention_days`
    /// before today. Called by the scheduler once per run, not per request.
    pub async fn enforce_retention(&self, today: NaiveDate, retention_days: i64) -> Result<u64> {
        let cutoff = today - chrono::Duration::days(retention_days);
        self.storage.delete_older_than(cutoff).await
    }

    pub async fn load_supervision(&self, route: &str, date: NaiveDate) -> Result<SupervisionLoad> {
        if let Some(snapshot) = self.supervision_storage.load(route, date).await? {
            return Ok(SupervisionLoad::Historical { session: snapshot });
        }

        if let Some(handle) = self.registry.get(route, date) {
            let session = handle.lock().await;
            return Ok(SupervisionLoad::Live { session_id: Some(session.session_id.clone()) });
        }

        let recommendations = self.storage.get(date, route).await?;
        if recommendations.is_empty() {
            return Ok(SupervisionLoad::Live { session_id: None });
        }

        let roster: Vec<String> = {
            let mut customers: Vec<String> = recommendations.iter().map(|r| r.customer.clone()).collect();
            customers.sort();
            customers.dedup();
            customers
        };

        let handle = self.registry.init(route, date, roster, &recommendations, self.scoring)?;
        let session = handle.lock().await;
        Ok(SupervisionLoad::Live { session_id: Some(session.session_id.clone()) })
    }

    pub async fn process_visit(
        &self,
        route: &str,
        date: NaiveDate,
        customer: &str,
        actual_sales_map: &HashMap<String, i32>,
    ) -> Result<ProcessVisitOutcome> {
        self.registry.process_visit(route, date, customer, actual_sales_map).await
    }

    pub async fn save_session(&self, route: &str, date: NaiveDate) -> Result<SessionSnapshot> {
        let handle = self
            .registry
            .get(route, date)
            .ok_or_else(|| Error::invalid_input(format!("no active session for {route} on {date}")))?;

        let mut session = handle.lock().await;
        session.complete();

        let snapshot = SessionSnapshot {
            session: session.to_record(),
            visits: session.visits(),
            item_details: session.item_details(),
        };

        self.supervision_storage.save(&snapshot).await?;
        session.bump_record_version();
        drop(session);

        self.registry.remove(route, date);
        Ok(snapshot)
    }

    pub async fn abandon_session(&self, route: &str, date: NaiveDate) {
        if let Some(handle) = self.registry.get(route, date) {
            let session_id = handle.lock().await.session_id.clone();
            self.narrative.abandon_session(&session_id);
        }
        self.registry.remove(route, date);
    }

    pub async fn analyze_customer(&self, snapshot: CustomerSnapshot) -> Result<String> {
        self.narrative.analyze_customer(snapshot).await
    }

    pub async fn analyze_route(&self, snapshot: RouteSnapshot) -> Result<String> {
        self.narrative.analyze_route(snapshot).await
    }
}

fn apply_filters(rows: Vec<RecommendationRow>, filters: &RecommendationFilters) -> Vec<RecommendationRow> {
    rows.into_iter()
        .filter(|r| filters.routes.as_ref().map_or(true, |v| v.contains(&r.route)))
        .filter(|r| filters.customers.as_ref().map_or(true, |v| v.contains(&r.customer)))
        .filter(|r| filters.items.as_ref().map_or(true, |v| v.contains(&r.item)))
        .collect()
}
