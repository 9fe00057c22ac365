//! Process-wide Data Manager: owns the four in-memory snapshots the engine
//! reads from, loads them once at startup without blocking server readiness,
//! and swaps in a freshly-built set atomically on `refresh()`.

use crate::repository::WarehouseRepository;
use crate::snapshot::{
    CustomerHistorySnapshot, DemandForecastSnapshot, DemandHistorySnapshot, JourneyPlanSnapshot, Snapshots,
    SnapshotRowCounts,
};
use crate::types::LoadingStatus;
use crate::csv_fallback;
use chrono::{Duration, Utc};
use std::path::PathBuf;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{error, info, warn};
use vansales_core::error::Result;
use vansales_core::Error;

const STATUS_IN_PROGRESS: u8 = 0;
const STATUS_COMPLETE: u8 = 1;
const STATUS_FAILED: u8 = 2;

pub struct DataManager {
    repository: Arc<dyn WarehouseRepository>,
    snapshots: RwLock<Arc<Snapshots>>,
    status: AtomicU8,
    history_days: i64,
    journey_window_days: i64,
    cold_cache_dir: Option<PathBuf>,
}

impl DataManager {
    pub fn new(
        repository: Arc<dyn WarehouseRepository>,
        history_days: i64,
        journey_window_days: i64,
        cold_cache_dir: Option<PathBuf>,
    ) -> Arc<Self> {
        Arc::new(Self {
            repository,
            snapshots: RwLock::new(Arc::new(Snapshots::default())),
            status: AtomicU8::new(STATUS_IN_PROGRESS),
            history_days,
            journey_window_days,
            cold_cache_dir,
        })
    }

    /// Spawns the background load. The server is ready to accept requests
    /// the instant this returns; readers see `DataNotReady` until it finishes.
    pub fn spawn_initial_load(self: &Arc<Self>) {
        let manager = Arc::clone(self);
        tokio::spawn(async move {
            manager.reload().await;
        });
    }

    pub fn loading_status(&self) -> LoadingStatus {
        match self.status.load(Ordering::Acquire) {
            STATUS_COMPLETE => LoadingStatus::Complete,
            STATUS_FAILED => LoadingStatus::Failed,
            _ => LoadingStatus::InProgress,
        }
    }

    pub async fn row_counts(&self) -> SnapshotRowCounts {
        self.snapshots.read().await.row_counts()
    }

    pub async fn snapshots(&self) -> Result<Arc<Snapshots>> {
        if self.loading_status() == LoadingStatus::InProgress {
            return Err(Error::DataNotReady("snapshots are still loading".into()));
        }
        Ok(Arc::clone(&*self.snapshots.read().await))
    }

    /// Re-runs all four loads and atomically swaps the snapshot set. Readers
    /// never observe a mix of old and new snapshots: the swap is a single
    /// pointer replace under the write lock, not a row-level rewrite.
    pub async fn reload(&self) {
        info!("data manager: reload started");
        let today = Utc::now().date_naive();
        let history_since = today - Duration::days(self.history_days);
        let journey_from = today - Duration::days(self.journey_window_days);
        let journey_to = today + Duration::days(self.journey_window_days);

        let demand_history = self.repository.fetch_customer_history(history_since, today).await;
        let journey_plan = self.repository.fetch_journey_plan(journey_from, journey_to).await;

        match (demand_history, journey_plan) {
            (Ok(sales), Ok(journey)) => {
                let as_of = Some(Utc::now());
                let mut new_snapshots = Snapshots {
                    demand_history: DemandHistorySnapshot { rows: sales.clone(), as_of },
                    demand_forecast: DemandForecastSnapshot::default(),
                    customer_history: CustomerHistorySnapshot::from_rows(sales),
                    journey_plan: JourneyPlanSnapshot { rows: journey, as_of },
                };

                // Covers the same window the journey plan does, so a route's
                // recommendations can be generated for any date in it, not just today.
                for route in new_snapshots.journey_plan.rows.iter().map(|e| e.route.clone()).collect::<std::collections::HashSet<_>>() {
                    if let Ok(rows) = self.repository.fetch_forecast(&route, journey_from, journey_to).await {
                        new_snapshots.demand_forecast.rows.extend(rows);
                    }
                }
                new_snapshots.demand_forecast.as_of = as_of;

                *self.snapshots.write().await = Arc::new(new_snapshots);
                self.status.store(STATUS_COMPLETE, Ordering::Release);
                info!("data manager: reload complete");
            }
            (demand_history, journey_plan) => {
                let err = demand_history.err().or(journey_plan.err()).unwrap();
                error!(error = %err, "data manager: reload failed, attempting cold-start fallback");
                self.status.store(STATUS_FAILED, Ordering::Release);
                self.try_cold_cache().await;
            }
        }
    }

    async fn try_cold_cache(&self) {
        let Some(dir) = &self.cold_cache_dir else {
            return;
        };
        if !dir.exists() {
            warn!(?dir, "no cold-start cache directory present, leaving last snapshot in place");
            return;
        }

        let dir = dir.clone();
        let loaded = tokio::task::spawn_blocking(move || csv_fallback::load_cold_cache_dir(&dir)).await;

        if let Ok((demand_history, demand_forecast, customer_history, journey_plan)) = loaded {
            *self.snapshots.write().await = Arc::new(Snapshots {
                demand_history,
                demand_forecast,
                customer_history,
                journey_plan,
            });
            info!("data manager: cold-start cache loaded");
        }
    }
}
