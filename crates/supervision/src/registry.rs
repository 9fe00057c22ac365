//! In-process registry of live sessions. Owns the single-writer guarantee
//! from §5: each session is held behind its own mutex, and a failed
//! `try_lock` - meaning another call for the same session is already running
//! - surfaces as `Busy` rather than queueing.

use crate::session::Session;
use chrono::NaiveDate;
use dashmap::DashMap;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use vansales_core::error::Result;
use vansales_core::Error;
use vansales_recommend::RecommendationRow;

type Key = (String, NaiveDate);

#[derive(Default)]
pub struct SessionRegistry {
    sessions: DashMap<Key, Arc<Mutex<Session>>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self { sessions: DashMap::new() }
    }

    pub fn get(&self, route: &str, date: NaiveDate) -> Option<Arc<Mutex<Session>>> {
        self.sessions.get(&(route.to_string(), date)).map(|s| s.clone())
    }

    pub fn insert(&self, route: &str, date: NaiveDate, session: Session) -> Arc<Mutex<Session>> {
        let handle = Arc::new(Mutex::new(session));
        self.sessions.insert((route.to_string(), date), handle.clone());
        handle
    }

    pub fn remove(&self, route: &str, date: NaiveDate) {
        self.sessions.remove(&(route.to_string(), date));
    }

    pub fn init(
        &self,
        route: &str,
        date: NaiveDate,
        roster: Vec<String>,
        recommendations: &[RecommendationRow],
        scoring: crate::session::ScoringParams,
    ) -> Result<Arc<Mutex<Session>>> {
        let session = Session::init(route, date, roster, recommendations, scoring)?;
        Ok(self.insert(route, date, session))
    }

    pub async fn process_visit(
        &self,
        route: &str,
        date: NaiveDate,
        customer: &str,
        actual_sales_map: &HashMap<String, i32>,
    ) -> Result<crate::types::ProcessVisitOutcome> {
        let handle = self
            .get(route, date)
            .ok_or_else(|| Error::invalid_input(format!("no active session for {route} on {date}")))?;

        let mut guard = handle
            .try_lock()
            .map_err(|_| Error::Busy(format!("session {route}_{date} is already processing a visit")))?;

        guard.process_visit(customer, actual_sales_map).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vansales_recommend::Tier;

    fn rec(customer: &str, item: &str) -> RecommendationRow {
        RecommendationRow {
            date: NaiveDate::from_ymd_opt(2025, 10, 9).unwrap(),
            route: "R1".into(),
            customer: customer.into(),
            item: item.into(),
            recommended_quantity: 5,
            tier: Tier::MustStock,
            van_load: 50,
            priority_score: 10.0,
            avg_quantity_per_visit: 5,
            days_since_last_purchase: 10,
            purchase_cycle_days: 14.0,
            frequency_percent: 80.0,
            generated_at: chrono::Utc::now(),
            generated_by: "test".into(),
        }
    }

    #[tokio::test]
    async fn concurrent_process_visit_calls_return_busy() {
        let registry = SessionRegistry::new();
        let date = NaiveDate::from_ymd_opt(2025, 10, 9).unwrap();
        let recs = vec![rec("C-A", "X")];
        registry
            .init("R1", date, vec!["C-A".into()], &recs, crate::session::ScoringParams::default())
            .unwrap();

        let handle = registry.get("R1", date).unwrap();
        let _held = handle.try_lock().unwrap();

        let err = registry.process_visit("R1", date, "C-A", &HashMap::new()).await.unwrap_err();
        assert!(matches!(err, Error::Busy(_)));
    }

    #[tokio::test]
    async fn missing_session_is_invalid_input() {
        let registry = SessionRegistry::new();
        let date = NaiveDate::from_ymd_opt(2025, 10, 9).unwrap();
        let err = registry.process_visit("R1", date, "C-A", &HashMap::new()).await.unwrap_err();
        assert!(matches!(err, Error::InvalidInput { .. }));
    }
}
