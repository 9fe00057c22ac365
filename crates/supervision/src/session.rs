//! The Supervision Session (C5): the live, in-memory state of one route's
//! supervised day. This is the hardest stateful subsystem in the pipeline -
//! everything here mirrors §4.5 of the live-supervision model.

use crate::scoring::{accuracy, coverage, score};
use crate::types::{ItemDetail, ItemsNotRedistributed, ProcessVisitOutcome, SessionRecord, SessionStatus, Visit};
use chrono::{NaiveDate, Utc};
use rand::Rng;
use std::collections::{HashMap, HashSet};
use vansales_core::error::Result;
use vansales_core::Error;
use vansales_recommend::RecommendationRow;

#[derive(Debug, Clone, Copy)]
pub struct ScoringParams {
    pub perfect_zone_low: f64,
    pub perfect_zone_high: f64,
    pub accuracy_decay_high: f64,
}

impl Default for ScoringParams {
    fn default() -> Self {
        Self { perfect_zone_low: 0.75, perfect_zone_high: 1.20, accuracy_decay_high: 2.0 }
    }
}

pub struct Session {
    pub session_id: String,
    pub route: String,
    pub date: NaiveDate,
    status: SessionStatus,
    read_only: bool,
    roster: Vec<String>,
    item_details: HashMap<(String, String), ItemDetail>,
    visits: HashMap<String, Visit>,
    visit_order: Vec<String>,
    started_at: chrono::DateTime<Utc>,
    completed_at: Option<chrono::DateTime<Utc>>,
    record_version: i32,
    narrative: Option<String>,
    scoring: ScoringParams,
}

fn new_session_id(route: &str, date: NaiveDate) -> String {
    let now = Utc::now();
    let suffix: String = {
        let mut rng = rand::thread_rng();
        (0..8).map(|_| rng.sample(rand::distributions::Alphanumeric) as char).collect()
    };
    format!("{route}_{date}_{}_{suffix}", now.format("%Y%m%d%H%M%S%6f"))
}

impl Session {
    /// `UNINITIALIZED -> ACTIVE`. Fails with `NoRecommendations` if the
    /// snapshot for (route, date) is empty.
    pub fn init(
        route: &str,
        date: NaiveDate,
        roster: Vec<String>,
        recommendations: &[RecommendationRow],
        scoring: ScoringParams,
    ) -> Result<Self> {
        if recommendations.is_empty() {
            return Err(Error::NoRecommendations { route: route.to_string(), date: date.to_string() });
        }

        let mut item_details = HashMap::new();
        for rec in recommendations {
            item_details.insert(
                (rec.customer.clone(), rec.item.clone()),
                ItemDetail {
                    customer: rec.customer.clone(),
                    item: rec.item.clone(),
                    original_recommended_qty: rec.recommended_quantity,
                    adjusted_recommended_qty: rec.recommended_quantity,
                    original_actual_qty: None,
                    final_actual_qty: 0,
                    was_manually_edited: false,
                    was_item_sold: false,
                    tier: rec.tier,
                    priority_score: rec.priority_score,
                    van_inventory_qty: rec.van_load,
                    days_since_last_purchase: rec.days_since_last_purchase,
                    purchase_cycle_days: rec.purchase_cycle_days,
                    purchase_frequency_pct: rec.frequency_percent,
                    avg_quantity_per_visit: rec.avg_quantity_per_visit,
                },
            );
        }

        Ok(Self {
            session_id: new_session_id(route, date),
            route: route.to_string(),
            date,
            status: SessionStatus::Active,
            read_only: false,
            roster,
            item_details,
            visits: HashMap::new(),
            visit_order: Vec::new(),
            started_at: Utc::now(),
            completed_at: None,
            record_version: 0,
            narrative: None,
            scoring,
        })
    }

    /// Reconstructs a completed, read-only session from its persisted rows.
    pub fn from_snapshot(
        record: SessionRecord,
        visits: Vec<Visit>,
        item_details: Vec<ItemDetail>,
        roster: Vec<String>,
    ) -> Self {
        let visit_order = {
            let mut ordered = visits.clone();
            ordered.sort_by_key(|v| v.visit_sequence);
            ordered.into_iter().map(|v| v.customer).collect()
        };

        Self {
            session_id: record.session_id,
            route: record.route,
            date: record.date,
            status: record.status,
            read_only: true,
            roster,
            item_details: item_details.into_iter().map(|d| ((d.customer.clone(), d.item.clone()), d)).collect(),
            visits: visits.into_iter().map(|v| (v.customer.clone(), v)).collect(),
            visit_order,
            started_at: record.started_at,
            completed_at: record.completed_at,
            record_version: record.record_version,
            narrative: record.narrative,
            scoring: ScoringParams::default(),
        }
    }

    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    pub fn status(&self) -> SessionStatus {
        self.status
    }

    /// Single-writer serialization (`Busy` on overlapping calls) is enforced
    /// by whoever holds the session - see `registry::SessionHandle`, which
    /// wraps this in a `try_lock`'d mutex rather than duplicating that
    /// bookkeeping in here.
    pub async fn process_visit(&mut self, customer: &str, actual_sales_map: &HashMap<String, i32>) -> Result<ProcessVisitOutcome> {
        if self.read_only || self.status != SessionStatus::Active {
            return Err(Error::invalid_input("session is not active"));
        }
        if !self.roster.contains(&customer.to_string()) {
            return Err(Error::invalid_input(format!("{customer} is not on the planned roster")));
        }

        let visit_sequence = match self.visits.get(customer) {
            Some(existing) => existing.visit_sequence,
            None => self.visits.values().map(|v| v.visit_sequence).max().unwrap_or(0) + 1,
        };
        let visit_timestamp = Utc::now();

        let customer_items: Vec<String> = self
            .item_details
            .keys()
            .filter(|(c, _)| c == customer)
            .map(|(_, item)| item.clone())
            .collect();

        for item in &customer_items {
            let actual = *actual_sales_map.get(item).unwrap_or(&0);
            if !(0..=999_999).contains(&actual) {
                return Err(Error::invalid_input(format!("actual quantity for {item} out of range: {actual}")));
            }
        }

        let mut skus_sold = 0i32;
        let mut qty_actual_total = 0i64;
        let mut qty_recommended_total = 0i64;
        let mut surpluses: Vec<(String, i32)> = Vec::new();

        for item in &customer_items {
            let key = (customer.to_string(), item.clone());
            let actual = *actual_sales_map.get(item).unwrap_or(&0);
            let detail = self.item_details.get_mut(&key).expect("seeded at init");

            detail.was_manually_edited = detail.adjusted_recommended_qty != detail.original_recommended_qty;
            if detail.original_actual_qty.is_none() {
                detail.original_actual_qty = Some(actual);
            }
            detail.final_actual_qty = actual;
            detail.was_item_sold = actual > 0;

            qty_recommended_total += detail.adjusted_recommended_qty as i64;
            qty_actual_total += actual as i64;
            if actual > 0 {
                skus_sold += 1;
            }
            if actual < detail.adjusted_recommended_qty {
                surpluses.push((item.clone(), detail.adjusted_recommended_qty - actual));
            }
        }

        let skus_recommended = customer_items.len() as i32;
        let cov = coverage(skus_sold as u32, skus_recommended as u32);
        let acc = accuracy(
            qty_actual_total,
            qty_recommended_total,
            (self.scoring.perfect_zone_low, self.scoring.perfect_zone_high),
            self.scoring.accuracy_decay_high,
        );
        let customer_score = score(cov, acc);

        let already_visited: HashSet<String> = self.visits.keys().cloned().collect();
        let mut redistribution_count = 0i32;
        let mut redistribution_qty = 0i64;
        let mut items_not_redistributed = Vec::new();

        for (item, mut remaining) in surpluses {
            let mut eligible: Vec<String> = self
                .roster
                .iter()
                .filter(|c| *c != customer && !already_visited.contains(*c))
                .filter(|c| self.item_details.contains_key(&((*c).clone(), item.clone())))
                .cloned()
                .collect();

            eligible.sort_by(|a, b| {
                let sa = self.item_details[&(a.clone(), item.clone())].priority_score;
                let sb = self.item_details[&(b.clone(), item.clone())].priority_score;
                sb.partial_cmp(&sa).unwrap().then_with(|| a.cmp(b))
            });

            let mut item_redistributed = false;
            for other in &eligible {
                if remaining == 0 {
                    break;
                }
                let key = (other.clone(), item.clone());
                let detail = self.item_details.get_mut(&key).expect("checked membership above");
                let increment = remaining;
                if increment > 0 {
                    detail.adjusted_recommended_qty += increment;
                    remaining -= increment;
                    redistribution_qty += increment as i64;
                    item_redistributed = true;
                }
            }

            if item_redistributed {
                redistribution_count += 1;
            }
            if remaining > 0 {
                items_not_redistributed.push(ItemsNotRedistributed { item, unredistributed_qty: remaining });
            }
        }

        let visit = Visit {
            customer: customer.to_string(),
            visit_sequence,
            visit_timestamp,
            skus_recommended,
            skus_sold,
            qty_recommended: qty_recommended_total,
            qty_actual: qty_actual_total,
            redistribution_count,
            redistribution_qty,
            customer_performance_score: customer_score,
            narrative: None,
        };

        if !self.visits.contains_key(customer) {
            self.visit_order.push(customer.to_string());
        }
        self.visits.insert(customer.to_string(), visit.clone());

        Ok(ProcessVisitOutcome { visit, items_not_redistributed })
    }

    pub fn customers_visited(&self) -> usize {
        self.visits.len()
    }

    fn route_counters(&self) -> (i32, i32, i64, i64, i32, i64, f64) {
        let visited = self.visits.values();
        let count = self.visits.len();
        let mut skus_recommended = 0i32;
        let mut skus_sold = 0i32;
        let mut qty_recommended = 0i64;
        let mut qty_actual = 0i64;
        let mut redistribution_count = 0i32;
        let mut redistribution_qty = 0i64;
        let mut score_sum = 0.0f64;

        for v in visited {
            skus_recommended += v.skus_recommended;
            skus_sold += v.skus_sold;
            qty_recommended += v.qty_recommended;
            qty_actual += v.qty_actual;
            redistribution_count += v.redistribution_count;
            redistribution_qty += v.redistribution_qty;
            score_sum += v.customer_performance_score;
        }

        let route_score = if count > 0 { score_sum / count as f64 } else { 0.0 };
        (skus_recommended, skus_sold, qty_recommended, qty_actual, redistribution_count, redistribution_qty, route_score)
    }

    /// `ACTIVE -> COMPLETED`. Caller persists via `SupervisionStorage::save`.
    pub fn complete(&mut self) {
        self.status = SessionStatus::Completed;
        self.completed_at = Some(Utc::now());
    }

    pub fn to_record(&self) -> SessionRecord {
        let (skus_recommended, skus_sold, qty_recommended, qty_actual, redistribution_count, redistribution_qty, perf) =
            self.route_counters();

        SessionRecord {
            session_id: self.session_id.clone(),
            route: self.route.clone(),
            date: self.date,
            status: self.status,
            customers_planned: self.roster.len() as i32,
            customers_visited: self.visits.len() as i32,
            skus_recommended,
            skus_sold,
            qty_recommended,
            qty_actual,
            redistribution_count,
            redistribution_qty,
            performance_score: perf,
            record_version: self.record_version,
            narrative: self.narrative.clone(),
            started_at: self.started_at,
            completed_at: self.completed_at,
        }
    }

    pub fn visits(&self) -> Vec<Visit> {
        self.visit_order.iter().filter_map(|c| self.visits.get(c)).cloned().collect()
    }

    pub fn item_details(&self) -> Vec<ItemDetail> {
        self.item_details.values().cloned().collect()
    }

    pub fn record_version(&self) -> i32 {
        self.record_version
    }

    pub fn bump_record_version(&mut self) {
        self.record_version += 1;
    }

    pub fn set_narrative(&mut self, narrative: String) {
        self.narrative = Some(narrative);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rec(customer: &str, item: &str, qty: i32, avg: i32, priority: f64) -> RecommendationRow {
        RecommendationRow {
            date: NaiveDate::from_ymd_opt(2025, 10, 9).unwrap(),
            route: "R1".into(),
            customer: customer.into(),
            item: item.into(),
            recommended_quantity: qty,
            tier: vansales_recommend::Tier::MustStock,
            van_load: 100,
            priority_score: priority,
            avg_quantity_per_visit: avg,
            days_since_last_purchase: 10,
            purchase_cycle_days: 14.0,
            frequency_percent: 80.0,
            generated_at: Utc::now(),
            generated_by: "test".into(),
        }
    }

    #[tokio::test]
    async fn redistributes_surplus_to_unvisited_customers() {
        let recs = vec![rec("C-A", "X", 10, 10, 50.0), rec("C-B", "X", 5, 10, 40.0)];
        let mut session = Session::init("R1", NaiveDate::from_ymd_opt(2025, 10, 9).unwrap(), vec!["C-A".into(), "C-B".into()], &recs, ScoringParams::default()).unwrap();

        let sales = HashMap::from([("X".to_string(), 4)]);
        let outcome = session.process_visit("C-A", &sales).await.unwrap();

        assert!(outcome.items_not_redistributed.is_empty());
        let detail = &session.item_details[&("C-B".to_string(), "X".to_string())];
        // C-A's surplus (10 - 4 = 6) goes entirely to the only eligible customer,
        // capped by surplus, not by C-B's own avg_quantity_per_visit ceiling.
        assert_eq!(detail.adjusted_recommended_qty, 11);
    }

    #[tokio::test]
    async fn redistribution_caps_by_surplus_not_avg_quantity_ceiling() {
        // S3: C1, C2, C3 all recommended 10 of X. C1 visited with actual 6 (surplus 4).
        // C2 and C3 tie on priority 30; C2's smaller avg_quantity_per_visit (8) must not
        // cap the amount it receives - the whole surplus goes to the higher-ranked tie
        // winner (lexicographically smaller customer code), C3 gets nothing.
        let recs = vec![
            rec("C1", "X", 10, 12, 50.0),
            rec("C2", "X", 10, 8, 30.0),
            rec("C3", "X", 10, 12, 30.0),
        ];
        let mut session = Session::init(
            "R1",
            NaiveDate::from_ymd_opt(2025, 10, 9).unwrap(),
            vec!["C1".into(), "C2".into(), "C3".into()],
            &recs,
            ScoringParams::default(),
        )
        .unwrap();

        let sales = HashMap::from([("X".to_string(), 6)]);
        let outcome = session.process_visit("C1", &sales).await.unwrap();

        assert!(outcome.items_not_redistributed.is_empty());
        assert_eq!(session.item_details[&("C2".to_string(), "X".to_string())].adjusted_recommended_qty, 14);
        assert_eq!(session.item_details[&("C3".to_string(), "X".to_string())].adjusted_recommended_qty, 10);
    }

    #[tokio::test]
    async fn rejects_customer_not_on_roster() {
        let recs = vec![rec("C-A", "X", 10, 10, 50.0)];
        let mut session = Session::init("R1", NaiveDate::from_ymd_opt(2025, 10, 9).unwrap(), vec!["C-A".into()], &recs, ScoringParams::default()).unwrap();
        let err = session.process_visit("C-Z", &HashMap::new()).await.unwrap_err();
        assert!(matches!(err, Error::InvalidInput { .. }));
    }

    #[tokio::test]
    async fn rejects_out_of_range_actual_quantity() {
        let recs = vec![rec("C-A", "X", 10, 10, 50.0)];
        let mut session = Session::init("R1", NaiveDate::from_ymd_opt(2025, 10, 9).unwrap(), vec!["C-A".into()], &recs, ScoringParams::default()).unwrap();
        let sales = HashMap::from([("X".to_string(), 1_000_000)]);
        let err = session.process_visit("C-A", &sales).await.unwrap_err();
        assert!(matches!(err, Error::InvalidInput { .. }));
    }

    #[tokio::test]
    async fn reports_unredistributed_surplus_when_no_eligible_customers() {
        let recs = vec![rec("C-A", "X", 10, 10, 50.0)];
        let mut session = Session::init("R1", NaiveDate::from_ymd_opt(2025, 10, 9).unwrap(), vec!["C-A".into()], &recs, ScoringParams::default()).unwrap();
        let sales = HashMap::from([("X".to_string(), 0)]);
        let outcome = session.process_visit("C-A", &sales).await.unwrap();
        assert_eq!(outcome.items_not_redistributed.len(), 1);
        assert_eq!(outcome.items_not_redistributed[0].unredistributed_qty, 10);
    }

    #[tokio::test]
    async fn revisiting_a_customer_preserves_their_visit_sequence() {
        let recs = vec![rec("C-A", "X", 10, 10, 50.0), rec("C-B", "X", 10, 10, 40.0), rec("C-C", "X", 10, 10, 30.0)];
        let mut session = Session::init(
            "R1",
            NaiveDate::from_ymd_opt(2025, 10, 9).unwrap(),
            vec!["C-A".into(), "C-B".into(), "C-C".into()],
            &recs,
            ScoringParams::default(),
        )
        .unwrap();

        let sales = HashMap::from([("X".to_string(), 10)]);
        session.process_visit("C-A", &sales).await.unwrap();
        session.process_visit("C-B", &sales).await.unwrap();
        session.process_visit("C-C", &sales).await.unwrap();

        let first_sequence = session.visits[&"C-A".to_string()].visit_sequence;
        assert_eq!(first_sequence, 1);

        session.process_visit("C-A", &sales).await.unwrap();
        assert_eq!(session.visits[&"C-A".to_string()].visit_sequence, first_sequence);

        let mut sequences: Vec<i32> = session.visits.values().map(|v| v.visit_sequence).collect();
        sequences.sort();
        assert_eq!(sequences, vec![1, 2, 3]);
    }

    #[test]
    fn init_fails_without_recommendations() {
        let err = Session::init("R1", NaiveDate::from_ymd_opt(2025, 10, 9).unwrap(), vec!["C-A".into()], &[], ScoringParams::default()).unwrap_err();
        assert!(matches!(err, Error::NoRecommendations { .. }));
    }
}
