//! The Tiered Recommendation Engine (C3): given a route and date, produces a
//! deterministic, ordered list of recommendation rows bounded by van
//! capacity.

use crate::allocation::{allocate, Candidate};
use crate::features::{build_feature_table, route_median_cycle};
use crate::quantity::propose_quantity;
use crate::tiering::{assign_tier, priority_score};
use crate::types::{RecommendationRow, Tier};
use chrono::{NaiveDate, Utc};
use std::collections::{HashMap, HashSet};
use vansales_core::config::EngineSettings;
use vansales_core::error::Result;
use vansales_core::Error;
use vansales_warehouse::Snapshots;

pub const GENERATED_BY: &str = "recommendation-engine";

pub struct RecommendationEngine {
    settings: EngineSettings,
}

impl RecommendationEngine {
    pub fn new(settings: EngineSettings) -> Self {
        Self { settings }
    }

    pub fn generate(&self, route: &str, date: NaiveDate, snapshots: &Snapshots) -> Result<Vec<RecommendationRow>> {
        let roster = snapshots.roster(route, date);
        if roster.is_empty() {
            return Err(Error::InsufficientData(format!("no planned roster for {route} on {date}")));
        }

        let van_load: HashMap<String, i32> = snapshots
            .demand_forecast
            .rows
            .iter()
            .filter(|r| r.route == route && r.date == date)
            .map(|r| (r.item.clone(), r.predicted_quantity))
            .collect();

        if van_load.is_empty() {
            return Err(Error::InsufficientData(format!("no forecast for {route} on {date}")));
        }

        let mut items: Vec<String> = van_load.keys().cloned().collect();
        items.sort();

        let history: Vec<_> = roster
            .iter()
            .flat_map(|customer| snapshots.customer_history.for_customer(customer))
            .filter(|row| row.route == route && row.date < date)
            .cloned()
            .collect();

        let median_cycle = route_median_cycle(&history);
        let features = build_feature_table(&history, &roster, &items, date, self.settings.history_days, median_cycle);

        let has_other_route_history: HashSet<&str> = history.iter().map(|r| r.customer.as_str()).collect();

        let mut tiers: HashMap<(String, String), Tier> = HashMap::new();
        for customer in &roster {
            for item in &items {
                let key = (customer.clone(), item.clone());
                let f = &features[&key];
                let tier = assign_tier(f, has_other_route_history.contains(customer.as_str()));
                tiers.insert(key, tier);
            }
        }

        let mut must_stock_qty_by_item: HashMap<&str, Vec<f64>> = HashMap::new();
        for item in &items {
            for customer in &roster {
                let key = (customer.clone(), item.clone());
                if tiers[&key] == Tier::MustStock {
                    must_stock_qty_by_item
                        .entry(item.as_str())
                        .or_default()
                        .push(features[&key].avg_quantity_per_visit as f64);
                }
            }
        }
        let must_stock_median: HashMap<&str, f64> = must_stock_qty_by_item
            .into_iter()
            .map(|(item, mut qtys)| {
                qtys.sort_by(|a, b| a.partial_cmp(b).unwrap());
                let mid = qtys.len() / 2;
                let median = if qtys.len() % 2 == 0 { (qtys[mid - 1] + qtys[mid]) / 2.0 } else { qtys[mid] };
                (item, median)
            })
            .collect();

        let mut candidates = Vec::with_capacity(roster.len() * items.len());
        for customer in &roster {
            for item in &items {
                let key = (customer.clone(), item.clone());
                let f = features[&key];
                let tier = tiers[&key];
                let proposed_qty = propose_quantity(
                    tier,
                    f.avg_quantity_per_visit,
                    must_stock_median.get(item.as_str()).copied(),
                    self.settings.trial_quantity_ceiling,
                );

                candidates.push(Candidate {
                    customer: customer.clone(),
                    item: item.clone(),
                    proposed_qty,
                    priority_score: priority_score(&f),
                    tier,
                    avg_quantity_per_visit: f.avg_quantity_per_visit,
                    days_since_last_purchase: f.days_since_last_purchase,
                    purchase_cycle_days: f.purchase_cycle_days,
                    frequency_percent: f.frequency_percent,
                });
            }
        }

        let allocated = allocate(candidates, &van_load);
        let generated_at = Utc::now();

        let mut rows: Vec<RecommendationRow> = allocated
            .into_iter()
            .map(|a| RecommendationRow {
                date,
                route: route.to_string(),
                customer: a.candidate.customer,
                item: a.candidate.item,
                recommended_quantity: a.recommended_quantity,
                tier: a.candidate.tier,
                van_load: a.van_load_snapshot,
                priority_score: a.candidate.priority_score,
                avg_quantity_per_visit: a.candidate.avg_quantity_per_visit,
                days_since_last_purchase: a.candidate.days_since_last_purchase,
                purchase_cycle_days: a.candidate.purchase_cycle_days,
                frequency_percent: a.candidate.frequency_percent,
                generated_at,
                generated_by: GENERATED_BY.to_string(),
            })
            .collect();

        rows.sort_by(|a, b| a.customer.cmp(&b.customer).then_with(|| a.item.cmp(&b.item)));
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vansales_warehouse::{CustomerHistorySnapshot, DemandForecastSnapshot, ForecastRow, JourneyEntry, JourneyPlanSnapshot};

    fn settings() -> EngineSettings {
        EngineSettings::default()
    }

    #[test]
    fn fails_with_insufficient_data_on_empty_roster() {
        let snapshots = Snapshots::default();
        let engine = RecommendationEngine::new(settings());
        let date = NaiveDate::from_ymd_opt(2025, 10, 9).unwrap();
        let err = engine.generate("R1004", date, &snapshots).unwrap_err();
        assert!(matches!(err, Error::InsufficientData(_)));
    }

    #[test]
    fn respects_van_capacity_as_hard_cap() {
        let date = NaiveDate::from_ymd_opt(2025, 10, 9).unwrap();
        let journey_plan = JourneyPlanSnapshot {
            rows: vec![
                JourneyEntry { route: "R1".into(), customer: "C-A".into(), date },
                JourneyEntry { route: "R1".into(), customer: "C-B".into(), date },
            ],
            as_of: None,
        };
        let demand_forecast = DemandForecastSnapshot {
            rows: vec![ForecastRow { date, route: "R1".into(), item: "X".into(), predicted_quantity: 5, prediction_type: "model".into() }],
            as_of: None,
        };
        let snapshots = Snapshots {
            demand_history: Default::default(),
            demand_forecast,
            customer_history: CustomerHistorySnapshot::default(),
            journey_plan,
        };

        let engine = RecommendationEngine::new(settings());
        let rows = engine.generate("R1", date, &snapshots).unwrap();

        let total: i32 = rows.iter().map(|r| r.recommended_quantity).sum();
        assert!(total <= 5);
    }
}
