//! Per-(customer, item) feature extraction from purchase history.
//!
//! Everything here is pure and deterministic: given the same history slice,
//! roster, and item set, the same feature table comes out every time.

use chrono::NaiveDate;
use std::collections::{HashMap, HashSet};
use vansales_warehouse::SalesFact;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Features {
    pub purchases: u32,
    pub total_visits: u32,
    pub avg_quantity_per_visit: i32,
    pub days_since_last_purchase: i64,
    pub purchase_cycle_days: f64,
    pub frequency_percent: f64,
    pub recency_factor: f64,
    pub overdue_boost: f64,
}

/// 0.8x / 2.0x cycle thresholds bound the recency ramp; kept as named
/// constants since §4.3.2/§4.3.3 both reference them.
const RECENCY_FULL_RATIO: f64 = 0.8;
const RECENCY_ZERO_RATIO: f64 = 2.0;
const OVERDUE_ON_CYCLE_RATIO: f64 = 1.0;
const OVERDUE_CAP_RATIO: f64 = 2.0;
const OVERDUE_CAP: f64 = 1.5;

fn median(mut values: Vec<f64>) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    values.sort_by(|a, b| a.partial_cmp(b).unwrap());
    let mid = values.len() / 2;
    if values.len() % 2 == 0 {
        Some((values[mid - 1] + values[mid]) / 2.0)
    } else {
        Some(values[mid])
    }
}

fn distinct_dates(rows: &[&SalesFact]) -> Vec<NaiveDate> {
    let mut dates: Vec<NaiveDate> = rows.iter().map(|r| r.date).collect();
    dates.sort();
    dates.dedup();
    dates
}

fn cycle_from_dates(dates: &[NaiveDate]) -> Option<f64> {
    if dates.len() < 2 {
        return None;
    }
    let gaps: Vec<f64> = dates.windows(2).map(|w| (w[1] - w[0]).num_days() as f64).collect();
    Some(gaps.iter().sum::<f64>() / gaps.len() as f64)
}

struct CustomerStats<'a> {
    rows_by_item: HashMap<String, Vec<&'a SalesFact>>,
    total_visit_dates: HashSet<NaiveDate>,
    per_item_cycle: HashMap<String, f64>,
}

fn customer_stats<'a>(rows: &[&'a SalesFact]) -> CustomerStats<'a> {
    let mut rows_by_item: HashMap<String, Vec<&SalesFact>> = HashMap::new();
    let mut total_visit_dates = HashSet::new();
    for row in rows {
        rows_by_item.entry(row.item.clone()).or_default().push(row);
        total_visit_dates.insert(row.date);
    }

    let mut per_item_cycle = HashMap::new();
    for (item, item_rows) in &rows_by_item {
        let dates = distinct_dates(item_rows);
        if let Some(cycle) = cycle_from_dates(&dates) {
            per_item_cycle.insert(item.clone(), cycle);
        }
    }

    CustomerStats { rows_by_item, total_visit_dates, per_item_cycle }
}

/// Global route-level median purchase cycle, used as the last-resort fallback
/// for customers with no history at all.
pub fn route_median_cycle(history: &[SalesFact]) -> f64 {
    let mut by_customer_item: HashMap<(String, String), Vec<NaiveDate>> = HashMap::new();
    for row in history {
        by_customer_item
            .entry((row.customer.clone(), row.item.clone()))
            .or_default()
            .push(row.date);
    }

    let cycles: Vec<f64> = by_customer_item
        .values()
        .filter_map(|dates| {
            let mut d = dates.clone();
            d.sort();
            d.dedup();
            cycle_from_dates(&d)
        })
        .collect();

    median(cycles).unwrap_or(30.0)
}

pub fn recency_factor(days_since_last_purchase: i64, cycle: f64) -> f64 {
    if cycle <= 0.0 {
        return if days_since_last_purchase <= 0 { 1.0 } else { 0.0 };
    }
    let ratio = days_since_last_purchase as f64 / cycle;
    if ratio <= RECENCY_FULL_RATIO {
        1.0
    } else if ratio >= RECENCY_ZERO_RATIO {
        0.0
    } else {
        1.0 - (ratio - RECENCY_FULL_RATIO) / (RECENCY_ZERO_RATIO - RECENCY_FULL_RATIO)
    }
}

pub fn overdue_boost(days_since_last_purchase: i64, cycle: f64) -> f64 {
    if cycle <= 0.0 {
        return if days_since_last_purchase > 0 { OVERDUE_CAP } else { 1.0 };
    }
    let ratio = days_since_last_purchase as f64 / cycle;
    if ratio <= OVERDUE_ON_CYCLE_RATIO {
        1.0
    } else if ratio >= OVERDUE_CAP_RATIO {
        OVERDUE_CAP
    } else {
        1.0 + (ratio - OVERDUE_ON_CYCLE_RATIO) / (OVERDUE_CAP_RATIO - OVERDUE_ON_CYCLE_RATIO) * (OVERDUE_CAP - 1.0)
    }
}

/// Builds the feature table for every (customer, item) pair in the roster
/// cross the candidate item set. `history` must already be filtered to the
/// route and the lookback window.
pub fn build_feature_table(
    history: &[SalesFact],
    roster: &[String],
    items: &[String],
    today: NaiveDate,
    history_days: i64,
    route_median_cycle: f64,
) -> HashMap<(String, String), Features> {
    let mut by_customer: HashMap<&str, Vec<&SalesFact>> = HashMap::new();
    for row in history {
        by_customer.entry(row.customer.as_str()).or_default().push(row);
    }

    let mut table = HashMap::new();

    for customer in roster {
        let rows = by_customer.get(customer.as_str()).cloned().unwrap_or_default();
        let stats = customer_stats(&rows);
        let total_visits = stats.total_visit_dates.len() as u32;

        let customer_median_cycle =
            median(stats.per_item_cycle.values().copied().collect()).unwrap_or(route_median_cycle);

        for item in items {
            let item_rows = stats.rows_by_item.get(item).cloned().unwrap_or_default();
            let dates = distinct_dates(&item_rows);
            let purchases = dates.len() as u32;

            let total_qty: i32 = item_rows.iter().map(|r| r.quantity).sum();
            let avg_quantity_per_visit = if purchases > 0 {
                (total_qty as f64 / purchases as f64).round() as i32
            } else {
                0
            };

            let days_since_last_purchase = match dates.last() {
                Some(last) => (today - *last).num_days(),
                None => history_days,
            };

            let purchase_cycle_days = if purchases >= 2 {
                cycle_from_dates(&dates).unwrap()
            } else if total_visits == 0 {
                route_median_cycle
            } else {
                customer_median_cycle
            };

            let frequency_percent = if total_visits > 0 {
                100.0 * purchases as f64 / total_visits as f64
            } else {
                0.0
            };

            let recency = recency_factor(days_since_last_purchase, purchase_cycle_days);
            let overdue = overdue_boost(days_since_last_purchase, purchase_cycle_days);

            table.insert(
                (customer.clone(), item.clone()),
                Features {
                    purchases,
                    total_visits,
                    avg_quantity_per_visit,
                    days_since_last_purchase,
                    purchase_cycle_days,
                    frequency_percent,
                    recency_factor: recency,
                    overdue_boost: overdue,
                },
            );
        }
    }

    table
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recency_is_full_within_early_window() {
        assert_eq!(recency_factor(5, 30.0), 1.0);
    }

    #[test]
    fn recency_hits_zero_at_double_cycle() {
        assert_eq!(recency_factor(60, 30.0), 0.0);
    }

    #[test]
    fn recency_decays_linearly_at_midpoint() {
        // 0.8x = 24, 2.0x = 60, midpoint ratio 1.4 -> fraction (1.4-0.8)/1.2 = 0.5
        let factor = recency_factor(42, 30.0);
        assert!((factor - 0.5).abs() < 1e-9);
    }

    #[test]
    fn overdue_boost_is_one_on_cycle() {
        assert_eq!(overdue_boost(30, 30.0), 1.0);
    }

    #[test]
    fn overdue_boost_caps_at_double_cycle() {
        assert_eq!(overdue_boost(60, 30.0), 1.5);
        assert_eq!(overdue_boost(90, 30.0), 1.5);
    }

    #[test]
    fn overdue_boost_ramps_linearly() {
        // ratio 1.5 -> halfway between 1.0 and 1.5 -> 1.25
        let boost = overdue_boost(45, 30.0);
        assert!((boost - 1.25).abs() < 1e-9);
    }
}
