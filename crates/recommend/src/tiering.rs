//! Tier assignment and priority scoring (§4.3.3). Thresholds are evaluated
//! top to bottom; the first match wins.

use crate::features::Features;
use crate::types::Tier;

pub fn assign_tier(features: &Features, has_other_route_history: bool) -> Tier {
    let freq = features.frequency_percent;
    let days_since = features.days_since_last_purchase as f64;
    let cycle = features.purchase_cycle_days;

    if freq >= 70.0 && days_since >= 0.8 * cycle {
        Tier::MustStock
    } else if freq >= 40.0 && days_since >= 0.6 * cycle {
        Tier::ShouldStock
    } else if freq >= 20.0 {
        Tier::Consider
    } else if features.purchases == 0 && has_other_route_history {
        Tier::NewCustomer
    } else {
        Tier::Monitor
    }
}

pub fn priority_score(features: &Features) -> f64 {
    features.frequency_percent * features.recency_factor * features.overdue_boost
}

#[cfg(test)]
mod tests {
    use super::*;

    fn features(freq: f64, days_since: i64, cycle: f64, purchases: u32) -> Features {
        Features {
            purchases,
            total_visits: 10,
            avg_quantity_per_visit: 5,
            days_since_last_purchase: days_since,
            purchase_cycle_days: cycle,
            frequency_percent: freq,
            recency_factor: 1.0,
            overdue_boost: 1.0,
        }
    }

    #[test]
    fn must_stock_requires_both_thresholds() {
        let f = features(75.0, 30, 30.0, 5);
        assert_eq!(assign_tier(&f, true), Tier::MustStock);
    }

    #[test]
    fn high_frequency_but_not_overdue_falls_to_should_stock() {
        let f = features(75.0, 10, 30.0, 5);
        assert_eq!(assign_tier(&f, true), Tier::ShouldStock);
    }

    #[test]
    fn low_frequency_with_no_purchases_is_new_customer() {
        let f = features(0.0, 365, 30.0, 0);
        assert_eq!(assign_tier(&f, true), Tier::NewCustomer);
    }

    #[test]
    fn no_purchases_without_other_route_history_is_monitor() {
        let f = features(0.0, 365, 30.0, 0);
        assert_eq!(assign_tier(&f, false), Tier::Monitor);
    }

    #[test]
    fn middling_frequency_is_consider() {
        let f = features(25.0, 5, 30.0, 3);
        assert_eq!(assign_tier(&f, true), Tier::Consider);
    }

    #[test]
    fn first_match_wins_top_to_bottom() {
        // Qualifies for both MUST_STOCK and SHOULD_STOCK bands; must get MUST_STOCK.
        let f = features(80.0, 30, 30.0, 8);
        assert_eq!(assign_tier(&f, true), Tier::MustStock);
    }
}
