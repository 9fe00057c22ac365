//! Van-capacity allocation (§4.3.5). Capacity is the hard binding constraint;
//! priority decides who is served first when it falls short.

use crate::types::Tier;
use std::collections::HashMap;

#[derive(Debug, Clone)]
pub struct Candidate {
    pub customer: String,
    pub item: String,
    pub proposed_qty: i32,
    pub priority_score: f64,
    pub tier: Tier,
    pub avg_quantity_per_visit: i32,
    pub days_since_last_purchase: i64,
    pub purchase_cycle_days: f64,
    pub frequency_percent: f64,
}

#[derive(Debug, Clone)]
pub struct Allocated {
    pub candidate: Candidate,
    pub recommended_quantity: i32,
    pub van_load_snapshot: i32,
}

/// Sorts by descending priority, ties broken lexicographically by
/// (customer, item), then grants `min(proposed_qty, remaining_capacity)` to
/// each candidate in turn. Candidates granted zero units are dropped.
pub fn allocate(mut candidates: Vec<Candidate>, van_load: &HashMap<String, i32>) -> Vec<Allocated> {
    candidates.sort_by(|a, b| {
        b.priority_score
            .partial_cmp(&a.priority_score)
            .unwrap()
            .then_with(|| a.customer.cmp(&b.customer))
            .then_with(|| a.item.cmp(&b.item))
    });

    let mut remaining: HashMap<String, i32> = van_load.clone();
    let mut out = Vec::with_capacity(candidates.len());

    for candidate in candidates {
        let snapshot = *van_load.get(&candidate.item).unwrap_or(&0);
        let left = remaining.entry(candidate.item.clone()).or_insert(0);
        let grant = candidate.proposed_qty.min(*left).max(0);
        *left -= grant;

        if grant > 0 {
            out.push(Allocated { candidate, recommended_quantity: grant, van_load_snapshot: snapshot });
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(customer: &str, item: &str, qty: i32, score: f64) -> Candidate {
        Candidate {
            customer: customer.into(),
            item: item.into(),
            proposed_qty: qty,
            priority_score: score,
            tier: Tier::MustStock,
            avg_quantity_per_visit: qty,
            days_since_last_purchase: 0,
            purchase_cycle_days: 30.0,
            frequency_percent: 70.0,
        }
    }

    #[test]
    fn ties_break_lexicographically_by_customer_then_item() {
        let candidates = vec![candidate("C-B", "X", 1, 42.0), candidate("C-A", "X", 1, 42.0)];
        let van_load = HashMap::from([("X".to_string(), 1)]);

        let result = allocate(candidates, &van_load);

        assert_eq!(result.len(), 1);
        assert_eq!(result[0].candidate.customer, "C-A");
    }

    #[test]
    fn zero_grant_candidates_are_dropped() {
        let candidates = vec![candidate("C-A", "X", 5, 10.0)];
        let van_load = HashMap::from([("X".to_string(), 0)]);

        let result = allocate(candidates, &van_load);
        assert!(result.is_empty());
    }

    #[test]
    fn capacity_is_never_exceeded_across_candidates() {
        let candidates = vec![candidate("C-A", "X", 6, 90.0), candidate("C-B", "X", 6, 50.0)];
        let van_load = HashMap::from([("X".to_string(), 10)]);

        let result = allocate(candidates, &van_load);
        let total: i32 = result.iter().map(|a| a.recommended_quantity).sum();
        assert_eq!(total, 10);
        assert_eq!(result[0].candidate.customer, "C-A");
        assert_eq!(result[0].recommended_quantity, 6);
        assert_eq!(result[1].recommended_quantity, 4);
    }
}
