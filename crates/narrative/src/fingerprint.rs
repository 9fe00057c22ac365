//! Deterministic cache keys for narrative responses (§4.6): identity plus a
//! stable hash over the (item, recommended_qty, actual_qty) tuples and the
//! computed score. Same inputs, same key, so a repeat request within the TTL
//! is served from cache instead of re-invoking the backend.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

#[derive(Debug, Clone)]
pub struct CustomerSnapshot {
    pub session_id: String,
    pub customer: String,
    /// (item, recommended_qty, actual_qty), caller-sorted by item.
    pub items: Vec<(String, i32, i32)>,
    pub score: f64,
}

#[derive(Debug, Clone)]
pub struct RouteSnapshot {
    pub session_id: String,
    pub route: String,
    /// (customer, customer_score), caller-sorted by customer.
    pub customers: Vec<(String, f64)>,
    pub route_score: f64,
}

pub fn customer_fingerprint(snapshot: &CustomerSnapshot) -> String {
    let mut hasher = DefaultHasher::new();
    snapshot.session_id.hash(&mut hasher);
    snapshot.customer.hash(&mut hasher);
    for (item, recommended, actual) in &snapshot.items {
        item.hash(&mut hasher);
        recommended.hash(&mut hasher);
        actual.hash(&mut hasher);
    }
    snapshot.score.to_bits().hash(&mut hasher);
    format!("customer:{:016x}", hasher.finish())
}

pub fn route_fingerprint(snapshot: &RouteSnapshot) -> String {
    let mut hasher = DefaultHasher::new();
    snapshot.session_id.hash(&mut hasher);
    snapshot.route.hash(&mut hasher);
    for (customer, score) in &snapshot.customers {
        customer.hash(&mut hasher);
        score.to_bits().hash(&mut hasher);
    }
    snapshot.route_score.to_bits().hash(&mut hasher);
    format!("route:{:016x}", hasher.finish())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_snapshots_fingerprint_identically() {
        let a = CustomerSnapshot {
            session_id: "S1".into(),
            customer: "C-A".into(),
            items: vec![("X".into(), 5, 4)],
            score: 88.5,
        };
        let b = a.clone();
        assert_eq!(customer_fingerprint(&a), customer_fingerprint(&b));
    }

    #[test]
    fn changed_actual_quantity_changes_fingerprint() {
        let a = CustomerSnapshot {
            session_id: "S1".into(),
            customer: "C-A".into(),
            items: vec![("X".into(), 5, 4)],
            score: 88.5,
        };
        let mut b = a.clone();
        b.items[0].2 = 5;
        assert_ne!(customer_fingerprint(&a), customer_fingerprint(&b));
    }
}
