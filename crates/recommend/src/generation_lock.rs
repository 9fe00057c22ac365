//! Per-(date, route) generation coalescing (§4.4/§5): at most one in-flight
//! generation per key within the process; every other caller for the same
//! key waits on that one generation instead of starting its own.

use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

#[derive(Default)]
pub struct GenerationLock {
    locks: DashMap<(String, chrono::NaiveDate), Arc<Mutex<()>>>,
}

impl GenerationLock {
    pub fn new() -> Self {
        Self { locks: DashMap::new() }
    }

    /// Returns the mutex for this (route, date), creating it on first use.
    /// Holding the returned guard is what serializes generation for this key;
    /// the map entry itself is never removed, so repeated misses for a
    /// long-lived route/date pair reuse the same lock instead of allocating.
    pub fn key(&self, route: &str, date: chrono::NaiveDate) -> Arc<Mutex<()>> {
        self.locks
            .entry((route.to_string(), date))
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn concurrent_callers_for_same_key_serialize() {
        let lock = Arc::new(GenerationLock::new());
        let date = chrono::NaiveDate::from_ymd_opt(2025, 10, 9).unwrap();

        let order = Arc::new(tokio::sync::Mutex::new(Vec::new()));

        let mut handles = Vec::new();
        for i in 0..4 {
            let lock = lock.clone();
            let order = order.clone();
            handles.push(tokio::spawn(async move {
                let key_lock = lock.key("R1", date);
                let _guard = key_lock.lock().await;
                order.lock().await.push(i);
            }));
        }

        for h in handles {
            h.await.unwrap();
        }

        assert_eq!(order.lock().await.len(), 4);
    }

    #[test]
    fn distinct_keys_get_distinct_locks() {
        let lock = GenerationLock::new();
        let date = chrono::NaiveDate::from_ymd_opt(2025, 10, 9).unwrap();
        let a = lock.key("R1", date);
        let b = lock.key("R2", date);
        assert!(!Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn same_key_returns_same_lock() {
        let lock = GenerationLock::new();
        let date = chrono::NaiveDate::from_ymd_opt(2025, 10, 9).unwrap();
        let a = lock.key("R1", date);
        let b = lock.key("R1", date);
        assert!(Arc::ptr_eq(&a, &b));
    }
}
