//! Fingerprint-keyed response cache with a fixed TTL (§4.6: 24h).

use dashmap::DashMap;
use std::time::{Duration, Instant};

struct Entry {
    text: String,
    expires_at: Instant,
}

pub struct NarrativeCache {
    entries: DashMap<String, Entry>,
    ttl: Duration,
}

impl NarrativeCache {
    pub fn new(ttl: Duration) -> Self {
        Self { entries: DashMap::new(), ttl }
    }

    pub fn get(&self, fingerprint: &str) -> Option<String> {
        match self.entries.get(fingerprint) {
            Some(entry) if entry.expires_at > Instant::now() => Some(entry.text.clone()),
            Some(_) => {
                self.entries.remove(fingerprint);
                None
            }
            None => None,
        }
    }

    pub fn put(&self, fingerprint: String, text: String) {
        self.entries.insert(fingerprint, Entry { text, expires_at: Instant::now() + self.ttl });
    }
}

impl Default for NarrativeCache {
    fn default() -> Self {
        Self::new(Duration::from_secs(24 * 60 * 60))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn returns_cached_value_before_expiry() {
        let cache = NarrativeCache::new(Duration::from_secs(60));
        cache.put("k".into(), "hello".into());
        assert_eq!(cache.get("k"), Some("hello".to_string()));
    }

    #[test]
    fn expired_entries_are_evicted_on_read() {
        let cache = NarrativeCache::new(Duration::from_millis(1));
        cache.put("k".into(), "hello".into());
        std::thread::sleep(Duration::from_millis(5));
        assert_eq!(cache.get("k"), None);
    }
}
