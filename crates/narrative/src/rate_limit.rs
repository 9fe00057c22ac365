//! Per-caller cooldowns (§4.6): 5s between customer analyses for the same
//! (session, customer), 10s between route analyses for the same session.

use dashmap::DashMap;
use std::time::{Duration, Instant};
use vansales_core::error::Result;
use vansales_core::Error;

#[derive(Default)]
pub struct RateLimiter {
    last_call: DashMap<String, Instant>,
}

impl RateLimiter {
    pub fn new() -> Self {
        Self { last_call: DashMap::new() }
    }

    /// Returns `Ok(())` and records the call, or `RateLimited` with the
    /// remaining cooldown if called again too soon.
    pub fn check_and_record(&self, key: &str, cooldown: Duration) -> Result<()> {
        let now = Instant::now();
        if let Some(last) = self.last_call.get(key) {
            let elapsed = now.duration_since(*last);
            if elapsed < cooldown {
                let retry_after_secs = (cooldown - elapsed).as_secs().max(1);
                return Err(Error::RateLimited { retry_after_secs });
            }
        }
        self.last_call.insert(key.to_string(), now);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_call_within_cooldown_is_rate_limited() {
        let limiter = RateLimiter::new();
        limiter.check_and_record("S1:C-A", Duration::from_secs(5)).unwrap();
        let err = limiter.check_and_record("S1:C-A", Duration::from_secs(5)).unwrap_err();
        assert!(matches!(err, Error::RateLimited { .. }));
    }

    #[test]
    fn distinct_keys_do_not_interfere() {
        let limiter = RateLimiter::new();
        limiter.check_and_record("S1:C-A", Duration::from_secs(5)).unwrap();
        limiter.check_and_record("S1:C-B", Duration::from_secs(5)).unwrap();
    }
}
