//! The Scheduler Hook (C7): a process-internal wall-clock trigger. Missed
//! runs while the process was down are not replayed - the next scheduled
//! tick just runs normally, same as a manual `pre_generate_daily` call.

use crate::orchestrator::Orchestrator;
use chrono::{Duration, Timelike, Utc};
use std::sync::Arc;
use std::time::Duration as StdDuration;
use vansales_core::config::SchedulerSettings;

pub fn spawn(orchestrator: Arc<Orchestrator>, settings: SchedulerSettings, retention_days: i64) {
    tokio::spawn(async move {
        loop {
            let sleep_for = duration_until_next_run(settings.hour, settings.minute);
            tracing::info!(hour = settings.hour, minute = settings.minute, sleep_secs = sleep_for.as_secs(), "scheduler: next pre-generation run scheduled");
            tokio::time::sleep(sleep_for).await;

            let today = Utc::now().date_naive();
            let target_date = today + Duration::days(1);
            tracing::info!(date = %target_date, routes = settings.routes.len(), "scheduler: running daily pre-generation");

            let results = orchestrator.pre_generate_daily(target_date, &settings.routes).await;
            for result in results {
                tracing::info!(route = %result.route, outcome = ?result.outcome, "scheduler: pre-generation result");
            }

            match orchestrator.enforce_retention(today, retention_days).await {
                Ok(deleted) => tracing::info!(deleted, "scheduler: retention cleanup complete"),
                Err(err) => tracing::warn!(%err, "scheduler: retention cleanup failed"),
            }
        }
    });
}

fn duration_until_next_run(hour: u32, minute: u32) -> StdDuration {
    let now = Utc::now();
    let mut next = now.date_naive().and_hms_opt(hour, minute, 0).expect("validated scheduler hour/minute");
    if next <= now.naive_utc() {
        next += Duration::days(1);
    }
    let delta = next - now.naive_utc();
    StdDuration::from_secs(delta.num_seconds().max(1) as u64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn computes_a_positive_sleep_duration() {
        let duration = duration_until_next_run(Utc::now().hour(), Utc::now().minute());
        assert!(duration.as_secs() > 0);
    }
}
