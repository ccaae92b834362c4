//! In-process daily trigger. Sleeps on a tokio timer until the configured
//! local time, then runs the same dispatch an external cron call would.

use chrono::{Local, NaiveDateTime, NaiveTime};
use std::sync::Arc;

use crate::engine::DailyRunCoordinator;

/// Next occurrence of `at` strictly after `now`.
pub fn next_run_after(now: NaiveDateTime, at: NaiveTime) -> NaiveDateTime {
    let today = now.date().and_time(at);
    if today > now {
        today
    } else {
        today + chrono::Duration::days(1)
    }
}

/// Spawn the daily loop. Runs until the returned handle is aborted.
pub fn spawn_daily(coordinator: Arc<DailyRunCoordinator>, at: NaiveTime) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            let now = Local::now().naive_local();
            let next = next_run_after(now, at);
            tracing::info!("Next scheduled dispatch at {next}");

            let wait = (next - now).to_std().unwrap_or_default();
            tokio::time::sleep(wait).await;

            let summary = coordinator.run_daily(Local::now().date_naive()).await;
            tracing::info!("Scheduled dispatch: {}", summary.details());
        }
    })
}
