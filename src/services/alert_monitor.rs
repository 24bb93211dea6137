use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, NaiveTime, Utc};
use tokio::time;

use super::dispatcher::Dispatcher;

/// Time left until the next `hour`:00 UTC strictly after `now`.
pub fn until_next_run(now: DateTime<Utc>, hour: u32) -> Duration {
    let at = NaiveTime::from_hms_opt(hour.min(23), 0, 0).unwrap_or(NaiveTime::MIN);
    let mut next = now.date_naive().and_time(at).and_utc();
    if next <= now {
        next = next + chrono::Duration::days(1);
    }
    (next - now).to_std().unwrap_or(Duration::ZERO)
}

/// Runs the alert sweep once a day at `hour` UTC, for the life of the process.
pub fn spawn_daily_sweep(dispatcher: Arc<Dispatcher>, hour: u32) {
    tokio::spawn(async move {
        loop {
            let wait = until_next_run(Utc::now(), hour);
            tracing::info!(in_secs = wait.as_secs(), hour_utc = hour, "next alert sweep scheduled");
            time::sleep(wait).await;

            match dispatcher.run_daily_sweep().await {
                Ok(tally) => tracing::info!(?tally, "scheduled alert sweep finished"),
                Err(e) => tracing::error!(error = %e, "scheduled alert sweep failed"),
            }
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn later_today() {
        let now = Utc.with_ymd_and_hms(2025, 3, 10, 7, 30, 0).unwrap();
        assert_eq!(until_next_run(now, 9), Duration::from_secs(90 * 60));
    }

    #[test]
    fn rolls_to_tomorrow() {
        let now = Utc.with_ymd_and_hms(2025, 3, 10, 9, 0, 0).unwrap();
        assert_eq!(until_next_run(now, 9), Duration::from_secs(24 * 3600));
    }
}
