//! Fire-and-collect fetching over a window of days

use super::UsageSource;
use super::types::Datapoint;
use crate::logging::StructuredLogger;
use chrono::{DateTime, Duration, NaiveDate, Utc};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

/// Days to request for a refresh at `now`.
///
/// Data is never published for the current day, so the window is anchored
/// at midnight UTC yesterday and reaches back `lookup_days + 1` days from
/// there; it then runs forward day by day up to `now`.
pub fn lookup_window(now: DateTime<Utc>, lookup_days: u32) -> Vec<NaiveDate> {
    let anchor = now.date_naive() - Duration::days(1);
    let mut current = anchor - Duration::days(i64::from(lookup_days) + 1);
    let mut days = Vec::new();
    while current
        .and_hms_opt(0, 0, 0)
        .is_some_and(|midnight| midnight.and_utc() <= now)
    {
        days.push(current);
        current += Duration::days(1);
    }
    days
}

/// Fetch every day with at most `parallel` requests in flight.
///
/// A failing day is logged and contributes nothing; results come back in
/// day order regardless of completion order.
pub async fn fetch_days<S>(
    source: Arc<S>,
    days: &[NaiveDate],
    granular: bool,
    parallel: usize,
    logger: &StructuredLogger,
) -> Vec<Datapoint>
where
    S: UsageSource + ?Sized + 'static,
{
    let permits = Arc::new(Semaphore::new(parallel.max(1)));
    let mut set = JoinSet::new();

    for (idx, day) in days.iter().copied().enumerate() {
        let source = Arc::clone(&source);
        let permits = Arc::clone(&permits);
        set.spawn(async move {
            let _permit = permits.acquire_owned().await.ok();
            (idx, day, source.get_data(day, granular).await)
        });
    }

    let mut per_day: Vec<Vec<Datapoint>> = vec![Vec::new(); days.len()];
    while let Some(joined) = set.join_next().await {
        match joined {
            Ok((idx, _, Ok(points))) => {
                if let Some(slot) = per_day.get_mut(idx) {
                    *slot = points;
                }
            }
            Ok((_, day, Err(e))) => {
                logger.error(&format!("Failed to get usage data for {}: {}", day, e));
            }
            Err(e) => logger.error(&format!("Usage fetch task failed: {}", e)),
        }
    }

    per_day.into_iter().flatten().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{InsightsError, Result};
    use crate::logging::get_logger;
    use async_trait::async_trait;
    use chrono::TimeZone;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FakeSource {
        in_flight: AtomicUsize,
        peak: AtomicUsize,
    }

    #[async_trait]
    impl UsageSource for FakeSource {
        async fn get_data(&self, date: NaiveDate, _granular: bool) -> Result<Vec<Datapoint>> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            // Later days finish first to exercise ordering
            let delay = 40 - u64::from(chrono::Datelike::day(&date));
            tokio::time::sleep(std::time::Duration::from_millis(delay)).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            if chrono::Datelike::day(&date) == 3 {
                return Err(InsightsError::api("boom"));
            }
            Ok(vec![Datapoint {
                consumption: Some(1.0),
                cost: None,
                interval_end: crate::usage::types::day_start_unix(date) + 3599,
            }])
        }

        fn name(&self) -> &'static str {
            "fake"
        }
    }

    #[test]
    fn test_lookup_window() {
        let now = Utc.with_ymd_and_hms(2025, 12, 20, 9, 30, 0).unwrap();
        let days = lookup_window(now, 10);
        assert_eq!(days.first(), NaiveDate::from_ymd_opt(2025, 12, 8).as_ref());
        assert_eq!(days.last(), NaiveDate::from_ymd_opt(2025, 12, 20).as_ref());
        assert_eq!(days.len(), 13);
    }

    #[test]
    fn test_lookup_window_exactly_midnight() {
        let now = Utc.with_ymd_and_hms(2025, 12, 20, 0, 0, 0).unwrap();
        let days = lookup_window(now, 1);
        assert_eq!(days.len(), 4);
        assert_eq!(days.last(), NaiveDate::from_ymd_opt(2025, 12, 20).as_ref());
    }

    #[tokio::test]
    async fn test_fetch_days_ordering_and_failures() {
        let source = Arc::new(FakeSource {
            in_flight: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        });
        let days: Vec<NaiveDate> = (1..=6)
            .filter_map(|d| NaiveDate::from_ymd_opt(2025, 12, d))
            .collect();
        let points = fetch_days(Arc::clone(&source), &days, true, 2, &get_logger("test")).await;

        assert_eq!(points.len(), 5);
        let ends: Vec<i64> = points.iter().map(|p| p.interval_end).collect();
        let mut sorted = ends.clone();
        sorted.sort_unstable();
        assert_eq!(ends, sorted);
        assert!(source.peak.load(Ordering::SeqCst) <= 2);
    }
}
