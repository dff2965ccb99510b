//! Hourly statistics from irregular-interval usage
//!
//! Datapoints are bucketed by the hour their interval ends in. A datapoint
//! ending exactly on the hour closes the previous hour, so `01:00:00`
//! belongs to the `00:00` bucket while `01:15:00` belongs to `01:00`.

use crate::error::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

const SECONDS_PER_HOUR: i64 = 3600;

/// One metric reading at the end of its interval
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HistoricalState {
    pub state: f64,
    pub dt: DateTime<Utc>,
}

/// One hourly statistic row
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StatisticData {
    /// Start of the hour bucket
    pub start: DateTime<Utc>,
    /// Sum of the bucket's readings
    pub state: f64,
    /// Mean of the bucket's readings
    pub mean: f64,
    /// Running total up to and including this bucket
    pub sum: f64,
}

/// Describes a statistic series to the recorder
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatisticMetadata {
    pub statistic_id: String,
    pub name: String,
    pub unit_of_measurement: String,
    pub has_sum: bool,
    pub has_mean: bool,
    pub source: String,
}

/// Storage for imported statistics
pub trait StatisticsRecorder: Send {
    /// Most recent statistic row of a series
    fn latest(&self, statistic_id: &str) -> Result<Option<StatisticData>>;

    /// Insert or replace rows (matched on `start`) of a series
    fn import(&mut self, metadata: &StatisticMetadata, rows: &[StatisticData]) -> Result<()>;
}

/// Hour bucket a reading belongs to
pub fn hour_block(dt: DateTime<Utc>) -> DateTime<Utc> {
    let secs = dt.timestamp();
    let into_hour = secs.rem_euclid(SECONDS_PER_HOUR);
    let block = if into_hour == 0 {
        secs - SECONDS_PER_HOUR
    } else {
        secs - into_hour
    };
    DateTime::from_timestamp(block, 0).unwrap_or(dt)
}

/// Drop readings already covered by the recorder's latest row
pub fn states_after(
    states: Vec<HistoricalState>,
    latest: Option<&StatisticData>,
) -> Vec<HistoricalState> {
    match latest {
        None => states,
        Some(latest) => states
            .into_iter()
            .filter(|s| hour_block(s.dt) > latest.start)
            .collect(),
    }
}

/// Group readings by hour block and accumulate, continuing from `latest.sum`
pub fn calculate_statistic_data(
    states: &[HistoricalState],
    latest: Option<&StatisticData>,
) -> Vec<StatisticData> {
    let mut sorted = states.to_vec();
    sorted.sort_by_key(|s| s.dt);

    let mut accumulated = latest.map_or(0.0, |l| l.sum);
    let mut rows = Vec::new();

    let mut iter = sorted.into_iter().peekable();
    while let Some(first) = iter.next() {
        let block = hour_block(first.dt);
        let mut partial_sum = first.state;
        let mut count = 1_u32;
        while let Some(next) = iter.next_if(|s| hour_block(s.dt) == block) {
            partial_sum += next.state;
            count += 1;
        }
        accumulated += partial_sum;
        rows.push(StatisticData {
            start: block,
            state: partial_sum,
            mean: partial_sum / f64::from(count),
            sum: accumulated,
        });
    }
    rows
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(h: u32, m: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 12, 1, h, m, s).unwrap()
    }

    fn st(state: f64, dt: DateTime<Utc>) -> HistoricalState {
        HistoricalState { state, dt }
    }

    #[test]
    fn test_hour_block_boundaries() {
        assert_eq!(hour_block(at(1, 0, 0)), at(0, 0, 0));
        assert_eq!(hour_block(at(1, 0, 1)), at(1, 0, 0));
        assert_eq!(hour_block(at(1, 59, 59)), at(1, 0, 0));
        assert_eq!(
            hour_block(at(0, 0, 0)),
            Utc.with_ymd_and_hms(2025, 11, 30, 23, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_quarter_hours_fold_into_hour() {
        let states = vec![
            st(0.25, at(0, 15, 0)),
            st(0.5, at(0, 30, 0)),
            st(0.75, at(0, 45, 0)),
            st(1.0, at(1, 0, 0)),
            st(2.0, at(1, 15, 0)),
        ];
        let rows = calculate_statistic_data(&states, None);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].start, at(0, 0, 0));
        assert!((rows[0].state - 2.5).abs() < 1e-9);
        assert!((rows[0].mean - 0.625).abs() < 1e-9);
        assert!((rows[0].sum - 2.5).abs() < 1e-9);
        assert_eq!(rows[1].start, at(1, 0, 0));
        assert!((rows[1].sum - 4.5).abs() < 1e-9);
    }

    #[test]
    fn test_continues_from_latest_sum() {
        let latest = StatisticData {
            start: at(0, 0, 0),
            state: 1.0,
            mean: 1.0,
            sum: 100.0,
        };
        let rows = calculate_statistic_data(&[st(0.4, at(1, 59, 59))], Some(&latest));
        assert!((rows[0].sum - 100.4).abs() < 1e-9);
    }

    #[test]
    fn test_unsorted_input_grouped_once_per_hour() {
        let states = vec![
            st(1.0, at(2, 30, 0)),
            st(1.0, at(0, 30, 0)),
            st(1.0, at(2, 45, 0)),
        ];
        let rows = calculate_statistic_data(&states, None);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].start, at(2, 0, 0));
        assert!((rows[1].state - 2.0).abs() < 1e-9);
        assert!((rows[1].sum - 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_empty_input() {
        assert!(calculate_statistic_data(&[], None).is_empty());
    }

    #[test]
    fn test_states_after_latest() {
        let latest = StatisticData {
            start: at(1, 0, 0),
            state: 0.0,
            mean: 0.0,
            sum: 0.0,
        };
        let states = vec![
            st(1.0, at(1, 30, 0)),
            st(1.0, at(2, 0, 0)),
            st(1.0, at(2, 0, 1)),
        ];
        let kept = states_after(states, Some(&latest));
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].dt, at(2, 0, 1));
    }
}
