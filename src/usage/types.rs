use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, TimeZone};
use serde::{Deserialize, Serialize};

/// One normalized usage interval
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Datapoint {
    /// Energy used in the interval (kWh)
    pub consumption: Option<f64>,
    /// Cost of the interval (EUR)
    pub cost: Option<f64>,
    /// Interval end, unix seconds
    #[serde(rename = "intervalEnd")]
    pub interval_end: i64,
}

/// Which datapoint field a sensor tracks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    Consumption,
    Cost,
}

impl Metric {
    pub const ALL: [Metric; 2] = [Metric::Consumption, Metric::Cost];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Consumption => "consumption",
            Self::Cost => "cost",
        }
    }

    /// The tracked value, if present and a finite number
    pub fn value(&self, dp: &Datapoint) -> Option<f64> {
        let v = match self {
            Self::Consumption => dp.consumption,
            Self::Cost => dp.cost,
        };
        v.filter(|x| x.is_finite())
    }
}

impl std::fmt::Display for Metric {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unix timestamp string of a timezone-aware datetime
pub fn date_to_unix<Tz: TimeZone>(dt: &DateTime<Tz>) -> String {
    dt.timestamp().to_string()
}

/// Unix timestamp string of a naive datetime, read as UTC
pub fn naive_date_to_unix(dt: &NaiveDateTime) -> String {
    dt.and_utc().timestamp().to_string()
}

/// Midnight UTC of `date` as unix seconds
pub(crate) fn day_start_unix(date: NaiveDate) -> i64 {
    date.and_time(NaiveTime::MIN).and_utc().timestamp()
}
