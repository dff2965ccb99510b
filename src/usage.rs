//! Usage data retrieval
//!
//! A `UsageSource` answers one question: the interval datapoints of a given
//! day. Two backends implement it (the portal's MeterInsight endpoint and the
//! Bidgely analytics API), `fetch` fans requests out over a window of days.

pub mod bidgely;
pub mod fetch;
pub mod meter_insight;
pub mod types;

pub use bidgely::{BidgelyCredentials, BidgelySource};
pub use fetch::{fetch_days, lookup_window};
pub use meter_insight::{MeterIds, MeterInsightSource};
pub use types::{Datapoint, Metric, date_to_unix, naive_date_to_unix};

use crate::error::Result;
use async_trait::async_trait;
use chrono::NaiveDate;
use std::sync::Arc;

/// One day of interval datapoints from an authenticated backend
#[async_trait]
pub trait UsageSource: Send + Sync {
    /// Datapoints whose interval ends on `date`. `granular` asks for the
    /// finest resolution the backend offers; backends may ignore it.
    async fn get_data(&self, date: NaiveDate, granular: bool) -> Result<Vec<Datapoint>>;

    /// Short backend name for logs
    fn name(&self) -> &'static str;

    /// Whether `granular` changes the answer; caches key on it only if so
    fn honours_granularity(&self) -> bool {
        true
    }
}

#[async_trait]
impl<T: UsageSource + ?Sized> UsageSource for Arc<T> {
    async fn get_data(&self, date: NaiveDate, granular: bool) -> Result<Vec<Datapoint>> {
        (**self).get_data(date, granular).await
    }

    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn honours_granularity(&self) -> bool {
        (**self).honours_granularity()
    }
}
