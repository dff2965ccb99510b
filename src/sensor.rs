//! Historical sensors
//!
//! One sensor per metric per account. A sensor owns the readings of its
//! last refresh and turns them into hourly statistic rows; it never talks
//! to the recorder itself.

use crate::DOMAIN;
use crate::config::FetchConfig;
use crate::error::Result;
use crate::logging::{LogContext, StructuredLogger, get_logger_with_context};
use crate::portal::InsightsClient;
use crate::statistics::{self, HistoricalState, StatisticData, StatisticMetadata};
use crate::usage::{self, Datapoint, Metric};
use chrono::{DateTime, Utc};
use serde::Serialize;

/// What a sensor measures, for dashboard display
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceClass {
    Energy,
    Monetary,
}

/// One historical sensor
#[derive(Debug, Clone)]
pub struct Sensor {
    metric: Metric,
    unique_id: String,
    name: String,
    unit: &'static str,
    device_class: DeviceClass,
    historical_states: Vec<HistoricalState>,
    logger: StructuredLogger,
}

impl Sensor {
    pub fn new(account_number: &str, metric: Metric) -> Self {
        let (label, unit, device_class) = match metric {
            Metric::Consumption => ("Consumption", "kWh", DeviceClass::Energy),
            Metric::Cost => ("Cost", "EUR", DeviceClass::Monetary),
        };
        Self {
            metric,
            unique_id: format!("{}_{}_{}", DOMAIN, metric, account_number),
            name: format!("Electric Ireland {}", label),
            unit,
            device_class,
            historical_states: Vec::new(),
            logger: get_logger_with_context(
                LogContext::new("sensor")
                    .with_account(account_number)
                    .with_field("metric", metric.to_string()),
            ),
        }
    }

    /// The consumption and cost sensors of an account
    pub fn for_account(account_number: &str) -> Vec<Sensor> {
        Metric::ALL
            .iter()
            .map(|m| Sensor::new(account_number, *m))
            .collect()
    }

    pub fn metric(&self) -> Metric {
        self.metric
    }

    pub fn unique_id(&self) -> &str {
        &self.unique_id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn unit(&self) -> &'static str {
        self.unit
    }

    pub fn device_class(&self) -> DeviceClass {
        self.device_class
    }

    pub fn statistic_id(&self) -> String {
        format!("sensor.{}", self.unique_id)
    }

    pub fn historical_states(&self) -> &[HistoricalState] {
        &self.historical_states
    }

    /// Log in afresh, fetch the lookup window and keep this metric's readings.
    /// Returns the number of readings kept.
    pub async fn update_historical(
        &mut self,
        client: &mut InsightsClient,
        now: DateTime<Utc>,
        fetch: &FetchConfig,
    ) -> Result<usize> {
        // A failed refresh still leaves an older session usable
        if let Err(e) = client.refresh_credentials().await
            && !client.is_authenticated()
        {
            return Err(e);
        }
        let source = client.source().await?;

        let days = usage::lookup_window(now, fetch.lookup_days);
        let granular = self.metric == Metric::Consumption;
        let points =
            usage::fetch_days(source, &days, granular, fetch.parallel_days, &self.logger).await;

        self.set_datapoints(&points);
        self.logger.debug(&format!(
            "Collected {} readings over {} day(s)",
            self.historical_states.len(),
            days.len()
        ));
        Ok(self.historical_states.len())
    }

    /// Replace the readings with this metric's numeric values from `points`
    pub fn set_datapoints(&mut self, points: &[Datapoint]) {
        self.historical_states = states_from_datapoints(self.metric, points);
    }

    pub fn statistic_metadata(&self) -> StatisticMetadata {
        StatisticMetadata {
            statistic_id: self.statistic_id(),
            name: self.name.clone(),
            unit_of_measurement: self.unit.to_string(),
            has_sum: true,
            has_mean: true,
            source: "recorder".to_string(),
        }
    }

    /// Hourly rows for readings newer than `latest`, continuing its sum
    pub fn calculate_statistic_data(&self, latest: Option<&StatisticData>) -> Vec<StatisticData> {
        let fresh = statistics::states_after(self.historical_states.clone(), latest);
        statistics::calculate_statistic_data(&fresh, latest)
    }
}

/// Readings of `metric` from `points`; missing or non-numeric values are skipped
pub fn states_from_datapoints(metric: Metric, points: &[Datapoint]) -> Vec<HistoricalState> {
    points
        .iter()
        .filter_map(|dp| {
            let state = metric.value(dp)?;
            let dt = DateTime::from_timestamp(dp.interval_end, 0)?;
            Some(HistoricalState { state, dt })
        })
        .collect()
}
