//! Polling service
//!
//! Drives every registered account's sensors on a fixed interval and
//! imports the resulting hourly rows into the statistics recorder.

use crate::cache::RefreshGate;
use crate::config::{AccountConfig, Config};
use crate::error::Result;
use crate::logging::{StructuredLogger, get_logger};
use crate::portal::InsightsClient;
use crate::sensor::Sensor;
use crate::statistics::StatisticsRecorder;
use chrono::{DateTime, Utc};
use std::time::Duration;
use tokio::time::{Instant, MissedTickBehavior, interval};

struct AccountRuntime {
    client: InsightsClient,
    sensors: Vec<Sensor>,
}

/// Long-running statistics harvester
pub struct InsightsService {
    config: Config,
    accounts: Vec<AccountRuntime>,
    recorder: Box<dyn StatisticsRecorder>,
    gate: RefreshGate,
    logger: StructuredLogger,
}

impl InsightsService {
    pub fn new(
        config: Config,
        accounts: &[AccountConfig],
        recorder: Box<dyn StatisticsRecorder>,
    ) -> Self {
        let accounts = accounts
            .iter()
            .map(|account| AccountRuntime {
                client: InsightsClient::for_account(&config, account),
                sensors: Sensor::for_account(&account.account_number),
            })
            .collect();
        let gate = RefreshGate::new(Duration::from_secs(config.fetch.cache_window_secs));
        Self {
            config,
            accounts,
            recorder,
            gate,
            logger: get_logger("service"),
        }
    }

    pub fn sensors(&self) -> impl Iterator<Item = &Sensor> {
        self.accounts.iter().flat_map(|a| a.sensors.iter())
    }

    /// Refresh every sensor once, regardless of the gate.
    /// Returns the number of statistic rows imported; per-sensor failures
    /// are logged and skipped.
    pub async fn refresh_once(&mut self, now: DateTime<Utc>) -> Result<usize> {
        let mut imported = 0;
        for runtime in &mut self.accounts {
            for sensor in &mut runtime.sensors {
                if let Err(e) = sensor
                    .update_historical(&mut runtime.client, now, &self.config.fetch)
                    .await
                {
                    self.logger.error(&format!(
                        "Failed to update {}: {}",
                        sensor.unique_id(),
                        e
                    ));
                    continue;
                }

                let latest = match self.recorder.latest(&sensor.statistic_id()) {
                    Ok(latest) => latest,
                    Err(e) => {
                        self.logger.error(&format!(
                            "Failed to read latest statistic for {}: {}",
                            sensor.unique_id(),
                            e
                        ));
                        continue;
                    }
                };
                let rows = sensor.calculate_statistic_data(latest.as_ref());
                if rows.is_empty() {
                    self.logger
                        .debug(&format!("No new hours for {}", sensor.unique_id()));
                    continue;
                }
                if let Err(e) = self.recorder.import(&sensor.statistic_metadata(), &rows) {
                    self.logger.error(&format!(
                        "Failed to import statistics for {}: {}",
                        sensor.unique_id(),
                        e
                    ));
                    continue;
                }
                imported += rows.len();
            }
        }
        Ok(imported)
    }

    /// Refresh unless the last full refresh started within the cache window
    pub async fn tick(&mut self) -> Result<Option<usize>> {
        let started = Instant::now();
        if !self.gate.should_refresh(started) {
            self.logger
                .debug("Skipping refresh; data retrieved recently");
            return Ok(None);
        }
        let imported = self.refresh_once(Utc::now()).await?;
        // Mark the start: a window equal to the tick period must not skip ticks
        self.gate.mark(started);
        self.logger
            .info(&format!("Refresh complete, {} row(s) imported", imported));
        Ok(Some(imported))
    }

    /// Poll until Ctrl-C
    pub async fn run(&mut self) -> Result<()> {
        let period = Duration::from_secs(self.config.fetch.refresh_interval_secs.max(1));
        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        self.logger.info(&format!(
            "Polling {} account(s) every {}s",
            self.accounts.len(),
            period.as_secs()
        ));

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if let Err(e) = self.tick().await {
                        self.logger.error(&format!("Refresh failed: {}", e));
                    }
                }
                _ = tokio::signal::ctrl_c() => {
                    self.logger.info("Shutdown requested");
                    break;
                }
            }
        }
        Ok(())
    }
}
