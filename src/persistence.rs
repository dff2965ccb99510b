//! Persistence layer for accounts and imported statistics
//!
//! This module handles saving and loading the registered portal accounts
//! and the hourly statistics series across restarts.

use crate::config::AccountConfig;
use crate::error::{InsightsError, Result};
use crate::logging::{StructuredLogger, get_logger};
use crate::statistics::{StatisticData, StatisticMetadata, StatisticsRecorder};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Display title given to every registered account
pub const ENTRY_TITLE: &str = "Electric Ireland Insights";

/// One registered portal account
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AccountEntry {
    pub title: String,
    pub account: AccountConfig,
}

/// Persistent state structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PersistentState {
    #[serde(default)]
    pub accounts: Vec<AccountEntry>,
}

/// Registered accounts, one per account number
#[derive(Debug)]
pub struct AccountRegistry {
    file_path: String,
    state: PersistentState,
    logger: StructuredLogger,
}

impl AccountRegistry {
    /// Create a new, empty registry backed by `file_path`
    pub fn new(file_path: &str) -> Self {
        Self {
            file_path: file_path.to_string(),
            state: PersistentState::default(),
            logger: get_logger("persistence"),
        }
    }

    /// Load state from disk
    pub fn load(&mut self) -> Result<()> {
        let path = Path::new(&self.file_path);

        if !path.exists() {
            self.logger
                .info("No account state file found, starting empty");
            return Ok(());
        }

        let contents = std::fs::read_to_string(path)?;
        self.state = serde_json::from_str(&contents)?;
        self.logger.info(&format!(
            "Loaded {} registered account(s) from disk",
            self.state.accounts.len()
        ));
        Ok(())
    }

    /// Save state to disk
    pub fn save(&self) -> Result<()> {
        let contents = serde_json::to_string_pretty(&self.state)?;
        std::fs::write(&self.file_path, contents)?;
        self.logger.debug("Saved account state to disk");
        Ok(())
    }

    pub fn entries(&self) -> &[AccountEntry] {
        &self.state.accounts
    }

    pub fn contains(&self, account_number: &str) -> bool {
        self.state
            .accounts
            .iter()
            .any(|e| e.account.account_number == account_number)
    }

    /// Register an account; a second entry for the same number is rejected
    pub fn add(&mut self, account: AccountConfig) -> Result<&AccountEntry> {
        if self.contains(&account.account_number) {
            return Err(InsightsError::validation(
                "account_number",
                "account_number_exists",
            ));
        }
        self.state.accounts.push(AccountEntry {
            title: ENTRY_TITLE.to_string(),
            account,
        });
        self.state
            .accounts
            .last()
            .ok_or_else(|| InsightsError::generic("account list empty after insert"))
    }

    /// Unregister an account; returns whether one was removed
    pub fn remove(&mut self, account_number: &str) -> bool {
        let before = self.state.accounts.len();
        self.state
            .accounts
            .retain(|e| e.account.account_number != account_number);
        let removed = self.state.accounts.len() != before;
        if removed {
            self.logger
                .debug(&format!("Successfully unloaded account {}", account_number));
        }
        removed
    }
}

/// One statistics series as stored on disk
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatisticSeries {
    pub metadata: StatisticMetadata,
    pub rows: Vec<StatisticData>,
}

/// File-backed `StatisticsRecorder`; rows are kept sorted by `start`
#[derive(Debug)]
pub struct JsonStatisticsStore {
    file_path: String,
    series: BTreeMap<String, StatisticSeries>,
    logger: StructuredLogger,
}

impl JsonStatisticsStore {
    pub fn new(file_path: &str) -> Self {
        Self {
            file_path: file_path.to_string(),
            series: BTreeMap::new(),
            logger: get_logger("statistics"),
        }
    }

    /// Open and load in one step
    pub fn open(file_path: &str) -> Result<Self> {
        let mut store = Self::new(file_path);
        store.load()?;
        Ok(store)
    }

    pub fn load(&mut self) -> Result<()> {
        let path = Path::new(&self.file_path);
        if !path.exists() {
            return Ok(());
        }
        let contents = std::fs::read_to_string(path)?;
        self.series = serde_json::from_str(&contents)?;
        Ok(())
    }

    pub fn save(&self) -> Result<()> {
        self.write(&self.series)
    }

    fn write(&self, series: &BTreeMap<String, StatisticSeries>) -> Result<()> {
        let contents = serde_json::to_string_pretty(series)?;
        std::fs::write(&self.file_path, contents)?;
        Ok(())
    }

    pub fn series(&self, statistic_id: &str) -> Option<&StatisticSeries> {
        self.series.get(statistic_id)
    }
}

impl StatisticsRecorder for JsonStatisticsStore {
    fn latest(&self, statistic_id: &str) -> Result<Option<StatisticData>> {
        Ok(self
            .series
            .get(statistic_id)
            .and_then(|s| s.rows.last().copied()))
    }

    /// Rows become visible to `latest` only once they are on disk
    fn import(&mut self, metadata: &StatisticMetadata, rows: &[StatisticData]) -> Result<()> {
        let mut merged = self.series.clone();
        let series = merged
            .entry(metadata.statistic_id.clone())
            .or_insert_with(|| StatisticSeries {
                metadata: metadata.clone(),
                rows: Vec::new(),
            });
        series.metadata = metadata.clone();

        for row in rows {
            match series.rows.binary_search_by_key(&row.start, |r| r.start) {
                Ok(idx) => {
                    if let Some(existing) = series.rows.get_mut(idx) {
                        *existing = *row;
                    }
                }
                Err(idx) => series.rows.insert(idx, *row),
            }
        }

        self.write(&merged)?;
        self.series = merged;
        self.logger.info(&format!(
            "Imported {} statistic row(s) into {}",
            rows.len(),
            metadata.statistic_id
        ));
        Ok(())
    }
}
