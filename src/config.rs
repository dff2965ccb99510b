//! Configuration management for ei-insights
//!
//! This module handles loading, validation, and management of the application
//! configuration from YAML files with support for environment variable overrides.

mod defaults;

pub use defaults::{BIDGELY_API_BASE_URL, PORTAL_BASE_URL};

use crate::error::{InsightsError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Environment variable naming an explicit configuration file
pub const CONFIG_PATH_ENV: &str = "EI_INSIGHTS_CONFIG";

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Portal login credentials and target account
    pub account: AccountConfig,

    /// Customer portal connection settings
    pub portal: PortalConfig,

    /// Analytics vendor API settings (Bidgely backend only)
    pub bidgely: BidgelyConfig,

    /// Lookback window, parallelism and refresh cadence
    pub fetch: FetchConfig,

    /// On-disk state locations
    pub storage: StorageConfig,

    /// Logging configuration
    pub logging: LoggingConfig,

    /// Timezone used for local dates (CSV import, log display)
    pub timezone: String,
}

/// Credentials for the customer portal
#[derive(Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(default)]
pub struct AccountConfig {
    /// Portal login (e-mail address)
    pub username: String,

    /// Portal password
    pub password: String,

    /// Electricity account number as printed on the bill
    pub account_number: String,
}

// Manual Debug so the password never reaches a log line
impl std::fmt::Debug for AccountConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccountConfig")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("account_number", &self.account_number)
            .finish()
    }
}

/// Which downstream usage API the Insights page hands us off to
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum Backend {
    /// Portal-hosted MeterInsight JSON endpoint
    #[default]
    MeterInsight,
    /// Bidgely analytics API behind a scraped web-session payload
    Bidgely,
}

impl Backend {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MeterInsight => "meter_insight",
            Self::Bidgely => "bidgely",
        }
    }
}

/// Customer portal settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PortalConfig {
    /// Portal base URL
    pub base_url: String,

    /// Usage backend to harvest credentials for
    pub backend: Backend,

    /// Per-request timeout in seconds
    pub request_timeout_secs: u64,

    /// User-Agent header sent with every request
    pub user_agent: String,
}

/// Bidgely API settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BidgelyConfig {
    /// API base URL for the web-session exchange and usage streams
    pub api_base_url: String,
}

/// Fetch scheduling
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    /// Days to look back; the portal publishes with a 1-3 day delay
    pub lookup_days: u32,

    /// Maximum number of days fetched concurrently
    pub parallel_days: usize,

    /// Polling interval of the service loop in seconds
    pub refresh_interval_secs: u64,

    /// Window during which a repeated full refresh is suppressed
    pub cache_window_secs: u64,
}

/// Storage locations
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Registered accounts (config entries)
    pub state_file: String,

    /// Imported hourly statistics
    pub statistics_file: String,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    pub level: String,

    /// Optional console-only override
    pub console_level: Option<String>,

    /// Optional file-only override
    pub file_level: Option<String>,

    /// Path to log file or log directory
    pub file: String,

    /// Number of rotated files to keep
    pub backup_count: u32,

    /// Whether to log to console
    pub console_output: bool,

    /// Whether to use JSON format
    pub json_format: bool,
}

impl Config {
    /// Load configuration from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&contents)?;
        Ok(config)
    }

    /// Load configuration from the environment-named file or default
    /// locations, then apply credential overrides from the environment
    pub fn load() -> Result<Self> {
        let mut config = Self::load_file()?;
        config.apply_env_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    fn load_file() -> Result<Self> {
        if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
            return Self::from_file(path);
        }

        let default_paths = [
            "ei_insights.yaml",
            "/data/ei_insights.yaml",
            "/etc/ei-insights/config.yaml",
        ];

        for path in &default_paths {
            if Path::new(path).exists() {
                return Self::from_file(path);
            }
        }

        Ok(Config::default())
    }

    /// Override account fields from `EI_USERNAME`, `EI_PASSWORD` and
    /// `EI_ACCOUNT_NUMBER` as resolved by `lookup`
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("EI_USERNAME").filter(|v| !v.is_empty()) {
            self.account.username = v;
        }
        if let Some(v) = lookup("EI_PASSWORD").filter(|v| !v.is_empty()) {
            self.account.password = v;
        }
        if let Some(v) = lookup("EI_ACCOUNT_NUMBER").filter(|v| !v.is_empty()) {
            self.account.account_number = v;
        }
    }

    /// Save configuration to a YAML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let yaml = serde_yaml::to_string(self)?;
        std::fs::write(path, yaml)?;
        Ok(())
    }

    /// Parsed timezone
    pub fn tz(&self) -> Result<chrono_tz::Tz> {
        self.timezone.parse::<chrono_tz::Tz>().map_err(|_| {
            InsightsError::validation("timezone", format!("Unknown timezone: {}", self.timezone))
        })
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.portal.base_url.trim().is_empty() {
            return Err(InsightsError::validation(
                "portal.base_url",
                "Base URL cannot be empty",
            ));
        }
        reqwest::Url::parse(&self.portal.base_url)
            .map_err(|e| InsightsError::validation("portal.base_url", e.to_string()))?;

        if self.portal.backend == Backend::Bidgely {
            reqwest::Url::parse(&self.bidgely.api_base_url)
                .map_err(|e| InsightsError::validation("bidgely.api_base_url", e.to_string()))?;
        }

        if self.fetch.lookup_days == 0 {
            return Err(InsightsError::validation(
                "fetch.lookup_days",
                "Must be greater than 0",
            ));
        }

        if self.fetch.parallel_days == 0 {
            return Err(InsightsError::validation(
                "fetch.parallel_days",
                "Must be greater than 0",
            ));
        }

        if self.fetch.refresh_interval_secs == 0 {
            return Err(InsightsError::validation(
                "fetch.refresh_interval_secs",
                "Must be greater than 0",
            ));
        }

        self.tz()?;
        Ok(())
    }

    /// Validate the account section; required before any login attempt
    pub fn validate_account(&self) -> Result<()> {
        for (field, value) in [
            ("account.username", &self.account.username),
            ("account.password", &self.account.password),
            ("account.account_number", &self.account.account_number),
        ] {
            if value.trim().is_empty() {
                return Err(InsightsError::validation(field, "Must not be empty"));
            }
        }
        Ok(())
    }
}
