use super::*;

/// Customer portal root
pub const PORTAL_BASE_URL: &str = "https://youraccountonline.electricireland.ie";

/// Bidgely EU API root
pub const BIDGELY_API_BASE_URL: &str = "https://api.eu.bidgely.com";

impl Default for PortalConfig {
    fn default() -> Self {
        Self {
            base_url: PORTAL_BASE_URL.to_string(),
            backend: Backend::MeterInsight,
            request_timeout_secs: 30,
            user_agent: format!("ei-insights/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl Default for BidgelyConfig {
    fn default() -> Self {
        Self {
            api_base_url: BIDGELY_API_BASE_URL.to_string(),
        }
    }
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            lookup_days: 10,
            parallel_days: 5,
            refresh_interval_secs: 3600,
            cache_window_secs: 3600,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            state_file: "/data/ei_insights_state.json".to_string(),
            statistics_file: "/data/ei_insights_statistics.json".to_string(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "INFO".to_string(),
            console_level: None,
            file_level: None,
            file: "/tmp/ei-insights.log".to_string(),
            backup_count: 5,
            console_output: true,
            json_format: false,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            account: AccountConfig::default(),
            portal: PortalConfig::default(),
            bidgely: BidgelyConfig::default(),
            fetch: FetchConfig::default(),
            storage: StorageConfig::default(),
            logging: LoggingConfig::default(),
            timezone: "Europe/Dublin".to_string(),
        }
    }
}
