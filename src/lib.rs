//! # ei-insights - Electric Ireland usage statistics harvester
//!
//! Logs into the Electric Ireland customer portal, follows it to the usage
//! API behind the Insights page and turns the returned interval datapoints
//! into hourly statistics for a home-automation dashboard.
//!
//! ## Architecture
//!
//! - `config`: YAML configuration with environment overrides
//! - `logging`: Structured logging and tracing
//! - `session` / `html`: Cookie-carrying HTTP session and markup extraction
//! - `portal`: Login walk and credential harvesting
//! - `usage`: Per-day usage sources and parallel fetching
//! - `cache`: Refresh suppression within a time window
//! - `statistics`: Hourly bucketing and running sums
//! - `sensor`: Per-metric historical sensors
//! - `persistence`: Registered accounts and stored statistics
//! - `csv_import`: Interval data export parsing
//! - `service`: Polling loop

pub mod cache;
pub mod config;
pub mod csv_import;
pub mod error;
pub mod html;
pub mod logging;
pub mod persistence;
pub mod portal;
pub mod sensor;
pub mod service;
pub mod session;
pub mod statistics;
pub mod usage;

/// Integration domain; prefixes sensor ids
pub const DOMAIN: &str = "electric_ireland_insights";

// Re-export commonly used types
pub use config::Config;
pub use error::{InsightsError, Result};
pub use portal::InsightsClient;
pub use service::InsightsService;
