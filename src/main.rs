use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use ei_insights::config::AccountConfig;
use ei_insights::logging::init_logging;
use ei_insights::persistence::{AccountRegistry, JsonStatisticsStore};
use ei_insights::portal::validate_credentials;
use ei_insights::sensor::Sensor;
use ei_insights::statistics::StatisticsRecorder;
use ei_insights::usage::Metric;
use ei_insights::{Config, InsightsService, csv_import};
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

/// Electric Ireland usage statistics harvester
#[derive(Parser)]
#[command(name = "ei-insights")]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Poll the portal on the configured interval (default)
    Run,

    /// Refresh every account once and exit
    Once,

    /// Log in with the configured account and register it
    Register,

    /// Import an interval data CSV export as consumption statistics
    ImportCsv {
        /// Path to the export
        path: PathBuf,

        /// Account the export belongs to; defaults to the configured one
        #[arg(long)]
        account: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = Config::load().context("Failed to load configuration")?;
    init_logging(&config.logging)?;
    config.validate()?;

    info!("Electric Ireland Insights starting up");

    let mut registry = AccountRegistry::new(&config.storage.state_file);
    registry.load()?;

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Register => register(&config, &mut registry).await,
        Commands::ImportCsv { path, account } => {
            let account = account.unwrap_or_else(|| config.account.account_number.clone());
            import_csv(&config, &path, &account)
        }
        Commands::Once => {
            let mut service = build_service(&config, &registry)?;
            let imported = service.refresh_once(Utc::now()).await?;
            info!("Imported {} statistic row(s)", imported);
            Ok(())
        }
        Commands::Run => {
            let mut service = build_service(&config, &registry)?;
            match service.run().await {
                Ok(()) => {
                    info!("Service shutdown complete");
                    Ok(())
                }
                Err(e) => {
                    error!("Service failed with error: {}", e);
                    Err(anyhow::anyhow!("Service error: {}", e))
                }
            }
        }
    }
}

async fn register(config: &Config, registry: &mut AccountRegistry) -> Result<()> {
    validate_credentials(config).await?;
    let entry = registry.add(config.account.clone())?;
    info!("Registered account {}", entry.account.account_number);
    registry.save()?;
    Ok(())
}

/// Registered accounts, plus the configured one when it is complete but
/// not yet registered
fn active_accounts(config: &Config, registry: &AccountRegistry) -> Vec<AccountConfig> {
    let mut accounts: Vec<AccountConfig> = registry
        .entries()
        .iter()
        .map(|e| e.account.clone())
        .collect();
    if config.validate_account().is_ok() && !registry.contains(&config.account.account_number) {
        accounts.push(config.account.clone());
    }
    accounts
}

fn build_service(config: &Config, registry: &AccountRegistry) -> Result<InsightsService> {
    let accounts = active_accounts(config, registry);
    if accounts.is_empty() {
        warn!("No accounts configured; nothing to poll");
    }
    let store = JsonStatisticsStore::open(&config.storage.statistics_file)?;
    Ok(InsightsService::new(config.clone(), &accounts, Box::new(store)))
}

fn import_csv(config: &Config, path: &Path, account: &str) -> Result<()> {
    let tz = config.tz()?;
    let mut sensor = Sensor::new(account, Metric::Consumption);
    let logger = ei_insights::logging::get_logger("csv_import");
    let points = csv_import::import_file(path, tz, &logger)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    sensor.set_datapoints(&points);

    let mut store = JsonStatisticsStore::open(&config.storage.statistics_file)?;
    let latest = store.latest(&sensor.statistic_id())?;
    let rows = sensor.calculate_statistic_data(latest.as_ref());
    if !rows.is_empty() {
        store.import(&sensor.statistic_metadata(), &rows)?;
    }
    info!(
        "Imported {} hour(s) from {} reading(s)",
        rows.len(),
        points.len()
    );
    Ok(())
}
