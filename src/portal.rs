//! Electric Ireland portal credential scraper
//!
//! `InsightsClient` logs into the customer portal, walks to the Insights
//! page and turns what it finds there into an authenticated `UsageSource`
//! for the configured backend.

pub mod exchange;
pub mod login;

use crate::cache::{CachedSource, UsageCache};
use crate::config::{AccountConfig, Backend, BidgelyConfig, Config, PortalConfig};
use crate::error::{InsightsError, Result};
use crate::logging::{LogContext, StructuredLogger, get_logger_with_context};
use crate::session::PortalSession;
use crate::usage::{BidgelySource, MeterInsightSource, UsageSource};
use reqwest::Url;
use std::sync::Arc;
use std::time::Duration;

/// Scraper for one portal account
pub struct InsightsClient {
    account: AccountConfig,
    portal: PortalConfig,
    bidgely: BidgelyConfig,
    cache: Arc<UsageCache>,
    source: Option<Arc<dyn UsageSource>>,
    logger: StructuredLogger,
}

impl std::fmt::Debug for InsightsClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InsightsClient")
            .field("account", &self.account)
            .field("backend", &self.portal.backend)
            .field("authenticated", &self.source.is_some())
            .finish_non_exhaustive()
    }
}

impl InsightsClient {
    /// Client for the account configured in `config.account`
    pub fn new(config: &Config) -> Self {
        Self::for_account(config, &config.account)
    }

    /// Client for an explicitly given account, sharing the rest of `config`
    pub fn for_account(config: &Config, account: &AccountConfig) -> Self {
        let logger = get_logger_with_context(
            LogContext::new("portal")
                .with_account(&account.account_number)
                .with_field("backend", config.portal.backend.as_str().to_string()),
        );
        Self {
            account: account.clone(),
            portal: config.portal.clone(),
            bidgely: config.bidgely.clone(),
            cache: Arc::new(UsageCache::new(Duration::from_secs(
                config.fetch.cache_window_secs,
            ))),
            source: None,
            logger,
        }
    }

    pub fn account_number(&self) -> &str {
        &self.account.account_number
    }

    /// Whether a usable source has been established
    pub fn is_authenticated(&self) -> bool {
        self.source.is_some()
    }

    /// Log in from scratch on a fresh session. On failure the previous
    /// source, if any, stays in place.
    pub async fn refresh_credentials(&mut self) -> Result<()> {
        self.logger.info("Trying to refresh credentials...");
        match self.authenticate().await {
            Ok(source) => {
                self.source = Some(source);
                Ok(())
            }
            Err(e) => {
                self.logger
                    .error(&format!("Failed to refresh credentials: {}", e));
                Err(e)
            }
        }
    }

    /// Current source, logging in first if there is none yet
    pub async fn source(&mut self) -> Result<Arc<dyn UsageSource>> {
        if self.source.is_none() {
            self.refresh_credentials().await?;
        }
        self.source
            .clone()
            .ok_or_else(|| InsightsError::auth("No usage source after login"))
    }

    async fn authenticate(&self) -> Result<Arc<dyn UsageSource>> {
        let session = PortalSession::new(&self.portal)?;
        let insights = login::login_to_insights(&session, &self.account, &self.logger).await?;

        let inner: Arc<dyn UsageSource> = match self.portal.backend {
            Backend::MeterInsight => {
                let ids = login::extract_meter_ids(&insights)?;
                self.logger.info(&format!(
                    "Found meter IDs: partner={}, contract={}, premise={}",
                    ids.partner, ids.contract, ids.premise
                ));
                Arc::new(MeterInsightSource::new(session, ids, self.logger.clone()))
            }
            Backend::Bidgely => {
                let payload = exchange::extract_payload(&insights)?;
                let api_base = Url::parse(&self.bidgely.api_base_url).map_err(|e| {
                    InsightsError::config(format!("Invalid Bidgely URL: {}", e))
                })?;
                let credentials = exchange::exchange_payload(&session, &api_base, &payload).await?;
                self.logger.info(&format!(
                    "Obtained analytics token for user {}",
                    credentials.user_id
                ));
                Arc::new(BidgelySource::new(
                    session.client().clone(),
                    api_base,
                    credentials,
                    self.logger.clone(),
                ))
            }
        };

        Ok(Arc::new(CachedSource::with_cache(
            inner,
            Arc::clone(&self.cache),
        )))
    }
}

/// Log in once with the configured account; used before registering it
pub async fn validate_credentials(config: &Config) -> Result<()> {
    config.validate_account()?;
    let mut client = InsightsClient::new(config);
    client.refresh_credentials().await?;
    if !client.is_authenticated() {
        return Err(InsightsError::auth(
            "Failed to authenticate with Electric Ireland",
        ));
    }
    Ok(())
}
