//! HTTP session for the portal login walk
//!
//! A thin wrapper over a cookie-carrying `reqwest::Client`. Every request
//! names the step it belongs to so a non-success status surfaces as a
//! readable `Network` error.

use crate::config::PortalConfig;
use crate::error::{InsightsError, Result};
use reqwest::Url;
use reqwest::cookie::{CookieStore, Jar};
use std::sync::Arc;
use std::time::Duration;

/// Cookie-persistent session bound to one portal base URL
#[derive(Debug, Clone)]
pub struct PortalSession {
    client: reqwest::Client,
    jar: Arc<Jar>,
    base_url: Url,
}

impl PortalSession {
    /// Build a fresh session with an empty cookie jar
    pub fn new(portal: &PortalConfig) -> Result<Self> {
        let base_url = Url::parse(&portal.base_url)
            .map_err(|e| InsightsError::config(format!("Invalid portal URL: {}", e)))?;
        let jar = Arc::new(Jar::default());
        let client = reqwest::Client::builder()
            .cookie_provider(Arc::clone(&jar))
            .timeout(Duration::from_secs(portal.request_timeout_secs.max(1)))
            .user_agent(portal.user_agent.clone())
            .build()?;
        Ok(Self {
            client,
            jar,
            base_url,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Resolve a portal-relative path
    pub fn url(&self, path: &str) -> Result<Url> {
        self.base_url
            .join(path)
            .map_err(|e| InsightsError::config(format!("Invalid portal path {}: {}", path, e)))
    }

    /// Underlying client, shared with the usage sources so cookies carry over
    pub fn client(&self) -> &reqwest::Client {
        &self.client
    }

    /// GET a portal page and return its body
    pub async fn get_text(&self, path: &str, step: &str) -> Result<String> {
        let url = self.url(path)?;
        let resp = self.client.get(url).send().await?;
        let resp = check_status(resp, step)?;
        Ok(resp.text().await?)
    }

    /// GET with query parameters, returning the raw response for callers
    /// that need headers
    pub async fn get_with_query(
        &self,
        url: Url,
        query: &[(&str, &str)],
        step: &str,
    ) -> Result<reqwest::Response> {
        let resp = self.client.get(url).query(query).send().await?;
        check_status(resp, step)
    }

    /// POST an urlencoded form to a portal path and return the body
    pub async fn post_form(
        &self,
        path: &str,
        fields: &[(String, String)],
        step: &str,
    ) -> Result<String> {
        let url = self.url(path)?;
        self.post_form_url(url, fields, step).await
    }

    /// POST an urlencoded form to an absolute URL and return the body
    pub async fn post_form_url(
        &self,
        url: Url,
        fields: &[(String, String)],
        step: &str,
    ) -> Result<String> {
        let resp = self.client.post(url).form(fields).send().await?;
        let resp = check_status(resp, step)?;
        Ok(resp.text().await?)
    }

    /// Value of a cookie the portal has set for its base URL
    pub fn cookie(&self, name: &str) -> Option<String> {
        let header = self.jar.cookies(&self.base_url)?;
        let header = header.to_str().ok()?;
        cookie_from_header(header, name)
    }
}

/// Map a non-2xx status to a `Network` error naming the step
pub fn check_status(resp: reqwest::Response, step: &str) -> Result<reqwest::Response> {
    let status = resp.status();
    if status.is_success() {
        Ok(resp)
    } else {
        Err(InsightsError::network(format!(
            "Failed to {}: HTTP {}",
            step, status
        )))
    }
}

/// Find `name` in a `Cookie:` header value (`a=1; b=2`)
pub(crate) fn cookie_from_header(header: &str, name: &str) -> Option<String> {
    header
        .split(';')
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(k, _)| *k == name)
        .map(|(_, v)| v.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cookie_from_header() {
        let header = "ASP.NET_SessionId=abc; rvt=token-123; other=x=y";
        assert_eq!(cookie_from_header(header, "rvt").as_deref(), Some("token-123"));
        assert_eq!(cookie_from_header(header, "other").as_deref(), Some("x=y"));
        assert_eq!(cookie_from_header(header, "missing"), None);
    }

    #[test]
    fn test_url_join() {
        let portal = PortalConfig {
            base_url: "https://example.invalid".to_string(),
            ..PortalConfig::default()
        };
        let session = PortalSession::new(&portal).unwrap();
        assert_eq!(
            session.url("/Accounts/OnEvent").unwrap().as_str(),
            "https://example.invalid/Accounts/OnEvent"
        );
        assert!(session.cookie("rvt").is_none());
    }

    #[tokio::test]
    async fn test_non_success_status_is_network_error() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("GET", "/")
            .with_status(503)
            .create_async()
            .await;
        let portal = PortalConfig {
            base_url: server.url(),
            ..PortalConfig::default()
        };
        let session = PortalSession::new(&portal).unwrap();
        let err = session.get_text("/", "get source token").await.unwrap_err();
        assert!(matches!(err, InsightsError::Network { .. }));
        assert!(err.to_string().contains("get source token"));
    }
}
