//! Bidgely analytics usage streams
//!
//! The bearer token and user id come from the web-session exchange performed
//! by the portal walk; this module only consumes them.

use super::UsageSource;
use super::types::{Datapoint, day_start_unix};
use crate::error::{InsightsError, Result};
use crate::logging::StructuredLogger;
use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::Url;
use reqwest::header::{ACCEPT, AUTHORIZATION};
use serde_json::Value;

const SECONDS_PER_DAY_MINUS_ONE: i64 = 86_399;

/// Credentials returned by the Bidgely web-session exchange
#[derive(Clone, PartialEq, Eq)]
pub struct BidgelyCredentials {
    pub access_token: String,
    pub user_id: String,
}

impl std::fmt::Debug for BidgelyCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BidgelyCredentials")
            .field("access_token", &"<redacted>")
            .field("user_id", &self.user_id)
            .finish()
    }
}

/// Bearer-authenticated Bidgely usage client
#[derive(Debug, Clone)]
pub struct BidgelySource {
    client: reqwest::Client,
    api_base: Url,
    credentials: BidgelyCredentials,
    logger: StructuredLogger,
}

impl BidgelySource {
    pub fn new(
        client: reqwest::Client,
        api_base: Url,
        credentials: BidgelyCredentials,
        logger: StructuredLogger,
    ) -> Self {
        Self {
            client,
            api_base,
            credentials,
            logger,
        }
    }

    pub fn user_id(&self) -> &str {
        &self.credentials.user_id
    }

    fn stream_url(&self) -> Result<Url> {
        let path = format!(
            "/streams/users/{}/homes/1/gws/2/gb.json",
            self.credentials.user_id
        );
        self.api_base
            .join(&path)
            .map_err(|e| InsightsError::config(format!("Invalid Bidgely URL: {}", e)))
    }
}

#[async_trait]
impl UsageSource for BidgelySource {
    async fn get_data(&self, date: NaiveDate, granular: bool) -> Result<Vec<Datapoint>> {
        let start = day_start_unix(date);
        let end = start + SECONDS_PER_DAY_MINUS_ONE;
        self.logger.debug(&format!(
            "Getting {} data for {}...",
            if granular { "granular" } else { "daily" },
            date
        ));

        let start_s = start.to_string();
        let end_s = end.to_string();
        let resp = self
            .client
            .get(self.stream_url()?)
            .header(
                AUTHORIZATION,
                format!("Bearer {}", self.credentials.access_token),
            )
            .header(ACCEPT, "application/json")
            .query(&[
                ("measurement-type", "ELECTRICITY"),
                ("mode", "day"),
                ("start", start_s.as_str()),
                ("end", end_s.as_str()),
                ("date-format", "DATE_TIME"),
                ("locale", "en_IE"),
                ("next-page", ""),
                ("show-at-granularity", if granular { "true" } else { "false" }),
                ("skip-ongoing-cycle", "false"),
            ])
            .send()
            .await?;

        let resp = crate::session::check_status(resp, "get Bidgely usage data")?;
        let body: Value = resp.json().await?;
        let points = parse_stream(&body)?;
        self.logger
            .debug(&format!("Found {} datapoints for {}", points.len(), date));
        Ok(points)
    }

    fn name(&self) -> &'static str {
        "bidgely"
    }
}

fn number(v: Option<&Value>) -> Option<f64> {
    match v? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

/// Normalize a Bidgely usage stream body. The datapoint list sits either
/// directly in `payload` or in `payload.data`.
pub fn parse_stream(body: &Value) -> Result<Vec<Datapoint>> {
    let payload = body
        .get("payload")
        .ok_or_else(|| InsightsError::api("Bidgely response has no payload"))?;
    let entries = payload
        .as_array()
        .or_else(|| payload.get("data").and_then(Value::as_array))
        .ok_or_else(|| InsightsError::api("Bidgely payload has no datapoint list"))?;

    Ok(entries
        .iter()
        .filter_map(|e| {
            #[allow(clippy::cast_possible_truncation)]
            let interval_end = number(e.get("intervalEnd"))? as i64;
            Some(Datapoint {
                consumption: number(e.get("consumption")),
                cost: number(e.get("cost")),
                interval_end,
            })
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_stream_nested_data() {
        let body = json!({"payload": {"data": [
            {"consumption": 0.25, "cost": 0.07, "intervalEnd": 1764548100},
            {"consumption": "0.5", "intervalEnd": "1764549000"},
            {"consumption": 1.0}
        ]}});
        let points = parse_stream(&body).unwrap();
        assert_eq!(points.len(), 2);
        assert_eq!(points[1].consumption, Some(0.5));
        assert_eq!(points[1].cost, None);
        assert_eq!(points[1].interval_end, 1764549000);
    }

    #[test]
    fn test_parse_stream_flat_payload() {
        let body = json!({"payload": [{"consumption": 2.0, "intervalEnd": 10}]});
        assert_eq!(parse_stream(&body).unwrap().len(), 1);
    }

    #[test]
    fn test_parse_stream_missing_payload() {
        assert!(parse_stream(&json!({"error": "x"})).is_err());
    }

    #[test]
    fn test_credentials_debug_redacts_token() {
        let creds = BidgelyCredentials {
            access_token: "tok-secret".to_string(),
            user_id: "u1".to_string(),
        };
        assert!(!format!("{:?}", creds).contains("tok-secret"));
    }
}
