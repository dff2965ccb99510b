//! Portal-hosted MeterInsight hourly-usage endpoint

use super::UsageSource;
use super::types::Datapoint;
use crate::error::{InsightsError, Result};
use crate::logging::StructuredLogger;
use crate::session::PortalSession;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::Deserialize;

/// Identifiers the Insights page exposes on `#modelData`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MeterIds {
    pub partner: String,
    pub contract: String,
    pub premise: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct HourlyUsageResponse {
    #[serde(default)]
    is_success: bool,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    data: Option<Vec<RawHourly>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawHourly {
    #[serde(default)]
    flat_rate: Option<FlatRate>,
    #[serde(default)]
    end_date: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct FlatRate {
    #[serde(default)]
    consumption: Option<f64>,
    #[serde(default)]
    cost: Option<f64>,
}

/// Authenticated (cookie session) MeterInsight client
#[derive(Debug, Clone)]
pub struct MeterInsightSource {
    session: PortalSession,
    ids: MeterIds,
    logger: StructuredLogger,
}

impl MeterInsightSource {
    pub fn new(session: PortalSession, ids: MeterIds, logger: StructuredLogger) -> Self {
        Self {
            session,
            ids,
            logger,
        }
    }

    pub fn ids(&self) -> &MeterIds {
        &self.ids
    }

    fn endpoint(&self) -> String {
        format!(
            "/MeterInsight/{}/{}/{}/hourly-usage",
            self.ids.partner, self.ids.contract, self.ids.premise
        )
    }
}

#[async_trait]
impl UsageSource for MeterInsightSource {
    async fn get_data(&self, date: NaiveDate, _granular: bool) -> Result<Vec<Datapoint>> {
        let date_str = date.format("%Y-%m-%d").to_string();
        self.logger
            .debug(&format!("Getting hourly data for {}...", date_str));

        let url = self.session.url(&self.endpoint())?;
        let resp = self
            .session
            .get_with_query(url, &[("date", date_str.as_str())], "get hourly usage data")
            .await?;

        let content_type = resp
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        let body = resp.text().await?;

        if !content_type.contains("application/json") {
            return Err(InsightsError::api(format!(
                "Expected JSON but got {}. Response: {}",
                content_type,
                preview(&body)
            )));
        }

        let points = parse_hourly_usage(&body, &self.logger)?;
        self.logger.debug(&format!(
            "Found {} hourly datapoints for {}",
            points.len(),
            date_str
        ));
        Ok(points)
    }

    fn name(&self) -> &'static str {
        "meter_insight"
    }

    fn honours_granularity(&self) -> bool {
        false
    }
}

/// First 500 characters of a body, for error messages
fn preview(body: &str) -> String {
    body.chars().take(500).collect()
}

/// Parse an `endDate` such as `2025-12-01T00:59:59Z`; offset-less values are UTC
fn parse_end_date(s: &str) -> Option<i64> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.timestamp());
    }
    NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|dt| dt.and_utc().timestamp())
}

/// Normalize a MeterInsight hourly-usage JSON body
pub fn parse_hourly_usage(body: &str, logger: &StructuredLogger) -> Result<Vec<Datapoint>> {
    let parsed: HourlyUsageResponse = serde_json::from_str(body).map_err(|e| {
        InsightsError::serialization(format!(
            "Failed to parse JSON: {}. Response: {}",
            e,
            preview(body)
        ))
    })?;

    if !parsed.is_success {
        return Err(InsightsError::api(format!(
            "API returned error: {}",
            parsed.message.unwrap_or_default()
        )));
    }

    let mut points = Vec::new();
    for raw in parsed.data.unwrap_or_default() {
        let Some(end_date) = raw.end_date.filter(|s| !s.is_empty()) else {
            continue;
        };
        let Some(interval_end) = parse_end_date(&end_date) else {
            logger.warn(&format!("Failed to parse date {}", end_date));
            continue;
        };
        let rate = raw.flat_rate.unwrap_or_default();
        points.push(Datapoint {
            consumption: rate.consumption,
            cost: rate.cost,
            interval_end,
        });
    }
    Ok(points)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::get_logger;

    #[test]
    fn test_parse_hourly_usage() {
        let body = r#"{
            "isSuccess": true,
            "data": [
                {"flatRate": {"consumption": 0.41, "cost": 0.13}, "endDate": "2025-12-01T00:59:59Z"},
                {"flatRate": null, "endDate": "2025-12-01T01:59:59Z"},
                {"flatRate": {"consumption": 0.2}},
                {"flatRate": {"consumption": 0.3}, "endDate": "not a date"},
                {"flatRate": {"consumption": 0.5, "cost": 0.16}, "endDate": "2025-12-01T02:59:59"}
            ]
        }"#;
        let points = parse_hourly_usage(body, &get_logger("test")).unwrap();
        assert_eq!(points.len(), 3);
        assert_eq!(points[0].interval_end, 1764550799);
        assert_eq!(points[0].consumption, Some(0.41));
        assert_eq!(points[1].consumption, None);
        assert_eq!(points[2].interval_end, 1764550799 + 2 * 3600);
    }

    #[test]
    fn test_parse_hourly_usage_api_failure() {
        let body = r#"{"isSuccess": false, "message": "No data"}"#;
        let err = parse_hourly_usage(body, &get_logger("test")).unwrap_err();
        assert!(matches!(err, InsightsError::Api { .. }));
        assert!(err.to_string().contains("No data"));
    }

    #[test]
    fn test_parse_hourly_usage_null_data() {
        let body = r#"{"isSuccess": true, "data": null}"#;
        assert!(parse_hourly_usage(body, &get_logger("test")).unwrap().is_empty());
    }

    #[test]
    fn test_parse_hourly_usage_bad_json() {
        let err = parse_hourly_usage("<html>", &get_logger("test")).unwrap_err();
        assert!(matches!(err, InsightsError::Serialization { .. }));
    }

    #[test]
    fn test_preview_truncates_on_char_boundary() {
        let body = "é".repeat(600);
        assert_eq!(preview(&body).chars().count(), 500);
    }
}
