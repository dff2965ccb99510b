//! Bidgely web-session exchange
//!
//! The Insights page embeds the analytics SDK with a one-shot `payload`
//! string in an inline script. Posting it to the web-session endpoint
//! yields the bearer token and user id for the usage streams.

use crate::error::{InsightsError, Result};
use crate::html;
use crate::session::PortalSession;
use crate::usage::BidgelyCredentials;
use reqwest::Url;
use serde_json::Value;

/// The SDK payload string from the Insights page
pub fn extract_payload(body: &str) -> Result<String> {
    html::script_variable(body, "payload")?
        .filter(|p| !p.is_empty())
        .ok_or_else(|| InsightsError::scrape("Could not find analytics payload on Insights page"))
}

/// Trade the payload for API credentials
pub async fn exchange_payload(
    session: &PortalSession,
    api_base: &Url,
    payload: &str,
) -> Result<BidgelyCredentials> {
    let url = api_base
        .join("/v2.0/web/web-session")
        .map_err(|e| InsightsError::config(format!("Invalid Bidgely URL: {}", e)))?;
    let body = session
        .post_form_url(
            url,
            &[("payload".to_string(), payload.to_string())],
            "exchange analytics payload",
        )
        .await?;
    let json: Value = serde_json::from_str(&body)?;
    parse_web_session(&json)
}

/// Pull token and user id out of a web-session response
pub fn parse_web_session(json: &Value) -> Result<BidgelyCredentials> {
    let payload = json
        .get("payload")
        .ok_or_else(|| InsightsError::auth("Web-session response has no payload"))?;

    let access_token = payload
        .get("tokenDetails")
        .and_then(|t| t.get("accessToken"))
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| InsightsError::auth("Web-session response has no access token"))?;

    let user_id = payload
        .get("userProfileDetails")
        .and_then(|u| u.get("userId"))
        .and_then(|v| match v {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        })
        .filter(|s| !s.is_empty())
        .ok_or_else(|| InsightsError::auth("Web-session response has no user id"))?;

    Ok(BidgelyCredentials {
        access_token: access_token.to_string(),
        user_id,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_extract_payload() {
        let page = r#"<script>bidgelyWebSdk.init(); var payload = "enc0ded==";</script>"#;
        assert_eq!(extract_payload(page).unwrap(), "enc0ded==");
        assert!(extract_payload("<script>var payload = '';</script>").is_err());
    }

    #[test]
    fn test_parse_web_session() {
        let ok = json!({"payload": {
            "tokenDetails": {"accessToken": "tok"},
            "userProfileDetails": {"userId": 4242}
        }});
        let creds = parse_web_session(&ok).unwrap();
        assert_eq!(creds.access_token, "tok");
        assert_eq!(creds.user_id, "4242");

        let missing = json!({"payload": {"tokenDetails": {}}});
        assert!(matches!(
            parse_web_session(&missing),
            Err(InsightsError::Auth { .. })
        ));
    }
}
