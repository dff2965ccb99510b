//! The portal login walk: source token, login POST, account selection,
//! navigation to the Insights page

use crate::config::AccountConfig;
use crate::error::{InsightsError, Result};
use crate::html;
use crate::logging::StructuredLogger;
use crate::session::PortalSession;
use crate::usage::MeterIds;
use scraper::Html;

const INSIGHTS_EVENT: &str = "AccountSelection.ToInsights";

/// Walk steps 1-3 and return the Insights page body
pub async fn login_to_insights(
    session: &PortalSession,
    account: &AccountConfig,
    logger: &StructuredLogger,
) -> Result<String> {
    // Step 1: source token and anti-forgery cookie
    logger.debug("Getting Source Token...");
    let landing = session.get_text("/", "get source token").await?;
    let source = html::input_value(&landing, "Source")?
        .filter(|s| !s.is_empty())
        .ok_or_else(|| InsightsError::scrape("Could not retrieve Source"))?;
    let rvt = session
        .cookie("rvt")
        .ok_or_else(|| InsightsError::scrape("Could not find rvt cookie"))?;

    // Step 2: login
    logger.debug("Performing Login...");
    let accounts_page = session
        .post_form("/", &login_form(account, &rvt, &source), "perform login")
        .await?;

    let form = select_account_form(&accounts_page, &account.account_number, logger)?;

    // Step 3: navigate to Insights for the selected account
    logger.debug("Navigating to Insights page...");
    session
        .post_form("/Accounts/OnEvent", &insights_event_fields(form), "navigate to insights")
        .await
}

fn login_form(account: &AccountConfig, rvt: &str, source: &str) -> Vec<(String, String)> {
    [
        ("LoginFormData.UserName", account.username.as_str()),
        ("LoginFormData.Password", account.password.as_str()),
        ("rvt", rvt),
        ("Source", source),
        ("PotText", ""),
        ("__EiTokPotText", ""),
        ("ReturnUrl", ""),
        ("AccountNumber", ""),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect()
}

/// The trigger field first, then the form's own inputs; an input with the
/// same name replaces the value in place
fn insights_event_fields(inputs: Vec<(String, String)>) -> Vec<(String, String)> {
    let mut fields = vec![("triggers_event".to_string(), INSIGHTS_EVENT.to_string())];
    for (name, value) in inputs {
        match fields.iter_mut().find(|(k, _)| *k == name) {
            Some(existing) => existing.1 = value,
            None => fields.push((name, value)),
        }
    }
    fields
}

/// Find the electricity account matching `account_number` on the accounts
/// page and return the inputs of its OnEvent form
pub fn select_account_form(
    body: &str,
    account_number: &str,
    logger: &StructuredLogger,
) -> Result<Vec<(String, String)>> {
    let doc = Html::parse_document(body);
    let item_sel = html::selector("div.my-accounts__item")?;
    let number_sel = html::selector("p.account-number")?;
    let elec_sel = html::selector("h2.account-electricity-icon")?;
    let form_sel = html::selector("form[action=\"/Accounts/OnEvent\"]")?;
    let wanted = account_number.trim();

    for item in doc.select(&item_sel) {
        let Some(number_el) = item.select(&number_sel).next() else {
            continue;
        };
        let number = html::text_of(number_el);
        if number != wanted {
            logger.debug(&format!("Skipping account {} as it is not target", number));
            continue;
        }

        if item.select(&elec_sel).count() != 1 {
            logger.info(&format!(
                "Found account {} but is not Electricity",
                number
            ));
            continue;
        }

        let form = item.select(&form_sel).next().ok_or_else(|| {
            InsightsError::scrape(format!("Account {} has no Insights navigation form", number))
        })?;
        return html::form_fields(form);
    }

    logger.warn("Failed to find Target Account; please verify it is the correct one");
    Err(InsightsError::auth(format!(
        "Account {} not found among electricity accounts",
        wanted
    )))
}

/// Meter identifiers from the Insights page's `#modelData` element
pub fn extract_meter_ids(body: &str) -> Result<MeterIds> {
    let attrs = html::data_attributes(
        body,
        "modelData",
        &["data-partner", "data-contract", "data-premise"],
    )?
    .ok_or_else(|| InsightsError::scrape("Failed to find modelData div on Insights page"))?;

    match attrs.as_slice() {
        [Some(partner), Some(contract), Some(premise)] => Ok(MeterIds {
            partner: partner.clone(),
            contract: contract.clone(),
            premise: premise.clone(),
        }),
        [partner, contract, premise] => Err(InsightsError::scrape(format!(
            "Missing meter IDs: partner={:?}, contract={:?}, premise={:?}",
            partner, contract, premise
        ))),
        _ => Err(InsightsError::scrape("Unexpected modelData attribute set")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::get_logger;

    const ACCOUNTS: &str = r#"
        <div class="my-accounts__item">
          <p class="account-number">111</p>
          <h2 class="account-electricity-icon">Electricity</h2>
          <form action="/Accounts/OnEvent"><input name="AccountNumber" value="111"/></form>
        </div>
        <div class="my-accounts__item">
          <p class="account-number">222</p>
          <h2 class="account-gas-icon">Gas</h2>
          <form action="/Accounts/OnEvent"><input name="AccountNumber" value="222"/></form>
        </div>
        <div class="my-accounts__item">
          <p class="account-number"> 222 </p>
          <h2 class="account-electricity-icon">Electricity</h2>
          <form action="/Accounts/OnEvent">
            <input name="AccountNumber" value="222"/>
            <input name="rvt" value="form-rvt"/>
          </form>
        </div>
    "#;

    #[test]
    fn test_select_skips_other_and_non_electric_accounts() {
        let fields = select_account_form(ACCOUNTS, "222", &get_logger("test")).unwrap();
        assert_eq!(
            fields,
            vec![
                ("AccountNumber".to_string(), "222".to_string()),
                ("rvt".to_string(), "form-rvt".to_string()),
            ]
        );
    }

    #[test]
    fn test_select_missing_account_is_auth_error() {
        let err = select_account_form(ACCOUNTS, "333", &get_logger("test")).unwrap_err();
        assert!(matches!(err, InsightsError::Auth { .. }));
    }

    #[test]
    fn test_insights_event_fields_override_in_place() {
        let fields = insights_event_fields(vec![
            ("a".to_string(), "1".to_string()),
            ("triggers_event".to_string(), "Other".to_string()),
        ]);
        assert_eq!(fields[0], ("triggers_event".to_string(), "Other".to_string()));
        assert_eq!(fields[1], ("a".to_string(), "1".to_string()));
        assert_eq!(fields.len(), 2);
    }

    #[test]
    fn test_extract_meter_ids() {
        let page = r#"<div id="modelData" data-partner="p" data-contract="c" data-premise="r"></div>"#;
        let ids = extract_meter_ids(page).unwrap();
        assert_eq!(ids.partner, "p");
        assert_eq!(ids.premise, "r");

        let partial = r#"<div id="modelData" data-partner="p" data-contract=""></div>"#;
        assert!(matches!(
            extract_meter_ids(partial),
            Err(InsightsError::Scrape { .. })
        ));
        assert!(extract_meter_ids("<html></html>").is_err());
    }

    #[test]
    fn test_login_form_field_order() {
        let account = AccountConfig {
            username: "u".to_string(),
            password: "p".to_string(),
            account_number: "1".to_string(),
        };
        let form = login_form(&account, "r", "s");
        assert_eq!(form.len(), 8);
        assert_eq!(form[0], ("LoginFormData.UserName".to_string(), "u".to_string()));
        assert_eq!(form[3], ("Source".to_string(), "s".to_string()));
        assert_eq!(form[7], ("AccountNumber".to_string(), String::new()));
    }
}
