//! HTML extraction helpers
//!
//! Every helper parses the body it is given and returns owned data, so no
//! `scraper::Html` is ever held across an `.await`.

use crate::error::{InsightsError, Result};
use regex::Regex;
use scraper::{ElementRef, Html, Selector};

/// Compile a CSS selector, reporting the offending expression on failure
pub fn selector(css: &str) -> Result<Selector> {
    Selector::parse(css)
        .map_err(|e| InsightsError::scrape(format!("Bad selector {}: {}", css, e)))
}

/// `value` of the first `<input name="...">` in the document
pub fn input_value(body: &str, name: &str) -> Result<Option<String>> {
    let doc = Html::parse_document(body);
    let sel = selector(&format!("input[name=\"{}\"]", name))?;
    Ok(doc
        .select(&sel)
        .next()
        .and_then(|el| el.value().attr("value"))
        .map(str::to_string))
}

/// Every named `<input>` inside `form` as (name, value), in document order.
/// A missing value becomes the empty string.
pub fn form_fields(form: ElementRef<'_>) -> Result<Vec<(String, String)>> {
    let sel = selector("input")?;
    Ok(form
        .select(&sel)
        .filter_map(|input| {
            let name = input.value().attr("name")?;
            let value = input.value().attr("value").unwrap_or_default();
            Some((name.to_string(), value.to_string()))
        })
        .collect())
}

/// Concatenated, trimmed text of an element
pub fn text_of(el: ElementRef<'_>) -> String {
    el.text().collect::<String>().trim().to_string()
}

/// Read the requested attributes from the element with `id`.
/// Returns `None` when the element is absent; empty attributes map to `None`.
pub fn data_attributes(
    body: &str,
    id: &str,
    attrs: &[&str],
) -> Result<Option<Vec<Option<String>>>> {
    let doc = Html::parse_document(body);
    let sel = selector(&format!("#{}", id))?;
    let Some(el) = doc.select(&sel).next() else {
        return Ok(None);
    };
    Ok(Some(
        attrs
            .iter()
            .map(|a| {
                el.value()
                    .attr(a)
                    .map(str::trim)
                    .filter(|v| !v.is_empty())
                    .map(str::to_string)
            })
            .collect(),
    ))
}

/// Quoted string assigned to `var|let|const <name>` in any inline script
pub fn script_variable(body: &str, name: &str) -> Result<Option<String>> {
    let pattern = format!(
        r#"(?:var|let|const)\s+{}\s*=\s*(?:"([^"]*)"|'([^']*)')"#,
        regex::escape(name)
    );
    let re = Regex::new(&pattern).map_err(|e| InsightsError::scrape(e.to_string()))?;

    let doc = Html::parse_document(body);
    let sel = selector("script")?;
    for script in doc.select(&sel) {
        let source = script.text().collect::<String>();
        if let Some(caps) = re.captures(&source)
            && let Some(m) = caps.get(1).or_else(|| caps.get(2))
        {
            return Ok(Some(m.as_str().to_string()));
        }
    }
    Ok(None)
}
