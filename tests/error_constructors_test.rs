use ei_insights::error::InsightsError;

#[test]
fn error_constructors_group_1() {
    assert!(matches!(
        InsightsError::config("x"),
        InsightsError::Config { .. }
    ));
    assert!(matches!(
        InsightsError::network("x"),
        InsightsError::Network { .. }
    ));
    assert!(matches!(InsightsError::api("x"), InsightsError::Api { .. }));
    assert!(matches!(InsightsError::auth("x"), InsightsError::Auth { .. }));
}

#[test]
fn error_constructors_group_2() {
    assert!(matches!(
        InsightsError::scrape("x"),
        InsightsError::Scrape { .. }
    ));
    assert!(matches!(
        InsightsError::serialization("x"),
        InsightsError::Serialization { .. }
    ));
    assert!(matches!(InsightsError::io("x"), InsightsError::Io { .. }));
    assert!(matches!(
        InsightsError::validation("f", "m"),
        InsightsError::Validation { .. }
    ));
    assert!(matches!(
        InsightsError::generic("x"),
        InsightsError::Generic { .. }
    ));
}

#[test]
fn conversions_from_library_errors() {
    let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
    assert!(matches!(InsightsError::from(io), InsightsError::Io { .. }));

    let json = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
    assert!(matches!(
        InsightsError::from(json),
        InsightsError::Serialization { .. }
    ));

    let date = chrono::NaiveDate::parse_from_str("nope", "%Y-%m-%d").unwrap_err();
    assert!(matches!(
        InsightsError::from(date),
        InsightsError::Validation { ref field, .. } if field == "datetime"
    ));
}
