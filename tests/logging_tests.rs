use ei_insights::config::LoggingConfig;
use ei_insights::logging::{init_logging, min_level, parse_log_level};
use tracing::Level;

#[test]
fn level_parsing_and_ordering() {
    assert_eq!(parse_log_level("warning").unwrap(), Level::WARN);
    assert_eq!(parse_log_level(" Info ").unwrap(), Level::INFO);
    assert!(parse_log_level("LOUD").is_err());
    assert_eq!(min_level(Level::ERROR, Level::DEBUG), Level::DEBUG);
}

#[test]
fn file_logging_init_is_repeatable() {
    let dir = tempfile::tempdir().unwrap();
    let config = LoggingConfig {
        file: dir.path().join("ei.log").to_string_lossy().to_string(),
        console_output: false,
        ..LoggingConfig::default()
    };
    init_logging(&config).unwrap();
    init_logging(&config).unwrap();
    tracing::info!("written to the rolling file");
}
