use super::*;
use pretty_assertions::assert_eq;

#[test]
fn test_production_writes_json() {
    let config = LoggingConfig::production();

    assert!(config.enable_json_logs);
    assert!(!config.include_location);
    assert!(config.default_filter.starts_with("warn"));
}

#[test]
fn test_development_logs_to_console_only() {
    let config = LoggingConfig::development();

    assert!(!config.enable_json_logs);
    assert!(config.enable_console_logs);
    assert!(config.default_filter.contains("plansight_analyzer=debug"));
}

#[test]
fn test_log_directory() {
    assert!(log_directory().ends_with("plansight/logs"));
    assert_eq!(LoggingConfig::development().log_dir, log_directory());
}
