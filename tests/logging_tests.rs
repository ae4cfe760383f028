use tarifa::config::LoggingConfig;
use tarifa::logging::{get_logger, get_logger_with_context, init_logging, parse_log_level, LogContext};
use tracing::Level;

#[test]
fn warning_alias_parses() {
    assert_eq!(parse_log_level("warning").unwrap(), Level::WARN);
    assert!(parse_log_level("verbose").is_err());
}

#[test]
fn console_only_init_then_component_logging() {
    let tmp = tempfile::tempdir().unwrap();
    let mut cfg = LoggingConfig::default();
    cfg.file = tmp.path().join("tarifa.log").to_string_lossy().to_string();
    cfg.console_level = Some("DEBUG".to_string());
    assert!(init_logging(&cfg).is_ok());

    get_logger("cache").info("cache ready");
    let ctx = LogContext::new("coordinator").with_cups("ES001".to_string());
    get_logger_with_context(ctx).warn("rate limited");
}
