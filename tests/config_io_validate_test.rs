use std::fs;
use tarifa::MonthKey;
use tarifa::config::Config;

#[test]
fn save_and_load_yaml_roundtrip() {
    let tmp_dir = tempfile::tempdir().unwrap();
    let path = tmp_dir.path().join("config.yaml");

    let mut cfg = Config::default();
    cfg.supply.cups = "ES0021000000000001XX".to_string();
    cfg.supply.end_month = Some("2024/05".to_string());
    cfg.cache.path = tmp_dir.path().join("cache.json").to_string_lossy().to_string();
    cfg.api.token = "secret".to_string();

    cfg.save_to_file(&path).unwrap();
    let loaded = Config::from_file(&path).unwrap();

    assert_eq!(loaded.supply.cups, cfg.supply.cups);
    assert_eq!(loaded.supply.end_month.as_deref(), Some("2024/05"));
    assert_eq!(loaded.cache.path, cfg.cache.path);
    // The token is never written back to disk
    assert!(loaded.api.token.is_empty());
    assert!(!fs::read_to_string(&path).unwrap().contains("secret"));
}

#[test]
fn partial_yaml_falls_back_to_defaults() {
    let tmp = tempfile::NamedTempFile::new().unwrap();
    fs::write(
        tmp.path(),
        "supply:\n  cups: ES001\n  distributor_code: \"2\"\ncache:\n  contract_ttl_hours: 72\n",
    )
    .unwrap();
    let cfg = Config::from_file(tmp.path()).unwrap();
    assert_eq!(cfg.supply.point_type, 5);
    assert_eq!(cfg.cache.contract_ttl_hours, 72);
    assert_eq!(cfg.cache.consumption_ttl_hours, 24);
    assert_eq!(cfg.timezone, "Europe/Madrid");
    assert!(cfg.validate().is_ok());

    let q = cfg
        .supply
        .consumption_query(MonthKey::new(2025, 1).unwrap())
        .unwrap();
    assert_eq!(q.start.to_string(), "2024/02");
    assert_eq!(q.end.to_string(), "2025/01");
}

#[test]
fn config_validation_errors() {
    let mut cfg = Config::default();

    cfg.logging.level = "LOUD".to_string();
    assert!(cfg.validate().is_err());

    cfg = Config::default();
    cfg.cache.consumption_ttl_hours = 0;
    assert!(cfg.validate().is_err());

    cfg = Config::default();
    cfg.cache.contract_ttl_hours = 0;
    assert!(cfg.validate().is_err());

    cfg = Config::default();
    cfg.cache.consumption_ttl_hours = u32::MAX;
    let msg = format!("{}", cfg.validate().unwrap_err());
    assert!(msg.contains("cache.consumption_ttl_hours"));

    cfg = Config::default();
    cfg.api.timeout_secs = 0;
    assert!(cfg.validate().is_err());

    cfg = Config::default();
    cfg.supply.start_month = Some("2024/13".to_string());
    let msg = format!("{}", cfg.validate().unwrap_err());
    assert!(msg.contains("supply.start_month"));
}

#[test]
fn from_file_with_invalid_yaml_fails() {
    let tmp = tempfile::NamedTempFile::new().unwrap();
    fs::write(tmp.path(), b"bad: [unclosed").unwrap();
    let err = Config::from_file(tmp.path()).unwrap_err();
    let msg = format!("{}", err);
    assert!(msg.contains("Serialization error"));
}
