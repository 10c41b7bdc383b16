use parkgate::config::{CONFIG_ENV_VAR, Config, LinkTransport};
use parkgate::fare::FareTier;
use std::fs;

#[test]
fn save_and_load_yaml_roundtrip() {
    let tmp_dir = tempfile::tempdir().unwrap();
    let path = tmp_dir.path().join("config.yaml");

    let mut cfg = Config::default();
    cfg.link.address = "10.0.0.5:4001".to_string();
    cfg.pricing.currency_symbol = "EUR ".to_string();
    cfg.logging.file = path.with_extension("log").to_string_lossy().to_string();

    cfg.save_to_file(&path).unwrap();
    let loaded = Config::from_file(&path).unwrap();

    assert_eq!(loaded.link.address, "10.0.0.5:4001");
    assert_eq!(loaded.pricing.currency_symbol, "EUR ");
    assert_eq!(loaded.logging.file, cfg.logging.file);
    assert!(loaded.validate().is_ok());
}

#[test]
fn config_validation_errors() {
    let mut cfg = Config::default();

    cfg.link.address.clear();
    assert!(cfg.validate().is_err());

    // An empty address is fine when the device transport is used
    cfg.link.transport = LinkTransport::Device;
    assert!(cfg.validate().is_ok());

    cfg = Config::default();
    cfg.link.max_write_failures = 0;
    assert!(cfg.validate().is_err());

    cfg = Config::default();
    cfg.gate.dwell_ms = 0;
    assert!(cfg.validate().is_err());

    cfg = Config::default();
    cfg.poll_interval_ms = 0;
    assert!(cfg.validate().is_err());

    cfg = Config::default();
    cfg.pricing.tiers = vec![
        FareTier {
            up_to_minutes: 60.0,
            amount: 40,
        },
        FareTier {
            up_to_minutes: 60.0,
            amount: 50,
        },
    ];
    assert!(cfg.validate().is_err());
}

#[test]
fn custom_tiers_are_loaded_from_yaml() {
    let tmp = tempfile::NamedTempFile::new().unwrap();
    fs::write(
        tmp.path(),
        b"pricing:\n  tiers:\n    - up_to_minutes: 15\n      amount: 0\n    - up_to_minutes: 90\n      amount: 30\n  overflow_fare: 80\n",
    )
    .unwrap();
    let cfg = Config::from_file(tmp.path()).unwrap();
    let table = cfg.pricing.fare_table().unwrap();
    assert_eq!(table.fare_for_minutes(10.0), 0);
    assert_eq!(table.fare_for_minutes(15.5), 30);
    assert_eq!(table.fare_for_minutes(200.0), 80);
    assert_eq!(cfg.pricing.currency_symbol, "₹");
}

#[test]
fn from_file_with_invalid_yaml_fails() {
    let tmp = tempfile::NamedTempFile::new().unwrap();
    fs::write(tmp.path(), b"bad: [unclosed").unwrap();
    let err = Config::from_file(tmp.path()).unwrap_err();
    assert!(format!("{}", err).contains("Serialization error"));
}

#[test]
fn env_override_names_the_config_file() {
    assert_eq!(CONFIG_ENV_VAR, "PARKGATE_CONFIG");
}
