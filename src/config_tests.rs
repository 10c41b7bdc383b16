#![cfg(test)]

use super::config::*;
use super::ledger::ReentryPolicy;

#[test]
fn test_default_config() {
    let config = Config::default();
    assert_eq!(config.parking.max_capacity, 4);
    assert_eq!(config.gate.dwell_ms, 5000);
    assert_eq!(config.gate.payment_delay_ms, 2000);
    assert_eq!(config.poll_interval_ms, 10);
    assert_eq!(config.link.transport, LinkTransport::Tcp);
    assert_eq!(config.parking.reentry_policy, ReentryPolicy::Overwrite);
}

#[test]
fn test_config_validation() {
    let mut config = Config::default();
    assert!(config.validate().is_ok());

    config.camera.url = "ftp://camera/shot.jpg".to_string();
    assert!(config.validate().is_err());

    config = Config::default();
    config.parking.max_capacity = 0;
    assert!(config.validate().is_err());

    config = Config::default();
    config.link.transport = LinkTransport::Device;
    config.link.device = String::new();
    assert!(config.validate().is_err());

    config = Config::default();
    config.timezone = "Mars/Olympus".to_string();
    assert!(config.validate().is_err());

    config = Config::default();
    config.recognizer.command = "tesseract 'unbalanced".to_string();
    assert!(config.validate().is_err());

    config = Config::default();
    config.recognizer.timeout_ms = 0;
    assert!(config.validate().is_err());
}

#[test]
fn test_config_serialization() {
    let config = Config::default();
    let yaml = serde_yaml::to_string(&config).unwrap();
    let deserialized: Config = serde_yaml::from_str(&yaml).unwrap();
    assert_eq!(config.camera.url, deserialized.camera.url);
    assert_eq!(config.pricing.tiers, deserialized.pricing.tiers);
}

#[test]
fn test_partial_yaml_uses_defaults() {
    let yaml = "parking:\n  max_capacity: 12\n  reentry_policy: reject\nlink:\n  transport: device\n";
    let config: Config = serde_yaml::from_str(yaml).unwrap();
    assert_eq!(config.parking.max_capacity, 12);
    assert_eq!(config.parking.reentry_policy, ReentryPolicy::Reject);
    assert_eq!(config.link.transport, LinkTransport::Device);
    assert_eq!(config.link.device, "/dev/ttyACM0");
    assert_eq!(config.gate.dwell_ms, 5000);
}
