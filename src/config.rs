//! Configuration management for Parkgate
//!
//! This module handles loading, validation, and management of the application
//! configuration from YAML files. A `PARKGATE_CONFIG` environment variable
//! overrides the default search path.

use crate::error::{ParkgateError, Result};
use crate::fare::{FareTable, FareTier};
use crate::ledger::ReentryPolicy;
use serde::{Deserialize, Serialize};
use std::path::Path;

mod defaults;

/// Environment variable naming an explicit configuration file
pub const CONFIG_ENV_VAR: &str = "PARKGATE_CONFIG";

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Hardware link to the gate/sensor controller
    pub link: LinkConfig,

    /// Network camera used to capture plates
    pub camera: CameraConfig,

    /// External OCR engine
    pub recognizer: RecognizerConfig,

    /// Lot capacity and admission rules
    pub parking: ParkingConfig,

    /// Gate timing
    pub gate: GateConfig,

    /// Fare tiers and currency
    pub pricing: PricingConfig,

    /// Logging configuration
    pub logging: LoggingConfig,

    /// Interval between hardware link polls in milliseconds
    pub poll_interval_ms: u64,

    /// IANA timezone used when rendering entry/exit times
    pub timezone: String,
}

/// How the line protocol reaches the controller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkTransport {
    /// TCP serial bridge (ser2net and friends)
    Tcp,
    /// Character device configured beforehand (e.g. `stty -F /dev/ttyACM0 9600 raw`)
    Device,
}

/// Hardware link parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LinkConfig {
    /// Transport kind
    pub transport: LinkTransport,

    /// `host:port` of the serial bridge when `transport` is `tcp`
    pub address: String,

    /// Device path when `transport` is `device`
    pub device: String,

    /// Time to wait after opening the link while the controller resets
    pub settle_delay_ms: u64,

    /// Consecutive failed writes before the link is declared unavailable
    pub max_write_failures: u32,
}

/// Camera parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    /// URL returning a single still image per GET
    pub url: String,

    /// Optional request timeout; transport default when unset
    pub timeout_ms: Option<u64>,
}

/// OCR engine parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RecognizerConfig {
    /// Command line run per frame; the PNG frame is written to its stdin
    pub command: String,

    /// Arguments used to probe the engine at startup
    pub probe_args: Vec<String>,

    /// Upper bound on one engine run in milliseconds
    pub timeout_ms: u64,
}

/// Lot parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ParkingConfig {
    /// Number of slots in the lot
    pub max_capacity: u32,

    /// What to do when an already-inside plate is seen at the entry
    pub reentry_policy: ReentryPolicy,
}

/// Gate timing
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GateConfig {
    /// Time the gate stays open before closing
    pub dwell_ms: u64,

    /// Simulated payment confirmation delay at the exit
    pub payment_delay_ms: u64,
}

/// Pricing configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PricingConfig {
    /// Ascending tiers with inclusive upper bounds in minutes
    pub tiers: Vec<FareTier>,

    /// Fare charged beyond the last tier
    pub overflow_fare: u32,

    /// Currency symbol used in log output
    pub currency_symbol: String,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    pub level: String,

    /// Optional console level override
    pub console_level: Option<String>,

    /// Optional file level override
    pub file_level: Option<String>,

    /// Log directory, or a file path whose parent directory is used
    pub file: String,

    /// Number of rotated files to keep
    pub backup_count: u32,

    /// Whether to log to console
    pub console_output: bool,

    /// Whether to use JSON format
    pub json_format: bool,
}

impl PricingConfig {
    /// Build the validated fare table described by this section
    pub fn fare_table(&self) -> Result<FareTable> {
        FareTable::new(self.tiers.clone(), self.overflow_fare)
    }
}

impl Config {
    /// Load configuration from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&contents)?;
        Ok(config)
    }

    /// Load configuration from the environment override or default locations
    pub fn load() -> Result<Self> {
        if let Some(path) = std::env::var_os(CONFIG_ENV_VAR) {
            return Self::from_file(path);
        }

        let default_paths = [
            "parkgate_config.yaml",
            "/data/parkgate_config.yaml",
            "/etc/parkgate/config.yaml",
        ];

        for path in &default_paths {
            if Path::new(path).exists() {
                return Self::from_file(path);
            }
        }

        Ok(Config::default())
    }

    /// Save configuration to a YAML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let yaml = serde_yaml::to_string(self)?;
        std::fs::write(path, yaml)?;
        Ok(())
    }

    /// Parsed display timezone
    pub fn tz(&self) -> Result<chrono_tz::Tz> {
        self.timezone.parse::<chrono_tz::Tz>().map_err(|_| {
            ParkgateError::validation("timezone", &format!("Unknown timezone: {}", self.timezone))
        })
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        match self.link.transport {
            LinkTransport::Tcp if self.link.address.trim().is_empty() => {
                return Err(ParkgateError::validation(
                    "link.address",
                    "Address cannot be empty for tcp transport",
                ));
            }
            LinkTransport::Device if self.link.device.trim().is_empty() => {
                return Err(ParkgateError::validation(
                    "link.device",
                    "Device path cannot be empty for device transport",
                ));
            }
            _ => {}
        }

        if self.link.max_write_failures == 0 {
            return Err(ParkgateError::validation(
                "link.max_write_failures",
                "Must be greater than 0",
            ));
        }

        if !(self.camera.url.starts_with("http://") || self.camera.url.starts_with("https://")) {
            return Err(ParkgateError::validation(
                "camera.url",
                "Must be an http(s) URL",
            ));
        }

        match shell_words::split(&self.recognizer.command) {
            Ok(parts) if !parts.is_empty() => {}
            _ => {
                return Err(ParkgateError::validation(
                    "recognizer.command",
                    "Must be a non-empty command line",
                ));
            }
        }

        if self.recognizer.timeout_ms == 0 {
            return Err(ParkgateError::validation(
                "recognizer.timeout_ms",
                "Must be greater than 0",
            ));
        }

        if self.parking.max_capacity == 0 {
            return Err(ParkgateError::validation(
                "parking.max_capacity",
                "Must be greater than 0",
            ));
        }

        if self.gate.dwell_ms == 0 {
            return Err(ParkgateError::validation(
                "gate.dwell_ms",
                "Must be greater than 0",
            ));
        }

        if self.poll_interval_ms == 0 {
            return Err(ParkgateError::validation(
                "poll_interval_ms",
                "Must be greater than 0",
            ));
        }

        self.pricing.fare_table()?;
        self.tz()?;

        Ok(())
    }
}
