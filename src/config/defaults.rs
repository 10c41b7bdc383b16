use super::*;

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            transport: LinkTransport::Tcp,
            address: "127.0.0.1:7000".to_string(),
            device: "/dev/ttyACM0".to_string(),
            settle_delay_ms: 2000,
            max_write_failures: 3,
        }
    }
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            url: "http://192.168.1.50:8080/shot.jpg".to_string(),
            timeout_ms: None,
        }
    }
}

impl Default for RecognizerConfig {
    fn default() -> Self {
        Self {
            command: "tesseract stdin stdout --psm 7".to_string(),
            probe_args: vec!["--version".to_string()],
            timeout_ms: 10_000,
        }
    }
}

impl Default for ParkingConfig {
    fn default() -> Self {
        Self {
            max_capacity: 4,
            reentry_policy: ReentryPolicy::Overwrite,
        }
    }
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            dwell_ms: 5000,
            payment_delay_ms: 2000,
        }
    }
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            tiers: FareTable::default().tiers().to_vec(),
            overflow_fare: FareTable::default().overflow_fare(),
            currency_symbol: "₹".to_string(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "INFO".to_string(),
            console_level: None,
            file_level: None,
            file: "/tmp/parkgate.log".to_string(),
            backup_count: 5,
            console_output: true,
            json_format: false,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            link: LinkConfig::default(),
            camera: CameraConfig::default(),
            recognizer: RecognizerConfig::default(),
            parking: ParkingConfig::default(),
            gate: GateConfig::default(),
            pricing: PricingConfig::default(),
            logging: LoggingConfig::default(),
            poll_interval_ms: 10,
            timezone: "UTC".to_string(),
        }
    }
}
