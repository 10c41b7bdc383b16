//! # Parkgate - license plate driven parking gate controller
//!
//! Parkgate runs the entry/exit loop of a small parking lot. A sensor
//! controller reports cars at the entry and exit over a line protocol; for
//! each report Parkgate captures a frame from a network camera, reads the
//! plate with an external OCR engine, checks capacity or settles the fare,
//! and cycles the gate.
//!
//! ## Architecture
//!
//! - `config`: YAML configuration and validation
//! - `logging`: Structured logging and tracing
//! - `link`: Line protocol and transport to the sensor/gate controller
//! - `camera`: Frame capture from the network camera
//! - `recognizer`: Plate text extraction behind an OCR engine trait
//! - `capacity`: Free-slot accounting
//! - `ledger`: Open parking sessions keyed by plate
//! - `fare`: Tiered fare calculation
//! - `gate`: Gate commands and the open/close dwell
//! - `dispatcher`: The event loop tying it all together

pub mod camera;
pub mod capacity;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod fare;
pub mod gate;
pub mod ledger;
pub mod link;
pub mod logging;
pub mod recognizer;

#[cfg(test)]
mod config_tests;

// Re-export commonly used types
pub use config::Config;
pub use dispatcher::{Dispatcher, EventOutcome};
pub use error::{ParkgateError, Result};
