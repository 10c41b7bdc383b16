//! Error types and handling for Parkgate
//!
//! This module defines the error types used throughout the application.
//! Business outcomes such as a full lot or an unknown plate at the exit are
//! not errors; they are reported through [`crate::ledger::Denial`] and
//! [`crate::dispatcher::EventOutcome`].

use thiserror::Error;

/// Result type alias for Parkgate operations
pub type Result<T> = std::result::Result<T, ParkgateError>;

/// Main error type for Parkgate
#[derive(Debug, Error)]
pub enum ParkgateError {
    /// Configuration-related errors
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// The plate recognition engine could not be started. Fatal at startup.
    #[error("Recognizer initialization failed: {message}")]
    RecognizerInit { message: String },

    /// The recognition engine failed on a single frame
    #[error("Recognition error: {message}")]
    Recognition { message: String },

    /// The hardware link cannot be opened or has stopped accepting writes.
    /// Fatal: the control loop cannot run without it.
    #[error("Hardware link unavailable: {message}")]
    HardwareLink { message: String },

    /// No usable frame could be captured from the camera
    #[error("Image capture failed: {message}")]
    ImageCapture { message: String },

    /// Exit time earlier than entry time
    #[error("Invalid interval: exit {exit} precedes entry {entry}")]
    InvalidInterval { entry: String, exit: String },

    /// Serialization/deserialization errors
    #[error("Serialization error: {message}")]
    Serialization { message: String },

    /// File I/O errors
    #[error("I/O error: {message}")]
    Io { message: String },

    /// Network-related errors
    #[error("Network error: {message}")]
    Network { message: String },

    /// Validation errors
    #[error("Validation error: {field} - {message}")]
    Validation { field: String, message: String },
}

impl ParkgateError {
    /// Create a new configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        ParkgateError::Config {
            message: message.into(),
        }
    }

    /// Create a new recognizer initialization error
    pub fn recognizer_init<S: Into<String>>(message: S) -> Self {
        ParkgateError::RecognizerInit {
            message: message.into(),
        }
    }

    /// Create a new recognition error
    pub fn recognition<S: Into<String>>(message: S) -> Self {
        ParkgateError::Recognition {
            message: message.into(),
        }
    }

    /// Create a new hardware link error
    pub fn hardware_link<S: Into<String>>(message: S) -> Self {
        ParkgateError::HardwareLink {
            message: message.into(),
        }
    }

    /// Create a new image capture error
    pub fn image_capture<S: Into<String>>(message: S) -> Self {
        ParkgateError::ImageCapture {
            message: message.into(),
        }
    }

    /// Create a new invalid interval error
    pub fn invalid_interval<S: Into<String>>(entry: S, exit: S) -> Self {
        ParkgateError::InvalidInterval {
            entry: entry.into(),
            exit: exit.into(),
        }
    }

    /// Create a new validation error
    pub fn validation<S: Into<String>>(field: S, message: S) -> Self {
        ParkgateError::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create a new I/O error
    pub fn io<S: Into<String>>(message: S) -> Self {
        ParkgateError::Io {
            message: message.into(),
        }
    }

    /// Create a new network error
    pub fn network<S: Into<String>>(message: S) -> Self {
        ParkgateError::Network {
            message: message.into(),
        }
    }

    /// Whether the control loop must stop when this error surfaces
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            ParkgateError::RecognizerInit { .. }
                | ParkgateError::HardwareLink { .. }
                | ParkgateError::InvalidInterval { .. }
        )
    }
}

impl From<std::io::Error> for ParkgateError {
    fn from(err: std::io::Error) -> Self {
        ParkgateError::io(err.to_string())
    }
}

impl From<serde_yaml::Error> for ParkgateError {
    fn from(err: serde_yaml::Error) -> Self {
        ParkgateError::Serialization {
            message: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for ParkgateError {
    fn from(err: serde_json::Error) -> Self {
        ParkgateError::Serialization {
            message: err.to_string(),
        }
    }
}

impl From<image::ImageError> for ParkgateError {
    fn from(err: image::ImageError) -> Self {
        ParkgateError::image_capture(err.to_string())
    }
}

#[cfg(feature = "http-camera")]
impl From<reqwest::Error> for ParkgateError {
    fn from(err: reqwest::Error) -> Self {
        ParkgateError::network(err.to_string())
    }
}
