//! Frame capture from the network camera
//!
//! A capture either yields a decoded frame or an `ImageCapture` error; the
//! dispatcher skips the event in the latter case.

use crate::error::{ParkgateError, Result};
use async_trait::async_trait;
use image::DynamicImage;

/// Source of still frames
#[async_trait]
pub trait ImageSource: Send + Sync {
    async fn capture(&self) -> Result<DynamicImage>;
}

/// Decode an encoded frame (JPEG or PNG)
pub fn decode_frame(bytes: &[u8]) -> Result<DynamicImage> {
    if bytes.is_empty() {
        return Err(ParkgateError::image_capture("Camera returned an empty body"));
    }
    Ok(image::load_from_memory(bytes)?)
}

#[cfg(feature = "http-camera")]
pub use http::HttpCamera;

#[cfg(feature = "http-camera")]
mod http {
    use super::{ImageSource, decode_frame};
    use crate::config::CameraConfig;
    use crate::error::{ParkgateError, Result};
    use crate::logging::get_logger;
    use async_trait::async_trait;
    use image::DynamicImage;
    use std::time::Duration;

    /// IP webcam serving one JPEG per GET (e.g. `/shot.jpg`)
    pub struct HttpCamera {
        client: reqwest::Client,
        url: String,
        logger: crate::logging::StructuredLogger,
    }

    impl HttpCamera {
        pub fn new(config: &CameraConfig) -> Result<Self> {
            let mut builder = reqwest::Client::builder();
            if let Some(ms) = config.timeout_ms {
                builder = builder.timeout(Duration::from_millis(ms));
            }
            let client = builder.build()?;
            Ok(Self {
                client,
                url: config.url.clone(),
                logger: get_logger("camera"),
            })
        }

        pub fn url(&self) -> &str {
            &self.url
        }
    }

    #[async_trait]
    impl ImageSource for HttpCamera {
        async fn capture(&self) -> Result<DynamicImage> {
            self.logger.trace(&format!("Requesting frame from {}", self.url));
            let response = self.client.get(&self.url).send().await.map_err(|e| {
                ParkgateError::image_capture(format!(
                    "Camera request failed, check that the camera server is reachable: {}",
                    e
                ))
            })?;

            let status = response.status();
            if status != reqwest::StatusCode::OK {
                return Err(ParkgateError::image_capture(format!(
                    "Camera returned status {}",
                    status.as_u16()
                )));
            }

            let body = response.bytes().await.map_err(|e| {
                ParkgateError::image_capture(format!("Failed to read camera body: {}", e))
            })?;
            decode_frame(&body)
        }
    }
}
