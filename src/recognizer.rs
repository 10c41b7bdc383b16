//! License plate recognition
//!
//! The OCR engine is a black box behind [`TextEngine`]. [`PlateRecognizer`]
//! wraps an engine and turns whatever it returns into normalized plate text;
//! engine failures become an empty result so the control loop only ever
//! sees "text" or "no text".

use crate::config::RecognizerConfig;
use crate::error::{ParkgateError, Result};
use crate::logging::get_logger;
use async_trait::async_trait;
use image::{DynamicImage, ImageFormat};
use std::io::Cursor;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tokio::time::timeout;

/// Raw text detection on a decoded frame
#[async_trait]
pub trait TextEngine: Send + Sync {
    /// Text fragments found in the image, in reading order
    async fn read_text(&self, image: &DynamicImage) -> Result<Vec<String>>;
}

/// Join engine fragments and normalize them into plate text
pub fn normalize_plate_text<S: AsRef<str>>(fragments: &[S]) -> String {
    let joined = fragments
        .iter()
        .map(AsRef::as_ref)
        .collect::<Vec<_>>()
        .join(" ");
    joined.trim().replace(['\n', '\r'], "").to_uppercase()
}

/// Recognizer used by the dispatcher
pub struct PlateRecognizer {
    engine: Box<dyn TextEngine>,
    logger: crate::logging::StructuredLogger,
}

impl PlateRecognizer {
    pub fn new(engine: Box<dyn TextEngine>) -> Self {
        Self {
            engine,
            logger: get_logger("recognizer"),
        }
    }

    /// Normalized plate text, or an empty string when nothing was read
    pub async fn recognize(&self, image: &DynamicImage) -> String {
        match self.engine.read_text(image).await {
            Ok(fragments) => {
                let text = normalize_plate_text(&fragments);
                self.logger
                    .debug(&format!("Engine returned {:?} -> '{}'", fragments, text));
                text
            }
            Err(e) => {
                self.logger
                    .error(&format!("Text extraction failed: {}", e));
                String::new()
            }
        }
    }
}

/// Engine backed by an external OCR command line such as tesseract
pub struct CommandEngine {
    program: String,
    args: Vec<String>,
    timeout: Duration,
    logger: crate::logging::StructuredLogger,
}

impl CommandEngine {
    /// Parse the configured command line without starting anything
    pub fn from_config(config: &RecognizerConfig) -> Result<Self> {
        let mut parts = shell_words::split(&config.command).map_err(|e| {
            ParkgateError::recognizer_init(format!(
                "Invalid recognizer command '{}': {}",
                config.command, e
            ))
        })?;
        if parts.is_empty() {
            return Err(ParkgateError::recognizer_init(
                "Recognizer command is empty",
            ));
        }
        let program = parts.remove(0);
        Ok(Self {
            program,
            args: parts,
            timeout: Duration::from_millis(config.timeout_ms),
            logger: get_logger("recognizer"),
        })
    }

    /// Parse the command line and verify the program runs
    pub async fn connect(config: &RecognizerConfig) -> Result<Self> {
        let engine = Self::from_config(config)?;
        engine.probe(&config.probe_args).await?;
        Ok(engine)
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// Run the program with `probe_args`; any failure is an init failure
    pub async fn probe(&self, probe_args: &[String]) -> Result<()> {
        let output = Command::new(&self.program)
            .args(probe_args)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| {
                ParkgateError::recognizer_init(format!(
                    "Failed to start '{}': {}",
                    self.program, e
                ))
            })?;
        if !output.status.success() {
            return Err(ParkgateError::recognizer_init(format!(
                "'{}' probe exited with {}",
                self.program, output.status
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl TextEngine for CommandEngine {
    async fn read_text(&self, image: &DynamicImage) -> Result<Vec<String>> {
        let mut png = Vec::new();
        image
            .write_to(&mut Cursor::new(&mut png), ImageFormat::Png)
            .map_err(|e| ParkgateError::recognition(format!("PNG encode failed: {}", e)))?;

        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| ParkgateError::recognition(format!("Spawn failed: {}", e)))?;

        // Feed stdin while stdout and stderr drain, or a chatty engine
        // blocks on a full pipe
        let stdin = child.stdin.take();
        let feed = async move {
            if let Some(mut stdin) = stdin {
                stdin.write_all(&png).await?;
            }
            Ok::<(), std::io::Error>(())
        };
        let run = async { tokio::join!(feed, child.wait_with_output()) };

        let (fed, output) = timeout(self.timeout, run).await.map_err(|_| {
            ParkgateError::recognition(format!(
                "Engine did not finish within {} ms",
                self.timeout.as_millis()
            ))
        })?;
        if let Err(e) = fed {
            // Engines may exit without consuming the whole frame
            self.logger
                .debug(&format!("Engine stopped reading its input: {}", e));
        }

        let output =
            output.map_err(|e| ParkgateError::recognition(format!("Engine wait failed: {}", e)))?;
        if !output.status.success() {
            return Err(ParkgateError::recognition(format!(
                "Engine exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        Ok(String::from_utf8_lossy(&output.stdout)
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(str::to_string)
            .collect())
    }
}
