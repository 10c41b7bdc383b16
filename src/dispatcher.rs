//! Event dispatcher for Parkgate
//!
//! Reads sensor lines from the hardware link and runs each ENTRY or EXIT
//! event to completion: capture a frame, read the plate, consult the ledger
//! and cycle the gate. Only one event is in flight at a time; the next line
//! is not read until the current gate cycle has finished.

use crate::camera::ImageSource;
use crate::config::Config;
use crate::error::Result;
use crate::gate::GateController;
use crate::ledger::{Denial, EntryOutcome, ExitOutcome, Ledger, Settlement};
use crate::link::{HardwareLink, Lane, SensorEvent, SensorState, parse_sensor_line};
use crate::logging::{LogContext, get_logger, get_logger_with_context};
use crate::recognizer::PlateRecognizer;
use chrono::{DateTime, Utc};
use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;

/// Wall clock used to stamp entries and exits
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// System time
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Processing state of the dispatcher
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatcherState {
    /// Waiting for a hardware event
    Idle,
    ProcessingEntry,
    ProcessingExit,
}

/// What handling one inbound line led to
#[derive(Debug, Clone, PartialEq)]
pub enum EventOutcome {
    /// Sensor-clear report or unrecognised line
    Ignored,
    /// The camera gave no usable frame
    NoImage,
    /// The frame contained no readable plate
    NoText,
    /// Vehicle let in
    Admitted { plate: String, available: u32 },
    /// Vehicle paid and let out
    Settled(Settlement),
    /// Ledger refused; the gate was not touched
    Denied { plate: String, denial: Denial },
}

/// Timing and presentation settings taken from [`Config`]
#[derive(Debug, Clone)]
pub struct DispatcherSettings {
    pub poll_interval: Duration,
    pub payment_delay: Duration,
    pub currency_symbol: String,
    pub timezone: chrono_tz::Tz,
}

impl DispatcherSettings {
    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self {
            poll_interval: Duration::from_millis(config.poll_interval_ms),
            payment_delay: Duration::from_millis(config.gate.payment_delay_ms),
            currency_symbol: config.pricing.currency_symbol.clone(),
            timezone: config.tz()?,
        })
    }
}

/// Root of the control loop; owns the ledger and every collaborator
pub struct Dispatcher {
    settings: DispatcherSettings,
    state: DispatcherState,
    ledger: Ledger,
    gate: GateController,
    link: Box<dyn HardwareLink>,
    camera: Box<dyn ImageSource>,
    recognizer: PlateRecognizer,
    clock: Box<dyn Clock>,
    logger: crate::logging::StructuredLogger,
}

impl Dispatcher {
    /// Assemble a dispatcher from configuration and connected collaborators
    pub fn new(
        config: &Config,
        link: Box<dyn HardwareLink>,
        camera: Box<dyn ImageSource>,
        recognizer: PlateRecognizer,
    ) -> Result<Self> {
        let settings = DispatcherSettings::from_config(config)?;
        let ledger = Ledger::new(
            config.parking.max_capacity,
            config.pricing.fare_table()?,
            config.parking.reentry_policy,
        );
        let gate = GateController::new(
            Duration::from_millis(config.gate.dwell_ms),
            config.link.max_write_failures,
        );
        Ok(Self {
            settings,
            state: DispatcherState::Idle,
            ledger,
            gate,
            link,
            camera,
            recognizer,
            clock: Box::new(SystemClock),
            logger: get_logger("dispatcher"),
        })
    }

    /// Replace the wall clock
    pub fn with_clock(mut self, clock: Box<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn state(&self) -> DispatcherState {
        self.state
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    pub fn gate(&self) -> &GateController {
        &self.gate
    }

    /// Publish the initial slot count
    pub async fn start(&mut self) -> Result<()> {
        let available = self.ledger.available();
        self.gate.report_slots(self.link.as_mut(), available).await?;
        self.logger.info(&format!(
            "Parking system started with {} of {} slots free (re-entry: {:?}), monitoring sensors",
            available,
            self.ledger.max_capacity(),
            self.ledger.policy()
        ));
        Ok(())
    }

    /// Read at most one pending line and handle it
    pub async fn poll_once(&mut self) -> Result<Option<EventOutcome>> {
        match self.link.poll_line(self.settings.poll_interval).await? {
            Some(line) => self.handle_line(&line).await.map(Some),
            None => Ok(None),
        }
    }

    /// Handle one raw inbound line
    pub async fn handle_line(&mut self, line: &str) -> Result<EventOutcome> {
        match parse_sensor_line(line) {
            Some(event) => self.handle_event(event).await,
            None => {
                self.logger
                    .debug(&format!("Ignoring unrecognised line '{}'", line.trim()));
                Ok(EventOutcome::Ignored)
            }
        }
    }

    /// Run one sensor event to completion
    pub async fn handle_event(&mut self, event: SensorEvent) -> Result<EventOutcome> {
        if event.state == SensorState::Clear {
            self.logger
                .trace(&format!("{} sensor clear, nothing to do", event.lane.as_str()));
            return Ok(EventOutcome::Ignored);
        }

        self.state = match event.lane {
            Lane::Entry => DispatcherState::ProcessingEntry,
            Lane::Exit => DispatcherState::ProcessingExit,
        };
        let result = match event.lane {
            Lane::Entry => self.process_entry().await,
            Lane::Exit => self.process_exit().await,
        };
        self.state = DispatcherState::Idle;

        if result.is_ok() {
            self.logger
                .debug(&format!("Ledger: {}", self.ledger.snapshot()));
        }
        result
    }

    fn lane_logger(lane: Lane, plate: Option<&str>) -> crate::logging::StructuredLogger {
        let mut context = LogContext::new("dispatcher").with_lane(lane.as_str());
        if let Some(p) = plate {
            context = context.with_field("plate", p.to_string());
        }
        get_logger_with_context(context)
    }

    fn local_time(&self, t: DateTime<Utc>) -> String {
        t.with_timezone(&self.settings.timezone)
            .format("%Y-%m-%d %H:%M:%S")
            .to_string()
    }

    /// Capture a frame and read the plate; `Err` carries the skip outcome
    async fn read_plate(&mut self, lane: Lane) -> std::result::Result<String, EventOutcome> {
        let logger = Self::lane_logger(lane, None);
        let image = match self.camera.capture().await {
            Ok(image) => image,
            Err(e) => {
                logger.warn(&format!("No image to process: {}", e));
                return Err(EventOutcome::NoImage);
            }
        };

        let plate = self.recognizer.recognize(&image).await;
        if plate.is_empty() {
            logger.info("No readable text detected");
            return Err(EventOutcome::NoText);
        }
        Ok(plate)
    }

    async fn process_entry(&mut self) -> Result<EventOutcome> {
        let plate = match self.read_plate(Lane::Entry).await {
            Ok(plate) => plate,
            Err(skipped) => return Ok(skipped),
        };
        let now = self.clock.now();
        let logger = Self::lane_logger(Lane::Entry, Some(&plate));
        logger.info(&format!(
            "Entry plate detected: '{}' at {}",
            plate,
            self.local_time(now)
        ));

        match self.ledger.try_open(&plate, now) {
            EntryOutcome::Admitted {
                session,
                available,
                replaced,
            } => {
                if let Some(previous) = replaced {
                    logger.warn(&format!(
                        "Plate already inside since {}, entry time refreshed",
                        self.local_time(previous)
                    ));
                }
                logger.info(&format!(
                    "Entry admitted, session {}, slots left: {}",
                    session.id, available
                ));
                self.gate
                    .cycle(self.link.as_mut(), Some(available))
                    .await?;
                Ok(EventOutcome::Admitted { plate, available })
            }
            EntryOutcome::Denied(denial) => {
                logger.warn(&format!("Entry DENIED: {}", denial));
                Ok(EventOutcome::Denied { plate, denial })
            }
        }
    }

    async fn process_exit(&mut self) -> Result<EventOutcome> {
        let plate = match self.read_plate(Lane::Exit).await {
            Ok(plate) => plate,
            Err(skipped) => return Ok(skipped),
        };
        let now = self.clock.now();
        let logger = Self::lane_logger(Lane::Exit, Some(&plate));
        logger.info(&format!(
            "Exit plate detected: '{}' at {}",
            plate,
            self.local_time(now)
        ));

        match self.ledger.try_close(&plate, now)? {
            ExitOutcome::Settled(settlement) => {
                logger.info(&format!(
                    "Vehicle entered at {} and exited at {}",
                    self.local_time(settlement.session.entry_time),
                    self.local_time(settlement.exit.exit_time)
                ));
                logger.info(&format!(
                    "Parking duration: {:.2} minutes",
                    settlement.duration_minutes
                ));
                logger.info(&format!(
                    "Please pay parking fee: {}{}",
                    self.settings.currency_symbol, settlement.fare
                ));
                sleep(self.settings.payment_delay).await;
                logger.info("Payment done (simulated)");

                self.gate
                    .cycle(self.link.as_mut(), Some(settlement.available))
                    .await?;
                Ok(EventOutcome::Settled(settlement))
            }
            ExitOutcome::Denied(denial) => {
                logger.warn(&format!("Exit DENIED: {}", denial));
                Ok(EventOutcome::Denied { plate, denial })
            }
        }
    }

    /// Poll and dispatch until `shutdown` resolves or a fatal error occurs,
    /// then close the gate and release the link
    pub async fn run_until<F>(&mut self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        let logger = self.logger.clone();
        let mut shutdown = std::pin::pin!(shutdown);

        let result = loop {
            tokio::select! {
                biased;
                _ = &mut shutdown => {
                    logger.info("Shutdown requested");
                    break Ok(());
                }
                polled = self.poll_once() => match polled {
                    Ok(_) => {}
                    Err(e) if e.is_fatal() => {
                        logger.error(&format!("Fatal error, stopping control loop: {}", e));
                        break Err(e);
                    }
                    Err(e) => logger.warn(&format!("Event processing failed: {}", e)),
                },
            }
        };

        self.shutdown().await;
        result
    }

    /// Best-effort gate close and link release
    pub async fn shutdown(&mut self) {
        self.state = DispatcherState::Idle;
        if let Err(e) = self.gate.close(self.link.as_mut()).await {
            self.logger
                .warn(&format!("Could not close gate during shutdown: {}", e));
        }
        if let Err(e) = self.link.shutdown().await {
            self.logger
                .warn(&format!("Could not release hardware link: {}", e));
        }
        self.logger.info("Hardware link released");
    }
}
