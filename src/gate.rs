//! Gate actuator control
//!
//! Commands are fire-and-forget: a failed write is logged and counted, and
//! only a run of consecutive failures is reported to the caller as an
//! unavailable link. The open/close cycle is an explicit timed transition
//! (`Open { close_due }` -> `Closed`) driven by tokio time, so tests can run
//! it under a paused clock.

use crate::error::{ParkgateError, Result};
use crate::link::{GateCommand, HardwareLink};
use crate::logging::get_logger;
use std::time::Duration;
use tokio::time::{Instant, sleep_until};

/// Last commanded gate position
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateState {
    Closed,
    Open { opened_at: Instant, close_due: Instant },
}

/// Issues gate commands and tracks the dwell window
pub struct GateController {
    state: GateState,
    dwell: Duration,
    max_write_failures: u32,
    consecutive_failures: u32,
    logger: crate::logging::StructuredLogger,
}

impl GateController {
    pub fn new(dwell: Duration, max_write_failures: u32) -> Self {
        Self {
            state: GateState::Closed,
            dwell,
            max_write_failures: max_write_failures.max(1),
            consecutive_failures: 0,
            logger: get_logger("gate"),
        }
    }

    pub fn state(&self) -> GateState {
        self.state
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }

    /// Write one command. `Ok(false)` means the write failed but the link
    /// is still within its failure budget.
    async fn send(&mut self, link: &mut dyn HardwareLink, command: GateCommand) -> Result<bool> {
        match link.send(command).await {
            Ok(()) => {
                self.consecutive_failures = 0;
                Ok(true)
            }
            Err(e) => {
                self.consecutive_failures += 1;
                self.logger.error(&format!(
                    "Failed to send '{}' ({} of {} allowed): {}",
                    command, self.consecutive_failures, self.max_write_failures, e
                ));
                if self.consecutive_failures >= self.max_write_failures {
                    return Err(ParkgateError::hardware_link(format!(
                        "{} consecutive write failures",
                        self.consecutive_failures
                    )));
                }
                Ok(false)
            }
        }
    }

    /// Command the gate open and schedule the close
    pub async fn open(&mut self, link: &mut dyn HardwareLink) -> Result<()> {
        if !self.send(link, GateCommand::Open).await? {
            self.logger.warn("Open command not delivered, gate left as it was");
            return Ok(());
        }
        let now = Instant::now();
        self.state = GateState::Open {
            opened_at: now,
            close_due: now + self.dwell,
        };
        self.logger.info("Gate OPENED");
        Ok(())
    }

    /// Command the gate closed
    pub async fn close(&mut self, link: &mut dyn HardwareLink) -> Result<()> {
        if !self.send(link, GateCommand::Close).await? {
            self.logger.warn("Close command not delivered, gate may still be open");
            return Ok(());
        }
        self.state = GateState::Closed;
        self.logger.info("Gate CLOSED");
        Ok(())
    }

    /// Show the remaining capacity on the controller
    pub async fn report_slots(&mut self, link: &mut dyn HardwareLink, slots: u32) -> Result<()> {
        if self.send(link, GateCommand::Slots(slots)).await? {
            self.logger.debug(&format!("Reported {} free slots", slots));
        }
        Ok(())
    }

    /// Close the gate if its dwell has elapsed at `now`. Returns whether the
    /// gate is now closed by this call.
    pub async fn close_if_due(&mut self, link: &mut dyn HardwareLink, now: Instant) -> Result<bool> {
        match self.state {
            GateState::Open { close_due, .. } if now >= close_due => {
                self.close(link).await?;
                Ok(self.state == GateState::Closed)
            }
            _ => Ok(false),
        }
    }

    /// Open, report `slots` while open, hold for the dwell, close
    pub async fn cycle(&mut self, link: &mut dyn HardwareLink, slots: Option<u32>) -> Result<()> {
        self.open(link).await?;
        if let Some(n) = slots {
            self.report_slots(link, n).await?;
        }
        // An undelivered open still gets a close after the dwell
        let close_due = match self.state {
            GateState::Open { close_due, .. } => close_due,
            GateState::Closed => Instant::now() + self.dwell,
        };
        sleep_until(close_due).await;
        self.close(link).await
    }
}
