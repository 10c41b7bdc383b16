//! Parking session ledger
//!
//! Tracks vehicles that entered and have not yet left, keyed by normalized
//! plate text, together with the capacity gauge. Both live in one aggregate
//! so a slot and its session always change together.

use crate::capacity::CapacityGauge;
use crate::error::Result;
use crate::fare::{FareTable, duration_minutes};
use crate::logging::get_logger;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// A vehicle that is inside the lot
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Session {
    /// Correlation id for logs
    pub id: Uuid,

    /// Normalized plate text
    pub plate: String,

    /// When the entry was admitted
    pub entry_time: DateTime<Utc>,
}

/// A plate read at the exit, waiting to be paired with its session
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PendingExit {
    pub plate: String,
    pub exit_time: DateTime<Utc>,
}

/// Result of pairing a pending exit with its session
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Settlement {
    pub session: Session,
    pub exit: PendingExit,
    pub duration_minutes: f64,
    pub fare: u32,
    /// Slots available after the vehicle left
    pub available: u32,
}

/// Why the ledger refused a request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Denial {
    /// No slot left
    Full,
    /// Exit seen for a plate without an open session
    NoEntryRecord,
    /// Entry seen for a plate that is already inside (reject policy only)
    AlreadyInside,
}

impl std::fmt::Display for Denial {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Denial::Full => write!(f, "parking lot is full"),
            Denial::NoEntryRecord => write!(f, "no matching entry record"),
            Denial::AlreadyInside => write!(f, "vehicle already inside"),
        }
    }
}

/// Handling of an entry for a plate that already has an open session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReentryPolicy {
    /// Refresh the entry time; the vehicle keeps its slot
    #[default]
    Overwrite,
    /// Deny the entry
    Reject,
}

/// Outcome of [`Ledger::try_open`]
#[derive(Debug, Clone, PartialEq)]
pub enum EntryOutcome {
    Admitted {
        session: Session,
        available: u32,
        /// Entry time of the session this one replaced, if any
        replaced: Option<DateTime<Utc>>,
    },
    Denied(Denial),
}

/// Outcome of [`Ledger::try_close`]
#[derive(Debug, Clone, PartialEq)]
pub enum ExitOutcome {
    Settled(Settlement),
    Denied(Denial),
}

/// Open sessions plus the capacity gauge
pub struct Ledger {
    sessions: HashMap<String, Session>,
    capacity: CapacityGauge,
    fares: FareTable,
    policy: ReentryPolicy,
    logger: crate::logging::StructuredLogger,
}

impl Ledger {
    /// Create an empty ledger for a lot of `max_capacity` slots
    pub fn new(max_capacity: u32, fares: FareTable, policy: ReentryPolicy) -> Self {
        Self {
            sessions: HashMap::with_capacity(max_capacity as usize),
            capacity: CapacityGauge::new(max_capacity),
            fares,
            policy,
            logger: get_logger("ledger"),
        }
    }

    pub fn available(&self) -> u32 {
        self.capacity.available()
    }

    pub fn max_capacity(&self) -> u32 {
        self.capacity.max()
    }

    pub fn policy(&self) -> ReentryPolicy {
        self.policy
    }

    pub fn open_sessions(&self) -> usize {
        self.sessions.len()
    }

    pub fn session(&self, plate: &str) -> Option<&Session> {
        self.sessions.get(plate)
    }

    /// Admit `plate` at `now` if a slot is free
    pub fn try_open(&mut self, plate: &str, now: DateTime<Utc>) -> EntryOutcome {
        if self.capacity.is_full() {
            return EntryOutcome::Denied(Denial::Full);
        }

        let replaced = match self.sessions.get(plate) {
            Some(existing) if self.policy == ReentryPolicy::Reject => {
                self.logger.debug(&format!(
                    "Plate {} already inside since {}",
                    plate, existing.entry_time
                ));
                return EntryOutcome::Denied(Denial::AlreadyInside);
            }
            Some(existing) => Some(existing.entry_time),
            None => None,
        };

        // A refreshed session keeps the slot it already holds
        if replaced.is_none() && !self.capacity.take() {
            return EntryOutcome::Denied(Denial::Full);
        }

        let session = Session {
            id: Uuid::new_v4(),
            plate: plate.to_string(),
            entry_time: now,
        };
        self.sessions.insert(plate.to_string(), session.clone());

        if let Some(previous) = replaced {
            self.logger.debug(&format!(
                "Plate {} re-entered without an exit; entry time {} replaced",
                plate, previous
            ));
        }

        EntryOutcome::Admitted {
            session,
            available: self.capacity.available(),
            replaced,
        }
    }

    /// Settle the open session for `plate` at `now`
    pub fn try_close(&mut self, plate: &str, now: DateTime<Utc>) -> Result<ExitOutcome> {
        let Some(session) = self.sessions.get(plate) else {
            return Ok(ExitOutcome::Denied(Denial::NoEntryRecord));
        };

        // Fare first: an invalid interval must leave the ledger untouched
        let minutes = duration_minutes(session.entry_time, now)?;
        let fare = self.fares.fare_for_minutes(minutes);

        let Some(session) = self.sessions.remove(plate) else {
            return Ok(ExitOutcome::Denied(Denial::NoEntryRecord));
        };
        self.capacity.release();

        Ok(ExitOutcome::Settled(Settlement {
            session,
            exit: PendingExit {
                plate: plate.to_string(),
                exit_time: now,
            },
            duration_minutes: minutes,
            fare,
            available: self.capacity.available(),
        }))
    }

    /// Status object for logs
    pub fn snapshot(&self) -> serde_json::Value {
        let mut plates: Vec<&str> = self.sessions.keys().map(String::as_str).collect();
        plates.sort_unstable();
        serde_json::json!({
            "available": self.capacity.available(),
            "max_capacity": self.capacity.max(),
            "open_sessions": self.sessions.len(),
            "plates": plates,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn t(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, h, m, 0).unwrap()
    }

    fn ledger(max: u32) -> Ledger {
        Ledger::new(max, FareTable::default(), ReentryPolicy::Overwrite)
    }

    #[test]
    fn open_then_close_restores_capacity() {
        let mut l = ledger(4);
        match l.try_open("ABC123", t(10, 0)) {
            EntryOutcome::Admitted { available, .. } => assert_eq!(available, 3),
            other => panic!("unexpected {:?}", other),
        }
        match l.try_close("ABC123", t(10, 45)).unwrap() {
            ExitOutcome::Settled(s) => {
                assert_eq!(s.fare, 40);
                assert_eq!(s.available, 4);
                assert!((s.duration_minutes - 45.0).abs() < 1e-9);
            }
            other => panic!("unexpected {:?}", other),
        }
        assert!(l.session("ABC123").is_none());
        assert_eq!(l.available(), 4);
    }

    #[test]
    fn invalid_interval_leaves_state_unchanged() {
        let mut l = ledger(2);
        l.try_open("XY1", t(11, 0));
        assert!(l.try_close("XY1", t(10, 0)).is_err());
        assert!(l.session("XY1").is_some());
        assert_eq!(l.available(), 1);
    }

    #[test]
    fn snapshot_lists_sorted_plates() {
        let mut l = ledger(4);
        l.try_open("ZZ9", t(9, 0));
        l.try_open("AA1", t(9, 5));
        let snap = l.snapshot();
        assert_eq!(snap["available"], 2);
        assert_eq!(snap["plates"], serde_json::json!(["AA1", "ZZ9"]));
    }
}
