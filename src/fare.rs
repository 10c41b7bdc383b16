//! Parking fare calculation
//!
//! Fares are looked up in a tier table keyed by the parking duration in
//! fractional minutes. Upper bounds are inclusive.

use crate::error::{ParkgateError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One row of the fare table
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FareTier {
    /// Inclusive upper bound of the tier in minutes
    pub up_to_minutes: f64,

    /// Fare charged for durations within this tier
    pub amount: u32,
}

/// Validated, ascending fare table
#[derive(Debug, Clone, PartialEq)]
pub struct FareTable {
    tiers: Vec<FareTier>,
    overflow_fare: u32,
}

/// Parking duration in fractional minutes, millisecond precision
pub fn duration_minutes(entry_time: DateTime<Utc>, exit_time: DateTime<Utc>) -> Result<f64> {
    if exit_time < entry_time {
        return Err(ParkgateError::invalid_interval(
            entry_time.to_rfc3339(),
            exit_time.to_rfc3339(),
        ));
    }
    Ok((exit_time - entry_time).num_milliseconds() as f64 / 60_000.0)
}

impl FareTable {
    /// Build a table; bounds must be strictly ascending and amounts non-decreasing
    pub fn new(tiers: Vec<FareTier>, overflow_fare: u32) -> Result<Self> {
        let mut prev: Option<&FareTier> = None;
        for tier in &tiers {
            if !tier.up_to_minutes.is_finite() || tier.up_to_minutes < 0.0 {
                return Err(ParkgateError::validation(
                    "pricing.tiers",
                    "Tier bounds must be finite and non-negative",
                ));
            }
            if let Some(p) = prev {
                if tier.up_to_minutes <= p.up_to_minutes {
                    return Err(ParkgateError::validation(
                        "pricing.tiers",
                        "Tier bounds must be strictly ascending",
                    ));
                }
                if tier.amount < p.amount {
                    return Err(ParkgateError::validation(
                        "pricing.tiers",
                        "Tier amounts must not decrease",
                    ));
                }
            }
            prev = Some(tier);
        }
        if let Some(last) = tiers.last()
            && overflow_fare < last.amount
        {
            return Err(ParkgateError::validation(
                "pricing.overflow_fare",
                "Must not be lower than the last tier",
            ));
        }
        Ok(Self {
            tiers,
            overflow_fare,
        })
    }

    pub fn tiers(&self) -> &[FareTier] {
        &self.tiers
    }

    pub fn overflow_fare(&self) -> u32 {
        self.overflow_fare
    }

    /// Fare for a duration already expressed in minutes
    pub fn fare_for_minutes(&self, minutes: f64) -> u32 {
        self.tiers
            .iter()
            .find(|t| minutes <= t.up_to_minutes)
            .map(|t| t.amount)
            .unwrap_or(self.overflow_fare)
    }

    /// Fare for a stay from `entry_time` to `exit_time`
    pub fn fare(&self, entry_time: DateTime<Utc>, exit_time: DateTime<Utc>) -> Result<u32> {
        let minutes = duration_minutes(entry_time, exit_time)?;
        Ok(self.fare_for_minutes(minutes))
    }
}

impl Default for FareTable {
    fn default() -> Self {
        Self {
            tiers: vec![
                FareTier {
                    up_to_minutes: 30.0,
                    amount: 20,
                },
                FareTier {
                    up_to_minutes: 60.0,
                    amount: 40,
                },
                FareTier {
                    up_to_minutes: 120.0,
                    amount: 60,
                },
            ],
            overflow_fare: 100,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn at(minutes_ms: i64) -> (DateTime<Utc>, DateTime<Utc>) {
        let entry = Utc.with_ymd_and_hms(2024, 1, 1, 10, 0, 0).unwrap();
        (entry, entry + Duration::milliseconds(minutes_ms))
    }

    #[test]
    fn tier_boundaries_are_inclusive() {
        let table = FareTable::default();
        let cases = [
            (30 * 60_000, 20),
            (30 * 60_000 + 600, 40),
            (60 * 60_000, 40),
            (60 * 60_000 + 600, 60),
            (120 * 60_000, 60),
            (120 * 60_000 + 600, 100),
        ];
        for (ms, expected) in cases {
            let (entry, exit) = at(ms);
            assert_eq!(table.fare(entry, exit).unwrap(), expected, "{} ms", ms);
        }
    }

    #[test]
    fn zero_duration_is_first_tier() {
        let (entry, exit) = at(0);
        assert_eq!(FareTable::default().fare(entry, exit).unwrap(), 20);
    }

    #[test]
    fn fare_is_monotonic() {
        let table = FareTable::default();
        let mut last = 0;
        for minute in 0..400 {
            let fare = table.fare_for_minutes(minute as f64 * 0.5);
            assert!(fare >= last);
            last = fare;
        }
    }

    #[test]
    fn exit_before_entry_is_invalid() {
        let (entry, exit) = at(-1000);
        let err = FareTable::default().fare(entry, exit).unwrap_err();
        assert!(matches!(err, ParkgateError::InvalidInterval { .. }));
    }

    #[test]
    fn rejects_unordered_tiers() {
        let tiers = vec![
            FareTier {
                up_to_minutes: 60.0,
                amount: 40,
            },
            FareTier {
                up_to_minutes: 30.0,
                amount: 20,
            },
        ];
        assert!(FareTable::new(tiers, 100).is_err());
    }

    #[test]
    fn rejects_decreasing_overflow() {
        let tiers = vec![FareTier {
            up_to_minutes: 30.0,
            amount: 50,
        }];
        assert!(FareTable::new(tiers, 10).is_err());
    }

    #[test]
    fn empty_table_charges_overflow() {
        let table = FareTable::new(Vec::new(), 7).unwrap();
        assert_eq!(table.fare_for_minutes(0.0), 7);
    }
}
