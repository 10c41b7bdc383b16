//! Free-slot accounting for the lot

use serde::Serialize;

/// Available slots bounded by a fixed maximum
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CapacityGauge {
    available: u32,
    max: u32,
}

impl CapacityGauge {
    /// A gauge for an empty lot
    pub fn new(max: u32) -> Self {
        Self {
            available: max,
            max,
        }
    }

    pub fn available(&self) -> u32 {
        self.available
    }

    pub fn max(&self) -> u32 {
        self.max
    }

    pub fn is_full(&self) -> bool {
        self.available == 0
    }

    /// Claim one slot. Returns false when the lot is full.
    pub fn take(&mut self) -> bool {
        if self.available == 0 {
            return false;
        }
        self.available -= 1;
        true
    }

    /// Return one slot, saturating at the maximum
    pub fn release(&mut self) {
        if self.available < self.max {
            self.available += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn take_until_full() {
        let mut gauge = CapacityGauge::new(2);
        assert!(gauge.take());
        assert!(gauge.take());
        assert!(gauge.is_full());
        assert!(!gauge.take());
        assert_eq!(gauge.available(), 0);
    }

    #[test]
    fn release_never_exceeds_max() {
        let mut gauge = CapacityGauge::new(1);
        gauge.release();
        assert_eq!(gauge.available(), 1);
        assert!(gauge.take());
        gauge.release();
        gauge.release();
        assert_eq!(gauge.available(), 1);
    }
}
