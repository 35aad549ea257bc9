//! Virtual gear boundaries. They only shape the simulated engine RPM; they
//! never change drive torque.

use tracing::debug;

use crate::error::GearboxError;

const SPACING_EXPONENT: f32 = 0.7;

#[derive(Debug, Clone, PartialEq)]
pub struct GearTable {
    top_speed: f32,
    thresholds: Vec<f32>,
}

impl GearTable {
    pub fn new(gears: usize, top_speed: f32) -> Result<Self, GearboxError> {
        if gears == 0 {
            return Err(GearboxError::NoGears);
        }
        if !top_speed.is_finite() || top_speed <= 0.0 {
            return Err(GearboxError::InvalidTopSpeed(top_speed));
        }
        Ok(Self {
            top_speed,
            thresholds: Self::spacing(gears, top_speed),
        })
    }

    // threshold[i] = top * ((i + 1) / n)^0.7; the last one is exactly `top`.
    fn spacing(gears: usize, top_speed: f32) -> Vec<f32> {
        (0..gears)
            .map(|i| {
                let t = (i + 1) as f32 / gears as f32;
                top_speed * t.powf(SPACING_EXPONENT)
            })
            .collect()
    }

    pub fn gears(&self) -> usize {
        self.thresholds.len()
    }

    pub fn thresholds(&self) -> &[f32] {
        &self.thresholds
    }

    /// Recompute the boundaries if the top speed moved. Returns whether it did.
    pub fn retarget(&mut self, top_speed: f32) -> bool {
        if top_speed == self.top_speed || !top_speed.is_finite() || top_speed <= 0.0 {
            return false;
        }
        debug!(from = self.top_speed, to = top_speed, "gear table retargeted");
        self.top_speed = top_speed;
        self.thresholds = Self::spacing(self.thresholds.len(), top_speed);
        true
    }

    /// 1-based gear: the first boundary above `speed`, else top gear.
    pub fn gear_for(&self, speed: f32) -> usize {
        let speed = speed.abs();
        self.thresholds
            .iter()
            .position(|&limit| speed < limit)
            .map_or(self.gears(), |i| i + 1)
    }

    /// (lower, upper) speed bounds of a 1-based gear.
    pub fn bounds(&self, gear: usize) -> (f32, f32) {
        let gear = gear.clamp(1, self.gears());
        let lower = if gear == 1 { 0.0 } else { self.thresholds[gear - 2] };
        (lower, self.thresholds[gear - 1])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn rejects_degenerate_tables() {
        assert_eq!(GearTable::new(0, 300.0), Err(GearboxError::NoGears));
        assert!(matches!(GearTable::new(6, 0.0), Err(GearboxError::InvalidTopSpeed(_))));
        assert!(matches!(GearTable::new(6, f32::NAN), Err(GearboxError::InvalidTopSpeed(_))));
    }

    #[test]
    fn gear_lookup() {
        let table = GearTable::new(4, 100.0).unwrap();
        assert_eq!(table.gear_for(0.0), 1);
        assert_eq!(table.gear_for(-5.0), 1);
        let (lo, hi) = table.bounds(2);
        assert_eq!(table.gear_for((lo + hi) * 0.5), 2);
        assert_eq!(table.gear_for(100.0), 4);
        assert_eq!(table.gear_for(500.0), 4);
    }

    #[test]
    fn retarget_keeps_gear_count() {
        let mut table = GearTable::new(6, 320.0).unwrap();
        assert!(table.retarget(160.0));
        assert_eq!(table.gears(), 6);
        assert_eq!(*table.thresholds().last().unwrap(), 160.0);
        assert!(!table.retarget(160.0));
    }

    proptest! {
        #[test]
        fn prop_thresholds_strictly_increase_and_end_at_top(
            gears in 4usize..=8,
            top in 10.0f32..400.0,
        ) {
            let table = GearTable::new(gears, top).unwrap();
            let t = table.thresholds();
            prop_assert_eq!(t.len(), gears);
            for pair in t.windows(2) {
                prop_assert!(pair[0] < pair[1], "{:?}", t);
            }
            prop_assert_eq!(t[gears - 1], top);
        }

        #[test]
        fn prop_retarget_preserves_invariant(gears in 4usize..=8, a in 10.0f32..400.0, b in 10.0f32..400.0) {
            let mut table = GearTable::new(gears, a).unwrap();
            table.retarget(b);
            let t = table.thresholds();
            prop_assert_eq!(t[gears - 1], b);
            for pair in t.windows(2) {
                prop_assert!(pair[0] < pair[1]);
            }
        }
    }
}
