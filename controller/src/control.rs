use serde::{Deserialize, Serialize};

use crate::hvac::FuzzyController;
use crate::reading::Reading;

pub const DEFAULT_SETPOINT: f64 = 22.5;
pub const DEFAULT_DEADBAND: f64 = 1.0;

/// Maps a reading to a power level in [0, 10].
pub trait PowerControl: Send + Sync {
    fn name(&self) -> &'static str;
    fn power(&self, reading: &Reading) -> f64;
}

/// Bang-bang thermostat: full power outside the deadband, off inside it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NaiveThermostat {
    pub setpoint: f64,
    pub deadband: f64,
}

impl NaiveThermostat {
    pub fn new(setpoint: f64, deadband: f64) -> Self {
        Self { setpoint, deadband }
    }
}

impl Default for NaiveThermostat {
    fn default() -> Self {
        Self::new(DEFAULT_SETPOINT, DEFAULT_DEADBAND)
    }
}

impl PowerControl for NaiveThermostat {
    fn name(&self) -> &'static str {
        "naive"
    }

    fn power(&self, reading: &Reading) -> f64 {
        naive(reading.indoor_temp, self.setpoint, self.deadband)
    }
}

/// Naive thermostat baseline. The indoor temperature is not clamped.
pub fn naive(indoor_temp: f64, setpoint: f64, deadband: f64) -> f64 {
    if indoor_temp < setpoint - deadband || indoor_temp > setpoint + deadband {
        10.0
    } else {
        0.0
    }
}

impl PowerControl for FuzzyController {
    fn name(&self) -> &'static str {
        "fuzzy"
    }

    fn power(&self, reading: &Reading) -> f64 {
        self.evaluate(reading)
    }
}

/// Fuzzy recommendation next to the baseline for the same reading.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Comparison {
    pub hvac_power: f64,
    pub naive_hvac_power: f64,
}

impl Comparison {
    pub fn compute(fuzzy: &dyn PowerControl, baseline: &dyn PowerControl, reading: &Reading) -> Self {
        Self {
            hvac_power: fuzzy.power(reading),
            naive_hvac_power: baseline.power(reading),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn naive_deadband_edges() {
        assert_eq!(naive(22.5, DEFAULT_SETPOINT, DEFAULT_DEADBAND), 0.0);
        assert_eq!(naive(20.0, DEFAULT_SETPOINT, DEFAULT_DEADBAND), 10.0);
        assert_eq!(naive(21.6, DEFAULT_SETPOINT, DEFAULT_DEADBAND), 0.0);
        assert_eq!(naive(23.6, DEFAULT_SETPOINT, DEFAULT_DEADBAND), 10.0);
        // Exactly on the band edge counts as inside.
        assert_eq!(naive(21.5, DEFAULT_SETPOINT, DEFAULT_DEADBAND), 0.0);
        assert_eq!(naive(23.5, DEFAULT_SETPOINT, DEFAULT_DEADBAND), 0.0);
    }

    #[test]
    fn naive_does_not_clamp() {
        assert_eq!(naive(-40.0, DEFAULT_SETPOINT, DEFAULT_DEADBAND), 10.0);
        assert_eq!(naive(80.0, DEFAULT_SETPOINT, DEFAULT_DEADBAND), 10.0);
    }

    #[test]
    fn thermostat_uses_its_own_setpoint() {
        let t = NaiveThermostat::new(19.0, 0.5);
        assert_eq!(t.power(&Reading::new(19.4, 0.0, 0.0)), 0.0);
        assert_eq!(t.power(&Reading::new(20.0, 0.0, 0.0)), 10.0);
        assert_eq!(NaiveThermostat::default(), NaiveThermostat::new(22.5, 1.0));
    }

    #[test]
    fn comparison_reports_both_controls() {
        let fuzzy = FuzzyController::shared();
        let reading = Reading::new(15.0, 100.0, -10.0);
        let c = Comparison::compute(fuzzy, &NaiveThermostat::default(), &reading);
        assert!((c.hvac_power - 9.0).abs() < 1e-6);
        assert_eq!(c.naive_hvac_power, 10.0);
        assert_eq!(fuzzy.name(), "fuzzy");
    }
}
