use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Closed interval of accepted values for one input axis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub min: f64,
    pub max: f64,
}

impl Bounds {
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }

    /// NaN clamps to the lower bound so callers always get a usable value.
    pub fn clamp(&self, value: f64) -> f64 {
        if value.is_nan() {
            return self.min;
        }
        value.clamp(self.min, self.max)
    }

    pub fn check(&self, field: &'static str, value: f64) -> Result<f64> {
        if self.contains(value) {
            Ok(value)
        } else {
            Err(Error::OutOfRange {
                field,
                value,
                min: self.min,
                max: self.max,
            })
        }
    }
}

// --- Physical bounds of the inputs (°C, %, °C) and of the output ---
pub const INDOOR_BOUNDS: Bounds = Bounds::new(15.0, 30.0);
pub const OCCUPANCY_BOUNDS: Bounds = Bounds::new(0.0, 100.0);
pub const OUTDOOR_BOUNDS: Bounds = Bounds::new(-10.0, 45.0);
pub const POWER_BOUNDS: Bounds = Bounds::new(0.0, 10.0);

/// One sample of the three controller inputs.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    pub indoor_temp: f64,
    pub occupancy: f64,
    pub outdoor_temp: f64,
}

impl Reading {
    pub fn new(indoor_temp: f64, occupancy: f64, outdoor_temp: f64) -> Self {
        Self { indoor_temp, occupancy, outdoor_temp }
    }

    /// Copy of this reading with every field forced into its bounds.
    pub fn clamped(&self) -> Self {
        Self {
            indoor_temp: INDOOR_BOUNDS.clamp(self.indoor_temp),
            occupancy: OCCUPANCY_BOUNDS.clamp(self.occupancy),
            outdoor_temp: OUTDOOR_BOUNDS.clamp(self.outdoor_temp),
        }
    }

    /// Reports the first field outside its bounds.
    pub fn validate(&self) -> Result<()> {
        INDOOR_BOUNDS.check("indoor", self.indoor_temp)?;
        OCCUPANCY_BOUNDS.check("occupancy", self.occupancy)?;
        OUTDOOR_BOUNDS.check("outdoor", self.outdoor_temp)?;
        Ok(())
    }
}

/// Rounds a power level to 3 decimals and keeps it in [0, 10].
pub fn round_power(power: f64) -> f64 {
    let rounded = (power * 1000.0).round() / 1000.0;
    POWER_BOUNDS.clamp(rounded)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clamped_forces_fields_into_bounds() {
        let r = Reading::new(40.0, -5.0, -30.0).clamped();
        assert_eq!(r, Reading::new(30.0, 0.0, -10.0));

        let r = Reading::new(f64::NAN, 150.0, 50.0).clamped();
        assert_eq!(r, Reading::new(15.0, 100.0, 45.0));
    }

    #[test]
    fn validate_names_offending_field() {
        assert!(Reading::new(22.0, 50.0, 10.0).validate().is_ok());
        assert!(Reading::new(15.0, 0.0, -10.0).validate().is_ok());
        assert!(Reading::new(30.0, 100.0, 45.0).validate().is_ok());

        match Reading::new(22.0, 101.0, 10.0).validate() {
            Err(Error::OutOfRange { field, .. }) => assert_eq!(field, "occupancy"),
            other => panic!("unexpected {:?}", other),
        }
        match Reading::new(22.0, 50.0, f64::NAN).validate() {
            Err(Error::OutOfRange { field, .. }) => assert_eq!(field, "outdoor"),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn round_power_rounds_and_clamps() {
        assert_eq!(round_power(1.357142857), 1.357);
        assert_eq!(round_power(8.91666), 8.917);
        assert_eq!(round_power(10.0004), 10.0);
        assert_eq!(round_power(-0.2), 0.0);
        assert_eq!(round_power(f64::NAN), 0.0);
    }
}
