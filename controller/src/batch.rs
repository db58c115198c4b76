//! Hour-by-hour evaluation over one day.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::hvac::FuzzyController;
use crate::reading::{round_power, Reading};

pub const HOURS_PER_DAY: usize = 24;

/// Hourly inputs for one calendar day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DayProfile {
    pub indoor: Vec<f64>,
    pub occupancy: Vec<f64>,
    pub outdoor: Vec<f64>,
}

impl DayProfile {
    /// Same reading repeated for every hour.
    pub fn constant(reading: Reading) -> Self {
        Self {
            indoor: vec![reading.indoor_temp; HOURS_PER_DAY],
            occupancy: vec![reading.occupancy; HOURS_PER_DAY],
            outdoor: vec![reading.outdoor_temp; HOURS_PER_DAY],
        }
    }

    pub fn validate(&self) -> Result<()> {
        check_len("indoor", &self.indoor)?;
        check_len("occupancy", &self.occupancy)?;
        check_len("outdoor", &self.outdoor)?;
        Ok(())
    }

    /// Hourly readings, clamped into bounds.
    pub fn readings(&self) -> Result<Vec<Reading>> {
        self.validate()?;
        Ok(self
            .indoor
            .iter()
            .zip(&self.occupancy)
            .zip(&self.outdoor)
            .map(|((&i, &o), &t)| Reading::new(i, o, t).clamped())
            .collect())
    }

    pub fn evaluate(&self) -> Result<Vec<f64>> {
        self.evaluate_with(FuzzyController::shared())
    }

    pub fn evaluate_with(&self, controller: &FuzzyController) -> Result<Vec<f64>> {
        Ok(self
            .readings()?
            .iter()
            .map(|r| round_power(controller.evaluate(r)))
            .collect())
    }
}

pub(crate) fn check_len(field: &'static str, values: &[f64]) -> Result<()> {
    if values.len() == HOURS_PER_DAY {
        Ok(())
    } else {
        Err(Error::InvalidLength {
            field,
            expected: HOURS_PER_DAY,
            actual: values.len(),
        })
    }
}

/// Batch adapter: 24 hourly powers, each rounded to 3 decimals.
pub fn evaluate_batch(indoor: &[f64], occupancy: &[f64], outdoor: &[f64]) -> Result<Vec<f64>> {
    DayProfile {
        indoor: indoor.to_vec(),
        occupancy: occupancy.to_vec(),
        outdoor: outdoor.to_vec(),
    }
    .evaluate()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hvac::evaluate;

    #[test]
    fn identical_hours_give_identical_powers() {
        let profile = DayProfile::constant(Reading::new(22.5, 50.0, 18.0));
        let powers = profile.evaluate().unwrap();
        assert_eq!(powers.len(), HOURS_PER_DAY);
        let expected = round_power(evaluate(22.5, 50.0, 18.0));
        assert_eq!(expected, 1.357);
        assert!(powers.iter().all(|&p| p == expected));
    }

    #[test]
    fn inputs_are_clamped_per_hour() {
        let clamped = evaluate_batch(&[50.0; 24], &[-20.0; 24], &[99.0; 24]).unwrap();
        let edge = evaluate_batch(&[30.0; 24], &[0.0; 24], &[45.0; 24]).unwrap();
        assert_eq!(clamped, edge);
    }

    #[test]
    fn hours_are_independent() {
        let mut indoor = vec![22.5; 24];
        indoor[7] = 15.0;
        let mut occupancy = vec![50.0; 24];
        occupancy[7] = 100.0;
        let mut outdoor = vec![18.0; 24];
        outdoor[7] = -10.0;

        let powers = evaluate_batch(&indoor, &occupancy, &outdoor).unwrap();
        assert_eq!(powers[7], 9.0);
        assert_eq!(powers[6], 1.357);
        assert_eq!(powers[8], 1.357);
    }

    #[test]
    fn wrong_lengths_are_rejected() {
        let day = [20.0; 24];
        match evaluate_batch(&day, &day, &[20.0; 23]) {
            Err(Error::InvalidLength { field, expected, actual }) => {
                assert_eq!((field, expected, actual), ("outdoor", 24, 23));
            }
            other => panic!("unexpected {:?}", other),
        }
        assert!(evaluate_batch(&[20.0; 25], &day, &day).is_err());
        assert!(evaluate_batch(&day, &[], &day).is_err());
    }

    #[test]
    fn profile_parses_from_json() {
        let json = serde_json::json!({
            "indoor": vec![21.0; 24],
            "occupancy": vec![30.0; 24],
            "outdoor": vec![12.0; 24],
        });
        let profile: DayProfile = serde_json::from_value(json).unwrap();
        let powers = profile.evaluate().unwrap();
        assert!(powers.iter().all(|&p| p == 1.528));
    }
}
