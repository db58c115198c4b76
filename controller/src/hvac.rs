//! The HVAC rule base and the process-wide controller built from it.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::OnceLock;

use serde::Serialize;
use tracing::{error, warn};

use crate::fuzzy::{FuzzySystem, FuzzyVariable, InferenceError, Triangle, Universe};
use crate::reading::Reading;

/// Returned whenever inference cannot produce a crisp output.
pub const FALLBACK_POWER: f64 = 0.0;

pub const INDOOR_TEMP: &str = "indoor_temp";
pub const OCCUPANCY: &str = "occupancy";
pub const OUTDOOR_TEMP: &str = "outdoor_temp";
pub const HVAC_POWER: &str = "hvac_power";

/// Builds the three-input Mamdani system. Input order is
/// `indoor_temp, occupancy, outdoor_temp`.
pub fn build_system() -> Result<FuzzySystem, InferenceError> {
    let indoor = FuzzyVariable::new(INDOOR_TEMP, Universe::steps(15, 30))
        .term("cold", Triangle::new(15.0, 15.0, 20.0))
        .term("comfortable", Triangle::new(19.0, 22.5, 26.0))
        .term("hot", Triangle::new(24.0, 30.0, 30.0));

    let occupancy = FuzzyVariable::new(OCCUPANCY, Universe::steps(0, 100))
        .term("low", Triangle::new(0.0, 0.0, 40.0))
        .term("medium", Triangle::new(30.0, 50.0, 70.0))
        .term("high", Triangle::new(60.0, 100.0, 100.0));

    let outdoor = FuzzyVariable::new(OUTDOOR_TEMP, Universe::steps(-10, 45))
        .term("cold", Triangle::new(-10.0, -10.0, 10.0))
        .term("mild", Triangle::new(5.0, 18.0, 30.0))
        .term("hot", Triangle::new(25.0, 45.0, 45.0));

    let power = FuzzyVariable::new(HVAC_POWER, Universe::steps(0, 10))
        .term("low", Triangle::new(0.0, 0.0, 4.0))
        .term("moderate", Triangle::new(3.0, 5.5, 8.0))
        .term("high", Triangle::new(7.0, 10.0, 10.0));

    FuzzySystem::new(vec![indoor, occupancy, outdoor], power)?
        .rule(&[(INDOOR_TEMP, "cold"), (OCCUPANCY, "high")], "high")?
        .rule(&[(INDOOR_TEMP, "cold"), (OCCUPANCY, "low")], "moderate")?
        .rule(&[(INDOOR_TEMP, "comfortable"), (OUTDOOR_TEMP, "mild")], "low")?
        .rule(&[(INDOOR_TEMP, "hot"), (OCCUPANCY, "high")], "high")?
        .rule(&[(OUTDOOR_TEMP, "hot"), (INDOOR_TEMP, "comfortable")], "moderate")?
        .rule(&[(INDOOR_TEMP, "comfortable"), (OCCUPANCY, "low")], "low")?
        .rule(
            &[(OUTDOOR_TEMP, "cold"), (INDOOR_TEMP, "comfortable"), (OCCUPANCY, "high")],
            "moderate",
        )
}

/// How often evaluation fell back to [`FALLBACK_POWER`], split by cause.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FallbackStats {
    /// Inputs in a rule-coverage gap: no rule fired.
    pub no_rule_fired: u64,
    /// Anything else: malformed rule base, bad input, non-finite output.
    pub inference_faults: u64,
}

#[derive(Debug, Default)]
struct FallbackCounters {
    no_rule_fired: AtomicU64,
    inference_faults: AtomicU64,
}

/// Fuzzy controller with fallback accounting.
#[derive(Debug)]
pub struct FuzzyController {
    system: Result<FuzzySystem, InferenceError>,
    counters: FallbackCounters,
}

impl FuzzyController {
    pub fn new() -> Self {
        Self::from_system(build_system())
    }

    pub fn from_system(system: Result<FuzzySystem, InferenceError>) -> Self {
        if let Err(e) = &system {
            error!(error = %e, "fuzzy rule base is invalid; every evaluation will fall back");
        }
        Self {
            system,
            counters: FallbackCounters::default(),
        }
    }

    /// Controller shared by the whole process, built on first use.
    pub fn shared() -> &'static FuzzyController {
        static CONTROLLER: OnceLock<FuzzyController> = OnceLock::new();
        CONTROLLER.get_or_init(FuzzyController::new)
    }

    /// Raw inference result, without fallback.
    pub fn try_evaluate(&self, reading: &Reading) -> Result<f64, InferenceError> {
        let system = self.system.as_ref().map_err(|e| e.clone())?;
        system.infer(&[reading.indoor_temp, reading.occupancy, reading.outdoor_temp])
    }

    /// Recommended power in [0, 10]; [`FALLBACK_POWER`] when inference fails.
    pub fn evaluate(&self, reading: &Reading) -> f64 {
        match self.try_evaluate(reading) {
            Ok(power) => power,
            Err(InferenceError::NoActiveRule) => {
                self.counters.no_rule_fired.fetch_add(1, Ordering::Relaxed);
                warn!(
                    indoor = reading.indoor_temp,
                    occupancy = reading.occupancy,
                    outdoor = reading.outdoor_temp,
                    "no fuzzy rule fired, using fallback power"
                );
                FALLBACK_POWER
            }
            Err(e) => {
                self.counters.inference_faults.fetch_add(1, Ordering::Relaxed);
                error!(
                    error = %e,
                    indoor = reading.indoor_temp,
                    occupancy = reading.occupancy,
                    outdoor = reading.outdoor_temp,
                    "fuzzy inference failed, using fallback power"
                );
                FALLBACK_POWER
            }
        }
    }

    pub fn fallback_stats(&self) -> FallbackStats {
        FallbackStats {
            no_rule_fired: self.counters.no_rule_fired.load(Ordering::Relaxed),
            inference_faults: self.counters.inference_faults.load(Ordering::Relaxed),
        }
    }
}

impl Default for FuzzyController {
    fn default() -> Self {
        Self::new()
    }
}

/// Fuzzy Decision Function on the shared controller.
pub fn evaluate(indoor_temp: f64, occupancy: f64, outdoor_temp: f64) -> f64 {
    FuzzyController::shared().evaluate(&Reading::new(indoor_temp, occupancy, outdoor_temp))
}

/// Fallback counters of the shared controller.
pub fn fallback_stats() -> FallbackStats {
    FuzzyController::shared().fallback_stats()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn eval(indoor: f64, occupancy: f64, outdoor: f64) -> f64 {
        FuzzyController::new().evaluate(&Reading::new(indoor, occupancy, outdoor))
    }

    fn assert_close(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() < 1e-6,
            "expected {expected}, got {actual}"
        );
    }

    #[test]
    fn rule_base_shape() {
        let system = build_system().unwrap();
        assert_eq!(system.rule_count(), 7);
        let names: Vec<&str> = system.inputs().iter().map(|v| v.name()).collect();
        assert_eq!(names, [INDOOR_TEMP, OCCUPANCY, OUTDOOR_TEMP]);
        let terms: Vec<&str> = system.output().term_names().collect();
        assert_eq!(terms, ["low", "moderate", "high"]);
    }

    #[test]
    fn golden_values() {
        // Comfortable indoor, mild outdoor: rules 3 and 6 dominate.
        assert_close(eval(22.5, 50.0, 18.0), 1.357142857142857);
        // Cold indoor, full occupancy: rule 1 alone.
        assert_close(eval(15.0, 100.0, -10.0), 9.0);
        assert_close(eval(15.0, 0.0, 20.0), 5.5);
        assert_close(eval(28.0, 100.0, 35.0), 8.916666666666668);
        assert_close(eval(17.0, 70.0, 0.0), 8.678571428571429);
        assert_close(eval(25.0, 100.0, 0.0), 6.290182527024632);
        assert_close(eval(21.0, 30.0, 12.0), 1.5276653171390016);
        assert_close(eval(19.5, 35.0, 6.0), 3.7186761229314422);
        assert_close(eval(26.0, 65.0, 28.0), 8.591666666666667);
    }

    #[test]
    fn cold_and_crowded_is_high_power() {
        assert!(eval(15.0, 100.0, -10.0) >= 7.0);
    }

    #[test]
    fn coverage_gap_falls_back_and_is_counted() {
        let controller = FuzzyController::new();
        // Hot indoor, few occupants, hot outside: no rule covers this.
        let power = controller.evaluate(&Reading::new(27.0, 10.0, 35.0));
        assert_eq!(power, FALLBACK_POWER);
        assert_eq!(
            controller.fallback_stats(),
            FallbackStats { no_rule_fired: 1, inference_faults: 0 }
        );
    }

    #[test]
    fn faults_are_counted_apart_from_gaps() {
        let controller = FuzzyController::from_system(Err(InferenceError::EmptyUniverse(
            HVAC_POWER.to_string(),
        )));
        assert_eq!(controller.evaluate(&Reading::new(22.0, 50.0, 18.0)), FALLBACK_POWER);

        let controller = FuzzyController::new();
        assert_eq!(controller.evaluate(&Reading::new(f64::NAN, 50.0, 18.0)), FALLBACK_POWER);
        assert_eq!(
            controller.fallback_stats(),
            FallbackStats { no_rule_fired: 0, inference_faults: 1 }
        );
    }

    #[test]
    fn out_of_range_inputs_act_like_edges() {
        assert_close(eval(-50.0, 500.0, -80.0), eval(15.0, 100.0, -10.0));
        assert_close(eval(f64::INFINITY, 100.0, 60.0), eval(30.0, 100.0, 45.0));
    }

    #[test]
    fn output_is_bounded_and_finite_everywhere() {
        let controller = FuzzyController::new();
        for indoor in (0..=36).map(|i| 13.0 + f64::from(i) * 0.5) {
            for occupancy in (0..=22).map(|o| -5.0 + f64::from(o) * 5.0) {
                for outdoor in (0..=13).map(|t| -15.0 + f64::from(t) * 5.0) {
                    let p = controller.evaluate(&Reading::new(indoor, occupancy, outdoor));
                    assert!(p.is_finite() && (0.0..=10.0).contains(&p), "{p}");
                }
            }
        }
    }

    #[test]
    fn more_occupants_never_lower_power_when_cold() {
        for indoor in [15.0, 16.0, 17.5, 19.0, 20.0] {
            for outdoor in [-10.0, 0.0, 18.0, 45.0] {
                assert!(eval(indoor, 100.0, outdoor) >= eval(indoor, 0.0, outdoor) - 1e-9);
                for band in [0..=30, 60..=100] {
                    let mut previous = f64::NEG_INFINITY;
                    for occupancy in band {
                        let p = eval(indoor, f64::from(occupancy), outdoor);
                        assert!(p >= previous - 1e-9, "{indoor} {occupancy} {outdoor}");
                        previous = p;
                    }
                }
            }
        }
    }

    #[test]
    fn shared_controller_matches_fresh_build() {
        assert_eq!(evaluate(22.5, 50.0, 18.0), eval(22.5, 50.0, 18.0));
        assert_eq!(evaluate(19.5, 35.0, 6.0), eval(19.5, 35.0, 6.0));
    }
}
