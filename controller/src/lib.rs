//! Fuzzy HVAC power advisor.
//!
//! Maps indoor temperature, occupancy and outdoor temperature to a
//! recommended HVAC power level in [0, 10], alongside a naive thermostat
//! baseline, and exposes both as tools for an external planning pipeline.

pub mod batch;
pub mod control;
pub mod error;
pub mod fuzzy;
pub mod hvac;
pub mod plan;
pub mod reading;
pub mod tools;
pub mod weather;

pub use batch::{evaluate_batch, DayProfile, HOURS_PER_DAY};
pub use control::{naive, Comparison, NaiveThermostat, PowerControl};
pub use error::{Error, Result};
pub use hvac::{evaluate, fallback_stats, FallbackStats, FuzzyController, FALLBACK_POWER};
pub use reading::{round_power, Reading};
