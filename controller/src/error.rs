//! Error types for the controller crate.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// A per-hour input sequence does not cover exactly one day.
    #[error("{field} must contain exactly {expected} values, got {actual}")]
    InvalidLength {
        field: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("{field}={value} is outside [{min}, {max}]")]
    OutOfRange {
        field: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// The external planning pipeline is missing or failed.
    #[error("planner error: {0}")]
    Planner(String),

    #[error("weather source error: {0}")]
    Weather(String),
}

impl Error {
    /// Whether the error was caused by caller-supplied input.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Error::InvalidLength { .. } | Error::OutOfRange { .. } | Error::InvalidRequest(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;
