//! Outdoor temperature forecasts consumed by planning callers.

use async_trait::async_trait;
use chrono::{Duration, NaiveDateTime};
use serde::{Deserialize, Serialize};

pub const DEFAULT_FORECAST_HOURS: usize = 24;

/// Hourly forecast: `times[i]` pairs with `temps[i]` (°C).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Forecast {
    pub times: Vec<String>,
    pub temps: Vec<f64>,
}

impl Forecast {
    /// Keeps at most `hours` leading entries of both series.
    pub fn truncated(mut self, hours: usize) -> Self {
        self.times.truncate(hours);
        self.temps.truncate(hours);
        self
    }

    pub fn len(&self) -> usize {
        self.times.len().min(self.temps.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Produces forecasts for a coordinate. Implementations may do I/O.
#[async_trait]
pub trait WeatherSource: Send + Sync {
    async fn forecast(&self, lat: f64, lon: f64, hours: usize) -> anyhow::Result<Forecast>;
}

/// In-memory source returning the same hourly temperatures for any location.
#[derive(Debug, Clone)]
pub struct FixedForecast {
    start: NaiveDateTime,
    temps: Vec<f64>,
}

impl FixedForecast {
    pub fn new(start: NaiveDateTime, temps: Vec<f64>) -> Self {
        Self { start, temps }
    }
}

#[async_trait]
impl WeatherSource for FixedForecast {
    async fn forecast(&self, _lat: f64, _lon: f64, hours: usize) -> anyhow::Result<Forecast> {
        let times = (0..self.temps.len())
            .map(|h| (self.start + Duration::hours(h as i64)).format("%Y-%m-%dT%H:%M").to_string())
            .collect();
        Ok(Forecast {
            times,
            temps: self.temps.clone(),
        }
        .truncated(hours))
    }
}
