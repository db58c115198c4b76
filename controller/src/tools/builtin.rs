use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

use super::{parse_args, DynTool, Result, Tool, ToolOutput};
use crate::batch::DayProfile;
use crate::hvac::FuzzyController;
use crate::reading::{round_power, Reading};
use crate::weather::{WeatherSource, DEFAULT_FORECAST_HOURS};

/// The two HVAC tools, ready for registration.
pub fn hvac_tools() -> Vec<DynTool> {
    vec![
        Arc::new(ComputeHvacPowerTool::new()),
        Arc::new(ComputeHvacPowerBatchTool::new()),
    ]
}

#[derive(Debug, Deserialize)]
struct PowerArgs {
    indoor: f64,
    occupancy: f64,
    outdoor: f64,
}

/// Fuzzy power for one reading; inputs are clamped into bounds first.
pub struct ComputeHvacPowerTool {
    controller: &'static FuzzyController,
}

impl ComputeHvacPowerTool {
    pub fn new() -> Self {
        Self {
            controller: FuzzyController::shared(),
        }
    }
}

impl Default for ComputeHvacPowerTool {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Tool for ComputeHvacPowerTool {
    fn name(&self) -> &str {
        "compute_hvac_power"
    }

    fn description(&self) -> &str {
        "Return fuzzy HVAC power (0..10) for indoor °C, occupancy %, and outdoor °C. \
         This is the ground-truth controller; respect physical bounds."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "indoor": { "type": "number", "minimum": 15, "maximum": 30, "description": "Indoor temperature (°C)" },
                "occupancy": { "type": "number", "minimum": 0, "maximum": 100, "description": "Occupancy percentage (0..100)" },
                "outdoor": { "type": "number", "minimum": -10, "maximum": 45, "description": "Outdoor temperature (°C)" }
            },
            "required": ["indoor", "occupancy", "outdoor"]
        })
    }

    async fn execute(&self, args: Value) -> Result<ToolOutput> {
        let args: PowerArgs = parse_args(args)?;
        let reading = Reading::new(args.indoor, args.occupancy, args.outdoor).clamped();
        let power = round_power(self.controller.evaluate(&reading));
        debug!(?reading, power, "compute_hvac_power");
        Ok(ToolOutput::success(power))
    }
}

/// Fuzzy power for 24 hourly readings.
pub struct ComputeHvacPowerBatchTool {
    controller: &'static FuzzyController,
}

impl ComputeHvacPowerBatchTool {
    pub fn new() -> Self {
        Self {
            controller: FuzzyController::shared(),
        }
    }
}

impl Default for ComputeHvacPowerBatchTool {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Tool for ComputeHvacPowerBatchTool {
    fn name(&self) -> &str {
        "compute_hvac_power_batch"
    }

    fn description(&self) -> &str {
        "Return a list of 24 fuzzy HVAC power values (0..10) for hourly indoor/outdoor/occupancy arrays."
    }

    fn parameters(&self) -> Value {
        let hourly = |description: &str| {
            json!({
                "type": "array",
                "items": { "type": "number" },
                "minItems": 24,
                "maxItems": 24,
                "description": description
            })
        };
        json!({
            "type": "object",
            "properties": {
                "indoor": hourly("Hourly indoor °C (24)"),
                "occupancy": hourly("Hourly occupancy % (24)"),
                "outdoor": hourly("Hourly outdoor °C (24)")
            },
            "required": ["indoor", "occupancy", "outdoor"]
        })
    }

    async fn execute(&self, args: Value) -> Result<ToolOutput> {
        let profile: DayProfile = parse_args(args)?;
        let powers = profile.evaluate_with(self.controller)?;
        Ok(ToolOutput::success(powers))
    }
}

#[derive(Debug, Deserialize)]
struct ForecastArgs {
    lat: f64,
    lon: f64,
    #[serde(default = "default_hours")]
    hours: usize,
}

fn default_hours() -> usize {
    DEFAULT_FORECAST_HOURS
}

/// Hourly outdoor temperatures from a [`WeatherSource`].
pub struct WeatherForecastTool {
    source: Arc<dyn WeatherSource>,
}

impl WeatherForecastTool {
    pub fn new(source: Arc<dyn WeatherSource>) -> Self {
        Self { source }
    }
}

#[async_trait]
impl Tool for WeatherForecastTool {
    fn name(&self) -> &str {
        "get_weather_forecast"
    }

    fn description(&self) -> &str {
        "Fetch the next hours of hourly outdoor temperature (°C) for a latitude/longitude. \
         Returns {\"times\": [...], \"temps\": [...]}, both of length <= hours."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "lat": { "type": "number", "minimum": -90, "maximum": 90 },
                "lon": { "type": "number", "minimum": -180, "maximum": 180 },
                "hours": { "type": "integer", "minimum": 1, "default": DEFAULT_FORECAST_HOURS }
            },
            "required": ["lat", "lon"]
        })
    }

    async fn execute(&self, args: Value) -> Result<ToolOutput> {
        let args: ForecastArgs = parse_args(args)?;
        let forecast = self
            .source
            .forecast(args.lat, args.lon, args.hours)
            .await
            .map_err(|e| crate::Error::Weather(format!("{e:#}")))?
            .truncated(args.hours);
        Ok(ToolOutput::success(serde_json::to_value(forecast)?))
    }
}
