//! Day-plan optimization requests and the pluggable planner that serves them.
//!
//! Planning itself runs outside this crate (typically an agent pipeline
//! calling the tools in [`crate::tools`]); this module validates requests,
//! hands them to a [`Planner`] and makes sense of whatever text comes back.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, info};

use crate::batch::check_len;
use crate::error::{Error, Result};
use crate::reading::Bounds;

pub const COMFORT_LOW_BOUNDS: Bounds = Bounds::new(16.0, 26.0);
pub const COMFORT_HIGH_BOUNDS: Bounds = Bounds::new(16.0, 28.0);

fn default_comfort_low() -> f64 {
    21.0
}

fn default_comfort_high() -> f64 {
    24.0
}

/// Ask for a 24-hour operating plan at a location.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizeRequest {
    pub lat: f64,
    pub lon: f64,
    #[serde(default = "default_comfort_low")]
    pub comfort_low: f64,
    #[serde(default = "default_comfort_high")]
    pub comfort_high: f64,
    /// Hourly occupancy percentages, one per hour of the day.
    pub occupancy: Vec<f64>,
}

impl OptimizeRequest {
    pub fn validate(&self) -> Result<()> {
        COMFORT_LOW_BOUNDS.check("comfort_low", self.comfort_low)?;
        COMFORT_HIGH_BOUNDS.check("comfort_high", self.comfort_high)?;
        if self.comfort_low > self.comfort_high {
            return Err(Error::InvalidRequest(format!(
                "comfort_low ({}) is above comfort_high ({})",
                self.comfort_low, self.comfort_high
            )));
        }
        check_len("occupancy", &self.occupancy)
    }
}

/// External engine producing a plan as free-form text (ideally JSON).
#[async_trait]
pub trait Planner: Send + Sync {
    async fn plan(&self, request: &OptimizeRequest) -> anyhow::Result<String>;
}

/// Validates the request, runs the planner and parses its output.
///
/// Output that is not JSON comes back as `{"raw": <text>}`.
pub async fn optimize(planner: Option<&dyn Planner>, request: &OptimizeRequest) -> Result<Value> {
    request.validate()?;
    let planner =
        planner.ok_or_else(|| Error::Planner("no optimization pipeline configured".to_string()))?;

    info!(lat = request.lat, lon = request.lon, "running day planner");
    let text = planner
        .plan(request)
        .await
        .map_err(|e| Error::Planner(format!("{e:#}")))?;
    debug!(bytes = text.len(), "planner finished");
    Ok(parse_planner_output(&text))
}

pub fn parse_planner_output(text: &str) -> Value {
    serde_json::from_str(text).unwrap_or_else(|_| json!({ "raw": text }))
}

/// Hour-aligned plan series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Plan {
    pub hours: Vec<f64>,
    pub setpoints: Vec<f64>,
    pub outdoor: Vec<f64>,
    pub occupancy: Vec<f64>,
    pub power: Vec<f64>,
}

/// Serializes as `{"plan": {...}}` or `{"raw": "..."}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NormalizedPlan {
    Plan(Plan),
    /// Anything that could not be read as a plan, as display text.
    Raw(String),
}

const PLAN_KEYS: [&str; 5] = ["hours", "setpoints", "outdoor", "occupancy", "power"];

/// Digs a [`Plan`] out of the shapes planners tend to return: an
/// `{ok, plan}` envelope, JSON inside a string, or JSON inside an `output` or
/// `result` field.
pub fn normalize_plan(value: &Value) -> NormalizedPlan {
    let mut candidate = value.clone();

    if value.get("ok") == Some(&Value::Bool(true)) {
        if let Some(plan) = value.get("plan") {
            candidate = plan.clone();
        }
    }

    if let Value::String(text) = &candidate {
        match serde_json::from_str::<Value>(text) {
            Ok(parsed) => candidate = parsed,
            Err(_) => return NormalizedPlan::Raw(text.clone()),
        }
    }

    for wrapper in ["output", "result"] {
        let inner = candidate
            .get(wrapper)
            .and_then(Value::as_str)
            .and_then(|s| serde_json::from_str::<Value>(s).ok());
        if let Some(parsed) = inner {
            candidate = parsed;
        }
    }

    let has_keys = PLAN_KEYS
        .iter()
        .all(|key| candidate.get(*key).map_or(false, Value::is_array));
    if has_keys {
        if let Ok(plan) = serde_json::from_value::<Plan>(candidate.clone()) {
            return NormalizedPlan::Plan(plan);
        }
    }

    match candidate {
        Value::String(text) => NormalizedPlan::Raw(text),
        other => NormalizedPlan::Raw(
            serde_json::to_string_pretty(&other).unwrap_or_else(|_| other.to_string()),
        ),
    }
}
