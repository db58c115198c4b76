//! Callable tools for an external agent pipeline.
//!
//! Each tool takes JSON arguments and returns a [`ToolOutput`]. The HVAC
//! tools are pure; the weather tool delegates to a [`WeatherSource`].
//!
//! [`WeatherSource`]: crate::weather::WeatherSource

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

mod builtin;
mod registry;

pub use builtin::{hvac_tools, ComputeHvacPowerBatchTool, ComputeHvacPowerTool, WeatherForecastTool};
pub use registry::{ToolCall, ToolRegistry, ToolResult};

/// Tool error types.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ToolError {
    #[error("Tool not found: {0}")]
    NotFound(String),

    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),

    #[error("Execution error: {0}")]
    Execution(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

pub type Result<T> = std::result::Result<T, ToolError>;

impl From<serde_json::Error> for ToolError {
    fn from(err: serde_json::Error) -> Self {
        ToolError::Serialization(err.to_string())
    }
}

impl From<crate::Error> for ToolError {
    fn from(err: crate::Error) -> Self {
        if err.is_validation() {
            ToolError::InvalidArguments(err.to_string())
        } else {
            ToolError::Execution(err.to_string())
        }
    }
}

/// Tool execution result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolOutput {
    pub success: bool,
    pub data: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ToolOutput {
    pub fn success(data: impl Into<Value>) -> Self {
        Self {
            success: true,
            data: data.into(),
            error: None,
        }
    }

    pub fn error(error: impl Into<String>) -> Self {
        Self {
            success: false,
            data: Value::Null,
            error: Some(error.into()),
        }
    }
}

/// What an agent sees when choosing a tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    /// JSON Schema of the arguments object.
    pub parameters: Value,
}

#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    /// Arguments as JSON Schema.
    fn parameters(&self) -> Value;

    async fn execute(&self, args: Value) -> Result<ToolOutput>;

    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name().to_string(),
            description: self.description().to_string(),
            parameters: self.parameters(),
        }
    }
}

pub type DynTool = Arc<dyn Tool>;

/// Deserializes tool arguments, reporting failures as invalid arguments.
pub(crate) fn parse_args<T: serde::de::DeserializeOwned>(args: Value) -> Result<T> {
    serde_json::from_value(args).map_err(|e| ToolError::InvalidArguments(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = ToolError::NotFound("thermostat".to_string());
        assert!(err.to_string().contains("thermostat"));
    }

    #[test]
    fn error_from_json() {
        let json_err = serde_json::from_str::<Value>("invalid").unwrap_err();
        let tool_err: ToolError = json_err.into();
        assert!(matches!(tool_err, ToolError::Serialization(_)));
    }

    #[test]
    fn crate_errors_map_by_kind() {
        let err: ToolError = crate::Error::InvalidLength {
            field: "indoor",
            expected: 24,
            actual: 3,
        }
        .into();
        assert!(matches!(err, ToolError::InvalidArguments(_)));

        let err: ToolError = crate::Error::Weather("timeout".into()).into();
        assert!(matches!(err, ToolError::Execution(_)));
    }

    #[test]
    fn output_serializes_without_empty_error() {
        let out = serde_json::to_value(ToolOutput::success(1.5)).unwrap();
        assert_eq!(out, serde_json::json!({ "success": true, "data": 1.5 }));
    }
}
