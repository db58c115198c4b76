use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use chrono::{NaiveDateTime, Timelike};
use hvac_controller::control::{DEFAULT_DEADBAND, DEFAULT_SETPOINT};
use hvac_controller::weather::{FixedForecast, WeatherSource};
use hvac_controller::NaiveThermostat;
use serde::Deserialize;

const DEFAULT_PORT: u16 = 8000;
const DEFAULT_PLANNER_TIMEOUT_SECS: u64 = 300;

/// Contents of the optional TOML config file. Every section may be omitted.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    pub server: ServerSection,
    pub baseline: BaselineSection,
    pub planner: PlannerSection,
    pub weather: WeatherSection,
    pub log: LogSection,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerSection {
    pub bind: SocketAddr,
    /// Directory of a built frontend to serve at `/`.
    pub static_dir: Option<PathBuf>,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([0, 0, 0, 0], DEFAULT_PORT)),
            static_dir: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BaselineSection {
    pub setpoint: f64,
    pub deadband: f64,
}

impl Default for BaselineSection {
    fn default() -> Self {
        Self {
            setpoint: DEFAULT_SETPOINT,
            deadband: DEFAULT_DEADBAND,
        }
    }
}

/// External planning pipeline, run as a child process per request.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PlannerSection {
    /// Program followed by its arguments. Empty disables `/agent/optimize`.
    pub command: Vec<String>,
    pub timeout_secs: u64,
}

impl Default for PlannerSection {
    fn default() -> Self {
        Self {
            command: Vec::new(),
            timeout_secs: DEFAULT_PLANNER_TIMEOUT_SECS,
        }
    }
}

/// Canned hourly outdoor temperatures served by `get_weather_forecast`,
/// starting at the hour the server started. Empty leaves the tool out.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WeatherSection {
    pub hourly_temps: Vec<f64>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LogSection {
    pub json: bool,
}

impl ServerConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::parse(&content).with_context(|| format!("Invalid config file {}", path.display()))
    }

    pub fn parse(content: &str) -> Result<Self> {
        let config: ServerConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let b = &self.baseline;
        if !b.setpoint.is_finite() {
            bail!("baseline.setpoint must be a finite number");
        }
        if !b.deadband.is_finite() || b.deadband < 0.0 {
            bail!("baseline.deadband must be a non-negative number, got {}", b.deadband);
        }
        if self.planner.timeout_secs == 0 {
            bail!("planner.timeout_secs must be positive");
        }
        if self.weather.hourly_temps.iter().any(|t| !t.is_finite()) {
            bail!("weather.hourly_temps must be finite numbers");
        }
        Ok(())
    }

    /// Forecast source for `now`, truncated to the hour.
    pub fn weather_source(&self, now: NaiveDateTime) -> Option<Arc<dyn WeatherSource>> {
        if self.weather.hourly_temps.is_empty() {
            return None;
        }
        let start = now.date().and_hms_opt(now.hour(), 0, 0).unwrap_or(now);
        Some(Arc::new(FixedForecast::new(start, self.weather.hourly_temps.clone())))
    }

    pub fn thermostat(&self) -> NaiveThermostat {
        NaiveThermostat::new(self.baseline.setpoint, self.baseline.deadband)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_gives_defaults() {
        let config = ServerConfig::parse("").unwrap();
        assert_eq!(config, ServerConfig::default());
        assert_eq!(config.server.bind.port(), 8000);
        assert_eq!(config.thermostat(), NaiveThermostat::default());
        assert!(config.planner.command.is_empty());
        assert!(!config.log.json);
    }

    #[test]
    fn sections_override_defaults() {
        let config = ServerConfig::parse(
            r#"
            [server]
            bind = "127.0.0.1:9000"
            static_dir = "frontend/dist"

            [baseline]
            setpoint = 21.0

            [planner]
            command = ["python3", "-m", "hvac_agents"]
            timeout_secs = 60

            [weather]
            hourly_temps = [3.5, 4.0, 5.5]

            [log]
            json = true
            "#,
        )
        .unwrap();
        assert_eq!(config.server.bind, "127.0.0.1:9000".parse::<SocketAddr>().unwrap());
        assert_eq!(config.server.static_dir, Some(PathBuf::from("frontend/dist")));
        assert_eq!(config.baseline.setpoint, 21.0);
        assert_eq!(config.baseline.deadband, DEFAULT_DEADBAND);
        assert_eq!(config.planner.command.len(), 3);
        assert_eq!(config.planner.timeout_secs, 60);
        assert_eq!(config.weather.hourly_temps, vec![3.5, 4.0, 5.5]);
        assert!(config.log.json);
    }

    #[tokio::test]
    async fn weather_section_builds_hourly_source() {
        let now = chrono::NaiveDate::from_ymd_opt(2024, 11, 5)
            .and_then(|d| d.and_hms_opt(14, 37, 12))
            .unwrap();
        assert!(ServerConfig::default().weather_source(now).is_none());

        let config = ServerConfig::parse("[weather]\nhourly_temps = [7.0, 6.5]").unwrap();
        let source = config.weather_source(now).unwrap();
        let forecast = source.forecast(0.0, 0.0, 24).await.unwrap();
        assert_eq!(forecast.times, vec!["2024-11-05T14:00", "2024-11-05T15:00"]);
        assert_eq!(forecast.temps, vec![7.0, 6.5]);
    }

    #[test]
    fn invalid_values_are_rejected() {
        assert!(ServerConfig::parse("[baseline]\ndeadband = -1.0").is_err());
        assert!(ServerConfig::parse("[planner]\ntimeout_secs = 0").is_err());
        assert!(ServerConfig::parse("[server]\nbind = \"not an address\"").is_err());
        assert!(ServerConfig::parse("[baseline]\nhysteresis = 1.0").is_err());
        assert!(ServerConfig::parse("[weather]\nhourly_temps = [nan]").is_err());
    }

    #[test]
    fn missing_file_has_context() {
        let err = ServerConfig::load(Path::new("/nonexistent/hvac.toml")).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/hvac.toml"));
    }
}
