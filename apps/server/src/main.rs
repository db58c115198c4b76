pub mod config;
pub mod planner;
pub mod web;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use hvac_controller::plan::Planner;
use tracing::{info, warn};

use crate::config::ServerConfig;
use crate::planner::CommandPlanner;
use crate::web::{create_web_server, WebState};

#[derive(Parser, Debug)]
#[command(name = "hvac-server")]
#[command(author, version, about = "Fuzzy HVAC power advisor HTTP service", long_about = None)]
struct Args {
    /// TOML config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Listen address, overrides `server.bind`
    #[arg(short, long)]
    bind: Option<SocketAddr>,

    /// Log as JSON lines
    #[arg(long)]
    json_logs: bool,
}

fn init_tracing(json: bool) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    if json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(env_filter)
            .with_target(true)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .compact()
            .init();
    }
}

fn load_config(args: &Args) -> Result<ServerConfig> {
    let mut config = match &args.config {
        Some(path) => ServerConfig::load(path)?,
        None => ServerConfig::default(),
    };
    if let Some(bind) = args.bind {
        config.server.bind = bind;
    }
    if args.json_logs {
        config.log.json = true;
    }
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = load_config(&args)?;
    init_tracing(config.log.json);

    let planner = CommandPlanner::from_command(
        &config.planner.command,
        Duration::from_secs(config.planner.timeout_secs),
    )
    .map(|p| Arc::new(p) as Arc<dyn Planner>);
    if planner.is_none() {
        warn!("no planner command configured, /agent/optimize is disabled");
    }

    let weather = config.weather_source(chrono::Local::now().naive_local());
    if weather.is_some() {
        info!(hours = config.weather.hourly_temps.len(), "serving canned weather forecast");
    }

    let state = WebState::new(config.thermostat(), planner, weather);
    info!(
        setpoint = config.baseline.setpoint,
        deadband = config.baseline.deadband,
        "naive baseline"
    );

    create_web_server(config.server.bind, state, config.server.static_dir.clone())
        .await
        .with_context(|| format!("Web server on {} failed", config.server.bind))
}
