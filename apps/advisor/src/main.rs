use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use hvac_controller::{Comparison, DayProfile, FuzzyController, NaiveThermostat, Reading};
use tracing::debug;

#[derive(Parser, Debug)]
#[command(name = "hvac-advisor")]
#[command(author, version, about = "Recommend HVAC power from room conditions", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Fuzzy and naive power for a single reading
    Reading {
        /// Indoor temperature, 15..30 °C
        #[arg(long, allow_negative_numbers = true)]
        indoor: f64,
        /// Occupancy, 0..100 %
        #[arg(long)]
        occupancy: f64,
        /// Outdoor temperature, -10..45 °C
        #[arg(long, allow_negative_numbers = true)]
        outdoor: f64,
        #[arg(long, default_value_t = hvac_controller::control::DEFAULT_SETPOINT)]
        setpoint: f64,
        #[arg(long, default_value_t = hvac_controller::control::DEFAULT_DEADBAND)]
        deadband: f64,
    },
    /// Hourly fuzzy power for a 24-hour profile in a JSON file
    Day {
        /// File with `indoor`, `occupancy` and `outdoor` arrays
        file: PathBuf,
    },
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();
}

fn run(command: Command) -> Result<String> {
    let controller = FuzzyController::shared();
    match command {
        Command::Reading {
            indoor,
            occupancy,
            outdoor,
            setpoint,
            deadband,
        } => {
            let reading = Reading::new(indoor, occupancy, outdoor);
            reading.validate()?;
            let baseline = NaiveThermostat::new(setpoint, deadband);
            let comparison = Comparison::compute(controller, &baseline, &reading);
            Ok(serde_json::to_string_pretty(&comparison)?)
        }
        Command::Day { file } => {
            let content = std::fs::read_to_string(&file)
                .with_context(|| format!("Failed to read {}", file.display()))?;
            let profile: DayProfile = serde_json::from_str(&content)
                .with_context(|| format!("Invalid day profile in {}", file.display()))?;
            let power = profile.evaluate_with(controller)?;
            debug!(hours = power.len(), "evaluated day profile");
            Ok(serde_json::to_string(&serde_json::json!({ "power": power }))?)
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    println!("{}", run(cli.command)?);
    Ok(())
}
