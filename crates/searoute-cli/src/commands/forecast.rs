//! Congestion forecast and alternate-port command handlers.

use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Result};
use chrono::{DateTime, Utc};
use clap::Args;
use serde::Serialize;

use searoute_lib::{CongestionForecast, SystemClock};

use crate::commands::load_forecaster;
use crate::output::{print_json, OutputFormat};

/// Arguments for the forecast command.
#[derive(Debug, Clone, Args)]
pub struct ForecastArgs {
    /// Port id to forecast.
    #[arg(long)]
    pub port: String,
    /// Expected arrival (RFC 3339).
    #[arg(long)]
    pub arrival: DateTime<Utc>,
    /// Vessel type used for the type-specific signal.
    #[arg(long)]
    pub vessel_type: Option<String>,
}

/// Handle the forecast subcommand.
pub fn handle_forecast_command(
    history_path: Option<&Path>,
    format: OutputFormat,
    args: &ForecastArgs,
) -> Result<()> {
    let forecaster = load_forecaster(history_path, Arc::new(SystemClock))?;
    let forecast = forecaster.forecast(&args.port, args.arrival, args.vessel_type.as_deref());

    match format {
        OutputFormat::Json => print_json(&forecast),
        OutputFormat::Text => {
            print!("{}", forecaster.congestion_report(&[args.port.as_str()]));
            print_factors(&forecast);
            Ok(())
        }
    }
}

fn print_factors(forecast: &CongestionForecast) {
    println!(
        "  Factors: moving average {:.1} h, seasonal {:.1} h, vessel type {:.1} h",
        forecast.factors.moving_average,
        forecast.factors.seasonal_adjustment,
        forecast.factors.vessel_type_factor
    );
}

/// Arguments for the best-port command.
#[derive(Debug, Clone, Args)]
pub struct BestPortArgs {
    /// Port currently planned.
    #[arg(long)]
    pub primary: String,
    /// Candidate alternate ports, comma separated.
    #[arg(long, value_delimiter = ',', required = true)]
    pub candidates: Vec<String>,
    /// Expected arrival (RFC 3339).
    #[arg(long)]
    pub arrival: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
struct BestPortOutput {
    primary: CongestionForecast,
    best: CongestionForecast,
}

/// Handle the best-port subcommand: the candidate with the shortest
/// predicted wait, compared with the primary port.
pub fn handle_best_port_command(
    history_path: Option<&Path>,
    format: OutputFormat,
    args: &BestPortArgs,
) -> Result<()> {
    let forecaster = load_forecaster(history_path, Arc::new(SystemClock))?;
    let Some(best_id) =
        forecaster.select_best_alternate_port(&args.primary, &args.candidates, args.arrival)
    else {
        bail!("no candidate ports given");
    };

    let primary = forecaster.forecast(&args.primary, args.arrival, None);
    let best = forecaster.forecast(&best_id, args.arrival, None);

    match format {
        OutputFormat::Json => print_json(&BestPortOutput { primary, best }),
        OutputFormat::Text => {
            println!(
                "Best alternate for {}: {} ({:.1} h expected wait)",
                args.primary, best.port_id, best.predicted_wait_hours
            );
            println!(
                "Primary {}: {:.1} h expected wait",
                primary.port_id, primary.predicted_wait_hours
            );
            Ok(())
        }
    }
}
