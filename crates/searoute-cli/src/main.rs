use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use searoute_cli::commands::forecast::{
    handle_best_port_command, handle_forecast_command, BestPortArgs, ForecastArgs,
};
use searoute_cli::commands::replay::{handle_replay_command, ReplayArgs};
use searoute_cli::commands::route::{
    handle_alternatives_command, handle_route_command, AlternativesArgs, RouteArgs,
};
use searoute_cli::logging::{init_logging, LoggingConfig};
use searoute_cli::output::OutputFormat;
use searoute_lib::Settings;

#[derive(Parser, Debug)]
#[command(author, version, about = "Maritime route planning and port congestion tools")]
struct Cli {
    /// Navigation network JSON file.
    #[arg(long, global = true, env = "SEAROUTE_NETWORK")]
    network: Option<PathBuf>,

    /// Port congestion history JSON file.
    #[arg(long, global = true, env = "SEAROUTE_HISTORY")]
    history: Option<PathBuf>,

    /// Output format.
    #[arg(long, global = true, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Plan a route between two waypoints.
    Route(RouteArgs),
    /// Plan one route per strategy profile (balanced, time, safety).
    Alternatives(AlternativesArgs),
    /// Forecast congestion at a port for an arrival time.
    Forecast(ForecastArgs),
    /// Pick the least congested of several alternate ports.
    BestPort(BestPortArgs),
    /// Replay recorded positions through the voyage monitor.
    Replay(ReplayArgs),
}

fn main() -> Result<()> {
    init_logging(&LoggingConfig::from_env());
    let cli = Cli::parse();
    let settings = Settings::from_env().context("invalid SEAROUTE_* configuration")?;

    let network = cli.network.as_deref();
    let history = cli.history.as_deref();
    match &cli.command {
        Command::Route(args) => handle_route_command(network, &settings.planner, cli.format, args),
        Command::Alternatives(args) => {
            handle_alternatives_command(network, &settings.planner, cli.format, args)
        }
        Command::Forecast(args) => handle_forecast_command(history, cli.format, args),
        Command::BestPort(args) => handle_best_port_command(history, cli.format, args),
        Command::Replay(args) => handle_replay_command(
            network,
            &settings.planner,
            &settings.monitor,
            cli.format,
            args,
        ),
    }
}
