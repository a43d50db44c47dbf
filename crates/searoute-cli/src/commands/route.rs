//! Route and alternatives command handlers.

use std::path::Path;

use anyhow::{bail, Result};
use chrono::{DateTime, Utc};
use clap::{Args, ValueEnum};
use serde::Serialize;

use searoute_lib::{
    plan_alternatives, plan_route, ChokepointRegistry, OptimizationParams, PlannerSettings,
    RouteAlgorithm, RouteRequest, RouteSummary,
};

use crate::commands::load_network;
use crate::output::{print_json, OutputFormat};

/// Search algorithm selectable on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum AlgorithmArg {
    #[default]
    #[value(name = "a-star")]
    AStar,
    Dijkstra,
}

impl From<AlgorithmArg> for RouteAlgorithm {
    fn from(value: AlgorithmArg) -> Self {
        match value {
            AlgorithmArg::AStar => RouteAlgorithm::AStar,
            AlgorithmArg::Dijkstra => RouteAlgorithm::Dijkstra,
        }
    }
}

/// Planning options shared by `route` and `alternatives`.
#[derive(Debug, Clone, Args)]
pub struct PlanningArgs {
    /// Weight of transit time (defaults to SEAROUTE_WEIGHT_TIME or 1.0).
    #[arg(long)]
    pub weight_time: Option<f64>,
    /// Weight of monetary cost (defaults to SEAROUTE_WEIGHT_COST or 1.0).
    #[arg(long)]
    pub weight_cost: Option<f64>,
    /// Weight of risk (defaults to SEAROUTE_WEIGHT_RISK or 1.0).
    #[arg(long)]
    pub weight_risk: Option<f64>,
    /// Bunker price in USD per ton.
    #[arg(long)]
    pub fuel_price: Option<f64>,
    /// Vessel draught in metres; shallower edges are avoided.
    #[arg(long)]
    pub max_draft: Option<f64>,
    /// Allow edges with critical weather risk.
    #[arg(long)]
    pub allow_critical_weather: bool,
    /// Departure instant (RFC 3339); defaults to now.
    #[arg(long)]
    pub depart: Option<DateTime<Utc>>,
}

impl PlanningArgs {
    /// Optimisation parameters: command-line values over configured defaults.
    pub fn params(&self, defaults: &PlannerSettings) -> OptimizationParams {
        let mut params = defaults.params();
        if let Some(value) = self.weight_time {
            params.weight_time = value;
        }
        if let Some(value) = self.weight_cost {
            params.weight_cost = value;
        }
        if let Some(value) = self.weight_risk {
            params.weight_risk = value;
        }
        if let Some(value) = self.fuel_price {
            params.fuel_price_per_ton = value;
        }
        params.max_draft_m = self.max_draft;
        params.weather_avoidance = !self.allow_critical_weather;
        params
    }

    fn validate(&self) -> Result<()> {
        for (flag, value) in [
            ("--weight-time", self.weight_time),
            ("--weight-cost", self.weight_cost),
            ("--weight-risk", self.weight_risk),
            ("--fuel-price", self.fuel_price),
            ("--max-draft", self.max_draft),
        ] {
            if let Some(value) = value {
                if !value.is_finite() || value < 0.0 {
                    bail!("{flag} must be a non-negative number, got {value}");
                }
            }
        }
        Ok(())
    }
}

/// Arguments for the route command.
#[derive(Debug, Clone, Args)]
pub struct RouteArgs {
    /// Departure waypoint id.
    #[arg(long)]
    pub from: String,
    /// Destination waypoint id.
    #[arg(long)]
    pub to: String,
    /// Search algorithm.
    #[arg(long, value_enum, default_value_t = AlgorithmArg::AStar)]
    pub algorithm: AlgorithmArg,
    /// Iteration cap for the search (defaults to SEAROUTE_MAX_ITERATIONS).
    #[arg(long)]
    pub max_iterations: Option<usize>,
    #[command(flatten)]
    pub planning: PlanningArgs,
}

impl RouteArgs {
    pub fn to_request(&self, defaults: &PlannerSettings) -> RouteRequest {
        let mut request = defaults
            .request(self.from.clone(), self.to.clone())
            .with_algorithm(self.algorithm.into())
            .with_params(self.planning.params(defaults));
        if let Some(max_iterations) = self.max_iterations {
            request.max_iterations = max_iterations;
        }
        request.departure = self.planning.depart;
        request
    }
}

/// Handle the route subcommand.
///
/// Plans one route, flags the standard chokepoints it passes and prints a
/// [`RouteSummary`].
pub fn handle_route_command(
    network_path: Option<&Path>,
    defaults: &PlannerSettings,
    format: OutputFormat,
    args: &RouteArgs,
) -> Result<()> {
    args.planning.validate()?;
    if args.max_iterations == Some(0) {
        bail!("--max-iterations must be at least 1");
    }
    let network = load_network(network_path)?;
    let request = args.to_request(defaults);

    let Some(route) = plan_route(&network, &request)? else {
        bail!("no route found from {} to {}", args.from, args.to);
    };
    let blockages = ChokepointRegistry::standard().check_blockages(&route);
    let summary = RouteSummary::from_route(request.algorithm, &route, blockages);

    match format {
        OutputFormat::Json => print_json(&summary),
        OutputFormat::Text => {
            print!("{}", summary.render_text());
            Ok(())
        }
    }
}

/// Arguments for the alternatives command.
#[derive(Debug, Clone, Args)]
pub struct AlternativesArgs {
    /// Departure waypoint id.
    #[arg(long)]
    pub from: String,
    /// Destination waypoint id.
    #[arg(long)]
    pub to: String,
    #[command(flatten)]
    pub planning: PlanningArgs,
}

#[derive(Debug, Serialize)]
struct AlternativesOutput {
    from: String,
    to: String,
    alternatives: Vec<RouteSummary>,
}

/// Handle the alternatives subcommand: one route per strategy profile.
pub fn handle_alternatives_command(
    network_path: Option<&Path>,
    defaults: &PlannerSettings,
    format: OutputFormat,
    args: &AlternativesArgs,
) -> Result<()> {
    args.planning.validate()?;
    let network = load_network(network_path)?;
    let mut request = defaults
        .request(args.from.clone(), args.to.clone())
        .with_params(args.planning.params(defaults));
    request.departure = args.planning.depart;

    let registry = ChokepointRegistry::standard();
    let alternatives: Vec<RouteSummary> = plan_alternatives(&network, &request)?
        .into_iter()
        .map(|alternative| {
            let blockages = registry.check_blockages(&alternative.route);
            RouteSummary::from_route(request.algorithm, &alternative.route, blockages)
                .with_strategy(alternative.strategy.label())
        })
        .collect();
    if alternatives.is_empty() {
        bail!("no route found from {} to {}", args.from, args.to);
    }

    match format {
        OutputFormat::Json => print_json(&AlternativesOutput {
            from: args.from.clone(),
            to: args.to.clone(),
            alternatives,
        }),
        OutputFormat::Text => {
            for (index, summary) in alternatives.iter().enumerate() {
                if index > 0 {
                    println!();
                }
                print!("{}", summary.render_text());
            }
            Ok(())
        }
    }
}
