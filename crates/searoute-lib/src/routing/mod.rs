//! Route planning and construction.
//!
//! This module provides:
//! - [`RouteAlgorithm`] - Supported search strategies (weighted A*, Dijkstra)
//! - [`RouteRequest`] - High-level planning request
//! - [`OptimizedRoute`] - Fully aggregated route produced from a path
//! - [`build_route`] - Turn a waypoint path into an [`OptimizedRoute`]
//! - [`plan_route`] - Validate, search, and build in one call
//! - [`plan_alternatives`] - Routes under several weight profiles
//!
//! # Example
//!
//! ```ignore
//! use searoute_lib::{plan_route, Network, RouteRequest};
//!
//! let network = Network::from_path("network.json".as_ref())?;
//! let request = RouteRequest::new("NLRTM", "SGSIN");
//! if let Some(route) = plan_route(&network, &request)? {
//!     println!("{:.0} NM", route.total_distance_nm());
//! }
//! ```

mod planner;

pub use planner::{select_planner, AStarPlanner, DijkstraPlanner, RoutePlanner};

use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;

use crate::clock::duration_from_hours;
use crate::cost::{edge_cost_breakdown, OptimizationParams};
use crate::error::{Error, Result};
use crate::network::{EdgeAttributes, Network, Waypoint};
use crate::path::{SearchOptions, DEFAULT_MAX_ITERATIONS};

/// Supported search strategies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum RouteAlgorithm {
    /// Weighted A* guided by the straight-line heuristic.
    #[default]
    #[serde(rename = "a-star")]
    AStar,
    /// Uniform-cost search (exact under the cost model).
    Dijkstra,
}

impl fmt::Display for RouteAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let value = match self {
            RouteAlgorithm::AStar => "a-star",
            RouteAlgorithm::Dijkstra => "dijkstra",
        };
        f.write_str(value)
    }
}

/// High-level route planning request.
#[derive(Debug, Clone)]
pub struct RouteRequest {
    pub start: String,
    pub goal: String,
    pub algorithm: RouteAlgorithm,
    pub params: OptimizationParams,
    pub max_iterations: usize,
    /// Departure instant; `None` means now.
    pub departure: Option<DateTime<Utc>>,
}

impl RouteRequest {
    /// Weighted A* request with default parameters.
    pub fn new(start: impl Into<String>, goal: impl Into<String>) -> Self {
        Self {
            start: start.into(),
            goal: goal.into(),
            algorithm: RouteAlgorithm::AStar,
            params: OptimizationParams::default(),
            max_iterations: DEFAULT_MAX_ITERATIONS,
            departure: None,
        }
    }

    pub fn with_params(mut self, params: OptimizationParams) -> Self {
        self.params = params;
        self
    }

    pub fn with_algorithm(mut self, algorithm: RouteAlgorithm) -> Self {
        self.algorithm = algorithm;
        self
    }

    fn search_options(&self) -> SearchOptions {
        SearchOptions {
            max_iterations: self.max_iterations,
            departure: self.departure.unwrap_or_else(Utc::now),
        }
    }
}

/// One leg of a route: two waypoints and the edge between them.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RouteSegment {
    pub from: Waypoint,
    pub to: Waypoint,
    pub attributes: EdgeAttributes,
    pub distance_nm: f64,
    pub time_hours: f64,
    pub fuel_tons: f64,
    pub cost_usd: f64,
    pub risk_score: f64,
    /// Weighted cost the search used for this leg.
    pub weighted_cost: f64,
}

/// Route built from a search result.
///
/// Aggregates are derived from the segment list at construction and cannot
/// be changed independently of it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OptimizedRoute {
    waypoints: Vec<Waypoint>,
    segments: Vec<RouteSegment>,
    total_distance_nm: f64,
    estimated_time_hours: f64,
    estimated_fuel_tons: f64,
    estimated_cost_usd: f64,
    overall_risk_score: f64,
    weighted_cost: f64,
    generated_at: DateTime<Utc>,
}

impl OptimizedRoute {
    fn from_segments(
        waypoints: Vec<Waypoint>,
        segments: Vec<RouteSegment>,
        generated_at: DateTime<Utc>,
    ) -> Self {
        let mut total_distance_nm = 0.0;
        let mut estimated_time_hours = 0.0;
        let mut estimated_fuel_tons = 0.0;
        let mut estimated_cost_usd = 0.0;
        let mut risk_sum = 0.0;
        let mut weighted_cost = 0.0;

        for segment in &segments {
            total_distance_nm += segment.distance_nm;
            estimated_time_hours += segment.time_hours;
            estimated_fuel_tons += segment.fuel_tons;
            estimated_cost_usd += segment.cost_usd;
            risk_sum += segment.risk_score;
            weighted_cost += segment.weighted_cost;
        }

        let overall_risk_score = risk_sum / segments.len().max(1) as f64;

        Self {
            waypoints,
            segments,
            total_distance_nm,
            estimated_time_hours,
            estimated_fuel_tons,
            estimated_cost_usd,
            overall_risk_score,
            weighted_cost,
            generated_at,
        }
    }

    pub fn waypoints(&self) -> &[Waypoint] {
        &self.waypoints
    }

    pub fn segments(&self) -> &[RouteSegment] {
        &self.segments
    }

    pub fn origin(&self) -> Option<&Waypoint> {
        self.waypoints.first()
    }

    pub fn destination(&self) -> Option<&Waypoint> {
        self.waypoints.last()
    }

    pub fn total_distance_nm(&self) -> f64 {
        self.total_distance_nm
    }

    pub fn estimated_time_hours(&self) -> f64 {
        self.estimated_time_hours
    }

    pub fn estimated_fuel_tons(&self) -> f64 {
        self.estimated_fuel_tons
    }

    pub fn estimated_cost_usd(&self) -> f64 {
        self.estimated_cost_usd
    }

    /// Mean segment risk on the 0..=4 scale.
    pub fn overall_risk_score(&self) -> f64 {
        self.overall_risk_score
    }

    /// Sum of the weighted edge costs that selected this route.
    pub fn weighted_cost(&self) -> f64 {
        self.weighted_cost
    }

    pub fn generated_at(&self) -> DateTime<Utc> {
        self.generated_at
    }

    /// Number of legs in the route.
    pub fn hop_count(&self) -> usize {
        self.segments.len()
    }

    pub fn waypoint_ids(&self) -> Vec<&str> {
        self.waypoints.iter().map(|wp| wp.id.as_str()).collect()
    }
}

/// Build an [`OptimizedRoute`] from an ordered waypoint path.
///
/// Each leg is costed by the same function the search uses, evaluated at
/// `departure` advanced leg by leg.
pub fn build_route(
    network: &Network,
    path: &[String],
    params: &OptimizationParams,
    departure: DateTime<Utc>,
) -> Result<OptimizedRoute> {
    if path.is_empty() {
        return Err(Error::EmptyPath);
    }

    let waypoints = path
        .iter()
        .map(|id| {
            network
                .waypoint(id)
                .cloned()
                .ok_or_else(|| Error::UnknownWaypoint { id: id.clone() })
        })
        .collect::<Result<Vec<_>>>()?;

    let mut segments = Vec::with_capacity(waypoints.len().saturating_sub(1));
    let mut clock = departure;
    for pair in waypoints.windows(2) {
        let (from, to) = (&pair[0], &pair[1]);
        let missing = || Error::MissingEdge {
            from: from.id.clone(),
            to: to.id.clone(),
        };
        let edge = network.edge(&from.id, &to.id).ok_or_else(missing)?;
        let cost = edge_cost_breakdown(&edge.attributes, to, params, clock).ok_or_else(missing)?;
        clock += duration_from_hours(cost.metrics.time_hours + cost.risk_penalty_hours);

        segments.push(RouteSegment {
            from: from.clone(),
            to: to.clone(),
            attributes: edge.attributes.clone(),
            distance_nm: cost.metrics.distance_nm,
            time_hours: cost.metrics.time_hours,
            fuel_tons: cost.metrics.fuel_tons,
            cost_usd: cost.fuel_cost_usd,
            risk_score: cost.metrics.risk_score,
            weighted_cost: cost.total,
        });
    }

    Ok(OptimizedRoute::from_segments(waypoints, segments, Utc::now()))
}

/// Resolve, search, and build a route for `request`.
///
/// Unknown identifiers are errors; an unreachable goal is `Ok(None)`.
pub fn plan_route(network: &Network, request: &RouteRequest) -> Result<Option<OptimizedRoute>> {
    for id in [&request.start, &request.goal] {
        if !network.contains(id) {
            return Err(Error::UnknownWaypoint { id: id.clone() });
        }
    }

    info!(
        start = %request.start,
        goal = %request.goal,
        algorithm = %request.algorithm,
        "planning route"
    );

    let options = request.search_options();
    let planner = select_planner(request.algorithm);
    let Some(path) = planner.find_path(
        network,
        &request.start,
        &request.goal,
        &request.params,
        &options,
    ) else {
        return Ok(None);
    };

    build_route(network, &path, &request.params, options.departure).map(Some)
}

/// Weight profile used when offering alternatives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RouteStrategy {
    Balanced,
    TimePriority,
    SafetyPriority,
}

impl RouteStrategy {
    pub const ALL: [RouteStrategy; 3] = [
        RouteStrategy::Balanced,
        RouteStrategy::TimePriority,
        RouteStrategy::SafetyPriority,
    ];

    /// `(time, cost, risk)` weights for this profile.
    pub fn weights(self) -> (f64, f64, f64) {
        match self {
            RouteStrategy::Balanced => (1.0, 1.0, 1.0),
            RouteStrategy::TimePriority => (2.0, 1.0, 1.0),
            RouteStrategy::SafetyPriority => (1.0, 1.0, 2.0),
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            RouteStrategy::Balanced => "balanced",
            RouteStrategy::TimePriority => "time priority",
            RouteStrategy::SafetyPriority => "safety priority",
        }
    }
}

/// A route planned under one [`RouteStrategy`].
#[derive(Debug, Clone, Serialize)]
pub struct RouteAlternative {
    pub strategy: RouteStrategy,
    pub route: OptimizedRoute,
}

/// Plan one route per [`RouteStrategy`]. Only the weights change; the
/// endpoints, algorithm, constraints, iteration cap and departure of `base`
/// are kept. Strategies with no route are omitted.
pub fn plan_alternatives(network: &Network, base: &RouteRequest) -> Result<Vec<RouteAlternative>> {
    let mut alternatives = Vec::with_capacity(RouteStrategy::ALL.len());
    for strategy in RouteStrategy::ALL {
        let (weight_time, weight_cost, weight_risk) = strategy.weights();
        let params = OptimizationParams {
            weight_time,
            weight_cost,
            weight_risk,
            ..base.params.clone()
        };
        let request = base.clone().with_params(params);
        if let Some(route) = plan_route(network, &request)? {
            alternatives.push(RouteAlternative { strategy, route });
        }
    }
    Ok(alternatives)
}
