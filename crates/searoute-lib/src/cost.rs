//! Multi-criteria cost model.
//!
//! Edge cost: `w_time * (time + risk_penalty) + w_cost * fuel_usd + w_risk * risk`.
//! The heuristic uses the same weights over a straight-line estimate. It is
//! not strictly admissible, so the weighted A* is fast rather than exact;
//! [`crate::routing::DijkstraPlanner`] gives the exact minimum.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::geo::{polygon_contains, Coordinates};
use crate::network::{EdgeAttributes, EdgeMetrics, Network, RiskLevel, Waypoint};

/// Cruising speed assumed by the heuristic, in knots.
pub const ASSUMED_SPEED_KNOTS: f64 = 15.0;

/// Monetary proxy per nautical mile used by the heuristic, in USD.
pub const COST_PER_NM_USD: f64 = 20.0;

/// Constant risk term used by the heuristic.
pub const HEURISTIC_RISK_SCORE: f64 = 2.0;

/// Extra transit hours charged per point of segment risk.
pub const RISK_PENALTY_HOURS_PER_POINT: f64 = 2.0;

/// Default bunker price in USD per ton.
pub const DEFAULT_FUEL_PRICE_PER_TON: f64 = 500.0;

/// Speed profile requested by the operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SpeedProfile {
    Slow,
    #[default]
    Normal,
    Fast,
}

/// Polygon the route must not enter, as a lat/lon ring.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NoGoZone {
    #[serde(default)]
    pub name: Option<String>,
    pub ring: Vec<Coordinates>,
}

impl NoGoZone {
    pub fn contains(&self, point: &Coordinates) -> bool {
        polygon_contains(&self.ring, point)
    }
}

/// Per-request optimisation parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OptimizationParams {
    pub weight_time: f64,
    pub weight_cost: f64,
    pub weight_risk: f64,
    pub fuel_price_per_ton: f64,
    /// Vessel draught; edges with a known shallower depth are excluded.
    pub max_draft_m: Option<f64>,
    pub no_go_zones: Vec<NoGoZone>,
    /// Exclude edges whose weather risk is critical.
    pub weather_avoidance: bool,
    pub speed_profile: SpeedProfile,
}

impl Default for OptimizationParams {
    fn default() -> Self {
        Self {
            weight_time: 1.0,
            weight_cost: 1.0,
            weight_risk: 1.0,
            fuel_price_per_ton: DEFAULT_FUEL_PRICE_PER_TON,
            max_draft_m: None,
            no_go_zones: Vec::new(),
            weather_avoidance: true,
            speed_profile: SpeedProfile::Normal,
        }
    }
}

impl OptimizationParams {
    /// Parameters with the given weights and default everything else.
    pub fn with_weights(weight_time: f64, weight_cost: f64, weight_risk: f64) -> Self {
        Self {
            weight_time,
            weight_cost,
            weight_risk,
            ..Self::default()
        }
    }
}

/// Itemised cost of traversing one edge.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EdgeCost {
    pub metrics: EdgeMetrics,
    pub risk_penalty_hours: f64,
    pub fuel_cost_usd: f64,
    /// Weighted scalar used to rank paths.
    pub total: f64,
}

/// Straight-line estimate of the remaining cost from `from` to `to`.
pub fn heuristic(from: &Waypoint, to: &Waypoint, params: &OptimizationParams) -> f64 {
    let distance_nm = from.coordinates().distance_nm(&to.coordinates());
    let time_hours = distance_nm / ASSUMED_SPEED_KNOTS;
    let cost_usd = distance_nm * COST_PER_NM_USD;

    params.weight_time * time_hours
        + params.weight_cost * cost_usd
        + params.weight_risk * HEURISTIC_RISK_SCORE
}

/// Scalar cost of the edge `from -> to`; infinite when it is absent or unusable.
pub fn edge_cost(
    network: &Network,
    from: &str,
    to: &str,
    params: &OptimizationParams,
    at: DateTime<Utc>,
) -> f64 {
    network
        .edge(from, to)
        .and_then(|edge| {
            let target = network.waypoint(to)?;
            edge_cost_breakdown(&edge.attributes, target, params, at)
        })
        .map_or(f64::INFINITY, |cost| cost.total)
}

/// Itemised cost of an edge leading into `target`, or `None` when the edge
/// must not be traversed under `params` at time `at`.
pub fn edge_cost_breakdown(
    attributes: &EdgeAttributes,
    target: &Waypoint,
    params: &OptimizationParams,
    at: DateTime<Utc>,
) -> Option<EdgeCost> {
    if !is_traversable(attributes, target, params, at) {
        return None;
    }
    let metrics = attributes.metrics()?;

    let risk_penalty_hours = metrics.risk_score * RISK_PENALTY_HOURS_PER_POINT;
    let fuel_cost_usd = metrics.fuel_tons * params.fuel_price_per_ton;
    let total = params.weight_time * (metrics.time_hours + risk_penalty_hours)
        + params.weight_cost * fuel_cost_usd
        + params.weight_risk * metrics.risk_score;

    if !total.is_finite() {
        return None;
    }

    Some(EdgeCost {
        metrics,
        risk_penalty_hours,
        fuel_cost_usd,
        total,
    })
}

fn is_traversable(
    attributes: &EdgeAttributes,
    target: &Waypoint,
    params: &OptimizationParams,
    at: DateTime<Utc>,
) -> bool {
    if !attributes.navigable || attributes.is_blocked_at(at) {
        return false;
    }

    if params.weather_avoidance && attributes.weather_risk == RiskLevel::Critical {
        return false;
    }

    if let (Some(draft), Some(depth)) = (params.max_draft_m, attributes.min_depth_m) {
        if depth < draft {
            return false;
        }
    }

    let position = target.coordinates();
    !params.no_go_zones.iter().any(|zone| zone.contains(&position))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::WaypointKind;

    fn at() -> DateTime<Utc> {
        "2025-01-15T00:00:00Z".parse().unwrap()
    }

    fn network() -> Network {
        let mut network = Network::new();
        network
            .add_waypoint(Waypoint::new("A", "Alpha", 0.0, 0.0, WaypointKind::Port))
            .unwrap();
        network
            .add_waypoint(Waypoint::new("B", "Bravo", 0.0, 1.0, WaypointKind::Port))
            .unwrap();
        network
            .add_edge(
                "A",
                "B",
                EdgeAttributes::new(60.0, 4.0, 2.0)
                    .with_weather_risk(RiskLevel::High)
                    .with_piracy_risk(RiskLevel::Low),
            )
            .unwrap();
        network
    }

    #[test]
    fn edge_cost_combines_weighted_terms() {
        let params = OptimizationParams::default();
        // risk 2.0 -> penalty 4h; fuel 2t * 500 = 1000; total = (4+4) + 1000 + 2.
        assert_eq!(edge_cost(&network(), "A", "B", &params, at()), 1010.0);

        let time_only = OptimizationParams::with_weights(1.0, 0.0, 0.0);
        assert_eq!(edge_cost(&network(), "A", "B", &time_only, at()), 8.0);
    }

    #[test]
    fn missing_edge_is_infinite() {
        let params = OptimizationParams::default();
        assert!(edge_cost(&network(), "B", "A", &params, at()).is_infinite());
        assert!(edge_cost(&network(), "A", "Z", &params, at()).is_infinite());
    }

    #[test]
    fn heuristic_scales_with_weights() {
        let network = network();
        let a = network.waypoint("A").unwrap();
        let b = network.waypoint("B").unwrap();
        let distance = a.coordinates().distance_nm(&b.coordinates());

        let params = OptimizationParams::with_weights(1.0, 0.0, 0.0);
        assert_eq!(heuristic(a, b, &params), distance / ASSUMED_SPEED_KNOTS);

        let risk_only = OptimizationParams::with_weights(0.0, 0.0, 3.0);
        assert_eq!(heuristic(a, a, &risk_only), 6.0);
    }

    #[test]
    fn unusable_edges_are_excluded() {
        let target = Waypoint::new("B", "Bravo", 0.0, 1.0, WaypointKind::Port);
        let params = OptimizationParams::default();

        let mut closed = EdgeAttributes::new(1.0, 1.0, 1.0);
        closed.navigable = false;
        assert!(edge_cost_breakdown(&closed, &target, &params, at()).is_none());

        let stormy = EdgeAttributes::new(1.0, 1.0, 1.0).with_weather_risk(RiskLevel::Critical);
        assert!(edge_cost_breakdown(&stormy, &target, &params, at()).is_none());
        let brave = OptimizationParams {
            weather_avoidance: false,
            ..OptimizationParams::default()
        };
        assert!(edge_cost_breakdown(&stormy, &target, &brave, at()).is_some());

        let shallow = EdgeAttributes::new(1.0, 1.0, 1.0).with_min_depth(12.0);
        let deep_draft = OptimizationParams {
            max_draft_m: Some(14.5),
            ..OptimizationParams::default()
        };
        assert!(edge_cost_breakdown(&shallow, &target, &deep_draft, at()).is_none());
        assert!(edge_cost_breakdown(&shallow, &target, &params, at()).is_some());
    }

    #[test]
    fn no_go_zone_excludes_edges_into_it() {
        let target = Waypoint::new("B", "Bravo", 0.0, 1.0, WaypointKind::Port);
        let params = OptimizationParams {
            no_go_zones: vec![NoGoZone {
                name: Some("exercise area".to_string()),
                ring: vec![
                    Coordinates::new(-1.0, 0.5),
                    Coordinates::new(-1.0, 1.5),
                    Coordinates::new(1.0, 1.5),
                    Coordinates::new(1.0, 0.5),
                ],
            }],
            ..OptimizationParams::default()
        };
        let attributes = EdgeAttributes::new(1.0, 1.0, 1.0);
        assert!(edge_cost_breakdown(&attributes, &target, &params, at()).is_none());
    }
}
