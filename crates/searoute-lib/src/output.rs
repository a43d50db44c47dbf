use std::fmt::Write;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::chokepoint::{total_delay_hours, BlockageDescriptor};
use crate::network::WaypointKind;
use crate::routing::{OptimizedRoute, RouteAlgorithm};

/// Waypoint as shown to consumers of a route summary.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SummaryWaypoint {
    pub index: usize,
    pub id: String,
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    pub kind: WaypointKind,
}

/// Aggregate metrics of a route.
#[derive(Debug, Clone, Copy, Serialize, PartialEq)]
pub struct RouteMetrics {
    pub distance_nm: f64,
    pub time_hours: f64,
    pub fuel_tons: f64,
    pub cost_usd: f64,
    pub risk_score: f64,
}

/// Structured representation of a planned route that front ends can serialise.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct RouteSummary {
    pub algorithm: RouteAlgorithm,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub strategy: Option<String>,
    pub hops: usize,
    pub waypoints: Vec<SummaryWaypoint>,
    pub metrics: RouteMetrics,
    pub blockages: Vec<BlockageDescriptor>,
    pub total_delay_hours: f64,
    pub generated_at: DateTime<Utc>,
}

impl RouteSummary {
    pub fn from_route(
        algorithm: RouteAlgorithm,
        route: &OptimizedRoute,
        blockages: Vec<BlockageDescriptor>,
    ) -> Self {
        let waypoints = route
            .waypoints()
            .iter()
            .enumerate()
            .map(|(index, wp)| SummaryWaypoint {
                index,
                id: wp.id.clone(),
                name: wp.name.clone(),
                latitude: wp.latitude,
                longitude: wp.longitude,
                kind: wp.kind,
            })
            .collect();

        Self {
            algorithm,
            strategy: None,
            hops: route.hop_count(),
            waypoints,
            metrics: RouteMetrics {
                distance_nm: route.total_distance_nm(),
                time_hours: route.estimated_time_hours(),
                fuel_tons: route.estimated_fuel_tons(),
                cost_usd: route.estimated_cost_usd(),
                risk_score: route.overall_risk_score(),
            },
            total_delay_hours: total_delay_hours(&blockages),
            blockages,
            generated_at: route.generated_at(),
        }
    }

    pub fn with_strategy(mut self, strategy: impl Into<String>) -> Self {
        self.strategy = Some(strategy.into());
        self
    }

    /// Plain-text rendering for terminals.
    pub fn render_text(&self) -> String {
        let mut buffer = String::new();
        let start = self.waypoints.first().map_or("<none>", |wp| wp.name.as_str());
        let goal = self.waypoints.last().map_or("<none>", |wp| wp.name.as_str());
        let _ = write!(
            buffer,
            "Route: {start} -> {goal} ({} hops, algorithm: {}",
            self.hops, self.algorithm
        );
        if let Some(strategy) = &self.strategy {
            let _ = write!(buffer, ", strategy: {strategy}");
        }
        let _ = writeln!(buffer, ")");

        for wp in &self.waypoints {
            let _ = writeln!(
                buffer,
                "{:>3}: {} ({}) [{:.4}, {:.4}]",
                wp.index, wp.name, wp.id, wp.latitude, wp.longitude
            );
        }

        let _ = writeln!(
            buffer,
            "Distance: {:.1} NM | Time: {:.1} h | Fuel: {:.1} t | Cost: {:.0} USD | Risk: {:.2}",
            self.metrics.distance_nm,
            self.metrics.time_hours,
            self.metrics.fuel_tons,
            self.metrics.cost_usd,
            self.metrics.risk_score
        );

        if !self.blockages.is_empty() {
            let _ = writeln!(
                buffer,
                "Chokepoints ({:.1} h potential delay):",
                self.total_delay_hours
            );
            for blockage in &self.blockages {
                let _ = writeln!(
                    buffer,
                    "  - {} near {}: {} (+{:.1} h)",
                    blockage.chokepoint,
                    blockage.waypoint,
                    blockage.reason,
                    blockage.estimated_delay_hours
                );
            }
        }
        buffer
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cost::OptimizationParams;
    use crate::network::{EdgeAttributes, Network, Waypoint};
    use crate::routing::build_route;

    fn route() -> OptimizedRoute {
        let mut network = Network::new();
        network
            .add_waypoint(Waypoint::new("NLRTM", "Rotterdam", 51.95, 4.14, WaypointKind::Port))
            .unwrap();
        network
            .add_waypoint(Waypoint::new("GBFXT", "Felixstowe", 51.96, 1.35, WaypointKind::Port))
            .unwrap();
        network
            .add_edge("NLRTM", "GBFXT", EdgeAttributes::new(105.0, 8.0, 12.0))
            .unwrap();
        build_route(
            &network,
            &["NLRTM".to_string(), "GBFXT".to_string()],
            &OptimizationParams::default(),
            "2025-01-15T00:00:00Z".parse().unwrap(),
        )
        .unwrap()
    }

    #[test]
    fn text_lists_waypoints_and_metrics() {
        let blockage = BlockageDescriptor {
            chokepoint: "dover".to_string(),
            reason: "traffic separation scheme".to_string(),
            estimated_delay_hours: 1.5,
            waypoint: "GBFXT".to_string(),
        };
        let summary = RouteSummary::from_route(RouteAlgorithm::AStar, &route(), vec![blockage])
            .with_strategy("balanced");
        let text = summary.render_text();

        assert!(text.starts_with(
            "Route: Rotterdam -> Felixstowe (1 hops, algorithm: a-star, strategy: balanced)"
        ));
        assert!(text.contains("  0: Rotterdam (NLRTM)"));
        assert!(text.contains("Distance: 105.0 NM | Time: 8.0 h | Fuel: 12.0 t | Cost: 6000 USD"));
        assert!(text.contains("dover near GBFXT"));
    }

    #[test]
    fn json_has_metrics_and_no_empty_strategy() {
        let summary = RouteSummary::from_route(RouteAlgorithm::Dijkstra, &route(), Vec::new());
        let value = serde_json::to_value(&summary).unwrap();
        assert_eq!(value["algorithm"], "dijkstra");
        assert_eq!(value["metrics"]["distance_nm"], 105.0);
        assert_eq!(value["waypoints"][1]["kind"], "port");
        assert!(value.get("strategy").is_none());
        assert_eq!(value["total_delay_hours"], 0.0);
    }
}
