//! Search strategies behind a common trait.
//!
//! Each algorithm is wrapped in its own planner struct so `plan_route` and
//! the voyage monitor can pick one without knowing how it searches.

use crate::cost::OptimizationParams;
use crate::network::{Network, WaypointId};
use crate::path::{find_route_a_star, find_route_dijkstra, SearchOptions};

use super::RouteAlgorithm;

/// Trait for route search strategies.
pub trait RoutePlanner: Send + Sync {
    /// The algorithm identifier for this planner.
    fn algorithm(&self) -> RouteAlgorithm;

    /// Returns `Some(path)` if a route is found, `None` otherwise.
    fn find_path(
        &self,
        network: &Network,
        start: &str,
        goal: &str,
        params: &OptimizationParams,
        options: &SearchOptions,
    ) -> Option<Vec<WaypointId>>;
}

/// Weighted A* planner.
///
/// Fast, but the heuristic overestimates on cheap legs so the result is
/// not guaranteed minimal.
#[derive(Debug, Clone, Copy, Default)]
pub struct AStarPlanner;

impl RoutePlanner for AStarPlanner {
    fn algorithm(&self) -> RouteAlgorithm {
        RouteAlgorithm::AStar
    }

    fn find_path(
        &self,
        network: &Network,
        start: &str,
        goal: &str,
        params: &OptimizationParams,
        options: &SearchOptions,
    ) -> Option<Vec<WaypointId>> {
        find_route_a_star(network, start, goal, params, options)
    }
}

/// Uniform-cost planner; exact minimum under the cost model.
#[derive(Debug, Clone, Copy, Default)]
pub struct DijkstraPlanner;

impl RoutePlanner for DijkstraPlanner {
    fn algorithm(&self) -> RouteAlgorithm {
        RouteAlgorithm::Dijkstra
    }

    fn find_path(
        &self,
        network: &Network,
        start: &str,
        goal: &str,
        params: &OptimizationParams,
        options: &SearchOptions,
    ) -> Option<Vec<WaypointId>> {
        find_route_dijkstra(network, start, goal, params, options)
    }
}

/// Select the planner for an algorithm.
pub fn select_planner(algorithm: RouteAlgorithm) -> Box<dyn RoutePlanner> {
    match algorithm {
        RouteAlgorithm::AStar => Box::new(AStarPlanner),
        RouteAlgorithm::Dijkstra => Box::new(DijkstraPlanner),
    }
}
