use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap, HashSet};

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use crate::clock::duration_from_hours;
use crate::cost::{edge_cost_breakdown, heuristic, OptimizationParams};
use crate::network::{Network, WaypointId};

/// Default cap on frontier pops before the search gives up.
pub const DEFAULT_MAX_ITERATIONS: usize = 10_000;

/// Tuning for a single search.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchOptions {
    /// Frontier pops allowed before reporting "not found".
    pub max_iterations: usize,
    /// Departure instant used to estimate arrival times at each node.
    pub departure: DateTime<Utc>,
}

impl SearchOptions {
    pub fn departing_at(departure: DateTime<Utc>) -> Self {
        Self {
            max_iterations: DEFAULT_MAX_ITERATIONS,
            departure,
        }
    }
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self::departing_at(Utc::now())
    }
}

/// Find the lowest-cost path between `start` and `goal` using weighted A*
/// with default search options.
pub fn find_route(
    network: &Network,
    start: &str,
    goal: &str,
    params: &OptimizationParams,
) -> Option<Vec<WaypointId>> {
    find_route_a_star(network, start, goal, params, &SearchOptions::default())
}

/// Weighted A* guided by [`heuristic`].
pub fn find_route_a_star(
    network: &Network,
    start: &str,
    goal: &str,
    params: &OptimizationParams,
    options: &SearchOptions,
) -> Option<Vec<WaypointId>> {
    let goal_waypoint = network.waypoint(goal);
    weighted_search(network, start, goal, params, options, |node| {
        match (network.waypoint(node), goal_waypoint) {
            (Some(from), Some(to)) => heuristic(from, to, params),
            _ => 0.0,
        }
    })
}

/// Same search with a zero heuristic, i.e. Dijkstra's algorithm. Returns
/// the exact minimum-cost path under the cost model.
pub fn find_route_dijkstra(
    network: &Network,
    start: &str,
    goal: &str,
    params: &OptimizationParams,
    options: &SearchOptions,
) -> Option<Vec<WaypointId>> {
    weighted_search(network, start, goal, params, options, |_| 0.0)
}

fn weighted_search<'a, H>(
    network: &'a Network,
    start: &str,
    goal: &str,
    params: &OptimizationParams,
    options: &SearchOptions,
    estimate: H,
) -> Option<Vec<WaypointId>>
where
    H: Fn(&str) -> f64,
{
    let (Some(start_wp), Some(goal_wp)) = (network.waypoint(start), network.waypoint(goal)) else {
        warn!(start, goal, "search endpoints are not part of the network");
        return None;
    };
    let start: &'a str = start_wp.id.as_str();
    let goal: &'a str = goal_wp.id.as_str();

    let mut frontier = BinaryHeap::new();
    let mut closed: HashSet<&'a str> = HashSet::new();
    let mut parents: HashMap<&'a str, &'a str> = HashMap::new();
    let mut g_score: HashMap<&'a str, f64> = HashMap::new();
    let mut sequence = 0u64;

    g_score.insert(start, 0.0);
    frontier.push(SearchNode::new(
        start,
        0.0,
        estimate(start),
        options.departure,
        sequence,
    ));

    let mut iterations = 0usize;
    while iterations < options.max_iterations {
        let Some(current) = frontier.pop() else {
            break;
        };
        iterations += 1;

        if !closed.insert(current.waypoint) {
            continue;
        }

        if current.waypoint == goal {
            let path = reconstruct_path(&parents, start, goal);
            debug!(
                start,
                goal,
                iterations,
                waypoints = path.len(),
                "route found"
            );
            return Some(path);
        }

        for edge in network.neighbours(current.waypoint) {
            let Some(target) = network.waypoint(&edge.target) else {
                continue;
            };
            let next: &'a str = target.id.as_str();
            if closed.contains(next) {
                continue;
            }

            let Some(cost) = edge_cost_breakdown(&edge.attributes, target, params, current.eta)
            else {
                continue;
            };

            let tentative_g = current.cost + cost.total;
            let improves = g_score
                .get(next)
                .is_none_or(|known| tentative_g < *known);
            if improves {
                parents.insert(next, current.waypoint);
                g_score.insert(next, tentative_g);
                sequence += 1;
                let eta = current.eta
                    + duration_from_hours(cost.metrics.time_hours + cost.risk_penalty_hours);
                frontier.push(SearchNode::new(
                    next,
                    tentative_g,
                    estimate(next),
                    eta,
                    sequence,
                ));
            }
        }
    }

    warn!(start, goal, iterations, "no route found");
    None
}

fn reconstruct_path<'a>(
    parents: &HashMap<&'a str, &'a str>,
    start: &'a str,
    goal: &'a str,
) -> Vec<WaypointId> {
    let mut path = vec![goal.to_string()];
    let mut current = goal;
    while current != start {
        match parents.get(current) {
            Some(&parent) => {
                path.push(parent.to_string());
                current = parent;
            }
            None => break,
        }
    }
    path.reverse();
    path
}

#[derive(Copy, Clone, Debug, Default)]
struct FloatOrd(f64);

impl PartialEq for FloatOrd {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for FloatOrd {}

impl PartialOrd for FloatOrd {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for FloatOrd {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

/// Frontier entry. Equal priorities are ordered by insertion sequence so
/// results are reproducible for a fixed network and parameter set.
#[derive(Clone, Debug)]
struct SearchNode<'a> {
    waypoint: &'a str,
    cost: f64,
    priority: FloatOrd,
    eta: DateTime<Utc>,
    sequence: u64,
}

impl<'a> SearchNode<'a> {
    fn new(
        waypoint: &'a str,
        cost: f64,
        heuristic: f64,
        eta: DateTime<Utc>,
        sequence: u64,
    ) -> Self {
        Self {
            waypoint,
            cost,
            priority: FloatOrd(cost + heuristic),
            eta,
            sequence,
        }
    }
}

impl PartialEq for SearchNode<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for SearchNode<'_> {}

impl Ord for SearchNode<'_> {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reverse ordering so BinaryHeap becomes a min-heap by priority.
        other
            .priority
            .cmp(&self.priority)
            .then_with(|| other.sequence.cmp(&self.sequence))
    }
}

impl PartialOrd for SearchNode<'_> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
