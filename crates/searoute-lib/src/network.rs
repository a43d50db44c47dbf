//! Navigation graph handed to the planner.
//!
//! The network is built elsewhere and loaded read-only: waypoints keyed by
//! identifier plus a directed adjacency list whose edges carry historical
//! averages (distance, transit time, fuel burn, risk).

use std::collections::HashMap;
use std::fs;
use std::io::Read;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};
use crate::geo::Coordinates;

/// Identifier of a waypoint within the network.
pub type WaypointId = String;

/// Role a waypoint plays in the network.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum WaypointKind {
    Port,
    #[default]
    Waypoint,
    Chokepoint,
}

/// Ordered discrete risk scale shared by weather and piracy attributes.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    #[default]
    None,
    Low,
    Medium,
    High,
    Critical,
}

impl RiskLevel {
    /// Numeric score on the 0..=4 scale.
    pub fn score(self) -> f64 {
        match self {
            RiskLevel::None => 0.0,
            RiskLevel::Low => 1.0,
            RiskLevel::Medium => 2.0,
            RiskLevel::High => 3.0,
            RiskLevel::Critical => 4.0,
        }
    }
}

/// A named geographic point in the network.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Waypoint {
    pub id: WaypointId,
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default)]
    pub kind: WaypointKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub capacity: Option<u32>,
}

impl Waypoint {
    pub fn new(
        id: impl Into<WaypointId>,
        name: impl Into<String>,
        latitude: f64,
        longitude: f64,
        kind: WaypointKind,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            latitude,
            longitude,
            kind,
            capacity: None,
        }
    }

    pub fn coordinates(&self) -> Coordinates {
        Coordinates::new(self.latitude, self.longitude)
    }
}

/// Historical attributes of a directed edge.
///
/// Numeric attributes are optional so that incomplete records can still be
/// loaded; an edge missing any of them is never traversed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EdgeAttributes {
    #[serde(default)]
    pub distance_nm: Option<f64>,
    #[serde(default)]
    pub time_hours: Option<f64>,
    #[serde(default)]
    pub fuel_tons: Option<f64>,
    #[serde(default)]
    pub weather_risk: RiskLevel,
    #[serde(default)]
    pub piracy_risk: RiskLevel,
    #[serde(default = "default_navigable")]
    pub navigable: bool,
    #[serde(default)]
    pub blocked: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block_reason: Option<String>,
    /// End of a temporary blockage. `None` with `blocked` set means indefinite.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blocked_until: Option<DateTime<Utc>>,
    /// Shallowest charted depth along the edge, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_depth_m: Option<f64>,
}

fn default_navigable() -> bool {
    true
}

/// Complete numeric view of an edge, available only when every required
/// attribute is present and finite.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EdgeMetrics {
    pub distance_nm: f64,
    pub time_hours: f64,
    pub fuel_tons: f64,
    pub risk_score: f64,
}

impl EdgeAttributes {
    pub fn new(distance_nm: f64, time_hours: f64, fuel_tons: f64) -> Self {
        Self {
            distance_nm: Some(distance_nm),
            time_hours: Some(time_hours),
            fuel_tons: Some(fuel_tons),
            weather_risk: RiskLevel::None,
            piracy_risk: RiskLevel::None,
            navigable: true,
            blocked: false,
            block_reason: None,
            blocked_until: None,
            min_depth_m: None,
        }
    }

    pub fn with_weather_risk(mut self, level: RiskLevel) -> Self {
        self.weather_risk = level;
        self
    }

    pub fn with_piracy_risk(mut self, level: RiskLevel) -> Self {
        self.piracy_risk = level;
        self
    }

    pub fn with_min_depth(mut self, depth_m: f64) -> Self {
        self.min_depth_m = Some(depth_m);
        self
    }

    pub fn blocked(mut self, reason: impl Into<String>, until: Option<DateTime<Utc>>) -> Self {
        self.blocked = true;
        self.block_reason = Some(reason.into());
        self.blocked_until = until;
        self
    }

    /// Mean of weather and piracy risk on the 0..=4 scale.
    pub fn risk_score(&self) -> f64 {
        (self.weather_risk.score() + self.piracy_risk.score()) / 2.0
    }

    /// Required numeric attributes, or `None` when any is missing or non-finite.
    pub fn metrics(&self) -> Option<EdgeMetrics> {
        let distance_nm = self.distance_nm.filter(|v| v.is_finite())?;
        let time_hours = self.time_hours.filter(|v| v.is_finite())?;
        let fuel_tons = self.fuel_tons.filter(|v| v.is_finite())?;
        Some(EdgeMetrics {
            distance_nm,
            time_hours,
            fuel_tons,
            risk_score: self.risk_score(),
        })
    }

    /// Whether a blockage is in force at `at`.
    pub fn is_blocked_at(&self, at: DateTime<Utc>) -> bool {
        self.blocked && self.blocked_until.is_none_or(|until| at < until)
    }
}

/// Directed edge within the network.
#[derive(Debug, Clone, PartialEq)]
pub struct Edge {
    pub target: WaypointId,
    pub attributes: EdgeAttributes,
}

/// Pre-built directed navigation graph.
#[derive(Debug, Clone, Default)]
pub struct Network {
    waypoints: HashMap<WaypointId, Waypoint>,
    adjacency: HashMap<WaypointId, Vec<Edge>>,
}

impl Network {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a waypoint. Identifiers must be unique.
    pub fn add_waypoint(&mut self, waypoint: Waypoint) -> Result<()> {
        if self.waypoints.contains_key(&waypoint.id) {
            return Err(Error::DuplicateWaypoint { id: waypoint.id });
        }
        self.adjacency.entry(waypoint.id.clone()).or_default();
        self.waypoints.insert(waypoint.id.clone(), waypoint);
        Ok(())
    }

    /// Insert or replace the directed edge `from -> to`.
    pub fn add_edge(&mut self, from: &str, to: &str, attributes: EdgeAttributes) -> Result<()> {
        for endpoint in [from, to] {
            if !self.waypoints.contains_key(endpoint) {
                return Err(Error::DanglingEdge {
                    from: from.to_string(),
                    to: to.to_string(),
                    missing: endpoint.to_string(),
                });
            }
        }

        let edges = self.adjacency.entry(from.to_string()).or_default();
        match edges.iter_mut().find(|edge| edge.target == to) {
            Some(existing) => existing.attributes = attributes,
            None => edges.push(Edge {
                target: to.to_string(),
                attributes,
            }),
        }
        Ok(())
    }

    pub fn waypoint(&self, id: &str) -> Option<&Waypoint> {
        self.waypoints.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.waypoints.contains_key(id)
    }

    /// Outgoing edges of `id`, in insertion order.
    pub fn neighbours(&self, id: &str) -> &[Edge] {
        self.adjacency.get(id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn edge(&self, from: &str, to: &str) -> Option<&Edge> {
        self.neighbours(from).iter().find(|edge| edge.target == to)
    }

    pub fn waypoints(&self) -> impl Iterator<Item = &Waypoint> {
        self.waypoints.values()
    }

    pub fn waypoint_count(&self) -> usize {
        self.waypoints.len()
    }

    pub fn edge_count(&self) -> usize {
        self.adjacency.values().map(Vec::len).sum()
    }

    /// Waypoint closest to `position` by great-circle distance.
    ///
    /// Ties resolve to the lexicographically smallest identifier.
    pub fn nearest_waypoint(&self, position: &Coordinates) -> Option<&Waypoint> {
        self.waypoints
            .values()
            .map(|wp| (position.distance_km(&wp.coordinates()), wp))
            .min_by(|(da, a), (db, b)| da.total_cmp(db).then_with(|| a.id.cmp(&b.id)))
            .map(|(_, wp)| wp)
    }

    /// Load a network from a JSON file.
    pub fn from_path(path: &Path) -> Result<Self> {
        let file = fs::File::open(path)?;
        let network = Self::from_reader(file)?;
        debug!(
            path = %path.display(),
            waypoints = network.waypoint_count(),
            edges = network.edge_count(),
            "loaded navigation network"
        );
        Ok(network)
    }

    /// Load a network from a JSON reader.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let document: NetworkDocument = serde_json::from_reader(reader)?;
        Self::from_document(document)
    }

    /// Load a network from a JSON string.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let document: NetworkDocument = serde_json::from_str(json)?;
        Self::from_document(document)
    }

    fn from_document(document: NetworkDocument) -> Result<Self> {
        let mut network = Self::new();
        for waypoint in document.waypoints {
            network.add_waypoint(waypoint)?;
        }
        for record in document.edges {
            network.add_edge(&record.from, &record.to, record.attributes)?;
        }
        Ok(network)
    }
}

#[derive(Debug, Deserialize)]
struct NetworkDocument {
    waypoints: Vec<Waypoint>,
    #[serde(default)]
    edges: Vec<EdgeRecord>,
}

#[derive(Debug, Deserialize)]
struct EdgeRecord {
    from: WaypointId,
    to: WaypointId,
    #[serde(flatten)]
    attributes: EdgeAttributes,
}
