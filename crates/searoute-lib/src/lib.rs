//! Searoute library entry points.
//!
//! This crate plans multi-criteria maritime routes over a pre-built
//! navigation network, supervises active voyages for deviation and hazards,
//! and forecasts port congestion. Front ends (the CLI) should only depend on
//! the items exported here instead of reimplementing behavior.
//!

#![deny(warnings)]

pub mod chokepoint;
pub mod clock;
pub mod config;
pub mod cost;
pub mod error;
pub mod forecast;
pub mod geo;
pub mod monitor;
pub mod network;
pub mod output;
pub mod path;
pub mod routing;

pub use chokepoint::{total_delay_hours, BlockageDescriptor, Chokepoint, ChokepointRegistry};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{PlannerSettings, Settings};
pub use cost::{edge_cost, heuristic, NoGoZone, OptimizationParams, SpeedProfile};
pub use error::{Error, Result};
pub use forecast::{CongestionForecast, CongestionForecaster, ForecastFactors, PortObservation};
pub use geo::Coordinates;
pub use monitor::{
    ActiveVoyage, MonitorConfig, PositionFix, ReroutingEvent, StormWarning, TriggerKind, Vessel,
    VoyageMonitor,
};
pub use network::{EdgeAttributes, Network, RiskLevel, Waypoint, WaypointId, WaypointKind};
pub use output::RouteSummary;
pub use path::{find_route, SearchOptions};
pub use routing::{
    build_route, plan_alternatives, plan_route, OptimizedRoute, RouteAlgorithm, RouteAlternative,
    RouteRequest, RouteSegment, RouteStrategy,
};
