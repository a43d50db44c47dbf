#![allow(dead_code)]

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use searoute_lib::{EdgeAttributes, Network, Waypoint, WaypointKind};

pub fn fixtures_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../docs/fixtures")
}

pub fn fixture_network() -> Network {
    Network::from_path(&fixtures_dir().join("network.json")).expect("fixture network loads")
}

pub fn at(ts: &str) -> DateTime<Utc> {
    ts.parse().expect("valid RFC 3339 timestamp")
}

/// A -> B (100 NM), B -> C (150 NM), A -> C (300 NM) at 15 kn and 0.1 t/NM.
pub fn three_ports() -> Network {
    let mut network = Network::new();
    for (id, lon) in [("A", 0.0), ("B", 1.5), ("C", 4.0)] {
        network
            .add_waypoint(Waypoint::new(id, format!("Port {id}"), 10.0, lon, WaypointKind::Port))
            .expect("unique waypoint");
    }
    for (from, to, distance) in [("A", "B", 100.0), ("B", "C", 150.0), ("A", "C", 300.0)] {
        network
            .add_edge(from, to, EdgeAttributes::new(distance, distance / 15.0, distance * 0.1))
            .expect("known endpoints");
    }
    network
}
