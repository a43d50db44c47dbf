//! Subcommand handlers. `main.rs` parses arguments and dispatches here.

pub mod forecast;
pub mod replay;
pub mod route;

use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use tracing::info;

use searoute_lib::{Clock, CongestionForecaster, Network};

/// Load the navigation network given by `--network` / `SEAROUTE_NETWORK`.
pub fn load_network(path: Option<&Path>) -> Result<Network> {
    let Some(path) = path else {
        bail!("no navigation network given: pass --network or set SEAROUTE_NETWORK");
    };
    let network = Network::from_path(path)
        .with_context(|| format!("failed to load network from {}", path.display()))?;
    info!(
        path = %path.display(),
        waypoints = network.waypoint_count(),
        edges = network.edge_count(),
        "loaded navigation network"
    );
    Ok(network)
}

/// Build a forecaster seeded from `--history` / `SEAROUTE_HISTORY`.
pub fn load_forecaster(path: Option<&Path>, clock: Arc<dyn Clock>) -> Result<CongestionForecaster> {
    let Some(path) = path else {
        bail!("no port history given: pass --history or set SEAROUTE_HISTORY");
    };
    let forecaster = CongestionForecaster::new(clock);
    let ports = forecaster
        .load_history_path(path)
        .with_context(|| format!("failed to load port history from {}", path.display()))?;
    info!(path = %path.display(), ports, "loaded port history");
    Ok(forecaster)
}
