//! Replay recorded position fixes through the voyage monitor.
//!
//! The monitor runs on a manual clock that is moved to each fix, so a
//! replay is deterministic and finishes immediately.

use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use clap::Args;
use serde::{Deserialize, Serialize};
use tracing::debug;

use searoute_lib::{
    plan_route, ChokepointRegistry, Coordinates, ManualClock, MonitorConfig, PlannerSettings,
    PositionFix, ReroutingEvent, TriggerKind, Vessel, VoyageMonitor,
};

use crate::commands::load_network;
use crate::output::{print_json, OutputFormat};

/// Recorded voyage: the vessel and its fixes in order.
#[derive(Debug, Clone, Deserialize)]
pub struct ReplayDocument {
    pub vessel: Vessel,
    pub positions: Vec<PositionFix>,
}

impl ReplayDocument {
    pub fn from_path(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read voyage from {}", path.display()))?;
        serde_json::from_str(&raw)
            .with_context(|| format!("failed to parse voyage from {}", path.display()))
    }
}

/// Arguments for the replay command.
#[derive(Debug, Clone, Args)]
pub struct ReplayArgs {
    /// Departure waypoint id of the planned route.
    #[arg(long)]
    pub from: String,
    /// Destination waypoint id of the planned route.
    #[arg(long)]
    pub to: String,
    /// JSON file with `vessel` and `positions`.
    #[arg(long)]
    pub voyage: PathBuf,
    /// Re-plan from the nearest waypoint whenever a deviation is raised.
    #[arg(long)]
    pub reroute: bool,
    /// Also report standard chokepoints on the planned route.
    #[arg(long)]
    pub chokepoints: bool,
}

/// Flattened view of a [`ReroutingEvent`] for output.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EventRecord {
    pub timestamp: DateTime<Utc>,
    pub vessel_id: String,
    pub trigger: TriggerKind,
    pub location: Coordinates,
    pub deviation_km: f64,
    pub eta_impact_hours: f64,
    /// Waypoint ids of the installed route, when one was found.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_route: Option<Vec<String>>,
}

impl From<&ReroutingEvent> for EventRecord {
    fn from(event: &ReroutingEvent) -> Self {
        Self {
            timestamp: event.timestamp,
            vessel_id: event.vessel_id.clone(),
            trigger: event.trigger,
            location: event.trigger_location,
            deviation_km: event.deviation_km,
            eta_impact_hours: event.eta_impact_hours,
            new_route: event.new_route.as_ref().map(|route| {
                route
                    .waypoint_ids()
                    .into_iter()
                    .map(str::to_string)
                    .collect()
            }),
        }
    }
}

impl EventRecord {
    fn render_text(&self) -> String {
        let mut line = format!(
            "{} {} {} at ({:.4}, {:.4}): {:.1} km off plan, ETA impact {:+.1} h",
            self.timestamp.to_rfc3339(),
            self.trigger,
            self.vessel_id,
            self.location.latitude,
            self.location.longitude,
            self.deviation_km,
            self.eta_impact_hours
        );
        if let Some(route) = &self.new_route {
            let _ = write!(line, " -> new route {}", route.join(" > "));
        }
        line
    }
}

#[derive(Debug, Serialize)]
struct ReplayOutput {
    vessel: Vessel,
    fixes: usize,
    events: Vec<EventRecord>,
}

/// Handle the replay subcommand.
pub fn handle_replay_command(
    network_path: Option<&Path>,
    planner: &PlannerSettings,
    monitor_config: &MonitorConfig,
    format: OutputFormat,
    args: &ReplayArgs,
) -> Result<()> {
    let document = ReplayDocument::from_path(&args.voyage)?;
    let events = replay(network_path, planner, monitor_config, args, &document)?;

    match format {
        OutputFormat::Json => print_json(&ReplayOutput {
            vessel: document.vessel,
            fixes: document.positions.len(),
            events,
        }),
        OutputFormat::Text => {
            println!(
                "Replayed {} fixes for {} ({}): {} events",
                document.positions.len(),
                document.vessel.name,
                document.vessel.mmsi,
                events.len()
            );
            for event in &events {
                println!("{}", event.render_text());
            }
            Ok(())
        }
    }
}

/// Feed every fix of `document` through a fresh monitor and collect the
/// events raised along the way.
pub fn replay(
    network_path: Option<&Path>,
    planner: &PlannerSettings,
    monitor_config: &MonitorConfig,
    args: &ReplayArgs,
    document: &ReplayDocument,
) -> Result<Vec<EventRecord>> {
    let Some(first) = document.positions.first() else {
        bail!("voyage {} has no position fixes", args.voyage.display());
    };
    let network = Arc::new(load_network(network_path)?);

    let mut params = planner.params();
    params.max_draft_m = document.vessel.draught_m;
    let mut request = planner
        .request(args.from.clone(), args.to.clone())
        .with_params(params.clone());
    request.departure = Some(first.timestamp);
    let Some(route) = plan_route(&network, &request)? else {
        bail!("no route found from {} to {}", args.from, args.to);
    };

    let clock = Arc::new(ManualClock::new(first.timestamp));
    let monitor = VoyageMonitor::new(Arc::clone(&network), *monitor_config, clock.clone());
    let vessel_id = document.vessel.mmsi.clone();
    monitor.register(document.vessel.clone(), route);

    let mut events = Vec::new();
    if args.chokepoints {
        if let Some(event) = monitor.detect_blockage(&vessel_id, &ChokepointRegistry::standard()) {
            events.push(EventRecord::from(&event));
        }
    }

    for fix in &document.positions {
        debug!(vessel = %vessel_id, timestamp = %fix.timestamp, "replaying fix");
        clock.set(fix.timestamp);
        monitor.update_position(&vessel_id, fix.latitude, fix.longitude, fix.timestamp);
        if args.reroute {
            if let Some(event) = monitor.detect_deviation(&vessel_id)? {
                if let Some(recorded) = monitor.reroute(&vessel_id, event, &params)? {
                    events.push(EventRecord::from(&recorded));
                }
            }
        } else {
            events.extend(monitor.run_check_round().iter().map(EventRecord::from));
        }
    }
    Ok(events)
}
