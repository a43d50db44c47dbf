//! Active voyage supervision.
//!
//! [`VoyageMonitor`] keeps one [`ActiveVoyage`] per vessel, compares the
//! observed position stream against the planned route, and raises
//! [`ReroutingEvent`]s for deviation, storm, blockage, and congestion
//! triggers. A background task re-runs the deviation check on a fixed
//! interval until it is stopped.
//!
//! Distances in this module are kilometres.

use std::collections::HashMap;
use std::f64::consts::TAU;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

use crate::chokepoint::{total_delay_hours, ChokepointRegistry};
use crate::clock::{duration_from_hours, Clock};
use crate::cost::{NoGoZone, OptimizationParams};
use crate::error::{Error, Result};
use crate::forecast::CongestionForecaster;
use crate::geo::{Coordinates, EARTH_RADIUS_KM};
use crate::network::{Network, RiskLevel};
use crate::routing::{plan_route, OptimizedRoute, RouteRequest};

/// Default deviation threshold in kilometres.
pub const DEFAULT_MAX_DEVIATION_KM: f64 = 50.0;

/// Default interval between monitoring rounds.
pub const DEFAULT_CHECK_INTERVAL: Duration = Duration::from_secs(60);

/// Default storm radius in kilometres.
pub const DEFAULT_STORM_RADIUS_KM: f64 = 100.0;

const EXCLUSION_ZONE_VERTICES: usize = 8;

/// Identity and particulars of a monitored vessel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vessel {
    pub mmsi: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub imo: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vessel_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub draught_m: Option<f64>,
}

impl Vessel {
    pub fn new(mmsi: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            mmsi: mmsi.into(),
            name: name.into(),
            imo: None,
            vessel_type: None,
            draught_m: None,
        }
    }

    pub fn with_vessel_type(mut self, vessel_type: impl Into<String>) -> Self {
        self.vessel_type = Some(vessel_type.into());
        self
    }

    pub fn with_draught(mut self, draught_m: f64) -> Self {
        self.draught_m = Some(draught_m);
        self
    }
}

/// One observed position.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PositionFix {
    pub latitude: f64,
    pub longitude: f64,
    pub timestamp: DateTime<Utc>,
}

impl PositionFix {
    pub fn coordinates(&self) -> Coordinates {
        Coordinates::new(self.latitude, self.longitude)
    }
}

/// What caused a re-routing event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerKind {
    Deviation,
    Storm,
    Blockage,
    Congestion,
}

impl fmt::Display for TriggerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let value = match self {
            TriggerKind::Deviation => "deviation",
            TriggerKind::Storm => "storm",
            TriggerKind::Blockage => "blockage",
            TriggerKind::Congestion => "congestion",
        };
        f.write_str(value)
    }
}

/// Record that a voyage's plan needs reconsideration.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReroutingEvent {
    pub vessel_id: String,
    pub trigger: TriggerKind,
    pub trigger_location: Coordinates,
    pub old_route: Arc<OptimizedRoute>,
    pub new_route: Option<Arc<OptimizedRoute>>,
    pub timestamp: DateTime<Utc>,
    pub deviation_km: f64,
    pub eta_impact_hours: f64,
}

impl ReroutingEvent {
    fn new(
        vessel_id: &str,
        trigger: TriggerKind,
        trigger_location: Coordinates,
        old_route: Arc<OptimizedRoute>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            vessel_id: vessel_id.to_string(),
            trigger,
            trigger_location,
            old_route,
            new_route: None,
            timestamp,
            deviation_km: 0.0,
            eta_impact_hours: 0.0,
        }
    }
}

/// State of one monitored voyage.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActiveVoyage {
    pub vessel: Vessel,
    pub planned_route: Arc<OptimizedRoute>,
    /// Append-only log of observed positions.
    pub positions: Vec<PositionFix>,
    pub last_check: DateTime<Utc>,
    pub rerouting_history: Vec<ReroutingEvent>,
    pub deviation_from_plan_km: f64,
}

impl ActiveVoyage {
    pub fn last_position(&self) -> Option<&PositionFix> {
        self.positions.last()
    }

    /// Departure of the planned route: the first fix, or when the route was generated.
    pub fn planned_departure(&self) -> DateTime<Utc> {
        self.positions
            .first()
            .map_or_else(|| self.planned_route.generated_at(), |fix| fix.timestamp)
    }

    /// Planned departure plus the route's estimated transit time.
    pub fn planned_arrival(&self) -> DateTime<Utc> {
        self.planned_departure() + duration_from_hours(self.planned_route.estimated_time_hours())
    }

    /// Latest fix, or the route's departure waypoint before any fix arrives.
    fn reference_position(&self) -> Option<Coordinates> {
        self.last_position()
            .map(PositionFix::coordinates)
            .or_else(|| self.planned_route.origin().map(|wp| wp.coordinates()))
    }
}

/// Declared storm area.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StormWarning {
    pub center: Coordinates,
    #[serde(default = "default_storm_radius")]
    pub radius_km: f64,
    #[serde(default)]
    pub severity: RiskLevel,
}

fn default_storm_radius() -> f64 {
    DEFAULT_STORM_RADIUS_KM
}

impl StormWarning {
    pub fn new(center: Coordinates, radius_km: f64, severity: RiskLevel) -> Self {
        Self {
            center,
            radius_km,
            severity,
        }
    }

    /// Octagon circumscribing the storm circle, usable as a no-go zone when
    /// re-planning.
    pub fn exclusion_zone(&self) -> NoGoZone {
        // Circumradius so the octagon's edges stay outside the circle.
        let radius_km = self.radius_km / (TAU / (2.0 * EXCLUSION_ZONE_VERTICES as f64)).cos();
        let dlat = (radius_km / EARTH_RADIUS_KM).to_degrees();
        let dlon = dlat / self.center.latitude.to_radians().cos().abs().max(1e-6);

        let ring = (0..EXCLUSION_ZONE_VERTICES)
            .map(|i| {
                let bearing = TAU * i as f64 / EXCLUSION_ZONE_VERTICES as f64;
                Coordinates::new(
                    self.center.latitude + dlat * bearing.cos(),
                    self.center.longitude + dlon * bearing.sin(),
                )
            })
            .collect();

        NoGoZone {
            name: Some(format!("storm ({:?})", self.severity).to_lowercase()),
            ring,
        }
    }
}

/// Monitor tuning.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MonitorConfig {
    /// Distance from the nearest planned waypoint above which a deviation is raised.
    pub max_deviation_km: f64,
    pub check_interval: Duration,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            max_deviation_km: DEFAULT_MAX_DEVIATION_KM,
            check_interval: DEFAULT_CHECK_INTERVAL,
        }
    }
}

struct MonitorTask {
    shutdown: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

type VoyageEntry = Arc<Mutex<ActiveVoyage>>;

/// Tracks active voyages and raises re-routing events.
pub struct VoyageMonitor {
    network: Arc<Network>,
    config: MonitorConfig,
    clock: Arc<dyn Clock>,
    voyages: RwLock<HashMap<String, VoyageEntry>>,
    task: Mutex<Option<MonitorTask>>,
}

impl fmt::Debug for VoyageMonitor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VoyageMonitor")
            .field("config", &self.config)
            .field("voyages", &self.voyages.read().len())
            .field("running", &self.is_running())
            .finish()
    }
}

impl VoyageMonitor {
    pub fn new(network: Arc<Network>, config: MonitorConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            network,
            config,
            clock,
            voyages: RwLock::new(HashMap::new()),
            task: Mutex::new(None),
        }
    }

    pub fn config(&self) -> &MonitorConfig {
        &self.config
    }

    /// Start tracking `vessel` on `route`, replacing any existing record
    /// for the same MMSI.
    pub fn register(&self, vessel: Vessel, route: impl Into<Arc<OptimizedRoute>>) {
        let mmsi = vessel.mmsi.clone();
        let route = route.into();
        info!(
            vessel = %mmsi,
            name = %vessel.name,
            waypoints = route.waypoints().len(),
            "registered voyage"
        );
        let voyage = ActiveVoyage {
            vessel,
            planned_route: route,
            positions: Vec::new(),
            last_check: self.clock.now(),
            rerouting_history: Vec::new(),
            deviation_from_plan_km: 0.0,
        };
        self.voyages
            .write()
            .insert(mmsi, Arc::new(Mutex::new(voyage)));
    }

    /// Append a position fix. Unknown vessels are ignored.
    pub fn update_position(
        &self,
        vessel_id: &str,
        latitude: f64,
        longitude: f64,
        timestamp: DateTime<Utc>,
    ) {
        let Some(entry) = self.entry(vessel_id) else {
            warn!(vessel = %vessel_id, "position update for unknown vessel");
            return;
        };
        entry.lock().positions.push(PositionFix {
            latitude,
            longitude,
            timestamp,
        });
        debug!(vessel = %vessel_id, latitude, longitude, %timestamp, "position updated");
    }

    /// Compare the latest fix with the nearest planned waypoint.
    ///
    /// The stored deviation is refreshed on every call; an event is
    /// returned only when it exceeds the configured threshold.
    pub fn detect_deviation(&self, vessel_id: &str) -> Result<Option<ReroutingEvent>> {
        let Some(entry) = self.entry(vessel_id) else {
            warn!(vessel = %vessel_id, "deviation check for unknown vessel");
            return Ok(None);
        };
        let mut voyage = entry.lock();
        self.check_deviation(vessel_id, &mut voyage)
    }

    fn check_deviation(
        &self,
        vessel_id: &str,
        voyage: &mut ActiveVoyage,
    ) -> Result<Option<ReroutingEvent>> {
        let Some(fix) = voyage.last_position().copied() else {
            return Ok(None);
        };
        let position = fix.coordinates();
        if !position.is_finite() {
            return Err(Error::InvalidPosition {
                vessel: vessel_id.to_string(),
                latitude: fix.latitude,
                longitude: fix.longitude,
            });
        }

        if voyage.planned_route.waypoints().is_empty() {
            return Err(Error::EmptyPlannedRoute {
                vessel: vessel_id.to_string(),
            });
        }
        let mut nearest_km = f64::INFINITY;
        for waypoint in voyage.planned_route.waypoints() {
            let distance = position.distance_km(&waypoint.coordinates());
            if distance < nearest_km {
                nearest_km = distance;
            }
        }

        voyage.deviation_from_plan_km = nearest_km;
        if nearest_km <= self.config.max_deviation_km {
            return Ok(None);
        }

        warn!(
            vessel = %vessel_id,
            deviation_km = nearest_km,
            threshold_km = self.config.max_deviation_km,
            "vessel deviated from planned route"
        );
        let mut event = ReroutingEvent::new(
            vessel_id,
            TriggerKind::Deviation,
            position,
            Arc::clone(&voyage.planned_route),
            self.clock.now(),
        );
        event.deviation_km = nearest_km;
        Ok(Some(event))
    }

    /// First planned segment whose destination lies inside the storm.
    pub fn detect_storm_impact(
        &self,
        vessel_id: &str,
        storm: &StormWarning,
    ) -> Option<ReroutingEvent> {
        let Some(entry) = self.entry(vessel_id) else {
            warn!(vessel = %vessel_id, "storm check for unknown vessel");
            return None;
        };
        let voyage = entry.lock();

        let segment = voyage.planned_route.segments().iter().find(|segment| {
            segment.to.coordinates().distance_km(&storm.center) < storm.radius_km
        })?;

        warn!(
            vessel = %vessel_id,
            waypoint = %segment.to.id,
            severity = ?storm.severity,
            "storm affects planned passage"
        );
        let location = voyage.reference_position().unwrap_or(storm.center);
        Some(ReroutingEvent::new(
            vessel_id,
            TriggerKind::Storm,
            location,
            Arc::clone(&voyage.planned_route),
            self.clock.now(),
        ))
    }

    /// Blockage event when the planned route passes registered chokepoints.
    /// The ETA impact is the summed typical delay.
    pub fn detect_blockage(
        &self,
        vessel_id: &str,
        registry: &ChokepointRegistry,
    ) -> Option<ReroutingEvent> {
        let Some(entry) = self.entry(vessel_id) else {
            warn!(vessel = %vessel_id, "blockage check for unknown vessel");
            return None;
        };
        let voyage = entry.lock();

        let blockages = registry.check_blockages(&voyage.planned_route);
        let first = blockages.first()?;
        let location = voyage
            .planned_route
            .waypoints()
            .iter()
            .find(|wp| wp.id == first.waypoint)
            .map(|wp| wp.coordinates())
            .or_else(|| voyage.reference_position())?;

        let mut event = ReroutingEvent::new(
            vessel_id,
            TriggerKind::Blockage,
            location,
            Arc::clone(&voyage.planned_route),
            self.clock.now(),
        );
        event.eta_impact_hours = total_delay_hours(&blockages);
        Some(event)
    }

    /// Re-plan from the network waypoint nearest the vessel to the planned
    /// destination and record `event` in the voyage history.
    ///
    /// The new plan replaces the old one when a route is found; otherwise
    /// the event is recorded without a new route. Unknown vessels yield
    /// `Ok(None)`.
    pub fn reroute(
        &self,
        vessel_id: &str,
        mut event: ReroutingEvent,
        params: &OptimizationParams,
    ) -> Result<Option<ReroutingEvent>> {
        let Some(entry) = self.entry(vessel_id) else {
            warn!(vessel = %vessel_id, "reroute requested for unknown vessel");
            return Ok(None);
        };
        let mut voyage = entry.lock();

        let destination = voyage
            .planned_route
            .destination()
            .map(|wp| wp.id.clone())
            .ok_or_else(|| Error::EmptyPlannedRoute {
                vessel: vessel_id.to_string(),
            })?;
        let position = voyage
            .last_position()
            .map_or(event.trigger_location, PositionFix::coordinates);

        let new_route = self.plan_from(&voyage, &position, &destination, params)?;
        if let Some(route) = new_route {
            event.eta_impact_hours =
                route.estimated_time_hours() - voyage.planned_route.estimated_time_hours();
            info!(
                vessel = %vessel_id,
                trigger = %event.trigger,
                eta_impact_hours = event.eta_impact_hours,
                "installed new route"
            );
            voyage.planned_route = Arc::clone(&route);
            event.new_route = Some(route);
        } else {
            warn!(vessel = %vessel_id, trigger = %event.trigger, "no alternative route found");
        }

        voyage.rerouting_history.push(event.clone());
        Ok(Some(event))
    }

    /// Divert to a less congested alternate port when the predicted wait at
    /// the planned destination exceeds `max_wait_hours`.
    ///
    /// The ETA impact of the event is the predicted wait avoided at the
    /// primary port.
    pub fn assess_congestion(
        &self,
        vessel_id: &str,
        forecaster: &CongestionForecaster,
        alternates: &[String],
        max_wait_hours: f64,
        params: &OptimizationParams,
    ) -> Result<Option<ReroutingEvent>> {
        let Some(entry) = self.entry(vessel_id) else {
            warn!(vessel = %vessel_id, "congestion check for unknown vessel");
            return Ok(None);
        };
        let mut voyage = entry.lock();

        let Some(primary) = voyage.planned_route.destination().cloned() else {
            return Err(Error::EmptyPlannedRoute {
                vessel: vessel_id.to_string(),
            });
        };
        let arrival = voyage.planned_arrival();
        let primary_wait = forecaster
            .forecast(&primary.id, arrival, voyage.vessel.vessel_type.as_deref())
            .predicted_wait_hours;
        if primary_wait <= max_wait_hours {
            return Ok(None);
        }

        let candidates: Vec<String> = alternates
            .iter()
            .filter(|port| **port != primary.id)
            .cloned()
            .collect();
        let Some(best) = forecaster.select_best_alternate_port(&primary.id, &candidates, arrival)
        else {
            return Ok(None);
        };
        let best_wait = forecaster
            .cached_forecast(&best)
            .map_or(f64::INFINITY, |forecast| forecast.predicted_wait_hours);
        if best_wait >= primary_wait {
            debug!(vessel = %vessel_id, port = %primary.id, "no less congested alternate");
            return Ok(None);
        }
        if !self.network.contains(&best) {
            warn!(vessel = %vessel_id, port = %best, "alternate port is not in the network");
            return Ok(None);
        }

        let position = voyage
            .reference_position()
            .unwrap_or_else(|| primary.coordinates());
        let new_route = self.plan_from(&voyage, &position, &best, params)?;

        let mut event = ReroutingEvent::new(
            vessel_id,
            TriggerKind::Congestion,
            primary.coordinates(),
            Arc::clone(&voyage.planned_route),
            self.clock.now(),
        );
        event.eta_impact_hours = primary_wait;
        warn!(
            vessel = %vessel_id,
            primary = %primary.id,
            alternate = %best,
            primary_wait_hours = primary_wait,
            alternate_wait_hours = best_wait,
            "diverting to less congested port"
        );
        if let Some(route) = new_route {
            voyage.planned_route = Arc::clone(&route);
            event.new_route = Some(route);
        }

        voyage.rerouting_history.push(event.clone());
        Ok(Some(event))
    }

    fn plan_from(
        &self,
        voyage: &ActiveVoyage,
        position: &Coordinates,
        destination: &str,
        params: &OptimizationParams,
    ) -> Result<Option<Arc<OptimizedRoute>>> {
        let Some(start) = self.network.nearest_waypoint(position) else {
            return Ok(None);
        };

        let mut params = params.clone();
        if params.max_draft_m.is_none() {
            params.max_draft_m = voyage.vessel.draught_m;
        }
        let mut request = RouteRequest::new(start.id.clone(), destination).with_params(params);
        request.departure = Some(self.clock.now());

        Ok(plan_route(&self.network, &request)?.map(Arc::new))
    }

    /// Planned arrival revised by the predicted queue at the destination port.
    pub fn revised_eta(
        &self,
        vessel_id: &str,
        forecaster: &CongestionForecaster,
    ) -> Option<DateTime<Utc>> {
        let Some(entry) = self.entry(vessel_id) else {
            warn!(vessel = %vessel_id, "ETA requested for unknown vessel");
            return None;
        };
        let voyage = entry.lock();
        let destination = voyage.planned_route.destination()?;
        Some(forecaster.revise_eta(voyage.planned_arrival(), &destination.id))
    }

    /// Stop tracking a vessel. Returns whether it was tracked.
    pub fn stop_tracking(&self, vessel_id: &str) -> bool {
        let removed = self.voyages.write().remove(vessel_id).is_some();
        if removed {
            info!(vessel = %vessel_id, "stopped tracking voyage");
        }
        removed
    }

    /// Snapshot of a voyage.
    pub fn voyage(&self, vessel_id: &str) -> Option<ActiveVoyage> {
        self.entry(vessel_id).map(|entry| entry.lock().clone())
    }

    /// Tracked vessel identifiers, sorted.
    pub fn active_vessels(&self) -> Vec<String> {
        let mut ids: Vec<_> = self.voyages.read().keys().cloned().collect();
        ids.sort();
        ids
    }

    /// One monitoring pass: deviation check on every voyage, appending
    /// raised events to their history. A failing voyage is logged and
    /// skipped.
    pub fn run_check_round(&self) -> Vec<ReroutingEvent> {
        let mut entries: Vec<(String, VoyageEntry)> = self
            .voyages
            .read()
            .iter()
            .map(|(id, entry)| (id.clone(), Arc::clone(entry)))
            .collect();
        entries.sort_by(|a, b| a.0.cmp(&b.0));

        let now = self.clock.now();
        let mut raised = Vec::new();
        for (vessel_id, entry) in entries {
            let mut voyage = entry.lock();
            voyage.last_check = now;
            match self.check_deviation(&vessel_id, &mut voyage) {
                Ok(Some(event)) => {
                    info!(vessel = %vessel_id, trigger = %event.trigger, "re-routing event raised");
                    voyage.rerouting_history.push(event.clone());
                    raised.push(event);
                }
                Ok(None) => {}
                Err(err) => error!(vessel = %vessel_id, error = %err, "voyage check failed"),
            }
        }
        raised
    }

    /// Start the background monitoring task. Returns `false` when the
    /// interval is zero, the task is already running, or no Tokio runtime is
    /// available.
    pub fn start_monitoring(self: &Arc<Self>, interval: Duration) -> bool {
        if interval.is_zero() {
            warn!("monitoring interval must be non-zero");
            return false;
        }
        let mut task = self.task.lock();
        if task.as_ref().is_some_and(|t| !t.handle.is_finished()) {
            return false;
        }
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            warn!("monitoring requires a Tokio runtime");
            return false;
        };

        let (shutdown, mut stop) = watch::channel(false);
        let monitor = Arc::clone(self);
        let handle = runtime.spawn(async move {
            info!(interval_secs = interval.as_secs_f64(), "voyage monitoring started");
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    biased;
                    changed = stop.changed() => {
                        if changed.is_err() || *stop.borrow() {
                            break;
                        }
                    }
                    _ = ticker.tick() => {
                        let raised = monitor.run_check_round();
                        debug!(events = raised.len(), "monitoring round complete");
                    }
                }
            }
            info!("voyage monitoring stopped");
        });

        *task = Some(MonitorTask { shutdown, handle });
        true
    }

    /// Stop the background task and wait for it to exit. Calling this when
    /// monitoring is not running does nothing.
    pub async fn stop_monitoring(&self) {
        let Some(task) = self.task.lock().take() else {
            return;
        };
        let _ = task.shutdown.send(true);
        if let Err(err) = task.handle.await {
            error!(error = %err, "monitoring task ended abnormally");
        }
    }

    pub fn is_running(&self) -> bool {
        self.task
            .lock()
            .as_ref()
            .is_some_and(|task| !task.handle.is_finished())
    }

    fn entry(&self, vessel_id: &str) -> Option<VoyageEntry> {
        self.voyages.read().get(vessel_id).cloned()
    }
}
