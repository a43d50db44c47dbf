mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{at, fixture_network, fixtures_dir};
use searoute_lib::{
    ChokepointRegistry, CongestionForecaster, Coordinates, ManualClock, MonitorConfig,
    OptimizationParams, RiskLevel, RouteRequest, StormWarning, TriggerKind, Vessel, VoyageMonitor,
};

fn monitor() -> (Arc<VoyageMonitor>, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::new(at("2025-03-01T00:00:00Z")));
    let monitor = VoyageMonitor::new(
        Arc::new(fixture_network()),
        MonitorConfig::default(),
        clock.clone(),
    );
    (Arc::new(monitor), clock)
}

fn planned(monitor_network: &searoute_lib::Network) -> searoute_lib::OptimizedRoute {
    let mut request = RouteRequest::new("NLRTM", "SGSIN");
    request.departure = Some(at("2025-03-01T00:00:00Z"));
    searoute_lib::plan_route(monitor_network, &request)
        .expect("valid ids")
        .expect("route exists")
}

fn load_history(forecaster: &CongestionForecaster) {
    forecaster
        .load_history_path(&fixtures_dir().join("port_history.json"))
        .expect("history fixture loads");
}

#[test]
fn replayed_positions_raise_one_deviation_and_reroute() {
    let (monitor, _) = monitor();
    let network = fixture_network();
    let vessel = Vessel::new("244660000", "Maas Trader").with_draught(14.2);
    monitor.register(vessel, planned(&network));

    let fixes = [
        (51.90, 3.80, "2025-03-01T00:00:00Z"),
        (51.02, 1.55, "2025-03-01T09:00:00Z"),
        (43.10, -9.60, "2025-03-03T02:00:00Z"),
        (40.00, -15.00, "2025-03-03T20:00:00Z"),
    ];
    let mut raised = Vec::new();
    for (lat, lon, ts) in fixes {
        monitor.update_position("244660000", lat, lon, at(ts));
        if let Some(event) = monitor.detect_deviation("244660000").expect("finite fix") {
            raised.push(event);
        }
    }

    assert_eq!(raised.len(), 1);
    let event = raised.pop().expect("one event");
    assert_eq!(event.trigger, TriggerKind::Deviation);
    assert!(event.deviation_km > 500.0);

    let recorded = monitor
        .reroute("244660000", event, &OptimizationParams::default())
        .expect("planning succeeds")
        .expect("vessel tracked");
    let new_route = recorded.new_route.expect("route back to the lane");
    assert_eq!(new_route.origin().map(|wp| wp.id.as_str()), Some("FINIS"));
    assert_eq!(new_route.destination().map(|wp| wp.id.as_str()), Some("SGSIN"));
    // FINIS onwards drops the 50h North Sea and Biscay legs.
    assert_eq!(recorded.eta_impact_hours, -50.0);

    let voyage = monitor.voyage("244660000").expect("tracked");
    assert_eq!(voyage.positions.len(), 4);
    assert_eq!(voyage.rerouting_history.len(), 1);
}

#[test]
fn storm_over_red_sea_affects_suez_route_only() {
    let (monitor, _) = monitor();
    let network = fixture_network();
    monitor.register(Vessel::new("1", "Eastbound"), planned(&network));

    let mut request = RouteRequest::new("GBFXT", "NLRTM");
    request.departure = Some(at("2025-03-01T00:00:00Z"));
    let short_hop = searoute_lib::plan_route(&network, &request)
        .expect("valid ids")
        .expect("route exists");
    monitor.register(Vessel::new("2", "Feeder"), short_hop);

    let storm = StormWarning::new(Coordinates::new(13.0, 43.0), 150.0, RiskLevel::Critical);
    assert!(monitor.detect_storm_impact("1", &storm).is_some());
    assert!(monitor.detect_storm_impact("2", &storm).is_none());

    // The exclusion zone keeps a re-plan out of Bab-el-Mandeb.
    let params = OptimizationParams {
        no_go_zones: vec![storm.exclusion_zone()],
        ..OptimizationParams::default()
    };
    let detour = searoute_lib::plan_route(
        &network,
        &RouteRequest::new("NLRTM", "SGSIN").with_params(params),
    )
    .expect("valid ids")
    .expect("cape route exists");
    assert!(!detour.waypoint_ids().contains(&"BABEL"));
    assert!(detour.waypoint_ids().contains(&"CAPE"));
}

#[test]
fn blockage_event_carries_standard_delays() {
    let (monitor, _) = monitor();
    let network = fixture_network();
    monitor.register(Vessel::new("1", "Eastbound"), planned(&network));

    let event = monitor
        .detect_blockage("1", &ChokepointRegistry::standard())
        .expect("suez and malacca on route");
    assert_eq!(event.trigger, TriggerKind::Blockage);
    assert_eq!(event.eta_impact_hours, 18.0);
}

#[test]
fn congested_singapore_diverts_to_tanjung_pelepas() {
    let (monitor, clock) = monitor();
    let network = fixture_network();
    let forecaster = CongestionForecaster::new(clock);
    load_history(&forecaster);

    let vessel = Vessel::new("1", "Eastbound").with_vessel_type("container");
    monitor.register(vessel, planned(&network));
    monitor.update_position("1", 2.6, 101.4, at("2025-03-10T00:00:00Z"));

    let revised = monitor
        .revised_eta("1", &forecaster)
        .expect("destination known");
    assert!(revised > at("2025-03-10T00:00:00Z") + chrono::TimeDelta::hours(544));

    let event = monitor
        .assess_congestion(
            "1",
            &forecaster,
            &["SGSIN".to_string(), "MYTPP".to_string()],
            12.0,
            &OptimizationParams::default(),
        )
        .expect("planning succeeds")
        .expect("diversion raised");
    assert_eq!(event.trigger, TriggerKind::Congestion);
    assert!(event.eta_impact_hours > 12.0);
    let diversion = event.new_route.expect("route to alternate");
    assert_eq!(diversion.waypoint_ids(), vec!["MALAC", "MYTPP"]);
    assert_eq!(
        monitor
            .voyage("1")
            .expect("tracked")
            .planned_route
            .destination()
            .map(|wp| wp.id.clone()),
        Some("MYTPP".to_string())
    );
}

#[tokio::test(start_paused = true)]
async fn background_loop_checks_every_voyage() {
    let (monitor, _) = monitor();
    let network = fixture_network();
    monitor.register(Vessel::new("1", "Adrift"), planned(&network));
    monitor.register(Vessel::new("2", "On track"), planned(&network));
    monitor.update_position("1", 60.0, -20.0, at("2025-03-01T06:00:00Z"));
    monitor.update_position("2", 51.95, 4.10, at("2025-03-01T06:00:00Z"));

    assert!(monitor.start_monitoring(Duration::from_secs(30)));
    for _ in 0..3 {
        tokio::time::advance(Duration::from_secs(30)).await;
        for _ in 0..8 {
            tokio::task::yield_now().await;
        }
    }
    monitor.stop_monitoring().await;
    assert!(!monitor.is_running());

    let adrift = monitor.voyage("1").expect("tracked");
    let on_track = monitor.voyage("2").expect("tracked");
    assert!(adrift.rerouting_history.len() >= 3);
    assert!(on_track.rerouting_history.is_empty());
    assert!(on_track.deviation_from_plan_km < 5.0);
}
