//! Port congestion forecasting from historical observations.
//!
//! Three signals are combined: a moving average over the latest
//! observations, a same-calendar-month mean, and a per-vessel-type mean.
//! The combination rule is a heuristic, not a calibrated model.

use std::collections::{BTreeMap, HashMap};
use std::fmt::Write as _;
use std::fs;
use std::io::Read;
use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, Datelike, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::clock::{duration_from_hours, Clock, SystemClock};
use crate::error::Result;

/// Number of most recent observations averaged by [`CongestionForecaster::moving_average`].
pub const MOVING_AVERAGE_WINDOW: usize = 7;

/// Hours to process one queued vessel.
pub const HOURS_PER_QUEUED_VESSEL: f64 = 2.0;

/// Observation count at which confidence saturates.
pub const FULL_CONFIDENCE_OBSERVATIONS: f64 = 100.0;

/// One historical congestion record for a port.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortObservation {
    pub timestamp: DateTime<Utc>,
    pub queue_length: u32,
    pub wait_hours: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vessel_type: Option<String>,
}

/// Signals that went into a forecast.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ForecastFactors {
    pub moving_average: f64,
    pub seasonal_adjustment: f64,
    pub vessel_type_factor: f64,
}

/// Predicted congestion at a port for a given arrival.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CongestionForecast {
    pub port_id: String,
    pub port_name: String,
    pub generated_at: DateTime<Utc>,
    pub arrival: DateTime<Utc>,
    pub predicted_queue_length: u32,
    pub predicted_wait_hours: f64,
    /// Share of a full history backing the prediction, in `0.0..=1.0`.
    pub confidence_score: f64,
    pub factors: ForecastFactors,
}

/// Per-port history store and forecast cache.
pub struct CongestionForecaster {
    clock: Arc<dyn Clock>,
    history: RwLock<HashMap<String, Vec<PortObservation>>>,
    forecasts: RwLock<HashMap<String, CongestionForecast>>,
}

impl Default for CongestionForecaster {
    fn default() -> Self {
        Self::new(Arc::new(SystemClock))
    }
}

impl std::fmt::Debug for CongestionForecaster {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CongestionForecaster")
            .field("ports", &self.history.read().len())
            .field("cached_forecasts", &self.forecasts.read().len())
            .finish()
    }
}

impl CongestionForecaster {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            history: RwLock::new(HashMap::new()),
            forecasts: RwLock::new(HashMap::new()),
        }
    }

    /// Replace the stored history of `port_id`.
    pub fn register_history(
        &self,
        port_id: impl Into<String>,
        mut observations: Vec<PortObservation>,
    ) {
        let port_id = port_id.into();
        observations.sort_by_key(|observation| observation.timestamp);
        info!(port = %port_id, observations = observations.len(), "registered port history");
        self.history.write().insert(port_id, observations);
    }

    /// Register every port of a JSON history document
    /// (`{ "<port id>": [observation, ...] }`). Returns the number of ports.
    pub fn load_history<R: Read>(&self, reader: R) -> Result<usize> {
        let document: BTreeMap<String, Vec<PortObservation>> = serde_json::from_reader(reader)?;
        let ports = document.len();
        for (port_id, observations) in document {
            self.register_history(port_id, observations);
        }
        Ok(ports)
    }

    /// Load a JSON history document from disk.
    pub fn load_history_path(&self, path: &Path) -> Result<usize> {
        let file = fs::File::open(path)?;
        self.load_history(file)
    }

    /// Ports with registered history, sorted.
    pub fn ports(&self) -> Vec<String> {
        let mut ports: Vec<_> = self.history.read().keys().cloned().collect();
        ports.sort();
        ports
    }

    pub fn observation_count(&self, port_id: &str) -> usize {
        self.history.read().get(port_id).map_or(0, Vec::len)
    }

    /// Mean wait over the latest [`MOVING_AVERAGE_WINDOW`] observations, or
    /// `None` without history.
    pub fn moving_average(&self, port_id: &str) -> Option<f64> {
        moving_average(self.history.read().get(port_id)?)
    }

    /// Mean wait for the calendar month of `date`, falling back to the
    /// overall mean, then zero.
    pub fn seasonal_adjustment(&self, port_id: &str, date: DateTime<Utc>) -> f64 {
        self.history
            .read()
            .get(port_id)
            .map_or(0.0, |observations| seasonal_adjustment(observations, date))
    }

    /// Mean wait for `vessel_type`, falling back to the overall mean, then zero.
    pub fn vessel_type_adjustment(&self, port_id: &str, vessel_type: Option<&str>) -> f64 {
        self.history
            .read()
            .get(port_id)
            .map_or(0.0, |observations| vessel_type_adjustment(observations, vessel_type))
    }

    /// Forecast congestion at `port_id` for an arrival at `arrival` and
    /// cache the result for that port.
    ///
    /// With a non-zero moving average and a non-zero seasonal signal the
    /// prediction is the three-way mean with the vessel-type signal (zero
    /// when no type is given). Otherwise it is the moving average alone, or
    /// zero without history.
    pub fn forecast(
        &self,
        port_id: &str,
        arrival: DateTime<Utc>,
        vessel_type: Option<&str>,
    ) -> CongestionForecast {
        // One read guard so all signals come from the same history.
        let (observation_count, moving_average, seasonal, vessel_factor) = {
            let history = self.history.read();
            let observations = history.get(port_id).map_or(&[][..], Vec::as_slice);
            let vessel_factor = match vessel_type {
                Some(_) => vessel_type_adjustment(observations, vessel_type),
                None => 0.0,
            };
            (
                observations.len(),
                moving_average(observations),
                seasonal_adjustment(observations, arrival),
                vessel_factor,
            )
        };
        if observation_count == 0 {
            warn!(port = %port_id, "no congestion history for port");
        }

        let predicted_wait_hours = match moving_average {
            Some(average) if average != 0.0 && seasonal != 0.0 => {
                (average + seasonal + vessel_factor) / 3.0
            }
            other => other.unwrap_or(0.0),
        };
        let predicted_queue_length =
            ((predicted_wait_hours / HOURS_PER_QUEUED_VESSEL) as u32).max(1);
        let confidence_score = (observation_count as f64 / FULL_CONFIDENCE_OBSERVATIONS).min(1.0);

        let forecast = CongestionForecast {
            port_id: port_id.to_string(),
            port_name: port_id.to_uppercase(),
            generated_at: self.clock.now(),
            arrival,
            predicted_queue_length,
            predicted_wait_hours,
            confidence_score,
            factors: ForecastFactors {
                moving_average: moving_average.unwrap_or(0.0),
                seasonal_adjustment: seasonal,
                vessel_type_factor: vessel_factor,
            },
        };

        info!(
            port = %port_id,
            %arrival,
            wait_hours = predicted_wait_hours,
            queue = predicted_queue_length,
            "forecast port congestion"
        );
        self.forecasts
            .write()
            .insert(port_id.to_string(), forecast.clone());
        forecast
    }

    /// Last forecast computed for `port_id`.
    pub fn cached_forecast(&self, port_id: &str) -> Option<CongestionForecast> {
        self.forecasts.read().get(port_id).cloned()
    }

    /// Candidate with the lowest predicted wait at `arrival`; ties keep the
    /// earlier candidate.
    pub fn select_best_alternate_port(
        &self,
        primary: &str,
        candidates: &[String],
        arrival: DateTime<Utc>,
    ) -> Option<String> {
        let mut best: Option<(&String, f64)> = None;
        for candidate in candidates {
            let wait = self.forecast(candidate, arrival, None).predicted_wait_hours;
            if best.is_none_or(|(_, best_wait)| wait < best_wait) {
                best = Some((candidate, wait));
            }
        }

        let (port, wait) = best?;
        info!(primary, alternate = %port, wait_hours = wait, "selected alternate port");
        Some(port.clone())
    }

    /// `current_eta` plus the predicted wait at `port_id`.
    pub fn revise_eta(&self, current_eta: DateTime<Utc>, port_id: &str) -> DateTime<Utc> {
        let forecast = self.forecast(port_id, current_eta, None);
        let revised = current_eta + duration_from_hours(forecast.predicted_wait_hours);
        info!(
            port = %port_id,
            %current_eta,
            %revised,
            wait_hours = forecast.predicted_wait_hours,
            "revised ETA for port queue"
        );
        revised
    }

    /// Plain-text report of cached forecasts for `ports`. Ports without a
    /// cached forecast are skipped.
    pub fn congestion_report<S: AsRef<str>>(&self, ports: &[S]) -> String {
        let forecasts = self.forecasts.read();
        let mut report = String::from("=== PORT CONGESTION FORECAST ===\n\n");
        for port in ports {
            let Some(forecast) = forecasts.get(port.as_ref()) else {
                continue;
            };
            let _ = writeln!(report, "Port: {}", forecast.port_name);
            let _ = writeln!(
                report,
                "  Expected queue: {} vessels",
                forecast.predicted_queue_length
            );
            let _ = writeln!(
                report,
                "  Expected wait: {:.1} hours",
                forecast.predicted_wait_hours
            );
            let _ = writeln!(
                report,
                "  Confidence: {:.0}%\n",
                forecast.confidence_score * 100.0
            );
        }
        report
    }
}

fn moving_average(observations: &[PortObservation]) -> Option<f64> {
    let start = observations.len().saturating_sub(MOVING_AVERAGE_WINDOW);
    mean(observations[start..].iter().map(|o| o.wait_hours))
}

fn seasonal_adjustment(observations: &[PortObservation], date: DateTime<Utc>) -> f64 {
    let month = date.month();
    mean(
        observations
            .iter()
            .filter(|o| o.timestamp.month() == month)
            .map(|o| o.wait_hours),
    )
    .or_else(|| mean(observations.iter().map(|o| o.wait_hours)))
    .unwrap_or(0.0)
}

fn vessel_type_adjustment(observations: &[PortObservation], vessel_type: Option<&str>) -> f64 {
    vessel_type
        .and_then(|wanted| {
            mean(
                observations
                    .iter()
                    .filter(|o| o.vessel_type.as_deref() == Some(wanted))
                    .map(|o| o.wait_hours),
            )
        })
        .or_else(|| mean(observations.iter().map(|o| o.wait_hours)))
        .unwrap_or(0.0)
}

fn mean(values: impl Iterator<Item = f64>) -> Option<f64> {
    let (sum, count) = values.fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));
    (count > 0).then(|| sum / count as f64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;

    fn at(ts: &str) -> DateTime<Utc> {
        ts.parse().unwrap()
    }

    fn observation(ts: &str, wait_hours: f64, vessel_type: Option<&str>) -> PortObservation {
        PortObservation {
            timestamp: at(ts),
            queue_length: 3,
            wait_hours,
            vessel_type: vessel_type.map(str::to_string),
        }
    }

    fn forecaster() -> CongestionForecaster {
        CongestionForecaster::new(Arc::new(ManualClock::new(at("2025-06-01T00:00:00Z"))))
    }

    #[test]
    fn two_observations_average_to_one_queued_vessel() {
        let forecaster = forecaster();
        forecaster.register_history(
            "rotterdam",
            vec![
                observation("2025-06-10T00:00:00Z", 3.5, None),
                observation("2025-06-11T00:00:00Z", 2.0, None),
            ],
        );

        assert_eq!(forecaster.moving_average("rotterdam"), Some(2.75));

        // Seasonal 2.75, vessel factor 0: (2.75 + 2.75 + 0) / 3.
        let forecast = forecaster.forecast("rotterdam", at("2025-06-20T00:00:00Z"), None);
        assert!((forecast.predicted_wait_hours - 5.5 / 3.0).abs() < 1e-12);
        assert_eq!(forecast.predicted_queue_length, 1);
        assert_eq!(forecast.port_name, "ROTTERDAM");
        assert_eq!(forecast.confidence_score, 0.02);
        assert_eq!(forecast.factors.moving_average, 2.75);
    }

    #[test]
    fn moving_average_uses_latest_seven_by_timestamp() {
        let forecaster = forecaster();
        let mut history: Vec<_> = (1..=9)
            .map(|day| observation(&format!("2025-03-{day:02}T00:00:00Z"), day as f64, None))
            .collect();
        history.reverse();
        forecaster.register_history("p", history);

        // Days 3..=9.
        assert_eq!(forecaster.moving_average("p"), Some(6.0));
        assert_eq!(forecaster.moving_average("unknown"), None);
        forecaster.register_history("empty", Vec::new());
        assert_eq!(forecaster.moving_average("empty"), None);
    }

    #[test]
    fn seasonal_falls_back_to_overall_mean() {
        let forecaster = forecaster();
        forecaster.register_history(
            "p",
            vec![
                observation("2025-01-05T00:00:00Z", 10.0, None),
                observation("2025-01-20T00:00:00Z", 20.0, None),
                observation("2025-07-05T00:00:00Z", 30.0, None),
            ],
        );
        assert_eq!(forecaster.seasonal_adjustment("p", at("2026-01-01T00:00:00Z")), 15.0);
        assert_eq!(forecaster.seasonal_adjustment("p", at("2026-03-01T00:00:00Z")), 20.0);
        assert_eq!(forecaster.seasonal_adjustment("none", at("2026-03-01T00:00:00Z")), 0.0);
    }

    #[test]
    fn vessel_type_falls_back_to_overall_mean() {
        let forecaster = forecaster();
        forecaster.register_history(
            "p",
            vec![
                observation("2025-01-05T00:00:00Z", 4.0, Some("container")),
                observation("2025-01-06T00:00:00Z", 8.0, Some("tanker")),
            ],
        );
        assert_eq!(forecaster.vessel_type_adjustment("p", Some("tanker")), 8.0);
        assert_eq!(forecaster.vessel_type_adjustment("p", Some("bulk")), 6.0);
        assert_eq!(forecaster.vessel_type_adjustment("p", None), 6.0);
    }

    #[test]
    fn unknown_port_forecasts_zero_wait() {
        let forecast = forecaster().forecast("nowhere", at("2025-06-20T00:00:00Z"), Some("tanker"));
        assert_eq!(forecast.predicted_wait_hours, 0.0);
        assert_eq!(forecast.predicted_queue_length, 1);
        assert_eq!(forecast.confidence_score, 0.0);
    }

    #[test]
    fn confidence_is_monotone_and_capped() {
        let forecaster = forecaster();
        let mut previous = 0.0;
        for count in [0usize, 1, 10, 50, 100, 150] {
            let history = (0..count)
                .map(|_| observation("2025-01-01T00:00:00Z", 1.0, None))
                .collect();
            forecaster.register_history("p", history);
            let confidence = forecaster
                .forecast("p", at("2025-01-10T00:00:00Z"), None)
                .confidence_score;
            assert!(confidence >= previous);
            assert!(confidence <= 1.0);
            previous = confidence;
        }
        assert_eq!(previous, 1.0);
    }

    #[test]
    fn forecast_is_cached_per_port() {
        let forecaster = forecaster();
        assert!(forecaster.cached_forecast("p").is_none());
        forecaster.register_history("p", vec![observation("2025-01-01T00:00:00Z", 4.0, None)]);
        let first = forecaster.forecast("p", at("2025-01-10T00:00:00Z"), None);
        assert_eq!(forecaster.cached_forecast("p"), Some(first));

        let second = forecaster.forecast("p", at("2025-02-10T00:00:00Z"), None);
        assert_eq!(forecaster.cached_forecast("p").unwrap().arrival, second.arrival);
    }

    #[test]
    fn best_alternate_has_lowest_wait() {
        let forecaster = forecaster();
        forecaster.register_history("a", vec![observation("2025-01-01T00:00:00Z", 12.0, None)]);
        forecaster.register_history("b", vec![observation("2025-01-01T00:00:00Z", 4.0, None)]);
        forecaster.register_history("c", vec![observation("2025-01-01T00:00:00Z", 4.0, None)]);

        let candidates = vec!["a".to_string(), "b".to_string(), "c".to_string()];
        let arrival = at("2025-01-10T00:00:00Z");
        let best = forecaster.select_best_alternate_port("primary", &candidates, arrival);
        assert_eq!(best.as_deref(), Some("b"));
        assert!(forecaster
            .select_best_alternate_port("primary", &[], at("2025-01-10T00:00:00Z"))
            .is_none());
    }

    #[test]
    fn revised_eta_adds_predicted_wait() {
        let forecaster = forecaster();
        forecaster.register_history("p", vec![observation("2025-01-01T00:00:00Z", 6.0, None)]);
        let eta = at("2025-01-10T00:00:00Z");
        // Moving average 6, seasonal (January) 6, no vessel type: (6 + 6 + 0) / 3 = 4h.
        assert_eq!(forecaster.revise_eta(eta, "p"), at("2025-01-10T04:00:00Z"));
    }

    #[test]
    fn report_lists_cached_ports_only() {
        let forecaster = forecaster();
        forecaster.register_history("p", vec![observation("2025-01-01T00:00:00Z", 6.0, None)]);
        forecaster.forecast("p", at("2025-01-10T00:00:00Z"), None);

        let report = forecaster.congestion_report(&["p", "q"]);
        assert!(report.contains("Port: P"));
        assert!(report.contains("Expected wait: 4.0 hours"));
        assert!(report.contains("Confidence: 1%"));
        assert!(!report.contains("Port: Q"));
    }

    #[test]
    fn history_document_loads_every_port() {
        let forecaster = forecaster();
        let document = r#"{
            "NLRTM": [
                {"timestamp": "2025-01-02T00:00:00Z", "queue_length": 3, "wait_hours": 6.0},
                {"timestamp": "2025-01-01T00:00:00Z", "queue_length": 2, "wait_hours": 4.0,
                 "vessel_type": "tanker"}
            ],
            "DEHAM": []
        }"#;
        assert_eq!(forecaster.load_history(document.as_bytes()).unwrap(), 2);
        assert_eq!(forecaster.ports(), vec!["DEHAM".to_string(), "NLRTM".to_string()]);
        assert_eq!(forecaster.observation_count("NLRTM"), 2);
        assert_eq!(forecaster.moving_average("NLRTM"), Some(5.0));
        assert!(forecaster.load_history("[1, 2]".as_bytes()).is_err());
    }

    #[test]
    fn forecast_signals_come_from_one_history_snapshot() {
        let forecaster = forecaster();
        let history = |wait| {
            (1..=3)
                .map(|day| observation(&format!("2025-01-0{day}T00:00:00Z"), wait, Some("tanker")))
                .collect::<Vec<_>>()
        };
        forecaster.register_history("p", history(4.0));

        std::thread::scope(|scope| {
            scope.spawn(|| {
                for round in 0..500 {
                    let wait = if round % 2 == 0 { 10.0 } else { 4.0 };
                    forecaster.register_history("p", history(wait));
                }
            });
            for _ in 0..500 {
                let forecast = forecaster.forecast("p", at("2025-01-20T00:00:00Z"), Some("tanker"));
                let factors = forecast.factors;
                assert_eq!(factors.moving_average, factors.seasonal_adjustment);
                assert_eq!(factors.moving_average, factors.vessel_type_factor);
                assert!(
                    forecast.predicted_wait_hours == 4.0 || forecast.predicted_wait_hours == 10.0,
                    "mixed signals: {factors:?}"
                );
            }
        });
    }
}
