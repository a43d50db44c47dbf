//! Process configuration read from environment variables.
//!
//! # Environment Variables
//!
//! - `SEAROUTE_MAX_ITERATIONS`: search iteration cap (default: 10000)
//! - `SEAROUTE_WEIGHT_TIME`, `SEAROUTE_WEIGHT_COST`, `SEAROUTE_WEIGHT_RISK`:
//!   default optimisation weights (default: 1.0)
//! - `SEAROUTE_FUEL_PRICE`: bunker price in USD per ton (default: 500)
//! - `SEAROUTE_MAX_DEVIATION_KM`: deviation threshold (default: 50)
//! - `SEAROUTE_CHECK_INTERVAL_SECS`: monitoring interval (default: 60)

use std::str::FromStr;
use std::time::Duration;

use crate::cost::{OptimizationParams, DEFAULT_FUEL_PRICE_PER_TON};
use crate::error::{Error, Result};
pub use crate::monitor::MonitorConfig;
use crate::path::DEFAULT_MAX_ITERATIONS;
use crate::routing::RouteRequest;

pub const ENV_MAX_ITERATIONS: &str = "SEAROUTE_MAX_ITERATIONS";
pub const ENV_WEIGHT_TIME: &str = "SEAROUTE_WEIGHT_TIME";
pub const ENV_WEIGHT_COST: &str = "SEAROUTE_WEIGHT_COST";
pub const ENV_WEIGHT_RISK: &str = "SEAROUTE_WEIGHT_RISK";
pub const ENV_FUEL_PRICE: &str = "SEAROUTE_FUEL_PRICE";
pub const ENV_MAX_DEVIATION_KM: &str = "SEAROUTE_MAX_DEVIATION_KM";
pub const ENV_CHECK_INTERVAL_SECS: &str = "SEAROUTE_CHECK_INTERVAL_SECS";

/// Planner defaults applied to requests that do not override them.
#[derive(Debug, Clone, PartialEq)]
pub struct PlannerSettings {
    pub max_iterations: usize,
    pub weight_time: f64,
    pub weight_cost: f64,
    pub weight_risk: f64,
    pub fuel_price_per_ton: f64,
}

impl Default for PlannerSettings {
    fn default() -> Self {
        Self {
            max_iterations: DEFAULT_MAX_ITERATIONS,
            weight_time: 1.0,
            weight_cost: 1.0,
            weight_risk: 1.0,
            fuel_price_per_ton: DEFAULT_FUEL_PRICE_PER_TON,
        }
    }
}

impl PlannerSettings {
    /// Optimisation parameters carrying these weights and fuel price.
    pub fn params(&self) -> OptimizationParams {
        OptimizationParams {
            fuel_price_per_ton: self.fuel_price_per_ton,
            ..OptimizationParams::with_weights(self.weight_time, self.weight_cost, self.weight_risk)
        }
    }

    /// A request between `start` and `goal` using these defaults.
    pub fn request(&self, start: impl Into<String>, goal: impl Into<String>) -> RouteRequest {
        let mut request = RouteRequest::new(start, goal).with_params(self.params());
        request.max_iterations = self.max_iterations;
        request
    }
}

/// Complete library configuration.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Settings {
    pub planner: PlannerSettings,
    pub monitor: MonitorConfig,
}

impl Settings {
    /// Read settings from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read settings through `lookup`; absent keys keep their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut settings = Self::default();
        let planner = &mut settings.planner;

        if let Some(value) = parse::<usize, _>(&lookup, ENV_MAX_ITERATIONS)? {
            if value == 0 {
                return Err(invalid(ENV_MAX_ITERATIONS, value));
            }
            planner.max_iterations = value;
        }
        for (key, slot) in [
            (ENV_WEIGHT_TIME, &mut planner.weight_time),
            (ENV_WEIGHT_COST, &mut planner.weight_cost),
            (ENV_WEIGHT_RISK, &mut planner.weight_risk),
        ] {
            if let Some(value) = non_negative(&lookup, key)? {
                *slot = value;
            }
        }
        if let Some(value) = non_negative(&lookup, ENV_FUEL_PRICE)? {
            planner.fuel_price_per_ton = value;
        }

        if let Some(value) = non_negative(&lookup, ENV_MAX_DEVIATION_KM)? {
            settings.monitor.max_deviation_km = value;
        }
        if let Some(value) = parse::<u64, _>(&lookup, ENV_CHECK_INTERVAL_SECS)? {
            if value == 0 {
                return Err(invalid(ENV_CHECK_INTERVAL_SECS, value));
            }
            settings.monitor.check_interval = Duration::from_secs(value);
        }

        Ok(settings)
    }
}

fn parse<T, F>(lookup: &F, key: &str) -> Result<Option<T>>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|_| invalid(key, raw)),
    }
}

fn non_negative<F>(lookup: &F, key: &str) -> Result<Option<f64>>
where
    F: Fn(&str) -> Option<String>,
{
    match parse::<f64, _>(lookup, key)? {
        Some(value) if !value.is_finite() || value < 0.0 => Err(invalid(key, value)),
        other => Ok(other),
    }
}

fn invalid(key: &str, value: impl ToString) -> Error {
    Error::InvalidConfig {
        key: key.to_string(),
        value: value.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_without_variables() {
        let settings = Settings::from_lookup(lookup(&[])).unwrap();
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.planner.max_iterations, 10_000);
        assert_eq!(settings.monitor.max_deviation_km, 50.0);
        assert_eq!(settings.monitor.check_interval, Duration::from_secs(60));
    }

    #[test]
    fn overrides_are_applied() {
        let settings = Settings::from_lookup(lookup(&[
            (ENV_MAX_ITERATIONS, "500"),
            (ENV_WEIGHT_RISK, "2.5"),
            (ENV_FUEL_PRICE, " 620 "),
            (ENV_CHECK_INTERVAL_SECS, "15"),
        ]))
        .unwrap();
        assert_eq!(settings.planner.max_iterations, 500);
        assert_eq!(settings.planner.weight_risk, 2.5);
        assert_eq!(settings.planner.fuel_price_per_ton, 620.0);
        assert_eq!(settings.monitor.check_interval, Duration::from_secs(15));

        let request = settings.planner.request("A", "B");
        assert_eq!(request.max_iterations, 500);
        assert_eq!(request.params.weight_risk, 2.5);
        assert_eq!(request.params.fuel_price_per_ton, 620.0);
    }

    #[test]
    fn invalid_values_are_rejected() {
        for (key, value) in [
            (ENV_MAX_ITERATIONS, "lots"),
            (ENV_MAX_ITERATIONS, "0"),
            (ENV_WEIGHT_TIME, "-1"),
            (ENV_FUEL_PRICE, "NaN"),
            (ENV_CHECK_INTERVAL_SECS, "0"),
        ] {
            let err = Settings::from_lookup(lookup(&[(key, value)])).unwrap_err();
            assert!(
                matches!(&err, Error::InvalidConfig { key: k, .. } if k == key),
                "{key}={value} gave {err}"
            );
        }
    }
}
