//! Injectable time source.

use chrono::{DateTime, TimeDelta, Utc};
use parking_lot::Mutex;

/// Source of "now" for components that stamp records.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    pub fn set(&self, instant: DateTime<Utc>) {
        *self.now.lock() = instant;
    }

    pub fn advance(&self, by: TimeDelta) {
        let mut now = self.now.lock();
        *now += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock()
    }
}

/// Convert fractional hours to a duration, rounded to the millisecond.
///
/// Non-finite or out-of-range inputs yield a zero duration.
pub fn duration_from_hours(hours: f64) -> TimeDelta {
    let millis = (hours * 3_600_000.0).round();
    if !millis.is_finite() || millis.abs() > i64::MAX as f64 {
        return TimeDelta::zero();
    }
    TimeDelta::try_milliseconds(millis as i64).unwrap_or_else(TimeDelta::zero)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manual_clock_advances_only_when_asked() {
        let start = "2025-05-01T00:00:00Z".parse().unwrap();
        let clock = ManualClock::new(start);
        assert_eq!(clock.now(), start);
        clock.advance(TimeDelta::hours(3));
        assert_eq!(clock.now(), start + TimeDelta::hours(3));
    }

    #[test]
    fn fractional_hours_convert_to_milliseconds() {
        assert_eq!(duration_from_hours(2.75), TimeDelta::minutes(165));
        assert_eq!(duration_from_hours(f64::NAN), TimeDelta::zero());
        assert_eq!(duration_from_hours(f64::INFINITY), TimeDelta::zero());
    }
}
