//! Great-circle distance helpers.
//!
//! Every distance in the crate goes through [`central_angle`] so route
//! metrics, blockage proximity, and deviation thresholds agree with each
//! other. Only the radius differs between nautical miles and kilometres.

use serde::{Deserialize, Serialize};

/// Spherical earth radius in nautical miles.
pub const EARTH_RADIUS_NM: f64 = 3440.065;

/// Spherical earth radius in kilometres.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Kilometres per nautical mile.
pub const KM_PER_NM: f64 = 1.852;

/// Latitude/longitude pair in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinates {
    pub const fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Great-circle distance to `other` in nautical miles.
    pub fn distance_nm(&self, other: &Self) -> f64 {
        central_angle(self, other) * EARTH_RADIUS_NM
    }

    /// Great-circle distance to `other` in kilometres.
    pub fn distance_km(&self, other: &Self) -> f64 {
        central_angle(self, other) * EARTH_RADIUS_KM
    }

    /// Both components are finite numbers.
    pub fn is_finite(&self) -> bool {
        self.latitude.is_finite() && self.longitude.is_finite()
    }
}

/// Haversine central angle (radians) between two coordinates.
pub fn central_angle(a: &Coordinates, b: &Coordinates) -> f64 {
    let lat1 = a.latitude.to_radians();
    let lat2 = b.latitude.to_radians();
    let dlat = lat2 - lat1;
    let dlon = (b.longitude - a.longitude).to_radians();

    let h = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
    2.0 * h.clamp(0.0, 1.0).sqrt().asin()
}

/// Ray-casting point-in-polygon test over a lat/lon ring.
///
/// The ring may be open or closed; fewer than three vertices never contain
/// anything.
pub fn polygon_contains(ring: &[Coordinates], point: &Coordinates) -> bool {
    if ring.len() < 3 {
        return false;
    }

    let mut inside = false;
    let mut j = ring.len() - 1;
    for i in 0..ring.len() {
        let (yi, xi) = (ring[i].latitude, ring[i].longitude);
        let (yj, xj) = (ring[j].latitude, ring[j].longitude);
        if (yi > point.latitude) != (yj > point.latitude)
            && point.longitude < (xj - xi) * (point.latitude - yi) / (yj - yi) + xi
        {
            inside = !inside;
        }
        j = i;
    }
    inside
}

#[cfg(test)]
mod tests {
    use super::*;

    const ROTTERDAM: Coordinates = Coordinates::new(51.95, 4.14);
    const SINGAPORE: Coordinates = Coordinates::new(1.26, 103.82);

    #[test]
    fn identical_points_are_zero_apart() {
        assert_eq!(ROTTERDAM.distance_nm(&ROTTERDAM), 0.0);
        assert_eq!(ROTTERDAM.distance_km(&ROTTERDAM), 0.0);
    }

    #[test]
    fn distance_is_symmetric() {
        assert_eq!(
            ROTTERDAM.distance_nm(&SINGAPORE),
            SINGAPORE.distance_nm(&ROTTERDAM)
        );
        assert_eq!(
            ROTTERDAM.distance_km(&SINGAPORE),
            SINGAPORE.distance_km(&ROTTERDAM)
        );
    }

    #[test]
    fn one_degree_of_latitude_is_sixty_nautical_miles() {
        let a = Coordinates::new(0.0, 0.0);
        let b = Coordinates::new(1.0, 0.0);
        assert!((a.distance_nm(&b) - 60.04).abs() < 0.05);
        assert!((a.distance_km(&b) - 111.19).abs() < 0.05);
    }

    #[test]
    fn polygon_contains_interior_point_only() {
        let square = [
            Coordinates::new(0.0, 0.0),
            Coordinates::new(0.0, 10.0),
            Coordinates::new(10.0, 10.0),
            Coordinates::new(10.0, 0.0),
        ];
        assert!(polygon_contains(&square, &Coordinates::new(5.0, 5.0)));
        assert!(!polygon_contains(&square, &Coordinates::new(15.0, 5.0)));
        assert!(!polygon_contains(&square[..2], &Coordinates::new(0.0, 5.0)));
    }
}
