//! Critical passage registry and proximity-based blockage annotation.

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::geo::{Coordinates, KM_PER_NM};
use crate::routing::OptimizedRoute;

/// A canal or strait subject to blockage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chokepoint {
    pub name: String,
    pub center: Coordinates,
    pub radius_km: f64,
    pub typical_delay_hours: f64,
    pub reason: String,
}

impl Chokepoint {
    pub fn new(
        name: impl Into<String>,
        center: Coordinates,
        radius_km: f64,
        typical_delay_hours: f64,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            center,
            radius_km,
            typical_delay_hours,
            reason: reason.into(),
        }
    }

    /// Whether `point` lies strictly inside the chokepoint radius.
    pub fn covers(&self, point: &Coordinates) -> bool {
        let distance_km = point.distance_nm(&self.center) * KM_PER_NM;
        distance_km < self.radius_km
    }
}

/// Advisory annotation: a route leg ends near a registered chokepoint.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BlockageDescriptor {
    pub chokepoint: String,
    pub reason: String,
    pub estimated_delay_hours: f64,
    /// Waypoint whose proximity triggered the match.
    pub waypoint: String,
}

static STANDARD_CHOKEPOINTS: Lazy<Vec<Chokepoint>> = Lazy::new(|| {
    vec![
        Chokepoint::new(
            "suez",
            Coordinates::new(29.95, 32.58),
            50.0,
            12.0,
            "Suez Canal incidents",
        ),
        Chokepoint::new(
            "panama",
            Coordinates::new(9.27, -79.52),
            50.0,
            8.0,
            "Panama Canal incidents",
        ),
        Chokepoint::new(
            "strait_of_malacca",
            Coordinates::new(2.5, 101.5),
            100.0,
            6.0,
            "Strait of Malacca incidents",
        ),
    ]
});

/// Static registry of critical passages.
#[derive(Debug, Clone, Default)]
pub struct ChokepointRegistry {
    chokepoints: Vec<Chokepoint>,
}

impl ChokepointRegistry {
    pub fn new(chokepoints: Vec<Chokepoint>) -> Self {
        Self { chokepoints }
    }

    /// Suez, Panama, and the Strait of Malacca.
    pub fn standard() -> Self {
        Self::new(STANDARD_CHOKEPOINTS.clone())
    }

    pub fn register(&mut self, chokepoint: Chokepoint) {
        self.chokepoints.push(chokepoint);
    }

    pub fn chokepoints(&self) -> &[Chokepoint] {
        &self.chokepoints
    }

    /// Every (segment destination, chokepoint) pair within radius, in
    /// segment order then registry order. The route itself is not altered.
    pub fn check_blockages(&self, route: &OptimizedRoute) -> Vec<BlockageDescriptor> {
        let mut blockages = Vec::new();
        for segment in route.segments() {
            let position = segment.to.coordinates();
            for chokepoint in &self.chokepoints {
                if chokepoint.covers(&position) {
                    warn!(
                        chokepoint = %chokepoint.name,
                        waypoint = %segment.to.id,
                        delay_hours = chokepoint.typical_delay_hours,
                        "route passes a chokepoint"
                    );
                    blockages.push(BlockageDescriptor {
                        chokepoint: chokepoint.name.clone(),
                        reason: chokepoint.reason.clone(),
                        estimated_delay_hours: chokepoint.typical_delay_hours,
                        waypoint: segment.to.id.clone(),
                    });
                }
            }
        }
        blockages
    }
}

/// Sum of estimated delays across blockages.
pub fn total_delay_hours(blockages: &[BlockageDescriptor]) -> f64 {
    blockages.iter().map(|b| b.estimated_delay_hours).sum()
}
