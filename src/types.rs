use geo::Point;
use serde::{Deserialize, Serialize};

/// A hand-authored neighborhood: one closed ring, a percentage label and the
/// point its label is drawn at.
#[derive(Debug, Clone, PartialEq)]
pub struct Neighborhood {
    pub id: String,
    // [lon, lat] pairs, first == last
    pub ring: Vec<[f64; 2]>,
    pub label: String,
    pub centroid: Point<f64>,
}

impl Neighborhood {
    pub fn is_closed(&self) -> bool {
        match (self.ring.first(), self.ring.last()) {
            (Some(first), Some(last)) => first == last,
            _ => false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LngLat {
    pub lon: f64,
    pub lat: f64,
}

impl LngLat {
    pub fn new(lon: f64, lat: f64) -> Self {
        Self { lon, lat }
    }
}

impl From<[f64; 2]> for LngLat {
    fn from([lon, lat]: [f64; 2]) -> Self {
        Self { lon, lat }
    }
}

impl From<LngLat> for [f64; 2] {
    fn from(p: LngLat) -> Self {
        [p.lon, p.lat]
    }
}
