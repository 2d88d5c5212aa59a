//! Job DTOs

use serde::{Deserialize, Serialize};

use crate::domain::geo::GeoPoint;

/// Body of a check-in or check-out request
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CheckRequest {
    pub lat: f64,
    pub lng: f64,
}

impl From<GeoPoint> for CheckRequest {
    fn from(point: GeoPoint) -> Self {
        Self {
            lat: point.lat,
            lng: point.lng,
        }
    }
}
