use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

impl GeoPoint {
    /// Both coordinates finite and within WGS84 range.
    pub fn is_valid(&self) -> bool {
        self.lat.is_finite()
            && self.lng.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.lng)
    }
}

/// A raw position report from the assignment store. Coordinates are untrusted
/// until the tracker has validated them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CourierPosition {
    pub lat: f64,
    pub lng: f64,
    pub location_description: Option<String>,
    pub recorded_at: DateTime<Utc>,
    pub accuracy_m: Option<f64>,
}

impl CourierPosition {
    pub fn point(&self) -> GeoPoint {
        GeoPoint {
            lat: self.lat,
            lng: self.lng,
        }
    }
}

/// A validated position, as emitted to tracker subscribers.
#[derive(Debug, Clone, Serialize)]
pub struct LocationUpdate {
    pub tracking_id: String,
    pub point: GeoPoint,
    pub location_description: Option<String>,
    pub recorded_at: DateTime<Utc>,
}

/// View state for the map layer. Replaced wholesale on every accepted
/// location update or route resolution; owned by the active session only.
#[derive(Debug, Clone, Serialize)]
pub struct MapCoordinates {
    pub current: GeoPoint,
    pub destination: GeoPoint,
    pub current_description: Option<String>,
    pub route_distance_km: Option<f64>,
}

#[cfg(test)]
mod tests {
    use super::GeoPoint;

    #[test]
    fn in_range_coordinates_are_valid() {
        assert!(
            GeoPoint {
                lat: 3.1390,
                lng: 101.6869
            }
            .is_valid()
        );
        assert!(GeoPoint { lat: -90.0, lng: 180.0 }.is_valid());
    }

    #[test]
    fn out_of_range_latitude_is_invalid() {
        assert!(
            !GeoPoint {
                lat: 95.0,
                lng: 101.6
            }
            .is_valid()
        );
    }

    #[test]
    fn non_finite_coordinates_are_invalid() {
        assert!(
            !GeoPoint {
                lat: f64::NAN,
                lng: 10.0
            }
            .is_valid()
        );
        assert!(
            !GeoPoint {
                lat: 10.0,
                lng: f64::INFINITY
            }
            .is_valid()
        );
    }
}
