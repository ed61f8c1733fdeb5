use crate::models::location::GeoPoint;

const EARTH_RADIUS_KM: f64 = 6_371.0;

pub fn haversine_km(a: &GeoPoint, b: &GeoPoint) -> f64 {
    let lat1 = a.lat.to_radians();
    let lat2 = b.lat.to_radians();
    let delta_lat = (b.lat - a.lat).to_radians();
    let delta_lng = (b.lng - a.lng).to_radians();

    let sin_lat = (delta_lat / 2.0).sin();
    let sin_lng = (delta_lng / 2.0).sin();

    let haversine = sin_lat * sin_lat + lat1.cos() * lat2.cos() * sin_lng * sin_lng;
    let central_angle = 2.0 * haversine.sqrt().asin();

    EARTH_RADIUS_KM * central_angle
}

/// A nearby synthetic point, used when the receiver address cannot be
/// geocoded and the destination must still be set.
pub fn offset_point(origin: &GeoPoint, delta_lat: f64, delta_lng: f64) -> GeoPoint {
    GeoPoint {
        lat: (origin.lat + delta_lat).clamp(-90.0, 90.0),
        lng: (origin.lng + delta_lng).clamp(-180.0, 180.0),
    }
}

#[cfg(test)]
mod tests {
    use super::{haversine_km, offset_point};
    use crate::models::location::GeoPoint;

    #[test]
    fn zero_distance_for_same_point() {
        let p = GeoPoint {
            lat: 3.1390,
            lng: 101.6869,
        };
        let distance = haversine_km(&p, &p);
        assert!(distance < 1e-9);
    }

    #[test]
    fn kl_to_penang_is_around_325_km() {
        let kuala_lumpur = GeoPoint {
            lat: 3.1390,
            lng: 101.6869,
        };
        let penang = GeoPoint {
            lat: 5.4141,
            lng: 100.3288,
        };
        let distance = haversine_km(&kuala_lumpur, &penang);
        assert!((distance - 325.0).abs() < 10.0);
    }

    #[test]
    fn offset_point_stays_in_range() {
        let near_pole = GeoPoint {
            lat: 89.99,
            lng: 179.99,
        };
        let shifted = offset_point(&near_pole, 0.045, 0.045);
        assert!(shifted.is_valid());
    }
}
