//! Geographic positions and great-circle distance.

/// Mean earth radius in metres.
const EARTH_RADIUS_M: f64 = 6371e3;

/// A WGS84 latitude/longitude pair in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Position {
    pub latitude: f64,
    pub longitude: f64,
}

impl Position {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Haversine distance to `other` in metres.
    pub fn distance_m(&self, other: &Position) -> f64 {
        let phi1 = self.latitude.to_radians();
        let phi2 = other.latitude.to_radians();
        let d_phi = (other.latitude - self.latitude).to_radians();
        let d_lambda = (other.longitude - self.longitude).to_radians();

        let a = (d_phi / 2.0).sin().powi(2)
            + phi1.cos() * phi2.cos() * (d_lambda / 2.0).sin().powi(2);
        let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

        EARTH_RADIUS_M * c
    }

    /// Haversine distance to `other` in kilometres.
    pub fn distance_km(&self, other: &Position) -> f64 {
        self.distance_m(other) / 1000.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_distance_to_self_is_zero() {
        let p = Position::new(52.52, 13.405);
        assert!(p.distance_m(&p).abs() < 1e-6);
    }

    #[test]
    fn test_distance_berlin_hamburg() {
        let berlin = Position::new(52.5200, 13.4050);
        let hamburg = Position::new(53.5511, 9.9937);
        let km = berlin.distance_km(&hamburg);
        assert!((km - 255.0).abs() < 3.0, "got {km}");
    }

    #[test]
    fn test_distance_is_symmetric() {
        let a = Position::new(48.1, 11.6);
        let b = Position::new(50.0, 8.6);
        assert!((a.distance_m(&b) - b.distance_m(&a)).abs() < 1e-6);
    }
}
