//! `receiver.json`: static receiver metadata.

use crate::Position;

/// The SkyAware `receiver.json` document.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct Receiver {
    pub version: Option<String>,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
}

impl Receiver {
    /// Receiver location, if the site has one configured.
    pub fn position(&self) -> Option<Position> {
        Some(Position::new(self.lat?, self.lon?))
    }
}

#[cfg(all(test, feature = "serde"))]
mod tests {
    use super::*;

    #[test]
    fn test_position_requires_both_coordinates() {
        let receiver: Receiver =
            serde_json::from_str(r#"{"version": "9.0", "refresh": 1000, "lat": 52.1}"#).unwrap();
        assert_eq!(receiver.position(), None);

        let receiver: Receiver =
            serde_json::from_str(r#"{"lat": 52.1, "lon": 13.2, "history": 120}"#).unwrap();
        assert_eq!(receiver.position(), Some(Position::new(52.1, 13.2)));
    }
}
