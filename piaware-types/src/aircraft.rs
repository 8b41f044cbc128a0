//! `aircraft.json`: the live aircraft table from dump1090 / SkyAware.

use crate::{EmergencySquawk, Position};

/// The SkyAware `aircraft.json` document.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct AircraftFeed {
    /// Unix time (seconds, fractional) the document was written.
    pub now: f64,
    /// Total Mode S messages received since the decoder started.
    pub messages: u64,
    pub aircraft: Vec<Aircraft>,
}

impl AircraftFeed {
    pub fn builder() -> AircraftFeedBuilder {
        AircraftFeedBuilder::new()
    }
}

/// One entry of the aircraft table.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct Aircraft {
    /// 24-bit ICAO address as lowercase hex. A leading `~` marks a
    /// non-ICAO (TIS-B) address.
    pub hex: String,
    /// Callsign, space padded to 8 characters.
    pub flight: Option<String>,
    /// Mode A code as four octal digits.
    pub squawk: Option<String>,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    /// Seconds since any message was received from this aircraft.
    pub seen: Option<f64>,
    /// Seconds since the position was last updated.
    pub seen_pos: Option<f64>,
    /// Fields derived from multilateration rather than the aircraft itself.
    pub mlat: Vec<String>,
}

impl Aircraft {
    /// Callsign with transponder padding removed.
    pub fn callsign(&self) -> Option<&str> {
        self.flight
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }

    pub fn position(&self) -> Option<Position> {
        Some(Position::new(self.lat?, self.lon?))
    }

    /// Position if it was updated within `max_age` seconds.
    pub fn recent_position(&self, max_age: f64) -> Option<Position> {
        match self.seen_pos {
            Some(age) if age <= max_age => self.position(),
            _ => None,
        }
    }

    pub fn seen_within(&self, max_age: f64) -> bool {
        self.seen.is_some_and(|age| age <= max_age)
    }

    /// Whether the reported position came from multilateration.
    pub fn has_mlat_position(&self) -> bool {
        self.mlat.iter().any(|field| field == "lat")
    }

    pub fn emergency(&self) -> Option<EmergencySquawk> {
        self.squawk.as_deref().and_then(EmergencySquawk::from_code)
    }
}

/// Builder for constructing `AircraftFeed` instances.
#[derive(Debug, Default)]
pub struct AircraftFeedBuilder {
    now: f64,
    messages: u64,
    aircraft: Vec<Aircraft>,
}

impl AircraftFeedBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn now(mut self, now: f64) -> Self {
        self.now = now;
        self
    }

    pub fn messages(mut self, messages: u64) -> Self {
        self.messages = messages;
        self
    }

    /// Add an aircraft built using a closure.
    pub fn aircraft<F>(mut self, hex: impl Into<String>, f: F) -> Self
    where
        F: FnOnce(AircraftBuilder) -> AircraftBuilder,
    {
        self.aircraft.push(f(AircraftBuilder::new(hex)).build());
        self
    }

    pub fn build(self) -> AircraftFeed {
        AircraftFeed {
            now: self.now,
            messages: self.messages,
            aircraft: self.aircraft,
        }
    }
}

/// Builder for constructing `Aircraft` entries.
#[derive(Debug)]
pub struct AircraftBuilder {
    aircraft: Aircraft,
}

impl AircraftBuilder {
    pub fn new(hex: impl Into<String>) -> Self {
        Self {
            aircraft: Aircraft {
                hex: hex.into(),
                ..Default::default()
            },
        }
    }

    pub fn flight(mut self, flight: impl Into<String>) -> Self {
        self.aircraft.flight = Some(flight.into());
        self
    }

    pub fn squawk(mut self, squawk: impl Into<String>) -> Self {
        self.aircraft.squawk = Some(squawk.into());
        self
    }

    /// Set the position; also marks it as freshly updated.
    pub fn position(mut self, lat: f64, lon: f64) -> Self {
        self.aircraft.lat = Some(lat);
        self.aircraft.lon = Some(lon);
        self.aircraft.seen_pos.get_or_insert(0.0);
        self
    }

    pub fn seen(mut self, seconds: f64) -> Self {
        self.aircraft.seen = Some(seconds);
        self
    }

    pub fn seen_pos(mut self, seconds: f64) -> Self {
        self.aircraft.seen_pos = Some(seconds);
        self
    }

    /// Mark the position as multilaterated.
    pub fn mlat(mut self) -> Self {
        self.aircraft.mlat = vec!["lat".to_string(), "lon".to_string()];
        self
    }

    pub fn build(self) -> Aircraft {
        self.aircraft
    }
}
