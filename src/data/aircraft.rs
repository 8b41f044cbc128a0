//! Aircraft table summary: counts, range, emergencies and watchlist hits.

use piaware_types::{Aircraft, AircraftFeed, EmergencySquawk, Position};

use crate::config::Watchlist;

/// Min/max distance of aircraft with a recent position.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RangeKm {
    pub min: f64,
    pub max: f64,
}

/// An aircraft squawking an emergency code.
#[derive(Debug, Clone, PartialEq)]
pub struct Emergency {
    pub hex: String,
    pub callsign: Option<String>,
    pub squawk: EmergencySquawk,
    pub distance_km: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SightingKind {
    /// Matched by ICAO address.
    Icao,
    /// Matched by the broadcast callsign.
    Registration,
}

/// An aircraft on the watchlist.
#[derive(Debug, Clone, PartialEq)]
pub struct Sighting {
    pub kind: SightingKind,
    pub hex: String,
    pub callsign: Option<String>,
    pub squawk: Option<String>,
    pub distance_km: Option<f64>,
    pub remark: String,
}

/// Aggregates over one `aircraft.json` sample.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AircraftSummary {
    /// Aircraft heard within the age threshold.
    pub total: usize,
    /// Aircraft with a position updated within the age threshold.
    pub with_position: usize,
    /// Aircraft positioned by multilateration.
    pub mlat: usize,
    /// `None` without a receiver position or without positioned aircraft.
    pub range: Option<RangeKm>,
    pub emergencies: Vec<Emergency>,
    pub sightings: Vec<Sighting>,
}

impl AircraftSummary {
    /// Summarise `feed` as seen from `receiver`.
    ///
    /// `max_age` is in seconds. Emergencies are reported for every aircraft
    /// still in the table; watchlist hits need a recent position.
    pub fn from_feed(
        feed: &AircraftFeed,
        receiver: Option<Position>,
        max_age: f64,
        watchlist: &Watchlist,
    ) -> Self {
        let mut summary = AircraftSummary::default();
        let distance = |aircraft: &Aircraft| -> Option<f64> {
            Some(receiver?.distance_km(&aircraft.position()?))
        };

        for aircraft in &feed.aircraft {
            if aircraft.seen_within(max_age) {
                summary.total += 1;
            }
            if aircraft.has_mlat_position() {
                summary.mlat += 1;
            }

            if let Some(position) = aircraft.recent_position(max_age) {
                summary.with_position += 1;

                if let Some(km) = receiver.map(|r| r.distance_km(&position)) {
                    summary.range = Some(match summary.range {
                        Some(range) => RangeKm {
                            min: range.min.min(km),
                            max: range.max.max(km),
                        },
                        None => RangeKm { min: km, max: km },
                    });
                }

                summary
                    .sightings
                    .extend(watchlist_hits(aircraft, watchlist, distance(aircraft)));
            }

            if let Some(squawk) = aircraft.emergency() {
                summary.emergencies.push(Emergency {
                    hex: aircraft.hex.clone(),
                    callsign: aircraft.callsign().map(str::to_string),
                    squawk,
                    distance_km: distance(aircraft),
                });
            }
        }

        summary
    }
}

fn watchlist_hits(
    aircraft: &Aircraft,
    watchlist: &Watchlist,
    distance_km: Option<f64>,
) -> Vec<Sighting> {
    let mut hits = Vec::new();
    let sighting = |kind, remark: &str| Sighting {
        kind,
        hex: aircraft.hex.clone(),
        callsign: aircraft.callsign().map(str::to_string),
        squawk: aircraft.squawk.as_deref().map(|s| s.trim().to_string()),
        distance_km,
        remark: remark.to_string(),
    };

    if let Some(remark) = aircraft
        .callsign()
        .and_then(|callsign| watchlist.registration_remark(callsign))
    {
        hits.push(sighting(SightingKind::Registration, remark));
    }
    if let Some(remark) = watchlist.icao_remark(&aircraft.hex) {
        hits.push(sighting(SightingKind::Icao, remark));
    }

    hits
}
