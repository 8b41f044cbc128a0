//! The per-cycle status snapshot rendered to the panel.

use std::net::IpAddr;
use std::time::Duration;

use chrono::{DateTime, Local, NaiveDateTime, Utc};
use piaware_types::{EmergencySquawk, PiAwareStatus};

use super::aircraft::{AircraftSummary, Emergency, Sighting};

/// Everything a source gathered in one fetch.
#[derive(Debug, Clone, Default)]
pub struct StatusReport {
    pub status: PiAwareStatus,
    /// `None` when `aircraft.json` could not be fetched.
    pub aircraft: Option<AircraftSummary>,
    pub messages_per_second: Option<f64>,
    /// Flightradar24 link status, when that feeder is enabled.
    pub fr24: Option<String>,
}

/// Overall state shown in the header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FeedHealth {
    #[default]
    Ok,
    /// The receiver answered but left out some of its status fields.
    NeedsAttention,
    /// The receiver could not be reached.
    Unreachable,
}

impl FeedHealth {
    pub fn label(&self) -> &'static str {
        match self {
            FeedHealth::Ok => "OK",
            FeedHealth::NeedsAttention => "NEEDS ATTENTION",
            FeedHealth::Unreachable => "UNREACHABLE",
        }
    }
}

/// An immutable view of the receiver, built fresh every polling cycle.
#[derive(Debug, Clone, Default)]
pub struct StatusSnapshot {
    pub cycle: u64,
    pub health: FeedHealth,
    /// Receiver clock in local time.
    pub status_time: Option<NaiveDateTime>,
    pub piaware: Option<String>,
    pub gps: Option<String>,
    pub radio: Option<String>,
    pub uptime: Option<Duration>,
    pub cpu_load_percent: Option<f64>,
    pub cpu_temp_celsius: Option<f64>,
    pub aircraft: Option<AircraftSummary>,
    pub messages_per_second: Option<f64>,
    pub fr24: Option<String>,
    pub display_ip: Option<IpAddr>,
    /// Why the fetch failed, for [`FeedHealth::Unreachable`].
    pub fetch_error: Option<String>,
}

impl StatusSnapshot {
    /// Build the snapshot for `cycle` from a successful fetch.
    pub fn from_report(cycle: u64, report: StatusReport, display_ip: Option<IpAddr>) -> Self {
        let status = report.status;
        let status_time = status
            .time_ms()
            .and_then(DateTime::<Utc>::from_timestamp_millis)
            .map(|t| t.with_timezone(&Local).naive_local());
        let message = |component: &Option<piaware_types::Component>| {
            component.as_ref().map(|c| c.message.clone())
        };

        let mut snapshot = Self {
            cycle,
            health: FeedHealth::Ok,
            status_time,
            piaware: message(&status.piaware),
            gps: message(&status.gps),
            radio: message(&status.radio),
            uptime: status.uptime(),
            cpu_load_percent: status.cpu_load_percent,
            cpu_temp_celsius: status.cpu_temp_celcius,
            aircraft: report.aircraft,
            messages_per_second: report.messages_per_second,
            fr24: report.fr24,
            display_ip,
            fetch_error: None,
        };

        let incomplete = snapshot.status_time.is_none()
            || snapshot.uptime.is_none()
            || snapshot.piaware.is_none()
            || snapshot.gps.is_none()
            || snapshot.radio.is_none();
        if incomplete {
            snapshot.health = FeedHealth::NeedsAttention;
        }

        snapshot
    }

    /// Snapshot for a cycle where the receiver could not be reached.
    ///
    /// Nothing from earlier cycles is carried over.
    pub fn unavailable(cycle: u64, error: impl Into<String>, display_ip: Option<IpAddr>) -> Self {
        Self {
            cycle,
            health: FeedHealth::Unreachable,
            display_ip,
            fetch_error: Some(error.into()),
            ..Default::default()
        }
    }

    pub fn emergencies(&self) -> &[Emergency] {
        self.aircraft
            .as_ref()
            .map(|a| a.emergencies.as_slice())
            .unwrap_or_default()
    }

    pub fn sightings(&self) -> &[Sighting] {
        self.aircraft
            .as_ref()
            .map(|a| a.sightings.as_slice())
            .unwrap_or_default()
    }

    /// The active emergency code, `7x00` if several different codes are
    /// active at once.
    pub fn emergency_code(&self) -> Option<&'static str> {
        let mut codes = self.emergencies().iter().map(|e| e.squawk);
        let first: EmergencySquawk = codes.next()?;
        if codes.all(|code| code == first) {
            Some(first.code())
        } else {
            Some("7x00")
        }
    }
}
