//! `status.json`: receiver OS and component health.

use std::time::Duration;

/// Health of a single PiAware component (piaware, gps, radio, mlat).
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct Component {
    /// Traffic light colour: `green`, `amber` or `red`.
    pub status: String,
    /// Human readable status line.
    pub message: String,
}

impl Component {
    pub fn new(status: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            status: status.into(),
            message: message.into(),
        }
    }

    pub fn is_healthy(&self) -> bool {
        self.status == "green"
    }
}

/// The PiAware `status.json` document.
///
/// Every field is optional: older PiAware releases omit some of them and a
/// receiver without GPS never reports one.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct PiAwareStatus {
    /// Receiver wall clock, Unix milliseconds.
    pub time: Option<f64>,
    /// Seconds since the receiver booted.
    pub system_uptime: Option<f64>,
    pub cpu_temp_celcius: Option<f64>,
    pub cpu_load_percent: Option<f64>,
    pub piaware: Option<Component>,
    pub gps: Option<Component>,
    pub radio: Option<Component>,
    pub mlat: Option<Component>,
    pub site_url: Option<String>,
}

impl PiAwareStatus {
    /// Uptime, or `None` if the value is negative, not finite or too large
    /// for a `Duration`.
    pub fn uptime(&self) -> Option<Duration> {
        self.system_uptime
            .and_then(|s| Duration::try_from_secs_f64(s).ok())
    }

    /// Receiver clock as Unix milliseconds, if present and sane.
    pub fn time_ms(&self) -> Option<i64> {
        self.time.filter(|t| t.is_finite() && *t >= 0.0).map(|t| t as i64)
    }
}
