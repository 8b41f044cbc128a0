//! `monitor.json` from the Flightradar24 feeder (`fr24feed`).

/// The subset of the fr24feed monitor document the display uses.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct Fr24Monitor {
    pub feed_status: Option<String>,
    pub feed_current_mode: Option<String>,
    pub feed_alias: Option<String>,
}

impl Fr24Monitor {
    /// One-line link status, e.g. `Connected via UDP`.
    pub fn summary(&self) -> String {
        match self.feed_status.as_deref() {
            Some("connected") => format!(
                "Connected via {}",
                self.feed_current_mode.as_deref().unwrap_or("unknown")
            ),
            Some(status) => ucfirst(status),
            None => "unknown".to_string(),
        }
    }
}

fn ucfirst(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
