//! Alert notifications for emergency squawks and watchlist sightings.
//!
//! The [`AlertNotifier`] compares the alerts in each snapshot against a
//! [`NotificationState`] owned by the caller, so one event is announced once
//! no matter how many cycles it stays on air. An emergency is one event per
//! squawk code, however many aircraft squawk it; a watchlist sighting is one
//! event per aircraft. When the event disappears from the aircraft table its
//! key is dropped; if it comes back it is announced again.

pub mod slack;

pub use slack::SlackNotifier;

use std::collections::BTreeSet;
use std::fmt::Debug;

use async_trait::async_trait;
use piaware_types::EmergencySquawk;

use crate::config::Settings;
use crate::data::format::format_distance;
use crate::data::{Emergency, Sighting, SightingKind, StatusSnapshot};
use crate::error::NotifyError;

/// Something worth telling a human about.
#[derive(Debug, Clone, PartialEq)]
pub enum Alert {
    Emergency(Emergency),
    Sighting(Sighting),
}

/// Identity of an alert across cycles.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum AlertKey {
    /// Active for as long as any aircraft squawks the code.
    Emergency { squawk: EmergencySquawk },
    Sighting { hex: String, kind: SightingKind },
}

impl Alert {
    /// All alerts in `snapshot`, emergencies first.
    pub fn collect(snapshot: &StatusSnapshot) -> Vec<Alert> {
        snapshot
            .emergencies()
            .iter()
            .cloned()
            .map(Alert::Emergency)
            .chain(snapshot.sightings().iter().cloned().map(Alert::Sighting))
            .collect()
    }

    pub fn key(&self) -> AlertKey {
        match self {
            Alert::Emergency(e) => AlertKey::Emergency { squawk: e.squawk },
            Alert::Sighting(s) => AlertKey::Sighting {
                hex: s.hex.to_ascii_lowercase(),
                kind: s.kind,
            },
        }
    }

    pub fn hex(&self) -> &str {
        match self {
            Alert::Emergency(e) => &e.hex,
            Alert::Sighting(s) => &s.hex,
        }
    }

    pub fn callsign(&self) -> Option<&str> {
        match self {
            Alert::Emergency(e) => e.callsign.as_deref(),
            Alert::Sighting(s) => s.callsign.as_deref(),
        }
    }

    pub fn squawk(&self) -> Option<String> {
        match self {
            Alert::Emergency(e) => Some(e.squawk.code().to_string()),
            Alert::Sighting(s) => s.squawk.clone(),
        }
    }

    pub fn distance_km(&self) -> Option<f64> {
        match self {
            Alert::Emergency(e) => e.distance_km,
            Alert::Sighting(s) => s.distance_km,
        }
    }
}

/// A delivery channel for alerts.
#[async_trait]
pub trait Notifier: Send + Sync + Debug {
    async fn send(&self, alert: &Alert) -> Result<(), NotifyError>;

    /// Short name for logs.
    fn name(&self) -> &str;
}

/// Alerts already announced. Owned by the main loop.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NotificationState {
    notified: BTreeSet<AlertKey>,
}

impl NotificationState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, key: &AlertKey) -> bool {
        self.notified.contains(key)
    }

    pub fn len(&self) -> usize {
        self.notified.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notified.is_empty()
    }

    fn insert(&mut self, key: AlertKey) {
        self.notified.insert(key);
    }

    /// Forget every key not in `active`.
    fn retain(&mut self, active: &BTreeSet<AlertKey>) {
        self.notified.retain(|key| active.contains(key));
    }
}

/// Sends each new alert once.
#[derive(Debug, Default)]
pub struct AlertNotifier {
    notifier: Option<Box<dyn Notifier>>,
}

impl AlertNotifier {
    pub fn new(notifier: Option<Box<dyn Notifier>>) -> Self {
        Self { notifier }
    }

    /// Slack when both `SLACK_BOT_TOKEN` and `SLACK_CHANNEL` are set,
    /// otherwise a notifier that only logs.
    pub fn from_settings(settings: &Settings) -> Result<Self, reqwest::Error> {
        let Some((token, channel)) = settings.slack() else {
            tracing::info!("Slack notifications disabled, SLACK_BOT_TOKEN or SLACK_CHANNEL not set");
            return Ok(Self::new(None));
        };

        let client = reqwest::Client::builder()
            .timeout(settings.http_timeout())
            .build()?;
        let slack = SlackNotifier::new(
            client,
            &settings.slack_api_url,
            token,
            channel,
            &settings.piaware_host,
        );
        Ok(Self::new(Some(Box::new(slack))))
    }

    /// Announce alerts in `snapshot` that are not yet in `state`.
    ///
    /// Returns the number of alerts delivered. Failed deliveries are logged
    /// and retried on the next call. A snapshot without aircraft data leaves
    /// `state` untouched, so a failed poll does not re-arm anything.
    pub async fn maybe_notify(
        &self,
        snapshot: &StatusSnapshot,
        state: &mut NotificationState,
    ) -> usize {
        if snapshot.aircraft.is_none() {
            return 0;
        }

        let alerts = Alert::collect(snapshot);
        let active: BTreeSet<AlertKey> = alerts.iter().map(Alert::key).collect();
        state.retain(&active);

        let mut delivered = 0;
        let mut attempted = BTreeSet::new();
        for alert in &alerts {
            let key = alert.key();
            if state.contains(&key) || !attempted.insert(key.clone()) {
                continue;
            }

            let sent = match &self.notifier {
                Some(notifier) => match notifier.send(alert).await {
                    Ok(()) => {
                        delivered += 1;
                        state.insert(key);
                        true
                    }
                    Err(e) => {
                        tracing::error!(notifier = notifier.name(), "Unable to send alert: {}", e);
                        false
                    }
                },
                None => {
                    tracing::debug!("No notifier configured, alert not sent");
                    state.insert(key);
                    false
                }
            };

            match alert {
                Alert::Emergency(e) => tracing::warn!(
                    "Aircraft {} (callsign {}) squawking {} at {} (notification sent: {})",
                    e.hex,
                    e.callsign.as_deref().unwrap_or("unknown"),
                    e.squawk,
                    format_distance(e.distance_km),
                    sent
                ),
                Alert::Sighting(s) => tracing::info!(
                    "Aircraft of special interest {} at {}: {} (notification sent: {})",
                    s.callsign.as_deref().unwrap_or(&s.hex),
                    format_distance(s.distance_km),
                    s.remark,
                    sent
                ),
            }
        }

        delivered
    }
}
