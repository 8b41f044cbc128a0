//! Slack delivery via `chat.postMessage`.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};

use super::{Alert, Notifier};
use crate::data::format::format_distance;
use crate::data::SightingKind;
use crate::error::NotifyError;

/// Posts alerts to a Slack channel with a bot token.
#[derive(Debug, Clone)]
pub struct SlackNotifier {
    client: Client,
    api_url: String,
    token: String,
    channel: String,
    /// Receiver base URL, used for the map links.
    piaware_host: String,
}

#[derive(Debug, Deserialize)]
struct SlackResponse {
    ok: bool,
    #[serde(default)]
    error: Option<String>,
}

impl SlackNotifier {
    pub fn new(
        client: Client,
        api_url: &str,
        token: &str,
        channel: &str,
        piaware_host: &str,
    ) -> Self {
        Self {
            client,
            api_url: api_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
            channel: channel.to_string(),
            piaware_host: piaware_host.trim_end_matches('/').to_string(),
        }
    }

    /// The `chat.postMessage` payload for `alert`.
    pub fn build_message(&self, alert: &Alert) -> Value {
        let host = reqwest::Url::parse(&self.piaware_host)
            .ok()
            .and_then(|u| {
                let host = u.host_str()?.to_string();
                Some(match u.port() {
                    Some(port) => format!("{}:{}", host, port),
                    None => host,
                })
            })
            .unwrap_or_else(|| self.piaware_host.clone());

        let (summary, header, description) = match alert {
            Alert::Emergency(e) => (
                format!("ICAO Emergency Squawk {}", e.squawk),
                format!("ICAO Emergency Squawk on {}", host),
                e.squawk.description().to_string(),
            ),
            Alert::Sighting(s) => {
                let name = s.callsign.as_deref().unwrap_or("unknown");
                match s.kind {
                    SightingKind::Registration => (
                        format!("Registration of Special Interest {}", name),
                        format!("Registration of Special Interest on {}", host),
                        s.remark.clone(),
                    ),
                    SightingKind::Icao => (
                        format!("Flight of Special Interest {}", name),
                        format!("Flight of Special Interest on {}", host),
                        s.remark.clone(),
                    ),
                }
            }
        };

        let hex = alert.hex();
        let fields = [
            field("Aircraft", hex),
            field("Callsign", alert.callsign().unwrap_or("unknown")),
            field("Squawk", &alert.squawk().unwrap_or_else(|| "unknown".to_string())),
            field("Distance", &format_distance(alert.distance_km())),
            field(
                "Tar1090",
                &format!("<{}/tar1090/?icao={}|Open>", self.piaware_host, hex),
            ),
            field("SkyAware", &format!("<{}/skyaware/|Open>", self.piaware_host)),
        ];

        json!({
            "channel": self.channel,
            "text": summary,
            "blocks": [
                {"type": "header", "text": {"type": "plain_text", "text": header}},
                {"type": "section", "text": {"type": "mrkdwn", "text": description}},
                {"type": "divider"},
                {"type": "section", "fields": fields},
            ],
        })
    }
}

fn field(key: &str, value: &str) -> Value {
    json!({"type": "mrkdwn", "text": format!("*{}:*\n{}", key, value)})
}

#[async_trait]
impl Notifier for SlackNotifier {
    async fn send(&self, alert: &Alert) -> Result<(), NotifyError> {
        let url = format!("{}/chat.postMessage", self.api_url);
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.token)
            .json(&self.build_message(alert))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(NotifyError::Http(format!(
                "API returned status {}",
                response.status()
            )));
        }

        let body: SlackResponse = response
            .json()
            .await
            .map_err(|e| NotifyError::Parse(e.to_string()))?;

        if body.ok {
            Ok(())
        } else {
            Err(NotifyError::Rejected(
                body.error.unwrap_or_else(|| "unknown error".to_string()),
            ))
        }
    }

    fn name(&self) -> &str {
        "slack"
    }
}
