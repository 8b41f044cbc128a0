//! Runtime configuration.
//!
//! Settings are layered with the `config` crate: built-in defaults, then an
//! optional TOML file (`--config`), then the recognised environment
//! variables. Only the variables below are read from the environment; the
//! panel, layout, button and watchlist sections come from the file.
//!
//! | Variable           | Default                  |
//! |--------------------|--------------------------|
//! | `LOGLEVEL`         | `INFO`                   |
//! | `PIAWARE_HOST`     | `http://127.0.0.1:8080`  |
//! | `PIAWARE_RETRIES`  | `10`                     |
//! | `PIAWARE_BACKOFF`  | `1.0` (seconds)          |
//! | `ENABLE_FR24`      | `false`                  |
//! | `FLIGHTRADAR_HOST` | `http://127.0.0.1:8754`  |
//! | `SENTRY_DSN`       | unset                    |
//! | `SLACK_BOT_TOKEN`  | unset                    |
//! | `SLACK_CHANNEL`    | unset                    |
//!
//! ```toml
//! refresh_interval_secs = 300
//! full_refresh_every = 12
//!
//! [panel]
//! bi_color = true
//!
//! [[buttons.bindings]]
//! pin = 13
//! action = "refresh"
//!
//! [watchlist.registration]
//! A7BHN = "QTR85 Qatar DUS"
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use config::{Config, ConfigError, Environment, File};
use serde::de::{self, Deserializer, Visitor};
use serde::Deserialize;

use crate::display::ClearColor;
use crate::events::ButtonAction;

/// Environment variables layered over the file settings.
const ENV_KEYS: &[&str] = &[
    "LOGLEVEL",
    "PIAWARE_HOST",
    "PIAWARE_RETRIES",
    "PIAWARE_BACKOFF",
    "ENABLE_FR24",
    "FLIGHTRADAR_HOST",
    "SENTRY_DSN",
    "SLACK_BOT_TOKEN",
    "SLACK_CHANNEL",
];

/// Top-level settings for the status service.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub loglevel: String,
    pub piaware_host: String,
    pub piaware_retries: u32,
    /// Backoff factor in seconds.
    pub piaware_backoff: f64,
    #[serde(deserialize_with = "deserialize_flag")]
    pub enable_fr24: bool,
    pub flightradar_host: String,
    pub sentry_dsn: Option<String>,
    pub slack_bot_token: Option<String>,
    pub slack_channel: Option<String>,
    pub slack_api_url: String,
    pub http_timeout_secs: u64,
    pub refresh_interval_secs: u64,
    /// Every Nth cycle is a full refresh; the first cycle always is. Must be
    /// at least 1, where 1 makes every refresh full.
    pub full_refresh_every: u64,
    /// Aircraft not heard from for longer than this are not counted.
    pub aircraft_max_age_secs: f64,
    pub startup_attempts: u32,
    /// Where to write a PNG copy of each frame. Skipped in containers.
    pub debug_image: Option<PathBuf>,
    pub panel: PanelSettings,
    pub layout: LayoutSettings,
    pub buttons: ButtonSettings,
    pub watchlist: Watchlist,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            loglevel: "INFO".to_string(),
            piaware_host: "http://127.0.0.1:8080".to_string(),
            piaware_retries: 10,
            piaware_backoff: 1.0,
            enable_fr24: false,
            flightradar_host: "http://127.0.0.1:8754".to_string(),
            sentry_dsn: None,
            slack_bot_token: None,
            slack_channel: None,
            slack_api_url: "https://slack.com/api".to_string(),
            http_timeout_secs: 10,
            refresh_interval_secs: 300,
            full_refresh_every: 12,
            aircraft_max_age_secs: 120.0,
            startup_attempts: 3,
            debug_image: Some(PathBuf::from("epaper.png")),
            panel: PanelSettings::default(),
            layout: LayoutSettings::default(),
            buttons: ButtonSettings::default(),
            watchlist: Watchlist::default(),
        }
    }
}

/// Panel geometry and wiring.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PanelSettings {
    /// Landscape width in pixels.
    pub width: u32,
    pub height: u32,
    /// Panel has a second (red) colour plane.
    pub bi_color: bool,
    pub spi_device: String,
    pub gpio_chip: String,
    pub busy_pin: u32,
    pub dc_pin: u32,
    pub rst_pin: u32,
}

impl Default for PanelSettings {
    fn default() -> Self {
        Self {
            width: 264,
            height: 176,
            bi_color: false,
            spi_device: "/dev/spidev0.0".to_string(),
            gpio_chip: "/dev/gpiochip0".to_string(),
            busy_pin: 24,
            dc_pin: 25,
            rst_pin: 17,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LayoutSettings {
    pub margin: u32,
    pub indent: u32,
    pub line_spacing: u32,
    pub header_font: String,
    pub body_font: String,
}

impl Default for LayoutSettings {
    fn default() -> Self {
        Self {
            margin: 4,
            indent: 8,
            line_spacing: 13,
            header_font: "6x10".to_string(),
            body_font: "6x12".to_string(),
        }
    }
}

/// One GPIO input and the action its press triggers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct ButtonBinding {
    /// BCM line offset.
    pub pin: u32,
    pub action: ButtonAction,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ButtonSettings {
    pub enabled: bool,
    pub bindings: Vec<ButtonBinding>,
    pub poll_interval_ms: u64,
    pub debounce_ms: u64,
}

impl Default for ButtonSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            bindings: vec![
                ButtonBinding {
                    pin: 5,
                    action: ButtonAction::Clear(ClearColor::Black),
                },
                ButtonBinding {
                    pin: 6,
                    action: ButtonAction::Clear(ClearColor::White),
                },
                ButtonBinding {
                    pin: 13,
                    action: ButtonAction::Refresh,
                },
                ButtonBinding {
                    pin: 19,
                    action: ButtonAction::Shutdown,
                },
            ],
            poll_interval_ms: 20,
            debounce_ms: 200,
        }
    }
}

/// Aircraft of special interest, each with a free-text remark.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Watchlist {
    /// Keyed by ICAO hex address.
    pub icao: BTreeMap<String, String>,
    /// Keyed by callsign or registration as broadcast in the flight field.
    pub registration: BTreeMap<String, String>,
}

impl Default for Watchlist {
    fn default() -> Self {
        let icao = [
            ("3EA12C", "Luftwaffe A350-900 VIP 10+01 Konrad Adenauer"),
            ("3F5D91", "Luftwaffe A350-900 VIP 10+02 Theodor Heuss"),
            ("3E854F", "Luftwaffe A350-900 VIP 10+03 Kurt Schumacher"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

        Self {
            icao,
            registration: BTreeMap::new(),
        }
    }
}

impl Watchlist {
    /// Remark for an ICAO address, compared case-insensitively.
    pub fn icao_remark(&self, hex: &str) -> Option<&str> {
        lookup(&self.icao, hex)
    }

    /// Remark for a callsign, compared case-insensitively.
    pub fn registration_remark(&self, callsign: &str) -> Option<&str> {
        lookup(&self.registration, callsign)
    }
}

fn lookup<'a>(map: &'a BTreeMap<String, String>, key: &str) -> Option<&'a str> {
    let key = key.trim();
    map.iter()
        .find(|(k, _)| k.eq_ignore_ascii_case(key))
        .map(|(_, v)| v.as_str())
}

impl Settings {
    /// Load from an optional file and the process environment.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        Self::load_from(path, std::env::vars())
    }

    /// Load from an optional file and the given environment.
    pub fn load_from<I>(path: Option<&Path>, vars: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let env: config::Map<String, String> = vars
            .into_iter()
            .filter(|(key, _)| ENV_KEYS.contains(&key.as_str()))
            .filter(|(_, value)| !value.is_empty())
            .collect();

        let mut builder = Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(File::from(path));
        }
        let settings: Settings = builder
            .add_source(Environment::default().source(Some(env)))
            .build()?
            .try_deserialize()?;

        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if !is_valid_url(&self.piaware_host) {
            return Err(ConfigError::Message(format!(
                "PIAWARE_HOST {:?} is not a valid URL",
                self.piaware_host
            )));
        }
        if self.enable_fr24 && !is_valid_url(&self.flightradar_host) {
            return Err(ConfigError::Message(format!(
                "FLIGHTRADAR_HOST {:?} is not a valid URL",
                self.flightradar_host
            )));
        }
        if !self.piaware_backoff.is_finite() || self.piaware_backoff < 0.0 {
            return Err(ConfigError::Message(format!(
                "PIAWARE_BACKOFF must be a non-negative number, got {}",
                self.piaware_backoff
            )));
        }
        if self.refresh_interval_secs == 0 {
            return Err(ConfigError::Message(
                "refresh_interval_secs must be positive".to_string(),
            ));
        }
        if self.full_refresh_every == 0 {
            return Err(ConfigError::Message(
                "full_refresh_every must be at least 1".to_string(),
            ));
        }
        if self.panel.width == 0 || self.panel.height == 0 {
            return Err(ConfigError::Message("panel size must be positive".to_string()));
        }

        let mut pins: Vec<u32> = self.buttons.bindings.iter().map(|b| b.pin).collect();
        pins.sort_unstable();
        if pins.windows(2).any(|w| w[0] == w[1]) {
            return Err(ConfigError::Message(
                "each button pin may only be bound once".to_string(),
            ));
        }

        Ok(())
    }

    pub fn piaware_backoff(&self) -> Duration {
        Duration::from_secs_f64(self.piaware_backoff)
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_secs)
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }

    /// Slack credentials, if both the token and the channel are set.
    pub fn slack(&self) -> Option<(&str, &str)> {
        match (self.slack_bot_token.as_deref(), self.slack_channel.as_deref()) {
            (Some(token), Some(channel)) => Some((token, channel)),
            _ => None,
        }
    }

    /// Sentry DSN, if set and a valid URL.
    pub fn sentry_dsn(&self) -> Option<&str> {
        self.sentry_dsn.as_deref().filter(|dsn| is_valid_url(dsn))
    }

    /// `LOGLEVEL` as a tracing filter directive. Unknown levels fall back
    /// to `info`.
    pub fn log_filter(&self) -> &'static str {
        match self.loglevel.trim().to_ascii_uppercase().as_str() {
            "TRACE" => "trace",
            "DEBUG" => "debug",
            "WARN" | "WARNING" => "warn",
            "ERROR" | "CRITICAL" | "FATAL" => "error",
            _ => "info",
        }
    }
}

/// A URL with both a scheme and a host.
pub fn is_valid_url(url: &str) -> bool {
    reqwest::Url::parse(url).is_ok_and(|u| u.has_host())
}

/// Accepts `true`/`1`/`t` (any case) as well as native booleans.
fn deserialize_flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    struct FlagVisitor;

    impl Visitor<'_> for FlagVisitor {
        type Value = bool;

        fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
            f.write_str("a boolean flag")
        }

        fn visit_bool<E: de::Error>(self, v: bool) -> Result<bool, E> {
            Ok(v)
        }

        fn visit_i64<E: de::Error>(self, v: i64) -> Result<bool, E> {
            Ok(v == 1)
        }

        fn visit_u64<E: de::Error>(self, v: u64) -> Result<bool, E> {
            Ok(v == 1)
        }

        fn visit_str<E: de::Error>(self, v: &str) -> Result<bool, E> {
            Ok(matches!(v.trim().to_ascii_lowercase().as_str(), "true" | "1" | "t"))
        }
    }

    deserializer.deserialize_any(FlagVisitor)
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    fn env(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_defaults() {
        let settings = Settings::load_from(None, env(&[])).unwrap();
        assert_eq!(settings.piaware_host, "http://127.0.0.1:8080");
        assert_eq!(settings.flightradar_host, "http://127.0.0.1:8754");
        assert_eq!(settings.piaware_retries, 10);
        assert_eq!(settings.piaware_backoff(), Duration::from_secs(1));
        assert!(!settings.enable_fr24);
        assert_eq!(settings.refresh_interval(), Duration::from_secs(300));
        assert_eq!(settings.buttons.bindings.len(), 4);
        assert!(settings.slack().is_none());
    }

    #[test]
    fn test_environment_overrides() {
        let settings = Settings::load_from(
            None,
            env(&[
                ("PIAWARE_HOST", "http://piaware.local"),
                ("PIAWARE_RETRIES", "3"),
                ("PIAWARE_BACKOFF", "0.5"),
                ("ENABLE_FR24", "T"),
                ("LOGLEVEL", "debug"),
                ("SLACK_BOT_TOKEN", "xoxb-1"),
                ("SLACK_CHANNEL", "#adsb"),
                ("HOME", "/root"),
            ]),
        )
        .unwrap();

        assert_eq!(settings.piaware_host, "http://piaware.local");
        assert_eq!(settings.piaware_retries, 3);
        assert_eq!(settings.piaware_backoff(), Duration::from_millis(500));
        assert!(settings.enable_fr24);
        assert_eq!(settings.loglevel, "debug");
        assert_eq!(settings.slack(), Some(("xoxb-1", "#adsb")));
    }

    #[test]
    fn test_log_filter() {
        let mut settings = Settings::default();
        assert_eq!(settings.log_filter(), "info");
        for (level, filter) in [("DEBUG", "debug"), ("warning", "warn"), ("CRITICAL", "error"), ("loud", "info")] {
            settings.loglevel = level.to_string();
            assert_eq!(settings.log_filter(), filter, "LOGLEVEL={level}");
        }
    }

    #[test]
    fn test_flag_values() {
        for (value, expected) in [("true", true), ("1", true), ("t", true), ("no", false), ("0", false)] {
            let settings = Settings::load_from(None, env(&[("ENABLE_FR24", value)])).unwrap();
            assert_eq!(settings.enable_fr24, expected, "ENABLE_FR24={value}");
        }
    }

    #[test]
    fn test_invalid_host_is_rejected() {
        let err = Settings::load_from(None, env(&[("PIAWARE_HOST", "127.0.0.1:8080")]));
        assert!(err.is_err());
    }

    #[test]
    fn test_sentry_dsn_must_be_url() {
        let settings = Settings::load_from(None, env(&[("SENTRY_DSN", "not a dsn")])).unwrap();
        assert_eq!(settings.sentry_dsn(), None);

        let settings = Settings::load_from(
            None,
            env(&[("SENTRY_DSN", "https://key@o0.ingest.sentry.io/1")]),
        )
        .unwrap();
        assert!(settings.sentry_dsn().is_some());
    }

    #[test]
    fn test_file_layer_under_environment() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
piaware_retries = 4
refresh_interval_secs = 60

[panel]
bi_color = true

[[buttons.bindings]]
pin = 26
action = "refresh"

[watchlist.registration]
A7BHN = "QTR85 Qatar DUS"
"#
        )
        .unwrap();

        let settings =
            Settings::load_from(Some(file.path()), env(&[("PIAWARE_RETRIES", "7")])).unwrap();

        assert_eq!(settings.piaware_retries, 7);
        assert_eq!(settings.refresh_interval_secs, 60);
        assert!(settings.panel.bi_color);
        assert_eq!(settings.panel.width, 264);
        assert_eq!(
            settings.buttons.bindings,
            vec![ButtonBinding {
                pin: 26,
                action: ButtonAction::Refresh
            }]
        );
        assert_eq!(settings.watchlist.registration_remark("a7bhn"), Some("QTR85 Qatar DUS"));
    }

    #[test]
    fn test_duplicate_button_pins_are_rejected() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
[[buttons.bindings]]
pin = 5
action = "refresh"

[[buttons.bindings]]
pin = 5
action = "shutdown"
"#
        )
        .unwrap();

        assert!(Settings::load_from(Some(file.path()), env(&[])).is_err());
    }

    #[test]
    fn test_zero_full_refresh_interval_is_rejected() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "full_refresh_every = 0").unwrap();
        assert!(Settings::load_from(Some(file.path()), env(&[])).is_err());

        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "full_refresh_every = 1").unwrap();
        let settings = Settings::load_from(Some(file.path()), env(&[])).unwrap();
        assert_eq!(settings.full_refresh_every, 1);
    }

    #[test]
    fn test_watchlist_defaults() {
        let watchlist = Watchlist::default();
        assert_eq!(
            watchlist.icao_remark("3ea12c"),
            Some("Luftwaffe A350-900 VIP 10+01 Konrad Adenauer")
        );
        assert_eq!(watchlist.icao_remark("3c6444"), None);
        assert_eq!(watchlist.registration_remark("DLH4AB"), None);
    }
}
