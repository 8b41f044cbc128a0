//! PiAware / SkyAware HTTP source.

use std::fmt;

use async_trait::async_trait;
use piaware_types::{AircraftFeed, Fr24Monitor, PiAwareStatus, Position, Receiver};

use super::{HttpFetcher, StatusSource};
use crate::config::{Settings, Watchlist};
use crate::data::{AircraftSummary, MessageRate, StatusReport};
use crate::error::SourceError;

/// Retry policy for the Flightradar24 feeder, which is only side information.
const FR24_RETRIES: u32 = 2;
const FR24_BACKOFF_MS: u64 = 100;

/// Flightradar24 feeder endpoint.
#[derive(Debug, Clone)]
struct Fr24Endpoint {
    base: String,
    fetcher: HttpFetcher,
}

/// Polls a PiAware receiver over HTTP.
///
/// Per fetch it reads `status.json` (required), `aircraft.json` and, when
/// configured, the Flightradar24 `monitor.json`. The receiver position from
/// `receiver.json` is fetched until known and then kept for the lifetime of
/// the source.
pub struct PiAwareSource {
    base: String,
    fetcher: HttpFetcher,
    fr24: Option<Fr24Endpoint>,
    receiver: Option<Position>,
    rate: MessageRate,
    max_age: f64,
    watchlist: Watchlist,
    description: String,
}

impl PiAwareSource {
    /// Create a source for the receiver at `base` (e.g. `http://127.0.0.1:8080`).
    pub fn new(base: &str, fetcher: HttpFetcher) -> Self {
        let base = base.trim_end_matches('/').to_string();
        Self {
            description: format!("piaware: {}", base),
            base,
            fetcher,
            fr24: None,
            receiver: None,
            rate: MessageRate::new(),
            max_age: 120.0,
            watchlist: Watchlist::default(),
        }
    }

    /// Build the source described by `settings`.
    pub fn from_settings(settings: &Settings) -> Result<Self, reqwest::Error> {
        let fetcher = HttpFetcher::builder()
            .timeout(settings.http_timeout())
            .retries(settings.piaware_retries)
            .backoff(settings.piaware_backoff())
            .build()?;

        let mut source = Self::new(&settings.piaware_host, fetcher)
            .with_max_age(settings.aircraft_max_age_secs)
            .with_watchlist(settings.watchlist.clone());

        if settings.enable_fr24 {
            let fr24 = HttpFetcher::builder()
                .timeout(settings.http_timeout())
                .retries(FR24_RETRIES)
                .backoff(std::time::Duration::from_millis(FR24_BACKOFF_MS))
                .build()?;
            source = source.with_fr24(&settings.flightradar_host, fr24);
        }

        Ok(source)
    }

    /// Also report the Flightradar24 feeder status.
    pub fn with_fr24(mut self, base: &str, fetcher: HttpFetcher) -> Self {
        self.fr24 = Some(Fr24Endpoint {
            base: base.trim_end_matches('/').to_string(),
            fetcher,
        });
        self
    }

    /// Age threshold in seconds for counting aircraft.
    pub fn with_max_age(mut self, max_age: f64) -> Self {
        self.max_age = max_age;
        self
    }

    pub fn with_watchlist(mut self, watchlist: Watchlist) -> Self {
        self.watchlist = watchlist;
        self
    }

    /// The cached receiver position, if known.
    pub fn receiver_position(&self) -> Option<Position> {
        self.receiver
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base, path)
    }

    async fn refresh_receiver(&mut self) {
        if self.receiver.is_some() {
            return;
        }
        match self
            .fetcher
            .get_json::<Receiver>(&self.url("skyaware/data/receiver.json"))
            .await
        {
            Ok(receiver) => match receiver.position() {
                Some(position) => {
                    tracing::debug!(
                        lat = position.latitude,
                        lon = position.longitude,
                        "Receiver position"
                    );
                    self.receiver = Some(position);
                }
                None => tracing::error!("Receiver has no position configured, range is unavailable"),
            },
            Err(e) => tracing::warn!("Could not get receiver position: {}", e),
        }
    }

    async fn fetch_aircraft(&mut self) -> Option<AircraftSummary> {
        match self
            .fetcher
            .get_json::<AircraftFeed>(&self.url("skyaware/data/aircraft.json"))
            .await
        {
            Ok(feed) => {
                self.rate.record(&feed);
                let summary =
                    AircraftSummary::from_feed(&feed, self.receiver, self.max_age, &self.watchlist);
                tracing::info!(
                    total = summary.total,
                    with_position = summary.with_position,
                    mlat = summary.mlat,
                    threshold_secs = self.max_age,
                    "Aircraft seen"
                );
                Some(summary)
            }
            Err(e) => {
                tracing::warn!("Could not get aircraft: {}", e);
                None
            }
        }
    }

    async fn fetch_fr24(&self) -> Option<String> {
        let endpoint = self.fr24.as_ref()?;
        let url = format!("{}/monitor.json", endpoint.base);
        let status = match endpoint.fetcher.get_json::<Fr24Monitor>(&url).await {
            Ok(monitor) => monitor.summary(),
            Err(e) => {
                tracing::warn!("Could not get Flightradar24 status: {}", e);
                "unknown".to_string()
            }
        };
        tracing::info!("Flightradar24 status: {}", status);
        Some(status)
    }
}

impl fmt::Debug for PiAwareSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PiAwareSource")
            .field("base", &self.base)
            .field("fr24", &self.fr24.as_ref().map(|e| &e.base))
            .field("receiver", &self.receiver)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl StatusSource for PiAwareSource {
    async fn fetch(&mut self) -> Result<StatusReport, SourceError> {
        let status: PiAwareStatus = self.fetcher.get_json(&self.url("status.json")).await?;

        self.refresh_receiver().await;
        let aircraft = self.fetch_aircraft().await;
        let fr24 = self.fetch_fr24().await;
        // The rate is only current if this cycle's sample made it in.
        let messages_per_second = aircraft.as_ref().and_then(|_| self.rate.per_second());

        Ok(StatusReport {
            status,
            aircraft,
            messages_per_second,
            fr24,
        })
    }

    fn description(&self) -> &str {
        &self.description
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::testing::TestServer;

    const STATUS: &str = r#"{
        "time": 1700000000000,
        "system_uptime": 3600,
        "piaware": {"status": "green", "message": "PiAware 9.0 is running"},
        "gps": {"status": "amber", "message": "No GPS"},
        "radio": {"status": "green", "message": "Received data"}
    }"#;
    const RECEIVER: &str = r#"{"version": "9.0", "lat": 50.0, "lon": 8.5}"#;
    const AIRCRAFT_1: &str = r#"{"now": 1000.0, "messages": 5000, "aircraft": [
        {"hex": "3c6444", "flight": "DLH4AB  ", "squawk": "7700", "lat": 50.1, "lon": 8.5, "seen": 1, "seen_pos": 1, "mlat": []},
        {"hex": "4b1805", "seen": 2}
    ]}"#;
    const AIRCRAFT_2: &str = r#"{"now": 1300.0, "messages": 18560, "aircraft": []}"#;

    fn fetcher(retries: u32) -> HttpFetcher {
        HttpFetcher::builder()
            .retries(retries)
            .backoff(Duration::from_millis(1))
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn test_fetch_full_report() {
        let server = TestServer::start(vec![
            ("/status.json", vec![(200, STATUS)]),
            ("/skyaware/data/receiver.json", vec![(200, RECEIVER)]),
            ("/skyaware/data/aircraft.json", vec![(200, AIRCRAFT_1), (200, AIRCRAFT_2)]),
        ])
        .await;

        let mut source = PiAwareSource::new(&server.base_url, fetcher(0));
        let report = source.fetch().await.unwrap();

        assert_eq!(report.status.uptime(), Some(Duration::from_secs(3600)));
        let aircraft = report.aircraft.unwrap();
        assert_eq!(aircraft.total, 2);
        assert_eq!(aircraft.with_position, 1);
        assert_eq!(aircraft.emergencies.len(), 1);
        assert!(aircraft.range.is_some());
        assert_eq!(report.messages_per_second, None);
        assert_eq!(report.fr24, None);
        assert_eq!(source.receiver_position(), Some(Position::new(50.0, 8.5)));

        let report = source.fetch().await.unwrap();
        assert!((report.messages_per_second.unwrap() - 45.2).abs() < 1e-9);

        // Receiver position is cached after the first fetch.
        assert_eq!(server.hits("/skyaware/data/receiver.json"), 1);
        assert_eq!(server.hits("/status.json"), 2);
    }

    #[tokio::test]
    async fn test_rate_dropped_when_aircraft_fetch_fails() {
        let server = TestServer::start(vec![
            ("/status.json", vec![(200, STATUS)]),
            ("/skyaware/data/receiver.json", vec![(200, RECEIVER)]),
            (
                "/skyaware/data/aircraft.json",
                vec![(200, AIRCRAFT_1), (200, AIRCRAFT_2), (500, "")],
            ),
        ])
        .await;

        let mut source = PiAwareSource::new(&server.base_url, fetcher(0));
        source.fetch().await.unwrap();
        let report = source.fetch().await.unwrap();
        assert!(report.messages_per_second.is_some());

        let report = source.fetch().await.unwrap();
        assert!(report.aircraft.is_none());
        assert_eq!(report.messages_per_second, None);
        assert_eq!(server.hits("/skyaware/data/aircraft.json"), 3);
    }

    #[tokio::test]
    async fn test_status_failure_fails_fetch() {
        let server = TestServer::start(vec![("/status.json", vec![(503, "down")])]).await;

        let mut source = PiAwareSource::new(&server.base_url, fetcher(2));
        let err = source.fetch().await.unwrap_err();

        assert!(matches!(err, SourceError::Fetch { attempts: 3, .. }));
        assert_eq!(server.hits("/status.json"), 3);
        assert_eq!(server.hits("/skyaware/data/aircraft.json"), 0);
    }

    #[tokio::test]
    async fn test_missing_aircraft_degrades() {
        let server = TestServer::start(vec![("/status.json", vec![(200, STATUS)])]).await;

        let mut source = PiAwareSource::new(&server.base_url, fetcher(0));
        let report = source.fetch().await.unwrap();

        assert!(report.aircraft.is_none());
        assert_eq!(source.receiver_position(), None);

        // Still unknown, so the next fetch asks again.
        source.fetch().await.unwrap();
        assert_eq!(server.hits("/skyaware/data/receiver.json"), 2);
    }

    #[tokio::test]
    async fn test_fr24_status() {
        let piaware = TestServer::start(vec![("/status.json", vec![(200, STATUS)])]).await;
        let fr24 = TestServer::start(vec![(
            "/monitor.json",
            vec![(200, r#"{"feed_status": "connected", "feed_current_mode": "UDP"}"#)],
        )])
        .await;

        let mut source = PiAwareSource::new(&piaware.base_url, fetcher(0))
            .with_fr24(&fr24.base_url, fetcher(0));
        let report = source.fetch().await.unwrap();
        assert_eq!(report.fr24.as_deref(), Some("Connected via UDP"));
    }

    #[tokio::test]
    async fn test_fr24_unreachable_is_unknown() {
        let piaware = TestServer::start(vec![("/status.json", vec![(200, STATUS)])]).await;
        let fr24 = TestServer::start(vec![("/monitor.json", vec![(500, "")])]).await;

        let mut source = PiAwareSource::new(&piaware.base_url, fetcher(0))
            .with_fr24(&fr24.base_url, fetcher(1));
        let report = source.fetch().await.unwrap();
        assert_eq!(report.fr24.as_deref(), Some("unknown"));
        assert_eq!(fr24.hits("/monitor.json"), 2);
    }

    #[test]
    fn test_from_settings() {
        let mut settings = Settings::default();
        settings.piaware_host = "http://piaware.local:8080/".to_string();
        settings.enable_fr24 = true;

        let source = PiAwareSource::from_settings(&settings).unwrap();
        assert_eq!(source.description(), "piaware: http://piaware.local:8080");
        assert_eq!(source.fr24.as_ref().unwrap().fetcher.retries(), FR24_RETRIES);
        assert_eq!(source.url("status.json"), "http://piaware.local:8080/status.json");
    }
}
