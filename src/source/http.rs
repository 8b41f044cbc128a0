//! JSON over HTTP with bounded retries and exponential backoff.
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::time::Duration;
//! use piaware_epaper::source::HttpFetcher;
//! use piaware_types::PiAwareStatus;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let fetcher = HttpFetcher::builder()
//!     .retries(10)
//!     .backoff(Duration::from_secs(1))
//!     .build()?;
//!
//! let status: PiAwareStatus = fetcher.get_json("http://127.0.0.1:8080/status.json").await?;
//! println!("uptime: {:?}", status.uptime());
//! # Ok(())
//! # }
//! ```

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use reqwest::{Client, StatusCode, Url};
use serde::de::DeserializeOwned;

use crate::error::SourceError;

/// Upper bound for a single backoff delay.
const MAX_BACKOFF: Duration = Duration::from_secs(120);

/// Exponential backoff: `factor * 2^(k-1)` before retry `k`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Backoff {
    factor: Duration,
}

impl Backoff {
    pub fn new(factor: Duration) -> Self {
        Self { factor }
    }

    /// Delay after the `attempt`-th failed attempt (1-based).
    pub fn delay(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(31) as i32;
        let secs = self.factor.as_secs_f64() * 2f64.powi(exponent);
        Duration::from_secs_f64(secs.min(MAX_BACKOFF.as_secs_f64()))
    }
}

/// Outcome of a single attempt that did not produce a body.
enum Failure {
    /// Worth retrying: transport errors, 5xx, 429.
    Transient(String),
    /// Retrying will not help.
    Permanent(String),
}

/// Fetches JSON documents, retrying transient failures.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
    retries: u32,
    backoff: Backoff,
    cache_bust: bool,
}

impl HttpFetcher {
    /// Create a new builder for configuring the fetcher.
    pub fn builder() -> HttpFetcherBuilder {
        HttpFetcherBuilder::default()
    }

    pub fn retries(&self) -> u32 {
        self.retries
    }

    /// GET `url` and decode the body as `T`.
    ///
    /// Makes at most `retries + 1` attempts. Non-transient HTTP errors and
    /// undecodable bodies are reported without retrying.
    pub async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, SourceError> {
        let parsed = Url::parse(url)
            .ok()
            .filter(|u| u.has_host())
            .ok_or_else(|| SourceError::InvalidUrl(url.to_string()))?;

        let max_attempts = self.retries.saturating_add(1);
        let mut attempt = 0;

        loop {
            attempt += 1;
            match self.attempt(parsed.clone()).await {
                Ok(body) => {
                    return serde_json::from_slice(&body).map_err(|e| SourceError::Parse {
                        url: url.to_string(),
                        reason: e.to_string(),
                    });
                }
                Err(Failure::Permanent(reason)) => {
                    return Err(SourceError::Fetch {
                        url: url.to_string(),
                        attempts: attempt,
                        reason,
                    });
                }
                Err(Failure::Transient(reason)) => {
                    if attempt >= max_attempts {
                        return Err(SourceError::Fetch {
                            url: url.to_string(),
                            attempts: attempt,
                            reason,
                        });
                    }
                    let delay = self.backoff.delay(attempt);
                    tracing::debug!(
                        url,
                        attempt,
                        max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        "GET failed ({}), retrying",
                        reason
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }

    async fn attempt(&self, mut url: Url) -> Result<Vec<u8>, Failure> {
        if self.cache_bust {
            let ts = SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .unwrap_or_default()
                .as_secs_f64();
            url.query_pairs_mut().append_pair("ts", &format!("{:.3}", ts));
        }

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| Failure::Transient(e.to_string()))?;

        let status = response.status();
        if status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS {
            return Err(Failure::Transient(format!("server returned {}", status)));
        }
        if !status.is_success() {
            return Err(Failure::Permanent(format!("server returned {}", status)));
        }

        response
            .bytes()
            .await
            .map(|b| b.to_vec())
            .map_err(|e| Failure::Transient(e.to_string()))
    }
}

/// Builder for `HttpFetcher`.
#[derive(Debug, Default)]
pub struct HttpFetcherBuilder {
    timeout: Option<Duration>,
    retries: Option<u32>,
    backoff: Option<Duration>,
    cache_bust: Option<bool>,
}

impl HttpFetcherBuilder {
    /// Per-attempt request timeout (default: 10s).
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Retries after the first attempt (default: 10).
    pub fn retries(mut self, retries: u32) -> Self {
        self.retries = Some(retries);
        self
    }

    /// Backoff factor (default: 1s).
    pub fn backoff(mut self, factor: Duration) -> Self {
        self.backoff = Some(factor);
        self
    }

    /// Append a `ts` query parameter to defeat caches (default: on).
    pub fn cache_bust(mut self, enabled: bool) -> Self {
        self.cache_bust = Some(enabled);
        self
    }

    pub fn build(self) -> Result<HttpFetcher, reqwest::Error> {
        let client = Client::builder()
            .timeout(self.timeout.unwrap_or(Duration::from_secs(10)))
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(HttpFetcher {
            client,
            retries: self.retries.unwrap_or(10),
            backoff: Backoff::new(self.backoff.unwrap_or(Duration::from_secs(1))),
            cache_bust: self.cache_bust.unwrap_or(true),
        })
    }
}
