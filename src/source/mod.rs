//! Status source abstraction for polling the receiver.
//!
//! This module provides a trait-based abstraction over where a status report
//! comes from. The daemon only ever talks to a [`StatusSource`]; the PiAware
//! HTTP implementation lives in [`piaware`], and tests substitute their own.

pub mod http;
pub mod net;
pub mod piaware;

pub use http::{Backoff, HttpFetcher, HttpFetcherBuilder};
pub use net::local_ip;
pub use piaware::PiAwareSource;

use std::fmt::Debug;

use async_trait::async_trait;

use crate::data::StatusReport;
use crate::error::SourceError;

/// Trait for fetching the receiver status.
///
/// # Example
///
/// ```no_run
/// use piaware_epaper::config::Settings;
/// use piaware_epaper::source::{PiAwareSource, StatusSource};
///
/// # async fn run() -> anyhow::Result<()> {
/// let settings = Settings::load(None)?;
/// let mut source = PiAwareSource::from_settings(&settings)?;
/// let report = source.fetch().await?;
/// println!("{}: {:?}", source.description(), report.status.piaware);
/// # Ok(())
/// # }
/// ```
#[async_trait]
pub trait StatusSource: Send + Debug {
    /// Fetch a fresh report.
    ///
    /// Fails only when the core status document is unavailable; optional
    /// documents degrade to empty fields.
    async fn fetch(&mut self) -> Result<StatusReport, SourceError>;

    /// Returns a human-readable description of the source.
    fn description(&self) -> &str;
}
