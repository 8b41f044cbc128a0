//! # piaware-epaper
//!
//! Shows the health of a PiAware ADS-B receiver on a Waveshare e-paper
//! panel, and posts a Slack message when an aircraft in range squawks an
//! emergency code or a watchlisted aircraft shows up.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                         app::Daemon                              │
//! │                                                                  │
//! │  ┌─────────┐    ┌──────────┐    ┌─────────┐    ┌─────────────┐   │
//! │  │ source  │───▶│   data   │───▶│   ui    │───▶│   display   │   │
//! │  │ (HTTP)  │    │(snapshot)│    │ (raster)│    │   (panel)   │   │
//! │  └─────────┘    └────┬─────┘    └─────────┘    └─────────────┘   │
//! │                      │                                           │
//! │                      ▼                                           │
//! │                 ┌─────────┐         ┌─────────┐                  │
//! │                 │ notify  │         │ events  │◀── GPIO buttons  │
//! │                 │ (Slack) │         │(actions)│                  │
//! │                 └─────────┘         └─────────┘                  │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! - **[`source`]**: polls `status.json`, `aircraft.json` and friends with
//!   retry and exponential backoff ([`StatusSource`] trait)
//! - **[`data`]**: turns a fetch into an immutable [`StatusSnapshot`]
//! - **[`notify`]**: announces each emergency or watchlist sighting once
//! - **[`ui`]**: lays out and rasterizes the snapshot with embedded-graphics
//! - **[`display`]**: the [`Panel`] adapter, simulated or Waveshare over SPI
//! - **[`events`]**: debounced buttons feeding a single-slot action channel
//! - **[`app`]**: the poll, render and idle state machine
//!
//! ## Usage
//!
//! ```bash
//! # Draw one frame without hardware, writing epaper.png
//! PIAWARE_HOST=http://piaware.local:8080 piaware-epaper --simulate --once
//!
//! # On the Pi, with the `hardware` feature
//! piaware-epaper --config /etc/piaware-epaper.toml
//! ```
//!
//! ### Rendering a snapshot
//!
//! ```
//! use piaware_epaper::data::StatusSnapshot;
//! use piaware_epaper::ui::{render, RenderConfig};
//!
//! let snapshot = StatusSnapshot::unavailable(1, "Failed API Call", None);
//! let raster = render(&snapshot, &RenderConfig::default());
//! assert_eq!((raster.width(), raster.height()), (264, 176));
//! ```

pub mod app;
pub mod config;
pub mod data;
pub mod display;
pub mod error;
pub mod events;
pub mod notify;
pub mod source;
pub mod ui;

#[cfg(test)]
mod testing;

pub use app::{Daemon, LoopState, RefreshPolicy};
pub use config::Settings;
pub use data::{AircraftSummary, FeedHealth, StatusReport, StatusSnapshot};
pub use display::{ClearColor, Panel, RefreshMode, SimulatedPanel};
pub use error::{DriverError, NotifyError, SourceError};
pub use events::{action_channel, ActionReceiver, ActionSender, ButtonAction};
pub use notify::{Alert, AlertNotifier, NotificationState, Notifier};
pub use source::{HttpFetcher, PiAwareSource, StatusSource};
pub use ui::{render, Raster, RenderConfig};
