//! Data models and processing for receiver status.
//!
//! This module turns the raw receiver documents into the snapshot the
//! display and the notifier work from.
//!
//! ## Submodules
//!
//! - [`aircraft`]: Aircraft counts, range, emergencies and watchlist hits
//! - [`format`]: Formatting of uptimes, counters and distances
//! - [`history`]: Message rate tracking across cycles
//! - [`snapshot`]: Core data models ([`StatusSnapshot`], [`FeedHealth`])
//!
//! ## Data Flow
//!
//! ```text
//! status.json + aircraft.json (+ monitor.json)
//!        │
//!        ▼
//! StatusReport (from a StatusSource)
//!        │
//!        ▼
//! StatusSnapshot::from_report()  ──or──  StatusSnapshot::unavailable()
//! ```

pub mod aircraft;
pub mod format;
pub mod history;
pub mod snapshot;

pub use aircraft::{AircraftSummary, Emergency, RangeKm, Sighting, SightingKind};
pub use history::MessageRate;
pub use snapshot::{FeedHealth, StatusReport, StatusSnapshot};
