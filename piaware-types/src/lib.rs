//! # piaware-types
//!
//! Wire types for the documents served by a PiAware receiver and an
//! optional Flightradar24 feeder. These are the raw inputs of the status
//! display: nothing here knows about rendering or notification.
//!
//! ## Documents
//!
//! - [`PiAwareStatus`]: `status.json`, receiver OS and component health
//! - [`AircraftFeed`]: `skyaware/data/aircraft.json`, the live aircraft table
//! - [`Receiver`]: `skyaware/data/receiver.json`, the receiver location
//! - [`Fr24Monitor`]: `monitor.json` from the Flightradar24 feeder
//!
//! ## Features
//!
//! - `serde`: deserialization of the documents above via serde
//!
//! ## Example
//!
//! ```rust
//! use piaware_types::{AircraftFeed, EmergencySquawk, Position};
//!
//! let feed = AircraftFeed::builder()
//!     .now(1_700_000_000.0)
//!     .messages(120_000)
//!     .aircraft("3c6444", |a| a.flight("DLH4AB  ").squawk("7700").position(50.1, 8.6).seen(1.0))
//!     .aircraft("4b1805", |a| a.squawk("1000").seen(3.5))
//!     .build();
//!
//! assert_eq!(feed.aircraft.len(), 2);
//! assert_eq!(feed.aircraft[0].callsign(), Some("DLH4AB"));
//! assert_eq!(feed.aircraft[0].emergency(), Some(EmergencySquawk::GeneralEmergency));
//!
//! let home = Position::new(50.0, 8.5);
//! let km = home.distance_km(&feed.aircraft[0].position().unwrap());
//! assert!(km > 10.0 && km < 15.0);
//! ```

mod aircraft;
mod fr24;
mod position;
mod receiver;
mod squawk;
mod status;

pub use aircraft::{Aircraft, AircraftBuilder, AircraftFeed, AircraftFeedBuilder};
pub use fr24::Fr24Monitor;
pub use position::Position;
pub use receiver::Receiver;
pub use squawk::EmergencySquawk;
pub use status::{Component, PiAwareStatus};
