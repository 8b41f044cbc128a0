//! Display driver adapter.
//!
//! The main loop talks to the panel only through [`Panel`]. Two
//! implementations exist:
//!
//! - [`SimulatedPanel`]: records calls in memory, used by `--simulate` and
//!   the tests
//! - `WaveshareSpiPanel` (feature `hardware`): the Waveshare 2.7" panel
//!   over SPI and GPIO character devices

pub mod simulated;
#[cfg(feature = "hardware")]
pub mod waveshare;

use std::fmt;
use std::str::FromStr;

use crate::error::DriverError;
use crate::ui::Raster;

pub use simulated::{PanelCall, SimulatedPanel};
#[cfg(feature = "hardware")]
pub use waveshare::WaveshareSpiPanel;

/// Fill color for [`Panel::clear`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ClearColor {
    Black,
    #[default]
    White,
}

impl FromStr for ClearColor {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "black" => Ok(ClearColor::Black),
            "white" => Ok(ClearColor::White),
            other => Err(format!("unknown clear color {:?}", other)),
        }
    }
}

impl fmt::Display for ClearColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClearColor::Black => write!(f, "black"),
            ClearColor::White => write!(f, "white"),
        }
    }
}

/// How a frame is pushed to the panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshMode {
    /// Full waveform, clears ghosting. Slow and flickers.
    Full,
    /// Quick update of the black plane only.
    Partial,
}

/// An e-paper panel.
///
/// Calls block until the panel is idle again. `init` wakes a sleeping panel
/// and must come before any frame is sent.
pub trait Panel: Send + fmt::Debug {
    /// Panel geometry in landscape orientation as `(width, height)`.
    fn size(&self) -> (u32, u32);

    fn init(&mut self) -> Result<(), DriverError>;

    fn display_full(&mut self, frame: &Raster) -> Result<(), DriverError>;

    fn display_partial(&mut self, frame: &Raster) -> Result<(), DriverError>;

    fn clear(&mut self, color: ClearColor) -> Result<(), DriverError>;

    /// Put the panel into deep sleep. The image stays visible.
    fn sleep(&mut self) -> Result<(), DriverError>;

    /// Push `frame` with the given mode.
    fn display(&mut self, frame: &Raster, mode: RefreshMode) -> Result<(), DriverError> {
        match mode {
            RefreshMode::Full => self.display_full(frame),
            RefreshMode::Partial => self.display_partial(frame),
        }
    }
}

/// Reject frames that do not match the panel.
pub(crate) fn check_geometry(size: (u32, u32), frame: &Raster) -> Result<(), DriverError> {
    let (width, height) = size;
    if frame.width() == width && frame.height() == height {
        Ok(())
    } else {
        Err(DriverError::Geometry {
            width,
            height,
            got_width: frame.width(),
            got_height: frame.height(),
        })
    }
}
