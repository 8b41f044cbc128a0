//! In-memory panel.

use std::sync::Arc;

use parking_lot::Mutex;

use super::{check_geometry, ClearColor, Panel};
use crate::error::DriverError;
use crate::ui::Raster;

/// A call received by a [`SimulatedPanel`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PanelCall {
    Init,
    DisplayFull { black_ink: u32, chromatic_ink: u32 },
    DisplayPartial { black_ink: u32 },
    Clear(ClearColor),
    Sleep,
}

#[derive(Debug, Default)]
struct State {
    calls: Vec<PanelCall>,
    frame: Option<Raster>,
    initialized: bool,
    init_failures: u32,
    fail_frames: bool,
}

/// A panel that keeps the last frame in memory and records every call.
///
/// Clones share the same state, so a test can keep a handle while the main
/// loop owns the panel.
#[derive(Debug, Clone)]
pub struct SimulatedPanel {
    width: u32,
    height: u32,
    state: Arc<Mutex<State>>,
}

impl SimulatedPanel {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            state: Arc::new(Mutex::new(State::default())),
        }
    }

    /// Make the next `n` calls to `init` fail.
    pub fn fail_init(&self, n: u32) {
        self.state.lock().init_failures = n;
    }

    /// Make frame updates fail until reset.
    pub fn fail_frames(&self, fail: bool) {
        self.state.lock().fail_frames = fail;
    }

    pub fn calls(&self) -> Vec<PanelCall> {
        self.state.lock().calls.clone()
    }

    /// The frame currently "on the glass".
    pub fn frame(&self) -> Option<Raster> {
        self.state.lock().frame.clone()
    }

    fn ready(&self, state: &State) -> Result<(), DriverError> {
        if !state.initialized {
            return Err(DriverError::NotInitialized);
        }
        if state.fail_frames {
            return Err(DriverError::Io("simulated transfer failure".to_string()));
        }
        Ok(())
    }
}

impl Panel for SimulatedPanel {
    fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn init(&mut self) -> Result<(), DriverError> {
        let mut state = self.state.lock();
        state.calls.push(PanelCall::Init);
        if state.init_failures > 0 {
            state.init_failures -= 1;
            return Err(DriverError::Init("simulated panel did not respond".to_string()));
        }
        state.initialized = true;
        Ok(())
    }

    fn display_full(&mut self, frame: &Raster) -> Result<(), DriverError> {
        check_geometry(self.size(), frame)?;
        let mut state = self.state.lock();
        self.ready(&state)?;
        state.calls.push(PanelCall::DisplayFull {
            black_ink: frame.black.ink_count(),
            chromatic_ink: frame.chromatic.ink_count(),
        });
        state.frame = Some(frame.clone());
        Ok(())
    }

    fn display_partial(&mut self, frame: &Raster) -> Result<(), DriverError> {
        check_geometry(self.size(), frame)?;
        let mut state = self.state.lock();
        self.ready(&state)?;
        state.calls.push(PanelCall::DisplayPartial {
            black_ink: frame.black.ink_count(),
        });
        // The chromatic plane is left as it was.
        let mut shown = state
            .frame
            .take()
            .unwrap_or_else(|| Raster::new(self.width, self.height));
        shown.black = frame.black.clone();
        state.frame = Some(shown);
        Ok(())
    }

    fn clear(&mut self, color: ClearColor) -> Result<(), DriverError> {
        let mut state = self.state.lock();
        self.ready(&state)?;
        state.calls.push(PanelCall::Clear(color));
        let mut blank = Raster::new(self.width, self.height);
        if color == ClearColor::Black {
            for y in 0..self.height {
                for x in 0..self.width {
                    blank.black.set_pixel(x, y, true);
                }
            }
        }
        state.frame = Some(blank);
        Ok(())
    }

    fn sleep(&mut self) -> Result<(), DriverError> {
        let mut state = self.state.lock();
        state.calls.push(PanelCall::Sleep);
        state.initialized = false;
        Ok(())
    }
}
