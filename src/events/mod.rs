//! Button events.
//!
//! A [`ButtonWatcher`] samples the GPIO inputs on its own thread and hands
//! actions to the main loop through a single-slot channel: the newest
//! press wins, older unconsumed presses are dropped.

#[cfg(feature = "hardware")]
pub mod gpio;
pub mod watcher;

use std::fmt;
use std::str::FromStr;

use serde::Deserialize;
use tokio::sync::watch;

use crate::display::ClearColor;

pub use watcher::{ButtonWatcher, EdgeDetector};

/// What a button press asks the main loop to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize)]
#[serde(try_from = "String")]
pub enum ButtonAction {
    #[default]
    None,
    Clear(ClearColor),
    Refresh,
    Shutdown,
}

impl FromStr for ButtonAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "none" => Ok(ButtonAction::None),
            "clear" | "clear-white" => Ok(ButtonAction::Clear(ClearColor::White)),
            "clear-black" => Ok(ButtonAction::Clear(ClearColor::Black)),
            "refresh" => Ok(ButtonAction::Refresh),
            "shutdown" => Ok(ButtonAction::Shutdown),
            other => Err(format!(
                "unknown button action {:?} (expected none, clear-white, clear-black, refresh or shutdown)",
                other
            )),
        }
    }
}

impl TryFrom<String> for ButtonAction {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl fmt::Display for ButtonAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ButtonAction::None => write!(f, "none"),
            ButtonAction::Clear(color) => write!(f, "clear-{}", color),
            ButtonAction::Refresh => write!(f, "refresh"),
            ButtonAction::Shutdown => write!(f, "shutdown"),
        }
    }
}

/// Create the single-slot action channel.
pub fn action_channel() -> (ActionSender, ActionReceiver) {
    let (tx, rx) = watch::channel(ButtonAction::None);
    (ActionSender { tx }, ActionReceiver { rx })
}

/// Producer side, held by the button thread.
#[derive(Debug)]
pub struct ActionSender {
    tx: watch::Sender<ButtonAction>,
}

impl ActionSender {
    /// Publish `action`, replacing any press not yet consumed.
    pub fn press(&self, action: ButtonAction) {
        if action == ButtonAction::None {
            return;
        }
        self.tx.send_replace(action);
    }

    /// Whether the main loop has gone away.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Consumer side, held by the main loop.
#[derive(Debug)]
pub struct ActionReceiver {
    rx: watch::Receiver<ButtonAction>,
}

impl ActionReceiver {
    /// Take the pending action, if any.
    pub fn try_take(&mut self) -> Option<ButtonAction> {
        match self.rx.has_changed() {
            Ok(true) => Self::pending(*self.rx.borrow_and_update()),
            _ => None,
        }
    }

    /// Wait for the next action. Returns `None` once every sender is gone.
    pub async fn recv(&mut self) -> Option<ButtonAction> {
        loop {
            self.rx.changed().await.ok()?;
            if let Some(action) = Self::pending(*self.rx.borrow_and_update()) {
                return Some(action);
            }
        }
    }

    fn pending(action: ButtonAction) -> Option<ButtonAction> {
        (action != ButtonAction::None).then_some(action)
    }
}
