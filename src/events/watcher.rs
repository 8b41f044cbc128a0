//! GPIO button polling with debounce.

use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use embedded_hal::digital::InputPin;

use super::{ActionSender, ButtonAction};

/// Falling-edge detector for an active-low button.
///
/// A level change is accepted only if the previous accepted change is at
/// least `debounce` old. Only the press edge reports `true`.
#[derive(Debug, Clone)]
pub struct EdgeDetector {
    pressed: bool,
    last_change: Option<Instant>,
    debounce: Duration,
}

impl EdgeDetector {
    pub fn new(debounce: Duration) -> Self {
        Self {
            pressed: false,
            last_change: None,
            debounce,
        }
    }

    /// Feed the current level, `true` when the pin reads low.
    pub fn update(&mut self, is_low: bool, now: Instant) -> bool {
        if is_low == self.pressed {
            return false;
        }
        if let Some(last) = self.last_change {
            if now.saturating_duration_since(last) < self.debounce {
                return false;
            }
        }
        self.pressed = is_low;
        self.last_change = Some(now);
        is_low
    }
}

struct Button<P> {
    pin: P,
    action: ButtonAction,
    edge: EdgeDetector,
    read_failed: bool,
}

/// Samples a set of buttons and publishes their actions.
pub struct ButtonWatcher<P> {
    buttons: Vec<Button<P>>,
    sender: ActionSender,
    poll_interval: Duration,
    debounce: Duration,
}

impl<P: InputPin> ButtonWatcher<P> {
    pub fn new(sender: ActionSender, poll_interval: Duration, debounce: Duration) -> Self {
        Self {
            buttons: Vec::new(),
            sender,
            poll_interval,
            debounce,
        }
    }

    /// Add a button. Pins bound to [`ButtonAction::None`] are sampled but
    /// never publish anything.
    pub fn bind(mut self, pin: P, action: ButtonAction) -> Self {
        self.buttons.push(Button {
            pin,
            action,
            edge: EdgeDetector::new(self.debounce),
            read_failed: false,
        });
        self
    }

    pub fn len(&self) -> usize {
        self.buttons.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buttons.is_empty()
    }

    /// Sample every button once and publish new presses. Returns the
    /// actions pressed in this sample, in binding order.
    pub fn poll_once(&mut self, now: Instant) -> Vec<ButtonAction> {
        let mut pressed = Vec::new();
        for button in &mut self.buttons {
            let is_low = match button.pin.is_low() {
                Ok(level) => {
                    button.read_failed = false;
                    level
                }
                Err(e) => {
                    if !button.read_failed {
                        tracing::warn!(action = %button.action, "Could not read button: {:?}", e);
                        button.read_failed = true;
                    }
                    false
                }
            };

            if button.edge.update(is_low, now) && button.action != ButtonAction::None {
                tracing::info!(action = %button.action, "Button pressed");
                self.sender.press(button.action);
                pressed.push(button.action);
            }
        }
        pressed
    }

    /// Poll until the receiving side is dropped.
    pub fn run(mut self) {
        tracing::debug!(buttons = self.buttons.len(), "Watching buttons");
        while !self.sender.is_closed() {
            self.poll_once(Instant::now());
            thread::sleep(self.poll_interval);
        }
        tracing::debug!("Button watcher stopped");
    }
}

impl<P: InputPin + Send + 'static> ButtonWatcher<P> {
    /// Run the watcher on a dedicated thread.
    pub fn spawn(self) -> std::io::Result<JoinHandle<()>> {
        thread::Builder::new()
            .name("buttons".to_string())
            .spawn(move || self.run())
    }
}
