//! Buttons on the Linux GPIO character device.

use std::time::Duration;

use linux_embedded_hal::gpio_cdev::{Chip, LineRequestFlags};
use linux_embedded_hal::CdevPin;

use super::{ActionSender, ButtonWatcher};
use crate::config::ButtonSettings;
use crate::error::DriverError;

const CONSUMER: &str = "piaware-epaper-buttons";

/// Request every bound line on `chip_path` as an input.
pub fn open_buttons(
    chip_path: &str,
    settings: &ButtonSettings,
    sender: ActionSender,
) -> Result<ButtonWatcher<CdevPin>, DriverError> {
    let mut chip = Chip::new(chip_path).map_err(|e| DriverError::Init(e.to_string()))?;
    let mut watcher = ButtonWatcher::new(
        sender,
        Duration::from_millis(settings.poll_interval_ms),
        Duration::from_millis(settings.debounce_ms),
    );

    for binding in &settings.bindings {
        let handle = chip
            .get_line(binding.pin)
            .and_then(|line| line.request(LineRequestFlags::INPUT, 0, CONSUMER))
            .map_err(|e| DriverError::Init(format!("GPIO {}: {}", binding.pin, e)))?;
        let pin = CdevPin::new(handle)
            .map_err(|e| DriverError::Init(format!("GPIO {}: {:?}", binding.pin, e)))?;
        tracing::debug!(pin = binding.pin, action = %binding.action, "Button bound");
        watcher = watcher.bind(pin, binding.action);
    }

    Ok(watcher)
}
