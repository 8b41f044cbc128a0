//! Waveshare 2.7" (B) panel on a Raspberry Pi.
//!
//! The controller is portrait (176x264), frames are drawn in landscape and
//! rotated on the way out. GPIO lines are requested from the character
//! device on every cold `init`, so a failed bring-up can be retried.

use std::fmt;

use epd_waveshare::epd2in7b::Epd2in7b;
use epd_waveshare::prelude::*;
use linux_embedded_hal::gpio_cdev::{Chip, LineRequestFlags};
use linux_embedded_hal::spidev::{SpiModeFlags, SpidevOptions};
use linux_embedded_hal::{CdevPin, Delay, SpidevDevice};

use super::{check_geometry, ClearColor, Panel};
use crate::config::PanelSettings;
use crate::error::DriverError;
use crate::ui::{Plane, Raster};

const CONSUMER: &str = "piaware-epaper";
const SPI_SPEED_HZ: u32 = 4_000_000;

type Driver = Epd2in7b<SpidevDevice, CdevPin, CdevPin, CdevPin, Delay>;

fn io_err(e: impl fmt::Debug) -> DriverError {
    DriverError::Io(format!("{:?}", e))
}

fn init_err(e: impl fmt::Debug) -> DriverError {
    DriverError::Init(format!("{:?}", e))
}

pub struct WaveshareSpiPanel {
    settings: PanelSettings,
    spi: Option<SpidevDevice>,
    epd: Option<Driver>,
    delay: Delay,
    awake: bool,
}

impl WaveshareSpiPanel {
    pub fn new(settings: PanelSettings) -> Self {
        Self {
            settings,
            spi: None,
            epd: None,
            delay: Delay,
            awake: false,
        }
    }

    fn open_spi(&self) -> Result<SpidevDevice, DriverError> {
        let mut spi = SpidevDevice::open(&self.settings.spi_device).map_err(init_err)?;
        let options = SpidevOptions::new()
            .bits_per_word(8)
            .max_speed_hz(SPI_SPEED_HZ)
            .mode(SpiModeFlags::SPI_MODE_0)
            .build();
        spi.0.configure(&options).map_err(init_err)?;
        Ok(spi)
    }

    fn line(chip: &mut Chip, offset: u32, flags: LineRequestFlags) -> Result<CdevPin, DriverError> {
        let handle = chip
            .get_line(offset)
            .and_then(|line| line.request(flags, 0, CONSUMER))
            .map_err(init_err)?;
        CdevPin::new(handle).map_err(init_err)
    }

    fn cold_start(&mut self) -> Result<(), DriverError> {
        let mut spi = self.open_spi()?;
        let mut chip = Chip::new(&self.settings.gpio_chip).map_err(init_err)?;
        let busy = Self::line(&mut chip, self.settings.busy_pin, LineRequestFlags::INPUT)?;
        let dc = Self::line(&mut chip, self.settings.dc_pin, LineRequestFlags::OUTPUT)?;
        let rst = Self::line(&mut chip, self.settings.rst_pin, LineRequestFlags::OUTPUT)?;

        let epd = Epd2in7b::new(&mut spi, busy, dc, rst, &mut self.delay, None).map_err(init_err)?;
        self.spi = Some(spi);
        self.epd = Some(epd);
        Ok(())
    }

    fn parts(&mut self) -> Result<(&mut SpidevDevice, &mut Driver, &mut Delay), DriverError> {
        if !self.awake {
            return Err(DriverError::NotInitialized);
        }
        match (self.spi.as_mut(), self.epd.as_mut()) {
            (Some(spi), Some(epd)) => Ok((spi, epd, &mut self.delay)),
            _ => Err(DriverError::NotInitialized),
        }
    }

    /// Landscape plane to controller bytes.
    fn native(plane: &Plane) -> Plane {
        plane.rotate_cw()
    }
}

impl fmt::Debug for WaveshareSpiPanel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WaveshareSpiPanel")
            .field("spi_device", &self.settings.spi_device)
            .field("gpio_chip", &self.settings.gpio_chip)
            .field("awake", &self.awake)
            .finish_non_exhaustive()
    }
}

impl Panel for WaveshareSpiPanel {
    fn size(&self) -> (u32, u32) {
        (self.settings.width, self.settings.height)
    }

    fn init(&mut self) -> Result<(), DriverError> {
        if self.awake {
            return Ok(());
        }
        if let (Some(spi), Some(epd)) = (self.spi.as_mut(), self.epd.as_mut()) {
            epd.wake_up(spi, &mut self.delay).map_err(init_err)?;
        } else {
            self.cold_start()?;
        }
        self.awake = true;
        tracing::debug!("Panel initialised");
        Ok(())
    }

    fn display_full(&mut self, frame: &Raster) -> Result<(), DriverError> {
        check_geometry(self.size(), frame)?;
        let black = Self::native(&frame.black).to_panel_bytes();
        let chromatic = Self::native(&frame.chromatic);
        let (spi, epd, delay) = self.parts()?;
        epd.update_color_frame(spi, delay, &black, chromatic.as_bytes())
            .map_err(io_err)?;
        epd.display_frame(spi, delay).map_err(io_err)
    }

    fn display_partial(&mut self, frame: &Raster) -> Result<(), DriverError> {
        check_geometry(self.size(), frame)?;
        let black = Self::native(&frame.black).to_panel_bytes();
        let (spi, epd, delay) = self.parts()?;
        epd.update_achromatic_frame(spi, delay, &black)
            .map_err(io_err)?;
        epd.display_frame(spi, delay).map_err(io_err)
    }

    fn clear(&mut self, color: ClearColor) -> Result<(), DriverError> {
        let (width, height) = self.size();
        let mut fill = Plane::new(height, width);
        if color == ClearColor::Black {
            for y in 0..width {
                for x in 0..height {
                    fill.set_pixel(x, y, true);
                }
            }
        }
        let black = fill.to_panel_bytes();
        let chromatic = Plane::new(height, width);
        let (spi, epd, delay) = self.parts()?;
        epd.update_color_frame(spi, delay, &black, chromatic.as_bytes())
            .map_err(io_err)?;
        epd.display_frame(spi, delay).map_err(io_err)
    }

    fn sleep(&mut self) -> Result<(), DriverError> {
        let (spi, epd, delay) = match self.parts() {
            Ok(parts) => parts,
            Err(_) => return Ok(()),
        };
        epd.sleep(spi, delay).map_err(io_err)?;
        self.awake = false;
        tracing::debug!("Panel asleep");
        Ok(())
    }
}
