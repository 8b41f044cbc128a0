//! In-memory 1-bit frame buffers.
//!
//! A [`Raster`] holds one black plane and one chromatic plane (red on the
//! bi-color panel). Both planes are `embedded-graphics` draw targets, so the
//! layout can be drawn with the regular primitives and mono fonts.

use std::convert::Infallible;

use embedded_graphics::{pixelcolor::BinaryColor, prelude::*};

/// A packed 1 bit-per-pixel plane. A set bit is ink.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Plane {
    width: u32,
    height: u32,
    bits: Vec<u8>,
}

impl Plane {
    /// Create a blank (all paper) plane.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            bits: vec![0; Self::row_bytes(width) * height as usize],
        }
    }

    fn row_bytes(width: u32) -> usize {
        (width as usize).div_ceil(8)
    }

    fn index(&self, x: u32, y: u32) -> (usize, u8) {
        let byte = y as usize * Self::row_bytes(self.width) + x as usize / 8;
        let bit = 7 - (x % 8) as u8;
        (byte, bit)
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn set_pixel(&mut self, x: u32, y: u32, ink: bool) {
        if x >= self.width || y >= self.height {
            return;
        }
        let (byte, bit) = self.index(x, y);
        if ink {
            self.bits[byte] |= 1 << bit;
        } else {
            self.bits[byte] &= !(1 << bit);
        }
    }

    pub fn pixel(&self, x: u32, y: u32) -> bool {
        if x >= self.width || y >= self.height {
            return false;
        }
        let (byte, bit) = self.index(x, y);
        self.bits[byte] & (1 << bit) != 0
    }

    /// Number of inked pixels.
    pub fn ink_count(&self) -> u32 {
        self.bits.iter().map(|b| b.count_ones()).sum()
    }

    /// Whether any pixel in the row range `[top, bottom)` is inked.
    pub fn rows_have_ink(&self, top: u32, bottom: u32) -> bool {
        (top..bottom.min(self.height)).any(|y| (0..self.width).any(|x| self.pixel(x, y)))
    }

    /// The plane rotated 90 degrees clockwise.
    pub fn rotate_cw(&self) -> Plane {
        let mut rotated = Plane::new(self.height, self.width);
        for y in 0..self.height {
            for x in 0..self.width {
                if self.pixel(x, y) {
                    rotated.set_pixel(self.height - 1 - y, x, true);
                }
            }
        }
        rotated
    }

    /// Packed bits with ink as `1`.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bits
    }

    /// Row-major, MSB-first bytes with ink as `0`, the layout Waveshare
    /// controllers expect.
    pub fn to_panel_bytes(&self) -> Vec<u8> {
        let mut bytes: Vec<u8> = self.bits.iter().map(|b| !b).collect();
        // Padding bits past the right edge stay paper.
        let pad = (Self::row_bytes(self.width) * 8) as u32 - self.width;
        if pad > 0 {
            let mask = (1u8 << pad) - 1;
            for row in bytes.chunks_mut(Self::row_bytes(self.width)) {
                if let Some(last) = row.last_mut() {
                    *last |= mask;
                }
            }
        }
        bytes
    }
}

impl DrawTarget for Plane {
    type Color = BinaryColor;
    type Error = Infallible;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        for Pixel(point, color) in pixels {
            if point.x >= 0 && point.y >= 0 {
                self.set_pixel(point.x as u32, point.y as u32, color.is_on());
            }
        }
        Ok(())
    }
}

impl OriginDimensions for Plane {
    fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }
}

/// Which plane a drawing goes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ink {
    Black,
    Chromatic,
}

/// A full frame for the panel, in landscape orientation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Raster {
    pub black: Plane,
    pub chromatic: Plane,
}

impl Raster {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            black: Plane::new(width, height),
            chromatic: Plane::new(width, height),
        }
    }

    pub fn width(&self) -> u32 {
        self.black.width()
    }

    pub fn height(&self) -> u32 {
        self.black.height()
    }

    pub fn plane_mut(&mut self, ink: Ink) -> &mut Plane {
        match ink {
            Ink::Black => &mut self.black,
            Ink::Chromatic => &mut self.chromatic,
        }
    }

    /// Whether the chromatic plane carries anything.
    pub fn has_chromatic(&self) -> bool {
        self.chromatic.ink_count() > 0
    }
}

/// Unwrap the result of drawing onto a [`Plane`], which cannot fail.
pub(crate) fn infallible<T>(result: Result<T, Infallible>) -> T {
    match result {
        Ok(value) => value,
        Err(never) => match never {},
    }
}
