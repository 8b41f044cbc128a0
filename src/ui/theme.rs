//! Render configuration: panel geometry, fonts and spacing.

use std::fmt;
use std::str::FromStr;

use embedded_graphics::mono_font::{iso_8859_1, MonoFont};

use crate::config::Settings;

/// One of the bundled ISO 8859-1 mono fonts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FontId {
    Font5x8,
    Font6x10,
    Font6x12,
    Font6x13,
    Font7x13,
}

impl FontId {
    pub fn font(&self) -> &'static MonoFont<'static> {
        match self {
            FontId::Font5x8 => &iso_8859_1::FONT_5X8,
            FontId::Font6x10 => &iso_8859_1::FONT_6X10,
            FontId::Font6x12 => &iso_8859_1::FONT_6X12,
            FontId::Font6x13 => &iso_8859_1::FONT_6X13,
            FontId::Font7x13 => &iso_8859_1::FONT_7X13,
        }
    }

    /// Horizontal advance per character in pixels.
    pub fn advance(&self) -> u32 {
        let font = self.font();
        font.character_size.width + font.character_spacing
    }

    pub fn height(&self) -> u32 {
        self.font().character_size.height
    }
}

impl FromStr for FontId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "5x8" => Ok(FontId::Font5x8),
            "6x10" => Ok(FontId::Font6x10),
            "6x12" => Ok(FontId::Font6x12),
            "6x13" => Ok(FontId::Font6x13),
            "7x13" => Ok(FontId::Font7x13),
            other => Err(format!(
                "unknown font {:?} (expected 5x8, 6x10, 6x12, 6x13 or 7x13)",
                other
            )),
        }
    }
}

impl fmt::Display for FontId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let size = self.font().character_size;
        write!(f, "{}x{}", size.width, size.height)
    }
}

/// Everything the renderer needs besides the snapshot. Read-only after
/// startup.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderConfig {
    pub width: u32,
    pub height: u32,
    /// Draw alerts on the chromatic plane.
    pub bi_color: bool,
    pub header_font: FontId,
    pub body_font: FontId,
    pub margin: u32,
    pub indent: u32,
    pub line_spacing: u32,
    /// Show the Flightradar24 status in the header.
    pub show_fr24: bool,
}

impl Default for RenderConfig {
    /// Waveshare 2.7" in landscape.
    fn default() -> Self {
        Self {
            width: 264,
            height: 176,
            bi_color: false,
            header_font: FontId::Font6x10,
            body_font: FontId::Font6x12,
            margin: 4,
            indent: 8,
            line_spacing: 13,
            show_fr24: false,
        }
    }
}

impl RenderConfig {
    pub fn from_settings(settings: &Settings) -> Result<Self, String> {
        Ok(Self {
            width: settings.panel.width,
            height: settings.panel.height,
            bi_color: settings.panel.bi_color,
            header_font: settings.layout.header_font.parse()?,
            body_font: settings.layout.body_font.parse()?,
            margin: settings.layout.margin,
            indent: settings.layout.indent,
            line_spacing: settings.layout.line_spacing,
            show_fr24: settings.enable_fr24,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_font() {
        assert_eq!("6x10".parse::<FontId>(), Ok(FontId::Font6x10));
        assert_eq!(" 7X13 ".parse::<FontId>(), Ok(FontId::Font7x13));
        assert!("10x20".parse::<FontId>().is_err());
    }

    #[test]
    fn test_font_metrics() {
        assert_eq!(FontId::Font6x12.advance(), 6);
        assert_eq!(FontId::Font6x10.height(), 10);
        assert_eq!(FontId::Font5x8.to_string(), "5x8");
    }

    #[test]
    fn test_from_default_settings() {
        let config = RenderConfig::from_settings(&Settings::default()).unwrap();
        assert_eq!(config, RenderConfig::default());
    }
}
