//! E-paper rendering using embedded-graphics.
//!
//! Rendering is split in two steps so each can be tested on its own:
//!
//! - [`layout`]: pure placement of text rows and divider lines
//! - [`render`]: draws a [`layout::Layout`] into a two-plane [`Raster`]
//!
//! ## Submodules
//!
//! - [`raster`]: packed 1-bit planes implementing `DrawTarget`
//! - [`theme`]: panel geometry, fonts and spacing ([`RenderConfig`])
//! - [`export`]: debug PNG of the last frame
//!
//! ```text
//!   StatusSnapshot ──▶ layout() ──▶ Layout ──▶ draw ──▶ Raster
//!                          ▲                               │
//!                    RenderConfig                     Panel / PNG
//! ```

pub mod export;
pub mod layout;
pub mod raster;
pub mod theme;

use embedded_graphics::{
    mono_font::MonoTextStyle,
    pixelcolor::BinaryColor,
    prelude::*,
    primitives::{Line, PrimitiveStyle},
    text::{Baseline, Text},
};

pub use layout::{layout, Layout, RowKind, TextRow};
pub use raster::{Ink, Plane, Raster};
pub use theme::{FontId, RenderConfig};

use crate::data::StatusSnapshot;
use raster::infallible;

/// Render `snapshot` into a raster of exactly `config.width` x
/// `config.height`. The same inputs always give the same raster.
pub fn render(snapshot: &StatusSnapshot, config: &RenderConfig) -> Raster {
    let layout = layout(snapshot, config);
    draw(&layout, config)
}

/// Draw an already computed layout.
pub fn draw(layout: &Layout, config: &RenderConfig) -> Raster {
    let mut raster = Raster::new(config.width, config.height);

    let stroke = PrimitiveStyle::with_stroke(BinaryColor::On, 1);
    for (start, end) in &layout.lines {
        infallible(
            Line::new(*start, *end)
                .into_styled(stroke)
                .draw(raster.plane_mut(Ink::Black)),
        );
    }

    for row in &layout.rows {
        let style = MonoTextStyle::new(row.font.font(), BinaryColor::On);
        infallible(
            Text::with_baseline(&row.text, row.position, style, Baseline::Top)
                .draw(raster.plane_mut(row.ink)),
        );
    }

    raster
}
