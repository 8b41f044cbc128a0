//! Pure layout: which text goes where.
//!
//! ```text
//! ┌──────────────────────────────────────┐
//! │ Status (OK)                          │
//! │   14.11.2023, 23:13:20               │
//! │   PiAware 9.0 is running             │
//! │   No GPS                             │
//! │   Received Mode S data recently      │
//! ├──────────────────┬───────────────────┤
//! │ Aircraft         │ Receiver          │
//! │   Aircraft: 12   │   Uptime: 1d ...  │
//! │   Positions: 9   │   CPU Load: 12%   │
//! │   MLAT: 2        │   CPU Temp: 48.3°C│
//! │   Messages/s: 45 │ Cycle: 1,234      │
//! │   Range: 1-245 km│ IP: 192.168.1.20  │
//! └──────────────────┴───────────────────┘
//! ```

use embedded_graphics::prelude::Point;

use super::raster::Ink;
use super::theme::{FontId, RenderConfig};
use crate::data::format::{format_km, format_thousands, format_uptime};
use crate::data::{FeedHealth, StatusSnapshot};

const NOT_AVAILABLE: &str = "n/a";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowKind {
    Header,
    Body,
    /// The status header while an emergency is active.
    Alert,
}

/// One line of text, top-left anchored.
#[derive(Debug, Clone, PartialEq)]
pub struct TextRow {
    pub position: Point,
    pub text: String,
    pub font: FontId,
    pub ink: Ink,
    pub kind: RowKind,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Layout {
    pub rows: Vec<TextRow>,
    /// Divider lines as (start, end), inclusive.
    pub lines: Vec<(Point, Point)>,
}

impl Layout {
    pub fn row_starting_with(&self, prefix: &str) -> Option<&TextRow> {
        self.rows.iter().find(|r| r.text.starts_with(prefix))
    }

    pub fn alert_row(&self) -> Option<&TextRow> {
        self.rows.iter().find(|r| r.kind == RowKind::Alert)
    }

    pub fn texts(&self) -> Vec<&str> {
        self.rows.iter().map(|r| r.text.as_str()).collect()
    }
}

/// Header slug: health, the FR24 link, or the active emergency.
fn status_slug(snapshot: &StatusSnapshot, config: &RenderConfig) -> (String, bool) {
    if let Some(code) = snapshot.emergency_code() {
        let count = snapshot.emergencies().len();
        return (format!("!!! SQUAWK {} (Count: {}) !!!", code, count), true);
    }

    let mut slug = snapshot.health.label().to_string();
    if snapshot.health == FeedHealth::Ok && config.show_fr24 {
        slug = format!(
            "{}, fr24: {}",
            slug,
            snapshot.fr24.as_deref().unwrap_or("unknown")
        );
    }
    (slug, false)
}

fn or_failed(value: Option<&str>, what: &str) -> String {
    match value {
        Some(v) => v.to_string(),
        None => format!("!!! Failed to get {}", what),
    }
}

fn or_na<T>(value: Option<T>, f: impl FnOnce(T) -> String) -> String {
    value.map(f).unwrap_or_else(|| NOT_AVAILABLE.to_string())
}

fn truncate(text: String, font: FontId, max_width: u32) -> String {
    let max_chars = (max_width / font.advance().max(1)) as usize;
    if text.chars().count() <= max_chars {
        text
    } else {
        text.chars().take(max_chars).collect()
    }
}

struct Builder<'a> {
    config: &'a RenderConfig,
    rows: Vec<TextRow>,
}

impl Builder<'_> {
    /// Add a row that must end before `right` (exclusive).
    fn push(&mut self, x: u32, y: u32, right: u32, text: String, font: FontId, kind: RowKind) {
        let ink = if kind == RowKind::Alert && self.config.bi_color {
            Ink::Chromatic
        } else {
            Ink::Black
        };
        self.rows.push(TextRow {
            position: Point::new(x as i32, y as i32),
            text: truncate(text, font, right.saturating_sub(x)),
            font,
            ink,
            kind,
        });
    }
}

/// Lay out `snapshot` on a panel described by `config`.
pub fn layout(snapshot: &StatusSnapshot, config: &RenderConfig) -> Layout {
    let width = config.width;
    let height = config.height;
    let divider_y = height / 2;
    let column_x = width / 2;
    let header = config.header_font;
    let body = config.body_font;

    let mut b = Builder {
        config,
        rows: Vec::new(),
    };

    // Top half: status header and receiver components.
    let (slug, alert) = status_slug(snapshot, config);
    let header_kind = if alert { RowKind::Alert } else { RowKind::Header };
    b.push(
        config.margin,
        config.margin,
        width,
        format!("Status ({})", slug),
        header,
        header_kind,
    );

    let first_row = config.margin + header.height() + 6;
    let spacing = (divider_y.saturating_sub(first_row) / 4).max(1);
    let time = snapshot
        .status_time
        .map(|t| t.format("%d.%m.%Y, %H:%M:%S").to_string());
    // An unreachable receiver leads with the reason instead of the clock.
    let first = match &snapshot.fetch_error {
        Some(reason) => format!("!!! {}", reason),
        None => or_failed(time.as_deref(), "System Time"),
    };
    let top = [
        first,
        or_failed(snapshot.piaware.as_deref(), "PiAware Status"),
        or_failed(snapshot.gps.as_deref(), "GPS Status"),
        or_failed(snapshot.radio.as_deref(), "Radio Status"),
    ];
    for (i, text) in top.into_iter().enumerate() {
        b.push(
            config.indent,
            first_row + i as u32 * spacing,
            width,
            text,
            body,
            RowKind::Body,
        );
    }

    // Bottom left: aircraft.
    let section_y = divider_y + 2;
    let body_y = section_y + header.height() + 3;
    b.push(
        config.margin,
        section_y,
        column_x,
        "Aircraft".to_string(),
        header,
        RowKind::Header,
    );

    let aircraft = snapshot.aircraft.as_ref();
    let left = [
        format!("Aircraft: {}", or_na(aircraft, |a| a.total.to_string())),
        format!(
            "Positions: {}",
            or_na(aircraft, |a| a.with_position.to_string())
        ),
        format!("MLAT: {}", or_na(aircraft, |a| a.mlat.to_string())),
        format!(
            "Messages/s: {}",
            or_na(snapshot.messages_per_second, |r| format!("{:.1}", r))
        ),
        format!(
            "Range: {}",
            or_na(aircraft.and_then(|a| a.range), |r| format!(
                "{}-{} km",
                format_km(r.min),
                format_km(r.max)
            ))
        ),
    ];
    for (i, text) in left.into_iter().enumerate() {
        b.push(
            config.indent,
            body_y + i as u32 * config.line_spacing,
            column_x,
            text,
            body,
            RowKind::Body,
        );
    }

    // Bottom right: receiver OS and display.
    b.push(
        column_x + config.margin,
        section_y,
        width,
        "Receiver".to_string(),
        header,
        RowKind::Header,
    );
    let right = [
        format!("Uptime: {}", or_na(snapshot.uptime, format_uptime)),
        format!(
            "CPU Load: {}",
            or_na(snapshot.cpu_load_percent, |l| format!("{:.0}%", l))
        ),
        format!(
            "CPU Temp: {}",
            or_na(snapshot.cpu_temp_celsius, |t| format!("{:.1}°C", t))
        ),
    ];
    for (i, text) in right.into_iter().enumerate() {
        b.push(
            column_x + config.indent,
            body_y + i as u32 * config.line_spacing,
            width,
            text,
            body,
            RowKind::Body,
        );
    }

    let ip_y = height.saturating_sub(config.margin + header.height() + 2);
    let cycle_y = ip_y.saturating_sub(config.line_spacing);
    b.push(
        column_x + config.margin,
        cycle_y,
        width,
        format!("Cycle: {}", format_thousands(snapshot.cycle)),
        header,
        RowKind::Body,
    );
    b.push(
        column_x + config.margin,
        ip_y,
        width,
        format!("IP: {}", or_na(snapshot.display_ip, |ip| ip.to_string())),
        header,
        RowKind::Body,
    );

    let last_x = width.saturating_sub(1) as i32;
    let last_y = height.saturating_sub(1) as i32;
    let lines = vec![
        (
            Point::new(0, divider_y as i32),
            Point::new(last_x, divider_y as i32),
        ),
        (
            Point::new(column_x as i32, divider_y as i32),
            Point::new(column_x as i32, last_y),
        ),
    ];

    Layout {
        rows: b.rows,
        lines,
    }
}
