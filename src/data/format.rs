//! Formatting helpers for the display rows.

use std::time::Duration;

/// Format an uptime as `3d 04:05:06`, or `04:05:06` below one day.
pub fn format_uptime(uptime: Duration) -> String {
    let secs = uptime.as_secs();
    let days = secs / 86_400;
    let hours = (secs % 86_400) / 3600;
    let minutes = (secs % 3600) / 60;
    let seconds = secs % 60;

    if days > 0 {
        format!("{}d {:02}:{:02}:{:02}", days, hours, minutes, seconds)
    } else {
        format!("{:02}:{:02}:{:02}", hours, minutes, seconds)
    }
}

/// Format an integer with `,` thousands separators.
pub fn format_thousands(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

/// Format a distance in kilometres with one decimal.
pub fn format_km(km: f64) -> String {
    format!("{:.1}", km)
}

/// Format a distance for notifications: `12.34 km`, or `unknown`.
pub fn format_distance(km: Option<f64>) -> String {
    match km {
        Some(km) => format!("{:.2} km", km),
        None => "unknown".to_string(),
    }
}
