//! String formatting helpers.

use chrono::{DateTime, Local, Utc};

/// Epoch milliseconds as local "YYYY-MM-DD HH:MM"; "never" for 0.
pub fn format_timestamp(ms: i64) -> String {
    if ms <= 0 {
        return "never".to_string();
    }
    match DateTime::<Utc>::from_timestamp_millis(ms) {
        Some(dt) => dt.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string(),
        None => ms.to_string(),
    }
}

/// Rating values print without a trailing ".0" when integral.
pub fn format_value(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{:.2}", value)
    }
}

pub fn format_percent(pct: f64) -> String {
    format!("{:.0}%", pct)
}

/// Truncate to `max` characters, ending with "..." when cut.
pub fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let keep = max.saturating_sub(3);
    let mut out: String = text.chars().take(keep).collect();
    out.push_str("...");
    out
}
