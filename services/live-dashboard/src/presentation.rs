//! Display formatting for measurements and connection status

use chrono::{DateTime, Local, TimeZone};

use crate::status::ConnectionStatus;

const TIMESTAMP_FORMAT: &str = "%d.%m.%y, %H:%M:%S";

/// Shown for the latest value while the first load is in flight
pub const LOADING: &str = "Lade…";
/// Shown for the latest value when nothing is loaded
pub const NO_DATA_LOADED: &str = "Keine Daten geladen.";
/// Shown in the table when the view is empty and not loading
pub const NO_DATA: &str = "Keine Daten vorhanden.";

/// Render a value with two decimals and a percent suffix, e.g. `3.50 %`
pub fn format_percent(value: f64) -> String {
    format!("{:.2} %", value)
}

/// Render a timestamp in local time, or verbatim if it does not parse
pub fn format_timestamp(ts: &str) -> String {
    format_timestamp_in(ts, &Local)
}

pub fn format_timestamp_in<Tz>(ts: &str, tz: &Tz) -> String
where
    Tz: TimeZone,
    Tz::Offset: std::fmt::Display,
{
    match DateTime::parse_from_rfc3339(ts) {
        Ok(parsed) => parsed
            .with_timezone(tz)
            .format(TIMESTAMP_FORMAT)
            .to_string(),
        Err(_) => ts.to_string(),
    }
}

pub fn status_label(status: ConnectionStatus) -> &'static str {
    match status {
        ConnectionStatus::Active => "aktiv",
        ConnectionStatus::Error => "Fehler",
        ConnectionStatus::Closed => "geschlossen",
        ConnectionStatus::Initializing => "verbinden…",
    }
}

/// Indicator colour: green when active, red on error, amber otherwise
pub fn status_color(status: ConnectionStatus) -> &'static str {
    match status {
        ConnectionStatus::Active => "#28a745",
        ConnectionStatus::Error => "#dc3545",
        ConnectionStatus::Closed | ConnectionStatus::Initializing => "#ffc107",
    }
}

/// Escape text for inclusion in HTML element content and attributes
pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
