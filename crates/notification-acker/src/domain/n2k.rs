//! Actisense serial-format lines for the NMEA 2000 output channel.

use chrono::{DateTime, SecondsFormat, Utc};

/// Prefix a message body with its timestamp: `"<ISO-8601>,<body>"`.
///
/// The timestamp is UTC with millisecond precision and a `Z` suffix.
#[must_use]
pub fn actisense_line(body: &str, at: DateTime<Utc>) -> String {
    format!("{},{}", at.to_rfc3339_opts(SecondsFormat::Millis, true), body)
}
