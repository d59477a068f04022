//! Cell-level parsing for accident exports.
//!
//! Every function here is total: malformed input yields `None` and the
//! caller decides whether that drops the row or nulls a field.

use chrono::{NaiveDate, NaiveDateTime};
use road_safety_accident_models::AccidentSeverity;

/// Timestamp layouts seen in accident exports, tried in order.
const START_TIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
];

/// Returns the trimmed cell, or `None` if it is missing or blank.
#[must_use]
pub fn non_empty(cell: Option<&str>) -> Option<&str> {
    let trimmed = cell?.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed)
    }
}

/// Parses a start timestamp. Bare dates are taken as midnight.
#[must_use]
pub fn parse_start_time(s: &str) -> Option<NaiveDateTime> {
    for format in START_TIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, format) {
            return Some(dt);
        }
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

/// Parses a coordinate. Returns `None` if unparseable or not finite.
#[must_use]
pub fn parse_coordinate(s: &str) -> Option<f64> {
    s.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Parses a severity level, accepting integral floats such as `"2.0"`.
#[must_use]
pub fn parse_severity(s: &str) -> Option<AccidentSeverity> {
    let value = s.parse::<u8>().ok().or_else(|| {
        let float = s.parse::<f64>().ok()?;
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        (float.fract() == 0.0 && (0.0..=f64::from(u8::MAX)).contains(&float))
            .then_some(float as u8)
    })?;
    AccidentSeverity::from_value(value).ok()
}
