//! Timestamp parsing and formatting
//!
//! The warehouse returns timestamps in several partial ISO-8601 shapes. All of
//! them are read as naive UTC.

use crate::error::RecordError;
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, Utc};

/// Format used when writing timestamps back to the store
pub const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

const NAIVE_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

/// Parse a full or partial ISO-8601 timestamp
///
/// Offsets are converted to UTC; date-only values are midnight.
pub fn parse_timestamp(value: &str) -> Result<NaiveDateTime, RecordError> {
    let value = value.trim();

    if let Ok(with_offset) = value.parse::<DateTime<FixedOffset>>() {
        return Ok(with_offset.naive_utc());
    }

    for format in NAIVE_FORMATS {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(value, format) {
            return Ok(parsed);
        }
    }

    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .ok_or_else(|| RecordError::InvalidTimestamp(value.to_string()))
}

/// Format a timestamp with [`DATETIME_FORMAT`]
pub fn format_timestamp(timestamp: NaiveDateTime) -> String {
    timestamp.format(DATETIME_FORMAT).to_string()
}

/// Current wall-clock time as naive UTC
pub fn now_utc() -> NaiveDateTime {
    Utc::now().naive_utc()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d).unwrap().and_hms_opt(h, min, s).unwrap()
    }

    #[test]
    fn test_partial_iso_shapes() {
        let expected = at(2024, 1, 1, 10, 30, 0);
        assert_eq!(parse_timestamp("2024-01-01T10:30:00").unwrap(), expected);
        assert_eq!(parse_timestamp("2024-01-01 10:30:00").unwrap(), expected);
        assert_eq!(parse_timestamp("2024-01-01T10:30").unwrap(), expected);
        assert_eq!(parse_timestamp(" 2024-01-01 10:30 ").unwrap(), expected);
    }

    #[test]
    fn test_fractional_seconds_are_kept() {
        let parsed = parse_timestamp("2024-01-01 10:30:00.250").unwrap();
        assert_eq!(parsed.and_utc().timestamp_subsec_millis(), 250);
    }

    #[test]
    fn test_offset_is_converted_to_utc() {
        assert_eq!(
            parse_timestamp("2024-01-01T12:30:00+02:00").unwrap(),
            at(2024, 1, 1, 10, 30, 0)
        );
        assert_eq!(parse_timestamp("2024-01-01T10:30:00Z").unwrap(), at(2024, 1, 1, 10, 30, 0));
    }

    #[test]
    fn test_date_only_is_midnight() {
        assert_eq!(parse_timestamp("2024-03-05").unwrap(), at(2024, 3, 5, 0, 0, 0));
    }

    #[test]
    fn test_garbage_is_rejected() {
        assert!(matches!(
            parse_timestamp("last tuesday"),
            Err(RecordError::InvalidTimestamp(_))
        ));
    }

    #[test]
    fn test_format_round_trip() {
        let ts = at(2024, 1, 1, 2, 0, 0);
        assert_eq!(format_timestamp(ts), "2024-01-01 02:00:00");
        assert_eq!(parse_timestamp(&format_timestamp(ts)).unwrap(), ts);
    }
}
