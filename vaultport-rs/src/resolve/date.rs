//! Date parsing and formatting.
//!
//! Source dates arrive as epoch seconds, epoch milliseconds, RFC 3339
//! strings or plain `YYYY-MM-DD` strings. Everything is normalised to UTC.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Timelike, Utc};
use serde_json::Value;

/// Epoch values at or above this magnitude are milliseconds.
const MILLIS_THRESHOLD: f64 = 1e12;

/// Parse a raw value into a UTC instant.
pub fn parse_datetime(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::Number(n) => n.as_f64().and_then(from_epoch),
        Value::String(s) => parse_datetime_str(s),
        _ => None,
    }
}

fn from_epoch(raw: f64) -> Option<DateTime<Utc>> {
    if !raw.is_finite() {
        return None;
    }
    let millis = if raw.abs() >= MILLIS_THRESHOLD {
        raw as i64
    } else {
        (raw * 1000.0) as i64
    };
    Utc.timestamp_millis_opt(millis).single()
}

fn parse_datetime_str(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }

    if let Ok(raw) = s.parse::<f64>() {
        return from_epoch(raw);
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }

    for format in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, format) {
            return Some(Utc.from_utc_datetime(&naive));
        }
    }

    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .map(start_of_day)
}

/// Midnight UTC at the start of `date`.
pub fn start_of_day(date: NaiveDate) -> DateTime<Utc> {
    Utc.from_utc_datetime(&date.and_time(NaiveTime::MIN))
}

/// `YYYY-MM-DD`.
pub fn format_date(dt: &DateTime<Utc>) -> String {
    dt.format("%Y-%m-%d").to_string()
}

/// Date-only when the instant falls on midnight, full timestamp otherwise.
pub fn format_instant(dt: &DateTime<Utc>) -> String {
    if dt.num_seconds_from_midnight() == 0 {
        format_date(dt)
    } else {
        dt.format("%Y-%m-%dT%H:%M:%S").to_string()
    }
}

/// Render a raw date value as `YYYY-MM-DD`, or `None` when unparseable.
pub fn normalize_date(value: &Value) -> Option<String> {
    parse_datetime(value).map(|dt| format_date(&dt))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_epoch_seconds() {
        assert_eq!(normalize_date(&json!(1710496800)), Some("2024-03-15".to_string()));
    }

    #[test]
    fn test_epoch_millis() {
        assert_eq!(normalize_date(&json!(1710496800000_i64)), Some("2024-03-15".to_string()));
    }

    #[test]
    fn test_numeric_string() {
        assert_eq!(normalize_date(&json!("1710496800")), Some("2024-03-15".to_string()));
    }

    #[test]
    fn test_rfc3339_converted_to_utc() {
        assert_eq!(
            normalize_date(&json!("2024-03-15T23:30:00-02:00")),
            Some("2024-03-16".to_string())
        );
    }

    #[test]
    fn test_plain_date() {
        assert_eq!(normalize_date(&json!("2024-03-15")), Some("2024-03-15".to_string()));
    }

    #[test]
    fn test_unparseable() {
        assert_eq!(normalize_date(&json!("next tuesday")), None);
        assert_eq!(normalize_date(&json!(null)), None);
        assert_eq!(normalize_date(&json!(["2024-03-15"])), None);
    }

    #[test]
    fn test_format_instant() {
        let midnight = parse_datetime(&json!("2024-03-15")).unwrap();
        assert_eq!(format_instant(&midnight), "2024-03-15");
        let later = parse_datetime(&json!("2024-03-15T23:59:59Z")).unwrap();
        assert_eq!(format_instant(&later), "2024-03-15T23:59:59");
    }
}
