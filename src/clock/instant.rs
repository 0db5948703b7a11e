//! Instants accepted by `freeze`, and how strings are turned into them.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A malformed instant string.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid instant {input:?}: {reason}")]
pub struct ClockParseError {
    /// The string as given.
    pub input: String,
    /// What the parser expected.
    pub reason: String,
}

/// How instant strings are interpreted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum TimeFormat {
    /// ISO-8601 / RFC 3339; a trailing `Z` means UTC.
    #[default]
    #[serde(rename = "iso", alias = "iso8601")]
    Iso8601,
    /// RFC 2822 (`Mon, 01 Jan 2024 12:00:00 +0000`).
    #[serde(rename = "rfc2822")]
    Rfc2822,
    /// Seconds since the Unix epoch, optionally fractional.
    #[serde(rename = "unix")]
    UnixSeconds,
}

/// The instant to freeze at: already resolved, or text still to parse.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FreezeAt {
    /// A resolved instant; its offset is what `now()` reports.
    Instant(DateTime<FixedOffset>),
    /// Text parsed according to a [`TimeFormat`] on use.
    Text(String),
}

impl FreezeAt {
    /// Resolve to a concrete instant.
    ///
    /// # Errors
    ///
    /// Returns [`ClockParseError`] if the text does not match `format`.
    pub fn resolve(&self, format: TimeFormat) -> Result<DateTime<FixedOffset>, ClockParseError> {
        match self {
            Self::Instant(instant) => Ok(*instant),
            Self::Text(text) => parse(text, format),
        }
    }
}

impl From<&str> for FreezeAt {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for FreezeAt {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<DateTime<FixedOffset>> for FreezeAt {
    fn from(value: DateTime<FixedOffset>) -> Self {
        Self::Instant(value)
    }
}

impl From<DateTime<Utc>> for FreezeAt {
    fn from(value: DateTime<Utc>) -> Self {
        Self::Instant(value.fixed_offset())
    }
}

/// Naive date-times are taken as UTC.
impl From<NaiveDateTime> for FreezeAt {
    fn from(value: NaiveDateTime) -> Self {
        Self::Instant(value.and_utc().fixed_offset())
    }
}

/// Parse `text` as an instant in the given format.
///
/// # Errors
///
/// Returns [`ClockParseError`] describing the expected shape.
pub fn parse(text: &str, format: TimeFormat) -> Result<DateTime<FixedOffset>, ClockParseError> {
    let trimmed = text.trim();
    let parsed = match format {
        TimeFormat::Iso8601 => parse_iso(trimmed),
        TimeFormat::Rfc2822 => DateTime::parse_from_rfc2822(trimmed).ok(),
        TimeFormat::UnixSeconds => parse_unix(trimmed),
    };
    parsed.ok_or_else(|| ClockParseError {
        input: text.to_string(),
        reason: match format {
            TimeFormat::Iso8601 => "expected an ISO-8601 date or date-time".to_string(),
            TimeFormat::Rfc2822 => "expected an RFC 2822 date-time".to_string(),
            TimeFormat::UnixSeconds => "expected seconds since the Unix epoch".to_string(),
        },
    })
}

const OFFSET_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S%.f%:z", "%Y-%m-%dT%H:%M%:z"];
const NAIVE_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"];

fn parse_iso(text: &str) -> Option<DateTime<FixedOffset>> {
    let normalized = match text.strip_suffix('Z').or_else(|| text.strip_suffix('z')) {
        Some(head) => format!("{head}+00:00"),
        None => text.to_string(),
    };

    if let Ok(instant) = DateTime::parse_from_rfc3339(&normalized) {
        return Some(instant);
    }
    if let Some(instant) =
        OFFSET_FORMATS.iter().find_map(|f| DateTime::parse_from_str(&normalized, f).ok())
    {
        return Some(instant);
    }
    if let Some(naive) =
        NAIVE_FORMATS.iter().find_map(|f| NaiveDateTime::parse_from_str(&normalized, f).ok())
    {
        return Some(naive.and_utc().fixed_offset());
    }
    NaiveDate::parse_from_str(&normalized, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|midnight| midnight.and_utc().fixed_offset())
}

fn parse_unix(text: &str) -> Option<DateTime<FixedOffset>> {
    let negative = text.starts_with('-');
    let (secs, frac) = text.split_once('.').unwrap_or((text, ""));
    let secs: i64 = secs.parse().ok()?;
    if frac.len() > 9 || !frac.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let nanos: u32 = if frac.is_empty() { 0 } else { format!("{frac:0<9}").parse().ok()? };
    let instant = if negative && nanos > 0 {
        // -1.5 is 1.5 seconds before the epoch
        DateTime::from_timestamp(secs.checked_sub(1)?, 1_000_000_000 - nanos)
    } else {
        DateTime::from_timestamp(secs, nanos)
    };
    instant.map(|t| t.fixed_offset())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    fn iso(text: &str) -> DateTime<FixedOffset> {
        parse(text, TimeFormat::Iso8601).unwrap()
    }

    #[test]
    fn trailing_z_is_utc() {
        let t = iso("2024-01-01T12:00:00Z");
        assert_eq!(t.offset().local_minus_utc(), 0);
        assert_eq!(t.to_rfc3339(), "2024-01-01T12:00:00+00:00");
    }

    #[test]
    fn explicit_offset_is_preserved() {
        let t = iso("2024-06-15T10:30:00+02:00");
        assert_eq!(t.offset().local_minus_utc(), 7200);
        assert_eq!(t.with_timezone(&Utc).hour(), 8);
    }

    #[test]
    fn fractional_seconds_and_short_forms() {
        assert_eq!(iso("2024-01-01T12:00:00.250Z").nanosecond(), 250_000_000);
        assert_eq!(iso("2024-01-01T12:00+01:00").minute(), 0);
        assert_eq!(iso("2024-01-01T12:30").minute(), 30);
        assert_eq!(iso("2024-01-01 08:15:00").hour(), 8);
    }

    #[test]
    fn naive_and_date_only_are_utc() {
        let naive = iso("2024-03-10T09:00:00");
        assert_eq!(naive.offset().local_minus_utc(), 0);
        let date = iso("2024-03-10");
        assert_eq!((date.year(), date.month(), date.day(), date.hour()), (2024, 3, 10, 0));
    }

    #[test]
    fn malformed_iso_is_rejected() {
        let err = parse("not-a-date", TimeFormat::Iso8601).unwrap_err();
        assert_eq!(err.input, "not-a-date");
        assert!(err.to_string().contains("ISO-8601"));
        assert!(parse("2024-13-01T00:00:00Z", TimeFormat::Iso8601).is_err());
    }

    #[test]
    fn rfc2822_format() {
        let t = parse("Mon, 01 Jan 2024 12:00:00 +0000", TimeFormat::Rfc2822).unwrap();
        assert_eq!(t, iso("2024-01-01T12:00:00Z"));
        assert!(parse("2024-01-01T12:00:00Z", TimeFormat::Rfc2822).is_err());
    }

    #[test]
    fn unix_seconds_format() {
        let t = parse("1704110400", TimeFormat::UnixSeconds).unwrap();
        assert_eq!(t, iso("2024-01-01T12:00:00Z"));
        let frac = parse("1704110400.5", TimeFormat::UnixSeconds).unwrap();
        assert_eq!(frac.nanosecond(), 500_000_000);
        let before_epoch = parse("-1.5", TimeFormat::UnixSeconds).unwrap();
        assert_eq!(before_epoch.timestamp(), -2);
        assert_eq!(before_epoch.nanosecond(), 500_000_000);
        assert!(parse("12abc", TimeFormat::UnixSeconds).is_err());
        assert!(parse("-9223372036854775808.5", TimeFormat::UnixSeconds).is_err());
    }

    #[test]
    fn resolved_instants_skip_parsing() {
        let at = FreezeAt::from(iso("2024-01-01T00:00:00Z"));
        assert_eq!(at.resolve(TimeFormat::UnixSeconds).unwrap(), iso("2024-01-01T00:00:00Z"));
    }

    #[test]
    fn time_format_names() {
        let f: TimeFormat = serde_json::from_value(serde_json::json!("iso")).unwrap();
        assert_eq!(f, TimeFormat::Iso8601);
        let f: TimeFormat = serde_json::from_value(serde_json::json!("iso8601")).unwrap();
        assert_eq!(f, TimeFormat::Iso8601);
        let f: TimeFormat = serde_json::from_value(serde_json::json!("unix")).unwrap();
        assert_eq!(f, TimeFormat::UnixSeconds);
    }
}
