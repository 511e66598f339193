// ⏰ Temporal Model - working windows and lifecycle timestamps
//
// Two distinct kinds of time:
// 1. Time of day: courier working hours and order delivery hours ("HH:MM-HH:MM")
// 2. Instants: assign_time / complete_time of an order (UTC)

use chrono::{DateTime, NaiveTime, SecondsFormat, SubsecRound, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

// ============================================================================
// TIME PERIOD
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PeriodError {
    #[error("expected HH:MM-HH:MM, got {0:?}")]
    Format(String),

    #[error("invalid clock time in {0:?}")]
    ClockTime(String),
}

/// One time-of-day window, e.g. `09:00-18:00`.
///
/// No date component and no cross-midnight semantics: `23:00-01:00` parses
/// to `start > end` and is compared literally.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimePeriod {
    pub start: NaiveTime,
    pub end: NaiveTime,
}

impl TimePeriod {
    /// Parse a strict `HH:MM-HH:MM` window.
    pub fn parse(s: &str) -> Result<Self, PeriodError> {
        if !has_window_shape(s) {
            return Err(PeriodError::Format(s.to_string()));
        }

        let clock = |part: &str| {
            NaiveTime::parse_from_str(part, "%H:%M")
                .map_err(|_| PeriodError::ClockTime(s.to_string()))
        };

        Ok(TimePeriod {
            start: clock(&s[0..5])?,
            end: clock(&s[6..11])?,
        })
    }

    /// Strict-inequality overlap: windows that only touch do not overlap.
    pub fn overlaps(&self, other: &TimePeriod) -> bool {
        self.start < other.end && self.end > other.start
    }
}

/// Byte-level check for `\d{2}:\d{2}-\d{2}:\d{2}` (ASCII digits only).
fn has_window_shape(s: &str) -> bool {
    let bytes = s.as_bytes();
    if bytes.len() != 11 {
        return false;
    }

    bytes.iter().enumerate().all(|(i, b)| match i {
        2 | 8 => *b == b':',
        5 => *b == b'-',
        _ => b.is_ascii_digit(),
    })
}

impl FromStr for TimePeriod {
    type Err = PeriodError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TimePeriod::parse(s)
    }
}

impl fmt::Display for TimePeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.start.format("%H:%M"), self.end.format("%H:%M"))
    }
}

impl Serialize for TimePeriod {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for TimePeriod {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        TimePeriod::parse(&raw).map_err(serde::de::Error::custom)
    }
}

// ============================================================================
// TIMESTAMPS
// ============================================================================

/// Timestamp shared by every order of one assignment batch.
///
/// Truncated to centiseconds so the value survives the wire format intact.
pub fn batch_timestamp() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(2)
}

/// Wire format: `2021-01-10T09:32:14.42Z` (two fractional digits).
pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    format!(
        "{}.{:02}Z",
        ts.format("%Y-%m-%dT%H:%M:%S"),
        ts.timestamp_subsec_millis() / 10
    )
}

/// Storage format: full-precision RFC 3339 with a `Z` suffix.
pub fn store_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

/// Accepts any RFC 3339 timestamp and normalizes it to UTC.
pub fn parse_timestamp(s: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    DateTime::parse_from_rfc3339(s).map(|dt| dt.with_timezone(&Utc))
}

/// `serialize_with` helper for optional wire timestamps.
pub fn serialize_opt_timestamp<S: Serializer>(
    ts: &Option<DateTime<Utc>>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match ts {
        Some(ts) => serializer.serialize_str(&format_timestamp(ts)),
        None => serializer.serialize_none(),
    }
}
