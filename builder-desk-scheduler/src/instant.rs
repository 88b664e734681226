//! Millisecond instants with one canonical serialization.
//!
//! Slot starts travel through JSON and the database before they come back as
//! lookup keys, so every instant is truncated to whole milliseconds when it is
//! constructed and compared with [`Instant::is_within`] instead of `==`
//! whenever the value may have crossed a serialization boundary.

use core::fmt;
use core::ops::{Add, Sub};
use core::str::FromStr;

use chrono::{DateTime, Duration, SecondsFormat, SubsecRound, TimeZone, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::ScheduleError;

/// Tolerance used when matching slot starts that were stored and reloaded.
pub const DEFAULT_TOLERANCE_MS: i64 = 1000;

#[must_use]
pub fn default_tolerance() -> Duration {
    Duration::milliseconds(DEFAULT_TOLERANCE_MS)
}

#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Instant(DateTime<Utc>);

impl Instant {
    #[must_use]
    pub fn from_datetime<Tz: TimeZone>(datetime: &DateTime<Tz>) -> Self {
        Self(datetime.with_timezone(&Utc).trunc_subsecs(3))
    }

    #[must_use]
    pub fn now() -> Self {
        Self::from_datetime(&Utc::now())
    }

    /// Accepts RFC 3339 with any offset.
    pub fn parse(input: &str) -> Result<Self, ScheduleError> {
        DateTime::parse_from_rfc3339(input.trim())
            .map(|datetime| Self::from_datetime(&datetime))
            .map_err(|error| ScheduleError::UnparsableTimestamp {
                input: input.to_owned(),
                reason: error.to_string(),
            })
    }

    /// The canonical key form, e.g. `2024-05-01T09:00:00.000Z`.
    #[must_use]
    pub fn normalize(self) -> String {
        self.0.to_rfc3339_opts(SecondsFormat::Millis, true)
    }

    #[must_use]
    pub const fn as_datetime(self) -> DateTime<Utc> {
        self.0
    }

    #[must_use]
    pub fn timestamp_millis(self) -> i64 {
        self.0.timestamp_millis()
    }

    /// `|self - other| < tolerance`
    #[must_use]
    pub fn is_within(self, other: Self, tolerance: Duration) -> bool {
        (self.0 - other.0).abs() < tolerance
    }
}

/// Tolerance-matched equality with the default one second window.
#[must_use]
pub fn same_instant(a: Instant, b: Instant) -> bool {
    a.is_within(b, default_tolerance())
}

impl From<DateTime<Utc>> for Instant {
    fn from(value: DateTime<Utc>) -> Self {
        Self::from_datetime(&value)
    }
}

impl From<Instant> for DateTime<Utc> {
    fn from(value: Instant) -> Self {
        value.0
    }
}

impl Add<Duration> for Instant {
    type Output = Self;

    fn add(self, rhs: Duration) -> Self::Output {
        Self::from_datetime(&(self.0 + rhs))
    }
}

impl Sub<Duration> for Instant {
    type Output = Self;

    fn sub(self, rhs: Duration) -> Self::Output {
        Self::from_datetime(&(self.0 - rhs))
    }
}

impl Sub for Instant {
    type Output = Duration;

    fn sub(self, rhs: Self) -> Self::Output {
        self.0 - rhs.0
    }
}

impl fmt::Display for Instant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.normalize())
    }
}

impl fmt::Debug for Instant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Instant({})", self.normalize())
    }
}

impl FromStr for Instant {
    type Err = ScheduleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for Instant {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.normalize())
    }
}

impl<'de> Deserialize<'de> for Instant {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        Self::parse(&text).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_offsets_to_utc_millis() {
        let instant = Instant::parse("2024-05-01T11:00:00.123456+02:00").unwrap();
        assert_eq!(instant.normalize(), "2024-05-01T09:00:00.123Z");
    }

    #[test]
    fn rejects_garbage() {
        assert!(matches!(
            Instant::parse("yesterday"),
            Err(ScheduleError::UnparsableTimestamp { .. })
        ));
    }

    #[test]
    fn tolerance_is_exclusive() {
        let a = Instant::parse("2024-05-01T09:00:00.000Z").unwrap();
        assert!(same_instant(a, a + Duration::milliseconds(999)));
        assert!(same_instant(a + Duration::milliseconds(999), a));
        assert!(!same_instant(a, a + Duration::milliseconds(1000)));
    }

    #[test]
    fn serializes_as_canonical_string() {
        let instant = Instant::parse("2024-05-01T09:30:00Z").unwrap();
        let json = serde_json::to_string(&instant).unwrap();
        assert_eq!(json, "\"2024-05-01T09:30:00.000Z\"");
        let back: Instant = serde_json::from_str(&json).unwrap();
        assert_eq!(back, instant);
    }
}
