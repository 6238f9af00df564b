use crate::error::CoreError;
use chrono::{DateTime, FixedOffset, NaiveDateTime, SecondsFormat, TimeZone};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Naive layouts accepted by `FromStr` so that offset-less input can be
/// represented and then rejected at canonicalization time.
const NAIVE_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

/// A point in time as supplied by a caller.
///
/// Only the `Aware` variant can be put on the wire. A `Naive` value carries no
/// offset from UTC and is rejected by [`Timestamp::to_rfc3339`] before any
/// request is built.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Timestamp {
    Aware(DateTime<FixedOffset>),
    Naive(NaiveDateTime),
}

impl Timestamp {
    pub fn is_timezone_aware(&self) -> bool {
        matches!(self, Timestamp::Aware(_))
    }

    /// Formats the timestamp as RFC 3339 with an explicit `+HH:MM` offset.
    ///
    /// The offset the caller supplied is kept as-is; nothing is converted to the
    /// host's local zone, so the output does not depend on where it runs.
    /// Fractional seconds are only written when they are non-zero.
    pub fn to_rfc3339(&self) -> Result<String, CoreError> {
        match self {
            Timestamp::Aware(dt) => Ok(dt.to_rfc3339_opts(SecondsFormat::AutoSi, false)),
            Timestamp::Naive(naive) => Err(CoreError::InvalidTimestamp(naive.to_string())),
        }
    }

    pub fn as_aware(&self) -> Option<&DateTime<FixedOffset>> {
        match self {
            Timestamp::Aware(dt) => Some(dt),
            Timestamp::Naive(_) => None,
        }
    }
}

impl<Tz: TimeZone> From<DateTime<Tz>> for Timestamp {
    fn from(dt: DateTime<Tz>) -> Self {
        Timestamp::Aware(dt.fixed_offset())
    }
}

impl From<NaiveDateTime> for Timestamp {
    fn from(naive: NaiveDateTime) -> Self {
        Timestamp::Naive(naive)
    }
}

impl FromStr for Timestamp {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
            return Ok(Timestamp::Aware(dt));
        }
        NAIVE_FORMATS
            .iter()
            .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
            .map(Timestamp::Naive)
            .ok_or_else(|| CoreError::UnparseableTimestamp(s.to_string()))
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Timestamp::Aware(dt) => write!(f, "{}", dt.to_rfc3339_opts(SecondsFormat::AutoSi, false)),
            Timestamp::Naive(naive) => write!(f, "{} (naive)", naive),
        }
    }
}

impl Serialize for Timestamp {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let text = self.to_rfc3339().map_err(serde::ser::Error::custom)?;
        serializer.serialize_str(&text)
    }
}

impl<'de> Deserialize<'de> for Timestamp {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(serde::de::Error::custom)
    }
}
