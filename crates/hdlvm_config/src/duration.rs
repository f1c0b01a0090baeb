//! Human-readable simulation durations.

use crate::error::ConfigError;
use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer};
use std::fmt;

const UNITS: [(&str, u64); 6] = [
    ("fs", 1),
    ("ps", 1_000),
    ("ns", 1_000_000),
    ("us", 1_000_000_000),
    ("ms", 1_000_000_000_000),
    ("s", 1_000_000_000_000_000),
];

/// Parses `"100ns"` or `"100 ns"` into femtoseconds.
pub fn parse_duration(s: &str) -> Result<u64, ConfigError> {
    let s = s.trim();
    let invalid = || ConfigError::InvalidDuration(s.to_string());

    let digit_end = s.find(|c: char| !c.is_ascii_digit()).unwrap_or(s.len());
    if digit_end == 0 {
        return Err(invalid());
    }
    let number: u64 = s[..digit_end].parse().map_err(|_| invalid())?;
    let unit = s[digit_end..].trim();
    let multiplier = UNITS
        .iter()
        .find(|(name, _)| *name == unit)
        .map(|(_, m)| *m)
        .ok_or_else(invalid)?;
    number.checked_mul(multiplier).ok_or_else(invalid)
}

/// A duration in femtoseconds.
///
/// Deserializes from a string with a unit (`"10 ns"`) or from a bare
/// integer, which is taken as femtoseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct Duration(pub u64);

impl Duration {
    /// Femtoseconds.
    pub fn fs(self) -> u64 {
        self.0
    }
}

impl fmt::Display for Duration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0 == 0 {
            return f.write_str("0 fs");
        }
        let (name, m) = UNITS
            .iter()
            .rev()
            .find(|(_, m)| self.0 % m == 0)
            .copied()
            .unwrap_or(("fs", 1));
        write!(f, "{} {name}", self.0 / m)
    }
}

impl<'de> Deserialize<'de> for Duration {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct DurationVisitor;

        impl<'de> Visitor<'de> for DurationVisitor {
            type Value = Duration;

            fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
                formatter.write_str("a duration such as \"10 ns\" or an integer in femtoseconds")
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
                parse_duration(v).map(Duration).map_err(E::custom)
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<Self::Value, E> {
                u64::try_from(v)
                    .map(Duration)
                    .map_err(|_| E::custom(format!("negative duration {v}")))
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<Self::Value, E> {
                Ok(Duration(v))
            }
        }

        deserializer.deserialize_any(DurationVisitor)
    }
}
