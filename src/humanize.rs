//! Human-readable byte sizes for configuration values such as `min_content_bytes`

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("Empty size string")]
    Empty,

    #[error("Invalid number in size '{0}'")]
    InvalidNumber(String),

    #[error("Unknown size unit '{0}'")]
    InvalidUnit(String),

    #[error("Size '{0}' does not fit in 64 bits")]
    Overflow(String),
}

const KIB: u64 = 1024;

/// Suffixes accepted by [`ByteSize::from_str`], matched case-insensitively
const UNITS: &[(&[&str], u64)] = &[
    (&["", "B"], 1),
    (&["K", "KB", "KIB"], KIB),
    (&["M", "MB", "MIB"], KIB * KIB),
    (&["G", "GB", "GIB"], KIB * KIB * KIB),
];

/// Byte count that deserializes from either an integer or a string like `"1KB"`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct ByteSize(pub u64);

impl ByteSize {
    pub const fn as_u64(&self) -> u64 {
        self.0
    }

    /// Largest whole unit that divides the value exactly, e.g. `1KB`, `1536B`
    pub fn to_human_readable(&self) -> String {
        let (label, divisor) = [("GB", KIB * KIB * KIB), ("MB", KIB * KIB), ("KB", KIB)]
            .into_iter()
            .find(|(_, d)| self.0 >= *d && self.0 % d == 0)
            .unwrap_or(("B", 1));
        format!("{}{}", self.0 / divisor, label)
    }
}

impl From<u64> for ByteSize {
    fn from(value: u64) -> Self {
        ByteSize(value)
    }
}

impl FromStr for ByteSize {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(ParseError::Empty);
        }

        let split = s.find(|c: char| !c.is_ascii_digit()).unwrap_or(s.len());
        let (digits, suffix) = s.split_at(split);
        let value: u64 = digits
            .parse()
            .map_err(|_| ParseError::InvalidNumber(s.to_string()))?;

        let suffix = suffix.trim().to_ascii_uppercase();
        let multiplier = UNITS
            .iter()
            .find(|(names, _)| names.contains(&suffix.as_str()))
            .map(|(_, m)| *m)
            .ok_or_else(|| ParseError::InvalidUnit(suffix.clone()))?;

        value
            .checked_mul(multiplier)
            .map(ByteSize)
            .ok_or_else(|| ParseError::Overflow(s.to_string()))
    }
}

impl<'de> Deserialize<'de> for ByteSize {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        struct Visitor;

        impl serde::de::Visitor<'_> for Visitor {
            type Value = ByteSize;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a non-negative byte count or a size string such as \"1KB\"")
            }

            fn visit_u64<E: serde::de::Error>(self, v: u64) -> Result<ByteSize, E> {
                Ok(ByteSize(v))
            }

            // TOML and environment overrides arrive as signed integers
            fn visit_i64<E: serde::de::Error>(self, v: i64) -> Result<ByteSize, E> {
                u64::try_from(v)
                    .map(ByteSize)
                    .map_err(|_| E::custom(format!("byte size must not be negative: {v}")))
            }

            fn visit_str<E: serde::de::Error>(self, v: &str) -> Result<ByteSize, E> {
                v.parse().map_err(E::custom)
            }
        }

        deserializer.deserialize_any(Visitor)
    }
}

impl fmt::Display for ByteSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_human_readable())
    }
}
