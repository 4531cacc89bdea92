use std::fmt;
use std::num::NonZeroU32;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Numeric identifier of a catalog entry. Always greater than zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AppId(NonZeroU32);

impl AppId {
    /// Wrap a raw id, rejecting zero.
    pub fn new(raw: u32) -> Option<Self> {
        NonZeroU32::new(raw).map(Self)
    }

    /// Coerce a loosely typed id (signed or wide) into an `AppId`.
    ///
    /// Values that are zero, negative or do not fit in 32 bits are rejected.
    pub fn from_i64(raw: i64) -> Option<Self> {
        u32::try_from(raw).ok().and_then(Self::new)
    }

    pub fn get(self) -> u32 {
        self.0.get()
    }
}

impl fmt::Display for AppId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Error returned when parsing an `AppId` from a string fails.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid app id: '{0}'")]
pub struct AppIdParseError(pub String);

impl FromStr for AppId {
    type Err = AppIdParseError;

    /// Parses a decimal id, tolerating surrounding whitespace.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .parse::<i64>()
            .ok()
            .and_then(Self::from_i64)
            .ok_or_else(|| AppIdParseError(s.to_string()))
    }
}
