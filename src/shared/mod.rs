//! Shared newtypes and utilities used across all domain modules.
//!
//! These types are serialization-transparent: they serialize/deserialize identically
//! to the raw format the backend sends, so they can be used directly in wire types
//! without conversion overhead.

pub mod date;
pub mod debounce;
pub mod period;
pub mod serde_util;

pub use date::{DateKey, DateKeyError, MIN_COLLECTION_DATE};
pub use debounce::Debouncer;
pub use period::Period;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::str::FromStr;

// ─── Identity ────────────────────────────────────────────────────────────────

/// Newtype for the code a series is keyed by: a six-digit stock code
/// (e.g. `"005930"`) or a sector code.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct Identity(String);

impl Identity {
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether this looks like a stock code (exactly six ASCII digits).
    pub fn is_stock_code(&self) -> bool {
        is_stock_code(&self.0)
    }
}

/// Six ASCII digits, after trimming.
pub fn is_stock_code(s: &str) -> bool {
    let s = s.trim();
    s.len() == 6 && s.bytes().all(|b| b.is_ascii_digit())
}

impl std::fmt::Display for Identity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for Identity {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for Identity {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl FromStr for Identity {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Identity(s.to_string()))
    }
}

impl Serialize for Identity {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for Identity {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Ok(Identity(s))
    }
}
