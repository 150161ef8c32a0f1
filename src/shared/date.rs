//! Calendar-day keys in the backend's `YYYYMMDD` format.

use chrono::{Local, NaiveDate};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::str::FromStr;
use thiserror::Error;

/// Oldest date the history walker will request.
pub const MIN_COLLECTION_DATE: &str = "20000101";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DateKeyError {
    #[error("date key must be 8 digits, got {0:?}")]
    Format(String),
    #[error("not a calendar date: {0:?}")]
    Calendar(String),
}

/// A validated 8-digit `YYYYMMDD` date key.
///
/// Fixed width and zero padded, so string order equals date order.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DateKey(String);

impl DateKey {
    /// Parse a key, accepting `YYYYMMDD` or `YYYY-MM-DD`.
    pub fn parse(raw: &str) -> Result<Self, DateKeyError> {
        let normalized = normalize(raw);
        if normalized.len() != 8 || !normalized.bytes().all(|b| b.is_ascii_digit()) {
            return Err(DateKeyError::Format(raw.to_string()));
        }
        NaiveDate::parse_from_str(&normalized, "%Y%m%d")
            .map_err(|_| DateKeyError::Calendar(raw.to_string()))?;
        Ok(Self(normalized))
    }

    pub fn from_naive(date: NaiveDate) -> Self {
        Self(date.format("%Y%m%d").to_string())
    }

    /// [`MIN_COLLECTION_DATE`] as a key.
    pub fn min_collection() -> Self {
        Self(MIN_COLLECTION_DATE.to_string())
    }

    pub fn today() -> Self {
        Self::from_naive(Local::now().date_naive())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The chart-native calendar date.
    pub fn to_naive(&self) -> NaiveDate {
        // Validated on construction.
        NaiveDate::parse_from_str(&self.0, "%Y%m%d").unwrap_or_default()
    }

    /// The previous calendar day.
    pub fn prev_day(&self) -> Self {
        let date = self.to_naive();
        Self::from_naive(date.pred_opt().unwrap_or(date))
    }
}

/// Strip separators so `2024-03-01` and `20240301` compare equal.
pub fn normalize(raw: &str) -> String {
    raw.trim().chars().filter(|c| *c != '-').collect()
}

/// Chart-native date for a raw point key, or `None` if the key is malformed.
pub fn chart_date(raw: &str) -> Option<NaiveDate> {
    if raw.len() != 8 {
        return None;
    }
    NaiveDate::parse_from_str(raw, "%Y%m%d").ok()
}

impl std::fmt::Display for DateKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for DateKey {
    type Err = DateKeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl From<NaiveDate> for DateKey {
    fn from(date: NaiveDate) -> Self {
        Self::from_naive(date)
    }
}

impl Serialize for DateKey {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for DateKey {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        DateKey::parse(&s).map_err(serde::de::Error::custom)
    }
}
