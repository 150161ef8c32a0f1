//! Aggregation periods and the load/visible window sizes derived from them.

use serde::{Deserialize, Serialize};

/// Moving-statistic window, in trading days (e.g. 5/10/20/60-day average).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Period(pub u32);

impl Period {
    /// Periods offered by the moving-average charts.
    pub const SUPPORTED: [u32; 10] = [5, 10, 20, 30, 40, 50, 60, 90, 120, 140];

    /// Trading days requested by an older-history page.
    pub const OLDER_PAGE_DAYS: u32 = 1000;

    pub fn new(days: u32) -> Self {
        Self(days)
    }

    pub fn days(&self) -> u32 {
        self.0
    }

    pub fn is_supported(&self) -> bool {
        Self::SUPPORTED.contains(&self.0)
    }

    /// Raw days fetched on initial load. Longer periods need more history so
    /// the statistic is meaningful at the visible window's left edge.
    pub fn load_days(&self) -> u32 {
        match self.0 {
            5 | 10 => 750,
            20..=60 => 1000,
            _ => 1500,
        }
    }

    /// Most recent points shown on first render.
    pub fn visible_days(&self) -> u32 {
        match self.0 {
            5 => 250,
            10 => 375,
            20..=60 => 500,
            _ => 750,
        }
    }
}

impl Default for Period {
    fn default() -> Self {
        Self(20)
    }
}

impl std::fmt::Display for Period {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
