//! Chart layer — pagination, viewport preservation and auto-sync over a
//! [`SeriesSource`], rendering into an app-provided [`ChartSurface`].
//!
//! ```text
//! ChartSession::load_initial ─▶ AutoSyncGate ─▶ SeriesCache::initialize
//! ChartSession::load_older   ─▶ SeriesCache::merge_older ─▶ ViewportPreserver
//! ```

pub mod session;
pub mod source;
pub mod sync;
pub mod trigger;
pub mod viewport;

pub use session::{ChartSession, InitialLoad};
#[cfg(feature = "http")]
pub use source::ClientSeriesSource;
pub use source::SeriesSource;
pub use sync::{AutoSyncGate, SyncDecision, SyncOutcome, SyncSkip, SyncState};
pub use trigger::{EdgeHit, EdgeTrigger};
pub use viewport::{ChartSurface, RangeFollower, ViewportError, ViewportPreserver, ViewportRange};

/// Inline banner for the user. Never blocks rendering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    Error(String),
    Warning(String),
}

impl Notice {
    pub fn message(&self) -> &str {
        match self {
            Notice::Error(m) | Notice::Warning(m) => m,
        }
    }
}

/// Why a load was not attempted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Another older-page load is running.
    InFlight,
    /// The cache has no oldest date to anchor on.
    NoAnchor,
    /// A previous older page added nothing new.
    NoMoreHistory,
    /// Nothing has been loaded yet.
    NotLoaded,
}

/// Result of a chart load.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadOutcome {
    /// Initial page stored. `points` may be zero.
    Initialized { points: usize },
    /// Older page merged.
    Merged { added: usize },
    /// Older page added nothing; no further older loads run.
    Exhausted,
    Skipped(SkipReason),
    /// Request failed. The cache is unchanged.
    Failed(String),
    /// The chart moved to another selection while this load was running.
    Superseded,
}

impl LoadOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Initialized { .. } | Self::Merged { .. } | Self::Exhausted)
    }
}
