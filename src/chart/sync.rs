//! Auto-sync gate: recompute a statistic once per observed raw max date.

use super::Notice;
use crate::shared::{DateKey, Identity};

/// Shown when a recompute succeeded but the re-fetched chart is still behind.
pub const NOT_UPDATED_MESSAGE: &str =
    "Calculation finished but the chart is still behind the raw data. Check the server.";

/// Shown when the backend failed a recompute without a message.
pub const RECOMPUTE_FAILED_MESSAGE: &str = "Calculation failed";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SyncState {
    #[default]
    Unknown,
    Checking,
    InSync,
    Stale,
    Syncing,
    Resolved,
    SyncFailed,
}

/// Why a check did not start a sync.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncSkip {
    /// No raw boundary to compare against.
    NoRawBoundary,
    InSync,
    /// Stale, but a sync for this raw max was already requested.
    AlreadyRequested,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncDecision {
    Skip(SyncSkip),
    /// Recompute, then re-fetch and call [`AutoSyncGate::finish`].
    Sync { boundary: DateKey },
}

/// How a started sync ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    /// Backend reported success and the chart was re-fetched.
    Recomputed {
        updated_max_date: Option<DateKey>,
        new_chart_max: Option<DateKey>,
    },
    /// Backend answered with `success = false`.
    BackendFailed(Option<String>),
    /// The recompute or the re-fetch never got an answer.
    TransportFailed(String),
}

/// True when the chart is missing or strictly older than the raw data.
pub fn needs_sync(chart_max: Option<&DateKey>, raw_max: &DateKey) -> bool {
    chart_max.map_or(true, |chart| chart < raw_max)
}

#[derive(Debug, Clone, Default)]
pub struct AutoSyncGate {
    state: SyncState,
    /// The guard below belongs to this identity.
    identity: Option<Identity>,
    last_requested_raw_max: Option<DateKey>,
}

impl AutoSyncGate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> SyncState {
        self.state
    }

    pub fn last_requested(&self) -> Option<&DateKey> {
        self.last_requested_raw_max.as_ref()
    }

    pub fn identity(&self) -> Option<&Identity> {
        self.identity.as_ref()
    }

    /// Point the gate at `identity`. Switching to a different identity
    /// clears the guard; rebinding the same one keeps it.
    pub fn bind(&mut self, identity: &Identity) {
        if self.identity.as_ref() == Some(identity) {
            return;
        }
        *self = Self {
            identity: Some(identity.clone()),
            ..Self::default()
        };
    }

    /// Compare the newest chart date to the raw boundary. Starting a sync
    /// records the boundary in the guard.
    pub fn check(&mut self, chart_max: Option<&DateKey>, raw_max: Option<&DateKey>) -> SyncDecision {
        self.state = SyncState::Checking;
        let Some(raw_max) = raw_max else {
            self.state = SyncState::Unknown;
            return SyncDecision::Skip(SyncSkip::NoRawBoundary);
        };

        if !needs_sync(chart_max, raw_max) {
            self.state = SyncState::InSync;
            return SyncDecision::Skip(SyncSkip::InSync);
        }

        tracing::info!(
            chart_max = ?chart_max.map(|d| d.as_str()),
            raw_max = raw_max.as_str(),
            "Chart is behind raw data"
        );

        if self.last_requested_raw_max.as_ref() == Some(raw_max) {
            self.state = SyncState::Stale;
            return SyncDecision::Skip(SyncSkip::AlreadyRequested);
        }

        self.last_requested_raw_max = Some(raw_max.clone());
        self.state = SyncState::Syncing;
        SyncDecision::Sync {
            boundary: raw_max.clone(),
        }
    }

    /// Settle a sync started by [`check`](Self::check). Failures clear the
    /// guard so a later load can retry.
    pub fn finish(&mut self, boundary: &DateKey, outcome: SyncOutcome) -> Option<Notice> {
        match outcome {
            SyncOutcome::Recomputed {
                updated_max_date,
                new_chart_max,
            } => {
                if updated_max_date.as_ref() == Some(boundary) {
                    tracing::info!(updated = boundary.as_str(), "Backend reports latest date applied");
                    self.resolve(boundary)
                } else if new_chart_max.as_ref().is_some_and(|max| max >= boundary) {
                    self.resolve(boundary)
                } else {
                    tracing::warn!(
                        boundary = boundary.as_str(),
                        chart_max = ?new_chart_max.as_ref().map(|d| d.as_str()),
                        "Chart still behind after recompute"
                    );
                    self.fail();
                    Some(Notice::Warning(NOT_UPDATED_MESSAGE.to_string()))
                }
            }
            SyncOutcome::BackendFailed(message) => {
                let message = message
                    .filter(|m| !m.is_empty())
                    .unwrap_or_else(|| RECOMPUTE_FAILED_MESSAGE.to_string());
                tracing::warn!(message = %message, "Recompute failed");
                self.fail();
                Some(Notice::Warning(message))
            }
            SyncOutcome::TransportFailed(error) => {
                tracing::error!(error = %error, "Recompute request failed");
                self.fail();
                None
            }
        }
    }

    fn resolve(&mut self, boundary: &DateKey) -> Option<Notice> {
        self.last_requested_raw_max = Some(boundary.clone());
        self.state = SyncState::Resolved;
        None
    }

    fn fail(&mut self) {
        self.last_requested_raw_max = None;
        self.state = SyncState::SyncFailed;
    }
}
