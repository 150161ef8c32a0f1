//! Collection domain — KOSPI200 batch stream and single-stock history walk.

#[cfg(feature = "http")]
pub mod client;
pub mod sse;
pub mod stream;
pub mod walker;
pub mod wire;

use serde::{Deserialize, Serialize};

#[cfg(feature = "http")]
pub use client::ClientCollectionSource;
pub use sse::SseDecoder;
pub use stream::{BatchAbort, BatchRun, BatchRunState};
pub use walker::{
    CollectionSource, HistoryWalker, PhaseEnd, WalkPhase, WalkProgress, WalkReport, WalkTotals,
    WalkerConfig,
};
pub use wire::{BatchProgress, BatchRequest};

/// Dates received for one collection request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayFetch {
    /// Newly stored.
    pub saved: Vec<String>,
    /// Already present.
    pub duplicates: Vec<String>,
}

impl DayFetch {
    pub fn received(&self) -> usize {
        self.saved.len() + self.duplicates.len()
    }

    /// Oldest received date, by key order.
    pub fn oldest(&self) -> Option<&str> {
        self.saved
            .iter()
            .chain(self.duplicates.iter())
            .map(String::as_str)
            .min()
    }
}

impl From<wire::FetchStatusResponse> for DayFetch {
    fn from(wire: wire::FetchStatusResponse) -> Self {
        Self {
            saved: wire.saved_dates,
            duplicates: wire.duplicate_dates,
        }
    }
}
