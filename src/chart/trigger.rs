//! Edge detection for prefetching older history while panning.

use chrono::NaiveDate;
use std::time::{Duration, Instant};

/// Why the trigger fired.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeHit {
    /// The visible range starts within the near-edge band.
    NearEdge,
    /// Repeated pans while pinned against the oldest point.
    Gesture,
}

/// Decides when a visible-range change should load an older page.
///
/// Position is `(visible_from - oldest) / (newest - oldest) * 100`.
/// Inside the 5% band every event fires. Inside the 1% band a counter of
/// consecutive events fires once it exceeds three, then resets.
#[derive(Debug, Clone)]
pub struct EdgeTrigger {
    near_edge_pct: f64,
    pinned_pct: f64,
    pinned_events: u32,
    log_every: Duration,
    consecutive_pinned: u32,
    last_log: Option<Instant>,
}

impl Default for EdgeTrigger {
    fn default() -> Self {
        Self {
            near_edge_pct: 5.0,
            pinned_pct: 1.0,
            pinned_events: 3,
            log_every: Duration::from_secs(1),
            consecutive_pinned: 0,
            last_log: None,
        }
    }
}

impl EdgeTrigger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Position of `visible_from` within `[oldest, newest]`, in percent.
    /// `None` when the loaded span is empty or inverted.
    pub fn position_pct(visible_from: NaiveDate, oldest: NaiveDate, newest: NaiveDate) -> Option<f64> {
        let total = (newest - oldest).num_days();
        if total <= 0 {
            return None;
        }
        let distance = (visible_from - oldest).num_days();
        Some(distance as f64 / total as f64 * 100.0)
    }

    pub fn observe(
        &mut self,
        visible_from: NaiveDate,
        oldest: NaiveDate,
        newest: NaiveDate,
    ) -> Option<EdgeHit> {
        self.observe_at(visible_from, oldest, newest, Instant::now())
    }

    pub fn observe_at(
        &mut self,
        visible_from: NaiveDate,
        oldest: NaiveDate,
        newest: NaiveDate,
        now: Instant,
    ) -> Option<EdgeHit> {
        let pct = Self::position_pct(visible_from, oldest, newest)?;
        let distance = (visible_from - oldest).num_days();

        let should_log = self
            .last_log
            .map_or(true, |at| now.duration_since(at) > self.log_every);
        if should_log {
            tracing::debug!(pct = %format!("{:.1}", pct), "Visible range moved");
            self.last_log = Some(now);
        }

        let mut hit = None;
        if pct < self.near_edge_pct && distance >= 0 {
            hit = Some(EdgeHit::NearEdge);
        }

        if pct < self.pinned_pct {
            self.consecutive_pinned += 1;
            if self.consecutive_pinned > self.pinned_events {
                self.consecutive_pinned = 0;
                hit = hit.or(Some(EdgeHit::Gesture));
            }
        } else {
            self.consecutive_pinned = 0;
        }

        if let Some(hit) = hit {
            tracing::debug!(pct = %format!("{:.1}", pct), hit = ?hit, "Edge reached, loading older history");
        }
        hit
    }

    pub fn reset(&mut self) {
        self.consecutive_pinned = 0;
    }
}
