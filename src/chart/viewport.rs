//! Chart surface seam, viewport capture/restore, range linking.

use crate::domain::series::{Field, LinePoint};
use crate::shared::DateKey;
use chrono::NaiveDate;
use thiserror::Error;

/// Visible date span, in the chart's native dates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ViewportRange {
    pub from: NaiveDate,
    pub to: NaiveDate,
}

impl ViewportRange {
    pub fn new(from: NaiveDate, to: NaiveDate) -> Self {
        Self { from, to }
    }

    pub fn from_keys(from: &DateKey, to: &DateKey) -> Self {
        Self::new(from.to_naive(), to.to_naive())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("cannot apply visible range: {0}")]
pub struct ViewportError(pub String);

/// What the SDK needs from a rendered chart.
pub trait ChartSurface {
    fn visible_range(&self) -> Option<ViewportRange>;

    /// May fail, e.g. when the range lies outside the loaded data.
    fn set_visible_range(&mut self, range: ViewportRange) -> Result<(), ViewportError>;

    fn fit_content(&mut self);

    /// Replace one line's data.
    fn set_series(&mut self, field: Field, points: &[LinePoint]);
}

/// Apply `range`, falling back to fit-to-content. Returns whether the
/// range itself was applied.
pub fn apply_or_fit(surface: &mut dyn ChartSurface, range: Option<ViewportRange>) -> bool {
    let Some(range) = range else {
        surface.fit_content();
        return false;
    };
    match surface.set_visible_range(range) {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!(error = %e, "Falling back to fit content");
            surface.fit_content();
            false
        }
    }
}

/// Keeps the user's view fixed while older points are prepended.
#[derive(Debug, Clone, Copy, Default)]
pub struct ViewportPreserver {
    captured: Option<ViewportRange>,
}

impl ViewportPreserver {
    pub fn capture(surface: &dyn ChartSurface) -> Self {
        Self {
            captured: surface.visible_range(),
        }
    }

    pub fn captured(&self) -> Option<ViewportRange> {
        self.captured
    }

    /// Reapply the captured range verbatim; fit to content if that fails.
    /// Nothing captured means nothing to restore.
    pub fn restore(&self, surface: &mut dyn ChartSurface) -> bool {
        match self.captured {
            Some(range) => apply_or_fit(surface, Some(range)),
            None => false,
        }
    }
}

/// Subscriber side of one-directional range linking between two charts.
///
/// A range equal to the last one applied is ignored, so an echo from the
/// follower's own change handler cannot loop back.
#[derive(Debug, Clone, Default)]
pub struct RangeFollower {
    last_applied: Option<ViewportRange>,
}

impl RangeFollower {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mirror the leader's range onto `surface`. Returns whether anything
    /// was applied.
    pub fn follow(&mut self, surface: &mut dyn ChartSurface, range: ViewportRange) -> bool {
        if self.last_applied == Some(range) {
            return false;
        }
        match surface.set_visible_range(range) {
            Ok(()) => {
                self.last_applied = Some(range);
                true
            }
            Err(e) => {
                tracing::debug!(error = %e, "Follower could not apply range");
                false
            }
        }
    }

    pub fn reset(&mut self) {
        self.last_applied = None;
    }
}
