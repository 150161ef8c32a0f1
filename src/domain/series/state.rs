//! Series cache — app-owned, SDK-provided merge logic.

use super::{ChartKind, Field, LinePoint, SeriesPoint};
use crate::shared::date::chart_date;
use crate::shared::DateKey;
use std::collections::HashSet;

/// Every point loaded so far for one chart, ascending by date.
///
/// Dates are unique. `has_more` starts true and flips to false the first
/// time an older page adds nothing new.
#[derive(Debug, Clone)]
pub struct SeriesCache {
    points: Vec<SeriesPoint>,
    oldest: Option<DateKey>,
    has_more: bool,
}

impl Default for SeriesCache {
    fn default() -> Self {
        Self {
            points: Vec::new(),
            oldest: None,
            has_more: true,
        }
    }
}

/// Result of projecting several fields at once.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Projections {
    pub series: Vec<(Field, Vec<LinePoint>)>,
    /// Requested fields that produced no points.
    pub empty: Vec<Field>,
}

impl SeriesCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the cache wholesale.
    pub fn initialize(&mut self, mut points: Vec<SeriesPoint>) {
        // Stable sort keeps the first occurrence of a duplicate date first.
        points.sort_by(|a, b| a.date.cmp(&b.date));
        points.dedup_by(|later, earlier| later.date == earlier.date);
        self.points = points;
        self.oldest = self.oldest_valid();
        self.has_more = true;
    }

    /// Merge an older page. Returns the number of points added.
    ///
    /// Only dates not already present are kept. Zero new dates marks the
    /// series exhausted.
    pub fn merge_older(&mut self, incoming: Vec<SeriesPoint>) -> usize {
        let mut seen: HashSet<String> = self.points.iter().map(|p| p.date.clone()).collect();
        let mut fresh: Vec<SeriesPoint> = incoming
            .into_iter()
            .filter(|p| seen.insert(p.date.clone()))
            .collect();

        if fresh.is_empty() {
            self.has_more = false;
            return 0;
        }

        let added = fresh.len();
        fresh.sort_by(|a, b| a.date.cmp(&b.date));

        let prepends = match (fresh.last(), self.points.first()) {
            (Some(last_new), Some(first_old)) => last_new.date < first_old.date,
            _ => true,
        };

        if prepends {
            fresh.append(&mut self.points);
            self.points = fresh;
        } else {
            self.points.append(&mut fresh);
            self.points.sort_by(|a, b| a.date.cmp(&b.date));
        }

        self.oldest = self.oldest_valid();
        added
    }

    /// Line points for one response key, ascending by date.
    ///
    /// Skips absent values and malformed date keys.
    pub fn project(&self, key: &str) -> Vec<LinePoint> {
        let mut line: Vec<LinePoint> = self
            .points
            .iter()
            .filter_map(|p| {
                let time = chart_date(&p.date)?;
                let value = p.value(key)?;
                Some(LinePoint { time, value })
            })
            .collect();
        line.sort_by_key(|p| p.time);
        line.dedup_by_key(|p| p.time);
        line
    }

    /// Project every requested field for a chart of `kind`.
    pub fn projections(&self, kind: ChartKind, fields: &[Field]) -> Projections {
        let mut out = Projections::default();
        for field in fields {
            let line = self.project(&field.wire_key(kind));
            if line.is_empty() {
                out.empty.push(*field);
            } else {
                out.series.push((*field, line));
            }
        }
        out
    }

    /// Oldest well-formed date; the anchor for the next older page.
    pub fn oldest(&self) -> Option<&DateKey> {
        self.oldest.as_ref()
    }

    /// Newest well-formed date.
    pub fn newest(&self) -> Option<DateKey> {
        self.points
            .iter()
            .rev()
            .find_map(|p| DateKey::parse(&p.date).ok())
    }

    /// Dates spanned by the most recent `n` points.
    pub fn recent_span(&self, n: usize) -> Option<(DateKey, DateKey)> {
        let start = self.points.len().saturating_sub(n);
        let tail = &self.points[start..];
        let from = tail.iter().find_map(|p| DateKey::parse(&p.date).ok())?;
        let to = tail.iter().rev().find_map(|p| DateKey::parse(&p.date).ok())?;
        Some((from, to))
    }

    pub fn has_more(&self) -> bool {
        self.has_more
    }

    pub fn points(&self) -> &[SeriesPoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }

    fn oldest_valid(&self) -> Option<DateKey> {
        self.points.iter().find_map(|p| DateKey::parse(&p.date).ok())
    }
}
