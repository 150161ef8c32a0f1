//! Backward day-by-day history collection for one stock.

use super::DayFetch;
use crate::domain::series::{DateRange, RecomputeResult};
use crate::domain::statistics::RecomputeKind;
use crate::error::SdkError;
use crate::shared::{DateKey, Identity};

use async_trait::async_trait;
use std::time::Duration;

/// Backend operations the walker drives.
#[async_trait]
pub trait CollectionSource: Send + Sync {
    /// Ask the trading API for data ending at `dt` and store it.
    async fn fetch_day(&self, code: &Identity, dt: &DateKey) -> Result<DayFetch, SdkError>;

    /// Span of raw data already stored.
    async fn date_range(&self, code: &Identity) -> Result<DateRange, SdkError>;

    async fn recompute(
        &self,
        kind: RecomputeKind,
        code: &Identity,
    ) -> Result<RecomputeResult, SdkError>;
}

/// Walker limits and pacing.
#[derive(Debug, Clone)]
pub struct WalkerConfig {
    /// Request cap across both phases.
    pub max_requests: u32,
    /// Pause (and refresh the stored range) after this many requests.
    pub pause_every: u32,
    pub pause: Duration,
    /// Rebuild statistics once both phases are done.
    pub recompute_after: bool,
}

impl Default for WalkerConfig {
    fn default() -> Self {
        Self {
            max_requests: 200,
            pause_every: 5,
            pause: Duration::from_secs(2),
            recompute_after: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalkPhase {
    /// Older than the stored start date.
    Past,
    /// From today back to the stored end date.
    Recent,
}

/// Why a phase stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhaseEnd {
    /// The trading API returned nothing for the requested date.
    NoData,
    /// Past phase reached the oldest collectible date.
    MinDate,
    /// Recent phase joined up with stored data.
    Connected,
    /// A request failed; see `error_dates`.
    Error,
    RequestLimit,
    /// A received date could not be parsed as a date key.
    BadDate,
}

/// Cumulative counters, updated after every request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WalkTotals {
    pub requests: u32,
    pub received: usize,
    pub saved: usize,
    pub duplicates: usize,
    pub errors: usize,
}

/// Progress snapshot passed to the observer after every request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalkProgress {
    pub phase: WalkPhase,
    pub date: DateKey,
    pub round: DayFetch,
    pub totals: WalkTotals,
    /// Stored range, when it was refreshed after this request.
    pub stored_range: Option<DateRange>,
}

/// Everything a finished walk did.
#[derive(Debug, Clone, Default)]
pub struct WalkReport {
    pub totals: WalkTotals,
    pub saved_dates: Vec<String>,
    pub duplicate_dates: Vec<String>,
    /// `"{date}: {message}"` per failed request.
    pub error_dates: Vec<String>,
    pub past_end: Option<PhaseEnd>,
    pub recent_end: Option<PhaseEnd>,
    pub statistics: Vec<(RecomputeKind, bool)>,
    /// Latest stored range seen during collection.
    pub stored_range: Option<DateRange>,
    /// Stored range after the walk.
    pub final_range: Option<DateRange>,
}

/// Fills a stock's history backwards one request at a time.
pub struct HistoryWalker<S> {
    source: S,
    config: WalkerConfig,
}

impl<S: CollectionSource> HistoryWalker<S> {
    pub fn new(source: S) -> Self {
        Self::with_config(source, WalkerConfig::default())
    }

    pub fn with_config(source: S, config: WalkerConfig) -> Self {
        Self { source, config }
    }

    pub fn config(&self) -> &WalkerConfig {
        &self.config
    }

    /// Run both phases for `code`, starting the recent phase at today.
    pub async fn run<F>(&self, code: &Identity, observer: F) -> WalkReport
    where
        F: FnMut(&WalkProgress) + Send,
    {
        self.run_from(code, DateKey::today(), observer).await
    }

    /// Run both phases with an explicit "today".
    pub async fn run_from<F>(&self, code: &Identity, today: DateKey, mut observer: F) -> WalkReport
    where
        F: FnMut(&WalkProgress) + Send,
    {
        let mut report = WalkReport::default();

        let initial = self.probe_range(code).await;
        let past_start = initial
            .as_ref()
            .and_then(|r| r.start.as_ref())
            .map(DateKey::prev_day)
            .unwrap_or_else(|| today.clone());

        tracing::info!(stock = %code, start = %past_start, "Collecting past history");
        let past_end = self
            .walk(code, WalkPhase::Past, past_start, None, &mut report, &mut observer)
            .await;
        report.past_end = Some(past_end);

        let refreshed = self.probe_range(code).await;
        let joined_at = refreshed
            .as_ref()
            .and_then(|r| r.end.clone())
            .or_else(|| initial.as_ref().and_then(|r| r.end.clone()))
            .unwrap_or_else(DateKey::min_collection);

        tracing::info!(stock = %code, until = %joined_at, "Collecting recent history");
        let recent_end = self
            .walk(
                code,
                WalkPhase::Recent,
                today,
                Some(joined_at),
                &mut report,
                &mut observer,
            )
            .await;
        report.recent_end = Some(recent_end);

        if self.config.recompute_after {
            for kind in RecomputeKind::ALL {
                let ok = match self.source.recompute(kind, code).await {
                    Ok(result) => result.success,
                    Err(e) => {
                        tracing::warn!(stock = %code, kind = %kind, error = %e, "Recompute failed");
                        report.totals.errors += 1;
                        false
                    }
                };
                report.statistics.push((kind, ok));
            }
        }

        report.final_range = self.probe_range(code).await;
        tracing::info!(
            stock = %code,
            requests = report.totals.requests,
            saved = report.totals.saved,
            duplicates = report.totals.duplicates,
            errors = report.totals.errors,
            "History walk finished"
        );
        report
    }

    /// One phase. `joined_at` set ⇒ recent phase, which stops once the
    /// oldest received date reaches it.
    async fn walk<F>(
        &self,
        code: &Identity,
        phase: WalkPhase,
        start: DateKey,
        joined_at: Option<DateKey>,
        report: &mut WalkReport,
        observer: &mut F,
    ) -> PhaseEnd
    where
        F: FnMut(&WalkProgress) + Send,
    {
        let min_date = DateKey::min_collection();
        let mut dt = start;

        loop {
            if report.totals.requests >= self.config.max_requests {
                tracing::warn!(stock = %code, phase = ?phase, "Request limit reached");
                return PhaseEnd::RequestLimit;
            }
            report.totals.requests += 1;
            let requested = dt.clone();

            let day = match self.source.fetch_day(code, &dt).await {
                Ok(day) => day,
                Err(e) => {
                    tracing::error!(stock = %code, date = %dt, error = %e, "Collection request failed");
                    report.totals.errors += 1;
                    report.error_dates.push(format!("{}: {}", dt, e));
                    return PhaseEnd::Error;
                }
            };

            report.totals.received += day.received();
            report.totals.saved += day.saved.len();
            report.totals.duplicates += day.duplicates.len();
            report.saved_dates.extend(day.saved.iter().cloned());
            report.duplicate_dates.extend(day.duplicates.iter().cloned());

            let end = match day.oldest() {
                None => Some(PhaseEnd::NoData),
                Some(_) if joined_at.is_none() && dt <= min_date => Some(PhaseEnd::MinDate),
                Some(oldest) => match DateKey::parse(oldest) {
                    Ok(oldest) => match &joined_at {
                        Some(joined) if &oldest <= joined => Some(PhaseEnd::Connected),
                        _ => {
                            dt = oldest.prev_day();
                            None
                        }
                    },
                    Err(e) => {
                        tracing::warn!(stock = %code, error = %e, "Unparseable collected date");
                        Some(PhaseEnd::BadDate)
                    }
                },
            };

            let every = self.config.pause_every.max(1);
            let pausing = report.totals.requests % every == 0 || end.is_some();
            let stored_range = if pausing {
                self.probe_range(code).await
            } else {
                None
            };
            if let Some(range) = &stored_range {
                tracing::debug!(
                    stock = %code,
                    start = ?range.start.as_ref().map(|d| d.as_str()),
                    end = ?range.end.as_ref().map(|d| d.as_str()),
                    "Stored range refreshed"
                );
                report.stored_range = Some(range.clone());
            }

            observer(&WalkProgress {
                phase,
                date: requested,
                round: day,
                totals: report.totals.clone(),
                stored_range,
            });

            if pausing && end.is_none() && !self.config.pause.is_zero() {
                futures_timer::Delay::new(self.config.pause).await;
            }

            if let Some(end) = end {
                tracing::debug!(stock = %code, phase = ?phase, end = ?end, "Phase finished");
                return end;
            }
        }
    }

    async fn probe_range(&self, code: &Identity) -> Option<DateRange> {
        match self.source.date_range(code).await {
            Ok(range) => Some(range),
            Err(e) => {
                tracing::warn!(stock = %code, error = %e, "Date range probe failed");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;
    use std::sync::Mutex;

    /// Trading API simulation: every calendar day in `available` has data;
    /// each request returns up to `per_request` days ending at `dt`.
    struct FakeSource {
        available: (String, String),
        per_request: usize,
        stored: Mutex<BTreeSet<String>>,
        fail_on: Option<String>,
        requests: Mutex<Vec<String>>,
        recomputes: Mutex<Vec<RecomputeKind>>,
    }

    impl FakeSource {
        fn new(first: &str, last: &str, stored: &[&str]) -> Self {
            Self {
                available: (first.to_string(), last.to_string()),
                per_request: 3,
                stored: Mutex::new(stored.iter().map(|s| s.to_string()).collect()),
                fail_on: None,
                requests: Mutex::new(Vec::new()),
                recomputes: Mutex::new(Vec::new()),
            }
        }

        fn requested(&self) -> Vec<String> {
            self.requests.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl CollectionSource for FakeSource {
        async fn fetch_day(&self, _code: &Identity, dt: &DateKey) -> Result<DayFetch, SdkError> {
            self.requests.lock().unwrap().push(dt.to_string());
            if self.fail_on.as_deref() == Some(dt.as_str()) {
                return Err(SdkError::Backend("조회 실패".to_string()));
            }

            let mut stored = self.stored.lock().unwrap();
            let mut day = DayFetch::default();
            let mut cursor = dt.clone();
            for _ in 0..self.per_request {
                let key = cursor.as_str().to_string();
                if key < self.available.0 {
                    break;
                }
                if key <= self.available.1 {
                    if stored.insert(key.clone()) {
                        day.saved.push(key);
                    } else {
                        day.duplicates.push(key);
                    }
                }
                cursor = cursor.prev_day();
            }
            Ok(day)
        }

        async fn date_range(&self, _code: &Identity) -> Result<DateRange, SdkError> {
            let stored = self.stored.lock().unwrap();
            Ok(DateRange {
                start: stored.iter().next().and_then(|d| DateKey::parse(d).ok()),
                end: stored.iter().next_back().and_then(|d| DateKey::parse(d).ok()),
            })
        }

        async fn recompute(
            &self,
            kind: RecomputeKind,
            _code: &Identity,
        ) -> Result<RecomputeResult, SdkError> {
            self.recomputes.lock().unwrap().push(kind);
            Ok(RecomputeResult {
                success: true,
                ..Default::default()
            })
        }
    }

    fn quick() -> WalkerConfig {
        WalkerConfig {
            pause: Duration::ZERO,
            ..WalkerConfig::default()
        }
    }

    fn key(s: &str) -> DateKey {
        DateKey::parse(s).unwrap()
    }

    #[tokio::test]
    async fn test_walk_fills_past_then_recent() {
        let source = FakeSource::new(
            "20240101",
            "20240115",
            &["20240105", "20240106", "20240107", "20240108", "20240109", "20240110"],
        );
        let walker = HistoryWalker::with_config(source, quick());
        let mut seen = Vec::new();
        let mut refreshed = Vec::new();
        let report = walker
            .run_from(&Identity::from("005930"), key("20240115"), |p| {
                seen.push((p.phase, p.date.to_string()));
                if let Some(range) = &p.stored_range {
                    refreshed.push((p.date.to_string(), range.clone()));
                }
            })
            .await;

        // Past: 04..02, 01, then nothing before the first available day.
        // Recent: 15..13, 12..10 where 10 is already stored.
        assert_eq!(
            walker.source.requested(),
            vec!["20240104", "20240101", "20231231", "20240115", "20240112"]
        );
        assert_eq!(report.past_end, Some(PhaseEnd::NoData));
        assert_eq!(report.recent_end, Some(PhaseEnd::Connected));
        assert_eq!(report.totals.requests, 5);
        assert_eq!(report.totals.saved, 9);
        assert_eq!(report.totals.duplicates, 1);
        assert_eq!(report.totals.received, 10);
        assert_eq!(report.duplicate_dates, vec!["20240110"]);
        assert_eq!(seen[0], (WalkPhase::Past, "20240104".to_string()));
        assert_eq!(seen[3], (WalkPhase::Recent, "20240115".to_string()));
        assert_eq!(report.statistics.len(), 3);
        assert!(report.statistics.iter().all(|(_, ok)| *ok));

        // Refreshed at each phase end and on the fifth request.
        let at: Vec<_> = refreshed.iter().map(|(d, _)| d.as_str()).collect();
        assert_eq!(at, vec!["20231231", "20240112"]);
        assert_eq!(refreshed[0].1.start.as_ref().unwrap().as_str(), "20240101");
        assert_eq!(refreshed[0].1.end.as_ref().unwrap().as_str(), "20240110");
        let stored = report.stored_range.clone().unwrap();
        assert_eq!(stored.end.unwrap().as_str(), "20240115");

        let range = report.final_range.unwrap();
        assert_eq!(range.start.unwrap().as_str(), "20240101");
        assert_eq!(range.end.unwrap().as_str(), "20240115");
    }

    #[tokio::test]
    async fn test_walk_without_stored_data_starts_today() {
        let source = FakeSource::new("20240110", "20240112", &[]);
        let walker = HistoryWalker::with_config(
            source,
            WalkerConfig {
                recompute_after: false,
                ..quick()
            },
        );
        let report = walker
            .run_from(&Identity::from("000660"), key("20240112"), |_| {})
            .await;
        assert_eq!(walker.source.requested()[0], "20240112");
        assert_eq!(report.totals.saved, 3);
        assert!(report.statistics.is_empty());
        assert!(walker.source.recomputes.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_past_phase_stops_at_min_date() {
        let source = FakeSource::new("19990101", "20000110", &["20000105"]);
        let walker = HistoryWalker::with_config(
            source,
            WalkerConfig {
                recompute_after: false,
                ..quick()
            },
        );
        let report = walker
            .run_from(&Identity::from("005930"), key("20000105"), |_| {})
            .await;
        // 20000104..02, then 20000101 which is the floor.
        assert_eq!(report.past_end, Some(PhaseEnd::MinDate));
        assert_eq!(&walker.source.requested()[..2], &["20000104", "20000101"]);
    }

    #[tokio::test]
    async fn test_error_ends_phase_and_is_recorded() {
        let mut source = FakeSource::new("20240101", "20240115", &["20240110"]);
        source.fail_on = Some("20240109".to_string());
        let walker = HistoryWalker::with_config(
            source,
            WalkerConfig {
                recompute_after: false,
                ..quick()
            },
        );
        let report = walker
            .run_from(&Identity::from("005930"), key("20240115"), |_| {})
            .await;
        assert_eq!(report.past_end, Some(PhaseEnd::Error));
        assert_eq!(report.totals.errors, 1);
        assert_eq!(report.error_dates, vec!["20240109: 조회 실패"]);
        // The recent phase still runs.
        assert_eq!(report.recent_end, Some(PhaseEnd::Connected));
    }

    #[tokio::test]
    async fn test_request_limit_spans_both_phases() {
        let source = FakeSource::new("19990101", "20240115", &["20240110"]);
        let walker = HistoryWalker::with_config(
            source,
            WalkerConfig {
                max_requests: 3,
                recompute_after: false,
                ..quick()
            },
        );
        let report = walker
            .run_from(&Identity::from("005930"), key("20240115"), |_| {})
            .await;
        assert_eq!(report.past_end, Some(PhaseEnd::RequestLimit));
        assert_eq!(report.recent_end, Some(PhaseEnd::RequestLimit));
        assert_eq!(report.totals.requests, 3);
        assert_eq!(walker.source.requested().len(), 3);
    }
}
