//! Offline tests for the chart driver against an in-memory backend.
//!
//! Run with:
//! ```bash
//! cargo test --test chart_session
//! ```

use std::collections::BTreeMap;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{Datelike, NaiveDate};

use stockflow_sdk::chart::{
    ChartSession, ChartSurface, LoadOutcome, Notice, SeriesSource, SkipReason, SyncState,
    ViewportError, ViewportRange,
};
use stockflow_sdk::domain::series::{
    ChartKind, DateRange, Field, Investor, LinePoint, PageRequest, PageResponse, RecomputeResult,
    SeriesPoint,
};
use stockflow_sdk::error::{HttpError, SdkError};
use stockflow_sdk::shared::{DateKey, Identity, Period};

// ── Fakes ────────────────────────────────────────────────────────────────────

/// Trading days (weekdays) going forward from `start`.
fn trading_days(start: NaiveDate, count: usize) -> Vec<SeriesPoint> {
    let mut out = Vec::with_capacity(count);
    let mut day = start;
    while out.len() < count {
        if day.weekday().number_from_monday() <= 5 {
            out.push(
                SeriesPoint::new(DateKey::from_naive(day).to_string())
                    .with("frgnr", Some(out.len() as f64))
                    .with("orgn", None)
                    .with("curPrc", Some(70_000.0)),
            );
        }
        day = day.succ_opt().unwrap();
    }
    out
}

#[derive(Default)]
struct Backend {
    /// Statistic history per identity.
    history: BTreeMap<String, Vec<SeriesPoint>>,
    /// Rows the next recompute appends.
    pending: Vec<SeriesPoint>,
    raw_end: Option<DateKey>,
    recompute_ok: bool,
    recompute_catches_up: bool,
    recomputes: u32,
    requests: Vec<PageRequest>,
}

struct FakeSource {
    kind: ChartKind,
    backend: Mutex<Backend>,
    delays: BTreeMap<String, Duration>,
    fail_range: bool,
}

impl FakeSource {
    fn new(identity: &str, history: Vec<SeriesPoint>) -> Self {
        let raw_end = history.last().and_then(|p| DateKey::parse(&p.date).ok());
        let mut backend = Backend {
            raw_end,
            recompute_ok: true,
            ..Backend::default()
        };
        backend.history.insert(identity.to_string(), history);
        Self {
            kind: ChartKind::MovingAverage,
            backend: Mutex::new(backend),
            delays: BTreeMap::new(),
            fail_range: false,
        }
    }

    fn delay(mut self, identity: &str, delay: Duration) -> Self {
        self.delays.insert(identity.to_string(), delay);
        self
    }

    fn requests(&self) -> Vec<PageRequest> {
        self.backend.lock().unwrap().requests.clone()
    }

    fn recomputes(&self) -> u32 {
        self.backend.lock().unwrap().recomputes
    }
}

#[async_trait]
impl SeriesSource for FakeSource {
    fn kind(&self) -> ChartKind {
        self.kind
    }

    async fn fetch_page(&self, request: &PageRequest) -> Result<PageResponse, SdkError> {
        self.backend.lock().unwrap().requests.push(request.clone());
        if let Some(delay) = self.delays.get(request.identity.as_str()) {
            tokio::time::sleep(*delay).await;
        }

        let backend = self.backend.lock().unwrap();
        let Some(history) = backend.history.get(request.identity.as_str()) else {
            return Ok(PageResponse {
                identity: request.identity.clone(),
                message: Some("종목 데이터가 없습니다".to_string()),
                ..PageResponse::default()
            });
        };
        let eligible: Vec<_> = history
            .iter()
            .filter(|p| {
                request
                    .before
                    .as_ref()
                    .map_or(true, |b| p.date.as_str() < b.as_str())
            })
            .cloned()
            .collect();
        let skip = eligible.len().saturating_sub(request.lookback_days as usize);
        Ok(PageResponse {
            identity: request.identity.clone(),
            sector: Some("전기전자".to_string()),
            period: Some(request.period),
            points: eligible[skip..].to_vec(),
            message: None,
        })
    }

    async fn date_range(&self, _identity: &Identity) -> Result<DateRange, SdkError> {
        if self.fail_range {
            return Err(HttpError::Timeout.into());
        }
        Ok(DateRange {
            start: None,
            end: self.backend.lock().unwrap().raw_end.clone(),
        })
    }

    async fn recompute(&self, identity: &Identity) -> Result<RecomputeResult, SdkError> {
        let mut backend = self.backend.lock().unwrap();
        backend.recomputes += 1;
        if !backend.recompute_ok {
            return Ok(RecomputeResult {
                success: false,
                message: "계산 실패".to_string(),
                ..RecomputeResult::default()
            });
        }
        if backend.recompute_catches_up {
            let pending = std::mem::take(&mut backend.pending);
            if let Some(history) = backend.history.get_mut(identity.as_str()) {
                history.extend(pending);
            }
        }
        Ok(RecomputeResult {
            success: true,
            message: "ok".to_string(),
            ..RecomputeResult::default()
        })
    }
}

#[derive(Default)]
struct RecordingChart {
    range: Option<ViewportRange>,
    series: BTreeMap<Field, Vec<LinePoint>>,
    fits: usize,
}

impl ChartSurface for RecordingChart {
    fn visible_range(&self) -> Option<ViewportRange> {
        self.range
    }

    fn set_visible_range(&mut self, range: ViewportRange) -> Result<(), ViewportError> {
        if range.from > range.to {
            return Err(ViewportError("inverted range".to_string()));
        }
        self.range = Some(range);
        Ok(())
    }

    fn fit_content(&mut self) {
        self.fits += 1;
    }

    fn set_series(&mut self, field: Field, points: &[LinePoint]) {
        self.series.insert(field, points.to_vec());
    }
}

fn start() -> NaiveDate {
    NaiveDate::from_ymd_opt(2016, 1, 4).unwrap()
}

fn samsung() -> Identity {
    Identity::new("005930")
}

// ── Tests ────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_end_to_end_period_20() {
    let session = ChartSession::new(FakeSource::new("005930", trading_days(start(), 2000)));
    let mut chart = RecordingChart::default();

    let load = session.load_initial(samsung(), Period::new(20)).await;
    assert_eq!(load.outcome, LoadOutcome::Initialized { points: 1000 });
    assert_eq!(load.sync, SyncState::InSync);
    assert!(load.notices.is_empty());
    assert_eq!(session.sector().await.as_deref(), Some("전기전자"));

    session.show_initial(&mut chart, &load).await;
    let visible = load.visible.unwrap();
    let line = &chart.series[&Field::Investor(Investor::Frgnr)];
    assert_eq!(line.len(), 1000);
    // The visible window covers the newest 500 points.
    let shown = line
        .iter()
        .filter(|p| p.time >= visible.from && p.time <= visible.to)
        .count();
    assert_eq!(shown, 500);
    assert_eq!(chart.range, Some(visible));

    let oldest = session.with_cache(|c| c.oldest().cloned()).await;
    let outcome = session.load_older_with(&mut chart).await;
    assert_eq!(outcome, LoadOutcome::Merged { added: 1000 });

    let requests = session.source().requests();
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[0].lookback_days, 1000);
    assert_eq!(requests[0].before, None);
    assert_eq!(requests[1].before, oldest);
    // The user's view did not move.
    assert_eq!(chart.range, Some(visible));
    assert_eq!(chart.series[&Field::Investor(Investor::Frgnr)].len(), 2000);
}

#[tokio::test]
async fn test_absent_values_are_not_rendered() {
    let session = ChartSession::new(FakeSource::new("005930", trading_days(start(), 50)));
    let mut chart = RecordingChart::default();
    let load = session.load_initial(samsung(), Period::new(5)).await;
    let empty = session.show_initial(&mut chart, &load).await;

    assert!(empty.contains(&Field::Investor(Investor::Orgn)));
    assert!(!empty.contains(&Field::CurrentPrice));
    assert!(chart.series[&Field::Investor(Investor::Orgn)].is_empty());
    assert_eq!(chart.series[&Field::CurrentPrice].len(), 50);
}

#[tokio::test]
async fn test_concurrent_load_older_is_single_flight() {
    let source = FakeSource::new("005930", trading_days(start(), 2000))
        .delay("005930", Duration::from_millis(20));
    let session = ChartSession::new(source);
    session.load_initial(samsung(), Period::new(20)).await;

    let (first, second) = tokio::join!(session.load_older(), session.load_older());
    assert_eq!(first, LoadOutcome::Merged { added: 1000 });
    assert_eq!(second, LoadOutcome::Skipped(SkipReason::InFlight));
    // Initial page plus exactly one older page.
    assert_eq!(session.source().requests().len(), 2);
    assert!(!session.is_loading_older());
}

#[tokio::test]
async fn test_history_runs_out() {
    let session = ChartSession::new(FakeSource::new("005930", trading_days(start(), 1200)));
    session.load_initial(samsung(), Period::new(20)).await;

    assert_eq!(session.load_older().await, LoadOutcome::Merged { added: 200 });
    assert_eq!(session.load_older().await, LoadOutcome::Exhausted);
    assert_eq!(
        session.load_older().await,
        LoadOutcome::Skipped(SkipReason::NoMoreHistory)
    );
    assert_eq!(session.with_cache(|c| c.len()).await, 1200);
}

#[tokio::test]
async fn test_stale_response_discarded_after_identity_change() {
    let mut source = FakeSource::new("005930", trading_days(start(), 1200))
        .delay("005930", Duration::from_millis(40));
    source
        .backend
        .get_mut()
        .unwrap()
        .history
        .insert("000660".to_string(), trading_days(start(), 300));
    let session = ChartSession::new(source);

    let (slow, fast) = tokio::join!(
        session.load_initial(samsung(), Period::new(20)),
        async {
            tokio::time::sleep(Duration::from_millis(5)).await;
            session.load_initial(Identity::new("000660"), Period::new(20)).await
        }
    );

    assert_eq!(slow.outcome, LoadOutcome::Superseded);
    assert_eq!(fast.outcome, LoadOutcome::Initialized { points: 300 });
    assert_eq!(session.identity().await, Some(Identity::new("000660")));
    assert_eq!(session.with_cache(|c| c.len()).await, 300);
}

#[tokio::test]
async fn test_auto_sync_catches_up() {
    let all = trading_days(start(), 1010);
    let (stored, fresh) = all.split_at(1000);
    let mut source = FakeSource::new("005930", stored.to_vec());
    {
        let backend = source.backend.get_mut().unwrap();
        backend.raw_end = DateKey::parse(&fresh.last().unwrap().date).ok();
        backend.pending = fresh.to_vec();
        backend.recompute_catches_up = true;
    }
    let session = ChartSession::new(source);

    let load = session.load_initial(samsung(), Period::new(20)).await;
    assert_eq!(load.sync, SyncState::Resolved);
    assert!(load.notices.is_empty());
    assert_eq!(session.source().recomputes(), 1);
    let newest = session.with_cache(|c| c.newest()).await;
    assert_eq!(newest.as_ref().map(|d| d.as_str()), Some(fresh.last().unwrap().date.as_str()));

    // Reloading with the same raw boundary does not recompute again.
    session.load_initial(samsung(), Period::new(20)).await;
    assert_eq!(session.source().recomputes(), 1);
}

#[tokio::test]
async fn test_auto_sync_guard_does_not_carry_across_stocks() {
    let all = trading_days(start(), 1010);
    let (stored, fresh) = all.split_at(1000);
    let mut source = FakeSource::new("005930", stored.to_vec());
    {
        let backend = source.backend.get_mut().unwrap();
        backend.history.insert("000660".to_string(), stored.to_vec());
        backend.raw_end = DateKey::parse(&fresh.last().unwrap().date).ok();
        backend.pending = fresh.to_vec();
        backend.recompute_catches_up = true;
    }
    let session = ChartSession::new(source);

    let a = session.load_initial(samsung(), Period::new(20)).await;
    assert_eq!(a.sync, SyncState::Resolved);
    assert_eq!(session.source().recomputes(), 1);

    // Same raw boundary, but a different stock that is also behind.
    session.source().backend.lock().unwrap().pending = fresh.to_vec();
    let b = session.load_initial(Identity::new("000660"), Period::new(20)).await;
    assert_eq!(session.source().recomputes(), 2);
    assert_eq!(b.sync, SyncState::Resolved);

    // Back to the first stock: its guard was reset by the switch, and the
    // chart is already in sync.
    let again = session.load_initial(samsung(), Period::new(20)).await;
    assert_eq!(again.sync, SyncState::InSync);
    assert_eq!(session.source().recomputes(), 2);
}

#[tokio::test]
async fn test_auto_sync_retries_exactly_once_after_failure() {
    let mut source = FakeSource::new("005930", trading_days(start(), 1000));
    {
        let backend = source.backend.get_mut().unwrap();
        backend.raw_end = DateKey::parse("20300102").ok();
        backend.recompute_ok = false;
    }
    let session = ChartSession::new(source);

    let load = session.load_initial(samsung(), Period::new(20)).await;
    assert_eq!(load.sync, SyncState::SyncFailed);
    assert_eq!(load.notices, vec![Notice::Warning("계산 실패".to_string())]);
    // Rendering proceeds with the data that exists.
    assert_eq!(load.outcome, LoadOutcome::Initialized { points: 1000 });
    assert_eq!(session.source().recomputes(), 1);

    // Guard was cleared: the next load retries once.
    session.source().backend.lock().unwrap().recompute_ok = true;
    let load = session.load_initial(samsung(), Period::new(20)).await;
    assert_eq!(session.source().recomputes(), 2);
    // Backend succeeded but the chart is still behind 2030.
    assert_eq!(load.sync, SyncState::SyncFailed);
    assert!(matches!(load.notices.as_slice(), [Notice::Warning(_)]));
}

#[tokio::test]
async fn test_range_probe_failure_skips_gate() {
    let mut source = FakeSource::new("005930", trading_days(start(), 100));
    source.fail_range = true;
    source.backend.get_mut().unwrap().raw_end = DateKey::parse("20300102").ok();
    let session = ChartSession::new(source);

    let load = session.load_initial(samsung(), Period::new(20)).await;
    assert_eq!(load.outcome, LoadOutcome::Initialized { points: 100 });
    assert_eq!(load.sync, SyncState::Unknown);
    assert_eq!(session.source().recomputes(), 0);
}

#[tokio::test]
async fn test_unknown_identity_reports_backend_message() {
    let session = ChartSession::new(FakeSource::new("005930", Vec::new()));
    let load = session
        .load_initial(Identity::new("999999"), Period::new(20))
        .await;
    assert_eq!(load.outcome, LoadOutcome::Initialized { points: 0 });
    assert!(load
        .notices
        .contains(&Notice::Error("종목 데이터가 없습니다".to_string())));
    assert_eq!(session.load_older().await, LoadOutcome::Skipped(SkipReason::NoAnchor));
}

#[tokio::test]
async fn test_panning_to_left_edge_loads_older() {
    let session = ChartSession::new(FakeSource::new("005930", trading_days(start(), 2000)));
    let mut chart = RecordingChart::default();
    let load = session.load_initial(samsung(), Period::new(20)).await;
    session.show_initial(&mut chart, &load).await;
    let visible = load.visible.unwrap();

    assert_eq!(session.on_visible_range_change(visible, &mut chart).await, None);

    let oldest = session.with_cache(|c| c.oldest().unwrap().to_naive()).await;
    let at_edge = ViewportRange::new(oldest, visible.to);
    chart.range = Some(at_edge);
    let outcome = session.on_visible_range_change(at_edge, &mut chart).await;
    assert_eq!(outcome, Some(LoadOutcome::Merged { added: 1000 }));
    assert_eq!(chart.range, Some(at_edge));
    assert_eq!(session.source().requests().len(), 2);
}
