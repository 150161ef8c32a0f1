//! One chart instance: its cache, pagination, auto-sync and rendering.

use super::source::SeriesSource;
use super::sync::{AutoSyncGate, SyncDecision, SyncOutcome, SyncState};
use super::trigger::EdgeTrigger;
use super::viewport::{apply_or_fit, ChartSurface, ViewportPreserver, ViewportRange};
use super::{LoadOutcome, Notice, SkipReason};
use crate::domain::series::{ChartKind, Field, Investor, PageRequest, PageResponse, SeriesCache};
use crate::error::SdkError;
use crate::shared::{DateKey, Identity, Period};

use async_lock::{Mutex, RwLock};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

/// Shown when the initial page is empty and the backend gave no message.
pub const NO_DATA_MESSAGE: &str = "No data";

/// Result of [`ChartSession::load_initial`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InitialLoad {
    pub outcome: LoadOutcome,
    pub notices: Vec<Notice>,
    /// Gate state after this load.
    pub sync: SyncState,
    /// Most recent `visible_days` of the loaded window.
    pub visible: Option<ViewportRange>,
}

impl InitialLoad {
    fn new(outcome: LoadOutcome, sync: SyncState) -> Self {
        Self {
            outcome,
            notices: Vec::new(),
            sync,
            visible: None,
        }
    }
}

#[derive(Debug, Default)]
struct Selection {
    identity: Option<Identity>,
    period: Period,
    sector: Option<String>,
    cache: SeriesCache,
}

/// Clears the in-flight flag however the load ends.
struct FlightGuard<'a>(&'a AtomicBool);

impl Drop for FlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Drives one chart: initial load behind the auto-sync gate, backward
/// pagination with a single-flight guard, and rendering.
///
/// All methods take `&self`. Loads for a selection that was replaced while
/// they ran are discarded.
pub struct ChartSession<S> {
    source: S,
    kind: ChartKind,
    fields: Vec<Field>,
    selection: RwLock<Selection>,
    in_flight: AtomicBool,
    generation: AtomicU64,
    gate: Mutex<AutoSyncGate>,
    trigger: Mutex<EdgeTrigger>,
}

impl<S: SeriesSource> ChartSession<S> {
    /// A session that renders every investor line, plus the price overlay on
    /// stock charts.
    pub fn new(source: S) -> Self {
        let kind = source.kind();
        let mut fields: Vec<Field> = Investor::ALL.iter().copied().map(Field::Investor).collect();
        if kind != ChartKind::SectorMovingAverage {
            fields.push(Field::CurrentPrice);
        }
        Self::with_fields(source, fields)
    }

    pub fn with_fields(source: S, fields: Vec<Field>) -> Self {
        Self {
            kind: source.kind(),
            source,
            fields,
            selection: RwLock::new(Selection::default()),
            in_flight: AtomicBool::new(false),
            generation: AtomicU64::new(0),
            gate: Mutex::new(AutoSyncGate::new()),
            trigger: Mutex::new(EdgeTrigger::new()),
        }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn kind(&self) -> ChartKind {
        self.kind
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    /// Change the rendered lines. Takes effect on the next render.
    pub fn set_fields(&mut self, fields: Vec<Field>) {
        self.fields = fields;
    }

    pub async fn identity(&self) -> Option<Identity> {
        self.selection.read().await.identity.clone()
    }

    pub async fn sector(&self) -> Option<String> {
        self.selection.read().await.sector.clone()
    }

    pub async fn sync_state(&self) -> SyncState {
        self.gate.lock().await.state()
    }

    /// Read the cache.
    pub async fn with_cache<R>(&self, f: impl FnOnce(&SeriesCache) -> R) -> R {
        f(&self.selection.read().await.cache)
    }

    pub fn is_loading_older(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Drop everything loaded. Loads still running are discarded when they
    /// resolve.
    pub async fn reset(&self) {
        self.generation.fetch_add(1, Ordering::AcqRel);
        *self.selection.write().await = Selection::default();
        self.trigger.lock().await.reset();
    }

    fn is_current(&self, generation: u64) -> bool {
        self.generation.load(Ordering::Acquire) == generation
    }

    // ── Initial load ─────────────────────────────────────────────────────

    /// Load the most recent window for `identity` and replace the cache.
    ///
    /// Probes the raw date range, fetches the page, and when the statistic
    /// lags the raw data runs one recompute and re-fetch. Rendering data is
    /// returned in every case; problems surface as notices.
    pub async fn load_initial(&self, identity: Identity, period: Period) -> InitialLoad {
        let generation = self.generation.fetch_add(1, Ordering::AcqRel) + 1;
        {
            let mut selection = self.selection.write().await;
            *selection = Selection {
                identity: Some(identity.clone()),
                period,
                ..Selection::default()
            };
        }
        self.trigger.lock().await.reset();
        self.gate.lock().await.bind(&identity);

        tracing::info!(kind = %self.kind, identity = %identity, period = %period, "Loading chart");

        let raw_max = self.probe_raw_max(&identity).await;
        let request = PageRequest::initial(identity.clone(), period);

        let mut page = match self.source.fetch_page(&request).await {
            Ok(page) => page,
            Err(e) => {
                if !self.is_current(generation) {
                    return InitialLoad::new(LoadOutcome::Superseded, self.sync_state().await);
                }
                tracing::error!(identity = %identity, error = %e, "Chart load failed");
                let message = format!("Load failed: {}", e);
                let mut load =
                    InitialLoad::new(LoadOutcome::Failed(message.clone()), self.sync_state().await);
                load.notices.push(Notice::Error(message));
                return load;
            }
        };

        let mut notices = Vec::new();
        if let Some(raw_max) = raw_max {
            if let Some(notice) = self.auto_sync(&request, &mut page, raw_max).await {
                notices.push(notice);
            }
        }
        let sync = self.sync_state().await;

        let mut selection = self.selection.write().await;
        if !self.is_current(generation) {
            tracing::debug!(identity = %identity, "Discarding superseded chart load");
            return InitialLoad::new(LoadOutcome::Superseded, sync);
        }
        if page.points.is_empty() {
            tracing::warn!(identity = %identity, "Chart has no data");
            let message = page
                .message
                .filter(|m| !m.is_empty())
                .unwrap_or_else(|| NO_DATA_MESSAGE.to_string());
            selection.cache.clear();
            notices.push(Notice::Error(message));
            return InitialLoad {
                outcome: LoadOutcome::Initialized { points: 0 },
                notices,
                sync,
                visible: None,
            };
        }

        selection.sector = page.sector.take();
        selection.cache.initialize(page.points);
        let points = selection.cache.len();
        let visible = selection
            .cache
            .recent_span(period.visible_days() as usize)
            .map(|(from, to)| ViewportRange::from_keys(&from, &to));

        tracing::info!(
            identity = %identity,
            points,
            oldest = ?selection.cache.oldest().map(|d| d.as_str()),
            newest = ?selection.cache.newest().map(|d| d.to_string()),
            "Chart loaded"
        );

        InitialLoad {
            outcome: LoadOutcome::Initialized { points },
            notices,
            sync,
            visible,
        }
    }

    /// Newest raw date, or `None` when the gate should not run.
    async fn probe_raw_max(&self, identity: &Identity) -> Option<DateKey> {
        if !self.source.supports_sync() {
            return None;
        }
        match self.source.date_range(identity).await {
            Ok(range) => range.end,
            Err(e) => {
                tracing::warn!(identity = %identity, error = %e, "Date range probe failed, skipping sync check");
                None
            }
        }
    }

    /// Run the gate against `page`, replacing it with the re-fetched page
    /// when a sync happens.
    async fn auto_sync(
        &self,
        request: &PageRequest,
        page: &mut PageResponse,
        raw_max: DateKey,
    ) -> Option<Notice> {
        let decision = self
            .gate
            .lock()
            .await
            .check(page.newest_date().as_ref(), Some(&raw_max));
        let SyncDecision::Sync { boundary } = decision else {
            return None;
        };

        tracing::info!(identity = %request.identity, kind = %self.kind, "Recomputing stale statistic");
        let outcome = match self.source.recompute(&request.identity).await {
            Ok(result) if result.success => match self.source.fetch_page(request).await {
                Ok(refreshed) => {
                    let new_chart_max = refreshed.newest_date();
                    *page = refreshed;
                    SyncOutcome::Recomputed {
                        updated_max_date: result.updated_max_date,
                        new_chart_max,
                    }
                }
                Err(e) => SyncOutcome::TransportFailed(e.to_string()),
            },
            Ok(result) => SyncOutcome::BackendFailed(Some(result.message)),
            Err(SdkError::Backend(message)) => SyncOutcome::BackendFailed(Some(message)),
            Err(e) => SyncOutcome::TransportFailed(e.to_string()),
        };

        let mut gate = self.gate.lock().await;
        if gate.identity() != Some(&request.identity) {
            tracing::debug!(identity = %request.identity, "Gate moved to another identity, dropping sync result");
            return None;
        }
        gate.finish(&boundary, outcome)
    }

    // ── Older pages ──────────────────────────────────────────────────────

    /// Load the page before the oldest cached date and merge it.
    ///
    /// A call while another is running is dropped, not queued. Failures
    /// leave the cache untouched.
    pub async fn load_older(&self) -> LoadOutcome {
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return LoadOutcome::Skipped(SkipReason::InFlight);
        }
        let _guard = FlightGuard(&self.in_flight);

        let generation = self.generation.load(Ordering::Acquire);
        let request = {
            let selection = self.selection.read().await;
            let Some(identity) = selection.identity.clone() else {
                return LoadOutcome::Skipped(SkipReason::NotLoaded);
            };
            let Some(oldest) = selection.cache.oldest().cloned() else {
                return LoadOutcome::Skipped(SkipReason::NoAnchor);
            };
            if !selection.cache.has_more() {
                return LoadOutcome::Skipped(SkipReason::NoMoreHistory);
            }
            PageRequest::older(identity, selection.period, oldest)
        };

        tracing::debug!(
            identity = %request.identity,
            before = ?request.before.as_ref().map(|d| d.as_str()),
            "Loading older history"
        );

        let page = match self.source.fetch_page(&request).await {
            Ok(page) => page,
            Err(e) => {
                if !self.is_current(generation) {
                    return LoadOutcome::Superseded;
                }
                tracing::warn!(identity = %request.identity, error = %e, "Older history load failed");
                return LoadOutcome::Failed(e.to_string());
            }
        };

        let mut selection = self.selection.write().await;
        if !self.is_current(generation) {
            tracing::debug!(identity = %request.identity, "Discarding superseded older page");
            return LoadOutcome::Superseded;
        }

        let received = page.points.len();
        let added = selection.cache.merge_older(page.points);
        if added == 0 {
            tracing::info!(identity = %request.identity, received, "No older history");
            LoadOutcome::Exhausted
        } else {
            tracing::info!(
                identity = %request.identity,
                added,
                oldest = ?selection.cache.oldest().map(|d| d.as_str()),
                "Merged older history"
            );
            LoadOutcome::Merged { added }
        }
    }

    /// [`load_older`](Self::load_older), then re-render and put the view
    /// back where the user left it.
    pub async fn load_older_with(&self, surface: &mut dyn ChartSurface) -> LoadOutcome {
        let preserver = ViewportPreserver::capture(surface);
        let outcome = self.load_older().await;
        if let LoadOutcome::Merged { .. } = outcome {
            self.render(surface).await;
            preserver.restore(surface);
        }
        outcome
    }

    /// Feed a visible-range change from the chart. Loads older history when
    /// the edge trigger fires.
    pub async fn on_visible_range_change(
        &self,
        range: ViewportRange,
        surface: &mut dyn ChartSurface,
    ) -> Option<LoadOutcome> {
        let (oldest, newest) = {
            let selection = self.selection.read().await;
            (selection.cache.oldest()?.to_naive(), selection.cache.newest()?.to_naive())
        };
        self.trigger.lock().await.observe(range.from, oldest, newest)?;
        Some(self.load_older_with(surface).await)
    }

    // ── Rendering ────────────────────────────────────────────────────────

    /// Push every field's projection to `surface`. Returns the fields that
    /// have no points.
    pub async fn render(&self, surface: &mut dyn ChartSurface) -> Vec<Field> {
        let projections = {
            let selection = self.selection.read().await;
            selection.cache.projections(self.kind, &self.fields)
        };
        for (field, line) in &projections.series {
            surface.set_series(*field, line);
        }
        for field in &projections.empty {
            surface.set_series(*field, &[]);
        }
        projections.empty
    }

    /// Render a fresh initial load and show its visible window.
    pub async fn show_initial(&self, surface: &mut dyn ChartSurface, load: &InitialLoad) -> Vec<Field> {
        let empty = self.render(surface).await;
        apply_or_fit(surface, load.visible);
        empty
    }
}

impl<S> std::fmt::Debug for ChartSession<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChartSession")
            .field("kind", &self.kind)
            .field("fields", &self.fields)
            .field("generation", &self.generation.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}
