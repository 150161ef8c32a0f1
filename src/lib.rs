//! # Stockflow SDK
//!
//! Rust client SDK for the Stockflow investor-flow analytics backend.
//!
//! ## Architecture
//!
//! The SDK is organized in layers:
//!
//! 1. **Core** — Shared newtypes, domain models, series cache (always available)
//! 2. **Auth** — Token persistence behind `TokenStore` + session state
//! 3. **HTTP API** — `StockflowHttp` with per-endpoint retry policies
//! 4. **High-Level Client** — `StockflowClient` with nested sub-clients and caching
//! 5. **Chart** — `ChartSession`: pagination, viewport preservation, auto-sync
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use stockflow_sdk::prelude::*;
//!
//! let client = StockflowClient::builder()
//!     .base_url("http://localhost:8080")
//!     .build()?;
//!
//! client.auth().restore().await;
//! let session = client.chart_session(ChartKind::MovingAverage);
//! let load = session.load_initial(Identity::new("005930"), Period::new(20)).await;
//! session.show_initial(&mut my_chart, &load).await;
//! ```

// ── Layer 1: Core ────────────────────────────────────────────────────────────

/// Shared newtypes used across all domains.
pub mod shared;

/// Domain modules (vertical slices): types, wire types, conversions, state.
pub mod domain;

/// Unified SDK error types.
pub mod error;

/// Network URL constants.
pub mod network;

// ── Layer 2: Auth ────────────────────────────────────────────────────────────

/// Authentication: token storage, session state, token issuance.
pub mod auth;

// ── Layer 3: HTTP API ────────────────────────────────────────────────────────

/// HTTP client with retry policies.
#[cfg(feature = "http")]
pub mod http;

// ── Layer 4: High-Level Client ───────────────────────────────────────────────

/// `StockflowClient` — the primary entry point.
#[cfg(feature = "http")]
pub mod client;

// ── Layer 5: Chart ───────────────────────────────────────────────────────────

/// Chart sessions over a pluggable series source.
pub mod chart;

// ── Prelude ──────────────────────────────────────────────────────────────────

pub mod prelude {
    // Shared newtypes
    pub use crate::shared::{DateKey, Debouncer, Identity, Period};

    // Domain types — series
    pub use crate::domain::series::{
        ChartKind, DateRange, Field, Investor, LinePoint, PageRequest, PageResponse,
        RecomputeResult, SeriesCache, SeriesPoint,
    };

    // Domain types — stocks, statistics
    pub use crate::domain::statistics::{
        InvestorRatio, RecomputeKind, SectorInfo, SectorStock, SupplyDemandPoint,
    };
    pub use crate::domain::stock::{RefreshSummary, SearchInput, SearchOutcome, Stock};

    // Domain types — collection
    pub use crate::domain::collection::{
        BatchAbort, BatchProgress, BatchRequest, BatchRun, BatchRunState, CollectionSource,
        DayFetch, HistoryWalker, PhaseEnd, WalkPhase, WalkProgress, WalkReport, WalkerConfig,
    };

    // Chart layer
    pub use crate::chart::{
        AutoSyncGate, ChartSession, ChartSurface, EdgeTrigger, InitialLoad, LoadOutcome, Notice,
        RangeFollower, SeriesSource, SkipReason, SyncState, ViewportError, ViewportPreserver,
        ViewportRange,
    };

    // Errors
    pub use crate::error::SdkError;

    // Network
    pub use crate::network::DEFAULT_API_URL;

    // Auth
    pub use crate::auth::{AuthState, FileTokenStore, MemoryTokenStore, TokenStore, TokenVault};

    // HTTP client + sub-clients
    #[cfg(feature = "http")]
    pub use crate::chart::ClientSeriesSource;
    #[cfg(feature = "http")]
    pub use crate::client::{
        AuthClient, ChartsClient, CollectionClient, StatisticsClient, StockflowClient,
        StockflowClientBuilder, StocksClient,
    };
    #[cfg(feature = "http")]
    pub use crate::http::retry::{RetryConfig, RetryPolicy};
}
