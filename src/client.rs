//! High-level client — `StockflowClient` with nested sub-client accessors.
//!
//! Each domain has its own sub-client in `domain/<name>/client.rs`.
//! This module keeps the builder, shared cache state, and accessor methods.

use crate::auth::client::Auth;
use crate::auth::{AuthState, TokenStore, TokenVault};
use crate::chart::{ChartSession, ClientSeriesSource};
use crate::domain::collection::client::Collection;
use crate::domain::series::client::Charts;
use crate::domain::series::ChartKind;
use crate::domain::statistics::client::Statistics;
use crate::domain::stock::client::Stocks;
use crate::domain::stock::Stock;
use crate::error::SdkError;
use crate::http::client::DEFAULT_TIMEOUT;
use crate::http::{RetryConfig, StockflowHttp};

use async_lock::RwLock;
use std::sync::Arc;
use std::time::{Duration, Instant};

// Re-export sub-client types for convenience.
pub use crate::auth::client::Auth as AuthClient;
pub use crate::domain::collection::client::Collection as CollectionClient;
pub use crate::domain::series::client::Charts as ChartsClient;
pub use crate::domain::statistics::client::Statistics as StatisticsClient;
pub use crate::domain::stock::client::Stocks as StocksClient;

/// The primary entry point for the Stockflow SDK.
///
/// Provides nested sub-client accessors for each domain:
/// `client.stocks()`, `client.charts()`, etc.
pub struct StockflowClient {
    pub(crate) http: StockflowHttp,
    /// Auth card state; the token itself lives in the vault.
    pub(crate) auth_state: Arc<RwLock<AuthState>>,
    /// KOSPI200 list: (stocks, fetched_at)
    pub(crate) kospi200_cache: Arc<RwLock<Option<(Vec<Stock>, Instant)>>>,
    /// Cache TTL for stock lists
    pub(crate) list_cache_ttl: Duration,
}

impl StockflowClient {
    pub fn builder() -> StockflowClientBuilder {
        StockflowClientBuilder::default()
    }

    // ── Sub-client accessors ─────────────────────────────────────────────

    pub fn stocks(&self) -> Stocks<'_> {
        Stocks { client: self }
    }

    pub fn charts(&self) -> Charts<'_> {
        Charts { client: self }
    }

    pub fn statistics(&self) -> Statistics<'_> {
        Statistics { client: self }
    }

    pub fn collection(&self) -> Collection<'_> {
        Collection { client: self }
    }

    pub fn auth(&self) -> Auth<'_> {
        Auth { client: self }
    }

    /// A chart session of `kind` backed by this client.
    ///
    /// Sessions live as long as the chart they drive, so they own a clone of
    /// the client rather than borrowing it.
    pub fn chart_session(&self, kind: ChartKind) -> ChartSession<ClientSeriesSource> {
        ChartSession::new(ClientSeriesSource::new(self.clone(), kind))
    }

    pub fn base_url(&self) -> &str {
        self.http.base_url()
    }

    /// Clear all HTTP caches.
    pub async fn clear_all_caches(&self) {
        *self.kospi200_cache.write().await = None;
    }
}

impl Clone for StockflowClient {
    fn clone(&self) -> Self {
        Self {
            http: self.http.clone(),
            auth_state: self.auth_state.clone(),
            kospi200_cache: self.kospi200_cache.clone(),
            list_cache_ttl: self.list_cache_ttl,
        }
    }
}

impl std::fmt::Debug for StockflowClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StockflowClient")
            .field("base_url", &self.http.base_url())
            .field("list_cache_ttl", &self.list_cache_ttl)
            .finish_non_exhaustive()
    }
}

// ═════════════════════════════════════════════════════════════════════════════
// Builder
// ═════════════════════════════════════════════════════════════════════════════

pub struct StockflowClientBuilder {
    base_url: String,
    token_store: Option<Arc<dyn TokenStore>>,
    retry: RetryConfig,
    timeout: Duration,
    list_cache_ttl: Duration,
}

impl Default for StockflowClientBuilder {
    fn default() -> Self {
        Self {
            base_url: crate::network::DEFAULT_API_URL.to_string(),
            token_store: None,
            retry: RetryConfig::default(),
            timeout: DEFAULT_TIMEOUT,
            list_cache_ttl: Duration::from_secs(300),
        }
    }
}

impl StockflowClientBuilder {
    /// Defaults, with the base URL taken from `STOCKFLOW_API_URL` when set.
    pub fn from_env() -> Self {
        let builder = Self::default();
        match std::env::var(crate::network::API_URL_ENV) {
            Ok(url) if !url.trim().is_empty() => builder.base_url(url.trim()),
            _ => builder,
        }
    }

    pub fn base_url(mut self, url: &str) -> Self {
        self.base_url = url.to_string();
        self
    }

    /// Where the token is persisted. Defaults to process memory.
    pub fn token_store(mut self, store: Arc<dyn TokenStore>) -> Self {
        self.token_store = Some(store);
        self
    }

    pub fn retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Per-request timeout. Streamed batch responses are exempt.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn list_cache_ttl(mut self, ttl: Duration) -> Self {
        self.list_cache_ttl = ttl;
        self
    }

    pub fn build(self) -> Result<StockflowClient, SdkError> {
        if !self.base_url.starts_with("http://") && !self.base_url.starts_with("https://") {
            return Err(SdkError::Validation(format!(
                "base URL must start with http:// or https://, got {:?}",
                self.base_url
            )));
        }

        let vault = match self.token_store {
            Some(store) => TokenVault::new(store),
            None => TokenVault::in_memory(),
        };

        Ok(StockflowClient {
            http: StockflowHttp::new(&self.base_url, vault, self.retry, self.timeout)?,
            auth_state: Arc::new(RwLock::new(AuthState::Idle)),
            kospi200_cache: Arc::new(RwLock::new(None)),
            list_cache_ttl: self.list_cache_ttl,
        })
    }
}
