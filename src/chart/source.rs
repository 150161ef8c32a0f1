//! Where a chart session gets its pages.

#[cfg(feature = "http")]
use crate::client::StockflowClient;
use crate::domain::series::{ChartKind, DateRange, PageRequest, PageResponse, RecomputeResult};
use crate::domain::statistics::RecomputeKind;
use crate::error::SdkError;
use crate::shared::Identity;

use async_trait::async_trait;

/// Backend calls a [`ChartSession`](super::ChartSession) needs.
#[async_trait]
pub trait SeriesSource: Send + Sync {
    fn kind(&self) -> ChartKind;

    async fn fetch_page(&self, request: &PageRequest) -> Result<PageResponse, SdkError>;

    /// Span of raw data behind the statistic.
    async fn date_range(&self, identity: &Identity) -> Result<DateRange, SdkError>;

    /// Rebuild the statistic for `identity`.
    async fn recompute(&self, identity: &Identity) -> Result<RecomputeResult, SdkError>;

    /// Whether the auto-sync gate applies to this chart.
    fn supports_sync(&self) -> bool {
        RecomputeKind::for_chart(self.kind()).is_some()
    }
}

/// [`SeriesSource`] backed by the REST client.
#[cfg(feature = "http")]
#[derive(Clone)]
pub struct ClientSeriesSource {
    client: StockflowClient,
    kind: ChartKind,
}

#[cfg(feature = "http")]
impl ClientSeriesSource {
    pub fn new(client: StockflowClient, kind: ChartKind) -> Self {
        Self { client, kind }
    }
}

#[cfg(feature = "http")]
#[async_trait]
impl SeriesSource for ClientSeriesSource {
    fn kind(&self) -> ChartKind {
        self.kind
    }

    async fn fetch_page(&self, request: &PageRequest) -> Result<PageResponse, SdkError> {
        self.client.charts().page(self.kind, request).await
    }

    async fn date_range(&self, identity: &Identity) -> Result<DateRange, SdkError> {
        self.client.stocks().date_range(identity).await
    }

    async fn recompute(&self, identity: &Identity) -> Result<RecomputeResult, SdkError> {
        let kind = RecomputeKind::for_chart(self.kind).ok_or_else(|| {
            SdkError::Validation(format!("{} charts have no recompute", self.kind))
        })?;
        self.client.statistics().recompute(kind, identity).await
    }
}
