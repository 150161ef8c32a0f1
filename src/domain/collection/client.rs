//! Collection sub-client — history requests, batch stream, walker wiring.

use crate::client::StockflowClient;
use crate::domain::collection::wire::{BatchRequest, FetchStatusRequest};
use crate::domain::collection::{BatchRun, CollectionSource, DayFetch, HistoryWalker, WalkerConfig};
use crate::domain::series::{DateRange, RecomputeResult};
use crate::domain::statistics::RecomputeKind;
use crate::error::SdkError;
use crate::shared::{DateKey, Identity};

use async_trait::async_trait;

/// Sub-client for data collection.
pub struct Collection<'a> {
    pub(crate) client: &'a StockflowClient,
}

impl<'a> Collection<'a> {
    /// Request one round of history ending at `dt` and store it.
    pub async fn fetch_day(&self, code: &Identity, dt: &DateKey) -> Result<DayFetch, SdkError> {
        let request = FetchStatusRequest {
            stk_cd: code.to_string(),
            dt: dt.to_string(),
            options: BatchRequest::default(),
        };
        Ok(self.client.http.fetch_with_status(&request).await?.into())
    }

    /// Start the KOSPI200 batch. Events are pulled from the returned run.
    pub async fn kospi200_batch(&self, request: &BatchRequest) -> Result<BatchRun, SdkError> {
        let resp = self.client.http.open_kospi200_batch(request).await?;
        tracing::info!("KOSPI200 batch collection started");
        Ok(BatchRun::from_byte_stream(resp.bytes_stream()))
    }

    /// A walker that drives this client.
    pub fn history_walker(&self, config: WalkerConfig) -> HistoryWalker<ClientCollectionSource> {
        HistoryWalker::with_config(
            ClientCollectionSource {
                client: self.client.clone(),
            },
            config,
        )
    }
}

/// [`CollectionSource`] backed by the REST client.
#[derive(Clone)]
pub struct ClientCollectionSource {
    client: StockflowClient,
}

impl ClientCollectionSource {
    pub fn new(client: StockflowClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl CollectionSource for ClientCollectionSource {
    async fn fetch_day(&self, code: &Identity, dt: &DateKey) -> Result<DayFetch, SdkError> {
        self.client.collection().fetch_day(code, dt).await
    }

    async fn date_range(&self, code: &Identity) -> Result<DateRange, SdkError> {
        self.client.stocks().date_range(code).await
    }

    async fn recompute(
        &self,
        kind: RecomputeKind,
        code: &Identity,
    ) -> Result<RecomputeResult, SdkError> {
        self.client.statistics().recompute(kind, code).await
    }
}
