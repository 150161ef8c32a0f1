//! Stocks sub-client — search, KOSPI200 list, raw date range, listing refresh.

use crate::client::StockflowClient;
use crate::domain::series::DateRange;
use crate::domain::stock::{RefreshSummary, SearchInput, SearchOutcome, Stock};
use crate::error::SdkError;
use crate::shared::{Debouncer, Identity};
use std::time::Instant;

/// Sub-client for stock list operations.
pub struct Stocks<'a> {
    pub(crate) client: &'a StockflowClient,
}

impl<'a> Stocks<'a> {
    /// Name search. Blank keywords return nothing without a request.
    pub async fn search(&self, keyword: &str) -> Result<Vec<Stock>, SdkError> {
        let keyword = keyword.trim();
        if keyword.is_empty() {
            return Ok(Vec::new());
        }
        Ok(self.client.http.search_stocks(keyword).await?)
    }

    /// Search-as-you-type. Resolves to `None` when a newer call on the same
    /// debouncer superseded this one.
    pub async fn search_debounced(
        &self,
        debouncer: &Debouncer,
        raw: &str,
    ) -> Option<Result<SearchOutcome, SdkError>> {
        match SearchInput::classify(raw) {
            SearchInput::Empty => {
                debouncer.cancel();
                Some(Ok(SearchOutcome::Matches(Vec::new())))
            }
            SearchInput::Code(code) => {
                debouncer.cancel();
                Some(Ok(SearchOutcome::Code(code)))
            }
            SearchInput::Keyword(keyword) => {
                debouncer
                    .run(async move {
                        tracing::debug!(keyword = %keyword, "Searching stocks");
                        self.search(&keyword).await.map(SearchOutcome::Matches)
                    })
                    .await
            }
        }
    }

    /// KOSPI200 constituents. Uses TTL cache.
    pub async fn kospi200(&self) -> Result<Vec<Stock>, SdkError> {
        {
            let cache = self.client.kospi200_cache.read().await;
            if let Some((stocks, fetched_at)) = cache.as_ref() {
                if fetched_at.elapsed() < self.client.list_cache_ttl {
                    return Ok(stocks.clone());
                }
            }
        }

        let stocks = self.client.http.get_kospi200_stocks().await?;
        *self.client.kospi200_cache.write().await = Some((stocks.clone(), Instant::now()));
        Ok(stocks)
    }

    /// Look a code up via search, falling back to the KOSPI200 list.
    pub async fn resolve(&self, code: &Identity) -> Result<Option<Stock>, SdkError> {
        let hits = self.search(code.as_str()).await?;
        if let Some(hit) = hits.into_iter().find(|s| s.code == code.as_str()) {
            return Ok(Some(hit));
        }
        Ok(self
            .kospi200()
            .await?
            .into_iter()
            .find(|s| s.code == code.as_str()))
    }

    /// Span of raw collected data for a stock.
    pub async fn date_range(&self, code: &Identity) -> Result<DateRange, SdkError> {
        Ok(self.client.http.get_date_range(code.as_str()).await?.into())
    }

    /// Re-pull the full listing from the trading API.
    pub async fn refresh(&self) -> Result<RefreshSummary, SdkError> {
        let summary: RefreshSummary = self.client.http.refresh_stock_list().await?.into();
        tracing::info!(
            success = summary.success,
            total = summary.total_count,
            "Stock list refreshed"
        );
        self.invalidate().await;
        Ok(summary)
    }

    /// Drop the cached KOSPI200 list.
    pub async fn invalidate(&self) {
        *self.client.kospi200_cache.write().await = None;
    }
}
