//! Charts sub-client — statistic pages by chart kind.

use crate::client::StockflowClient;
use crate::domain::series::{ChartKind, Investor, PageRequest, PageResponse};
use crate::domain::statistics::all_sector_pages;
use crate::error::SdkError;
use crate::shared::{DateKey, Period};
use std::collections::BTreeMap;

/// Sub-client for chart page queries.
pub struct Charts<'a> {
    pub(crate) client: &'a StockflowClient,
}

impl<'a> Charts<'a> {
    /// Fetch one page of a chart.
    pub async fn page(&self, kind: ChartKind, request: &PageRequest) -> Result<PageResponse, SdkError> {
        let http = &self.client.http;
        let code = request.identity.as_str();
        let before = request.before.as_ref().map(|d| d.as_str());
        let investors = Investor::join_request_keys(&request.investors);

        tracing::debug!(
            kind = %kind,
            identity = code,
            days = request.lookback_days,
            period = request.period.days(),
            before = ?before,
            "Fetching chart page"
        );

        let resp = match kind {
            ChartKind::MovingAverage => {
                http.get_moving_average_chart(
                    code,
                    request.lookback_days,
                    &investors,
                    request.period.days(),
                    before,
                )
                .await?
            }
            ChartKind::SectorMovingAverage => {
                http.get_sector_ma_chart(
                    code,
                    request.lookback_days,
                    &investors,
                    request.period.days(),
                    before,
                )
                .await?
            }
            ChartKind::Correlation => {
                http.get_correlation_chart(code, request.period.days(), request.lookback_days, before)
                    .await?
            }
        };

        Ok(resp.into_page(&request.identity))
    }

    /// Sector moving-average pages for every sector in one request, keyed
    /// by sector code.
    pub async fn all_sectors(
        &self,
        lookback_days: u32,
        investors: &[Investor],
        period: Period,
        before: Option<&DateKey>,
    ) -> Result<BTreeMap<String, PageResponse>, SdkError> {
        let resp = self
            .client
            .http
            .get_all_sectors_chart(
                lookback_days,
                &Investor::join_request_keys(investors),
                period.days(),
                before.map(DateKey::as_str),
            )
            .await?;
        let pages = all_sector_pages(resp);
        tracing::debug!(sectors = pages.len(), "Fetched all sector charts");
        Ok(pages)
    }
}
