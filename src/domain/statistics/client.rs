//! Statistics sub-client — recompute, investor share, sector lookups.

use crate::client::StockflowClient;
use crate::domain::series::RecomputeResult;
use crate::domain::statistics::{
    supply_demand_points, InvestorRatio, RecomputeKind, SectorInfo, SectorStock, SupplyDemandPoint,
};
use crate::error::SdkError;
use crate::shared::{DateKey, Identity, Period};

/// Sub-client for statistics operations.
pub struct Statistics<'a> {
    pub(crate) client: &'a StockflowClient,
}

impl<'a> Statistics<'a> {
    /// Ask the backend to rebuild one statistic for a stock.
    pub async fn recompute(
        &self,
        kind: RecomputeKind,
        code: &Identity,
    ) -> Result<RecomputeResult, SdkError> {
        let result: RecomputeResult = self.client.http.recompute(kind, code.as_str()).await?.into();
        tracing::info!(
            stock = %code,
            kind = %kind,
            success = result.success,
            updated_max_date = ?result.updated_max_date,
            "Recompute finished"
        );
        Ok(result)
    }

    /// Rebuild every statistic in turn. Failures are logged and the
    /// remaining kinds still run.
    pub async fn recompute_all(&self, code: &Identity) -> Vec<(RecomputeKind, Result<RecomputeResult, SdkError>)> {
        let mut out = Vec::with_capacity(RecomputeKind::ALL.len());
        for kind in RecomputeKind::ALL {
            let result = self.recompute(kind, code).await;
            if let Err(e) = &result {
                tracing::warn!(stock = %code, kind = %kind, error = %e, "Recompute failed");
            }
            out.push((kind, result));
        }
        out
    }

    /// Rebuild one statistic for the whole stock universe.
    pub async fn recompute_kospi200(&self, kind: RecomputeKind) -> Result<RecomputeResult, SdkError> {
        tracing::info!(kind = %kind, "Recomputing statistic for all stocks");
        let result: RecomputeResult = self.client.http.recompute_kospi200(kind).await?.into();
        tracing::info!(
            kind = %kind,
            success = result.success,
            rows = ?result.row_count,
            "Bulk recompute finished"
        );
        Ok(result)
    }

    /// Investor share over the trailing year.
    pub async fn investor_ratio(&self, code: &Identity) -> Result<InvestorRatio, SdkError> {
        Ok(self.client.http.get_investor_ratio(code.as_str()).await?.into())
    }

    /// Cumulative net buying per investor from `from` (or the first stored
    /// day) to `to` (or the latest), ascending.
    pub async fn supply_demand(
        &self,
        code: &Identity,
        from: Option<&DateKey>,
        to: Option<&DateKey>,
    ) -> Result<Vec<SupplyDemandPoint>, SdkError> {
        let rows = self
            .client
            .http
            .get_supply_demand(
                code.as_str(),
                from.map(DateKey::as_str),
                to.map(DateKey::as_str),
            )
            .await?;
        Ok(supply_demand_points(rows))
    }

    /// Investor share over `[from, to]` using the moving-average tables.
    pub async fn investor_ratio_ma(
        &self,
        code: &Identity,
        period: Period,
        from: Option<&DateKey>,
        to: Option<&DateKey>,
    ) -> Result<InvestorRatio, SdkError> {
        Ok(self
            .client
            .http
            .get_investor_ratio_ma(
                code.as_str(),
                period.days(),
                from.map(DateKey::as_str),
                to.map(DateKey::as_str),
            )
            .await?
            .into())
    }

    pub async fn sectors(&self) -> Result<Vec<SectorInfo>, SdkError> {
        Ok(self.client.http.get_sectors().await?)
    }

    pub async fn sector_stocks(&self, sector: &Identity) -> Result<Vec<SectorStock>, SdkError> {
        Ok(self.client.http.get_sector_stocks(sector.as_str()).await?)
    }
}
