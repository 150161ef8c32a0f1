//! Wire types for statistics lookups (REST).

use crate::domain::series::wire::ChartResponse;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// `GET /api/statistics/investor-ratio-ma/{code}` and
/// `GET /api/statistics/investor-ratio/{code}` response.
///
/// Per-investor shares arrive as top-level keys next to the metadata.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvestorRatioResponse {
    #[serde(default)]
    pub stk_cd: String,
    #[serde(default)]
    pub period: Option<u32>,
    #[serde(default)]
    pub from_date: Option<String>,
    #[serde(default)]
    pub to_date: Option<String>,
    #[serde(default)]
    pub data_count: Option<u64>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(flatten)]
    pub shares: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SectorInfo {
    pub sector_cd: String,
    #[serde(default)]
    pub sector_nm: String,
}

/// A constituent of a sector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectorStock {
    pub code: String,
    pub name: String,
}

/// One day of `GET /api/v1/analysis/supply-demand`.
///
/// Cumulative net buying arrives as `{prefix}NetBuyQty` and
/// `{prefix}NetBuyAmount` columns next to the daily flow columns.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SupplyDemandRow {
    #[serde(default)]
    pub dt: String,
    #[serde(default)]
    pub cur_prc: Option<Value>,
    #[serde(default)]
    pub sector: Option<String>,
    #[serde(flatten)]
    pub columns: Map<String, Value>,
}

/// `GET /api/v1/sector-ma/chart/all` response, keyed by sector code.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AllSectorsChartResponse {
    #[serde(default)]
    pub sectors: BTreeMap<String, ChartResponse>,
    #[serde(default)]
    pub message: Option<String>,
}
