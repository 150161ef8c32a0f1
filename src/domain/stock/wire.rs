//! Wire types for the stock list (REST).

use serde::{Deserialize, Serialize};

/// A listed stock as returned by search and the KOSPI200 list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StockSearchResult {
    pub code: String,
    pub name: String,
    #[serde(default)]
    pub market_name: String,
    #[serde(default)]
    pub sector: Option<String>,
}

/// Per-market count in a refresh summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketCount {
    pub market_type: String,
    pub count: u64,
}

/// `POST /api/v1/stock-list/refresh` response.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StockListRefreshResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub total_count: Option<u64>,
    #[serde(default)]
    pub markets: Option<Vec<MarketCount>>,
}
