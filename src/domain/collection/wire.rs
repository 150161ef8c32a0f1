//! Wire types for investor-flow collection (REST + SSE).

use crate::shared::serde_util::date_list;
use serde::{Deserialize, Serialize};

/// Query options the collection endpoints share.
///
/// Defaults: quantities (`amtQtyTp = 2`), net buying (`trdeTp = 0`),
/// unit of one share (`unitTp = 1`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchRequest {
    pub amt_qty_tp: String,
    pub trde_tp: String,
    pub unit_tp: String,
}

impl Default for BatchRequest {
    fn default() -> Self {
        Self {
            amt_qty_tp: "2".to_string(),
            trde_tp: "0".to_string(),
            unit_tp: "1".to_string(),
        }
    }
}

/// `POST /api/v1/investor-chart/fetch/status` body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FetchStatusRequest {
    pub stk_cd: String,
    pub dt: String,
    #[serde(flatten)]
    pub options: BatchRequest,
}

/// Dates the trading API returned for one request, split by whether the
/// backend stored them or already had them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FetchStatusResponse {
    #[serde(default, deserialize_with = "date_list::deserialize")]
    pub saved_dates: Vec<String>,
    #[serde(default, deserialize_with = "date_list::deserialize")]
    pub duplicate_dates: Vec<String>,
}

/// One progress event of a KOSPI200 batch run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchProgress {
    #[serde(default)]
    pub current_stock_code: Option<String>,
    #[serde(default)]
    pub current_stock_name: Option<String>,
    #[serde(default)]
    pub processed_count: u64,
    #[serde(default)]
    pub total_count: u64,
    #[serde(default)]
    pub received_count: u64,
    #[serde(default)]
    pub saved_count: u64,
    #[serde(default)]
    pub duplicate_count: u64,
    #[serde(default)]
    pub error_count: u64,
    #[serde(default)]
    pub cumulative_received_count: u64,
    #[serde(default)]
    pub cumulative_saved_count: u64,
    #[serde(default)]
    pub errors: Vec<String>,
    #[serde(default)]
    pub completed: bool,
}
