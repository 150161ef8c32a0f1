//! Wire types for statistic chart pages (REST).

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Chart page response, shared by the stock moving-average, sector
/// moving-average and correlation endpoints.
///
/// The identity arrives as `stkCd` or `sectorCd`, the window as `period`
/// or `corrDays`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartResponse {
    #[serde(default, alias = "stkCd", alias = "sectorCd")]
    pub code: Option<String>,
    #[serde(default, alias = "sectorNm")]
    pub sector: Option<String>,
    #[serde(default, alias = "corrDays")]
    pub period: Option<u32>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub data: Vec<Map<String, Value>>,
    #[serde(default)]
    pub message: Option<String>,
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<Map<String, Value>>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(Option::<Vec<Map<String, Value>>>::deserialize(deserializer)?.unwrap_or_default())
}

/// `{startDate, endDate}` for raw collected data.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DateRangeResponse {
    #[serde(default)]
    pub start_date: Option<String>,
    #[serde(default)]
    pub end_date: Option<String>,
}

/// Recompute trigger response.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecomputeResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub updated_max_date: Option<String>,
    #[serde(default)]
    pub row_count: Option<u64>,
    #[serde(default)]
    pub elapsed_seconds: Option<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chart_response_stock_shape() {
        let json = r#"{
            "stkCd": "005930",
            "sector": "전기전자",
            "period": 20,
            "data": [{"dt": "20240102", "frgnr": 1.5, "curPrc": "78000"}]
        }"#;
        let resp: ChartResponse = serde_json::from_str(json).unwrap();
        assert_eq!(resp.code.as_deref(), Some("005930"));
        assert_eq!(resp.sector.as_deref(), Some("전기전자"));
        assert_eq!(resp.period, Some(20));
        assert_eq!(resp.data.len(), 1);
        assert!(resp.message.is_none());
    }

    #[test]
    fn test_chart_response_sector_and_correlation_shapes() {
        let sector: ChartResponse = serde_json::from_str(
            r#"{"sectorCd": "G25", "sectorNm": "자동차", "period": 5, "data": []}"#,
        )
        .unwrap();
        assert_eq!(sector.code.as_deref(), Some("G25"));
        assert_eq!(sector.sector.as_deref(), Some("자동차"));

        let corr: ChartResponse = serde_json::from_str(
            r#"{"stkCd": "000660", "corrDays": 60, "data": null, "message": "데이터 없음"}"#,
        )
        .unwrap();
        assert_eq!(corr.period, Some(60));
        assert!(corr.data.is_empty());
        assert_eq!(corr.message.as_deref(), Some("데이터 없음"));
    }

    #[test]
    fn test_recompute_response() {
        let resp: RecomputeResponse = serde_json::from_str(
            r#"{"success": true, "message": "ok", "updatedMaxDate": "20240315", "rowCount": 12}"#,
        )
        .unwrap();
        assert!(resp.success);
        assert_eq!(resp.updated_max_date.as_deref(), Some("20240315"));
        assert_eq!(resp.row_count, Some(12));
    }
}
