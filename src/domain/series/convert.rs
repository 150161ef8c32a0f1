//! Wire → domain conversions for statistic pages.

use super::wire::{ChartResponse, DateRangeResponse, RecomputeResponse};
use super::{DateRange, PageResponse, RecomputeResult, SeriesPoint};
use crate::shared::serde_util::lenient_f64;
use crate::shared::{DateKey, Identity, Period};
use serde_json::{Map, Value};

const DATE_FIELD: &str = "dt";

impl ChartResponse {
    /// Convert to a page. `requested` fills in a missing identity.
    ///
    /// Points are sorted ascending by raw date; rows without a date are dropped.
    pub fn into_page(self, requested: &Identity) -> PageResponse {
        let mut points: Vec<SeriesPoint> = self.data.into_iter().filter_map(point_from_row).collect();
        points.sort_by(|a, b| a.date.cmp(&b.date));

        PageResponse {
            identity: self
                .code
                .filter(|c| !c.is_empty())
                .map(Identity::from)
                .unwrap_or_else(|| requested.clone()),
            sector: self.sector,
            period: self.period.map(Period),
            points,
            message: self.message.filter(|m| !m.is_empty()),
        }
    }
}

fn point_from_row(mut row: Map<String, Value>) -> Option<SeriesPoint> {
    let date = match row.remove(DATE_FIELD)? {
        Value::String(s) => s,
        Value::Number(n) => n.to_string(),
        _ => return None,
    };

    let values = row
        .iter()
        .map(|(key, value)| (key.clone(), lenient_f64(value)))
        .collect();

    Some(SeriesPoint { date, values })
}

impl From<DateRangeResponse> for DateRange {
    fn from(wire: DateRangeResponse) -> Self {
        Self {
            start: parse_optional(wire.start_date.as_deref()),
            end: parse_optional(wire.end_date.as_deref()),
        }
    }
}

impl From<RecomputeResponse> for RecomputeResult {
    fn from(wire: RecomputeResponse) -> Self {
        Self {
            success: wire.success,
            message: wire.message.unwrap_or_default(),
            updated_max_date: parse_optional(wire.updated_max_date.as_deref()),
            row_count: wire.row_count,
            elapsed_seconds: wire.elapsed_seconds,
        }
    }
}

fn parse_optional(raw: Option<&str>) -> Option<DateKey> {
    let raw = raw?.trim();
    if raw.is_empty() {
        return None;
    }
    match DateKey::parse(raw) {
        Ok(key) => Some(key),
        Err(e) => {
            tracing::warn!(error = %e, "Ignoring malformed date");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_into_page_sorts_and_parses_values() {
        let resp: ChartResponse = serde_json::from_str(
            r#"{
                "stkCd": "005930",
                "period": 20,
                "data": [
                    {"dt": "20240103", "frgnr": "12.5", "orgn": null},
                    {"dt": 20240102, "frgnr": -3, "orgn": "n/a"},
                    {"frgnr": 1}
                ]
            }"#,
        )
        .unwrap();

        let page = resp.into_page(&Identity::from("ignored"));
        assert_eq!(page.identity.as_str(), "005930");
        assert_eq!(page.period, Some(Period(20)));
        assert_eq!(page.points.len(), 2);
        assert_eq!(page.points[0].date, "20240102");
        assert_eq!(page.points[0].value("frgnr"), Some(-3.0));
        assert_eq!(page.points[0].value("orgn"), None);
        assert_eq!(page.points[1].value("frgnr"), Some(12.5));
        assert_eq!(page.newest_date().unwrap().as_str(), "20240103");
    }

    #[test]
    fn test_into_page_falls_back_to_requested_identity() {
        let page = ChartResponse::default().into_page(&Identity::from("G25"));
        assert_eq!(page.identity.as_str(), "G25");
        assert!(page.points.is_empty());
    }

    #[test]
    fn test_date_range_normalizes_dashes() {
        let range: DateRange = DateRangeResponse {
            start_date: Some("2015-01-02".to_string()),
            end_date: Some("bogus".to_string()),
        }
        .into();
        assert_eq!(range.start.unwrap().as_str(), "20150102");
        assert!(range.end.is_none());
    }
}
