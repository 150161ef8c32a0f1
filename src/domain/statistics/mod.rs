//! Statistics domain — recompute triggers, investor share, sectors.

#[cfg(feature = "http")]
pub mod client;
pub mod wire;

use crate::domain::series::{ChartKind, Investor, PageResponse};
use crate::shared::serde_util::lenient_f64;
use crate::shared::{DateKey, Identity, Period};
use std::collections::BTreeMap;

pub use wire::{SectorInfo, SectorStock};

const NET_BUY_QTY: &str = "NetBuyQty";
const NET_BUY_AMOUNT: &str = "NetBuyAmount";
/// Column prefix of the combined foreign + institutional series.
const FOREIGN_AND_INSTITUTION: &str = "frgnrInvsrOrgn";

/// Precomputed statistic the backend can rebuild for one stock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecomputeKind {
    MovingAverage,
    Correlation,
    SupplyDemand,
}

impl RecomputeKind {
    pub const ALL: [RecomputeKind; 3] = [
        RecomputeKind::MovingAverage,
        RecomputeKind::Correlation,
        RecomputeKind::SupplyDemand,
    ];

    pub fn path_segment(&self) -> &'static str {
        match self {
            Self::MovingAverage => "moving-average",
            Self::Correlation => "correlation",
            Self::SupplyDemand => "supply-demand",
        }
    }

    /// Recompute that refreshes a chart of `kind`. Sector charts are
    /// aggregated server-side and have none.
    pub fn for_chart(kind: ChartKind) -> Option<RecomputeKind> {
        match kind {
            ChartKind::MovingAverage => Some(Self::MovingAverage),
            ChartKind::Correlation => Some(Self::Correlation),
            ChartKind::SectorMovingAverage => None,
        }
    }
}

impl std::fmt::Display for RecomputeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.path_segment())
    }
}

/// Share of trading per investor category over a window.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct InvestorRatio {
    pub code: String,
    pub period: Option<Period>,
    pub from_date: Option<String>,
    pub to_date: Option<String>,
    pub data_count: u64,
    pub shares: BTreeMap<Investor, f64>,
    pub message: Option<String>,
}

impl From<wire::InvestorRatioResponse> for InvestorRatio {
    fn from(wire: wire::InvestorRatioResponse) -> Self {
        let shares = wire
            .shares
            .iter()
            .filter_map(|(key, value)| Some((Investor::from_wire_key(key)?, lenient_f64(value)?)))
            .collect();

        Self {
            code: wire.stk_cd,
            period: wire.period.map(Period),
            from_date: wire.from_date,
            to_date: wire.to_date,
            data_count: wire.data_count.unwrap_or(0),
            shares,
            message: wire.message,
        }
    }
}

/// Cumulative net buying per investor on one day.
#[derive(Debug, Clone, PartialEq)]
pub struct SupplyDemandPoint {
    pub date: DateKey,
    pub current_price: Option<f64>,
    pub sector: Option<String>,
    pub net_buy_qty: BTreeMap<Investor, f64>,
    pub net_buy_amount: BTreeMap<Investor, f64>,
    /// Foreign plus institutional, reported as its own column.
    pub combined_qty: Option<f64>,
    pub combined_amount: Option<f64>,
}

/// Column prefix → investor. Foreign and individual columns carry the
/// `Invsr` suffix here.
fn investor_from_prefix(prefix: &str) -> Option<Investor> {
    match prefix {
        "frgnrInvsr" => Some(Investor::Frgnr),
        _ => Investor::from_wire_key(prefix),
    }
}

impl TryFrom<wire::SupplyDemandRow> for SupplyDemandPoint {
    type Error = crate::shared::DateKeyError;

    fn try_from(row: wire::SupplyDemandRow) -> Result<Self, Self::Error> {
        let mut point = SupplyDemandPoint {
            date: DateKey::parse(&row.dt)?,
            current_price: row.cur_prc.as_ref().and_then(lenient_f64),
            sector: row.sector,
            net_buy_qty: BTreeMap::new(),
            net_buy_amount: BTreeMap::new(),
            combined_qty: None,
            combined_amount: None,
        };

        for (key, value) in &row.columns {
            let (prefix, is_qty) = if let Some(p) = key.strip_suffix(NET_BUY_QTY) {
                (p, true)
            } else if let Some(p) = key.strip_suffix(NET_BUY_AMOUNT) {
                (p, false)
            } else {
                continue;
            };
            let Some(value) = lenient_f64(value) else {
                continue;
            };

            if prefix == FOREIGN_AND_INSTITUTION {
                if is_qty {
                    point.combined_qty = Some(value);
                } else {
                    point.combined_amount = Some(value);
                }
            } else if let Some(investor) = investor_from_prefix(prefix) {
                let target = if is_qty {
                    &mut point.net_buy_qty
                } else {
                    &mut point.net_buy_amount
                };
                target.insert(investor, value);
            }
        }
        Ok(point)
    }
}

/// Convert rows, dropping undated ones, ascending by date.
pub fn supply_demand_points(rows: Vec<wire::SupplyDemandRow>) -> Vec<SupplyDemandPoint> {
    let mut points: Vec<SupplyDemandPoint> = rows
        .into_iter()
        .filter_map(|row| {
            let dt = row.dt.clone();
            match SupplyDemandPoint::try_from(row) {
                Ok(point) => Some(point),
                Err(e) => {
                    tracing::warn!(dt = %dt, error = %e, "Dropping supply/demand row with bad date");
                    None
                }
            }
        })
        .collect();
    points.sort_by(|a, b| a.date.cmp(&b.date));
    points
}

/// Pages for every sector, keyed by sector code.
pub fn all_sector_pages(wire: wire::AllSectorsChartResponse) -> BTreeMap<String, PageResponse> {
    wire.sectors
        .into_iter()
        .map(|(code, chart)| {
            let page = chart.into_page(&Identity::new(code.as_str()));
            (code, page)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_investor_ratio_from_wire() {
        let wire: wire::InvestorRatioResponse = serde_json::from_str(
            r#"{
                "stkCd": "005930", "period": 20,
                "fromDate": "20240102", "toDate": "20240315", "dataCount": 50,
                "frgnr": 31.2, "orgn": "18.4", "ind": 40.1, "natfor": null,
                "unknownKey": 9
            }"#,
        )
        .unwrap();
        let ratio: InvestorRatio = wire.into();
        assert_eq!(ratio.code, "005930");
        assert_eq!(ratio.period, Some(Period(20)));
        assert_eq!(ratio.data_count, 50);
        assert_eq!(ratio.shares.get(&Investor::Frgnr), Some(&31.2));
        assert_eq!(ratio.shares.get(&Investor::Orgn), Some(&18.4));
        assert_eq!(ratio.shares.get(&Investor::IndInvsr), Some(&40.1));
        assert!(!ratio.shares.contains_key(&Investor::Natfor));
        assert_eq!(ratio.shares.len(), 3);
    }

    #[test]
    fn test_supply_demand_point_from_row() {
        let row: wire::SupplyDemandRow = serde_json::from_str(
            r#"{
                "dt": "2024-03-15", "curPrc": "78000", "sector": "전기전자",
                "frgnrInvsr": 10,
                "frgnrInvsrNetBuyQty": 1200, "frgnrInvsrNetBuyAmount": 93600000,
                "indInvsrNetBuyQty": -800, "orgnNetBuyAmount": null,
                "frgnrInvsrOrgnNetBuyQty": 400
            }"#,
        )
        .unwrap();
        let point = SupplyDemandPoint::try_from(row).unwrap();
        assert_eq!(point.date.as_str(), "20240315");
        assert_eq!(point.current_price, Some(78000.0));
        assert_eq!(point.net_buy_qty.get(&Investor::Frgnr), Some(&1200.0));
        assert_eq!(point.net_buy_qty.get(&Investor::IndInvsr), Some(&-800.0));
        assert_eq!(point.net_buy_amount.get(&Investor::Frgnr), Some(&93600000.0));
        assert!(!point.net_buy_amount.contains_key(&Investor::Orgn));
        assert_eq!(point.combined_qty, Some(400.0));
        assert_eq!(point.combined_amount, None);
    }

    #[test]
    fn test_supply_demand_points_sorted_and_undated_dropped() {
        let rows: Vec<wire::SupplyDemandRow> = serde_json::from_str(
            r#"[{"dt": "2024-03-15"}, {"dt": ""}, {"dt": "2024-03-14"}]"#,
        )
        .unwrap();
        let dates: Vec<_> = supply_demand_points(rows)
            .into_iter()
            .map(|p| p.date.to_string())
            .collect();
        assert_eq!(dates, vec!["20240314", "20240315"]);
    }

    #[test]
    fn test_all_sector_pages_fill_identity() {
        let wire: wire::AllSectorsChartResponse = serde_json::from_str(
            r#"{"sectors": {"G25": {"data": [{"dt": "20240103"}, {"dt": "20240102"}]}}}"#,
        )
        .unwrap();
        let pages = all_sector_pages(wire);
        let page = &pages["G25"];
        assert_eq!(page.identity.as_str(), "G25");
        assert_eq!(page.points[0].date, "20240102");
    }

    #[test]
    fn test_recompute_for_chart() {
        assert_eq!(
            RecomputeKind::for_chart(ChartKind::MovingAverage),
            Some(RecomputeKind::MovingAverage)
        );
        assert_eq!(RecomputeKind::for_chart(ChartKind::SectorMovingAverage), None);
        assert_eq!(RecomputeKind::SupplyDemand.path_segment(), "supply-demand");
    }
}
