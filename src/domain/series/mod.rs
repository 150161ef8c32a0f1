//! Series domain — date-keyed statistic points, the chart cache, page requests.

#[cfg(feature = "http")]
pub mod client;
mod convert;
pub mod state;
pub mod wire;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::collections::BTreeMap;

use crate::shared::{DateKey, Identity, Period};

pub use state::SeriesCache;

// ─── Fields ──────────────────────────────────────────────────────────────────

/// Investor categories reported by the exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Investor {
    Frgnr,
    Orgn,
    IndInvsr,
    FnncInvt,
    Insrnc,
    Invtrt,
    EtcFnnc,
    Bank,
    PenfndEtc,
    SamoFund,
    Natn,
    EtcCorp,
    Natfor,
}

impl Investor {
    pub const ALL: [Investor; 13] = [
        Investor::Frgnr,
        Investor::Orgn,
        Investor::IndInvsr,
        Investor::FnncInvt,
        Investor::Insrnc,
        Investor::Invtrt,
        Investor::EtcFnnc,
        Investor::Bank,
        Investor::PenfndEtc,
        Investor::SamoFund,
        Investor::Natn,
        Investor::EtcCorp,
        Investor::Natfor,
    ];

    /// Key used in the `investors=` query parameter.
    pub fn request_key(&self) -> &'static str {
        match self {
            Self::Frgnr => "frgnr",
            Self::Orgn => "orgn",
            Self::IndInvsr => "ind_invsr",
            Self::FnncInvt => "fnnc_invt",
            Self::Insrnc => "insrnc",
            Self::Invtrt => "invtrt",
            Self::EtcFnnc => "etc_fnnc",
            Self::Bank => "bank",
            Self::PenfndEtc => "penfnd_etc",
            Self::SamoFund => "samo_fund",
            Self::Natn => "natn",
            Self::EtcCorp => "etc_corp",
            Self::Natfor => "natfor",
        }
    }

    /// Key used in statistic response points.
    pub fn wire_key(&self) -> &'static str {
        match self {
            Self::Frgnr => "frgnr",
            Self::Orgn => "orgn",
            Self::IndInvsr => "indInvsr",
            Self::FnncInvt => "fnncInvt",
            Self::Insrnc => "insrnc",
            Self::Invtrt => "invtrt",
            Self::EtcFnnc => "etcFnnc",
            Self::Bank => "bank",
            Self::PenfndEtc => "penfndEtc",
            Self::SamoFund => "samoFund",
            Self::Natn => "natn",
            Self::EtcCorp => "etcCorp",
            Self::Natfor => "natfor",
        }
    }

    /// Reverse of [`Investor::wire_key`]. Also accepts the `ind` shorthand.
    pub fn from_wire_key(key: &str) -> Option<Investor> {
        if key == "ind" {
            return Some(Investor::IndInvsr);
        }
        Investor::ALL.into_iter().find(|inv| inv.wire_key() == key)
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Frgnr => "외국인",
            Self::Orgn => "기관계",
            Self::IndInvsr => "개인",
            Self::FnncInvt => "금융투자",
            Self::Insrnc => "보험",
            Self::Invtrt => "투신",
            Self::EtcFnnc => "기타금융",
            Self::Bank => "은행",
            Self::PenfndEtc => "연기금등",
            Self::SamoFund => "사모펀드",
            Self::Natn => "국가",
            Self::EtcCorp => "기타법인",
            Self::Natfor => "내국인",
        }
    }

    /// Comma-joined request keys, e.g. `frgnr,orgn`.
    pub fn join_request_keys(investors: &[Investor]) -> String {
        investors
            .iter()
            .map(Investor::request_key)
            .collect::<Vec<_>>()
            .join(",")
    }
}

impl std::fmt::Display for Investor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.request_key())
    }
}

/// A plottable field: one investor category, or the overlay price line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Field {
    Investor(Investor),
    CurrentPrice,
}

impl Field {
    /// Response key for this field on a chart of `kind`.
    ///
    /// Correlation points suffix investor keys with `Corr`; the individual
    /// investor is abbreviated to `indCorr`.
    pub fn wire_key(&self, kind: ChartKind) -> Cow<'static, str> {
        match (self, kind) {
            (Field::CurrentPrice, _) => Cow::Borrowed("curPrc"),
            (Field::Investor(Investor::IndInvsr), ChartKind::Correlation) => {
                Cow::Borrowed("indCorr")
            }
            (Field::Investor(inv), ChartKind::Correlation) => {
                Cow::Owned(format!("{}Corr", inv.wire_key()))
            }
            (Field::Investor(inv), _) => Cow::Borrowed(inv.wire_key()),
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Field::Investor(inv) => inv.label(),
            Field::CurrentPrice => "현재가",
        }
    }
}

impl From<Investor> for Field {
    fn from(inv: Investor) -> Self {
        Field::Investor(inv)
    }
}

/// Which precomputed statistic a chart shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChartKind {
    /// Per-stock investor net-buy moving average.
    MovingAverage,
    /// Per-sector investor net-buy moving average.
    SectorMovingAverage,
    /// Per-stock rolling correlation between investor flow and price.
    Correlation,
}

impl ChartKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MovingAverage => "moving_average",
            Self::SectorMovingAverage => "sector_moving_average",
            Self::Correlation => "correlation",
        }
    }
}

impl std::fmt::Display for ChartKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ─── Points ──────────────────────────────────────────────────────────────────

/// One day of a statistic series.
///
/// `date` is the raw key as received; malformed keys are kept here and
/// dropped at projection time. Absent values are `None`, never zero.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SeriesPoint {
    pub date: String,
    pub values: BTreeMap<String, Option<f64>>,
}

impl SeriesPoint {
    pub fn new(date: impl Into<String>) -> Self {
        Self {
            date: date.into(),
            values: BTreeMap::new(),
        }
    }

    pub fn with(mut self, key: impl Into<String>, value: Option<f64>) -> Self {
        self.values.insert(key.into(), value);
        self
    }

    pub fn value(&self, key: &str) -> Option<f64> {
        self.values.get(key).copied().flatten()
    }
}

/// A single data point on a line series, in the chart's native dates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LinePoint {
    pub time: NaiveDate,
    pub value: f64,
}

// ─── Pages ───────────────────────────────────────────────────────────────────

/// A bounded request for history.
#[derive(Debug, Clone, PartialEq)]
pub struct PageRequest {
    pub identity: Identity,
    /// Trading days requested.
    pub lookback_days: u32,
    /// Investor categories to include.
    pub investors: Vec<Investor>,
    pub period: Period,
    /// `None` = most recent days ending now; `Some(d)` = days strictly before `d`.
    pub before: Option<DateKey>,
}

impl PageRequest {
    pub fn initial(identity: Identity, period: Period) -> Self {
        Self {
            identity,
            lookback_days: period.load_days(),
            investors: Investor::ALL.to_vec(),
            period,
            before: None,
        }
    }

    pub fn older(identity: Identity, period: Period, before: DateKey) -> Self {
        Self {
            identity,
            lookback_days: Period::OLDER_PAGE_DAYS,
            investors: Investor::ALL.to_vec(),
            period,
            before: Some(before),
        }
    }
}

/// A page of points, ascending by date. Empty = no history at that boundary.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PageResponse {
    pub identity: Identity,
    pub sector: Option<String>,
    pub period: Option<Period>,
    pub points: Vec<SeriesPoint>,
    pub message: Option<String>,
}

impl PageResponse {
    /// Newest date in the page, if it is a well-formed key.
    pub fn newest_date(&self) -> Option<DateKey> {
        self.points.last().and_then(|p| DateKey::parse(&p.date).ok())
    }
}

// ─── Raw-data range / recompute ──────────────────────────────────────────────

/// Span of raw (unaggregated) data the backend holds for an identity.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DateRange {
    pub start: Option<DateKey>,
    pub end: Option<DateKey>,
}

/// Outcome of a backend recompute trigger.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RecomputeResult {
    pub success: bool,
    pub message: String,
    pub updated_max_date: Option<DateKey>,
    pub row_count: Option<u64>,
    pub elapsed_seconds: Option<f64>,
}
