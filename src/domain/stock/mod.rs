//! Stock domain — listing lookups, search input classification, refresh summary.

#[cfg(feature = "http")]
pub mod client;
pub mod wire;

use crate::shared::{is_stock_code, Identity};
use serde::{Deserialize, Serialize};

pub use wire::{MarketCount, StockSearchResult as Stock};

/// What the search box was given.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchInput {
    /// Blank input; shows nothing and sends nothing.
    Empty,
    /// Six digits: used as a code directly.
    Code(Identity),
    /// Anything else is a name search.
    Keyword(String),
}

impl SearchInput {
    pub fn classify(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            SearchInput::Empty
        } else if is_stock_code(trimmed) {
            SearchInput::Code(Identity::from(trimmed))
        } else {
            SearchInput::Keyword(trimmed.to_string())
        }
    }
}

/// Result of a search-as-you-type lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchOutcome {
    /// Input was a code; select it without a lookup.
    Code(Identity),
    /// Matches for a keyword (possibly none).
    Matches(Vec<Stock>),
}

/// Outcome of refreshing the listing from the trading API.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RefreshSummary {
    pub success: bool,
    pub message: String,
    pub total_count: u64,
    pub markets: Vec<MarketCount>,
}

impl From<wire::StockListRefreshResponse> for RefreshSummary {
    fn from(wire: wire::StockListRefreshResponse) -> Self {
        Self {
            success: wire.success,
            message: wire.message,
            total_count: wire.total_count.unwrap_or(0),
            markets: wire.markets.unwrap_or_default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify() {
        assert_eq!(SearchInput::classify("   "), SearchInput::Empty);
        assert_eq!(
            SearchInput::classify(" 005930 "),
            SearchInput::Code(Identity::from("005930"))
        );
        assert_eq!(
            SearchInput::classify("삼성"),
            SearchInput::Keyword("삼성".to_string())
        );
        assert_eq!(
            SearchInput::classify("00593"),
            SearchInput::Keyword("00593".to_string())
        );
    }

    #[test]
    fn test_refresh_summary_defaults() {
        let summary: RefreshSummary = wire::StockListRefreshResponse {
            success: false,
            message: "키움 API 오류".to_string(),
            total_count: None,
            markets: None,
        }
        .into();
        assert_eq!(summary.total_count, 0);
        assert!(summary.markets.is_empty());
        assert_eq!(summary.message, "키움 API 오류");
    }
}
