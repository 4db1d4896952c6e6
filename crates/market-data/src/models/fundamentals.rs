use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Fundamental data for a listed company.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Fundamentals {
    pub symbol: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub market_cap: Option<Decimal>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub pe_ratio: Option<Decimal>,

    /// Earnings per share (trailing twelve months)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub eps: Option<Decimal>,

    /// Dividend yield (as decimal, e.g., 0.025 for 2.5%)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dividend_yield: Option<Decimal>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub beta: Option<Decimal>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub revenue: Option<Decimal>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub profit_margin: Option<Decimal>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub week_52_high: Option<Decimal>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub week_52_low: Option<Decimal>,

    /// Provider that supplied the data
    pub source: String,
}
