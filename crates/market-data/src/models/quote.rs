use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Latest market quote for a symbol
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    /// Symbol as requested (uppercased)
    pub symbol: String,

    /// Timestamp of the quote
    pub timestamp: DateTime<Utc>,

    /// Current/last traded price
    pub price: Decimal,

    /// Opening price of the session
    #[serde(skip_serializing_if = "Option::is_none")]
    pub open: Option<Decimal>,

    /// Session high
    #[serde(skip_serializing_if = "Option::is_none")]
    pub high: Option<Decimal>,

    /// Session low
    #[serde(skip_serializing_if = "Option::is_none")]
    pub low: Option<Decimal>,

    /// Previous session close
    #[serde(skip_serializing_if = "Option::is_none")]
    pub previous_close: Option<Decimal>,

    /// Trading volume
    #[serde(skip_serializing_if = "Option::is_none")]
    pub volume: Option<u64>,

    /// Quote currency
    pub currency: String,

    /// Source of the quote (YAHOO, ALPHA_VANTAGE, etc.)
    pub source: String,
}

impl Quote {
    /// Create a new quote with minimal required fields
    pub fn new(
        symbol: impl Into<String>,
        timestamp: DateTime<Utc>,
        price: Decimal,
        currency: impl Into<String>,
        source: impl Into<String>,
    ) -> Self {
        Self {
            symbol: symbol.into(),
            timestamp,
            price,
            open: None,
            high: None,
            low: None,
            previous_close: None,
            volume: None,
            currency: currency.into(),
            source: source.into(),
        }
    }

    /// Absolute change against the previous close, when known
    pub fn change(&self) -> Option<Decimal> {
        self.previous_close.map(|prev| self.price - prev)
    }

    /// Percentage change against the previous close, when known and non-zero
    pub fn change_percent(&self) -> Option<Decimal> {
        let prev = self.previous_close?;
        if prev.is_zero() {
            return None;
        }
        Some((self.price - prev) / prev * Decimal::ONE_HUNDRED)
    }
}
