use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Sampling interval for price history.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq, Serialize, Deserialize)]
pub enum Interval {
    #[default]
    Daily,
    Weekly,
    Monthly,
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Daily => write!(f, "Daily"),
            Self::Weekly => write!(f, "Weekly"),
            Self::Monthly => write!(f, "Monthly"),
        }
    }
}

impl FromStr for Interval {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "daily" | "1d" => Ok(Self::Daily),
            "weekly" | "1wk" => Ok(Self::Weekly),
            "monthly" | "1mo" => Ok(Self::Monthly),
            other => Err(format!("Unknown interval: {}", other)),
        }
    }
}

/// One OHLCV bar of price history
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HistoricalPrice {
    /// Bar date
    pub date: NaiveDate,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,

    /// Close adjusted for splits and dividends
    #[serde(skip_serializing_if = "Option::is_none")]
    pub adjusted_close: Option<Decimal>,

    pub volume: u64,
}
