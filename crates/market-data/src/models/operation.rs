use std::fmt;

use serde::{Deserialize, Serialize};

/// A logical read operation served by the market data layer.
///
/// The string form doubles as the leading segment of cache keys.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Serialize, Deserialize)]
pub enum Operation {
    Quote,
    HistoricalPrices,
    Fundamentals,
    CompanyProfile,
    SymbolSearch,
}

impl Operation {
    pub const ALL: [Operation; 5] = [
        Operation::Quote,
        Operation::HistoricalPrices,
        Operation::Fundamentals,
        Operation::CompanyProfile,
        Operation::SymbolSearch,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Quote => "quote",
            Self::HistoricalPrices => "historical",
            Self::Fundamentals => "fundamentals",
            Self::CompanyProfile => "profile",
            Self::SymbolSearch => "search",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
