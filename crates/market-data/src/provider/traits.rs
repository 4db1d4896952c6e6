//! Market data provider trait definitions.

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::errors::{MarketDataError, Result};
use crate::models::{CompanyProfile, Fundamentals, HistoricalPrice, Interval, Quote, SearchResult};

/// Trait for market data providers.
///
/// Implement this trait to plug a new market data source into the service.
/// Selection strategies, the health monitor and the cost tracker all key
/// their state on [`id`](Self::id).
///
/// # Example
///
/// ```ignore
/// use async_trait::async_trait;
/// use quotehub_market_data::provider::MarketDataProvider;
///
/// struct MyProvider {
///     api_key: String,
/// }
///
/// #[async_trait]
/// impl MarketDataProvider for MyProvider {
///     fn id(&self) -> &'static str {
///         "MY_PROVIDER"
///     }
///
///     async fn get_quote(&self, symbol: &str) -> Result<Quote> {
///         // call the vendor API
///     }
///
///     // ... implement the remaining operations
/// }
/// ```
#[async_trait]
pub trait MarketDataProvider: Send + Sync {
    /// Unique identifier for this provider.
    ///
    /// Should be a constant string like "YAHOO", "ALPHA_VANTAGE", etc.
    fn id(&self) -> &'static str;

    /// Fetch the latest quote for a symbol.
    async fn get_quote(&self, symbol: &str) -> Result<Quote>;

    /// Fetch price history for a symbol.
    ///
    /// Both ends of the date range are inclusive. Bars should be ordered by
    /// date ascending.
    async fn get_historical_prices(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
        interval: Interval,
    ) -> Result<Vec<HistoricalPrice>>;

    /// Fetch fundamentals for a symbol.
    ///
    /// Default implementation returns `NotSupported`. The service counts that
    /// as a failed request but not as a health failure.
    async fn get_fundamentals(&self, symbol: &str) -> Result<Fundamentals> {
        let _ = symbol;
        Err(MarketDataError::NotSupported {
            operation: "fundamentals".to_string(),
            provider: self.id().to_string(),
        })
    }

    /// Fetch the company profile for a symbol.
    ///
    /// Default implementation returns `NotSupported`.
    async fn get_company_profile(&self, symbol: &str) -> Result<CompanyProfile> {
        let _ = symbol;
        Err(MarketDataError::NotSupported {
            operation: "profile".to_string(),
            provider: self.id().to_string(),
        })
    }

    /// Search for symbols matching the query, returning at most `limit` results.
    ///
    /// Default implementation returns `NotSupported`.
    async fn search_symbols(&self, query: &str, limit: usize) -> Result<Vec<SearchResult>> {
        let _ = (query, limit);
        Err(MarketDataError::NotSupported {
            operation: "search".to_string(),
            provider: self.id().to_string(),
        })
    }

    /// Lightweight liveness probe used by the health monitor.
    ///
    /// `Ok(false)` and `Err(_)` are both treated as a failed check.
    async fn is_healthy(&self) -> Result<bool>;
}
