//! Shared fixtures for integration tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use rust_decimal_macros::dec;

use quotehub_market_data::errors::{MarketDataError, Result};
use quotehub_market_data::settings::{ProviderCostSettings, ProviderSettings, RateLimitSettings};
use quotehub_market_data::{
    CompanyProfile, Fundamentals, HistoricalPrice, InMemoryCache, Interval, MarketDataCache, MarketDataProvider,
    MarketDataService, MarketDataSettings, Quote, SearchResult, StrategyKind,
};

/// Scriptable provider that counts every call it receives.
pub struct MockProvider {
    id: &'static str,
    failing: AtomicBool,
    healthy: AtomicBool,
    fundamentals: AtomicBool,
    calls: AtomicUsize,
}

impl MockProvider {
    pub fn new(id: &'static str) -> Arc<Self> {
        Arc::new(Self {
            id,
            failing: AtomicBool::new(false),
            healthy: AtomicBool::new(true),
            fundamentals: AtomicBool::new(true),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn failing(id: &'static str) -> Arc<Self> {
        let provider = Self::new(id);
        provider.set_failing(true);
        provider
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn set_healthy(&self, healthy: bool) {
        self.healthy.store(healthy, Ordering::SeqCst);
    }

    /// Make `get_fundamentals` answer `NotSupported`.
    pub fn without_fundamentals(&self) {
        self.fundamentals.store(false, Ordering::SeqCst);
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn begin(&self) -> Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            Err(MarketDataError::unavailable(self.id, "HTTP 503"))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl MarketDataProvider for MockProvider {
    fn id(&self) -> &'static str {
        self.id
    }

    async fn get_quote(&self, symbol: &str) -> Result<Quote> {
        self.begin()?;
        if symbol == "INVALID" {
            return Err(MarketDataError::SymbolNotFound {
                provider: self.id.to_string(),
                symbol: symbol.to_string(),
            });
        }
        Ok(Quote::new(symbol, Utc::now(), dec!(100.5), "USD", self.id))
    }

    async fn get_historical_prices(
        &self,
        _symbol: &str,
        start: NaiveDate,
        _end: NaiveDate,
        _interval: Interval,
    ) -> Result<Vec<HistoricalPrice>> {
        self.begin()?;
        Ok(vec![HistoricalPrice {
            date: start,
            open: dec!(99),
            high: dec!(101),
            low: dec!(98),
            close: dec!(100),
            adjusted_close: None,
            volume: 1_000,
        }])
    }

    async fn get_fundamentals(&self, symbol: &str) -> Result<Fundamentals> {
        self.begin()?;
        if !self.fundamentals.load(Ordering::SeqCst) {
            return Err(MarketDataError::NotSupported {
                operation: "fundamentals".to_string(),
                provider: self.id.to_string(),
            });
        }
        Ok(Fundamentals {
            symbol: symbol.to_string(),
            market_cap: Some(dec!(2950000000000)),
            pe_ratio: Some(dec!(29.4)),
            source: self.id.to_string(),
            ..Default::default()
        })
    }

    async fn get_company_profile(&self, symbol: &str) -> Result<CompanyProfile> {
        self.begin()?;
        Ok(CompanyProfile::with_name(symbol, "Mock Corp").source(self.id))
    }

    async fn search_symbols(&self, query: &str, limit: usize) -> Result<Vec<SearchResult>> {
        self.begin()?;
        Ok(vec![SearchResult::new(query.to_uppercase(), "Mock Corp", "NASDAQ", "EQUITY")]
            .into_iter()
            .take(limit)
            .collect())
    }

    async fn is_healthy(&self) -> Result<bool> {
        Ok(self.healthy.load(Ordering::SeqCst))
    }
}

pub fn providers(mocks: &[&Arc<MockProvider>]) -> Vec<Arc<dyn MarketDataProvider>> {
    mocks
        .iter()
        .map(|m| -> Arc<dyn MarketDataProvider> { (*m).clone() })
        .collect()
}

pub fn settings(
    strategy: StrategyKind,
    primary: &str,
    fallback: Option<&str>,
) -> MarketDataSettings {
    MarketDataSettings {
        primary_provider: primary.to_string(),
        fallback_provider: fallback.map(str::to_string),
        strategy,
        ..Default::default()
    }
}

pub fn with_rate_limit(
    mut settings: MarketDataSettings,
    provider: &str,
    per_minute: u32,
    per_day: u32,
) -> MarketDataSettings {
    let entry = settings
        .providers
        .entry(provider.to_string())
        .or_insert_with(ProviderSettings::default);
    entry.rate_limit = Some(RateLimitSettings {
        requests_per_minute: per_minute,
        requests_per_day: per_day,
    });
    settings
}

pub fn with_cost(
    mut settings: MarketDataSettings,
    provider: &str,
    cost: ProviderCostSettings,
) -> MarketDataSettings {
    let entry = settings
        .providers
        .entry(provider.to_string())
        .or_insert_with(ProviderSettings::default);
    entry.cost = cost;
    settings
}

pub fn new_cache() -> Arc<dyn MarketDataCache> {
    Arc::new(InMemoryCache::default())
}

pub fn service(
    settings: &MarketDataSettings,
    mocks: &[&Arc<MockProvider>],
    cache: Arc<dyn MarketDataCache>,
) -> MarketDataService {
    MarketDataService::from_settings(settings, providers(mocks), cache).unwrap()
}

