//! Cache-aside market data service.
//!
//! [`MarketDataService`] is the read surface of the crate. It owns the
//! per-provider trackers, asks the configured strategy which provider serves
//! a cache miss, retries once against the strategy's fallback and, when every
//! attempt fails, serves the long-lived stale copy of the entry if one exists.

mod report;

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::NaiveDate;
use futures::future::{join_all, BoxFuture};
use futures::FutureExt;
use log::{debug, error, info, warn};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::cache::{cache_keys, CachePolicies, MarketDataCache};
use crate::errors::{ErrorKind, MarketDataError, Result};
use crate::models::{
    CompanyProfile, Fundamentals, HistoricalPrice, Interval, Operation, ProviderId, Quote,
    SearchResult,
};
use crate::provider::MarketDataProvider;
use crate::registry::{CostCalculator, CostTracker, HealthMonitor, MetricsTracker, RateLimiter};
use crate::settings::MarketDataSettings;
use crate::strategy::{create_strategy, DataProviderContext, ProviderSelectionStrategy, UNLIMITED};

pub use report::{ProviderStatusReport, WarmCacheReport};

/// Resilient, cached access to a set of market data providers.
pub struct MarketDataService {
    providers: Vec<Arc<dyn MarketDataProvider>>,
    strategy: Arc<dyn ProviderSelectionStrategy>,
    cache: Arc<dyn MarketDataCache>,
    policies: CachePolicies,
    health: Arc<HealthMonitor>,
    health_check_interval: Duration,
    metrics: MetricsTracker,
    rate_limiters: HashMap<ProviderId, RateLimiter>,
    costs: CostTracker,
    degraded: AtomicU64,
}

impl MarketDataService {
    /// Build the service from validated settings.
    ///
    /// Fails with a configuration error when the settings are invalid, no
    /// provider is registered, two providers share an id, or the strategy
    /// names a provider that is not registered.
    pub fn from_settings(
        settings: &MarketDataSettings,
        providers: Vec<Arc<dyn MarketDataProvider>>,
        cache: Arc<dyn MarketDataCache>,
    ) -> Result<Self> {
        settings.validate()?;

        let mut seen = HashSet::new();
        if let Some(duplicate) = providers.iter().find(|p| !seen.insert(p.id())) {
            return Err(MarketDataError::configuration(format!(
                "Provider '{}' is registered more than once",
                duplicate.id()
            )));
        }

        let calculator = Arc::new(CostCalculator::from_settings(settings));
        let strategy = create_strategy(settings, &providers, &calculator)?;

        for id in settings.providers.keys() {
            if !seen.contains(id.as_str()) {
                warn!("Settings reference unregistered provider '{}'", id);
            }
        }

        let rate_limiters = providers
            .iter()
            .filter_map(|p| {
                let limits = settings.provider(p.id())?.rate_limit.as_ref()?;
                Some((
                    ProviderId::Borrowed(p.id()),
                    RateLimiter::from_settings(p.id(), limits),
                ))
            })
            .collect();

        let health = Arc::new(
            HealthMonitor::new(&providers)
                .with_probe_timeout(settings.health_check.probe_timeout()),
        );

        info!(
            "Market data service ready with {} providers, strategy {}",
            providers.len(),
            strategy.name()
        );

        Ok(Self {
            providers,
            strategy,
            cache,
            policies: CachePolicies::from(&settings.cache),
            health,
            health_check_interval: settings.health_check.interval(),
            metrics: MetricsTracker::new(),
            rate_limiters,
            costs: CostTracker::new(calculator, settings.cost_tracking_enabled),
            degraded: AtomicU64::new(0),
        })
    }

    pub async fn get_quote(&self, symbol: &str) -> Result<Quote> {
        let symbol = symbol.trim().to_uppercase();
        let key = cache_keys::quote(&symbol);
        let requested = symbol.clone();

        self.fetch_cached(Operation::Quote, &symbol, key, move |provider| {
            let symbol = requested.clone();
            async move { provider.get_quote(&symbol).await }.boxed()
        })
        .await
    }

    pub async fn get_historical_prices(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
        interval: Interval,
    ) -> Result<Vec<HistoricalPrice>> {
        let symbol = symbol.trim().to_uppercase();
        let key = cache_keys::historical(&symbol, start, end, interval);
        let requested = symbol.clone();

        self.fetch_cached(Operation::HistoricalPrices, &symbol, key, move |provider| {
            let symbol = requested.clone();
            async move {
                provider
                    .get_historical_prices(&symbol, start, end, interval)
                    .await
            }
            .boxed()
        })
        .await
    }

    pub async fn get_fundamentals(&self, symbol: &str) -> Result<Fundamentals> {
        let symbol = symbol.trim().to_uppercase();
        let key = cache_keys::fundamentals(&symbol);
        let requested = symbol.clone();

        self.fetch_cached(Operation::Fundamentals, &symbol, key, move |provider| {
            let symbol = requested.clone();
            async move { provider.get_fundamentals(&symbol).await }.boxed()
        })
        .await
    }

    pub async fn get_company_profile(&self, symbol: &str) -> Result<CompanyProfile> {
        let symbol = symbol.trim().to_uppercase();
        let key = cache_keys::profile(&symbol);
        let requested = symbol.clone();

        self.fetch_cached(Operation::CompanyProfile, &symbol, key, move |provider| {
            let symbol = requested.clone();
            async move { provider.get_company_profile(&symbol).await }.boxed()
        })
        .await
    }

    /// Search symbols. Results are cached per query regardless of `limit`.
    pub async fn search_symbols(&self, query: &str, limit: usize) -> Result<Vec<SearchResult>> {
        let query = query.trim().to_string();
        let key = cache_keys::search(&query);
        let requested = query.clone();

        self.fetch_cached(Operation::SymbolSearch, &query, key, move |provider| {
            let query = requested.clone();
            async move { provider.search_symbols(&query, limit).await }.boxed()
        })
        .await
    }

    /// Fetch quote and profile for every symbol concurrently.
    ///
    /// Failures are logged and collected per symbol; they never abort the
    /// rest of the batch.
    pub async fn warm_cache<S: AsRef<str> + Sync>(&self, symbols: &[S]) -> WarmCacheReport {
        let outcomes = join_all(symbols.iter().map(|symbol| async move {
            let symbol = symbol.as_ref();
            let (quote, profile) =
                futures::join!(self.get_quote(symbol), self.get_company_profile(symbol));
            (symbol.to_string(), quote.err(), profile.err())
        }))
        .await;

        let mut report = WarmCacheReport::default();
        for (symbol, quote_error, profile_error) in outcomes {
            if quote_error.is_none() && profile_error.is_none() {
                report.succeeded += 1;
                continue;
            }
            for e in [quote_error, profile_error].into_iter().flatten() {
                warn!("Cache warm-up failed for {}: {}", symbol, e);
                report.failures.push((symbol.clone(), e.to_string()));
            }
        }

        info!(
            "Cache warm-up finished: {} of {} symbols succeeded",
            report.succeeded,
            symbols.len()
        );
        report
    }

    /// Cache-aside read with one fallback hop and a stale rescue.
    ///
    /// 1. Return the primary cache entry if present
    /// 2. Snapshot health and capacity, let the strategy pick a provider
    /// 3. Call it; on success write the primary and stale entries
    /// 4. On failure retry once against a distinct fallback provider
    /// 5. On total failure serve the stale entry, else the first error
    async fn fetch_cached<T, F>(
        &self,
        operation: Operation,
        symbol: &str,
        key: String,
        fetch: F,
    ) -> Result<T>
    where
        T: Serialize + DeserializeOwned + Send + Sync,
        F: Fn(Arc<dyn MarketDataProvider>) -> BoxFuture<'static, Result<T>> + Send + Sync,
    {
        if let Some(hit) = self.cache.get::<T>(&key).await {
            debug!("Cache hit for '{}'", key);
            return Ok(hit);
        }

        let context = self.build_context(symbol, operation);
        let selected = self.strategy.select_provider(&context);

        let error = match self.invoke(&selected, operation, symbol, &fetch).await {
            Ok(value) => {
                self.store(operation, &key, &value).await;
                return Ok(value);
            }
            Err(e) => e,
        };

        let fallback = self
            .strategy
            .fallback_provider()
            .filter(|fallback| fallback.id() != selected.id());
        if let Some(fallback) = fallback {
            info!(
                "Provider '{}' failed {} {}, trying fallback '{}'",
                selected.id(),
                operation,
                symbol,
                fallback.id()
            );
            match self.invoke(&fallback, operation, symbol, &fetch).await {
                Ok(value) => {
                    self.store(operation, &key, &value).await;
                    return Ok(value);
                }
                Err(e) => warn!(
                    "Fallback provider '{}' also failed {} {}: {}",
                    fallback.id(),
                    operation,
                    symbol,
                    e
                ),
            }
        }

        if let Some(stale) = self.cache.get::<T>(&cache_keys::stale_key(&key)).await {
            self.degraded.fetch_add(1, Ordering::Relaxed);
            warn!(
                "Serving stale {} data for {} after provider failure (degraded): {}",
                operation, symbol, error
            );
            return Ok(stale);
        }

        error!(
            "No provider or cached data available for {} {}: {}",
            operation, symbol, error
        );
        Err(error)
    }

    /// One provider attempt, with throttling and outcome tracking.
    async fn invoke<T, F>(
        &self,
        provider: &Arc<dyn MarketDataProvider>,
        operation: Operation,
        symbol: &str,
        fetch: &F,
    ) -> Result<T>
    where
        F: Fn(Arc<dyn MarketDataProvider>) -> BoxFuture<'static, Result<T>> + Send + Sync,
    {
        let id = provider.id();

        if let Some(limiter) = self.rate_limiters.get(id) {
            if !limiter.try_acquire() {
                warn!(
                    "Rate limit reached for '{}', skipping {} {}",
                    id, operation, symbol
                );
                return Err(MarketDataError::RateLimitExceeded {
                    provider: id.to_string(),
                });
            }
        }

        self.costs.record_api_call(id);
        let started = Instant::now();

        match fetch(provider.clone()).await {
            Ok(value) => {
                let elapsed = started.elapsed();
                self.health.record_success(id, elapsed);
                self.metrics.record_success(id);
                debug!(
                    "Provider '{}' served {} {} in {:?}",
                    id, operation, symbol, elapsed
                );
                Ok(value)
            }
            Err(e) => {
                // An unimplemented operation says nothing about reachability.
                if e.kind() != ErrorKind::NotSupported {
                    self.health.record_failure(id);
                }
                self.metrics.record_failure(id);
                warn!("Provider '{}' failed {} {}: {}", id, operation, symbol, e);
                Err(e)
            }
        }
    }

    async fn store<T: Serialize + Sync>(&self, operation: Operation, key: &str, value: &T) {
        let policy = self.policies.for_operation(operation);
        self.cache.set(key, value, Some(policy.primary_ttl)).await;
        self.cache
            .set(&cache_keys::stale_key(key), value, Some(policy.stale_ttl))
            .await;
    }

    /// Snapshot of health and remaining capacity for every provider.
    ///
    /// Providers without a limiter report [`UNLIMITED`]; providers over an
    /// enforced cost threshold report zero.
    fn build_context(&self, symbol: &str, operation: Operation) -> DataProviderContext {
        let remaining = self
            .providers
            .iter()
            .map(|p| {
                let id = p.id();
                let remaining = if self.costs.is_over_enforced_threshold(id) {
                    0
                } else {
                    self.rate_limiters
                        .get(id)
                        .map_or(UNLIMITED, |limiter| limiter.get_status().available())
                };
                (ProviderId::Borrowed(id), remaining)
            })
            .collect();

        DataProviderContext::new(
            symbol,
            operation,
            self.health.get_all_health_statuses(),
            remaining,
        )
    }

    /// Health, usage, cost and throttling for every registered provider.
    pub fn provider_status(&self) -> Vec<ProviderStatusReport> {
        self.providers
            .iter()
            .map(|p| {
                let id = p.id();
                let metrics = self.metrics.get_metrics(id);
                ProviderStatusReport {
                    provider: id.to_string(),
                    health: self.health.get_health_status(id),
                    success_rate: metrics.success_rate(),
                    metrics,
                    cost: self
                        .costs
                        .calculator()
                        .pricing(id)
                        .map(|_| self.costs.get_cost_metrics(id)),
                    rate_limit: self.rate_limiters.get(id).map(RateLimiter::get_status),
                }
            })
            .collect()
    }

    /// Start periodic health probes at the configured interval.
    pub fn start_health_checks(&self) {
        self.health.start_periodic_checks(self.health_check_interval);
    }

    pub fn stop_health_checks(&self) {
        self.health.stop_periodic_checks();
    }

    /// Responses served from the stale cache since startup.
    pub fn degraded_responses(&self) -> u64 {
        self.degraded.load(Ordering::Relaxed)
    }

    pub fn strategy_name(&self) -> &'static str {
        self.strategy.name()
    }

    pub fn providers(&self) -> &[Arc<dyn MarketDataProvider>] {
        &self.providers
    }

    pub fn cache(&self) -> &Arc<dyn MarketDataCache> {
        &self.cache
    }

    pub fn health_monitor(&self) -> &Arc<HealthMonitor> {
        &self.health
    }

    pub fn metrics(&self) -> &MetricsTracker {
        &self.metrics
    }

    pub fn cost_tracker(&self) -> &CostTracker {
        &self.costs
    }

    pub fn rate_limiter(&self, provider: &str) -> Option<&RateLimiter> {
        self.rate_limiters.get(provider)
    }
}

impl Drop for MarketDataService {
    fn drop(&mut self) {
        self.health.stop_periodic_checks();
    }
}
