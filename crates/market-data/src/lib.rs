//! QuoteHub Market Data Crate
//!
//! This crate keeps quotes, price history, fundamentals, company profiles and
//! symbol search available across several interchangeable market data
//! providers, despite outages, throttling and cost limits.
//!
//! # Overview
//!
//! The market data crate supports:
//! - Cache-aside reads with a long-lived stale copy for degraded service
//! - Pluggable provider selection (primary, fallback, round robin, cheapest)
//! - Per-provider health tracking with periodic probes
//! - Minute and day rate limits per provider
//! - Request metrics and API cost accounting
//!
//! # Architecture
//!
//! ```text
//! +------------------+     +------------------+
//! |      Caller      | --> |  MarketDataCache |  (hit: return, no provider call)
//! +------------------+     +------------------+
//!                                  | miss
//!                                  v
//!                     +------------------------+
//!                     |  DataProviderContext   |  (health + capacity snapshot)
//!                     +------------------------+
//!                                  |
//!                                  v
//!                     +------------------------+
//!                     |  SelectionStrategy     |  (Primary, Fallback, ...)
//!                     +------------------------+
//!                                  |
//!                                  v
//!                          +------------------+
//!                          |    Provider      |  --> HealthMonitor, Metrics, Cost
//!                          +------------------+
//!                                  | failure
//!                                  v
//!                   fallback provider (once), then stale:{key}
//! ```
//!
//! # Core Types
//!
//! - [`MarketDataService`] - Cache-aside read surface
//! - [`MarketDataProvider`] - Capability implemented by each vendor adapter
//! - [`MarketDataCache`] - Cache collaborator, with [`InMemoryCache`]
//! - [`ProviderSelectionStrategy`] - Provider selection policy
//! - [`MarketDataSettings`] - Limits, pricing, TTLs and strategy choice
//!
//! # Type Aliases
//!
//! - [`ProviderId`] - Provider identifier (e.g., "YAHOO", "ALPHA_VANTAGE")

pub mod cache;
pub mod errors;
pub mod models;
pub mod provider;
pub mod registry;
pub mod service;
pub mod settings;
pub mod strategy;

// Re-export all public types from models
pub use models::{
    CompanyProfile, Fundamentals, HistoricalPrice, Interval, Operation, ProviderId, Quote,
    SearchResult,
};

pub use cache::{CachePolicies, CachePolicy, InMemoryCache, MarketDataCache};
pub use errors::{ErrorKind, MarketDataError};
pub use provider::MarketDataProvider;

// Re-export registry types
pub use registry::{
    CostCalculator, CostTracker, HealthMonitor, MetricsTracker, ProviderCostMetrics,
    ProviderHealth, ProviderMetrics, RateLimitStatus, RateLimiter,
};

pub use service::{MarketDataService, ProviderStatusReport, WarmCacheReport};
pub use settings::MarketDataSettings;
pub use strategy::{
    create_strategy, CostOptimizedStrategy, DataProviderContext, FallbackStrategy,
    PrimaryStrategy, ProviderSelectionStrategy, RoundRobinStrategy, StrategyKind,
};
