//! Provider selection strategies.
//!
//! A strategy picks the provider that serves a cache miss from a
//! [`DataProviderContext`] snapshot. The set is closed and resolved once at
//! startup by [`create_strategy`]:
//!
//! - [`PrimaryStrategy`]: always the primary provider
//! - [`FallbackStrategy`]: the primary while healthy, else the fallback
//! - [`RoundRobinStrategy`]: rotate across eligible providers
//! - [`CostOptimizedStrategy`]: the cheapest eligible provider
//!
//! Selection never fails. Missing providers are a configuration error at
//! construction time.

mod context;
mod cost_optimized;
mod fallback;
mod primary;
mod round_robin;

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::errors::{MarketDataError, Result};
use crate::provider::MarketDataProvider;
use crate::registry::CostCalculator;
use crate::settings::MarketDataSettings;

pub use context::DataProviderContext;
pub use cost_optimized::CostOptimizedStrategy;
pub use fallback::FallbackStrategy;
pub use primary::PrimaryStrategy;
pub use round_robin::RoundRobinStrategy;

/// Remaining-capacity sentinel for providers without a rate limiter.
pub const UNLIMITED: u32 = u32::MAX;

/// Policy deciding which provider handles a request.
pub trait ProviderSelectionStrategy: Send + Sync {
    /// Name used in logs and status reports.
    fn name(&self) -> &'static str;

    /// Pick a provider for the request described by `context`.
    fn select_provider(&self, context: &DataProviderContext) -> Arc<dyn MarketDataProvider>;

    /// Provider the service retries once after a failed call, if any.
    fn fallback_provider(&self) -> Option<Arc<dyn MarketDataProvider>> {
        None
    }
}

/// Healthy unless the context holds an unhealthy entry for the provider.
pub fn is_provider_healthy(context: &DataProviderContext, provider: &str) -> bool {
    context.health_of(provider).map_or(true, |h| h.is_healthy)
}

/// Has capacity unless the context reports zero remaining for the provider.
pub fn has_rate_limit_capacity(context: &DataProviderContext, provider: &str) -> bool {
    context.remaining_for(provider).unwrap_or(UNLIMITED) > 0
}

/// Configured strategy name.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub enum StrategyKind {
    #[default]
    Primary,
    Fallback,
    RoundRobin,
    CostOptimized,
}

impl StrategyKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Primary => "Primary",
            Self::Fallback => "Fallback",
            Self::RoundRobin => "RoundRobin",
            Self::CostOptimized => "CostOptimized",
        }
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StrategyKind {
    type Err = MarketDataError;

    fn from_str(s: &str) -> Result<Self> {
        [
            Self::Primary,
            Self::Fallback,
            Self::RoundRobin,
            Self::CostOptimized,
        ]
        .into_iter()
        .find(|kind| kind.as_str().eq_ignore_ascii_case(s.trim()))
        .ok_or_else(|| MarketDataError::configuration(format!("Unknown strategy '{}'", s)))
    }
}

fn find_provider(
    providers: &[Arc<dyn MarketDataProvider>],
    id: &str,
) -> Result<Arc<dyn MarketDataProvider>> {
    providers
        .iter()
        .find(|p| p.id() == id)
        .cloned()
        .ok_or_else(|| {
            MarketDataError::configuration(format!("Provider '{}' is not registered", id))
        })
}

/// Build the strategy named in `settings` over the registered providers.
pub fn create_strategy(
    settings: &MarketDataSettings,
    providers: &[Arc<dyn MarketDataProvider>],
    calculator: &CostCalculator,
) -> Result<Arc<dyn ProviderSelectionStrategy>> {
    if providers.is_empty() {
        return Err(MarketDataError::configuration(
            "At least one market data provider must be registered",
        ));
    }

    let primary = find_provider(providers, &settings.primary_provider)?;
    let fallback = match settings.fallback_provider.as_deref() {
        Some(id) if id == settings.primary_provider => {
            return Err(MarketDataError::configuration(format!(
                "Fallback provider '{}' must differ from the primary provider",
                id
            )))
        }
        Some(id) => Some(find_provider(providers, id)?),
        None => None,
    };

    let strategy: Arc<dyn ProviderSelectionStrategy> = match settings.strategy {
        StrategyKind::Primary => Arc::new(PrimaryStrategy::new(primary, fallback)),
        StrategyKind::Fallback => {
            let fallback = fallback.ok_or_else(|| {
                MarketDataError::configuration("Fallback strategy requires a fallback provider")
            })?;
            Arc::new(FallbackStrategy::new(primary, fallback))
        }
        StrategyKind::RoundRobin => Arc::new(RoundRobinStrategy::new(providers.to_vec())?),
        StrategyKind::CostOptimized => Arc::new(CostOptimizedStrategy::new(
            providers.to_vec(),
            calculator,
        )?),
    };

    Ok(strategy)
}
