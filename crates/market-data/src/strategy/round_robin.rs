use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use log::{debug, warn};

use super::{
    has_rate_limit_capacity, is_provider_healthy, DataProviderContext, ProviderSelectionStrategy,
};
use crate::errors::{MarketDataError, Result};
use crate::provider::MarketDataProvider;

/// Rotates across all registered providers, skipping unhealthy or
/// rate-limited ones.
pub struct RoundRobinStrategy {
    providers: Vec<Arc<dyn MarketDataProvider>>,
    cursor: AtomicUsize,
}

impl RoundRobinStrategy {
    pub fn new(providers: Vec<Arc<dyn MarketDataProvider>>) -> Result<Self> {
        if providers.is_empty() {
            return Err(MarketDataError::configuration(
                "RoundRobin strategy requires at least one provider",
            ));
        }
        Ok(Self {
            providers,
            cursor: AtomicUsize::new(0),
        })
    }
}

impl ProviderSelectionStrategy for RoundRobinStrategy {
    fn name(&self) -> &'static str {
        "RoundRobin"
    }

    fn select_provider(&self, context: &DataProviderContext) -> Arc<dyn MarketDataProvider> {
        let len = self.providers.len();
        let start = self.cursor.fetch_add(1, Ordering::Relaxed) % len;

        let eligible = (0..len)
            .map(|offset| &self.providers[(start + offset) % len])
            .find(|p| {
                is_provider_healthy(context, p.id()) && has_rate_limit_capacity(context, p.id())
            });

        let selected = match eligible {
            Some(provider) => provider,
            None => {
                let provider = &self.providers[start];
                warn!(
                    "{} strategy found no eligible provider for {} {}, using '{}'",
                    self.name(),
                    context.operation(),
                    context.symbol(),
                    provider.id()
                );
                provider
            }
        };

        debug!(
            "{} strategy selected '{}' for {} {}",
            self.name(),
            selected.id(),
            context.operation(),
            context.symbol()
        );
        selected.clone()
    }
}
