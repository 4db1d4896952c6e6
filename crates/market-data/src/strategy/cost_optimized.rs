use std::sync::Arc;

use log::{debug, warn};
use rust_decimal::Decimal;

use super::{
    has_rate_limit_capacity, is_provider_healthy, DataProviderContext, ProviderSelectionStrategy,
};
use crate::errors::{MarketDataError, Result};
use crate::provider::MarketDataProvider;
use crate::registry::CostCalculator;

/// Prefers the cheapest eligible provider by cost per call.
pub struct CostOptimizedStrategy {
    /// Ascending by cost per call.
    providers: Vec<Arc<dyn MarketDataProvider>>,
}

impl CostOptimizedStrategy {
    pub fn new(
        providers: Vec<Arc<dyn MarketDataProvider>>,
        calculator: &CostCalculator,
    ) -> Result<Self> {
        if providers.is_empty() {
            return Err(MarketDataError::configuration(
                "CostOptimized strategy requires at least one provider",
            ));
        }

        let mut ranked: Vec<_> = providers
            .into_iter()
            .map(|p| (calculator.cost_per_call(p.id()), p))
            .collect();
        // Stable, so equally priced providers keep registration order.
        ranked.sort_by(|a, b| a.0.cmp(&b.0));

        Ok(Self {
            providers: ranked.into_iter().map(|(_, p)| p).collect(),
        })
    }

    /// `cost_per_call(provider) × calls`
    pub fn estimated_cost(calculator: &CostCalculator, provider: &str, calls: u64) -> Decimal {
        calculator.calculate_cost(provider, calls)
    }

    /// Provider ids, cheapest first.
    pub fn ranking(&self) -> Vec<&'static str> {
        self.providers.iter().map(|p| p.id()).collect()
    }
}

impl ProviderSelectionStrategy for CostOptimizedStrategy {
    fn name(&self) -> &'static str {
        "CostOptimized"
    }

    fn select_provider(&self, context: &DataProviderContext) -> Arc<dyn MarketDataProvider> {
        let eligible = self
            .providers
            .iter()
            .find(|p| {
                is_provider_healthy(context, p.id()) && has_rate_limit_capacity(context, p.id())
            });

        let selected = match eligible {
            Some(provider) => provider,
            None => {
                // Non-empty by construction.
                let provider = &self.providers[0];
                warn!(
                    "{} strategy found no eligible provider for {} {}, using cheapest '{}'",
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
