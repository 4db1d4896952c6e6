use std::sync::Arc;

use log::debug;

use super::{is_provider_healthy, DataProviderContext, ProviderSelectionStrategy};
use crate::provider::MarketDataProvider;

/// Routes to the primary while it is healthy, otherwise to the fallback.
pub struct FallbackStrategy {
    primary: Arc<dyn MarketDataProvider>,
    fallback: Arc<dyn MarketDataProvider>,
}

impl FallbackStrategy {
    pub fn new(
        primary: Arc<dyn MarketDataProvider>,
        fallback: Arc<dyn MarketDataProvider>,
    ) -> Self {
        Self { primary, fallback }
    }
}

impl ProviderSelectionStrategy for FallbackStrategy {
    fn name(&self) -> &'static str {
        "Fallback"
    }

    fn select_provider(&self, context: &DataProviderContext) -> Arc<dyn MarketDataProvider> {
        let selected = if is_provider_healthy(context, self.primary.id()) {
            &self.primary
        } else {
            &self.fallback
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

    fn fallback_provider(&self) -> Option<Arc<dyn MarketDataProvider>> {
        Some(self.fallback.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::ProviderHealth;
    use crate::strategy::test_support::{context, unhealthy, StubProvider};
    use std::collections::HashMap;

    fn strategy() -> FallbackStrategy {
        FallbackStrategy::new(StubProvider::arc("YAHOO"), StubProvider::arc("ALPHA_VANTAGE"))
    }

    #[test]
    fn test_primary_when_healthy() {
        let mut health = HashMap::new();
        health.insert("YAHOO".into(), ProviderHealth::healthy());

        let selected = strategy().select_provider(&context(health, HashMap::new()));
        assert_eq!(selected.id(), "YAHOO");
    }

    #[test]
    fn test_fallback_when_primary_unhealthy() {
        let mut health = HashMap::new();
        health.insert("YAHOO".into(), unhealthy());
        health.insert("ALPHA_VANTAGE".into(), ProviderHealth::healthy());

        let strategy = strategy();
        let selected = strategy.select_provider(&context(health, HashMap::new()));
        assert_eq!(selected.id(), "ALPHA_VANTAGE");

        let fallback = strategy.fallback_provider().map(|p| p.id());
        assert_eq!(fallback, Some("ALPHA_VANTAGE"));
    }

    #[test]
    fn test_missing_health_entry_is_healthy() {
        let selected = strategy().select_provider(&context(HashMap::new(), HashMap::new()));
        assert_eq!(selected.id(), "YAHOO");
    }
}
