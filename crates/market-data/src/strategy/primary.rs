use std::sync::Arc;

use log::debug;

use super::{DataProviderContext, ProviderSelectionStrategy};
use crate::provider::MarketDataProvider;

/// Always routes to the primary provider, regardless of health or capacity.
///
/// A configured fallback is still offered to the service for its one retry.
pub struct PrimaryStrategy {
    primary: Arc<dyn MarketDataProvider>,
    fallback: Option<Arc<dyn MarketDataProvider>>,
}

impl PrimaryStrategy {
    pub fn new(
        primary: Arc<dyn MarketDataProvider>,
        fallback: Option<Arc<dyn MarketDataProvider>>,
    ) -> Self {
        Self { primary, fallback }
    }
}

impl ProviderSelectionStrategy for PrimaryStrategy {
    fn name(&self) -> &'static str {
        "Primary"
    }

    fn select_provider(&self, context: &DataProviderContext) -> Arc<dyn MarketDataProvider> {
        debug!(
            "{} strategy selected '{}' for {} {}",
            self.name(),
            self.primary.id(),
            context.operation(),
            context.symbol()
        );
        self.primary.clone()
    }

    fn fallback_provider(&self) -> Option<Arc<dyn MarketDataProvider>> {
        self.fallback.clone()
    }
}
