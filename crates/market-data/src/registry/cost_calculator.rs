//! Stateless cost estimates from static per-provider pricing.

use std::collections::HashMap;

use log::warn;
use rust_decimal::Decimal;

use crate::settings::{MarketDataSettings, ProviderCostSettings};

/// Maps call counts to estimated spend.
///
/// Providers without pricing cost nothing; every lookup for one logs a
/// warning.
#[derive(Clone, Debug, Default)]
pub struct CostCalculator {
    pricing: HashMap<String, ProviderCostSettings>,
}

impl CostCalculator {
    pub fn new(pricing: HashMap<String, ProviderCostSettings>) -> Self {
        Self { pricing }
    }

    pub fn from_settings(settings: &MarketDataSettings) -> Self {
        Self::new(
            settings
                .providers
                .iter()
                .map(|(id, provider)| (id.clone(), provider.cost.clone()))
                .collect(),
        )
    }

    /// Pricing for a provider, without logging.
    pub fn pricing(&self, provider: &str) -> Option<&ProviderCostSettings> {
        self.pricing.get(provider)
    }

    /// Providers that have pricing configured.
    pub fn configured_providers(&self) -> impl Iterator<Item = &str> {
        self.pricing.keys().map(String::as_str)
    }

    fn pricing_or_warn(&self, provider: &str) -> Option<&ProviderCostSettings> {
        let pricing = self.pricing.get(provider);
        if pricing.is_none() {
            warn!("Cost: no pricing configured for provider '{}'", provider);
        }
        pricing
    }

    pub fn cost_per_call(&self, provider: &str) -> Decimal {
        self.pricing_or_warn(provider)
            .map(|p| p.cost_per_call)
            .unwrap_or(Decimal::ZERO)
    }

    pub fn monthly_subscription_cost(&self, provider: &str) -> Decimal {
        self.pricing_or_warn(provider)
            .map(|p| p.monthly_subscription)
            .unwrap_or(Decimal::ZERO)
    }

    /// `calls × cost_per_call`
    pub fn calculate_cost(&self, provider: &str, calls: u64) -> Decimal {
        self.pricing_or_warn(provider)
            .map(|p| p.cost_per_call * Decimal::from(calls))
            .unwrap_or(Decimal::ZERO)
    }

    /// `calls × cost_per_call + monthly_subscription`
    pub fn total_estimated_cost(&self, provider: &str, calls: u64) -> Decimal {
        self.pricing_or_warn(provider)
            .map(|p| p.cost_per_call * Decimal::from(calls) + p.monthly_subscription)
            .unwrap_or(Decimal::ZERO)
    }
}
