//! API call accounting with spend threshold alerts.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use log::{debug, info, warn};
use rust_decimal::Decimal;
use serde::Serialize;

use super::CostCalculator;
use crate::models::ProviderId;
use crate::settings::ProviderCostSettings;

/// Spend snapshot for one provider, recomputed on every read.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderCostMetrics {
    pub total_api_calls: u64,
    /// `total_api_calls × cost_per_call`
    pub estimated_cost: Decimal,
    pub monthly_subscription_cost: Decimal,
    /// `estimated_cost + monthly_subscription_cost`
    pub total_estimated_cost: Decimal,
    pub cost_per_call: Decimal,
    /// Zero when no threshold is configured.
    pub cost_threshold: Decimal,
    pub threshold_percentage: Decimal,
    pub is_threshold_exceeded: bool,
}

impl ProviderCostMetrics {
    fn compute(calls: u64, pricing: &ProviderCostSettings) -> Self {
        let estimated_cost = pricing.cost_per_call * Decimal::from(calls);
        let total_estimated_cost = estimated_cost + pricing.monthly_subscription;
        let cost_threshold = pricing.cost_threshold.unwrap_or(Decimal::ZERO);
        let threshold_percentage = if cost_threshold > Decimal::ZERO {
            total_estimated_cost / cost_threshold * Decimal::ONE_HUNDRED
        } else {
            Decimal::ZERO
        };

        Self {
            total_api_calls: calls,
            estimated_cost,
            monthly_subscription_cost: pricing.monthly_subscription,
            total_estimated_cost,
            cost_per_call: pricing.cost_per_call,
            cost_threshold,
            threshold_percentage,
            is_threshold_exceeded: threshold_percentage > Decimal::ONE_HUNDRED,
        }
    }
}

/// Counts API calls per provider and derives spend from [`CostCalculator`].
pub struct CostTracker {
    calculator: Arc<CostCalculator>,
    calls: DashMap<ProviderId, AtomicU64>,
    enabled: bool,
}

impl CostTracker {
    pub fn new(calculator: Arc<CostCalculator>, enabled: bool) -> Self {
        Self {
            calculator,
            calls: DashMap::new(),
            enabled,
        }
    }

    pub fn calculator(&self) -> &CostCalculator {
        &self.calculator
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn call_count(&self, provider: &str) -> u64 {
        self.calls
            .get(provider)
            .map(|count| count.load(Ordering::Relaxed))
            .unwrap_or(0)
    }

    /// Count one API call and emit threshold warnings.
    ///
    /// No-op when tracking is globally disabled or disabled for the provider.
    pub fn record_api_call(&self, provider: &str) {
        if !self.enabled {
            return;
        }

        let pricing = self.calculator.pricing(provider);
        if pricing.is_some_and(|p| !p.enabled) {
            debug!("Cost: tracking disabled for provider '{}'", provider);
            return;
        }

        let calls = match self.calls.get(provider) {
            Some(count) => count.fetch_add(1, Ordering::Relaxed) + 1,
            None => self
                .calls
                .entry(ProviderId::Owned(provider.to_string()))
                .or_default()
                .fetch_add(1, Ordering::Relaxed)
                + 1,
        };

        let Some(pricing) = pricing else {
            return;
        };

        let metrics = ProviderCostMetrics::compute(calls, pricing);
        if metrics.is_threshold_exceeded {
            warn!(
                "Cost: provider '{}' exceeded its cost threshold ({} of {}, {}%)",
                provider,
                metrics.total_estimated_cost,
                metrics.cost_threshold,
                metrics.threshold_percentage.round_dp(2)
            );
        } else if metrics.cost_threshold > Decimal::ZERO
            && metrics.threshold_percentage >= pricing.warning_percentage
        {
            warn!(
                "Cost: provider '{}' at {}% of its cost threshold ({} of {})",
                provider,
                metrics.threshold_percentage.round_dp(2),
                metrics.total_estimated_cost,
                metrics.cost_threshold
            );
        }
    }

    /// Spend snapshot for a provider.
    pub fn get_cost_metrics(&self, provider: &str) -> ProviderCostMetrics {
        let calls = self.call_count(provider);
        match self.calculator.pricing(provider) {
            Some(pricing) => ProviderCostMetrics::compute(calls, pricing),
            None => {
                warn!("Cost: no pricing configured for provider '{}'", provider);
                ProviderCostMetrics {
                    total_api_calls: calls,
                    ..Default::default()
                }
            }
        }
    }

    /// Spend snapshots for every priced or counted provider.
    pub fn get_all_cost_metrics(&self) -> HashMap<ProviderId, ProviderCostMetrics> {
        let mut providers: HashSet<ProviderId> = self
            .calculator
            .configured_providers()
            .map(|id| ProviderId::Owned(id.to_string()))
            .collect();
        providers.extend(self.calls.iter().map(|entry| entry.key().clone()));

        providers
            .into_iter()
            .map(|id| {
                let metrics = self.get_cost_metrics(&id);
                (id, metrics)
            })
            .collect()
    }

    pub fn is_cost_threshold_exceeded(&self, provider: &str) -> bool {
        self.get_cost_metrics(provider).is_threshold_exceeded
    }

    pub fn get_cost_threshold_percentage(&self, provider: &str) -> Decimal {
        self.get_cost_metrics(provider).threshold_percentage
    }

    /// True when the provider enforces its threshold and has exceeded it.
    pub fn is_over_enforced_threshold(&self, provider: &str) -> bool {
        match self.calculator.pricing(provider) {
            Some(pricing) if pricing.enforce_threshold => {
                ProviderCostMetrics::compute(self.call_count(provider), pricing)
                    .is_threshold_exceeded
            }
            _ => false,
        }
    }

    pub fn reset_cost_tracking(&self, provider: &str) {
        self.calls.remove(provider);
        info!("Cost: tracking reset for '{}'", provider);
    }

    pub fn reset_all_cost_tracking(&self) {
        self.calls.clear();
        info!("Cost: tracking reset for all providers");
    }
}
