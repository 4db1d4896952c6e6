use serde::Serialize;

use crate::registry::{ProviderCostMetrics, ProviderHealth, ProviderMetrics, RateLimitStatus};

/// Operational view of one provider.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderStatusReport {
    pub provider: String,
    pub health: Option<ProviderHealth>,
    pub metrics: ProviderMetrics,
    pub success_rate: f64,
    /// `None` when the provider has no pricing configured.
    pub cost: Option<ProviderCostMetrics>,
    /// `None` when the provider is not throttled.
    pub rate_limit: Option<RateLimitStatus>,
}

/// Outcome of a cache warm-up batch.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WarmCacheReport {
    /// Symbols whose quote and profile were both fetched.
    pub succeeded: usize,
    /// `(symbol, error)` for every failed fetch.
    pub failures: Vec<(String, String)>,
}

impl WarmCacheReport {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}
