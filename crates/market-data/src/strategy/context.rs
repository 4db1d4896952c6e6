use std::collections::HashMap;

use crate::models::{Operation, ProviderId};
use crate::registry::ProviderHealth;

/// Request-scoped snapshot of provider state handed to a selection strategy.
///
/// Built once per cache miss and never mutated; it may lag the live
/// trackers by the duration of the request.
#[derive(Clone, Debug)]
pub struct DataProviderContext {
    symbol: String,
    operation: Operation,
    provider_health: HashMap<ProviderId, ProviderHealth>,
    rate_limit_remaining: HashMap<ProviderId, u32>,
}

impl DataProviderContext {
    pub fn new(
        symbol: impl Into<String>,
        operation: Operation,
        provider_health: HashMap<ProviderId, ProviderHealth>,
        rate_limit_remaining: HashMap<ProviderId, u32>,
    ) -> Self {
        Self {
            symbol: symbol.into(),
            operation,
            provider_health,
            rate_limit_remaining,
        }
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn operation(&self) -> Operation {
        self.operation
    }

    pub fn provider_health(&self) -> &HashMap<ProviderId, ProviderHealth> {
        &self.provider_health
    }

    pub fn rate_limit_remaining(&self) -> &HashMap<ProviderId, u32> {
        &self.rate_limit_remaining
    }

    pub fn health_of(&self, provider: &str) -> Option<&ProviderHealth> {
        self.provider_health.get(provider)
    }

    pub fn remaining_for(&self, provider: &str) -> Option<u32> {
        self.rate_limit_remaining.get(provider).copied()
    }
}
