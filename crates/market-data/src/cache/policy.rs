use std::time::Duration;

use crate::models::Operation;
use crate::settings::{CacheSettings, CacheTtl};

/// Primary and stale-shadow lifetimes for one data type.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct CachePolicy {
    pub primary_ttl: Duration,
    pub stale_ttl: Duration,
}

impl From<CacheTtl> for CachePolicy {
    fn from(ttl: CacheTtl) -> Self {
        Self {
            primary_ttl: Duration::from_secs(ttl.primary_secs),
            stale_ttl: Duration::from_secs(ttl.stale_secs),
        }
    }
}

/// Cache lifetimes for every operation.
#[derive(Clone, Debug)]
pub struct CachePolicies {
    quote: CachePolicy,
    historical: CachePolicy,
    fundamentals: CachePolicy,
    profile: CachePolicy,
    search: CachePolicy,
}

impl CachePolicies {
    pub fn for_operation(&self, operation: Operation) -> CachePolicy {
        match operation {
            Operation::Quote => self.quote,
            Operation::HistoricalPrices => self.historical,
            Operation::Fundamentals => self.fundamentals,
            Operation::CompanyProfile => self.profile,
            Operation::SymbolSearch => self.search,
        }
    }
}

impl From<&CacheSettings> for CachePolicies {
    fn from(settings: &CacheSettings) -> Self {
        Self {
            quote: settings.quote.into(),
            historical: settings.historical.into(),
            fundamentals: settings.fundamentals.into(),
            profile: settings.profile.into(),
            search: settings.search.into(),
        }
    }
}

impl Default for CachePolicies {
    fn default() -> Self {
        Self::from(&CacheSettings::default())
    }
}
