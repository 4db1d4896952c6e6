//! Settings consumed by the market data layer.
//!
//! The crate does not own where settings come from. Hosts deserialize a
//! [`MarketDataSettings`] from their own configuration source (the JSON
//! helpers here cover the common case) and hand it to
//! [`MarketDataService::from_settings`](crate::service::MarketDataService::from_settings),
//! which calls [`MarketDataSettings::validate`] before building anything.

use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::errors::{MarketDataError, Result};
use crate::strategy::StrategyKind;

/// Default health probe interval: 5 minutes.
const DEFAULT_HEALTH_CHECK_INTERVAL_SECS: u64 = 300;

/// Default upper bound for a single health probe.
const DEFAULT_PROBE_TIMEOUT_SECS: u64 = 10;

/// Longest accepted health check interval: one week.
const MAX_HEALTH_CHECK_INTERVAL_SECS: u64 = 7 * 24 * 60 * 60;

/// Longest accepted cache lifetime: one year.
const MAX_CACHE_TTL_SECS: u64 = 365 * 24 * 60 * 60;

/// Default cost warning level, in percent of the threshold.
const DEFAULT_WARNING_PERCENTAGE: u32 = 80;

/// Top-level market data settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MarketDataSettings {
    /// Provider used first by the Primary and Fallback strategies.
    pub primary_provider: String,

    /// Provider retried once when the selected provider fails.
    pub fallback_provider: Option<String>,

    /// Active selection strategy.
    pub strategy: StrategyKind,

    /// Global switch for API call accounting.
    pub cost_tracking_enabled: bool,

    pub health_check: HealthCheckSettings,

    /// Per-provider limits and pricing, keyed by provider id.
    pub providers: HashMap<String, ProviderSettings>,

    pub cache: CacheSettings,
}

impl Default for MarketDataSettings {
    fn default() -> Self {
        Self {
            primary_provider: "YAHOO".to_string(),
            fallback_provider: None,
            strategy: StrategyKind::Primary,
            cost_tracking_enabled: true,
            health_check: HealthCheckSettings::default(),
            providers: HashMap::new(),
            cache: CacheSettings::default(),
        }
    }
}

/// Periodic health probing.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct HealthCheckSettings {
    pub interval_secs: u64,
    pub probe_timeout_secs: u64,
}

impl HealthCheckSettings {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.probe_timeout_secs)
    }
}

impl Default for HealthCheckSettings {
    fn default() -> Self {
        Self {
            interval_secs: DEFAULT_HEALTH_CHECK_INTERVAL_SECS,
            probe_timeout_secs: DEFAULT_PROBE_TIMEOUT_SECS,
        }
    }
}

/// Settings for one provider.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProviderSettings {
    /// `None` means the provider is not throttled locally.
    pub rate_limit: Option<RateLimitSettings>,
    pub cost: ProviderCostSettings,
}

/// Dual-window request allowance.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RateLimitSettings {
    pub requests_per_minute: u32,
    pub requests_per_day: u32,
}

/// Pricing for one provider.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProviderCostSettings {
    pub cost_per_call: Decimal,
    pub monthly_subscription: Decimal,

    /// Monthly spend considered the hard limit. `None` disables alerting.
    pub cost_threshold: Option<Decimal>,

    /// Percentage of the threshold at which warnings start.
    pub warning_percentage: Decimal,

    /// Whether calls to this provider are counted at all.
    pub enabled: bool,

    /// When set, an exceeded threshold removes the provider from
    /// capacity-aware selection.
    pub enforce_threshold: bool,
}

impl Default for ProviderCostSettings {
    fn default() -> Self {
        Self {
            cost_per_call: Decimal::ZERO,
            monthly_subscription: Decimal::ZERO,
            cost_threshold: None,
            warning_percentage: Decimal::from(DEFAULT_WARNING_PERCENTAGE),
            enabled: true,
            enforce_threshold: false,
        }
    }
}

/// Primary and stale-shadow lifetimes for one data type.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheTtl {
    pub primary_secs: u64,
    pub stale_secs: u64,
}

impl CacheTtl {
    pub const fn new(primary_secs: u64, stale_secs: u64) -> Self {
        Self {
            primary_secs,
            stale_secs,
        }
    }
}

/// Cache lifetimes per data type.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CacheSettings {
    pub quote: CacheTtl,
    pub historical: CacheTtl,
    pub fundamentals: CacheTtl,
    pub profile: CacheTtl,
    pub search: CacheTtl,
}

impl Default for CacheSettings {
    fn default() -> Self {
        const HOUR: u64 = 60 * 60;
        const DAY: u64 = 24 * HOUR;
        Self {
            quote: CacheTtl::new(60, DAY),
            historical: CacheTtl::new(DAY, 7 * DAY),
            fundamentals: CacheTtl::new(6 * HOUR, 7 * DAY),
            profile: CacheTtl::new(DAY, 30 * DAY),
            search: CacheTtl::new(HOUR, 7 * DAY),
        }
    }
}

impl CacheSettings {
    fn entries(&self) -> [(&'static str, CacheTtl); 5] {
        [
            ("quote", self.quote),
            ("historical", self.historical),
            ("fundamentals", self.fundamentals),
            ("profile", self.profile),
            ("search", self.search),
        ]
    }
}

impl MarketDataSettings {
    /// Parse settings from a JSON document and validate them.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let settings: Self = serde_json::from_str(json).map_err(|e| {
            MarketDataError::configuration(format!("Invalid market data settings: {}", e))
        })?;
        settings.validate()?;
        Ok(settings)
    }

    /// Read, parse and validate settings from a JSON file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| {
            MarketDataError::configuration(format!(
                "Failed to read settings file {}: {}",
                path.display(),
                e
            ))
        })?;
        Self::from_json_str(&contents)
    }

    /// Settings for a provider, if any were configured.
    pub fn provider(&self, provider_id: &str) -> Option<&ProviderSettings> {
        self.providers.get(provider_id)
    }

    /// Check settings for values the service cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.primary_provider.trim().is_empty() {
            return Err(MarketDataError::configuration(
                "primaryProvider must not be empty",
            ));
        }

        if let Some(fallback) = &self.fallback_provider {
            if fallback.trim().is_empty() {
                return Err(MarketDataError::configuration(
                    "fallbackProvider must not be empty when set",
                ));
            }
        }

        if self.health_check.interval_secs == 0
            || self.health_check.interval_secs > MAX_HEALTH_CHECK_INTERVAL_SECS
        {
            return Err(MarketDataError::configuration(format!(
                "healthCheck.intervalSecs must be within 1..={}",
                MAX_HEALTH_CHECK_INTERVAL_SECS
            )));
        }

        if self.health_check.probe_timeout_secs == 0 {
            return Err(MarketDataError::configuration(
                "healthCheck.probeTimeoutSecs must be greater than zero",
            ));
        }

        for (id, provider) in &self.providers {
            if let Some(limit) = &provider.rate_limit {
                if limit.requests_per_minute == 0 || limit.requests_per_day == 0 {
                    return Err(MarketDataError::configuration(format!(
                        "Rate limits for provider '{}' must be greater than zero",
                        id
                    )));
                }
            }

            let cost = &provider.cost;
            if cost.cost_per_call.is_sign_negative() || cost.monthly_subscription.is_sign_negative()
            {
                return Err(MarketDataError::configuration(format!(
                    "Costs for provider '{}' must not be negative",
                    id
                )));
            }
            if let Some(threshold) = cost.cost_threshold {
                if threshold.is_sign_negative() {
                    return Err(MarketDataError::configuration(format!(
                        "Cost threshold for provider '{}' must not be negative",
                        id
                    )));
                }
            }
            if cost.warning_percentage <= Decimal::ZERO
                || cost.warning_percentage > Decimal::ONE_HUNDRED
            {
                return Err(MarketDataError::configuration(format!(
                    "Warning percentage for provider '{}' must be within (0, 100]",
                    id
                )));
            }
        }

        for (name, ttl) in self.cache.entries() {
            if ttl.primary_secs == 0 {
                return Err(MarketDataError::configuration(format!(
                    "cache.{}.primarySecs must be greater than zero",
                    name
                )));
            }
            if ttl.stale_secs < ttl.primary_secs {
                return Err(MarketDataError::configuration(format!(
                    "cache.{}.staleSecs ({}) must be >= primarySecs ({})",
                    name, ttl.stale_secs, ttl.primary_secs
                )));
            }
            if ttl.stale_secs > MAX_CACHE_TTL_SECS {
                return Err(MarketDataError::configuration(format!(
                    "cache.{}.staleSecs ({}) must not exceed {}",
                    name, ttl.stale_secs, MAX_CACHE_TTL_SECS
                )));
            }
        }

        Ok(())
    }
}
