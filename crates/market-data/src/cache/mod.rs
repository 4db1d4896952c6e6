//! Cache collaborator for the cache-aside read path.
//!
//! Values are stored as JSON so any backend that can hold a document can sit
//! behind [`MarketDataCache`]. Every successful fetch is written twice: under
//! its primary key with a short TTL, and under [`cache_keys::stale_key`] with
//! a long TTL for degraded reads.

pub mod cache_keys;
mod memory;
mod policy;

use std::time::Duration;

use async_trait::async_trait;
use log::warn;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

pub use memory::InMemoryCache;
pub use policy::{CachePolicies, CachePolicy};

/// Key/value store with per-entry expiry.
///
/// Implementations absorb their own failures; a backend error reads as a miss.
#[async_trait]
pub trait MarketDataCache: Send + Sync {
    async fn get_raw(&self, key: &str) -> Option<Value>;

    /// Store a value. `None` uses the backend's default TTL.
    async fn set_raw(&self, key: &str, value: Value, ttl: Option<Duration>);

    async fn remove(&self, key: &str);
}

impl dyn MarketDataCache {
    /// Typed read. A value that no longer decodes as `T` is a miss.
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let value = self.get_raw(key).await?;
        match serde_json::from_value(value) {
            Ok(decoded) => Some(decoded),
            Err(e) => {
                warn!("Cache: entry '{}' could not be decoded: {}", key, e);
                None
            }
        }
    }

    /// Typed write. Values that fail to encode are skipped with a warning.
    pub async fn set<T: Serialize + ?Sized>(&self, key: &str, value: &T, ttl: Option<Duration>) {
        match serde_json::to_value(value) {
            Ok(encoded) => self.set_raw(key, encoded, ttl).await,
            Err(e) => warn!("Cache: entry '{}' could not be encoded: {}", key, e),
        }
    }
}
