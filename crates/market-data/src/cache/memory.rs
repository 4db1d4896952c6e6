use std::time::{Duration, Instant};

use async_trait::async_trait;
use dashmap::DashMap;
use log::debug;
use serde_json::Value;

use super::MarketDataCache;

const DEFAULT_TTL: Duration = Duration::from_secs(5 * 60);

struct CacheEntry {
    value: Value,
    /// `None` when the TTL is too large to represent; such entries never expire.
    expires_at: Option<Instant>,
}

impl CacheEntry {
    fn is_expired(&self) -> bool {
        self.expires_at.is_some_and(|at| Instant::now() >= at)
    }
}

/// Process-local TTL cache.
///
/// Expired entries are dropped lazily on read, or in bulk by
/// [`purge_expired`](Self::purge_expired).
pub struct InMemoryCache {
    entries: DashMap<String, CacheEntry>,
    default_ttl: Duration,
}

impl InMemoryCache {
    pub fn new(default_ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            default_ttl,
        }
    }

    /// Number of live entries.
    pub fn len(&self) -> usize {
        self.entries.iter().filter(|e| !e.is_expired()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every expired entry, returning how many were removed.
    pub fn purge_expired(&self) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, entry| !entry.is_expired());
        let removed = before.saturating_sub(self.entries.len());
        if removed > 0 {
            debug!("Cache: purged {} expired entries", removed);
        }
        removed
    }

    pub fn clear(&self) {
        self.entries.clear();
    }
}

impl Default for InMemoryCache {
    fn default() -> Self {
        Self::new(DEFAULT_TTL)
    }
}

#[async_trait]
impl MarketDataCache for InMemoryCache {
    async fn get_raw(&self, key: &str) -> Option<Value> {
        let expired = match self.entries.get(key) {
            Some(entry) if !entry.is_expired() => return Some(entry.value.clone()),
            Some(_) => true,
            None => false,
        };

        if expired {
            self.entries.remove_if(key, |_, entry| entry.is_expired());
        }
        None
    }

    async fn set_raw(&self, key: &str, value: Value, ttl: Option<Duration>) {
        let ttl = ttl.unwrap_or(self.default_ttl);
        self.entries.insert(
            key.to_string(),
            CacheEntry {
                value,
                expires_at: Instant::now().checked_add(ttl),
            },
        );
    }

    async fn remove(&self, key: &str) {
        self.entries.remove(key);
    }
}
