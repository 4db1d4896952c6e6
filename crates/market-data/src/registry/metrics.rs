//! Per-provider request counters.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use log::info;
use serde::Serialize;

use crate::models::ProviderId;

#[derive(Debug, Default)]
struct Counters {
    total: AtomicU64,
    success: AtomicU64,
    failed: AtomicU64,
}

impl Counters {
    fn snapshot(&self) -> ProviderMetrics {
        ProviderMetrics {
            total_requests: self.total.load(Ordering::Relaxed),
            successful_requests: self.success.load(Ordering::Relaxed),
            failed_requests: self.failed.load(Ordering::Relaxed),
        }
    }
}

/// Request counts for one provider.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderMetrics {
    pub total_requests: u64,
    pub successful_requests: u64,
    pub failed_requests: u64,
}

impl ProviderMetrics {
    /// Fraction of requests that succeeded, in `[0, 1]`. Zero when idle.
    pub fn success_rate(&self) -> f64 {
        if self.total_requests == 0 {
            0.0
        } else {
            self.successful_requests as f64 / self.total_requests as f64
        }
    }
}

/// Counts total, successful and failed provider calls.
///
/// Counters are created on first use; reads for a provider that has never
/// been recorded return zeros.
#[derive(Debug, Default)]
pub struct MetricsTracker {
    counters: DashMap<ProviderId, Counters>,
}

impl MetricsTracker {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_counters(&self, provider: &str, f: impl FnOnce(&Counters)) {
        if let Some(counters) = self.counters.get(provider) {
            f(counters.value());
            return;
        }
        let counters = self
            .counters
            .entry(ProviderId::Owned(provider.to_string()))
            .or_default();
        f(counters.value());
    }

    pub fn record_success(&self, provider: &str) {
        self.with_counters(provider, |c| {
            c.total.fetch_add(1, Ordering::Relaxed);
            c.success.fetch_add(1, Ordering::Relaxed);
        });
    }

    pub fn record_failure(&self, provider: &str) {
        self.with_counters(provider, |c| {
            c.total.fetch_add(1, Ordering::Relaxed);
            c.failed.fetch_add(1, Ordering::Relaxed);
        });
    }

    pub fn get_metrics(&self, provider: &str) -> ProviderMetrics {
        self.counters
            .get(provider)
            .map(|c| c.snapshot())
            .unwrap_or_default()
    }

    pub fn get_total_requests(&self, provider: &str) -> u64 {
        self.get_metrics(provider).total_requests
    }

    pub fn get_successful_requests(&self, provider: &str) -> u64 {
        self.get_metrics(provider).successful_requests
    }

    pub fn get_failed_requests(&self, provider: &str) -> u64 {
        self.get_metrics(provider).failed_requests
    }

    pub fn get_all_metrics(&self) -> HashMap<ProviderId, ProviderMetrics> {
        self.counters
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().snapshot()))
            .collect()
    }

    pub fn reset_metrics(&self, provider: &str) {
        self.counters.remove(provider);
        info!("Metrics: counters reset for '{}'", provider);
    }

    pub fn reset_all_metrics(&self) {
        self.counters.clear();
        info!("Metrics: all counters reset");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_unknown_provider_reads_zero() {
        let tracker = MetricsTracker::new();
        assert_eq!(tracker.get_metrics("UNKNOWN"), ProviderMetrics::default());
        assert_eq!(tracker.get_total_requests("UNKNOWN"), 0);
        assert!(tracker.get_all_metrics().is_empty());
    }

    #[test]
    fn test_success_and_failure_counts() {
        let tracker = MetricsTracker::new();
        tracker.record_success("YAHOO");
        tracker.record_success("YAHOO");
        tracker.record_failure("YAHOO");
        tracker.record_failure("ALPHA_VANTAGE");

        assert_eq!(tracker.get_total_requests("YAHOO"), 3);
        assert_eq!(tracker.get_successful_requests("YAHOO"), 2);
        assert_eq!(tracker.get_failed_requests("YAHOO"), 1);
        assert!((tracker.get_metrics("YAHOO").success_rate() - 2.0 / 3.0).abs() < 1e-9);

        let all = tracker.get_all_metrics();
        assert_eq!(all.len(), 2);
        assert_eq!(all["ALPHA_VANTAGE"].failed_requests, 1);
    }

    #[test]
    fn test_reset() {
        let tracker = MetricsTracker::new();
        tracker.record_success("YAHOO");
        tracker.record_success("ALPHA_VANTAGE");

        tracker.reset_metrics("YAHOO");
        assert_eq!(tracker.get_total_requests("YAHOO"), 0);
        assert_eq!(tracker.get_total_requests("ALPHA_VANTAGE"), 1);

        tracker.reset_all_metrics();
        assert!(tracker.get_all_metrics().is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_updates_are_exact() {
        let tracker = Arc::new(MetricsTracker::new());

        let tasks: Vec<_> = (0..1000)
            .map(|i| {
                let tracker = tracker.clone();
                tokio::spawn(async move {
                    if i % 4 == 0 {
                        tracker.record_failure("YAHOO");
                    } else {
                        tracker.record_success("YAHOO");
                    }
                })
            })
            .collect();
        for task in tasks {
            task.await.unwrap();
        }

        let metrics = tracker.get_metrics("YAHOO");
        assert_eq!(metrics.total_requests, 1000);
        assert_eq!(metrics.failed_requests, 250);
        assert_eq!(metrics.successful_requests, 750);
    }
}
