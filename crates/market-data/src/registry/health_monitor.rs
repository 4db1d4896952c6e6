//! Per-provider health tracking.
//!
//! Every known provider starts healthy. Consecutive failures are counted and
//! the provider is marked unhealthy once the count reaches
//! [`UNHEALTHY_THRESHOLD`]; the next success restores it immediately:
//!
//! ```text
//! Healthy --(3rd consecutive failure)--> Unhealthy --(1 success)--> Healthy
//! ```
//!
//! Latency samples from successful calls feed a rolling window of the last
//! [`RESPONSE_TIME_WINDOW`] samples per provider.
//!
//! Health state is in-memory and resets on application restart.

use std::collections::{HashMap, VecDeque};
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use futures::future::join_all;
use futures::FutureExt;
use log::{debug, error, info, warn};
use serde::Serialize;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::models::ProviderId;
use crate::provider::MarketDataProvider;

/// Consecutive failures after which a provider is marked unhealthy.
pub const UNHEALTHY_THRESHOLD: u32 = 3;

/// Number of latency samples kept per provider.
pub const RESPONSE_TIME_WINDOW: usize = 100;

/// Default upper bound for a single health probe.
const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(10);

/// Snapshot of a provider's health.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderHealth {
    pub is_healthy: bool,
    pub last_checked: DateTime<Utc>,
    pub consecutive_failures: u32,
    pub average_response_time: Duration,
}

impl ProviderHealth {
    /// A provider that has not failed yet.
    pub fn healthy() -> Self {
        Self {
            is_healthy: true,
            last_checked: Utc::now(),
            consecutive_failures: 0,
            average_response_time: Duration::ZERO,
        }
    }
}

/// Mutable health state for one provider.
#[derive(Debug)]
struct HealthRecord {
    is_healthy: bool,
    last_checked: DateTime<Utc>,
    consecutive_failures: u32,
    /// Most recent latency samples, oldest first.
    samples: VecDeque<Duration>,
    /// Sum of `samples`, kept alongside to avoid re-summing.
    samples_total: Duration,
}

impl HealthRecord {
    fn new() -> Self {
        Self {
            is_healthy: true,
            last_checked: Utc::now(),
            consecutive_failures: 0,
            samples: VecDeque::with_capacity(RESPONSE_TIME_WINDOW),
            samples_total: Duration::ZERO,
        }
    }

    fn average_response_time(&self) -> Duration {
        if self.samples.is_empty() {
            Duration::ZERO
        } else {
            self.samples_total / self.samples.len() as u32
        }
    }

    /// Returns true if this success restored an unhealthy provider.
    fn record_success(&mut self, elapsed: Duration) -> bool {
        let recovered = !self.is_healthy;

        self.consecutive_failures = 0;
        self.is_healthy = true;
        self.last_checked = Utc::now();

        if self.samples.len() == RESPONSE_TIME_WINDOW {
            if let Some(oldest) = self.samples.pop_front() {
                self.samples_total -= oldest;
            }
        }
        self.samples.push_back(elapsed);
        self.samples_total += elapsed;

        recovered
    }

    /// Returns true if this failure flipped the provider to unhealthy.
    fn record_failure(&mut self) -> bool {
        self.consecutive_failures = self.consecutive_failures.saturating_add(1);
        self.last_checked = Utc::now();

        if self.is_healthy && self.consecutive_failures >= UNHEALTHY_THRESHOLD {
            self.is_healthy = false;
            return true;
        }
        false
    }

    fn snapshot(&self) -> ProviderHealth {
        ProviderHealth {
            is_healthy: self.is_healthy,
            last_checked: self.last_checked,
            consecutive_failures: self.consecutive_failures,
            average_response_time: self.average_response_time(),
        }
    }
}

/// Handle to the background probe loop.
struct PeriodicChecks {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

/// Tracks health for a fixed set of providers.
///
/// Records are created at construction for every provider passed in; calls
/// naming any other provider log a warning and leave state untouched.
pub struct HealthMonitor {
    providers: HashMap<ProviderId, Arc<dyn MarketDataProvider>>,
    records: DashMap<ProviderId, HealthRecord>,
    probe_timeout: Duration,
    periodic: Mutex<Option<PeriodicChecks>>,
}

impl HealthMonitor {
    /// Create a monitor for the given providers, all initially healthy.
    pub fn new(providers: &[Arc<dyn MarketDataProvider>]) -> Self {
        let records = DashMap::new();
        let mut registered = HashMap::new();

        for provider in providers {
            let id = ProviderId::Borrowed(provider.id());
            records.insert(id.clone(), HealthRecord::new());
            registered.insert(id, provider.clone());
        }

        Self {
            providers: registered,
            records,
            probe_timeout: DEFAULT_PROBE_TIMEOUT,
            periodic: Mutex::new(None),
        }
    }

    /// Override the per-probe timeout.
    pub fn with_probe_timeout(mut self, timeout: Duration) -> Self {
        self.probe_timeout = timeout;
        self
    }

    /// Record a successful call and its latency.
    pub fn record_success(&self, provider: &str, elapsed: Duration) {
        let Some(mut record) = self.records.get_mut(provider) else {
            warn!(
                "Health monitor: success reported for unknown provider '{}'",
                provider
            );
            return;
        };

        if record.record_success(elapsed) {
            info!("Health monitor: provider '{}' is healthy again", provider);
        } else {
            debug!(
                "Health monitor: success for '{}' in {:?}",
                provider, elapsed
            );
        }
    }

    /// Record a failed call.
    pub fn record_failure(&self, provider: &str) {
        let Some(mut record) = self.records.get_mut(provider) else {
            warn!(
                "Health monitor: failure reported for unknown provider '{}'",
                provider
            );
            return;
        };

        if record.record_failure() {
            warn!(
                "Health monitor: provider '{}' marked unhealthy after {} consecutive failures",
                provider, record.consecutive_failures
            );
        } else {
            debug!(
                "Health monitor: failure for '{}' ({}/{})",
                provider, record.consecutive_failures, UNHEALTHY_THRESHOLD
            );
        }
    }

    /// Probe one provider and feed the outcome into the record functions.
    ///
    /// A probe that errors, panics, reports unhealthy, or exceeds the probe
    /// timeout counts as a failure. Returns whether the probe passed.
    pub async fn check_health(&self, provider: &str) -> bool {
        let Some(target) = self.providers.get(provider).cloned() else {
            warn!(
                "Health monitor: cannot check unknown provider '{}'",
                provider
            );
            return false;
        };

        let started = Instant::now();
        let probe = AssertUnwindSafe(target.is_healthy()).catch_unwind();

        match tokio::time::timeout(self.probe_timeout, probe).await {
            Ok(Ok(Ok(true))) => {
                self.record_success(provider, started.elapsed());
                true
            }
            Ok(Ok(Ok(false))) => {
                debug!("Health monitor: '{}' reported itself unhealthy", provider);
                self.record_failure(provider);
                false
            }
            Ok(Ok(Err(e))) => {
                warn!("Health monitor: probe for '{}' failed: {}", provider, e);
                self.record_failure(provider);
                false
            }
            Ok(Err(_)) => {
                error!("Health monitor: probe for '{}' panicked", provider);
                self.record_failure(provider);
                false
            }
            Err(_) => {
                warn!(
                    "Health monitor: probe for '{}' timed out after {:?}",
                    provider, self.probe_timeout
                );
                self.record_failure(provider);
                false
            }
        }
    }

    /// Probe every registered provider concurrently.
    pub async fn check_all_providers(&self) {
        let checks = self.providers.keys().map(|id| self.check_health(id));
        let results = join_all(checks).await;
        let healthy = results.iter().filter(|ok| **ok).count();
        debug!(
            "Health monitor: {}/{} providers passed their probe",
            healthy,
            results.len()
        );
    }

    /// Health snapshot for a provider, or `None` if it is not registered.
    pub fn get_health_status(&self, provider: &str) -> Option<ProviderHealth> {
        self.records.get(provider).map(|record| record.snapshot())
    }

    /// Health snapshots for every registered provider.
    pub fn get_all_health_statuses(&self) -> HashMap<ProviderId, ProviderHealth> {
        self.records
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().snapshot()))
            .collect()
    }

    /// Whether a provider is currently healthy.
    ///
    /// Unregistered providers are reported as not healthy.
    pub fn is_healthy(&self, provider: &str) -> bool {
        match self.records.get(provider) {
            Some(record) => record.is_healthy,
            None => {
                warn!(
                    "Health monitor: health requested for unknown provider '{}'",
                    provider
                );
                false
            }
        }
    }

    fn lock_periodic(&self) -> MutexGuard<'_, Option<PeriodicChecks>> {
        self.periodic.lock().unwrap_or_else(|poisoned| {
            warn!("Health monitor task mutex was poisoned, recovering");
            poisoned.into_inner()
        })
    }

    /// Start probing all providers every `interval` on a background task.
    ///
    /// The task holds only a weak reference to the monitor, so dropping the
    /// last strong reference also ends the loop. Starting while already
    /// running logs a warning and does nothing. Must be called from within
    /// a Tokio runtime.
    pub fn start_periodic_checks(self: &Arc<Self>, interval: Duration) {
        if interval.is_zero() {
            warn!("Health monitor: refusing to start periodic checks with a zero interval");
            return;
        }

        let mut periodic = self.lock_periodic();
        if let Some(running) = periodic.as_ref() {
            if !running.handle.is_finished() {
                warn!("Health monitor: periodic checks already running");
                return;
            }
        }

        let runtime = match tokio::runtime::Handle::try_current() {
            Ok(handle) => handle,
            Err(e) => {
                error!(
                    "Health monitor: cannot start periodic checks outside a runtime: {}",
                    e
                );
                return;
            }
        };

        let cancel = CancellationToken::new();
        let monitor = Arc::downgrade(self);
        let handle = runtime.spawn(Self::run_periodic_checks(monitor, interval, cancel.clone()));

        *periodic = Some(PeriodicChecks { cancel, handle });
        info!(
            "Health monitor: periodic checks started (interval {:?})",
            interval
        );
    }

    async fn run_periodic_checks(
        monitor: Weak<Self>,
        interval: Duration,
        cancel: CancellationToken,
    ) {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {}
            }

            let Some(monitor) = monitor.upgrade() else {
                break;
            };

            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = monitor.check_all_providers() => {}
            }
        }

        debug!("Health monitor: periodic check loop exited");
    }

    /// Stop the background probe loop. Does nothing if it is not running.
    pub fn stop_periodic_checks(&self) {
        let stopped = self.lock_periodic().take();
        if let Some(periodic) = stopped {
            periodic.cancel.cancel();
            periodic.handle.abort();
            info!("Health monitor: periodic checks stopped");
        }
    }

    /// Whether the background probe loop is active.
    pub fn is_periodic_check_running(&self) -> bool {
        self.lock_periodic()
            .as_ref()
            .is_some_and(|periodic| !periodic.handle.is_finished())
    }
}

impl Drop for HealthMonitor {
    fn drop(&mut self) {
        self.stop_periodic_checks();
    }
}
