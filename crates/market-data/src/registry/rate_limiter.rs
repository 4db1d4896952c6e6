//! Dual-window token bucket rate limiter for metered providers.
//!
//! Each limiter guards one provider with two independent pools: a minute
//! pool that refills completely every 60 seconds and a day pool that refills
//! completely every 24 hours. A call is admitted only when it can take a
//! token from both pools.

use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

use log::{debug, warn};
use serde::Serialize;
use tokio_util::sync::CancellationToken;

use crate::errors::{MarketDataError, Result};
use crate::models::ProviderId;
use crate::settings::RateLimitSettings;

const MINUTE: Duration = Duration::from_secs(60);
const DAY: Duration = Duration::from_secs(24 * 60 * 60);

/// Upper bound on a single sleep while waiting for capacity.
const MAX_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// One fixed-window token pool.
#[derive(Debug)]
struct Window {
    /// Tokens left in the current window.
    remaining: u32,
    /// Tokens available at the start of every window.
    capacity: u32,
    /// Window length.
    period: Duration,
    /// Start of the current window.
    started: Instant,
}

impl Window {
    fn new(capacity: u32, period: Duration, now: Instant) -> Self {
        Self {
            remaining: capacity,
            capacity,
            period,
            started: now,
        }
    }

    /// Start a new window if the current one has elapsed.
    fn refill(&mut self, now: Instant) {
        if now.saturating_duration_since(self.started) >= self.period {
            self.remaining = self.capacity;
            self.started = now;
        }
    }

    fn try_take(&mut self) -> bool {
        if self.remaining > 0 {
            self.remaining -= 1;
            true
        } else {
            false
        }
    }

    fn give_back(&mut self) {
        self.remaining = (self.remaining + 1).min(self.capacity);
    }

    fn reset_in(&self, now: Instant) -> Duration {
        self.period
            .saturating_sub(now.saturating_duration_since(self.started))
    }
}

#[derive(Debug)]
struct Pools {
    minute: Window,
    day: Window,
}

impl Pools {
    fn refill(&mut self, now: Instant) {
        self.minute.refill(now);
        self.day.refill(now);
    }
}

/// Read-only view of a limiter's pools.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RateLimitStatus {
    pub minute_remaining: u32,
    pub minute_limit: u32,
    pub minute_reset_in: Duration,
    pub day_remaining: u32,
    pub day_limit: u32,
    pub day_reset_in: Duration,
    pub is_rate_limited: bool,
}

impl RateLimitStatus {
    /// Calls that can be admitted right now.
    pub fn available(&self) -> u32 {
        self.minute_remaining.min(self.day_remaining)
    }
}

/// Per-provider dual-window rate limiter.
///
/// Both pools sit behind one mutex so that taking the pair of tokens, and
/// returning the minute token when the day pool is empty, is a single step
/// for concurrent callers. The lock is never held across an await.
pub struct RateLimiter {
    provider: ProviderId,
    pools: Mutex<Pools>,
}

impl RateLimiter {
    /// Create a limiter with the given minute and day capacities.
    pub fn new(provider: impl Into<ProviderId>, per_minute: u32, per_day: u32) -> Self {
        let now = Instant::now();
        Self {
            provider: provider.into(),
            pools: Mutex::new(Pools {
                minute: Window::new(per_minute, MINUTE, now),
                day: Window::new(per_day, DAY, now),
            }),
        }
    }

    #[cfg(test)]
    fn with_periods(per_minute: u32, minute: Duration, per_day: u32, day: Duration) -> Self {
        let now = Instant::now();
        Self {
            provider: ProviderId::Borrowed("TEST"),
            pools: Mutex::new(Pools {
                minute: Window::new(per_minute, minute, now),
                day: Window::new(per_day, day, now),
            }),
        }
    }

    /// Create a limiter from provider settings.
    pub fn from_settings(provider: impl Into<ProviderId>, settings: &RateLimitSettings) -> Self {
        Self::new(
            provider,
            settings.requests_per_minute,
            settings.requests_per_day,
        )
    }

    /// The provider this limiter guards.
    pub fn provider(&self) -> &str {
        &self.provider
    }

    /// Lock the pools, recovering from poison if necessary.
    ///
    /// The pools hold plain counters, so a panic elsewhere cannot leave them
    /// in a state worse than slightly inaccurate.
    fn lock_pools(&self) -> MutexGuard<'_, Pools> {
        self.pools.lock().unwrap_or_else(|poisoned| {
            warn!(
                "Rate limiter mutex for '{}' was poisoned, recovering",
                self.provider
            );
            poisoned.into_inner()
        })
    }

    /// Try to take one minute token and one day token without waiting.
    ///
    /// When the minute token is available but the day pool is exhausted, the
    /// minute token is returned so the call has no net effect.
    pub fn try_acquire(&self) -> bool {
        let mut pools = self.lock_pools();
        pools.refill(Instant::now());

        if !pools.minute.try_take() {
            debug!("Rate limiter: minute pool exhausted for '{}'", self.provider);
            return false;
        }

        if !pools.day.try_take() {
            pools.minute.give_back();
            debug!("Rate limiter: day pool exhausted for '{}'", self.provider);
            return false;
        }

        true
    }

    /// Wait until a token pair is available or `cancel` fires.
    ///
    /// Returns [`MarketDataError::Cancelled`] once cancellation is observed.
    pub async fn wait_for_availability(&self, cancel: &CancellationToken) -> Result<()> {
        loop {
            if cancel.is_cancelled() {
                return Err(self.cancelled());
            }

            if self.try_acquire() {
                return Ok(());
            }

            let wait = self.next_poll_delay();
            debug!(
                "Rate limiter: waiting {:?} for provider '{}'",
                wait, self.provider
            );

            tokio::select! {
                _ = cancel.cancelled() => return Err(self.cancelled()),
                _ = tokio::time::sleep(wait) => {}
            }
        }
    }

    /// Wait for availability for at most `timeout`.
    pub async fn wait_for_availability_timeout(&self, timeout: Duration) -> Result<()> {
        let cancel = CancellationToken::new();
        match tokio::time::timeout(timeout, self.wait_for_availability(&cancel)).await {
            Ok(result) => result,
            Err(_) => {
                debug!(
                    "Rate limiter: timed out after {:?} waiting for '{}'",
                    timeout, self.provider
                );
                Err(self.cancelled())
            }
        }
    }

    /// Snapshot of both pools.
    pub fn get_status(&self) -> RateLimitStatus {
        let now = Instant::now();
        let mut pools = self.lock_pools();
        pools.refill(now);

        RateLimitStatus {
            minute_remaining: pools.minute.remaining,
            minute_limit: pools.minute.capacity,
            minute_reset_in: pools.minute.reset_in(now),
            day_remaining: pools.day.remaining,
            day_limit: pools.day.capacity,
            day_reset_in: pools.day.reset_in(now),
            is_rate_limited: pools.minute.remaining == 0 || pools.day.remaining == 0,
        }
    }

    /// Refill both pools and restart their windows.
    pub fn reset(&self) {
        let now = Instant::now();
        let mut pools = self.lock_pools();
        let (minute_capacity, minute_period) = (pools.minute.capacity, pools.minute.period);
        let (day_capacity, day_period) = (pools.day.capacity, pools.day.period);
        pools.minute = Window::new(minute_capacity, minute_period, now);
        pools.day = Window::new(day_capacity, day_period, now);
    }

    fn next_poll_delay(&self) -> Duration {
        let now = Instant::now();
        let pools = self.lock_pools();
        let until_refill = if pools.day.remaining == 0 {
            pools.day.reset_in(now)
        } else {
            pools.minute.reset_in(now)
        };
        until_refill.clamp(Duration::from_millis(1), MAX_POLL_INTERVAL)
    }

    fn cancelled(&self) -> MarketDataError {
        MarketDataError::Cancelled {
            provider: self.provider.to_string(),
        }
    }
}

impl std::fmt::Debug for RateLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateLimiter")
            .field("provider", &self.provider)
            .finish_non_exhaustive()
    }
}
