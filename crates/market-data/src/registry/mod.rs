//! Per-provider runtime state.
//!
//! This module tracks everything the service consults before and after
//! calling a provider:
//! - Health status with a rolling response-time average
//! - Minute and day rate-limit windows
//! - Request counters
//! - API call costs and spend thresholds

mod cost_calculator;
mod cost_tracker;
mod health_monitor;
mod metrics;
mod rate_limiter;

pub use cost_calculator::CostCalculator;
pub use cost_tracker::{CostTracker, ProviderCostMetrics};
pub use health_monitor::{HealthMonitor, ProviderHealth, RESPONSE_TIME_WINDOW, UNHEALTHY_THRESHOLD};
pub use metrics::{MetricsTracker, ProviderMetrics};
pub use rate_limiter::{RateLimitStatus, RateLimiter};
