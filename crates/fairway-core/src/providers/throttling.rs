use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use governor::clock::DefaultClock;
use governor::state::direct::NotKeyed;
use governor::state::InMemoryState;
use governor::{Quota, RateLimiter};

use crate::providers::policy::ProviderPolicy;

type DirectRateLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// Process-wide token bucket guarding one provider's quota. The check is
/// constant-time; callers sleep and retry through the adapter's backoff
/// policy when no budget is available.
#[derive(Clone)]
pub struct RateGate {
    limiter: Arc<DirectRateLimiter>,
    suggested_delay: Duration,
}

impl RateGate {
    pub fn new(quota_window: Duration, quota_limit: u32) -> Self {
        let safe_limit = quota_limit.max(1);
        let suggested_delay =
            Duration::from_secs_f64(quota_window.as_secs_f64() / f64::from(safe_limit));
        Self {
            limiter: Arc::new(RateLimiter::direct(quota_from_window(
                quota_window,
                safe_limit,
            ))),
            suggested_delay,
        }
    }

    pub fn from_policy(policy: &ProviderPolicy) -> Self {
        Self::new(policy.quota_window, policy.quota_limit)
    }

    /// Tries to take one token. On denial returns the delay after which the
    /// next token is expected to be available.
    pub fn try_acquire(&self) -> Result<(), Duration> {
        if self.limiter.check().is_ok() {
            return Ok(());
        }
        Err(self.suggested_delay)
    }
}

fn quota_from_window(quota_window: Duration, safe_limit: u32) -> Quota {
    let burst = NonZeroU32::new(safe_limit).expect("safe limit must be non-zero");

    let seconds_per_cell = (quota_window.as_secs_f64() / f64::from(safe_limit)).max(0.001);
    let period = Duration::from_secs_f64(seconds_per_cell);

    Quota::with_period(period)
        .expect("period is always greater than zero")
        .allow_burst(burst)
}
