use std::time::Duration;

use crate::provider::ProviderId;

/// Per-provider quota, timeout, retry, and cost expectations.
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderPolicy {
    pub provider: ProviderId,
    pub timeout: Duration,
    pub quota_window: Duration,
    pub quota_limit: u32,
    pub retry_backoff: BackoffPolicy,
    /// Planning estimate consulted by the budget meter before spending.
    pub estimated_call_cost_usd: f64,
    /// Credits the provider bills per successful metered call.
    pub credits_per_call: u32,
}

/// Bounded exponential backoff applied only to rate-limited calls.
#[derive(Debug, Clone, PartialEq)]
pub struct BackoffPolicy {
    pub initial_delay: Duration,
    pub max_delay: Duration,
    pub multiplier: f64,
    pub max_retries: u32,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(30),
            multiplier: 2.0,
            max_retries: 3,
        }
    }
}

impl BackoffPolicy {
    /// Delay before retry number `retry_count` (1-based), `None` once the
    /// retry budget is exhausted.
    pub fn delay_for(&self, retry_count: u32) -> Option<Duration> {
        if retry_count == 0 || retry_count > self.max_retries {
            return None;
        }

        let scale = self.multiplier.powf(f64::from(retry_count - 1));
        let seconds = self.initial_delay.as_secs_f64() * scale;
        Some(Duration::from_secs_f64(
            seconds.min(self.max_delay.as_secs_f64()),
        ))
    }
}

impl ProviderPolicy {
    pub fn directory_default() -> Self {
        Self {
            provider: ProviderId::Directory,
            timeout: Duration::from_secs(30),
            quota_window: Duration::from_secs(60),
            quota_limit: 30,
            retry_backoff: BackoffPolicy::default(),
            estimated_call_cost_usd: 0.0,
            credits_per_call: 0,
        }
    }

    pub fn apollo_default() -> Self {
        Self {
            provider: ProviderId::Apollo,
            timeout: Duration::from_secs(30),
            quota_window: Duration::from_secs(60),
            quota_limit: 50,
            retry_backoff: BackoffPolicy::default(),
            // Enrichment unlocks an email at 2 credits on the monthly plan.
            estimated_call_cost_usd: 0.039,
            credits_per_call: 2,
        }
    }

    pub fn hunter_default() -> Self {
        Self {
            provider: ProviderId::Hunter,
            timeout: Duration::from_secs(30),
            quota_window: Duration::from_secs(60),
            quota_limit: 15,
            retry_backoff: BackoffPolicy {
                initial_delay: Duration::from_secs(1),
                max_delay: Duration::from_secs(60),
                multiplier: 2.0,
                max_retries: 3,
            },
            estimated_call_cost_usd: 0.012,
            credits_per_call: 1,
        }
    }

    pub fn jina_default() -> Self {
        Self {
            provider: ProviderId::Jina,
            timeout: Duration::from_secs(30),
            quota_window: Duration::from_secs(60),
            quota_limit: 60,
            retry_backoff: BackoffPolicy::default(),
            estimated_call_cost_usd: 0.0,
            credits_per_call: 0,
        }
    }

    pub fn perplexity_default() -> Self {
        Self {
            provider: ProviderId::Perplexity,
            timeout: Duration::from_secs(30),
            quota_window: Duration::from_secs(60),
            quota_limit: 20,
            retry_backoff: BackoffPolicy::default(),
            estimated_call_cost_usd: 0.005,
            credits_per_call: 0,
        }
    }

    pub fn firecrawl_default() -> Self {
        Self {
            provider: ProviderId::Firecrawl,
            timeout: Duration::from_secs(30),
            quota_window: Duration::from_secs(60),
            quota_limit: 10,
            retry_backoff: BackoffPolicy::default(),
            estimated_call_cost_usd: 0.01,
            credits_per_call: 1,
        }
    }

    pub fn default_for(provider: ProviderId) -> Self {
        match provider {
            ProviderId::Directory => Self::directory_default(),
            ProviderId::Apollo => Self::apollo_default(),
            ProviderId::Hunter => Self::hunter_default(),
            ProviderId::Jina => Self::jina_default(),
            ProviderId::Perplexity => Self::perplexity_default(),
            ProviderId::Firecrawl => Self::firecrawl_default(),
        }
    }

    pub fn with_rate_limit_per_minute(mut self, limit: u32) -> Self {
        self.quota_window = Duration::from_secs(60);
        self.quota_limit = limit.max(1);
        self
    }

    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout = Duration::from_millis(timeout_ms.max(1));
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_is_exponential_capped_and_bounded() {
        let backoff = BackoffPolicy {
            initial_delay: Duration::from_secs(2),
            max_delay: Duration::from_secs(10),
            multiplier: 2.0,
            max_retries: 3,
        };

        assert_eq!(backoff.delay_for(1), Some(Duration::from_secs(2)));
        assert_eq!(backoff.delay_for(2), Some(Duration::from_secs(4)));
        assert_eq!(backoff.delay_for(3), Some(Duration::from_secs(8)));
        assert_eq!(backoff.delay_for(4), None);
    }

    #[test]
    fn zero_is_not_a_retry() {
        assert_eq!(BackoffPolicy::default().delay_for(0), None);
    }

    #[test]
    fn every_provider_has_a_default_policy() {
        for provider in ProviderId::ALL {
            let policy = ProviderPolicy::default_for(provider);
            assert_eq!(policy.provider, provider);
            assert!(policy.quota_limit > 0);
        }
    }
}
