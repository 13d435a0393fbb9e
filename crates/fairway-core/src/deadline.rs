use std::time::{Duration, Instant};

use crate::providers::contracts::{Metered, ProviderError, ProviderFuture};

/// Wall-clock ceiling for one course run. Cancellation is cooperative:
/// every provider call is capped at the remaining time, and the cascade
/// checks expiry between stages.
#[derive(Debug, Clone, Copy)]
pub struct Deadline {
    at: Instant,
}

impl Deadline {
    pub fn after(budget: Duration) -> Self {
        Self {
            at: Instant::now() + budget,
        }
    }

    pub fn expired(&self) -> bool {
        Instant::now() >= self.at
    }

    pub fn remaining(&self) -> Duration {
        self.at.saturating_duration_since(Instant::now())
    }

    /// Caps a provider call at the remaining course wall clock; an in-flight
    /// call is cancelled at its next suspension point.
    pub async fn cap<T>(&self, future: ProviderFuture<'_, T>) -> Result<Metered<T>, ProviderError> {
        let remaining = self.remaining();
        if remaining.is_zero() {
            return Err(ProviderError::timeout("course deadline expired"));
        }
        match tokio::time::timeout(remaining, future).await {
            Ok(result) => result,
            Err(_) => Err(ProviderError::timeout(
                "course deadline expired during provider call",
            )),
        }
    }
}
