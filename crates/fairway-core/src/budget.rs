use std::collections::BTreeMap;
use std::sync::Mutex;

use serde::{Deserialize, Serialize};

use crate::provider::ProviderId;

/// Spending ceilings for a single course run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BudgetConfig {
    /// Spending stops entirely at this ceiling.
    pub hard_ceiling_usd: f64,
    /// Optional stages are suppressed past this ceiling.
    pub soft_ceiling_usd: f64,
    /// Remaining monthly credits per provider; absent means uncapped.
    pub credit_caps: BTreeMap<ProviderId, u32>,
}

impl Default for BudgetConfig {
    fn default() -> Self {
        Self {
            hard_ceiling_usd: 0.25,
            soft_ceiling_usd: 0.20,
            credit_caps: BTreeMap::new(),
        }
    }
}

/// Point-in-time remaining budget.
#[derive(Debug, Clone, PartialEq)]
pub struct BudgetRemaining {
    pub usd_left: f64,
    /// `None` means the provider has no credit cap configured.
    pub credits_left: BTreeMap<ProviderId, Option<u32>>,
}

/// Totals recorded on the course row after a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BudgetSnapshot {
    pub spent_usd: f64,
    pub credits: BTreeMap<ProviderId, u32>,
}

#[derive(Debug, Default)]
struct Spend {
    usd: f64,
    credits: BTreeMap<ProviderId, u32>,
}

/// Per-course accumulator of monetary cost and provider credits. Shared by
/// the intelligence stage and every cascade stage of one run; thread-safe so
/// the cascade may parallelize.
#[derive(Debug)]
pub struct BudgetMeter {
    config: BudgetConfig,
    inner: Mutex<Spend>,
}

impl BudgetMeter {
    pub fn new(config: BudgetConfig) -> Self {
        Self {
            config,
            inner: Mutex::new(Spend::default()),
        }
    }

    pub fn charge(&self, provider: ProviderId, usd: f64, credits: u32) {
        let mut spend = self.inner.lock().expect("budget lock is not poisoned");
        spend.usd += usd.max(0.0);
        if credits > 0 {
            *spend.credits.entry(provider).or_insert(0) += credits;
        }
    }

    /// Books a metered provider receipt.
    pub fn record<T>(&self, receipt: &crate::providers::contracts::Metered<T>) {
        self.charge(receipt.provider, receipt.cost_usd, receipt.credits_used);
    }

    pub fn spent_usd(&self) -> f64 {
        self.inner
            .lock()
            .expect("budget lock is not poisoned")
            .usd
    }

    pub fn remaining(&self) -> BudgetRemaining {
        let spend = self.inner.lock().expect("budget lock is not poisoned");
        let mut credits_left = BTreeMap::new();
        for provider in ProviderId::ALL {
            let used = spend.credits.get(&provider).copied().unwrap_or(0);
            let left = self
                .config
                .credit_caps
                .get(&provider)
                .map(|cap| cap.saturating_sub(used));
            credits_left.insert(provider, left);
        }

        BudgetRemaining {
            usd_left: (self.config.hard_ceiling_usd - spend.usd).max(0.0),
            credits_left,
        }
    }

    /// Whether spending `est_usd` with `provider` would cross the hard
    /// ceiling or exhaust the provider's credit cap.
    pub fn would_exceed(&self, provider: ProviderId, est_usd: f64) -> bool {
        let spend = self.inner.lock().expect("budget lock is not poisoned");
        if spend.usd + est_usd > self.config.hard_ceiling_usd {
            return true;
        }
        if let Some(cap) = self.config.credit_caps.get(&provider) {
            let used = spend.credits.get(&provider).copied().unwrap_or(0);
            if used >= *cap {
                return true;
            }
        }
        false
    }

    /// Past the soft ceiling optional stages stop spending.
    pub fn soft_exhausted(&self) -> bool {
        self.spent_usd() >= self.config.soft_ceiling_usd
    }

    pub fn snapshot(&self) -> BudgetSnapshot {
        let spend = self.inner.lock().expect("budget lock is not poisoned");
        BudgetSnapshot {
            spent_usd: (spend.usd * 10_000.0).round() / 10_000.0,
            credits: spend.credits.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn meter() -> BudgetMeter {
        BudgetMeter::new(BudgetConfig::default())
    }

    #[test]
    fn charges_accumulate_across_providers() {
        let meter = meter();
        meter.charge(ProviderId::Hunter, 0.012, 1);
        meter.charge(ProviderId::Apollo, 0.039, 2);
        meter.charge(ProviderId::Apollo, 0.039, 2);

        let snapshot = meter.snapshot();
        assert_eq!(snapshot.spent_usd, 0.09);
        assert_eq!(snapshot.credits.get(&ProviderId::Apollo), Some(&4));
        assert_eq!(snapshot.credits.get(&ProviderId::Hunter), Some(&1));
    }

    #[test]
    fn would_exceed_trips_at_the_hard_ceiling() {
        let meter = meter();
        meter.charge(ProviderId::Perplexity, 0.24, 0);

        assert!(!meter.would_exceed(ProviderId::Jina, 0.0));
        assert!(meter.would_exceed(ProviderId::Perplexity, 0.02));
    }

    #[test]
    fn soft_ceiling_suppresses_before_hard_ceiling() {
        let meter = meter();
        meter.charge(ProviderId::Apollo, 0.21, 2);

        assert!(meter.soft_exhausted());
        assert!(!meter.would_exceed(ProviderId::Apollo, 0.01));
    }

    #[test]
    fn credit_cap_blocks_a_single_provider() {
        let mut config = BudgetConfig::default();
        config.credit_caps.insert(ProviderId::Apollo, 4);
        let meter = BudgetMeter::new(config);

        meter.charge(ProviderId::Apollo, 0.039, 4);
        assert!(meter.would_exceed(ProviderId::Apollo, 0.01));
        assert!(!meter.would_exceed(ProviderId::Hunter, 0.01));

        let remaining = meter.remaining();
        assert_eq!(remaining.credits_left.get(&ProviderId::Apollo), Some(&Some(0)));
        assert_eq!(remaining.credits_left.get(&ProviderId::Hunter), Some(&None));
    }

    #[test]
    fn usd_left_never_goes_negative() {
        let meter = meter();
        meter.charge(ProviderId::Apollo, 1.0, 0);
        assert_eq!(meter.remaining().usd_left, 0.0);
    }
}
