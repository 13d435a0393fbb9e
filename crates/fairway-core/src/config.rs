use std::fmt::{Debug, Formatter};
use std::time::Duration;

use crate::budget::BudgetConfig;

/// Opaque provider credential. Debug output is redacted so the secret can
/// never leak through logs or error formatting.
#[derive(Clone, PartialEq, Eq, Default)]
pub struct Credential(String);

impl Credential {
    pub fn new(secret: impl Into<String>) -> Self {
        Self(secret.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl Debug for Credential {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str("Credential(***)")
    }
}

/// Connection settings for one provider. The core treats the endpoint and
/// credential opaquely.
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderConfig {
    pub api_base_url: String,
    pub credential: Credential,
    pub timeout_ms: u64,
    pub rate_limit_per_minute: u32,
    pub hard_monthly_credit_cap: Option<u32>,
}

impl ProviderConfig {
    pub fn new(api_base_url: impl Into<String>, credential: Credential) -> Self {
        Self {
            api_base_url: api_base_url.into(),
            credential,
            timeout_ms: 30_000,
            rate_limit_per_minute: 30,
            hard_monthly_credit_cap: None,
        }
    }

    pub fn with_rate_limit_per_minute(mut self, limit: u32) -> Self {
        self.rate_limit_per_minute = limit;
        self
    }

    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    pub fn with_monthly_credit_cap(mut self, cap: u32) -> Self {
        self.hard_monthly_credit_cap = Some(cap);
        self
    }
}

/// Cascade tuning knobs.
#[derive(Debug, Clone, PartialEq)]
pub struct CascadeConfig {
    /// Early-exit target: contacts holding both a verified email and a
    /// LinkedIn URL.
    pub n_target: usize,
    /// Paths probed on the course website during the web-read stage.
    pub probe_paths: Vec<String>,
    /// Staff pages to try per web-read pass.
    pub max_pages_per_probe: usize,
}

impl Default for CascadeConfig {
    fn default() -> Self {
        Self {
            n_target: 3,
            probe_paths: ["staff", "contact", "about", "our-team", "about-us"]
                .into_iter()
                .map(String::from)
                .collect(),
            max_pages_per_probe: 3,
        }
    }
}

/// Full typed configuration handed to the orchestrator. Nothing in the core
/// reads ambient process state; the service binary assembles this record.
#[derive(Debug, Clone, Default)]
pub struct EnrichmentConfig {
    pub directory: Option<ProviderConfig>,
    pub apollo: Option<ProviderConfig>,
    pub hunter: Option<ProviderConfig>,
    pub jina: Option<ProviderConfig>,
    pub perplexity: Option<ProviderConfig>,
    pub firecrawl: Option<ProviderConfig>,
    pub budget: BudgetConfig,
    pub cascade: CascadeConfig,
    /// Wall-clock ceiling for one course run.
    pub course_deadline: Duration,
}

impl EnrichmentConfig {
    pub fn new() -> Self {
        Self {
            directory: None,
            apollo: None,
            hunter: None,
            jina: None,
            perplexity: None,
            firecrawl: None,
            budget: BudgetConfig::default(),
            cascade: CascadeConfig::default(),
            course_deadline: Duration::from_secs(120),
        }
    }
}
