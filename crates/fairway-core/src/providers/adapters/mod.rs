pub mod apollo;
pub mod directory;
pub mod firecrawl;
pub mod hunter;
pub mod jina;
pub mod perplexity;

pub use apollo::ApolloAdapter;
pub use directory::DirectoryAdapter;
pub use firecrawl::FirecrawlAdapter;
pub use hunter::HunterAdapter;
pub use jina::JinaAdapter;
pub use perplexity::PerplexityAdapter;

use std::sync::Arc;

use crate::config::ProviderConfig;
use crate::provider::ProviderId;
use crate::providers::circuit_breaker::CircuitBreaker;
use crate::providers::contracts::ProviderError;
use crate::providers::http_client::{HttpClient, HttpErrorKind, HttpRequest, HttpResponse};
use crate::providers::policy::ProviderPolicy;
use crate::providers::throttling::RateGate;

/// Shared call path for every adapter: circuit breaker, local quota gate,
/// transport with per-provider timeout, and the bounded rate-limit retry.
pub(crate) struct AdapterCore {
    provider: ProviderId,
    http: Arc<dyn HttpClient>,
    policy: ProviderPolicy,
    breaker: CircuitBreaker,
    gate: RateGate,
}

impl AdapterCore {
    pub(crate) fn new(provider: ProviderId, http: Arc<dyn HttpClient>, config: &ProviderConfig) -> Self {
        let policy = ProviderPolicy::default_for(provider)
            .with_rate_limit_per_minute(config.rate_limit_per_minute)
            .with_timeout_ms(config.timeout_ms);
        let gate = RateGate::from_policy(&policy);
        Self {
            provider,
            http,
            policy,
            breaker: CircuitBreaker::default(),
            gate,
        }
    }

    pub(crate) fn policy(&self) -> &ProviderPolicy {
        &self.policy
    }

    /// Executes one upstream call. Retries only rate-limited responses,
    /// exponential backoff bounded by the policy, honoring any retry-after
    /// hint; `Unauthorized` and `InvalidArgument` surface immediately.
    pub(crate) async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, ProviderError> {
        if !self.breaker.allow_request() {
            return Err(ProviderError::upstream_degraded(format!(
                "{} circuit breaker is open; skipping upstream call",
                self.provider
            ))
            .with_provider(self.provider));
        }

        let request = request.with_timeout_ms(self.policy.timeout.as_millis() as u64);
        let mut retries: u32 = 0;

        loop {
            if let Err(quota_delay) = self.gate.try_acquire() {
                retries += 1;
                match self.policy.retry_backoff.delay_for(retries) {
                    Some(backoff) => {
                        tokio::time::sleep(quota_delay.max(backoff)).await;
                        continue;
                    }
                    None => {
                        return Err(ProviderError::rate_limited(format!(
                            "{} quota exhausted; retry in {:.2}s",
                            self.provider,
                            quota_delay.as_secs_f64()
                        ))
                        .with_retry_after(quota_delay)
                        .with_provider(self.provider));
                    }
                }
            }

            match self.http.execute(request.clone()).await {
                Ok(response) if response.is_success() => {
                    self.breaker.record_success();
                    return Ok(response);
                }
                Ok(response) => match response.status {
                    401 | 403 => {
                        return Err(ProviderError::unauthorized(format!(
                            "{} rejected credentials (status {})",
                            self.provider, response.status
                        ))
                        .with_provider(self.provider));
                    }
                    404 => {
                        return Err(ProviderError::not_found(format!(
                            "{} returned status 404",
                            self.provider
                        ))
                        .with_provider(self.provider));
                    }
                    400 | 422 => {
                        return Err(ProviderError::invalid_argument(format!(
                            "{} rejected the request (status {})",
                            self.provider, response.status
                        ))
                        .with_provider(self.provider));
                    }
                    429 => {
                        retries += 1;
                        match self.policy.retry_backoff.delay_for(retries) {
                            Some(backoff) => {
                                tokio::time::sleep(response.retry_after.unwrap_or(backoff)).await;
                                continue;
                            }
                            None => {
                                let mut error = ProviderError::rate_limited(format!(
                                    "{} rate limit persisted across {} retries",
                                    self.provider, self.policy.retry_backoff.max_retries
                                ))
                                .with_provider(self.provider);
                                if let Some(hint) = response.retry_after {
                                    error = error.with_retry_after(hint);
                                }
                                return Err(error);
                            }
                        }
                    }
                    status => {
                        self.breaker.record_failure();
                        return Err(ProviderError::upstream_degraded(format!(
                            "{} upstream returned status {status}",
                            self.provider
                        ))
                        .with_provider(self.provider));
                    }
                },
                Err(error) => {
                    self.breaker.record_failure();
                    let provider_error = match error.kind() {
                        HttpErrorKind::Timeout => ProviderError::timeout(error.message().to_owned()),
                        HttpErrorKind::Connect | HttpErrorKind::Protocol => {
                            ProviderError::upstream_degraded(error.message().to_owned())
                        }
                    };
                    return Err(provider_error.with_provider(self.provider));
                }
            }
        }
    }
}

/// Clamps a provider-reported score into the canonical [0, 100] range.
pub(crate) fn clamp_confidence(raw: i64) -> u8 {
    raw.clamp(0, 100) as u8
}

#[cfg(test)]
pub(crate) mod testing {
    use std::future::Future;
    use std::pin::Pin;
    use std::sync::Mutex;

    use crate::providers::http_client::{HttpClient, HttpError, HttpRequest, HttpResponse};

    /// Records requests and replays a scripted sequence of responses; the
    /// last entry repeats once the script runs dry.
    pub(crate) struct ScriptedHttpClient {
        responses: Mutex<Vec<Result<HttpResponse, HttpError>>>,
        requests: Mutex<Vec<HttpRequest>>,
    }

    impl ScriptedHttpClient {
        pub(crate) fn new(responses: Vec<Result<HttpResponse, HttpError>>) -> Self {
            Self {
                responses: Mutex::new(responses),
                requests: Mutex::new(Vec::new()),
            }
        }

        pub(crate) fn ok(body: &str) -> Self {
            Self::new(vec![Ok(HttpResponse::ok_json(body))])
        }

        pub(crate) fn status(status: u16) -> Self {
            Self::new(vec![Ok(HttpResponse::with_status(status, "{}"))])
        }

        pub(crate) fn recorded_requests(&self) -> Vec<HttpRequest> {
            self.requests
                .lock()
                .expect("request store is not poisoned")
                .clone()
        }
    }

    impl HttpClient for ScriptedHttpClient {
        fn execute<'a>(
            &'a self,
            request: HttpRequest,
        ) -> Pin<Box<dyn Future<Output = Result<HttpResponse, HttpError>> + Send + 'a>> {
            self.requests
                .lock()
                .expect("request store is not poisoned")
                .push(request);

            let mut responses = self.responses.lock().expect("script is not poisoned");
            let response = if responses.len() > 1 {
                responses.remove(0)
            } else {
                responses[0].clone()
            };
            Box::pin(async move { response })
        }
    }
}
