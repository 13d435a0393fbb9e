use std::sync::Arc;

use serde::Deserialize;
use uuid::Uuid;

use crate::config::ProviderConfig;
use crate::provider::ProviderId;
use crate::providers::adapters::{clamp_confidence, AdapterCore};
use crate::providers::contracts::{
    Deliverability, DomainSearchRequest, EmailProvider, EmailVerifyRequest, Mailbox, MailboxReport,
    Metered, ProviderError, ProviderFuture, VerificationReport,
};
use crate::providers::http_client::{HttpClient, HttpRequest};

/// Hunter.io adapter covering `email_finder` and `email_verify`.
pub struct HunterAdapter {
    core: AdapterCore,
    base_url: String,
    api_key: String,
}

impl HunterAdapter {
    pub fn new(http: Arc<dyn HttpClient>, config: &ProviderConfig) -> Self {
        Self {
            core: AdapterCore::new(ProviderId::Hunter, http, config),
            base_url: config.api_base_url.trim_end_matches('/').to_owned(),
            api_key: config.credential.expose().to_owned(),
        }
    }

    fn parse_payload<'de, T: Deserialize<'de>>(body: &'de str) -> Result<T, ProviderError> {
        serde_json::from_str(body).map_err(|error| {
            ProviderError::upstream_degraded(format!("hunter returned unparseable JSON: {error}"))
                .with_provider(ProviderId::Hunter)
        })
    }
}

impl EmailProvider for HunterAdapter {
    fn search_domain<'a>(&'a self, req: DomainSearchRequest) -> ProviderFuture<'a, MailboxReport> {
        Box::pin(async move {
            let url = format!(
                "{}/domain-search?domain={}&api_key={}",
                self.base_url,
                urlencoding::encode(&req.domain),
                self.api_key,
            );
            let response = self.core.execute(HttpRequest::get(url)).await?;
            let payload: DomainSearchPayload = Self::parse_payload(&response.body)?;

            let mailboxes = payload
                .data
                .emails
                .into_iter()
                .filter(|entry| !entry.value.trim().is_empty())
                .map(|entry| Mailbox {
                    email: entry.value,
                    first_name: entry.first_name,
                    last_name: entry.last_name,
                    title: entry.position,
                    confidence: clamp_confidence(entry.confidence.unwrap_or(0)),
                    source_url: entry.sources.into_iter().next().map(|s| s.uri),
                })
                .collect();

            let policy = self.core.policy();
            Ok(Metered::new(
                ProviderId::Hunter,
                MailboxReport {
                    mailboxes,
                    pattern: payload.data.pattern,
                },
            )
            .with_cost(policy.estimated_call_cost_usd, policy.credits_per_call)
            .with_trace_id(Uuid::new_v4().to_string()))
        })
    }

    fn verify<'a>(&'a self, req: EmailVerifyRequest) -> ProviderFuture<'a, VerificationReport> {
        Box::pin(async move {
            let url = format!(
                "{}/email-verifier?email={}&api_key={}",
                self.base_url,
                urlencoding::encode(&req.email),
                self.api_key,
            );
            let response = self.core.execute(HttpRequest::get(url)).await?;
            let payload: VerifierPayload = Self::parse_payload(&response.body)?;

            let status = match payload.data.status.as_deref() {
                Some("deliverable") => Deliverability::Deliverable,
                Some("risky") => Deliverability::Risky,
                Some("undeliverable") => Deliverability::Undeliverable,
                _ => Deliverability::Unknown,
            };

            let policy = self.core.policy();
            Ok(Metered::new(
                ProviderId::Hunter,
                VerificationReport {
                    status,
                    confidence: clamp_confidence(payload.data.score.unwrap_or(0)),
                },
            )
            .with_cost(policy.estimated_call_cost_usd, policy.credits_per_call)
            .with_trace_id(Uuid::new_v4().to_string()))
        })
    }
}

#[derive(Debug, Deserialize)]
struct DomainSearchPayload {
    data: DomainSearchData,
}

#[derive(Debug, Deserialize)]
struct DomainSearchData {
    #[serde(default)]
    pattern: Option<String>,
    #[serde(default)]
    emails: Vec<EmailEntry>,
}

#[derive(Debug, Deserialize)]
struct EmailEntry {
    value: String,
    #[serde(default)]
    first_name: Option<String>,
    #[serde(default)]
    last_name: Option<String>,
    #[serde(default)]
    position: Option<String>,
    #[serde(default)]
    confidence: Option<i64>,
    #[serde(default)]
    sources: Vec<EmailSource>,
}

#[derive(Debug, Deserialize)]
struct EmailSource {
    uri: String,
}

#[derive(Debug, Deserialize)]
struct VerifierPayload {
    data: VerifierData,
}

#[derive(Debug, Deserialize)]
struct VerifierData {
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    score: Option<i64>,
}
