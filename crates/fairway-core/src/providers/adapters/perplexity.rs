use std::sync::Arc;

use serde::Deserialize;
use uuid::Uuid;

use crate::config::ProviderConfig;
use crate::provider::ProviderId;
use crate::providers::adapters::AdapterCore;
use crate::providers::contracts::{
    LlmAnswer, LlmSearchRequest, Metered, ProviderError, ProviderFuture, SearchModel,
};
use crate::providers::http_client::{HttpAuth, HttpClient, HttpRequest};

/// Perplexity adapter covering `llm_search`: a search-capable model that
/// answers structured queries with citation URLs.
pub struct PerplexityAdapter {
    core: AdapterCore,
    base_url: String,
    auth: HttpAuth,
    model: String,
}

impl PerplexityAdapter {
    pub fn new(http: Arc<dyn HttpClient>, config: &ProviderConfig) -> Self {
        Self {
            core: AdapterCore::new(ProviderId::Perplexity, http, config),
            base_url: config.api_base_url.trim_end_matches('/').to_owned(),
            auth: HttpAuth::BearerToken(config.credential.expose().to_owned()),
            model: String::from("sonar"),
        }
    }
}

impl SearchModel for PerplexityAdapter {
    fn ask<'a>(&'a self, req: LlmSearchRequest) -> ProviderFuture<'a, LlmAnswer> {
        Box::pin(async move {
            let prompt = if req.require_citations {
                format!("{}\n\nCite the source URL for every claim.", req.prompt)
            } else {
                req.prompt.clone()
            };

            let body = serde_json::json!({
                "model": self.model,
                "messages": [{"role": "user", "content": prompt}],
            });
            let request = HttpRequest::post(format!("{}/chat/completions", self.base_url))
                .with_auth(&self.auth)
                .with_json_body(&body);

            let response = self.core.execute(request).await?;
            let payload: ChatPayload = serde_json::from_str(&response.body).map_err(|error| {
                ProviderError::upstream_degraded(format!(
                    "perplexity returned unparseable JSON: {error}"
                ))
                .with_provider(ProviderId::Perplexity)
            })?;

            let Some(choice) = payload.choices.into_iter().next() else {
                return Err(ProviderError::upstream_degraded(
                    "perplexity response carried no choices",
                )
                .with_provider(ProviderId::Perplexity));
            };

            let policy = self.core.policy();
            Ok(Metered::new(
                ProviderId::Perplexity,
                LlmAnswer {
                    text: choice.message.content,
                    citations: payload.citations,
                },
            )
            .with_cost(policy.estimated_call_cost_usd, policy.credits_per_call)
            .with_trace_id(payload.id.unwrap_or_else(|| Uuid::new_v4().to_string())))
        })
    }
}

#[derive(Debug, Deserialize)]
struct ChatPayload {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    choices: Vec<ChatChoice>,
    #[serde(default)]
    citations: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: String,
}
