use std::sync::Arc;

use serde::Deserialize;
use uuid::Uuid;

use crate::config::ProviderConfig;
use crate::provider::ProviderId;
use crate::providers::adapters::AdapterCore;
use crate::providers::contracts::{
    DynamicScrapeRequest, DynamicScraper, Metered, PageText, ProviderError, ProviderFuture,
};
use crate::providers::http_client::{HttpAuth, HttpClient, HttpRequest};

/// Firecrawl adapter covering `dynamic_scrape`: JavaScript-rendered pages
/// the static reader cannot see.
pub struct FirecrawlAdapter {
    core: AdapterCore,
    base_url: String,
    auth: HttpAuth,
}

impl FirecrawlAdapter {
    pub fn new(http: Arc<dyn HttpClient>, config: &ProviderConfig) -> Self {
        Self {
            core: AdapterCore::new(ProviderId::Firecrawl, http, config),
            base_url: config.api_base_url.trim_end_matches('/').to_owned(),
            auth: HttpAuth::BearerToken(config.credential.expose().to_owned()),
        }
    }
}

impl DynamicScraper for FirecrawlAdapter {
    fn scrape<'a>(&'a self, req: DynamicScrapeRequest) -> ProviderFuture<'a, PageText> {
        Box::pin(async move {
            let body = serde_json::json!({
                "url": req.url,
                "formats": ["markdown"],
            });
            let request = HttpRequest::post(format!("{}/v1/scrape", self.base_url))
                .with_auth(&self.auth)
                .with_json_body(&body);

            let response = self.core.execute(request).await?;
            let payload: ScrapePayload = serde_json::from_str(&response.body).map_err(|error| {
                ProviderError::upstream_degraded(format!(
                    "firecrawl returned unparseable JSON: {error}"
                ))
                .with_provider(ProviderId::Firecrawl)
            })?;

            let Some(markdown) = payload.data.and_then(|data| data.markdown) else {
                return Err(ProviderError::not_found(format!(
                    "firecrawl rendered no content for '{}'",
                    req.url
                ))
                .with_provider(ProviderId::Firecrawl));
            };

            let policy = self.core.policy();
            Ok(Metered::new(
                ProviderId::Firecrawl,
                PageText {
                    url: req.url,
                    text: markdown,
                },
            )
            .with_cost(policy.estimated_call_cost_usd, policy.credits_per_call)
            .with_trace_id(Uuid::new_v4().to_string()))
        })
    }
}

#[derive(Debug, Deserialize)]
struct ScrapePayload {
    #[serde(default)]
    data: Option<ScrapeData>,
}

#[derive(Debug, Deserialize)]
struct ScrapeData {
    #[serde(default)]
    markdown: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Credential;
    use crate::providers::adapters::testing::ScriptedHttpClient;

    fn config() -> ProviderConfig {
        ProviderConfig::new("https://api.firecrawl.dev", Credential::new("fc-key"))
            .with_rate_limit_per_minute(60)
    }

    #[tokio::test]
    async fn scrape_returns_rendered_markdown() {
        let http = Arc::new(ScriptedHttpClient::ok(
            r#"{"success": true, "data": {"markdown": "Bill Ranson\nHead Golf Professional"}}"#,
        ));
        let adapter = FirecrawlAdapter::new(Arc::clone(&http) as Arc<dyn HttpClient>, &config());

        let page = adapter
            .scrape(DynamicScrapeRequest::new("https://directory.pga.org/course/42").expect("valid"))
            .await
            .expect("scrape should succeed");

        assert!(page.data.text.contains("Head Golf Professional"));
        assert_eq!(page.credits_used, 1);

        let requests = http.recorded_requests();
        assert!(requests[0].url.ends_with("/v1/scrape"));
        assert!(requests[0].body.as_deref().unwrap().contains("markdown"));
    }

    #[tokio::test]
    async fn empty_render_is_not_found() {
        let http = Arc::new(ScriptedHttpClient::ok(r#"{"success": true, "data": {}}"#));
        let adapter = FirecrawlAdapter::new(http, &config());

        let error = adapter
            .scrape(DynamicScrapeRequest::new("https://directory.pga.org/course/42").expect("valid"))
            .await
            .expect_err("must fail");
        assert_eq!(
            error.kind(),
            crate::providers::contracts::ProviderErrorKind::NotFound
        );
    }
}
