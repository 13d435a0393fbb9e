use std::sync::Arc;

use uuid::Uuid;

use crate::config::ProviderConfig;
use crate::provider::ProviderId;
use crate::providers::adapters::AdapterCore;
use crate::providers::contracts::{Metered, PageReader, PageText, ProviderFuture, UrlReadRequest};
use crate::providers::http_client::{HttpAuth, HttpClient, HttpRequest};

/// Jina reader adapter covering `url_read`: static pages are fetched through
/// the reader proxy, which flattens markup into plain text.
pub struct JinaAdapter {
    core: AdapterCore,
    base_url: String,
    auth: HttpAuth,
}

impl JinaAdapter {
    pub fn new(http: Arc<dyn HttpClient>, config: &ProviderConfig) -> Self {
        let auth = if config.credential.is_empty() {
            HttpAuth::None
        } else {
            HttpAuth::BearerToken(config.credential.expose().to_owned())
        };
        Self {
            core: AdapterCore::new(ProviderId::Jina, http, config),
            base_url: config.api_base_url.trim_end_matches('/').to_owned(),
            auth,
        }
    }
}

impl PageReader for JinaAdapter {
    fn read<'a>(&'a self, req: UrlReadRequest) -> ProviderFuture<'a, PageText> {
        Box::pin(async move {
            let request =
                HttpRequest::get(format!("{}/{}", self.base_url, req.url)).with_auth(&self.auth);
            let response = self.core.execute(request).await?;

            Ok(Metered::new(
                ProviderId::Jina,
                PageText {
                    url: req.url,
                    text: response.body,
                },
            )
            .with_trace_id(Uuid::new_v4().to_string()))
        })
    }
}
