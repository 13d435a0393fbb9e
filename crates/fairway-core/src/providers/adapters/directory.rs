use std::sync::Arc;

use regex::Regex;
use uuid::Uuid;

use crate::config::ProviderConfig;
use crate::provider::ProviderId;
use crate::providers::adapters::AdapterCore;
use crate::providers::contracts::{
    CourseListing, DirectoryProvider, DirectoryQuery, Metered, ProviderError, ProviderFuture,
};
use crate::providers::http_client::{HttpClient, HttpRequest};
use crate::providers::page_heuristics;

/// URL fragments that mark a listing as a JavaScript application the static
/// fetch cannot extract staff from.
const DYNAMIC_HOSTS: [&str; 2] = ["directory.pga.org", "#!/"];

/// State golf association directory adapter covering `directory_search`.
///
/// Two fetches: the search page locates the course listing, the listing page
/// yields website, phone, and staff from static markup.
pub struct DirectoryAdapter {
    core: AdapterCore,
    base_url: String,
}

impl DirectoryAdapter {
    pub fn new(http: Arc<dyn HttpClient>, config: &ProviderConfig) -> Self {
        Self {
            core: AdapterCore::new(ProviderId::Directory, http, config),
            base_url: config.api_base_url.trim_end_matches('/').to_owned(),
        }
    }

    fn host(&self) -> &str {
        self.base_url
            .trim_start_matches("https://")
            .trim_start_matches("http://")
    }

    fn listing_link(&self, search_markup: &str) -> Option<String> {
        let pattern =
            Regex::new(r#"(?:https?://[^\s"'<>]+)?/courselisting/\d+[^\s"'<>]*"#)
                .expect("static regex is valid");
        let raw = pattern.find(search_markup)?.as_str();
        if raw.starts_with("http") {
            Some(raw.to_owned())
        } else {
            Some(format!("{}{raw}", self.base_url))
        }
    }
}

impl DirectoryProvider for DirectoryAdapter {
    fn find_course<'a>(&'a self, req: DirectoryQuery) -> ProviderFuture<'a, CourseListing> {
        Box::pin(async move {
            let search_url = format!(
                "{}/courses?search={}&state={}",
                self.base_url,
                urlencoding::encode(&req.course_name),
                urlencoding::encode(&req.region_code),
            );
            let search_page = self.core.execute(HttpRequest::get(search_url)).await?;

            let Some(listing_url) = self.listing_link(&search_page.body) else {
                return Err(ProviderError::not_found(format!(
                    "no directory listing for '{}' in {}",
                    req.course_name, req.region_code
                ))
                .with_provider(ProviderId::Directory));
            };

            if DYNAMIC_HOSTS
                .iter()
                .any(|fragment| listing_url.contains(fragment))
            {
                return Ok(Metered::new(
                    ProviderId::Directory,
                    CourseListing {
                        listing_url,
                        course_name: None,
                        website: None,
                        phone: None,
                        staff: Vec::new(),
                        needs_dynamic_render: true,
                    },
                )
                .with_trace_id(Uuid::new_v4().to_string()));
            }

            let listing_page = self
                .core
                .execute(HttpRequest::get(listing_url.clone()))
                .await?;
            let markup = listing_page.body;

            Ok(Metered::new(
                ProviderId::Directory,
                CourseListing {
                    listing_url,
                    course_name: Some(req.course_name),
                    website: page_heuristics::find_website(&markup, Some(self.host())),
                    phone: page_heuristics::find_phone(&markup),
                    staff: page_heuristics::extract_staff(&markup),
                    needs_dynamic_render: false,
                },
            )
            .with_trace_id(Uuid::new_v4().to_string()))
        })
    }
}
