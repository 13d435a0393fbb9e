use std::sync::Arc;

use serde::Deserialize;
use uuid::Uuid;

use crate::config::ProviderConfig;
use crate::provider::ProviderId;
use crate::providers::adapters::AdapterCore;
use crate::providers::contracts::{
    Employment, Metered, PeopleEnrichRequest, PeopleProvider, PeopleSearchBatch,
    PeopleSearchRequest, PersonMatch, PersonProfile, ProviderError, ProviderFuture,
};
use crate::providers::http_client::{HttpClient, HttpRequest};

/// Apollo.io adapter covering `people_search` and `people_enrich`.
///
/// The two-step flow mirrors the provider's billing: searching is free,
/// matching a person to unlock their mailbox burns credits.
pub struct ApolloAdapter {
    core: AdapterCore,
    base_url: String,
    api_key: String,
}

impl ApolloAdapter {
    pub fn new(http: Arc<dyn HttpClient>, config: &ProviderConfig) -> Self {
        Self {
            core: AdapterCore::new(ProviderId::Apollo, http, config),
            base_url: config.api_base_url.trim_end_matches('/').to_owned(),
            api_key: config.credential.expose().to_owned(),
        }
    }

    fn authed_post(&self, path: &str, body: &impl serde::Serialize) -> HttpRequest {
        HttpRequest::post(format!("{}{path}", self.base_url))
            .with_header("cache-control", "no-cache")
            .with_header("x-api-key", self.api_key.trim())
            .with_json_body(body)
    }

    fn parse_payload<'de, T: Deserialize<'de>>(body: &'de str) -> Result<T, ProviderError> {
        serde_json::from_str(body).map_err(|error| {
            ProviderError::upstream_degraded(format!("apollo returned unparseable JSON: {error}"))
                .with_provider(ProviderId::Apollo)
        })
    }
}

impl PeopleProvider for ApolloAdapter {
    fn search<'a>(&'a self, req: PeopleSearchRequest) -> ProviderFuture<'a, PeopleSearchBatch> {
        Box::pin(async move {
            let mut body = serde_json::json!({
                "q_organization_name": req.organization,
                "page": 1,
                "per_page": 5,
            });
            if !req.titles.is_empty() {
                body["person_titles"] = serde_json::json!(req.titles);
            }
            if let Some(domain) = &req.domain {
                body["q_organization_domains"] = serde_json::json!([domain]);
            }

            let request = self.authed_post("/people/search", &body);
            let response = self.core.execute(request).await?;
            let payload: SearchPayload = Self::parse_payload(&response.body)?;

            let people = payload
                .people
                .into_iter()
                .filter(|person| !person.id.trim().is_empty() && !person.name.trim().is_empty())
                .map(|person| PersonMatch {
                    person_id: person.id,
                    name: person.name,
                    title: person.title,
                    organization_name: person.organization.as_ref().and_then(|o| o.name.clone()),
                    organization_domain: person
                        .organization
                        .as_ref()
                        .and_then(|o| o.primary_domain.clone()),
                    email_status: person.email_status,
                    linkedin_url: person.linkedin_url,
                })
                .collect();

            // Searching does not unlock mailboxes, so no credits are burned.
            Ok(Metered::new(ProviderId::Apollo, PeopleSearchBatch { people })
                .with_trace_id(Uuid::new_v4().to_string()))
        })
    }

    fn enrich<'a>(&'a self, req: PeopleEnrichRequest) -> ProviderFuture<'a, PersonProfile> {
        Box::pin(async move {
            let body = serde_json::json!({
                "id": req.person_id,
                "reveal_personal_emails": false,
                "reveal_phone_number": false,
            });

            let request = self.authed_post("/people/match", &body);
            let response = self.core.execute(request).await?;
            let payload: MatchPayload = Self::parse_payload(&response.body)?;

            let Some(person) = payload.person else {
                return Err(ProviderError::not_found(format!(
                    "apollo has no profile for person '{}'",
                    req.person_id
                ))
                .with_provider(ProviderId::Apollo));
            };

            let email_confidence = match person.email_status.as_deref() {
                Some("verified") => Some(95),
                Some(_) => Some(70),
                None => None,
            };

            let employment_history = person
                .employment_history
                .into_iter()
                .filter(|job| !job.organization_name.trim().is_empty())
                .map(|job| Employment {
                    organization_name: job.organization_name,
                    title: job.title,
                    start_date: job.start_date,
                    end_date: job.end_date,
                    current: job.current,
                })
                .collect();

            let policy = self.core.policy();
            Ok(Metered::new(
                ProviderId::Apollo,
                PersonProfile {
                    name: person.name,
                    title: person.title,
                    email: person.email,
                    email_status: person.email_status,
                    email_confidence,
                    linkedin_url: person.linkedin_url,
                    employment_history,
                    profile_url: None,
                },
            )
            .with_cost(policy.estimated_call_cost_usd, policy.credits_per_call)
            .with_trace_id(Uuid::new_v4().to_string()))
        })
    }
}

#[derive(Debug, Deserialize)]
struct SearchPayload {
    #[serde(default)]
    people: Vec<SearchPerson>,
}

#[derive(Debug, Deserialize)]
struct SearchPerson {
    #[serde(default)]
    id: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    email_status: Option<String>,
    #[serde(default)]
    linkedin_url: Option<String>,
    #[serde(default)]
    organization: Option<SearchOrganization>,
}

#[derive(Debug, Deserialize)]
struct SearchOrganization {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    primary_domain: Option<String>,
}

#[derive(Debug, Deserialize)]
struct MatchPayload {
    #[serde(default)]
    person: Option<MatchPerson>,
}

#[derive(Debug, Deserialize)]
struct MatchPerson {
    #[serde(default)]
    name: String,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    email_status: Option<String>,
    #[serde(default)]
    linkedin_url: Option<String>,
    #[serde(default)]
    employment_history: Vec<MatchEmployment>,
}

#[derive(Debug, Deserialize)]
struct MatchEmployment {
    #[serde(default)]
    organization_name: String,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    start_date: Option<String>,
    #[serde(default)]
    end_date: Option<String>,
    #[serde(default)]
    current: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Credential;
    use crate::providers::adapters::testing::ScriptedHttpClient;

    fn config() -> ProviderConfig {
        ProviderConfig::new("https://api.apollo.io/api/v1", Credential::new("apollo-key"))
            .with_rate_limit_per_minute(60)
    }

    const SEARCH_BODY: &str = r#"{
        "people": [
            {
                "id": "p-1001",
                "name": "Stacy Foster",
                "title": "General Manager",
                "email_status": "verified",
                "linkedin_url": "https://www.linkedin.com/in/stacy-foster",
                "organization": {
                    "name": "Richmond Country Club",
                    "primary_domain": "richmondcountryclubva.com"
                }
            },
            {"id": "", "name": "Dropped Row"}
        ]
    }"#;

    const MATCH_BODY: &str = r#"{
        "person": {
            "name": "Stacy Foster",
            "title": "General Manager",
            "email": "sfoster@richmondcountryclubva.com",
            "email_status": "verified",
            "linkedin_url": "https://www.linkedin.com/in/stacy-foster",
            "employment_history": [
                {
                    "organization_name": "Richmond Country Club",
                    "title": "General Manager",
                    "start_date": "2018-03-01",
                    "current": true
                },
                {
                    "organization_name": "Hermitage Country Club",
                    "title": "Club Manager",
                    "start_date": "2012-01-01",
                    "end_date": "2018-02-01",
                    "current": false
                }
            ]
        }
    }"#;

    #[tokio::test]
    async fn search_sends_api_key_header_and_filters_blank_rows() {
        let http = Arc::new(ScriptedHttpClient::ok(SEARCH_BODY));
        let adapter = ApolloAdapter::new(Arc::clone(&http) as Arc<dyn HttpClient>, &config());

        let batch = adapter
            .search(
                PeopleSearchRequest::new(
                    "Richmond Country Club",
                    Some(String::from("richmondcountryclubva.com")),
                    vec![String::from("General Manager")],
                )
                .expect("valid request"),
            )
            .await
            .expect("search should succeed");

        assert_eq!(batch.data.people.len(), 1);
        assert_eq!(batch.credits_used, 0);

        let requests = http.recorded_requests();
        assert_eq!(
            requests[0].headers.get("x-api-key").map(String::as_str),
            Some("apollo-key")
        );
        assert!(requests[0].body.as_deref().unwrap().contains("person_titles"));
    }

    #[tokio::test]
    async fn enrich_scores_verified_emails_and_burns_credits() {
        let http = Arc::new(ScriptedHttpClient::ok(MATCH_BODY));
        let adapter = ApolloAdapter::new(http, &config());

        let profile = adapter
            .enrich(PeopleEnrichRequest::new("p-1001").expect("valid request"))
            .await
            .expect("enrich should succeed");

        assert_eq!(profile.data.email_confidence, Some(95));
        assert_eq!(profile.data.employment_history.len(), 2);
        assert!(profile.data.employment_history[0].current);
        assert_eq!(profile.credits_used, 2);
    }

    #[tokio::test]
    async fn enrich_without_a_person_is_not_found() {
        let http = Arc::new(ScriptedHttpClient::ok(r#"{"person": null}"#));
        let adapter = ApolloAdapter::new(http, &config());

        let error = adapter
            .enrich(PeopleEnrichRequest::new("p-missing").expect("valid request"))
            .await
            .expect_err("must fail");
        assert_eq!(
            error.kind(),
            crate::providers::contracts::ProviderErrorKind::NotFound
        );
    }
}
