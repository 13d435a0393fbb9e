//! Course-level research stage.
//!
//! Independent of the cascade: a citation-required query to the search
//! model yields the five-section research artifact. Malformed output gets
//! exactly one repair attempt before the course is failed.

use thiserror::Error;
use tracing::debug;

use crate::artifact::{extract_json_object, ResearchArtifact};
use crate::budget::BudgetMeter;
use crate::deadline::Deadline;
use crate::provider::ProviderId;
use crate::providers::contracts::{LlmSearchRequest, ProviderError, ProviderSet};
use crate::providers::policy::ProviderPolicy;

#[derive(Debug, Error)]
pub enum IntelligenceError {
    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error("budget exhausted before research could run")]
    Budget,

    #[error("research output stayed malformed after one repair attempt: {reason}")]
    Malformed { reason: String },
}

pub struct IntelligenceStage<'a> {
    providers: &'a ProviderSet,
}

impl<'a> IntelligenceStage<'a> {
    pub fn new(providers: &'a ProviderSet) -> Self {
        Self { providers }
    }

    pub async fn research(
        &self,
        course_name: &str,
        region_code: &str,
        website: Option<&str>,
        meter: &BudgetMeter,
        deadline: &Deadline,
    ) -> Result<ResearchArtifact, IntelligenceError> {
        let Some(search) = &self.providers.search else {
            return Err(IntelligenceError::Provider(ProviderError::unauthorized(
                "no search model configured for course research",
            )));
        };

        let estimate = ProviderPolicy::perplexity_default().estimated_call_cost_usd;
        if meter.would_exceed(ProviderId::Perplexity, estimate) {
            return Err(IntelligenceError::Budget);
        }

        let prompt = research_prompt(course_name, region_code, website);
        let answer = deadline
            .cap(search.ask(LlmSearchRequest::new(prompt, true)?))
            .await?;
        meter.record(&answer);

        match parse_artifact(&answer.data.text) {
            Ok(artifact) => Ok(artifact),
            Err(reason) => {
                debug!(%reason, "research output malformed; attempting one repair");

                if meter.would_exceed(ProviderId::Perplexity, estimate) {
                    return Err(IntelligenceError::Budget);
                }

                let repair = format!(
                    "Your previous response was not valid research JSON ({reason}). \
Return ONLY the corrected JSON object with keys section1 through section5, \
for {course_name} in {region_code}. No prose, no markdown fences.",
                );
                let retry = deadline
                    .cap(search.ask(LlmSearchRequest::new(repair, true)?))
                    .await?;
                meter.record(&retry);

                parse_artifact(&retry.data.text)
                    .map_err(|reason| IntelligenceError::Malformed { reason })
            }
        }
    }
}

fn parse_artifact(text: &str) -> Result<ResearchArtifact, String> {
    let Some(value) = extract_json_object(text) else {
        return Err(String::from("no JSON object in response"));
    };
    serde_json::from_value(value).map_err(|error| error.to_string())
}

fn research_prompt(course_name: &str, region_code: &str, website: Option<&str>) -> String {
    let website_line = website
        .map(|url| format!("Known website: {url}\n"))
        .unwrap_or_default();

    format!(
        "Research the golf course \"{course_name}\" in {region_code}. {website_line}\
Return ONLY a JSON object with five keys:\n\
section1: {{\"tier\": \"Premium\"|\"Mid\"|\"Budget\", \"tier_confidence\": 0.0-1.0, \
\"pricing_evidence\": [{{\"claim\", \"source\"}}]}}\n\
section2: {{\"has_water_hazards\": bool, \"hazard_count\": 0-18, \"hazard_details\": str, \"source\": url}}\n\
section3: {{\"estimated_annual_rounds\": int|null, \"volume_range\": \"22k-32k\", \
\"estimation_basis\": [{{\"claim\", \"source\"}}], \"confidence\": 0.0-1.0}}\n\
section4: {{\"contacts\": [{{\"name\", \"title\", \"work_email\"?, \"linkedin_url\"?, \"phone\"?, \
\"employment_verified\": bool, \"sources\": [url]}}]}}\n\
section5: {{\"ownership\": {{\"type\", \"entity_name\", \"source\"}}, \"recent_changes\": [], \
\"current_vendors\": [], \"selling_points\": []}}\n\
Every factual claim needs a source URL. Use null for unknown values."
    )
}
