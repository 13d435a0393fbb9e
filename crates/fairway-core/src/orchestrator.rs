//! Per-course pipeline driver.
//!
//! One call runs: status transition, intelligence stage, discovery cascade,
//! validation, contact merging, and the transactional write, under a shared
//! budget meter and wall-clock deadline. The result is always a summary:
//! `completed` (possibly flagged) or `failed` with one categorical reason.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::budget::{BudgetConfig, BudgetMeter};
use crate::cascade::{Cascade, CascadeInput, CascadeOutcome, CascadeTermination};
use crate::config::EnrichmentConfig;
use crate::deadline::Deadline;
use crate::domain::{
    Candidate, Contact, Course, DiscoveryStage, EnrichmentStatus, FailureReason, UtcTimestamp,
    ValidationFlag, ROLE_KEYWORDS,
};
use crate::intelligence::{IntelligenceError, IntelligenceStage};
use crate::provider::ProviderId;
use crate::providers::contracts::{ProviderErrorKind, ProviderSet};
use crate::validator::{validate, ValidatedContact};
use crate::writer::{CourseWriter, WriterError};
use crate::DomainError;

/// One course to enrich.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnrichmentRequest {
    pub course_name: String,
    pub region_code: String,
    pub website: Option<String>,
}

impl EnrichmentRequest {
    pub fn new(
        course_name: impl Into<String>,
        region_code: impl Into<String>,
        website: Option<String>,
    ) -> Result<Self, DomainError> {
        let course_name = course_name.into();
        let region_code = region_code.into();
        if course_name.trim().is_empty() {
            return Err(DomainError::EmptyCourseName);
        }
        if region_code.trim().is_empty() {
            return Err(DomainError::EmptyRegionCode);
        }
        Ok(Self {
            course_name,
            region_code,
            website,
        })
    }
}

/// Outcome handed back to the service layer.
#[derive(Debug, Clone, Serialize)]
pub struct EnrichmentSummary {
    pub course_id: Option<Uuid>,
    pub course_name: String,
    pub region_code: String,
    pub status: EnrichmentStatus,
    pub failure_reason: Option<FailureReason>,
    pub contacts_written: usize,
    pub validation_flags: Vec<ValidationFlag>,
    pub total_cost_usd: f64,
    pub provider_credits: BTreeMap<ProviderId, u32>,
    pub cascade_termination: Option<CascadeTermination>,
    pub duration_ms: u64,
}

pub struct Orchestrator {
    providers: ProviderSet,
    writer: Arc<dyn CourseWriter>,
    config: EnrichmentConfig,
}

impl Orchestrator {
    pub fn new(
        providers: ProviderSet,
        writer: Arc<dyn CourseWriter>,
        config: EnrichmentConfig,
    ) -> Self {
        Self {
            providers,
            writer,
            config,
        }
    }

    pub async fn enrich_course(&self, request: EnrichmentRequest) -> EnrichmentSummary {
        let run_started = Instant::now();
        let started_at = UtcTimestamp::now();
        let deadline = Deadline::after(self.config.course_deadline);
        let meter = BudgetMeter::new(self.effective_budget());

        info!(
            course = %request.course_name,
            region = %request.region_code,
            "enrichment started"
        );

        if let Err(error) = self
            .writer
            .mark_in_progress(&request.course_name, &request.region_code, started_at)
            .await
        {
            warn!(error = %error, "could not mark course in progress");
            return self.summary_failed(
                &request,
                FailureReason::WriterUnavailable,
                &meter,
                None,
                run_started,
            );
        }

        let intelligence = IntelligenceStage::new(&self.providers);
        let artifact = intelligence
            .research(
                &request.course_name,
                &request.region_code,
                request.website.as_deref(),
                &meter,
                &deadline,
            )
            .await;

        let cascade_input = CascadeInput {
            course_name: request.course_name.clone(),
            region_code: request.region_code.clone(),
            website: request.website.clone(),
        };
        let cascade = Cascade::new(&self.providers, &self.config.cascade);
        let discovery = cascade.run(&cascade_input, &meter, &deadline).await;

        info!(
            termination = ?discovery.termination,
            candidates = discovery.candidates.len(),
            "cascade finished"
        );

        let artifact = match artifact {
            Ok(artifact) => artifact,
            Err(error) => {
                let reason = self.no_artifact_reason(&error, &discovery, &deadline);
                return self
                    .fail(&request, reason, &error.to_string(), &meter, &discovery, run_started)
                    .await;
            }
        };

        let validated = match validate(&artifact) {
            Ok(validated) => validated,
            Err(error) => {
                return self
                    .fail(
                        &request,
                        FailureReason::ValidationFailed,
                        &error.to_string(),
                        &meter,
                        &discovery,
                        run_started,
                    )
                    .await;
            }
        };

        // Assemble the final row set.
        let mut course = match Course::begin(
            request.course_name.clone(),
            request.region_code.clone(),
            started_at,
        ) {
            Ok(course) => course,
            Err(error) => {
                return self
                    .fail(
                        &request,
                        FailureReason::ValidationFailed,
                        &error.to_string(),
                        &meter,
                        &discovery,
                        run_started,
                    )
                    .await;
            }
        };

        let merged = merge_with_artifact(discovery.candidates.clone(), &validated.contacts);
        let contacts: Vec<Contact> = merged
            .into_iter()
            .map(|candidate| candidate.into_contact(course.id))
            .filter(|contact| contact.validate().is_ok())
            .collect();

        let mut flags = validated.flags.clone();
        flags.retain(|flag| {
            !matches!(
                flag,
                ValidationFlag::NoContactsFound | ValidationFlag::NoContactMethods
            )
        });
        if contacts.is_empty() {
            flags.push(ValidationFlag::NoContactsFound);
        } else if !contacts
            .iter()
            .any(|c| c.email.is_some() || c.linkedin_url.is_some())
        {
            flags.push(ValidationFlag::NoContactMethods);
        }

        course.website = discovery.website.clone().or(request.website.clone());
        course.phone = discovery.phone.clone();
        course.contacts_page_url = discovery.listing_url.clone();
        course.tier = Some(validated.tier.tier);
        course.tier_confidence = validated.tier.confidence;
        course.tier_evidence = validated.tier.evidence;
        course.hazard_count = validated.hazards.count;
        course.hazard_rating = validated.hazards.rating;
        course.hazard_source = validated.hazards.source;
        course.hazard_confidence = validated.hazards.confidence;
        course.annual_rounds_estimate = validated.volume.estimate;
        course.annual_rounds_range = validated.volume.range;
        course.annual_rounds_confidence = validated.volume.confidence;
        course.intelligence = validated.intelligence;
        course.validation_flags = flags.clone();
        course.enrichment_status = EnrichmentStatus::Completed;
        course.completed_at = Some(UtcTimestamp::now());

        let snapshot = meter.snapshot();
        course.agent_cost_usd = snapshot.spent_usd;
        course.provider_credits = snapshot.credits.clone();

        // One conflict retry with a fresh attempt, then fail the course.
        let written = match self.writer.upsert_course_and_contacts(&course, &contacts).await {
            Ok(course_id) => Ok(course_id),
            Err(WriterError::Conflict(first)) => {
                warn!(conflict = %first, "writer conflict; retrying once");
                self.writer.upsert_course_and_contacts(&course, &contacts).await
            }
            Err(other) => Err(other),
        };

        match written {
            Ok(course_id) => {
                info!(
                    course_id = %course_id,
                    contacts = contacts.len(),
                    cost_usd = snapshot.spent_usd,
                    "enrichment completed"
                );
                EnrichmentSummary {
                    course_id: Some(course_id),
                    course_name: request.course_name,
                    region_code: request.region_code,
                    status: EnrichmentStatus::Completed,
                    failure_reason: None,
                    contacts_written: contacts.len(),
                    validation_flags: flags,
                    total_cost_usd: snapshot.spent_usd,
                    provider_credits: snapshot.credits,
                    cascade_termination: Some(discovery.termination),
                    duration_ms: run_started.elapsed().as_millis() as u64,
                }
            }
            Err(WriterError::Conflict(message)) => {
                self.fail(
                    &request,
                    FailureReason::WriterConflict,
                    &message,
                    &meter,
                    &discovery,
                    run_started,
                )
                .await
            }
            Err(error) => {
                self.fail(
                    &request,
                    FailureReason::WriterUnavailable,
                    &error.to_string(),
                    &meter,
                    &discovery,
                    run_started,
                )
                .await
            }
        }
    }

    /// Per-provider monthly credit caps flow into the budget meter.
    fn effective_budget(&self) -> BudgetConfig {
        let mut budget = self.config.budget.clone();
        let caps = [
            (ProviderId::Apollo, &self.config.apollo),
            (ProviderId::Hunter, &self.config.hunter),
            (ProviderId::Firecrawl, &self.config.firecrawl),
            (ProviderId::Jina, &self.config.jina),
            (ProviderId::Perplexity, &self.config.perplexity),
            (ProviderId::Directory, &self.config.directory),
        ];
        for (provider, config) in caps {
            if let Some(cap) = config.as_ref().and_then(|c| c.hard_monthly_credit_cap) {
                budget.credit_caps.entry(provider).or_insert(cap);
            }
        }
        budget
    }

    fn no_artifact_reason(
        &self,
        error: &IntelligenceError,
        discovery: &CascadeOutcome,
        deadline: &Deadline,
    ) -> FailureReason {
        match error {
            IntelligenceError::Budget => FailureReason::BudgetExhausted,
            IntelligenceError::Malformed { .. } => FailureReason::ValidationFailed,
            IntelligenceError::Provider(provider_error) => {
                if provider_error.kind() == ProviderErrorKind::Unauthorized
                    && discovery.providers_unavailable()
                {
                    FailureReason::NoProvidersAvailable
                } else if provider_error.kind() == ProviderErrorKind::Timeout
                    && deadline.expired()
                {
                    FailureReason::DeadlineExceeded
                } else {
                    FailureReason::ValidationFailed
                }
            }
        }
    }

    async fn fail(
        &self,
        request: &EnrichmentRequest,
        reason: FailureReason,
        error: &str,
        meter: &BudgetMeter,
        discovery: &CascadeOutcome,
        run_started: Instant,
    ) -> EnrichmentSummary {
        warn!(
            course = %request.course_name,
            reason = reason.as_str(),
            error,
            "enrichment failed"
        );

        let snapshot = meter.snapshot();
        if let Err(write_error) = self
            .writer
            .mark_failed(
                &request.course_name,
                &request.region_code,
                reason.as_str(),
                error,
                snapshot.spent_usd,
            )
            .await
        {
            warn!(error = %write_error, "could not persist failure diagnostics");
        }

        let mut summary = self.summary_failed(request, reason, meter, Some(discovery), run_started);
        summary.duration_ms = run_started.elapsed().as_millis() as u64;
        summary
    }

    fn summary_failed(
        &self,
        request: &EnrichmentRequest,
        reason: FailureReason,
        meter: &BudgetMeter,
        discovery: Option<&CascadeOutcome>,
        run_started: Instant,
    ) -> EnrichmentSummary {
        let snapshot = meter.snapshot();
        EnrichmentSummary {
            course_id: None,
            course_name: request.course_name.clone(),
            region_code: request.region_code.clone(),
            status: EnrichmentStatus::Failed,
            failure_reason: Some(reason),
            contacts_written: 0,
            validation_flags: Vec::new(),
            total_cost_usd: snapshot.spent_usd,
            provider_credits: snapshot.credits,
            cascade_termination: discovery.map(|d| d.termination),
            duration_ms: run_started.elapsed().as_millis() as u64,
        }
    }
}

/// Folds Section-4 contacts into the cascade's candidates. The cascade is
/// authoritative for contact fields when both name the same person; the
/// artifact fills gaps and contributes people the cascade never saw.
fn merge_with_artifact(
    mut candidates: Vec<Candidate>,
    artifact_contacts: &[ValidatedContact],
) -> Vec<Candidate> {
    for contact in artifact_contacts {
        let incoming = artifact_candidate(contact);
        let key = incoming.merge_key();

        match candidates.iter_mut().find(|c| c.merge_key() == key) {
            Some(existing) => {
                if existing.email.is_none() {
                    existing.email = incoming.email.clone();
                    existing.email_confidence = incoming.email_confidence;
                    existing.email_source = incoming.email_source.clone();
                }
                if existing.linkedin_url.is_none() {
                    existing.linkedin_url = incoming.linkedin_url.clone();
                }
                if existing.phone.is_none() {
                    existing.phone = incoming.phone.clone();
                    existing.phone_source = incoming.phone_source.clone();
                }
                existing.employment_verified =
                    existing.employment_verified || incoming.employment_verified;
                for source in &incoming.sources {
                    existing.push_source(source.clone());
                }
                // A bare role keyword loses to the artifact's more specific
                // title for the same person.
                if is_bare_role_keyword(&existing.title)
                    && incoming.title.len() > existing.title.len()
                {
                    existing.title = incoming.title.clone();
                }
            }
            None => candidates.push(incoming),
        }
    }

    candidates
}

fn artifact_candidate(contact: &ValidatedContact) -> Candidate {
    let mut candidate = Candidate::new(
        contact.name.clone(),
        contact.title.clone(),
        DiscoveryStage::Artifact,
    );
    // Schema-validated research emails carry sourced provenance; they enter
    // at the persistence floor and lose to any higher-scored cascade find.
    if contact.email.is_some() && !contact.sources.is_empty() {
        candidate.email = contact.email.clone();
        candidate.email_confidence = Some(90);
        candidate.email_source = Some(String::from("research_artifact"));
    }
    candidate.linkedin_url = contact.linkedin_url.clone();
    candidate.phone = contact.phone.clone();
    if candidate.phone.is_some() {
        candidate.phone_source = contact.sources.first().cloned();
    }
    candidate.employment_verified = contact.employment_verified;
    for source in &contact.sources {
        candidate.push_source(source.clone());
    }
    candidate
}

fn is_bare_role_keyword(title: &str) -> bool {
    let trimmed = title.trim();
    ROLE_KEYWORDS
        .iter()
        .any(|keyword| keyword.eq_ignore_ascii_case(trimmed))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn artifact_contact(name: &str, title: &str) -> ValidatedContact {
        ValidatedContact {
            name: name.to_owned(),
            title: title.to_owned(),
            email: None,
            linkedin_url: None,
            phone: None,
            employment_verified: false,
            sources: vec![String::from("https://club.test/staff")],
        }
    }

    #[test]
    fn artifact_contacts_augment_but_never_override_cascade_fields() {
        let mut cascade_candidate =
            Candidate::new("Stacy Foster", "General Manager", DiscoveryStage::EmailFinder)
                .with_source("https://hunter.io/club.test");
        cascade_candidate.email = Some(String::from("sfoster@club.test"));
        cascade_candidate.email_confidence = Some(95);

        let mut from_artifact = artifact_contact("Stacy Foster", "General Manager");
        from_artifact.email = Some(String::from("stacy@club.test"));
        from_artifact.linkedin_url = Some(String::from("https://www.linkedin.com/in/stacy-foster"));

        let merged = merge_with_artifact(vec![cascade_candidate], &[from_artifact]);

        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].email.as_deref(), Some("sfoster@club.test"));
        assert_eq!(merged[0].email_confidence, Some(95));
        assert_eq!(
            merged[0].linkedin_url.as_deref(),
            Some("https://www.linkedin.com/in/stacy-foster")
        );
        assert_eq!(merged[0].sources.len(), 2);
    }

    #[test]
    fn more_specific_artifact_title_replaces_a_bare_role_keyword() {
        let cascade_candidate =
            Candidate::new("Dean Sumner", "Director of Golf", DiscoveryStage::Directory)
                .with_source("https://vsga.org/courselisting/1");
        let from_artifact =
            artifact_contact("Dean Sumner", "Director of Golf and Grounds Operations");

        let merged = merge_with_artifact(vec![cascade_candidate], &[from_artifact]);
        assert_eq!(merged[0].title, "Director of Golf and Grounds Operations");
    }

    #[test]
    fn artifact_only_people_are_added_with_artifact_provenance() {
        let merged = merge_with_artifact(Vec::new(), &[artifact_contact("Peter Miller", "Owner")]);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].stage_of_origin, DiscoveryStage::Artifact);
    }

    #[test]
    fn unsourced_artifact_emails_never_enter_the_merge() {
        let mut contact = artifact_contact("Peter Miller", "Owner");
        contact.sources.clear();
        contact.email = Some(String::from("pmiller@club.test"));

        let merged = merge_with_artifact(Vec::new(), &[contact]);
        assert!(merged[0].email.is_none());
    }

    #[test]
    fn request_validation_rejects_blank_fields() {
        assert!(EnrichmentRequest::new(" ", "VA", None).is_err());
        assert!(EnrichmentRequest::new("Richmond Country Club", "", None).is_err());
    }
}
