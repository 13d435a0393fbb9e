//! Contact-discovery cascade.
//!
//! An ordered pipeline of strategies produces candidate contacts for one
//! course. Stages may be skipped, contribute new candidates, or enrich
//! existing ones; the run stops early once the sufficiency predicate holds,
//! the budget meter refuses the next stage, or the deadline expires.

pub mod merge;

use std::collections::HashSet;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::budget::BudgetMeter;
use crate::config::CascadeConfig;
use crate::deadline::Deadline;
use crate::domain::{
    normalize_name, years_since, Candidate, DiscoveryStage, ProvisionalEmail,
};
use crate::provider::ProviderId;
use crate::providers::contracts::{
    Deliverability, DirectoryQuery, DomainSearchRequest, DynamicScrapeRequest, EmailVerifyRequest,
    LlmSearchRequest, Mailbox, PeopleEnrichRequest, PeopleSearchRequest, ProviderError,
    ProviderErrorKind, ProviderSet, UrlReadRequest,
};
use crate::providers::page_heuristics;
use crate::providers::policy::ProviderPolicy;

use merge::merge_candidates;

/// Cascade position. Stages run in declaration order; `Done` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CascadeStage {
    Init,
    Directory,
    PeopleSearch,
    EmailFinder,
    WebRead,
    LlmSearch,
    Pattern,
    Done,
}

impl CascadeStage {
    const ORDER: [Self; 6] = [
        Self::Directory,
        Self::PeopleSearch,
        Self::EmailFinder,
        Self::WebRead,
        Self::LlmSearch,
        Self::Pattern,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Init => "init",
            Self::Directory => "directory",
            Self::PeopleSearch => "people_search",
            Self::EmailFinder => "email_finder",
            Self::WebRead => "web_read",
            Self::LlmSearch => "llm_search",
            Self::Pattern => "pattern",
            Self::Done => "done",
        }
    }

    const fn provider(self) -> Option<ProviderId> {
        match self {
            Self::Directory => Some(ProviderId::Directory),
            Self::PeopleSearch => Some(ProviderId::Apollo),
            Self::EmailFinder | Self::Pattern => Some(ProviderId::Hunter),
            Self::WebRead => Some(ProviderId::Jina),
            Self::LlmSearch => Some(ProviderId::Perplexity),
            Self::Init | Self::Done => None,
        }
    }

    /// Enhancement stages suppressed past the soft budget ceiling.
    const fn optional(self) -> bool {
        matches!(self, Self::LlmSearch | Self::Pattern)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum StageOutcome {
    Completed { candidates_added: usize },
    Skipped { reason: String },
    Failed { code: String },
    Disabled { code: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageReport {
    pub stage: CascadeStage,
    #[serde(flatten)]
    pub outcome: StageOutcome,
    pub duration_ms: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CascadeTermination {
    Sufficient,
    StagesExhausted,
    BudgetExhausted,
    DeadlineExceeded,
}

/// Inputs seeding one cascade run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CascadeInput {
    pub course_name: String,
    pub region_code: String,
    pub website: Option<String>,
}

/// Everything one cascade run produced, with per-stage provenance.
#[derive(Debug)]
pub struct CascadeOutcome {
    pub candidates: Vec<Candidate>,
    pub website: Option<String>,
    pub phone: Option<String>,
    pub listing_url: Option<String>,
    pub reports: Vec<StageReport>,
    pub termination: CascadeTermination,
}

impl CascadeOutcome {
    /// Every attempted stage was shut down by an auth/contract rejection and
    /// nothing was discovered; the orchestrator maps this to the
    /// `NO_PROVIDERS_AVAILABLE` failure when no artifact exists either.
    pub fn providers_unavailable(&self) -> bool {
        let mut any_disabled = false;
        for report in &self.reports {
            match report.outcome {
                StageOutcome::Disabled { .. } => any_disabled = true,
                StageOutcome::Completed { .. } | StageOutcome::Failed { .. } => return false,
                StageOutcome::Skipped { .. } => {}
            }
        }
        any_disabled && self.candidates.is_empty()
    }
}

struct CascadeState {
    candidates: Vec<Candidate>,
    hints: Vec<Mailbox>,
    pattern: Option<String>,
    website: Option<String>,
    phone: Option<String>,
    listing_url: Option<String>,
    disabled: HashSet<ProviderId>,
}

impl CascadeState {
    fn domain(&self) -> Option<String> {
        self.website.as_deref().and_then(domain_from_website)
    }

    fn sufficient_count(&self) -> usize {
        self.candidates.iter().filter(|c| c.is_sufficient()).count()
    }
}

enum StageRun {
    Added(usize),
    Skipped(String),
    /// The budget meter refused a call mid-stage; `usize` candidates were
    /// already contributed.
    BudgetStop(usize),
}

pub struct Cascade<'a> {
    providers: &'a ProviderSet,
    config: &'a CascadeConfig,
}

impl<'a> Cascade<'a> {
    pub fn new(providers: &'a ProviderSet, config: &'a CascadeConfig) -> Self {
        Self { providers, config }
    }

    pub async fn run(
        &self,
        input: &CascadeInput,
        meter: &BudgetMeter,
        deadline: &Deadline,
    ) -> CascadeOutcome {
        let mut state = CascadeState {
            candidates: Vec::new(),
            hints: Vec::new(),
            pattern: None,
            website: input.website.clone(),
            phone: None,
            listing_url: None,
            disabled: HashSet::new(),
        };
        let mut reports = Vec::new();
        let mut termination = CascadeTermination::StagesExhausted;

        for stage in CascadeStage::ORDER {
            if state.sufficient_count() >= self.config.n_target {
                termination = CascadeTermination::Sufficient;
                break;
            }
            if deadline.expired() {
                termination = CascadeTermination::DeadlineExceeded;
                break;
            }

            let provider = stage.provider().expect("ordered stages map to providers");
            if state.disabled.contains(&provider) {
                reports.push(StageReport {
                    stage,
                    outcome: StageOutcome::Disabled {
                        code: String::from("provider.unauthorized"),
                    },
                    duration_ms: 0,
                });
                continue;
            }

            let estimate = ProviderPolicy::default_for(provider).estimated_call_cost_usd;
            if meter.would_exceed(provider, estimate) {
                termination = CascadeTermination::BudgetExhausted;
                break;
            }
            if stage.optional() && meter.soft_exhausted() {
                reports.push(StageReport {
                    stage,
                    outcome: StageOutcome::Skipped {
                        reason: String::from("soft budget ceiling reached"),
                    },
                    duration_ms: 0,
                });
                continue;
            }

            let started = Instant::now();
            let result = self
                .run_stage(stage, input, &mut state, meter, deadline)
                .await;
            let duration_ms = started.elapsed().as_millis() as u64;

            let mut budget_stop = false;
            let outcome = match result {
                Ok(StageRun::Added(added)) => StageOutcome::Completed {
                    candidates_added: added,
                },
                Ok(StageRun::Skipped(reason)) => StageOutcome::Skipped { reason },
                Ok(StageRun::BudgetStop(added)) => {
                    budget_stop = true;
                    StageOutcome::Completed {
                        candidates_added: added,
                    }
                }
                Err(error) if error.kind() == ProviderErrorKind::NotFound => {
                    StageOutcome::Skipped {
                        reason: error.message().to_owned(),
                    }
                }
                Err(error) if error.disables_stage() => {
                    state.disabled.insert(provider);
                    StageOutcome::Disabled {
                        code: error.code().to_owned(),
                    }
                }
                Err(error) => StageOutcome::Failed {
                    code: error.code().to_owned(),
                },
            };

            debug!(stage = stage.as_str(), ?outcome, duration_ms, "cascade stage finished");
            reports.push(StageReport {
                stage,
                outcome,
                duration_ms,
            });

            state.candidates = merge_candidates(std::mem::take(&mut state.candidates));

            if budget_stop {
                termination = CascadeTermination::BudgetExhausted;
                break;
            }
        }

        if state.sufficient_count() >= self.config.n_target
            && termination == CascadeTermination::StagesExhausted
        {
            termination = CascadeTermination::Sufficient;
        }

        CascadeOutcome {
            candidates: merge_candidates(state.candidates),
            website: state.website,
            phone: state.phone,
            listing_url: state.listing_url,
            reports,
            termination,
        }
    }

    async fn run_stage(
        &self,
        stage: CascadeStage,
        input: &CascadeInput,
        state: &mut CascadeState,
        meter: &BudgetMeter,
        deadline: &Deadline,
    ) -> Result<StageRun, ProviderError> {
        match stage {
            CascadeStage::Directory => self.directory_stage(input, state, meter, deadline).await,
            CascadeStage::PeopleSearch => {
                self.people_search_stage(input, state, meter, deadline).await
            }
            CascadeStage::EmailFinder => self.email_finder_stage(state, meter, deadline).await,
            CascadeStage::WebRead => self.web_read_stage(state, meter, deadline).await,
            CascadeStage::LlmSearch => self.llm_search_stage(input, state, meter, deadline).await,
            CascadeStage::Pattern => self.pattern_stage(state, meter, deadline).await,
            CascadeStage::Init | CascadeStage::Done => Ok(StageRun::Skipped(String::from(
                "terminal stages do no work",
            ))),
        }
    }

    async fn directory_stage(
        &self,
        input: &CascadeInput,
        state: &mut CascadeState,
        meter: &BudgetMeter,
        deadline: &Deadline,
    ) -> Result<StageRun, ProviderError> {
        let Some(directory) = &self.providers.directory else {
            return Ok(StageRun::Skipped(String::from("no directory configured")));
        };

        let query = DirectoryQuery::new(input.course_name.clone(), input.region_code.clone())?;
        let listing = deadline.cap(directory.find_course(query)).await?;
        meter.record(&listing);
        let listing = listing.data;

        if state.website.is_none() {
            state.website = listing.website;
        }
        if state.phone.is_none() {
            state.phone = listing.phone;
        }
        state.listing_url = Some(listing.listing_url.clone());

        let mut staff = listing.staff;

        // Dynamic listing pages carry no staff in static markup.
        if listing.needs_dynamic_render && staff.is_empty() {
            if let Some(scraper) = &self.providers.scraper {
                let estimate =
                    ProviderPolicy::firecrawl_default().estimated_call_cost_usd;
                if meter.would_exceed(ProviderId::Firecrawl, estimate) {
                    return Ok(StageRun::BudgetStop(0));
                }
                let page = deadline
                    .cap(scraper.scrape(DynamicScrapeRequest::new(listing.listing_url.clone())?))
                    .await?;
                meter.record(&page);
                staff = page_heuristics::extract_staff(&page.data.text);
                if state.phone.is_none() {
                    state.phone = page_heuristics::find_phone(&page.data.text);
                }
                if state.website.is_none() {
                    state.website = page_heuristics::find_website(&page.data.text, None);
                }
            }
        }

        let mut added = 0;
        for entry in staff {
            state.candidates.push(
                Candidate::new(entry.name, entry.title, DiscoveryStage::Directory)
                    .with_source(listing.listing_url.clone()),
            );
            added += 1;
        }
        Ok(StageRun::Added(added))
    }

    async fn people_search_stage(
        &self,
        input: &CascadeInput,
        state: &mut CascadeState,
        meter: &BudgetMeter,
        deadline: &Deadline,
    ) -> Result<StageRun, ProviderError> {
        let Some(people) = &self.providers.people else {
            return Ok(StageRun::Skipped(String::from("no people-search configured")));
        };
        let Some(domain) = state.domain() else {
            return Ok(StageRun::Skipped(String::from("no course domain known")));
        };

        let request = PeopleSearchRequest::new(
            input.course_name.clone(),
            Some(domain.clone()),
            crate::domain::ROLE_KEYWORDS.iter().map(|s| s.to_string()).collect(),
        )?;
        let batch = deadline.cap(people.search(request)).await?;
        meter.record(&batch);

        let wanted_org = normalize_name(&input.course_name);
        let mut added = 0;

        for person in batch.data.people {
            let org_domain_matches = person
                .organization_domain
                .as_deref()
                .is_some_and(|d| d.eq_ignore_ascii_case(&domain));
            let org_name_matches = person
                .organization_name
                .as_deref()
                .is_some_and(|n| normalize_name(n) == wanted_org);
            if !org_domain_matches && !org_name_matches {
                continue;
            }
            let Some(title) = person.title.clone().filter(|t| !t.trim().is_empty()) else {
                continue;
            };

            let mut candidate =
                Candidate::new(person.name.clone(), title, DiscoveryStage::PeopleSearch);
            candidate.linkedin_url = person.linkedin_url.clone();
            if let Some(url) = &person.linkedin_url {
                candidate.push_source(url.clone());
            }

            // Verified mailboxes are unlocked with a second, credit-burning call.
            if person.email_status.as_deref() == Some("verified") {
                let estimate = ProviderPolicy::apollo_default().estimated_call_cost_usd;
                if meter.would_exceed(ProviderId::Apollo, estimate) {
                    state.candidates.push(candidate);
                    return Ok(StageRun::BudgetStop(added + 1));
                }

                let enrich = deadline
                    .cap(people.enrich(PeopleEnrichRequest::new(person.person_id.clone())?))
                    .await;
                match enrich {
                    Ok(profile) => {
                        meter.record(&profile);
                        let profile = profile.data;
                        if profile.email_status.as_deref() == Some("verified") {
                            candidate.email = profile.email;
                            candidate.email_confidence = profile.email_confidence;
                            candidate.email_source = Some(String::from("people_search"));
                            candidate.employment_verified = true;
                        }
                        if candidate.linkedin_url.is_none() {
                            candidate.linkedin_url = profile.linkedin_url.clone();
                        }
                        if let Some(url) = &profile.linkedin_url {
                            candidate.push_source(url.clone());
                        }
                        if let Some(current) = profile
                            .employment_history
                            .iter()
                            .find(|job| job.current)
                        {
                            candidate.start_date = current.start_date.clone();
                            candidate.tenure_years = current
                                .start_date
                                .as_deref()
                                .and_then(years_since);
                        }
                    }
                    Err(error) if error.disables_stage() => return Err(error),
                    Err(error) => {
                        debug!(person = %person.name, error = %error, "person enrich failed");
                    }
                }
            }

            state.candidates.push(candidate);
            added += 1;
        }

        Ok(StageRun::Added(added))
    }

    async fn email_finder_stage(
        &self,
        state: &mut CascadeState,
        meter: &BudgetMeter,
        deadline: &Deadline,
    ) -> Result<StageRun, ProviderError> {
        let Some(email) = &self.providers.email else {
            return Ok(StageRun::Skipped(String::from("no email-finder configured")));
        };
        let Some(domain) = state.domain() else {
            return Ok(StageRun::Skipped(String::from("no course domain known")));
        };

        let report = deadline
            .cap(email.search_domain(DomainSearchRequest::new(domain)?))
            .await?;
        meter.record(&report);
        let report = report.data;
        state.pattern = report.pattern;

        let mut added = 0;
        for mailbox in report.mailboxes {
            if mailbox.confidence < 90 {
                // Held as an unverified hint; never written as an email.
                state.hints.push(mailbox);
                continue;
            }

            let full_name = match (&mailbox.first_name, &mailbox.last_name) {
                (Some(first), Some(last)) => format!("{first} {last}"),
                _ => {
                    // Role mailboxes (info@, proshop@) carry no person.
                    state.hints.push(mailbox);
                    continue;
                }
            };

            let normalized = normalize_name(&full_name);
            let existing = state
                .candidates
                .iter_mut()
                .find(|candidate| normalize_name(&candidate.name) == normalized);

            match existing {
                Some(candidate) => {
                    if mailbox.confidence > candidate.email_confidence.unwrap_or(0) {
                        candidate.email = Some(mailbox.email);
                        candidate.email_confidence = Some(mailbox.confidence);
                        candidate.email_source = Some(String::from("email_finder"));
                    }
                    if let Some(url) = mailbox.source_url {
                        candidate.push_source(url);
                    }
                }
                None => {
                    let Some(title) = mailbox.title.clone().filter(|t| !t.trim().is_empty())
                    else {
                        state.hints.push(mailbox);
                        continue;
                    };
                    let mut candidate =
                        Candidate::new(full_name, title, DiscoveryStage::EmailFinder);
                    candidate.email = Some(mailbox.email);
                    candidate.email_confidence = Some(mailbox.confidence);
                    candidate.email_source = Some(String::from("email_finder"));
                    if let Some(url) = mailbox.source_url {
                        candidate.push_source(url);
                    }
                    state.candidates.push(candidate);
                    added += 1;
                }
            }
        }

        Ok(StageRun::Added(added))
    }

    async fn web_read_stage(
        &self,
        state: &mut CascadeState,
        meter: &BudgetMeter,
        deadline: &Deadline,
    ) -> Result<StageRun, ProviderError> {
        let Some(reader) = &self.providers.reader else {
            return Ok(StageRun::Skipped(String::from("no url reader configured")));
        };
        let Some(website) = state.website.clone() else {
            return Ok(StageRun::Skipped(String::from("no course website known")));
        };

        let needs_backfill = state.candidates.is_empty()
            || state
                .candidates
                .iter()
                .any(|c| c.email.is_none() || c.linkedin_url.is_none());
        if !needs_backfill {
            return Ok(StageRun::Skipped(String::from(
                "all candidates already carry email and linkedin",
            )));
        }

        let base = website.trim_end_matches('/');
        let mut pages_read = 0;
        let mut added = 0;

        for path in &self.config.probe_paths {
            if pages_read >= self.config.max_pages_per_probe {
                break;
            }
            if meter.would_exceed(ProviderId::Jina, 0.0) {
                return Ok(StageRun::BudgetStop(added));
            }

            let url = format!("{base}/{path}");
            let page = match deadline.cap(reader.read(UrlReadRequest::new(url)?)).await {
                Ok(page) => page,
                Err(error) if error.kind() == ProviderErrorKind::NotFound => continue,
                Err(error) if error.disables_stage() => return Err(error),
                Err(error) => {
                    debug!(error = %error, "staff page read failed");
                    continue;
                }
            };
            meter.record(&page);
            pages_read += 1;
            let page = page.data;

            for entry in page_heuristics::extract_staff(&page.text) {
                let key = Candidate::new(entry.name.clone(), entry.title.clone(), DiscoveryStage::WebRead)
                    .merge_key();
                match state
                    .candidates
                    .iter_mut()
                    .find(|candidate| candidate.merge_key() == key)
                {
                    Some(candidate) => candidate.push_source(page.url.clone()),
                    None => {
                        state.candidates.push(
                            Candidate::new(entry.name, entry.title, DiscoveryStage::WebRead)
                                .with_source(page.url.clone()),
                        );
                        added += 1;
                    }
                }
            }

            // Profile links on the page backfill candidates missing LinkedIn.
            for url in page_heuristics::find_linkedin_urls(&page.text) {
                let slug = url.rsplit('/').next().unwrap_or("").to_ascii_lowercase();
                for candidate in &mut state.candidates {
                    if candidate.linkedin_url.is_some() {
                        continue;
                    }
                    let last = candidate
                        .last_name()
                        .map(str::to_ascii_lowercase)
                        .unwrap_or_default();
                    if !last.is_empty() && slug.contains(&last) {
                        candidate.linkedin_url = Some(url.clone());
                        candidate.push_source(page.url.clone());
                        break;
                    }
                }
            }

            if state.phone.is_none() {
                state.phone = page_heuristics::find_phone(&page.text);
            }
        }

        Ok(StageRun::Added(added))
    }

    async fn llm_search_stage(
        &self,
        input: &CascadeInput,
        state: &mut CascadeState,
        meter: &BudgetMeter,
        deadline: &Deadline,
    ) -> Result<StageRun, ProviderError> {
        let Some(search) = &self.providers.search else {
            return Ok(StageRun::Skipped(String::from("no search model configured")));
        };

        let targets: Vec<usize> = state
            .candidates
            .iter()
            .enumerate()
            .filter(|(_, c)| c.phone.is_none() || c.tenure_years.is_none())
            .map(|(index, _)| index)
            .collect();
        if targets.is_empty() {
            return Ok(StageRun::Skipped(String::from(
                "all candidates already carry phone and tenure",
            )));
        }

        let estimate = ProviderPolicy::perplexity_default().estimated_call_cost_usd;
        for index in targets {
            if meter.would_exceed(ProviderId::Perplexity, estimate) {
                return Ok(StageRun::BudgetStop(0));
            }

            let (name, title) = {
                let candidate = &state.candidates[index];
                (candidate.name.clone(), candidate.title.clone())
            };
            let prompt = format!(
                "Find the work phone number and current-role tenure for {name}, {title} at {course} \
in {region}. Respond with only a JSON object: \
{{\"phone\": \"...\"|null, \"tenure_years\": number|null, \"start_date\": \"YYYY-MM-DD\"|null}}",
                course = input.course_name,
                region = input.region_code,
            );

            let answer = match deadline.cap(search.ask(LlmSearchRequest::new(prompt, true)?)).await {
                Ok(answer) => answer,
                Err(error) if error.disables_stage() => return Err(error),
                Err(error) => {
                    debug!(error = %error, "llm search failed for candidate");
                    continue;
                }
            };
            meter.record(&answer);
            let answer = answer.data;

            // Values without a citation are never accepted.
            if answer.citations.is_empty() {
                continue;
            }
            let Some(value) = crate::artifact::extract_json_object(&answer.text) else {
                continue;
            };
            let Ok(facts) = serde_json::from_value::<LlmContactFacts>(value) else {
                continue;
            };

            let candidate = &mut state.candidates[index];
            if candidate.phone.is_none() {
                if let Some(phone) = facts.phone.filter(|p| page_heuristics::phone_pattern().is_match(p)) {
                    candidate.phone = Some(phone);
                    candidate.phone_source = answer.citations.first().cloned();
                }
            }
            if candidate.tenure_years.is_none() {
                if let Some(tenure) = facts.tenure_years.filter(|t| (0.0..=60.0).contains(t)) {
                    candidate.tenure_years = Some(tenure as f32);
                }
                if candidate.start_date.is_none() {
                    candidate.start_date = facts.start_date;
                }
            }
            for citation in answer.citations.iter().take(2) {
                candidate.push_source(citation.clone());
            }
        }

        Ok(StageRun::Added(0))
    }

    async fn pattern_stage(
        &self,
        state: &mut CascadeState,
        meter: &BudgetMeter,
        deadline: &Deadline,
    ) -> Result<StageRun, ProviderError> {
        let Some(email) = &self.providers.email else {
            return Ok(StageRun::Skipped(String::from("no email verifier configured")));
        };
        let Some(domain) = state.domain() else {
            return Ok(StageRun::Skipped(String::from("no course domain known")));
        };

        let targets: Vec<usize> = state
            .candidates
            .iter()
            .enumerate()
            .filter(|(_, c)| c.email.is_none())
            .map(|(index, _)| index)
            .collect();
        if targets.is_empty() {
            return Ok(StageRun::Skipped(String::from("no candidate is missing an email")));
        }

        let estimate = ProviderPolicy::hunter_default().estimated_call_cost_usd;
        for index in targets {
            let (address, hint_confidence) = {
                let candidate = &state.candidates[index];
                let hinted = state.hints.iter().find(|hint| {
                    match (&hint.first_name, &hint.last_name) {
                        (Some(first), Some(last)) => {
                            normalize_name(&format!("{first} {last}"))
                                == normalize_name(&candidate.name)
                        }
                        _ => false,
                    }
                });
                match hinted {
                    Some(hint) => (Some(hint.email.clone()), hint.confidence),
                    None => (
                        state.pattern.as_deref().and_then(|pattern| {
                            render_pattern(
                                pattern,
                                candidate.first_name()?,
                                candidate.last_name()?,
                                &domain,
                            )
                        }),
                        0,
                    ),
                }
            };
            let Some(address) = address else { continue };

            if meter.would_exceed(ProviderId::Hunter, estimate) {
                // Out of budget: the synthesized address stays provisional.
                state.candidates[index].provisional_email = Some(ProvisionalEmail {
                    address,
                    confidence: hint_confidence,
                });
                return Ok(StageRun::BudgetStop(0));
            }

            let verdict = match deadline
                .cap(email.verify(EmailVerifyRequest::new(address.clone())?))
                .await
            {
                Ok(verdict) => verdict,
                Err(error) if error.disables_stage() => return Err(error),
                Err(error) => {
                    debug!(error = %error, "verification failed; holding provisional");
                    state.candidates[index].provisional_email = Some(ProvisionalEmail {
                        address,
                        confidence: hint_confidence,
                    });
                    continue;
                }
            };
            meter.record(&verdict);
            let verdict = verdict.data;

            let candidate = &mut state.candidates[index];
            if verdict.status == Deliverability::Deliverable && verdict.confidence >= 90 {
                candidate.email = Some(address);
                candidate.email_confidence = Some(verdict.confidence);
                candidate.email_source = Some(String::from("pattern_verified"));
                candidate.push_source(format!("https://hunter.io/verify/{domain}"));
            } else {
                candidate.provisional_email = Some(ProvisionalEmail {
                    address,
                    confidence: verdict.confidence.max(hint_confidence),
                });
            }
        }

        Ok(StageRun::Added(0))
    }
}

#[derive(Debug, serde::Deserialize)]
struct LlmContactFacts {
    #[serde(default)]
    phone: Option<String>,
    #[serde(default)]
    tenure_years: Option<f64>,
    #[serde(default)]
    start_date: Option<String>,
}

pub fn domain_from_website(url: &str) -> Option<String> {
    let stripped = url
        .trim()
        .trim_start_matches("https://")
        .trim_start_matches("http://")
        .trim_start_matches("www.");
    let host = stripped.split('/').next()?.trim();
    if host.is_empty() || !host.contains('.') {
        return None;
    }
    Some(host.to_ascii_lowercase())
}

/// Renders `{first}.{last}`-style patterns into a concrete mailbox.
fn render_pattern(pattern: &str, first: &str, last: &str, domain: &str) -> Option<String> {
    if first.is_empty() || last.is_empty() {
        return None;
    }
    let first = first.to_ascii_lowercase();
    let last = last.to_ascii_lowercase();
    let local = pattern
        .replace("{first}", &first)
        .replace("{last}", &last)
        .replace("{f}", &first[..1])
        .replace("{l}", &last[..1]);
    if local.contains(['{', '}']) || local.is_empty() {
        return None;
    }
    Some(format!("{local}@{domain}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn domains_strip_scheme_www_and_path() {
        assert_eq!(
            domain_from_website("https://www.richmondcountryclubva.com/staff"),
            Some(String::from("richmondcountryclubva.com"))
        );
        assert_eq!(domain_from_website("not a url"), None);
    }

    #[test]
    fn pattern_rendering_handles_both_token_styles() {
        assert_eq!(
            render_pattern("{first}.{last}", "Stacy", "Foster", "club.test"),
            Some(String::from("stacy.foster@club.test"))
        );
        assert_eq!(
            render_pattern("{f}{last}", "Stacy", "Foster", "club.test"),
            Some(String::from("sfoster@club.test"))
        );
        assert_eq!(render_pattern("{unknown}", "A", "B", "club.test"), None);
    }

    #[test]
    fn stage_order_matches_the_state_machine() {
        let labels: Vec<&str> = CascadeStage::ORDER.iter().map(|s| s.as_str()).collect();
        assert_eq!(
            labels,
            [
                "directory",
                "people_search",
                "email_finder",
                "web_read",
                "llm_search",
                "pattern"
            ]
        );
    }

    #[test]
    fn optional_stages_are_the_enhancement_pair() {
        assert!(CascadeStage::LlmSearch.optional());
        assert!(CascadeStage::Pattern.optional());
        assert!(!CascadeStage::Directory.optional());
        assert!(!CascadeStage::EmailFinder.optional());
    }
}
