use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{Contact, DiscoveryStage};

/// Decision-maker role keywords recognized across directory pages, staff
/// pages, and people-search titles. The set is closed: pairs whose title
/// matches none of these are not treated as staff.
pub const ROLE_KEYWORDS: [&str; 9] = [
    "General Manager",
    "Director of Golf",
    "Head Golf Professional",
    "PGA Professional",
    "Superintendent",
    "Owner",
    "President",
    "Club Manager",
    "Membership Director",
];

/// Pattern-derived mailbox held in memory; never persisted as an email
/// unless independently verified at >= 90 confidence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProvisionalEmail {
    pub address: String,
    pub confidence: u8,
}

/// Stage-local contact record before merging and persistence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub name: String,
    pub title: String,
    pub email: Option<String>,
    pub email_confidence: Option<u8>,
    pub email_source: Option<String>,
    pub provisional_email: Option<ProvisionalEmail>,
    pub phone: Option<String>,
    pub phone_source: Option<String>,
    pub linkedin_url: Option<String>,
    pub tenure_years: Option<f32>,
    pub start_date: Option<String>,
    pub employment_verified: bool,
    pub sources: Vec<String>,
    pub stage_of_origin: DiscoveryStage,
}

impl Candidate {
    pub fn new(
        name: impl Into<String>,
        title: impl Into<String>,
        stage_of_origin: DiscoveryStage,
    ) -> Self {
        Self {
            name: name.into(),
            title: title.into(),
            email: None,
            email_confidence: None,
            email_source: None,
            provisional_email: None,
            phone: None,
            phone_source: None,
            linkedin_url: None,
            tenure_years: None,
            start_date: None,
            employment_verified: false,
            sources: Vec::new(),
            stage_of_origin,
        }
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.push_source(source);
        self
    }

    pub fn push_source(&mut self, source: impl Into<String>) {
        let source = source.into();
        if !source.is_empty() && !self.sources.contains(&source) {
            self.sources.push(source);
        }
    }

    /// Fuzzy identity used for cross-stage merging.
    pub fn merge_key(&self) -> (String, String) {
        (normalize_name(&self.name), normalize_title(&self.title))
    }

    pub fn has_verified_email(&self) -> bool {
        self.email.is_some() && self.email_confidence.unwrap_or(0) >= 90
    }

    /// A candidate counts toward the sufficiency target when it carries both
    /// a verified email and a LinkedIn URL.
    pub fn is_sufficient(&self) -> bool {
        self.has_verified_email() && self.linkedin_url.is_some()
    }

    pub fn first_name(&self) -> Option<&str> {
        self.name.split_whitespace().next()
    }

    pub fn last_name(&self) -> Option<&str> {
        let mut parts = self.name.split_whitespace();
        let first = parts.next()?;
        parts.last().or(Some(first))
    }

    /// Converts into a persistable contact. The provisional-email lane is
    /// dropped here; enriched fields without provenance are cleared rather
    /// than stored unsourced.
    pub fn into_contact(mut self, course_id: Uuid) -> Contact {
        if self.sources.is_empty() {
            self.email = None;
            self.email_confidence = None;
            self.email_source = None;
            self.phone = None;
            self.phone_source = None;
            self.linkedin_url = None;
            self.tenure_years = None;
            self.start_date = None;
        }
        if self.email_confidence.unwrap_or(0) < 90 {
            self.email = None;
            self.email_confidence = None;
            self.email_source = None;
        }

        Contact {
            course_id,
            name: self.name,
            title: self.title,
            email: self.email,
            email_confidence: self.email_confidence,
            email_source: self.email_source,
            phone: self.phone,
            phone_source: self.phone_source,
            linkedin_url: self.linkedin_url,
            tenure_years: self.tenure_years,
            start_date: self.start_date,
            employment_verified: self.employment_verified,
            sources: self.sources,
            discovery_stage: self.stage_of_origin,
        }
    }
}

pub fn normalize_name(name: &str) -> String {
    name.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_ascii_lowercase()
}

/// Titles collapse onto the role keyword they contain, so "Head Golf
/// Professional (PGA)" and "head golf professional" merge.
pub fn normalize_title(title: &str) -> String {
    let lowered = title.to_ascii_lowercase();
    for keyword in ROLE_KEYWORDS {
        if lowered.contains(&keyword.to_ascii_lowercase()) {
            return keyword.to_ascii_lowercase();
        }
    }
    lowered.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Whether a free-form title names one of the closed role keywords.
pub fn matches_role_keyword(title: &str) -> bool {
    let lowered = title.to_ascii_lowercase();
    ROLE_KEYWORDS
        .iter()
        .any(|keyword| lowered.contains(&keyword.to_ascii_lowercase()))
}
