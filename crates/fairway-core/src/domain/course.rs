use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::UtcTimestamp;
use crate::provider::ProviderId;
use crate::DomainError;

/// Categorical market segment of a course.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Tier {
    Premium,
    Mid,
    Budget,
}

impl Tier {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Premium => "Premium",
            Self::Mid => "Mid",
            Self::Budget => "Budget",
        }
    }
}

impl Display for Tier {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Tier {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim() {
            "Premium" => Ok(Self::Premium),
            "Mid" => Ok(Self::Mid),
            "Budget" => Ok(Self::Budget),
            other => Err(DomainError::InvalidTier {
                value: other.to_owned(),
            }),
        }
    }
}

/// Enrichment lifecycle state of a course row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnrichmentStatus {
    Pending,
    InProgress,
    Completed,
    Failed,
}

impl EnrichmentStatus {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }
}

impl FromStr for EnrichmentStatus {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim() {
            "pending" => Ok(Self::Pending),
            "in_progress" => Ok(Self::InProgress),
            "completed" => Ok(Self::Completed),
            "failed" => Ok(Self::Failed),
            other => Err(DomainError::InvalidStatus {
                value: other.to_owned(),
            }),
        }
    }
}

/// Single categorical reason attached to a failed course.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FailureReason {
    ValidationFailed,
    NoProvidersAvailable,
    BudgetExhausted,
    DeadlineExceeded,
    WriterConflict,
    WriterUnavailable,
}

impl FailureReason {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ValidationFailed => "VALIDATION_FAILED",
            Self::NoProvidersAvailable => "NO_PROVIDERS_AVAILABLE",
            Self::BudgetExhausted => "BUDGET_EXHAUSTED",
            Self::DeadlineExceeded => "DEADLINE_EXCEEDED",
            Self::WriterConflict => "WRITER_CONFLICT",
            Self::WriterUnavailable => "WRITER_UNAVAILABLE",
        }
    }
}

/// Soft quality warning persisted with a completed course.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ValidationFlag {
    NoContactsFound,
    NoContactMethods,
    LowTierConfidence,
    NoVolumeData,
}

impl ValidationFlag {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::NoContactsFound => "NO_CONTACTS_FOUND",
            Self::NoContactMethods => "NO_CONTACT_METHODS",
            Self::LowTierConfidence => "LOW_TIER_CONFIDENCE",
            Self::NoVolumeData => "NO_VOLUME_DATA",
        }
    }
}

/// Which pipeline step first produced a contact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscoveryStage {
    Artifact,
    Directory,
    PeopleSearch,
    EmailFinder,
    WebRead,
    LlmSearch,
    Pattern,
}

impl DiscoveryStage {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Artifact => "artifact",
            Self::Directory => "directory",
            Self::PeopleSearch => "people_search",
            Self::EmailFinder => "email_finder",
            Self::WebRead => "web_read",
            Self::LlmSearch => "llm_search",
            Self::Pattern => "pattern",
        }
    }
}

/// Ownership line of the intelligence section.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Ownership {
    #[serde(rename = "type")]
    pub ownership_type: String,
    pub entity_name: String,
    pub source: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecentChange {
    pub change_type: String,
    pub description: String,
    pub date: String,
    pub source: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vendor {
    pub vendor_type: String,
    pub vendor_name: String,
    pub source: String,
}

/// Narrative intelligence embedded as JSON on the course row.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Intelligence {
    #[serde(default)]
    pub ownership: Option<Ownership>,
    #[serde(default)]
    pub recent_changes: Vec<RecentChange>,
    #[serde(default)]
    pub vendors: Vec<Vendor>,
    #[serde(default)]
    pub selling_points: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Evidence {
    pub claim: String,
    pub source: String,
}

/// Fully enriched course profile ready for persistence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Course {
    pub id: Uuid,
    pub name: String,
    pub region_code: String,
    pub website: Option<String>,
    pub phone: Option<String>,
    pub contacts_page_url: Option<String>,
    pub tier: Option<Tier>,
    pub tier_confidence: f64,
    pub tier_evidence: Vec<Evidence>,
    pub hazard_count: u8,
    pub hazard_rating: String,
    pub hazard_source: Option<String>,
    pub hazard_confidence: f64,
    pub annual_rounds_estimate: Option<u32>,
    pub annual_rounds_range: String,
    pub annual_rounds_confidence: f64,
    pub intelligence: Intelligence,
    pub validation_flags: Vec<ValidationFlag>,
    pub enrichment_status: EnrichmentStatus,
    pub enrichment_error: Option<String>,
    pub agent_cost_usd: f64,
    pub provider_credits: BTreeMap<ProviderId, u32>,
    pub started_at: UtcTimestamp,
    pub completed_at: Option<UtcTimestamp>,
}

impl Course {
    /// Starts a course shell in `in_progress`; enrichment fields are filled
    /// by the orchestrator before the final write.
    pub fn begin(
        name: impl Into<String>,
        region_code: impl Into<String>,
        started_at: UtcTimestamp,
    ) -> Result<Self, DomainError> {
        let name = name.into();
        let region_code = region_code.into();
        if name.trim().is_empty() {
            return Err(DomainError::EmptyCourseName);
        }
        if region_code.trim().is_empty() {
            return Err(DomainError::EmptyRegionCode);
        }

        Ok(Self {
            id: Uuid::new_v4(),
            name,
            region_code,
            website: None,
            phone: None,
            contacts_page_url: None,
            tier: None,
            tier_confidence: 0.0,
            tier_evidence: Vec::new(),
            hazard_count: 0,
            hazard_rating: String::new(),
            hazard_source: None,
            hazard_confidence: 0.0,
            annual_rounds_estimate: None,
            annual_rounds_range: String::new(),
            annual_rounds_confidence: 0.0,
            intelligence: Intelligence::default(),
            validation_flags: Vec::new(),
            enrichment_status: EnrichmentStatus::InProgress,
            enrichment_error: None,
            agent_cost_usd: 0.0,
            provider_credits: BTreeMap::new(),
            started_at,
            completed_at: None,
        })
    }
}

/// Persisted decision-maker contact, replaced wholesale per enrichment run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contact {
    pub course_id: Uuid,
    pub name: String,
    pub title: String,
    pub email: Option<String>,
    pub email_confidence: Option<u8>,
    pub email_source: Option<String>,
    pub phone: Option<String>,
    pub phone_source: Option<String>,
    pub linkedin_url: Option<String>,
    pub tenure_years: Option<f32>,
    pub start_date: Option<String>,
    pub employment_verified: bool,
    pub sources: Vec<String>,
    pub discovery_stage: DiscoveryStage,
}

impl Contact {
    /// Validates the persistence invariants: non-empty name/title, verified
    /// emails only, and provenance whenever any field beyond name/title is
    /// set.
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.name.trim().is_empty() {
            return Err(DomainError::EmptyContactName);
        }
        if self.title.trim().is_empty() {
            return Err(DomainError::EmptyContactTitle);
        }
        if self.email.is_some() {
            let confidence = self.email_confidence.unwrap_or(0);
            if confidence < 90 {
                return Err(DomainError::EmailConfidenceBelowThreshold { confidence });
            }
        }
        Ok(())
    }

    pub fn has_enriched_fields(&self) -> bool {
        self.email.is_some()
            || self.phone.is_some()
            || self.linkedin_url.is_some()
            || self.tenure_years.is_some()
            || self.start_date.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn contact() -> Contact {
        Contact {
            course_id: Uuid::new_v4(),
            name: String::from("Stacy Foster"),
            title: String::from("General Manager"),
            email: None,
            email_confidence: None,
            email_source: None,
            phone: None,
            phone_source: None,
            linkedin_url: None,
            tenure_years: None,
            start_date: None,
            employment_verified: false,
            sources: Vec::new(),
            discovery_stage: DiscoveryStage::Directory,
        }
    }

    #[test]
    fn tier_parses_exact_labels_only() {
        assert_eq!("Premium".parse::<Tier>(), Ok(Tier::Premium));
        assert!(matches!(
            "Luxury".parse::<Tier>(),
            Err(DomainError::InvalidTier { .. })
        ));
        assert!(matches!(
            "premium".parse::<Tier>(),
            Err(DomainError::InvalidTier { .. })
        ));
    }

    #[test]
    fn contact_without_name_is_invalid() {
        let mut c = contact();
        c.name = String::from("  ");
        assert_eq!(c.validate(), Err(DomainError::EmptyContactName));
    }

    #[test]
    fn email_below_threshold_is_rejected() {
        let mut c = contact();
        c.email = Some(String::from("sfoster@richmondcountryclubva.com"));
        c.email_confidence = Some(70);
        assert_eq!(
            c.validate(),
            Err(DomainError::EmailConfidenceBelowThreshold { confidence: 70 })
        );

        c.email_confidence = Some(95);
        assert_eq!(c.validate(), Ok(()));
    }

    #[test]
    fn course_shell_requires_name_and_region() {
        let started = UtcTimestamp::now();
        assert!(Course::begin("", "VA", started).is_err());
        assert!(Course::begin("Richmond Country Club", "", started).is_err());

        let course = Course::begin("Richmond Country Club", "VA", started).expect("valid course");
        assert_eq!(course.enrichment_status, EnrichmentStatus::InProgress);
        assert!(course.completed_at.is_none());
    }
}
