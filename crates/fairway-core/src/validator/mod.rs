//! Five pure parsers over the research artifact.
//!
//! Hard failures raise [`ValidationError`]; soft quality problems become
//! [`ValidationFlag`]s on the result. No I/O happens here: equal inputs
//! produce equal outputs.

mod section1;
mod section2;
mod section3;
mod section4;
mod section5;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::artifact::ResearchArtifact;
use crate::domain::{Evidence, Intelligence, Tier, ValidationFlag};

/// Hard validation failure, fatal for the course.
#[derive(Debug, Error, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[error("section {section} field '{field}': {reason}")]
pub struct ValidationError {
    pub section: u8,
    pub field: String,
    pub reason: String,
}

impl ValidationError {
    pub(crate) fn new(section: u8, field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            section,
            field: field.into(),
            reason: reason.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TierAssessment {
    pub tier: Tier,
    pub confidence: f64,
    pub evidence: Vec<Evidence>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HazardAssessment {
    pub count: u8,
    pub rating: String,
    pub source: Option<String>,
    pub confidence: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VolumeAssessment {
    pub estimate: Option<u32>,
    pub range: String,
    pub confidence: f64,
    pub sources: Vec<String>,
}

/// Section-4 contact after normalization, before merging with the cascade.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidatedContact {
    pub name: String,
    pub title: String,
    pub email: Option<String>,
    pub linkedin_url: Option<String>,
    pub phone: Option<String>,
    pub employment_verified: bool,
    pub sources: Vec<String>,
}

/// Normalized output of the full artifact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidatedArtifact {
    pub tier: TierAssessment,
    pub hazards: HazardAssessment,
    pub volume: VolumeAssessment,
    pub contacts: Vec<ValidatedContact>,
    pub intelligence: Intelligence,
    pub flags: Vec<ValidationFlag>,
}

pub fn validate(artifact: &ResearchArtifact) -> Result<ValidatedArtifact, ValidationError> {
    let tier = section1::parse(artifact.section1.as_ref())?;
    let hazards = section2::parse(artifact.section2.as_ref())?;
    let volume = section3::parse(artifact.section3.as_ref())?;
    let contacts = section4::parse(artifact.section4.as_ref());
    let intelligence = section5::parse(artifact.section5.as_ref());

    let flags = quality_flags(&tier, &volume, &contacts);

    Ok(ValidatedArtifact {
        tier,
        hazards,
        volume,
        contacts,
        intelligence,
        flags,
    })
}

/// Soft warnings surfaced for manual review rather than failing the course.
pub fn quality_flags(
    tier: &TierAssessment,
    volume: &VolumeAssessment,
    contacts: &[ValidatedContact],
) -> Vec<ValidationFlag> {
    let mut flags = Vec::new();

    if tier.confidence < 0.7 {
        flags.push(ValidationFlag::LowTierConfidence);
    }

    if contacts.is_empty() {
        flags.push(ValidationFlag::NoContactsFound);
    } else {
        let any_method = contacts
            .iter()
            .any(|contact| contact.email.is_some() || contact.linkedin_url.is_some());
        if !any_method {
            flags.push(ValidationFlag::NoContactMethods);
        }
    }

    if volume.estimate.is_none() {
        flags.push(ValidationFlag::NoVolumeData);
    }

    flags
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifact::extract_json_object;

    fn artifact(raw: &str) -> ResearchArtifact {
        let value = extract_json_object(raw).expect("object present");
        serde_json::from_value(value).expect("artifact shape")
    }

    const FULL: &str = r#"{
        "section1": {
            "tier": "Premium",
            "tier_confidence": "85%",
            "pricing_evidence": [{"claim": "Weekend rate $120", "source": "https://club.test/rates"}]
        },
        "section2": {
            "has_water_hazards": true,
            "hazard_count": 18,
            "hazard_details": "18/18 holes have water in play",
            "source": "https://club.test/course"
        },
        "section3": {
            "estimated_annual_rounds": null,
            "volume_range": "22k-32k",
            "estimation_basis": [{"claim": "municipal average", "source": "https://ngf.test/report"}],
            "confidence": 0.7
        },
        "section4": {
            "contacts": [
                {
                    "name": "Stacy Foster",
                    "title": "General Manager",
                    "work_email": "sfoster@club.test",
                    "employment_verified": true,
                    "sources": ["https://club.test/staff"]
                },
                {"name": "", "title": "Superintendent"}
            ]
        },
        "section5": {
            "ownership": {"type": "Private club", "entity_name": "Heritage Golf Group", "source": "https://news.test/deal"},
            "recent_changes": [],
            "current_vendors": [],
            "selling_points": ["Hosted US Open qualifier"]
        }
    }"#;

    #[test]
    fn full_artifact_validates_with_no_flags() {
        let validated = validate(&artifact(FULL)).expect("must validate");

        assert_eq!(validated.tier.tier, Tier::Premium);
        assert_eq!(validated.tier.confidence, 0.85);
        assert_eq!(validated.hazards.count, 18);
        assert_eq!(validated.volume.estimate, Some(27_000));
        assert_eq!(validated.contacts.len(), 1);
        assert!(validated.flags.is_empty());
    }

    #[test]
    fn validator_is_pure() {
        let input = artifact(FULL);
        let first = validate(&input).expect("must validate");
        let second = validate(&input).expect("must validate");
        assert_eq!(first, second);
    }

    #[test]
    fn empty_contacts_raise_the_no_contacts_flag() {
        let raw = r#"{
            "section1": {"tier": "Budget", "tier_confidence": 0.9},
            "section4": {"contacts": []}
        }"#;
        let validated = validate(&artifact(raw)).expect("must validate");
        assert!(validated.contacts.is_empty());
        assert!(validated.flags.contains(&ValidationFlag::NoContactsFound));
        assert!(validated.flags.contains(&ValidationFlag::NoVolumeData));
    }

    #[test]
    fn contacts_without_methods_raise_the_method_flag() {
        let raw = r#"{
            "section1": {"tier": "Mid", "tier_confidence": 0.6},
            "section4": {"contacts": [{"name": "Greg McCue", "title": "Superintendent"}]}
        }"#;
        let validated = validate(&artifact(raw)).expect("must validate");
        assert!(validated.flags.contains(&ValidationFlag::NoContactMethods));
        assert!(validated.flags.contains(&ValidationFlag::LowTierConfidence));
    }

    #[test]
    fn invalid_tier_is_fatal() {
        let raw = r#"{"section1": {"tier": "Luxury", "tier_confidence": 0.9}}"#;
        let error = validate(&artifact(raw)).expect_err("must fail");
        assert_eq!(error.section, 1);
        assert_eq!(error.field, "tier");
    }
}
