//! Wire shapes of the five-section research artifact.
//!
//! This is the schema enforced at the trust boundary: the search model may
//! phrase things loosely (string confidences, missing arrays), but anything
//! that does not deserialize into these types is rejected by the validator.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::ConfidenceValue;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResearchArtifact {
    #[serde(default)]
    pub section1: Option<Section1>,
    #[serde(default)]
    pub section2: Option<Section2>,
    #[serde(default)]
    pub section3: Option<Section3>,
    #[serde(default)]
    pub section4: Option<Section4>,
    #[serde(default)]
    pub section5: Option<Section5>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactEvidence {
    #[serde(default)]
    pub claim: String,
    #[serde(default)]
    pub source: String,
}

/// Section 1: tier classification with pricing evidence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Section1 {
    #[serde(default)]
    pub tier: Option<String>,
    #[serde(default)]
    pub tier_confidence: Option<ConfidenceValue>,
    #[serde(default)]
    pub pricing_evidence: Vec<ArtifactEvidence>,
}

/// Section 2: water-hazard assessment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Section2 {
    #[serde(default)]
    pub has_water_hazards: bool,
    #[serde(default)]
    pub hazard_count: Option<i64>,
    #[serde(default)]
    pub hazard_details: Option<String>,
    #[serde(default)]
    pub source: Option<String>,
}

/// Section 3: annual-rounds volume indicator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Section3 {
    #[serde(default)]
    pub estimated_annual_rounds: Option<i64>,
    #[serde(default)]
    pub volume_range: Option<String>,
    #[serde(default)]
    pub estimation_basis: Vec<Value>,
    #[serde(default)]
    pub confidence: Option<ConfidenceValue>,
}

/// Section 4: decision-maker contacts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Section4 {
    #[serde(default)]
    pub contacts: Vec<ArtifactContact>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactContact {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub work_email: Option<String>,
    #[serde(default)]
    pub linkedin_url: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub employment_verified: Value,
    #[serde(default)]
    pub sources: Vec<Value>,
}

/// Section 5: narrative intelligence; entirely optional.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Section5 {
    #[serde(default)]
    pub ownership: Option<ArtifactOwnership>,
    #[serde(default)]
    pub recent_changes: Vec<ArtifactChange>,
    #[serde(default)]
    pub current_vendors: Vec<ArtifactVendor>,
    #[serde(default)]
    pub selling_points: Vec<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactOwnership {
    #[serde(rename = "type", default)]
    pub ownership_type: String,
    #[serde(default)]
    pub entity_name: String,
    #[serde(default)]
    pub source: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactChange {
    #[serde(default)]
    pub change_type: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub source: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactVendor {
    #[serde(default)]
    pub vendor_type: String,
    #[serde(default)]
    pub vendor_name: String,
    #[serde(default)]
    pub source: String,
}

/// Pulls the first JSON object out of free-form model text, tolerating
/// surrounding prose and markdown fences.
pub fn extract_json_object(text: &str) -> Option<Value> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end <= start {
        return None;
    }
    serde_json::from_str(&text[start..=end]).ok()
}
