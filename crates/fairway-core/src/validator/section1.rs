use crate::artifact::Section1;
use crate::domain::{normalize_confidence, ConfidenceValue, Evidence};
use crate::validator::{TierAssessment, ValidationError};

/// Missing confidence falls back to a cautious default rather than failing
/// the whole artifact.
const DEFAULT_TIER_CONFIDENCE: ConfidenceValue = ConfidenceValue::Number(0.8);

pub(crate) fn parse(section: Option<&Section1>) -> Result<TierAssessment, ValidationError> {
    let Some(section) = section else {
        return Err(ValidationError::new(1, "section1", "section is missing"));
    };

    let Some(tier_raw) = section.tier.as_deref() else {
        return Err(ValidationError::new(1, "tier", "field is missing"));
    };
    let tier = tier_raw
        .parse()
        .map_err(|_| ValidationError::new(1, "tier", format!("invalid tier '{tier_raw}'")))?;

    let confidence_raw = section
        .tier_confidence
        .clone()
        .unwrap_or(DEFAULT_TIER_CONFIDENCE);
    let confidence = normalize_confidence(&confidence_raw)
        .map_err(|error| ValidationError::new(1, "tier_confidence", error.to_string()))?;

    let evidence = section
        .pricing_evidence
        .iter()
        .filter(|item| !item.claim.trim().is_empty())
        .map(|item| Evidence {
            claim: item.claim.clone(),
            source: item.source.clone(),
        })
        .collect();

    Ok(TierAssessment {
        tier,
        confidence,
        evidence,
    })
}
