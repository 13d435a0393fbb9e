use serde_json::Value;

use crate::artifact::Section3;
use crate::domain::{normalize_confidence, range_midpoint, ConfidenceValue};
use crate::validator::{ValidationError, VolumeAssessment};

pub(crate) fn parse(section: Option<&Section3>) -> Result<VolumeAssessment, ValidationError> {
    let Some(section) = section else {
        return Ok(VolumeAssessment {
            estimate: None,
            range: String::new(),
            confidence: 0.0,
            sources: Vec::new(),
        });
    };

    let range = section.volume_range.clone().unwrap_or_default();

    let estimate = match section.estimated_annual_rounds {
        Some(explicit) if explicit < 0 => {
            return Err(ValidationError::new(
                3,
                "estimated_annual_rounds",
                format!("{explicit} is negative"),
            ));
        }
        Some(explicit) => Some(explicit as u32),
        None => range_midpoint(&range),
    };

    let confidence_raw = section
        .confidence
        .clone()
        .unwrap_or(ConfidenceValue::Number(0.7));
    let confidence = normalize_confidence(&confidence_raw)
        .map_err(|error| ValidationError::new(3, "confidence", error.to_string()))?;

    let sources = section
        .estimation_basis
        .iter()
        .filter_map(basis_source)
        .collect();

    Ok(VolumeAssessment {
        estimate,
        range,
        confidence,
        sources,
    })
}

/// Estimation basis entries arrive either as `{claim, source}` objects or
/// bare source strings.
fn basis_source(value: &Value) -> Option<String> {
    match value {
        Value::Object(map) => map
            .get("source")
            .and_then(Value::as_str)
            .filter(|s| !s.trim().is_empty())
            .map(str::to_owned),
        Value::String(text) if !text.trim().is_empty() => Some(text.clone()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn section(raw: &str) -> Section3 {
        serde_json::from_str(raw).expect("section shape")
    }

    #[test]
    fn missing_section_means_no_volume_data() {
        let parsed = parse(None).expect("must parse");
        assert_eq!(parsed.estimate, None);
        assert_eq!(parsed.confidence, 0.0);
    }

    #[test]
    fn midpoint_supplies_a_missing_estimate() {
        let parsed = parse(Some(&section(
            r#"{"estimated_annual_rounds": null, "volume_range": "22k-32k"}"#,
        )))
        .expect("must parse");
        assert_eq!(parsed.estimate, Some(27_000));
        assert_eq!(parsed.range, "22k-32k");
    }

    #[test]
    fn explicit_estimate_wins_over_the_range() {
        let parsed = parse(Some(&section(
            r#"{"estimated_annual_rounds": 24500, "volume_range": "20000-30000"}"#,
        )))
        .expect("must parse");
        assert_eq!(parsed.estimate, Some(24_500));
    }

    #[test]
    fn mixed_basis_entries_yield_sources() {
        let parsed = parse(Some(&section(
            r#"{"estimation_basis": [
                {"claim": "NGF municipal average", "source": "https://ngf.test/report"},
                "https://club.test/annual-report",
                {"claim": "no source"},
                42
            ]}"#,
        )))
        .expect("must parse");
        assert_eq!(parsed.sources.len(), 2);
    }

    #[test]
    fn negative_estimate_is_fatal() {
        let error = parse(Some(&section(r#"{"estimated_annual_rounds": -5}"#)))
            .expect_err("must fail");
        assert_eq!(error.section, 3);
    }
}
