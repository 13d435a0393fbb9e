use crate::artifact::Section2;
use crate::validator::{HazardAssessment, ValidationError};

const NO_HAZARD_INFO: &str = "No water hazards information available";

pub(crate) fn parse(section: Option<&Section2>) -> Result<HazardAssessment, ValidationError> {
    let Some(section) = section else {
        return Ok(HazardAssessment {
            count: 0,
            rating: String::from(NO_HAZARD_INFO),
            source: None,
            confidence: 0.5,
        });
    };

    let mut count = section.hazard_count.unwrap_or(0);
    if !(0..=18).contains(&count) {
        return Err(ValidationError::new(
            2,
            "hazard_count",
            format!("{count} is outside [0, 18]"),
        ));
    }

    let details = section.hazard_details.as_deref().unwrap_or("");

    // Text cues fill in a count the researcher asserted but did not number.
    if section.has_water_hazards && count == 0 {
        let lowered = details.to_ascii_lowercase();
        if details.contains("18/18") || lowered.contains("all 18") {
            count = 18;
        } else if !details.trim().is_empty() {
            count = 1;
        }
    }

    let rating = if !details.trim().is_empty() {
        details.to_owned()
    } else if count > 0 {
        format!("{count} holes have water hazards")
    } else {
        String::from(NO_HAZARD_INFO)
    };

    let source = section
        .source
        .as_deref()
        .filter(|s| !s.trim().is_empty())
        .map(str::to_owned);

    let mut confidence = 1.0;
    if source.is_none() {
        confidence = 0.7;
    }
    if section.has_water_hazards && count == 0 {
        confidence = 0.6;
    }

    Ok(HazardAssessment {
        count: count as u8,
        rating,
        source,
        confidence,
    })
}
