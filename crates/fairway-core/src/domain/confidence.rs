use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::DomainError;

/// Confidence as it arrives on the wire: research output mixes bare numbers,
/// percentage strings, and fractional strings for the same field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ConfidenceValue {
    Number(f64),
    Text(String),
}

/// Normalizes a confidence value to a `[0.0, 1.0]` float rounded to 3 dp.
///
/// Accepted forms: `0.85`, `85`, `"0.85"`, `"85"`, `"85%"`. Values above 1
/// are treated as percentages. Anything outside `[0, 100]` is rejected.
pub fn normalize_confidence(value: &ConfidenceValue) -> Result<f64, DomainError> {
    let raw = match value {
        ConfidenceValue::Number(n) => *n,
        ConfidenceValue::Text(text) => {
            let cleaned = text.trim().trim_end_matches('%').trim();
            cleaned
                .parse::<f64>()
                .map_err(|_| DomainError::ConfidenceNotNumeric {
                    value: text.clone(),
                })?
        }
    };

    if !raw.is_finite() {
        return Err(DomainError::ConfidenceNotNumeric {
            value: format!("{raw}"),
        });
    }

    let scaled = if raw > 1.0 { raw / 100.0 } else { raw };
    if !(0.0..=1.0).contains(&scaled) {
        return Err(DomainError::ConfidenceOutOfRange { value: scaled });
    }

    Ok(round3(scaled))
}

pub fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}

/// Midpoint of a volume range like `"22k-32k"` or `"20000-30000"`.
pub fn range_midpoint(range: &str) -> Option<u32> {
    let cleaned = range.to_ascii_lowercase().replace(',', "");
    let pattern =
        Regex::new(r"(\d+(?:\.\d+)?)k?\s*-\s*(\d+(?:\.\d+)?)k?").expect("static regex is valid");
    let captures = pattern.captures(&cleaned)?;

    let mut low: f64 = captures.get(1)?.as_str().parse().ok()?;
    let mut high: f64 = captures.get(2)?.as_str().parse().ok()?;
    if cleaned.contains('k') {
        low *= 1000.0;
        high *= 1000.0;
    }

    Some(((low + high) / 2.0) as u32)
}
