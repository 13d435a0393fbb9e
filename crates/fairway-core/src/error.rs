use thiserror::Error;

/// Validation and contract errors exposed by `fairway-core` domain types.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum DomainError {
    #[error("course name cannot be empty")]
    EmptyCourseName,
    #[error("region code cannot be empty")]
    EmptyRegionCode,

    #[error("contact name cannot be empty")]
    EmptyContactName,
    #[error("contact title cannot be empty")]
    EmptyContactTitle,
    #[error("email requires confidence >= 90, got {confidence}")]
    EmailConfidenceBelowThreshold { confidence: u8 },

    #[error("invalid tier '{value}', expected one of Premium, Mid, Budget")]
    InvalidTier { value: String },
    #[error("invalid enrichment status '{value}'")]
    InvalidStatus { value: String },

    #[error("confidence {value} is out of range [0, 1]")]
    ConfidenceOutOfRange { value: f64 },
    #[error("confidence '{value}' is not numeric")]
    ConfidenceNotNumeric { value: String },

    #[error("hazard count {value} is out of range [0, 18]")]
    HazardCountOutOfRange { value: i64 },

    #[error("timestamp must be RFC3339 UTC (suffix Z): '{value}'")]
    TimestampNotUtc { value: String },
}

/// Top-level error type for core operations.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
