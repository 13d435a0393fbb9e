pub mod candidate;
pub mod confidence;
pub mod course;
pub mod timestamp;

pub use candidate::{
    matches_role_keyword, normalize_name, normalize_title, Candidate, ProvisionalEmail,
    ROLE_KEYWORDS,
};
pub use confidence::{normalize_confidence, range_midpoint, round3, ConfidenceValue};
pub use course::{
    Contact, Course, DiscoveryStage, EnrichmentStatus, Evidence, FailureReason, Intelligence,
    Ownership, RecentChange, Tier, ValidationFlag, Vendor,
};
pub use timestamp::{years_since, UtcTimestamp};
