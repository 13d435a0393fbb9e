use std::fmt::{Display, Formatter};

use serde::de::Error as DeError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use time::format_description::well_known::Rfc3339;
use time::{Date, OffsetDateTime, UtcOffset};

use crate::DomainError;

/// RFC3339 timestamp guaranteed to be UTC.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct UtcTimestamp(OffsetDateTime);

impl UtcTimestamp {
    pub fn now() -> Self {
        Self(OffsetDateTime::now_utc())
    }

    pub fn parse(input: &str) -> Result<Self, DomainError> {
        let parsed =
            OffsetDateTime::parse(input, &Rfc3339).map_err(|_| DomainError::TimestampNotUtc {
                value: input.to_owned(),
            })?;

        if parsed.offset() != UtcOffset::UTC {
            return Err(DomainError::TimestampNotUtc {
                value: input.to_owned(),
            });
        }

        Ok(Self(parsed))
    }

    pub fn into_inner(self) -> OffsetDateTime {
        self.0
    }

    pub fn format_rfc3339(self) -> String {
        self.0
            .format(&Rfc3339)
            .expect("UtcTimestamp must be RFC3339 formattable")
    }
}

/// Whole years elapsed from a `YYYY-MM-DD` start date, rounded to one decimal.
///
/// Returns `None` when the date does not parse or lies in the future.
pub fn years_since(start_date: &str) -> Option<f32> {
    let mut parts = start_date.trim().splitn(3, '-');
    let year: i32 = parts.next()?.parse().ok()?;
    let month: u8 = parts.next()?.parse().ok()?;
    let day: u8 = parts.next()?.parse().ok()?;

    let month = time::Month::try_from(month).ok()?;
    let date = Date::from_calendar_date(year, month, day).ok()?;
    let today = OffsetDateTime::now_utc().date();
    let days = (today - date).whole_days();
    if days < 0 {
        return None;
    }
    Some(((days as f64 / 365.25) * 10.0).round() as f32 / 10.0)
}

impl Display for UtcTimestamp {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.format_rfc3339())
    }
}

impl Serialize for UtcTimestamp {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.format_rfc3339())
    }
}

impl<'de> Deserialize<'de> for UtcTimestamp {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = String::deserialize(deserializer)?;
        Self::parse(&value).map_err(D::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_utc_timestamp() {
        let parsed = UtcTimestamp::parse("2025-06-01T00:00:00Z").expect("must parse");
        assert_eq!(parsed.format_rfc3339(), "2025-06-01T00:00:00Z");
    }

    #[test]
    fn rejects_non_utc_timestamp() {
        let err = UtcTimestamp::parse("2025-06-01T01:00:00+01:00").expect_err("must fail");
        assert!(matches!(err, DomainError::TimestampNotUtc { .. }));
    }

    #[test]
    fn years_since_rejects_future_and_garbage() {
        assert_eq!(years_since("2999-01-01"), None);
        assert_eq!(years_since("not-a-date"), None);
    }

    #[test]
    fn years_since_counts_whole_years() {
        let tenure = years_since("2020-01-01").expect("date is in the past");
        assert!(tenure >= 4.0, "tenure {tenure} should be at least 4 years");
    }
}
