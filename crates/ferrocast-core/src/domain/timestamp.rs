use std::fmt::{Display, Formatter};

use serde::de::Error as DeError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use time::{Date, OffsetDateTime, PrimitiveDateTime, Time, UtcOffset};

use crate::ValidationError;

/// RFC3339 timestamp guaranteed to be UTC.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct UtcDateTime(OffsetDateTime);

impl UtcDateTime {
    pub fn now() -> Self {
        Self(OffsetDateTime::now_utc())
    }

    /// Parse an RFC3339 UTC timestamp, or a bare `YYYY-MM-DD` date taken as midnight UTC.
    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        let trimmed = input.trim();
        if let Ok(date) = Date::parse(trimmed, format_description!("[year]-[month]-[day]")) {
            return Ok(Self::from_date(date));
        }

        let parsed = OffsetDateTime::parse(trimmed, &Rfc3339).map_err(|_| {
            ValidationError::TimestampNotUtc {
                value: input.to_owned(),
            }
        })?;

        Self::from_offset_datetime(parsed).map_err(|_| ValidationError::TimestampNotUtc {
            value: input.to_owned(),
        })
    }

    pub fn from_offset_datetime(value: OffsetDateTime) -> Result<Self, ValidationError> {
        if value.offset() != UtcOffset::UTC {
            return Err(ValidationError::TimestampNotUtc {
                value: value
                    .format(&Rfc3339)
                    .unwrap_or_else(|_| String::from("<unformattable>")),
            });
        }

        Ok(Self(value))
    }

    pub fn from_unix_timestamp(seconds: i64) -> Result<Self, ValidationError> {
        OffsetDateTime::from_unix_timestamp(seconds)
            .map(Self)
            .map_err(|_| ValidationError::TimestampOutOfRange { value: seconds })
    }

    /// Midnight UTC on the given calendar date.
    pub fn from_date(date: Date) -> Self {
        Self(PrimitiveDateTime::new(date, Time::MIDNIGHT).assume_utc())
    }

    /// UTC calendar date, ignoring the time of day.
    pub fn date(self) -> Date {
        self.0.date()
    }

    pub fn unix_timestamp(self) -> i64 {
        self.0.unix_timestamp()
    }

    /// Whole days elapsed from `self` to `later`, truncated toward zero.
    pub fn whole_days_until(self, later: Self) -> i64 {
        (later.0 - self.0).whole_days()
    }

    pub fn into_inner(self) -> OffsetDateTime {
        self.0
    }

    pub fn format_rfc3339(self) -> String {
        self.0
            .format(&Rfc3339)
            .unwrap_or_else(|_| self.0.unix_timestamp().to_string())
    }
}

impl Display for UtcDateTime {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.format_rfc3339())
    }
}

impl Serialize for UtcDateTime {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.format_rfc3339())
    }
}

impl<'de> Deserialize<'de> for UtcDateTime {
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
    use time::Month;

    use super::*;

    #[test]
    fn parses_utc_timestamp() {
        let parsed = UtcDateTime::parse("2024-01-01T00:00:00Z").expect("must parse");
        assert_eq!(parsed.format_rfc3339(), "2024-01-01T00:00:00Z");
    }

    #[test]
    fn parses_bare_date_as_midnight() {
        let parsed = UtcDateTime::parse("2024-03-05").expect("must parse");
        assert_eq!(parsed.format_rfc3339(), "2024-03-05T00:00:00Z");
        assert_eq!(
            parsed.date(),
            Date::from_calendar_date(2024, Month::March, 5).expect("valid date")
        );
    }

    #[test]
    fn rejects_non_utc_timestamp() {
        let err = UtcDateTime::parse("2024-01-01T01:00:00+01:00").expect_err("must fail");
        assert!(matches!(err, ValidationError::TimestampNotUtc { .. }));
    }

    #[test]
    fn counts_whole_days_ignoring_partial_days() {
        let start = UtcDateTime::parse("2024-01-01T00:00:00Z").expect("must parse");
        let end = UtcDateTime::parse("2024-01-03T23:00:00Z").expect("must parse");
        assert_eq!(start.whole_days_until(end), 2);
    }
}
