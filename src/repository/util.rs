//! Repository utilities.

use chrono::{DateTime, SecondsFormat, Utc};
use diesel::result::DatabaseErrorInformation;

/// Message-only error info, for failures that happen before SQLite answers.
#[derive(Debug)]
struct MessageOnly(String);

impl DatabaseErrorInformation for MessageOnly {
    fn message(&self) -> &str {
        &self.0
    }
    fn details(&self) -> Option<&str> {
        None
    }
    fn hint(&self) -> Option<&str> {
        None
    }
    fn table_name(&self) -> Option<&str> {
        None
    }
    fn column_name(&self) -> Option<&str> {
        None
    }
    fn constraint_name(&self) -> Option<&str> {
        None
    }
    fn statement_position(&self) -> Option<i32> {
        None
    }
}

/// Wrap a connection failure so it travels as a diesel error.
pub fn to_diesel_error(e: impl std::fmt::Display) -> diesel::result::Error {
    diesel::result::Error::DatabaseError(
        diesel::result::DatabaseErrorKind::Unknown,
        Box::new(MessageOnly(e.to_string())),
    )
}

/// Format a timestamp for storage.
///
/// Fixed-width UTC with microseconds, so that text ordering in SQL matches
/// chronological ordering.
pub fn format_datetime(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Parse a datetime string from the database, defaulting to Unix epoch on error.
pub fn parse_datetime(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or(DateTime::UNIX_EPOCH)
}

/// Parse an optional datetime string from the database.
pub fn parse_datetime_opt(s: Option<String>) -> Option<DateTime<Utc>> {
    s.and_then(|s| {
        DateTime::parse_from_rfc3339(&s)
            .map(|dt| dt.with_timezone(&Utc))
            .ok()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_format_is_sortable() {
        let early = Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap();
        let late = early + chrono::Duration::milliseconds(1500);

        let a = format_datetime(early);
        let b = format_datetime(late);
        assert_eq!(a, "2024-01-02T03:04:05.000000Z");
        assert!(a < b);
        assert_eq!(parse_datetime(&b), late);
    }

    #[test]
    fn test_parse_invalid_datetime() {
        assert_eq!(parse_datetime("garbage"), DateTime::UNIX_EPOCH);
        assert_eq!(parse_datetime_opt(None), None);
        assert_eq!(parse_datetime_opt(Some("garbage".into())), None);
    }
}
