//! Time related utils.

use crate::{Error, Result};
use chrono::Utc;

/// DateTime used across awsauth, always in UTC.
pub type DateTime = chrono::DateTime<Utc>;

/// Create a new DateTime with now.
pub fn now() -> DateTime {
    Utc::now()
}

/// Format time into date: `20220301`
pub fn format_date(t: DateTime) -> String {
    t.format("%Y%m%d").to_string()
}

/// Format time into ISO 8601 basic format: `20220313T072004Z`
pub fn format_iso8601(t: DateTime) -> String {
    t.format("%Y%m%dT%H%M%SZ").to_string()
}

/// Format time into RFC 3339: `2022-03-13T07:20:04Z`
pub fn format_rfc3339(t: DateTime) -> String {
    t.to_rfc3339_opts(chrono::SecondsFormat::Secs, true)
}

/// Parse time from RFC 3339, e.g. the `Expiration` field returned by IMDS.
pub fn parse_rfc3339(s: &str) -> Result<DateTime> {
    chrono::DateTime::parse_from_rfc3339(s)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| {
            Error::unexpected("failed to parse rfc3339 time")
                .with_source(e)
                .with_context(format!("value: {s}"))
        })
}
