// ABOUTME: Shared utility functions for Hill
// ABOUTME: Job ID generation and fixed-width timestamp encoding

use chrono::{DateTime, SecondsFormat, Utc};

/// Generate a unique job ID (`job_` + 32 hex characters)
pub fn generate_job_id() -> String {
    format!("job_{}", uuid::Uuid::new_v4().simple())
}

/// Encode a timestamp as fixed-width RFC 3339 UTC with microsecond precision.
///
/// Every stored timestamp has the same width, so SQL string comparison and
/// `ORDER BY` agree with chronological order.
pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    #[test]
    fn test_generate_job_id() {
        let id1 = generate_job_id();
        let id2 = generate_job_id();

        assert!(id1.starts_with("job_"));
        assert_eq!(id1.len(), 36);
        assert_ne!(id1, id2);
    }

    #[test]
    fn test_timestamps_sort_lexicographically() {
        let early = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let late = early + Duration::microseconds(1500);

        let a = format_timestamp(&early);
        let b = format_timestamp(&late);

        assert_eq!(a.len(), b.len());
        assert!(a < b);
        assert_eq!(parse_timestamp(&b), Some(late));
    }

    #[test]
    fn test_parse_timestamp_rejects_garbage() {
        assert_eq!(parse_timestamp("yesterday"), None);
    }
}
