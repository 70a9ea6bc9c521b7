//! Event date parsing.
//!
//! Accepted inputs: RFC 3339 (`2030-05-01T18:00:00Z`), a naive
//! `YYYY-MM-DDTHH:MM[:SS]` as produced by browser `datetime-local` inputs,
//! and a bare `YYYY-MM-DD`. Naive values are interpreted as UTC.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

const NAIVE_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M"];

/// Parse a client-supplied date string. Returns `None` when no format matches.
pub fn parse_event_date(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }

    for fmt in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(naive.and_utc());
        }
    }

    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// True when `date` lies strictly after `now`.
pub fn is_future(date: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    date > now
}
