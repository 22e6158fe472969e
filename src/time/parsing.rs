//! Utility functions for parsing date/time strings into chrono types.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};

/// Naive layouts accepted when no offset is present. Such values are taken as UTC.
const NAIVE_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y:%m:%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
];

/// Which end of a date range a date-only filter value stands for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterBound {
    Start,
    End,
}

/// Parses the capture instant reported by the asset library.
///
/// Accepts RFC 3339 (`2024-06-01T10:00:00.000Z`), EXIF style with an offset
/// (`2024:06:01 19:00:00+09:00`) and offset-less values, which are read as UTC.
pub fn parse_capture_instant(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    DateTime::parse_from_rfc3339(s)
        .or_else(|_| DateTime::parse_from_str(s, "%Y:%m:%d %H:%M:%S%.f%:z"))
        .or_else(|_| DateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f%:z"))
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
        .or_else(|| parse_naive_utc(s))
}

/// Parses a `--taken-after` / `--taken-before` value.
///
/// A value without an offset is read as UTC. An [`FilterBound::End`] without an offset
/// that falls exactly on midnight (including a bare date) covers that whole day and
/// becomes `23:59:59.999999`. Values with an offset are taken verbatim.
pub fn parse_filter_bound(s: &str, bound: FilterBound) -> Option<DateTime<Utc>> {
    let s = s.trim();
    let naive = NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .map(|date| date.and_time(NaiveTime::MIN))
        .ok()
        .or_else(|| parse_naive(s));
    let Some(naive) = naive else {
        return parse_capture_instant(s);
    };
    if bound == FilterBound::End && naive.time() == NaiveTime::MIN {
        let end_of_day = NaiveTime::from_hms_micro_opt(23, 59, 59, 999_999)?;
        return Some(naive.date().and_time(end_of_day).and_utc());
    }
    Some(naive.and_utc())
}

fn parse_naive(s: &str) -> Option<NaiveDateTime> {
    NAIVE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
}

fn parse_naive_utc(s: &str) -> Option<DateTime<Utc>> {
    parse_naive(s).map(|naive| naive.and_utc())
}
