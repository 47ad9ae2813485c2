// src/core/bucket.rs
//
// Hour buckets and the column-label ordering built on them.

use std::fmt;

use chrono::{DateTime, NaiveDateTime, Utc};

/// Canonical label layout: minute and second are always literal zeros.
pub const LABEL_FORMAT: &str = "%Y-%m-%dT%H:00:00Z";

/// Naive layouts seen in older tables; read as UTC.
const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

/// Offset-carrying layouts that RFC 3339 parsing rejects (pandas writes the first).
const OFFSET_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S%:z", "%Y-%m-%d %H:%M:%S%z"];

/// A UTC instant floored to the hour. Column identity of the matrix.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimeBucket(DateTime<Utc>);

impl TimeBucket {
    pub fn floor(at: DateTime<Utc>) -> Self {
        let secs = at.timestamp();
        let floored = secs - secs.rem_euclid(3600);
        Self(DateTime::from_timestamp(floored, 0).unwrap_or(at))
    }

    pub fn now() -> Self {
        Self::floor(Utc::now())
    }

    /// Parse any supported timestamp layout and floor it.
    pub fn parse(label: &str) -> Option<Self> {
        parse_instant(label).map(Self::floor)
    }

    pub fn instant(&self) -> DateTime<Utc> {
        self.0
    }

    pub fn label(&self) -> String {
        self.0.format(LABEL_FORMAT).to_string()
    }

    /// `(YYYY, MM, DD, HH)` for hour-partitioned folder layouts.
    pub fn path_parts(&self) -> [String; 4] {
        [
            self.0.format("%Y").to_string(),
            self.0.format("%m").to_string(),
            self.0.format("%d").to_string(),
            self.0.format("%H").to_string(),
        ]
    }
}

impl fmt::Display for TimeBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format(LABEL_FORMAT))
    }
}

/// Best-effort timestamp parsing; `None` means "not a time label".
pub fn parse_instant(raw: &str) -> Option<DateTime<Utc>> {
    let s = raw.trim();
    if s.len() < 10 || !s.as_bytes()[0].is_ascii_digit() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in OFFSET_FORMATS {
        if let Ok(dt) = DateTime::parse_from_str(s, fmt) {
            return Some(dt.with_timezone(&Utc));
        }
    }
    let naive = s.trim_end_matches('Z');
    for fmt in NAIVE_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(naive, fmt) {
            return Some(dt.and_utc());
        }
    }
    None
}

pub fn is_time_label(label: &str) -> bool {
    parse_instant(label).is_some()
}

/// Rewrite a parseable label into canonical form; others pass through untouched.
pub fn canonical_label(label: &str) -> String {
    match TimeBucket::parse(label) {
        Some(b) => b.label(),
        None => label.to_string(),
    }
}

/// Chronological column order. Unparseable labels go last and keep their
/// relative order (the sort is stable).
pub fn sort_labels(labels: &mut [String]) {
    labels.sort_by_cached_key(|l| match TimeBucket::parse(l) {
        Some(b) => (0u8, Some(b)),
        None => (1u8, None),
    });
}

/// The chronologically last parseable label, if any.
pub fn latest_label(labels: &[String]) -> Option<&str> {
    labels
        .iter()
        .filter_map(|l| TimeBucket::parse(l).map(|b| (b, l)))
        .max_by_key(|(b, _)| *b)
        .map(|(_, l)| l.as_str())
}
