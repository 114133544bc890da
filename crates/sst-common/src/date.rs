//! Calendar-date plumbing for daily groups.
//!
//! All dates on the wire use `YYYY-MM-DD`. That form sorts lexicographically
//! in chronological order, which the bounds scan relies on.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::SstError;

/// Inclusive date range of published daily groups.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bounds {
    pub earliest: NaiveDate,
    pub latest: NaiveDate,
}

impl Bounds {
    pub fn new(earliest: NaiveDate, latest: NaiveDate) -> Self {
        debug_assert!(earliest <= latest);
        Self { earliest, latest }
    }

    pub fn contains(&self, day: NaiveDate) -> bool {
        self.earliest <= day && day <= self.latest
    }

    /// Clamp a date into the range.
    pub fn clamp(&self, day: NaiveDate) -> NaiveDate {
        day.max(self.earliest).min(self.latest)
    }
}

/// Parse a strict `YYYY-MM-DD` date string.
pub fn parse_date(s: &str) -> Result<NaiveDate, SstError> {
    let bytes = s.as_bytes();
    // chrono accepts unpadded month/day; the wire format does not.
    if bytes.len() != 10 || bytes[4] != b'-' || bytes[7] != b'-' {
        return Err(SstError::InvalidDateFormat(s.to_string()));
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .map_err(|_| SstError::InvalidDateFormat(s.to_string()))
}

/// Every date from `start` to `end`, inclusive.
pub fn date_range_inclusive(start: NaiveDate, end: NaiveDate) -> Vec<NaiveDate> {
    start.iter_days().take_while(|d| *d <= end).collect()
}

/// Absolute distance between two dates in whole days.
pub fn days_between(a: NaiveDate, b: NaiveDate) -> i64 {
    (a - b).num_days().abs()
}

/// Relative store path for a day's group: `YYYY/MM/DD`.
pub fn day_path(day: NaiveDate) -> String {
    day.format("%Y/%m/%d").to_string()
}
