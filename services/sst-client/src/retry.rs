//! Bounded retry state machines.
//!
//! Policy decisions live here as plain data types; the client drives them
//! with network calls. Every machine terminates: the backoff and stride
//! search carry attempt budgets, and nearest-date fallback substitutes at
//! most once.

use chrono::NaiveDate;
use std::time::Duration;

use sst_common::days_between;

/// HTTP statuses worth retrying at the transport level.
pub fn is_retryable_status(status: u16) -> bool {
    matches!(status, 429 | 500 | 502 | 503 | 504)
}

/// Exponential backoff over a fixed attempt budget.
///
/// With 3 attempts and a 750ms base the delays are 750ms then 1.5s; the
/// third failure exhausts the budget.
#[derive(Debug, Clone)]
pub struct Backoff {
    attempt: u32,
    max_attempts: u32,
    initial: Duration,
}

impl Backoff {
    pub fn new(max_attempts: u32, initial: Duration) -> Self {
        Self {
            attempt: 0,
            max_attempts: max_attempts.max(1),
            initial,
        }
    }

    /// Delay to sleep before the next attempt, or `None` when the budget
    /// is spent.
    pub fn next_delay(&mut self) -> Option<Duration> {
        if self.attempt + 1 >= self.max_attempts {
            return None;
        }
        let delay = self.initial * 2u32.saturating_pow(self.attempt);
        self.attempt += 1;
        Some(delay)
    }
}

/// Stride estimate for a bbox before the first request: aim the expected
/// cell count under the service's point budget.
pub fn initial_stride(
    width_deg: f64,
    height_deg: f64,
    deg_per_cell: f64,
    point_limit: u64,
) -> usize {
    let cols = (width_deg.abs() / deg_per_cell).max(1.0);
    let rows = (height_deg.abs() / deg_per_cell).max(1.0);
    let ratio = (cols * rows) / point_limit.max(1) as f64;
    if ratio <= 1.0 {
        1
    } else {
        ratio.sqrt().ceil() as usize
    }
}

/// Adaptive stride search: double on budget rejection, bounded attempts,
/// reset when the query moves to a different day.
#[derive(Debug, Clone)]
pub struct StrideSearch {
    initial: usize,
    stride: usize,
    attempts: u32,
    max_attempts: u32,
}

impl StrideSearch {
    pub fn new(initial_stride: usize, max_attempts: u32) -> Self {
        let initial = initial_stride.max(1);
        Self {
            initial,
            stride: initial,
            attempts: 1,
            max_attempts: max_attempts.max(1),
        }
    }

    pub fn stride(&self) -> usize {
        self.stride
    }

    /// Record a point-budget rejection and double the stride. Returns
    /// `false` when the attempt budget is exhausted.
    pub fn widen(&mut self) -> bool {
        if self.attempts >= self.max_attempts {
            return false;
        }
        self.attempts += 1;
        self.stride = self.stride.saturating_mul(2);
        true
    }

    /// A substituted day is a different grid; restart from the initial
    /// estimate with a fresh attempt budget.
    pub fn reset(&mut self) {
        self.stride = self.initial;
        self.attempts = 1;
    }

    pub fn attempts_used(&self) -> u32 {
        self.attempts
    }
}

/// Outcome of weighing a nearest-date substitution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NearestDecision {
    /// Retry once with this day.
    Substitute(NaiveDate),
    /// The published range is too far from the request.
    OutOfTolerance {
        nearest: NaiveDate,
        distance_days: i64,
    },
}

/// Pick the published bound chronologically closest to `requested`
/// (ties go to `earliest`) and substitute only within `tolerance_days`.
pub fn nearest_available(
    requested: NaiveDate,
    earliest: NaiveDate,
    latest: NaiveDate,
    tolerance_days: i64,
) -> NearestDecision {
    let to_earliest = days_between(requested, earliest);
    let to_latest = days_between(requested, latest);

    let (nearest, distance) = if to_earliest <= to_latest {
        (earliest, to_earliest)
    } else {
        (latest, to_latest)
    };

    if distance <= tolerance_days {
        NearestDecision::Substitute(nearest)
    } else {
        NearestDecision::OutOfTolerance {
            nearest,
            distance_days: distance,
        }
    }
}
