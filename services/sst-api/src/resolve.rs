//! Requested dates to servable days.
//!
//! Pure functions: availability is injected as an `exists` predicate so the
//! rules are testable without a store on disk.

use chrono::{Duration, NaiveDate};

use sst_common::{date_range_inclusive, Bounds, SstError, SstResult};

/// Resolve a point-query date span to the existing days inside it.
///
/// Missing endpoints default to each other, and to the latest published day
/// when both are absent. Endpoints are swapped if inverted, clamped into the
/// published range, and the span is capped at `max_span_days` inclusive days
/// counted from the clamped start. Days without a published group are
/// silently skipped; an all-missing span is an error carrying the published
/// range.
pub fn resolve_point_days(
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
    bounds: Bounds,
    max_span_days: u32,
    exists: impl Fn(NaiveDate) -> bool,
) -> SstResult<Vec<NaiveDate>> {
    let (start, end) = match (start, end) {
        (None, None) => (bounds.latest, bounds.latest),
        (Some(s), None) => (s, s),
        (None, Some(e)) => (e, e),
        (Some(s), Some(e)) => (s, e),
    };
    let (start, end) = if start <= end { (start, end) } else { (end, start) };

    let start = bounds.clamp(start);
    let end = bounds.clamp(end);
    let cap = start + Duration::days(i64::from(max_span_days.max(1)) - 1);
    let end = end.min(cap);

    let days: Vec<NaiveDate> = date_range_inclusive(start, end)
        .into_iter()
        .filter(|d| exists(*d))
        .collect();

    if days.is_empty() {
        return Err(SstError::NoDataInSpan {
            earliest: bounds.earliest,
            latest: bounds.latest,
        });
    }
    Ok(days)
}

/// Resolve the single day a bbox query reads.
///
/// `start` wins when both endpoints are given. Unlike the point path there is
/// no substitution: the day must be inside the published range and actually
/// exist, or the query fails with the published range.
pub fn resolve_bbox_day(
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
    bounds: Bounds,
    exists: impl Fn(NaiveDate) -> bool,
) -> SstResult<NaiveDate> {
    let day = start.or(end).unwrap_or(bounds.latest);
    if !bounds.contains(day) || !exists(day) {
        return Err(SstError::BboxSingleDayUnavailable {
            earliest: bounds.earliest,
            latest: bounds.latest,
        });
    }
    Ok(day)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    fn bounds() -> Bounds {
        Bounds::new(d("2025-10-01"), d("2025-10-10"))
    }

    #[test]
    fn test_point_defaults_to_latest() {
        let days = resolve_point_days(None, None, bounds(), 31, |_| true).unwrap();
        assert_eq!(days, vec![d("2025-10-10")]);
    }

    #[test]
    fn test_point_single_endpoint_defaults_to_other() {
        let days =
            resolve_point_days(Some(d("2025-10-03")), None, bounds(), 31, |_| true).unwrap();
        assert_eq!(days, vec![d("2025-10-03")]);

        let days =
            resolve_point_days(None, Some(d("2025-10-04")), bounds(), 31, |_| true).unwrap();
        assert_eq!(days, vec![d("2025-10-04")]);
    }

    #[test]
    fn test_point_swaps_inverted_endpoints() {
        let days = resolve_point_days(
            Some(d("2025-10-05")),
            Some(d("2025-10-03")),
            bounds(),
            31,
            |_| true,
        )
        .unwrap();
        assert_eq!(days, vec![d("2025-10-03"), d("2025-10-04"), d("2025-10-05")]);
    }

    #[test]
    fn test_point_clamps_to_published_range() {
        let days = resolve_point_days(
            Some(d("2025-09-20")),
            Some(d("2025-10-02")),
            bounds(),
            31,
            |_| true,
        )
        .unwrap();
        assert_eq!(days.first(), Some(&d("2025-10-01")));
        assert_eq!(days.last(), Some(&d("2025-10-02")));
    }

    #[test]
    fn test_point_caps_span_from_clamped_start() {
        let wide = Bounds::new(d("2025-01-01"), d("2025-12-31"));
        let days = resolve_point_days(
            Some(d("2025-03-01")),
            Some(d("2025-06-01")),
            wide,
            31,
            |_| true,
        )
        .unwrap();
        assert_eq!(days.len(), 31);
        assert_eq!(days.first(), Some(&d("2025-03-01")));
        assert_eq!(days.last(), Some(&d("2025-03-31")));
    }

    #[test]
    fn test_point_skips_missing_days() {
        let days = resolve_point_days(
            Some(d("2025-10-01")),
            Some(d("2025-10-04")),
            bounds(),
            31,
            |day| day != d("2025-10-02"),
        )
        .unwrap();
        assert_eq!(days, vec![d("2025-10-01"), d("2025-10-03"), d("2025-10-04")]);
    }

    #[test]
    fn test_point_all_missing_reports_range() {
        let err = resolve_point_days(
            Some(d("2025-10-02")),
            Some(d("2025-10-04")),
            bounds(),
            31,
            |_| false,
        )
        .unwrap_err();
        match err {
            SstError::NoDataInSpan { earliest, latest } => {
                assert_eq!(earliest, d("2025-10-01"));
                assert_eq!(latest, d("2025-10-10"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_bbox_start_wins() {
        let day = resolve_bbox_day(
            Some(d("2025-10-02")),
            Some(d("2025-10-08")),
            bounds(),
            |_| true,
        )
        .unwrap();
        assert_eq!(day, d("2025-10-02"));
    }

    #[test]
    fn test_bbox_defaults_to_latest() {
        let day = resolve_bbox_day(None, None, bounds(), |_| true).unwrap();
        assert_eq!(day, d("2025-10-10"));
    }

    #[test]
    fn test_bbox_never_substitutes() {
        // In range but not published: hard error, no nearest-day fallback.
        let err = resolve_bbox_day(Some(d("2025-10-05")), None, bounds(), |_| false).unwrap_err();
        assert!(matches!(err, SstError::BboxSingleDayUnavailable { .. }));

        // Out of range entirely.
        let err = resolve_bbox_day(Some(d("2025-11-05")), None, bounds(), |_| true).unwrap_err();
        assert!(matches!(err, SstError::BboxSingleDayUnavailable { .. }));
    }
}
