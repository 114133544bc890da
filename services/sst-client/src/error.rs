//! Client-side error taxonomy and response classification.

use chrono::NaiveDate;
use thiserror::Error;

use sst_common::{parse_date, ErrorBody};

/// Errors surfaced by retrieval operations.
#[derive(Debug, Clone, Error)]
pub enum RetrievalError {
    /// Request rejected before any network activity.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// The service has no data for the request; carries the published date
    /// range when the service reported one.
    #[error("no data: {detail}")]
    NotFound {
        detail: String,
        earliest: Option<NaiveDate>,
        latest: Option<NaiveDate>,
    },

    /// The selection exceeded the service's point budget.
    #[error("point budget exceeded: {detail}")]
    TooManyPoints { detail: String },

    /// Non-retryable service error, or a retryable one after exhausting
    /// the retry budget.
    #[error("service error ({status}): {detail}")]
    Backend { status: u16, detail: String },

    /// Connection-level failure after exhausting the retry budget.
    #[error("transport error: {0}")]
    Transport(String),

    /// The service answered with a body this client cannot use.
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    #[error("operation cancelled")]
    Cancelled,
}

/// Classify a non-2xx response into a retrieval error.
///
/// Structured `earliest`/`latest` fields are preferred; when absent the
/// `detail` text is scanned for dates as a compatibility shim for older
/// servers that only report the range in prose.
pub fn classify_response(status: u16, body: Option<ErrorBody>) -> RetrievalError {
    let detail = body
        .as_ref()
        .map(|b| b.detail.clone())
        .unwrap_or_else(|| format!("HTTP {status}"));

    if detail.starts_with("Too many points") {
        return RetrievalError::TooManyPoints { detail };
    }

    if detail.starts_with("Data not exist") || detail == "No available dates." {
        let (earliest, latest) = match body {
            Some(ErrorBody {
                earliest: Some(e),
                latest: Some(l),
                ..
            }) => (Some(e), Some(l)),
            _ => match extract_date_range(&detail) {
                Some((e, l)) => (Some(e), Some(l)),
                None => (None, None),
            },
        };
        return RetrievalError::NotFound {
            detail,
            earliest,
            latest,
        };
    }

    RetrievalError::Backend { status, detail }
}

/// Pull the first two `YYYY-MM-DD` dates out of free text.
///
/// Last-resort fallback only; the scan accepts any 10-byte window that
/// chrono parses, so prose changes upstream can silently break it.
pub fn extract_date_range(text: &str) -> Option<(NaiveDate, NaiveDate)> {
    let bytes = text.as_bytes();
    let mut found = Vec::new();
    let mut i = 0;
    while i + 10 <= bytes.len() && found.len() < 2 {
        if let Some(window) = text.get(i..i + 10) {
            if let Ok(date) = parse_date(window) {
                found.push(date);
                i += 10;
                continue;
            }
        }
        i += 1;
    }
    match found.as_slice() {
        [a, b] => Some((*a, *b)),
        [a] => Some((*a, *a)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    #[test]
    fn test_extract_date_range() {
        assert_eq!(
            extract_date_range("available date range is 2025-10-01/2025-10-05."),
            Some((d("2025-10-01"), d("2025-10-05")))
        );
        assert_eq!(
            extract_date_range("available date is 2025-10-03."),
            Some((d("2025-10-03"), d("2025-10-03")))
        );
        assert_eq!(extract_date_range("no dates here"), None);
    }

    #[test]
    fn test_classify_prefers_structured_range() {
        let body = ErrorBody {
            detail: "Data not exist, available date is 1999-01-01/1999-01-02.".to_string(),
            earliest: Some(d("2025-10-01")),
            latest: Some(d("2025-10-05")),
        };
        match classify_response(400, Some(body)) {
            RetrievalError::NotFound {
                earliest, latest, ..
            } => {
                assert_eq!(earliest, Some(d("2025-10-01")));
                assert_eq!(latest, Some(d("2025-10-05")));
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_classify_falls_back_to_textual_scan() {
        let body = ErrorBody {
            detail: "Data not exist for requested period; available date range is \
                     2025-10-01/2025-10-05."
                .to_string(),
            earliest: None,
            latest: None,
        };
        match classify_response(400, Some(body)) {
            RetrievalError::NotFound {
                earliest, latest, ..
            } => {
                assert_eq!(earliest, Some(d("2025-10-01")));
                assert_eq!(latest, Some(d("2025-10-05")));
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_classify_no_available_dates() {
        let body = ErrorBody {
            detail: "No available dates.".to_string(),
            earliest: None,
            latest: None,
        };
        assert!(matches!(
            classify_response(503, Some(body)),
            RetrievalError::NotFound {
                earliest: None,
                latest: None,
                ..
            }
        ));
    }

    #[test]
    fn test_classify_too_many_points() {
        let body = ErrorBody {
            detail: "Too many points (4000000). Increase 'sample' or shrink bbox \
                     (limit 1000000)."
                .to_string(),
            earliest: None,
            latest: None,
        };
        assert!(matches!(
            classify_response(400, Some(body)),
            RetrievalError::TooManyPoints { .. }
        ));
    }

    #[test]
    fn test_classify_other_errors_are_backend() {
        assert!(matches!(
            classify_response(500, None),
            RetrievalError::Backend { status: 500, .. }
        ));
        let body = ErrorBody {
            detail: "Invalid date format. Use YYYY-MM-DD.".to_string(),
            earliest: None,
            latest: None,
        };
        assert!(matches!(
            classify_response(400, Some(body)),
            RetrievalError::Backend { status: 400, .. }
        ));
    }
}
