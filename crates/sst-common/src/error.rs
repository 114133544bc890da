//! Error types for sst-services.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias using SstError.
pub type SstResult<T> = Result<T, SstError>;

/// Primary error type for query operations.
///
/// The `#[error]` strings are the wire `detail` text; the retrieval client
/// matches on some of these phrases, so they must stay stable.
#[derive(Debug, Clone, Error)]
pub enum SstError {
    // === Request errors ===
    #[error("Invalid date format. Use YYYY-MM-DD.")]
    InvalidDateFormat(String),

    #[error("Invalid parameter value for '{param}': {message}")]
    InvalidParameter { param: String, message: String },

    #[error("Unsupported field(s): {bad}. Allowed: {allowed}")]
    UnsupportedField { bad: String, allowed: String },

    #[error("Unsupported mode(s): {bad}. Allowed: {allowed}")]
    UnsupportedMode { bad: String, allowed: String },

    #[error("Too many points ({total}). Increase 'sample' or shrink bbox (limit {limit}).")]
    TooManyPoints { total: u64, limit: u64 },

    // === Data availability errors ===
    #[error("No available dates.")]
    NoAvailableDates,

    #[error("Data not exist for requested period; available date range is {earliest}/{latest}.")]
    NoDataInSpan {
        earliest: NaiveDate,
        latest: NaiveDate,
    },

    #[error("Data not exist, available date is {earliest}/{latest}.")]
    BboxSingleDayUnavailable {
        earliest: NaiveDate,
        latest: NaiveDate,
    },

    // === Infrastructure errors ===
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl SstError {
    /// Get the HTTP status code for this error.
    pub fn http_status_code(&self) -> u16 {
        match self {
            SstError::InvalidDateFormat(_)
            | SstError::InvalidParameter { .. }
            | SstError::UnsupportedField { .. }
            | SstError::UnsupportedMode { .. }
            | SstError::TooManyPoints { .. }
            | SstError::NoDataInSpan { .. }
            | SstError::BboxSingleDayUnavailable { .. } => 400,

            SstError::NoAvailableDates => 503,

            SstError::Storage(_) | SstError::Internal(_) => 500,
        }
    }

    /// The valid date range this error reports, if any.
    pub fn bounds(&self) -> Option<(NaiveDate, NaiveDate)> {
        match self {
            SstError::NoDataInSpan { earliest, latest }
            | SstError::BboxSingleDayUnavailable { earliest, latest } => {
                Some((*earliest, *latest))
            }
            _ => None,
        }
    }
}

impl From<std::io::Error> for SstError {
    fn from(err: std::io::Error) -> Self {
        SstError::Storage(err.to_string())
    }
}

/// JSON error payload returned by the serving layer.
///
/// `earliest`/`latest` carry the valid date range as structured fields so
/// clients do not have to scrape `detail` for dates.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub detail: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub earliest: Option<NaiveDate>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub latest: Option<NaiveDate>,
}

impl From<&SstError> for ErrorBody {
    fn from(err: &SstError) -> Self {
        let (earliest, latest) = match err.bounds() {
            Some((e, l)) => (Some(e), Some(l)),
            None => (None, None),
        };
        ErrorBody {
            detail: err.to_string(),
            earliest,
            latest,
        }
    }
}
