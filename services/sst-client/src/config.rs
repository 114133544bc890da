//! Client configuration from environment variables.

use std::time::Duration;

/// Retrieval client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the query service.
    pub base_url: String,

    /// Per-request HTTP timeout.
    pub request_timeout: Duration,

    /// Transport attempt budget (first try included).
    pub max_retries: u32,

    /// Base delay of the exponential backoff.
    pub initial_backoff: Duration,

    /// Attempt budget for the bbox stride search.
    pub max_sample_attempts: u32,

    /// Grid resolution assumed when estimating the initial stride.
    pub deg_per_cell: f64,

    /// Farthest substitution the nearest-date fallback will make.
    pub nearest_tolerance_days: i64,

    /// Service point budget assumed when estimating the initial stride.
    pub point_limit: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080".to_string(),
            request_timeout: Duration::from_secs(30),
            max_retries: 3,
            initial_backoff: Duration::from_millis(750),
            max_sample_attempts: 4,
            deg_per_cell: 0.01,
            nearest_tolerance_days: 7,
            point_limit: 1_000_000,
        }
    }
}

impl ClientConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let base_url =
            std::env::var("GHRSST_API_URL").unwrap_or(defaults.base_url);

        let request_timeout = std::env::var("GHRSST_CLIENT_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .map(Duration::from_secs)
            .unwrap_or(defaults.request_timeout);

        let nearest_tolerance_days = std::env::var("GHRSST_NEAREST_TOLERANCE_DAYS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(defaults.nearest_tolerance_days);

        Self {
            base_url,
            request_timeout,
            nearest_tolerance_days,
            ..defaults
        }
    }

    /// Defaults pointed at a specific server; used heavily by tests.
    pub fn for_base_url(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }
}
