//! Service configuration from environment variables.

use std::path::PathBuf;

/// Runtime configuration for the query service.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Root of the group-per-day Zarr store.
    pub zarr_root: PathBuf,

    /// Bounds manifest path (`{"earliest": ..., "latest": ...}`).
    pub manifest_path: PathBuf,

    /// Maximum strided cells a bbox query may select.
    pub point_limit: u64,

    /// Maximum inclusive days in a point time-series span.
    pub max_span_days: u32,
}

impl ApiConfig {
    pub fn from_env() -> Self {
        let zarr_root = PathBuf::from(
            std::env::var("GHRSST_ZARR_PATH").unwrap_or_else(|_| "data/ghrsst".to_string()),
        );

        let manifest_path = std::env::var("GHRSST_INDEX_JSON")
            .map(PathBuf::from)
            .unwrap_or_else(|_| zarr_root.join("latest.json"));

        let point_limit = std::env::var("GHRSST_POINT_LIMIT")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(1_000_000);

        let max_span_days = std::env::var("GHRSST_MAX_SPAN_DAYS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(31);

        Self {
            zarr_root,
            manifest_path,
            point_limit,
            max_span_days,
        }
    }

    /// Config pointed at a scratch store, with production limits.
    pub fn for_root(root: impl Into<PathBuf>) -> Self {
        let zarr_root = root.into();
        let manifest_path = zarr_root.join("latest.json");
        Self {
            zarr_root,
            manifest_path,
            point_limit: 1_000_000,
            max_span_days: 31,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_for_root_defaults() {
        let config = ApiConfig::for_root("/tmp/sst");
        assert_eq!(config.manifest_path, PathBuf::from("/tmp/sst/latest.json"));
        assert_eq!(config.point_limit, 1_000_000);
        assert_eq!(config.max_span_days, 31);
    }
}
