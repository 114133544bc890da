//! Application state for the query service.

use std::sync::Arc;

use anyhow::Result;

use day_store::{BoundsStore, DayStore, FsDayStore};

use crate::config::ApiConfig;

/// Shared application state.
pub struct AppState {
    /// Day-group storage.
    pub store: Arc<dyn DayStore>,

    /// Published date-range tracker.
    pub bounds: Arc<BoundsStore>,

    pub config: ApiConfig,
}

impl AppState {
    /// Open the configured store and take an initial bounds snapshot.
    ///
    /// An empty store is not a startup error; queries report
    /// "No available dates." until groups appear.
    pub async fn new(config: ApiConfig) -> Result<Self> {
        let store = Arc::new(FsDayStore::new(&config.zarr_root)?);
        let bounds = Arc::new(BoundsStore::new(&config.zarr_root, &config.manifest_path));

        match bounds.load().await {
            Some(b) => {
                tracing::info!(
                    earliest = %b.earliest,
                    latest = %b.latest,
                    root = %config.zarr_root.display(),
                    "store opened"
                );
            }
            None => {
                tracing::warn!(
                    root = %config.zarr_root.display(),
                    "store opened with no published days"
                );
            }
        }

        Ok(Self {
            store,
            bounds,
            config,
        })
    }
}
