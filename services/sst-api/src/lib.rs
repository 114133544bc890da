//! GHRSST query service library.
//!
//! HTTP serving layer over the group-per-day Zarr store: point time-series
//! and single-day bbox queries for sea-surface fields.

use std::sync::Arc;

use axum::{routing::get, Extension, Router};
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::{compression::CompressionLayer, cors::CorsLayer, trace::TraceLayer};

pub mod assemble;
pub mod config;
pub mod handlers;
pub mod resolve;
pub mod state;

use state::AppState;

/// Build the service router. Kept out of `main` so integration tests can
/// serve the exact production routing over a scratch store.
pub fn build_router(state: Arc<AppState>, prometheus: Option<PrometheusHandle>) -> Router {
    Router::new()
        .route("/api/ghrsst", get(handlers::query::ghrsst_handler))
        .route("/health", get(handlers::health::health_handler))
        .route("/metrics", get(handlers::health::metrics_handler))
        .layer(Extension(state))
        .layer(Extension(prometheus))
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(CorsLayer::permissive())
}
