//! Resilient retrieval client for the GHRSST query service.
//!
//! Wraps the HTTP API with transport retry, nearest-date fallback for
//! missing days, and an adaptive stride search for bbox aggregation. All
//! retry policies are bounded and expressed as explicit state machines in
//! [`retry`], so they are testable without a network.

pub mod client;
pub mod config;
pub mod error;
pub mod retry;

pub use client::{BboxMean, BboxRequest, FallbackMethod, PointRequest, PointValue, RetrievalClient};
pub use config::ClientConfig;
pub use error::RetrievalError;
