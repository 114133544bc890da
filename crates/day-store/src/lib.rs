//! Read-only access to the group-per-day Zarr store.
//!
//! One immutable group is published per calendar date under `YYYY/MM/DD`,
//! holding 1-D `lon`/`lat` coordinate axes and named 2-D f32 fields indexed
//! `[lat, lon]`. This crate also tracks the inclusive date range of published
//! groups via a small manifest file, falling back to a directory scan.

pub mod bounds;
pub mod store;
pub mod testdata;

pub use bounds::BoundsStore;
pub use store::{DayGroup, DayStore, FsDayStore};
