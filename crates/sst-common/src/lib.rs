//! Shared types for the sst-services workspace.

pub mod date;
pub mod error;
pub mod field;

pub use date::{date_range_inclusive, day_path, days_between, parse_date, Bounds};
pub use error::{ErrorBody, SstError, SstResult};
pub use field::{parse_append, parse_modes, Field, ResponseMode};
