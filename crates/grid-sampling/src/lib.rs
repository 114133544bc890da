//! Grid index mapping and subsampling arithmetic.
//!
//! Maps continuous lon/lat coordinates onto nearest indices of a day group's
//! 1-D axes, normalizes bounding boxes against the axis extents, and enforces
//! the point budget for strided region queries.

pub mod bbox;
pub mod budget;
pub mod index;

pub use bbox::{Bbox, IndexRange};
pub use budget::{check_budget, strided_count};
pub use index::{axis_extents, clamp, nearest_index};
