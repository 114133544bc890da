//! Point-budget enforcement for strided region queries.

use sst_common::SstError;

use crate::bbox::IndexRange;

/// Number of samples taken from an inclusive index span at a given stride:
/// `(hi - lo) / stride + 1`.
pub fn strided_count(range: &IndexRange, stride: usize) -> u64 {
    let stride = stride.max(1) as u64;
    (range.hi - range.lo) as u64 / stride + 1
}

/// Enforce the point ceiling for a strided bbox selection.
///
/// Returns the total cell count on success; callers are expected to raise
/// `sample` or shrink the bbox on failure.
pub fn check_budget(
    cols: &IndexRange,
    rows: &IndexRange,
    stride: usize,
    limit: u64,
) -> Result<u64, SstError> {
    let total = strided_count(cols, stride) * strided_count(rows, stride);
    if total > limit {
        return Err(SstError::TooManyPoints { total, limit });
    }
    Ok(total)
}
