//! Bounding-box normalization and index mapping.

use crate::index::{axis_extents, clamp, nearest_index};

/// Inclusive index span along one axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexRange {
    pub lo: usize,
    pub hi: usize,
}

impl IndexRange {
    pub fn new(a: usize, b: usize) -> Self {
        // Mapped endpoints can invert near axis boundaries; swap after mapping.
        if a <= b {
            Self { lo: a, hi: b }
        } else {
            Self { lo: b, hi: a }
        }
    }

    /// Iterate the range with a stride.
    pub fn strided(&self, stride: usize) -> impl Iterator<Item = usize> {
        (self.lo..=self.hi).step_by(stride.max(1))
    }
}

/// A lon/lat rectangle request.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bbox {
    pub lon0: f64,
    pub lat0: f64,
    pub lon1: f64,
    pub lat1: f64,
}

impl Bbox {
    /// Reorder corners so `lon0 <= lon1` and `lat0 <= lat1`.
    pub fn normalized(&self) -> Bbox {
        let (lon0, lon1) = if self.lon1 >= self.lon0 {
            (self.lon0, self.lon1)
        } else {
            (self.lon1, self.lon0)
        };
        let (lat0, lat1) = if self.lat1 >= self.lat0 {
            (self.lat0, self.lat1)
        } else {
            (self.lat1, self.lat0)
        };
        Bbox { lon0, lat0, lon1, lat1 }
    }

    /// Degenerate boxes (equal corners) are treated as point queries.
    pub fn is_degenerate(&self) -> bool {
        self.lon0 == self.lon1 && self.lat0 == self.lat1
    }

    /// Map onto axis index ranges: normalize corners, clamp each scalar into
    /// the axis extents, map each to its nearest index, then swap inverted
    /// index pairs. Clamping must happen before mapping to avoid off-by-one
    /// at the axis boundaries.
    pub fn to_index_ranges(&self, lon_axis: &[f64], lat_axis: &[f64]) -> (IndexRange, IndexRange) {
        let b = self.normalized();

        let (lon_min, lon_max) = axis_extents(lon_axis);
        let (lat_min, lat_max) = axis_extents(lat_axis);

        let lon0 = clamp(b.lon0, lon_min, lon_max);
        let lon1 = clamp(b.lon1, lon_min, lon_max);
        let lat0 = clamp(b.lat0, lat_min, lat_max);
        let lat1 = clamp(b.lat1, lat_min, lat_max);

        let cols = IndexRange::new(nearest_index(lon0, lon_axis), nearest_index(lon1, lon_axis));
        let rows = IndexRange::new(nearest_index(lat0, lat_axis), nearest_index(lat1, lat_axis));
        (cols, rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalized_reorders_corners() {
        let b = Bbox {
            lon0: 122.0,
            lat0: 25.0,
            lon1: 120.0,
            lat1: 23.0,
        };
        let n = b.normalized();
        assert_eq!(n.lon0, 120.0);
        assert_eq!(n.lon1, 122.0);
        assert_eq!(n.lat0, 23.0);
        assert_eq!(n.lat1, 25.0);
    }

    #[test]
    fn test_degenerate_bbox() {
        let b = Bbox {
            lon0: 120.0,
            lat0: 23.0,
            lon1: 120.0,
            lat1: 23.0,
        };
        assert!(b.is_degenerate());
    }

    #[test]
    fn test_to_index_ranges() {
        let lon = [120.0, 120.5, 121.0, 121.5, 122.0];
        let lat = [23.0, 23.5, 24.0];
        let b = Bbox {
            lon0: 120.4,
            lat0: 23.1,
            lon1: 121.6,
            lat1: 24.0,
        };
        let (cols, rows) = b.to_index_ranges(&lon, &lat);
        assert_eq!(cols, IndexRange { lo: 1, hi: 3 });
        assert_eq!(rows, IndexRange { lo: 0, hi: 2 });
    }

    #[test]
    fn test_to_index_ranges_clamps_outside_extents() {
        let lon = [120.0, 120.5, 121.0];
        let lat = [23.0, 23.5, 24.0];
        let b = Bbox {
            lon0: 100.0,
            lat0: -90.0,
            lon1: 180.0,
            lat1: 90.0,
        };
        let (cols, rows) = b.to_index_ranges(&lon, &lat);
        assert_eq!(cols, IndexRange { lo: 0, hi: 2 });
        assert_eq!(rows, IndexRange { lo: 0, hi: 2 });
    }

    #[test]
    fn test_strided_iteration() {
        let r = IndexRange { lo: 2, hi: 10 };
        let idx: Vec<usize> = r.strided(3).collect();
        assert_eq!(idx, vec![2, 5, 8]);
    }

    #[test]
    fn test_strided_always_includes_lo() {
        let r = IndexRange { lo: 4, hi: 4 };
        let idx: Vec<usize> = r.strided(10).collect();
        assert_eq!(idx, vec![4]);
    }
}
