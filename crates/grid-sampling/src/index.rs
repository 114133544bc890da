//! Nearest-index coordinate mapping.

/// Clamp `v` into `[lo, hi]`.
pub fn clamp(v: f64, lo: f64, hi: f64) -> f64 {
    v.max(lo).min(hi)
}

/// The (min, max) values of an axis array.
///
/// Computed by fold rather than endpoint lookup so descending axes behave.
pub fn axis_extents(axis: &[f64]) -> (f64, f64) {
    axis.iter().fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
        (lo.min(v), hi.max(v))
    })
}

/// Index of the axis value nearest to `value`.
///
/// `axis` must be sorted ascending. The insertion point is found by binary
/// search; interior values pick whichever neighbour is numerically closer,
/// with ties resolved toward the higher index. Always in `[0, len-1]`.
pub fn nearest_index(value: f64, axis: &[f64]) -> usize {
    debug_assert!(!axis.is_empty());
    let j = axis.partition_point(|&x| x < value);
    if j == 0 {
        return 0;
    }
    if j >= axis.len() {
        return axis.len() - 1;
    }
    if (axis[j - 1] - value).abs() < (axis[j] - value).abs() {
        j - 1
    } else {
        j
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clamp() {
        assert_eq!(clamp(5.0, 0.0, 10.0), 5.0);
        assert_eq!(clamp(-1.0, 0.0, 10.0), 0.0);
        assert_eq!(clamp(11.0, 0.0, 10.0), 10.0);
    }

    #[test]
    fn test_axis_extents() {
        assert_eq!(axis_extents(&[120.0, 121.0, 122.0]), (120.0, 122.0));
    }

    #[test]
    fn test_nearest_index_interior() {
        // 120.6 is closer to 121.0 than 120.0
        let axis = [120.0, 121.0, 122.0];
        assert_eq!(nearest_index(120.6, &axis), 1);
        assert_eq!(nearest_index(120.4, &axis), 0);
    }

    #[test]
    fn test_nearest_index_exact_hit() {
        let axis = [120.0, 121.0, 122.0];
        assert_eq!(nearest_index(121.0, &axis), 1);
    }

    #[test]
    fn test_nearest_index_clamps_to_ends() {
        let axis = [120.0, 121.0, 122.0];
        assert_eq!(nearest_index(100.0, &axis), 0);
        assert_eq!(nearest_index(200.0, &axis), 2);
    }

    #[test]
    fn test_nearest_index_tie_goes_high() {
        // 120.5 is equidistant from 120.0 and 121.0
        let axis = [120.0, 121.0, 122.0];
        assert_eq!(nearest_index(120.5, &axis), 1);
    }

    #[test]
    fn test_nearest_index_minimizes_distance() {
        let axis: Vec<f64> = (0..100).map(|i| -180.0 + i as f64 * 0.25).collect();
        for &v in &[-180.0, -179.99, -170.13, -160.0, 0.0] {
            let i = nearest_index(v, &axis);
            let best = axis
                .iter()
                .enumerate()
                .min_by(|(_, a), (_, b)| {
                    (*a - v).abs().partial_cmp(&(*b - v).abs()).unwrap()
                })
                .map(|(idx, _)| idx)
                .unwrap();
            assert_eq!((axis[i] - v).abs(), (axis[best] - v).abs(), "value {v}");
        }
    }

    #[test]
    fn test_nearest_index_single_element() {
        assert_eq!(nearest_index(42.0, &[7.0]), 0);
    }
}
