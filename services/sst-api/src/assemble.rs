//! Response-row assembly and post-processing modes.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::Serialize;

use sst_common::ResponseMode;

/// One JSON response record.
///
/// Field values are flattened next to the coordinates; a `None` value
/// serializes as JSON `null`. Point responses omit fields a day's group does
/// not carry; bbox responses keep every requested field with `null` values.
#[derive(Debug, Clone, Serialize)]
pub struct ResultRow {
    pub lon: f64,
    pub lat: f64,
    pub date: NaiveDate,

    #[serde(flatten)]
    pub values: BTreeMap<String, Option<f64>>,
}

/// A grid cell to its wire value: NaN means no data and becomes `null`.
pub fn cell_value(v: f32) -> Option<f64> {
    if v.is_nan() {
        None
    } else {
        Some(f64::from(v))
    }
}

/// Round half away from zero to a fixed number of decimals.
pub fn round_to(x: f64, decimals: u32) -> f64 {
    let scale = 10f64.powi(decimals as i32);
    (x * scale).round() / scale
}

/// Apply post-processing modes in request order.
///
/// `truncate` rounds coordinates to 5 decimals and field values to 3. It is
/// applied after assembly and is idempotent.
pub fn apply_modes(rows: &mut [ResultRow], modes: &[ResponseMode]) {
    for mode in modes {
        match mode {
            ResponseMode::Truncate => {
                for row in rows.iter_mut() {
                    row.lon = round_to(row.lon, 5);
                    row.lat = round_to(row.lat, 5);
                    for value in row.values.values_mut() {
                        if let Some(v) = value {
                            *v = round_to(*v, 3);
                        }
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    fn row(lon: f64, lat: f64, sst: Option<f64>) -> ResultRow {
        let mut values = BTreeMap::new();
        values.insert("sst".to_string(), sst);
        ResultRow {
            lon,
            lat,
            date: d("2025-10-01"),
            values,
        }
    }

    #[test]
    fn test_cell_value_maps_nan_to_null() {
        assert_eq!(cell_value(f32::NAN), None);
        assert_eq!(cell_value(21.5), Some(21.5));
    }

    #[test]
    fn test_round_to() {
        assert_eq!(round_to(120.123456789, 5), 120.12346);
        assert_eq!(round_to(21.8765, 3), 21.877);
        assert_eq!(round_to(-21.8765, 3), -21.877);
    }

    #[test]
    fn test_truncate_rounds_coords_and_values() {
        let mut rows = vec![row(120.123456789, 23.987654321, Some(21.87654))];
        apply_modes(&mut rows, &[ResponseMode::Truncate]);
        assert_eq!(rows[0].lon, 120.12346);
        assert_eq!(rows[0].lat, 23.98765);
        assert_eq!(rows[0].values["sst"], Some(21.877));
    }

    #[test]
    fn test_truncate_preserves_null() {
        let mut rows = vec![row(120.0, 23.0, None)];
        apply_modes(&mut rows, &[ResponseMode::Truncate]);
        assert_eq!(rows[0].values["sst"], None);
    }

    #[test]
    fn test_truncate_is_idempotent() {
        let mut once = vec![row(120.123456789, 23.0, Some(21.87654))];
        apply_modes(&mut once, &[ResponseMode::Truncate]);
        let mut twice = once.clone();
        apply_modes(&mut twice, &[ResponseMode::Truncate]);
        assert_eq!(once[0].lon, twice[0].lon);
        assert_eq!(once[0].values["sst"], twice[0].values["sst"]);
    }

    #[test]
    fn test_row_serialization_flattens_fields() {
        let json = serde_json::to_value(row(120.0, 23.0, Some(21.5))).unwrap();
        assert_eq!(json["lon"], 120.0);
        assert_eq!(json["date"], "2025-10-01");
        assert_eq!(json["sst"], 21.5);

        let json = serde_json::to_value(row(120.0, 23.0, None)).unwrap();
        assert!(json["sst"].is_null());
    }
}
