//! Test-store generation utilities.
//!
//! Writes small single-day Zarr groups with known values so unit and
//! integration tests can exercise the read path against real files.

use std::path::Path;
use std::sync::Arc;

use chrono::NaiveDate;
use zarrs::array::{ArrayBuilder, DataType, FillValue};
use zarrs::array_subset::ArraySubset;
use zarrs_filesystem::FilesystemStore;

use sst_common::{day_path, Field};

type TestResult<T> = Result<T, Box<dyn std::error::Error>>;

/// Write one day's group: `lon`/`lat` axes plus `[lat, lon]`-shaped fields.
///
/// Each `fields` entry must hold `lat.len() * lon.len()` values in row-major
/// order.
pub fn write_day(
    root: &Path,
    day: NaiveDate,
    lon: &[f64],
    lat: &[f64],
    fields: &[(Field, Vec<f32>)],
) -> TestResult<()> {
    std::fs::create_dir_all(root)?;
    let store = Arc::new(FilesystemStore::new(root)?);
    let prefix = format!("/{}", day_path(day));

    write_axis(&store, &format!("{prefix}/lon"), lon)?;
    write_axis(&store, &format!("{prefix}/lat"), lat)?;

    for (field, data) in fields {
        assert_eq!(data.len(), lon.len() * lat.len(), "field grid shape mismatch");
        write_grid(
            &store,
            &format!("{prefix}/{}", field.as_str()),
            data,
            lon.len(),
            lat.len(),
        )?;
    }
    Ok(())
}

/// Write the bounds manifest consumed by `BoundsStore`.
pub fn write_manifest(path: &Path, earliest: NaiveDate, latest: NaiveDate) -> TestResult<()> {
    let body = serde_json::json!({
        "earliest": earliest.format("%Y-%m-%d").to_string(),
        "latest": latest.format("%Y-%m-%d").to_string(),
    });
    std::fs::write(path, serde_json::to_vec_pretty(&body)?)?;
    Ok(())
}

/// A smoothly varying temperature-like grid: value = 20 + row * 0.5 + col * 0.25.
pub fn temperature_grid(width: usize, height: usize) -> Vec<f32> {
    let mut data = Vec::with_capacity(width * height);
    for row in 0..height {
        for col in 0..width {
            data.push(20.0 + row as f32 * 0.5 + col as f32 * 0.25);
        }
    }
    data
}

/// An evenly spaced axis from `start` stepping by `step`.
pub fn linear_axis(start: f64, step: f64, len: usize) -> Vec<f64> {
    (0..len).map(|i| start + i as f64 * step).collect()
}

fn write_axis(store: &Arc<FilesystemStore>, path: &str, values: &[f64]) -> TestResult<()> {
    let len = values.len() as u64;
    let array = ArrayBuilder::new(
        vec![len],
        DataType::Float64,
        vec![len.max(1)].try_into()?,
        FillValue::from(f64::NAN),
    )
    .build(Arc::clone(store), path)?;

    array.store_metadata()?;
    let subset = ArraySubset::new_with_start_shape(vec![0], vec![len])?;
    array.store_array_subset_elements(&subset, values)?;
    Ok(())
}

fn write_grid(
    store: &Arc<FilesystemStore>,
    path: &str,
    data: &[f32],
    width: usize,
    height: usize,
) -> TestResult<()> {
    let array = ArrayBuilder::new(
        vec![height as u64, width as u64],
        DataType::Float32,
        vec![(height as u64).max(1), (width as u64).max(1)].try_into()?,
        FillValue::from(f32::NAN),
    )
    .build(Arc::clone(store), path)?;

    array.store_metadata()?;
    let subset = ArraySubset::new_with_start_shape(
        vec![0, 0],
        vec![height as u64, width as u64],
    )?;
    array.store_array_subset_elements(&subset, data)?;
    Ok(())
}
