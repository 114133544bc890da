//! Day-group storage traits and the Zarr V3 filesystem implementation.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::NaiveDate;
use zarrs::array::Array;
use zarrs::array_subset::ArraySubset;
use zarrs_filesystem::FilesystemStore;

use sst_common::{day_path, Field, SstError, SstResult};

/// Read-only store of immutable daily groups.
#[async_trait]
pub trait DayStore: Send + Sync {
    /// Whether a group is published for this date.
    fn exists(&self, day: NaiveDate) -> bool;

    /// Open a day's group for reading.
    async fn open(&self, day: NaiveDate) -> SstResult<Box<dyn DayGroup>>;
}

/// One day's coordinate axes and fields.
///
/// Field grids are `[lat, lon]` indexed; a missing value reads as NaN.
#[async_trait]
pub trait DayGroup: Send + Sync {
    fn lon(&self) -> &[f64];
    fn lat(&self) -> &[f64];

    /// Whether this day's group carries the field. A field may exist in some
    /// days' groups and not others.
    fn has_field(&self, field: Field) -> bool;

    /// Read a single cell.
    async fn read_cell(&self, field: Field, row: usize, col: usize) -> SstResult<f32>;

    /// Read the contiguous span `[col_lo, col_hi]` of one grid row.
    async fn read_row(
        &self,
        field: Field,
        row: usize,
        col_lo: usize,
        col_hi: usize,
    ) -> SstResult<Vec<f32>>;
}

/// Filesystem-backed Zarr V3 day store.
pub struct FsDayStore {
    root: PathBuf,
    store: Arc<FilesystemStore>,
}

impl FsDayStore {
    pub fn new(root: impl Into<PathBuf>) -> SstResult<Self> {
        let root = root.into();
        let store = FilesystemStore::new(&root)
            .map_err(|e| SstError::Storage(format!("failed to open store {}: {e}", root.display())))?;
        Ok(Self {
            root,
            store: Arc::new(store),
        })
    }

    pub fn root(&self) -> &PathBuf {
        &self.root
    }
}

#[async_trait]
impl DayStore for FsDayStore {
    fn exists(&self, day: NaiveDate) -> bool {
        self.root.join(day_path(day)).is_dir()
    }

    async fn open(&self, day: NaiveDate) -> SstResult<Box<dyn DayGroup>> {
        let dir = self.root.join(day_path(day));
        if !dir.is_dir() {
            return Err(SstError::Storage(format!(
                "day group {} does not exist",
                day_path(day)
            )));
        }

        let prefix = format!("/{}", day_path(day));
        let group = FsDayGroup::open(Arc::clone(&self.store), dir, prefix)?;
        Ok(Box::new(group))
    }
}

/// One opened day group; field arrays are opened lazily and cached.
struct FsDayGroup {
    store: Arc<FilesystemStore>,
    dir: PathBuf,
    prefix: String,
    lon: Vec<f64>,
    lat: Vec<f64>,
    arrays: Mutex<HashMap<Field, Arc<Array<FilesystemStore>>>>,
}

impl FsDayGroup {
    fn open(store: Arc<FilesystemStore>, dir: PathBuf, prefix: String) -> SstResult<Self> {
        let lon = read_axis(&store, &prefix, &["lon", "longitude"])?;
        let lat = read_axis(&store, &prefix, &["lat", "latitude"])?;
        Ok(Self {
            store,
            dir,
            prefix,
            lon,
            lat,
            arrays: Mutex::new(HashMap::new()),
        })
    }

    fn field_array(&self, field: Field) -> SstResult<Arc<Array<FilesystemStore>>> {
        let mut arrays = self
            .arrays
            .lock()
            .map_err(|_| SstError::Internal("day group array cache poisoned".to_string()))?;
        if let Some(array) = arrays.get(&field) {
            return Ok(Arc::clone(array));
        }

        let path = format!("{}/{}", self.prefix, field.as_str());
        let array = Array::open(Arc::clone(&self.store), &path)
            .map_err(|e| SstError::Storage(format!("failed to open array {path}: {e}")))?;
        let array = Arc::new(array);
        arrays.insert(field, Arc::clone(&array));
        Ok(array)
    }

    fn read_window(
        &self,
        field: Field,
        row: usize,
        col_lo: usize,
        width: usize,
    ) -> SstResult<Vec<f32>> {
        let array = self.field_array(field)?;
        let subset =
            ArraySubset::new_with_start_shape(vec![row as u64, col_lo as u64], vec![1, width as u64])
                .map_err(|e| SstError::Storage(e.to_string()))?;
        let values: Vec<f32> = array
            .retrieve_array_subset_elements(&subset)
            .map_err(|e| {
                SstError::Storage(format!(
                    "failed to read {}/{} at row {row}: {e}",
                    self.prefix,
                    field.as_str()
                ))
            })?;
        Ok(values)
    }
}

#[async_trait]
impl DayGroup for FsDayGroup {
    fn lon(&self) -> &[f64] {
        &self.lon
    }

    fn lat(&self) -> &[f64] {
        &self.lat
    }

    fn has_field(&self, field: Field) -> bool {
        self.dir.join(field.as_str()).join("zarr.json").is_file()
    }

    async fn read_cell(&self, field: Field, row: usize, col: usize) -> SstResult<f32> {
        let values = self.read_window(field, row, col, 1)?;
        Ok(values.first().copied().unwrap_or(f32::NAN))
    }

    async fn read_row(
        &self,
        field: Field,
        row: usize,
        col_lo: usize,
        col_hi: usize,
    ) -> SstResult<Vec<f32>> {
        debug_assert!(col_lo <= col_hi);
        self.read_window(field, row, col_lo, col_hi - col_lo + 1)
    }
}

/// Read a 1-D f64 coordinate axis, trying each candidate array name.
fn read_axis(
    store: &Arc<FilesystemStore>,
    prefix: &str,
    names: &[&str],
) -> SstResult<Vec<f64>> {
    for name in names {
        let path = format!("{prefix}/{name}");
        let Ok(array) = Array::open(Arc::clone(store), &path) else {
            continue;
        };
        let len = array.shape().first().copied().unwrap_or(0);
        let subset = ArraySubset::new_with_start_shape(vec![0], vec![len])
            .map_err(|e| SstError::Storage(e.to_string()))?;
        let values: Vec<f64> = array
            .retrieve_array_subset_elements(&subset)
            .map_err(|e| SstError::Storage(format!("failed to read axis {path}: {e}")))?;
        if values.is_empty() {
            return Err(SstError::Storage(format!("axis {path} is empty")));
        }
        return Ok(values);
    }
    Err(SstError::Storage(format!(
        "group {prefix} has no coordinate axis named {}",
        names.join(" or ")
    )))
}
