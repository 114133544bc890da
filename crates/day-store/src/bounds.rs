//! Inclusive date range of published day groups.
//!
//! A small manifest file `{"earliest": ..., "latest": ...}` is preferred;
//! when it is absent or unparsable the `YYYY/MM/DD` directory hierarchy is
//! scanned instead. `YYYY-MM-DD` strings sort lexicographically in
//! chronological order, so the scan needs no date arithmetic to order leaves.

use std::path::PathBuf;
use std::time::{Duration, SystemTime};

use serde::Deserialize;
use tokio::sync::RwLock;
use walkdir::WalkDir;

use sst_common::{parse_date, Bounds, SstError, SstResult};

/// Filesystem timestamps round; treat the manifest as stale only when its
/// mtime advances past the recorded one by more than this.
const MTIME_TOLERANCE: Duration = Duration::from_nanos(1);

#[derive(Debug, Deserialize)]
struct Manifest {
    earliest: Option<String>,
    latest: Option<String>,
}

#[derive(Debug, Default)]
struct Snapshot {
    bounds: Option<Bounds>,
    manifest_mtime: Option<SystemTime>,
}

/// Tracks the `[earliest, latest]` range of published days.
///
/// Refresh is a pure snapshot overwrite: concurrent refreshes are idempotent
/// and last-writer-wins; readers always observe a self-consistent snapshot.
pub struct BoundsStore {
    root: PathBuf,
    manifest_path: PathBuf,
    snapshot: RwLock<Snapshot>,
}

impl BoundsStore {
    pub fn new(root: impl Into<PathBuf>, manifest_path: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            manifest_path: manifest_path.into(),
            snapshot: RwLock::new(Snapshot::default()),
        }
    }

    /// The current snapshot, if any range has been established.
    pub async fn snapshot(&self) -> Option<Bounds> {
        self.snapshot.read().await.bounds
    }

    /// Reload from the manifest (or directory scan) unconditionally.
    pub async fn load(&self) -> Option<Bounds> {
        let mtime = self.manifest_mtime();
        let bounds = self.read_bounds();

        if bounds.is_none() {
            tracing::warn!(
                root = %self.root.display(),
                "no valid date range found in manifest or directory scan"
            );
        }

        let mut snapshot = self.snapshot.write().await;
        snapshot.bounds = bounds;
        snapshot.manifest_mtime = mtime;
        bounds
    }

    /// Reload only when the manifest's mtime advanced past the recorded one,
    /// or when no range has been established yet.
    pub async fn refresh_if_stale(&self) {
        let stale = {
            let snapshot = self.snapshot.read().await;
            match (snapshot.bounds, snapshot.manifest_mtime, self.manifest_mtime()) {
                (None, _, _) => true,
                (_, None, Some(_)) => true,
                (_, Some(recorded), Some(current)) => current > recorded + MTIME_TOLERANCE,
                (_, _, None) => false,
            }
        };
        if stale {
            self.load().await;
        }
    }

    /// Refresh if needed and return the range, failing when none exists.
    pub async fn current(&self) -> SstResult<Bounds> {
        self.refresh_if_stale().await;
        self.snapshot().await.ok_or(SstError::NoAvailableDates)
    }

    fn manifest_mtime(&self) -> Option<SystemTime> {
        std::fs::metadata(&self.manifest_path)
            .and_then(|m| m.modified())
            .ok()
    }

    fn read_bounds(&self) -> Option<Bounds> {
        let (mut earliest, mut latest) = self.read_manifest();
        if earliest.is_none() || latest.is_none() {
            let (scanned_earliest, scanned_latest) = self.scan_days();
            earliest = earliest.or(scanned_earliest);
            latest = latest.or(scanned_latest);
        }
        match (earliest, latest) {
            (Some(e), Some(l)) if e <= l => Some(Bounds::new(e, l)),
            (Some(e), Some(l)) => Some(Bounds::new(l, e)),
            _ => None,
        }
    }

    fn read_manifest(&self) -> (Option<chrono::NaiveDate>, Option<chrono::NaiveDate>) {
        let Ok(raw) = std::fs::read_to_string(&self.manifest_path) else {
            return (None, None);
        };
        let Ok(manifest) = serde_json::from_str::<Manifest>(&raw) else {
            tracing::warn!(path = %self.manifest_path.display(), "unparsable bounds manifest");
            return (None, None);
        };
        let parse = |s: Option<String>| s.as_deref().and_then(|v| parse_date(v).ok());
        (parse(manifest.earliest), parse(manifest.latest))
    }

    /// Scan `YYYY/MM/DD` leaves for the lexicographically first/last dates.
    fn scan_days(&self) -> (Option<chrono::NaiveDate>, Option<chrono::NaiveDate>) {
        let mut earliest: Option<String> = None;
        let mut latest: Option<String> = None;

        for entry in WalkDir::new(&self.root)
            .min_depth(3)
            .max_depth(3)
            .into_iter()
            .filter_map(Result::ok)
            .filter(|e| e.file_type().is_dir())
        {
            let Ok(rel) = entry.path().strip_prefix(&self.root) else {
                continue;
            };
            let parts: Vec<&str> = rel
                .components()
                .filter_map(|c| c.as_os_str().to_str())
                .collect();
            let [y, m, d] = parts.as_slice() else {
                continue;
            };
            if !is_digits(y, 4) || !is_digits(m, 2) || !is_digits(d, 2) {
                continue;
            }
            let day = format!("{y}-{m}-{d}");
            if earliest.as_deref().map_or(true, |e| day.as_str() < e) {
                earliest = Some(day.clone());
            }
            if latest.as_deref().map_or(true, |l| day.as_str() > l) {
                latest = Some(day);
            }
        }

        let parse = |s: Option<String>| s.as_deref().and_then(|v| parse_date(v).ok());
        (parse(earliest), parse(latest))
    }
}

fn is_digits(s: &str, len: usize) -> bool {
    s.len() == len && s.bytes().all(|b| b.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testdata;
    use chrono::NaiveDate;

    fn d(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    #[tokio::test]
    async fn test_load_prefers_manifest() {
        let dir = tempfile::tempdir().unwrap();
        let manifest = dir.path().join("latest.json");
        testdata::write_manifest(&manifest, d("2025-10-01"), d("2025-10-05")).unwrap();

        let store = BoundsStore::new(dir.path(), &manifest);
        let bounds = store.load().await.unwrap();
        assert_eq!(bounds.earliest, d("2025-10-01"));
        assert_eq!(bounds.latest, d("2025-10-05"));
    }

    #[tokio::test]
    async fn test_scan_fallback_when_manifest_missing() {
        let dir = tempfile::tempdir().unwrap();
        for day in ["2025/09/30", "2025/10/01", "2025/10/03"] {
            std::fs::create_dir_all(dir.path().join(day)).unwrap();
        }
        // Non-date directories are ignored.
        std::fs::create_dir_all(dir.path().join("tmp/aa/bb")).unwrap();

        let store = BoundsStore::new(dir.path(), dir.path().join("latest.json"));
        let bounds = store.load().await.unwrap();
        assert_eq!(bounds.earliest, d("2025-09-30"));
        assert_eq!(bounds.latest, d("2025-10-03"));
    }

    #[tokio::test]
    async fn test_unparsable_manifest_falls_back_to_scan() {
        let dir = tempfile::tempdir().unwrap();
        let manifest = dir.path().join("latest.json");
        std::fs::write(&manifest, "not json").unwrap();
        std::fs::create_dir_all(dir.path().join("2025/10/02")).unwrap();

        let store = BoundsStore::new(dir.path(), &manifest);
        let bounds = store.load().await.unwrap();
        assert_eq!(bounds.earliest, d("2025-10-02"));
        assert_eq!(bounds.latest, d("2025-10-02"));
    }

    #[tokio::test]
    async fn test_empty_store_yields_no_bounds() {
        let dir = tempfile::tempdir().unwrap();
        let store = BoundsStore::new(dir.path(), dir.path().join("latest.json"));
        assert!(store.load().await.is_none());
        assert!(matches!(
            store.current().await,
            Err(SstError::NoAvailableDates)
        ));
    }

    #[tokio::test]
    async fn test_refresh_picks_up_manifest_update() {
        let dir = tempfile::tempdir().unwrap();
        let manifest = dir.path().join("latest.json");
        testdata::write_manifest(&manifest, d("2025-10-01"), d("2025-10-05")).unwrap();

        let store = BoundsStore::new(dir.path(), &manifest);
        store.load().await.unwrap();

        // Rewrite with a later range and a clearly newer mtime.
        testdata::write_manifest(&manifest, d("2025-10-01"), d("2025-10-08")).unwrap();
        let newer = SystemTime::now() + Duration::from_secs(5);
        let file = std::fs::File::open(&manifest).unwrap();
        file.set_modified(newer).unwrap();

        store.refresh_if_stale().await;
        let bounds = store.snapshot().await.unwrap();
        assert_eq!(bounds.latest, d("2025-10-08"));
    }

    #[tokio::test]
    async fn test_refresh_noop_when_mtime_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        let manifest = dir.path().join("latest.json");
        testdata::write_manifest(&manifest, d("2025-10-01"), d("2025-10-05")).unwrap();

        let store = BoundsStore::new(dir.path(), &manifest);
        store.load().await.unwrap();
        store.refresh_if_stale().await;
        let bounds = store.snapshot().await.unwrap();
        assert_eq!(bounds.earliest, d("2025-10-01"));
        assert_eq!(bounds.latest, d("2025-10-05"));
    }
}
