//! Discovery and loading of CK class-level exports.
//!
//! CK writes one `class.csv` per run into its output directory (sometimes
//! prefixed, e.g. `spring-boot-class.csv`). This module finds that file and
//! turns its rows into [`ClassMetricRow`] values.

use std::path::{Path, PathBuf};

use metrics_core::error::{MetricsError, Result};
use metrics_core::models::ClassMetricRow;
use tracing::{debug, warn};

/// File-name token that identifies the class-granularity export.
pub const CLASS_EXPORT_TOKEN: &str = "class";

// ── Public API ────────────────────────────────────────────────────────────────

/// All class-level exports directly inside `dir`, sorted by path.
///
/// A candidate is a regular file whose name contains [`CLASS_EXPORT_TOKEN`]
/// and ends in `.csv`. Subdirectories are not searched.
pub fn find_class_exports(dir: &Path) -> Vec<PathBuf> {
    if !dir.is_dir() {
        warn!("Export directory does not exist: {}", dir.display());
        return Vec::new();
    }

    let mut files: Vec<PathBuf> = walkdir::WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file() && is_class_export(entry.path()))
        .map(|entry| entry.into_path())
        .collect();

    files.sort();
    files
}

/// The class-level export to use for `dir`, if any.
///
/// When several files qualify the first one by path wins and the rest are
/// reported.
pub fn find_class_export(dir: &Path) -> Option<PathBuf> {
    let mut exports = find_class_exports(dir).into_iter();
    let chosen = exports.next()?;

    let ignored: Vec<String> = exports.map(|p| p.display().to_string()).collect();
    if !ignored.is_empty() {
        warn!(
            "Multiple class exports in {}; using {} and ignoring {}",
            dir.display(),
            chosen.display(),
            ignored.join(", ")
        );
    }

    Some(chosen)
}

/// Read every row of a class export.
///
/// Rows that cannot be decoded at all (e.g. invalid UTF-8) are skipped with a
/// warning; numeric cells never cause a row to be skipped. Failing to open
/// the file is an error, since the caller has already seen it on disk.
pub fn read_class_rows(path: &Path) -> Result<Vec<ClassMetricRow>> {
    let file = std::fs::File::open(path).map_err(|source| MetricsError::FileRead {
        path: path.to_path_buf(),
        source,
    })?;

    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::Headers)
        .from_reader(file);

    let mut rows = Vec::new();
    let mut skipped = 0u64;

    for (index, record) in reader.deserialize::<ClassMetricRow>().enumerate() {
        match record {
            Ok(row) => rows.push(row),
            Err(e) => {
                skipped += 1;
                warn!("Skipping row {} of {}: {}", index + 1, path.display(), e);
            }
        }
    }

    debug!(
        "Export {}: {} rows read, {} skipped",
        path.display(),
        rows.len(),
        skipped
    );

    Ok(rows)
}

// ── Internal helpers ──────────────────────────────────────────────────────────

fn is_class_export(path: &Path) -> bool {
    let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
        return false;
    };
    name.ends_with(".csv") && name.contains(CLASS_EXPORT_TOKEN)
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn touch(dir: &Path, name: &str, content: &str) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, content).expect("write fixture");
        path
    }

    // ── find_class_exports ────────────────────────────────────────────────────

    #[test]
    fn test_find_class_exports_matches_token() {
        let tmp = TempDir::new().expect("tempdir");
        let class = touch(tmp.path(), "class.csv", "");
        let prefixed = touch(tmp.path(), "spring-class.csv", "");
        touch(tmp.path(), "method.csv", "");
        touch(tmp.path(), "variable.csv", "");
        touch(tmp.path(), "class.txt", "");

        let found = find_class_exports(tmp.path());
        assert_eq!(found, vec![class, prefixed]);
    }

    #[test]
    fn test_find_class_exports_ignores_subdirectories() {
        let tmp = TempDir::new().expect("tempdir");
        let nested = tmp.path().join("nested");
        std::fs::create_dir_all(&nested).expect("mkdir");
        touch(&nested, "class.csv", "");
        std::fs::create_dir_all(tmp.path().join("class.csv.d")).expect("mkdir");

        assert!(find_class_exports(tmp.path()).is_empty());
    }

    #[test]
    fn test_find_class_exports_missing_dir() {
        let tmp = TempDir::new().expect("tempdir");
        assert!(find_class_exports(&tmp.path().join("absent")).is_empty());
    }

    #[test]
    fn test_find_class_export_picks_first_sorted() {
        let tmp = TempDir::new().expect("tempdir");
        touch(tmp.path(), "z-class.csv", "");
        let first = touch(tmp.path(), "a-class.csv", "");
        assert_eq!(find_class_export(tmp.path()), Some(first));
    }

    #[test]
    fn test_find_class_export_none() {
        let tmp = TempDir::new().expect("tempdir");
        touch(tmp.path(), "method.csv", "");
        assert_eq!(find_class_export(tmp.path()), None);
    }

    // ── read_class_rows ───────────────────────────────────────────────────────

    #[test]
    fn test_read_class_rows_ck_layout() {
        let tmp = TempDir::new().expect("tempdir");
        let path = touch(
            tmp.path(),
            "class.csv",
            "file,class,type,cbo,cboModified,fanin,fanout,wmc,dit,noc,rfc,lcom,lcom*,loc\n\
             /r/A.java,a.A,class,2,2,0,2,4,1,0,3,0,0.0,100\n\
             /r/B.java,b.B,interface,1,1,0,1,0,0,0,0,0,NaN,50\n",
        );

        let rows = read_class_rows(&path).expect("rows");
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].source_path(), Some("/r/A.java"));
        assert_eq!(rows[0].loc, 100);
        assert_eq!(rows[0].cbo, 2);
        assert_eq!(rows[1].loc, 50);
        assert_eq!(rows[1].dit, 0);
    }

    #[test]
    fn test_read_class_rows_ragged_rows() {
        let tmp = TempDir::new().expect("tempdir");
        let path = touch(
            tmp.path(),
            "class.csv",
            "file,loc,cbo,dit,lcom\n/r/A.java,10\n/r/B.java,20,1,1,1,extra\n",
        );

        let rows = read_class_rows(&path).expect("rows");
        assert_eq!(rows.len(), 2);
        assert_eq!((rows[0].loc, rows[0].cbo), (10, 0));
        assert_eq!((rows[1].loc, rows[1].lcom), (20, 1));
    }

    #[test]
    fn test_read_class_rows_header_only() {
        let tmp = TempDir::new().expect("tempdir");
        let path = touch(tmp.path(), "class.csv", "file,loc,cbo,dit,lcom\n");
        assert!(read_class_rows(&path).expect("rows").is_empty());
    }

    #[test]
    fn test_read_class_rows_zero_bytes() {
        let tmp = TempDir::new().expect("tempdir");
        let path = touch(tmp.path(), "class.csv", "");
        assert!(read_class_rows(&path).expect("rows").is_empty());
    }

    #[test]
    fn test_read_class_rows_missing_file_is_error() {
        let tmp = TempDir::new().expect("tempdir");
        let err = read_class_rows(&tmp.path().join("class.csv")).unwrap_err();
        assert!(matches!(err, MetricsError::FileRead { .. }));
    }
}
