//! Persistence of aggregate tables as `.csv` plus `.xlsx` pairs.
//!
//! Both files of a pair are rendered and staged as temporary files in the
//! target directory before either is swapped into place, so a reader never
//! observes a partially written table. If the second swap fails the first
//! file is restored to its previous contents.

use std::io::Write;
use std::path::{Path, PathBuf};

use metrics_core::error::{MetricsError, Result};
use metrics_core::models::{Cell, TableRow};
use rust_xlsxwriter::Workbook;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tempfile::NamedTempFile;
use tracing::{debug, warn};

/// File stem of the per-repository table.
pub const REPO_TABLE_STEM: &str = "total_metrics_per_repo";

/// File stem of the single-row corpus summary.
pub const GLOBAL_SUMMARY_STEM: &str = "total_metrics";

/// Path of the delimited view of table `stem` in `dir`.
pub fn csv_path(dir: &Path, stem: &str) -> PathBuf {
    dir.join(format!("{stem}.csv"))
}

/// Path of the spreadsheet view of table `stem` in `dir`.
pub fn xlsx_path(dir: &Path, stem: &str) -> PathBuf {
    dir.join(format!("{stem}.xlsx"))
}

/// Write `rows` as `{stem}.csv` and `{stem}.xlsx` under `dir`.
///
/// `dir` is created if needed. The header row is always written, even for an
/// empty table.
pub fn write_table<T>(dir: &Path, stem: &str, rows: &[T]) -> Result<()>
where
    T: TableRow + Serialize,
{
    std::fs::create_dir_all(dir).map_err(|source| MetricsError::FileWrite {
        path: dir.to_path_buf(),
        source,
    })?;

    let csv_target = csv_path(dir, stem);
    let xlsx_target = xlsx_path(dir, stem);

    let csv_staged = stage(&csv_target, &render_csv(rows)?)?;
    let xlsx_staged = stage(&xlsx_target, &render_xlsx(rows)?)?;

    let previous_csv = read_previous(&csv_target)?;
    persist(csv_staged, &csv_target)?;
    if let Err(e) = persist(xlsx_staged, &xlsx_target) {
        restore(&csv_target, previous_csv.as_deref());
        return Err(e);
    }

    debug!("Wrote {} rows to {}/{}.{{csv,xlsx}}", rows.len(), dir.display(), stem);
    Ok(())
}

/// Read the delimited view of table `stem`, or `None` if it does not exist.
///
/// A table that exists but cannot be parsed is an error: it is the only
/// durable state the pipeline has.
pub fn read_table<T>(dir: &Path, stem: &str) -> Result<Option<Vec<T>>>
where
    T: DeserializeOwned,
{
    let path = csv_path(dir, stem);
    if !path.exists() {
        return Ok(None);
    }

    let file = std::fs::File::open(&path).map_err(|source| MetricsError::FileRead {
        path: path.clone(),
        source,
    })?;

    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::Headers)
        .from_reader(file);

    let rows = reader
        .deserialize()
        .collect::<std::result::Result<Vec<T>, csv::Error>>()?;

    Ok(Some(rows))
}

// ── Rendering ─────────────────────────────────────────────────────────────────

fn render_csv<T>(rows: &[T]) -> Result<Vec<u8>>
where
    T: TableRow + Serialize,
{
    // Headers come from COLUMNS so that an empty table still gets one.
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(Vec::new());

    writer.write_record(T::COLUMNS)?;
    for row in rows {
        writer.serialize(row)?;
    }

    writer
        .into_inner()
        .map_err(|e| MetricsError::Io(e.into_error()))
}

fn render_xlsx<T>(rows: &[T]) -> Result<Vec<u8>>
where
    T: TableRow,
{
    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();

    for (col, name) in T::COLUMNS.iter().enumerate() {
        sheet.write_string(0, col as u16, *name)?;
    }

    for (index, row) in rows.iter().enumerate() {
        let line = (index + 1) as u32;
        for (col, cell) in row.cells().into_iter().enumerate() {
            match cell {
                Cell::Text(text) => sheet.write_string(line, col as u16, text)?,
                Cell::Number(value) => sheet.write_number(line, col as u16, value)?,
            };
        }
    }

    Ok(workbook.save_to_buffer()?)
}

// ── Swapping ──────────────────────────────────────────────────────────────────

fn write_error(path: &Path) -> impl Fn(std::io::Error) -> MetricsError + '_ {
    move |source| MetricsError::FileWrite {
        path: path.to_path_buf(),
        source,
    }
}

/// Write `bytes` to a synced temporary file next to `path`.
fn stage(path: &Path, bytes: &[u8]) -> Result<NamedTempFile> {
    let dir = path
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));

    let mut tmp = NamedTempFile::new_in(dir).map_err(write_error(path))?;
    tmp.write_all(bytes).map_err(write_error(path))?;
    tmp.as_file().sync_all().map_err(write_error(path))?;
    Ok(tmp)
}

fn persist(staged: NamedTempFile, path: &Path) -> Result<()> {
    staged
        .persist(path)
        .map(|_| ())
        .map_err(|e| write_error(path)(e.error))
}

fn read_previous(path: &Path) -> Result<Option<Vec<u8>>> {
    match std::fs::read(path) {
        Ok(bytes) => Ok(Some(bytes)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(source) => Err(MetricsError::FileRead {
            path: path.to_path_buf(),
            source,
        }),
    }
}

/// Put `path` back the way it was before a failed pair write.
fn restore(path: &Path, previous: Option<&[u8]>) {
    let result = match previous {
        Some(bytes) => stage(path, bytes).and_then(|staged| persist(staged, path)),
        None => std::fs::remove_file(path).map_err(write_error(path)),
    };
    if let Err(e) = result {
        warn!("Could not restore {}: {}", path.display(), e);
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
