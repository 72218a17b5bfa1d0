//! Joins export rows with comment counts taken from the source files.

use std::path::{Path, PathBuf};

use metrics_core::models::{ClassMetricRow, FileMetricRecord};

use crate::comments::CommentCounter;

/// Turns [`ClassMetricRow`]s into [`FileMetricRecord`]s.
#[derive(Debug, Clone, Default)]
pub struct FileMetricEnricher {
    counter: CommentCounter,
    /// Base directory for relative paths found in the export.
    source_root: Option<PathBuf>,
}

impl FileMetricEnricher {
    pub fn new(source_root: Option<PathBuf>) -> Self {
        Self {
            counter: CommentCounter::default(),
            source_root,
        }
    }

    /// Use `counter` instead of the default C-family one.
    pub fn with_counter(mut self, counter: CommentCounter) -> Self {
        self.counter = counter;
        self
    }

    /// Where the source behind an export path lives on disk.
    pub fn resolve_source(&self, file: &str) -> PathBuf {
        let path = Path::new(file);
        match &self.source_root {
            Some(root) if path.is_relative() => root.join(path),
            _ => path.to_path_buf(),
        }
    }

    /// Build the per-file record for `row`.
    ///
    /// Rows without a source path yield `None`; they are dropped, not
    /// reported.
    pub fn enrich(&self, repository: &str, row: &ClassMetricRow) -> Option<FileMetricRecord> {
        let file = row.source_path()?;
        let source = self.resolve_source(file);

        let file_name = source
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| file.to_string());

        Some(FileMetricRecord {
            repository: repository.to_string(),
            file_name,
            loc: row.loc,
            comment_lines: self.counter.count_in_file(&source),
            cbo: row.cbo,
            dit: row.dit,
            lcom: row.lcom,
        })
    }

    /// Enrich every row, dropping the ones without a path.
    pub fn enrich_all(&self, repository: &str, rows: &[ClassMetricRow]) -> Vec<FileMetricRecord> {
        rows.iter()
            .filter_map(|row| self.enrich(repository, row))
            .collect()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
