use serde::{Deserialize, Deserializer, Serialize};

use crate::formatting::round_to;

// ── Export rows ───────────────────────────────────────────────────────────────

/// A single row of the class-level CK export (`class.csv`).
///
/// Only the columns the pipeline consumes are mapped; everything else in the
/// export is ignored. Numeric columns never fail to deserialize: empty, null
/// or unparseable values become `0`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ClassMetricRow {
    /// Path of the analysed source file, as written by the analysis tool.
    #[serde(default)]
    pub file: Option<String>,
    /// Lines of code reported by the analysis tool.
    #[serde(default, deserialize_with = "lenient_count")]
    pub loc: i64,
    /// Coupling between objects.
    #[serde(default, deserialize_with = "lenient_count")]
    pub cbo: i64,
    /// Depth of inheritance tree.
    #[serde(default, deserialize_with = "lenient_count")]
    pub dit: i64,
    /// Lack of cohesion in methods.
    #[serde(default, deserialize_with = "lenient_count")]
    pub lcom: i64,
}

impl ClassMetricRow {
    /// The source path as exported, or `None` when the column is absent or empty.
    pub fn source_path(&self) -> Option<&str> {
        self.file.as_deref().filter(|path| !path.is_empty())
    }
}

/// Parse a numeric export cell, coercing anything unusable to `0`.
///
/// Decimal text (integer columns with gaps are often exported as `12.0`)
/// is truncated to its integer part. Negative values pass through.
pub fn parse_count(raw: &str) -> i64 {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return 0;
    }
    if let Ok(value) = trimmed.parse::<i64>() {
        return value;
    }
    match trimmed.parse::<f64>() {
        Ok(value) if value.is_finite() => value.trunc() as i64,
        _ => 0,
    }
}

fn lenient_count<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(raw.as_deref().map(parse_count).unwrap_or(0))
}

// ── Per-file records ──────────────────────────────────────────────────────────

/// One export row joined with the comment count of its source file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileMetricRecord {
    /// Repository the file belongs to.
    pub repository: String,
    /// Base name of the source file (no directories).
    pub file_name: String,
    pub loc: i64,
    /// Comment lines counted from the source file itself.
    pub comment_lines: u64,
    pub cbo: i64,
    pub dit: i64,
    pub lcom: i64,
}

// ── Tabular output ────────────────────────────────────────────────────────────

/// A single cell of a persisted table.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Text(String),
    Number(f64),
}

/// A record that can be laid out as one row of a persisted table.
///
/// `COLUMNS` must list the same names, in the same order, as the record's
/// serde field names so the delimited and spreadsheet views agree.
pub trait TableRow {
    const COLUMNS: &'static [&'static str];

    fn cells(&self) -> Vec<Cell>;
}

// ── Repository rollup ─────────────────────────────────────────────────────────

/// Totals and per-file averages for one aggregation run of one repository.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepoAggregateRecord {
    #[serde(rename = "repositorio")]
    pub repository: String,
    pub loc_total: i64,
    #[serde(rename = "comentarios_total")]
    pub comments_total: u64,
    pub cbo_total: i64,
    pub dit_total: i64,
    pub lcom_total: i64,
    /// Number of per-file records that contributed to the totals.
    #[serde(rename = "arquivos_java")]
    pub file_count: u64,
    #[serde(rename = "loc_media_por_arquivo")]
    pub loc_average_per_file: f64,
    #[serde(rename = "comentarios_media_por_arquivo")]
    pub comments_average_per_file: f64,
}

impl RepoAggregateRecord {
    /// Reduce a repository's file records into a single rollup.
    ///
    /// Returns `None` for an empty slice: a repository with no usable rows
    /// produces no record at all.
    pub fn from_files(repository: &str, files: &[FileMetricRecord]) -> Option<Self> {
        if files.is_empty() {
            return None;
        }

        let file_count = files.len() as u64;
        let loc_total: i64 = files.iter().map(|f| f.loc).sum();
        let comments_total: u64 = files.iter().map(|f| f.comment_lines).sum();

        Some(Self {
            repository: repository.to_string(),
            loc_total,
            comments_total,
            cbo_total: files.iter().map(|f| f.cbo).sum(),
            dit_total: files.iter().map(|f| f.dit).sum(),
            lcom_total: files.iter().map(|f| f.lcom).sum(),
            file_count,
            loc_average_per_file: round_to(loc_total as f64 / file_count as f64, 2),
            comments_average_per_file: round_to(comments_total as f64 / file_count as f64, 2),
        })
    }
}

impl TableRow for RepoAggregateRecord {
    const COLUMNS: &'static [&'static str] = &[
        "repositorio",
        "loc_total",
        "comentarios_total",
        "cbo_total",
        "dit_total",
        "lcom_total",
        "arquivos_java",
        "loc_media_por_arquivo",
        "comentarios_media_por_arquivo",
    ];

    fn cells(&self) -> Vec<Cell> {
        vec![
            Cell::Text(self.repository.clone()),
            Cell::Number(self.loc_total as f64),
            Cell::Number(self.comments_total as f64),
            Cell::Number(self.cbo_total as f64),
            Cell::Number(self.dit_total as f64),
            Cell::Number(self.lcom_total as f64),
            Cell::Number(self.file_count as f64),
            Cell::Number(self.loc_average_per_file),
            Cell::Number(self.comments_average_per_file),
        ]
    }
}

// ── Corpus rollup ─────────────────────────────────────────────────────────────

/// Corpus-wide totals computed from every row of the repository table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GlobalAggregateRecord {
    pub loc_total: i64,
    #[serde(rename = "comentarios_total")]
    pub comments_total: u64,
    pub cbo_total: i64,
    pub dit_total: i64,
    pub lcom_total: i64,
    /// Number of rows in the repository table (duplicates included).
    #[serde(rename = "repositorios_total")]
    pub repository_count: u64,
    #[serde(rename = "arquivos_java_total")]
    pub total_file_count: u64,
}

impl GlobalAggregateRecord {
    /// Sum every total column across `rows`. Always recomputed from scratch.
    pub fn from_repositories(rows: &[RepoAggregateRecord]) -> Self {
        rows.iter().fold(
            Self {
                repository_count: rows.len() as u64,
                ..Self::default()
            },
            |mut acc, row| {
                acc.loc_total += row.loc_total;
                acc.comments_total += row.comments_total;
                acc.cbo_total += row.cbo_total;
                acc.dit_total += row.dit_total;
                acc.lcom_total += row.lcom_total;
                acc.total_file_count += row.file_count;
                acc
            },
        )
    }
}

impl TableRow for GlobalAggregateRecord {
    const COLUMNS: &'static [&'static str] = &[
        "loc_total",
        "comentarios_total",
        "cbo_total",
        "dit_total",
        "lcom_total",
        "repositorios_total",
        "arquivos_java_total",
    ];

    fn cells(&self) -> Vec<Cell> {
        vec![
            Cell::Number(self.loc_total as f64),
            Cell::Number(self.comments_total as f64),
            Cell::Number(self.cbo_total as f64),
            Cell::Number(self.dit_total as f64),
            Cell::Number(self.lcom_total as f64),
            Cell::Number(self.repository_count as f64),
            Cell::Number(self.total_file_count as f64),
        ]
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
