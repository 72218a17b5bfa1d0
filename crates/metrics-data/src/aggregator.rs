//! Per-repository aggregation and the durable repository table.
//!
//! [`RepoAggregator::aggregate_repository`] turns one repository's class
//! export into a [`RepoAggregateRecord`] and folds it into the
//! [`RepoTable`] persisted under the output directory.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use metrics_core::error::Result;
use metrics_core::formatting::format_count;
use metrics_core::models::{FileMetricRecord, GlobalAggregateRecord, RepoAggregateRecord};
use tracing::{info, warn};

use crate::enricher::FileMetricEnricher;
use crate::reader::{find_class_export, read_class_rows};
use crate::store::{self, REPO_TABLE_STEM};

// ── MergePolicy ───────────────────────────────────────────────────────────────

/// What happens when a repository already has a row in the table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MergePolicy {
    /// Always add a new row; re-running a repository duplicates it.
    #[default]
    Append,
    /// Drop earlier rows with the same repository name first.
    ReplaceExisting,
}

// ── RepoTable ─────────────────────────────────────────────────────────────────

/// In-memory copy of `total_metrics_per_repo`, one row per aggregation run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RepoTable {
    rows: Vec<RepoAggregateRecord>,
}

impl RepoTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_rows(rows: Vec<RepoAggregateRecord>) -> Self {
        Self { rows }
    }

    /// Load the persisted table, or `None` when it has never been written.
    pub fn load(output_dir: &Path) -> Result<Option<Self>> {
        Ok(store::read_table(output_dir, REPO_TABLE_STEM)?.map(Self::from_rows))
    }

    /// Load the persisted table, starting empty when there is none.
    pub fn load_or_default(output_dir: &Path) -> Result<Self> {
        Ok(Self::load(output_dir)?.unwrap_or_default())
    }

    /// Rewrite both views of the table under `output_dir`.
    pub fn save(&self, output_dir: &Path) -> Result<()> {
        store::write_table(output_dir, REPO_TABLE_STEM, &self.rows)
    }

    pub fn rows(&self) -> &[RepoAggregateRecord] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Add `record` according to `policy`. Returns how many rows it replaced.
    pub fn merge(&mut self, record: RepoAggregateRecord, policy: MergePolicy) -> usize {
        let replaced = match policy {
            MergePolicy::Append => 0,
            MergePolicy::ReplaceExisting => {
                let before = self.rows.len();
                self.rows.retain(|row| row.repository != record.repository);
                before - self.rows.len()
            }
        };
        self.rows.push(record);
        replaced
    }

    /// Order rows by `loc_total`, largest first. Ties keep their order.
    pub fn sort_by_loc_desc(&mut self) {
        self.rows.sort_by(|a, b| b.loc_total.cmp(&a.loc_total));
    }

    /// Repository names that occur in more than one row, sorted.
    pub fn duplicate_repositories(&self) -> Vec<&str> {
        let mut seen: BTreeMap<&str, usize> = BTreeMap::new();
        for row in &self.rows {
            *seen.entry(row.repository.as_str()).or_default() += 1;
        }
        seen.into_iter()
            .filter(|(_, count)| *count > 1)
            .map(|(name, _)| name)
            .collect()
    }

    /// Corpus totals over every row.
    pub fn global_summary(&self) -> GlobalAggregateRecord {
        GlobalAggregateRecord::from_repositories(&self.rows)
    }
}

// ── RepoAggregator ────────────────────────────────────────────────────────────

/// Aggregates repositories one at a time into the table under `output_dir`.
///
/// Each call performs a full load-merge-save cycle, so calls must not run
/// concurrently against the same output directory.
#[derive(Debug, Clone)]
pub struct RepoAggregator {
    output_dir: PathBuf,
    enricher: FileMetricEnricher,
    policy: MergePolicy,
}

impl RepoAggregator {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
            enricher: FileMetricEnricher::default(),
            policy: MergePolicy::default(),
        }
    }

    pub fn with_enricher(mut self, enricher: FileMetricEnricher) -> Self {
        self.enricher = enricher;
        self
    }

    pub fn with_policy(mut self, policy: MergePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Aggregate the class export found in `export_dir` for `repository`.
    ///
    /// Returns the per-file records that went into the new table row. An
    /// empty result means nothing was recorded: no export, an empty export,
    /// or no row with a source path. In those cases the table is untouched.
    pub fn aggregate_repository(
        &self,
        repository: &str,
        export_dir: &Path,
    ) -> Result<Vec<FileMetricRecord>> {
        let Some(export) = find_class_export(export_dir) else {
            warn!("No class CSV export found in {}", export_dir.display());
            return Ok(Vec::new());
        };

        info!("Processing metrics for {}", repository);

        let rows = read_class_rows(&export)?;
        if rows.is_empty() {
            warn!("Class export {} has no rows", export.display());
            return Ok(Vec::new());
        }

        let files = self.enricher.enrich_all(repository, &rows);
        let Some(record) = RepoAggregateRecord::from_files(repository, &files) else {
            warn!(
                "No row of {} references a source file; nothing recorded for {}",
                export.display(),
                repository
            );
            return Ok(files);
        };

        let mut table = RepoTable::load_or_default(&self.output_dir)?;
        let replaced = table.merge(record.clone(), self.policy);
        table.save(&self.output_dir)?;

        if replaced > 0 {
            info!("Replaced {} earlier row(s) for {}", replaced, repository);
        }
        info!(
            "Metrics for {} added to {}: files {}, LOC {}, comments {}",
            repository,
            REPO_TABLE_STEM,
            format_count(record.file_count as i64),
            format_count(record.loc_total),
            format_count(record.comments_total as i64),
        );

        Ok(files)
    }
}

/// Aggregate `repository` with default settings, appending to the table in
/// `output_dir`.
pub fn aggregate_repository(
    repository: &str,
    export_dir: &Path,
    output_dir: &Path,
) -> Result<Vec<FileMetricRecord>> {
    RepoAggregator::new(output_dir).aggregate_repository(repository, export_dir)
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const HEADER: &str = "file,class,type,cbo,wmc,dit,lcom,loc";

    fn record(name: &str, loc: i64) -> RepoAggregateRecord {
        RepoAggregateRecord {
            repository: name.to_string(),
            loc_total: loc,
            comments_total: 1,
            cbo_total: 1,
            dit_total: 1,
            lcom_total: 1,
            file_count: 1,
            loc_average_per_file: loc as f64,
            comments_average_per_file: 1.0,
        }
    }

    /// Lay out a repository checkout plus a CK results directory.
    ///
    /// Returns `(export_dir, source_dir)`.
    fn fixture(tmp: &TempDir) -> (PathBuf, PathBuf) {
        let sources = tmp.path().join("repositories").join("demo");
        let export = tmp.path().join("results");
        std::fs::create_dir_all(&sources).expect("mkdir sources");
        std::fs::create_dir_all(&export).expect("mkdir export");

        let mut a = String::new();
        for i in 0..10 {
            a.push_str(&format!("// comment {i}\n"));
        }
        a.push_str("class A {}\n");
        std::fs::write(sources.join("A.java"), a).expect("write A");
        std::fs::write(
            sources.join("B.java"),
            "/*\n * one\n * two\n * three\n */\nclass B {}\n",
        )
        .expect("write B");

        let csv = format!(
            "{HEADER}\n{a},demo.A,class,2,3,1,0,100\n{b},demo.B,class,1,1,0,0,50\n",
            a = sources.join("A.java").display(),
            b = sources.join("B.java").display(),
        );
        std::fs::write(export.join("class.csv"), csv).expect("write export");
        (export, sources)
    }

    fn out_dir(tmp: &TempDir) -> PathBuf {
        tmp.path().join("data")
    }

    // ── RepoTable ─────────────────────────────────────────────────────────────

    #[test]
    fn test_merge_append_keeps_duplicates() {
        let mut table = RepoTable::new();
        assert_eq!(table.merge(record("a", 1), MergePolicy::Append), 0);
        assert_eq!(table.merge(record("a", 2), MergePolicy::Append), 0);
        assert_eq!(table.len(), 2);
        assert_eq!(table.duplicate_repositories(), vec!["a"]);
    }

    #[test]
    fn test_merge_replace_keeps_one_row_per_repository() {
        let mut table = RepoTable::from_rows(vec![record("a", 1), record("b", 2), record("a", 3)]);
        assert_eq!(table.merge(record("a", 9), MergePolicy::ReplaceExisting), 2);

        let names: Vec<&str> = table.rows().iter().map(|r| r.repository.as_str()).collect();
        assert_eq!(names, vec!["b", "a"]);
        assert_eq!(table.rows()[1].loc_total, 9);
        assert!(table.duplicate_repositories().is_empty());
    }

    #[test]
    fn test_sort_by_loc_desc_is_stable() {
        let mut table = RepoTable::from_rows(vec![
            record("small", 10),
            record("tie-first", 50),
            record("big", 900),
            record("tie-second", 50),
        ]);
        table.sort_by_loc_desc();

        let names: Vec<&str> = table.rows().iter().map(|r| r.repository.as_str()).collect();
        assert_eq!(names, vec!["big", "tie-first", "tie-second", "small"]);
    }

    #[test]
    fn test_load_missing_table_is_none() {
        let tmp = TempDir::new().expect("tempdir");
        assert!(RepoTable::load(tmp.path()).expect("load").is_none());
        assert!(RepoTable::load_or_default(tmp.path()).expect("load").is_empty());
    }

    #[test]
    fn test_save_then_load() {
        let tmp = TempDir::new().expect("tempdir");
        let table = RepoTable::from_rows(vec![record("a", 1), record("b", 2)]);
        table.save(tmp.path()).expect("save");
        assert_eq!(RepoTable::load(tmp.path()).expect("load"), Some(table));
    }

    // ── aggregate_repository ──────────────────────────────────────────────────

    #[test]
    fn test_aggregate_two_file_scenario() {
        let tmp = TempDir::new().expect("tempdir");
        let (export, _) = fixture(&tmp);
        let out = out_dir(&tmp);

        let files = aggregate_repository("demo", &export, &out).expect("aggregate");
        assert_eq!(files.len(), 2);
        assert_eq!(files[0].file_name, "A.java");
        assert_eq!(files[0].comment_lines, 10);
        assert_eq!(files[1].comment_lines, 5);

        let table = RepoTable::load(&out).expect("load").expect("table written");
        assert_eq!(table.len(), 1);
        let row = &table.rows()[0];
        assert_eq!(row.repository, "demo");
        assert_eq!(row.loc_total, 150);
        assert_eq!(row.comments_total, 15);
        assert_eq!(row.cbo_total, 3);
        assert_eq!(row.dit_total, 1);
        assert_eq!(row.file_count, 2);
        assert_eq!(row.loc_average_per_file, 75.0);
        assert_eq!(row.comments_average_per_file, 7.5);

        assert!(store::xlsx_path(&out, REPO_TABLE_STEM).is_file());
    }

    #[test]
    fn test_aggregate_totals_match_file_records() {
        let tmp = TempDir::new().expect("tempdir");
        let (export, _) = fixture(&tmp);
        let out = out_dir(&tmp);

        let files = aggregate_repository("demo", &export, &out).expect("aggregate");
        let table = RepoTable::load(&out).expect("load").expect("table");
        let row = &table.rows()[0];

        assert_eq!(row.loc_total, files.iter().map(|f| f.loc).sum::<i64>());
        assert_eq!(row.file_count, files.len() as u64);
    }

    #[test]
    fn test_aggregate_missing_loc_still_counts_file() {
        let tmp = TempDir::new().expect("tempdir");
        let export = tmp.path().join("results");
        std::fs::create_dir_all(&export).expect("mkdir");
        std::fs::write(
            export.join("class.csv"),
            format!("{HEADER}\n/x/A.java,a.A,class,1,1,1,1,\n/x/B.java,b.B,class,1,1,1,1,40\n"),
        )
        .expect("write");
        let out = out_dir(&tmp);

        let files = aggregate_repository("demo", &export, &out).expect("aggregate");
        assert_eq!(files.len(), 2);
        assert_eq!(files[0].loc, 0);

        let table = RepoTable::load(&out).expect("load").expect("table");
        assert_eq!(table.rows()[0].file_count, 2);
        assert_eq!(table.rows()[0].loc_total, 40);
        assert_eq!(table.rows()[0].loc_average_per_file, 20.0);
    }

    #[test]
    fn test_aggregate_without_export_leaves_table_unchanged() {
        let tmp = TempDir::new().expect("tempdir");
        let out = out_dir(&tmp);
        let existing = RepoTable::from_rows(vec![record("earlier", 7)]);
        existing.save(&out).expect("seed table");
        let before = std::fs::read(store::csv_path(&out, REPO_TABLE_STEM)).expect("read");

        let export = tmp.path().join("results");
        std::fs::create_dir_all(&export).expect("mkdir");
        std::fs::write(export.join("method.csv"), "file,method\n").expect("write");

        let files = aggregate_repository("demo", &export, &out).expect("aggregate");
        assert!(files.is_empty());

        let after = std::fs::read(store::csv_path(&out, REPO_TABLE_STEM)).expect("read");
        assert_eq!(before, after);
    }

    #[test]
    fn test_aggregate_missing_export_dir_creates_nothing() {
        let tmp = TempDir::new().expect("tempdir");
        let out = out_dir(&tmp);

        let files =
            aggregate_repository("demo", &tmp.path().join("absent"), &out).expect("aggregate");
        assert!(files.is_empty());
        assert!(!out.exists());
    }

    #[test]
    fn test_aggregate_empty_export_records_nothing() {
        let tmp = TempDir::new().expect("tempdir");
        let export = tmp.path().join("results");
        std::fs::create_dir_all(&export).expect("mkdir");
        std::fs::write(export.join("class.csv"), format!("{HEADER}\n")).expect("write");
        let out = out_dir(&tmp);

        let files = aggregate_repository("demo", &export, &out).expect("aggregate");
        assert!(files.is_empty());
        assert!(RepoTable::load(&out).expect("load").is_none());
    }

    #[test]
    fn test_aggregate_only_pathless_rows_records_nothing() {
        let tmp = TempDir::new().expect("tempdir");
        let export = tmp.path().join("results");
        std::fs::create_dir_all(&export).expect("mkdir");
        std::fs::write(
            export.join("class.csv"),
            format!("{HEADER}\n,a.A,class,1,1,1,1,10\n"),
        )
        .expect("write");
        let out = out_dir(&tmp);

        let files = aggregate_repository("demo", &export, &out).expect("aggregate");
        assert!(files.is_empty());
        assert!(RepoTable::load(&out).expect("load").is_none());
    }

    #[test]
    fn test_rerun_appends_duplicate_row_by_default() {
        let tmp = TempDir::new().expect("tempdir");
        let (export, _) = fixture(&tmp);
        let out = out_dir(&tmp);

        aggregate_repository("demo", &export, &out).expect("first run");
        aggregate_repository("demo", &export, &out).expect("second run");

        let table = RepoTable::load(&out).expect("load").expect("table");
        assert_eq!(table.len(), 2);
        assert_eq!(table.duplicate_repositories(), vec!["demo"]);
    }

    #[test]
    fn test_rerun_with_replace_keeps_repository_unique() {
        let tmp = TempDir::new().expect("tempdir");
        let (export, _) = fixture(&tmp);
        let out = out_dir(&tmp);
        let aggregator = RepoAggregator::new(&out).with_policy(MergePolicy::ReplaceExisting);

        aggregator.aggregate_repository("demo", &export).expect("first run");
        aggregator.aggregate_repository("demo", &export).expect("second run");

        let table = RepoTable::load(&out).expect("load").expect("table");
        assert_eq!(table.len(), 1);
        assert!(table.duplicate_repositories().is_empty());
    }

    #[test]
    fn test_aggregate_appends_after_existing_rows() {
        let tmp = TempDir::new().expect("tempdir");
        let (export, _) = fixture(&tmp);
        let out = out_dir(&tmp);
        RepoTable::from_rows(vec![record("earlier", 7)])
            .save(&out)
            .expect("seed");

        aggregate_repository("demo", &export, &out).expect("aggregate");

        let table = RepoTable::load(&out).expect("load").expect("table");
        let names: Vec<&str> = table.rows().iter().map(|r| r.repository.as_str()).collect();
        assert_eq!(names, vec!["earlier", "demo"]);
    }

    #[test]
    fn test_aggregate_resolves_relative_paths_with_source_root() {
        let tmp = TempDir::new().expect("tempdir");
        let (_, sources) = fixture(&tmp);
        let export = tmp.path().join("relative-results");
        std::fs::create_dir_all(&export).expect("mkdir");
        std::fs::write(
            export.join("demo-class.csv"),
            format!("{HEADER}\nA.java,demo.A,class,0,0,0,0,11\n"),
        )
        .expect("write");
        let out = out_dir(&tmp);

        let aggregator = RepoAggregator::new(&out)
            .with_enricher(FileMetricEnricher::new(Some(sources)));
        let files = aggregator.aggregate_repository("demo", &export).expect("aggregate");

        assert_eq!(files.len(), 1);
        assert_eq!(files[0].comment_lines, 10);
    }
}
