//! Corpus-wide rollup over the repository table.

use std::path::Path;

use metrics_core::error::Result;
use metrics_core::formatting::format_count;
use tracing::{info, warn};

use crate::aggregator::RepoTable;
use crate::store::{self, GLOBAL_SUMMARY_STEM, REPO_TABLE_STEM};

/// Compute the corpus totals and put the repository table in final order.
///
/// Writes `total_metrics.{csv,xlsx}` from scratch, then rewrites
/// `total_metrics_per_repo.{csv,xlsx}` sorted by `loc_total` descending and
/// returns the sorted table. Returns `None` without writing anything when no
/// repository table exists yet. Calling this repeatedly yields the same
/// content.
pub fn finalize_corpus(output_dir: &Path) -> Result<Option<RepoTable>> {
    let Some(mut table) = RepoTable::load(output_dir)? else {
        warn!(
            "{} not found in {}; nothing to finalize",
            store::csv_path(output_dir, REPO_TABLE_STEM).display(),
            output_dir.display()
        );
        return Ok(None);
    };

    let summary = table.global_summary();
    store::write_table(output_dir, GLOBAL_SUMMARY_STEM, std::slice::from_ref(&summary))?;
    info!(
        "Corpus totals saved: {} repositories, {} files, LOC {}",
        format_count(summary.repository_count as i64),
        format_count(summary.total_file_count as i64),
        format_count(summary.loc_total),
    );

    let duplicates = table.duplicate_repositories();
    if !duplicates.is_empty() {
        warn!(
            "Repositories recorded more than once: {}",
            duplicates.join(", ")
        );
    }

    table.sort_by_loc_desc();
    table.save(output_dir)?;

    Ok(Some(table))
}

// ── Tests ─────────────────────────────────────────────────────────────────────
