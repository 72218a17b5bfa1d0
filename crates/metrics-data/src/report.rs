//! Human- and machine-readable renderings of the repository table.

use chrono::Utc;
use metrics_core::error::Result;
use metrics_core::formatting::{format_count, format_number};

use crate::aggregator::RepoTable;

const RULE_WIDTH: usize = 70;

/// Notice printed when there is nothing to report.
pub const NO_DATA: &str = "No data to display";

/// Render one block per repository, in table order.
pub fn render_text(table: Option<&RepoTable>) -> String {
    let Some(table) = table.filter(|t| !t.is_empty()) else {
        return format!("{NO_DATA}\n");
    };

    let mut out = String::new();
    out.push_str("\nFINAL SUMMARY\n");
    out.push_str(&"=".repeat(RULE_WIDTH));
    out.push('\n');

    for row in table.rows() {
        out.push_str(&format!(" {}\n", row.repository));
        out.push_str(&format!("   Files: {}\n", format_count(row.file_count as i64)));
        out.push_str(&format!("   LOC total: {}\n", format_count(row.loc_total)));
        out.push_str(&format!(
            "   Comments: {}\n",
            format_count(row.comments_total as i64)
        ));
        out.push_str(&format!(
            "   LOC/file: {}\n",
            format_number(row.loc_average_per_file, 2)
        ));
        out.push('\n');
    }

    out
}

/// Render the table and its corpus summary as pretty-printed JSON.
///
/// Row keys are the persisted column names. `summary` is `null` when there is
/// no table.
pub fn render_json(table: Option<&RepoTable>) -> Result<String> {
    let document = serde_json::json!({
        "generated_at": Utc::now().to_rfc3339(),
        "summary": table.map(RepoTable::global_summary),
        "repositories": table.map(RepoTable::rows).unwrap_or_default(),
    });
    Ok(serde_json::to_string_pretty(&document)?)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
