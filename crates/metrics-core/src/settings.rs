use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::error::{MetricsError, Result};

// ── Settings (CLI) ─────────────────────────────────────────────────────────────

/// Aggregate CK class metrics into per-repository and corpus-wide totals
#[derive(Parser, Debug, Clone)]
#[command(
    name = "ck-metrics",
    about = "Aggregate CK class metrics into per-repository and corpus-wide totals",
    version
)]
pub struct Settings {
    /// Directory holding the aggregate tables
    #[arg(long, env = "DATA_DIR", default_value = "data", global = true)]
    pub output_dir: PathBuf,

    /// Logging level
    #[arg(long, default_value = "INFO", global = true, value_parser = ["DEBUG", "INFO", "WARNING", "ERROR"])]
    pub log_level: String,

    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// Pipeline stage to run.
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Fold one repository's class export into the repository table
    Aggregate(AggregateArgs),

    /// Compute the corpus summary, sort the repository table and print it
    Finalize {
        /// Output format
        #[arg(long, default_value = "text", value_parser = ["text", "json"])]
        format: String,
    },

    /// Print the repository table as it currently stands
    Report {
        /// Output format
        #[arg(long, default_value = "text", value_parser = ["text", "json"])]
        format: String,
    },
}

/// Arguments of the `aggregate` subcommand.
#[derive(Args, Debug, Clone, PartialEq, Eq)]
pub struct AggregateArgs {
    /// Repository name recorded in the table
    pub repository: String,

    /// Directory containing the CK class export for this repository
    #[arg(long, env = "RESULTS_DIR", default_value = "results")]
    pub export_dir: PathBuf,

    /// Root used to resolve relative source paths in the export
    #[arg(long, env = "REPOSITORIES_DIR")]
    pub source_root: Option<PathBuf>,

    /// Replace earlier rows for the same repository instead of appending
    #[arg(long)]
    pub replace_existing: bool,
}

// ── Settings impl ──────────────────────────────────────────────────────────────

impl Settings {
    /// Parse the process arguments and apply the `--debug` override.
    pub fn load() -> Self {
        Self::resolve(Settings::parse())
    }

    /// Same as [`Settings::load`] but with an explicit argument list.
    pub fn load_from<I, T>(args: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        Self::resolve(Settings::parse_from(args))
    }

    /// Reject an output location that exists but is not a directory.
    pub fn validate(&self) -> Result<()> {
        if self.output_dir.exists() && !self.output_dir.is_dir() {
            return Err(MetricsError::Config(format!(
                "output dir {} is not a directory",
                self.output_dir.display()
            )));
        }
        Ok(())
    }

    fn resolve(mut settings: Settings) -> Settings {
        // --debug overrides log level.
        if settings.debug {
            settings.log_level = "DEBUG".to_string();
        }
        settings
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────────
