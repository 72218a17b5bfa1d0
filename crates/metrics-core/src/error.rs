use std::path::PathBuf;
use thiserror::Error;

/// All errors produced by the metrics pipeline.
///
/// Data-quality problems (missing sources, missing exports, malformed numbers)
/// are recovered where they occur and never reach this type.
#[derive(Error, Debug)]
pub enum MetricsError {
    /// A file could not be opened or read from disk.
    #[error("Failed to read file {path}: {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// An output file could not be written or moved into place.
    #[error("Failed to write file {path}: {source}")]
    FileWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A delimited table could not be read or written.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// The spreadsheet view of a table could not be produced.
    #[error("Spreadsheet error: {0}")]
    Spreadsheet(#[from] rust_xlsxwriter::XlsxError),

    /// A JSON document could not be produced.
    #[error("Failed to render JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// A configuration value is missing or invalid.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Pass-through for any raw I/O error that does not carry a path.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Catch-all for errors from third-party crates via `anyhow`.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Convenience alias used throughout the metrics crates.
pub type Result<T> = std::result::Result<T, MetricsError>;
