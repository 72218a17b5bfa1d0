//! Shared types for the CK metrics pipeline.
//!
//! Holds the error type, the export/aggregate data model, command-line
//! settings and the number formatting used by reports.

pub mod error;
pub mod formatting;
pub mod models;
pub mod settings;

pub use error::{MetricsError, Result};
