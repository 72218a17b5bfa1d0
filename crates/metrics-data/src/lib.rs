//! Aggregation pipeline for CK class metrics.
//!
//! Counts comment lines in source files, joins them with the rows of a CK
//! class export, folds each repository into a durable per-repository table,
//! and rolls that table up into a corpus summary.

pub mod aggregator;
pub mod comments;
pub mod corpus;
pub mod enricher;
pub mod reader;
pub mod report;
pub mod store;

pub use aggregator::{aggregate_repository, MergePolicy, RepoAggregator, RepoTable};
pub use corpus::finalize_corpus;
