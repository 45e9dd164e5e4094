#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Multi-level aggregation of cleaned transactions.
//!
//! Produces one [`LevelTable`](dvf_map_analytics_models::LevelTable) per
//! geographic level, keeping only the (unit, property type) groups with
//! enough sales to be published.

pub mod aggregate;
pub mod table;

use std::path::PathBuf;

use dvf_map_geography_models::GeoLevel;
use thiserror::Error;

pub use aggregate::{LevelSummary, aggregate_all, aggregate_level, aggregated_levels};
pub use table::{read_table, write_table};

/// Errors that can occur during aggregation.
#[derive(Debug, Error)]
pub enum AnalyticsError {
    /// A file could not be opened or written.
    #[error("I/O error on {path}: {source}")]
    Io {
        /// Path being accessed.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// CSV reading or writing failed.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// There is nothing to aggregate.
    #[error("Empty transaction set: nothing to aggregate")]
    EmptyTransactionSet,

    /// An aggregate table has not been produced yet.
    #[error("Missing {level} table at {path} (run `aggregate` first)")]
    MissingTable {
        /// Level of the missing table.
        level: GeoLevel,
        /// Expected location.
        path: PathBuf,
    },

    /// An aggregate table row is malformed.
    #[error("Invalid record in {path} on line {line}: {message}")]
    InvalidRecord {
        /// Table being read.
        path: PathBuf,
        /// 1-based line number including the header.
        line: u64,
        /// Description of what went wrong.
        message: String,
    },
}
