#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Record cleaning for raw DVF exports.
//!
//! Turns a government-published `ValeursFoncieres` file into the canonical
//! transaction set: one residential sale per mutation with a positive price,
//! a positive living area and resolvable geographic keys.

pub mod canonical;
pub mod clean;
pub mod parse;
pub mod progress;

use std::path::PathBuf;

pub use canonical::{read_transactions, write_transactions};
pub use clean::{CleanOutput, CleanReport, Cleaner, RejectReason, clean_file, clean_reader};

/// Errors that can occur while cleaning or reading transactions.
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
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

    /// A required source column is absent from the header row.
    #[error("Missing required column: {column}")]
    MissingColumn {
        /// Configured column name.
        column: String,
    },

    /// A canonical table row cannot be decoded or breaks an invariant.
    #[error("Invalid transaction on line {line}: {message}")]
    InvalidRecord {
        /// 1-based line number including the header.
        line: u64,
        /// Description of what went wrong.
        message: String,
    },

    /// The cleaning settings cannot be applied.
    #[error("Invalid cleaning config: {message}")]
    InvalidConfig {
        /// Description of what went wrong.
        message: String,
    },

    /// No transaction survived cleaning.
    #[error("Empty transaction set: refusing to publish empty artifacts")]
    EmptyTransactionSet,
}
