#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Tile generation and pipeline orchestration.
//!
//! Joins per-level statistics onto simplified boundary polygons and writes
//! one `GeoJSON` `FeatureCollection` per tiled level, optionally converted
//! to `PMTiles` by tippecanoe.
//!
//! The [`pipeline`] module sequences cleaning, aggregation and tile
//! building. A manifest next to the statistics tables records the
//! fingerprints they were computed from so an unchanged aggregation is not
//! repeated. Every artifact group is written to a staging directory and
//! published only once complete.

pub mod manifest;
pub mod pipeline;
pub mod pmtiles;
pub mod tiles;

use std::path::PathBuf;

use dvf_map_geography_models::GeoLevel;
use thiserror::Error;

pub use pipeline::{AggregateOutcome, Pipeline, StageProgress};
pub use tiles::{TileSummary, build_level_tile};

/// Errors that can occur while generating artifacts.
#[derive(Debug, Error)]
pub enum GenerateError {
    /// Configuration could not be loaded.
    #[error(transparent)]
    Config(#[from] dvf_map_config::ConfigError),

    /// Cleaning or reading the canonical table failed.
    #[error(transparent)]
    Ingest(#[from] dvf_map_ingest::IngestError),

    /// Aggregation or statistics table I/O failed.
    #[error(transparent)]
    Analytics(#[from] dvf_map_analytics::AnalyticsError),

    /// A boundary source could not be loaded.
    #[error(transparent)]
    Geo(#[from] dvf_map_geography::GeoError),

    /// Publishing or fingerprinting failed.
    #[error(transparent)]
    Storage(#[from] dvf_map_storage::StorageError),

    /// JSON serialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A file could not be written.
    #[error("I/O error on {path}: {source}")]
    Io {
        /// Path being accessed.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// A tiled level has no configured boundary source.
    #[error("No boundary source configured for tiled level {level}")]
    MissingBoundaries {
        /// Level without boundaries.
        level: GeoLevel,
    },

    /// tippecanoe could not be run or exited with an error.
    #[error("tippecanoe failed for {level}: {message}")]
    Tippecanoe {
        /// Level being converted.
        level: GeoLevel,
        /// Description of what went wrong.
        message: String,
    },
}
