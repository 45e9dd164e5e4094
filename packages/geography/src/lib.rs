#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Administrative boundaries and the geographic hierarchy.
//!
//! Boundary polygons are loaded from WGS84 `GeoJSON` files, one per level.
//! The [`hierarchy::GeoHierarchy`] combines those units with the embedded
//! INSEE region/department table and resolves a transaction to its unit
//! at any level by walking parent references.

pub mod boundaries;
pub mod hierarchy;
pub mod simplify;

use std::path::PathBuf;

use thiserror::Error;

pub use boundaries::{Boundary, BoundaryLayer};
pub use hierarchy::GeoHierarchy;

/// Errors that can occur during geography operations.
#[derive(Debug, Error)]
pub enum GeoError {
    /// A boundary source could not be read.
    #[error("Failed to read boundary source {path}: {source}")]
    Io {
        /// Path of the boundary file.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// `GeoJSON` parsing failed.
    #[error("GeoJSON error: {0}")]
    GeoJson(#[from] geojson::Error),

    /// Data conversion error.
    #[error("Conversion error: {message}")]
    Conversion {
        /// Description of what went wrong.
        message: String,
    },
}
