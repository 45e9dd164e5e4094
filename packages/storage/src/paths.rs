#![allow(clippy::module_name_repetitions)]
//! Canonical file paths inside the pipeline data directory.
//!
//! ```text
//! <data_dir>/
//!   intermediate/transactions.csv
//!   mart/<level>.csv
//!   mart/manifest.json
//!   tiles/<level>.geojson
//!   tiles/<level>.pmtiles
//! ```

use std::path::{Path, PathBuf};

use dvf_map_geography_models::GeoLevel;

/// File name of the canonical transaction table.
pub const TRANSACTIONS_FILE: &str = "transactions.csv";

/// File name of the run manifest.
pub const MANIFEST_FILE: &str = "manifest.json";

/// Paths derived from a single data directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataLayout {
    root: PathBuf,
}

impl DataLayout {
    /// Creates a layout rooted at `root`.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Returns the `intermediate/` directory holding the canonical table.
    #[must_use]
    pub fn intermediate_dir(&self) -> PathBuf {
        self.root.join("intermediate")
    }

    /// Returns the `mart/` directory holding statistics tables.
    #[must_use]
    pub fn mart_dir(&self) -> PathBuf {
        self.root.join("mart")
    }

    /// Returns the `tiles/` directory holding map artifacts.
    #[must_use]
    pub fn tiles_dir(&self) -> PathBuf {
        self.root.join("tiles")
    }

    /// Returns the path of the canonical transaction table.
    #[must_use]
    pub fn transactions_csv(&self) -> PathBuf {
        self.intermediate_dir().join(TRANSACTIONS_FILE)
    }

    /// Returns the path of the run manifest.
    #[must_use]
    pub fn manifest(&self) -> PathBuf {
        self.mart_dir().join(MANIFEST_FILE)
    }

    /// Returns the path of the statistics table for `level`.
    #[must_use]
    pub fn level_table(&self, level: GeoLevel) -> PathBuf {
        self.mart_dir().join(level_table_file(level))
    }

    /// Returns the path of the `GeoJSON` tile for `level`.
    #[must_use]
    pub fn tile_geojson(&self, level: GeoLevel) -> PathBuf {
        self.tiles_dir().join(tile_geojson_file(level))
    }
}

/// File name of the statistics table for `level`.
#[must_use]
pub fn level_table_file(level: GeoLevel) -> String {
    format!("{level}.csv")
}

/// File name of the `GeoJSON` tile for `level`.
#[must_use]
pub fn tile_geojson_file(level: GeoLevel) -> String {
    format!("{level}.geojson")
}

/// File name of the `PMTiles` archive for `level`.
#[must_use]
pub fn tile_pmtiles_file(level: GeoLevel) -> String {
    format!("{level}.pmtiles")
}

/// Ensures a directory exists, creating it if necessary.
///
/// # Errors
///
/// Returns an I/O error if the directory cannot be created.
pub fn ensure_dir(path: &Path) -> std::io::Result<()> {
    if !path.exists() {
        std::fs::create_dir_all(path)?;
    }
    Ok(())
}
