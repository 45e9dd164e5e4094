#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Pipeline configuration.
//!
//! The default configuration is baked into the binary from
//! `default.toml` via [`include_str!`]. A user file is merged over it key
//! by key, so partial overrides are enough. The resulting
//! [`PipelineConfig`] is immutable and handed by reference to every stage.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use dvf_map_geography_models::GeoLevel;
use dvf_map_transaction_models::PropertyType;
use serde::{Deserialize, Serialize};

/// Default configuration embedded at compile time.
pub const DEFAULT_CONFIG_TOML: &str = include_str!("../default.toml");

/// Errors that can occur while loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("Failed to read config {path}: {source}")]
    Io {
        /// Path of the config file.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The TOML could not be parsed or did not match the schema.
    #[error("Config parse error: {0}")]
    Parse(#[from] toml::de::Error),

    /// A value is out of range or inconsistent.
    #[error("Invalid config: {message}")]
    Invalid {
        /// Description of what went wrong.
        message: String,
    },
}

/// Complete pipeline configuration.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PipelineConfig {
    /// Input and output locations.
    pub paths: PathsConfig,
    /// Record cleaning rules.
    pub cleaning: CleaningConfig,
    /// Per-level settings.
    pub levels: BTreeMap<GeoLevel, LevelConfig>,
    /// Boundary geometry sources per level. Levels without an entry have
    /// no geometry and accept any transaction key.
    #[serde(default)]
    pub boundaries: BTreeMap<GeoLevel, BoundarySource>,
    /// Tile output settings.
    pub tiles: TilesConfig,
    /// Neighborhood level behavior.
    pub neighborhood: NeighborhoodConfig,
}

/// Input and output locations.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PathsConfig {
    /// Raw DVF export.
    pub raw_transactions: PathBuf,
    /// Root of the `intermediate/`, `mart/` and `tiles/` directories.
    pub data_dir: PathBuf,
}

/// Record cleaning rules.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CleaningConfig {
    /// Field delimiter of the raw file.
    pub delimiter: char,
    /// Accepted `Nature mutation` value.
    pub mutation_nature: String,
    /// Property types kept in the canonical set.
    pub property_types: Vec<PropertyType>,
    /// Surfaces must be strictly greater than this.
    pub min_surface_m2: f64,
    /// Prices must be strictly greater than this.
    pub min_price_eur: f64,
    /// Inclusive lower plausibility bound for price per m².
    pub min_price_m2: f64,
    /// Inclusive upper plausibility bound for price per m².
    pub max_price_m2: f64,
    /// Percentile-based upper trimming.
    pub outliers: OutlierConfig,
    /// Source column names.
    pub columns: ColumnMapping,
}

/// Percentile-based upper trimming of price per m².
///
/// The cap is `min(q_hi + iqr_multiplier * (q_hi - q_lo), absolute_max)`.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct OutlierConfig {
    /// Whether trimming is applied at all.
    pub enabled: bool,
    /// Lower quantile of the spread (e.g. 0.10).
    pub lower_quantile: f64,
    /// Upper quantile of the spread (e.g. 0.90).
    pub upper_quantile: f64,
    /// Spread multiplier added above the upper quantile.
    pub iqr_multiplier: f64,
    /// Hard ceiling on the cap.
    pub absolute_max_price_m2: f64,
}

/// Maps canonical fields to source column names.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ColumnMapping {
    /// Columns concatenated into the mutation key.
    pub mutation_key: Vec<String>,
    /// Sale date.
    pub mutation_date: String,
    /// Mutation nature (sale, exchange, auction...).
    pub mutation_nature: String,
    /// Total sale price.
    pub price: String,
    /// Postcode.
    pub postcode: String,
    /// Department code.
    pub department: String,
    /// Commune code (three digits, or a full INSEE code).
    pub commune: String,
    /// Local type label.
    pub property_type: String,
    /// Built surface.
    pub built_surface: String,
    /// Carrez surface of the first lot.
    pub carrez_surface: String,
    /// Optional longitude column.
    #[serde(default)]
    pub longitude: Option<String>,
    /// Optional latitude column.
    #[serde(default)]
    pub latitude: Option<String>,
    /// Optional IRIS code column.
    #[serde(default)]
    pub iris_code: Option<String>,
}

/// Settings for one aggregation level.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LevelConfig {
    /// Stability threshold: groups with fewer sales are suppressed.
    pub min_sales: u64,
    /// Simplification tolerance in degrees (0 disables simplification).
    pub simplify_tolerance: f64,
    /// Whether a tile artifact is produced for this level.
    pub tile: bool,
    /// Minimum zoom for tile conversion.
    pub min_zoom: u8,
    /// Maximum zoom for tile conversion.
    pub max_zoom: u8,
}

/// A GeoJSON boundary source.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct BoundarySource {
    /// Path to a WGS84 GeoJSON `FeatureCollection`.
    pub path: PathBuf,
    /// Feature property holding the unit code.
    pub code_property: String,
    /// Feature property holding the display name.
    #[serde(default)]
    pub name_property: Option<String>,
    /// Feature property holding the parent unit code.
    #[serde(default)]
    pub parent_property: Option<String>,
}

/// What to do with units whose statistics were suppressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SuppressedPolicy {
    /// Drop the unit from the tile.
    Omit,
    /// Keep the unit with null statistic properties.
    Null,
}

/// Tile output settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct TilesConfig {
    /// Policy for units without surviving statistics.
    pub suppressed: SuppressedPolicy,
    /// Convert GeoJSON tiles to `PMTiles` with tippecanoe.
    pub pmtiles: bool,
}

/// How neighborhood statistics are obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NeighborhoodStrategy {
    /// Each IRIS unit shows its parent commune's statistics. No
    /// neighborhood statistics table is produced.
    CommuneFallback,
    /// Aggregate on the IRIS code carried by each transaction.
    DirectCode,
}

/// Neighborhood level behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct NeighborhoodConfig {
    /// Strategy in effect.
    pub strategy: NeighborhoodStrategy,
}

/// The configuration values that affect statistics tables. Serialized into
/// the run manifest to detect when cached tables are stale.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregationSettings {
    /// `min_sales` per level name.
    pub thresholds: BTreeMap<String, u64>,
    /// Neighborhood strategy.
    pub neighborhood: NeighborhoodStrategy,
}

impl PipelineConfig {
    /// Returns the embedded default configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the embedded TOML fails to parse or
    /// validate.
    pub fn embedded_default() -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(DEFAULT_CONFIG_TOML)?;
        config.validate()?;
        Ok(config)
    }

    /// Loads the embedded default, merged with `path` when given.
    ///
    /// Relative paths in the user file are resolved against its directory.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the file cannot be read, parsed, or fails
    /// validation.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let Some(path) = path else {
            return Self::embedded_default();
        };

        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        log::info!("Loading config from {}", path.display());

        let mut config = Self::from_overlay(&contents)?;
        if let Some(base) = path.parent() {
            config.resolve_relative_paths(base);
        }
        config.validate()?;
        Ok(config)
    }

    /// Merges a TOML overlay over the embedded default without resolving
    /// paths.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if either document fails to parse.
    pub fn from_overlay(overlay: &str) -> Result<Self, ConfigError> {
        let mut base: toml::Table = toml::from_str(DEFAULT_CONFIG_TOML)?;
        let overlay: toml::Table = toml::from_str(overlay)?;
        merge_tables(&mut base, overlay);
        let config: Self = toml::Value::Table(base).try_into()?;
        Ok(config)
    }

    /// Settings for `level`.
    ///
    /// # Panics
    ///
    /// Panics if `level` is missing, which [`Self::validate`] rules out.
    #[must_use]
    pub fn level(&self, level: GeoLevel) -> &LevelConfig {
        self.levels
            .get(&level)
            .unwrap_or_else(|| panic!("level {level} missing from validated config"))
    }

    /// Stability threshold for `level`.
    #[must_use]
    pub fn min_sales(&self, level: GeoLevel) -> u64 {
        self.level(level).min_sales
    }

    /// Levels that produce a tile artifact, coarsest first.
    #[must_use]
    pub fn tiled_levels(&self) -> Vec<GeoLevel> {
        GeoLevel::all()
            .iter()
            .copied()
            .filter(|l| self.level(*l).tile)
            .collect()
    }

    /// Whether neighborhood tiles reuse commune statistics.
    #[must_use]
    pub fn uses_commune_fallback(&self) -> bool {
        self.neighborhood.strategy == NeighborhoodStrategy::CommuneFallback
    }

    /// The subset of settings that determines statistics table contents.
    #[must_use]
    pub fn aggregation_settings(&self) -> AggregationSettings {
        AggregationSettings {
            thresholds: self
                .levels
                .iter()
                .map(|(level, cfg)| (level.to_string(), cfg.min_sales))
                .collect(),
            neighborhood: self.neighborhood.strategy,
        }
    }

    /// Checks ranges and cross-field consistency.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] describing the first problem found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for level in GeoLevel::all() {
            let Some(cfg) = self.levels.get(level) else {
                return Err(invalid(format!("missing [levels.{level}]")));
            };
            if cfg.min_sales == 0 {
                return Err(invalid(format!("levels.{level}.min_sales must be >= 1")));
            }
            if !cfg.simplify_tolerance.is_finite() || cfg.simplify_tolerance < 0.0 {
                return Err(invalid(format!(
                    "levels.{level}.simplify_tolerance must be finite and >= 0"
                )));
            }
            if cfg.min_zoom > cfg.max_zoom {
                return Err(invalid(format!("levels.{level}.min_zoom > max_zoom")));
            }
        }

        let cleaning = &self.cleaning;
        if !cleaning.delimiter.is_ascii() {
            return Err(invalid("cleaning.delimiter must be a single ASCII character"));
        }
        if cleaning.property_types.is_empty() {
            return Err(invalid("cleaning.property_types must not be empty"));
        }
        if cleaning.min_surface_m2 < 0.0 || cleaning.min_price_eur < 0.0 {
            return Err(invalid("cleaning minimums must be >= 0"));
        }
        if cleaning.min_price_m2 > cleaning.max_price_m2 {
            return Err(invalid("cleaning.min_price_m2 > cleaning.max_price_m2"));
        }
        let outliers = &cleaning.outliers;
        if !(0.0..=1.0).contains(&outliers.lower_quantile)
            || !(0.0..=1.0).contains(&outliers.upper_quantile)
            || outliers.lower_quantile > outliers.upper_quantile
        {
            return Err(invalid(
                "cleaning.outliers quantiles must satisfy 0 <= lower <= upper <= 1",
            ));
        }
        if cleaning.columns.mutation_key.is_empty() {
            return Err(invalid("cleaning.columns.mutation_key must not be empty"));
        }

        if self.neighborhood.strategy == NeighborhoodStrategy::CommuneFallback
            && self.level(GeoLevel::Neighborhood).tile
            && !self.boundaries.contains_key(&GeoLevel::Neighborhood)
        {
            log::warn!("Neighborhood tiles enabled without a neighborhood boundary source");
        }

        Ok(())
    }

    fn resolve_relative_paths(&mut self, base: &Path) {
        let resolve = |p: &mut PathBuf| {
            if p.is_relative() {
                *p = base.join(&*p);
            }
        };
        resolve(&mut self.paths.raw_transactions);
        resolve(&mut self.paths.data_dir);
        for source in self.boundaries.values_mut() {
            resolve(&mut source.path);
        }
    }
}

fn invalid(message: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        message: message.into(),
    }
}

/// Recursively merges `overlay` into `base`. Tables merge key by key, any
/// other value replaces the base value.
fn merge_tables(base: &mut toml::Table, overlay: toml::Table) {
    for (key, value) in overlay {
        match (base.get_mut(&key), value) {
            (Some(toml::Value::Table(existing)), toml::Value::Table(incoming)) => {
                merge_tables(existing, incoming);
            }
            (_, value) => {
                base.insert(key, value);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embedded_default_is_valid() {
        let config = PipelineConfig::embedded_default().unwrap();
        assert_eq!(config.min_sales(GeoLevel::Country), 100);
        assert_eq!(config.min_sales(GeoLevel::Department), 50);
        assert_eq!(config.min_sales(GeoLevel::Commune), 10);
        assert_eq!(config.cleaning.delimiter, '|');
        assert!(config.uses_commune_fallback());
        assert_eq!(config.tiles.suppressed, SuppressedPolicy::Omit);
    }

    #[test]
    fn default_tiles_region_department_commune_neighborhood() {
        let config = PipelineConfig::embedded_default().unwrap();
        assert_eq!(
            config.tiled_levels(),
            vec![
                GeoLevel::Region,
                GeoLevel::Department,
                GeoLevel::Commune,
                GeoLevel::Neighborhood
            ]
        );
    }

    #[test]
    fn overlay_merges_key_by_key() {
        let config = PipelineConfig::from_overlay(
            "[levels.commune]\nmin_sales = 3\n[tiles]\nsuppressed = \"null\"\n",
        )
        .unwrap();
        assert_eq!(config.min_sales(GeoLevel::Commune), 3);
        // Untouched keys of the same table keep their defaults.
        assert!(config.level(GeoLevel::Commune).tile);
        assert_eq!(config.min_sales(GeoLevel::Region), 100);
        assert_eq!(config.tiles.suppressed, SuppressedPolicy::Null);
        assert!(!config.tiles.pmtiles);
    }

    #[test]
    fn rejects_zero_threshold() {
        let config =
            PipelineConfig::from_overlay("[levels.postcode]\nmin_sales = 0\n").unwrap();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("postcode"), "{err}");
    }

    #[test]
    fn rejects_inverted_zoom_range() {
        let config = PipelineConfig::from_overlay(
            "[levels.region]\nmin_zoom = 9\nmax_zoom = 3\n",
        )
        .unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn resolves_paths_relative_to_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pipeline.toml");
        std::fs::write(&path, "[paths]\ndata_dir = \"out\"\n").unwrap();

        let config = PipelineConfig::load(Some(&path)).unwrap();
        assert_eq!(config.paths.data_dir, dir.path().join("out"));
        assert_eq!(
            config.boundaries[&GeoLevel::Commune].path,
            dir.path().join("data/raw/boundaries/commune.geojson")
        );
    }

    #[test]
    fn aggregation_settings_track_thresholds() {
        let a = PipelineConfig::embedded_default().unwrap();
        let b = PipelineConfig::from_overlay("[levels.commune]\nmin_sales = 5\n").unwrap();
        assert_ne!(a.aggregation_settings(), b.aggregation_settings());
        assert_eq!(a.aggregation_settings().thresholds["commune"], 10);
    }
}
