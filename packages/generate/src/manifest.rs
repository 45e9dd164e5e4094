//! Aggregation manifest (`mart/manifest.json`).
//!
//! Records what the published statistics tables were computed from so
//! subsequent runs can skip an unchanged aggregation, plus the time each
//! output was last produced.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use dvf_map_config::{AggregationSettings, PipelineConfig};
use dvf_map_storage::{sha256_bytes, sha256_file, write_atomic};
use serde::{Deserialize, Serialize};

use crate::GenerateError;

/// Current manifest schema version. Bump this when the manifest format
/// changes in a backward-incompatible way.
pub const MANIFEST_VERSION: u32 = 1;

/// Output name for the statistics tables.
pub const OUTPUT_STATISTICS: &str = "statistics";

/// Output name for the tile artifact of `level`.
#[must_use]
pub fn tile_output(level: impl std::fmt::Display) -> String {
    format!("tiles/{level}")
}

/// The inputs that determine statistics table contents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fingerprint {
    /// SHA-256 of the canonical transaction table.
    pub transactions_sha256: String,
    /// SHA-256 of the aggregation settings and boundary catalogs.
    pub settings_sha256: String,
}

#[derive(Serialize)]
struct SettingsDigest<'a> {
    aggregation: &'a AggregationSettings,
    boundaries: &'a BTreeMap<String, String>,
}

impl Fingerprint {
    /// Fingerprints the canonical table at `transactions` under `config`.
    ///
    /// Boundary files take part because they close the unit catalogs a
    /// transaction key must resolve against.
    ///
    /// # Errors
    ///
    /// Returns [`GenerateError`] if a file cannot be hashed.
    pub fn compute(transactions: &Path, config: &PipelineConfig) -> Result<Self, GenerateError> {
        let transactions_sha256 = sha256_file(transactions)?;

        let mut boundaries = BTreeMap::new();
        for (level, source) in &config.boundaries {
            boundaries.insert(level.to_string(), sha256_file(&source.path)?);
        }
        let aggregation = config.aggregation_settings();
        let digest = serde_json::to_vec(&SettingsDigest {
            aggregation: &aggregation,
            boundaries: &boundaries,
        })?;

        Ok(Self {
            transactions_sha256,
            settings_sha256: sha256_bytes(&digest),
        })
    }
}

/// Generation manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    /// Schema version.
    pub version: u32,
    /// Inputs of the published statistics tables.
    pub fingerprint: Option<Fingerprint>,
    /// Map of output name to RFC 3339 timestamp of last successful
    /// generation.
    pub outputs: BTreeMap<String, String>,
}

impl Default for Manifest {
    fn default() -> Self {
        Self {
            version: MANIFEST_VERSION,
            fingerprint: None,
            outputs: BTreeMap::new(),
        }
    }
}

impl Manifest {
    /// Records a successful output generation.
    pub fn record_output(&mut self, output_name: &str) {
        self.outputs
            .insert(output_name.to_string(), chrono::Utc::now().to_rfc3339());
    }

    /// Whether the statistics tables must be recomputed for `current`.
    ///
    /// Returns `true` if `force` is set, the schema version or either
    /// fingerprint differs, the statistics output was never recorded, or
    /// any of `tables` is missing from disk.
    #[must_use]
    pub fn statistics_need_regen(
        &self,
        current: &Fingerprint,
        tables: &[PathBuf],
        force: bool,
    ) -> bool {
        if force || self.version != MANIFEST_VERSION {
            return true;
        }
        if self.fingerprint.as_ref() != Some(current) {
            return true;
        }
        if !self.outputs.contains_key(OUTPUT_STATISTICS) {
            return true;
        }
        tables.iter().any(|path| !path.is_file())
    }
}

/// Loads the manifest at `path`.
///
/// Returns `None` if the file does not exist or cannot be parsed.
#[must_use]
pub fn load_manifest(path: &Path) -> Option<Manifest> {
    let Ok(contents) = std::fs::read_to_string(path) else {
        log::info!("No existing manifest found");
        return None;
    };
    match serde_json::from_str(&contents) {
        Ok(m) => {
            log::debug!("Loaded manifest from {}", path.display());
            Some(m)
        }
        Err(e) => {
            log::warn!("Failed to parse manifest {}: {e}", path.display());
            None
        }
    }
}

/// Writes the manifest to `path` through a temporary file.
///
/// # Errors
///
/// Returns [`GenerateError`] if the file cannot be written.
pub fn save_manifest(path: &Path, manifest: &Manifest) -> Result<(), GenerateError> {
    let contents = serde_json::to_string_pretty(manifest)?;
    write_atomic(path, contents.as_bytes())?;
    log::debug!("Saved manifest to {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fingerprint(tx: &str) -> Fingerprint {
        Fingerprint {
            transactions_sha256: tx.to_string(),
            settings_sha256: "s".to_string(),
        }
    }

    fn recorded(fp: Fingerprint) -> Manifest {
        let mut manifest = Manifest {
            fingerprint: Some(fp),
            ..Manifest::default()
        };
        manifest.record_output(OUTPUT_STATISTICS);
        manifest
    }

    #[test]
    fn unchanged_inputs_skip_regeneration() {
        let dir = tempfile::tempdir().unwrap();
        let table = dir.path().join("commune.csv");
        std::fs::write(&table, "code\n").unwrap();

        let manifest = recorded(fingerprint("a"));
        assert!(!manifest.statistics_need_regen(&fingerprint("a"), &[table.clone()], false));
        assert!(manifest.statistics_need_regen(&fingerprint("a"), &[table.clone()], true));
        assert!(manifest.statistics_need_regen(&fingerprint("b"), &[table], false));
    }

    #[test]
    fn missing_table_or_record_forces_regeneration() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("region.csv");
        let manifest = recorded(fingerprint("a"));
        assert!(manifest.statistics_need_regen(&fingerprint("a"), &[missing], false));

        let unrecorded = Manifest {
            fingerprint: Some(fingerprint("a")),
            ..Manifest::default()
        };
        assert!(unrecorded.statistics_need_regen(&fingerprint("a"), &[], false));

        let outdated = Manifest {
            version: MANIFEST_VERSION + 1,
            ..recorded(fingerprint("a"))
        };
        assert!(outdated.statistics_need_regen(&fingerprint("a"), &[], false));
    }

    #[test]
    fn manifest_is_saved_and_reloaded() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("manifest.json");
        let mut manifest = recorded(fingerprint("a"));
        manifest.record_output(&tile_output("commune"));

        save_manifest(&path, &manifest).unwrap();
        assert_eq!(load_manifest(&path), Some(manifest));
        assert!(!dir.path().join("manifest.json.tmp").exists());
    }

    #[test]
    fn unreadable_manifest_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("manifest.json");
        assert_eq!(load_manifest(&path), None);
        std::fs::write(&path, "{not json").unwrap();
        assert_eq!(load_manifest(&path), None);
    }

    #[test]
    fn settings_change_alters_the_fingerprint() {
        let dir = tempfile::tempdir().unwrap();
        let tx = dir.path().join("transactions.csv");
        std::fs::write(&tx, "mutation_id\n").unwrap();

        let mut config = PipelineConfig::embedded_default().unwrap();
        config.boundaries.clear();
        let before = Fingerprint::compute(&tx, &config).unwrap();
        assert_eq!(before, Fingerprint::compute(&tx, &config).unwrap());

        config
            .levels
            .get_mut(&dvf_map_geography_models::GeoLevel::Commune)
            .unwrap()
            .min_sales = 20;
        let after = Fingerprint::compute(&tx, &config).unwrap();
        assert_eq!(before.transactions_sha256, after.transactions_sha256);
        assert_ne!(before.settings_sha256, after.settings_sha256);
    }
}
