//! The pipeline runner.
//!
//! `clean` writes the canonical transaction table, `aggregate` the
//! per-level statistics tables and the manifest, `tiles` one tile per tiled
//! level. Each publishes its artifact group atomically, so a failing stage
//! leaves the previously published group in place.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use dvf_map_analytics::{aggregate_all, aggregated_levels, read_table, write_table};
use dvf_map_config::PipelineConfig;
use dvf_map_geography::boundaries::load_configured;
use dvf_map_geography::{BoundaryLayer, GeoHierarchy};
use dvf_map_geography_models::GeoLevel;
use dvf_map_ingest::progress::{ProgressCallback, null_progress};
use dvf_map_ingest::{CleanReport, clean_file, read_transactions, write_transactions};
use dvf_map_storage::paths::{
    MANIFEST_FILE, TRANSACTIONS_FILE, level_table_file, tile_geojson_file, tile_pmtiles_file,
};
use dvf_map_storage::{DataLayout, StagedDir};
use rayon::prelude::*;

use crate::manifest::{
    Fingerprint, MANIFEST_VERSION, Manifest, OUTPUT_STATISTICS, load_manifest, save_manifest,
    tile_output,
};
use crate::tiles::{TileSummary, build_level_tile, stats_level_for, write_tile};
use crate::{GenerateError, pmtiles};

/// One progress reporter per stage.
pub struct StageProgress {
    /// Cleaning progress (rows).
    pub clean: Arc<dyn ProgressCallback>,
    /// Aggregation progress (levels).
    pub aggregate: Arc<dyn ProgressCallback>,
    /// Tile building progress (levels).
    pub tiles: Arc<dyn ProgressCallback>,
}

impl StageProgress {
    /// Reporters that discard every update.
    #[must_use]
    pub fn silent() -> Self {
        Self {
            clean: null_progress(),
            aggregate: null_progress(),
            tiles: null_progress(),
        }
    }
}

/// What the aggregation stage did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregateOutcome {
    /// Tables were recomputed and published.
    Computed {
        /// Tables written.
        levels: usize,
        /// Records across all tables.
        records: usize,
    },
    /// The published tables match the current inputs.
    UpToDate,
}

/// Boundary layers and the hierarchy built from them.
pub struct Geography {
    /// Loaded layers by level.
    pub layers: BTreeMap<GeoLevel, BoundaryLayer>,
    /// Unit tree over the reference table and the layers.
    pub hierarchy: GeoHierarchy,
}

/// Result of a full run.
#[derive(Debug, Clone)]
pub struct RunSummary {
    /// Cleaning counts.
    pub clean: CleanReport,
    /// Aggregation outcome.
    pub aggregate: AggregateOutcome,
    /// One entry per tile written.
    pub tiles: Vec<TileSummary>,
}

/// Runs pipeline stages against the data directory of one configuration.
pub struct Pipeline<'a> {
    config: &'a PipelineConfig,
    layout: DataLayout,
}

impl<'a> Pipeline<'a> {
    /// Creates a runner for `config`.
    #[must_use]
    pub fn new(config: &'a PipelineConfig) -> Self {
        Self {
            config,
            layout: DataLayout::new(&config.paths.data_dir),
        }
    }

    /// Output locations.
    #[must_use]
    pub const fn layout(&self) -> &DataLayout {
        &self.layout
    }

    /// Loads every configured boundary source.
    ///
    /// # Errors
    ///
    /// Returns [`GenerateError::Geo`] if a source is unreadable.
    pub fn load_geography(&self) -> Result<Geography, GenerateError> {
        let layers = load_configured(self.config)?;
        let hierarchy = GeoHierarchy::from_layers(layers.values());
        Ok(Geography { layers, hierarchy })
    }

    /// Cleans the raw DVF file and publishes the canonical table.
    ///
    /// # Errors
    ///
    /// Returns [`GenerateError`] if the raw file is unreadable, a required
    /// column is missing, nothing survives cleaning, or publishing fails.
    pub fn clean(&self, progress: &Arc<dyn ProgressCallback>) -> Result<CleanReport, GenerateError> {
        let output = clean_file(
            &self.config.paths.raw_transactions,
            &self.config.cleaning,
            progress,
        )?;

        let stage = StagedDir::create(&self.layout.intermediate_dir())?;
        write_transactions(&stage.file(TRANSACTIONS_FILE), &output.transactions)?;
        stage.commit()?;

        Ok(output.report)
    }

    /// Recomputes the statistics tables unless they are up to date.
    ///
    /// # Errors
    ///
    /// Returns [`GenerateError`] if the canonical table or a boundary
    /// source is missing or invalid, or publishing fails.
    pub fn aggregate(
        &self,
        force: bool,
        progress: &Arc<dyn ProgressCallback>,
    ) -> Result<AggregateOutcome, GenerateError> {
        let geography = self.load_geography()?;
        self.aggregate_with(&geography, force, progress)
    }

    /// Rebuilds every tile from the published statistics tables.
    ///
    /// # Errors
    ///
    /// Returns [`GenerateError`] if a required statistics table or boundary
    /// source is missing, tippecanoe fails, or publishing fails.
    pub fn tiles(&self, progress: &Arc<dyn ProgressCallback>) -> Result<Vec<TileSummary>, GenerateError> {
        let geography = self.load_geography()?;
        self.tiles_with(&geography, progress)
    }

    /// Runs clean, aggregate and tiles in order.
    ///
    /// # Errors
    ///
    /// Returns the first stage error. Stages published before the failure
    /// stay published.
    pub fn run(&self, force: bool, progress: &StageProgress) -> Result<RunSummary, GenerateError> {
        let clean = self.clean(&progress.clean)?;
        let geography = self.load_geography()?;
        let aggregate = self.aggregate_with(&geography, force, &progress.aggregate)?;
        let tiles = self.tiles_with(&geography, &progress.tiles)?;
        Ok(RunSummary {
            clean,
            aggregate,
            tiles,
        })
    }

    fn aggregate_with(
        &self,
        geography: &Geography,
        force: bool,
        progress: &Arc<dyn ProgressCallback>,
    ) -> Result<AggregateOutcome, GenerateError> {
        let transactions_path = self.layout.transactions_csv();
        let previous = load_manifest(&self.layout.manifest());

        let fingerprint = if transactions_path.is_file() {
            let fingerprint = Fingerprint::compute(&transactions_path, self.config)?;
            let tables: Vec<PathBuf> = aggregated_levels(self.config)
                .into_iter()
                .map(|level| self.layout.level_table(level))
                .collect();
            if let Some(manifest) = &previous
                && !manifest.statistics_need_regen(&fingerprint, &tables, force)
            {
                log::info!("Statistics tables are up to date, skipping aggregation");
                progress.finish_and_clear();
                return Ok(AggregateOutcome::UpToDate);
            }
            Some(fingerprint)
        } else {
            None
        };

        let transactions = read_transactions(&transactions_path)?;
        let tables = aggregate_all(&transactions, &geography.hierarchy, self.config, progress)?;

        let stage = StagedDir::create(&self.layout.mart_dir())?;
        for table in tables.values() {
            write_table(&stage.file(&level_table_file(table.level)), table)?;
        }

        let mut manifest = previous.unwrap_or_default();
        manifest.version = MANIFEST_VERSION;
        manifest.fingerprint = fingerprint;
        manifest.record_output(OUTPUT_STATISTICS);
        save_manifest(&stage.file(MANIFEST_FILE), &manifest)?;
        stage.commit()?;

        Ok(AggregateOutcome::Computed {
            levels: tables.len(),
            records: tables.values().map(|t| t.len()).sum(),
        })
    }

    fn tiles_with(
        &self,
        geography: &Geography,
        progress: &Arc<dyn ProgressCallback>,
    ) -> Result<Vec<TileSummary>, GenerateError> {
        let levels = self.config.tiled_levels();

        let mut tables = BTreeMap::new();
        for level in &levels {
            let stats_level = stats_level_for(*level, self.config);
            if !tables.contains_key(&stats_level) {
                let table = read_table(&self.layout.level_table(stats_level), stats_level)?;
                tables.insert(stats_level, table);
            }
        }

        let stage = StagedDir::create(&self.layout.tiles_dir())?;
        progress.set_total(levels.len() as u64);
        progress.set_message("Building tiles".to_string());

        let summaries = levels
            .par_iter()
            .map(|level| {
                let layer = geography
                    .layers
                    .get(level)
                    .ok_or(GenerateError::MissingBoundaries { level: *level })?;
                let stats_level = stats_level_for(*level, self.config);
                let stats = tables
                    .get(&stats_level)
                    .ok_or_else(|| dvf_map_analytics::AnalyticsError::MissingTable {
                        level: stats_level,
                        path: self.layout.level_table(stats_level),
                    })?;

                let (tile, summary) =
                    build_level_tile(layer, stats, &geography.hierarchy, self.config);
                let geojson_path = stage.file(&tile_geojson_file(*level));
                write_tile(&geojson_path, &tile)?;

                if self.config.tiles.pmtiles {
                    pmtiles::convert(
                        *level,
                        self.config.level(*level),
                        &geojson_path,
                        &stage.file(&tile_pmtiles_file(*level)),
                    )?;
                }
                progress.inc(1);
                Ok(summary)
            })
            .collect::<Result<Vec<_>, GenerateError>>()?;

        stage.commit()?;

        let manifest_path = self.layout.manifest();
        let mut manifest: Manifest = load_manifest(&manifest_path).unwrap_or_default();
        for level in &levels {
            manifest.record_output(&tile_output(level));
        }
        save_manifest(&manifest_path, &manifest)?;

        progress.finish(format!("Built {} tiles", summaries.len()));
        Ok(summaries)
    }
}
