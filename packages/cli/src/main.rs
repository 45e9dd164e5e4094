#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! `dvf_map`: builds price-per-m² statistics and map tiles from a DVF
//! export.
//!
//! Uses `indicatif-log-bridge` (via [`dvf_map_cli_utils::init_logger`])
//! to route `log` output through `indicatif::MultiProgress` so that log
//! lines and progress bars never fight for the terminal.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use dvf_map_cli_utils::{IndicatifProgress, MultiProgress};
use dvf_map_config::PipelineConfig;
use dvf_map_generate::{AggregateOutcome, Pipeline, StageProgress};
use dvf_map_ingest::progress::ProgressCallback;

#[derive(Parser)]
#[command(name = "dvf_map", about = "DVF price-per-m² pipeline")]
struct Cli {
    /// TOML file merged over the built-in configuration
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log at debug level unless `RUST_LOG` says otherwise
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Clean the raw DVF file into the canonical transaction table
    Clean,
    /// Compute per-level statistics tables
    Aggregate {
        /// Recompute even if the inputs are unchanged
        #[arg(long)]
        force: bool,
    },
    /// Rebuild tiles from the existing statistics tables
    Tiles {
        /// Also convert tiles to `PMTiles` with tippecanoe
        #[arg(long)]
        pmtiles: bool,
    },
    /// Run clean, aggregate and tiles
    Run {
        /// Recompute statistics even if the inputs are unchanged
        #[arg(long)]
        force: bool,
        /// Also convert tiles to `PMTiles` with tippecanoe
        #[arg(long)]
        pmtiles: bool,
    },
}

fn levels_bar(multi: &MultiProgress, message: &str) -> Arc<dyn ProgressCallback> {
    IndicatifProgress::steps_bar(multi, message, 0)
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let multi = dvf_map_cli_utils::init_logger(if cli.verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    });

    let mut config = PipelineConfig::load(cli.config.as_deref())?;
    if let Commands::Tiles { pmtiles: true } | Commands::Run { pmtiles: true, .. } = cli.command {
        config.tiles.pmtiles = true;
    }
    let pipeline = Pipeline::new(&config);

    match cli.command {
        Commands::Clean => {
            let progress = IndicatifProgress::records_bar(&multi, "Cleaning");
            pipeline.clean(&progress)?;
        }
        Commands::Aggregate { force } => {
            let progress = levels_bar(&multi, "Aggregating");
            report_aggregate(pipeline.aggregate(force, &progress)?);
        }
        Commands::Tiles { .. } => {
            let progress = levels_bar(&multi, "Tiles");
            pipeline.tiles(&progress)?;
        }
        Commands::Run { force, .. } => {
            let progress = StageProgress {
                clean: IndicatifProgress::records_bar(&multi, "Cleaning"),
                aggregate: levels_bar(&multi, "Aggregating"),
                tiles: levels_bar(&multi, "Tiles"),
            };
            let summary = pipeline.run(force, &progress)?;
            report_aggregate(summary.aggregate);
            log::info!(
                "Done: {} transactions, {} tiles in {}",
                summary.clean.rows_kept,
                summary.tiles.len(),
                pipeline.layout().tiles_dir().display()
            );
        }
    }

    Ok(())
}

fn report_aggregate(outcome: AggregateOutcome) {
    match outcome {
        AggregateOutcome::Computed { levels, records } => {
            log::info!("Published {records} records across {levels} statistics tables");
        }
        AggregateOutcome::UpToDate => {
            log::info!("Statistics unchanged (pass --force to recompute)");
        }
    }
}
