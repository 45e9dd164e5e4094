//! `PMTiles` conversion through tippecanoe.

use std::path::Path;
use std::process::Command;

use dvf_map_config::LevelConfig;
use dvf_map_geography_models::GeoLevel;

use crate::GenerateError;

/// Arguments passed to tippecanoe for one level.
#[must_use]
pub fn tippecanoe_args(
    level: GeoLevel,
    settings: &LevelConfig,
    input: &Path,
    output: &Path,
) -> Vec<String> {
    vec![
        "-o".to_string(),
        output.to_string_lossy().into_owned(),
        "--force".to_string(),
        "--no-feature-limit".to_string(),
        "--no-tile-size-limit".to_string(),
        format!("--minimum-zoom={}", settings.min_zoom),
        format!("--maximum-zoom={}", settings.max_zoom),
        "--coalesce-densest-as-needed".to_string(),
        "--detect-shared-borders".to_string(),
        format!("--layer={level}"),
        input.to_string_lossy().into_owned(),
    ]
}

/// Converts a `GeoJSON` tile into a `PMTiles` archive.
///
/// # Errors
///
/// Returns [`GenerateError::Tippecanoe`] if tippecanoe cannot be started or
/// exits unsuccessfully.
pub fn convert(
    level: GeoLevel,
    settings: &LevelConfig,
    input: &Path,
    output: &Path,
) -> Result<(), GenerateError> {
    log::info!("Running tippecanoe for {level}...");

    let status = Command::new("tippecanoe")
        .args(tippecanoe_args(level, settings, input, output))
        .status()
        .map_err(|e| GenerateError::Tippecanoe {
            level,
            message: format!("could not start tippecanoe: {e}"),
        })?;

    if !status.success() {
        return Err(GenerateError::Tippecanoe {
            level,
            message: format!("exited with {status}"),
        });
    }

    log::info!("PMTiles generated: {}", output.display());
    Ok(())
}
