//! The tile builder.
//!
//! Each feature is one unit's simplified polygon with flat statistic
//! properties per property type (`apartment_median_price_m2`, ...). The
//! statistics may come from a coarser level: under the commune fallback a
//! neighborhood feature carries its commune's record, and says so through
//! `stats_level`/`stats_code`.

use std::io::{BufWriter, Write as _};
use std::path::Path;

use dvf_map_analytics_models::{AggregateRecord, LevelTable};
use dvf_map_config::{PipelineConfig, SuppressedPolicy};
use dvf_map_geography::simplify::{coord_count, simplify_multipolygon};
use dvf_map_geography::{BoundaryLayer, GeoHierarchy};
use dvf_map_geography_models::GeoLevel;
use dvf_map_transaction_models::PropertyType;
use geojson::{Feature, FeatureCollection, Geometry, JsonObject, JsonValue, feature::Id};

use crate::GenerateError;

/// Suffixes of the per-property-type statistic properties.
pub const STAT_SUFFIXES: &[&str] = &[
    "n_sales",
    "median_price_m2",
    "mean_price_m2",
    "p25_price_m2",
    "p75_price_m2",
    "last_tx_date",
];

/// Counts describing one built tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileSummary {
    /// Level of the tile.
    pub level: GeoLevel,
    /// Level the statistics were taken from.
    pub stats_level: GeoLevel,
    /// Features written.
    pub features: usize,
    /// Features carrying at least one statistic.
    pub with_stats: usize,
    /// Units without statistics that were dropped.
    pub omitted: usize,
    /// Units with statistics but no usable geometry.
    pub missing_geometry: usize,
}

/// The level whose table feeds the tiles of `level`.
#[must_use]
pub fn stats_level_for(level: GeoLevel, config: &PipelineConfig) -> GeoLevel {
    if level == GeoLevel::Neighborhood && config.uses_commune_fallback() {
        GeoLevel::Commune
    } else {
        level
    }
}

/// Joins `stats` onto the boundaries of `layer`.
///
/// `stats` may belong to an ancestor level of `layer.level`, in which case
/// each unit is matched to its ancestor's records.
#[must_use]
pub fn build_level_tile(
    layer: &BoundaryLayer,
    stats: &LevelTable,
    hierarchy: &GeoHierarchy,
    config: &PipelineConfig,
) -> (FeatureCollection, TileSummary) {
    let level = layer.level;
    let tolerance = config.level(level).simplify_tolerance;
    let policy = config.tiles.suppressed;
    let records = stats.by_code();

    let mut summary = TileSummary {
        level,
        stats_level: stats.level,
        features: 0,
        with_stats: 0,
        omitted: 0,
        missing_geometry: 0,
    };
    let mut features = Vec::with_capacity(layer.len());
    let (mut vertices_in, mut vertices_out) = (0_usize, 0_usize);

    for (code, boundary) in &layer.boundaries {
        let stats_code = hierarchy.ancestor_code(level, code, stats.level);
        let unit_records = stats_code
            .as_deref()
            .and_then(|c| records.get(c))
            .map_or(&[][..], Vec::as_slice);

        if unit_records.is_empty() && policy == SuppressedPolicy::Omit {
            summary.omitted += 1;
            continue;
        }

        let geometry = simplify_multipolygon(&boundary.geometry, tolerance);
        vertices_in += coord_count(&boundary.geometry);
        vertices_out += coord_count(&geometry);
        if geometry.0.is_empty() {
            if !unit_records.is_empty() {
                log::debug!("{level} {code}: empty geometry");
                summary.missing_geometry += 1;
            }
            continue;
        }

        let mut properties = JsonObject::new();
        properties.insert("code".to_string(), JsonValue::from(code.as_str()));
        let name = if boundary.unit.name == *code {
            hierarchy.name(level, code)
        } else {
            boundary.unit.name.clone()
        };
        properties.insert("name".to_string(), JsonValue::from(name));
        properties.insert("level".to_string(), JsonValue::from(level.as_ref()));
        properties.insert(
            "stats_level".to_string(),
            JsonValue::from(stats.level.as_ref()),
        );
        properties.insert(
            "stats_code".to_string(),
            stats_code.map_or(JsonValue::Null, JsonValue::from),
        );

        for record in unit_records {
            insert_stats(&mut properties, record);
        }
        if policy == SuppressedPolicy::Null {
            for property_type in &config.cleaning.property_types {
                insert_null_stats(&mut properties, *property_type);
            }
        }

        if !unit_records.is_empty() {
            summary.with_stats += 1;
        }
        features.push(Feature {
            bbox: None,
            geometry: Some(Geometry::new(geojson::Value::from(&geometry))),
            id: Some(Id::String(code.clone())),
            properties: Some(properties),
            foreign_members: None,
        });
    }

    if stats.level == level {
        let missing: Vec<&str> = records
            .keys()
            .copied()
            .filter(|code| layer.get(code).is_none())
            .collect();
        for code in &missing {
            log::debug!("{level} {code}: statistics without boundary");
        }
        summary.missing_geometry += missing.len();
    }
    if summary.missing_geometry > 0 {
        log::warn!(
            "{level}: {} units with statistics have no geometry and were left out",
            summary.missing_geometry
        );
    }

    summary.features = features.len();
    log::debug!(
        "{level}: simplified {vertices_in} vertices to {vertices_out} (tolerance {tolerance})"
    );
    log::info!(
        "{level} tile: {} features ({} with {} statistics, {} omitted)",
        summary.features,
        summary.with_stats,
        summary.stats_level,
        summary.omitted
    );

    let collection = FeatureCollection {
        bbox: None,
        features,
        foreign_members: None,
    };
    (collection, summary)
}

fn stat_key(property_type: PropertyType, suffix: &str) -> String {
    format!("{property_type}_{suffix}")
}

fn insert_stats(properties: &mut JsonObject, record: &AggregateRecord) {
    let t = record.property_type;
    let s = &record.stats;
    properties.insert(stat_key(t, "n_sales"), JsonValue::from(s.n_sales));
    properties.insert(
        stat_key(t, "median_price_m2"),
        JsonValue::from(s.median_price_m2),
    );
    properties.insert(stat_key(t, "mean_price_m2"), JsonValue::from(s.mean_price_m2));
    properties.insert(stat_key(t, "p25_price_m2"), JsonValue::from(s.p25_price_m2));
    properties.insert(stat_key(t, "p75_price_m2"), JsonValue::from(s.p75_price_m2));
    properties.insert(
        stat_key(t, "last_tx_date"),
        JsonValue::from(s.last_tx_date.to_string()),
    );
}

/// Adds null statistics for `property_type` unless real ones are present.
fn insert_null_stats(properties: &mut JsonObject, property_type: PropertyType) {
    for suffix in STAT_SUFFIXES {
        properties
            .entry(stat_key(property_type, suffix))
            .or_insert(JsonValue::Null);
    }
}

/// Writes a tile as a `GeoJSON` document.
///
/// # Errors
///
/// Returns [`GenerateError`] if the file cannot be written.
pub fn write_tile(path: &Path, collection: &FeatureCollection) -> Result<(), GenerateError> {
    let io_err = |source| GenerateError::Io {
        path: path.to_path_buf(),
        source,
    };
    let file = std::fs::File::create(path).map_err(io_err)?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer(&mut writer, collection)?;
    writer.flush().map_err(io_err)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use dvf_map_analytics_models::PriceStats;
    use dvf_map_geography::Boundary;
    use dvf_map_geography_models::GeoUnit;
    use geo::{MultiPolygon, polygon};

    use super::*;

    fn square(x: f64, y: f64) -> MultiPolygon<f64> {
        MultiPolygon(vec![polygon![
            (x: x, y: y),
            (x: x + 0.01, y: y),
            (x: x + 0.01, y: y + 0.01),
            (x: x, y: y + 0.01),
            (x: x, y: y),
        ]])
    }

    fn layer(level: GeoLevel, units: &[(&str, &str)]) -> BoundaryLayer {
        let mut layer = BoundaryLayer::new(level);
        for (i, (code, parent)) in units.iter().enumerate() {
            #[allow(clippy::cast_precision_loss)]
            let offset = i as f64;
            layer.insert(Boundary {
                unit: GeoUnit {
                    code: (*code).to_string(),
                    name: format!("Unit {code}"),
                    level,
                    parent: Some((*parent).to_string()),
                },
                geometry: square(4.8 + offset * 0.02, 45.7),
            });
        }
        layer
    }

    fn record(code: &str, property_type: PropertyType, median: f64) -> AggregateRecord {
        AggregateRecord {
            level: GeoLevel::Commune,
            code: code.to_string(),
            property_type,
            stats: PriceStats {
                n_sales: 12,
                median_price_m2: median,
                mean_price_m2: median,
                p25_price_m2: median - 275.0,
                p75_price_m2: median + 275.0,
                last_tx_date: NaiveDate::from_ymd_opt(2025, 6, 30).unwrap(),
            },
        }
    }

    fn commune_table() -> LevelTable {
        LevelTable::new(
            GeoLevel::Commune,
            vec![record("69383", PropertyType::Apartment, 3550.0)],
        )
    }

    fn config(overlay: &str) -> PipelineConfig {
        PipelineConfig::from_overlay(overlay).unwrap()
    }

    #[test]
    fn features_carry_their_table_entry() {
        let communes = layer(GeoLevel::Commune, &[("69383", "69"), ("69381", "69")]);
        let (tile, summary) = build_level_tile(
            &communes,
            &commune_table(),
            &GeoHierarchy::new(),
            &config(""),
        );

        assert_eq!(summary.features, 1);
        assert_eq!(summary.omitted, 1);
        let feature = &tile.features[0];
        assert_eq!(feature.id, Some(Id::String("69383".to_string())));
        assert!(feature.geometry.is_some());
        assert_eq!(
            feature.property("apartment_median_price_m2"),
            Some(&JsonValue::from(3550.0))
        );
        assert_eq!(
            feature.property("apartment_n_sales"),
            Some(&JsonValue::from(12u64))
        );
        assert_eq!(
            feature.property("apartment_last_tx_date"),
            Some(&JsonValue::from("2025-06-30"))
        );
        assert_eq!(feature.property("stats_level"), Some(&JsonValue::from("commune")));
        assert_eq!(feature.property("house_median_price_m2"), None);
    }

    #[test]
    fn null_policy_keeps_suppressed_units() {
        let communes = layer(GeoLevel::Commune, &[("69383", "69"), ("69381", "69")]);
        let (tile, summary) = build_level_tile(
            &communes,
            &commune_table(),
            &GeoHierarchy::new(),
            &config("[tiles]\nsuppressed = \"null\"\n"),
        );

        assert_eq!(summary.features, 2);
        assert_eq!(summary.with_stats, 1);
        let suppressed = tile
            .features
            .iter()
            .find(|f| f.property("code") == Some(&JsonValue::from("69381")))
            .unwrap();
        assert!(suppressed.geometry.is_some());
        assert_eq!(
            suppressed.property("apartment_median_price_m2"),
            Some(&JsonValue::Null)
        );
        // A unit with apartment stats still gets null house stats.
        let kept = tile
            .features
            .iter()
            .find(|f| f.property("code") == Some(&JsonValue::from("69383")))
            .unwrap();
        assert_eq!(kept.property("house_n_sales"), Some(&JsonValue::Null));
        assert_eq!(
            kept.property("apartment_n_sales"),
            Some(&JsonValue::from(12u64))
        );
    }

    #[test]
    fn neighborhoods_fall_back_to_commune_statistics() {
        let config = config("");
        assert_eq!(
            stats_level_for(GeoLevel::Neighborhood, &config),
            GeoLevel::Commune
        );

        let iris = layer(
            GeoLevel::Neighborhood,
            &[("693830101", "69383"), ("693830102", "69383"), ("693810101", "69381")],
        );
        let (tile, summary) =
            build_level_tile(&iris, &commune_table(), &GeoHierarchy::new(), &config);

        assert_eq!(summary.stats_level, GeoLevel::Commune);
        assert_eq!(summary.features, 2);
        assert_eq!(summary.missing_geometry, 0);
        for feature in &tile.features {
            assert_eq!(feature.property("level"), Some(&JsonValue::from("neighborhood")));
            assert_eq!(feature.property("stats_level"), Some(&JsonValue::from("commune")));
            assert_eq!(feature.property("stats_code"), Some(&JsonValue::from("69383")));
            assert_eq!(
                feature.property("apartment_median_price_m2"),
                Some(&JsonValue::from(3550.0))
            );
        }
    }

    #[test]
    fn unnamed_boundaries_take_reference_names() {
        let mut departments = BoundaryLayer::new(GeoLevel::Department);
        departments.insert(Boundary {
            unit: GeoUnit {
                code: "69".to_string(),
                name: "69".to_string(),
                level: GeoLevel::Department,
                parent: Some("84".to_string()),
            },
            geometry: square(4.8, 45.7),
        });
        let table = LevelTable::new(
            GeoLevel::Department,
            vec![AggregateRecord {
                level: GeoLevel::Department,
                ..record("69", PropertyType::Apartment, 3550.0)
            }],
        );
        let hierarchy = GeoHierarchy::from_layers([&departments]);

        let (tile, _) = build_level_tile(&departments, &table, &hierarchy, &config(""));
        assert_eq!(tile.features[0].property("name"), Some(&JsonValue::from("Rhône")));

        let communes = layer(GeoLevel::Commune, &[("69383", "69")]);
        let (tile, _) =
            build_level_tile(&communes, &commune_table(), &GeoHierarchy::new(), &config(""));
        assert_eq!(
            tile.features[0].property("name"),
            Some(&JsonValue::from("Unit 69383"))
        );
    }

    #[test]
    fn direct_code_neighborhoods_use_their_own_table() {
        let config = config("[neighborhood]\nstrategy = \"direct_code\"\n");
        assert_eq!(
            stats_level_for(GeoLevel::Neighborhood, &config),
            GeoLevel::Neighborhood
        );
    }

    #[test]
    fn statistics_without_geometry_are_counted() {
        let communes = layer(GeoLevel::Commune, &[("69381", "69")]);
        let (tile, summary) = build_level_tile(
            &communes,
            &commune_table(),
            &GeoHierarchy::new(),
            &config(""),
        );
        assert!(tile.features.is_empty());
        assert_eq!(summary.missing_geometry, 1);
    }

    #[test]
    fn written_tile_is_a_feature_collection() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("commune.geojson");
        let communes = layer(GeoLevel::Commune, &[("69383", "69")]);
        let (tile, _) = build_level_tile(
            &communes,
            &commune_table(),
            &GeoHierarchy::new(),
            &config(""),
        );

        write_tile(&path, &tile).unwrap();
        let parsed: geojson::GeoJson = std::fs::read_to_string(&path).unwrap().parse().unwrap();
        let geojson::GeoJson::FeatureCollection(read) = parsed else {
            panic!("expected a FeatureCollection");
        };
        assert_eq!(read.features.len(), 1);
        assert_eq!(read.features[0].id, Some(Id::String("69383".to_string())));
    }
}
