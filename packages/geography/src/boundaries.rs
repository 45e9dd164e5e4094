//! Boundary polygon loading from `GeoJSON` sources.
//!
//! Each source is a `FeatureCollection` whose features carry the unit code
//! (and optionally name and parent code) as properties. Features without a
//! code or without a polygonal geometry are skipped with a warning.

use std::collections::BTreeMap;
use std::path::Path;

use dvf_map_config::{BoundarySource, PipelineConfig};
use dvf_map_geography_models::{GeoLevel, GeoUnit};
use geo::MultiPolygon;
use geojson::{Feature, GeoJson, JsonValue};

use crate::GeoError;

/// A unit together with its boundary polygon.
#[derive(Debug, Clone, PartialEq)]
pub struct Boundary {
    /// The unit.
    pub unit: GeoUnit,
    /// Boundary in WGS84 longitude/latitude.
    pub geometry: MultiPolygon<f64>,
}

/// All boundaries loaded for one level, keyed by unit code.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundaryLayer {
    /// Level of every unit in this layer.
    pub level: GeoLevel,
    /// Boundaries by unit code.
    pub boundaries: BTreeMap<String, Boundary>,
    /// Number of features that could not be used.
    pub skipped: usize,
}

impl BoundaryLayer {
    /// Creates an empty layer.
    #[must_use]
    pub const fn new(level: GeoLevel) -> Self {
        Self {
            level,
            boundaries: BTreeMap::new(),
            skipped: 0,
        }
    }

    /// Looks up a boundary by unit code.
    #[must_use]
    pub fn get(&self, code: &str) -> Option<&Boundary> {
        self.boundaries.get(code)
    }

    /// Number of units in the layer.
    #[must_use]
    pub fn len(&self) -> usize {
        self.boundaries.len()
    }

    /// Whether the layer has no units.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.boundaries.is_empty()
    }

    /// Adds a boundary. Features sharing a code are merged into one
    /// multipolygon.
    pub fn insert(&mut self, boundary: Boundary) {
        match self.boundaries.get_mut(&boundary.unit.code) {
            Some(existing) => {
                log::debug!(
                    "Merging duplicate {} feature {}",
                    self.level,
                    boundary.unit.code
                );
                existing.geometry.0.extend(boundary.geometry.0);
            }
            None => {
                self.boundaries.insert(boundary.unit.code.clone(), boundary);
            }
        }
    }
}

/// Loads every boundary source configured in `config`.
///
/// # Errors
///
/// Returns [`GeoError`] if any configured source is unreadable or not a
/// `FeatureCollection`.
pub fn load_configured(
    config: &PipelineConfig,
) -> Result<BTreeMap<GeoLevel, BoundaryLayer>, GeoError> {
    let mut layers = BTreeMap::new();
    for (level, source) in &config.boundaries {
        let layer = load_layer(*level, source)?;
        layers.insert(*level, layer);
    }
    Ok(layers)
}

/// Loads one boundary layer from a `GeoJSON` file.
///
/// # Errors
///
/// Returns [`GeoError`] if the file cannot be read or parsed, or is not a
/// `FeatureCollection`.
pub fn load_layer(level: GeoLevel, source: &BoundarySource) -> Result<BoundaryLayer, GeoError> {
    log::info!("Loading {level} boundaries from {}", source.path.display());
    let contents = read_source(&source.path)?;
    let geojson: GeoJson = contents.parse()?;
    let GeoJson::FeatureCollection(collection) = geojson else {
        return Err(GeoError::Conversion {
            message: format!(
                "{} is not a FeatureCollection",
                source.path.display()
            ),
        });
    };

    let mut layer = BoundaryLayer::new(level);
    let total = collection.features.len();

    for feature in collection.features {
        let Some(code) = property_string(&feature, &source.code_property)
            .and_then(|raw| level.normalize_code(&raw))
        else {
            log::debug!("Skipping {level} feature without {}", source.code_property);
            layer.skipped += 1;
            continue;
        };

        let Some(geometry) = feature_multipolygon(&feature) else {
            log::debug!("Skipping {level} {code}: geometry is missing or not polygonal");
            layer.skipped += 1;
            continue;
        };

        let name = source
            .name_property
            .as_deref()
            .and_then(|key| property_string(&feature, key))
            .unwrap_or_else(|| code.clone());

        let parent = level.parent().and_then(|parent_level| {
            source
                .parent_property
                .as_deref()
                .and_then(|key| property_string(&feature, key))
                .and_then(|raw| parent_level.normalize_code(&raw))
                .or_else(|| level.derive_parent_code(&code))
        });

        layer.insert(Boundary {
            unit: GeoUnit {
                code,
                name,
                level,
                parent,
            },
            geometry,
        });
    }

    if layer.skipped > 0 {
        log::warn!(
            "{level}: skipped {} of {total} features (missing code or non-polygonal geometry)",
            layer.skipped
        );
    }
    log::info!("Loaded {} {level} boundaries", layer.len());

    Ok(layer)
}

fn read_source(path: &Path) -> Result<String, GeoError> {
    std::fs::read_to_string(path).map_err(|source| GeoError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Reads a property as a string. Numeric values are formatted without
/// quotes so that codes stored as numbers still match.
fn property_string(feature: &Feature, key: &str) -> Option<String> {
    match feature.property(key)? {
        JsonValue::String(s) => {
            let s = s.trim();
            (!s.is_empty()).then(|| s.to_string())
        }
        JsonValue::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Converts a feature geometry into a [`MultiPolygon`].
/// Handles both `Polygon` and `MultiPolygon` geometry types.
fn feature_multipolygon(feature: &Feature) -> Option<MultiPolygon<f64>> {
    let geometry = feature.geometry.clone()?;
    let geo_geom: geo::Geometry<f64> = geometry.try_into().ok()?;
    let multi = match geo_geom {
        geo::Geometry::MultiPolygon(mp) => mp,
        geo::Geometry::Polygon(p) => MultiPolygon(vec![p]),
        _ => return None,
    };
    (!multi.0.is_empty()).then_some(multi)
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;

    const COMMUNES: &str = r#"{
      "type": "FeatureCollection",
      "features": [
        {
          "type": "Feature",
          "properties": { "INSEE_COM": "75056", "NOM": "Paris" },
          "geometry": { "type": "Polygon", "coordinates": [[[2.2,48.8],[2.4,48.8],[2.4,48.9],[2.2,48.9],[2.2,48.8]]] }
        },
        {
          "type": "Feature",
          "properties": { "INSEE_COM": 1001, "NOM": "L'Abergement-Clémenciat", "INSEE_DEP": "01" },
          "geometry": { "type": "MultiPolygon", "coordinates": [[[[4.9,46.1],[5.0,46.1],[5.0,46.2],[4.9,46.1]]]] }
        },
        {
          "type": "Feature",
          "properties": { "INSEE_COM": "13055", "NOM": "Marseille" },
          "geometry": { "type": "Point", "coordinates": [5.4, 43.3] }
        },
        {
          "type": "Feature",
          "properties": { "NOM": "Nowhere" },
          "geometry": { "type": "Polygon", "coordinates": [[[0,0],[1,0],[1,1],[0,0]]] }
        }
      ]
    }"#;

    fn source(path: PathBuf) -> BoundarySource {
        BoundarySource {
            path,
            code_property: "INSEE_COM".to_string(),
            name_property: Some("NOM".to_string()),
            parent_property: Some("INSEE_DEP".to_string()),
        }
    }

    #[test]
    fn loads_polygonal_features_and_skips_the_rest() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("commune.geojson");
        std::fs::write(&path, COMMUNES).unwrap();

        let layer = load_layer(GeoLevel::Commune, &source(path)).unwrap();

        assert_eq!(layer.len(), 2);
        assert_eq!(layer.skipped, 2);

        let paris = layer.get("75056").unwrap();
        assert_eq!(paris.unit.name, "Paris");
        // No parent property on this feature: derived from the code.
        assert_eq!(paris.unit.parent.as_deref(), Some("75"));
        assert_eq!(paris.geometry.0.len(), 1);

        let numeric = layer.get("01001").unwrap();
        assert_eq!(numeric.unit.parent.as_deref(), Some("01"));
    }

    #[test]
    fn rejects_non_collection_sources() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.geojson");
        std::fs::write(
            &path,
            r#"{ "type": "Point", "coordinates": [2.3, 48.8] }"#,
        )
        .unwrap();

        let err = load_layer(GeoLevel::Commune, &source(path)).unwrap_err();
        assert!(matches!(err, GeoError::Conversion { .. }), "{err}");
    }

    #[test]
    fn missing_source_is_an_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err =
            load_layer(GeoLevel::Commune, &source(dir.path().join("nope.geojson"))).unwrap_err();
        assert!(matches!(err, GeoError::Io { .. }));
    }

    #[test]
    fn duplicate_codes_merge_polygons() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dup.geojson");
        let square = r#"{ "type": "Polygon", "coordinates": [[[0,0],[1,0],[1,1],[0,1],[0,0]]] }"#;
        std::fs::write(
            &path,
            format!(
                r#"{{ "type": "FeatureCollection", "features": [
                  {{ "type": "Feature", "properties": {{ "INSEE_COM": "29155" }}, "geometry": {square} }},
                  {{ "type": "Feature", "properties": {{ "INSEE_COM": "29155" }}, "geometry": {square} }}
                ] }}"#
            ),
        )
        .unwrap();

        let layer = load_layer(GeoLevel::Commune, &source(path)).unwrap();
        assert_eq!(layer.len(), 1);
        assert_eq!(layer.get("29155").unwrap().geometry.0.len(), 2);
        assert_eq!(layer.get("29155").unwrap().unit.name, "29155");
    }
}
