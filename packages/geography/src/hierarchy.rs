//! The geographic unit tree.
//!
//! A level is *closed* when a unit catalog is known for it (regions and
//! departments from the embedded INSEE table, other levels once a boundary
//! layer has been added). A code at a closed level resolves only if the
//! catalog contains it. Open levels accept any non-empty code.

use std::collections::{BTreeMap, BTreeSet};

use dvf_map_geography_models::{COUNTRY_CODE, GeoLevel, GeoUnit};
use dvf_map_transaction_models::Transaction;

use crate::BoundaryLayer;

/// Parent-pointer tree over all known units.
#[derive(Debug, Clone, Default)]
pub struct GeoHierarchy {
    units: BTreeMap<GeoLevel, BTreeMap<String, GeoUnit>>,
    closed: BTreeSet<GeoLevel>,
}

impl GeoHierarchy {
    /// Hierarchy with the country root and the INSEE regions and
    /// departments.
    #[must_use]
    pub fn new() -> Self {
        let mut hierarchy = Self::default();
        hierarchy.insert(GeoUnit::country());
        for unit in GeoUnit::insee_reference_units() {
            hierarchy.insert(unit);
        }
        hierarchy.closed.extend([GeoLevel::Country, GeoLevel::Region, GeoLevel::Department]);
        hierarchy
    }

    /// Reference hierarchy extended with the given boundary layers.
    #[must_use]
    pub fn from_layers<'a>(layers: impl IntoIterator<Item = &'a BoundaryLayer>) -> Self {
        let mut hierarchy = Self::new();
        for layer in layers {
            hierarchy.add_layer(layer);
        }
        hierarchy.log_orphans();
        hierarchy
    }

    /// Adds every unit of `layer` and closes its level.
    ///
    /// Names and parents from the layer override the reference table,
    /// except a name that only repeats the unit code.
    pub fn add_layer(&mut self, layer: &BoundaryLayer) {
        for boundary in layer.boundaries.values() {
            let mut unit = boundary.unit.clone();
            if unit.name == unit.code
                && let Some(known) = self.unit(unit.level, &unit.code)
            {
                unit.name.clone_from(&known.name);
            }
            self.insert(unit);
        }
        self.closed.insert(layer.level);
    }

    /// Inserts or replaces a unit.
    pub fn insert(&mut self, unit: GeoUnit) {
        self.units
            .entry(unit.level)
            .or_default()
            .insert(unit.code.clone(), unit);
    }

    /// Looks up a unit.
    #[must_use]
    pub fn unit(&self, level: GeoLevel, code: &str) -> Option<&GeoUnit> {
        self.units.get(&level)?.get(code)
    }

    /// All known units at `level`, ordered by code.
    pub fn units(&self, level: GeoLevel) -> impl Iterator<Item = &GeoUnit> {
        self.units.get(&level).into_iter().flat_map(BTreeMap::values)
    }

    /// Whether `level` has a known unit catalog.
    #[must_use]
    pub fn is_closed(&self, level: GeoLevel) -> bool {
        self.closed.contains(&level)
    }

    /// Whether `code` is a valid unit at `level`.
    #[must_use]
    pub fn accepts(&self, level: GeoLevel, code: &str) -> bool {
        if code.is_empty() {
            return false;
        }
        !self.is_closed(level) || self.unit(level, code).is_some()
    }

    /// Display name of a unit, falling back to its code.
    #[must_use]
    pub fn name(&self, level: GeoLevel, code: &str) -> String {
        self.unit(level, code)
            .map_or_else(|| code.to_string(), |u| u.name.clone())
    }

    /// Code of the parent of `code`, from the unit's explicit parent when
    /// known, otherwise derived from the code.
    #[must_use]
    pub fn parent_code(&self, level: GeoLevel, code: &str) -> Option<String> {
        self.unit(level, code)
            .and_then(|u| u.parent.clone())
            .or_else(|| level.derive_parent_code(code))
    }

    /// Walks up from `code` at `level` to its ancestor at `target`.
    ///
    /// Returns `code` itself when `level == target` and `None` when
    /// `target` is not an ancestor level or a link is missing.
    #[must_use]
    pub fn ancestor_code(&self, level: GeoLevel, code: &str, target: GeoLevel) -> Option<String> {
        let mut level = level;
        let mut code = code.to_string();
        while level != target {
            let parent_level = level.parent()?;
            code = self.parent_code(level, &code)?;
            level = parent_level;
        }
        Some(code)
    }

    /// Resolves the unit a transaction belongs to at `level`.
    ///
    /// Levels above the commune are reached by walking up from the
    /// transaction's commune, falling back to the transaction's own key for
    /// that level. Finer levels use the key carried by the transaction.
    /// Returns `None` when no accepted unit is found, which excludes the
    /// transaction from that level only.
    #[must_use]
    pub fn resolve(&self, tx: &Transaction, level: GeoLevel) -> Option<String> {
        if level.is_ancestor_of(GeoLevel::Commune)
            && let Some(code) = self
                .ancestor_code(GeoLevel::Commune, &tx.commune_code, level)
                .filter(|code| self.accepts(level, code))
        {
            return Some(code);
        }

        let direct = direct_key(tx, level)?;
        self.accepts(level, direct).then(|| direct.to_string())
    }

    /// Returns units whose parent is missing from a closed parent level.
    #[must_use]
    pub fn orphans(&self) -> Vec<&GeoUnit> {
        GeoLevel::all()
            .iter()
            .flat_map(|level| self.units(*level))
            .filter(|unit| {
                let Some(parent_level) = unit.level.parent() else {
                    return false;
                };
                match &unit.parent {
                    Some(parent) => !self.accepts(parent_level, parent),
                    None => true,
                }
            })
            .collect()
    }

    fn log_orphans(&self) {
        let orphans = self.orphans();
        if orphans.is_empty() {
            return;
        }
        log::warn!("{} units reference an unknown parent", orphans.len());
        for unit in orphans {
            log::debug!(
                "Orphan {} {} (parent {:?})",
                unit.level,
                unit.code,
                unit.parent
            );
        }
    }
}

/// The geographic key a transaction carries for `level`.
fn direct_key(tx: &Transaction, level: GeoLevel) -> Option<&str> {
    let key = match level {
        GeoLevel::Country => Some(COUNTRY_CODE),
        GeoLevel::Region => tx.region_code.as_deref(),
        GeoLevel::Department => Some(tx.department_code.as_str()),
        GeoLevel::Commune => Some(tx.commune_code.as_str()),
        GeoLevel::Postcode => tx.postcode.as_deref(),
        GeoLevel::Neighborhood => tx.iris_code.as_deref(),
    }?;
    (!key.trim().is_empty()).then_some(key)
}
