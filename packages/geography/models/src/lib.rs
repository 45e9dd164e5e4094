#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Geographic level and unit types.
//!
//! Units form a strict tree rooted at the country. Every non-root unit has
//! exactly one parent, at the level returned by [`GeoLevel::parent`].

pub mod insee;

use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// Code of the single root unit.
pub const COUNTRY_CODE: &str = "FR";

/// Display name of the root unit.
pub const COUNTRY_NAME: &str = "France";

/// Aggregation granularity, ordered from coarsest to finest.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum GeoLevel {
    /// The whole country (single root unit).
    Country,
    /// INSEE region.
    Region,
    /// INSEE department.
    Department,
    /// INSEE commune.
    Commune,
    /// La Poste postcode area (approximate polygon).
    Postcode,
    /// IRIS neighborhood.
    Neighborhood,
}

impl GeoLevel {
    /// Returns all levels from coarsest to finest.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[
            Self::Country,
            Self::Region,
            Self::Department,
            Self::Commune,
            Self::Postcode,
            Self::Neighborhood,
        ]
    }

    /// The level of this level's parent units.
    ///
    /// Postcodes do not nest inside communes (a postcode can span several
    /// communes and a commune can have several postcodes), so both
    /// postcodes and communes hang off their department. IRIS units nest
    /// inside their commune.
    #[must_use]
    pub const fn parent(self) -> Option<Self> {
        match self {
            Self::Country => None,
            Self::Region => Some(Self::Country),
            Self::Department => Some(Self::Region),
            Self::Commune | Self::Postcode => Some(Self::Department),
            Self::Neighborhood => Some(Self::Commune),
        }
    }

    /// Whether `self` is an ancestor level of `other`.
    #[must_use]
    pub fn is_ancestor_of(self, other: Self) -> bool {
        let mut current = other.parent();
        while let Some(level) = current {
            if level == self {
                return true;
            }
            current = level.parent();
        }
        false
    }

    /// Derives the parent unit code of `code` from the code itself, for
    /// sources that do not carry an explicit parent reference.
    #[must_use]
    pub fn derive_parent_code(self, code: &str) -> Option<String> {
        match self {
            Self::Country => None,
            Self::Region => Some(COUNTRY_CODE.to_string()),
            Self::Department => insee::region_of_department(code).map(str::to_string),
            Self::Commune => insee::department_of_commune(code).map(str::to_string),
            Self::Postcode => insee::department_of_postcode(code),
            Self::Neighborhood => insee::commune_of_iris(code).map(str::to_string),
        }
    }

    /// Normalizes a raw unit code read from a boundary source.
    ///
    /// Numeric sources lose leading zeros (`1001` for commune `01001`), so
    /// all-digit codes are padded back to the level's width.
    #[must_use]
    pub fn normalize_code(self, raw: &str) -> Option<String> {
        let raw = raw.trim();
        if raw.is_empty() {
            return None;
        }
        let pad = |width: usize| {
            if raw.bytes().all(|b| b.is_ascii_digit()) {
                format!("{raw:0>width$}")
            } else {
                raw.to_ascii_uppercase()
            }
        };
        match self {
            Self::Country => Some(raw.to_ascii_uppercase()),
            Self::Region => Some(pad(2)),
            Self::Department => insee::normalize_department_code(raw),
            Self::Commune => Some(pad(5)),
            Self::Postcode => insee::normalize_postcode(raw),
            Self::Neighborhood => Some(pad(9)),
        }
    }
}

/// A geographic area at one level of the hierarchy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeoUnit {
    /// Unique code within the level (INSEE code, postcode, IRIS code).
    pub code: String,
    /// Display name.
    pub name: String,
    /// Level of this unit.
    pub level: GeoLevel,
    /// Code of the parent unit, `None` only for the country.
    pub parent: Option<String>,
}

impl GeoUnit {
    /// Returns the root country unit.
    #[must_use]
    pub fn country() -> Self {
        Self {
            code: COUNTRY_CODE.to_string(),
            name: COUNTRY_NAME.to_string(),
            level: GeoLevel::Country,
            parent: None,
        }
    }

    /// Builds the region and department units from the embedded INSEE table.
    #[must_use]
    pub fn insee_reference_units() -> Vec<Self> {
        let regions = insee::REGIONS.iter().map(|(code, name)| Self {
            code: (*code).to_string(),
            name: (*name).to_string(),
            level: GeoLevel::Region,
            parent: Some(COUNTRY_CODE.to_string()),
        });
        let departments = insee::DEPARTMENTS.iter().map(|(code, name, region)| Self {
            code: (*code).to_string(),
            name: (*name).to_string(),
            level: GeoLevel::Department,
            parent: Some((*region).to_string()),
        });
        regions.chain(departments).collect()
    }
}
