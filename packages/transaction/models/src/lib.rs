#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Canonical sale transaction types.
//!
//! A [`Transaction`] is one residential sale after cleaning: a single
//! representative lot per mutation with a strictly positive price and
//! living area. Price per square meter is always derived from those two
//! values and never stored separately.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// Property type of the main lot of a sale.
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
pub enum PropertyType {
    /// `Maison` in DVF.
    House,
    /// `Appartement` in DVF.
    Apartment,
    /// Any other non-empty local type (`Dépendance`, commercial premises...).
    Other,
}

impl PropertyType {
    /// Maps a DVF `Type local` label to a property type.
    ///
    /// Returns `None` for empty labels (rows describing bare land).
    #[must_use]
    pub fn from_dvf_label(label: &str) -> Option<Self> {
        match label.trim() {
            "" => None,
            "Maison" => Some(Self::House),
            "Appartement" => Some(Self::Apartment),
            _ => Some(Self::Other),
        }
    }

    /// Returns all variants of this enum.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[Self::House, Self::Apartment, Self::Other]
    }
}

/// Reason a transaction failed validation.
#[derive(Debug, Clone, PartialEq)]
pub enum InvalidTransaction {
    /// Price is zero, negative or not finite.
    Price(f64),
    /// Living area is zero, negative or not finite.
    Surface(f64),
    /// A required geographic key is empty.
    MissingKey(&'static str),
}

impl std::fmt::Display for InvalidTransaction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Price(v) => write!(f, "invalid price {v}: must be finite and > 0"),
            Self::Surface(v) => write!(f, "invalid surface {v}: must be finite and > 0"),
            Self::MissingKey(key) => write!(f, "missing geographic key: {key}"),
        }
    }
}

impl std::error::Error for InvalidTransaction {}

/// A cleaned residential sale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    /// Composite mutation key (one transaction per mutation).
    pub mutation_id: String,
    /// Date of the sale.
    pub sale_date: NaiveDate,
    /// Sale price in whole euros.
    pub price_eur: f64,
    /// Living area in square meters.
    pub surface_m2: f64,
    /// Property type of the main lot.
    pub property_type: PropertyType,
    /// INSEE region code (e.g. `"11"`), when the department is known.
    pub region_code: Option<String>,
    /// INSEE department code (e.g. `"75"`, `"2A"`, `"971"`).
    pub department_code: String,
    /// Five-character INSEE commune code (e.g. `"75056"`).
    pub commune_code: String,
    /// Five-digit postcode.
    pub postcode: Option<String>,
    /// IRIS code, only present in geolocated exports.
    pub iris_code: Option<String>,
    /// WGS84 longitude.
    pub longitude: Option<f64>,
    /// WGS84 latitude.
    pub latitude: Option<f64>,
}

impl Transaction {
    /// Price per square meter, always `price_eur / surface_m2`.
    #[must_use]
    pub fn price_m2(&self) -> f64 {
        self.price_eur / self.surface_m2
    }

    /// Checks the canonical invariants: positive finite price and area and
    /// non-empty department and commune keys.
    ///
    /// # Errors
    ///
    /// Returns the first violated invariant.
    pub fn validate(&self) -> Result<(), InvalidTransaction> {
        if !self.price_eur.is_finite() || self.price_eur <= 0.0 {
            return Err(InvalidTransaction::Price(self.price_eur));
        }
        if !self.surface_m2.is_finite() || self.surface_m2 <= 0.0 {
            return Err(InvalidTransaction::Surface(self.surface_m2));
        }
        if self.department_code.trim().is_empty() {
            return Err(InvalidTransaction::MissingKey("department_code"));
        }
        if self.commune_code.trim().is_empty() {
            return Err(InvalidTransaction::MissingKey("commune_code"));
        }
        Ok(())
    }
}
