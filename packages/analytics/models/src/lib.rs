#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Aggregate statistics types.
//!
//! An [`AggregateRecord`] summarizes the price per m² of every transaction
//! of one property type inside one geographic unit. Records exist only for
//! groups that passed their level's stability threshold.

pub mod stats;

use std::collections::BTreeMap;

use chrono::NaiveDate;
use dvf_map_geography_models::GeoLevel;
use dvf_map_transaction_models::PropertyType;
use serde::{Deserialize, Serialize};

/// Summary of one group of price-per-m² samples.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceStats {
    /// Number of sales in the group.
    pub n_sales: u64,
    /// Median price per m² (the primary statistic).
    pub median_price_m2: f64,
    /// Mean price per m².
    pub mean_price_m2: f64,
    /// First quartile.
    pub p25_price_m2: f64,
    /// Third quartile.
    pub p75_price_m2: f64,
    /// Most recent sale date in the group.
    pub last_tx_date: NaiveDate,
}

impl PriceStats {
    /// Computes statistics from a group of `(price_m2, sale_date)` samples.
    ///
    /// Returns `None` for an empty group.
    #[must_use]
    pub fn from_samples(samples: &[(f64, NaiveDate)]) -> Option<Self> {
        let last_tx_date = samples.iter().map(|(_, date)| *date).max()?;
        let mut values: Vec<f64> = samples.iter().map(|(v, _)| *v).collect();
        let mean_price_m2 = stats::mean(&values)?;
        stats::sort_values(&mut values);

        Some(Self {
            n_sales: values.len() as u64,
            median_price_m2: stats::median(&values)?,
            mean_price_m2,
            p25_price_m2: stats::quantile(&values, 0.25)?,
            p75_price_m2: stats::quantile(&values, 0.75)?,
            last_tx_date,
        })
    }
}

/// Statistics for one (unit, property type) group at one level.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateRecord {
    /// Level of the unit.
    pub level: GeoLevel,
    /// Unit code.
    pub code: String,
    /// Property type of the group.
    pub property_type: PropertyType,
    /// Group statistics.
    pub stats: PriceStats,
}

/// All surviving records of one level, sorted by (code, property type).
#[derive(Debug, Clone, PartialEq)]
pub struct LevelTable {
    /// Level of every record.
    pub level: GeoLevel,
    /// Records sorted by (code, property type).
    pub records: Vec<AggregateRecord>,
}

impl LevelTable {
    /// Builds a table, sorting records into canonical order.
    #[must_use]
    pub fn new(level: GeoLevel, mut records: Vec<AggregateRecord>) -> Self {
        records.sort_by(|a, b| {
            a.code
                .cmp(&b.code)
                .then_with(|| a.property_type.cmp(&b.property_type))
        });
        Self { level, records }
    }

    /// Number of records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the table has no records.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Looks up the record for a unit and property type.
    #[must_use]
    pub fn get(&self, code: &str, property_type: PropertyType) -> Option<&AggregateRecord> {
        self.records
            .binary_search_by(|r| {
                r.code
                    .as_str()
                    .cmp(code)
                    .then_with(|| r.property_type.cmp(&property_type))
            })
            .ok()
            .map(|i| &self.records[i])
    }

    /// Groups records by unit code.
    #[must_use]
    pub fn by_code(&self) -> BTreeMap<&str, Vec<&AggregateRecord>> {
        let mut grouped: BTreeMap<&str, Vec<&AggregateRecord>> = BTreeMap::new();
        for record in &self.records {
            grouped.entry(record.code.as_str()).or_default().push(record);
        }
        grouped
    }
}
