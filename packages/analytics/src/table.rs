//! Aggregate tables on disk (`mart/<level>.csv`).

use std::path::Path;

use chrono::NaiveDate;
use dvf_map_analytics_models::{AggregateRecord, LevelTable, PriceStats};
use dvf_map_geography_models::GeoLevel;
use dvf_map_transaction_models::PropertyType;
use serde::{Deserialize, Serialize};

use crate::AnalyticsError;

#[derive(Debug, Serialize, Deserialize)]
struct TableRow {
    code: String,
    property_type: PropertyType,
    n_sales: u64,
    median_price_m2: f64,
    mean_price_m2: f64,
    p25_price_m2: f64,
    p75_price_m2: f64,
    last_tx_date: NaiveDate,
}

impl From<&AggregateRecord> for TableRow {
    fn from(record: &AggregateRecord) -> Self {
        Self {
            code: record.code.clone(),
            property_type: record.property_type,
            n_sales: record.stats.n_sales,
            median_price_m2: record.stats.median_price_m2,
            mean_price_m2: record.stats.mean_price_m2,
            p25_price_m2: record.stats.p25_price_m2,
            p75_price_m2: record.stats.p75_price_m2,
            last_tx_date: record.stats.last_tx_date,
        }
    }
}

impl TableRow {
    fn into_record(self, level: GeoLevel) -> AggregateRecord {
        AggregateRecord {
            level,
            code: self.code,
            property_type: self.property_type,
            stats: PriceStats {
                n_sales: self.n_sales,
                median_price_m2: self.median_price_m2,
                mean_price_m2: self.mean_price_m2,
                p25_price_m2: self.p25_price_m2,
                p75_price_m2: self.p75_price_m2,
                last_tx_date: self.last_tx_date,
            },
        }
    }
}

/// Writes `table` to `path` as CSV, one row per record in table order.
///
/// A table with no records still gets its header row.
///
/// # Errors
///
/// Returns [`AnalyticsError`] if the file cannot be written.
pub fn write_table(path: &Path, table: &LevelTable) -> Result<(), AnalyticsError> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_path(path)?;
    writer.write_record([
        "code",
        "property_type",
        "n_sales",
        "median_price_m2",
        "mean_price_m2",
        "p25_price_m2",
        "p75_price_m2",
        "last_tx_date",
    ])?;
    for record in &table.records {
        writer.serialize(TableRow::from(record))?;
    }
    writer.flush().map_err(|source| AnalyticsError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    log::debug!(
        "Wrote {} {} records to {}",
        table.len(),
        table.level,
        path.display()
    );
    Ok(())
}

/// Reads the table for `level` from `path`.
///
/// # Errors
///
/// Returns [`AnalyticsError::MissingTable`] if the file does not exist and
/// [`AnalyticsError::InvalidRecord`] if a row cannot be decoded or has no
/// sales.
pub fn read_table(path: &Path, level: GeoLevel) -> Result<LevelTable, AnalyticsError> {
    if !path.is_file() {
        return Err(AnalyticsError::MissingTable {
            level,
            path: path.to_path_buf(),
        });
    }

    let mut reader = csv::Reader::from_path(path)?;
    let mut records = Vec::new();
    for (index, result) in reader.deserialize::<TableRow>().enumerate() {
        let line = index as u64 + 2;
        let row = result.map_err(|e| AnalyticsError::InvalidRecord {
            path: path.to_path_buf(),
            line,
            message: e.to_string(),
        })?;
        if row.n_sales == 0 {
            return Err(AnalyticsError::InvalidRecord {
                path: path.to_path_buf(),
                line,
                message: "n_sales must be positive".to_string(),
            });
        }
        records.push(row.into_record(level));
    }

    Ok(LevelTable::new(level, records))
}
