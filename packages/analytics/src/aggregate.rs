//! The aggregator.
//!
//! Every level is computed independently from the full transaction set:
//! a department's count includes sales in communes that were themselves
//! suppressed at commune level.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::NaiveDate;
use dvf_map_analytics_models::{AggregateRecord, LevelTable, PriceStats};
use dvf_map_config::PipelineConfig;
use dvf_map_geography::GeoHierarchy;
use dvf_map_geography_models::GeoLevel;
use dvf_map_ingest::progress::ProgressCallback;
use dvf_map_transaction_models::{PropertyType, Transaction};
use rayon::prelude::*;

use crate::AnalyticsError;

/// Counts describing one level's aggregation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LevelSummary {
    /// Level aggregated.
    pub level: GeoLevel,
    /// Threshold applied.
    pub min_sales: u64,
    /// Groups before the stability rule.
    pub groups: usize,
    /// Groups that passed the stability rule.
    pub kept: usize,
    /// Transactions whose key did not resolve at this level.
    pub unresolved: u64,
}

impl LevelSummary {
    /// Groups removed by the stability rule.
    #[must_use]
    pub const fn suppressed(&self) -> usize {
        self.groups - self.kept
    }
}

/// Levels that get a statistics table under `config`.
///
/// Under the commune fallback the neighborhood level has no table of its
/// own: its tiles reuse commune statistics.
#[must_use]
pub fn aggregated_levels(config: &PipelineConfig) -> Vec<GeoLevel> {
    GeoLevel::all()
        .iter()
        .copied()
        .filter(|level| *level != GeoLevel::Neighborhood || !config.uses_commune_fallback())
        .collect()
}

/// Aggregates one level.
///
/// Transactions are grouped by (unit, property type); groups with fewer
/// than `min_sales` sales are dropped.
#[must_use]
pub fn aggregate_level(
    transactions: &[Transaction],
    hierarchy: &GeoHierarchy,
    level: GeoLevel,
    min_sales: u64,
) -> (LevelTable, LevelSummary) {
    let mut groups: BTreeMap<(String, PropertyType), Vec<(f64, NaiveDate)>> = BTreeMap::new();
    let mut unresolved = 0u64;

    for tx in transactions {
        let Some(code) = hierarchy.resolve(tx, level) else {
            unresolved += 1;
            continue;
        };
        groups
            .entry((code, tx.property_type))
            .or_default()
            .push((tx.price_m2(), tx.sale_date));
    }

    let total_groups = groups.len();
    let mut records = Vec::new();

    for ((code, property_type), samples) in groups {
        let n = samples.len() as u64;
        if n < min_sales {
            log::debug!("{level} {code} {property_type}: suppressed ({n} < {min_sales})");
            continue;
        }
        if let Some(stats) = PriceStats::from_samples(&samples) {
            records.push(AggregateRecord {
                level,
                code,
                property_type,
                stats,
            });
        }
    }

    let summary = LevelSummary {
        level,
        min_sales,
        groups: total_groups,
        kept: records.len(),
        unresolved,
    };

    (LevelTable::new(level, records), summary)
}

/// Aggregates every level in parallel.
///
/// # Errors
///
/// Returns [`AnalyticsError::EmptyTransactionSet`] if `transactions` is
/// empty.
pub fn aggregate_all(
    transactions: &[Transaction],
    hierarchy: &GeoHierarchy,
    config: &PipelineConfig,
    progress: &Arc<dyn ProgressCallback>,
) -> Result<BTreeMap<GeoLevel, LevelTable>, AnalyticsError> {
    if transactions.is_empty() {
        return Err(AnalyticsError::EmptyTransactionSet);
    }

    let levels = aggregated_levels(config);
    progress.set_total(levels.len() as u64);
    progress.set_message("Aggregating levels".to_string());

    let results: Vec<(LevelTable, LevelSummary)> = levels
        .par_iter()
        .map(|level| {
            let result = aggregate_level(transactions, hierarchy, *level, config.min_sales(*level));
            progress.inc(1);
            result
        })
        .collect();

    let mut tables = BTreeMap::new();
    for (table, summary) in results {
        log::info!(
            "{}: {} groups, {} kept, {} suppressed below {} sales, {} unresolved transactions",
            summary.level,
            summary.groups,
            summary.kept,
            summary.suppressed(),
            summary.min_sales,
            summary.unresolved
        );
        tables.insert(table.level, table);
    }

    progress.finish(format!("Aggregated {} levels", tables.len()));
    Ok(tables)
}
