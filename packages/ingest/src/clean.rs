//! DVF record cleaning.
//!
//! Every field is read as text, so alphanumeric values in numeric-looking
//! columns (lot numbers like `12C`) never abort the run. Rows go through
//! three passes:
//!
//! 1. Row filters: sale nature, property type, price, surface, date and
//!    geographic keys.
//! 2. Main-local collapse: one row per mutation, the one with the largest
//!    surface (first in file order on ties).
//! 3. Price per m² plausibility: closed bounds, then a percentile-based
//!    upper cap.
//!
//! Rejected rows are counted per [`RejectReason`] and dropped.

use std::collections::BTreeMap;
use std::io::Read;
use std::path::Path;
use std::sync::Arc;

use csv::StringRecord;
use dvf_map_analytics_models::stats;
use dvf_map_config::{CleaningConfig, ColumnMapping, OutlierConfig};
use dvf_map_geography_models::insee;
use dvf_map_transaction_models::{PropertyType, Transaction};
use strum_macros::{AsRefStr, Display, EnumIter};

use crate::IngestError;
use crate::parse::{parse_coordinate, parse_french_number, parse_sale_date};
use crate::progress::ProgressCallback;

/// Rows between two progress updates.
const PROGRESS_INTERVAL: u64 = 10_000;

/// Why a row was dropped.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Display, AsRefStr, EnumIter,
)]
#[strum(serialize_all = "snake_case")]
pub enum RejectReason {
    /// Row could not be decoded or is missing required fields.
    Malformed,
    /// Mutation nature is not a sale.
    NotASale,
    /// Property type is empty or not retained.
    PropertyType,
    /// Price is missing, unparseable or not positive.
    InvalidPrice,
    /// Price is at or below the configured minimum.
    PriceBelowMinimum,
    /// Neither built nor Carrez surface is a positive number.
    InvalidSurface,
    /// Surface is at or below the configured minimum.
    SurfaceBelowMinimum,
    /// Department or commune key cannot be built.
    MissingGeographicKey,
    /// Sale date cannot be parsed.
    InvalidDate,
    /// Price per m² outside the closed plausibility bounds.
    PriceM2OutOfBounds,
    /// Price per m² above the percentile-based cap.
    Outlier,
}

/// Counts collected while cleaning.
///
/// `rows_read == rows_kept + mutations_collapsed + rejected_total()`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CleanReport {
    /// Data rows read (header excluded).
    pub rows_read: u64,
    /// Transactions in the canonical set.
    pub rows_kept: u64,
    /// Rows dropped because another row of the same mutation was kept.
    pub mutations_collapsed: u64,
    /// Rejected rows per reason.
    pub rejected: BTreeMap<RejectReason, u64>,
    /// Upper price-per-m² cap applied by outlier trimming, if any.
    pub price_m2_cap: Option<f64>,
}

impl CleanReport {
    /// Total rejected rows.
    #[must_use]
    pub fn rejected_total(&self) -> u64 {
        self.rejected.values().sum()
    }

    /// Rejected rows for one reason.
    #[must_use]
    pub fn rejected_for(&self, reason: RejectReason) -> u64 {
        self.rejected.get(&reason).copied().unwrap_or(0)
    }

    fn reject(&mut self, reason: RejectReason) {
        *self.rejected.entry(reason).or_default() += 1;
    }

    fn reject_n(&mut self, reason: RejectReason, n: u64) {
        if n > 0 {
            *self.rejected.entry(reason).or_default() += n;
        }
    }

    /// Logs the report at `info`, one line per non-zero reason.
    pub fn log_summary(&self) {
        log::info!(
            "Cleaning: {} rows read, {} kept, {} collapsed into their mutation, {} rejected",
            self.rows_read,
            self.rows_kept,
            self.mutations_collapsed,
            self.rejected_total()
        );
        for (reason, count) in &self.rejected {
            log::info!("  rejected {reason}: {count}");
        }
    }
}

/// Output of a cleaning run.
#[derive(Debug, Clone)]
pub struct CleanOutput {
    /// Canonical transactions in file order of their mutation's first row.
    pub transactions: Vec<Transaction>,
    /// Counts.
    pub report: CleanReport,
}

/// Column positions resolved from the header row.
#[derive(Debug, Clone)]
struct ColumnIndex {
    mutation_key: Vec<usize>,
    date: usize,
    nature: usize,
    price: usize,
    postcode: usize,
    department: usize,
    commune: usize,
    property_type: usize,
    built_surface: usize,
    carrez_surface: usize,
    longitude: Option<usize>,
    latitude: Option<usize>,
    iris_code: Option<usize>,
}

impl ColumnIndex {
    fn resolve(headers: &StringRecord, mapping: &ColumnMapping) -> Result<Self, IngestError> {
        let names: Vec<&str> = headers
            .iter()
            .map(|h| h.trim().trim_start_matches('\u{feff}'))
            .collect();
        let find = |name: &str| names.iter().position(|h| *h == name);
        let require = |name: &str| {
            find(name).ok_or_else(|| IngestError::MissingColumn {
                column: name.to_string(),
            })
        };
        let optional = |name: &Option<String>| name.as_deref().and_then(find);

        Ok(Self {
            mutation_key: mapping
                .mutation_key
                .iter()
                .map(|c| require(c))
                .collect::<Result<_, _>>()?,
            date: require(&mapping.mutation_date)?,
            nature: require(&mapping.mutation_nature)?,
            price: require(&mapping.price)?,
            postcode: require(&mapping.postcode)?,
            department: require(&mapping.department)?,
            commune: require(&mapping.commune)?,
            property_type: require(&mapping.property_type)?,
            built_surface: require(&mapping.built_surface)?,
            carrez_surface: require(&mapping.carrez_surface)?,
            longitude: optional(&mapping.longitude),
            latitude: optional(&mapping.latitude),
            iris_code: optional(&mapping.iris_code),
        })
    }

    fn max_required(&self) -> usize {
        self.mutation_key
            .iter()
            .copied()
            .chain([
                self.date,
                self.nature,
                self.price,
                self.postcode,
                self.department,
                self.commune,
                self.property_type,
                self.built_surface,
                self.carrez_surface,
            ])
            .max()
            .unwrap_or(0)
    }
}

/// Cleans raw DVF rows according to one [`CleaningConfig`].
pub struct Cleaner<'a> {
    config: &'a CleaningConfig,
    columns: ColumnIndex,
}

impl<'a> Cleaner<'a> {
    /// Resolves the configured columns against a header row.
    ///
    /// # Errors
    ///
    /// Returns [`IngestError::MissingColumn`] if a required column is absent.
    pub fn new(config: &'a CleaningConfig, headers: &StringRecord) -> Result<Self, IngestError> {
        let columns = ColumnIndex::resolve(headers, &config.columns)?;
        Ok(Self { config, columns })
    }

    /// Parses and filters one raw row into a transaction.
    ///
    /// # Errors
    ///
    /// Returns the reason the row is rejected.
    pub fn parse_row(&self, record: &StringRecord) -> Result<Transaction, RejectReason> {
        let c = &self.columns;
        if record.len() <= c.max_required() {
            return Err(RejectReason::Malformed);
        }
        let field = |i: usize| record.get(i).unwrap_or("").trim();

        if field(c.nature) != self.config.mutation_nature {
            return Err(RejectReason::NotASale);
        }

        let property_type = PropertyType::from_dvf_label(field(c.property_type))
            .filter(|t| self.config.property_types.contains(t))
            .ok_or(RejectReason::PropertyType)?;

        let price_eur = parse_french_number(field(c.price))
            .filter(|p| *p > 0.0)
            .ok_or(RejectReason::InvalidPrice)?;
        if price_eur <= self.config.min_price_eur {
            return Err(RejectReason::PriceBelowMinimum);
        }

        let surface_m2 = parse_french_number(field(c.built_surface))
            .filter(|s| *s > 0.0)
            .or_else(|| parse_french_number(field(c.carrez_surface)).filter(|s| *s > 0.0))
            .ok_or(RejectReason::InvalidSurface)?;
        if surface_m2 <= self.config.min_surface_m2 {
            return Err(RejectReason::SurfaceBelowMinimum);
        }

        let sale_date = parse_sale_date(field(c.date)).ok_or(RejectReason::InvalidDate)?;

        let department_code = insee::normalize_department_code(field(c.department))
            .ok_or(RejectReason::MissingGeographicKey)?;
        let commune_code = insee::commune_insee_code(&department_code, field(c.commune))
            .ok_or(RejectReason::MissingGeographicKey)?;
        let region_code = insee::region_of_department(&department_code).map(str::to_string);
        let postcode = insee::normalize_postcode(field(c.postcode));

        let optional = |i: Option<usize>| i.map(field).filter(|v| !v.is_empty());
        let longitude = optional(c.longitude).and_then(|v| parse_coordinate(v, 180.0));
        let latitude = optional(c.latitude).and_then(|v| parse_coordinate(v, 90.0));
        let iris_code = optional(c.iris_code).map(str::to_string);

        let mutation_id = c
            .mutation_key
            .iter()
            .map(|i| field(*i))
            .collect::<Vec<_>>()
            .join("|");

        let tx = Transaction {
            mutation_id,
            sale_date,
            price_eur,
            surface_m2,
            property_type,
            region_code,
            department_code,
            commune_code,
            postcode,
            iris_code,
            longitude,
            latitude,
        };
        tx.validate().map_err(|_| RejectReason::Malformed)?;
        Ok(tx)
    }
}

/// Cleans a raw DVF file.
///
/// # Errors
///
/// Returns [`IngestError`] if the file cannot be opened, a required column
/// is missing, or no transaction survives cleaning.
pub fn clean_file(
    path: &Path,
    config: &CleaningConfig,
    progress: &Arc<dyn ProgressCallback>,
) -> Result<CleanOutput, IngestError> {
    log::info!("Cleaning {}", path.display());
    let file = std::fs::File::open(path).map_err(|source| IngestError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    clean_reader(file, config, progress)
}

/// Cleans raw DVF rows from any reader.
///
/// # Errors
///
/// Returns [`IngestError`] on I/O failure, a missing required column, or an
/// empty canonical set.
pub fn clean_reader(
    reader: impl Read,
    config: &CleaningConfig,
    progress: &Arc<dyn ProgressCallback>,
) -> Result<CleanOutput, IngestError> {
    let delimiter = u8::try_from(config.delimiter).map_err(|_| IngestError::InvalidConfig {
        message: format!("delimiter {:?} is not a single byte", config.delimiter),
    })?;

    let mut csv_reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .flexible(true)
        .from_reader(reader);

    let headers = csv_reader.headers()?.clone();
    let cleaner = Cleaner::new(config, &headers)?;

    progress.set_message("Cleaning DVF rows".to_string());

    let mut report = CleanReport::default();
    let mut kept: Vec<Transaction> = Vec::new();
    let mut by_mutation: BTreeMap<String, usize> = BTreeMap::new();

    let mut record = StringRecord::new();
    loop {
        match csv_reader.read_record(&mut record) {
            Ok(true) => {}
            Ok(false) => break,
            Err(e) if e.is_io_error() => return Err(e.into()),
            Err(e) => {
                log::trace!("Skipping malformed row: {e}");
                report.rows_read += 1;
                report.reject(RejectReason::Malformed);
                continue;
            }
        }
        report.rows_read += 1;
        if report.rows_read.is_multiple_of(PROGRESS_INTERVAL) {
            progress.set_position(report.rows_read);
        }

        let tx = match cleaner.parse_row(&record) {
            Ok(tx) => tx,
            Err(reason) => {
                report.reject(reason);
                continue;
            }
        };

        // Main-local collapse: keep the largest surface, first row on ties.
        if let Some(&index) = by_mutation.get(&tx.mutation_id) {
            report.mutations_collapsed += 1;
            if tx.surface_m2 > kept[index].surface_m2 {
                kept[index] = tx;
            }
        } else {
            by_mutation.insert(tx.mutation_id.clone(), kept.len());
            kept.push(tx);
        }
    }
    progress.set_position(report.rows_read);

    let (transactions, out_of_bounds) =
        apply_price_bounds(kept, config.min_price_m2, config.max_price_m2);
    report.reject_n(RejectReason::PriceM2OutOfBounds, out_of_bounds);

    let (transactions, cap, outliers) = trim_outliers(transactions, &config.outliers);
    report.reject_n(RejectReason::Outlier, outliers);
    report.price_m2_cap = cap;
    if let Some(cap) = cap {
        log::info!(
            "Price/m² filtering: {:.0} - {cap:.0}",
            config.min_price_m2
        );
    }

    report.rows_kept = transactions.len() as u64;
    progress.finish(format!("Cleaned {} transactions", report.rows_kept));
    report.log_summary();

    if transactions.is_empty() {
        return Err(IngestError::EmptyTransactionSet);
    }

    Ok(CleanOutput {
        transactions,
        report,
    })
}

/// Keeps transactions whose price per m² lies in `[min, max]`.
fn apply_price_bounds(
    transactions: Vec<Transaction>,
    min: f64,
    max: f64,
) -> (Vec<Transaction>, u64) {
    let before = transactions.len();
    let kept: Vec<Transaction> = transactions
        .into_iter()
        .filter(|tx| (min..=max).contains(&tx.price_m2()))
        .collect();
    let dropped = (before - kept.len()) as u64;
    (kept, dropped)
}

/// Drops transactions above `min(q_hi + k * (q_hi - q_lo), absolute_max)`.
///
/// Returns the kept transactions, the cap when trimming ran, and the number
/// of dropped transactions.
fn trim_outliers(
    transactions: Vec<Transaction>,
    config: &OutlierConfig,
) -> (Vec<Transaction>, Option<f64>, u64) {
    if !config.enabled || transactions.is_empty() {
        return (transactions, None, 0);
    }

    let mut values: Vec<f64> = transactions.iter().map(Transaction::price_m2).collect();
    stats::sort_values(&mut values);
    let (Some(lo), Some(hi)) = (
        stats::quantile(&values, config.lower_quantile),
        stats::quantile(&values, config.upper_quantile),
    ) else {
        return (transactions, None, 0);
    };

    let cap = (hi + config.iqr_multiplier * (hi - lo)).min(config.absolute_max_price_m2);
    log::debug!(
        "Outlier cap {cap:.0} (q{:.0}={lo:.0}, q{:.0}={hi:.0})",
        config.lower_quantile * 100.0,
        config.upper_quantile * 100.0
    );

    let before = transactions.len();
    let kept: Vec<Transaction> = transactions
        .into_iter()
        .filter(|tx| tx.price_m2() <= cap)
        .collect();
    let dropped = (before - kept.len()) as u64;
    (kept, Some(cap), dropped)
}

#[cfg(test)]
mod tests {
    use dvf_map_config::PipelineConfig;
    use strum::IntoEnumIterator as _;

    use super::*;
    use crate::progress::null_progress;

    const HEADER: &str = "Identifiant de document|Date mutation|Nature mutation|Valeur fonciere|Code postal|Code departement|Code commune|Section|No plan|Type local|Surface reelle bati|Surface Carrez du 1er lot";

    #[allow(clippy::too_many_arguments)]
    fn row(
        doc: &str,
        nature: &str,
        price: &str,
        dept: &str,
        commune: &str,
        plan: &str,
        kind: &str,
        built: &str,
        carrez: &str,
    ) -> String {
        format!("{doc}|14/03/2025|{nature}|{price}|75011|{dept}|{commune}|AB|{plan}|{kind}|{built}|{carrez}")
    }

    fn config() -> CleaningConfig {
        let mut config = PipelineConfig::embedded_default().unwrap().cleaning;
        config.outliers.enabled = false;
        config
    }

    fn clean(rows: &[String], config: &CleaningConfig) -> Result<CleanOutput, IngestError> {
        let input = std::iter::once(HEADER.to_string())
            .chain(rows.iter().cloned())
            .collect::<Vec<_>>()
            .join("\n");
        clean_reader(input.as_bytes(), config, &null_progress())
    }

    #[test]
    fn keeps_a_valid_apartment_sale() {
        let out = clean(
            &[row("d1", "Vente", "250000,00", "75", "111", "1", "Appartement", "50", "")],
            &config(),
        )
        .unwrap();

        assert_eq!(out.transactions.len(), 1);
        let tx = &out.transactions[0];
        assert_eq!(tx.commune_code, "75111");
        assert_eq!(tx.region_code.as_deref(), Some("11"));
        assert_eq!(tx.postcode.as_deref(), Some("75011"));
        assert_eq!(tx.property_type, PropertyType::Apartment);
        assert!((tx.price_m2() - 5000.0).abs() < 1e-9);
    }

    #[test]
    fn zero_surface_row_is_dropped() {
        let out = clean(
            &[
                row("d1", "Vente", "250000", "75", "111", "1", "Appartement", "0", ""),
                row("d2", "Vente", "250000", "75", "111", "2", "Appartement", "50", ""),
            ],
            &config(),
        )
        .unwrap();
        assert_eq!(out.transactions.len(), 1);
        assert_eq!(out.report.rejected_for(RejectReason::InvalidSurface), 1);
        assert!(out.transactions.iter().all(|tx| tx.surface_m2 > 0.0));
    }

    #[test]
    fn carrez_surface_is_the_fallback() {
        let out = clean(
            &[row("d1", "Vente", "200000", "69", "383", "1", "Maison", "", "40,5")],
            &config(),
        )
        .unwrap();
        assert!((out.transactions[0].surface_m2 - 40.5).abs() < 1e-9);
    }

    #[test]
    fn rejects_by_reason() {
        let rows = [
            row("a", "Echange", "250000", "75", "111", "1", "Appartement", "50", ""),
            row("b", "Vente", "250000", "75", "111", "1", "Local industriel", "50", ""),
            row("c", "Vente", "250000", "75", "111", "1", "", "50", ""),
            row("d", "Vente", "abc", "75", "111", "1", "Appartement", "50", ""),
            row("e", "Vente", "9000", "75", "111", "1", "Appartement", "50", ""),
            row("f", "Vente", "250000", "75", "111", "1", "Appartement", "8", ""),
            row("g", "Vente", "250000", "", "111", "1", "Appartement", "50", ""),
            row("h", "Vente", "250000", "75", "111", "1", "Appartement", "50", "")
                .replace("14/03/2025", "not a date"),
            row("i", "Vente", "20000", "75", "111", "1", "Appartement", "100", ""),
            "short|row".to_string(),
            row("k", "Vente", "250000", "75", "111", "1", "Appartement", "50", ""),
        ];
        let out = clean(&rows, &config()).unwrap();
        let r = &out.report;

        assert_eq!(r.rejected_for(RejectReason::NotASale), 1);
        assert_eq!(r.rejected_for(RejectReason::PropertyType), 2);
        assert_eq!(r.rejected_for(RejectReason::InvalidPrice), 1);
        assert_eq!(r.rejected_for(RejectReason::PriceBelowMinimum), 1);
        assert_eq!(r.rejected_for(RejectReason::SurfaceBelowMinimum), 1);
        assert_eq!(r.rejected_for(RejectReason::MissingGeographicKey), 1);
        assert_eq!(r.rejected_for(RejectReason::InvalidDate), 1);
        assert_eq!(r.rejected_for(RejectReason::PriceM2OutOfBounds), 1);
        assert_eq!(r.rejected_for(RejectReason::Malformed), 1);
        assert_eq!(r.rows_kept, 1);
        assert_eq!(
            r.rows_read,
            r.rows_kept + r.mutations_collapsed + r.rejected_total()
        );
    }

    #[test]
    fn collapses_a_mutation_to_its_largest_local() {
        let out = clean(
            &[
                row("d1", "Vente", "300000", "75", "111", "1", "Appartement", "30", ""),
                row("d1", "Vente", "300000", "75", "111", "1", "Appartement", "60", ""),
                row("d1", "Vente", "300000", "75", "111", "1", "Maison", "60", ""),
                row("d2", "Vente", "300000", "75", "111", "1", "Maison", "100", ""),
            ],
            &config(),
        )
        .unwrap();

        assert_eq!(out.transactions.len(), 2);
        assert_eq!(out.report.mutations_collapsed, 2);
        // Largest surface wins, the earlier row wins the 60 m² tie.
        assert!((out.transactions[0].surface_m2 - 60.0).abs() < 1e-9);
        assert_eq!(out.transactions[0].property_type, PropertyType::Apartment);
        assert_eq!(out.transactions[1].mutation_id.split('|').next(), Some("d2"));
    }

    #[test]
    fn outlier_cap_uses_percentile_spread() {
        let mut config = config();
        config.outliers.enabled = true;

        // 19 sales at 4000 €/m² and one at 14000 €/m²: q10 = q90 = 4000, so
        // the cap is 4000 and the expensive sale is trimmed.
        let mut rows: Vec<String> = (0..19)
            .map(|i| {
                row(&format!("d{i}"), "Vente", "200000", "75", "111", "1", "Appartement", "50", "")
            })
            .collect();
        rows.push(row("x", "Vente", "700000", "75", "111", "1", "Appartement", "50", ""));

        let out = clean(&rows, &config).unwrap();
        assert_eq!(out.report.rejected_for(RejectReason::Outlier), 1);
        assert_eq!(out.transactions.len(), 19);
        assert!((out.report.price_m2_cap.unwrap() - 4000.0).abs() < 1e-9);
    }

    #[test]
    fn outlier_cap_uses_sampled_percentiles() {
        let mut config = config();
        config.outliers.enabled = true;

        // 3000..=6600 €/m² in steps of 400: q10 is the 2nd sale (3400) and
        // q90 the 9th (6200), so the cap is 6200 + 1.5 * 2800.
        let rows: Vec<String> = (0..10)
            .map(|i| {
                let price = format!("{}", 150_000 + i * 20_000);
                row(&format!("d{i}"), "Vente", &price, "75", "111", "1", "Appartement", "50", "")
            })
            .collect();

        let out = clean(&rows, &config).unwrap();
        assert!((out.report.price_m2_cap.unwrap() - 10_400.0).abs() < 1e-9);
        assert_eq!(out.transactions.len(), 10);
    }

    #[test]
    fn absolute_max_bounds_the_cap() {
        let mut config = config();
        config.outliers.enabled = true;
        config.outliers.absolute_max_price_m2 = 4500.0;

        let rows: Vec<String> = (0..10)
            .map(|i| {
                let price = format!("{}", 150_000 + i * 20_000);
                row(&format!("d{i}"), "Vente", &price, "75", "111", "1", "Appartement", "50", "")
            })
            .collect();

        let out = clean(&rows, &config).unwrap();
        assert!((out.report.price_m2_cap.unwrap() - 4500.0).abs() < 1e-9);
        assert!(out.transactions.iter().all(|tx| tx.price_m2() <= 4500.0));
    }

    #[test]
    fn missing_required_column_is_fatal() {
        let input = "Date mutation|Nature mutation\n01/01/2025|Vente";
        let err = clean_reader(input.as_bytes(), &config(), &null_progress()).unwrap_err();
        assert!(
            matches!(err, IngestError::MissingColumn { ref column } if column == "Identifiant de document"),
            "{err}"
        );
    }

    #[test]
    fn empty_result_is_fatal() {
        let err = clean(
            &[row("d1", "Echange", "250000", "75", "111", "1", "Appartement", "50", "")],
            &config(),
        )
        .unwrap_err();
        assert!(matches!(err, IngestError::EmptyTransactionSet));
    }

    #[test]
    fn geolocated_export_columns() {
        let mut config = config();
        config.delimiter = ',';
        config.columns = ColumnMapping {
            mutation_key: vec!["id_mutation".to_string()],
            mutation_date: "date_mutation".to_string(),
            mutation_nature: "nature_mutation".to_string(),
            price: "valeur_fonciere".to_string(),
            postcode: "code_postal".to_string(),
            department: "code_departement".to_string(),
            commune: "code_commune".to_string(),
            property_type: "type_local".to_string(),
            built_surface: "surface_reelle_bati".to_string(),
            carrez_surface: "lot1_surface_carrez".to_string(),
            longitude: Some("longitude".to_string()),
            latitude: Some("latitude".to_string()),
            iris_code: Some("code_iris".to_string()),
        };
        let input = "id_mutation,date_mutation,nature_mutation,valeur_fonciere,code_postal,code_commune,code_departement,type_local,surface_reelle_bati,lot1_surface_carrez,longitude,latitude,code_iris\n\
                     2025-1,2025-02-01,Vente,320000,69003,69383,69,Appartement,64,,4.85,45.76,693830101";
        let out = clean_reader(input.as_bytes(), &config, &null_progress()).unwrap();
        let tx = &out.transactions[0];
        assert_eq!(tx.commune_code, "69383");
        assert_eq!(tx.iris_code.as_deref(), Some("693830101"));
        assert_eq!(tx.longitude, Some(4.85));
        assert_eq!(tx.latitude, Some(45.76));
    }

    #[test]
    fn reject_reasons_have_stable_names() {
        let names: Vec<String> = RejectReason::iter().map(|r| r.to_string()).collect();
        assert!(names.contains(&"price_m2_out_of_bounds".to_string()));
        assert!(names.contains(&"missing_geographic_key".to_string()));
    }
}
