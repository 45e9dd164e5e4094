//! Canonical transaction table (`intermediate/transactions.csv`).
//!
//! One row per [`Transaction`], in cleaning order. Reading the table back
//! re-checks every transaction invariant, so a hand-edited or truncated
//! file fails loudly instead of skewing the statistics.

use std::path::Path;

use dvf_map_transaction_models::Transaction;

use crate::IngestError;

/// Writes transactions to `path` as CSV with a header row.
///
/// # Errors
///
/// Returns [`IngestError`] if the file cannot be written.
pub fn write_transactions(path: &Path, transactions: &[Transaction]) -> Result<(), IngestError> {
    let mut writer = csv::Writer::from_path(path)?;
    for tx in transactions {
        writer.serialize(tx)?;
    }
    writer.flush().map_err(|source| IngestError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    log::info!(
        "Wrote {} transactions to {}",
        transactions.len(),
        path.display()
    );
    Ok(())
}

/// Reads and validates the canonical table.
///
/// # Errors
///
/// Returns [`IngestError`] if the file is missing, a row cannot be decoded
/// or violates a transaction invariant, or the table is empty.
pub fn read_transactions(path: &Path) -> Result<Vec<Transaction>, IngestError> {
    if !path.is_file() {
        return Err(IngestError::Io {
            path: path.to_path_buf(),
            source: std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "canonical transaction table not found (run `clean` first)",
            ),
        });
    }

    let mut reader = csv::Reader::from_path(path)?;
    let mut transactions = Vec::new();

    for (index, result) in reader.deserialize::<Transaction>().enumerate() {
        let line = index as u64 + 2;
        let tx = result.map_err(|e| IngestError::InvalidRecord {
            line,
            message: e.to_string(),
        })?;
        tx.validate().map_err(|e| IngestError::InvalidRecord {
            line,
            message: e.to_string(),
        })?;
        transactions.push(tx);
    }

    if transactions.is_empty() {
        return Err(IngestError::EmptyTransactionSet);
    }

    log::info!(
        "Read {} transactions from {}",
        transactions.len(),
        path.display()
    );
    Ok(transactions)
}
