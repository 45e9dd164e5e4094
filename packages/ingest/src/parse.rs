//! Field parsers for DVF text values.

use chrono::NaiveDate;

/// Parses a French-formatted number: whitespace (including non-breaking
/// spaces used as thousands separators) is removed and the decimal comma
/// becomes a dot.
///
/// Returns `None` for empty, non-numeric or non-finite input.
#[must_use]
pub fn parse_french_number(raw: &str) -> Option<f64> {
    let cleaned: String = raw
        .chars()
        .filter(|c| !c.is_whitespace())
        .map(|c| if c == ',' { '.' } else { c })
        .collect();
    if cleaned.is_empty() {
        return None;
    }
    let value: f64 = cleaned.parse().ok()?;
    value.is_finite().then_some(value)
}

/// Parses a sale date in `dd/mm/yyyy` (DGFiP export) or ISO `yyyy-mm-dd`
/// (geolocated export) form.
#[must_use]
pub fn parse_sale_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    NaiveDate::parse_from_str(raw, "%d/%m/%Y")
        .or_else(|_| NaiveDate::parse_from_str(raw, "%Y-%m-%d"))
        .ok()
}

/// Parses an optional coordinate, accepting only values with an absolute value up to `limit`.
#[must_use]
pub fn parse_coordinate(raw: &str, limit: f64) -> Option<f64> {
    parse_french_number(raw).filter(|v| v.abs() <= limit)
}
