//! Common helpers shared across all models.

use serde::Serializer;

/// Country code used when a filename carries none.
pub const UNKNOWN_COUNTRY: &str = "UNKNOWN";

/// Extract the country code from a chart export filename.
///
/// The code is the second `-` separated part, upper-cased:
/// `regional-au-weekly-2023-06-15.csv` becomes `AU`.
pub fn country_from_filename(file_name: &str) -> String {
    let mut parts = file_name.split('-');
    parts.next();
    match parts.next() {
        Some(code) => code.to_uppercase(),
        None => UNKNOWN_COUNTRY.to_string(),
    }
}

/// Parse a numeric cell. Empty or unparsable cells are missing.
pub fn parse_number(cell: &str) -> Option<f64> {
    let cell = cell.trim();
    if cell.is_empty() {
        return None;
    }
    cell.parse::<f64>().ok().filter(|v| !v.is_nan())
}

/// Parse a text cell. Empty cells are missing.
pub fn parse_text(cell: &str) -> Option<String> {
    if cell.is_empty() {
        None
    } else {
        Some(cell.to_string())
    }
}

/// Round to two decimals, ties to even.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round_ties_even() / 100.0
}

/// Format a number for CSV output.
///
/// Integral values are written without a fractional part so stream counts
/// stay readable; everything else uses the shortest round-trip form.
pub fn format_number(value: f64) -> String {
    if value.is_nan() {
        String::new()
    } else if value.is_infinite() {
        let sign = if value > 0.0 { "" } else { "-" };
        format!("{}inf", sign)
    } else if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{}", value)
    }
}

/// Format an optional number; missing values are empty cells.
pub fn format_opt_number(value: Option<f64>) -> String {
    value.map(format_number).unwrap_or_default()
}

pub(crate) fn serialize_number<S: Serializer>(value: &f64, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(&format_number(*value))
}

pub(crate) fn serialize_opt_number<S: Serializer>(
    value: &Option<f64>,
    s: S,
) -> Result<S::Ok, S::Error> {
    s.serialize_str(&format_opt_number(*value))
}
