//! Workbook parsers for the two supported layouts, plus the shared cell
//! coercion boundary.
//!
//! Cell values are validated and coerced explicitly here; type or format
//! mismatches become row-level [`crate::error::LedgerError::MalformedCell`]
//! errors collected by the parsers instead of ambiguous values propagating
//! downstream.

pub mod legacy;
pub mod modern;

use calamine::DataType;
use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, Utc};

/// Plain-text view of a cell, mirroring how spreadsheet UIs render it.
pub(crate) fn cell_text(cell: Option<&DataType>) -> String {
    match cell {
        Some(DataType::String(value)) => value.clone(),
        Some(DataType::Float(value)) => value.to_string(),
        Some(DataType::Int(value)) => value.to_string(),
        Some(DataType::Bool(value)) => value.to_string(),
        Some(DataType::Empty) | None => String::new(),
        Some(other) => other.to_string(),
    }
}

/// Trimmed text, with blank cells normalised to `None`.
pub(crate) fn cell_opt_text(cell: Option<&DataType>) -> Option<String> {
    let text = cell_text(cell);
    let trimmed = text.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

pub(crate) fn cell_is_empty(cell: Option<&DataType>) -> bool {
    cell_text(cell).trim().is_empty()
}

pub(crate) fn row_is_blank(row: &[DataType]) -> bool {
    row.iter().all(|cell| cell_is_empty(Some(cell)))
}

/// Numeric coercion. String cells accept plain decimals as well as
/// `10,50` / `1.234,56` style amounts with an optional currency prefix.
pub(crate) fn cell_number(cell: Option<&DataType>) -> Option<f64> {
    match cell {
        Some(DataType::Float(value)) => Some(*value),
        Some(DataType::Int(value)) => Some(*value as f64),
        Some(DataType::String(value)) => parse_amount(value),
        _ => None,
    }
}

pub(crate) fn parse_amount(raw: &str) -> Option<f64> {
    let stripped = raw.trim().trim_start_matches("R$").trim();
    if stripped.is_empty() {
        return None;
    }
    let normalized = if stripped.contains(',') && stripped.contains('.') {
        stripped.replace('.', "").replace(',', ".")
    } else if stripped.contains(',') {
        stripped.replace(',', ".")
    } else {
        stripped.to_string()
    };
    normalized.parse().ok()
}

/// Date coercion. Accepts native date cells (Excel serials) and
/// `YYYY-MM-DD` text, with or without a time component.
pub(crate) fn cell_date(cell: Option<&DataType>) -> Option<NaiveDate> {
    match cell {
        Some(DataType::DateTime(serial)) => Some(excel_serial_datetime(*serial).date()),
        Some(DataType::DateTimeIso(value)) | Some(DataType::String(value)) => parse_date(value),
        _ => None,
    }
}

pub(crate) fn parse_date(raw: &str) -> Option<NaiveDate> {
    let trimmed = raw.trim();
    NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
        .ok()
        .or_else(|| {
            NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%d %H:%M:%S")
                .ok()
                .map(|datetime| datetime.date())
        })
        .or_else(|| {
            trimmed
                .get(..10)
                .and_then(|prefix| NaiveDate::parse_from_str(prefix, "%Y-%m-%d").ok())
        })
}

/// Timestamp coercion for metadata columns such as `last_export_at`.
pub(crate) fn cell_datetime(cell: Option<&DataType>) -> Option<DateTime<Utc>> {
    match cell {
        Some(DataType::DateTime(serial)) => Some(excel_serial_datetime(*serial).and_utc()),
        Some(DataType::DateTimeIso(value)) | Some(DataType::String(value)) => {
            parse_datetime(value)
        }
        _ => None,
    }
}

pub(crate) fn parse_datetime(raw: &str) -> Option<DateTime<Utc>> {
    let trimmed = raw.trim();
    NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%d %H:%M:%S")
        .ok()
        .or_else(|| NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%dT%H:%M:%S").ok())
        .map(|datetime| datetime.and_utc())
        .or_else(|| {
            parse_date(trimmed).map(|date| date.and_hms_opt(0, 0, 0).unwrap().and_utc())
        })
}

/// Boolean coercion. Accepts native booleans, 0/1 numerics, and the usual
/// spreadsheet spellings including `sim`.
pub(crate) fn cell_bool(cell: Option<&DataType>) -> Option<bool> {
    match cell {
        Some(DataType::Bool(value)) => Some(*value),
        Some(DataType::Float(value)) => Some(*value != 0.0),
        Some(DataType::Int(value)) => Some(*value != 0),
        Some(DataType::String(value)) => Some(parse_bool(value)),
        _ => None,
    }
}

pub(crate) fn parse_bool(raw: &str) -> bool {
    matches!(
        raw.trim().to_lowercase().as_str(),
        "1" | "true" | "t" | "yes" | "y" | "sim"
    )
}

pub(crate) fn cell_u32(cell: Option<&DataType>) -> Option<u32> {
    let value = cell_number(cell)?;
    if value < 0.0 {
        return None;
    }
    Some(value.round() as u32)
}

pub(crate) fn cell_i32(cell: Option<&DataType>) -> Option<i32> {
    cell_number(cell).map(|value| value.round() as i32)
}

// Excel's day-serial epoch, accounting for the 1900 leap year bug.
fn excel_serial_datetime(serial: f64) -> NaiveDateTime {
    let base = NaiveDate::from_ymd_opt(1899, 12, 30)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap();
    let days = serial.floor();
    let seconds = ((serial - days) * 86_400.0).round() as i64;
    base + Duration::days(days as i64) + Duration::seconds(seconds)
}
