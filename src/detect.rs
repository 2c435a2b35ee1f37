use calamine::{Reader, Xlsx};

use crate::error::{LedgerError, Result};
use crate::export::MODERN_SHEETS;
use crate::io::excel_read;
use crate::model::Layout;
use crate::parse::legacy::RowLabel;

/// Classifies an opened workbook as one of the two supported layouts.
///
/// Any sheet name in the canonical backup set wins `ModernBackup`. Failing
/// that, a workbook whose every sheet is a 4-digit year carrying the three
/// fixed row labels in its first column is `LegacyYearly`. Everything else
/// is rejected. Inspection only; no parsing state survives a rejection.
pub fn detect_layout<R: std::io::Read + std::io::Seek>(workbook: &mut Xlsx<R>) -> Result<Layout> {
    let sheet_names = workbook.sheet_names().to_owned();

    if sheet_names.is_empty() {
        return Err(LedgerError::UnrecognizedLayout(
            "workbook has no sheets".to_string(),
        ));
    }

    let is_modern = sheet_names.iter().any(|name| {
        let lowered = name.trim().to_ascii_lowercase();
        MODERN_SHEETS.contains(&lowered.as_str())
    });
    if is_modern {
        return Ok(Layout::ModernBackup);
    }

    for name in &sheet_names {
        if parse_year(name).is_none() {
            return Err(LedgerError::UnrecognizedLayout(format!(
                "sheet '{name}' is neither a canonical backup sheet nor a 4-digit year"
            )));
        }
    }

    for name in &sheet_names {
        if !has_legacy_row_labels(workbook, name)? {
            return Err(LedgerError::UnrecognizedLayout(format!(
                "year sheet '{name}' is missing the fixed income/expense row labels"
            )));
        }
    }

    Ok(Layout::LegacyYearly)
}

/// Accepts only plausible 4-digit years.
pub(crate) fn parse_year(name: &str) -> Option<i32> {
    let year: i32 = name.trim().parse().ok()?;
    (1901..=2099).contains(&year).then_some(year)
}

fn has_legacy_row_labels<R: std::io::Read + std::io::Seek>(
    workbook: &mut Xlsx<R>,
    sheet: &str,
) -> Result<bool> {
    let Some(range) = excel_read::sheet_range(workbook, sheet)? else {
        return Ok(false);
    };

    let mut income = false;
    let mut other_income = false;
    let mut expenses = false;
    for row in range.rows() {
        let Some(label) = RowLabel::classify(&crate::parse::cell_text(row.first())) else {
            continue;
        };
        match label {
            RowLabel::Income => income = true,
            RowLabel::OtherIncome => other_income = true,
            RowLabel::Expenses => expenses = true,
        }
    }
    Ok(income && other_income && expenses)
}
