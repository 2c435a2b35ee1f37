use std::collections::HashMap;

use calamine::{DataType, Range, Xlsx};

use crate::error::{LedgerError, Result};
use crate::export::{
    ACCOUNTS_SHEET, ACCOUNT_COLUMNS, CATEGORIES_SHEET, CATEGORY_COLUMNS, CONFIG_SHEET,
    PAYMENT_METHODS_SHEET, PAYMENT_METHOD_COLUMNS, SUMMARIES_SHEET, SUMMARY_COLUMNS,
    TRANSACTIONS_SHEET, TRANSACTION_COLUMNS,
};
use crate::io::excel_read;
use crate::model::{
    EntryKind, ParsedAccount, ParsedBatch, ParsedCategory, ParsedConfig, ParsedPaymentMethod,
    ParsedSummary, ParsedTransaction,
};
use crate::parse::{
    cell_bool, cell_date, cell_datetime, cell_i32, cell_is_empty, cell_number, cell_opt_text,
    cell_text, cell_u32, row_is_blank,
};

/// Row-level parse failure: the offending column and the text that was
/// found there. Mapped to [`LedgerError::MalformedCell`] by the caller.
type RowError = (String, String);

/// Converts a modern backup workbook into canonical records.
///
/// Sheets are looked up by name and columns by header, never by position.
/// Absent sheets are empty; a present sheet missing a required column fails
/// that sheet's rows with a collected error while the other sheets keep
/// parsing. Provenance columns pass through unchanged so a re-imported
/// export never collapses legacy rows into native ones.
pub fn parse_modern<R: std::io::Read + std::io::Seek>(
    workbook: &mut Xlsx<R>,
) -> Result<ParsedBatch> {
    let mut batch = ParsedBatch::default();

    parse_sheet(
        workbook,
        CATEGORIES_SHEET,
        &CATEGORY_COLUMNS,
        &mut batch,
        |row, headers| {
            Ok(ParsedCategory {
                name: required_text(row, headers, "name")?,
                kind: required_kind(row, headers)?,
            })
        },
        |batch, record| batch.categories.push(record),
    )?;

    parse_sheet(
        workbook,
        PAYMENT_METHODS_SHEET,
        &PAYMENT_METHOD_COLUMNS,
        &mut batch,
        |row, headers| {
            Ok(ParsedPaymentMethod {
                name: required_text(row, headers, "name")?,
            })
        },
        |batch, record| batch.payment_methods.push(record),
    )?;

    parse_sheet(
        workbook,
        ACCOUNTS_SHEET,
        &ACCOUNT_COLUMNS[..3],
        &mut batch,
        |row, headers| {
            let paid = optional_bool(row, headers, "paid")?.unwrap_or(false);
            Ok(ParsedAccount {
                description: required_text(row, headers, "description")?,
                amount: required_number(row, headers, "amount")?,
                due_date: required_date(row, headers, "due_date")?,
                paid,
                paid_date: optional_date(row, headers, "paid_date")?,
            })
        },
        |batch, record| batch.accounts.push(record),
    )?;

    parse_sheet(
        workbook,
        TRANSACTIONS_SHEET,
        &TRANSACTION_COLUMNS[..3],
        &mut batch,
        |row, headers| {
            Ok(ParsedTransaction {
                date: required_date(row, headers, "date")?,
                kind: required_kind(row, headers)?,
                amount: required_number(row, headers, "amount")?,
                category: cell_opt_text(cell(row, headers, "category")),
                payment_method: cell_opt_text(cell(row, headers, "payment_method")),
                description: cell_opt_text(cell(row, headers, "description")).unwrap_or_default(),
                is_legacy: optional_bool(row, headers, "is_legacy")?.unwrap_or(false),
                origin_sheet: cell_opt_text(cell(row, headers, "origin_sheet")),
                origin_row: optional_u32(row, headers, "origin_row")?,
                origin_month: optional_u32(row, headers, "origin_month")?,
            })
        },
        |batch, record| batch.transactions.push(record),
    )?;

    parse_sheet(
        workbook,
        SUMMARIES_SHEET,
        &SUMMARY_COLUMNS[..2],
        &mut batch,
        |row, headers| {
            let month = required_u32(row, headers, "month")?;
            if !(1..=12).contains(&month) {
                return Err(("month".to_string(), month.to_string()));
            }
            Ok(ParsedSummary {
                year: required_i32(row, headers, "year")?,
                month,
                total_income: optional_number(row, headers, "total_income")?.unwrap_or(0.0),
                total_expense: optional_number(row, headers, "total_expense")?.unwrap_or(0.0),
            })
        },
        |batch, record| batch.summaries.push(record),
    )?;

    parse_config(workbook, &mut batch)?;

    Ok(batch)
}

/// Shared sheet walk: header map, required-column check, then one record
/// per non-blank row with failures collected instead of raised.
fn parse_sheet<R, T>(
    workbook: &mut Xlsx<R>,
    sheet: &str,
    required: &[&str],
    batch: &mut ParsedBatch,
    parse_row: impl Fn(&[DataType], &HashMap<String, usize>) -> std::result::Result<T, RowError>,
    push: impl Fn(&mut ParsedBatch, T),
) -> Result<()>
where
    R: std::io::Read + std::io::Seek,
{
    let Some(range) = excel_read::sheet_range(workbook, sheet)? else {
        return Ok(());
    };

    let headers = header_map(&range);
    if let Some(column) = required
        .iter()
        .find(|column| !headers.contains_key(**column))
    {
        batch.errors.push(LedgerError::MalformedSheet {
            sheet: sheet.to_string(),
            column: (*column).to_string(),
        });
        return Ok(());
    }

    for (row_idx, row) in range.rows().enumerate().skip(1) {
        if row_is_blank(row) {
            continue;
        }
        match parse_row(row, &headers) {
            Ok(record) => push(batch, record),
            Err((column, value)) => batch.errors.push(LedgerError::MalformedCell {
                sheet: sheet.to_string(),
                row: row_idx as u32 + 1,
                column,
                value,
            }),
        }
    }

    Ok(())
}

fn parse_config<R: std::io::Read + std::io::Seek>(
    workbook: &mut Xlsx<R>,
    batch: &mut ParsedBatch,
) -> Result<()> {
    let Some(range) = excel_read::sheet_range(workbook, CONFIG_SHEET)? else {
        return Ok(());
    };

    let headers = header_map(&range);
    let Some(row) = range.rows().skip(1).find(|row| !row_is_blank(row)) else {
        return Ok(());
    };

    batch.config = Some(ParsedConfig {
        default_currency: cell_opt_text(cell(row, &headers, "default_currency"))
            .unwrap_or_else(|| "BRL".to_string()),
        last_export_at: cell_datetime(cell(row, &headers, "last_export_at")),
    });
    Ok(())
}

fn header_map(range: &Range<DataType>) -> HashMap<String, usize> {
    let mut headers = HashMap::new();
    if let Some(first_row) = range.rows().next() {
        for (col_idx, header) in first_row.iter().enumerate() {
            let name = cell_text(Some(header)).trim().to_ascii_lowercase();
            if !name.is_empty() {
                headers.entry(name).or_insert(col_idx);
            }
        }
    }
    headers
}

fn cell<'a>(
    row: &'a [DataType],
    headers: &HashMap<String, usize>,
    column: &str,
) -> Option<&'a DataType> {
    headers.get(column).and_then(|col_idx| row.get(*col_idx))
}

fn row_error(row: &[DataType], headers: &HashMap<String, usize>, column: &str) -> RowError {
    (column.to_string(), cell_text(cell(row, headers, column)))
}

fn required_text(
    row: &[DataType],
    headers: &HashMap<String, usize>,
    column: &str,
) -> std::result::Result<String, RowError> {
    cell_opt_text(cell(row, headers, column)).ok_or_else(|| row_error(row, headers, column))
}

fn required_kind(
    row: &[DataType],
    headers: &HashMap<String, usize>,
) -> std::result::Result<EntryKind, RowError> {
    EntryKind::parse(&cell_text(cell(row, headers, "kind")))
        .ok_or_else(|| row_error(row, headers, "kind"))
}

fn required_number(
    row: &[DataType],
    headers: &HashMap<String, usize>,
    column: &str,
) -> std::result::Result<f64, RowError> {
    cell_number(cell(row, headers, column)).ok_or_else(|| row_error(row, headers, column))
}

fn required_date(
    row: &[DataType],
    headers: &HashMap<String, usize>,
    column: &str,
) -> std::result::Result<chrono::NaiveDate, RowError> {
    cell_date(cell(row, headers, column)).ok_or_else(|| row_error(row, headers, column))
}

fn required_u32(
    row: &[DataType],
    headers: &HashMap<String, usize>,
    column: &str,
) -> std::result::Result<u32, RowError> {
    cell_u32(cell(row, headers, column)).ok_or_else(|| row_error(row, headers, column))
}

fn required_i32(
    row: &[DataType],
    headers: &HashMap<String, usize>,
    column: &str,
) -> std::result::Result<i32, RowError> {
    cell_i32(cell(row, headers, column)).ok_or_else(|| row_error(row, headers, column))
}

fn optional_number(
    row: &[DataType],
    headers: &HashMap<String, usize>,
    column: &str,
) -> std::result::Result<Option<f64>, RowError> {
    let target = cell(row, headers, column);
    if cell_is_empty(target) {
        return Ok(None);
    }
    cell_number(target)
        .map(Some)
        .ok_or_else(|| row_error(row, headers, column))
}

fn optional_u32(
    row: &[DataType],
    headers: &HashMap<String, usize>,
    column: &str,
) -> std::result::Result<Option<u32>, RowError> {
    let target = cell(row, headers, column);
    if cell_is_empty(target) {
        return Ok(None);
    }
    cell_u32(target)
        .map(Some)
        .ok_or_else(|| row_error(row, headers, column))
}

fn optional_bool(
    row: &[DataType],
    headers: &HashMap<String, usize>,
    column: &str,
) -> std::result::Result<Option<bool>, RowError> {
    let target = cell(row, headers, column);
    if cell_is_empty(target) {
        return Ok(None);
    }
    cell_bool(target)
        .map(Some)
        .ok_or_else(|| row_error(row, headers, column))
}

fn optional_date(
    row: &[DataType],
    headers: &HashMap<String, usize>,
    column: &str,
) -> std::result::Result<Option<chrono::NaiveDate>, RowError> {
    let target = cell(row, headers, column);
    if cell_is_empty(target) {
        return Ok(None);
    }
    cell_date(target)
        .map(Some)
        .ok_or_else(|| row_error(row, headers, column))
}
