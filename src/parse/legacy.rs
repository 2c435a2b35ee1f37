use std::collections::BTreeMap;

use calamine::{Reader, Xlsx};
use chrono::NaiveDate;

use crate::detect::parse_year;
use crate::error::{LedgerError, Result};
use crate::io::excel_read;
use crate::model::{EntryKind, ParsedBatch, ParsedSummary, ParsedTransaction};
use crate::parse::{cell_is_empty, cell_number, cell_text};

/// The three fixed rows of a legacy year sheet, in either of the spellings
/// found in the wild.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RowLabel {
    Income,
    OtherIncome,
    Expenses,
}

impl RowLabel {
    pub(crate) fn classify(raw: &str) -> Option<Self> {
        match raw.trim().to_uppercase().as_str() {
            "RECEITA" | "INCOME" => Some(RowLabel::Income),
            "OUTRAS RECEITAS" | "OTHER INCOME" => Some(RowLabel::OtherIncome),
            "GASTOS" | "EXPENSES" => Some(RowLabel::Expenses),
            _ => None,
        }
    }

    pub(crate) fn kind(self) -> EntryKind {
        match self {
            RowLabel::Income | RowLabel::OtherIncome => EntryKind::Income,
            RowLabel::Expenses => EntryKind::Expense,
        }
    }
}

/// Converts a legacy yearly workbook into canonical records.
///
/// Each non-empty monthly cell of a labelled row becomes one synthetic
/// transaction dated the first day of its month, with the row label as its
/// category and full cell provenance. Zero and negative amounts are
/// preserved. A non-numeric cell fails only itself: the error is collected
/// and the rest of the sheet keeps parsing. Monthly income/expense totals
/// accrue into one summary row per touched month.
pub fn parse_legacy<R: std::io::Read + std::io::Seek>(
    workbook: &mut Xlsx<R>,
) -> Result<ParsedBatch> {
    let mut batch = ParsedBatch::default();
    let mut totals: BTreeMap<(i32, u32), (f64, f64)> = BTreeMap::new();

    let sheet_names = workbook.sheet_names().to_owned();
    for sheet in &sheet_names {
        let Some(year) = parse_year(sheet) else {
            continue;
        };
        let Some(range) = excel_read::sheet_range(workbook, sheet)? else {
            continue;
        };

        for (row_idx, row) in range.rows().enumerate() {
            let label_text = cell_text(row.first());
            let Some(label) = RowLabel::classify(&label_text) else {
                continue;
            };
            let category = label_text.trim().to_string();

            // Columns B..M are the 12 months; anything beyond is ignored.
            for month in 1..=12u32 {
                let cell = row.get(month as usize);
                if cell_is_empty(cell) {
                    continue;
                }
                let Some(amount) = cell_number(cell) else {
                    batch.errors.push(LedgerError::MalformedCell {
                        sheet: sheet.clone(),
                        row: row_idx as u32 + 1,
                        column: format!("month {month}"),
                        value: cell_text(cell),
                    });
                    continue;
                };

                let date = NaiveDate::from_ymd_opt(year, month, 1)
                    .expect("month index is always in 1..=12");
                batch.transactions.push(ParsedTransaction {
                    date,
                    amount,
                    kind: label.kind(),
                    category: Some(category.clone()),
                    payment_method: None,
                    description: category.clone(),
                    is_legacy: true,
                    origin_sheet: Some(sheet.clone()),
                    origin_row: Some(row_idx as u32 + 1),
                    origin_month: Some(month),
                });

                let entry = totals.entry((year, month)).or_insert((0.0, 0.0));
                match label.kind() {
                    EntryKind::Income => entry.0 += amount,
                    EntryKind::Expense => entry.1 += amount,
                }
            }
        }
    }

    batch.summaries = totals
        .into_iter()
        .map(|((year, month), (total_income, total_expense))| ParsedSummary {
            year,
            month,
            total_income,
            total_expense,
        })
        .collect();

    Ok(batch)
}
