use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

use crate::model::{Account, MonthlySummary, Transaction};
use crate::store::Dataset;

/// Sheet names of the modern backup layout. The detector and the modern
/// parser match these case-insensitively; the exporter writes them exactly.
pub const TRANSACTIONS_SHEET: &str = "transactions";
pub const CATEGORIES_SHEET: &str = "categories";
pub const PAYMENT_METHODS_SHEET: &str = "payment_methods";
pub const ACCOUNTS_SHEET: &str = "accounts";
pub const SUMMARIES_SHEET: &str = "summaries";
pub const CONFIG_SHEET: &str = "config";

/// The canonical sheet set; one matching name classifies a workbook as a
/// modern backup.
pub const MODERN_SHEETS: [&str; 6] = [
    TRANSACTIONS_SHEET,
    CATEGORIES_SHEET,
    PAYMENT_METHODS_SHEET,
    ACCOUNTS_SHEET,
    SUMMARIES_SHEET,
    CONFIG_SHEET,
];

/// Column headers per sheet. Required columns come first; the modern parser
/// treats `..N` prefixes of these arrays as its required sets.
pub const TRANSACTION_COLUMNS: [&str; 10] = [
    "date",
    "kind",
    "amount",
    "category",
    "payment_method",
    "description",
    "is_legacy",
    "origin_sheet",
    "origin_row",
    "origin_month",
];
pub const CATEGORY_COLUMNS: [&str; 2] = ["name", "kind"];
pub const PAYMENT_METHOD_COLUMNS: [&str; 1] = ["name"];
pub const ACCOUNT_COLUMNS: [&str; 5] = ["description", "amount", "due_date", "paid", "paid_date"];
pub const SUMMARY_COLUMNS: [&str; 4] = ["year", "month", "total_income", "total_expense"];
pub const CONFIG_COLUMNS: [&str; 2] = ["default_currency", "last_export_at"];

/// A typed workbook cell. Amounts stay numbers and flags stay booleans so
/// the round-trip never goes through formatted strings.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Empty,
    Text(String),
    Number(f64),
    Bool(bool),
}

impl Cell {
    fn date(value: NaiveDate) -> Cell {
        Cell::Text(value.format("%Y-%m-%d").to_string())
    }

    fn opt_date(value: Option<NaiveDate>) -> Cell {
        value.map(Cell::date).unwrap_or(Cell::Empty)
    }

    fn opt_text(value: &Option<String>) -> Cell {
        match value {
            Some(text) => Cell::Text(text.clone()),
            None => Cell::Empty,
        }
    }

    fn opt_number(value: Option<f64>) -> Cell {
        value.map(Cell::Number).unwrap_or(Cell::Empty)
    }
}

/// A table that will be materialised as one sheet.
#[derive(Debug, Clone, PartialEq)]
pub struct SheetTable {
    pub sheet_name: String,
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
}

/// All tables required to materialise one backup workbook.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkbookData {
    pub tables: Vec<SheetTable>,
}

/// Projects one owner's full dataset into the modern backup layout.
///
/// Pure and deterministic: no reconciliation, fixed sheet order, stable row
/// ordering, so two exports of the same dataset compare equal row for row.
/// The config sheet carries the `last_export_at` being assigned by this
/// export so the workbook and the stored config agree.
pub fn build_backup(dataset: &Dataset, owner: &str, exported_at: DateTime<Utc>) -> WorkbookData {
    WorkbookData {
        tables: vec![
            transactions_table(dataset, owner),
            categories_table(dataset, owner),
            payment_methods_table(dataset, owner),
            accounts_table(dataset, owner),
            summaries_table(dataset, owner),
            config_table(dataset, owner, exported_at),
        ],
    }
}

/// Filename convention for exported backups.
pub fn backup_filename(owner: &str, exported_at: DateTime<Utc>) -> String {
    format!(
        "{owner}-backup-{}.xlsx",
        exported_at.format("%Y%m%dT%H%M%SZ")
    )
}

fn columns(names: &[&str]) -> Vec<String> {
    names.iter().map(|name| (*name).to_string()).collect()
}

fn transactions_table(dataset: &Dataset, owner: &str) -> SheetTable {
    let category_names: HashMap<Uuid, &str> = dataset
        .categories
        .iter()
        .map(|category| (category.id, category.name.as_str()))
        .collect();
    let method_names: HashMap<Uuid, &str> = dataset
        .payment_methods
        .iter()
        .map(|method| (method.id, method.name.as_str()))
        .collect();

    let mut transactions: Vec<&Transaction> = dataset.transactions_for(owner).collect();
    transactions.sort_by(|lhs, rhs| lhs.date.cmp(&rhs.date).then_with(|| lhs.id.cmp(&rhs.id)));

    let rows = transactions
        .into_iter()
        .map(|transaction| {
            let category = transaction
                .category_id
                .and_then(|id| category_names.get(&id))
                .map(|name| (*name).to_string());
            let method = transaction
                .payment_method_id
                .and_then(|id| method_names.get(&id))
                .map(|name| (*name).to_string());
            vec![
                Cell::date(transaction.date),
                Cell::Text(transaction.kind.as_str().to_string()),
                Cell::Number(transaction.amount),
                Cell::opt_text(&category),
                Cell::opt_text(&method),
                Cell::Text(transaction.description.clone()),
                Cell::Bool(transaction.is_legacy),
                Cell::opt_text(&transaction.origin_sheet),
                Cell::opt_number(transaction.origin_row.map(f64::from)),
                Cell::opt_number(transaction.origin_month.map(f64::from)),
            ]
        })
        .collect();

    SheetTable {
        sheet_name: TRANSACTIONS_SHEET.to_string(),
        columns: columns(&TRANSACTION_COLUMNS),
        rows,
    }
}

fn categories_table(dataset: &Dataset, owner: &str) -> SheetTable {
    let mut categories: Vec<_> = dataset
        .categories
        .iter()
        .filter(|category| category.owner == owner)
        .collect();
    categories.sort_by(|lhs, rhs| {
        lhs.name
            .to_lowercase()
            .cmp(&rhs.name.to_lowercase())
            .then_with(|| lhs.kind.as_str().cmp(rhs.kind.as_str()))
    });

    let rows = categories
        .into_iter()
        .map(|category| {
            vec![
                Cell::Text(category.name.clone()),
                Cell::Text(category.kind.as_str().to_string()),
            ]
        })
        .collect();

    SheetTable {
        sheet_name: CATEGORIES_SHEET.to_string(),
        columns: columns(&CATEGORY_COLUMNS),
        rows,
    }
}

fn payment_methods_table(dataset: &Dataset, owner: &str) -> SheetTable {
    let mut methods: Vec<_> = dataset
        .payment_methods
        .iter()
        .filter(|method| method.owner == owner)
        .collect();
    methods.sort_by(|lhs, rhs| lhs.name.to_lowercase().cmp(&rhs.name.to_lowercase()));

    let rows = methods
        .into_iter()
        .map(|method| vec![Cell::Text(method.name.clone())])
        .collect();

    SheetTable {
        sheet_name: PAYMENT_METHODS_SHEET.to_string(),
        columns: columns(&PAYMENT_METHOD_COLUMNS),
        rows,
    }
}

fn accounts_table(dataset: &Dataset, owner: &str) -> SheetTable {
    let mut accounts: Vec<&Account> = dataset
        .accounts
        .iter()
        .filter(|account| account.owner == owner)
        .collect();
    accounts.sort_by(|lhs, rhs| {
        lhs.due_date
            .cmp(&rhs.due_date)
            .then_with(|| lhs.id.cmp(&rhs.id))
    });

    let rows = accounts
        .into_iter()
        .map(|account| {
            vec![
                Cell::Text(account.description.clone()),
                Cell::Number(account.amount),
                Cell::date(account.due_date),
                Cell::Bool(account.paid),
                Cell::opt_date(account.paid_date),
            ]
        })
        .collect();

    SheetTable {
        sheet_name: ACCOUNTS_SHEET.to_string(),
        columns: columns(&ACCOUNT_COLUMNS),
        rows,
    }
}

fn summaries_table(dataset: &Dataset, owner: &str) -> SheetTable {
    let mut summaries: Vec<&MonthlySummary> = dataset
        .summaries
        .iter()
        .filter(|summary| summary.owner == owner)
        .collect();
    summaries.sort_by(|lhs, rhs| {
        lhs.year
            .cmp(&rhs.year)
            .then_with(|| lhs.month.cmp(&rhs.month))
    });

    let rows = summaries
        .into_iter()
        .map(|summary| {
            vec![
                Cell::Number(f64::from(summary.year)),
                Cell::Number(f64::from(summary.month)),
                Cell::Number(summary.total_income),
                Cell::Number(summary.total_expense),
            ]
        })
        .collect();

    SheetTable {
        sheet_name: SUMMARIES_SHEET.to_string(),
        columns: columns(&SUMMARY_COLUMNS),
        rows,
    }
}

fn config_table(dataset: &Dataset, owner: &str, exported_at: DateTime<Utc>) -> SheetTable {
    let currency = dataset
        .config(owner)
        .map(|config| config.default_currency.clone())
        .unwrap_or_else(|| "BRL".to_string());

    SheetTable {
        sheet_name: CONFIG_SHEET.to_string(),
        columns: columns(&CONFIG_COLUMNS),
        rows: vec![vec![
            Cell::Text(currency),
            Cell::Text(exported_at.format("%Y-%m-%d %H:%M:%S").to_string()),
        ]],
    }
}
