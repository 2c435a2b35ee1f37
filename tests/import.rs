use cashbook::export::{Cell, SheetTable, WorkbookData};
use cashbook::io::excel_write;
use cashbook::model::{
    Category, EntryKind, ImportStatus, ParsedBatch, ParsedCategory, cents,
};
use cashbook::reconcile::reconcile;
use cashbook::session;
use cashbook::store::Dataset;
use cashbook::LedgerError;
use chrono::{DateTime, TimeZone, Utc};
use uuid::Uuid;

fn timestamp() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 2, 1, 9, 30, 0).unwrap()
}

fn sheet(name: &str, columns: &[&str], rows: Vec<Vec<Cell>>) -> SheetTable {
    SheetTable {
        sheet_name: name.to_string(),
        columns: columns.iter().map(|column| column.to_string()).collect(),
        rows,
    }
}

fn workbook(tables: Vec<SheetTable>) -> Vec<u8> {
    excel_write::workbook_bytes(&WorkbookData { tables }).expect("workbook written")
}

fn text(value: &str) -> Cell {
    Cell::Text(value.to_string())
}

/// One legacy data row: the label in column A, then the 12 month cells.
fn legacy_row(label: &str, months: [Cell; 12]) -> Vec<Cell> {
    let mut row = vec![text(label)];
    row.extend(months);
    row
}

const MONTH_HEADERS: [&str; 13] = [
    "linha", "JANEIRO", "FEVEREIRO", "MARÇO", "ABRIL", "MAIO", "JUNHO", "JULHO", "AGOSTO",
    "SETEMBRO", "OUTUBRO", "NOVEMBRO", "DEZEMBRO",
];

fn empty_months() -> [Cell; 12] {
    std::array::from_fn(|_| Cell::Empty)
}

#[test]
fn legacy_sheet_produces_synthetic_transactions_and_summaries() {
    let mut months = empty_months();
    months[2] = Cell::Number(150.0);
    let bytes = workbook(vec![sheet(
        "2024",
        &MONTH_HEADERS,
        vec![
            legacy_row("Receita", empty_months()),
            legacy_row("Outras Receitas", empty_months()),
            legacy_row("Gastos", months),
        ],
    )]);

    let mut dataset = Dataset::default();
    let entry = session::import_workbook(
        &mut dataset,
        "alice",
        "planilha-2024.xlsx",
        &bytes,
        false,
        timestamp(),
    )
    .expect("legacy import");

    assert_eq!(entry.status, ImportStatus::Success);
    assert_eq!(entry.created_count, 1);

    let transactions: Vec<_> = dataset.transactions_for("alice").collect();
    assert_eq!(transactions.len(), 1);
    let transaction = transactions[0];
    assert_eq!(transaction.date.to_string(), "2024-03-01");
    assert_eq!(transaction.kind, EntryKind::Expense);
    assert_eq!(cents(transaction.amount), cents(150.0));
    assert!(transaction.is_legacy);
    assert_eq!(transaction.origin_sheet.as_deref(), Some("2024"));
    assert_eq!(transaction.origin_row, Some(4));
    assert_eq!(transaction.origin_month, Some(3));

    let category = dataset
        .category_by_id(transaction.category_id.expect("category resolved"))
        .expect("category exists");
    assert_eq!(category.name, "Gastos");
    assert_eq!(category.kind, EntryKind::Expense);

    let summary = dataset
        .summaries
        .iter()
        .find(|summary| summary.year == 2024 && summary.month == 3)
        .expect("summary upserted");
    assert_eq!(cents(summary.total_expense), cents(150.0));
    assert_eq!(cents(summary.total_income), 0);
}

#[test]
fn one_bad_legacy_cell_fails_alone() {
    let mut months: [Cell; 12] = std::array::from_fn(|index| Cell::Number(100.0 + index as f64));
    months[4] = text("n/a");
    let bytes = workbook(vec![sheet(
        "2024",
        &MONTH_HEADERS,
        vec![
            legacy_row("Receita", empty_months()),
            legacy_row("Outras Receitas", empty_months()),
            legacy_row("Gastos", months),
        ],
    )]);

    let mut dataset = Dataset::default();
    let entry = session::import_workbook(
        &mut dataset,
        "alice",
        "planilha-2024.xlsx",
        &bytes,
        false,
        timestamp(),
    )
    .expect("legacy import");

    assert_eq!(entry.status, ImportStatus::Partial);
    assert_eq!(entry.created_count, 11);
    assert_eq!(entry.failed_count, 1);
    assert_eq!(entry.error_detail.len(), 1);
    assert!(entry.error_detail[0].contains("month 5"));
    assert_eq!(dataset.transactions_for("alice").count(), 11);
}

#[test]
fn legacy_zero_and_negative_amounts_are_preserved() {
    let mut months = empty_months();
    months[0] = Cell::Number(1000.0);
    months[1] = Cell::Number(0.0);
    months[2] = Cell::Number(-50.0);
    let bytes = workbook(vec![sheet(
        "2025",
        &MONTH_HEADERS,
        vec![
            legacy_row("Receita", months),
            legacy_row("Outras Receitas", empty_months()),
            legacy_row("Gastos", empty_months()),
        ],
    )]);

    let mut dataset = Dataset::default();
    let entry = session::import_workbook(
        &mut dataset,
        "alice",
        "planilha.xlsx",
        &bytes,
        false,
        timestamp(),
    )
    .expect("legacy import");

    assert_eq!(entry.created_count, 3);
    let mut amounts: Vec<i64> = dataset
        .transactions_for("alice")
        .map(|transaction| cents(transaction.amount))
        .collect();
    amounts.sort();
    assert_eq!(amounts, vec![cents(-50.0), cents(0.0), cents(1000.0)]);
}

#[test]
fn name_resolution_reuses_and_creates_case_insensitively() {
    let mut dataset = Dataset::default();
    dataset.categories.push(Category {
        id: Uuid::new_v4(),
        owner: "alice".to_string(),
        name: "Alimentação".to_string(),
        kind: EntryKind::Expense,
    });

    let bytes = workbook(vec![sheet(
        "transactions",
        &["date", "kind", "amount", "category", "payment_method", "description"],
        vec![
            vec![
                text("2026-01-10"),
                text("expense"),
                Cell::Number(42.0),
                text("alimentação"),
                Cell::Empty,
                text("Feira"),
            ],
            vec![
                text("2026-01-12"),
                text("expense"),
                Cell::Number(80.0),
                text("Lazer"),
                Cell::Empty,
                text("Cinema"),
            ],
        ],
    )]);

    let entry = session::import_workbook(
        &mut dataset,
        "alice",
        "backup.xlsx",
        &bytes,
        false,
        timestamp(),
    )
    .expect("modern import");

    assert_eq!(entry.status, ImportStatus::Success);
    assert_eq!(entry.created_count, 2);

    let alice_categories: Vec<_> = dataset
        .categories
        .iter()
        .filter(|category| category.owner == "alice")
        .collect();
    assert_eq!(alice_categories.len(), 2);
    let lazer = dataset
        .find_category("alice", "lazer", EntryKind::Expense)
        .expect("created on demand");
    assert_eq!(lazer.name, "Lazer");
}

#[test]
fn unrecognized_workbook_is_rejected_without_side_effects() {
    let bytes = workbook(vec![
        sheet("foo", &["a"], vec![vec![text("1")]]),
        sheet("bar", &["b"], vec![vec![text("2")]]),
    ]);

    let mut dataset = Dataset::default();
    let result = session::import_workbook(
        &mut dataset,
        "alice",
        "mystery.xlsx",
        &bytes,
        false,
        timestamp(),
    );

    assert!(matches!(result, Err(LedgerError::UnrecognizedLayout(_))));
    assert!(dataset.categories.is_empty());
    assert!(dataset.transactions.is_empty());
    assert!(dataset.summaries.is_empty());

    let history = dataset.import_history("alice");
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].status, ImportStatus::Failed);
    assert_eq!(history[0].detected_layout, None);
    assert_eq!(history[0].created_count, 0);
}

#[test]
fn unreadable_bytes_are_a_corrupt_file() {
    let mut dataset = Dataset::default();
    let result = session::import_workbook(
        &mut dataset,
        "alice",
        "broken.xlsx",
        b"definitely not a workbook",
        false,
        timestamp(),
    );

    assert!(matches!(result, Err(LedgerError::CorruptFile(_))));
    let history = dataset.import_history("alice");
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].status, ImportStatus::Failed);
}

#[test]
fn missing_required_column_fails_only_that_sheet() {
    let bytes = workbook(vec![
        // No amount column: every transaction row is rejected as a unit.
        sheet(
            "transactions",
            &["date", "kind"],
            vec![vec![text("2026-01-10"), text("expense")]],
        ),
        sheet(
            "accounts",
            &["description", "amount", "due_date"],
            vec![vec![
                text("Conta de luz"),
                Cell::Number(89.9),
                text("2026-02-10"),
            ]],
        ),
    ]);

    let mut dataset = Dataset::default();
    let entry = session::import_workbook(
        &mut dataset,
        "alice",
        "backup.xlsx",
        &bytes,
        false,
        timestamp(),
    )
    .expect("modern import");

    assert_eq!(entry.status, ImportStatus::Partial);
    assert_eq!(entry.created_count, 1);
    assert_eq!(entry.failed_count, 1);
    assert!(entry.error_detail[0].contains("transactions"));
    assert!(entry.error_detail[0].contains("amount"));
    assert!(dataset.transactions.is_empty());
    assert_eq!(dataset.accounts.len(), 1);
}

#[test]
fn malformed_transaction_row_is_collected_not_raised() {
    let bytes = workbook(vec![sheet(
        "transactions",
        &["date", "kind", "amount", "description"],
        vec![
            vec![
                text("2026-01-10"),
                text("expense"),
                Cell::Number(10.0),
                text("Ok"),
            ],
            vec![
                text("not a date"),
                text("expense"),
                Cell::Number(10.0),
                text("Bad"),
            ],
        ],
    )]);

    let mut dataset = Dataset::default();
    let entry = session::import_workbook(
        &mut dataset,
        "alice",
        "backup.xlsx",
        &bytes,
        false,
        timestamp(),
    )
    .expect("modern import");

    assert_eq!(entry.status, ImportStatus::Partial);
    assert_eq!(entry.created_count, 1);
    assert_eq!(entry.failed_count, 1);
    assert!(entry.error_detail[0].contains("date"));
}

#[test]
fn import_history_lists_newest_first() {
    let bytes = workbook(vec![sheet("categories", &["name", "kind"], vec![])]);

    let mut dataset = Dataset::default();
    let earlier = Utc.with_ymd_and_hms(2026, 2, 1, 9, 0, 0).unwrap();
    let later = Utc.with_ymd_and_hms(2026, 2, 1, 10, 0, 0).unwrap();
    session::import_workbook(&mut dataset, "alice", "first.xlsx", &bytes, false, earlier)
        .expect("first import");
    session::import_workbook(&mut dataset, "alice", "second.xlsx", &bytes, false, later)
        .expect("second import");

    let history = dataset.import_history("alice");
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].source_filename, "second.xlsx");
    assert_eq!(history[1].source_filename, "first.xlsx");
}

#[test]
fn dataset_persists_across_save_and_load() {
    let dir = tempfile::tempdir().expect("temporary directory");
    let path = dir.path().join("ledger.json");
    assert_eq!(
        Dataset::load(&path).expect("missing store loads"),
        Dataset::default()
    );

    let mut months = empty_months();
    months[0] = Cell::Number(500.0);
    let bytes = workbook(vec![sheet(
        "2024",
        &MONTH_HEADERS,
        vec![
            legacy_row("Receita", months),
            legacy_row("Outras Receitas", empty_months()),
            legacy_row("Gastos", empty_months()),
        ],
    )]);
    let mut dataset = Dataset::default();
    session::import_workbook(
        &mut dataset,
        "alice",
        "planilha.xlsx",
        &bytes,
        false,
        timestamp(),
    )
    .expect("legacy import");

    dataset.save(&path).expect("store saved");
    let loaded = Dataset::load(&path).expect("store reloaded");
    assert_eq!(loaded, dataset);
}

#[test]
fn reconcile_counts_unresolvable_records_as_failures() {
    let mut dataset = Dataset::default();
    let mut batch = ParsedBatch::default();
    batch.categories.push(ParsedCategory {
        name: "  ".to_string(),
        kind: EntryKind::Expense,
    });

    let outcome = reconcile(&mut dataset, "alice", &batch, false);

    assert_eq!(outcome.failed, 1);
    assert_eq!(outcome.errors.len(), 1);
    assert!(dataset.categories.is_empty());
}
