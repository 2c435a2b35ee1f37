use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::LedgerError;

/// Whether a record represents money coming in or going out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    Income,
    Expense,
}

impl EntryKind {
    /// Stable lowercase token used in workbook cells.
    pub fn as_str(&self) -> &'static str {
        match self {
            EntryKind::Income => "income",
            EntryKind::Expense => "expense",
        }
    }

    /// Parses the workbook token, case-insensitively.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "income" => Some(EntryKind::Income),
            "expense" => Some(EntryKind::Expense),
            _ => None,
        }
    }
}

/// The two workbook layouts the detector can classify.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Layout {
    /// The canonical multi-sheet backup produced by the exporter.
    ModernBackup,
    /// The older one-sheet-per-year format with fixed income/expense rows.
    LegacyYearly,
}

impl std::fmt::Display for Layout {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Layout::ModernBackup => write!(f, "modern backup"),
            Layout::LegacyYearly => write!(f, "legacy yearly"),
        }
    }
}

/// Rounds an amount to whole cents for identity comparisons, so float noise
/// cannot split or merge otherwise-equal records.
pub fn cents(amount: f64) -> i64 {
    (amount * 100.0).round() as i64
}

/// A user-scoped transaction category. Unique per `(owner, name, kind)`,
/// with names compared case-insensitively.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    pub id: Uuid,
    pub owner: String,
    pub name: String,
    pub kind: EntryKind,
}

/// A user-scoped payment method. Unique per `(owner, name)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentMethod {
    pub id: Uuid,
    pub owner: String,
    pub name: String,
}

/// A bill scheduled for a due date. Marked paid by the surrounding system;
/// the engine only creates and exports these.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    pub id: Uuid,
    pub owner: String,
    pub description: String,
    pub amount: f64,
    pub due_date: NaiveDate,
    pub paid: bool,
    pub paid_date: Option<NaiveDate>,
}

/// A ledger entry. Category and payment method are name-resolved at
/// reconciliation time; workbook rows never carry internal ids.
///
/// The `origin_*` fields exist only for rows reconstructed from a legacy
/// workbook and are the durable trace distinguishing reconstructed history
/// from natively entered records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: Uuid,
    pub owner: String,
    pub date: NaiveDate,
    pub amount: f64,
    pub kind: EntryKind,
    pub category_id: Option<Uuid>,
    pub payment_method_id: Option<Uuid>,
    pub description: String,
    pub is_legacy: bool,
    pub origin_sheet: Option<String>,
    pub origin_row: Option<u32>,
    pub origin_month: Option<u32>,
}

/// Cached income/expense totals for one `(owner, year, month)`. Derived from
/// transactions, never authoritative over them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlySummary {
    pub owner: String,
    pub year: i32,
    pub month: u32,
    pub total_income: f64,
    pub total_expense: f64,
}

/// Per-user settings. `last_export_at` is written by the exporter after each
/// successful export and never by the importer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserConfig {
    pub owner: String,
    pub default_currency: String,
    pub last_export_at: Option<DateTime<Utc>>,
}

impl UserConfig {
    pub fn new(owner: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            default_currency: "BRL".to_string(),
            last_export_at: None,
        }
    }
}

/// Outcome classification of one import attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImportStatus {
    Success,
    Partial,
    Failed,
}

impl std::fmt::Display for ImportStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ImportStatus::Success => write!(f, "success"),
            ImportStatus::Partial => write!(f, "partial"),
            ImportStatus::Failed => write!(f, "failed"),
        }
    }
}

/// Append-only audit record, one per import attempt regardless of outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportLogEntry {
    pub id: Uuid,
    pub owner: String,
    pub timestamp: DateTime<Utc>,
    pub source_filename: String,
    pub detected_layout: Option<Layout>,
    pub status: ImportStatus,
    pub created_count: u32,
    pub updated_count: u32,
    pub skipped_count: u32,
    pub failed_count: u32,
    pub error_detail: Vec<String>,
}

/// A category row as parsed from a workbook, before name resolution.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedCategory {
    pub name: String,
    pub kind: EntryKind,
}

/// A payment-method row as parsed from a workbook.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedPaymentMethod {
    pub name: String,
}

/// An account (bill) row as parsed from a workbook.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedAccount {
    pub description: String,
    pub amount: f64,
    pub due_date: NaiveDate,
    pub paid: bool,
    pub paid_date: Option<NaiveDate>,
}

/// A transaction as parsed from a workbook. References categories and
/// payment methods by name; provenance is carried through unchanged so a
/// re-imported export stays lossless.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedTransaction {
    pub date: NaiveDate,
    pub amount: f64,
    pub kind: EntryKind,
    pub category: Option<String>,
    pub payment_method: Option<String>,
    pub description: String,
    pub is_legacy: bool,
    pub origin_sheet: Option<String>,
    pub origin_row: Option<u32>,
    pub origin_month: Option<u32>,
}

/// A monthly-summary row as parsed from a workbook.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedSummary {
    pub year: i32,
    pub month: u32,
    pub total_income: f64,
    pub total_expense: f64,
}

/// The config sheet of a modern backup. Parsed for completeness but never
/// applied: the importer must not touch [`UserConfig`].
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedConfig {
    pub default_currency: String,
    pub last_export_at: Option<DateTime<Utc>>,
}

/// Everything one parser extracted from one workbook, plus the row-level
/// failures it collected along the way. A bad cell lands in `errors`; it
/// never aborts the batch.
#[derive(Debug, Default)]
pub struct ParsedBatch {
    pub categories: Vec<ParsedCategory>,
    pub payment_methods: Vec<ParsedPaymentMethod>,
    pub accounts: Vec<ParsedAccount>,
    pub transactions: Vec<ParsedTransaction>,
    pub summaries: Vec<ParsedSummary>,
    pub config: Option<ParsedConfig>,
    pub errors: Vec<LedgerError>,
}
