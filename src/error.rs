use std::path::PathBuf;

use thiserror::Error;

/// Convenient alias for fallible results returned throughout the crate.
pub type Result<T> = std::result::Result<T, LedgerError>;

/// Error type covering the different failure cases that can occur when the
/// engine ingests workbooks, reconciles records, or emits backups.
///
/// Only [`LedgerError::CorruptFile`] and [`LedgerError::UnrecognizedLayout`]
/// cross the import call boundary; the row-level variants are collected into
/// the import log instead of being raised.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// Wrapper for IO failures such as reading or writing files.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Raised when JSON parsing or serialization of the store fails.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Errors bubbled up from the Excel writer implementation.
    #[error("Excel write error: {0}")]
    ExcelWrite(#[from] rust_xlsxwriter::XlsxError),

    /// Errors bubbled up from the Excel reader implementation.
    #[error("Excel read error: {0}")]
    ExcelRead(#[from] calamine::XlsxError),

    /// Raised when the uploaded bytes cannot be opened as a workbook at all.
    #[error("corrupt file: {0}")]
    CorruptFile(String),

    /// Raised when a readable workbook matches neither supported layout.
    #[error("unrecognized workbook layout: {0}")]
    UnrecognizedLayout(String),

    /// Raised when a present sheet is missing a required column. Fails that
    /// sheet's rows, never the whole workbook.
    #[error("sheet '{sheet}' is missing required column '{column}'")]
    MalformedSheet { sheet: String, column: String },

    /// Raised when a cell cannot be coerced to the type its column requires.
    #[error("malformed cell in sheet '{sheet}' row {row}, column '{column}': '{value}'")]
    MalformedCell {
        sheet: String,
        row: u32,
        column: String,
        value: String,
    },

    /// Raised when a parsed record cannot be resolved against the owner's
    /// dataset, e.g. a category row with an empty name.
    #[error("invalid record: {0}")]
    InvalidRecord(String),

    /// Raised when the user provides a path that does not exist.
    #[error("input file not found: {0}")]
    MissingInput(PathBuf),

    /// Raised when the tracing subscriber fails to initialise.
    #[error("failed to initialise logging: {0}")]
    Logging(String),
}
