//! Core library for the cashbook personal-finance ledger.
//!
//! The dominant logic is the import/export reconciliation engine: a
//! [`detect`] step classifies an uploaded workbook as a modern backup or a
//! legacy yearly spreadsheet, the [`parse`] modules turn either layout into
//! canonical records, [`reconcile`] merges those records into an owner's
//! existing dataset, and [`export`] projects the full dataset back into a
//! workbook the importer can consume losslessly. The [`session`] module
//! wraps each attempt with the audit log; IO adapters live under [`io`],
//! data representations inside [`model`], and the JSON-backed dataset in
//! [`store`].

pub mod detect;
pub mod error;
pub mod export;
pub mod io;
pub mod model;
pub mod parse;
pub mod reconcile;
pub mod session;
pub mod store;

pub use error::{LedgerError, Result};
