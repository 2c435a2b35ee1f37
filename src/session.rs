use chrono::{DateTime, Utc};
use tracing::{debug, info, instrument};
use uuid::Uuid;

use crate::detect::detect_layout;
use crate::error::{LedgerError, Result};
use crate::export::{backup_filename, build_backup};
use crate::io::{excel_read, excel_write};
use crate::model::{ImportLogEntry, ImportStatus, Layout, ParsedBatch};
use crate::parse::{legacy, modern};
use crate::reconcile::reconcile;
use crate::store::Dataset;

/// The product of one export call: the backup bytes plus the conventional
/// `<owner>-backup-<timestamp>.xlsx` filename.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportedBackup {
    pub filename: String,
    pub bytes: Vec<u8>,
}

/// Imports one uploaded workbook for one owner, to completion.
///
/// The call is fail-soft: it always appends exactly one audit entry. Only
/// an unreadable file or an unrecognized layout crosses the boundary as an
/// error (logged with `Failed` status and zero rows processed); every other
/// problem is captured per row inside the returned log entry.
#[instrument(
    level = "info",
    skip_all,
    fields(owner = %owner, filename = %source_filename, overwrite)
)]
pub fn import_workbook(
    dataset: &mut Dataset,
    owner: &str,
    source_filename: &str,
    bytes: &[u8],
    overwrite: bool,
    now: DateTime<Utc>,
) -> Result<ImportLogEntry> {
    let mut workbook = match excel_read::open_workbook_bytes(bytes) {
        Ok(workbook) => workbook,
        Err(error) => {
            return Err(log_call_failure(
                dataset,
                owner,
                source_filename,
                now,
                None,
                error,
            ));
        }
    };

    let layout = match detect_layout(&mut workbook) {
        Ok(layout) => layout,
        Err(error) => {
            return Err(log_call_failure(
                dataset,
                owner,
                source_filename,
                now,
                None,
                error,
            ));
        }
    };
    info!(%layout, "workbook layout detected");

    let parsed = match layout {
        Layout::LegacyYearly => legacy::parse_legacy(&mut workbook),
        Layout::ModernBackup => modern::parse_modern(&mut workbook),
    };
    let batch = match parsed {
        Ok(batch) => batch,
        Err(error) => {
            return Err(log_call_failure(
                dataset,
                owner,
                source_filename,
                now,
                Some(layout),
                error,
            ));
        }
    };
    debug!(
        transaction_count = batch.transactions.len(),
        summary_count = batch.summaries.len(),
        parse_error_count = batch.errors.len(),
        "workbook parsed"
    );

    let outcome = reconcile(dataset, owner, &batch, overwrite);

    let entry = build_log_entry(owner, source_filename, now, layout, &batch, &outcome);
    info!(
        status = %entry.status,
        created = entry.created_count,
        updated = entry.updated_count,
        skipped = entry.skipped_count,
        failed = entry.failed_count,
        "import reconciled"
    );
    dataset.import_logs.push(entry.clone());
    Ok(entry)
}

/// Exports one owner's full dataset as a modern backup workbook, updating
/// `UserConfig.last_export_at` on success. No reconciliation happens here;
/// the projection is deterministic given the same dataset and timestamp.
#[instrument(level = "info", skip(dataset), fields(owner = %owner))]
pub fn export_backup(
    dataset: &mut Dataset,
    owner: &str,
    now: DateTime<Utc>,
) -> Result<ExportedBackup> {
    let workbook = build_backup(dataset, owner, now);
    let bytes = excel_write::workbook_bytes(&workbook)?;

    dataset.config_mut(owner).last_export_at = Some(now);
    info!(
        sheet_count = workbook.tables.len(),
        byte_count = bytes.len(),
        "backup exported"
    );

    Ok(ExportedBackup {
        filename: backup_filename(owner, now),
        bytes,
    })
}

fn build_log_entry(
    owner: &str,
    source_filename: &str,
    now: DateTime<Utc>,
    layout: Layout,
    batch: &ParsedBatch,
    outcome: &crate::reconcile::ReconcileOutcome,
) -> ImportLogEntry {
    let mut error_detail: Vec<String> = batch.errors.iter().map(ToString::to_string).collect();
    error_detail.extend(outcome.errors.iter().cloned());

    let failed_count = outcome.failed + batch.errors.len() as u32;
    let applied = outcome.created + outcome.updated + outcome.skipped;
    let status = if failed_count == 0 {
        ImportStatus::Success
    } else if applied == 0 {
        ImportStatus::Failed
    } else {
        ImportStatus::Partial
    };

    ImportLogEntry {
        id: Uuid::new_v4(),
        owner: owner.to_string(),
        timestamp: now,
        source_filename: source_filename.to_string(),
        detected_layout: Some(layout),
        status,
        created_count: outcome.created,
        updated_count: outcome.updated,
        skipped_count: outcome.skipped,
        failed_count,
        error_detail,
    }
}

/// Records a call-level failure in the audit log before surfacing it. No
/// financial rows have been touched at this point.
fn log_call_failure(
    dataset: &mut Dataset,
    owner: &str,
    source_filename: &str,
    now: DateTime<Utc>,
    layout: Option<Layout>,
    error: LedgerError,
) -> LedgerError {
    dataset.import_logs.push(ImportLogEntry {
        id: Uuid::new_v4(),
        owner: owner.to_string(),
        timestamp: now,
        source_filename: source_filename.to_string(),
        detected_layout: layout,
        status: ImportStatus::Failed,
        created_count: 0,
        updated_count: 0,
        skipped_count: 0,
        failed_count: 0,
        error_detail: vec![error.to_string()],
    });
    error
}
