use std::io::Cursor;

use calamine::{DataType, Range, Reader, Xlsx};

use crate::error::{LedgerError, Result};

/// Opens uploaded bytes as an XLSX workbook. Bytes that cannot be opened at
/// all are a call-level [`LedgerError::CorruptFile`].
pub fn open_workbook_bytes(bytes: &[u8]) -> Result<Xlsx<Cursor<Vec<u8>>>> {
    Xlsx::new(Cursor::new(bytes.to_vec()))
        .map_err(|error| LedgerError::CorruptFile(error.to_string()))
}

/// Looks up a sheet by name, case-insensitively, returning `None` when the
/// workbook has no such sheet. Importers must not depend on sheet order,
/// only on names.
pub fn sheet_range<R: std::io::Read + std::io::Seek>(
    workbook: &mut Xlsx<R>,
    name: &str,
) -> Result<Option<Range<DataType>>> {
    let actual = workbook
        .sheet_names()
        .iter()
        .find(|candidate| candidate.trim().eq_ignore_ascii_case(name))
        .cloned();

    let Some(actual) = actual else {
        return Ok(None);
    };

    let range = workbook
        .worksheet_range(&actual)
        .ok_or_else(|| LedgerError::CorruptFile(format!("missing sheet '{actual}'")))?
        .map_err(LedgerError::from)?;
    Ok(Some(range))
}
