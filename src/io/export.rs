//! Export a filtered view back to CSV.
//!
//! The export keeps the upload schema (same columns, same order, no index
//! column) so it can be re-imported or opened in a spreadsheet as-is.

use std::fs::File;
use std::io::Write;
use std::path::Path;

use crate::domain::{Record, REQUIRED_COLUMNS};
use crate::error::AppError;

/// Write records to a CSV file at `path`.
pub fn write_view_csv(path: &Path, records: &[Record]) -> Result<(), AppError> {
    let file = File::create(path)
        .map_err(|e| AppError::export(format!("Failed to create export CSV '{}': {e}", path.display())))?;
    write_records_csv(file, records)
}

/// Write records as CSV to any writer. The header is always written, even for
/// an empty view.
pub fn write_records_csv<W: Write>(writer: W, records: &[Record]) -> Result<(), AppError> {
    let mut wtr = csv::WriterBuilder::new().has_headers(false).from_writer(writer);

    wtr.write_record(REQUIRED_COLUMNS)
        .map_err(|e| AppError::export(format!("Failed to write export CSV header: {e}")))?;

    for record in records {
        wtr.serialize(record)
            .map_err(|e| AppError::export(format!("Failed to write export CSV row: {e}")))?;
    }

    wtr.flush()
        .map_err(|e| AppError::export(format!("Failed to flush export CSV: {e}")))?;
    Ok(())
}
