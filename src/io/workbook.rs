//! Spreadsheet cell extraction.
//!
//! Workbooks are flattened into the same `headers + rows of strings` shape the
//! delimited reader produces, so validation lives in one place (`ingest`).

use std::path::Path;

use calamine::{open_workbook_auto, Data, Reader};
use chrono::{Days, NaiveDate};
use log::debug;

use crate::error::AppError;

/// First worksheet of a workbook, as text cells.
#[derive(Debug, Clone, Default)]
pub struct SheetTable {
    pub headers: Vec<String>,
    /// `(1-based sheet row, cells)` for every row after the header.
    pub rows: Vec<(usize, Vec<String>)>,
}

/// Read the first worksheet; the first row is the header.
pub fn read_first_sheet(path: &Path) -> Result<SheetTable, AppError> {
    // calamine auto-detects xls, xlsx, xlsb and ods.
    let mut workbook = open_workbook_auto(path)
        .map_err(|e| AppError::io(format!("Failed to open workbook '{}': {e}", path.display())))?;

    let sheet_names = workbook.sheet_names().to_vec();
    let Some(sheet_name) = sheet_names.first() else {
        return Err(AppError::io(format!("Workbook '{}' has no sheets.", path.display())));
    };
    debug!("reading sheet '{sheet_name}' (first of {})", sheet_names.len());

    let range = workbook
        .worksheet_range(sheet_name)
        .map_err(|e| AppError::io(format!("Failed to read sheet '{sheet_name}': {e}")))?;

    let first_row = range.start().map(|(row, _)| row as usize).unwrap_or(0);
    let mut rows = range.rows();

    let Some(header_cells) = rows.next() else {
        return Err(AppError::io(format!("Sheet '{sheet_name}' is empty.")));
    };
    let headers = header_cells.iter().map(cell_to_string).collect();

    let rows = rows
        .enumerate()
        .map(|(idx, cells)| (first_row + idx + 2, cells.iter().map(cell_to_string).collect()))
        .collect();

    Ok(SheetTable { headers, rows })
}

fn cell_to_string(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.trim().to_string(),
        Data::Float(f) => f.to_string(),
        Data::Int(i) => i.to_string(),
        Data::DateTime(dt) => excel_serial_to_date(dt.as_f64())
            .map(|d| d.format("%Y-%m-%d").to_string())
            .unwrap_or_default(),
        Data::DateTimeIso(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Convert a spreadsheet serial day number (1900 date system) to a date.
pub fn excel_serial_to_date(serial: f64) -> Option<NaiveDate> {
    if !serial.is_finite() || serial < 0.0 {
        return None;
    }
    // Day 0 is 1899-12-30 once the 1900 leap-year bug is accounted for.
    let epoch = NaiveDate::from_ymd_opt(1899, 12, 30)?;
    epoch.checked_add_days(Days::new(serial.floor() as u64))
}
