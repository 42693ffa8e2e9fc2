//! Tabular ingest and validation.
//!
//! This module turns an uploaded production/consumption table into a sorted
//! [`Dataset`] that every downstream stage can trust.
//!
//! Design goals:
//! - **Strict schema**: the five required columns must all be present, else the
//!   whole load fails with a schema error naming the missing columns
//! - **Lenient rows**: a row with an unparseable date is dropped and counted,
//!   never fatal; other malformed rows are dropped and reported by line
//! - **Deterministic order**: stable sort by date, ties keep file order
//! - **Separation of concerns**: no filtering or aggregation here

use std::collections::HashMap;
use std::fs;
use std::io::Read;
use std::path::Path;

use chrono::NaiveDate;
use log::{debug, warn};

use crate::domain::{
    Dataset, Record, COL_CONSUMPTION, COL_DATE, COL_ENERGY_TYPE, COL_PRODUCTION, COL_SITE, REQUIRED_COLUMNS,
};
use crate::error::AppError;

/// Input format, resolved from the file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    /// Delimited text. `None` means "sniff the delimiter from the header line".
    Delimited { delimiter: Option<u8> },
    /// Spreadsheet workbook (first worksheet).
    Workbook,
}

/// A row-level problem encountered during ingest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowError {
    pub line: usize,
    pub message: String,
}

/// What happened to the rows of the file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadReport {
    pub rows_read: usize,
    /// Rows dropped because their `Date` could not be parsed.
    pub dropped_dates: usize,
    /// Rows dropped for any other reason (bad number, empty site/type, CSV error).
    pub row_errors: Vec<RowError>,
}

impl LoadReport {
    pub fn rows_dropped(&self) -> usize {
        self.dropped_dates + self.row_errors.len()
    }
}

/// Ingest output: the sorted dataset plus the row accounting.
#[derive(Debug, Clone)]
pub struct IngestedData {
    pub dataset: Dataset,
    pub report: LoadReport,
}

impl IngestedData {
    pub fn rows_used(&self) -> usize {
        self.dataset.len()
    }
}

/// Resolve the input format from a path's extension.
pub fn detect_format(path: &Path) -> Result<SourceFormat, AppError> {
    let ext = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();

    match ext.as_str() {
        "csv" | "txt" => Ok(SourceFormat::Delimited { delimiter: None }),
        "tsv" => Ok(SourceFormat::Delimited { delimiter: Some(b'\t') }),
        "xlsx" | "xlsm" | "xls" | "xlsb" | "ods" => Ok(SourceFormat::Workbook),
        _ => Err(AppError::usage(format!(
            "Unsupported file type '{}'. Expected .csv, .tsv, .txt, .xlsx, .xlsm, .xls, .xlsb or .ods.",
            path.display()
        ))),
    }
}

/// Load a file, choosing the parser from its extension.
pub fn load_path(path: &Path) -> Result<IngestedData, AppError> {
    match detect_format(path)? {
        SourceFormat::Delimited { delimiter } => {
            let bytes = fs::read(path)
                .map_err(|e| AppError::io(format!("Failed to read '{}': {e}", path.display())))?;
            let text = match String::from_utf8(bytes) {
                Ok(text) => text,
                Err(e) => {
                    warn!("'{}' is not valid UTF-8; invalid bytes were replaced", path.display());
                    String::from_utf8_lossy(e.as_bytes()).into_owned()
                }
            };
            let delimiter = delimiter.unwrap_or_else(|| sniff_delimiter(&text));
            load_delimited(text.as_bytes(), delimiter)
        }
        SourceFormat::Workbook => {
            let sheet = crate::io::workbook::read_first_sheet(path)?;
            let rows = sheet.rows.into_iter().map(|(line, cells)| (line, Ok(cells)));
            ingest_rows(&sheet.headers, rows)
        }
    }
}

/// Load delimited text held in memory, sniffing the delimiter.
pub fn load_csv_str(text: &str) -> Result<IngestedData, AppError> {
    load_delimited(text.as_bytes(), sniff_delimiter(text))
}

/// Load delimited text from any reader with an explicit delimiter.
pub fn load_delimited<R: Read>(reader: R, delimiter: u8) -> Result<IngestedData, AppError> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| AppError::io(format!("Failed to read header row: {e}")))?
        .iter()
        .map(str::to_string)
        .collect();

    // +2 because records() starts after the header and lines are 1-based.
    let rows = reader.into_records().enumerate().map(|(idx, result)| {
        let line = idx + 2;
        let cells = result
            .map(|record| record.iter().map(str::to_string).collect())
            .map_err(|e| format!("CSV parse error: {e}"));
        (line, cells)
    });

    ingest_rows(&headers, rows)
}

/// Pick `;` for files whose header uses it exclusively, `,` otherwise.
pub fn sniff_delimiter(text: &str) -> u8 {
    let header = text.lines().next().unwrap_or("");
    if header.contains('\t') && !header.contains(',') && !header.contains(';') {
        b'\t'
    } else if header.contains(';') && !header.contains(',') {
        b';'
    } else {
        b','
    }
}

/// Column positions of the required fields.
#[derive(Debug, Clone, Copy)]
struct Columns {
    date: usize,
    site: usize,
    energy_type: usize,
    production: usize,
    consumption: usize,
}

enum RowIssue {
    BadDate(String),
    Invalid(String),
}

fn ingest_rows<I>(headers: &[String], rows: I) -> Result<IngestedData, AppError>
where
    I: IntoIterator<Item = (usize, Result<Vec<String>, String>)>,
{
    let columns = resolve_columns(headers)?;

    let mut records = Vec::new();
    let mut report = LoadReport::default();

    for (line, cells) in rows {
        let cells = match cells {
            Ok(cells) => cells,
            Err(message) => {
                debug!("line {line}: {message}");
                report.rows_read += 1;
                report.row_errors.push(RowError { line, message });
                continue;
            }
        };

        // Fully blank lines (common at the end of spreadsheet exports) are not rows.
        if cells.iter().all(|c| c.trim().is_empty()) {
            continue;
        }
        report.rows_read += 1;

        match parse_row(&cells, columns) {
            Ok(record) => records.push(record),
            Err(RowIssue::BadDate(raw)) => {
                debug!("line {line}: unparseable date '{raw}', row dropped");
                report.dropped_dates += 1;
            }
            Err(RowIssue::Invalid(message)) => {
                debug!("line {line}: {message}");
                report.row_errors.push(RowError { line, message });
            }
        }
    }

    if report.dropped_dates > 0 {
        warn!(
            "dropped {} row(s) with an unparseable `{COL_DATE}` value",
            report.dropped_dates
        );
    }
    if !report.row_errors.is_empty() {
        warn!("dropped {} malformed row(s)", report.row_errors.len());
    }

    let dataset = Dataset::from_records(records);
    if dataset.is_empty() {
        warn!("no usable rows remain after validation ({} read)", report.rows_read);
    } else {
        debug!("loaded {} of {} row(s)", dataset.len(), report.rows_read);
    }

    Ok(IngestedData { dataset, report })
}

fn resolve_columns(headers: &[String]) -> Result<Columns, AppError> {
    let header_map = build_header_map(headers);

    let missing: Vec<String> = REQUIRED_COLUMNS
        .iter()
        .filter(|name| !header_map.contains_key(&normalize_header_name(name)))
        .map(|name| name.to_string())
        .collect();
    if !missing.is_empty() {
        return Err(AppError::schema(missing));
    }

    let idx = |name: &str| header_map[&normalize_header_name(name)];
    Ok(Columns {
        date: idx(COL_DATE),
        site: idx(COL_SITE),
        energy_type: idx(COL_ENERGY_TYPE),
        production: idx(COL_PRODUCTION),
        consumption: idx(COL_CONSUMPTION),
    })
}

fn build_header_map(headers: &[String]) -> HashMap<String, usize> {
    let mut map = HashMap::new();
    for (idx, name) in headers.iter().enumerate() {
        // First occurrence wins on duplicate headers.
        map.entry(normalize_header_name(name)).or_insert(idx);
    }
    map
}

fn normalize_header_name(name: &str) -> String {
    // Spreadsheet tools often emit UTF-8 CSVs with a BOM on the first header.
    let name = name.trim().trim_start_matches('\u{feff}');
    name.to_ascii_lowercase()
}

fn parse_row(cells: &[String], columns: Columns) -> Result<Record, RowIssue> {
    let cell = |idx: usize| cells.get(idx).map(|s| s.trim()).unwrap_or("");

    let raw_date = cell(columns.date);
    let date = parse_day_first(raw_date).ok_or_else(|| RowIssue::BadDate(raw_date.to_string()))?;

    let site = cell(columns.site);
    if site.is_empty() {
        return Err(RowIssue::Invalid(format!("Missing required value: `{COL_SITE}`")));
    }
    let energy_type = cell(columns.energy_type);
    if energy_type.is_empty() {
        return Err(RowIssue::Invalid(format!("Missing required value: `{COL_ENERGY_TYPE}`")));
    }

    let production_kwh = parse_energy(cell(columns.production), COL_PRODUCTION).map_err(RowIssue::Invalid)?;
    let consumption_kwh = parse_energy(cell(columns.consumption), COL_CONSUMPTION).map_err(RowIssue::Invalid)?;

    Ok(Record {
        date,
        site: site.to_string(),
        energy_type: energy_type.to_string(),
        production_kwh,
        consumption_kwh,
    })
}

const ISO_FMTS: [&str; 3] = ["%Y-%m-%d", "%Y/%m/%d", "%Y.%m.%d"];
const DAY_FIRST_FMTS: [&str; 3] = ["%d/%m/%Y", "%d-%m-%Y", "%d.%m.%Y"];
/// Two-digit years below this are 20YY, the rest 19YY.
const SHORT_YEAR_PIVOT: i32 = 69;

/// Parse a date with the day-first convention.
///
/// A trailing time part (after a space or `T`) is ignored. The candidate
/// formats are chosen from the shape of the date so `05/04/24` can never be
/// read as year 24.
pub fn parse_day_first(raw: &str) -> Option<NaiveDate> {
    let token = raw.trim().split(|c: char| c == ' ' || c == 'T').next()?;
    let segments: Vec<&str> = token.split(['/', '-', '.']).collect();
    if segments.len() != 3 || segments.iter().any(|s| s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit())) {
        return None;
    }

    let fmts: &[&str] = if segments[0].len() == 4 {
        &ISO_FMTS
    } else {
        match segments[2].len() {
            4 => &DAY_FIRST_FMTS,
            2 => return short_year_date(&segments),
            _ => return None,
        }
    };

    fmts.iter().find_map(|fmt| NaiveDate::parse_from_str(token, fmt).ok())
}

fn short_year_date(segments: &[&str]) -> Option<NaiveDate> {
    let day: u32 = segments[0].parse().ok()?;
    let month: u32 = segments[1].parse().ok()?;
    let yy: i32 = segments[2].parse().ok()?;
    let year = if yy < SHORT_YEAR_PIVOT { 2000 + yy } else { 1900 + yy };
    NaiveDate::from_ymd_opt(year, month, day)
}

fn parse_energy(raw: &str, column: &str) -> Result<f64, String> {
    // Drops thousands separators (spaces, including NBSP).
    let cleaned: String = raw.chars().filter(|c| !c.is_whitespace()).collect();
    if cleaned.is_empty() {
        return Ok(0.0);
    }

    let normalized = if cleaned.contains(',') && !cleaned.contains('.') {
        cleaned.replace(',', ".")
    } else {
        cleaned
    };

    let value = normalized
        .parse::<f64>()
        .map_err(|_| format!("Invalid number in `{column}`: '{raw}'"))?;
    if !value.is_finite() {
        return Err(format!("Non-finite value in `{column}`: '{raw}'"));
    }
    if value < 0.0 {
        return Err(format!("Negative value in `{column}`: '{raw}'"));
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    const HEADER: &str = "Date,Site,Type_Energie,Production_kWh,Consommation_kWh\n";

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn missing_columns_are_fatal_and_named() {
        let csv = "Date,Site,Production_kWh\n01/01/2024,A,10\n";
        let err = load_csv_str(csv).unwrap_err();
        assert_eq!(
            err.kind(),
            &ErrorKind::Schema {
                missing: vec!["Type_Energie".to_string(), "Consommation_kWh".to_string()]
            }
        );
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn header_matching_ignores_case_bom_and_padding() {
        let csv = "\u{feff}date , SITE,type_energie,Production_KWH,consommation_kwh\n02/01/2024,A,Solaire,1,2\n";
        let data = load_csv_str(csv).unwrap();
        assert_eq!(data.dataset.len(), 1);
    }

    #[test]
    fn rows_are_sorted_by_date_with_stable_ties() {
        let csv = format!(
            "{HEADER}15/01/2024,A,Solaire,1,1\n03/01/2024,B,Solaire,2,2\n03/01/2024,A,Batterie,3,3\n"
        );
        let data = load_csv_str(&csv).unwrap();
        let records = data.dataset.records();
        assert!(records.windows(2).all(|w| w[0].date <= w[1].date));
        assert_eq!(records[0].site, "B");
        assert_eq!(records[1].site, "A");
        assert_eq!(records[2].date, ymd(2024, 1, 15));
    }

    #[test]
    fn unparseable_dates_are_dropped_and_counted() {
        let csv = format!(
            "{HEADER}01/02/2024,A,Solaire,10,5\nnot a date,A,Solaire,10,5\n31/02/2024,A,Solaire,1,1\n03/02/2024,A,Solaire,20,8\n"
        );
        let data = load_csv_str(&csv).unwrap();
        assert_eq!(data.report.rows_read, 4);
        assert_eq!(data.report.dropped_dates, 2);
        assert_eq!(data.dataset.len(), 2);
        assert!(data.report.row_errors.is_empty());
    }

    #[test]
    fn all_rows_dropped_yields_empty_dataset() {
        let csv = format!("{HEADER}??,A,Solaire,1,1\n,A,Solaire,1,1\n");
        let data = load_csv_str(&csv).unwrap();
        assert!(data.dataset.is_empty());
        assert_eq!(data.report.dropped_dates, 2);
    }

    #[test]
    fn invalid_numbers_are_row_errors_with_line_numbers() {
        let csv = format!("{HEADER}01/01/2024,A,Solaire,abc,1\n02/01/2024,A,Solaire,-3,1\n03/01/2024,,Solaire,1,1\n04/01/2024,A,Solaire,,2\n");
        let data = load_csv_str(&csv).unwrap();
        let lines: Vec<usize> = data.report.row_errors.iter().map(|e| e.line).collect();
        assert_eq!(lines, vec![2, 3, 4]);
        assert_eq!(data.dataset.len(), 1);
        // Empty numeric cells count as zero.
        assert_eq!(data.dataset.records()[0].production_kwh, 0.0);
    }

    #[test]
    fn semicolon_files_with_decimal_commas() {
        let csv = "Date;Site;Type_Energie;Production_kWh;Consommation_kWh\n05/03/2024;Nord;Solaire;12,5;1 250,75\n";
        let data = load_csv_str(csv).unwrap();
        let r = &data.dataset.records()[0];
        assert_eq!(r.date, ymd(2024, 3, 5));
        assert!((r.production_kwh - 12.5).abs() < 1e-12);
        assert!((r.consumption_kwh - 1250.75).abs() < 1e-12);
    }

    #[test]
    fn day_first_date_shapes() {
        assert_eq!(parse_day_first("05/04/2024"), Some(ymd(2024, 4, 5)));
        assert_eq!(parse_day_first("05-04-2024"), Some(ymd(2024, 4, 5)));
        assert_eq!(parse_day_first("5.4.2024"), Some(ymd(2024, 4, 5)));
        assert_eq!(parse_day_first("05/04/24"), Some(ymd(2024, 4, 5)));
        assert_eq!(parse_day_first("2024-04-05"), Some(ymd(2024, 4, 5)));
        assert_eq!(parse_day_first("2024-04-05T13:45:00"), Some(ymd(2024, 4, 5)));
        assert_eq!(parse_day_first("05/04/2024 08:30"), Some(ymd(2024, 4, 5)));
        assert_eq!(parse_day_first("13/13/2024"), None);
        assert_eq!(parse_day_first("2024-04"), None);
        assert_eq!(parse_day_first(""), None);
    }

    #[test]
    fn two_digit_years_pivot_at_69() {
        assert_eq!(parse_day_first("01/01/00"), Some(ymd(2000, 1, 1)));
        assert_eq!(parse_day_first("01/01/68"), Some(ymd(2068, 1, 1)));
        assert_eq!(parse_day_first("01/01/69"), Some(ymd(1969, 1, 1)));
        assert_eq!(parse_day_first("01-01-70"), Some(ymd(1970, 1, 1)));
        assert_eq!(parse_day_first("31.12.99"), Some(ymd(1999, 12, 31)));
        assert_eq!(parse_day_first("29/02/23"), None);
        assert_eq!(parse_day_first("29/02/24 10:00"), Some(ymd(2024, 2, 29)));
    }

    #[test]
    fn format_detection_by_extension() {
        assert_eq!(
            detect_format(Path::new("data/site.CSV")).unwrap(),
            SourceFormat::Delimited { delimiter: None }
        );
        assert_eq!(
            detect_format(Path::new("site.tsv")).unwrap(),
            SourceFormat::Delimited { delimiter: Some(b'\t') }
        );
        assert_eq!(detect_format(Path::new("site.xlsx")).unwrap(), SourceFormat::Workbook);
        assert!(detect_format(Path::new("site.json")).is_err());
    }

    #[test]
    fn blank_lines_are_not_counted() {
        let csv = format!("{HEADER}01/01/2024,A,Solaire,1,1\n,,,,\n");
        let data = load_csv_str(&csv).unwrap();
        assert_eq!(data.report.rows_read, 1);
        assert_eq!(data.report.rows_dropped(), 0);
    }
}
