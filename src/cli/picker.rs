//! Data-file picker used when no `-f` is given on an interactive terminal.
//!
//! Lists the tables (`.csv`, `.tsv` and spreadsheets) found a few levels below
//! the working directory and reads a choice from stdin.

use std::fs;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};

use crate::error::AppError;
use crate::io::ingest::detect_format;

/// Default directory recursion depth for finding data files.
const DEFAULT_SEARCH_DEPTH: usize = 4;

/// Extensions listed by the picker.
pub const PICKER_EXTENSIONS: [&str; 6] = ["csv", "tsv", "xlsx", "xls", "xlsb", "ods"];

/// Ask on stdin which discovered data file to load.
pub fn prompt_for_data_path() -> Result<PathBuf, AppError> {
    let files = discover_data_files();
    if files.is_empty() {
        return Err(AppError::usage(
            "No data file below the current directory. Pass one with -f <file>.",
        ));
    }
    select_file(&files, &mut io::stdin().lock(), &mut io::stdout())
}

/// One line typed at the picker prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Selection {
    Blank,
    Quit,
    /// Zero-based index into the listed files.
    Listed(usize),
    OutOfRange(usize),
    Typed(PathBuf),
}

fn parse_selection(input: &str, listed: usize) -> Selection {
    let input = input.trim();
    if input.is_empty() {
        return Selection::Blank;
    }
    if input.eq_ignore_ascii_case("q") {
        return Selection::Quit;
    }
    match input.parse::<usize>() {
        Ok(n) if (1..=listed).contains(&n) => Selection::Listed(n - 1),
        Ok(n) => Selection::OutOfRange(n),
        Err(_) => Selection::Typed(PathBuf::from(input)),
    }
}

/// List `files` on `out`, then read selections from `input` until one validates.
fn select_file<R: BufRead, W: Write>(files: &[PathBuf], input: &mut R, out: &mut W) -> Result<PathBuf, AppError> {
    let write_err = |e: io::Error| AppError::io(format!("Failed to write to terminal: {e}"));

    writeln!(out, "Data files:").map_err(write_err)?;
    for (n, path) in (1..).zip(files) {
        writeln!(out, "  [{n}] {}", pretty_path(path)).map_err(write_err)?;
    }

    let mut line = String::new();
    loop {
        write!(out, "File number, path, or q: ").map_err(write_err)?;
        out.flush().map_err(write_err)?;

        line.clear();
        let read = input
            .read_line(&mut line)
            .map_err(|e| AppError::io(format!("Failed to read selection: {e}")))?;
        if read == 0 {
            return Err(AppError::usage("Input closed before a file was chosen."));
        }

        let candidate = match parse_selection(&line, files.len()) {
            Selection::Blank => continue,
            Selection::Quit => return Err(AppError::usage("No file chosen.")),
            Selection::Listed(idx) => files[idx].clone(),
            Selection::OutOfRange(n) => {
                writeln!(out, "There is no file [{n}].").map_err(write_err)?;
                continue;
            }
            Selection::Typed(path) => path,
        };

        match validate_data_path(&candidate) {
            Ok(path) => return Ok(path),
            Err(err) => writeln!(out, "{err}").map_err(write_err)?,
        }
    }
}

/// Validate the provided path points to a file the loader can read.
pub fn validate_data_path(path: &Path) -> Result<PathBuf, AppError> {
    if !path.exists() {
        return Err(AppError::io(format!("Data file not found: {}", path.display())));
    }
    if path.is_dir() {
        return Err(AppError::usage(format!(
            "Expected a file, got a directory: {}",
            path.display()
        )));
    }
    detect_format(path)?;
    Ok(path.to_path_buf())
}

/// Data files under the current directory, sorted by displayed path.
pub fn discover_data_files() -> Vec<PathBuf> {
    find_data_files(Path::new("."), DEFAULT_SEARCH_DEPTH)
}

fn find_data_files(root: &Path, max_depth: usize) -> Vec<PathBuf> {
    let mut out = Vec::new();
    find_data_files_inner(root, 0, max_depth, &mut out);
    out.sort_by_key(|p| pretty_path(p));
    out
}

fn find_data_files_inner(root: &Path, depth: usize, max_depth: usize, out: &mut Vec<PathBuf>) {
    if depth > max_depth {
        return;
    }

    let Ok(entries) = fs::read_dir(root) else {
        return;
    };

    for entry in entries.flatten() {
        let path = entry.path();
        let Ok(file_type) = entry.file_type() else {
            continue;
        };

        if file_type.is_dir() {
            if should_skip_dir(&path) {
                continue;
            }
            find_data_files_inner(&path, depth + 1, max_depth, out);
        } else if file_type.is_file() && has_picker_extension(&path) {
            out.push(path);
        }
    }
}

fn has_picker_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| PICKER_EXTENSIONS.iter().any(|known| ext.eq_ignore_ascii_case(known)))
}

fn should_skip_dir(path: &Path) -> bool {
    let name = path.file_name().and_then(|s| s.to_str()).unwrap_or("");
    matches!(name, ".git" | "target" | "node_modules")
}

pub fn pretty_path(path: &Path) -> String {
    let stripped = path.strip_prefix("./").unwrap_or(path);
    stripped.display().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("solar-dash-picker-{name}-{}", std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn finds_tables_and_skips_build_dirs() {
        let dir = scratch_dir("find");
        fs::create_dir_all(dir.join("target")).unwrap();
        fs::create_dir_all(dir.join("data")).unwrap();
        fs::write(dir.join("b.csv"), "x").unwrap();
        fs::write(dir.join("data").join("a.XLSX"), "x").unwrap();
        fs::write(dir.join("notes.md"), "x").unwrap();
        fs::write(dir.join("target").join("c.csv"), "x").unwrap();

        let found: Vec<String> = find_data_files(&dir, 2)
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
            .collect();
        assert_eq!(found, vec!["b.csv", "a.XLSX"]);
        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn validation_rejects_missing_and_unsupported() {
        let dir = scratch_dir("validate");
        let md = dir.join("notes.md");
        fs::write(&md, "x").unwrap();

        assert_eq!(validate_data_path(&dir.join("nope.csv")).unwrap_err().exit_code(), 2);
        assert_eq!(validate_data_path(&dir).unwrap_err().exit_code(), 2);
        assert!(validate_data_path(&md).is_err());

        let csv = dir.join("ok.csv");
        fs::write(&csv, "x").unwrap();
        assert_eq!(validate_data_path(&csv).unwrap(), csv);
        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn selections_are_classified() {
        assert_eq!(parse_selection(" 2 \n", 3), Selection::Listed(1));
        assert_eq!(parse_selection("4", 3), Selection::OutOfRange(4));
        assert_eq!(parse_selection("0", 3), Selection::OutOfRange(0));
        assert_eq!(parse_selection("Q", 3), Selection::Quit);
        assert_eq!(parse_selection("   ", 3), Selection::Blank);
        assert_eq!(parse_selection("data/x.csv", 3), Selection::Typed(PathBuf::from("data/x.csv")));
    }

    #[test]
    fn prompt_retries_until_a_valid_choice() {
        let dir = scratch_dir("prompt");
        let csv = dir.join("site.csv");
        fs::write(&csv, "x").unwrap();
        let files = vec![csv.clone()];

        let typed = dir.join("missing.csv");
        let mut input = io::Cursor::new(format!("\n7\n{}\n1\n", typed.display()));
        let mut out = Vec::new();
        let picked = select_file(&files, &mut input, &mut out).unwrap();
        fs::remove_dir_all(&dir).unwrap();

        assert_eq!(picked, csv);
        let shown = String::from_utf8(out).unwrap();
        assert!(shown.contains("[1] "));
        assert!(shown.contains("There is no file [7]."));
        assert!(shown.contains("Data file not found"));
    }

    #[test]
    fn prompt_quit_and_eof_are_usage_errors() {
        let files = vec![PathBuf::from("a.csv")];
        let quit = select_file(&files, &mut io::Cursor::new("q\n"), &mut Vec::new()).unwrap_err();
        assert_eq!(quit.exit_code(), 2);
        let eof = select_file(&files, &mut io::Cursor::new(""), &mut Vec::new()).unwrap_err();
        assert_eq!(eof.exit_code(), 2);
    }

    #[test]
    fn pretty_path_strips_dot_prefix() {
        assert_eq!(pretty_path(Path::new("./data/a.csv")), "data/a.csv");
    }
}
