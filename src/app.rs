//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - loads `.env` and parses CLI arguments
//! - initialises logging
//! - loads and validates the input table
//! - runs the dashboard pipeline
//! - prints summaries/charts or writes exports

use std::io::IsTerminal;
use std::path::PathBuf;

use clap::Parser;
use log::info;

use crate::cli::{Command, ExportArgs, SampleArgs, SummaryArgs};
use crate::data::SampleConfig;
use crate::error::AppError;
use crate::report::ChartSeries;

pub mod pipeline;

/// Entry point for the `solar-dash` binary.
pub fn run() -> Result<(), AppError> {
    dotenvy::dotenv().ok();

    // `solar-dash` and `solar-dash -f data.csv` behave like `solar-dash tui ...`.
    let argv = rewrite_args(std::env::args().collect());
    let cli = crate::cli::Cli::parse_from(argv);
    init_logging(cli.debug);

    match cli.command {
        Command::Tui(args) => crate::tui::run(&args),
        Command::Summary(args) => handle_summary(args),
        Command::Export(args) => handle_export(args),
        Command::Sample(args) => handle_sample(args),
    }
}

fn init_logging(debug: bool) {
    let default_filter = if debug { "debug" } else { "warn" };
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter)).try_init();
}

/// Input path from `-f`, or from the interactive picker when stdin is a terminal.
pub fn resolve_input(file: Option<PathBuf>) -> Result<PathBuf, AppError> {
    match file {
        Some(path) => crate::cli::picker::validate_data_path(&path),
        None if std::io::stdin().is_terminal() => crate::cli::picker::prompt_for_data_path(),
        None => Err(AppError::usage(
            "No input file. Pass one with -f <file> or set SOLAR_DASH_FILE.",
        )),
    }
}

fn handle_summary(args: SummaryArgs) -> Result<(), AppError> {
    let path = resolve_input(args.dashboard.file.clone())?;
    let ingest = pipeline::load_dataset(&path)?;
    let request = pipeline::resolve_request(&ingest.dataset, &args.dashboard.config())?;
    let output = pipeline::run_dashboard(&ingest.dataset, &request);

    if args.json {
        let json = serde_json::to_string_pretty(&output)
            .map_err(|e| AppError::export(format!("Failed to serialize summary: {e}")))?;
        println!("{json}");
        return Ok(());
    }

    println!("{}", crate::report::format_load_summary(&path, &ingest));
    println!("{}", crate::report::format_dashboard(&output));

    if !args.no_plot {
        println!("{}", crate::plot::render_ascii_chart(&output.daily, args.width, args.height));
    }
    Ok(())
}

fn handle_export(args: ExportArgs) -> Result<(), AppError> {
    if args.csv.is_none() && args.report.is_none() {
        return Err(AppError::usage("Nothing to export: pass --csv <PATH> and/or --report <PATH>."));
    }

    let path = resolve_input(args.dashboard.file.clone())?;
    let ingest = pipeline::load_dataset(&path)?;
    let request = pipeline::resolve_request(&ingest.dataset, &args.dashboard.config())?;
    let output = pipeline::run_dashboard(&ingest.dataset, &request);

    if output.view.is_empty() {
        println!("Aucune donnée pour les filtres sélectionnés (export vide).");
    }

    if let Some(csv_path) = &args.csv {
        crate::io::export::write_view_csv(csv_path, output.view.records())?;
        info!("wrote {} row(s) to {}", output.view.len(), csv_path.display());
        println!("CSV: {} ({} ligne(s))", csv_path.display(), output.view.len());
    }

    if let Some(report_path) = &args.report {
        let series = if args.raw_series { ChartSeries::Raw } else { ChartSeries::Daily };
        let doc = crate::report::build_report(&output, series);
        crate::report::write_report_html(report_path, &doc)?;
        info!("wrote report '{}' to {}", doc.title, report_path.display());
        println!("Rapport: {}", report_path.display());
    }
    Ok(())
}

fn handle_sample(args: SampleArgs) -> Result<(), AppError> {
    let config = SampleConfig {
        sites: args.sites,
        days: args.days,
        start: args.start,
        seed: args.seed,
        bad_dates: args.bad_dates,
    };
    let n = crate::data::write_sample_file(&args.out, &config)?;
    println!(
        "Wrote {n} row(s) ({} site(s) x {} day(s), {} invalid date(s)) to {}",
        config.sites,
        config.days,
        config.bad_dates,
        args.out.display()
    );
    Ok(())
}

/// Rewrite argv so `solar-dash` defaults to `solar-dash tui`.
///
/// Rules:
/// - `solar-dash`                      -> `solar-dash tui`
/// - `solar-dash -f data.csv ...`      -> `solar-dash tui -f data.csv ...`
/// - `solar-dash --help/--version/-h`  -> unchanged (show top-level help/version)
fn rewrite_args(mut argv: Vec<String>) -> Vec<String> {
    let Some(arg1) = argv.get(1).cloned() else {
        argv.push("tui".to_string());
        return argv;
    };

    let is_top_level_help_or_version = matches!(arg1.as_str(), "-h" | "--help" | "-V" | "--version" | "help");
    if is_top_level_help_or_version {
        return argv;
    }

    let is_subcommand = matches!(arg1.as_str(), "tui" | "summary" | "export" | "sample");
    if is_subcommand {
        return argv;
    }

    // If the first token is a flag, treat it as "tui flags".
    if arg1.starts_with('-') {
        argv.insert(1, "tui".to_string());
    }
    argv
}

#[cfg(test)]
mod tests {
    use super::*;

    fn argv(args: &[&str]) -> Vec<String> {
        args.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn bare_invocation_opens_tui() {
        assert_eq!(rewrite_args(argv(&["solar-dash"])), argv(&["solar-dash", "tui"]));
    }

    #[test]
    fn leading_flags_go_to_tui() {
        assert_eq!(
            rewrite_args(argv(&["solar-dash", "-f", "data.csv"])),
            argv(&["solar-dash", "tui", "-f", "data.csv"])
        );
    }

    #[test]
    fn subcommands_and_help_are_untouched() {
        for args in [
            argv(&["solar-dash", "summary", "-f", "x.csv"]),
            argv(&["solar-dash", "--help"]),
            argv(&["solar-dash", "sample", "--out", "x.csv"]),
        ] {
            assert_eq!(rewrite_args(args.clone()), args);
        }
    }

    #[test]
    fn explicit_missing_file_is_rejected() {
        let err = resolve_input(Some(PathBuf::from("definitely/not/here.csv"))).unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn export_without_targets_is_a_usage_error() {
        let args = ExportArgs {
            dashboard: Default::default(),
            csv: None,
            report: None,
            raw_series: false,
        };
        assert_eq!(handle_export(args).unwrap_err().exit_code(), 2);
    }
}
