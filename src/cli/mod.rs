//! Command-line parsing for the solar site dashboard.
//!
//! The goal of this module is to keep **argument parsing** and **command dispatch**
//! separate from the loading and analysis code.

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};

use crate::domain::{DashboardConfig, Granularity};
use crate::io::ingest::parse_day_first;

pub mod picker;

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "solar-dash", version, about = "Solar site production/consumption dashboard")]
pub struct Cli {
    /// Verbose logging to stderr (overridden by RUST_LOG).
    #[arg(long, global = true)]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Launch the interactive dashboard.
    ///
    /// Four tabs (Performance, Consommation, Comparaison, Maintenance) over the
    /// same pipeline as `summary`.
    Tui(DashboardArgs),
    /// Print metrics, period/type/site tables, alerts and an ASCII chart.
    Summary(SummaryArgs),
    /// Write the filtered rows as CSV and/or the HTML performance report.
    Export(ExportArgs),
    /// Generate a synthetic input file to try the dashboard on.
    Sample(SampleArgs),
}

/// Input file and filter options shared by every data command.
#[derive(Debug, Args, Clone, Default)]
pub struct DashboardArgs {
    /// Input table (.csv, .txt, .tsv, .xlsx, .xlsm, .xls, .xlsb, .ods).
    ///
    /// If omitted, an interactive picker lists the files below the current directory.
    #[arg(short = 'f', long, env = "SOLAR_DASH_FILE")]
    pub file: Option<PathBuf>,

    /// Site to analyse (default: first site in the file).
    #[arg(short = 's', long)]
    pub site: Option<String>,

    /// First day, inclusive (DD/MM/YYYY or YYYY-MM-DD; default: first date in the file).
    #[arg(long, value_parser = parse_date_arg)]
    pub from: Option<NaiveDate>,

    /// Last day, inclusive (default: last date in the file).
    #[arg(long, value_parser = parse_date_arg)]
    pub to: Option<NaiveDate>,

    /// Energy types to include, comma-separated (default: all).
    #[arg(short = 't', long, value_delimiter = ',')]
    pub types: Option<Vec<String>>,

    /// Sites for the cross-site comparison, comma-separated (default: all).
    #[arg(long, value_delimiter = ',')]
    pub compare: Option<Vec<String>>,

    /// Period used by the period table.
    #[arg(short = 'p', long, value_enum, default_value_t = Granularity::Day)]
    pub period: Granularity,
}

impl DashboardArgs {
    pub fn config(&self) -> DashboardConfig {
        DashboardConfig {
            site: self.site.clone(),
            date_from: self.from,
            date_to: self.to,
            energy_types: self.types.clone(),
            compare_sites: self.compare.clone(),
            granularity: self.period,
        }
    }
}

#[derive(Debug, Args, Clone)]
pub struct SummaryArgs {
    #[command(flatten)]
    pub dashboard: DashboardArgs,

    /// Print the pipeline output as JSON instead of tables.
    #[arg(long)]
    pub json: bool,

    /// Disable the terminal chart.
    #[arg(long)]
    pub no_plot: bool,

    /// Chart width (columns).
    #[arg(long, default_value_t = 100)]
    pub width: usize,

    /// Chart height (rows).
    #[arg(long, default_value_t = 20)]
    pub height: usize,
}

#[derive(Debug, Args, Clone)]
pub struct ExportArgs {
    #[command(flatten)]
    pub dashboard: DashboardArgs,

    /// Write the filtered rows to this CSV file.
    #[arg(long, value_name = "PATH")]
    pub csv: Option<PathBuf>,

    /// Write the HTML performance report to this file.
    #[arg(long, value_name = "PATH")]
    pub report: Option<PathBuf>,

    /// Chart one point per row instead of the daily-resampled series.
    #[arg(long)]
    pub raw_series: bool,
}

#[derive(Debug, Args, Clone)]
pub struct SampleArgs {
    /// Output CSV path.
    #[arg(long, value_name = "PATH")]
    pub out: PathBuf,

    /// Number of sites.
    #[arg(long, default_value_t = 3)]
    pub sites: usize,

    /// Number of consecutive days.
    #[arg(long, default_value_t = 90)]
    pub days: usize,

    /// First day (DD/MM/YYYY or YYYY-MM-DD).
    #[arg(long, value_parser = parse_date_arg, default_value = "01/01/2024")]
    pub start: NaiveDate,

    /// Random seed.
    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// Extra rows with an unparseable date.
    #[arg(long, default_value_t = 0)]
    pub bad_dates: usize,
}

fn parse_date_arg(raw: &str) -> Result<NaiveDate, String> {
    parse_day_first(raw).ok_or_else(|| format!("invalid date '{raw}' (expected DD/MM/YYYY or YYYY-MM-DD)"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filters_parse_into_config() {
        let cli = Cli::try_parse_from([
            "solar-dash",
            "summary",
            "-f",
            "data.csv",
            "--site",
            "Nord",
            "--from",
            "05/02/2024",
            "--types",
            "Solaire,Batterie",
            "--period",
            "week",
        ])
        .unwrap();
        let Command::Summary(args) = cli.command else {
            panic!("expected summary");
        };
        let config = args.dashboard.config();
        assert_eq!(config.site.as_deref(), Some("Nord"));
        assert_eq!(config.date_from, NaiveDate::from_ymd_opt(2024, 2, 5));
        assert_eq!(config.date_to, None);
        assert_eq!(config.energy_types, Some(vec!["Solaire".to_string(), "Batterie".to_string()]));
        assert_eq!(config.granularity, Granularity::Week);
        assert_eq!(args.width, 100);
    }

    #[test]
    fn bad_date_is_a_parse_error() {
        let res = Cli::try_parse_from(["solar-dash", "export", "-f", "x.csv", "--to", "2024-13-40"]);
        assert!(res.is_err());
    }

    #[test]
    fn sample_defaults() {
        let cli = Cli::try_parse_from(["solar-dash", "sample", "--out", "demo.csv"]).unwrap();
        let Command::Sample(args) = cli.command else {
            panic!("expected sample");
        };
        assert_eq!(args.start, NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
        assert_eq!((args.sites, args.days, args.bad_dates), (3, 90, 0));
    }

    #[test]
    fn debug_flag_is_global() {
        let cli = Cli::try_parse_from(["solar-dash", "tui", "--debug"]).unwrap();
        assert!(cli.debug);
    }
}
