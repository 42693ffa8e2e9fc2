//! Synthetic production/consumption files for trying the dashboard.
//!
//! Output uses the upload format: day-first dates, one row per site, day and
//! energy type. Optional rows with impossible dates exercise the loader's
//! drop accounting.

use std::f64::consts::PI;
use std::fs::File;
use std::io::Write;
use std::path::Path;

use chrono::{Datelike, NaiveDate};
use rand::prelude::*;
use rand::rngs::StdRng;
use rand_distr::Normal;

use crate::domain::{Record, REQUIRED_COLUMNS};
use crate::error::AppError;

const SITE_NAMES: [&str; 4] = ["Site_Nord", "Site_Sud", "Site_Est", "Site_Ouest"];

/// Peak daily solar production of a site, in kWh.
const SOLAR_PEAK_KWH: f64 = 120.0;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SampleConfig {
    pub sites: usize,
    pub days: usize,
    pub start: NaiveDate,
    pub seed: u64,
    /// Extra rows written with an unparseable date.
    pub bad_dates: usize,
}

pub fn site_name(index: usize) -> String {
    SITE_NAMES
        .get(index)
        .map(|s| s.to_string())
        .unwrap_or_else(|| format!("Site_{}", index + 1))
}

/// Generate `sites × days × 3` records (Solaire, Batterie, Reseau).
pub fn generate_sample(config: &SampleConfig) -> Result<Vec<Record>, AppError> {
    if config.sites == 0 || config.days == 0 {
        return Err(AppError::usage("Sample generation needs at least one site and one day."));
    }

    let mut rng = StdRng::seed_from_u64(config.seed);
    let solar_noise =
        Normal::new(0.0_f64, 10.0).map_err(|e| AppError::usage(format!("Noise distribution error: {e}")))?;
    let battery = Normal::new(25.0_f64, 5.0).map_err(|e| AppError::usage(format!("Noise distribution error: {e}")))?;
    let grid = Normal::new(40.0_f64, 8.0).map_err(|e| AppError::usage(format!("Noise distribution error: {e}")))?;

    let sites: Vec<String> = (0..config.sites).map(site_name).collect();
    let mut records = Vec::with_capacity(config.sites * config.days * 3);

    for date in config.start.iter_days().take(config.days) {
        let season = seasonal_factor(date);
        for site in &sites {
            let production = (SOLAR_PEAK_KWH * season + rng.sample(solar_noise)).max(0.0);
            let self_use = rng.gen_range(0.55..0.95);
            records.push(record(date, site, "Solaire", production, production * self_use));
            records.push(record(date, site, "Batterie", 0.0, rng.sample(battery).max(0.0)));
            records.push(record(date, site, "Reseau", 0.0, rng.sample(grid).max(0.0)));
        }
    }

    Ok(records)
}

/// Write records in the upload format, with `bad_dates` unparseable rows
/// spread through the file.
pub fn write_sample_csv<W: Write>(writer: W, records: &[Record], bad_dates: usize) -> Result<(), AppError> {
    let mut wtr = csv::Writer::from_writer(writer);
    let write_err = |e: csv::Error| AppError::export(format!("Failed to write sample row: {e}"));

    wtr.write_record(REQUIRED_COLUMNS).map_err(write_err)?;

    let step = if bad_dates == 0 { usize::MAX } else { (records.len() / bad_dates).max(1) };
    let mut written_bad = 0;
    for (i, r) in records.iter().enumerate() {
        wtr.write_record(row(&r.date.format("%d/%m/%Y").to_string(), r))
            .map_err(write_err)?;
        if written_bad < bad_dates && (i + 1) % step == 0 {
            let bad_date = format!("31/02/{}", r.date.year());
            wtr.write_record(row(&bad_date, r)).map_err(write_err)?;
            written_bad += 1;
        }
    }
    // Fewer records than requested bad rows: append the rest.
    if let Some(last) = records.last() {
        for _ in written_bad..bad_dates {
            wtr.write_record(row("31/02/2024", last)).map_err(write_err)?;
        }
    }

    wtr.flush()
        .map_err(|e| AppError::export(format!("Failed to flush sample file: {e}")))
}

pub fn write_sample_file(path: &Path, config: &SampleConfig) -> Result<usize, AppError> {
    let records = generate_sample(config)?;
    let file = File::create(path)
        .map_err(|e| AppError::export(format!("Failed to create '{}': {e}", path.display())))?;
    write_sample_csv(file, &records, config.bad_dates)?;
    Ok(records.len())
}

/// Solar yield over the year: 0.3 in late December, 1.0 in late June.
fn seasonal_factor(date: NaiveDate) -> f64 {
    let doy = date.ordinal0() as f64;
    let phase = 2.0 * PI * (doy - 172.0) / 365.0;
    0.65 + 0.35 * phase.cos()
}

fn record(date: NaiveDate, site: &str, kind: &str, production: f64, consumption: f64) -> Record {
    Record {
        date,
        site: site.to_string(),
        energy_type: kind.to_string(),
        production_kwh: round2(production),
        consumption_kwh: round2(consumption),
    }
}

fn row(date: &str, r: &Record) -> [String; 5] {
    [
        date.to_string(),
        r.site.clone(),
        r.energy_type.clone(),
        format!("{:.2}", r.production_kwh),
        format!("{:.2}", r.consumption_kwh),
    ]
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}
