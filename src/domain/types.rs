//! Shared domain types.
//!
//! These types are intentionally kept lightweight and serializable so they can be:
//!
//! - threaded explicitly between pipeline stages (no shared state)
//! - exported to CSV/JSON
//! - rendered by any front-end (terminal summary, TUI, report document)

use std::collections::{BTreeSet, HashSet};
use std::fmt;

use chrono::NaiveDate;
use clap::ValueEnum;
use serde::{Deserialize, Serialize, Serializer};

use crate::error::AppError;

pub const COL_DATE: &str = "Date";
pub const COL_SITE: &str = "Site";
pub const COL_ENERGY_TYPE: &str = "Type_Energie";
pub const COL_PRODUCTION: &str = "Production_kWh";
pub const COL_CONSUMPTION: &str = "Consommation_kWh";

/// Input schema, in the canonical column order used for exports and errors.
pub const REQUIRED_COLUMNS: [&str; 5] = [COL_DATE, COL_SITE, COL_ENERGY_TYPE, COL_PRODUCTION, COL_CONSUMPTION];

/// One production/consumption observation for one site and one energy type.
///
/// Serde names match the input columns so a `Record` serializes straight back
/// into the upload format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    #[serde(rename = "Date")]
    pub date: NaiveDate,
    #[serde(rename = "Site")]
    pub site: String,
    #[serde(rename = "Type_Energie")]
    pub energy_type: String,
    #[serde(rename = "Production_kWh")]
    pub production_kwh: f64,
    #[serde(rename = "Consommation_kWh")]
    pub consumption_kwh: f64,
}

/// Loaded records, sorted ascending by date.
///
/// Ties keep their original row order. Every record has a valid date; rows whose
/// date could not be parsed never make it in here.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dataset {
    records: Vec<Record>,
}

impl Dataset {
    pub fn from_records(mut records: Vec<Record>) -> Self {
        // `sort_by_key` is stable.
        records.sort_by_key(|r| r.date);
        Self { records }
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Distinct sites, in order of first appearance (i.e. by first date).
    pub fn sites(&self) -> Vec<String> {
        distinct(self.records.iter().map(|r| r.site.as_str()))
    }

    /// Distinct energy types, in order of first appearance.
    pub fn energy_types(&self) -> Vec<String> {
        distinct(self.records.iter().map(|r| r.energy_type.as_str()))
    }

    /// First and last date, or `None` when empty.
    pub fn date_range(&self) -> Option<(NaiveDate, NaiveDate)> {
        let first = self.records.first()?;
        let last = self.records.last()?;
        Some((first.date, last.date))
    }
}

/// Records matching a [`FilterCriteria`], in dataset order.
///
/// Recomputed on every criteria change and never mutated; emptiness is a
/// valid state, not an error.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct FilteredView {
    records: Vec<Record>,
}

impl FilteredView {
    pub(crate) fn new(records: Vec<Record>) -> Self {
        Self { records }
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Site, inclusive date range and energy types selected by the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FilterCriteria {
    site: String,
    date_start: NaiveDate,
    date_end: NaiveDate,
    energy_types: BTreeSet<String>,
}

impl FilterCriteria {
    pub fn new<I, S>(site: impl Into<String>, date_start: NaiveDate, date_end: NaiveDate, energy_types: I) -> Result<Self, AppError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        if date_start > date_end {
            return Err(AppError::usage(format!(
                "Invalid date range: start {date_start} is after end {date_end}."
            )));
        }
        Ok(Self {
            site: site.into(),
            date_start,
            date_end,
            energy_types: energy_types.into_iter().map(Into::into).collect(),
        })
    }

    pub fn site(&self) -> &str {
        &self.site
    }

    pub fn date_start(&self) -> NaiveDate {
        self.date_start
    }

    pub fn date_end(&self) -> NaiveDate {
        self.date_end
    }

    pub fn energy_types(&self) -> &BTreeSet<String> {
        &self.energy_types
    }

    pub fn matches(&self, record: &Record) -> bool {
        record.date >= self.date_start
            && record.date <= self.date_end
            && record.site == self.site
            && self.energy_types.contains(&record.energy_type)
    }
}

/// Dashboard options as given by the user, before they are checked against a
/// dataset. `None` means "use the dataset default".
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DashboardConfig {
    pub site: Option<String>,
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
    pub energy_types: Option<Vec<String>>,
    /// Sites shown in the cross-site comparison; all sites when `None`.
    pub compare_sites: Option<Vec<String>>,
    pub granularity: Granularity,
}

/// Period selector for [`crate::analysis::aggregate::group_by_period`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Granularity {
    #[default]
    Day,
    Week,
    Month,
}

impl Granularity {
    pub const ALL: [Granularity; 3] = [Granularity::Day, Granularity::Week, Granularity::Month];

    pub fn label(self) -> &'static str {
        match self {
            Granularity::Day => "Jour",
            Granularity::Week => "Semaine",
            Granularity::Month => "Mois",
        }
    }

    pub fn next(self) -> Self {
        match self {
            Granularity::Day => Granularity::Week,
            Granularity::Week => Granularity::Month,
            Granularity::Month => Granularity::Day,
        }
    }

    pub fn prev(self) -> Self {
        match self {
            Granularity::Day => Granularity::Month,
            Granularity::Week => Granularity::Day,
            Granularity::Month => Granularity::Week,
        }
    }
}

/// Grouping key for one period bucket.
///
/// `Week` carries the ISO week number only: week 1 of two different years lands
/// in the same bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum BucketKey {
    Day(NaiveDate),
    Week(u32),
    Month { year: i32, month: u32 },
}

impl fmt::Display for BucketKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BucketKey::Day(date) => write!(f, "{}", date.format("%Y-%m-%d")),
            BucketKey::Week(week) => write!(f, "W{week:02}"),
            BucketKey::Month { year, month } => write!(f, "{year:04}-{month:02}"),
        }
    }
}

impl Serialize for BucketKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Production and consumption summed over some set of records.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct EnergyTotals {
    pub production_kwh: f64,
    pub consumption_kwh: f64,
}

impl EnergyTotals {
    pub fn add(&mut self, record: &Record) {
        self.production_kwh += record.production_kwh;
        self.consumption_kwh += record.consumption_kwh;
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PeriodBucket {
    pub key: BucketKey,
    #[serde(flatten)]
    pub totals: EnergyTotals,
}

/// One day of a daily-resampled series (missing days are zero-filled).
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DailyPoint {
    pub date: NaiveDate,
    pub production_kwh: f64,
    pub consumption_kwh: f64,
}

/// Summary scalars derived from one filtered view.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MetricsSnapshot {
    pub total_production: f64,
    pub total_consumption: f64,
    /// Consumption over production, in percent; 0 when production is 0.
    pub efficiency_ratio: f64,
    /// Consumption of "Batterie" records, when any are present.
    pub battery_consumption: Option<f64>,
    /// `battery_consumption / total_consumption` (0 when total consumption is 0).
    pub battery_load_ratio: Option<f64>,
    pub low_efficiency: bool,
    pub high_battery_load: bool,
}

/// Maintenance indicators raised from a [`MetricsSnapshot`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MaintenanceAlert {
    LowEfficiency { efficiency_ratio: f64, threshold: f64 },
    HighBatteryLoad { battery_load_ratio: f64 },
}

impl MaintenanceAlert {
    pub fn message(&self) -> String {
        match self {
            MaintenanceAlert::LowEfficiency {
                efficiency_ratio,
                threshold,
            } => format!("Rendement faible : {efficiency_ratio:.1} % (seuil {threshold:.0} %)"),
            MaintenanceAlert::HighBatteryLoad { .. } => {
                "Les batteries supportent une forte charge de consommation. Vérifiez leur état de santé."
                    .to_string()
            }
        }
    }
}

fn distinct<'a>(values: impl Iterator<Item = &'a str>) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for v in values {
        if seen.insert(v) {
            out.push(v.to_string());
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rec(day: u32, site: &str, kind: &str) -> Record {
        Record {
            date: NaiveDate::from_ymd_opt(2024, 3, day).unwrap(),
            site: site.to_string(),
            energy_type: kind.to_string(),
            production_kwh: 1.0,
            consumption_kwh: 1.0,
        }
    }

    #[test]
    fn dataset_sorts_stably_by_date() {
        let ds = Dataset::from_records(vec![
            rec(3, "A", "Solaire"),
            rec(1, "B", "Solaire"),
            rec(1, "A", "Batterie"),
        ]);
        let sites: Vec<_> = ds.records().iter().map(|r| (r.date.format("%d").to_string(), r.site.clone())).collect();
        assert_eq!(
            sites,
            vec![
                ("01".to_string(), "B".to_string()),
                ("01".to_string(), "A".to_string()),
                ("03".to_string(), "A".to_string()),
            ]
        );
        assert_eq!(ds.sites(), vec!["B", "A"]);
        assert_eq!(ds.energy_types(), vec!["Solaire", "Batterie"]);
    }

    #[test]
    fn criteria_rejects_inverted_range() {
        let start = NaiveDate::from_ymd_opt(2024, 3, 5).unwrap();
        let end = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        let err = FilterCriteria::new("A", start, end, ["Solaire"]).unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn bucket_keys_display() {
        let day = BucketKey::Day(NaiveDate::from_ymd_opt(2024, 1, 5).unwrap());
        assert_eq!(day.to_string(), "2024-01-05");
        assert_eq!(BucketKey::Week(3).to_string(), "W03");
        assert_eq!(BucketKey::Month { year: 2024, month: 2 }.to_string(), "2024-02");
    }

    #[test]
    fn low_efficiency_message_matches_dashboard_wording() {
        let alert = MaintenanceAlert::LowEfficiency {
            efficiency_ratio: 53.333,
            threshold: 70.0,
        };
        assert_eq!(alert.message(), "Rendement faible : 53.3 % (seuil 70 %)");
    }
}
