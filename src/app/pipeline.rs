//! Shared dashboard pipeline used by both CLI and TUI front-ends.
//!
//! One explicit function per step, every value threaded through as an argument:
//! load -> resolve criteria -> filter -> {aggregate, metrics}
//!
//! The front-ends only decide how to present the resulting [`DashboardOutput`].

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use chrono::NaiveDate;
use log::debug;
use serde::Serialize;

use crate::analysis::{
    compute_metrics, consumption_series_by_type, default_criteria, filter, group_by_period, group_by_site,
    group_by_type, maintenance_alerts, resample_daily,
};
use crate::domain::{
    DailyPoint, DashboardConfig, Dataset, FilterCriteria, FilteredView, Granularity, MaintenanceAlert,
    MetricsSnapshot, PeriodBucket,
};
use crate::error::AppError;
use crate::io::ingest::{IngestedData, load_path};

/// A fully resolved dashboard selection.
#[derive(Debug, Clone, PartialEq)]
pub struct DashboardRequest {
    pub criteria: FilterCriteria,
    pub granularity: Granularity,
    pub compare_sites: BTreeSet<String>,
}

/// All computed outputs for one selection.
#[derive(Debug, Clone, Serialize)]
pub struct DashboardOutput {
    pub criteria: FilterCriteria,
    pub granularity: Granularity,
    pub matched_rows: usize,
    #[serde(skip)]
    pub view: FilteredView,
    pub metrics: MetricsSnapshot,
    pub alerts: Vec<MaintenanceAlert>,
    pub periods: Vec<PeriodBucket>,
    pub consumption_by_type: BTreeMap<String, f64>,
    pub consumption_by_site: BTreeMap<String, f64>,
    #[serde(skip)]
    pub daily: Vec<DailyPoint>,
    #[serde(skip)]
    pub type_series: BTreeMap<String, Vec<(NaiveDate, f64)>>,
}

/// Load a file and refuse to continue without any usable row.
pub fn load_dataset(path: &Path) -> Result<IngestedData, AppError> {
    let ingest = load_path(path)?;
    if ingest.dataset.is_empty() {
        return Err(AppError::empty_dataset(format!(
            "No usable rows in '{}' ({} read, {} with unparseable dates, {} invalid).",
            path.display(),
            ingest.report.rows_read,
            ingest.report.dropped_dates,
            ingest.report.row_errors.len()
        )));
    }
    Ok(ingest)
}

/// Check user options against the dataset and fill unset ones with defaults.
pub fn resolve_request(dataset: &Dataset, config: &DashboardConfig) -> Result<DashboardRequest, AppError> {
    let defaults = default_criteria(dataset)
        .ok_or_else(|| AppError::empty_dataset("The dataset has no usable rows."))?;
    let sites = dataset.sites();
    let types = dataset.energy_types();

    let site = match &config.site {
        Some(site) => {
            ensure_known("site", site, &sites)?;
            site.clone()
        }
        None => defaults.site().to_string(),
    };

    let energy_types = match &config.energy_types {
        Some(selected) => {
            for t in selected {
                ensure_known("energy type", t, &types)?;
            }
            selected.clone()
        }
        None => defaults.energy_types().iter().cloned().collect(),
    };

    let compare_sites = match &config.compare_sites {
        Some(selected) => {
            for s in selected {
                ensure_known("site", s, &sites)?;
            }
            selected.iter().cloned().collect()
        }
        None => sites.iter().cloned().collect(),
    };

    let criteria = FilterCriteria::new(
        site,
        config.date_from.unwrap_or(defaults.date_start()),
        config.date_to.unwrap_or(defaults.date_end()),
        energy_types,
    )?;

    Ok(DashboardRequest {
        criteria,
        granularity: config.granularity,
        compare_sites,
    })
}

/// Run filter, aggregation and metrics for one selection.
pub fn run_dashboard(dataset: &Dataset, request: &DashboardRequest) -> DashboardOutput {
    let view = filter(dataset.records(), &request.criteria);
    debug!(
        "view: {} of {} records (site={}, {}..{})",
        view.len(),
        dataset.len(),
        request.criteria.site(),
        request.criteria.date_start(),
        request.criteria.date_end()
    );

    let metrics = compute_metrics(view.records());
    let alerts = maintenance_alerts(&metrics);
    let periods = group_by_period(view.records(), request.granularity);
    let consumption_by_type = group_by_type(view.records());
    let consumption_by_site = group_by_site(dataset.records(), &request.compare_sites);
    let daily = resample_daily(view.records());
    let type_series = consumption_series_by_type(view.records());
    debug!("{} {} bucket(s), {} alert(s)", periods.len(), request.granularity.label(), alerts.len());

    DashboardOutput {
        criteria: request.criteria.clone(),
        granularity: request.granularity,
        matched_rows: view.len(),
        view,
        metrics,
        alerts,
        periods,
        consumption_by_type,
        consumption_by_site,
        daily,
        type_series,
    }
}

fn ensure_known(what: &str, value: &str, available: &[String]) -> Result<(), AppError> {
    if available.iter().any(|a| a == value) {
        Ok(())
    } else {
        Err(AppError::usage(format!(
            "Unknown {what} '{value}'. Available: {}.",
            available.join(", ")
        )))
    }
}
