//! Plain-text rendering of a dashboard run for the terminal.

use std::collections::BTreeMap;
use std::path::Path;

use crate::app::pipeline::DashboardOutput;
use crate::domain::{Granularity, MaintenanceAlert, PeriodBucket};
use crate::io::ingest::IngestedData;
use crate::report::document::metric_lines;

/// What the loader kept and dropped.
pub fn format_load_summary(path: &Path, ingest: &IngestedData) -> String {
    let report = &ingest.report;
    let mut out = String::new();
    out.push_str(&format!(
        "Fichier: {} | lignes lues={} utilisées={} dates invalides={} erreurs={}\n",
        path.display(),
        report.rows_read,
        ingest.rows_used(),
        report.dropped_dates,
        report.row_errors.len()
    ));
    for err in report.row_errors.iter().take(5) {
        out.push_str(&format!("  ligne {}: {}\n", err.line, err.message));
    }
    if report.row_errors.len() > 5 {
        out.push_str(&format!("  ... et {} autre(s)\n", report.row_errors.len() - 5));
    }
    out
}

/// Header, metric lines and every table of one run.
pub fn format_dashboard(output: &DashboardOutput) -> String {
    let criteria = &output.criteria;
    let mut out = String::new();

    out.push_str("=== solar-dash - Tableau de bord énergétique ===\n");
    out.push_str(&format!("Site: {}\n", criteria.site()));
    out.push_str(&format!(
        "Période: {} au {}\n",
        criteria.date_start().format("%d/%m/%Y"),
        criteria.date_end().format("%d/%m/%Y")
    ));
    let types: Vec<&str> = criteria.energy_types().iter().map(String::as_str).collect();
    out.push_str(&format!("Types: {}\n", if types.is_empty() { "-".to_string() } else { types.join(", ") }));
    out.push_str(&format!("Lignes: {}\n\n", output.matched_rows));

    for line in metric_lines(&output.metrics) {
        out.push_str(&format!("{} : {}\n", line.label, line.value));
    }
    if output.view.is_empty() {
        out.push_str("\nAucune donnée pour les filtres sélectionnés.\n");
    }

    out.push_str(&format!("\nPar période ({}):\n", output.granularity.label()));
    out.push_str(&format_period_table(&output.periods, output.granularity));

    out.push_str("\nConsommation par type:\n");
    out.push_str(&format_total_table("Type", &output.consumption_by_type));

    out.push_str("\nComparaison des sites:\n");
    out.push_str(&format_total_table("Site", &output.consumption_by_site));

    out.push('\n');
    out.push_str(&format_alerts(&output.alerts));
    out
}

pub fn format_alerts(alerts: &[MaintenanceAlert]) -> String {
    let mut out = String::from("Maintenance:\n");
    if alerts.is_empty() {
        out.push_str("- Aucune alerte.\n");
    }
    for alert in alerts {
        out.push_str(&format!("- {}\n", alert.message()));
    }
    out
}

fn format_period_table(buckets: &[PeriodBucket], granularity: Granularity) -> String {
    let mut out = String::new();
    push_line(
        &mut out,
        format!("{:<12} {:>16} {:>16}", granularity.label(), "Production_kWh", "Consommation_kWh"),
    );
    push_line(&mut out, format!("{:-<12} {:-<16} {:-<16}", "", "", ""));
    for b in buckets {
        push_line(
            &mut out,
            format!(
                "{:<12} {:>16.2} {:>16.2}",
                b.key.to_string(),
                b.totals.production_kwh,
                b.totals.consumption_kwh
            ),
        );
    }
    out
}

fn format_total_table(label: &str, totals: &BTreeMap<String, f64>) -> String {
    let grand: f64 = totals.values().sum();
    let mut out = String::new();
    push_line(&mut out, format!("{:<20} {:>16} {:>7}", label, "Consommation_kWh", "Part"));
    push_line(&mut out, format!("{:-<20} {:-<16} {:-<7}", "", "", ""));
    for (name, value) in totals {
        let share = if grand > 0.0 { value / grand * 100.0 } else { 0.0 };
        push_line(
            &mut out,
            format!("{:<20} {:>16.2} {:>5.1} %", truncate(name, 20), value, share),
        );
    }
    out
}

fn push_line(out: &mut String, line: String) {
    out.push_str(line.trim_end());
    out.push('\n');
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut out: String = s.chars().take(max.saturating_sub(1)).collect();
    out.push('.');
    out
}
