//! Report document: title, metric lines and a production/consumption chart.
//!
//! The document is built from computed values only, then rendered to a
//! self-contained HTML page with the chart embedded as inline SVG.

use std::fs;
use std::path::Path;

use chrono::{Duration, NaiveDate};
use plotters::prelude::*;

use crate::analysis::{raw_series, resample_daily};
use crate::app::pipeline::DashboardOutput;
use crate::domain::{DailyPoint, MetricsSnapshot};
use crate::error::AppError;

const CHART_SIZE: (u32, u32) = (900, 420);

/// Which series the report chart shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChartSeries {
    /// One point per calendar day, gaps filled with zero.
    Daily,
    /// One point per record.
    Raw,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MetricLine {
    pub label: &'static str,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReportDocument {
    pub title: String,
    pub site: String,
    pub period_start: NaiveDate,
    pub period_end: NaiveDate,
    pub lines: Vec<MetricLine>,
    pub chart: Vec<DailyPoint>,
}

/// The three headline metrics, formatted `{:.2} kWh`, `{:.2} kWh`, `{:.1} %`.
pub fn metric_lines(metrics: &MetricsSnapshot) -> Vec<MetricLine> {
    vec![
        MetricLine {
            label: "Production totale",
            value: format!("{:.2} kWh", metrics.total_production),
        },
        MetricLine {
            label: "Consommation totale",
            value: format!("{:.2} kWh", metrics.total_consumption),
        },
        MetricLine {
            label: "Rendement global",
            value: format!("{:.1} %", metrics.efficiency_ratio),
        },
    ]
}

pub fn build_report(output: &DashboardOutput, series: ChartSeries) -> ReportDocument {
    let site = output.criteria.site().to_string();
    let chart = match series {
        ChartSeries::Daily => resample_daily(output.view.records()),
        ChartSeries::Raw => raw_series(output.view.records()),
    };

    ReportDocument {
        title: format!("Rapport de performance - {site}"),
        site,
        period_start: output.criteria.date_start(),
        period_end: output.criteria.date_end(),
        lines: metric_lines(&output.metrics),
        chart,
    }
}

/// Render the report as a standalone HTML page.
pub fn render_html(doc: &ReportDocument) -> Result<String, AppError> {
    let svg = render_chart_svg(&doc.chart, CHART_SIZE)?;

    let mut out = String::new();
    out.push_str("<!DOCTYPE html>\n<html lang=\"fr\">\n<head>\n<meta charset=\"utf-8\">\n");
    out.push_str(&format!("<title>{}</title>\n", escape_html(&doc.title)));
    out.push_str(
        "<style>\n\
         @page { size: A4; margin: 2cm; }\n\
         body { font-family: sans-serif; color: #222; }\n\
         ul.metrics { list-style: none; padding: 0; font-size: 1.1em; }\n\
         figure { margin: 1.5em 0; page-break-inside: avoid; }\n\
         </style>\n</head>\n<body>\n",
    );
    out.push_str(&format!("<h1>{}</h1>\n", escape_html(&doc.title)));
    out.push_str(&format!(
        "<p>Période : {} au {}</p>\n",
        doc.period_start.format("%d/%m/%Y"),
        doc.period_end.format("%d/%m/%Y")
    ));

    out.push_str("<ul class=\"metrics\">\n");
    for line in &doc.lines {
        out.push_str(&format!("<li>{} : {}</li>\n", line.label, escape_html(&line.value)));
    }
    out.push_str("</ul>\n");

    out.push_str("<figure>\n");
    out.push_str(&svg);
    out.push_str("\n</figure>\n</body>\n</html>\n");
    Ok(out)
}

pub fn write_report_html(path: &Path, doc: &ReportDocument) -> Result<(), AppError> {
    let html = render_html(doc)?;
    fs::write(path, html)
        .map_err(|e| AppError::export(format!("Failed to write report '{}': {e}", path.display())))
}

/// Line chart of production vs consumption, as an SVG string.
pub fn render_chart_svg(points: &[DailyPoint], size: (u32, u32)) -> Result<String, AppError> {
    let mut svg = String::new();
    {
        let root = SVGBackend::with_string(&mut svg, size).into_drawing_area();
        root.fill(&WHITE).map_err(chart_error)?;

        if let Some(first) = points.first() {
            let origin = first.date;
            let xs: Vec<f64> = points.iter().map(|p| (p.date - origin).num_days() as f64).collect();

            let mut x0 = xs.iter().copied().fold(f64::INFINITY, f64::min);
            let mut x1 = xs.iter().copied().fold(f64::NEG_INFINITY, f64::max);
            if x1 <= x0 {
                x0 -= 1.0;
                x1 += 1.0;
            }

            let y_max = points
                .iter()
                .map(|p| p.production_kwh.max(p.consumption_kwh))
                .fold(0.0_f64, f64::max);
            let y1 = if y_max > 0.0 { y_max * 1.1 } else { 1.0 };

            let mut chart = ChartBuilder::on(&root)
                .caption("Production vs Consommation", ("sans-serif", 20))
                .margin(12)
                .x_label_area_size(40)
                .y_label_area_size(60)
                .build_cartesian_2d(x0..x1, 0.0..y1)
                .map_err(chart_error)?;

            chart
                .configure_mesh()
                .x_desc("Date")
                .y_desc("Énergie (kWh)")
                .x_labels(6)
                .y_labels(6)
                .x_label_formatter(&|v| day_offset_label(origin, *v))
                .y_label_formatter(&|v| format!("{v:.0}"))
                .draw()
                .map_err(chart_error)?;

            chart
                .draw_series(LineSeries::new(
                    xs.iter().zip(points).map(|(&x, p)| (x, p.production_kwh)),
                    &BLUE,
                ))
                .map_err(chart_error)?
                .label("Production")
                .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], &BLUE));

            chart
                .draw_series(LineSeries::new(
                    xs.iter().zip(points).map(|(&x, p)| (x, p.consumption_kwh)),
                    &RED,
                ))
                .map_err(chart_error)?
                .label("Consommation")
                .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], &RED));

            chart
                .configure_series_labels()
                .background_style(WHITE.mix(0.8))
                .border_style(BLACK)
                .draw()
                .map_err(chart_error)?;
        } else {
            root.draw(&Text::new(
                "Aucune donnée disponible pour les filtres sélectionnés.",
                (20, 30),
                ("sans-serif", 16).into_font(),
            ))
            .map_err(chart_error)?;
        }

        root.present().map_err(chart_error)?;
    }
    Ok(svg)
}

fn day_offset_label(origin: NaiveDate, offset: f64) -> String {
    origin
        .checked_add_signed(Duration::days(offset.round() as i64))
        .map(|d| d.format("%d/%m").to_string())
        .unwrap_or_default()
}

fn chart_error<E: std::fmt::Display>(e: E) -> AppError {
    AppError::export(format!("Chart rendering failed: {e}"))
}

fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(ch),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::pipeline::{run_dashboard, DashboardRequest};
    use crate::domain::{Dataset, FilterCriteria, Granularity, Record};

    fn rec(day: u32, kind: &str, prod: f64, cons: f64) -> Record {
        Record {
            date: NaiveDate::from_ymd_opt(2024, 7, day).unwrap(),
            site: "A".to_string(),
            energy_type: kind.to_string(),
            production_kwh: prod,
            consumption_kwh: cons,
        }
    }

    fn output() -> DashboardOutput {
        let ds = Dataset::from_records(vec![
            rec(1, "Solaire", 10.0, 5.0),
            rec(3, "Solaire", 20.0, 8.0),
            rec(3, "Batterie", 0.0, 3.0),
        ]);
        let criteria = FilterCriteria::new(
            "A",
            NaiveDate::from_ymd_opt(2024, 7, 1).unwrap(),
            NaiveDate::from_ymd_opt(2024, 7, 31).unwrap(),
            ["Solaire", "Batterie"],
        )
        .unwrap();
        let request = DashboardRequest {
            criteria,
            granularity: Granularity::Day,
            compare_sites: ["A".to_string()].into(),
        };
        run_dashboard(&ds, &request)
    }

    #[test]
    fn metric_lines_use_fixed_precision() {
        let lines = metric_lines(&output().metrics);
        let rendered: Vec<String> = lines.iter().map(|l| format!("{} : {}", l.label, l.value)).collect();
        assert_eq!(
            rendered,
            vec![
                "Production totale : 30.00 kWh",
                "Consommation totale : 16.00 kWh",
                "Rendement global : 53.3 %",
            ]
        );
    }

    #[test]
    fn daily_series_is_resampled_and_raw_is_not() {
        let out = output();
        let daily = build_report(&out, ChartSeries::Daily);
        assert_eq!(daily.chart.len(), 3);
        assert_eq!(daily.chart[1].production_kwh, 0.0);
        assert_eq!(daily.title, "Rapport de performance - A");

        let raw = build_report(&out, ChartSeries::Raw);
        assert_eq!(raw.chart.len(), 3);
        assert_eq!(raw.chart[1].date, NaiveDate::from_ymd_opt(2024, 7, 3).unwrap());
    }

    #[test]
    fn html_contains_metrics_and_chart() {
        let doc = build_report(&output(), ChartSeries::Daily);
        let html = render_html(&doc).unwrap();
        assert!(html.contains("<h1>Rapport de performance - A</h1>"));
        assert!(html.contains("<li>Rendement global : 53.3 %</li>"));
        assert!(html.contains("Période : 01/07/2024 au 31/07/2024"));
        assert!(html.contains("<svg"));
    }

    #[test]
    fn empty_chart_still_renders() {
        let svg = render_chart_svg(&[], (300, 200)).unwrap();
        assert!(svg.contains("<svg"));
    }

    #[test]
    fn titles_are_escaped() {
        assert_eq!(escape_html("A&B <x>"), "A&amp;B &lt;x&gt;");
    }
}
