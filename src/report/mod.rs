//! Reporting: terminal summaries and the exportable report document.
//!
//! Formatting lives here so the analysis code stays free of presentation and
//! output changes stay local to this module.

pub mod document;
pub mod format;

pub use document::{
    build_report, metric_lines, render_chart_svg, render_html, write_report_html, ChartSeries, MetricLine,
    ReportDocument,
};
pub use format::{format_alerts, format_dashboard, format_load_summary};
