//! Ratatui-based terminal dashboard.
//!
//! Four tabs over one filtered view (Performance, Consommation, Comparaison,
//! Maintenance) and a settings panel for the site, the date range, the energy
//! types, the period and the compared sites. Every settings change re-runs the
//! shared pipeline from the loaded dataset.

use std::collections::BTreeSet;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{Datelike, NaiveDate};
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use log::info;
use plotters::style::RGBColor;
use ratatui::{
    backend::CrosstermBackend,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span, Text},
    widgets::{BarChart, Block, Borders, Clear, List, ListItem, ListState, Paragraph, Tabs},
    Terminal,
};

use crate::app::pipeline::{self, DashboardOutput, DashboardRequest};
use crate::cli::DashboardArgs;
use crate::domain::{Dataset, FilterCriteria, Granularity};
use crate::error::AppError;
use crate::io::export::write_view_csv;
use crate::report::{build_report, metric_lines, write_report_html, ChartSeries};

mod plotters_chart;

use plotters_chart::{ChartLine, SeriesChart};

/// Start the TUI.
pub fn run(args: &DashboardArgs) -> Result<(), AppError> {
    // Resolve and load before touching the terminal so the picker and any
    // loader error print normally.
    let path = crate::app::resolve_input(args.file.clone())?;
    let ingest = pipeline::load_dataset(&path)?;
    let request = pipeline::resolve_request(&ingest.dataset, &args.config())?;
    info!("opening dashboard on {} ({} row(s))", path.display(), ingest.rows_used());
    let status = load_status(ingest.rows_used(), ingest.report.rows_dropped());
    let mut app = App::new(path, ingest.dataset, request);
    app.status = status;

    let _guard = TerminalGuard::new()?;

    let backend = CrosstermBackend::new(io::stdout());
    let mut terminal =
        Terminal::new(backend).map_err(|e| AppError::terminal(format!("Failed to initialize terminal: {e}")))?;

    app.event_loop(&mut terminal)
}

fn load_status(used: usize, dropped: usize) -> String {
    format!("{used} ligne(s) chargée(s), {dropped} ignorée(s)")
}

/// Ensures the terminal is restored (raw mode, alternate screen) on exit.
struct TerminalGuard;

impl TerminalGuard {
    fn new() -> Result<Self, AppError> {
        enable_raw_mode().map_err(|e| AppError::terminal(format!("Failed to enable raw mode: {e}")))?;
        if let Err(e) = execute!(io::stdout(), EnterAlternateScreen) {
            let _ = disable_raw_mode();
            return Err(AppError::terminal(format!("Failed to enter alternate screen: {e}")));
        }
        Ok(Self)
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Tab {
    Performance,
    Consumption,
    Comparison,
    Maintenance,
}

impl Tab {
    const ALL: [Tab; 4] = [Tab::Performance, Tab::Consumption, Tab::Comparison, Tab::Maintenance];

    fn title(self) -> &'static str {
        match self {
            Tab::Performance => "Performance",
            Tab::Consumption => "Consommation",
            Tab::Comparison => "Comparaison",
            Tab::Maintenance => "Maintenance",
        }
    }

    fn index(self) -> usize {
        Tab::ALL.iter().position(|t| *t == self).unwrap_or(0)
    }

    fn next(self) -> Self {
        Tab::ALL[(self.index() + 1) % Tab::ALL.len()]
    }

    fn prev(self) -> Self {
        Tab::ALL[(self.index() + Tab::ALL.len() - 1) % Tab::ALL.len()]
    }
}

/// Settings rows, in display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Site,
    Start,
    End,
    Types,
    Period,
    Compare,
}

const FIELDS: [Field; 6] = [
    Field::Site,
    Field::Start,
    Field::End,
    Field::Types,
    Field::Period,
    Field::Compare,
];

const PALETTE: [RGBColor; 6] = [
    RGBColor(0, 255, 255),
    RGBColor(255, 215, 0),
    RGBColor(255, 0, 255),
    RGBColor(0, 255, 0),
    RGBColor(255, 80, 80),
    RGBColor(100, 149, 237),
];

struct App {
    path: PathBuf,
    export_dir: PathBuf,
    dataset: Dataset,
    sites: Vec<String>,
    types: Vec<String>,
    bounds: (NaiveDate, NaiveDate),

    tab: Tab,
    selected_field: usize,
    type_cursor: usize,
    compare_cursor: usize,

    site: String,
    date_start: NaiveDate,
    date_end: NaiveDate,
    selected_types: BTreeSet<String>,
    granularity: Granularity,
    compare_sites: BTreeSet<String>,

    status: String,
    output: DashboardOutput,
}

impl App {
    fn new(path: PathBuf, dataset: Dataset, request: DashboardRequest) -> Self {
        let output = pipeline::run_dashboard(&dataset, &request);
        let sites = dataset.sites();
        let types = dataset.energy_types();
        let bounds = dataset
            .date_range()
            .unwrap_or((request.criteria.date_start(), request.criteria.date_end()));

        Self {
            path,
            export_dir: PathBuf::from("."),
            sites,
            types,
            bounds,
            tab: Tab::Performance,
            selected_field: 0,
            type_cursor: 0,
            compare_cursor: 0,
            site: request.criteria.site().to_string(),
            date_start: request.criteria.date_start(),
            date_end: request.criteria.date_end(),
            selected_types: request.criteria.energy_types().clone(),
            granularity: request.granularity,
            compare_sites: request.compare_sites,
            status: String::new(),
            output,
            dataset,
        }
    }

    fn event_loop<B: ratatui::backend::Backend>(&mut self, terminal: &mut Terminal<B>) -> Result<(), AppError> {
        let mut needs_redraw = true;
        loop {
            if needs_redraw {
                terminal
                    .draw(|f| self.draw(f))
                    .map_err(|e| AppError::terminal(format!("Terminal draw error: {e}")))?;
                needs_redraw = false;
            }

            if !event::poll(Duration::from_millis(100))
                .map_err(|e| AppError::terminal(format!("Event poll error: {e}")))?
            {
                continue;
            }

            match event::read().map_err(|e| AppError::terminal(format!("Event read error: {e}")))? {
                Event::Key(key) => {
                    if key.kind != KeyEventKind::Press {
                        continue;
                    }
                    if self.handle_key(key.code) {
                        break;
                    }
                    needs_redraw = true;
                }
                Event::Resize(_, _) => {
                    needs_redraw = true;
                }
                _ => {}
            }
        }
        Ok(())
    }

    /// Apply one key press. Returns `true` when the user asked to quit.
    fn handle_key(&mut self, code: KeyCode) -> bool {
        match code {
            KeyCode::Char('q') | KeyCode::Esc => return true,
            KeyCode::Tab => self.tab = self.tab.next(),
            KeyCode::BackTab => self.tab = self.tab.prev(),
            KeyCode::Char(c @ '1'..='4') => {
                let idx = c as usize - '1' as usize;
                self.tab = Tab::ALL[idx];
            }
            KeyCode::Up => self.selected_field = self.selected_field.saturating_sub(1),
            KeyCode::Down => self.selected_field = (self.selected_field + 1).min(FIELDS.len() - 1),
            KeyCode::Left => self.adjust_field(-1),
            KeyCode::Right => self.adjust_field(1),
            KeyCode::Char(' ') | KeyCode::Enter => self.toggle_item(),
            KeyCode::Char('r') => self.reset_filters(),
            KeyCode::Char('e') => self.export(),
            _ => {}
        }
        false
    }

    fn field(&self) -> Field {
        FIELDS[self.selected_field.min(FIELDS.len() - 1)]
    }

    fn adjust_field(&mut self, delta: i64) {
        match self.field() {
            Field::Site => {
                if let Some(pos) = self.sites.iter().position(|s| *s == self.site) {
                    let next = step_index(pos, self.sites.len(), delta);
                    self.site = self.sites[next].clone();
                }
            }
            Field::Start => {
                self.date_start = shift_day(self.date_start, delta, self.bounds.0, self.date_end);
            }
            Field::End => {
                self.date_end = shift_day(self.date_end, delta, self.date_start, self.bounds.1);
            }
            Field::Types => {
                self.type_cursor = step_index(self.type_cursor, self.types.len(), delta);
                return;
            }
            Field::Period => {
                self.granularity = if delta >= 0 {
                    self.granularity.next()
                } else {
                    self.granularity.prev()
                };
            }
            Field::Compare => {
                self.compare_cursor = step_index(self.compare_cursor, self.sites.len(), delta);
                return;
            }
        }
        self.recompute();
    }

    fn toggle_item(&mut self) {
        let changed = match self.field() {
            Field::Types => toggle(&mut self.selected_types, self.types.get(self.type_cursor)),
            Field::Compare => toggle(&mut self.compare_sites, self.sites.get(self.compare_cursor)),
            _ => false,
        };
        if changed {
            self.recompute();
        }
    }

    fn reset_filters(&mut self) {
        self.site = self.sites.first().cloned().unwrap_or_default();
        (self.date_start, self.date_end) = self.bounds;
        self.selected_types = self.types.iter().cloned().collect();
        self.compare_sites = self.sites.iter().cloned().collect();
        self.recompute();
        self.status = "Filtres réinitialisés.".to_string();
    }

    fn recompute(&mut self) {
        let criteria = match FilterCriteria::new(
            self.site.clone(),
            self.date_start,
            self.date_end,
            self.selected_types.iter().cloned(),
        ) {
            Ok(c) => c,
            Err(err) => {
                self.status = err.to_string();
                return;
            }
        };
        let request = DashboardRequest {
            criteria,
            granularity: self.granularity,
            compare_sites: self.compare_sites.clone(),
        };
        self.output = pipeline::run_dashboard(&self.dataset, &request);
        self.status = if self.output.view.is_empty() {
            "Aucune donnée pour les filtres sélectionnés.".to_string()
        } else {
            format!("{} ligne(s) sélectionnée(s)", self.output.matched_rows)
        };
    }

    /// Write the tabular export and the report for the current view.
    fn export(&mut self) {
        let (csv_path, report_path) = export_paths(&self.export_dir, &self.site);

        let result = write_view_csv(&csv_path, self.output.view.records()).and_then(|()| {
            let doc = build_report(&self.output, ChartSeries::Daily);
            write_report_html(&report_path, &doc)
        });
        self.status = match result {
            Ok(()) => format!("Exporté: {} + {}", csv_path.display(), report_path.display()),
            Err(err) => format!("Export échoué: {err}"),
        };
    }

    fn draw(&mut self, frame: &mut ratatui::Frame<'_>) {
        let size = frame.area();
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(3), Constraint::Min(0), Constraint::Length(3)])
            .split(size);

        self.draw_header(frame, chunks[0]);
        self.draw_body(frame, chunks[1]);
        self.draw_footer(frame, chunks[2]);
    }

    fn draw_header(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let titles: Vec<Line> = Tab::ALL
            .iter()
            .enumerate()
            .map(|(i, t)| Line::from(format!("{} {}", i + 1, t.title())))
            .collect();
        let tabs = Tabs::new(titles)
            .select(self.tab.index())
            .highlight_style(Style::default().fg(Color::Black).bg(Color::Cyan))
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .title(format!("solar-dash | {}", crate::cli::picker::pretty_path(&self.path))),
            );
        frame.render_widget(tabs, area);
    }

    fn draw_body(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let chunks = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Min(0), Constraint::Length(36)])
            .split(area);

        match self.tab {
            Tab::Performance => self.draw_performance(frame, chunks[0]),
            Tab::Consumption => self.draw_consumption(frame, chunks[0]),
            Tab::Comparison => self.draw_comparison(frame, chunks[0]),
            Tab::Maintenance => self.draw_maintenance(frame, chunks[0]),
        }
        self.draw_settings(frame, chunks[1]);
    }

    fn draw_performance(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(6), Constraint::Min(0)])
            .split(area);

        let mut lines: Vec<Line> = metric_lines(&self.output.metrics)
            .into_iter()
            .map(|m| {
                Line::from(vec![
                    Span::styled(format!("{:<20}", m.label), Style::default().fg(Color::Gray)),
                    Span::styled(m.value, Style::default().add_modifier(Modifier::BOLD)),
                ])
            })
            .collect();
        if self.output.view.is_empty() {
            lines.push(Line::from(Span::styled(
                "Aucune donnée pour les filtres sélectionnés.",
                Style::default().fg(Color::Yellow),
            )));
        }
        let p = Paragraph::new(Text::from(lines)).block(Block::default().title("Indicateurs").borders(Borders::ALL));
        frame.render_widget(p, chunks[0]);

        let chart_lines = performance_lines(&self.output);
        self.draw_series_chart(frame, chunks[1], "Production vs Consommation (kWh/jour)", &chart_lines);
    }

    fn draw_consumption(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let chunks = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Length(34), Constraint::Min(0)])
            .split(area);

        let chart_lines = type_lines(&self.output);
        let items: Vec<ListItem> = self
            .output
            .consumption_by_type
            .iter()
            .map(|(kind, total)| {
                let color = chart_lines
                    .iter()
                    .find(|l| l.label == *kind)
                    .map(ChartLine::tui_color)
                    .unwrap_or(Color::Gray);
                ListItem::new(Line::from(vec![
                    Span::styled("■ ", Style::default().fg(color)),
                    Span::raw(format!("{kind:<14} {total:>10.2}")),
                ]))
            })
            .collect();
        let list = List::new(items).block(Block::default().title("Total par type (kWh)").borders(Borders::ALL));
        frame.render_widget(list, chunks[0]);

        self.draw_series_chart(frame, chunks[1], "Consommation par type (kWh/jour)", &chart_lines);
    }

    fn draw_comparison(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let block = Block::default()
            .title("Consommation totale par site (kWh, toutes dates et types)")
            .borders(Borders::ALL);

        if self.output.consumption_by_site.is_empty() {
            let p = Paragraph::new("Aucun site sélectionné.")
                .style(Style::default().fg(Color::Yellow))
                .block(block);
            frame.render_widget(p, area);
            return;
        }

        let bars: Vec<(String, u64)> = self
            .output
            .consumption_by_site
            .iter()
            .map(|(site, total)| (site.clone(), total.round().max(0.0) as u64))
            .collect();
        let data: Vec<(&str, u64)> = bars.iter().map(|(s, v)| (s.as_str(), *v)).collect();
        let chart = BarChart::default()
            .block(block)
            .data(data.as_slice())
            .bar_width(12)
            .bar_gap(2)
            .bar_style(Style::default().fg(Color::Cyan))
            .value_style(Style::default().fg(Color::Black).bg(Color::Cyan));
        frame.render_widget(chart, area);
    }

    fn draw_maintenance(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(7), Constraint::Min(0)])
            .split(area);

        let m = &self.output.metrics;
        let mut lines = vec![Line::from(format!("Rendement global: {:.1} %", m.efficiency_ratio))];
        lines.push(Line::from(match m.battery_load_ratio {
            Some(ratio) => format!("Part batterie de la consommation: {:.1} %", ratio * 100.0),
            None => "Part batterie de la consommation: - (aucune donnée Batterie)".to_string(),
        }));
        lines.push(Line::from(""));
        if self.output.alerts.is_empty() {
            lines.push(Line::from(Span::styled(
                "Aucune alerte.",
                Style::default().fg(Color::Green),
            )));
        }
        for alert in &self.output.alerts {
            lines.push(Line::from(Span::styled(
                format!("⚠ {}", alert.message()),
                Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
            )));
        }
        let p = Paragraph::new(Text::from(lines)).block(Block::default().title("Alertes").borders(Borders::ALL));
        frame.render_widget(p, chunks[0]);

        let mut rows = vec![Line::from(Span::styled(
            format!("{:<12} {:>14} {:>14}", self.granularity.label(), "Production", "Consommation"),
            Style::default().fg(Color::Gray),
        ))];
        for b in &self.output.periods {
            rows.push(Line::from(format!(
                "{:<12} {:>14.2} {:>14.2}",
                b.key.to_string(),
                b.totals.production_kwh,
                b.totals.consumption_kwh
            )));
        }
        let table = Paragraph::new(Text::from(rows))
            .block(Block::default().title("Par période (kWh)").borders(Borders::ALL));
        frame.render_widget(table, chunks[1]);
    }

    fn draw_series_chart(&self, frame: &mut ratatui::Frame<'_>, area: Rect, title: &str, lines: &[ChartLine]) {
        let legend: Vec<Span> = lines
            .iter()
            .flat_map(|l| {
                [
                    Span::styled(" ■ ", Style::default().fg(l.tui_color())),
                    Span::raw(l.label.clone()),
                ]
            })
            .collect();
        let mut title_spans = vec![Span::raw(format!("{title} "))];
        title_spans.extend(legend);
        let block = Block::default().title(Line::from(title_spans)).borders(Borders::ALL);
        let inner = block.inner(area);
        frame.render_widget(block, area);
        frame.render_widget(Clear, inner);

        let Some((x_bounds, y_bounds)) = chart_bounds(lines) else {
            let msg = Paragraph::new("Aucune donnée à afficher.").style(Style::default().fg(Color::Yellow));
            frame.render_widget(msg, inner);
            return;
        };

        let (chart_rect, insets) = chart_layout(inner);
        let widget = SeriesChart {
            lines,
            x_bounds,
            y_bounds,
            x_label: "date",
            y_label: "kWh",
            fmt_x: fmt_axis_day,
            fmt_y: fmt_axis_kwh,
        };
        frame.render_widget(widget, chart_rect);
        if let Some(insets) = insets {
            draw_axis_ticks(frame, inner, chart_rect, insets, x_bounds, y_bounds);
        }
    }

    fn draw_settings(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(8), Constraint::Min(0)])
            .split(area);

        let items = vec![
            ListItem::new(format!("Site: {}", self.site)),
            ListItem::new(format!("Début: {}", self.date_start.format("%d/%m/%Y"))),
            ListItem::new(format!("Fin: {}", self.date_end.format("%d/%m/%Y"))),
            ListItem::new(format!("Types: {}/{}", self.selected_types.len(), self.types.len())),
            ListItem::new(format!("Période: {}", self.granularity.label())),
            ListItem::new(format!("Comparaison: {}/{}", self.compare_sites.len(), self.sites.len())),
        ];
        let list = List::new(items)
            .block(Block::default().title("Filtres").borders(Borders::ALL))
            .highlight_style(Style::default().fg(Color::Black).bg(Color::White))
            .highlight_symbol("» ");
        let mut state = ListState::default();
        state.select(Some(self.selected_field));
        frame.render_stateful_widget(list, chunks[0], &mut state);

        // Checklist for the multi-select fields.
        let (title, options, selected, cursor) = match self.field() {
            Field::Compare => ("Sites comparés", &self.sites, &self.compare_sites, self.compare_cursor),
            _ => ("Types d'énergie", &self.types, &self.selected_types, self.type_cursor),
        };
        let active = matches!(self.field(), Field::Types | Field::Compare);
        let items: Vec<ListItem> = options
            .iter()
            .enumerate()
            .map(|(i, opt)| {
                let mark = if selected.contains(opt) { "[x]" } else { "[ ]" };
                let style = if active && i == cursor {
                    Style::default().fg(Color::Black).bg(Color::White)
                } else {
                    Style::default()
                };
                ListItem::new(Span::styled(format!("{mark} {opt}"), style))
            })
            .collect();
        frame.render_widget(
            List::new(items).block(Block::default().title(title).borders(Borders::ALL)),
            chunks[1],
        );
    }

    fn draw_footer(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let help = "Tab onglet  ↑/↓ filtre  ←/→ modifier  Espace cocher  r reset  e export  q quitter";
        let line = Line::from(vec![
            Span::styled(help, Style::default().fg(Color::Gray)),
            Span::raw(" | "),
            Span::styled(&self.status, Style::default().fg(Color::Yellow)),
        ]);
        let p = Paragraph::new(line).block(Block::default().borders(Borders::ALL));
        frame.render_widget(p, area);
    }
}

fn step_index(current: usize, len: usize, delta: i64) -> usize {
    if len == 0 {
        return 0;
    }
    (current as i64 + delta).rem_euclid(len as i64) as usize
}

/// Move `date` by `delta` days, staying within `[lo, hi]`.
fn shift_day(date: NaiveDate, delta: i64, lo: NaiveDate, hi: NaiveDate) -> NaiveDate {
    let moved = date
        .checked_add_signed(chrono::Duration::days(delta))
        .unwrap_or(date);
    moved.clamp(lo, hi.max(lo))
}

fn toggle(set: &mut BTreeSet<String>, item: Option<&String>) -> bool {
    let Some(item) = item else {
        return false;
    };
    if !set.remove(item) {
        set.insert(item.clone());
    }
    true
}

fn file_stem_for(site: &str) -> String {
    site.chars()
        .map(|c| if c.is_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect()
}

fn day_x(date: NaiveDate) -> f64 {
    date.num_days_from_ce() as f64
}

/// Daily production and consumption of the view.
fn performance_lines(output: &DashboardOutput) -> Vec<ChartLine> {
    if output.daily.is_empty() {
        return Vec::new();
    }
    vec![
        ChartLine {
            label: "Production".to_string(),
            color: PALETTE[0],
            points: output.daily.iter().map(|p| (day_x(p.date), p.production_kwh)).collect(),
        },
        ChartLine {
            label: "Consommation".to_string(),
            color: PALETTE[4],
            points: output.daily.iter().map(|p| (day_x(p.date), p.consumption_kwh)).collect(),
        },
    ]
}

/// One consumption line per energy type.
fn type_lines(output: &DashboardOutput) -> Vec<ChartLine> {
    output
        .type_series
        .iter()
        .enumerate()
        .map(|(i, (kind, series))| ChartLine {
            label: kind.clone(),
            color: PALETTE[i % PALETTE.len()],
            points: series.iter().map(|&(d, v)| (day_x(d), v)).collect(),
        })
        .collect()
}

/// X/Y bounds covering every line, or `None` when there is nothing to plot.
fn chart_bounds(lines: &[ChartLine]) -> Option<([f64; 2], [f64; 2])> {
    let mut x = [f64::INFINITY, f64::NEG_INFINITY];
    let mut y_max = 0.0_f64;
    for &(px, py) in lines.iter().flat_map(|l| l.points.iter()) {
        x[0] = x[0].min(px);
        x[1] = x[1].max(px);
        y_max = y_max.max(py);
    }
    if !x[0].is_finite() {
        return None;
    }
    if x[1] <= x[0] {
        x = [x[0] - 1.0, x[1] + 1.0];
    }
    let y_top = if y_max > 0.0 { y_max * 1.05 } else { 1.0 };
    Some((x, [0.0, y_top]))
}

fn fmt_axis_day(v: f64) -> String {
    NaiveDate::from_num_days_from_ce_opt(v.round() as i32)
        .map(|d| d.format("%d/%m").to_string())
        .unwrap_or_default()
}

fn fmt_axis_kwh(v: f64) -> String {
    format!("{v:.0}")
}

#[derive(Debug, Clone, Copy)]
struct AxisInsets {
    left: u16,
    right: u16,
    top: u16,
    bottom: u16,
}

fn chart_layout(inner: Rect) -> (Rect, Option<AxisInsets>) {
    let insets = AxisInsets {
        left: 8,
        right: 2,
        top: 1,
        bottom: 2,
    };

    if inner.width <= insets.left + insets.right + 10 || inner.height <= insets.top + insets.bottom + 5 {
        return (inner, None);
    }

    let rect = Rect {
        x: inner.x + insets.left,
        y: inner.y + insets.top,
        width: inner.width - insets.left - insets.right,
        height: inner.height - insets.top - insets.bottom,
    };

    (rect, Some(insets))
}

fn draw_axis_ticks(
    frame: &mut ratatui::Frame<'_>,
    inner: Rect,
    chart: Rect,
    insets: AxisInsets,
    x_bounds: [f64; 2],
    y_bounds: [f64; 2],
) {
    let ticks = 5usize;
    let style = Style::default().fg(Color::Gray);

    for i in 0..ticks {
        let u = i as f64 / (ticks as f64 - 1.0);
        let x_val = x_bounds[0] + u * (x_bounds[1] - x_bounds[0]);
        let x = chart.x + ((chart.width - 1) as f64 * u).round() as u16;
        let label = fmt_axis_day(x_val);
        let label_len = label.len() as u16;
        let start = x.saturating_sub(label_len / 2);
        let y = chart.y + chart.height;
        if y >= inner.y + inner.height - 1 {
            continue;
        }
        frame.render_widget(
            Paragraph::new(label).style(style),
            Rect {
                x: start,
                y,
                width: label_len,
                height: 1,
            },
        );
    }

    for i in 0..ticks {
        let u = i as f64 / (ticks as f64 - 1.0);
        let y_val = y_bounds[0] + u * (y_bounds[1] - y_bounds[0]);
        let y = chart.y + (chart.height - 1) - ((chart.height - 1) as f64 * u).round() as u16;
        let label = fmt_axis_kwh(y_val);
        let label_len = label.len() as u16;
        let x = inner.x + insets.left.saturating_sub(1);
        let start = x.saturating_sub(label_len);
        if start < inner.x {
            continue;
        }
        frame.render_widget(
            Paragraph::new(label).style(style),
            Rect {
                x: start,
                y,
                width: label_len,
                height: 1,
            },
        );
    }

    let x_label = Paragraph::new("date")
        .alignment(Alignment::Center)
        .style(Style::default().fg(Color::Gray));
    let x_rect = Rect {
        x: chart.x,
        y: chart.y + chart.height + 1,
        width: chart.width,
        height: 1,
    };
    if x_rect.y < inner.y + inner.height {
        frame.render_widget(x_label, x_rect);
    }

    let y_label = Paragraph::new("kWh").style(Style::default().fg(Color::Gray).add_modifier(Modifier::BOLD));
    let y_rect = Rect {
        x: inner.x,
        y: inner.y,
        width: insets.left.saturating_sub(1),
        height: 1,
    };
    frame.render_widget(y_label, y_rect);
}

fn export_paths(dir: &Path, site: &str) -> (PathBuf, PathBuf) {
    let stem = file_stem_for(site);
    (
        dir.join(format!("export_{stem}.csv")),
        dir.join(format!("rapport_{stem}.html")),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::DashboardConfig;
    use crate::io::ingest::load_csv_str;

    const CSV: &str = "\
Date,Site,Type_Energie,Production_kWh,Consommation_kWh
01/04/2024,Nord,Solaire,10,5
02/04/2024,Nord,Batterie,0,3
02/04/2024,Sud,Solaire,8,2
04/04/2024,Nord,Solaire,20,8
";

    fn app() -> App {
        let ds = load_csv_str(CSV).unwrap().dataset;
        let request = pipeline::resolve_request(&ds, &DashboardConfig::default()).unwrap();
        App::new(PathBuf::from("test.csv"), ds, request)
    }

    fn ymd(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 4, d).unwrap()
    }

    #[test]
    fn load_status_counts_dropped_rows() {
        let ingest = load_csv_str(&format!("{CSV}31/02/2024,Nord,Solaire,1,1\n")).unwrap();
        let status = load_status(ingest.rows_used(), ingest.report.rows_dropped());
        assert_eq!(status, "4 ligne(s) chargée(s), 1 ignorée(s)");
    }

    #[test]
    fn tabs_cycle_both_ways() {
        let mut app = app();
        assert!(!app.handle_key(KeyCode::Tab));
        assert_eq!(app.tab, Tab::Consumption);
        app.handle_key(KeyCode::BackTab);
        app.handle_key(KeyCode::BackTab);
        assert_eq!(app.tab, Tab::Maintenance);
        app.handle_key(KeyCode::Char('3'));
        assert_eq!(app.tab, Tab::Comparison);
    }

    #[test]
    fn quit_keys() {
        let mut app = app();
        assert!(app.handle_key(KeyCode::Char('q')));
        assert!(app.handle_key(KeyCode::Esc));
    }

    #[test]
    fn site_change_reruns_pipeline() {
        let mut app = app();
        assert_eq!(app.output.matched_rows, 3);
        app.handle_key(KeyCode::Right);
        assert_eq!(app.site, "Sud");
        assert_eq!(app.output.matched_rows, 1);
        assert_eq!(app.output.metrics.total_production, 8.0);
    }

    #[test]
    fn dates_stay_in_bounds_and_ordered() {
        let mut app = app();
        app.handle_key(KeyCode::Down); // Start
        app.handle_key(KeyCode::Left);
        assert_eq!(app.date_start, ymd(1));
        for _ in 0..10 {
            app.handle_key(KeyCode::Right);
        }
        assert_eq!(app.date_start, ymd(4));
        assert_eq!(app.output.matched_rows, 1);

        app.handle_key(KeyCode::Down); // End
        app.handle_key(KeyCode::Left);
        assert_eq!(app.date_end, ymd(4));
    }

    #[test]
    fn unchecking_every_type_empties_the_view() {
        let mut app = app();
        for _ in 0..3 {
            app.handle_key(KeyCode::Down);
        }
        app.handle_key(KeyCode::Char(' '));
        app.handle_key(KeyCode::Right);
        app.handle_key(KeyCode::Char(' '));
        assert!(app.selected_types.is_empty());
        assert!(app.output.view.is_empty());
        assert_eq!(app.output.metrics.total_production, 0.0);
        assert!(app.status.contains("Aucune donnée"));

        app.handle_key(KeyCode::Char('r'));
        assert_eq!(app.output.matched_rows, 3);
    }

    #[test]
    fn period_cycles() {
        let mut app = app();
        for _ in 0..4 {
            app.handle_key(KeyCode::Down);
        }
        app.handle_key(KeyCode::Right);
        assert_eq!(app.granularity, Granularity::Week);
        assert_eq!(app.output.periods.len(), 1);
    }

    #[test]
    fn comparison_toggle_drops_site() {
        let mut app = app();
        for _ in 0..5 {
            app.handle_key(KeyCode::Down);
        }
        app.handle_key(KeyCode::Char(' '));
        assert_eq!(app.output.consumption_by_site.len(), 1);
        assert!(app.output.consumption_by_site.contains_key("Sud"));
    }

    #[test]
    fn export_writes_both_files() {
        let mut app = app();
        let dir = std::env::temp_dir().join(format!("solar-dash-tui-export-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        app.export_dir = dir.clone();
        app.handle_key(KeyCode::Char('e'));
        assert!(app.status.starts_with("Exporté"), "{}", app.status);

        let (csv, html) = export_paths(&dir, "Nord");
        let csv_text = std::fs::read_to_string(&csv).unwrap();
        assert_eq!(csv_text.lines().count(), 4);
        assert!(std::fs::read_to_string(&html).unwrap().contains("Rapport de performance - Nord"));
        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn chart_series_and_bounds() {
        let app = app();
        let lines = performance_lines(&app.output);
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].points.len(), 4);
        let (x, y) = chart_bounds(&lines).unwrap();
        assert_eq!(x[1] - x[0], 3.0);
        assert_eq!(y[0], 0.0);
        assert!((y[1] - 21.0).abs() < 1e-9);
        assert_eq!(fmt_axis_day(x[0]), "01/04");

        assert_eq!(type_lines(&app.output).len(), 2);
        assert!(chart_bounds(&[]).is_none());
    }

    #[test]
    fn stems_are_file_safe() {
        assert_eq!(file_stem_for("Site Nord/1"), "Site_Nord_1");
    }
}
