//! ASCII plotting for terminal output.
//!
//! Fixed-size grid, deterministic output (helpful for golden tests).
//!
//! Plot elements:
//! - production: `-` line, `P` at each day
//! - consumption: `.` line, `C` at each day
//! - `*` where a production and a consumption marker share a cell

use crate::domain::DailyPoint;

/// Render production vs consumption over time.
///
/// `points` must be in date order (as produced by the daily resampler).
pub fn render_ascii_chart(points: &[DailyPoint], width: usize, height: usize) -> String {
    let width = width.max(10);
    let height = height.max(5);

    let (Some(first), Some(last)) = (points.first(), points.last()) else {
        return "Plot: aucune donnée\n".to_string();
    };

    let t_min = 0.0;
    let mut t_max = (last.date - first.date).num_days() as f64;
    if t_max <= t_min {
        t_max = t_min + 1.0;
    }

    let y_top = points
        .iter()
        .map(|p| p.production_kwh.max(p.consumption_kwh))
        .fold(0.0_f64, f64::max);
    let (y_min, y_max) = pad_range(0.0, if y_top > 0.0 { y_top } else { 1.0 }, 0.05);

    let cells = |value: fn(&DailyPoint) -> f64| -> Vec<(usize, usize)> {
        points
            .iter()
            .map(|p| {
                let t = (p.date - first.date).num_days() as f64;
                (map_x(t, t_min, t_max, width), map_y(value(p), y_min, y_max, height))
            })
            .collect()
    };
    let production = cells(|p| p.production_kwh);
    let consumption = cells(|p| p.consumption_kwh);

    let mut grid = vec![vec![' '; width]; height];

    // Lines first so markers overlay them.
    draw_polyline(&mut grid, &production, '-');
    draw_polyline(&mut grid, &consumption, '.');

    for &(x, y) in &production {
        grid[y][x] = 'P';
    }
    for &(x, y) in &consumption {
        grid[y][x] = if grid[y][x] == 'P' { '*' } else { 'C' };
    }

    let mut out = String::new();
    out.push_str(&format!(
        "Plot: {}..{} | y=[{y_min:.2}, {y_max:.2}] kWh | P=production C=consommation *=les deux\n",
        first.date, last.date
    ));
    for row in grid {
        out.push_str(&row.into_iter().collect::<String>());
        out.push('\n');
    }
    out
}

fn pad_range(min: f64, max: f64, frac: f64) -> (f64, f64) {
    let span = (max - min).abs();
    let pad = (span * frac).max(1e-12);
    (min - pad, max + pad)
}

fn map_x(t: f64, t_min: f64, t_max: f64, width: usize) -> usize {
    let width = width.max(2);
    let u = ((t - t_min) / (t_max - t_min)).clamp(0.0, 1.0);
    (u * (width as f64 - 1.0)).round() as usize
}

fn map_y(y: f64, y_min: f64, y_max: f64, height: usize) -> usize {
    let height = height.max(2);
    let u = ((y - y_min) / (y_max - y_min)).clamp(0.0, 1.0);
    // y=top is max -> row 0
    (height as f64 - 1.0 - (u * (height as f64 - 1.0))).round() as usize
}

fn draw_polyline(grid: &mut [Vec<char>], cells: &[(usize, usize)], ch: char) {
    for pair in cells.windows(2) {
        let ((x0, y0), (x1, y1)) = (pair[0], pair[1]);
        draw_line(grid, x0, y0, x1, y1, ch);
    }
}

/// Integer line drawing (Bresenham-ish). Only fills empty cells.
fn draw_line(grid: &mut [Vec<char>], x0: usize, y0: usize, x1: usize, y1: usize, ch: char) {
    let mut x0 = x0 as isize;
    let mut y0 = y0 as isize;
    let x1 = x1 as isize;
    let y1 = y1 as isize;

    let dx = (x1 - x0).abs();
    let sx = if x0 < x1 { 1 } else { -1 };
    let dy = -(y1 - y0).abs();
    let sy = if y0 < y1 { 1 } else { -1 };
    let mut err = dx + dy;

    loop {
        if y0 >= 0
            && (y0 as usize) < grid.len()
            && x0 >= 0
            && (x0 as usize) < grid[0].len()
            && grid[y0 as usize][x0 as usize] == ' '
        {
            grid[y0 as usize][x0 as usize] = ch;
        }

        if x0 == x1 && y0 == y1 {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x0 += sx;
        }
        if e2 <= dx {
            err += dx;
            y0 += sy;
        }
    }
}
