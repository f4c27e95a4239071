//! ASCII plotting for terminal output.
//!
//! Fixed-size character grid, deterministic output (golden tests rely on it).
//!
//! Plot elements:
//! - observed points: one marker per peak (`o`, `x`, `+`, ...)
//! - fitted curves: `-` lines, drawn first so points overlay them

use crate::error::AppError;
use crate::plot::{FitFigure, Renderer};

const MARKERS: [char; 6] = ['o', 'x', '+', '*', '#', '@'];

/// Renders a figure into a string for the terminal.
#[derive(Debug, Clone, Copy)]
pub struct AsciiRenderer {
    pub width: usize,
    pub height: usize,
}

impl Default for AsciiRenderer {
    fn default() -> Self {
        Self { width: 72, height: 20 }
    }
}

impl Renderer for AsciiRenderer {
    type Output = String;

    fn render(&self, figure: &FitFigure, _identifier: &str) -> Result<String, AppError> {
        Ok(render_ascii_plot(figure, self.width, self.height))
    }
}

/// Marker used for the peak at `idx`.
pub fn marker_for(idx: usize) -> char {
    MARKERS[idx % MARKERS.len()]
}

pub fn render_ascii_plot(figure: &FitFigure, width: usize, height: usize) -> String {
    let width = width.max(10);
    let height = height.max(5);

    let (x_min, x_max) = figure.x_bounds().unwrap_or((0.0, 1.0));
    let (y_min, y_max) = figure.y_bounds().unwrap_or((0.0, 1.0));
    let (y_min, y_max) = pad_range(y_min, y_max, 0.05);

    let mut grid = vec![vec![' '; width]; height];

    for peak in &figure.peaks {
        draw_curve(&mut grid, &peak.curve, (x_min, x_max), (y_min, y_max));
    }
    for (idx, peak) in figure.peaks.iter().enumerate() {
        let ch = marker_for(idx);
        for &(x, y) in &peak.points {
            let col = map_x(x, x_min, x_max, width);
            let row = map_y(y, y_min, y_max, height);
            grid[row][col] = ch;
        }
    }

    let mut out = String::new();
    out.push_str(&format!(
        "{}: G0=[{x_min:.3e}, {x_max:.3e}] M | Dd=[{y_min:.3}, {y_max:.3}] ppm | Ka={:.2}\n",
        figure.title, figure.ka
    ));
    for row in grid {
        out.push_str(&row.into_iter().collect::<String>());
        out.push('\n');
    }
    for (idx, peak) in figure.peaks.iter().enumerate() {
        out.push_str(&format!("  {} {}\n", marker_for(idx), peak.label));
    }
    out
}

fn pad_range(min: f64, max: f64, frac: f64) -> (f64, f64) {
    let span = (max - min).abs();
    let pad = (span * frac).max(1e-12);
    (min - pad, max + pad)
}

fn map_x(x: f64, x_min: f64, x_max: f64, width: usize) -> usize {
    let u = ((x - x_min) / (x_max - x_min)).clamp(0.0, 1.0);
    (u * (width as f64 - 1.0)).round() as usize
}

fn map_y(y: f64, y_min: f64, y_max: f64, height: usize) -> usize {
    let u = ((y - y_min) / (y_max - y_min)).clamp(0.0, 1.0);
    // Row 0 is the top.
    (height as f64 - 1.0 - (u * (height as f64 - 1.0))).round() as usize
}

fn draw_curve(grid: &mut [Vec<char>], curve: &[(f64, f64)], x: (f64, f64), y: (f64, f64)) {
    let height = grid.len();
    let width = grid.first().map_or(0, Vec::len);
    if width == 0 {
        return;
    }

    let mut prev = None;
    for &(cx, cy) in curve.iter().filter(|(cx, cy)| cx.is_finite() && cy.is_finite()) {
        let col = map_x(cx, x.0, x.1, width);
        let row = map_y(cy, y.0, y.1, height);
        match prev {
            Some((c0, r0)) => draw_line(grid, c0, r0, col, row, '-'),
            None => grid[row][col] = '-',
        }
        prev = Some((col, row));
    }
}

/// Integer line drawing (Bresenham).
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
        if let Some(cell) = grid.get_mut(y0 as usize).and_then(|row| row.get_mut(x0 as usize)) {
            if *cell == ' ' {
                *cell = ch;
            }
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
