//! Figures for fitted titrations.
//!
//! Plotting is split in two steps:
//!
//! - [`build_figure`] turns a series and its fit into a render-only
//!   [`FitFigure`] (observed points plus a dense fitted curve per peak)
//! - a [`Renderer`] draws that figure somewhere (terminal text, SVG file)
//!
//! All data prep happens in `build_figure`, so renderers only draw.

pub mod ascii;
pub mod svg;

pub use ascii::*;
pub use svg::*;

use crate::domain::{FitResult, TitrationSeries};
use crate::error::AppError;

/// Number of samples on each fitted curve.
pub const CURVE_POINTS: usize = 200;

/// Observed points and fitted curve of one peak, in `(G0, Dd)` coordinates.
#[derive(Debug, Clone, PartialEq)]
pub struct PeakCurve {
    pub label: String,
    /// Finite observations only; missing readings are dropped.
    pub points: Vec<(f64, f64)>,
    pub curve: Vec<(f64, f64)>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FitFigure {
    pub title: String,
    pub ka: f64,
    pub peaks: Vec<PeakCurve>,
}

impl FitFigure {
    /// X bounds shared by every peak.
    pub fn x_bounds(&self) -> Option<(f64, f64)> {
        bounds(self.peaks.iter().flat_map(|p| p.points.iter().chain(p.curve.iter())).map(|&(x, _)| x))
    }

    /// Y bounds shared by every peak.
    pub fn y_bounds(&self) -> Option<(f64, f64)> {
        bounds(self.peaks.iter().flat_map(|p| p.points.iter().chain(p.curve.iter())).map(|&(_, y)| y))
    }
}

/// Something that can draw a [`FitFigure`].
///
/// `identifier` names the output (file stem for file-backed renderers).
pub trait Renderer {
    type Output;

    fn render(&self, figure: &FitFigure, identifier: &str) -> Result<Self::Output, AppError>;
}

/// Build the figure for `result` fitted on `series`.
///
/// The curve grid runs from 0 to `1.1 * max(G0)` so the fit is shown a bit
/// past the last titration step.
pub fn build_figure(series: &TitrationSeries, result: &FitResult, title: impl Into<String>) -> FitFigure {
    let g_max = series.max_guest();
    let x_max = if g_max.is_finite() && g_max > 0.0 { g_max * 1.1 } else { 1.0 };

    let peaks = series
        .peaks
        .iter()
        .enumerate()
        .filter_map(|(idx, peak)| {
            let model = result.model(idx)?;
            let points = series
                .guest
                .iter()
                .zip(peak.shift_changes())
                .filter(|(g, dd)| g.is_finite() && dd.is_finite())
                .map(|(&g, dd)| (g, dd))
                .collect();
            let curve = (0..CURVE_POINTS)
                .map(|i| {
                    let g = x_max * i as f64 / (CURVE_POINTS as f64 - 1.0);
                    (g, model(g))
                })
                .collect();
            Some(PeakCurve {
                label: peak.label.clone(),
                points,
                curve,
            })
        })
        .collect();

    FitFigure {
        title: title.into(),
        ka: result.ka,
        peaks,
    }
}

fn bounds(values: impl Iterator<Item = f64>) -> Option<(f64, f64)> {
    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;
    for v in values.filter(|v| v.is_finite()) {
        min = min.min(v);
        max = max.max(v);
    }
    if min.is_finite() && max.is_finite() && max > min {
        Some((min, max))
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fit::test_support::two_peak_series;
    use crate::fit::{FitOptions, fit_global};

    #[test]
    fn figure_grid_spans_past_last_step() {
        let series = two_peak_series();
        let result = fit_global(&series, 500.0, &FitOptions::default()).unwrap();
        let figure = build_figure(&series, &result, "global");

        assert_eq!(figure.peaks.len(), 2);
        assert_eq!(figure.ka, result.ka);
        for peak in &figure.peaks {
            assert_eq!(peak.curve.len(), CURVE_POINTS);
            assert_eq!(peak.curve[0], (0.0, 0.0));
            let (x_last, _) = peak.curve[CURVE_POINTS - 1];
            assert!((x_last - series.max_guest() * 1.1).abs() < 1e-15);
            assert_eq!(peak.points.len(), series.steps());
        }
        assert_eq!(figure.peaks[1].label, "H2");
    }

    #[test]
    fn figure_drops_missing_readings() {
        let mut series = two_peak_series();
        series.peaks[0].shifts[3] = f64::NAN;
        let result = fit_global(&series, 500.0, &FitOptions::default()).unwrap();
        let figure = build_figure(&series, &result, "gap");
        assert_eq!(figure.peaks[0].points.len(), series.steps() - 1);
        assert_eq!(figure.peaks[1].points.len(), series.steps());
    }
}
