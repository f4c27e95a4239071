//! Reporting utilities: per-step residuals and formatted terminal output.

pub mod format;

pub use format::*;

use crate::domain::{FitResult, TitrationSeries};

/// Observed vs fitted shift change at one titration step.
#[derive(Debug, Clone, PartialEq)]
pub struct StepResidual {
    pub label: String,
    pub guest: f64,
    /// Observed `Dd`; `NaN` when the reading is missing.
    pub observed: f64,
    pub fitted: f64,
    pub residual: f64,
}

/// Per-step residuals for every peak the result covers, peak-major.
///
/// Peaks are matched by position, so `result` must come from fitting `series`.
pub fn compute_step_residuals(series: &TitrationSeries, result: &FitResult) -> Vec<StepResidual> {
    let mut out = Vec::with_capacity(series.steps() * result.peaks.len());
    for (idx, (peak, fit)) in series.peaks.iter().zip(&result.peaks).enumerate() {
        let Some(model) = result.model(idx) else {
            continue;
        };
        for (&g0, observed) in series.guest.iter().zip(peak.shift_changes()) {
            let fitted = model(g0);
            out.push(StepResidual {
                label: fit.label.clone(),
                guest: g0,
                observed,
                fitted,
                residual: observed - fitted,
            });
        }
    }
    out
}
