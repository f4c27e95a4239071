//! Shared domain types.
//!
//! These types are kept lightweight and serializable so they can be:
//!
//! - used in-memory during fitting
//! - exported to JSON/CSV
//! - handed to a renderer without pulling in any fitting code

use std::collections::HashSet;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::models::predict_shift_change;

/// Raw shifts of one NMR peak across a titration.
#[derive(Debug, Clone, PartialEq)]
pub struct PeakSeries {
    pub label: String,
    /// Raw chemical shift per step; `NaN` marks a missing reading.
    pub shifts: Vec<f64>,
}

impl PeakSeries {
    pub fn new(label: impl Into<String>, shifts: Vec<f64>) -> Self {
        Self {
            label: label.into(),
            shifts,
        }
    }

    /// Reference (unbound) shift `dH`: the reading at step 0.
    pub fn reference_shift(&self) -> Option<f64> {
        self.shifts.first().copied().filter(|v| v.is_finite())
    }

    /// Observed shift changes `Dd_i = shift_i - shift_0`.
    ///
    /// Missing readings stay `NaN`.
    pub fn shift_changes(&self) -> Vec<f64> {
        let d_h = self.reference_shift().unwrap_or(f64::NAN);
        self.shifts.iter().map(|&s| s - d_h).collect()
    }

    /// Number of finite readings.
    pub fn usable_points(&self) -> usize {
        self.shifts.iter().filter(|v| v.is_finite()).count()
    }
}

/// One titration experiment: guest concentrations, host concentration, and
/// one or more peaks tracked across the same steps.
#[derive(Debug, Clone, PartialEq)]
pub struct TitrationSeries {
    /// Total guest concentration `G0` per step (M).
    pub guest: Vec<f64>,
    /// Total host concentration `H0` (M), constant across the series.
    pub host: f64,
    pub peaks: Vec<PeakSeries>,
}

impl TitrationSeries {
    pub fn new(guest: Vec<f64>, host: f64, peaks: Vec<PeakSeries>) -> Self {
        Self { guest, host, peaks }
    }

    pub fn steps(&self) -> usize {
        self.guest.len()
    }

    pub fn max_guest(&self) -> f64 {
        self.guest.iter().copied().fold(0.0, f64::max)
    }

    pub fn peak(&self, label: &str) -> Option<&PeakSeries> {
        self.peaks.iter().find(|p| p.label == label)
    }

    /// Copy of this series keeping only the given peak.
    ///
    /// The label must name exactly one peak.
    pub fn with_single_peak(&self, label: &str) -> Result<Self, AppError> {
        let mut matches = self.peaks.iter().enumerate().filter(|(_, p)| p.label == label);
        let (idx, _) = matches
            .next()
            .ok_or_else(|| AppError::invalid_input(format!("no peak named '{label}'")))?;
        if matches.next().is_some() {
            return Err(AppError::invalid_input(format!(
                "peak label '{label}' is not unique"
            )));
        }
        self.with_peak_at(idx)
    }

    /// Copy of this series keeping only the peak at `index`.
    pub fn with_peak_at(&self, index: usize) -> Result<Self, AppError> {
        let peak = self.peaks.get(index).ok_or_else(|| {
            AppError::invalid_input(format!(
                "peak index {index} out of range ({} peaks)",
                self.peaks.len()
            ))
        })?;
        Ok(Self::new(self.guest.clone(), self.host, vec![peak.clone()]))
    }

    /// Check the invariants every fit relies on.
    pub fn validate(&self) -> Result<(), AppError> {
        if !(self.host.is_finite() && self.host > 0.0) {
            return Err(AppError::invalid_input(format!(
                "host concentration must be positive and finite, got {}",
                self.host
            )));
        }
        if self.guest.len() < 2 {
            return Err(AppError::invalid_input(format!(
                "need at least 2 titration steps, got {}",
                self.guest.len()
            )));
        }
        if let Some((i, g)) = self
            .guest
            .iter()
            .enumerate()
            .find(|(_, g)| !(g.is_finite() && **g >= 0.0))
        {
            return Err(AppError::invalid_input(format!(
                "guest concentration at step {i} must be finite and >= 0, got {g}"
            )));
        }
        if self.max_guest() <= 0.0 {
            return Err(AppError::invalid_input("guest concentrations are all zero"));
        }
        if self.peaks.is_empty() {
            return Err(AppError::invalid_input("no peak shift columns supplied"));
        }
        let mut seen = HashSet::new();
        if let Some(dup) = self.peaks.iter().find(|p| !seen.insert(p.label.as_str())) {
            return Err(AppError::invalid_input(format!(
                "peak label '{}' appears more than once",
                dup.label
            )));
        }
        for peak in &self.peaks {
            if peak.shifts.len() != self.guest.len() {
                return Err(AppError::invalid_input(format!(
                    "peak '{}' has {} shifts but the series has {} steps",
                    peak.label,
                    peak.shifts.len(),
                    self.guest.len()
                )));
            }
            if peak.reference_shift().is_none() {
                return Err(AppError::invalid_input(format!(
                    "peak '{}' is missing its reference reading at step 0",
                    peak.label
                )));
            }
            if peak.usable_points() < 2 {
                return Err(AppError::invalid_input(format!(
                    "peak '{}' has fewer than 2 usable readings",
                    peak.label
                )));
            }
        }
        Ok(())
    }
}

/// Which orchestrator produced a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FitMode {
    /// One peak, parameters `{Ka, dHG}`.
    Single,
    /// Several peaks sharing one Ka, each with its own dHG.
    Global,
}

/// How the optimizer finished.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FitStatus {
    /// `true` when the simplex met its tolerance within the iteration budget.
    pub converged: bool,
    pub reason: String,
    pub iterations: u64,
    pub cost_evals: u64,
}

/// Fitted parameters of one peak.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeakFit {
    pub label: String,
    /// Unbound shift (reading at step 0).
    pub d_h: f64,
    /// Shift of the fully bound complex.
    pub d_hg: f64,
}

/// Output of a fit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FitResult {
    pub mode: FitMode,
    /// Association constant (M^-1), shared by every peak.
    pub ka: f64,
    pub host: f64,
    pub peaks: Vec<PeakFit>,
    /// Sum of squared residuals over the observations used.
    pub objective: f64,
    /// Observations that entered the objective (missing readings excluded).
    pub n_obs: usize,
    pub rmse: f64,
    pub status: FitStatus,
}

impl FitResult {
    pub fn converged(&self) -> bool {
        self.status.converged
    }

    pub fn peak(&self, label: &str) -> Option<&PeakFit> {
        self.peaks.iter().find(|p| p.label == label)
    }

    /// Fitted isotherm for one peak: guest concentration -> predicted `Dd`.
    ///
    /// The fitted Ka is always positive, so evaluation cannot fail; a
    /// non-finite guest concentration yields `NaN`.
    pub fn model(&self, peak: usize) -> Option<impl Fn(f64) -> f64 + '_> {
        let fit = self.peaks.get(peak)?;
        Some(move |g0: f64| {
            predict_shift_change(g0, self.host, fit.d_h, self.ka, fit.d_hg).unwrap_or(f64::NAN)
        })
    }

    /// Predicted raw shift (`dH + Dd`) for one peak.
    pub fn predict_shift(&self, peak: usize, g0: f64) -> Option<f64> {
        let fit = self.peaks.get(peak)?;
        let model = self.model(peak)?;
        Some(fit.d_h + model(g0))
    }
}

/// Configuration of one `titr fit` run, built from CLI arguments.
#[derive(Debug, Clone)]
pub struct FitConfig {
    pub csv_path: PathBuf,
    pub host: f64,
    pub ka_guess: f64,
    pub mode: FitMode,
    /// Restrict the fit to one peak (by header label).
    pub peak: Option<String>,
    pub max_iters: Option<u64>,
    /// Also fit each peak on its own and print the per-peak Ka.
    pub cross_check: bool,

    pub plot: bool,
    pub plot_width: usize,
    pub plot_height: usize,
    pub residuals: bool,

    /// Output identifier for the SVG figure; `None` skips the SVG.
    pub svg_id: Option<String>,
    pub out_dir: PathBuf,
    pub export_json: Option<PathBuf>,
    pub export_curve: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn series() -> TitrationSeries {
        TitrationSeries::new(
            vec![0.0, 0.001, 0.002],
            0.001,
            vec![PeakSeries::new("H1", vec![7.0, 6.8, 6.7])],
        )
    }

    #[test]
    fn shift_changes_are_relative_to_step_zero() {
        let peak = PeakSeries::new("H1", vec![7.0, f64::NAN, 6.5]);
        let dd = peak.shift_changes();
        assert_eq!(dd[0], 0.0);
        assert!(dd[1].is_nan());
        assert!((dd[2] + 0.5).abs() < 1e-12);
        assert_eq!(peak.usable_points(), 2);
    }

    #[test]
    fn validate_accepts_well_formed_series() {
        assert!(series().validate().is_ok());
    }

    #[test]
    fn validate_rejects_bad_host() {
        for host in [0.0, -1e-3, f64::NAN] {
            let mut s = series();
            s.host = host;
            assert!(matches!(s.validate(), Err(AppError::InvalidInput(_))), "host={host}");
        }
    }

    #[test]
    fn validate_rejects_length_mismatch_and_empty_peaks() {
        let mut s = series();
        s.peaks[0].shifts.pop();
        assert!(matches!(s.validate(), Err(AppError::InvalidInput(_))));

        let mut s = series();
        s.peaks[0].shifts = vec![7.0, f64::NAN, f64::NAN];
        assert!(matches!(s.validate(), Err(AppError::InvalidInput(_))));

        let mut s = series();
        s.peaks[0].shifts[0] = f64::NAN;
        assert!(matches!(s.validate(), Err(AppError::InvalidInput(_))));
    }

    #[test]
    fn validate_rejects_negative_or_all_zero_guest() {
        let mut s = series();
        s.guest[1] = -0.001;
        assert!(s.validate().is_err());

        let mut s = series();
        s.guest = vec![0.0; 3];
        assert!(s.validate().is_err());
    }

    #[test]
    fn duplicate_peak_labels_are_rejected() {
        let mut s = series();
        s.peaks.push(PeakSeries::new("H1", vec![3.0, 3.1, 3.2]));
        assert!(matches!(s.validate(), Err(AppError::InvalidInput(_))));
        assert!(matches!(s.with_single_peak("H1"), Err(AppError::InvalidInput(_))));

        let second = s.with_peak_at(1).unwrap();
        assert_eq!(second.peaks.len(), 1);
        assert_eq!(second.peaks[0].shifts[0], 3.0);
        assert!(s.with_peak_at(2).is_err());
    }

    #[test]
    fn model_closure_reproduces_saturation() {
        let result = FitResult {
            mode: FitMode::Single,
            ka: 1e12,
            host: 0.001,
            peaks: vec![PeakFit {
                label: "H1".to_string(),
                d_h: 7.0,
                d_hg: 6.0,
            }],
            objective: 0.0,
            n_obs: 3,
            rmse: 0.0,
            status: FitStatus {
                converged: true,
                reason: "SolverConverged".to_string(),
                iterations: 1,
                cost_evals: 1,
            },
        };
        let model = result.model(0).unwrap();
        assert_eq!(model(0.0), 0.0);
        assert!((model(0.01) - 1.0).abs() < 1e-6);
        assert!((result.predict_shift(0, 0.01).unwrap() - 8.0).abs() < 1e-6);
        assert!(result.model(1).is_none());
    }
}
