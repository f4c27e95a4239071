//! Residual construction for single-peak and global fits.
//!
//! Each peak contributes one residual per titration step:
//!
//! ```text
//! r_i = Dd_obs_i - Dd_model(G0_i; H0, dH, Ka, dHG)
//! ```
//!
//! Peaks are flattened peak-major (all steps of peak 0, then peak 1, ...).
//! Missing observations stay `NaN` in the residual vector and are skipped by
//! [`sum_of_squares`], so one bad reading never aborts a fit.

use crate::error::AppError;
use crate::fit::params::ParameterSet;
use crate::models::predict_shift_change;

/// Observed data for one peak, plus the names of the parameters it reads.
#[derive(Debug, Clone)]
pub struct PeakTerm {
    pub label: String,
    /// Reference (unbound) shift `dH`, taken from step 0.
    pub d_h: f64,
    /// Observed shift changes `Dd`, `NaN` where the reading is missing.
    pub observed: Vec<f64>,
    pub ka_param: String,
    pub d_hg_param: String,
}

/// Evaluates the isotherm for every peak against shared guest concentrations.
#[derive(Debug, Clone)]
pub struct ResidualBuilder<'a> {
    guest: &'a [f64],
    host: f64,
    peaks: Vec<PeakTerm>,
}

impl<'a> ResidualBuilder<'a> {
    pub fn new(guest: &'a [f64], host: f64, peaks: Vec<PeakTerm>) -> Self {
        Self { guest, host, peaks }
    }

    pub fn peaks(&self) -> &[PeakTerm] {
        &self.peaks
    }

    /// Total residual count (`N * P`), including missing observations.
    pub fn len(&self) -> usize {
        self.guest.len() * self.peaks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Signed residuals for the given parameters, flattened peak-major.
    pub fn residuals(&self, params: &ParameterSet) -> Result<Vec<f64>, AppError> {
        let mut out = Vec::with_capacity(self.len());
        for peak in &self.peaks {
            let ka = params.value(&peak.ka_param)?;
            let d_hg = params.value(&peak.d_hg_param)?;
            for (&g0, &obs) in self.guest.iter().zip(peak.observed.iter()) {
                let model = predict_shift_change(g0, self.host, peak.d_h, ka, d_hg)?;
                out.push(obs - model);
            }
        }
        Ok(out)
    }

    /// Objective minimized by the optimizer.
    pub fn objective(&self, params: &ParameterSet) -> Result<f64, AppError> {
        let residuals = self.residuals(params)?;
        Ok(sum_of_squares(&residuals).0)
    }
}

/// Sum of squared finite residuals and the number of residuals that counted.
pub fn sum_of_squares(residuals: &[f64]) -> (f64, usize) {
    residuals
        .iter()
        .filter(|r| r.is_finite())
        .fold((0.0, 0), |(sse, n), r| (sse + r * r, n + 1))
}
