//! Synthetic titration generation.
//!
//! Shifts are produced from the isotherm with known parameters, then
//! perturbed with Gaussian noise from a seeded RNG so runs are reproducible.

use rand::prelude::*;
use rand::rngs::StdRng;
use rand_distr::Normal;

use crate::domain::{PeakSeries, TitrationSeries};
use crate::error::AppError;
use crate::models::predict_shift_changes;

/// True parameters of one synthetic peak.
#[derive(Debug, Clone, PartialEq)]
pub struct SyntheticPeak {
    pub label: String,
    pub d_h: f64,
    pub d_hg: f64,
}

#[derive(Debug, Clone)]
pub struct SyntheticSpec {
    pub guest: Vec<f64>,
    pub host: f64,
    pub ka: f64,
    pub peaks: Vec<SyntheticPeak>,
    /// Standard deviation of the additive shift noise (ppm). Zero disables it.
    pub noise: f64,
    pub seed: u64,
}

/// Generate a titration series from `spec`.
///
/// The reference reading at step 0 is left noise-free so `dH` is exact.
pub fn generate_titration(spec: &SyntheticSpec) -> Result<TitrationSeries, AppError> {
    if !(spec.noise.is_finite() && spec.noise >= 0.0) {
        return Err(AppError::invalid_input(format!(
            "noise level must be finite and >= 0, got {}",
            spec.noise
        )));
    }
    if !(spec.host.is_finite() && spec.host > 0.0) {
        return Err(AppError::invalid_input(format!(
            "host concentration must be positive and finite, got {}",
            spec.host
        )));
    }
    if spec.peaks.is_empty() {
        return Err(AppError::invalid_input("synthetic titration needs at least one peak"));
    }

    let mut rng = StdRng::seed_from_u64(spec.seed);
    let normal = Normal::new(0.0, spec.noise.max(f64::MIN_POSITIVE))
        .map_err(|e| AppError::invalid_input(format!("noise distribution error: {e}")))?;

    let mut peaks = Vec::with_capacity(spec.peaks.len());
    for peak in &spec.peaks {
        let dd = predict_shift_changes(&spec.guest, spec.host, peak.d_h, spec.ka, peak.d_hg)?;
        let shifts = dd
            .iter()
            .enumerate()
            .map(|(i, v)| {
                let noise = if i == 0 || spec.noise == 0.0 {
                    0.0
                } else {
                    normal.sample(&mut rng)
                };
                peak.d_h + v + noise
            })
            .collect();
        peaks.push(PeakSeries::new(peak.label.clone(), shifts));
    }

    Ok(TitrationSeries::new(spec.guest.clone(), spec.host, peaks))
}
