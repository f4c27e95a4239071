//! Fit orchestration for one titration series.
//!
//! Two entry points:
//!
//! - [`fit_single_peak`]: one peak, free parameters `{ka, dhg}`
//! - [`fit_global`]: `P` peaks sharing one Ka; free parameters
//!   `{ka_0, dhg_0, ..., dhg_{P-1}}` with every `ka_p` tied to `ka_0`
//!
//! Both validate their inputs before any optimization, derive `dH` and `Dd`
//! per peak, seed `dHG` with the extrapolated endpoint (last observed `Dd`
//! plus `dH`), and hand the objective to a [`Minimizer`]. Rendering is left
//! to the caller (see `crate::plot`).

use tracing::{debug, info, instrument};

use crate::domain::{FitMode, FitResult, PeakFit, TitrationSeries};
use crate::error::AppError;
use crate::fit::optimizer::{Minimizer, NelderMead};
use crate::fit::params::ParameterSet;
use crate::fit::residuals::{PeakTerm, ResidualBuilder, sum_of_squares};

/// Smallest Ka the optimizer can propose.
///
/// Keeps the model away from the `Ka = 0` singularity of `1/Ka`.
pub const KA_FLOOR: f64 = 1e-12;

/// Options shared by both orchestrators.
#[derive(Debug, Clone, Default)]
pub struct FitOptions {
    /// Simplex iteration budget; `None` uses the optimizer default.
    pub max_iters: Option<u64>,
}

impl FitOptions {
    pub fn minimizer(&self) -> NelderMead {
        NelderMead::with_max_iters(self.max_iters)
    }
}

/// Fit a series with exactly one peak.
pub fn fit_single_peak(
    series: &TitrationSeries,
    ka_guess: f64,
    opts: &FitOptions,
) -> Result<FitResult, AppError> {
    fit_single_peak_with(series, ka_guess, &opts.minimizer())
}

/// Fit all peaks of a series with one shared Ka.
pub fn fit_global(
    series: &TitrationSeries,
    ka_guess: f64,
    opts: &FitOptions,
) -> Result<FitResult, AppError> {
    fit_global_with(series, ka_guess, &opts.minimizer())
}

/// [`fit_single_peak`] with an explicit minimizer.
#[instrument(skip_all, name = "fit_single_peak")]
pub fn fit_single_peak_with<M: Minimizer>(
    series: &TitrationSeries,
    ka_guess: f64,
    minimizer: &M,
) -> Result<FitResult, AppError> {
    if series.peaks.len() != 1 {
        return Err(AppError::invalid_input(format!(
            "single-peak fit needs exactly one peak, got {}",
            series.peaks.len()
        )));
    }
    run_fit(series, ka_guess, FitMode::Single, minimizer)
}

/// [`fit_global`] with an explicit minimizer.
#[instrument(skip_all, name = "fit_global")]
pub fn fit_global_with<M: Minimizer>(
    series: &TitrationSeries,
    ka_guess: f64,
    minimizer: &M,
) -> Result<FitResult, AppError> {
    run_fit(series, ka_guess, FitMode::Global, minimizer)
}

fn run_fit<M: Minimizer>(
    series: &TitrationSeries,
    ka_guess: f64,
    mode: FitMode,
    minimizer: &M,
) -> Result<FitResult, AppError> {
    validate_ka_guess(ka_guess)?;
    series.validate()?;

    let (mut params, terms) = build_problem(series, ka_guess, mode)?;
    info!(
        ?mode,
        peaks = terms.len(),
        steps = series.steps(),
        free = params.free_len(),
        ka_guess,
        "fitting titration"
    );

    let builder = ResidualBuilder::new(&series.guest, series.host, terms);
    let report = minimizer.minimize(|p| builder.objective(p), &mut params)?;

    let (objective, n_obs) = sum_of_squares(&builder.residuals(&params)?);
    let ka = params.value(&builder.peaks()[0].ka_param)?;
    let peaks = builder
        .peaks()
        .iter()
        .map(|term| {
            Ok(PeakFit {
                label: term.label.clone(),
                d_h: term.d_h,
                d_hg: params.value(&term.d_hg_param)?,
            })
        })
        .collect::<Result<Vec<_>, AppError>>()?;

    info!(
        ka,
        objective,
        converged = report.status.converged,
        iterations = report.status.iterations,
        "fit finished"
    );

    Ok(FitResult {
        mode,
        ka,
        host: series.host,
        peaks,
        objective,
        n_obs,
        rmse: (objective / n_obs.max(1) as f64).sqrt(),
        status: report.status,
    })
}

fn validate_ka_guess(ka_guess: f64) -> Result<(), AppError> {
    if !(ka_guess.is_finite() && ka_guess > KA_FLOOR) {
        return Err(AppError::invalid_input(format!(
            "initial Ka guess must be positive and finite, got {ka_guess}"
        )));
    }
    Ok(())
}

/// Parameter set and per-peak residual terms for the given mode.
fn build_problem(
    series: &TitrationSeries,
    ka_guess: f64,
    mode: FitMode,
) -> Result<(ParameterSet, Vec<PeakTerm>), AppError> {
    let mut params = ParameterSet::new();
    let mut terms = Vec::with_capacity(series.peaks.len());

    for (i, peak) in series.peaks.iter().enumerate() {
        let (ka_name, d_hg_name) = match mode {
            FitMode::Single => ("ka".to_string(), "dhg".to_string()),
            FitMode::Global => (format!("ka_{i}"), format!("dhg_{i}")),
        };
        let d_h = peak.reference_shift().ok_or_else(|| {
            AppError::invalid_input(format!("peak '{}' has no reference reading", peak.label))
        })?;
        let observed = peak.shift_changes();
        let last_dd = observed
            .iter()
            .rev()
            .copied()
            .find(|v| v.is_finite())
            .unwrap_or(0.0);

        params.add_parameter(&ka_name, ka_guess, Some(KA_FLOOR), None)?;
        params.add_parameter(&d_hg_name, last_dd + d_h, None, None)?;
        if mode == FitMode::Global && i > 0 {
            params.constrain_equal(&ka_name, "ka_0")?;
        }

        terms.push(PeakTerm {
            label: peak.label.clone(),
            d_h,
            observed,
            ka_param: ka_name,
            d_hg_param: d_hg_name,
        });
    }

    debug!(parameters = ?params.names(), free = params.free_len(), "parameter set built");
    Ok((params, terms))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::PeakSeries;
    use crate::fit::test_support::{GUEST, HOST, synthetic_peak, two_peak_series};

    fn rel_err(a: f64, b: f64) -> f64 {
        ((a - b) / b).abs()
    }

    #[test]
    fn single_peak_recovers_known_ka() {
        let series = TitrationSeries::new(
            GUEST.to_vec(),
            HOST,
            vec![synthetic_peak("H1", 0.0, 500.0, 1.0)],
        );
        let fit = fit_single_peak(&series, 300.0, &FitOptions::default()).unwrap();

        assert_eq!(fit.mode, FitMode::Single);
        assert!(rel_err(fit.ka, 500.0) < 0.05, "ka={}", fit.ka);
        assert!((fit.peaks[0].d_hg - 1.0).abs() < 0.05, "dhg={}", fit.peaks[0].d_hg);
        assert_eq!(fit.n_obs, GUEST.len());
        assert!(fit.objective < 1e-8);
    }

    #[test]
    fn single_peak_handles_nonzero_reference_shift() {
        let series = TitrationSeries::new(
            GUEST.to_vec(),
            HOST,
            vec![synthetic_peak("H1", 7.25, 500.0, 6.4)],
        );
        let fit = fit_single_peak(&series, 300.0, &FitOptions::default()).unwrap();
        assert!((fit.peaks[0].d_h - 7.25).abs() < 1e-12);
        assert!(rel_err(fit.ka, 500.0) < 0.05, "ka={}", fit.ka);
        assert!((fit.peaks[0].d_hg - 6.4).abs() < 0.05);
    }

    #[test]
    fn global_fit_shares_ka_and_keeps_per_peak_dhg() {
        let series = two_peak_series();
        let fit = fit_global(&series, 500.0, &FitOptions::default()).unwrap();

        assert_eq!(fit.mode, FitMode::Global);
        assert!(rel_err(fit.ka, 800.0) < 0.05, "ka={}", fit.ka);
        assert!((fit.peak("H1").unwrap().d_hg - 0.5).abs() < 0.02);
        assert!((fit.peak("H2").unwrap().d_hg + 0.3).abs() < 0.02);
        assert_eq!(fit.n_obs, 2 * GUEST.len());
    }

    #[test]
    fn global_parameter_set_has_one_plus_p_free_dimensions() {
        let series = two_peak_series();
        let (params, terms) = build_problem(&series, 500.0, FitMode::Global).unwrap();
        assert_eq!(terms.len(), 2);
        assert_eq!(params.len(), 4);
        assert_eq!(params.free_len(), 3);
        assert_eq!(params.get("ka_1").unwrap().tied_to.as_deref(), Some("ka_0"));
    }

    #[test]
    fn initial_dhg_is_extrapolated_endpoint() {
        let series = TitrationSeries::new(
            vec![0.0, 0.001, 0.002, 0.003],
            HOST,
            vec![PeakSeries::new("H1", vec![7.0, 6.9, 6.8, f64::NAN])],
        );
        let (params, _) = build_problem(&series, 100.0, FitMode::Single).unwrap();
        // Last finite Dd is -0.2; dH is 7.0.
        assert!((params.value("dhg").unwrap() - 6.8).abs() < 1e-12);
    }

    #[test]
    fn missing_reading_does_not_move_the_fit() {
        let clean = two_peak_series();
        let mut gappy = clean.clone();
        gappy.peaks[1].shifts[3] = f64::NAN;

        let a = fit_global(&clean, 500.0, &FitOptions::default()).unwrap();
        let b = fit_global(&gappy, 500.0, &FitOptions::default()).unwrap();

        assert_eq!(b.n_obs, a.n_obs - 1);
        assert!(rel_err(b.ka, a.ka) < 0.01, "{} vs {}", b.ka, a.ka);
        for (pa, pb) in a.peaks.iter().zip(b.peaks.iter()) {
            assert!((pa.d_hg - pb.d_hg).abs() < 0.01);
        }
    }

    #[test]
    fn single_peak_tolerates_missing_reading() {
        let mut peak = synthetic_peak("H1", 0.0, 500.0, 1.0);
        peak.shifts[2] = f64::NAN;
        let series = TitrationSeries::new(GUEST.to_vec(), HOST, vec![peak]);
        let fit = fit_single_peak(&series, 300.0, &FitOptions::default()).unwrap();
        assert_eq!(fit.n_obs, GUEST.len() - 1);
        assert!(rel_err(fit.ka, 500.0) < 0.05, "ka={}", fit.ka);
    }

    #[test]
    fn rejects_bad_inputs_before_optimizing() {
        let mut series = two_peak_series();
        assert!(matches!(
            fit_global(&series, -5.0, &FitOptions::default()),
            Err(AppError::InvalidInput(_))
        ));
        assert!(matches!(
            fit_global(&series, 0.0, &FitOptions::default()),
            Err(AppError::InvalidInput(_))
        ));

        series.host = 0.0;
        assert!(matches!(
            fit_global(&series, 500.0, &FitOptions::default()),
            Err(AppError::InvalidInput(_))
        ));
    }

    #[test]
    fn single_peak_rejects_multi_peak_series() {
        let series = two_peak_series();
        assert!(matches!(
            fit_single_peak(&series, 500.0, &FitOptions::default()),
            Err(AppError::InvalidInput(_))
        ));
    }

    #[test]
    fn tiny_budget_reports_non_convergence_with_estimate() {
        let series = two_peak_series();
        let opts = FitOptions { max_iters: Some(2) };
        let fit = fit_global(&series, 500.0, &opts).unwrap();
        assert!(!fit.converged());
        assert!(fit.ka.is_finite() && fit.ka > 0.0);
    }
}
