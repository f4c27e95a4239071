//! Parallel fitting of independent titrations.
//!
//! Each fit owns its parameter set and residual buffers, so separate fits can
//! run on separate threads without any shared state.

use rayon::prelude::*;

use crate::domain::{FitMode, FitResult, TitrationSeries};
use crate::error::AppError;
use crate::fit::fitter::{FitOptions, fit_global, fit_single_peak};

/// One titration to fit as part of a batch.
#[derive(Debug, Clone)]
pub struct FitJob {
    pub name: String,
    pub series: TitrationSeries,
    pub ka_guess: f64,
    pub mode: FitMode,
}

/// Outcome of one batch job. Failures stay local to their job.
#[derive(Debug, Clone)]
pub struct JobOutcome {
    pub name: String,
    pub result: Result<FitResult, AppError>,
}

/// Fit every job in parallel, preserving input order.
pub fn fit_batch(jobs: &[FitJob], opts: &FitOptions) -> Vec<JobOutcome> {
    jobs.par_iter()
        .map(|job| JobOutcome {
            name: job.name.clone(),
            result: match job.mode {
                FitMode::Single => fit_single_peak(&job.series, job.ka_guess, opts),
                FitMode::Global => fit_global(&job.series, job.ka_guess, opts),
            },
        })
        .collect()
}

/// Fit each peak of a series on its own (cross-check for a global fit).
pub fn fit_peaks_independently(
    series: &TitrationSeries,
    ka_guess: f64,
    opts: &FitOptions,
) -> Vec<JobOutcome> {
    series
        .peaks
        .par_iter()
        .enumerate()
        .map(|(idx, peak)| JobOutcome {
            name: peak.label.clone(),
            result: series
                .with_peak_at(idx)
                .and_then(|single| fit_single_peak(&single, ka_guess, opts)),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fit::test_support::{GUEST, HOST, synthetic_peak, two_peak_series};

    #[test]
    fn independent_peak_fits_each_find_shared_ka() {
        let series = two_peak_series();
        let outcomes = fit_peaks_independently(&series, 500.0, &FitOptions::default());
        assert_eq!(outcomes.len(), 2);
        assert_eq!(outcomes[0].name, "H1");
        for outcome in &outcomes {
            let fit = outcome.result.as_ref().unwrap();
            assert!(((fit.ka - 800.0) / 800.0).abs() < 0.05, "{}: ka={}", outcome.name, fit.ka);
        }
    }

    #[test]
    fn independent_fits_use_each_column_even_with_repeated_labels() {
        let series = TitrationSeries::new(
            GUEST.to_vec(),
            HOST,
            vec![
                synthetic_peak("H", 7.0, 800.0, 7.5),
                synthetic_peak("H", 3.0, 800.0, 3.6),
            ],
        );
        assert!(matches!(
            fit_global(&series, 500.0, &FitOptions::default()),
            Err(AppError::InvalidInput(_))
        ));

        let outcomes = fit_peaks_independently(&series, 500.0, &FitOptions::default());
        let first = outcomes[0].result.as_ref().unwrap();
        let second = outcomes[1].result.as_ref().unwrap();
        assert_eq!(first.peaks[0].d_h, 7.0);
        assert_eq!(second.peaks[0].d_h, 3.0);
        assert!((second.peaks[0].d_hg - 3.6).abs() < 0.05);
    }

    #[test]
    fn batch_keeps_order_and_isolates_failures() {
        let good = TitrationSeries::new(
            GUEST.to_vec(),
            HOST,
            vec![synthetic_peak("H1", 0.0, 500.0, 1.0)],
        );
        let mut bad = good.clone();
        bad.host = -1.0;

        let jobs = vec![
            FitJob {
                name: "good".to_string(),
                series: good,
                ka_guess: 300.0,
                mode: FitMode::Single,
            },
            FitJob {
                name: "bad".to_string(),
                series: bad,
                ka_guess: 300.0,
                mode: FitMode::Single,
            },
            FitJob {
                name: "global".to_string(),
                series: two_peak_series(),
                ka_guess: 500.0,
                mode: FitMode::Global,
            },
        ];

        let outcomes = fit_batch(&jobs, &FitOptions::default());
        let names: Vec<&str> = outcomes.iter().map(|o| o.name.as_str()).collect();
        assert_eq!(names, ["good", "bad", "global"]);
        assert!(outcomes[0].result.is_ok());
        assert!(matches!(outcomes[1].result, Err(AppError::InvalidInput(_))));
        assert!(outcomes[2].result.as_ref().unwrap().peaks.len() == 2);
    }
}
