//! The `titr fit` workflow without any printing:
//! CSV ingest -> peak selection -> fit -> residuals -> figure.
//!
//! `app` handles presentation and exports on top of `RunOutput`.

use tracing::info;

use crate::domain::{FitConfig, FitMode, FitResult, TitrationSeries};
use crate::error::AppError;
use crate::fit::{FitOptions, JobOutcome, fit_global, fit_peaks_independently, fit_single_peak};
use crate::io::load_titration_csv;
use crate::plot::{FitFigure, build_figure};
use crate::report::{StepResidual, compute_step_residuals};

/// All computed outputs of a single `titr fit` run.
#[derive(Debug, Clone)]
pub struct RunOutput {
    /// The series actually fitted (one peak in single mode).
    pub series: TitrationSeries,
    pub result: FitResult,
    pub residuals: Vec<StepResidual>,
    pub figure: FitFigure,
    /// Per-peak independent fits, when requested.
    pub cross_check: Option<Vec<JobOutcome>>,
}

/// Execute the full fitting pipeline for `config`.
pub fn run_fit(config: &FitConfig) -> Result<RunOutput, AppError> {
    let series = load_titration_csv(&config.csv_path, config.host)?;
    info!(
        path = %config.csv_path.display(),
        steps = series.steps(),
        peaks = series.peaks.len(),
        "loaded titration"
    );
    run_fit_on_series(config, series)
}

/// Execute the pipeline on an already loaded series.
pub fn run_fit_on_series(config: &FitConfig, series: TitrationSeries) -> Result<RunOutput, AppError> {
    let opts = FitOptions {
        max_iters: config.max_iters,
    };

    let series = match config.mode {
        FitMode::Global => series,
        FitMode::Single => {
            let label = match &config.peak {
                Some(label) => label.clone(),
                None => series
                    .peaks
                    .first()
                    .map(|p| p.label.clone())
                    .ok_or_else(|| AppError::invalid_input("titration has no peak columns"))?,
            };
            series.with_single_peak(&label)?
        }
    };

    let result = match config.mode {
        FitMode::Single => fit_single_peak(&series, config.ka_guess, &opts)?,
        FitMode::Global => fit_global(&series, config.ka_guess, &opts)?,
    };

    let cross_check = config
        .cross_check
        .then(|| fit_peaks_independently(&series, config.ka_guess, &opts));

    let residuals = compute_step_residuals(&series, &result);
    let title = config
        .svg_id
        .clone()
        .or_else(|| config.csv_path.file_stem().map(|s| s.to_string_lossy().into_owned()))
        .unwrap_or_else(|| "titration".to_string());
    let figure = build_figure(&series, &result, title);

    Ok(RunOutput {
        series,
        result,
        residuals,
        figure,
        cross_check,
    })
}
