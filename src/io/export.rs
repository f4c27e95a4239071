//! Export fit results.
//!
//! - `write_result_json`: the full `FitResult` plus run metadata
//! - `write_curve_csv`: fitted curves and observed points, long format, easy
//!   to consume in spreadsheets or downstream scripts
//! - `write_titration_csv`: a titration table in the layout `ingest` reads

use std::fs::File;
use std::io::Write;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::domain::{FitResult, TitrationSeries};
use crate::error::AppError;
use crate::plot::FitFigure;

#[derive(Debug, Serialize)]
struct ResultFile<'a> {
    tool: &'static str,
    version: &'static str,
    generated_at: DateTime<Utc>,
    result: &'a FitResult,
}

/// Write a fit result as pretty-printed JSON.
pub fn write_result_json(path: &Path, result: &FitResult) -> Result<(), AppError> {
    let file = File::create(path)
        .map_err(|e| AppError::io(format!("Failed to create result JSON '{}': {e}", path.display())))?;

    let doc = ResultFile {
        tool: "titr",
        version: env!("CARGO_PKG_VERSION"),
        generated_at: Utc::now(),
        result,
    };

    serde_json::to_writer_pretty(file, &doc)
        .map_err(|e| AppError::io(format!("Failed to write result JSON: {e}")))?;
    Ok(())
}

#[derive(Debug, Serialize)]
struct CurveRow<'a> {
    peak: &'a str,
    kind: &'static str,
    guest: f64,
    shift_change: f64,
}

/// Write every peak's fitted curve and observed points to CSV.
///
/// Columns: `peak,kind,guest,shift_change` with `kind` either `fit` or `obs`.
pub fn write_curve_csv(path: &Path, figure: &FitFigure) -> Result<(), AppError> {
    let mut writer = csv::Writer::from_path(path)
        .map_err(|e| AppError::io(format!("Failed to create curve CSV '{}': {e}", path.display())))?;

    for peak in &figure.peaks {
        let fit = peak.curve.iter().map(|&p| ("fit", p));
        let obs = peak.points.iter().map(|&p| ("obs", p));
        for (kind, (guest, shift_change)) in fit.chain(obs) {
            writer
                .serialize(CurveRow {
                    peak: &peak.label,
                    kind,
                    guest,
                    shift_change,
                })
                .map_err(|e| AppError::io(format!("Failed to write curve CSV row: {e}")))?;
        }
    }

    writer
        .flush()
        .map_err(|e| AppError::io(format!("Failed to flush curve CSV: {e}")))?;
    Ok(())
}

/// Write a titration table (guest column, one shift column per peak).
///
/// Missing readings are written as empty cells.
pub fn write_titration_csv<W: Write>(writer: W, series: &TitrationSeries) -> Result<(), AppError> {
    let mut writer = csv::Writer::from_writer(writer);
    let io_err = |e: csv::Error| AppError::io(format!("Failed to write titration CSV: {e}"));

    let mut header = vec!["guest".to_string()];
    header.extend(series.peaks.iter().map(|p| p.label.clone()));
    writer.write_record(&header).map_err(io_err)?;

    for (i, g0) in series.guest.iter().enumerate() {
        let mut row = vec![g0.to_string()];
        for peak in &series.peaks {
            let cell = peak.shifts.get(i).copied().unwrap_or(f64::NAN);
            row.push(if cell.is_finite() { cell.to_string() } else { String::new() });
        }
        writer.write_record(&row).map_err(io_err)?;
    }

    writer
        .flush()
        .map_err(|e| AppError::io(format!("Failed to flush titration CSV: {e}")))?;
    Ok(())
}
