//! CSV ingest for titration tables.
//!
//! Expected layout:
//!
//! ```text
//! guest,H1,H2
//! 0.0,7.210,3.402
//! 0.0005,7.188,3.415
//! ...
//! ```
//!
//! - column 0 is the total guest concentration per step
//! - columns 1..P are raw shifts, one column per peak; header names become
//!   peak labels
//! - empty cells and `nan` / `na` / `n/a` mark missing readings
//!
//! Row 0 is the unbound reference. Structural checks that need the host
//! concentration happen later in `TitrationSeries::validate`.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use crate::domain::{PeakSeries, TitrationSeries};
use crate::error::AppError;

/// Load a titration table from disk.
pub fn load_titration_csv(path: &Path, host: f64) -> Result<TitrationSeries, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::io(format!("Failed to open CSV '{}': {e}", path.display())))?;
    parse_titration_csv(file, host)
}

/// Parse a titration table from any reader.
pub fn parse_titration_csv<R: Read>(reader: R, host: f64) -> Result<TitrationSeries, AppError> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .comment(Some(b'#'))
        .flexible(true)
        .from_reader(reader);

    let headers = reader
        .headers()
        .map_err(|e| AppError::io(format!("Failed to read CSV headers: {e}")))?
        .clone();
    if headers.len() < 2 {
        return Err(AppError::invalid_input(
            "CSV needs a guest concentration column and at least one shift column",
        ));
    }

    let labels: Vec<String> = headers
        .iter()
        .skip(1)
        .enumerate()
        .map(|(i, name)| {
            let name = name.trim_start_matches('\u{feff}');
            if name.is_empty() {
                format!("peak{}", i + 1)
            } else {
                name.to_string()
            }
        })
        .collect();

    let mut guest = Vec::new();
    let mut columns: Vec<Vec<f64>> = vec![Vec::new(); labels.len()];

    for (idx, record) in reader.records().enumerate() {
        // Header is line 1.
        let line = idx + 2;
        let record = record.map_err(|e| AppError::io(format!("CSV parse error on line {line}: {e}")))?;
        if record.len() != headers.len() {
            return Err(AppError::invalid_input(format!(
                "line {line} has {} columns, expected {}",
                record.len(),
                headers.len()
            )));
        }

        let g0 = parse_cell(&record[0]).ok_or_else(|| {
            AppError::invalid_input(format!("line {line}: invalid guest concentration '{}'", &record[0]))
        })?;
        if g0.is_nan() {
            return Err(AppError::invalid_input(format!(
                "line {line}: guest concentration is missing"
            )));
        }
        guest.push(g0);

        for (col, cell) in record.iter().skip(1).enumerate() {
            let value = parse_cell(cell).ok_or_else(|| {
                AppError::invalid_input(format!(
                    "line {line}, column '{}': invalid shift '{cell}'",
                    labels[col]
                ))
            })?;
            columns[col].push(value);
        }
    }

    if guest.is_empty() {
        return Err(AppError::invalid_input("CSV contains no data rows"));
    }

    let peaks = labels
        .into_iter()
        .zip(columns)
        .map(|(label, shifts)| PeakSeries::new(label, shifts))
        .collect();
    Ok(TitrationSeries::new(guest, host, peaks))
}

/// Parse a numeric cell; missing markers become `NaN`, garbage is `None`.
fn parse_cell(cell: &str) -> Option<f64> {
    let cell = cell.trim();
    if cell.is_empty() || matches!(cell.to_ascii_lowercase().as_str(), "nan" | "na" | "n/a") {
        return Some(f64::NAN);
    }
    cell.parse::<f64>().ok()
}
