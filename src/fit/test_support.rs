//! Shared fixtures for fitting tests: exact model data on a fixed grid.

use crate::domain::{PeakSeries, TitrationSeries};
use crate::models::predict_shift_changes;

pub(crate) const GUEST: [f64; 6] = [0.0, 0.0005, 0.001, 0.002, 0.005, 0.01];
pub(crate) const HOST: f64 = 0.001;

/// Exact model shifts for a peak with reference shift `d_h`.
pub(crate) fn synthetic_peak(label: &str, d_h: f64, ka: f64, d_hg: f64) -> PeakSeries {
    let dd = predict_shift_changes(&GUEST, HOST, d_h, ka, d_hg).unwrap();
    PeakSeries::new(label, dd.iter().map(|v| d_h + v).collect())
}

/// Two peaks sharing Ka = 800 with dHG 0.5 and -0.3.
pub(crate) fn two_peak_series() -> TitrationSeries {
    TitrationSeries::new(
        GUEST.to_vec(),
        HOST,
        vec![
            synthetic_peak("H1", 0.0, 800.0, 0.5),
            synthetic_peak("H2", 0.0, 800.0, -0.3),
        ],
    )
}
