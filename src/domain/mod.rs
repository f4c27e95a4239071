//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - titration inputs (`TitrationSeries`, `PeakSeries`)
//! - fit outputs (`FitResult`, `PeakFit`, `FitStatus`, `FitMode`)
//! - run configuration (`FitConfig`)

pub mod types;

pub use types::*;
