//! Input/output helpers.
//!
//! - CSV ingest of titration tables (`ingest`)
//! - result exports: JSON fit result, CSV fitted curves (`export`)

pub mod export;
pub mod ingest;

pub use export::*;
pub use ingest::*;
