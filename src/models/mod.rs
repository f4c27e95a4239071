//! Binding isotherm models.
//!
//! Models are implemented as small, pure functions so that the residual and
//! optimizer code can stay generic.

pub mod isotherm;

pub use isotherm::*;
