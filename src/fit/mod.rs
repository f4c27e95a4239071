//! Binding-constant fitting.
//!
//! Responsibilities:
//!
//! - parameter bookkeeping: bounds, shared-Ka constraints (`params`)
//! - residuals of the isotherm against observed shift changes (`residuals`)
//! - derivative-free minimization (`optimizer`)
//! - single-peak and global orchestration (`fitter`)
//! - parallel fitting of independent titrations (`batch`)

pub mod batch;
pub mod fitter;
pub mod optimizer;
pub mod params;
pub mod residuals;

#[cfg(test)]
pub(crate) mod test_support;

pub use batch::*;
pub use fitter::*;
pub use optimizer::*;
pub use params::*;
pub use residuals::*;
