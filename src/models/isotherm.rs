//! Closed-form 1:1 binding isotherm.
//!
//! For `H + G ⇌ HG` with totals `H0 = [H] + [HG]`, `G0 = [G] + [HG]` and
//! `Ka = [HG] / ([H][G])`, the complex concentration is the smaller root of
//! a quadratic:
//!
//! ```text
//! b    = G0 + H0 + 1/Ka
//! [HG] = 0.5 * (b - sqrt(b^2 - 4*H0*G0))
//! ```
//!
//! The observed shift change is the fraction of host in complex scaled by
//! the free-to-bound shift difference:
//!
//! ```text
//! Dd = (dH - dHG) * [HG] / H0
//! ```
//!
//! Numerical notes:
//! - For weak binding `1/Ka` dominates `b` and `b - sqrt(...)` cancels
//!   catastrophically. We use the equivalent form
//!   `2*H0*G0 / (b + sqrt(b^2 - 4*H0*G0))`, which has no subtraction.
//! - At `G0 = H0` with very strong binding the discriminant can round to a
//!   tiny negative number; it is clamped at zero.
//! - The result is clamped into `[0, min(G0, H0)]`.

use crate::error::AppError;

/// Concentration of the 1:1 complex `[HG]`.
///
/// Returns a domain error when `ka` is not a positive finite number. `h0` is
/// expected to be validated by the caller; non-finite concentrations give `NaN`.
pub fn complex_concentration(g0: f64, h0: f64, ka: f64) -> Result<f64, AppError> {
    if !(ka.is_finite() && ka > 0.0) {
        return Err(AppError::domain(format!(
            "binding constant must be positive and finite, got Ka={ka}"
        )));
    }
    if !(g0.is_finite() && h0.is_finite()) {
        return Ok(f64::NAN);
    }
    if g0 <= 0.0 || h0 <= 0.0 {
        return Ok(0.0);
    }

    let b = g0 + h0 + 1.0 / ka;
    let disc = (b * b - 4.0 * h0 * g0).max(0.0);
    let hg = 2.0 * h0 * g0 / (b + disc.sqrt());

    Ok(hg.clamp(0.0, g0.min(h0)))
}

/// Predicted shift change `Dd` at a single guest concentration.
pub fn predict_shift_change(g0: f64, h0: f64, d_h: f64, ka: f64, d_hg: f64) -> Result<f64, AppError> {
    let hg = complex_concentration(g0, h0, ka)?;
    Ok((d_h - d_hg) * (hg / h0))
}

/// Element-wise [`predict_shift_change`] over a sequence of guest concentrations.
pub fn predict_shift_changes(
    guest: &[f64],
    h0: f64,
    d_h: f64,
    ka: f64,
    d_hg: f64,
) -> Result<Vec<f64>, AppError> {
    guest
        .iter()
        .map(|&g0| predict_shift_change(g0, h0, d_h, ka, d_hg))
        .collect()
}
