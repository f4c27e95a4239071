//! Named, bounded fit parameters with equality constraints.
//!
//! A `ParameterSet` owns every value the residual builder reads. Some
//! parameters are *free* (the optimizer moves them), others are *tied* to a
//! free reference and are recomputed from it after every update. Tied
//! parameters never occupy an optimizer dimension, so a global fit over `P`
//! peaks searches `1 + P` coordinates rather than `2P`.
//!
//! The optimizer works in unbounded "internal" coordinates. Bounds are
//! mapped with the MINUIT transforms:
//!
//! ```text
//! lower only : v = min + sqrt(u^2 + 1) - 1
//! upper only : v = max - sqrt(u^2 + 1) + 1
//! both       : v = min + (sin(u) + 1) * (max - min) / 2
//! ```
//!
//! Every point of the internal space maps to an in-bounds value, which is how
//! the simplex is kept away from `Ka <= 0`.

use std::collections::HashMap;

use crate::error::AppError;

#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    pub name: String,
    pub value: f64,
    pub min: Option<f64>,
    pub max: Option<f64>,
    /// Name of the free parameter this one always equals.
    pub tied_to: Option<String>,
}

impl Parameter {
    pub fn is_free(&self) -> bool {
        self.tied_to.is_none()
    }

    fn to_internal(&self) -> f64 {
        match (self.min, self.max) {
            (None, None) => self.value,
            (Some(lo), None) => {
                let d = (self.value - lo).max(0.0);
                (d * (d + 2.0)).sqrt()
            }
            (None, Some(hi)) => {
                let d = (hi - self.value).max(0.0);
                (d * (d + 2.0)).sqrt()
            }
            (Some(lo), Some(hi)) => {
                let s = (2.0 * (self.value - lo) / (hi - lo) - 1.0).clamp(-1.0, 1.0);
                s.asin()
            }
        }
    }

    fn from_internal(&self, u: f64) -> f64 {
        match (self.min, self.max) {
            (None, None) => u,
            (Some(lo), None) => lo + offset(u),
            (None, Some(hi)) => hi - offset(u),
            (Some(lo), Some(hi)) => lo + (u.sin() + 1.0) * (hi - lo) / 2.0,
        }
    }
}

/// `sqrt(u^2 + 1) - 1` without cancellation near `u = 0`.
fn offset(u: f64) -> f64 {
    let u2 = u * u;
    u2 / ((u2 + 1.0).sqrt() + 1.0)
}

/// Ordered collection of parameters addressed by name.
///
/// Insertion order only matters for diagnostics and for the layout of the
/// internal coordinate vector.
#[derive(Debug, Clone, Default)]
pub struct ParameterSet {
    params: Vec<Parameter>,
    index: HashMap<String, usize>,
}

impl ParameterSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a free parameter with an initial value and optional bounds.
    pub fn add_parameter(
        &mut self,
        name: &str,
        initial: f64,
        min: Option<f64>,
        max: Option<f64>,
    ) -> Result<(), AppError> {
        if self.index.contains_key(name) {
            return Err(AppError::parameter(format!("parameter '{name}' already exists")));
        }
        if !initial.is_finite() {
            return Err(AppError::parameter(format!(
                "initial value for '{name}' must be finite, got {initial}"
            )));
        }
        if min.is_some_and(|v| v.is_nan()) || max.is_some_and(|v| v.is_nan()) {
            return Err(AppError::parameter(format!("bounds for '{name}' must not be NaN")));
        }
        // Infinite bounds are the same as no bound.
        let min = min.filter(|v| v.is_finite());
        let max = max.filter(|v| v.is_finite());
        if let (Some(lo), Some(hi)) = (min, max) {
            if lo >= hi {
                return Err(AppError::parameter(format!(
                    "bounds for '{name}' are inverted: [{lo}, {hi}]"
                )));
            }
        }
        if min.is_some_and(|lo| initial < lo) || max.is_some_and(|hi| initial > hi) {
            return Err(AppError::parameter(format!(
                "initial value {initial} for '{name}' lies outside its bounds"
            )));
        }

        self.index.insert(name.to_string(), self.params.len());
        self.params.push(Parameter {
            name: name.to_string(),
            value: initial,
            min,
            max,
            tied_to: None,
        });
        Ok(())
    }

    /// Declare that `name` always equals the current value of `reference`.
    ///
    /// `name` stops being an optimizer dimension. `reference` must be free;
    /// chains of constraints are rejected.
    pub fn constrain_equal(&mut self, name: &str, reference: &str) -> Result<(), AppError> {
        if name == reference {
            return Err(AppError::parameter(format!("'{name}' cannot be constrained to itself")));
        }
        let target = self.position(name)?;
        let source = self.position(reference)?;
        if !self.params[source].is_free() {
            return Err(AppError::parameter(format!(
                "'{reference}' is itself constrained and cannot be a reference"
            )));
        }
        if self.params.iter().any(|p| p.tied_to.as_deref() == Some(name)) {
            return Err(AppError::parameter(format!(
                "'{name}' is referenced by other constraints and must stay free"
            )));
        }

        let value = self.params[source].value;
        let param = &mut self.params[target];
        param.tied_to = Some(reference.to_string());
        param.value = value;
        Ok(())
    }

    pub fn value(&self, name: &str) -> Result<f64, AppError> {
        Ok(self.params[self.position(name)?].value)
    }

    pub fn get(&self, name: &str) -> Option<&Parameter> {
        self.index.get(name).map(|&i| &self.params[i])
    }

    pub fn iter(&self) -> impl Iterator<Item = &Parameter> {
        self.params.iter()
    }

    pub fn names(&self) -> Vec<&str> {
        self.params.iter().map(|p| p.name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    /// Number of independent optimizer dimensions.
    pub fn free_len(&self) -> usize {
        self.params.iter().filter(|p| p.is_free()).count()
    }

    /// Free parameter values mapped into unbounded internal coordinates.
    pub fn to_internal(&self) -> Vec<f64> {
        self.params
            .iter()
            .filter(|p| p.is_free())
            .map(Parameter::to_internal)
            .collect()
    }

    /// Write free values from internal coordinates, then refresh tied values.
    pub fn update_from_internal(&mut self, internal: &[f64]) -> Result<(), AppError> {
        let free = self.free_len();
        if internal.len() != free {
            return Err(AppError::parameter(format!(
                "expected {free} internal coordinates, got {}",
                internal.len()
            )));
        }

        let mut coords = internal.iter();
        for param in self.params.iter_mut().filter(|p| p.is_free()) {
            if let Some(&u) = coords.next() {
                param.value = param.from_internal(u);
            }
        }
        self.apply_constraints();
        Ok(())
    }

    fn apply_constraints(&mut self) {
        for i in 0..self.params.len() {
            let Some(reference) = self.params[i].tied_to.as_deref() else {
                continue;
            };
            if let Some(&src) = self.index.get(reference) {
                self.params[i].value = self.params[src].value;
            }
        }
    }

    fn position(&self, name: &str) -> Result<usize, AppError> {
        self.index
            .get(name)
            .copied()
            .ok_or_else(|| AppError::parameter(format!("unknown parameter '{name}'")))
    }
}
