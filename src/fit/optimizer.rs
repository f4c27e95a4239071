//! Derivative-free minimization over a `ParameterSet`.
//!
//! The fitter only needs one capability: "minimize this objective starting
//! from these parameters". `Minimizer` captures that so the backend can be
//! swapped; [`NelderMead`] is the default and delegates the simplex search to
//! argmin.
//!
//! The simplex moves in the set's unbounded internal coordinates, so bounds
//! hold for every vertex it proposes. Convergence uses argmin's default
//! tolerance (standard deviation of the vertex costs below `f64::EPSILON`);
//! only the iteration budget is configurable.

use argmin::core::{CostFunction, Executor, State, TerminationReason, TerminationStatus};
use argmin::solver::neldermead::NelderMead as ArgminNelderMead;
use tracing::{debug, warn};

use crate::domain::FitStatus;
use crate::error::AppError;
use crate::fit::params::ParameterSet;

/// Relative displacement of the initial simplex vertices.
const SIMPLEX_STEP: f64 = 0.05;

/// Displacement used for coordinates that start at exactly zero.
const SIMPLEX_STEP_AT_ZERO: f64 = 0.00025;

/// Iterations allowed per free dimension (plus one) when no budget is given.
const ITERS_PER_DIMENSION: u64 = 2000;

#[derive(Debug, Clone)]
pub struct MinimizeReport {
    /// Objective value at the returned parameters.
    pub objective: f64,
    pub status: FitStatus,
}

pub trait Minimizer {
    /// Minimize `objective`, leaving the best parameters in `params`.
    ///
    /// Running out of iterations is not an error; it is reported through
    /// `FitStatus::converged`.
    fn minimize<F>(&self, objective: F, params: &mut ParameterSet) -> Result<MinimizeReport, AppError>
    where
        F: Fn(&ParameterSet) -> Result<f64, AppError>;
}

/// Nelder–Mead simplex search backed by argmin.
#[derive(Debug, Clone, Default)]
pub struct NelderMead {
    /// Iteration budget; `None` means `2000 * (free dimensions + 1)`.
    pub max_iters: Option<u64>,
}

impl NelderMead {
    pub fn with_max_iters(max_iters: Option<u64>) -> Self {
        Self { max_iters }
    }

    fn budget(&self, dims: usize) -> u64 {
        self.max_iters.unwrap_or(ITERS_PER_DIMENSION * (dims as u64 + 1))
    }
}

/// Adapts a parameter-set objective to argmin's cost function interface.
struct Objective<'a, F> {
    template: &'a ParameterSet,
    eval: &'a F,
}

impl<F> CostFunction for Objective<'_, F>
where
    F: Fn(&ParameterSet) -> Result<f64, AppError>,
{
    type Param = Vec<f64>;
    type Output = f64;

    fn cost(&self, internal: &Self::Param) -> Result<Self::Output, argmin::core::Error> {
        let mut params = self.template.clone();
        params.update_from_internal(internal)?;
        let value = (self.eval)(&params)?;
        // A non-finite cost would break the simplex ordering.
        Ok(if value.is_finite() { value } else { f64::MAX })
    }
}

impl Minimizer for NelderMead {
    fn minimize<F>(&self, objective: F, params: &mut ParameterSet) -> Result<MinimizeReport, AppError>
    where
        F: Fn(&ParameterSet) -> Result<f64, AppError>,
    {
        let start = params.to_internal();
        if start.is_empty() {
            return Err(AppError::parameter("no free parameters to optimize"));
        }
        let budget = self.budget(start.len());
        debug!(dims = start.len(), budget, "starting Nelder-Mead");

        // argmin unwraps the costs of the starting vertices, so their errors
        // have to surface here.
        let simplex = initial_simplex(&start);
        for vertex in &simplex {
            let mut trial = params.clone();
            trial.update_from_internal(vertex)?;
            objective(&trial)?;
        }

        let (best, status) = {
            let problem = Objective {
                template: params,
                eval: &objective,
            };
            let solver = ArgminNelderMead::new(simplex);
            let result = Executor::new(problem, solver)
                .configure(|state| state.max_iters(budget))
                .run()
                .map_err(|e| match e.downcast_ref::<AppError>() {
                    Some(app) => app.clone(),
                    None => AppError::Optimizer(e.to_string()),
                })?;

            let state = result.state();
            let best = state
                .get_best_param()
                .cloned()
                .ok_or_else(|| AppError::Optimizer("solver returned no parameters".to_string()))?;
            let status = FitStatus {
                converged: matches!(
                    state.get_termination_status(),
                    TerminationStatus::Terminated(TerminationReason::SolverConverged)
                ),
                reason: termination_label(state.get_termination_status()),
                iterations: state.get_iter(),
                cost_evals: state.get_func_counts().get("cost_count").copied().unwrap_or(0),
            };
            (best, status)
        };

        params.update_from_internal(&best)?;
        let objective_value = objective(params)?;

        if !status.converged {
            warn!(
                reason = %status.reason,
                iterations = status.iterations,
                "Nelder-Mead stopped before meeting its tolerance"
            );
        }

        Ok(MinimizeReport {
            objective: objective_value,
            status,
        })
    }
}

/// `x0` plus one vertex per coordinate displaced along that axis.
fn initial_simplex(x0: &[f64]) -> Vec<Vec<f64>> {
    let mut vertices = Vec::with_capacity(x0.len() + 1);
    vertices.push(x0.to_vec());
    for i in 0..x0.len() {
        let mut v = x0.to_vec();
        v[i] = if v[i] != 0.0 {
            v[i] * (1.0 + SIMPLEX_STEP)
        } else {
            SIMPLEX_STEP_AT_ZERO
        };
        vertices.push(v);
    }
    vertices
}

fn termination_label(status: &TerminationStatus) -> String {
    match status {
        TerminationStatus::NotTerminated => "NotTerminated".to_string(),
        TerminationStatus::Terminated(reason) => format!("{reason:?}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quadratic(params: &ParameterSet) -> Result<f64, AppError> {
        let x = params.value("x")?;
        let y = params.value("y")?;
        Ok((x - 3.0).powi(2) + 10.0 * (y + 1.5).powi(2))
    }

    #[test]
    fn finds_minimum_of_shifted_quadratic() {
        let mut params = ParameterSet::new();
        params.add_parameter("x", 1.0, None, None).unwrap();
        params.add_parameter("y", 0.0, None, None).unwrap();

        let report = NelderMead::default().minimize(quadratic, &mut params).unwrap();
        assert!(report.status.converged, "{:?}", report.status);
        assert!((params.value("x").unwrap() - 3.0).abs() < 1e-4);
        assert!((params.value("y").unwrap() + 1.5).abs() < 1e-4);
        assert!(report.objective < 1e-8);
    }

    #[test]
    fn lower_bound_holds_when_minimum_is_outside() {
        let mut params = ParameterSet::new();
        params.add_parameter("x", 2.0, Some(1.0), None).unwrap();
        params.add_parameter("y", 0.0, None, None).unwrap();

        // Unconstrained minimum sits at x = -2, below the bound.
        let objective = |p: &ParameterSet| -> Result<f64, AppError> {
            let x = p.value("x")?;
            let y = p.value("y")?;
            Ok((x + 2.0).powi(2) + y * y)
        };
        NelderMead::default().minimize(objective, &mut params).unwrap();
        let x = params.value("x").unwrap();
        assert!(x >= 1.0);
        assert!((x - 1.0).abs() < 1e-3, "x={x}");
    }

    #[test]
    fn exhausted_budget_is_reported_not_raised() {
        let mut params = ParameterSet::new();
        params.add_parameter("x", 50.0, None, None).unwrap();
        params.add_parameter("y", 40.0, None, None).unwrap();

        let report = NelderMead::with_max_iters(Some(3))
            .minimize(quadratic, &mut params)
            .unwrap();
        assert!(!report.status.converged);
        assert_eq!(report.status.reason, "MaxItersReached");
        assert!(report.objective.is_finite());
    }

    #[test]
    fn objective_errors_propagate_with_their_class() {
        let mut params = ParameterSet::new();
        params.add_parameter("x", 1.0, None, None).unwrap();
        let failing = |_: &ParameterSet| -> Result<f64, AppError> { Err(AppError::domain("boom")) };
        let err = NelderMead::default().minimize(failing, &mut params).unwrap_err();
        assert!(matches!(err, AppError::Domain(_)));
    }

    #[test]
    fn error_at_a_displaced_start_vertex_is_returned() {
        let mut params = ParameterSet::new();
        params.add_parameter("x", 1.0, None, None).unwrap();
        // The second vertex sits at x = 1.05.
        let fails_right_of_start = |p: &ParameterSet| -> Result<f64, AppError> {
            let x = p.value("x")?;
            if x > 1.01 {
                Err(AppError::domain(format!("x={x} out of range")))
            } else {
                Ok(x * x)
            }
        };
        let err = NelderMead::default()
            .minimize(fails_right_of_start, &mut params)
            .unwrap_err();
        assert!(matches!(err, AppError::Domain(_)));
        assert_eq!(params.value("x").unwrap(), 1.0);
    }

    #[test]
    fn initial_simplex_has_one_vertex_per_dimension_plus_one() {
        let s = initial_simplex(&[2.0, 0.0]);
        assert_eq!(s.len(), 3);
        assert_eq!(s[0], vec![2.0, 0.0]);
        assert!((s[1][0] - 2.1).abs() < 1e-12);
        assert_eq!(s[2][1], SIMPLEX_STEP_AT_ZERO);
    }
}
