//! Numerical settings of the implicit solver
//!
//! The defaults are the calibration constants of the reference permafrost
//! model. They are exposed for experiments and tests; changing them changes
//! the model's validated behaviour.

use serde::{Deserialize, Serialize};

/// Step-size and convergence controls of [`ImplicitConductionSolver`].
///
/// [`ImplicitConductionSolver`]: crate::solver::ImplicitConductionSolver
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverConfig {
    /// Iterations allowed per step before the step is halved
    pub max_iterations: u32,
    /// Largest time step (days)
    pub max_step_days: f64,
    /// Smallest time step before the run is declared divergent (days)
    pub min_step_days: f64,
    /// Convergence criterion on the largest temperature change (°C)
    pub convergence_tolerance: f64,
    /// Temperature difference below which the enthalpy chord is replaced by
    /// the analytic apparent heat capacity (°C)
    pub enthalpy_regularization: f64,
    /// A step converging in at most this many iterations counts toward
    /// step growth
    pub fast_convergence_iterations: u32,
    /// Consecutive fast steps after which the step size doubles
    pub growth_streak: u32,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            max_iterations: 20,
            max_step_days: 0.5,
            min_step_days: 1.0e-8,
            convergence_tolerance: 1.0e-5,
            enthalpy_regularization: 1.0e-10,
            fast_convergence_iterations: 10,
            growth_streak: 3,
        }
    }
}
