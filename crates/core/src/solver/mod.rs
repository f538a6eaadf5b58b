//! Implicit heat-conduction solver
//!
//! [`ImplicitConductionSolver`] advances a [`LayeredColumnState`] through
//! time with backward-Euler steps on the enthalpy form of the heat equation.
//! The linearised system of every iteration is tridiagonal and solved by
//! [`TridiagonalSystem`] with buffers kept between iterations.
//!
//! [`LayeredColumnState`]: crate::column::LayeredColumnState

mod implicit;
pub mod tridiagonal;

pub use implicit::{AdvanceStats, ImplicitConductionSolver, StepControl, StepState};
pub use tridiagonal::TridiagonalSystem;
