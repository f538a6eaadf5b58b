//! Implicit enthalpy solver with adaptive time stepping
//!
//! Each step solves the backward-Euler control-volume balance
//!
//! ```text
//! τ·w_i·(H_i(T) − H_i(Tⁿ)) = dt·(K_{i+½}(T_{i+1} − T_i) − K_{i−½}(T_i − T_{i−1})) [+ dt·q_geo at the bottom]
//! ```
//!
//! for the nodes below the top boundary, where `w_i` is the control-volume
//! width, `K = 2·k_a·k_b / ((k_a + k_b)·Δx)` the face conductance and
//! `τ` converts MJ·m⁻³ per day into W·m⁻². The nonlinear system is iterated
//! with a tridiagonal linearisation whose capacity term is the enthalpy
//! chord, falling back to the analytic apparent capacity when the node has
//! barely moved. A step that does not converge is rolled back and retried
//! at half the size.

use tracing::{debug, trace};

use super::tridiagonal::TridiagonalSystem;
use crate::column::LayeredColumnState;
use crate::config::SolverConfig;
use crate::core_types::OffsetArray;
use crate::error::{GiplError, GiplResult};
use crate::physics::constants::TIME_SCALE;

/// Remaining interval below which a step counts as reaching the target (days)
const TIME_EPSILON: f64 = 1.0e-9;

/// Step-control state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepState {
    /// Ready to attempt the next step
    Stepping,
    /// The attempted step met the tolerance
    Converged {
        /// Iterations used
        iterations: u32,
    },
    /// Iteration budget exhausted or non-finite increment
    NotConverged,
    /// Target time reached
    Done,
}

/// Time-stepping state, reset at the start of every interval.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepControl {
    /// Time since the start of the interval (days)
    pub time: f64,
    /// Step size for the next attempt (days)
    pub step: f64,
    /// Consecutive quickly converged steps
    pub fast_streak: u32,
}

/// Bookkeeping of one [`ImplicitConductionSolver::advance`] call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AdvanceStats {
    pub accepted_steps: usize,
    pub rejected_steps: usize,
    pub iterations: usize,
    /// Step size in effect after each accepted step (days)
    pub step_history: Vec<f64>,
}

#[inline]
fn face_conductance(k_a: f64, k_b: f64, dx: f64) -> f64 {
    let sum = k_a + k_b;
    if sum <= 0.0 {
        0.0
    } else {
        2.0 * k_a * k_b / (sum * dx)
    }
}

fn snapshot(dst: &mut OffsetArray<f64>, src: &OffsetArray<f64>) {
    if dst.min_index() == src.min_index() && dst.len() == src.len() {
        dst.copy_from(src);
    } else {
        *dst = src.clone();
    }
}

/// Nonlinear implicit conduction solver for one column.
#[derive(Debug, Clone)]
pub struct ImplicitConductionSolver {
    config: SolverConfig,
    control: StepControl,
    system: TridiagonalSystem,
    saved_temperature: OffsetArray<f64>,
    saved_fraction: OffsetArray<f64>,
    // Per active node, indexed by `i - top`
    old_enthalpy: Vec<f64>,
    enthalpy: Vec<f64>,
    conductivity: Vec<f64>,
    capacity: Vec<f64>,
}

impl ImplicitConductionSolver {
    #[must_use]
    pub fn new(config: SolverConfig) -> Self {
        Self {
            control: StepControl {
                time: 0.0,
                step: config.max_step_days,
                fast_streak: 0,
            },
            config,
            system: TridiagonalSystem::default(),
            saved_temperature: OffsetArray::filled(0, 0, 0.0),
            saved_fraction: OffsetArray::filled(0, 0, 0.0),
            old_enthalpy: Vec::new(),
            enthalpy: Vec::new(),
            conductivity: Vec::new(),
            capacity: Vec::new(),
        }
    }

    pub fn config(&self) -> &SolverConfig {
        &self.config
    }

    pub fn control(&self) -> StepControl {
        self.control
    }

    /// Start a new interval at time 0 with the maximum step size.
    pub fn reset(&mut self) {
        self.reset_with_step(self.config.max_step_days);
    }

    /// Start a new interval at time 0 with the given step size, bounded to
    /// `[min_step_days, max_step_days]`.
    pub fn reset_with_step(&mut self, step: f64) {
        self.control = StepControl {
            time: 0.0,
            step: step.clamp(self.config.min_step_days, self.config.max_step_days),
            fast_streak: 0,
        };
    }

    /// Advance `column` from the current time to `t_end` (days).
    ///
    /// `surface` gives the top-boundary temperature at a given time;
    /// `geothermal_flux` is the heat flux into the column base (W/m²).
    /// Snow geometry, snow properties and water content stay fixed during
    /// the call.
    ///
    /// # Errors
    ///
    /// [`GiplError::InvalidProperty`] as soon as a mixed property is invalid
    /// and [`GiplError::Divergence`] when halving reaches the minimum step.
    /// In both cases the column is left at the last accepted step.
    pub fn advance(
        &mut self,
        column: &mut LayeredColumnState,
        t_end: f64,
        geothermal_flux: f64,
        surface: impl Fn(f64) -> f64,
    ) -> GiplResult<AdvanceStats> {
        let mut stats = AdvanceStats::default();
        let mut state = StepState::Stepping;
        let mut dt = 0.0;

        loop {
            state = match state {
                StepState::Stepping => {
                    let remaining = t_end - self.control.time;
                    if remaining <= TIME_EPSILON {
                        StepState::Done
                    } else {
                        dt = self.control.step.min(remaining);
                        let boundary = surface(self.control.time + dt);
                        match self.attempt(column, dt, boundary, geothermal_flux) {
                            Ok(next) => next,
                            Err(err) => {
                                self.rollback(column);
                                return Err(err);
                            }
                        }
                    }
                }
                StepState::Converged { iterations } => {
                    self.control.time += dt;
                    self.register_convergence(iterations);
                    stats.accepted_steps += 1;
                    stats.iterations += iterations as usize;
                    stats.step_history.push(self.control.step);
                    trace!(
                        "Accepted step {:.3e} d at t = {:.6} d after {} iterations",
                        dt,
                        self.control.time,
                        iterations
                    );
                    StepState::Stepping
                }
                StepState::NotConverged => {
                    self.rollback(column);
                    stats.rejected_steps += 1;
                    stats.iterations += self.config.max_iterations as usize;
                    let halved = self.control.step * 0.5;
                    if halved < self.config.min_step_days {
                        return Err(GiplError::Divergence {
                            time: self.control.time,
                            step: halved,
                        });
                    }
                    debug!(
                        "No convergence at t = {:.6} d, halving step to {:.3e} d",
                        self.control.time, halved
                    );
                    self.control.step = halved;
                    self.control.fast_streak = 0;
                    StepState::Stepping
                }
                StepState::Done => break,
            };
        }

        if t_end > self.control.time {
            self.control.time = t_end;
        }
        Ok(stats)
    }

    fn register_convergence(&mut self, iterations: u32) {
        if iterations <= self.config.fast_convergence_iterations {
            self.control.fast_streak += 1;
            if self.control.fast_streak >= self.config.growth_streak {
                self.control.step = (self.control.step * 2.0).min(self.config.max_step_days);
                self.control.fast_streak = 0;
            }
        } else {
            self.control.fast_streak = 0;
        }
    }

    fn rollback(&self, column: &mut LayeredColumnState) {
        column.temperature.copy_from(&self.saved_temperature);
        column.liquid_fraction.copy_from(&self.saved_fraction);
    }

    fn resize_node_buffers(&mut self, count: usize) {
        for v in [
            &mut self.old_enthalpy,
            &mut self.enthalpy,
            &mut self.conductivity,
            &mut self.capacity,
        ] {
            v.clear();
            v.resize(count, 0.0);
        }
    }

    /// One step attempt of size `dt`; leaves the iterate in `column`.
    fn attempt(
        &mut self,
        column: &mut LayeredColumnState,
        dt: f64,
        surface_temperature: f64,
        geothermal_flux: f64,
    ) -> GiplResult<StepState> {
        let top = column.top();
        let bottom = column.bottom();
        let unknowns = (bottom - top) as usize;

        snapshot(&mut self.saved_temperature, &column.temperature);
        snapshot(&mut self.saved_fraction, &column.liquid_fraction);
        self.resize_node_buffers(unknowns + 1);

        for i in top..=bottom {
            let k = (i - top) as usize;
            self.old_enthalpy[k] = column
                .material(i)
                .enthalpy(column.temperature[i], column.liquid_fraction[i]);
        }
        column.temperature[top] = surface_temperature;

        for iteration in 1..=self.config.max_iterations {
            self.update_properties(column, top, bottom)?;
            self.assemble(column, top, bottom, dt, geothermal_flux);

            if !self.system.solve() {
                return Ok(StepState::NotConverged);
            }

            let mut max_change: f64 = 0.0;
            for (row, &delta) in self.system.solution().iter().enumerate() {
                if !delta.is_finite() {
                    return Ok(StepState::NotConverged);
                }
                column.temperature[top + 1 + row as i32] += delta;
                max_change = max_change.max(delta.abs());
            }

            if max_change < self.config.convergence_tolerance {
                for i in top..=bottom {
                    column.liquid_fraction[i] =
                        column.unfrozen_water(i, column.temperature[i]).fraction;
                }
                return Ok(StepState::Converged {
                    iterations: iteration,
                });
            }
        }
        Ok(StepState::NotConverged)
    }

    /// Mix properties at the current iterate and form the regularized
    /// capacity of every active node.
    fn update_properties(
        &mut self,
        column: &mut LayeredColumnState,
        top: i32,
        bottom: i32,
    ) -> GiplResult<()> {
        let dlt = self.config.enthalpy_regularization;
        for i in top..=bottom {
            let k = (i - top) as usize;
            let t = column.temperature[i];
            let water = column.unfrozen_water(i, t);
            let props = column.material(i).mix(i, t, &water)?;
            column.liquid_fraction[i] = water.fraction;

            self.conductivity[k] = props.conductivity;
            self.enthalpy[k] = props.enthalpy;
            let change = t - self.saved_temperature[i];
            self.capacity[k] = if change.abs() > dlt {
                (props.enthalpy - self.old_enthalpy[k]) / change
            } else {
                props.heat_capacity
            };
        }
        Ok(())
    }

    /// Build `J·δ = −R` for the unknown nodes `top+1..=bottom`.
    fn assemble(
        &mut self,
        column: &LayeredColumnState,
        top: i32,
        bottom: i32,
        dt: f64,
        geothermal_flux: f64,
    ) {
        let x = column.coordinates();
        let t = &column.temperature;
        self.system.resize((bottom - top) as usize);

        for i in (top + 1)..=bottom {
            let k = (i - top) as usize;
            let row = k - 1;

            let g_up = face_conductance(self.conductivity[k - 1], self.conductivity[k], x[i] - x[i - 1]);
            let mut heat_in = g_up * (t[i - 1] - t[i]);
            let (g_down, width) = if i < bottom {
                let g = face_conductance(self.conductivity[k], self.conductivity[k + 1], x[i + 1] - x[i]);
                heat_in += g * (t[i + 1] - t[i]);
                (g, 0.5 * (x[i + 1] - x[i - 1]))
            } else {
                heat_in += geothermal_flux;
                (0.0, 0.5 * (x[i] - x[i - 1]))
            };

            let storage = TIME_SCALE * width;
            let residual = storage * (self.enthalpy[k] - self.old_enthalpy[k]) - dt * heat_in;

            self.system.lower[row] = if row > 0 { -dt * g_up } else { 0.0 };
            self.system.upper[row] = -dt * g_down;
            self.system.diagonal[row] = storage * self.capacity[k] + dt * (g_up + g_down);
            self.system.rhs[row] = -residual;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::MaterialCatalog;
    use crate::column::{ColumnSetup, SnowSpec, SoilLayerSpec};
    use crate::core_types::{Celsius, Meters};
    use crate::physics::CalibrationTable;
    use approx::assert_relative_eq;
    use std::sync::Arc;

    fn flat_catalog(fraction: f64) -> Arc<MaterialCatalog> {
        let table = CalibrationTable::from_fn(-30.0, 10.0, 64, |_| (fraction, 0.0));
        let mut catalog = MaterialCatalog::new(0.0);
        catalog.add_layer("Flat", 1.5, 2.0, 0.4, &table).unwrap();
        catalog.into_shared()
    }

    fn column(catalog: Arc<MaterialCatalog>, temperature: f64) -> LayeredColumnState {
        let setup = ColumnSetup {
            snow: SnowSpec::default(),
            soil_layers: vec![SoilLayerSpec {
                layer_type: "Flat".to_string(),
                nodes: 10,
                max_depth: Meters::new(1.0),
                initial_temperature: Celsius::new(temperature),
                initial_water_content: 0.3,
            }],
            porosity_profile: None,
            output_depths: None,
            geothermal_heat_flux: None,
            solver: SolverConfig::default(),
        };
        LayeredColumnState::new(catalog, &setup).unwrap()
    }

    #[test]
    fn face_conductance_is_harmonic() {
        assert_relative_eq!(face_conductance(1.0, 1.0, 0.5), 2.0);
        assert_relative_eq!(face_conductance(1.0, 3.0, 1.0), 1.5);
        assert_eq!(face_conductance(0.0, 0.0, 1.0), 0.0);
    }

    #[test]
    fn zero_elapsed_time_is_identity() {
        let mut col = column(flat_catalog(1.0), 3.0);
        let before = col.temperature().clone();
        let mut solver = ImplicitConductionSolver::new(SolverConfig::default());
        let stats = solver.advance(&mut col, 0.0, 0.05, |_| -20.0).unwrap();
        assert_eq!(stats.accepted_steps, 0);
        assert_eq!(col.temperature(), &before);
    }

    #[test]
    fn equilibrium_is_preserved() {
        let mut col = column(flat_catalog(1.0), -1.5);
        let before = col.temperature().clone();
        let mut solver = ImplicitConductionSolver::new(SolverConfig::default());
        solver.advance(&mut col, 5.0, 0.0, |_| -1.5).unwrap();
        for i in 0..=col.bottom() {
            assert_relative_eq!(col.temperature()[i], before[i], epsilon = 1e-12);
        }
        assert_relative_eq!(solver.control().time, 5.0);
    }

    #[test]
    fn surface_cooling_propagates_downward() {
        let mut col = column(flat_catalog(1.0), 2.0);
        let mut solver = ImplicitConductionSolver::new(SolverConfig::default());
        solver.advance(&mut col, 3.0, 0.0, |_| -5.0).unwrap();
        let t = col.soil_temperatures();
        assert_eq!(t[0], -5.0);
        assert!(t.windows(2).all(|w| w[1] >= w[0] - 1e-9), "{t:?}");
        assert!(t[1] < 2.0);
        assert!(t[10] <= 2.0);
    }

    #[test]
    fn steps_grow_monotonically_to_the_maximum() {
        let mut col = column(flat_catalog(1.0), 0.0);
        let mut solver = ImplicitConductionSolver::new(SolverConfig::default());
        solver.reset_with_step(0.01);
        let stats = solver.advance(&mut col, 4.0, 0.0, |t| -t).unwrap();
        assert!(stats.rejected_steps == 0);
        let history = &stats.step_history;
        assert!(history.windows(2).all(|w| w[1] >= w[0]), "{history:?}");
        assert!(history.iter().all(|&s| s <= 0.5));
        assert_relative_eq!(*history.last().unwrap(), 0.5);
    }

    #[test]
    fn non_finite_state_is_fatal_and_rolls_back() {
        let mut col = column(flat_catalog(1.0), 1.0);
        let mut solver = ImplicitConductionSolver::new(SolverConfig::default());
        solver.advance(&mut col, 1.0, 0.0, |_| 1.0).unwrap();

        col.temperature[4] = f64::NAN;
        let err = solver.advance(&mut col, 2.0, 0.0, |_| 1.0).unwrap_err();
        assert!(matches!(err, GiplError::InvalidProperty { node: 4, .. }), "{err}");
        assert!(col.temperature()[4].is_nan());
        assert_eq!(col.temperature()[0], 1.0);
        assert_relative_eq!(solver.control().time, 1.0);
    }

    #[test]
    fn divergence_reports_time_and_step() {
        let mut col = column(flat_catalog(1.0), 1.0);
        let config = SolverConfig {
            max_iterations: 1,
            min_step_days: 0.1,
            ..SolverConfig::default()
        };
        let mut solver = ImplicitConductionSolver::new(config);
        // A single iteration never confirms convergence of a real change.
        let err = solver.advance(&mut col, 1.0, 0.0, |_| -30.0).unwrap_err();
        match err {
            GiplError::Divergence { time, step } => {
                assert_eq!(time, 0.0);
                assert!(step < 0.1);
            }
            other => panic!("unexpected {other:?}"),
        }
        assert!(col.temperature().all_finite());
        assert_eq!(col.temperature()[1], 1.0);
    }
}
