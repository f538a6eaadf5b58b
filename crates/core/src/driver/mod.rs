//! Column driver: runs one multi-day interval
//!
//! ```rust,ignore
//! use permafrost_core::{Column, ColumnSetup, ForcingInterval, MaterialCatalog};
//!
//! let catalog = MaterialCatalog::presets(0.05)?.into_shared();
//! let mut column = Column::new("site-1", catalog, &setup)?;
//! let results = column.run_interval(&ForcingInterval::air_only(daily_air))?;
//! println!("{:?}", results.average_profile);
//! ```

mod forcing;
mod results;

pub use forcing::{ForcingInterval, WaterContentProfile};
pub use results::{IntervalResults, IntervalStats};

use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::catalog::MaterialCatalog;
use crate::column::{ColumnSetup, LayeredColumnState};
use crate::core_types::interpolate_profile;
use crate::core_types::units::raw_values;
use crate::error::GiplResult;
use crate::physics::constants::J_TO_MJ;
use crate::solver::ImplicitConductionSolver;

/// A named column with its solver, advanced one interval at a time.
#[derive(Debug, Clone)]
pub struct Column {
    name: String,
    state: LayeredColumnState,
    solver: ImplicitConductionSolver,
    output_depths: Option<Vec<f64>>,
    geothermal_heat_flux: f64,
}

impl Column {
    /// Build a column from `setup` with materials from `catalog`.
    ///
    /// # Errors
    ///
    /// Any configuration error of the setup or unknown layer types.
    pub fn new(
        name: impl Into<String>,
        catalog: Arc<MaterialCatalog>,
        setup: &ColumnSetup,
    ) -> GiplResult<Self> {
        let name = name.into();
        let geothermal_heat_flux = setup
            .geothermal_heat_flux
            .map_or_else(|| catalog.geothermal_heat_flux(), f64::from);
        let state = LayeredColumnState::new(catalog, setup)?;
        info!(
            "Column '{}' initialized: {} soil nodes to {:.2} m, geothermal flux {} W/m²",
            name,
            state.soil_node_count(),
            state.soil_depths().last().copied().unwrap_or(0.0),
            geothermal_heat_flux
        );
        Ok(Self {
            name,
            state,
            solver: ImplicitConductionSolver::new(setup.solver),
            output_depths: setup.output_depths.as_deref().map(raw_values),
            geothermal_heat_flux,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn state(&self) -> &LayeredColumnState {
        &self.state
    }

    /// Reference depth of every soil node, surface first (m).
    pub fn soil_depths(&self) -> Vec<f64> {
        self.state.soil_depths()
    }

    pub fn output_depths(&self) -> Option<&[f64]> {
        self.output_depths.as_deref()
    }

    pub fn geothermal_heat_flux(&self) -> f64 {
        self.geothermal_heat_flux
    }

    /// Simulate the days of `forcing` and record daily soil profiles.
    ///
    /// Day `d` advances the column from time `d` to `d + 1`. The water
    /// content and snow properties are applied once for the interval; the
    /// snow thickness changes daily.
    ///
    /// # Errors
    ///
    /// Invalid forcing, invalid properties and divergence. On error the
    /// column keeps the state of the last accepted step.
    pub fn run_interval(&mut self, forcing: &ForcingInterval) -> GiplResult<IntervalResults> {
        forcing.validate()?;

        let depths = self.state.soil_depths();
        match &forcing.water_content {
            Some(WaterContentProfile::AtNodes(values)) => {
                self.state.apply_water_content(values)?;
            }
            Some(WaterContentProfile::AtDepths {
                depths: source,
                values,
            }) => {
                let mapped = interpolate_profile(source, values, &depths);
                self.state.apply_water_content(&mapped)?;
            }
            None => debug!("Column '{}': reusing stored water content", self.name),
        }

        let (snow_conductivity, snow_heat_capacity) = forcing.mean_snow_properties();
        self.state
            .set_snow_properties(snow_conductivity, snow_heat_capacity * J_TO_MJ);
        self.solver.reset();

        let days = forcing.days();
        info!("Column '{}': simulating {} days", self.name, days);

        let mut results = IntervalResults::default();
        for day in 0..days {
            let start = day as f64;
            self.state
                .apply_snow_thickness(forcing.snow_thickness_on(day), forcing.surface_temperature(start))?;

            let advanced = self
                .solver
                .advance(&mut self.state, start + 1.0, self.geothermal_heat_flux, |t| {
                    forcing.surface_temperature(t)
                })
                .inspect_err(|err| warn!("Column '{}' failed on day {}: {}", self.name, day, err))?;

            results.stats.accepted_steps += advanced.accepted_steps;
            results.stats.rejected_steps += advanced.rejected_steps;
            results.stats.iterations += advanced.iterations;

            let profile = self.state.soil_temperatures().to_vec();
            if let Some(targets) = &self.output_depths {
                results
                    .daily_profiles_at_depths
                    .push(interpolate_profile(&depths, &profile, targets));
            }
            results.daily_profiles.push(profile);
            results
                .daily_front_depth
                .push(self.state.freezing_front_depth());
        }
        results.finish();

        info!(
            "Column '{}': {} days done in {} steps ({} rejected)",
            self.name, days, results.stats.accepted_steps, results.stats.rejected_steps
        );
        Ok(results)
    }
}
