//! Serializable description of a column
//!
//! A [`ColumnSetup`] is what a host model or the demo hands over to build a
//! column: the snow grid, the ordered soil layers and optional per-node
//! overrides. Validation happens in [`ColumnSetup::validate`] before any
//! array is allocated.

use serde::{Deserialize, Serialize};

use crate::config::SolverConfig;
use crate::core_types::{Celsius, HeatFlux, Meters};
use crate::error::{GiplError, GiplResult};

/// Snow grid above the ground surface.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnowSpec {
    /// Number of snow nodes (0 disables snow)
    pub nodes: usize,
    /// Largest representable snow thickness
    pub max_thickness: Meters,
    /// Initial snow node temperature
    pub initial_temperature: Celsius,
}

impl Default for SnowSpec {
    fn default() -> Self {
        Self {
            nodes: 0,
            max_thickness: Meters::new(0.0),
            initial_temperature: Celsius::new(0.0),
        }
    }
}

/// One soil layer, listed from the surface down.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SoilLayerSpec {
    /// Catalog name of the layer type
    pub layer_type: String,
    /// Nodes inside the layer, the deepest sitting at `max_depth`
    pub nodes: usize,
    /// Depth of the layer bottom (positive down)
    pub max_depth: Meters,
    /// Initial temperature
    pub initial_temperature: Celsius,
    /// Initial total water content (m³/m³)
    pub initial_water_content: f64,
}

/// Complete column description.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnSetup {
    #[serde(default)]
    pub snow: SnowSpec,
    pub soil_layers: Vec<SoilLayerSpec>,
    /// Porosity per soil node (surface first); shorter profiles are extended
    /// with their last value, absent means the layer type defaults
    #[serde(default)]
    pub porosity_profile: Option<Vec<f64>>,
    /// Depths at which daily profiles are additionally reported
    #[serde(default)]
    pub output_depths: Option<Vec<Meters>>,
    /// Overrides the catalog's geothermal heat flux
    #[serde(default)]
    pub geothermal_heat_flux: Option<HeatFlux>,
    #[serde(default)]
    pub solver: SolverConfig,
}

fn check_temperature(what: &str, t: Celsius) -> GiplResult<()> {
    if t.is_finite() && t >= Celsius::ABSOLUTE_ZERO {
        Ok(())
    } else {
        Err(GiplError::InvalidColumn(format!(
            "{what} initial temperature {t} is below absolute zero or not finite"
        )))
    }
}

impl ColumnSetup {
    /// Total number of soil nodes below the surface node.
    #[must_use]
    pub fn soil_node_count(&self) -> usize {
        self.soil_layers.iter().map(|l| l.nodes).sum()
    }

    /// Check the structural invariants of the setup.
    ///
    /// # Errors
    ///
    /// Returns [`GiplError::InvalidColumn`] describing the first violation.
    pub fn validate(&self) -> GiplResult<()> {
        let snow = &self.snow;
        if !(snow.max_thickness.is_finite() && *snow.max_thickness >= 0.0) {
            return Err(GiplError::InvalidColumn(format!(
                "snow max thickness must be non-negative, got {}",
                snow.max_thickness
            )));
        }
        if snow.nodes > 0 && *snow.max_thickness <= 0.0 {
            return Err(GiplError::InvalidColumn(
                "snow nodes require a positive max thickness".to_string(),
            ));
        }
        check_temperature("snow", snow.initial_temperature)?;

        if self.soil_layers.is_empty() {
            return Err(GiplError::InvalidColumn("no soil layers".to_string()));
        }
        let mut previous = 0.0;
        for (k, layer) in self.soil_layers.iter().enumerate() {
            if layer.nodes == 0 {
                return Err(GiplError::InvalidColumn(format!(
                    "layer {k} ({}) has no nodes",
                    layer.layer_type
                )));
            }
            if !(layer.max_depth.is_finite() && *layer.max_depth > previous) {
                return Err(GiplError::InvalidColumn(format!(
                    "layer {k} max depth {} must exceed {previous}",
                    layer.max_depth
                )));
            }
            check_temperature(&format!("layer {k}"), layer.initial_temperature)?;
            if !(layer.initial_water_content.is_finite() && layer.initial_water_content >= 0.0) {
                return Err(GiplError::InvalidColumn(format!(
                    "layer {k} water content must be non-negative, got {}",
                    layer.initial_water_content
                )));
            }
            previous = *layer.max_depth;
        }

        if let Some(profile) = &self.porosity_profile {
            if profile.is_empty() {
                return Err(GiplError::InvalidColumn("empty porosity profile".to_string()));
            }
            if let Some(bad) = profile.iter().find(|p| !(**p > 0.0 && **p <= 1.0)) {
                return Err(GiplError::InvalidColumn(format!(
                    "porosity must be in (0, 1], got {bad}"
                )));
            }
        }
        if let Some(depths) = &self.output_depths {
            if depths.iter().any(|d| !d.is_finite()) {
                return Err(GiplError::InvalidColumn("non-finite output depth".to_string()));
            }
        }
        if let Some(flux) = self.geothermal_heat_flux {
            if !flux.is_finite() {
                return Err(GiplError::InvalidColumn(format!(
                    "geothermal heat flux must be finite, got {flux}"
                )));
            }
        }

        let cfg = &self.solver;
        if cfg.max_iterations == 0
            || !(cfg.min_step_days > 0.0 && cfg.min_step_days <= cfg.max_step_days)
            || !(cfg.convergence_tolerance > 0.0)
        {
            return Err(GiplError::InvalidColumn(format!(
                "inconsistent solver settings {cfg:?}"
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup() -> ColumnSetup {
        ColumnSetup {
            snow: SnowSpec {
                nodes: 4,
                max_thickness: Meters::new(1.0),
                initial_temperature: Celsius::new(-1.0),
            },
            soil_layers: vec![
                SoilLayerSpec {
                    layer_type: "Peat".to_string(),
                    nodes: 5,
                    max_depth: Meters::new(0.5),
                    initial_temperature: Celsius::new(1.0),
                    initial_water_content: 0.6,
                },
                SoilLayerSpec {
                    layer_type: "MineralSoil".to_string(),
                    nodes: 10,
                    max_depth: Meters::new(5.0),
                    initial_temperature: Celsius::new(-1.0),
                    initial_water_content: 0.3,
                },
            ],
            porosity_profile: None,
            output_depths: None,
            geothermal_heat_flux: None,
            solver: SolverConfig::default(),
        }
    }

    #[test]
    fn valid_setup_passes() {
        let s = setup();
        s.validate().unwrap();
        assert_eq!(s.soil_node_count(), 15);
    }

    #[test]
    fn non_increasing_depths_are_rejected() {
        let mut s = setup();
        s.soil_layers[1].max_depth = Meters::new(0.5);
        assert!(matches!(s.validate(), Err(GiplError::InvalidColumn(_))));
    }

    #[test]
    fn temperature_below_absolute_zero_is_rejected() {
        let mut s = setup();
        s.soil_layers[0].initial_temperature = Celsius::new(-300.0);
        assert!(s.validate().is_err());
    }

    #[test]
    fn zero_node_layer_is_rejected() {
        let mut s = setup();
        s.soil_layers[0].nodes = 0;
        assert!(s.validate().is_err());
    }

    #[test]
    fn snow_nodes_without_thickness_are_rejected() {
        let mut s = setup();
        s.snow.max_thickness = Meters::new(0.0);
        assert!(s.validate().is_err());
        s.snow.nodes = 0;
        s.validate().unwrap();
    }

    #[test]
    fn deserializes_minimal_json() {
        let json = r#"{
            "soil_layers": [
                { "layer_type": "Peat", "nodes": 10, "max_depth": 1.0,
                  "initial_temperature": 2.0, "initial_water_content": 0.4 }
            ]
        }"#;
        let s: ColumnSetup = serde_json::from_str(json).unwrap();
        assert_eq!(s.snow.nodes, 0);
        assert_eq!(s.solver, SolverConfig::default());
        s.validate().unwrap();
    }
}
