//! Grid and thermal state of one column
//!
//! Index layout (`Sx` snow nodes, `N` soil nodes):
//!
//! ```text
//!   -Sx .. -1   snow, reference coordinate i * (max_snow / Sx)
//!   0           ground surface, material of the first soil layer
//!   1 .. N-1    interior soil nodes
//!   N           bottom node at the deepest layer's max depth
//! ```
//!
//! Only the deepest `n` snow nodes are active on a given day; they are spread
//! uniformly over the actual snow thickness. Inactive snow nodes follow the
//! surface temperature.

use std::sync::Arc;
use tracing::{debug, warn};

use super::setup::ColumnSetup;
use crate::catalog::{LayerTypeId, MaterialCatalog};
use crate::core_types::OffsetArray;
use crate::error::{GiplError, GiplResult};
use crate::physics::{NodeMaterial, SoilComposition, UnfrozenWater};

/// Unfrozen fraction that marks the freezing front.
pub const FRONT_FRACTION: f64 = 0.5;

/// Snow geometry and properties currently applied to the column.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SnowCover {
    /// Snow thickness after clamping (m)
    pub thickness: f64,
    /// Number of active snow nodes
    pub active_nodes: i32,
    /// W/m/K
    pub conductivity: f64,
    /// MJ/m³/K
    pub heat_capacity: f64,
}

fn node_index(count: usize, what: &str) -> GiplResult<i32> {
    i32::try_from(count)
        .map_err(|_| GiplError::InvalidColumn(format!("too many {what} nodes: {count}")))
}

/// Offset-indexed state of a snow/soil column.
#[derive(Debug, Clone)]
pub struct LayeredColumnState {
    catalog: Arc<MaterialCatalog>,
    snow_nodes: i32,
    snow_max_thickness: f64,
    bottom: i32,
    /// Fixed reference coordinates (m, negative in snow)
    reference: OffsetArray<f64>,
    /// Working coordinates with the active snow nodes spread over the pack
    coordinates: OffsetArray<f64>,
    layer_type: OffsetArray<LayerTypeId>,
    porosity: OffsetArray<f64>,
    water_content: OffsetArray<f64>,
    pub(crate) temperature: OffsetArray<f64>,
    pub(crate) liquid_fraction: OffsetArray<f64>,
    snow: SnowCover,
}

impl LayeredColumnState {
    /// Build the grid and initial state described by `setup`.
    ///
    /// # Errors
    ///
    /// Invalid setups ([`GiplError::InvalidColumn`]) and layer types missing
    /// from the catalog ([`GiplError::UnknownLayerType`]).
    pub fn new(catalog: Arc<MaterialCatalog>, setup: &ColumnSetup) -> GiplResult<Self> {
        setup.validate()?;

        let layer_ids = setup
            .soil_layers
            .iter()
            .map(|l| catalog.resolve(&l.layer_type))
            .collect::<GiplResult<Vec<_>>>()?;

        let snow_nodes = node_index(setup.snow.nodes, "snow")?;
        let bottom = node_index(setup.soil_node_count(), "soil")?;
        let first = &setup.soil_layers[0];

        let mut reference = OffsetArray::filled(-snow_nodes, bottom, 0.0);
        let mut temperature = OffsetArray::filled(-snow_nodes, bottom, *first.initial_temperature);
        let mut layer_type = OffsetArray::filled(0, bottom, layer_ids[0]);
        let mut water_content = OffsetArray::filled(0, bottom, first.initial_water_content);

        if snow_nodes > 0 {
            let step = *setup.snow.max_thickness / f64::from(snow_nodes);
            for i in -snow_nodes..0 {
                reference[i] = f64::from(i) * step;
                temperature[i] = *setup.snow.initial_temperature;
            }
        }

        let mut node = 1;
        let mut top_depth = 0.0;
        for (layer, &id) in setup.soil_layers.iter().zip(&layer_ids) {
            let count = node_index(layer.nodes, "layer")?;
            let spacing = (*layer.max_depth - top_depth) / f64::from(count);
            for j in 1..=count {
                reference[node] = top_depth + spacing * f64::from(j);
                layer_type[node] = id;
                temperature[node] = *layer.initial_temperature;
                water_content[node] = layer.initial_water_content;
                node += 1;
            }
            top_depth = *layer.max_depth;
        }

        let mut porosity = OffsetArray::filled(0, bottom, 0.0);
        for i in 0..=bottom {
            porosity[i] = match &setup.porosity_profile {
                Some(profile) => profile[(i as usize).min(profile.len() - 1)],
                None => {
                    let layer = catalog.layer(layer_type[i]);
                    layer.porosity.ok_or_else(|| {
                        GiplError::InvalidColumn(format!(
                            "layer type '{}' has no default porosity; supply porosity_profile",
                            layer.name
                        ))
                    })?
                }
            };
        }

        let mut clamped = 0;
        for i in 0..=bottom {
            if water_content[i] > porosity[i] {
                water_content[i] = porosity[i];
                clamped += 1;
            }
        }
        if clamped > 0 {
            warn!("Initial water content clamped to porosity at {clamped} nodes");
        }

        let mut state = Self {
            catalog,
            snow_nodes,
            snow_max_thickness: *setup.snow.max_thickness,
            bottom,
            coordinates: reference.clone(),
            reference,
            layer_type,
            porosity,
            water_content,
            liquid_fraction: OffsetArray::filled(-snow_nodes, bottom, 0.0),
            temperature,
            snow: SnowCover::default(),
        };
        state.refresh_liquid_fraction();
        debug!(
            "Column built: {} snow nodes, {} soil nodes down to {:.3} m",
            snow_nodes,
            bottom + 1,
            state.reference[bottom]
        );
        Ok(state)
    }

    /// Index of the topmost active node (Dirichlet boundary).
    #[inline]
    pub fn top(&self) -> i32 {
        -self.snow.active_nodes
    }

    /// Index of the bottom node (geothermal boundary).
    #[inline]
    pub fn bottom(&self) -> i32 {
        self.bottom
    }

    /// Declared number of snow nodes.
    pub fn snow_node_count(&self) -> i32 {
        self.snow_nodes
    }

    /// Number of soil nodes including the surface node.
    pub fn soil_node_count(&self) -> usize {
        self.bottom as usize + 1
    }

    pub fn catalog(&self) -> &Arc<MaterialCatalog> {
        &self.catalog
    }

    pub fn snow(&self) -> &SnowCover {
        &self.snow
    }

    /// Working coordinates of every node (m).
    pub fn coordinates(&self) -> &OffsetArray<f64> {
        &self.coordinates
    }

    pub fn temperature(&self) -> &OffsetArray<f64> {
        &self.temperature
    }

    pub fn liquid_fraction(&self) -> &OffsetArray<f64> {
        &self.liquid_fraction
    }

    /// Reference depth of every soil node, surface first (m).
    pub fn soil_depths(&self) -> Vec<f64> {
        self.reference.range(0, self.bottom).to_vec()
    }

    /// Temperature of every soil node, surface first (°C).
    pub fn soil_temperatures(&self) -> &[f64] {
        self.temperature.range(0, self.bottom)
    }

    pub fn soil_liquid_fraction(&self) -> &[f64] {
        self.liquid_fraction.range(0, self.bottom)
    }

    /// Total water content per soil node (m³/m³).
    pub fn water_content(&self) -> &[f64] {
        self.water_content.as_slice()
    }

    /// Saturation capacity per soil node (m³/m³).
    pub fn porosity(&self) -> &[f64] {
        self.porosity.as_slice()
    }

    /// Material of node `i` under the current snow cover.
    pub fn material(&self, i: i32) -> NodeMaterial {
        if i < 0 {
            NodeMaterial::Snow {
                conductivity: self.snow.conductivity,
                heat_capacity: self.snow.heat_capacity,
            }
        } else {
            let layer = self.catalog.layer(self.layer_type[i]);
            NodeMaterial::Soil(SoilComposition {
                porosity: self.porosity[i],
                water_content: self.water_content[i],
                solid_conductivity: layer.solid_conductivity,
                solid_heat_capacity: layer.solid_heat_capacity,
            })
        }
    }

    /// Unfrozen-water state of node `i` at temperature `t`; snow holds none.
    pub fn unfrozen_water(&self, i: i32, t: f64) -> UnfrozenWater {
        if i < 0 {
            UnfrozenWater::held(0.0)
        } else {
            self.catalog.layer(self.layer_type[i]).curve.evaluate(t)
        }
    }

    /// Recompute the liquid fraction of every node from its temperature.
    pub fn refresh_liquid_fraction(&mut self) {
        for i in -self.snow_nodes..=self.bottom {
            self.liquid_fraction[i] = self.unfrozen_water(i, self.temperature[i]).fraction;
        }
    }

    /// Set the snow properties used for the rest of the interval.
    ///
    /// `heat_capacity` is in MJ/m³/K.
    pub fn set_snow_properties(&mut self, conductivity: f64, heat_capacity: f64) {
        self.snow.conductivity = conductivity;
        self.snow.heat_capacity = heat_capacity;
    }

    /// Apply the day's snow thickness and pin inactive snow nodes to
    /// `surface_temperature`.
    ///
    /// Thickness is clamped to `[0, max]`; packs thinner than half a snow
    /// node are ignored.
    ///
    /// # Errors
    ///
    /// [`GiplError::InvalidForcing`] for a non-finite thickness and
    /// [`GiplError::InvalidProperty`] when snow is present but its properties
    /// are not positive.
    pub fn apply_snow_thickness(&mut self, thickness: f64, surface_temperature: f64) -> GiplResult<()> {
        if !thickness.is_finite() {
            return Err(GiplError::InvalidForcing(format!(
                "snow thickness {thickness} is not finite"
            )));
        }
        let clamped = thickness.clamp(0.0, self.snow_max_thickness);
        if clamped != thickness {
            debug!("Snow thickness {thickness} m clamped to {clamped} m");
        }

        let active = if self.snow_nodes == 0 || clamped <= 0.0 {
            0
        } else {
            let step = self.snow_max_thickness / f64::from(self.snow_nodes);
            ((clamped / step).round() as i32).clamp(0, self.snow_nodes)
        };

        if active > 0 {
            for (quantity, value) in [
                ("snow conductivity", self.snow.conductivity),
                ("snow heat capacity", self.snow.heat_capacity),
            ] {
                if !(value.is_finite() && value > 0.0) {
                    return Err(GiplError::InvalidProperty {
                        quantity,
                        node: -1,
                        value,
                    });
                }
            }
        }

        for i in -self.snow_nodes..0 {
            if i >= -active {
                self.coordinates[i] = f64::from(i) * clamped / f64::from(active);
            } else {
                self.coordinates[i] = self.reference[i];
                self.temperature[i] = surface_temperature;
                self.liquid_fraction[i] = 0.0;
            }
        }

        self.snow.thickness = if active > 0 { clamped } else { 0.0 };
        self.snow.active_nodes = active;
        Ok(())
    }

    /// Replace the water-content profile (surface node first), clamping to
    /// `[0, porosity]`. A short profile is extended with its last value.
    /// Returns the number of clamped nodes.
    ///
    /// # Errors
    ///
    /// [`GiplError::InvalidForcing`] for an empty or non-finite profile.
    pub fn apply_water_content(&mut self, profile: &[f64]) -> GiplResult<usize> {
        let Some(&last) = profile.last() else {
            return Err(GiplError::InvalidForcing("empty water-content profile".to_string()));
        };
        if profile.iter().any(|w| !w.is_finite()) {
            return Err(GiplError::InvalidForcing(
                "non-finite water content".to_string(),
            ));
        }

        let mut clamped = 0;
        for i in 0..=self.bottom {
            let w = profile.get(i as usize).copied().unwrap_or(last);
            let limited = w.clamp(0.0, self.porosity[i]);
            if limited != w {
                clamped += 1;
            }
            self.water_content[i] = limited;
        }
        if clamped > 0 {
            warn!("Water content clamped to [0, porosity] at {clamped} nodes");
        }
        Ok(clamped)
    }

    /// Depth (m) where the liquid fraction first rises through
    /// [`FRONT_FRACTION`] going down from a frozen surface.
    ///
    /// `None` when the surface node is unfrozen; the bottom depth when the
    /// whole soil column is frozen.
    pub fn freezing_front_depth(&self) -> Option<f64> {
        let theta = &self.liquid_fraction;
        if theta[0] >= FRONT_FRACTION {
            return None;
        }
        for i in 0..self.bottom {
            let (upper, lower) = (theta[i], theta[i + 1]);
            if lower >= FRONT_FRACTION {
                let s = (FRONT_FRACTION - upper) / (lower - upper);
                let (x0, x1) = (self.reference[i], self.reference[i + 1]);
                return Some(x0 + s * (x1 - x0));
            }
        }
        Some(self.reference[self.bottom])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::column::setup::{SnowSpec, SoilLayerSpec};
    use crate::config::SolverConfig;
    use crate::core_types::{Celsius, Meters};
    use approx::assert_relative_eq;

    fn catalog() -> Arc<MaterialCatalog> {
        MaterialCatalog::presets(0.05).unwrap().into_shared()
    }

    fn setup() -> ColumnSetup {
        ColumnSetup {
            snow: SnowSpec {
                nodes: 5,
                max_thickness: Meters::new(1.0),
                initial_temperature: Celsius::new(-3.0),
            },
            soil_layers: vec![
                SoilLayerSpec {
                    layer_type: "Peat".to_string(),
                    nodes: 4,
                    max_depth: Meters::new(0.4),
                    initial_temperature: Celsius::new(1.0),
                    initial_water_content: 0.5,
                },
                SoilLayerSpec {
                    layer_type: "mineralsoil".to_string(),
                    nodes: 6,
                    max_depth: Meters::new(2.2),
                    initial_temperature: Celsius::new(-0.5),
                    initial_water_content: 0.9,
                },
            ],
            porosity_profile: None,
            output_depths: None,
            geothermal_heat_flux: None,
            solver: SolverConfig::default(),
        }
    }

    #[test]
    fn builds_layered_grid() {
        let state = LayeredColumnState::new(catalog(), &setup()).unwrap();
        assert_eq!(state.bottom(), 10);
        assert_eq!(state.soil_node_count(), 11);
        let depths = state.soil_depths();
        assert_relative_eq!(depths[0], 0.0);
        assert_relative_eq!(depths[4], 0.4, epsilon = 1e-12);
        assert_relative_eq!(depths[10], 2.2, epsilon = 1e-12);
        assert!(depths.windows(2).all(|w| w[1] > w[0]));
        assert_relative_eq!(state.coordinates()[-5], -1.0, epsilon = 1e-12);
        assert_eq!(state.temperature()[-1], -3.0);
        assert_eq!(state.soil_temperatures()[0], 1.0);
        assert_eq!(state.soil_temperatures()[5], -0.5);
    }

    #[test]
    fn initial_water_clamped_to_porosity() {
        let state = LayeredColumnState::new(catalog(), &setup()).unwrap();
        // MineralSoil porosity is 0.45, requested 0.9
        assert_relative_eq!(state.water_content()[7], 0.45);
        assert_relative_eq!(state.water_content()[2], 0.5);
    }

    #[test]
    fn porosity_profile_overrides_layer_defaults() {
        let mut s = setup();
        s.porosity_profile = Some(vec![0.6, 0.55, 0.5]);
        let state = LayeredColumnState::new(catalog(), &s).unwrap();
        assert_eq!(state.porosity()[1], 0.55);
        assert_eq!(state.porosity()[10], 0.5);
        assert_eq!(state.water_content()[0], 0.5);
    }

    #[test]
    fn layer_without_porosity_needs_profile() {
        let table = crate::physics::CalibrationTable::power_law(-0.05, 0.6, -30.0, 10.0, 64);
        let mut catalog = MaterialCatalog::new(0.05);
        catalog.add_layer("Peat", 0.35, 2.5, None, &table).unwrap();
        catalog.add_layer("MineralSoil", 2.5, 2.0, None, &table).unwrap();
        let catalog = catalog.into_shared();

        let err = LayeredColumnState::new(catalog.clone(), &setup()).unwrap_err();
        assert!(matches!(err, GiplError::InvalidColumn(ref m) if m.contains("porosity")), "{err}");

        let mut s = setup();
        s.porosity_profile = Some(vec![0.7]);
        let state = LayeredColumnState::new(catalog, &s).unwrap();
        assert!(state.porosity().iter().all(|&p| p == 0.7));
    }

    #[test]
    fn unknown_layer_type_fails() {
        let mut s = setup();
        s.soil_layers[1].layer_type = "Clay".to_string();
        let err = LayeredColumnState::new(catalog(), &s).unwrap_err();
        assert!(matches!(err, GiplError::UnknownLayerType { .. }));
    }

    #[test]
    fn snow_nodes_spread_over_actual_thickness() {
        let mut state = LayeredColumnState::new(catalog(), &setup()).unwrap();
        state.set_snow_properties(0.2, 0.6);
        state.apply_snow_thickness(0.43, -7.0).unwrap();
        assert_eq!(state.snow().active_nodes, 2);
        assert_eq!(state.top(), -2);
        assert_relative_eq!(state.coordinates()[-2], -0.43, epsilon = 1e-12);
        assert_relative_eq!(state.coordinates()[-1], -0.215, epsilon = 1e-12);
        assert_eq!(state.temperature()[-3], -7.0);
        let x = state.coordinates().as_slice();
        assert!(x.windows(2).all(|w| w[1] > w[0]));

        state.apply_snow_thickness(5.0, -7.0).unwrap();
        assert_eq!(state.snow().active_nodes, 5);
        assert_relative_eq!(state.snow().thickness, 1.0);

        state.apply_snow_thickness(0.05, -7.0).unwrap();
        assert_eq!(state.top(), 0);
    }

    #[test]
    fn snow_without_properties_is_rejected() {
        let mut state = LayeredColumnState::new(catalog(), &setup()).unwrap();
        let err = state.apply_snow_thickness(0.5, -1.0).unwrap_err();
        assert!(matches!(err, GiplError::InvalidProperty { node: -1, .. }));
        state.apply_snow_thickness(0.0, -1.0).unwrap();
    }

    #[test]
    fn water_profile_clamped_and_extended() {
        let mut state = LayeredColumnState::new(catalog(), &setup()).unwrap();
        let clamped = state.apply_water_content(&[-0.1, 0.3, 0.99]).unwrap();
        assert_eq!(state.water_content()[0], 0.0);
        assert_eq!(state.water_content()[1], 0.3);
        // Peat 0.85 for nodes 2..=4, mineral soil 0.45 below
        assert_eq!(state.water_content()[3], 0.85);
        assert_eq!(state.water_content()[9], 0.45);
        assert_eq!(clamped, 1 + 9);
        assert!(state.apply_water_content(&[]).is_err());
        assert!(state.apply_water_content(&[f64::NAN]).is_err());
    }

    #[test]
    fn freezing_front_interpolates_liquid_fraction() {
        let mut state = LayeredColumnState::new(catalog(), &setup()).unwrap();
        assert_eq!(state.freezing_front_depth(), None);
        for i in 0..=state.bottom() {
            state.temperature[i] = -10.0;
        }
        state.refresh_liquid_fraction();
        assert_relative_eq!(state.freezing_front_depth().unwrap(), 2.2, epsilon = 1e-12);

        state.liquid_fraction[0] = 0.0;
        state.liquid_fraction[1] = 0.25;
        state.liquid_fraction[2] = 0.75;
        let front = state.freezing_front_depth().unwrap();
        assert_relative_eq!(front, 0.15, epsilon = 1e-12);
    }
}
