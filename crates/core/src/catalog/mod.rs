//! Layer-type material catalog
//!
//! The catalog is built once (from a properties file, the built-in presets or
//! programmatically) and then shared read-only by every column through an
//! `Arc`. Each layer type carries the solid-matrix constants used by the
//! property mixer, a default porosity, and its fitted freezing curve.

mod loader;
mod presets;

pub use loader::load_calibration_table;
pub use presets::DEFAULT_GEOTHERMAL_HEAT_FLUX;

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::error::{GiplError, GiplResult};
use crate::physics::{CalibrationTable, FreezingCurve};

/// Index of a layer type inside a [`MaterialCatalog`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct LayerTypeId(pub usize);

/// One calibrated layer type.
#[derive(Debug, Clone)]
pub struct LayerMaterial {
    /// Name as written in the properties file
    pub name: String,
    /// Thermal conductivity of the solid matrix (W/m/K)
    pub solid_conductivity: f64,
    /// Volumetric heat capacity of the solid matrix (MJ/m³/K)
    pub solid_heat_capacity: f64,
    /// Default saturation capacity (m³/m³); `None` when columns must supply
    /// a porosity profile
    pub porosity: Option<f64>,
    /// Fitted unfrozen-water curve
    pub curve: FreezingCurve,
}

/// Process-wide, immutable set of layer types plus global boundary settings.
#[derive(Debug, Clone)]
pub struct MaterialCatalog {
    layers: Vec<LayerMaterial>,
    by_name: FxHashMap<String, LayerTypeId>,
    geothermal_heat_flux: f64,
}

impl MaterialCatalog {
    /// Empty catalog with the given geothermal heat flux (W/m², positive
    /// upward into the column).
    #[must_use]
    pub fn new(geothermal_heat_flux: f64) -> Self {
        Self {
            layers: Vec::new(),
            by_name: FxHashMap::default(),
            geothermal_heat_flux,
        }
    }

    /// Fit `table` and register a new layer type.
    ///
    /// `porosity` may be omitted (`None`) for layer types whose columns
    /// always carry a porosity profile.
    ///
    /// # Errors
    ///
    /// Returns [`GiplError::InvalidCalibration`] for a bad calibration table,
    /// duplicate names, or solid constants / porosity out of range.
    pub fn add_layer(
        &mut self,
        name: &str,
        solid_conductivity: f64,
        solid_heat_capacity: f64,
        porosity: impl Into<Option<f64>>,
        table: &CalibrationTable,
    ) -> GiplResult<LayerTypeId> {
        let porosity = porosity.into();
        let key = name.to_ascii_lowercase();
        if self.by_name.contains_key(&key) {
            return Err(GiplError::calibration(name, "duplicate layer type"));
        }
        if !(solid_conductivity.is_finite() && solid_conductivity > 0.0) {
            return Err(GiplError::calibration(
                name,
                format!("solid conductivity must be positive, got {solid_conductivity}"),
            ));
        }
        if !(solid_heat_capacity.is_finite() && solid_heat_capacity >= 0.0) {
            return Err(GiplError::calibration(
                name,
                format!("solid heat capacity must be non-negative, got {solid_heat_capacity}"),
            ));
        }
        if let Some(p) = porosity.filter(|p| !(*p > 0.0 && *p <= 1.0)) {
            return Err(GiplError::calibration(
                name,
                format!("porosity must be in (0, 1], got {p}"),
            ));
        }

        let curve = FreezingCurve::fit(name, table)?;
        let id = LayerTypeId(self.layers.len());
        self.layers.push(LayerMaterial {
            name: name.to_string(),
            solid_conductivity,
            solid_heat_capacity,
            porosity,
            curve,
        });
        self.by_name.insert(key, id);
        Ok(id)
    }

    /// Freeze the catalog for sharing between columns.
    #[must_use]
    pub fn into_shared(self) -> Arc<Self> {
        Arc::new(self)
    }

    /// Look up a layer type by name (case-insensitive).
    ///
    /// # Errors
    ///
    /// Returns [`GiplError::UnknownLayerType`] listing the available names.
    pub fn resolve(&self, name: &str) -> GiplResult<LayerTypeId> {
        self.by_name
            .get(&name.to_ascii_lowercase())
            .copied()
            .ok_or_else(|| GiplError::UnknownLayerType {
                name: name.to_string(),
                available: self.names().collect::<Vec<_>>().join(","),
            })
    }

    /// Material for `id`.
    ///
    /// Panics if `id` did not come from this catalog.
    #[inline]
    pub fn layer(&self, id: LayerTypeId) -> &LayerMaterial {
        &self.layers[id.0]
    }

    /// Layer names in registration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.layers.iter().map(|l| l.name.as_str())
    }

    /// Number of layer types.
    pub fn len(&self) -> usize {
        self.layers.len()
    }

    /// `true` when no layer types are registered.
    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    /// Geothermal heat flux at the column base (W/m²).
    pub fn geothermal_heat_flux(&self) -> f64 {
        self.geothermal_heat_flux
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> CalibrationTable {
        CalibrationTable::power_law(-0.05, 0.6, -20.0, 5.0, 50)
    }

    #[test]
    fn names_resolve_case_insensitively() {
        let mut catalog = MaterialCatalog::new(0.05);
        let peat = catalog.add_layer("Peat", 0.35, 2.5, 0.85, &table()).unwrap();
        let mineral = catalog
            .add_layer("MineralSoil", 2.5, 2.0, 0.45, &table())
            .unwrap();
        assert_eq!(catalog.resolve("peat").unwrap(), peat);
        assert_eq!(catalog.resolve("MINERALSOIL").unwrap(), mineral);
        assert_eq!(catalog.layer(peat).name, "Peat");
        assert_eq!(catalog.len(), 2);
    }

    #[test]
    fn unknown_name_lists_available_types() {
        let mut catalog = MaterialCatalog::new(0.0);
        catalog.add_layer("Peat", 0.35, 2.5, 0.85, &table()).unwrap();
        let err = catalog.resolve("Clay").unwrap_err();
        match err {
            GiplError::UnknownLayerType { name, available } => {
                assert_eq!(name, "Clay");
                assert_eq!(available, "Peat");
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn duplicate_layer_is_rejected() {
        let mut catalog = MaterialCatalog::new(0.0);
        catalog.add_layer("Peat", 0.35, 2.5, 0.85, &table()).unwrap();
        assert!(catalog.add_layer("PEAT", 0.35, 2.5, 0.85, &table()).is_err());
    }

    #[test]
    fn bad_porosity_is_rejected() {
        let mut catalog = MaterialCatalog::new(0.0);
        assert!(catalog.add_layer("Peat", 0.35, 2.5, 0.0, &table()).is_err());
        assert!(catalog.add_layer("Peat", 0.35, 2.5, 1.5, &table()).is_err());
        assert!(catalog.add_layer("Peat", f64::NAN, 2.5, 0.5, &table()).is_err());
        let bare = catalog.add_layer("Bare", 0.35, 2.5, None, &table()).unwrap();
        assert_eq!(catalog.layer(bare).porosity, None);
    }
}
