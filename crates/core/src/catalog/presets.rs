//! Built-in layer types
//!
//! Representative organic and mineral soils of boreal permafrost sites. The
//! freezing curves are power laws sampled into full-size calibration tables,
//! so preset catalogs go through the same fitting path as file-based ones.

use super::MaterialCatalog;
use crate::error::GiplResult;
use crate::physics::{CalibrationTable, CALIBRATION_SAMPLES};

/// Calibrated temperature range of the preset curves (°C)
const PRESET_RANGE: (f64, f64) = (-30.0, 10.0);

/// Default geothermal heat flux for preset catalogs (W/m²)
pub const DEFAULT_GEOTHERMAL_HEAT_FLUX: f64 = 0.05;

struct Preset {
    name: &'static str,
    solid_conductivity: f64,
    solid_heat_capacity: f64,
    porosity: f64,
    freeze_onset: f64,
    exponent: f64,
}

const PRESETS: [Preset; 4] = [
    Preset {
        name: "LiveMoss",
        solid_conductivity: 0.25,
        solid_heat_capacity: 2.0,
        porosity: 0.95,
        freeze_onset: -0.01,
        exponent: 1.2,
    },
    Preset {
        name: "DeadMoss",
        solid_conductivity: 0.3,
        solid_heat_capacity: 2.2,
        porosity: 0.9,
        freeze_onset: -0.01,
        exponent: 1.0,
    },
    Preset {
        name: "Peat",
        solid_conductivity: 0.35,
        solid_heat_capacity: 2.5,
        porosity: 0.85,
        freeze_onset: -0.02,
        exponent: 0.8,
    },
    Preset {
        name: "MineralSoil",
        solid_conductivity: 2.5,
        solid_heat_capacity: 2.0,
        porosity: 0.45,
        freeze_onset: -0.05,
        exponent: 0.6,
    },
];

impl MaterialCatalog {
    /// Catalog with the built-in layer types `LiveMoss`, `DeadMoss`, `Peat`
    /// and `MineralSoil`.
    ///
    /// # Errors
    ///
    /// Only fails if a preset table is invalid, which the tests rule out.
    pub fn presets(geothermal_heat_flux: f64) -> GiplResult<Self> {
        let mut catalog = Self::new(geothermal_heat_flux);
        for p in &PRESETS {
            let table = CalibrationTable::power_law(
                p.freeze_onset,
                p.exponent,
                PRESET_RANGE.0,
                PRESET_RANGE.1,
                CALIBRATION_SAMPLES,
            );
            catalog.add_layer(
                p.name,
                p.solid_conductivity,
                p.solid_heat_capacity,
                p.porosity,
                &table,
            )?;
        }
        Ok(catalog)
    }
}
