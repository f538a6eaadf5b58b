//! Material physics of the snow/soil column: constants, freezing curves and
//! property mixing

pub mod constants;
pub mod freezing_curve;
pub mod thermal_properties;

pub use freezing_curve::{CalibrationTable, FreezingCurve, UnfrozenWater, CALIBRATION_SAMPLES};
pub use thermal_properties::{NodeMaterial, NodeProperties, SoilComposition};
