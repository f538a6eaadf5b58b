//! Permafrost Column Core Library
//!
//! One-dimensional transient heat conduction with freeze/thaw through a
//! snow pack over layered soil, down to a geothermal heat-flux boundary.
//!
//! ## Structure
//!
//! - [`catalog`]: layer types (solid constants, porosity, fitted freezing
//!   curve) shared read-only by all columns
//! - [`physics`]: freezing curves and thermal property mixing
//! - [`column`]: offset-indexed grid and thermal state of one column
//! - [`solver`]: implicit enthalpy solver with adaptive time stepping
//! - [`driver`]: daily forcing loop producing soil-temperature profiles

// Core types and utilities
pub mod core_types;
pub mod error;

pub mod catalog;
pub mod column;
pub mod config;
pub mod driver;
pub mod physics;
pub mod solver;

pub use catalog::{LayerMaterial, LayerTypeId, MaterialCatalog, DEFAULT_GEOTHERMAL_HEAT_FLUX};
pub use column::{ColumnSetup, LayeredColumnState, SnowSpec, SoilLayerSpec};
pub use config::SolverConfig;
pub use core_types::{interpolate_profile, Celsius, HeatFlux, Meters, OffsetArray};
pub use driver::{Column, ForcingInterval, IntervalResults, IntervalStats, WaterContentProfile};
pub use error::{GiplError, GiplResult};
pub use physics::{CalibrationTable, FreezingCurve, UnfrozenWater, CALIBRATION_SAMPLES};
pub use solver::ImplicitConductionSolver;
