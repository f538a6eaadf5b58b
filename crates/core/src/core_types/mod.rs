//! Core data types shared by the column model

pub mod offset_array;
pub mod profile;
pub mod units;

pub use offset_array::OffsetArray;
pub use profile::interpolate_profile;
pub use units::{Celsius, HeatFlux, Meters};
