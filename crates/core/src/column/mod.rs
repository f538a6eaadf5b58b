//! Column geometry, materials and thermal state

mod setup;
mod state;

pub use setup::{ColumnSetup, SnowSpec, SoilLayerSpec};
pub use state::{LayeredColumnState, SnowCover, FRONT_FRACTION};
