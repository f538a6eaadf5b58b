//! Error types for the permafrost column model
//!
//! Every fallible operation in the crate returns [`GiplResult`]. The variants
//! follow the three failure classes of the model:
//!
//! - configuration errors (calibration data, catalog, column layout, material
//!   properties) are reported before any time stepping starts
//! - numerical divergence is reported with the simulation time and the step
//!   size at which step halving gave up
//! - forcing problems that have no safe default (empty or non-finite series)
//!
//! Input-range problems with a physically defensible correction (water content
//! above capacity, snow deeper than the snow grid) are clamped with a
//! `tracing::warn!` instead of producing an error.

use std::path::PathBuf;
use thiserror::Error;

/// Result alias used throughout the crate.
pub type GiplResult<T> = Result<T, GiplError>;

/// Errors produced while configuring or running a column.
#[derive(Error, Debug)]
pub enum GiplError {
    /// A properties or calibration file could not be read.
    #[error("cannot read '{path}': {source}")]
    Io {
        /// File that failed to open or read
        path: PathBuf,
        /// Underlying IO error
        #[source]
        source: std::io::Error,
    },

    /// A properties or calibration file has malformed content.
    #[error("{file}:{line}: {message}")]
    Parse {
        /// File being parsed
        file: PathBuf,
        /// 1-based line number
        line: usize,
        /// What went wrong
        message: String,
    },

    /// A freezing-curve calibration table is unusable.
    #[error("invalid calibration table for '{layer}': {message}")]
    InvalidCalibration {
        /// Layer type the table belongs to
        layer: String,
        /// What went wrong
        message: String,
    },

    /// A column references a layer type the catalog does not contain.
    #[error("unrecognized layer type '{name}'; available types are {available}")]
    UnknownLayerType {
        /// Requested name
        name: String,
        /// Comma separated catalog names
        available: String,
    },

    /// The column setup is inconsistent (node counts, depths, initial state).
    #[error("invalid column setup: {0}")]
    InvalidColumn(String),

    /// Forcing data cannot be used.
    #[error("invalid forcing: {0}")]
    InvalidForcing(String),

    /// A mixed thermal property came out NaN, infinite or negative.
    #[error("invalid {quantity} at node {node}: {value}")]
    InvalidProperty {
        /// Property name (conductivity, heat capacity)
        quantity: &'static str,
        /// Grid index of the node
        node: i32,
        /// Offending value
        value: f64,
    },

    /// Step halving reached the minimum step without converging.
    #[error("no convergence at t = {time:.6} d with step {step:.3e} d")]
    Divergence {
        /// Simulation time (days since the start of the interval)
        time: f64,
        /// Step size that failed (days)
        step: f64,
    },
}

impl GiplError {
    pub(crate) fn parse(file: impl Into<PathBuf>, line: usize, message: impl Into<String>) -> Self {
        Self::Parse {
            file: file.into(),
            line,
            message: message.into(),
        }
    }

    pub(crate) fn calibration(layer: &str, message: impl Into<String>) -> Self {
        Self::InvalidCalibration {
            layer: layer.to_string(),
            message: message.into(),
        }
    }

    /// `true` for errors raised before time stepping (bad configuration).
    #[must_use]
    pub fn is_configuration(&self) -> bool {
        !matches!(self, Self::Divergence { .. } | Self::InvalidForcing(_))
    }
}
