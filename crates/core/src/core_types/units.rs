//! Unit newtypes for the public column and forcing descriptions
//!
//! Setup and forcing values cross the API as [`Celsius`], [`Meters`] and
//! [`HeatFlux`] so a depth cannot be passed where a temperature is expected.
//! The wrappers serialize as bare numbers and deref to `f64`; the solver
//! works on plain `f64` arrays internally.
//!
//! ```
//! use permafrost_core::{Celsius, Meters};
//!
//! let surface = Celsius::new(-4.5);
//! let depth = Meters::new(0.25);
//! assert_eq!(*surface + 1.0, -3.5);
//! assert!(depth < Meters::new(1.0));
//! ```
//!
//! Range checks (absolute zero, positive depths) belong to
//! [`ColumnSetup::validate`](crate::ColumnSetup::validate), so constructing a
//! value never panics.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Deref;

macro_rules! unit_newtype {
    ($(#[$doc:meta])* $name:ident, $symbol:literal) => {
        $(#[$doc])*
        #[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
        #[repr(transparent)]
        #[serde(transparent)]
        pub struct $name(f64);

        impl $name {
            #[inline]
            #[must_use]
            pub const fn new(value: f64) -> Self {
                Self(value)
            }

            /// Raw value in the unit of the type.
            #[inline]
            #[must_use]
            pub const fn value(self) -> f64 {
                self.0
            }
        }

        impl Deref for $name {
            type Target = f64;

            #[inline]
            fn deref(&self) -> &f64 {
                &self.0
            }
        }

        impl From<f64> for $name {
            #[inline]
            fn from(value: f64) -> Self {
                Self(value)
            }
        }

        impl From<$name> for f64 {
            #[inline]
            fn from(value: $name) -> f64 {
                value.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                fmt::Display::fmt(&self.0, f)?;
                f.write_str($symbol)
            }
        }
    };
}

unit_newtype!(
    /// Temperature in degrees Celsius
    Celsius,
    " °C"
);

unit_newtype!(
    /// Length or depth in meters (depths positive downward)
    Meters,
    " m"
);

unit_newtype!(
    /// Heat flux density in W/m², positive into the column
    HeatFlux,
    " W/m²"
);

impl Celsius {
    /// Absolute zero
    pub const ABSOLUTE_ZERO: Celsius = Celsius(-273.15);
}

/// Raw values of a unit series.
pub(crate) fn raw_values<T: Copy + Into<f64>>(values: &[T]) -> Vec<f64> {
    values.iter().map(|&v| v.into()).collect()
}
