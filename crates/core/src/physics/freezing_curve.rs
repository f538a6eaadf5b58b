//! Unfrozen water content curves
//!
//! Each soil layer type carries a calibrated relation between temperature and
//! the fraction of its water that stays liquid. The calibration comes as a
//! table of `(temperature, fraction, dfraction/dT)` samples; [`FreezingCurve`]
//! fits one cubic Hermite polynomial per interval through the samples, using
//! both value and slope at each knot:
//!
//! ```text
//! p(t) = c0 + c1·t + c2·t² + c3·t³,   t = T − T_k,  h = T_{k+1} − T_k
//! c0 = f_k,  c1 = f'_k
//! c2 = (3Δ − 2f'_k − f'_{k+1}) / h,   c3 = (f'_k + f'_{k+1} − 2Δ) / h²
//! Δ  = (f_{k+1} − f_k) / h
//! ```
//!
//! The fit is C¹ and reproduces the tabulated values and slopes exactly.
//! Outside the calibrated range the curve is held at the boundary knot value
//! (no extrapolation) and the result is flagged as saturated.

use crate::error::{GiplError, GiplResult};

/// Number of samples in a calibration file.
pub const CALIBRATION_SAMPLES: usize = 630;

/// Rounding slack before a cubic value counts as leaving `[0, 1]`
const OVERSHOOT_TOLERANCE: f64 = 1.0e-12;

/// Tabulated freezing-curve calibration data.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CalibrationTable {
    /// Knot temperatures (°C), strictly increasing
    pub temperature: Vec<f64>,
    /// Unfrozen fraction of total water at each knot (0-1)
    pub fraction: Vec<f64>,
    /// d(fraction)/dT at each knot (1/°C)
    pub slope: Vec<f64>,
}

impl CalibrationTable {
    /// Build a table from parallel columns.
    #[must_use]
    pub fn new(temperature: Vec<f64>, fraction: Vec<f64>, slope: Vec<f64>) -> Self {
        Self {
            temperature,
            fraction,
            slope,
        }
    }

    /// Sample `curve` at `samples` evenly spaced temperatures in `[t_min, t_max]`.
    ///
    /// `curve` returns `(fraction, slope)` for a temperature.
    #[must_use]
    pub fn from_fn(
        t_min: f64,
        t_max: f64,
        samples: usize,
        curve: impl Fn(f64) -> (f64, f64),
    ) -> Self {
        let samples = samples.max(2);
        let step = (t_max - t_min) / (samples - 1) as f64;
        let mut table = Self::default();
        for k in 0..samples {
            let t = t_min + step * k as f64;
            let (f, df) = curve(t);
            table.temperature.push(t);
            table.fraction.push(f);
            table.slope.push(df);
        }
        table
    }

    /// Power-law freezing curve sampled over `[t_min, t_max]`.
    ///
    /// All water is liquid above `t_onset` (< 0 °C); below it the unfrozen
    /// fraction follows `(t_onset / T)^exponent`.
    #[must_use]
    pub fn power_law(t_onset: f64, exponent: f64, t_min: f64, t_max: f64, samples: usize) -> Self {
        Self::from_fn(t_min, t_max, samples, |t| {
            if t >= t_onset {
                (1.0, 0.0)
            } else {
                let f = (t_onset / t).powf(exponent);
                (f, -exponent * f / t)
            }
        })
    }

    /// Number of samples.
    #[inline]
    pub fn len(&self) -> usize {
        self.temperature.len()
    }

    /// `true` when the table has no samples.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.temperature.is_empty()
    }
}

/// Result of evaluating a freezing curve at one temperature.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UnfrozenWater {
    /// Unfrozen fraction of total water (0-1)
    pub fraction: f64,
    /// d(fraction)/dT (1/°C)
    pub slope: f64,
    /// d²(fraction)/dT² (1/°C²)
    pub curvature: f64,
    /// Temperature was outside the calibrated range and the value was held
    /// at the boundary knot
    pub saturated: bool,
}

/// Hermite-spline fit of one layer type's freezing curve.
#[derive(Debug, Clone)]
pub struct FreezingCurve {
    knots: Vec<f64>,
    /// Power-form coefficients `[c0, c1, c2, c3]` per interval
    coefficients: Vec<[f64; 4]>,
    coldest: f64,
    warmest: f64,
}

impl FreezingCurve {
    /// Fit a curve through `table`.
    ///
    /// # Errors
    ///
    /// Returns [`GiplError::InvalidCalibration`] when the table has fewer than
    /// two samples, mismatched columns, non-finite values, knots that are not
    /// strictly increasing, or fractions outside `[0, 1]`.
    pub fn fit(layer: &str, table: &CalibrationTable) -> GiplResult<Self> {
        let n = table.len();
        if table.fraction.len() != n || table.slope.len() != n {
            return Err(GiplError::calibration(
                layer,
                format!(
                    "column lengths differ ({} temperatures, {} fractions, {} slopes)",
                    n,
                    table.fraction.len(),
                    table.slope.len()
                ),
            ));
        }
        if n < 2 {
            return Err(GiplError::calibration(
                layer,
                format!("need at least 2 samples, got {n}"),
            ));
        }

        for k in 0..n {
            let (x, f, df) = (table.temperature[k], table.fraction[k], table.slope[k]);
            if !(x.is_finite() && f.is_finite() && df.is_finite()) {
                return Err(GiplError::calibration(
                    layer,
                    format!("non-finite sample {k}: ({x}, {f}, {df})"),
                ));
            }
            if !(0.0..=1.0).contains(&f) {
                return Err(GiplError::calibration(
                    layer,
                    format!("unfrozen fraction {f} at sample {k} outside [0, 1]"),
                ));
            }
            if k > 0 && x <= table.temperature[k - 1] {
                return Err(GiplError::calibration(
                    layer,
                    format!(
                        "temperatures must increase strictly: sample {k} ({x}) <= sample {} ({})",
                        k - 1,
                        table.temperature[k - 1]
                    ),
                ));
            }
        }

        let coefficients = (0..n - 1)
            .map(|k| {
                let h = table.temperature[k + 1] - table.temperature[k];
                let (f0, f1) = (table.fraction[k], table.fraction[k + 1]);
                let (d0, d1) = (table.slope[k], table.slope[k + 1]);
                let delta = (f1 - f0) / h;
                [
                    f0,
                    d0,
                    (3.0 * delta - 2.0 * d0 - d1) / h,
                    (d0 + d1 - 2.0 * delta) / (h * h),
                ]
            })
            .collect();

        Ok(Self {
            knots: table.temperature.clone(),
            coefficients,
            coldest: table.fraction[0],
            warmest: table.fraction[n - 1],
        })
    }

    /// Evaluate the unfrozen fraction and its first two derivatives at `t`.
    ///
    /// The end knots are evaluated through their cubic, so the tabulated
    /// slopes hold there too. Where the cubic overshoots `[0, 1]` the
    /// fraction is clamped and its derivatives are zero.
    #[must_use]
    pub fn evaluate(&self, t: f64) -> UnfrozenWater {
        let last = self.knots.len() - 1;
        if t < self.knots[0] {
            return UnfrozenWater::held(self.coldest);
        }
        if t > self.knots[last] {
            return UnfrozenWater::held(self.warmest);
        }
        // NaN falls through both range checks; report it unchanged so the
        // solver sees a non-finite state instead of a plausible fraction.
        if t.is_nan() {
            return UnfrozenWater {
                fraction: f64::NAN,
                slope: f64::NAN,
                curvature: f64::NAN,
                saturated: false,
            };
        }

        // The warmest knot closes the last interval
        let interval = (self.knots.partition_point(|&x| x <= t) - 1).min(last - 1);
        let [c0, c1, c2, c3] = self.coefficients[interval];
        let dt = t - self.knots[interval];

        let fraction = c0 + dt * (c1 + dt * (c2 + dt * c3));
        if !(-OVERSHOOT_TOLERANCE..=1.0 + OVERSHOOT_TOLERANCE).contains(&fraction) {
            return UnfrozenWater {
                fraction: fraction.clamp(0.0, 1.0),
                slope: 0.0,
                curvature: 0.0,
                saturated: false,
            };
        }

        UnfrozenWater {
            fraction: fraction.clamp(0.0, 1.0),
            slope: c1 + dt * (2.0 * c2 + dt * 3.0 * c3),
            curvature: 2.0 * c2 + 6.0 * c3 * dt,
            saturated: false,
        }
    }

    /// Unfrozen fraction only.
    #[inline]
    pub fn fraction(&self, t: f64) -> f64 {
        self.evaluate(t).fraction
    }

    /// Calibrated temperature range `(coldest, warmest)` knot.
    pub fn temperature_range(&self) -> (f64, f64) {
        (self.knots[0], self.knots[self.knots.len() - 1])
    }

    /// Number of knots.
    pub fn knot_count(&self) -> usize {
        self.knots.len()
    }
}

impl UnfrozenWater {
    pub(crate) fn held(fraction: f64) -> Self {
        Self {
            fraction,
            slope: 0.0,
            curvature: 0.0,
            saturated: true,
        }
    }
}
