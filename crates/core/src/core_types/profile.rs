//! Linear interpolation between depth profiles
//!
//! Used to report temperatures on an external depth grid and to map a
//! hydrology water-content profile onto the solver nodes.

/// Linearly interpolate `values` given at increasing `depths` onto `targets`.
///
/// Targets shallower than the first depth take the first value, deeper than
/// the last depth the last value. Returns an empty vector when `depths` is
/// empty.
#[must_use]
pub fn interpolate_profile(depths: &[f64], values: &[f64], targets: &[f64]) -> Vec<f64> {
    debug_assert_eq!(depths.len(), values.len());
    let n = depths.len().min(values.len());
    if n == 0 {
        return Vec::new();
    }

    targets
        .iter()
        .map(|&z| {
            if z <= depths[0] {
                return values[0];
            }
            if z >= depths[n - 1] {
                return values[n - 1];
            }
            // First node strictly deeper than z; 1 <= hi <= n-1 here
            let hi = depths[..n].partition_point(|&d| d <= z);
            let lo = hi - 1;
            let span = depths[hi] - depths[lo];
            if span <= 0.0 {
                return values[lo];
            }
            let w = (z - depths[lo]) / span;
            values[lo] + w * (values[hi] - values[lo])
        })
        .collect()
}
