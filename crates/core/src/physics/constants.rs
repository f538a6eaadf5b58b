//! Physical constants of the soil heat-transport model
//!
//! Heat capacities are volumetric and expressed in MJ/(m³·K); conductivities
//! in W/(m·K); time is measured in days. [`TIME_SCALE`] converts the MJ/day
//! heat balance into SI fluxes.

/// Volumetric heat capacity of liquid water (MJ/m³/K)
pub const HEAT_CAPACITY_WATER: f64 = 4.181;

/// Volumetric heat capacity of ice (MJ/m³/K)
pub const HEAT_CAPACITY_ICE: f64 = 2.114;

/// Volumetric heat capacity of air (MJ/m³/K)
pub const HEAT_CAPACITY_AIR: f64 = 1.003e-3;

/// Thermal conductivity of liquid water (W/m/K)
pub const CONDUCTIVITY_WATER: f64 = 0.56;

/// Thermal conductivity of ice (W/m/K)
pub const CONDUCTIVITY_ICE: f64 = 2.2;

/// Thermal conductivity of air (W/m/K)
pub const CONDUCTIVITY_AIR: f64 = 0.025;

/// Volumetric latent heat of fusion of water (MJ/m³)
pub const LATENT_HEAT_FUSION: f64 = 333.2;

/// `ln(CONDUCTIVITY_WATER / CONDUCTIVITY_ICE)`
pub const LN_WATER_ICE_CONDUCTIVITY: f64 = -1.36827585561721230;

/// Seconds per day
pub const SECONDS_PER_DAY: f64 = 86_400.0;

/// MJ/day → W scale factor: `1e6 / 86400`
pub const TIME_SCALE: f64 = 1.0e6 / SECONDS_PER_DAY;

/// J/(m³·K) → MJ/(m³·K)
pub const J_TO_MJ: f64 = 1.0e-6;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_conductivity_ratio_matches_constants() {
        let expected = (CONDUCTIVITY_WATER / CONDUCTIVITY_ICE).ln();
        assert!((LN_WATER_ICE_CONDUCTIVITY - expected).abs() < 1e-12);
    }

    #[test]
    fn time_scale_is_mega_per_day() {
        assert!((TIME_SCALE * SECONDS_PER_DAY - 1.0e6).abs() < 1e-6);
    }
}
