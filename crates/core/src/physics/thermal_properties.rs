//! Effective thermal properties of a grid node
//!
//! A soil node is a mixture of solid matrix, liquid water, ice and air. With
//! porosity `P`, total water content `W` and unfrozen fraction `θ`:
//!
//! ```text
//! C = (1−P)·Cm + (P−W)·Ca + W·(θ·Cw + (1−θ)·Ci) + W·θ'·(L + (Cw−Ci)·T)
//! H = ((1−P)·Cm + (P−W)·Ca + W·Ci)·T + W·θ·(L + (Cw−Ci)·T)
//! k = Km^(1−P) · (Ki·exp(θ·ln(Kw/Ki)))^W · Ka^(P−W)
//! ```
//!
//! `C = dH/dT` is the apparent heat capacity: its last term releases the
//! latent heat of the water that freezes as temperature drops. Snow nodes use
//! the interval's snow conductivity and heat capacity directly.

use super::constants::{
    CONDUCTIVITY_AIR, CONDUCTIVITY_ICE, HEAT_CAPACITY_AIR, HEAT_CAPACITY_ICE, HEAT_CAPACITY_WATER,
    LATENT_HEAT_FUSION, LN_WATER_ICE_CONDUCTIVITY,
};
use super::freezing_curve::UnfrozenWater;
use crate::error::{GiplError, GiplResult};

/// Composition of a soil node.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SoilComposition {
    /// Saturation capacity (m³/m³)
    pub porosity: f64,
    /// Total water content, liquid plus ice (m³/m³), at most `porosity`
    pub water_content: f64,
    /// Thermal conductivity of the solid matrix (W/m/K)
    pub solid_conductivity: f64,
    /// Volumetric heat capacity of the solid matrix (MJ/m³/K)
    pub solid_heat_capacity: f64,
}

impl SoilComposition {
    /// Heat capacity of the node with all water frozen (MJ/m³/K).
    #[inline]
    pub fn frozen_heat_capacity(&self) -> f64 {
        (1.0 - self.porosity) * self.solid_heat_capacity
            + (self.porosity - self.water_content) * HEAT_CAPACITY_AIR
            + self.water_content * HEAT_CAPACITY_ICE
    }

    /// Volumetric enthalpy (MJ/m³) relative to fully frozen soil at 0 °C.
    #[inline]
    pub fn enthalpy(&self, t: f64, fraction: f64) -> f64 {
        self.frozen_heat_capacity() * t
            + self.water_content
                * fraction
                * (LATENT_HEAT_FUSION + (HEAT_CAPACITY_WATER - HEAT_CAPACITY_ICE) * t)
    }

    /// Apparent volumetric heat capacity (MJ/m³/K), `dH/dT`.
    #[inline]
    pub fn heat_capacity(&self, t: f64, water: &UnfrozenWater) -> f64 {
        let w = self.water_content;
        (1.0 - self.porosity) * self.solid_heat_capacity
            + (self.porosity - w) * HEAT_CAPACITY_AIR
            + w * (water.fraction * HEAT_CAPACITY_WATER + (1.0 - water.fraction) * HEAT_CAPACITY_ICE)
            + w * water.slope * (LATENT_HEAT_FUSION + (HEAT_CAPACITY_WATER - HEAT_CAPACITY_ICE) * t)
    }

    /// Thermal conductivity (W/m/K) for the given unfrozen fraction.
    #[inline]
    pub fn conductivity(&self, fraction: f64) -> f64 {
        let water_ice = CONDUCTIVITY_ICE * (fraction * LN_WATER_ICE_CONDUCTIVITY).exp();
        self.solid_conductivity.powf(1.0 - self.porosity)
            * water_ice.powf(self.water_content)
            * CONDUCTIVITY_AIR.powf(self.porosity - self.water_content)
    }
}

/// Material filling a node for the current interval.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NodeMaterial {
    /// Snow with constant-for-the-interval properties
    Snow {
        /// W/m/K
        conductivity: f64,
        /// MJ/m³/K
        heat_capacity: f64,
    },
    /// Soil mixture
    Soil(SoilComposition),
}

/// Mixed properties of one node at one temperature.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NodeProperties {
    /// Apparent volumetric heat capacity (MJ/m³/K)
    pub heat_capacity: f64,
    /// Thermal conductivity (W/m/K)
    pub conductivity: f64,
    /// Volumetric enthalpy (MJ/m³)
    pub enthalpy: f64,
}

impl NodeMaterial {
    /// Enthalpy of the node at `t` with unfrozen fraction `fraction`.
    #[inline]
    pub fn enthalpy(&self, t: f64, fraction: f64) -> f64 {
        match self {
            Self::Snow { heat_capacity, .. } => heat_capacity * t,
            Self::Soil(soil) => soil.enthalpy(t, fraction),
        }
    }

    /// Mix heat capacity, conductivity and enthalpy for node `node`.
    ///
    /// # Errors
    ///
    /// Returns [`GiplError::InvalidProperty`] when the heat capacity or
    /// conductivity is NaN, infinite or negative.
    pub fn mix(&self, node: i32, t: f64, water: &UnfrozenWater) -> GiplResult<NodeProperties> {
        let props = match self {
            Self::Snow {
                conductivity,
                heat_capacity,
            } => NodeProperties {
                heat_capacity: *heat_capacity,
                conductivity: *conductivity,
                enthalpy: heat_capacity * t,
            },
            Self::Soil(soil) => NodeProperties {
                heat_capacity: soil.heat_capacity(t, water),
                conductivity: soil.conductivity(water.fraction),
                enthalpy: soil.enthalpy(t, water.fraction),
            },
        };
        check_property(node, "heat capacity", props.heat_capacity)?;
        check_property(node, "conductivity", props.conductivity)?;
        Ok(props)
    }
}

fn check_property(node: i32, quantity: &'static str, value: f64) -> GiplResult<()> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(GiplError::InvalidProperty {
            quantity,
            node,
            value,
        })
    }
}
