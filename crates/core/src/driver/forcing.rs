//! Daily forcing of one simulation interval

use serde::{Deserialize, Serialize};

use crate::core_types::{Celsius, Meters};
use crate::error::{GiplError, GiplResult};

/// Water-content profile handed over by a hydrology model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WaterContentProfile {
    /// One value per soil node, surface first; short profiles are extended
    /// with their last value
    AtNodes(Vec<f64>),
    /// Values on the hydrology model's own increasing depth grid (m),
    /// interpolated onto the soil nodes
    AtDepths { depths: Vec<f64>, values: Vec<f64> },
}

/// Daily forcing for one interval.
///
/// Snow series shorter than `air_temperature` are padded with their last
/// value; an empty snow thickness series means no snow.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ForcingInterval {
    /// Daily mean air temperature; its length sets the number of days
    pub air_temperature: Vec<Celsius>,
    #[serde(default)]
    pub snow_thickness: Vec<Meters>,
    /// W/m/K
    #[serde(default)]
    pub snow_conductivity: Vec<f64>,
    /// J/m³/K
    #[serde(default)]
    pub snow_heat_capacity: Vec<f64>,
    /// Replaces the stored water content when present
    #[serde(default)]
    pub water_content: Option<WaterContentProfile>,
}

fn check_finite<T: Copy + Into<f64>>(name: &str, values: &[T]) -> GiplResult<()> {
    let raw = values.iter().map(|&v| v.into());
    match raw.enumerate().find(|(_, v)| !v.is_finite()) {
        Some((day, v)) => Err(GiplError::InvalidForcing(format!(
            "{name} is not finite on day {day}: {v}"
        ))),
        None => Ok(()),
    }
}

fn padded<T: Copy + Into<f64>>(values: &[T], day: usize) -> f64 {
    values
        .get(day)
        .or_else(|| values.last())
        .map_or(0.0, |&v| v.into())
}

fn mean_positive(values: &[f64]) -> f64 {
    let (sum, count) = values
        .iter()
        .filter(|v| **v > 0.0)
        .fold((0.0, 0usize), |(s, c), v| (s + v, c + 1));
    if count == 0 {
        0.0
    } else {
        sum / count as f64
    }
}

impl ForcingInterval {
    /// Snow-free forcing with the given air temperatures.
    #[must_use]
    pub fn air_only(air_temperature: impl IntoIterator<Item = f64>) -> Self {
        Self {
            air_temperature: air_temperature.into_iter().map(Celsius::from).collect(),
            ..Self::default()
        }
    }

    /// Number of days in the interval.
    pub fn days(&self) -> usize {
        self.air_temperature.len()
    }

    /// # Errors
    ///
    /// [`GiplError::InvalidForcing`] for an empty air-temperature series,
    /// non-finite values, or an inconsistent water-content profile.
    pub fn validate(&self) -> GiplResult<()> {
        if self.air_temperature.is_empty() {
            return Err(GiplError::InvalidForcing(
                "air temperature series is empty".to_string(),
            ));
        }
        check_finite("air temperature", &self.air_temperature)?;
        check_finite("snow thickness", &self.snow_thickness)?;
        check_finite("snow conductivity", &self.snow_conductivity)?;
        check_finite("snow heat capacity", &self.snow_heat_capacity)?;

        match &self.water_content {
            Some(WaterContentProfile::AtNodes(values)) => {
                if values.is_empty() {
                    return Err(GiplError::InvalidForcing(
                        "empty water-content profile".to_string(),
                    ));
                }
                check_finite("water content", values)?;
            }
            Some(WaterContentProfile::AtDepths { depths, values }) => {
                if depths.is_empty() || depths.len() != values.len() {
                    return Err(GiplError::InvalidForcing(format!(
                        "water-content profile has {} depths and {} values",
                        depths.len(),
                        values.len()
                    )));
                }
                check_finite("water-content depth", depths)?;
                check_finite("water content", values)?;
                if depths.windows(2).any(|w| w[1] <= w[0]) {
                    return Err(GiplError::InvalidForcing(
                        "water-content depths must strictly increase".to_string(),
                    ));
                }
            }
            None => {}
        }
        Ok(())
    }

    /// Snow thickness on `day` (m).
    pub fn snow_thickness_on(&self, day: usize) -> f64 {
        padded(&self.snow_thickness, day)
    }

    /// Interval snow conductivity (W/m/K) and volumetric heat capacity
    /// (J/m³/K), averaged over the days with positive values.
    pub fn mean_snow_properties(&self) -> (f64, f64) {
        (
            mean_positive(&self.snow_conductivity),
            mean_positive(&self.snow_heat_capacity),
        )
    }

    /// Air temperature at `time` days since the start of the interval.
    ///
    /// Sample `k` holds at the end of day `k` (time `k + 1`); the series is
    /// interpolated linearly and held constant outside its range.
    pub fn surface_temperature(&self, time: f64) -> f64 {
        let air = &self.air_temperature;
        let Some(&last) = air.last() else {
            return f64::NAN;
        };
        let s = time - 1.0;
        if s <= 0.0 {
            return *air[0];
        }
        let upper = (air.len() - 1) as f64;
        if s >= upper {
            return *last;
        }
        let k = s.floor() as usize;
        let w = s - k as f64;
        *air[k] + w * (*air[k + 1] - *air[k])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn surface_temperature_interpolates_between_day_ends() {
        let f = ForcingInterval::air_only(vec![2.0, 4.0, -2.0]);
        assert_eq!(f.surface_temperature(0.0), 2.0);
        assert_eq!(f.surface_temperature(1.0), 2.0);
        assert_relative_eq!(f.surface_temperature(1.5), 3.0);
        assert_relative_eq!(f.surface_temperature(2.0), 4.0);
        assert_relative_eq!(f.surface_temperature(2.75), -0.5);
        assert_eq!(f.surface_temperature(3.0), -2.0);
        assert_eq!(f.surface_temperature(10.0), -2.0);
    }

    #[test]
    fn short_snow_series_are_padded() {
        let f = ForcingInterval {
            snow_thickness: vec![Meters::new(0.1), Meters::new(0.2)],
            ..ForcingInterval::air_only(vec![-5.0; 4])
        };
        assert_eq!(f.snow_thickness_on(0), 0.1);
        assert_eq!(f.snow_thickness_on(3), 0.2);
        assert_eq!(ForcingInterval::air_only(vec![1.0]).snow_thickness_on(2), 0.0);
    }

    #[test]
    fn snow_properties_average_positive_days() {
        let f = ForcingInterval {
            snow_conductivity: vec![0.0, 0.2, 0.4, 0.0],
            snow_heat_capacity: vec![0.0, 0.0, 0.0, 0.0],
            ..ForcingInterval::air_only(vec![-5.0; 4])
        };
        let (k, c) = f.mean_snow_properties();
        assert_relative_eq!(k, 0.3);
        assert_eq!(c, 0.0);
    }

    #[test]
    fn validation_rejects_bad_series() {
        assert!(ForcingInterval::air_only(Vec::new()).validate().is_err());
        assert!(ForcingInterval::air_only(vec![1.0, f64::NAN]).validate().is_err());

        let mut f = ForcingInterval::air_only(vec![1.0]);
        f.water_content = Some(WaterContentProfile::AtDepths {
            depths: vec![0.0, 0.5, 0.5],
            values: vec![0.1, 0.2, 0.3],
        });
        assert!(f.validate().is_err());
        f.water_content = Some(WaterContentProfile::AtNodes(vec![0.2]));
        f.validate().unwrap();
    }

    #[test]
    fn deserializes_tagged_water_profile() {
        let json = r#"{
            "air_temperature": [1.0, 2.0],
            "water_content": { "at_depths": { "depths": [0.0, 1.0], "values": [0.3, 0.4] } }
        }"#;
        let f: ForcingInterval = serde_json::from_str(json).unwrap();
        assert_eq!(f.air_temperature, vec![Celsius::new(1.0), Celsius::new(2.0)]);
        assert!(matches!(
            f.water_content,
            Some(WaterContentProfile::AtDepths { .. })
        ));
    }
}
