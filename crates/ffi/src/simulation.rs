use permafrost_core::{Celsius, ForcingInterval, Meters, WaterContentProfile};
use tracing::debug;

use crate::error::{DefaultGiplError, GiplErrorCode};
use crate::helpers::{handle_ffi_result_error, optional_vec, ref_from_ptr};
use crate::instance::GiplColumn;

/// Simulate one interval of `days` daily forcing values.
///
/// - `air_temperature`: `days` daily mean air temperatures (°C), required
/// - `snow_thickness`: `days` values (m), or null for no snow
/// - `snow_conductivity`: `days` values (W/m/K), or null
/// - `snow_heat_capacity`: `days` values (J/m³/K), or null
/// - `water_content` / `water_len`: total water content per soil node,
///   surface first, or null to keep the stored profile
///
/// Results are kept on the column for the profile queries. They are
/// dropped when the run starts, so after a failure the queries report
/// `NoResults`.
///
/// # Safety
/// `ptr` must be a live column handle; every non-null array must hold the
/// stated number of doubles.
#[no_mangle]
#[allow(clippy::too_many_arguments)]
pub unsafe extern "C" fn gipl_column_run_interval(
    ptr: *const GiplColumn,
    air_temperature: *const f64,
    days: usize,
    snow_thickness: *const f64,
    snow_conductivity: *const f64,
    snow_heat_capacity: *const f64,
    water_content: *const f64,
    water_len: usize,
) -> GiplErrorCode {
    handle_ffi_result_error(|| {
        // SAFETY: live handle per the function contract.
        let instance = unsafe { ref_from_ptr(ptr, "ptr") }?;

        // A failed run must not leave the previous interval queryable
        *instance
            .last_results
            .write()
            .map_err(|_| DefaultGiplError::lock_poisoned("results"))? = None;

        // SAFETY: every non-null array holds the stated number of doubles.
        let (air, thickness, conductivity, heat_capacity, water) = unsafe {
            (
                optional_vec(air_temperature, days),
                optional_vec(snow_thickness, days),
                optional_vec(snow_conductivity, days),
                optional_vec(snow_heat_capacity, days),
                optional_vec(water_content, water_len),
            )
        };
        let air = air.ok_or_else(|| {
            DefaultGiplError::invalid_parameter("air_temperature must hold at least one day".into())
        })?;

        let forcing = ForcingInterval {
            air_temperature: air.into_iter().map(Celsius::from).collect(),
            snow_thickness: thickness
                .unwrap_or_default()
                .into_iter()
                .map(Meters::from)
                .collect(),
            snow_conductivity: conductivity.unwrap_or_default(),
            snow_heat_capacity: heat_capacity.unwrap_or_default(),
            water_content: water.map(WaterContentProfile::AtNodes),
        };

        let results = {
            let mut column = instance.write()?;
            debug!("FFI run of column '{}' for {} days", column.name(), days);
            column.run_interval(&forcing)?
        };

        *instance
            .last_results
            .write()
            .map_err(|_| DefaultGiplError::lock_poisoned("results"))? = Some(results);
        Ok(())
    })
}
