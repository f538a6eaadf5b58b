use crate::error::{DefaultGiplError, GiplErrorCode};
use crate::helpers::{handle_ffi_result_error, ref_from_ptr, write_values};
use crate::instance::GiplColumn;

/// Number of soil nodes (surface node included), or 0 for a null handle.
///
/// # Safety
/// `ptr` must be null or a live column handle.
#[no_mangle]
pub unsafe extern "C" fn gipl_column_soil_node_count(ptr: *const GiplColumn) -> usize {
    // SAFETY: null or a live handle per the function contract.
    unsafe { ref_from_ptr(ptr, "ptr") }
        .and_then(GiplColumn::read)
        .map_or(0, |column| column.state().soil_node_count())
}

/// Copy the reference depth of every soil node (m, surface first).
///
/// `*out_len` always receives the number of nodes; the values are copied
/// only when `capacity` is large enough (`BufferTooSmall` otherwise).
///
/// # Safety
/// `ptr` must be a live column handle, `out` must hold `capacity` doubles
/// and `out_len` must be writable.
#[no_mangle]
pub unsafe extern "C" fn gipl_column_soil_depths(
    ptr: *const GiplColumn,
    out: *mut f64,
    capacity: usize,
    out_len: *mut usize,
) -> GiplErrorCode {
    handle_ffi_result_error(|| {
        // SAFETY: live handle per the function contract.
        let instance = unsafe { ref_from_ptr(ptr, "ptr") }?;
        let depths = instance.read()?.soil_depths();
        // SAFETY: `out` holds `capacity` doubles and `out_len` is writable.
        unsafe { write_values(&depths, out, capacity, out_len) }
    })
}

/// Copy the interval-average soil profile of the last run (°C).
///
/// With `at_output_depths` the profile on the configured output depths is
/// returned instead of the native nodes.
///
/// # Safety
/// Same contract as `gipl_column_soil_depths`.
#[no_mangle]
pub unsafe extern "C" fn gipl_column_average_profile(
    ptr: *const GiplColumn,
    at_output_depths: bool,
    out: *mut f64,
    capacity: usize,
    out_len: *mut usize,
) -> GiplErrorCode {
    handle_ffi_result_error(|| {
        // SAFETY: live handle per the function contract.
        let instance = unsafe { ref_from_ptr(ptr, "ptr") }?;
        let results = instance.results()?;
        let results = results.as_ref().ok_or_else(DefaultGiplError::no_results)?;
        let profile = if at_output_depths {
            &results.average_profile_at_depths
        } else {
            &results.average_profile
        };
        // SAFETY: `out` holds `capacity` doubles and `out_len` is writable.
        unsafe { write_values(profile, out, capacity, out_len) }
    })
}

/// Copy the soil profile recorded at the end of `day` of the last run (°C).
///
/// # Safety
/// Same contract as `gipl_column_soil_depths`.
#[no_mangle]
pub unsafe extern "C" fn gipl_column_daily_profile(
    ptr: *const GiplColumn,
    day: usize,
    at_output_depths: bool,
    out: *mut f64,
    capacity: usize,
    out_len: *mut usize,
) -> GiplErrorCode {
    handle_ffi_result_error(|| {
        // SAFETY: live handle per the function contract.
        let instance = unsafe { ref_from_ptr(ptr, "ptr") }?;
        let results = instance.results()?;
        let results = results.as_ref().ok_or_else(DefaultGiplError::no_results)?;
        let daily = if at_output_depths {
            &results.daily_profiles_at_depths
        } else {
            &results.daily_profiles
        };
        let profile = daily.get(day).ok_or_else(|| {
            DefaultGiplError::invalid_parameter(format!(
                "day {day} out of range, last run covered {} days",
                results.days()
            ))
        })?;
        // SAFETY: `out` holds `capacity` doubles and `out_len` is writable.
        unsafe { write_values(profile, out, capacity, out_len) }
    })
}
