use crate::error::{with_last_error_mut, DefaultGiplError, FfiError, GiplErrorCode};
use std::ffi::{CStr, CString};
use std::os::raw::c_char;

/// Set the thread-local error message and code.
/// Accepts any type implementing `FfiError` trait.
pub(crate) fn set_last_error(error: &impl FfiError) {
    with_last_error_mut(|(cstring, code)| {
        *cstring = CString::new(error.msg()).ok();
        *code = error.code();
    });
}

/// Track an error by setting it in thread-local storage and returning its code.
#[inline]
pub(crate) fn track_error(error: &impl FfiError) -> GiplErrorCode {
    set_last_error(error);
    error.code()
}

/// Clear the thread-local error message and code.
/// Called on successful operations.
pub(crate) fn clear_last_error() {
    with_last_error_mut(|(cstring, code)| {
        *cstring = None;
        *code = GiplErrorCode::Ok;
    });
}

/// Record the outcome of `result`: clears the last error on success, stores it
/// on failure and hands back its code.
pub(crate) fn track_result<T>(result: Result<T, DefaultGiplError>) -> Result<T, GiplErrorCode> {
    match result {
        Ok(value) => {
            clear_last_error();
            Ok(value)
        }
        Err(error) => Err(track_error(&error)),
    }
}

/// Run `f` and convert its result into the code returned across FFI.
pub(crate) fn handle_ffi_result_error<F>(f: F) -> GiplErrorCode
where
    F: FnOnce() -> Result<(), DefaultGiplError>,
{
    match track_result(f()) {
        Ok(()) => GiplErrorCode::Ok,
        Err(code) => code,
    }
}

/// Borrow the object behind an opaque handle.
///
/// # Safety
/// `ptr` must be null or point to a live `T` that stays valid and is not
/// mutated through another alias for `'a`.
pub(crate) unsafe fn ref_from_ptr<'a, T>(
    ptr: *const T,
    name: &str,
) -> Result<&'a T, DefaultGiplError> {
    // SAFETY: null is rejected by `as_ref`; validity is the caller's contract.
    unsafe { ptr.as_ref() }.ok_or_else(|| DefaultGiplError::null_pointer(name))
}

/// Read a NUL-terminated UTF-8 string argument.
///
/// # Safety
/// `ptr` must be null or point to a NUL-terminated string that outlives `'a`.
pub(crate) unsafe fn str_from_ptr<'a>(
    ptr: *const c_char,
    name: &str,
) -> Result<&'a str, DefaultGiplError> {
    if ptr.is_null() {
        return Err(DefaultGiplError::null_pointer(name));
    }
    // SAFETY: non-null and NUL-terminated per the function contract.
    unsafe { CStr::from_ptr(ptr) }
        .to_str()
        .map_err(|e| DefaultGiplError::invalid_parameter(format!("Parameter '{name}' is not UTF-8: {e}")))
}

/// Copy an optional caller array of `len` values; null means absent.
///
/// # Safety
/// A non-null `ptr` must point to `len` readable, initialized doubles.
pub(crate) unsafe fn optional_vec(ptr: *const f64, len: usize) -> Option<Vec<f64>> {
    if ptr.is_null() || len == 0 {
        return None;
    }
    // SAFETY: non-null and `len` doubles long per the function contract.
    Some(unsafe { std::slice::from_raw_parts(ptr, len) }.to_vec())
}

/// Write `values` to a caller buffer of `capacity` doubles.
///
/// The required length is always stored in `out_len`; the values are only
/// copied when they fit.
///
/// # Safety
/// `out_len` must be null or writable; a non-null `out` must hold `capacity`
/// writable doubles.
pub(crate) unsafe fn write_values(
    values: &[f64],
    out: *mut f64,
    capacity: usize,
    out_len: *mut usize,
) -> Result<(), DefaultGiplError> {
    if out_len.is_null() {
        return Err(DefaultGiplError::null_pointer("out_len"));
    }
    // SAFETY: checked for null above; writable per the function contract.
    unsafe { *out_len = values.len() };
    if values.len() > capacity {
        return Err(DefaultGiplError::buffer_too_small(values.len(), capacity));
    }
    if values.is_empty() {
        return Ok(());
    }
    if out.is_null() {
        return Err(DefaultGiplError::null_pointer("out"));
    }
    // SAFETY: `out` holds at least `capacity >= values.len()` doubles.
    unsafe { std::ptr::copy_nonoverlapping(values.as_ptr(), out, values.len()) };
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{gipl_get_last_error, gipl_get_last_error_code};

    #[test]
    fn write_values_reports_required_length() {
        let values = [1.0, 2.0, 3.0];
        let mut out = [0.0; 2];
        let mut len = 0usize;
        let err =
            unsafe { write_values(&values, out.as_mut_ptr(), out.len(), &mut len) }.unwrap_err();
        assert_eq!(err.code(), GiplErrorCode::BufferTooSmall);
        assert_eq!(len, 3);

        let mut out = [0.0; 4];
        unsafe { write_values(&values, out.as_mut_ptr(), out.len(), &mut len) }.unwrap();
        assert_eq!(&out[..3], &values);
    }

    #[test]
    fn null_arguments_are_reported() {
        let missing: *const f64 = std::ptr::null();
        assert!(unsafe { optional_vec(missing, 3) }.is_none());
        let err = unsafe { ref_from_ptr(missing, "ptr") }.unwrap_err();
        assert_eq!(err.code(), GiplErrorCode::NullPointer);
        let err = unsafe { str_from_ptr(std::ptr::null(), "name") }.unwrap_err();
        assert_eq!(err.code(), GiplErrorCode::NullPointer);

        let values = [0.5, 1.5];
        assert_eq!(unsafe { optional_vec(values.as_ptr(), 2) }, Some(vec![0.5, 1.5]));
    }

    #[test]
    fn tracked_errors_are_readable_then_cleared() {
        let code = handle_ffi_result_error(|| Err(DefaultGiplError::null_pointer("ptr")));
        assert_eq!(code, GiplErrorCode::NullPointer);
        assert_eq!(gipl_get_last_error_code(), GiplErrorCode::NullPointer);
        assert!(!gipl_get_last_error().is_null());

        assert_eq!(handle_ffi_result_error(|| Ok(())), GiplErrorCode::Ok);
        assert!(gipl_get_last_error().is_null());
    }
}
