use permafrost_core::GiplError;
use std::cell::RefCell;
use std::ffi::CString;
use std::os::raw::c_char;
use std::ptr;

/// Common interface for FFI error types.
///
/// - `code()` - Returns the error code to be passed across FFI boundary
/// - `msg()` - Returns the error message for diagnostic purposes
pub(crate) trait FfiError {
    /// Returns the error code to be returned across the FFI boundary.
    fn code(&self) -> GiplErrorCode;

    /// Returns the human-readable error message.
    fn msg(&self) -> &str;
}

/// Default implementation of `FfiError`: an error code plus message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct DefaultGiplError {
    code: GiplErrorCode,
    msg: String,
}

impl DefaultGiplError {
    /// Create error for null pointer passed where non-null required.
    ///
    /// # Arguments
    /// * `param_name` - The name of the parameter that was null (e.g., `"out_column"`, `"ptr"`)
    pub fn null_pointer(param_name: &str) -> Self {
        Self {
            code: GiplErrorCode::NullPointer,
            msg: format!("Parameter '{param_name}' cannot be null"),
        }
    }

    /// Create error for poisoned lock.
    pub fn lock_poisoned(lock_name: &str) -> Self {
        Self {
            code: GiplErrorCode::LockPoisoned,
            msg: format!("Lock '{lock_name}' was poisoned by a panic in another thread"),
        }
    }

    /// Create error for invalid parameter.
    pub fn invalid_parameter(message: String) -> Self {
        Self {
            code: GiplErrorCode::InvalidParameter,
            msg: message,
        }
    }

    /// Create error for an output buffer that cannot hold the result.
    pub fn buffer_too_small(required: usize, capacity: usize) -> Self {
        Self {
            code: GiplErrorCode::BufferTooSmall,
            msg: format!("Output buffer holds {capacity} values, {required} required"),
        }
    }

    /// Create error for queries that need a completed interval.
    pub fn no_results() -> Self {
        Self {
            code: GiplErrorCode::NoResults,
            msg: "No interval has been run on this column".to_string(),
        }
    }
}

impl FfiError for DefaultGiplError {
    fn code(&self) -> GiplErrorCode {
        self.code
    }

    fn msg(&self) -> &str {
        &self.msg
    }
}

impl From<GiplError> for DefaultGiplError {
    fn from(error: GiplError) -> Self {
        let code = match &error {
            GiplError::Io { .. } => GiplErrorCode::Io,
            GiplError::Parse { .. } => GiplErrorCode::Parse,
            GiplError::InvalidCalibration { .. } => GiplErrorCode::InvalidCalibration,
            GiplError::UnknownLayerType { .. } => GiplErrorCode::UnknownLayerType,
            GiplError::InvalidColumn(_) => GiplErrorCode::InvalidColumn,
            GiplError::InvalidForcing(_) => GiplErrorCode::InvalidForcing,
            GiplError::InvalidProperty { .. } => GiplErrorCode::InvalidProperty,
            GiplError::Divergence { .. } => GiplErrorCode::Divergence,
        };
        Self {
            code,
            msg: error.to_string(),
        }
    }
}

/// FFI error codes returned by permafrost functions.
/// Follows standard C convention: 0 = success, non-zero = error.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GiplErrorCode {
    /// Operation completed successfully.
    Ok = 0,

    /// Invalid pointer: null pointer passed where non-null required.
    NullPointer = 1,

    /// Lock poisoned: internal synchronization primitive was poisoned by a panic.
    LockPoisoned = 2,

    /// Invalid parameter passed to function (bad UTF-8, malformed JSON, ...).
    InvalidParameter = 3,

    /// Output buffer too small; the required length is still written.
    BufferTooSmall = 4,

    /// Query needs results of a completed interval.
    NoResults = 5,

    /// Properties or curve file could not be read.
    Io = 10,

    /// Properties or curve file is malformed.
    Parse = 11,

    /// Freezing-curve calibration data is invalid.
    InvalidCalibration = 12,

    /// Column refers to a layer type missing from the catalog.
    UnknownLayerType = 13,

    /// Column setup is inconsistent.
    InvalidColumn = 14,

    /// Forcing data cannot be used.
    InvalidForcing = 15,

    /// A thermal property became NaN, infinite or negative.
    InvalidProperty = 16,

    /// The solver did not converge at the minimum step size.
    Divergence = 17,
}

impl From<DefaultGiplError> for GiplErrorCode {
    fn from(error: DefaultGiplError) -> Self {
        error.code
    }
}

thread_local! {
    /// Thread-local storage for the most recent FFI error (C string, error code).
    /// The CString is stored to prevent memory leaks when returning raw pointers via FFI.
    static LAST_ERROR: RefCell<(Option<CString>, GiplErrorCode)> = const { RefCell::new((None, GiplErrorCode::Ok)) };
}

/// Internal helper to read `LAST_ERROR` thread-local storage (cstring, code).
pub(crate) fn with_last_error<F, R>(f: F) -> R
where
    F: FnOnce(&(Option<CString>, GiplErrorCode)) -> R,
{
    LAST_ERROR.with_borrow(f)
}

/// Internal helper to mutate `LAST_ERROR` thread-local storage (cstring, code).
pub(crate) fn with_last_error_mut<F, R>(f: F) -> R
where
    F: FnOnce(&mut (Option<CString>, GiplErrorCode)) -> R,
{
    LAST_ERROR.with_borrow_mut(f)
}

/// Retrieve the most recent FFI error message as a null-terminated C string.
///
/// Returns:
/// - A borrowed pointer to the error message if an error occurred.
/// - `null` if the last call on this thread succeeded.
///
/// # Lifetime
/// The returned pointer is valid until the next FFI call on this thread.
///
/// **DO NOT FREE THIS POINTER** - it is managed internally.
///
/// Example:
/// ```c
/// GiplColumn* column = NULL;
/// if (gipl_column_new(catalog, "site", setup_json, &column) != Ok) {
///     const char* error = gipl_get_last_error();
///     if (error) {
///         fprintf(stderr, "Column setup failed: %s\n", error);
///     }
/// }
/// ```
#[no_mangle]
pub extern "C" fn gipl_get_last_error() -> *const c_char {
    with_last_error(|(cstring, _code)| cstring.as_ref().map_or(ptr::null(), |cs| cs.as_ptr()))
}

/// Retrieve the most recent FFI error code (`Ok` after a successful call).
#[no_mangle]
pub extern "C" fn gipl_get_last_error_code() -> GiplErrorCode {
    with_last_error(|(_cstring, code)| *code)
}
