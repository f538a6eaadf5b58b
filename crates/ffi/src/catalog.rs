use permafrost_core::MaterialCatalog;
use std::os::raw::c_char;
use std::ptr;
use std::sync::Arc;

use crate::error::{DefaultGiplError, GiplErrorCode};
use crate::helpers::{str_from_ptr, track_error, track_result};

/// Shared, immutable set of layer types.
///
/// One catalog can back any number of columns; each column keeps its own
/// reference, so the catalog may be destroyed before the columns.
pub struct GiplCatalog {
    pub(crate) inner: Arc<MaterialCatalog>,
}

/// # Safety
/// `out_catalog` must be non-null and writable.
unsafe fn publish(
    result: Result<MaterialCatalog, DefaultGiplError>,
    out_catalog: *mut *mut GiplCatalog,
) -> GiplErrorCode {
    match track_result(result) {
        Ok(catalog) => {
            let boxed = Box::new(GiplCatalog {
                inner: catalog.into_shared(),
            });
            // SAFETY: `out_catalog` was checked for null by the caller.
            unsafe { *out_catalog = Box::into_raw(boxed) };
            GiplErrorCode::Ok
        }
        Err(code) => {
            // SAFETY: as above; set to null on error per documentation contract.
            unsafe { *out_catalog = ptr::null_mut() };
            code
        }
    }
}

/// Create a catalog with the built-in layer types (`LiveMoss`, `DeadMoss`,
/// `Peat`, `MineralSoil`).
///
/// # Safety
/// `out_catalog` must be a valid pointer to writable storage. On success it
/// receives a handle to release with `gipl_catalog_destroy`; on error null.
#[no_mangle]
pub unsafe extern "C" fn gipl_catalog_presets(
    geothermal_heat_flux: f64,
    out_catalog: *mut *mut GiplCatalog,
) -> GiplErrorCode {
    if out_catalog.is_null() {
        return track_error(&DefaultGiplError::null_pointer("out_catalog"));
    }
    if !geothermal_heat_flux.is_finite() {
        return track_error(&DefaultGiplError::invalid_parameter(format!(
            "geothermal_heat_flux must be finite, got {geothermal_heat_flux}"
        )));
    }
    let result = MaterialCatalog::presets(geothermal_heat_flux).map_err(DefaultGiplError::from);
    // SAFETY: `out_catalog` checked for null above.
    unsafe { publish(result, out_catalog) }
}

/// Load a catalog from a properties file and its freezing-curve files.
///
/// # Safety
/// `properties_path` must be a NUL-terminated UTF-8 string and `out_catalog`
/// a valid pointer to writable storage.
#[no_mangle]
pub unsafe extern "C" fn gipl_catalog_load(
    properties_path: *const c_char,
    out_catalog: *mut *mut GiplCatalog,
) -> GiplErrorCode {
    if out_catalog.is_null() {
        return track_error(&DefaultGiplError::null_pointer("out_catalog"));
    }
    // SAFETY: NUL-terminated string per the function contract.
    let result = unsafe { str_from_ptr(properties_path, "properties_path") }
        .and_then(|path| MaterialCatalog::load(path).map_err(DefaultGiplError::from));
    // SAFETY: `out_catalog` checked for null above.
    unsafe { publish(result, out_catalog) }
}

/// Release a catalog handle. Columns created from it stay valid.
///
/// # Safety
/// `ptr` must come from `gipl_catalog_presets` / `gipl_catalog_load` and not
/// have been destroyed already. Null is a no-op.
#[no_mangle]
pub unsafe extern "C" fn gipl_catalog_destroy(ptr: *mut GiplCatalog) {
    if ptr.is_null() {
        return;
    }
    // SAFETY: created by `Box::into_raw` in `publish` and not freed yet.
    unsafe {
        drop(Box::from_raw(ptr));
    }
}
