use permafrost_core::{Column, ColumnSetup, IntervalResults};
use std::os::raw::c_char;
use std::ptr;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::catalog::GiplCatalog;
use crate::error::{DefaultGiplError, GiplErrorCode};
use crate::helpers::{ref_from_ptr, str_from_ptr, track_error, track_result};

/// One simulated soil column plus the results of its last interval.
///
/// # Thread Safety
/// The column is protected by an `RwLock`, so queries from several threads
/// may overlap while `gipl_column_run_interval` takes the write lock.
pub struct GiplColumn {
    pub(crate) column: RwLock<Column>,
    pub(crate) last_results: RwLock<Option<IntervalResults>>,
}

impl GiplColumn {
    /// Build a column from a JSON column setup.
    pub(crate) fn new(
        catalog: &GiplCatalog,
        name: &str,
        setup_json: &str,
    ) -> Result<Box<Self>, DefaultGiplError> {
        let setup: ColumnSetup = serde_json::from_str(setup_json).map_err(|e| {
            DefaultGiplError::invalid_parameter(format!("Column setup JSON: {e}"))
        })?;
        let column = Column::new(name, catalog.inner.clone(), &setup)?;
        Ok(Box::new(Self {
            column: RwLock::new(column),
            last_results: RwLock::new(None),
        }))
    }

    pub(crate) fn read(&self) -> Result<RwLockReadGuard<'_, Column>, DefaultGiplError> {
        self.column
            .read()
            .map_err(|_| DefaultGiplError::lock_poisoned("column"))
    }

    pub(crate) fn write(&self) -> Result<RwLockWriteGuard<'_, Column>, DefaultGiplError> {
        self.column
            .write()
            .map_err(|_| DefaultGiplError::lock_poisoned("column"))
    }

    pub(crate) fn results(
        &self,
    ) -> Result<RwLockReadGuard<'_, Option<IntervalResults>>, DefaultGiplError> {
        self.last_results
            .read()
            .map_err(|_| DefaultGiplError::lock_poisoned("results"))
    }
}

/// Create a column from a JSON setup.
///
/// The setup lists the snow grid and soil layers, for example:
/// ```json
/// {
///   "snow": { "nodes": 10, "max_thickness": 1.0, "initial_temperature": -1.0 },
///   "soil_layers": [
///     { "layer_type": "Peat", "nodes": 10, "max_depth": 0.5,
///       "initial_temperature": 0.5, "initial_water_content": 0.6 },
///     { "layer_type": "MineralSoil", "nodes": 40, "max_depth": 20.0,
///       "initial_temperature": -1.0, "initial_water_content": 0.3 }
///   ],
///   "output_depths": [0.05, 0.1, 0.2, 0.5, 1.0]
/// }
/// ```
///
/// # Safety
/// `catalog` must be a live catalog handle, `name` and `setup_json`
/// NUL-terminated UTF-8 strings and `out_column` a valid pointer to writable
/// storage. On error `*out_column` is set to null.
#[no_mangle]
pub unsafe extern "C" fn gipl_column_new(
    catalog: *const GiplCatalog,
    name: *const c_char,
    setup_json: *const c_char,
    out_column: *mut *mut GiplColumn,
) -> GiplErrorCode {
    if out_column.is_null() {
        return track_error(&DefaultGiplError::null_pointer("out_column"));
    }

    let result = (|| {
        // SAFETY: live catalog handle and NUL-terminated strings per the
        // function contract.
        let (catalog, name, setup_json) = unsafe {
            (
                ref_from_ptr(catalog, "catalog")?,
                str_from_ptr(name, "name")?,
                str_from_ptr(setup_json, "setup_json")?,
            )
        };
        GiplColumn::new(catalog, name, setup_json)
    })();

    match track_result(result) {
        Ok(column) => {
            // SAFETY: `out_column` checked for null above.
            unsafe {
                *out_column = Box::into_raw(column);
            }
            GiplErrorCode::Ok
        }
        Err(code) => {
            // SAFETY: as above; set to null on error per documentation contract.
            unsafe {
                *out_column = ptr::null_mut();
            }
            code
        }
    }
}

/// Destroy a column created by `gipl_column_new`.
///
/// # Safety
/// `ptr` must come from `gipl_column_new` and not have been destroyed
/// already. Null is a no-op.
#[no_mangle]
pub unsafe extern "C" fn gipl_column_destroy(ptr: *mut GiplColumn) {
    if ptr.is_null() {
        return;
    }

    // SAFETY: The pointer was created by `Box::into_raw` in `gipl_column_new`
    // and not freed or moved elsewhere.
    unsafe {
        drop(Box::from_raw(ptr));
    }
}
