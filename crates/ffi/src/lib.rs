//! C ABI for the permafrost column model
//!
//! Host models (for example a forest-landscape simulator that supplies
//! monthly snow and hydrology) drive columns through opaque handles:
//!
//! ```c
//! GiplCatalog* catalog = NULL;
//! gipl_catalog_load("properties.txt", &catalog);
//!
//! GiplColumn* column = NULL;
//! gipl_column_new(catalog, "site-1", setup_json, &column);
//!
//! gipl_column_run_interval(column, air, 30, snow, snow_k, snow_c, water, n_water);
//! size_t n = 0;
//! gipl_column_average_profile(column, false, profile, capacity, &n);
//!
//! gipl_column_destroy(column);
//! gipl_catalog_destroy(catalog);
//! ```
//!
//! Every fallible call returns a [`GiplErrorCode`]; details of the last
//! failure on the calling thread are available from `gipl_get_last_error`.

mod catalog;
mod error;
mod helpers;
mod instance;
mod queries;
mod simulation;

pub use catalog::{gipl_catalog_destroy, gipl_catalog_load, gipl_catalog_presets, GiplCatalog};
pub use error::{gipl_get_last_error, gipl_get_last_error_code, GiplErrorCode};
pub use instance::{gipl_column_destroy, gipl_column_new, GiplColumn};
pub use queries::{
    gipl_column_average_profile, gipl_column_daily_profile, gipl_column_soil_depths,
    gipl_column_soil_node_count,
};
pub use simulation::gipl_column_run_interval;

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::{CStr, CString};
    use std::ptr;

    const SETUP: &str = r#"{
        "soil_layers": [
            { "layer_type": "Peat", "nodes": 4, "max_depth": 0.4,
              "initial_temperature": 1.0, "initial_water_content": 0.5 },
            { "layer_type": "MineralSoil", "nodes": 6, "max_depth": 3.0,
              "initial_temperature": 1.0, "initial_water_content": 0.3 }
        ],
        "output_depths": [0.1, 1.0]
    }"#;

    unsafe fn presets() -> *mut GiplCatalog {
        let mut catalog = ptr::null_mut();
        assert_eq!(unsafe { gipl_catalog_presets(0.05, &mut catalog) }, GiplErrorCode::Ok);
        catalog
    }

    #[test]
    fn column_round_trip_through_c_abi() {
        unsafe {
            let catalog = presets();
            let name = CString::new("site").unwrap();
            let setup = CString::new(SETUP).unwrap();
            let mut column = ptr::null_mut();
            assert_eq!(
                gipl_column_new(catalog, name.as_ptr(), setup.as_ptr(), &mut column),
                GiplErrorCode::Ok
            );
            // Columns keep their own catalog reference
            gipl_catalog_destroy(catalog);

            assert_eq!(gipl_column_soil_node_count(column), 11);
            let mut depths = [0.0; 11];
            let mut len = 0;
            assert_eq!(
                gipl_column_soil_depths(column, depths.as_mut_ptr(), depths.len(), &mut len),
                GiplErrorCode::Ok
            );
            assert_eq!(len, 11);
            assert!((depths[10] - 3.0).abs() < 1e-12);

            let mut profile = [0.0; 11];
            assert_eq!(
                gipl_column_average_profile(column, false, profile.as_mut_ptr(), 11, &mut len),
                GiplErrorCode::NoResults
            );

            let air = [-5.0; 10];
            assert_eq!(
                gipl_column_run_interval(
                    column,
                    air.as_ptr(),
                    air.len(),
                    ptr::null(),
                    ptr::null(),
                    ptr::null(),
                    ptr::null(),
                    0
                ),
                GiplErrorCode::Ok
            );
            assert!(gipl_get_last_error().is_null());

            assert_eq!(
                gipl_column_daily_profile(column, 9, false, profile.as_mut_ptr(), 11, &mut len),
                GiplErrorCode::Ok
            );
            assert_eq!(profile[0], -5.0);

            let mut at_depths = [0.0; 2];
            assert_eq!(
                gipl_column_average_profile(column, true, at_depths.as_mut_ptr(), 2, &mut len),
                GiplErrorCode::Ok
            );
            assert_eq!(len, 2);
            assert!(at_depths[0] < at_depths[1]);

            assert_eq!(
                gipl_column_daily_profile(column, 10, false, profile.as_mut_ptr(), 11, &mut len),
                GiplErrorCode::InvalidParameter
            );
            gipl_column_destroy(column);
        }
    }

    #[test]
    fn failed_run_discards_previous_results() {
        unsafe {
            let catalog = presets();
            let name = CString::new("snowy").unwrap();
            let setup = CString::new(
                r#"{
                "snow": { "nodes": 4, "max_thickness": 1.0, "initial_temperature": -1.0 },
                "soil_layers": [
                    { "layer_type": "MineralSoil", "nodes": 5, "max_depth": 1.0,
                      "initial_temperature": 1.0, "initial_water_content": 0.3 }
                ]
            }"#,
            )
            .unwrap();
            let mut column = ptr::null_mut();
            assert_eq!(
                gipl_column_new(catalog, name.as_ptr(), setup.as_ptr(), &mut column),
                GiplErrorCode::Ok
            );

            let air = [1.0; 3];
            assert_eq!(
                gipl_column_run_interval(
                    column,
                    air.as_ptr(),
                    air.len(),
                    ptr::null(),
                    ptr::null(),
                    ptr::null(),
                    ptr::null(),
                    0
                ),
                GiplErrorCode::Ok
            );
            let mut profile = [0.0; 6];
            let mut len = 0;
            assert_eq!(
                gipl_column_average_profile(column, false, profile.as_mut_ptr(), 6, &mut len),
                GiplErrorCode::Ok
            );

            // Snow without conductivity or heat capacity cannot be simulated
            let snow = [0.5; 3];
            assert_eq!(
                gipl_column_run_interval(
                    column,
                    air.as_ptr(),
                    air.len(),
                    snow.as_ptr(),
                    ptr::null(),
                    ptr::null(),
                    ptr::null(),
                    0
                ),
                GiplErrorCode::InvalidProperty
            );
            assert_eq!(
                gipl_column_average_profile(column, false, profile.as_mut_ptr(), 6, &mut len),
                GiplErrorCode::NoResults
            );
            assert_eq!(
                gipl_column_daily_profile(column, 0, false, profile.as_mut_ptr(), 6, &mut len),
                GiplErrorCode::NoResults
            );

            gipl_column_destroy(column);
            gipl_catalog_destroy(catalog);
        }
    }

    #[test]
    fn errors_are_reported_with_messages() {
        unsafe {
            let catalog = presets();
            let name = CString::new("bad").unwrap();
            let setup = CString::new(r#"{ "soil_layers": [ { "layer_type": "Clay", "nodes": 2,
                "max_depth": 1.0, "initial_temperature": 0.0, "initial_water_content": 0.1 } ] }"#)
            .unwrap();
            let mut column = ptr::null_mut();
            let code = gipl_column_new(catalog, name.as_ptr(), setup.as_ptr(), &mut column);
            assert_eq!(code, GiplErrorCode::UnknownLayerType);
            assert!(column.is_null());
            assert_eq!(gipl_get_last_error_code(), GiplErrorCode::UnknownLayerType);
            let msg = CStr::from_ptr(gipl_get_last_error()).to_str().unwrap();
            assert!(msg.contains("Clay"), "{msg}");

            let garbage = CString::new("{ not json").unwrap();
            let code = gipl_column_new(catalog, name.as_ptr(), garbage.as_ptr(), &mut column);
            assert_eq!(code, GiplErrorCode::InvalidParameter);

            let code = gipl_column_new(catalog, name.as_ptr(), setup.as_ptr(), ptr::null_mut());
            assert_eq!(code, GiplErrorCode::NullPointer);

            let path = CString::new("/nonexistent/properties.txt").unwrap();
            let mut loaded = ptr::null_mut();
            assert_eq!(gipl_catalog_load(path.as_ptr(), &mut loaded), GiplErrorCode::Io);
            assert!(loaded.is_null());

            gipl_catalog_destroy(catalog);
        }
    }
}
