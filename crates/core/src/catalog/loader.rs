//! Properties-file loader
//!
//! ```text
//! GeothermalHeatFlux   0.05
//! LayerType    Lm     Cm    Porosity  CurveFile
//! LiveMoss     0.25   2.0   0.95      live_moss.txt
//! Peat         0.35   2.5   0.85      peat.txt
//! ```
//!
//! The `Porosity` column is optional: four-column rows
//! (`LayerType Lm Cm CurveFile`) register layer types without a default
//! porosity, and columns built from them must carry a porosity profile.
//!
//! Keys before the `LayerType` header set global values; unknown keys are
//! skipped. Table rows run until the first blank line. Curve files are
//! resolved relative to the properties file and hold `T f df` rows, of which
//! exactly [`CALIBRATION_SAMPLES`] are read.

use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use super::MaterialCatalog;
use crate::error::{GiplError, GiplResult};
use crate::physics::{CalibrationTable, CALIBRATION_SAMPLES};

const TABLE_HEADER: &str = "LayerType";
const GEOTHERMAL_KEY: &str = "GeothermalHeatFlux";

fn read_lines(path: &Path) -> GiplResult<Vec<String>> {
    let text = fs::read_to_string(path).map_err(|source| GiplError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let mut lines: Vec<String> = text.lines().map(|l| l.trim().to_string()).collect();
    while lines.last().is_some_and(String::is_empty) {
        lines.pop();
    }
    if lines.is_empty() {
        return Err(GiplError::parse(path, 0, "file is empty"));
    }
    Ok(lines)
}

fn parse_number(path: &Path, line: usize, name: &str, token: Option<&str>) -> GiplResult<f64> {
    let token = token.ok_or_else(|| GiplError::parse(path, line, format!("missing {name}")))?;
    token.parse::<f64>().map_err(|_| {
        GiplError::parse(
            path,
            line,
            format!("cannot parse '{token}' as numeric for {name}"),
        )
    })
}

fn starts_with_key(line: &str, key: &str) -> bool {
    line.get(..key.len())
        .is_some_and(|head| head.eq_ignore_ascii_case(key))
}

/// Read one curve file into a calibration table.
///
/// # Errors
///
/// IO errors, fewer than [`CALIBRATION_SAMPLES`] rows, or unparsable numbers.
pub fn load_calibration_table(path: &Path) -> GiplResult<CalibrationTable> {
    let lines = read_lines(path)?;
    if lines.len() < CALIBRATION_SAMPLES {
        return Err(GiplError::parse(
            path,
            lines.len(),
            format!(
                "expected {CALIBRATION_SAMPLES} calibration rows, found {}",
                lines.len()
            ),
        ));
    }

    let mut table = CalibrationTable::default();
    for (row, line) in lines.iter().take(CALIBRATION_SAMPLES).enumerate() {
        let mut tokens = line.split_whitespace();
        table
            .temperature
            .push(parse_number(path, row + 1, "temperature", tokens.next())?);
        table
            .fraction
            .push(parse_number(path, row + 1, "unfrozen fraction", tokens.next())?);
        table
            .slope
            .push(parse_number(path, row + 1, "derivative", tokens.next())?);
    }
    Ok(table)
}

impl MaterialCatalog {
    /// Load a catalog from a properties file and the curve files it lists.
    ///
    /// # Errors
    ///
    /// Missing files, missing `GeothermalHeatFlux` or layer table, malformed
    /// rows, and invalid calibration tables.
    pub fn load(properties_path: impl AsRef<Path>) -> GiplResult<Self> {
        let path = properties_path.as_ref();
        let dir: PathBuf = path.parent().map(Path::to_path_buf).unwrap_or_default();
        let lines = read_lines(path)?;

        let mut geothermal = None;
        let mut header_row = None;
        for (row, line) in lines.iter().enumerate() {
            if starts_with_key(line, TABLE_HEADER) {
                header_row = Some(row);
                break;
            }
            if starts_with_key(line, GEOTHERMAL_KEY) {
                let value = line.split_whitespace().nth(1);
                geothermal = Some(parse_number(path, row + 1, GEOTHERMAL_KEY, value)?);
            } else if !line.is_empty() {
                debug!("Skipping properties line {}: '{}'", row + 1, line);
            }
        }

        let header_row = header_row.ok_or_else(|| {
            GiplError::parse(
                path,
                lines.len(),
                "cannot find properties table starting with 'LayerType'",
            )
        })?;
        let geothermal = geothermal.ok_or_else(|| {
            GiplError::parse(path, header_row + 1, "cannot find 'GeothermalHeatFlux'")
        })?;

        let mut catalog = Self::new(geothermal);
        for (row, line) in lines.iter().enumerate().skip(header_row + 1) {
            if line.is_empty() {
                break;
            }
            let line_no = row + 1;
            let tokens: Vec<&str> = line.split_whitespace().collect();
            let name = tokens
                .first()
                .ok_or_else(|| GiplError::parse(path, line_no, "missing layer name"))?;
            let lm = parse_number(path, line_no, "Lm", tokens.get(1).copied())?;
            let cm = parse_number(path, line_no, "Cm", tokens.get(2).copied())?;
            let (porosity, curve_file) = match tokens.len() {
                0..=3 => return Err(GiplError::parse(path, line_no, "missing curve file")),
                4 => (None, tokens[3]),
                _ => (
                    Some(parse_number(path, line_no, "Porosity", Some(tokens[3]))?),
                    tokens[4],
                ),
            };

            let table = load_calibration_table(&dir.join(curve_file))?;
            catalog.add_layer(name, lm, cm, porosity, &table)?;
        }

        if catalog.is_empty() {
            return Err(GiplError::parse(
                path,
                header_row + 1,
                "properties table has no layer rows",
            ));
        }

        info!(
            "Loaded {} layer types from {} (geothermal flux {} W/m²)",
            catalog.len(),
            path.display(),
            geothermal
        );
        Ok(catalog)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fmt::Write as _;

    fn scratch_dir(tag: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "permafrost-loader-{tag}-{}",
            std::process::id()
        ));
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn write_curve(path: &Path, rows: usize) {
        let table = CalibrationTable::power_law(-0.05, 0.6, -30.0, 10.0, rows);
        let mut text = String::new();
        for k in 0..table.len() {
            writeln!(
                text,
                "{} {} {}",
                table.temperature[k], table.fraction[k], table.slope[k]
            )
            .unwrap();
        }
        fs::write(path, text).unwrap();
    }

    #[test]
    fn loads_properties_and_curves() {
        let dir = scratch_dir("ok");
        write_curve(&dir.join("peat.txt"), CALIBRATION_SAMPLES);
        write_curve(&dir.join("mineral.txt"), CALIBRATION_SAMPLES + 5);
        fs::write(
            dir.join("properties.txt"),
            "GeothermalHeatFlux 0.07\nWCritial 0.1\n\nLayerType Lm Cm Porosity File\n\
             Peat 0.35 2.5 0.85 peat.txt\nMineralSoil 2.5 2.0 0.45 mineral.txt\n\nignored trailer\n",
        )
        .unwrap();

        let catalog = MaterialCatalog::load(dir.join("properties.txt")).unwrap();
        assert_eq!(catalog.len(), 2);
        assert!((catalog.geothermal_heat_flux() - 0.07).abs() < 1e-12);
        let peat = catalog.layer(catalog.resolve("peat").unwrap());
        assert!((peat.porosity.unwrap() - 0.85).abs() < 1e-12);
        assert_eq!(peat.curve.knot_count(), CALIBRATION_SAMPLES);
    }

    #[test]
    fn four_column_rows_leave_porosity_unset() {
        let dir = scratch_dir("nopor");
        write_curve(&dir.join("peat.txt"), CALIBRATION_SAMPLES);
        fs::write(
            dir.join("properties.txt"),
            "GeothermalHeatFlux 0.05\nLayerType Lm Cm File\nPeat 0.35 2.5 peat.txt\n",
        )
        .unwrap();

        let catalog = MaterialCatalog::load(dir.join("properties.txt")).unwrap();
        let peat = catalog.layer(catalog.resolve("Peat").unwrap());
        assert_eq!(peat.porosity, None);
        assert_eq!(peat.curve.knot_count(), CALIBRATION_SAMPLES);
    }

    #[test]
    fn row_without_curve_file_is_an_error() {
        let dir = scratch_dir("nofile");
        fs::write(
            dir.join("properties.txt"),
            "GeothermalHeatFlux 0.05\nLayerType Lm Cm File\nPeat 0.35 2.5\n",
        )
        .unwrap();
        let err = MaterialCatalog::load(dir.join("properties.txt")).unwrap_err();
        assert!(err.to_string().contains("curve file"), "{err}");
    }

    #[test]
    fn short_curve_file_is_an_error() {
        let dir = scratch_dir("short");
        write_curve(&dir.join("peat.txt"), 10);
        fs::write(
            dir.join("properties.txt"),
            "GeothermalHeatFlux 0.05\nLayerType Lm Cm Porosity File\nPeat 0.35 2.5 0.85 peat.txt\n",
        )
        .unwrap();
        let err = MaterialCatalog::load(dir.join("properties.txt")).unwrap_err();
        assert!(matches!(err, GiplError::Parse { .. }), "{err}");
    }

    #[test]
    fn missing_geothermal_flux_is_an_error() {
        let dir = scratch_dir("nogeo");
        fs::write(
            dir.join("properties.txt"),
            "LayerType Lm Cm Porosity File\nPeat 0.35 2.5 0.85 peat.txt\n",
        )
        .unwrap();
        let err = MaterialCatalog::load(dir.join("properties.txt")).unwrap_err();
        assert!(err.to_string().contains("GeothermalHeatFlux"), "{err}");
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let err = MaterialCatalog::load("/nonexistent/permafrost/properties.txt").unwrap_err();
        assert!(matches!(err, GiplError::Io { .. }));
    }
}
