//! JSON read/write of inputs: raw series, targets, circle sets and configs.

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::domain::{CircleSet, MechanicalTarget, RawTestSeries};
use crate::error::TriaxError;

/// Read any JSON document; `what` names it in error messages.
pub fn read_json<T: DeserializeOwned>(path: &Path, what: &str) -> Result<T, TriaxError> {
    let file = File::open(path)
        .map_err(|e| TriaxError::io(format!("failed to open {what} '{}'", path.display()), e))?;
    serde_json::from_reader(BufReader::new(file))
        .map_err(|e| TriaxError::json(format!("invalid {what} '{}'", path.display()), e))
}

/// Write any value as pretty JSON.
pub fn write_json<T: Serialize>(path: &Path, value: &T, what: &str) -> Result<(), TriaxError> {
    let file = File::create(path)
        .map_err(|e| TriaxError::io(format!("failed to create {what} '{}'", path.display()), e))?;
    let mut out = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut out, value)
        .map_err(|e| TriaxError::json(format!("failed to write {what} '{}'", path.display()), e))?;
    out.flush()
        .map_err(|e| TriaxError::io(format!("failed to flush {what} '{}'", path.display()), e))
}

pub fn read_series(path: &Path) -> Result<RawTestSeries, TriaxError> {
    read_json(path, "series JSON")
}

pub fn write_series(path: &Path, series: &RawTestSeries) -> Result<(), TriaxError> {
    write_json(path, series, "series JSON")
}

pub fn read_target(path: &Path) -> Result<MechanicalTarget, TriaxError> {
    let target: MechanicalTarget = read_json(path, "target JSON")?;
    target.validate()?;
    Ok(target)
}

/// Circle sets are validated (sorted, no duplicates) while parsing.
pub fn read_circles(path: &Path) -> Result<CircleSet, TriaxError> {
    read_json(path, "circles JSON")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn series_survives_a_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("series.json");
        let series = RawTestSeries {
            strain: vec![0.0, 0.001],
            deviator: vec![0.0, 10.0],
            pore_volume_strain: vec![0.0, -0.0001],
            cell_volume_strain: vec![0.0, -0.0001],
            pore_pressure: vec![0.0, 0.5],
            reload: None,
        };
        write_series(&path, &series).unwrap();
        assert_eq!(read_series(&path).unwrap(), series);
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let err = read_series(Path::new("/nonexistent/series.json")).unwrap_err();
        assert_eq!(err.exit_code(), 2);
        assert!(matches!(err, TriaxError::Io { .. }));
    }

    #[test]
    fn written_json_is_complete_on_return() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("values.json");
        let values: Vec<f64> = (0..5000).map(f64::from).collect();
        write_json(&path, &values, "values JSON").unwrap();
        let back: Vec<f64> = read_json(&path, "values JSON").unwrap();
        assert_eq!(back, values);
    }

    #[test]
    fn unwritable_path_is_an_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("out.json");
        let err = write_json(&path, &1.0, "values JSON").unwrap_err();
        assert!(matches!(err, TriaxError::Io { .. }));
    }

    #[test]
    fn invalid_circles_fail_to_parse() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("circles.json");
        std::fs::write(&path, r#"[{"sigma_3": 100, "sigma_1": 50}]"#).unwrap();
        assert!(matches!(read_circles(&path), Err(TriaxError::Json { .. })));
    }
}
