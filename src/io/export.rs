//! Result exports.
//!
//! - processed results and fits as JSON, stamped with the generation time
//! - device logs as CSV, easy to consume in spreadsheets or a log writer

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::TriaxError;
use crate::io::json::write_json;
use crate::synth::LogRow;

/// Exported document: payload plus provenance.
#[derive(Debug, Serialize)]
pub struct Export<'a, T: Serialize> {
    pub tool: &'static str,
    pub generated_at: DateTime<Utc>,
    pub result: &'a T,
}

/// Write `result` wrapped in an [`Export`] envelope.
pub fn write_export_json<T: Serialize>(path: &Path, result: &T) -> Result<(), TriaxError> {
    let export = Export {
        tool: "triax",
        generated_at: Utc::now(),
        result,
    };
    write_json(path, &export, "export JSON")
}

/// Write a device log as CSV.
pub fn write_log_csv(path: &Path, rows: &[LogRow]) -> Result<(), TriaxError> {
    let file = File::create(path)
        .map_err(|e| TriaxError::io(format!("failed to create log CSV '{}'", path.display()), e))?;
    let mut out = BufWriter::new(file);
    let fail = |e: std::io::Error| TriaxError::io("failed to write log CSV", e);

    writeln!(
        out,
        "time_s,travel_mm,strain,deviator_kpa,pore_volume_strain,cell_volume_strain,pore_pressure_kpa"
    )
    .map_err(fail)?;
    for r in rows {
        writeln!(
            out,
            "{:.3},{:.6},{:.8},{:.4},{:.8},{:.8},{:.4}",
            r.time,
            r.travel,
            r.strain,
            r.deviator,
            r.pore_volume_strain,
            r.cell_volume_strain,
            r.pore_pressure
        )
        .map_err(fail)?;
    }
    out.flush().map_err(fail)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn export_carries_timestamp() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.json");
        write_export_json(&path, &vec![1.0, 2.0]).unwrap();
        let value: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["tool"], "triax");
        assert!(value["generated_at"].as_str().unwrap().contains('T'));
        assert_eq!(value["result"][1], 2.0);
    }

    #[test]
    fn log_csv_has_header_and_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("log.csv");
        let row = LogRow {
            time: 1.5,
            travel: 0.1,
            strain: 0.001,
            deviator: 12.0,
            pore_volume_strain: 0.0,
            cell_volume_strain: 0.0,
            pore_pressure: 0.2,
        };
        write_log_csv(&path, &[row, row]).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("time_s,"));
        assert!(lines[1].starts_with("1.500,0.100000,"));
    }
}
