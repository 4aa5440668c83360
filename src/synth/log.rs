//! Conversion of a synthetic series into a device log time series.

use serde::{Deserialize, Serialize};

use crate::domain::{LogSpec, RawTestSeries};
use crate::error::TriaxError;

/// One row of a device log.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LogRow {
    /// Elapsed time (s).
    pub time: f64,
    /// Piston travel (mm).
    pub travel: f64,
    pub strain: f64,
    /// Deviator (kPa).
    pub deviator: f64,
    pub pore_volume_strain: f64,
    pub cell_volume_strain: f64,
    /// Pore pressure (kPa).
    pub pore_pressure: f64,
}

/// Convert each sample of `series` into one log row at constant piston velocity.
///
/// Samples are not interpolated; row `i` is sample `i` with its travel and time.
///
/// Travel is measured on the specimen height left after the previous stage;
/// time accumulates `|d travel| / velocity`, so unloading takes time as well.
pub fn to_log_series(series: &RawTestSeries, spec: &LogSpec) -> Result<Vec<LogRow>, TriaxError> {
    let height = spec.sample_height - spec.height_reduction;
    if !(height > 0.0 && spec.velocity > 0.0) {
        return Err(TriaxError::invalid_input(format!(
            "log needs velocity > 0 and a positive specimen height, got velocity={}, height={height}",
            spec.velocity
        )));
    }

    let mut rows = Vec::with_capacity(series.len());
    let mut time = 0.0;
    let mut previous: Option<f64> = None;
    for i in 0..series.len() {
        let travel = series.strain[i] * height;
        if let Some(prev) = previous {
            time += (travel - prev).abs() / spec.velocity * 60.0;
        }
        previous = Some(travel);
        rows.push(LogRow {
            time,
            travel,
            strain: series.strain[i],
            deviator: series.deviator[i],
            pore_volume_strain: series.pore_volume_strain[i],
            cell_volume_strain: series.cell_volume_strain[i],
            pore_pressure: series.pore_pressure[i],
        });
    }
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn series() -> RawTestSeries {
        let strain = vec![0.0, 0.01, 0.02, 0.015, 0.03];
        RawTestSeries {
            deviator: vec![0.0; 5],
            pore_volume_strain: vec![0.0; 5],
            cell_volume_strain: vec![0.0; 5],
            pore_pressure: vec![0.0; 5],
            strain,
            reload: None,
        }
    }

    #[test]
    fn time_follows_travel_at_constant_velocity() {
        let spec = LogSpec {
            velocity: 0.5,
            sample_height: 100.0,
            height_reduction: 0.0,
        };
        let rows = to_log_series(&series(), &spec).unwrap();
        assert!((rows[1].travel - 1.0).abs() < 1e-12);
        assert!((rows[1].time - 120.0).abs() < 1e-9);
        // Unloading step 0.02 -> 0.015 still advances the clock.
        assert!(rows[3].time > rows[2].time);
        assert!((rows[4].time - (2.0 + 0.5 + 1.5) / 0.5 * 60.0).abs() < 1e-9);
    }

    #[test]
    fn one_row_per_sample() {
        let mut s = series();
        s.deviator = vec![0.0, 10.0, 20.0, 15.0, 30.0];
        let rows = to_log_series(&s, &LogSpec::default()).unwrap();
        assert_eq!(rows.len(), s.len());
        for (row, (e, q)) in rows.iter().zip(s.strain.iter().zip(&s.deviator)) {
            assert_eq!((row.strain, row.deviator), (*e, *q));
        }
    }

    #[test]
    fn height_reduction_shortens_travel() {
        let spec = LogSpec {
            velocity: 0.1,
            sample_height: 76.0,
            height_reduction: 6.0,
        };
        let rows = to_log_series(&series(), &spec).unwrap();
        assert!((rows[1].travel - 0.7).abs() < 1e-12);
        let bad = LogSpec {
            height_reduction: 80.0,
            ..spec
        };
        assert!(to_log_series(&series(), &bad).is_err());
    }
}
