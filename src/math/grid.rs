//! Deterministic search grids.
//!
//! Nonlinear parameters (the stiffness exponent `m`) are first located on a
//! coarse grid and then refined. The grid avoids local minima and gives the
//! same answer for the same inputs.

use crate::error::TriaxError;

/// Generate `steps` evenly spaced points between `min` and `max` (inclusive).
pub fn lin_space(min: f64, max: f64, steps: usize) -> Result<Vec<f64>, TriaxError> {
    if !(min.is_finite() && max.is_finite() && max > min) {
        return Err(TriaxError::invalid_input(format!(
            "invalid grid range: min={min}, max={max} (must be finite and max>min)"
        )));
    }
    if steps < 2 {
        return Err(TriaxError::invalid_input("grid steps must be >= 2"));
    }

    let step = (max - min) / (steps as f64 - 1.0);
    Ok((0..steps).map(|i| min + step * i as f64).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lin_space_includes_endpoints() {
        let v = lin_space(0.0, 2.0, 5).unwrap();
        assert_eq!(v.len(), 5);
        assert!((v[0] - 0.0).abs() < 1e-12);
        assert!((v[4] - 2.0).abs() < 1e-12);
        assert!((v[1] - 0.5).abs() < 1e-12);
    }

    #[test]
    fn lin_space_rejects_bad_ranges() {
        assert!(lin_space(1.0, 1.0, 5).is_err());
        assert!(lin_space(0.0, 1.0, 1).is_err());
    }
}
