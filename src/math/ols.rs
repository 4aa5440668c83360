//! Least squares solvers.
//!
//! Two flavours are used across the engine:
//!
//! - a general dense solve (SVD) for the polynomial volumetric-strain
//!   approximation and the log–log stiffness regression
//! - closed-form normal equations for straight-line fits, where the
//!   Mohr–Coulomb reduction needs an exact, iteration-free answer

use nalgebra::{DMatrix, DVector};

/// Solve a least squares problem using SVD.
///
/// Returns `None` if the system is too ill-conditioned to solve robustly.
pub fn solve_least_squares(x: &DMatrix<f64>, y: &DVector<f64>) -> Option<DVector<f64>> {
    let svd = x.clone().svd(true, true);

    // High-degree polynomial columns get nearly collinear on short windows, so
    // progressively looser tolerances are tried before giving up.
    for &tol in &[1e-12, 1e-10, 1e-8] {
        if let Ok(beta) = svd.solve(y, tol) {
            if beta.iter().all(|v| v.is_finite()) {
                return Some(beta);
            }
        }
    }

    None
}

/// Straight line `y = slope * x + intercept`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Line {
    pub slope: f64,
    pub intercept: f64,
}

impl Line {
    pub fn at(&self, x: f64) -> f64 {
        self.slope * x + self.intercept
    }
}

/// Ordinary least squares line through `(x, y)` via the normal equations.
///
/// Returns `None` with fewer than two points or zero variance in `x`.
pub fn fit_line(x: &[f64], y: &[f64]) -> Option<Line> {
    let n = x.len().min(y.len());
    if n < 2 {
        return None;
    }
    let nf = n as f64;
    let x_mean = x[..n].iter().sum::<f64>() / nf;
    let y_mean = y[..n].iter().sum::<f64>() / nf;

    let mut sxy = 0.0;
    let mut sxx = 0.0;
    for i in 0..n {
        let dx = x[i] - x_mean;
        sxy += dx * (y[i] - y_mean);
        sxx += dx * dx;
    }
    if sxx <= f64::EPSILON * nf * x_mean.abs().max(1.0) || !sxy.is_finite() {
        return None;
    }
    let slope = sxy / sxx;
    Some(Line {
        slope,
        intercept: y_mean - slope * x_mean,
    })
}

/// Least squares slope of `y = k * x` (line through the origin).
pub fn fit_slope_through_origin(x: &[f64], y: &[f64]) -> Option<f64> {
    let sxx: f64 = x.iter().map(|v| v * v).sum();
    if sxx <= 0.0 {
        return None;
    }
    let sxy: f64 = x.iter().zip(y).map(|(a, b)| a * b).sum();
    let k = sxy / sxx;
    k.is_finite().then_some(k)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn least_squares_solves_simple_system() {
        // Fit y = 2 + 3x on x = [0,1,2]
        let x = DMatrix::from_row_slice(3, 2, &[1.0, 0.0, 1.0, 1.0, 1.0, 2.0]);
        let y = DVector::from_row_slice(&[2.0, 5.0, 8.0]);

        let beta = solve_least_squares(&x, &y).unwrap();
        assert!((beta[0] - 2.0).abs() < 1e-10);
        assert!((beta[1] - 3.0).abs() < 1e-10);
    }

    #[test]
    fn fit_line_recovers_exact_line() {
        let x = [1.0, 2.0, 4.0, 8.0];
        let y: Vec<f64> = x.iter().map(|v| 0.5 * v - 3.0).collect();
        let line = fit_line(&x, &y).unwrap();
        assert!((line.slope - 0.5).abs() < 1e-12);
        assert!((line.intercept + 3.0).abs() < 1e-12);
        assert!((line.at(10.0) - 2.0).abs() < 1e-12);
    }

    #[test]
    fn fit_line_rejects_constant_x() {
        assert!(fit_line(&[2.0, 2.0, 2.0], &[1.0, 2.0, 3.0]).is_none());
        assert!(fit_line(&[1.0], &[1.0]).is_none());
    }

    #[test]
    fn slope_through_origin() {
        let k = fit_slope_through_origin(&[1.0, 2.0], &[2.0, 4.0]).unwrap();
        assert!((k - 2.0).abs() < 1e-12);
        assert!(fit_slope_through_origin(&[0.0, 0.0], &[1.0, 1.0]).is_none());
    }
}
