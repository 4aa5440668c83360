//! Polynomial approximation in a Chebyshev basis.
//!
//! The volumetric strain curve is smoothed with a degree-15 polynomial. Plain
//! monomials of that degree are hopeless numerically, so `x` is mapped onto
//! `[-1, 1]` and the design matrix is built from Chebyshev polynomials
//! `T_k(t)`, which stay bounded by 1 on that interval.

use nalgebra::{DMatrix, DVector};

use crate::math::solve_least_squares;

/// A fitted polynomial, valid on the `x` range it was fitted on.
#[derive(Debug, Clone, PartialEq)]
pub struct Polynomial {
    coeffs: Vec<f64>,
    centre: f64,
    half_range: f64,
}

impl Polynomial {
    /// Least squares fit of degree `degree` (capped by the sample count).
    ///
    /// Returns `None` for fewer than two samples, a zero-width `x` range, or a
    /// solve that fails.
    pub fn fit(x: &[f64], y: &[f64], degree: usize) -> Option<Polynomial> {
        let n = x.len().min(y.len());
        if n < 2 {
            return None;
        }
        let (lo, hi) = x[..n]
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)));
        let half_range = (hi - lo) / 2.0;
        if !(half_range.is_finite() && half_range > 0.0) {
            return None;
        }
        let centre = (hi + lo) / 2.0;
        let degree = degree.min(n - 1);

        let mut design = DMatrix::<f64>::zeros(n, degree + 1);
        let mut row = vec![0.0; degree + 1];
        for i in 0..n {
            chebyshev_row((x[i] - centre) / half_range, &mut row);
            for (j, v) in row.iter().enumerate() {
                design[(i, j)] = *v;
            }
        }
        let rhs = DVector::from_row_slice(&y[..n]);
        let beta = solve_least_squares(&design, &rhs)?;

        Some(Polynomial {
            coeffs: beta.iter().copied().collect(),
            centre,
            half_range,
        })
    }

    pub fn degree(&self) -> usize {
        self.coeffs.len().saturating_sub(1)
    }

    pub fn eval(&self, x: f64) -> f64 {
        let t = (x - self.centre) / self.half_range;
        let mut t_prev = 1.0;
        let mut t_cur = t;
        let mut acc = self.coeffs[0];
        for (k, c) in self.coeffs.iter().enumerate().skip(1) {
            if k > 1 {
                let next = 2.0 * t * t_cur - t_prev;
                t_prev = t_cur;
                t_cur = next;
            }
            acc += c * t_cur;
        }
        acc
    }

    pub fn eval_many(&self, x: &[f64]) -> Vec<f64> {
        x.iter().map(|&v| self.eval(v)).collect()
    }
}

fn chebyshev_row(t: f64, out: &mut [f64]) {
    for k in 0..out.len() {
        out[k] = match k {
            0 => 1.0,
            1 => t,
            _ => 2.0 * t * out[k - 1] - out[k - 2],
        };
    }
}
