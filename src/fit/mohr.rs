//! Mohr–Coulomb reduction of failure circles.
//!
//! The regression runs in the stabilized coordinates
//! `sig = (sigma_1 + sigma_3) / 2`, `tau = (sigma_1 - sigma_3) / 2`, where the
//! failure envelope of the circles' tops is the straight line
//! `tau = A + B * sig` with `B = sin(fi)`. The line is converted to the
//! principal-stress form `sigma_1 = a + b * sigma_3` and from there to `c, fi`.

use crate::math::{Line, fit_line};

/// Cohesion (kPa) and friction angle (degrees).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MohrCoulomb {
    pub c: f64,
    pub fi: f64,
}

impl MohrCoulomb {
    /// Passive coefficient `b = tan^2(45 + fi / 2)`.
    pub fn b(&self) -> f64 {
        let s = self.fi.to_radians().sin();
        (1.0 + s) / (1.0 - s)
    }

    /// Deviator at failure for confining pressure `sigma_3`.
    pub fn qf(&self, sigma_3: f64) -> f64 {
        let b = self.b();
        sigma_3 * (b - 1.0) + 2.0 * self.c * b.sqrt()
    }

    /// Shear strength on a plane with normal stress `sigma`.
    pub fn tau_at(&self, sigma: f64) -> f64 {
        self.c + sigma * self.fi.to_radians().tan()
    }
}

/// Stabilized coordinates of each circle: `(sig, tau)`.
pub fn stabilized(sigma_3: &[f64], sigma_1: &[f64]) -> (Vec<f64>, Vec<f64>) {
    sigma_3
        .iter()
        .zip(sigma_1)
        .map(|(s3, s1)| ((s1 + s3) / 2.0, (s1 - s3) / 2.0))
        .unzip()
}

/// Convert the stabilized line `tau = A + B * sig` into `c, fi`.
pub fn from_stabilized(line: Line) -> Option<MohrCoulomb> {
    let big_b = line.slope;
    if !(big_b.abs() < 1.0) {
        return None;
    }
    let b = (1.0 + big_b) / (1.0 - big_b);
    let a = 2.0 * line.intercept / (1.0 - big_b);
    let root = b.sqrt();
    let c = a / (2.0 * root);
    let fi = ((b - 1.0) / (2.0 * root)).atan().to_degrees();
    (c.is_finite() && fi.is_finite()).then_some(MohrCoulomb { c, fi })
}

/// Least squares `c, fi` of three or more circles.
///
/// Returns `None` for fewer than two distinct circles or a degenerate slope.
pub fn fit_mohr_coulomb(sigma_3: &[f64], sigma_1: &[f64]) -> Option<MohrCoulomb> {
    let (sig, tau) = stabilized(sigma_3, sigma_1);
    from_stabilized(fit_line(&sig, &tau)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recovers_exact_envelope() {
        let target = MohrCoulomb { c: 10.0, fi: 25.0 };
        let s3 = [100.0, 200.0, 400.0];
        let s1: Vec<f64> = s3.iter().map(|s| s + target.qf(*s)).collect();
        let fit = fit_mohr_coulomb(&s3, &s1).unwrap();
        assert!((fit.c - 10.0).abs() < 1e-9, "c={}", fit.c);
        assert!((fit.fi - 25.0).abs() < 1e-9, "fi={}", fit.fi);
    }

    #[test]
    fn envelope_is_tangent_to_circles() {
        let mc = MohrCoulomb { c: 20.0, fi: 30.0 };
        let s3 = 150.0;
        let qf = mc.qf(s3);
        let centre = s3 + qf / 2.0;
        let phi = mc.fi.to_radians();
        // Distance from the circle centre to the envelope equals the radius.
        let dist = (mc.c + centre * phi.tan()) * phi.cos();
        assert!((dist - qf / 2.0).abs() < 1e-9);
    }

    #[test]
    fn steep_stabilized_line_is_rejected() {
        let line = Line {
            slope: 1.2,
            intercept: 0.0,
        };
        assert!(from_stabilized(line).is_none());
    }
}
