//! Volumetric behaviour: smoothing, Poisson's ratio and dilatancy angle.

use crate::domain::{DilatancyAngle, ProcessorConfig, UndefinedReason};
use crate::math::{Polynomial, fit_line, y_at_x};

/// Smooth volumetric strain against axial strain.
pub fn approximate(strain: &[f64], volume: &[f64], degree: usize) -> Option<Polynomial> {
    Polynomial::fit(strain, volume, degree)
}

/// Volumetric strain at `strain`, from the approximation when available.
pub fn volume_at(poly: Option<&Polynomial>, strain: &[f64], volume: &[f64], at: f64) -> Option<f64> {
    match poly {
        Some(p) => Some(p.eval(at)),
        None => y_at_x(strain, volume, at),
    }
}

/// Poisson's ratio `(1 + eps_v(strain50) / strain50) / 2`.
///
/// Volumetric strain is positive for dilation, so a contracting specimen
/// gives `nu < 0.5`. Returns 0 when `strain50` is not positive.
pub fn poissons_ratio(volume_at_strain50: Option<f64>, strain50: f64) -> f64 {
    match volume_at_strain50 {
        Some(v) if strain50 > 0.0 => {
            let nu = (1.0 + v / strain50) / 2.0;
            if nu.is_finite() { nu } else { 0.0 }
        }
        _ => 0.0,
    }
}

/// Dilatancy angle from a local regression around the stress peak.
///
/// `sin(psi) = k / (k + 2)` with `k = d(eps_v)/d(eps_1)`.
pub fn dilatancy(
    strain: &[f64],
    volume: &[f64],
    peak_index: usize,
    config: &ProcessorConfig,
) -> Result<DilatancyAngle, UndefinedReason> {
    let peak_strain = *strain.get(peak_index).ok_or(UndefinedReason::EmptyWindow)?;
    if peak_strain >= config.late_peak_strain {
        return Err(UndefinedReason::LatePeak);
    }

    let half = config.dilatancy_half_window;
    let (x, y): (Vec<f64>, Vec<f64>) = strain
        .iter()
        .zip(volume)
        .filter(|(e, _)| (**e - peak_strain).abs() <= half)
        .map(|(e, v)| (*e, *v))
        .unzip();
    if x.len() < 3 {
        return Err(UndefinedReason::EmptyWindow);
    }

    let line = fit_line(&x, &y).ok_or(UndefinedReason::DegenerateRegression)?;
    let denom = line.slope + 2.0;
    let sin_psi = line.slope / denom;
    if !(denom > 0.0 && sin_psi.is_finite() && (-1.0..=1.0).contains(&sin_psi)) {
        return Err(UndefinedReason::DegenerateRegression);
    }

    let x_lo = x.iter().copied().fold(f64::INFINITY, f64::min);
    let x_hi = x.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    Ok(DilatancyAngle {
        value: sin_psi.asin().to_degrees(),
        points: [(x_lo, line.at(x_lo)), (x_hi, line.at(x_hi))],
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn poisson_from_contraction() {
        // eps_v = -(1 - 2 nu) eps_1 with nu = 0.3
        let nu = poissons_ratio(Some(-0.4 * 0.01), 0.01);
        assert!((nu - 0.3).abs() < 1e-12);
        assert_eq!(poissons_ratio(Some(0.1), 0.0), 0.0);
        assert_eq!(poissons_ratio(None, 0.01), 0.0);
    }

    #[test]
    fn dilatancy_from_linear_dilation() {
        // k = 2 sin(psi) / (1 - sin(psi)) for psi = 10 degrees.
        let s = 10.0_f64.to_radians().sin();
        let k = 2.0 * s / (1.0 - s);
        let strain: Vec<f64> = (0..200).map(|i| i as f64 * 1e-4).collect();
        let volume: Vec<f64> = strain.iter().map(|e| k * (e - 0.01)).collect();
        let angle = dilatancy(&strain, &volume, 100, &ProcessorConfig::default()).unwrap();
        assert!((angle.value - 10.0).abs() < 1e-6, "psi={}", angle.value);
        assert!(angle.points[0].0 < angle.points[1].0);
    }

    #[test]
    fn late_peak_has_no_dilatancy() {
        let strain: Vec<f64> = (0..200).map(|i| i as f64 * 1e-3).collect();
        let volume = vec![0.0; 200];
        let r = dilatancy(&strain, &volume, 150, &ProcessorConfig::default());
        assert_eq!(r, Err(UndefinedReason::LatePeak));
    }

    #[test]
    fn volume_at_falls_back_to_samples() {
        let strain = [0.0, 0.01, 0.02];
        let volume = [0.0, -0.002, -0.003];
        let v = volume_at(None, &strain, &volume, 0.015).unwrap();
        assert!((v + 0.0025).abs() < 1e-12);
    }
}
