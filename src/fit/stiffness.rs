//! Stiffness exponent `m` of the power law
//! `E50(sigma_3) = e_ref * ((c cos(fi) + sigma_3 sin(fi)) / (c cos(fi) + p_ref sin(fi)))^m`.
//!
//! Two estimators are reported side by side because they diverge on noisy
//! data:
//!
//! - [`PlaxisEstimator`]: least squares on the raw E50 values. `e_ref` has a
//!   closed form for fixed `m`, so `m` is located on a grid and refined with a
//!   golden-section search.
//! - [`ApproximateEstimator`]: straight line through `(ln ratio, ln E50)`.

use nalgebra::{DMatrix, DVector};

use crate::domain::{
    StiffnessConfig, StiffnessFit, StiffnessMethod, StiffnessReport, UndefinedReason,
};
use crate::fit::mohr::MohrCoulomb;
use crate::math::{golden_section, lin_space, solve_least_squares};

/// One (confining pressure, E50) observation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StiffnessSample {
    pub sigma_3: f64,
    pub e50: f64,
}

/// Strategy interface over the two estimators.
pub trait StiffnessExponentEstimator {
    fn method(&self) -> StiffnessMethod;

    /// Fit `m` and `e_ref` from `(ratio, e50)` pairs.
    fn estimate(
        &self,
        ratios: &[f64],
        e50: &[f64],
        config: &StiffnessConfig,
    ) -> Result<StiffnessFit, UndefinedReason>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PlaxisEstimator;

#[derive(Debug, Clone, Copy, Default)]
pub struct ApproximateEstimator;

/// Stress ratio of each sample relative to `p_ref`.
pub fn stress_ratios(
    samples: &[StiffnessSample],
    strength: MohrCoulomb,
    p_ref: f64,
) -> Result<Vec<f64>, UndefinedReason> {
    let phi = strength.fi.to_radians();
    let c_term = strength.c * phi.cos();
    let denom = c_term + p_ref * phi.sin();
    if !(denom > 0.0) {
        return Err(UndefinedReason::NonPositiveStress);
    }
    samples
        .iter()
        .map(|s| {
            let r = (c_term + s.sigma_3 * phi.sin()) / denom;
            if r > 0.0 && r.is_finite() {
                Ok(r)
            } else {
                Err(UndefinedReason::NonPositiveStress)
            }
        })
        .collect()
}

fn check_samples(ratios: &[f64], e50: &[f64]) -> Result<(), UndefinedReason> {
    if ratios.len() < 2 || ratios.len() != e50.len() {
        return Err(UndefinedReason::TooFewSamples);
    }
    if e50.iter().any(|e| !(*e > 0.0)) {
        return Err(UndefinedReason::NonPositiveStress);
    }
    Ok(())
}

/// Best `e_ref` for fixed `m` and the resulting sum of squared errors.
fn profile(ratios: &[f64], e50: &[f64], m: f64) -> (f64, f64) {
    let powered: Vec<f64> = ratios.iter().map(|r| r.powf(m)).collect();
    let num: f64 = powered.iter().zip(e50).map(|(p, e)| p * e).sum();
    let den: f64 = powered.iter().map(|p| p * p).sum();
    let e_ref = if den > 0.0 { num / den } else { 0.0 };
    let sse = powered
        .iter()
        .zip(e50)
        .map(|(p, e)| (e - e_ref * p).powi(2))
        .sum();
    (e_ref, sse)
}

impl StiffnessExponentEstimator for PlaxisEstimator {
    fn method(&self) -> StiffnessMethod {
        StiffnessMethod::Plaxis
    }

    fn estimate(
        &self,
        ratios: &[f64],
        e50: &[f64],
        config: &StiffnessConfig,
    ) -> Result<StiffnessFit, UndefinedReason> {
        check_samples(ratios, e50)?;
        let grid = lin_space(config.m_min, config.m_max, config.grid_steps)
            .map_err(|_| UndefinedReason::EmptyWindow)?;
        let (best, _) = grid
            .iter()
            .map(|&m| (m, profile(ratios, e50, m).1))
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .ok_or(UndefinedReason::EmptyWindow)?;

        let h = grid[1] - grid[0];
        let lo = (best - h).max(config.m_min);
        let hi = (best + h).min(config.m_max);
        let (m, _) = golden_section(|m| profile(ratios, e50, m).1, lo, hi, 1e-9, 200);
        let (e_ref, _) = profile(ratios, e50, m);
        if !(e_ref > 0.0 && e_ref.is_finite()) {
            return Err(UndefinedReason::DegenerateRegression);
        }
        Ok(StiffnessFit {
            m,
            e_ref,
            p_ref: config.p_ref,
        })
    }
}

impl StiffnessExponentEstimator for ApproximateEstimator {
    fn method(&self) -> StiffnessMethod {
        StiffnessMethod::Approximate
    }

    fn estimate(
        &self,
        ratios: &[f64],
        e50: &[f64],
        config: &StiffnessConfig,
    ) -> Result<StiffnessFit, UndefinedReason> {
        check_samples(ratios, e50)?;
        let n = ratios.len();
        let x = DMatrix::from_fn(n, 2, |i, j| if j == 0 { 1.0 } else { ratios[i].ln() });
        let y = DVector::from_iterator(n, e50.iter().map(|e| e.ln()));

        let spread = ratios.iter().map(|r| r.ln()).fold(f64::NEG_INFINITY, f64::max)
            - ratios.iter().map(|r| r.ln()).fold(f64::INFINITY, f64::min);
        if !(spread > 1e-12) {
            return Err(UndefinedReason::DegenerateRegression);
        }
        let beta = solve_least_squares(&x, &y).ok_or(UndefinedReason::DegenerateRegression)?;
        Ok(StiffnessFit {
            m: beta[1],
            e_ref: beta[0].exp(),
            p_ref: config.p_ref,
        })
    }
}

/// Run both estimators on the same samples.
pub fn stiffness_report(
    samples: &[StiffnessSample],
    strength: MohrCoulomb,
    config: &StiffnessConfig,
) -> StiffnessReport {
    if samples.len() < 2 {
        return StiffnessReport::undefined(UndefinedReason::TooFewSamples);
    }
    let ratios = match stress_ratios(samples, strength, config.p_ref) {
        Ok(r) => r,
        Err(reason) => return StiffnessReport::undefined(reason),
    };
    let e50: Vec<f64> = samples.iter().map(|s| s.e50).collect();
    StiffnessReport {
        plaxis: PlaxisEstimator.estimate(&ratios, &e50, config).into(),
        approximate: ApproximateEstimator.estimate(&ratios, &e50, config).into(),
    }
}

/// The estimator behind a caller-selected method.
pub fn estimator(method: StiffnessMethod) -> Box<dyn StiffnessExponentEstimator + Send + Sync> {
    match method {
        StiffnessMethod::Plaxis => Box::new(PlaxisEstimator),
        StiffnessMethod::Approximate => Box::new(ApproximateEstimator),
    }
}

/// E50 predicted by a fitted power law at `sigma_3`.
pub fn e50_at(fit: &StiffnessFit, strength: MohrCoulomb, sigma_3: f64) -> Option<f64> {
    let sample = StiffnessSample { sigma_3, e50: 1.0 };
    let ratio = stress_ratios(&[sample], strength, fit.p_ref).ok()?;
    Some(fit.e_ref * ratio[0].powf(fit.m))
}
