//! Circle group synthesis: theoretical failure circles plus constrained noise.
//!
//! Noise injection keeps one anchor circle at its theoretical qf and moves the
//! others so that a re-fit of the noisy circles still lands near the target
//! `c, fi`. Each attempt draws a random start and minimizes
//! `fi_weight * |fi - fi_t| + c_weight * |c - c_t|` under the ordering and
//! amplitude constraints. Attempts run through [`retry_bounded`], which gives
//! up with a typed error instead of looping.

use rand::prelude::*;
use rand::rngs::StdRng;
use tracing::{debug, info};

use crate::domain::NoiseConfig;
use crate::error::TriaxError;
use crate::fit::mohr::{MohrCoulomb, fit_mohr_coulomb};
use crate::math::{SimplexOptions, nelder_mead};

/// Penalty scale for infeasible points.
const INFEASIBLE: f64 = 1e6;

/// Relative change below which a circle counts as unperturbed.
const UNCHANGED: f64 = 1e-9;

/// Theoretical deviator at failure for `c` (kPa), `fi` (degrees) and `sigma_3`.
pub fn theoretical_qf(c: f64, fi: f64, sigma_3: f64) -> f64 {
    MohrCoulomb { c, fi }.qf(sigma_3)
}

/// Result of one attempt inside [`retry_bounded`].
#[derive(Debug, Clone, PartialEq)]
pub enum Attempt<T> {
    Accepted(T),
    Rejected { objective: f64 },
}

/// Run `attempt` at most `max_attempts` times.
///
/// Hard errors from `attempt` stop the loop immediately; rejections are retried
/// and, once the budget is spent, reported with the best objective seen.
pub fn retry_bounded<T, F>(max_attempts: usize, mut attempt: F) -> Result<T, TriaxError>
where
    F: FnMut(usize) -> Result<Attempt<T>, TriaxError>,
{
    let mut best_objective = f64::INFINITY;
    for i in 1..=max_attempts {
        match attempt(i)? {
            Attempt::Accepted(value) => return Ok(value),
            Attempt::Rejected { objective } => {
                debug!(attempt = i, objective, "noise attempt rejected");
                best_objective = best_objective.min(objective);
            }
        }
    }
    Err(TriaxError::NoiseInjectionExhausted {
        attempts: max_attempts,
        best_objective,
    })
}

/// Injects constrained noise into the qf values of a circle group.
#[derive(Debug, Clone)]
pub struct CircleNoiser {
    config: NoiseConfig,
    rng: StdRng,
}

impl CircleNoiser {
    pub fn new(config: NoiseConfig, seed: u64) -> Self {
        Self {
            config,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn config(&self) -> &NoiseConfig {
        &self.config
    }

    /// qf for each `sigma_3` (same order as given), noised unless the amplitude is 0.
    pub fn synthesize(&mut self, c: f64, fi: f64, sigma_3: &[f64]) -> Result<Vec<f64>, TriaxError> {
        if !(c.is_finite() && c >= 0.0 && (0.0..90.0).contains(&fi)) {
            return Err(TriaxError::invalid_input(format!(
                "target c/fi out of range: c={c}, fi={fi}"
            )));
        }
        let order = sorted_order(sigma_3)?;
        let pressures: Vec<f64> = order.iter().map(|&i| sigma_3[i]).collect();
        let base: Vec<f64> = pressures.iter().map(|&s| theoretical_qf(c, fi, s)).collect();
        if let Some(q) = base.iter().find(|q| !(**q > 0.0)) {
            return Err(TriaxError::InvalidCircleGeometry(format!(
                "theoretical qf={q} is not positive"
            )));
        }

        let n = base.len();
        let noised = if self.config.amplitude == 0.0 || n < 3 {
            debug!(n, "no noise injected");
            base.clone()
        } else {
            self.inject(MohrCoulomb { c, fi }, &pressures, &base)?
        };

        let mut out = vec![0.0; n];
        for (k, &i) in order.iter().enumerate() {
            out[i] = noised[k];
        }
        Ok(out)
    }

    fn inject(&mut self, target: MohrCoulomb, sigma_3: &[f64], base: &[f64]) -> Result<Vec<f64>, TriaxError> {
        let n = base.len();
        let cfg = self.config.clone();
        if !(cfg.amplitude > 0.0 && cfg.amplitude < 1.0) {
            return Err(TriaxError::invalid_input(format!(
                "noise amplitude={} must lie in [0, 1)",
                cfg.amplitude
            )));
        }
        let anchor = cfg.anchor.unwrap_or(n / 2);
        if anchor >= n {
            return Err(TriaxError::invalid_input(format!(
                "anchor circle {anchor} out of range for {n} circles"
            )));
        }
        let free: Vec<usize> = (0..n).filter(|&i| i != anchor).collect();
        let floor = 0.5 * cfg.tolerance;

        let assemble = |x: &[f64]| -> Vec<f64> {
            let mut qf = base.to_vec();
            for (k, &i) in free.iter().enumerate() {
                qf[i] = x[k];
            }
            qf
        };
        let violation = |qf: &[f64]| -> f64 {
            let bounds: f64 = qf
                .iter()
                .zip(base)
                .map(|(q, b)| {
                    let lim = cfg.amplitude * b;
                    (b - lim - q).max(0.0) + (q - b - lim).max(0.0)
                })
                .sum();
            let ordering: f64 = qf
                .windows(2)
                .map(|w| (cfg.min_tau_gap - (w[1] - w[0]) / 2.0).max(0.0))
                .sum();
            bounds + ordering
        };
        let objective = |qf: &[f64]| -> f64 {
            let sigma_1: Vec<f64> = sigma_3.iter().zip(qf).map(|(s, q)| s + q).collect();
            match fit_mohr_coulomb(sigma_3, &sigma_1) {
                Some(mc) => cfg.fi_weight * (mc.fi - target.fi).abs() + cfg.c_weight * (mc.c - target.c).abs(),
                None => INFEASIBLE,
            }
        };

        let rng = &mut self.rng;
        let noised = retry_bounded(cfg.max_attempts, |attempt| {
            let start: Vec<f64> = free
                .iter()
                .map(|&i| base[i] * (1.0 + rng.gen_range(-cfg.amplitude..=cfg.amplitude)))
                .collect();
            if violation(&assemble(&start)) > 0.0 {
                return Ok(Attempt::Rejected {
                    objective: f64::INFINITY,
                });
            }

            let steps: Vec<f64> = free.iter().map(|&i| 0.25 * cfg.amplitude * base[i]).collect();
            let opts = SimplexOptions {
                max_iterations: cfg.max_iterations,
                f_tolerance: 1e-9,
            };
            let min = nelder_mead(
                |x| {
                    let qf = assemble(x);
                    let v = violation(&qf);
                    if v > 0.0 {
                        INFEASIBLE * (1.0 + v)
                    } else {
                        objective(&qf).max(floor)
                    }
                },
                &start,
                &steps,
                opts,
            );

            let qf = assemble(&min.x);
            let value = objective(&qf);
            debug!(attempt, value, iterations = min.iterations, "noise attempt");
            if violation(&qf) > 0.0 || value > cfg.tolerance {
                return Ok(Attempt::Rejected { objective: value });
            }
            check_invariants(&qf, base)?;
            Ok(Attempt::Accepted(qf))
        })?;

        info!(n, anchor, "noise injected into circle group");
        Ok(noised)
    }
}

/// Indices of `sigma_3` in increasing order; duplicates and bad values are rejected.
fn sorted_order(sigma_3: &[f64]) -> Result<Vec<usize>, TriaxError> {
    if sigma_3.is_empty() {
        return Err(TriaxError::InsufficientData("no confining pressures given".into()));
    }
    if let Some(s) = sigma_3.iter().find(|s| !(s.is_finite() && **s >= 0.0)) {
        return Err(TriaxError::InvalidCircleGeometry(format!(
            "invalid confining pressure {s}"
        )));
    }
    let mut order: Vec<usize> = (0..sigma_3.len()).collect();
    order.sort_by(|&a, &b| sigma_3[a].total_cmp(&sigma_3[b]));
    for w in order.windows(2) {
        if sigma_3[w[1]] <= sigma_3[w[0]] {
            return Err(TriaxError::InvalidCircleGeometry(format!(
                "duplicate confining pressure sigma_3={}",
                sigma_3[w[0]]
            )));
        }
    }
    Ok(order)
}

/// Post-hoc checks on a noised qf sequence (sorted by pressure).
pub fn check_invariants(qf: &[f64], base: &[f64]) -> Result<(), TriaxError> {
    if let Some(i) = qf.windows(2).position(|w| w[1] < w[0]) {
        return Err(TriaxError::InvalidCircleGeometry(format!(
            "noised qf decreases between circles {i} and {}",
            i + 1
        )));
    }
    let unchanged = qf
        .iter()
        .zip(base)
        .filter(|(q, b)| (*q - *b).abs() <= UNCHANGED * b.abs().max(1.0))
        .count();
    if unchanged > 1 {
        return Err(TriaxError::InvalidCircleGeometry(format!(
            "{unchanged} circles left unperturbed by noise injection"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_amplitude_returns_theory() {
        let config = NoiseConfig {
            amplitude: 0.0,
            ..NoiseConfig::default()
        };
        let mut noiser = CircleNoiser::new(config, 1);
        let qf = noiser.synthesize(10.0, 25.0, &[400.0, 100.0, 200.0]).unwrap();
        assert_eq!(qf[1], theoretical_qf(10.0, 25.0, 100.0));
        assert_eq!(qf[0], theoretical_qf(10.0, 25.0, 400.0));
    }

    #[test]
    fn noised_group_refits_near_target() {
        let mut noiser = CircleNoiser::new(NoiseConfig::default(), 42);
        let s3 = [100.0, 200.0, 300.0, 400.0];
        let qf = noiser.synthesize(15.0, 30.0, &s3).unwrap();
        assert!(qf.windows(2).all(|w| w[1] >= w[0]));
        let s1: Vec<f64> = s3.iter().zip(&qf).map(|(s, q)| s + q).collect();
        let mc = fit_mohr_coulomb(&s3, &s1).unwrap();
        let cfg = NoiseConfig::default();
        let objective = cfg.fi_weight * (mc.fi - 30.0).abs() + cfg.c_weight * (mc.c - 15.0).abs();
        assert!(objective <= cfg.tolerance, "objective={objective}");
        let base: Vec<f64> = s3.iter().map(|&s| theoretical_qf(15.0, 30.0, s)).collect();
        let changed = qf.iter().zip(&base).filter(|(q, b)| (*q - *b).abs() > 1e-6).count();
        assert_eq!(changed, 3);
    }

    #[test]
    fn retry_gives_up_with_best_objective() {
        let err = retry_bounded::<(), _>(4, |i| Ok(Attempt::Rejected { objective: 10.0 - i as f64 }))
            .unwrap_err();
        match err {
            TriaxError::NoiseInjectionExhausted {
                attempts,
                best_objective,
            } => {
                assert_eq!(attempts, 4);
                assert_eq!(best_objective, 6.0);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn retry_stops_on_hard_error() {
        let mut calls = 0;
        let r = retry_bounded::<(), _>(10, |_| {
            calls += 1;
            Err(TriaxError::InvalidCircleGeometry("broken".into()))
        });
        assert!(r.is_err());
        assert_eq!(calls, 1);
    }

    #[test]
    fn invariants_catch_degenerate_noise() {
        let base = [100.0, 200.0, 300.0];
        assert!(check_invariants(&[101.0, 200.0, 299.0], &base).is_ok());
        assert!(check_invariants(&[100.0, 200.0, 301.0], &base).is_err());
        assert!(check_invariants(&[101.0, 200.0, 150.0], &base).is_err());
    }

    #[test]
    fn duplicate_pressures_are_rejected() {
        let mut noiser = CircleNoiser::new(NoiseConfig::default(), 1);
        assert!(matches!(
            noiser.synthesize(10.0, 25.0, &[100.0, 100.0, 200.0]),
            Err(TriaxError::InvalidCircleGeometry(_))
        ));
    }

    #[test]
    fn weights_are_tunable() {
        // Dropping the cohesion weight leaves cohesion free; fi must still match.
        let s3 = [100.0, 200.0, 400.0];
        for (fi_weight, c_weight) in [(100.0, 1.0), (100.0, 0.0), (10.0, 1.0)] {
            let config = NoiseConfig {
                fi_weight,
                c_weight,
                ..NoiseConfig::default()
            };
            let mut noiser = CircleNoiser::new(config.clone(), 9);
            let qf = noiser.synthesize(10.0, 28.0, &s3).unwrap();
            let s1: Vec<f64> = s3.iter().zip(&qf).map(|(s, q)| s + q).collect();
            let mc = fit_mohr_coulomb(&s3, &s1).unwrap();
            assert!(fi_weight * (mc.fi - 28.0).abs() <= config.tolerance + 1e-9);
        }
    }
}
