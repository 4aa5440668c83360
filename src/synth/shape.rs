//! Noise-free shape functions of a synthetic test.
//!
//! Deviator, normalized by qf, as a function of `x = strain / xc`:
//!
//! - pre-peak: `1 - (1 - x)^a`, with `a` chosen so the curve passes through
//!   `(strain50, qf / 2)` exactly
//! - post-peak: `r + (1 - r) * exp(-((x - 1) / b)^2)`, decaying to the
//!   residual fraction `r`
//! - soils without a peak: a hyperbola blended with a straight line, still
//!   rising at `x = 1` so the maximum stays at the end of the test
//!
//! Volumetric strain (positive for dilation) contracts linearly at first and
//! turns toward the dilation rate `K` through a softplus transition:
//! `eps_v = -c0 * e + (K + c0) * w * (sp((e - e_t) / w) - sp(-e_t / w))`.
//! `c0` and `K` are solved together so that
//! `eps_v(strain50) = -(1 - 2 nu) * strain50` and the slope at the peak
//! equals `2 sin(psi) / (1 - sin(psi))`.

use serde::{Deserialize, Serialize};

use crate::domain::{MAX_FAILURE_STRAIN, MechanicalTarget, ReloadLoop};
use crate::synth::soil;

/// Share of linear hardening in the no-peak branch.
const LINEAR_HARDENING: f64 = 0.15;

/// Transition progress below which the peak slope is not solved for.
const MIN_PEAK_PROGRESS: f64 = 0.05;

/// Parameter of the reload line crossing the unloading parabola.
const CROSSING: f64 = 0.85;

/// Reload overshoot past the crossing, as a fraction of the remaining span.
const OVERSHOOT: f64 = 0.3;

/// Deviator at the loop bottom, as a fraction of the unload start.
const LOOP_BOTTOM: f64 = 0.1;

/// Minimum samples on each branch of the loop.
const MIN_LOOP_SAMPLES: usize = 10;

/// Randomized shape parameters of one synthetic draw.
///
/// Strains are absolute axial strains; fractions are relative to qf.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DrawParams {
    /// Axial strain at qf.
    pub xc: f64,
    pub residual_fraction: f64,
    /// Post-peak decay width as a multiple of `xc`.
    pub decay_width: f64,
    pub unload_fraction: f64,
    /// Post-peak drop (fraction of qf) at which loading stops.
    pub stop_drop: f64,
    /// Axial strain at the contraction/dilation transition.
    pub dilation_onset: f64,
    /// Sharpness of the transition (axial strain).
    pub dilation_width: f64,
}

/// Noise-free sampled test before seating and noise are applied.
#[derive(Debug, Clone, PartialEq)]
pub struct Curve {
    pub strain: Vec<f64>,
    pub deviator: Vec<f64>,
    pub volume: Vec<f64>,
    pub reload: Option<ReloadLoop>,
}

/// Exponent `a` that puts `qf / 2` at `strain50`.
pub fn hardening_exponent(strain50: f64, xc: f64) -> f64 {
    let x50 = (strain50 / xc).clamp(1e-9, 0.5);
    0.5_f64.ln() / (1.0 - x50).ln()
}

/// Normalized deviator at `x = strain / xc`.
pub fn normalized_deviator(x: f64, a: f64, residual_fraction: f64, decay_width: f64) -> f64 {
    if x <= 1.0 {
        1.0 - (1.0 - x.max(0.0)).powf(a)
    } else {
        let z = (x - 1.0) / decay_width.max(1e-9);
        residual_fraction + (1.0 - residual_fraction) * (-z * z).exp()
    }
}

/// Normalized deviator of a curve without a peak, for `x = strain / xc`.
///
/// Passes through `(x50, 0.5)` and `(1, 1)`; the slope at `x = 1` is at
/// least `LINEAR_HARDENING`.
pub fn hardening_deviator(x: f64, x50: f64) -> f64 {
    let b = LINEAR_HARDENING;
    let x50 = x50.clamp(1e-9, 0.45);
    let y50 = (0.5 - b * x50) / (1.0 - b);
    let h = x50 * (1.0 - y50) / (y50 - x50);
    let x = x.max(0.0);
    (1.0 - b) * x * (1.0 + h) / (x + h) + b * x
}

fn softplus(x: f64) -> f64 {
    x.max(0.0) + (-x.abs()).exp().ln_1p()
}

fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

/// Volumetric strain curve with a prescribed value at `strain50`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VolumeCurve {
    /// Initial contraction rate.
    pub contraction: f64,
    /// Dilation rate `d(eps_v)/d(eps_1)` after the transition.
    pub dilation_rate: f64,
    pub onset: f64,
    pub width: f64,
}

impl VolumeCurve {
    /// Volume curve through the Poisson condition at `strain50` whose slope at
    /// `peak_strain` is the dilation rate of `dilatancy_angle`.
    pub fn new(
        strain50: f64,
        poissons_ratio: f64,
        dilatancy_angle: f64,
        onset: f64,
        width: f64,
        peak_strain: f64,
    ) -> Self {
        let s = dilatancy_angle.to_radians().sin();
        let target_rate = 2.0 * s / (1.0 - s);
        let mut curve = Self {
            contraction: 0.0,
            dilation_rate: target_rate,
            onset,
            width,
        };
        let w50 = curve.transition(strain50);
        let denom = strain50 - w50;
        if !(denom > 0.0) {
            curve.contraction = 1.0 - 2.0 * poissons_ratio;
            return curve;
        }
        // c0 = (A + K w50) / D and -c0 + (K + c0) p = k, linear in K.
        let elastic = (1.0 - 2.0 * poissons_ratio) * strain50;
        let p = curve.progress(peak_strain);
        let gain = p + (p - 1.0) * w50 / denom;
        if p >= MIN_PEAK_PROGRESS && gain >= MIN_PEAK_PROGRESS {
            curve.dilation_rate = (target_rate - (p - 1.0) * elastic / denom) / gain;
        }
        curve.contraction = (elastic + curve.dilation_rate * w50) / denom;
        curve
    }

    /// Transition progress `d(transition)/d(strain)` in `[0, 1]`.
    fn progress(&self, strain: f64) -> f64 {
        sigmoid((strain - self.onset) / self.width.max(1e-12))
    }

    /// `d(eps_v)/d(eps_1)` at `strain`.
    pub fn slope(&self, strain: f64) -> f64 {
        -self.contraction + (self.dilation_rate + self.contraction) * self.progress(strain)
    }

    fn transition(&self, strain: f64) -> f64 {
        let w = self.width.max(1e-12);
        w * (softplus((strain - self.onset) / w) - softplus(-self.onset / w))
    }

    pub fn at(&self, strain: f64) -> f64 {
        -self.contraction * strain + (self.dilation_rate + self.contraction) * self.transition(strain)
    }
}

/// Sample the full noise-free curve on a uniform strain grid.
pub fn build_curve(target: &MechanicalTarget, params: &DrawParams, strain_step: f64) -> Curve {
    let xc = params.xc;
    let a = hardening_exponent(target.strain50(), xc);
    let x50 = target.strain50() / xc;
    let hardens = !soil::has_peak(&target.soil);
    let q_at = |e: f64| {
        let x = e / xc;
        let q = if hardens && x <= 1.0 {
            hardening_deviator(x, x50)
        } else {
            normalized_deviator(x, a, params.residual_fraction, params.decay_width)
        };
        target.qf * q
    };
    let volume = VolumeCurve::new(
        target.strain50(),
        target.poissons_ratio,
        target.dilatancy_angle,
        params.dilation_onset,
        params.dilation_width,
        xc,
    );

    let end = if target.residual {
        MAX_FAILURE_STRAIN.max(2.0 * xc)
    } else {
        MAX_FAILURE_STRAIN
    };
    let mut n = (end / strain_step).round() as usize + 1;
    let strain: Vec<f64> = (0..n).map(|i| i as f64 * strain_step).collect();
    let deviator: Vec<f64> = strain.iter().map(|&e| q_at(e)).collect();

    let peak = strain.iter().position(|&e| e >= xc).unwrap_or(n - 1);
    if !target.residual {
        let stop = (1.0 - params.stop_drop) * target.qf;
        if let Some(j) = (peak + 1..n).find(|&j| deviator[j] <= stop) {
            n = j + 1;
        }
    }

    let mut curve = Curve {
        volume: strain[..n].iter().map(|&e| volume.at(e)).collect(),
        strain: strain[..n].to_vec(),
        deviator: deviator[..n].to_vec(),
        reload: None,
    };
    if let Some(eur) = target.eur {
        insert_loop(&mut curve, target, params, eur, peak.min(n - 1), strain_step);
    }
    curve
}

/// Splice an unload/reload loop into the pre-peak branch.
///
/// Unloading follows `q = q_b + (q_a - q_b) u^2` with
/// `u = (e - e_b) / (e_a - e_b)`; reloading is the straight line of slope
/// `eur` from the loop bottom. The two cross at `u = CROSSING`, so the chord
/// from the bottom to the crossing has slope `eur`.
fn insert_loop(
    curve: &mut Curve,
    target: &MechanicalTarget,
    params: &DrawParams,
    eur: f64,
    peak: usize,
    step: f64,
) {
    let level = params.unload_fraction * target.qf;
    let Some(ia) = curve.deviator[..=peak].iter().position(|&q| q >= level) else {
        return;
    };
    let (e_a, q_a) = (curve.strain[ia], curve.deviator[ia]);
    let v_a = curve.volume[ia];
    let q_b = LOOP_BOTTOM * q_a;
    let span = CROSSING * (q_a - q_b) / eur;
    let e_b = e_a - span;
    if e_b <= 0.0 {
        return;
    }

    let u_over = CROSSING + OVERSHOOT * (1.0 - CROSSING);
    let e_over = e_b + u_over * span;
    let q_over = q_b + eur * (e_over - e_b);
    let e_c_target = (e_a + step).max(e_over + (target.qf - q_over) / (1.5 * eur));
    let Some(ic) = curve.strain.iter().position(|&e| e >= e_c_target) else {
        return;
    };
    if ic + 1 >= curve.strain.len() {
        return;
    }
    let (e_c, q_c, v_c) = (curve.strain[ic], curve.deviator[ic], curve.volume[ic]);

    let elastic = 1.0 - 2.0 * target.poissons_ratio;
    let mut strain = curve.strain[..=ia].to_vec();
    let mut deviator = curve.deviator[..=ia].to_vec();
    let mut volume = curve.volume[..=ia].to_vec();
    let mut push = |e: f64, q: f64, v: f64| {
        strain.push(e);
        deviator.push(q);
        volume.push(v);
    };

    let m_unload = ((span / step).ceil() as usize).max(MIN_LOOP_SAMPLES);
    for k in 1..=m_unload {
        let u = 1.0 - k as f64 / m_unload as f64;
        let e = e_b + u * span;
        push(e, q_b + (q_a - q_b) * u * u, v_a + elastic * (e_a - e));
    }
    let turn = ia + m_unload;

    let m_reload = (((e_over - e_b) / step).ceil() as usize).max(MIN_LOOP_SAMPLES);
    for k in 1..=m_reload {
        let e = e_b + (e_over - e_b) * k as f64 / m_reload as f64;
        push(e, q_b + eur * (e - e_b), v_a + elastic * (e_a - e));
    }
    let v_over = v_a + elastic * (e_a - e_over);

    let m_join = (((e_c - e_over) / step).ceil() as usize).max(1);
    for k in 1..m_join {
        let t = k as f64 / m_join as f64;
        push(
            e_over + t * (e_c - e_over),
            q_over + t * (q_c - q_over),
            v_over + t * (v_c - v_over),
        );
    }
    let end = turn + m_reload + m_join;

    strain.extend_from_slice(&curve.strain[ic..]);
    deviator.extend_from_slice(&curve.deviator[ic..]);
    volume.extend_from_slice(&curve.volume[ic..]);

    curve.strain = strain;
    curve.deviator = deviator;
    curve.volume = volume;
    curve.reload = Some(ReloadLoop {
        start: ia,
        turn,
        end,
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{DensityState, SoilDescriptor};
    use crate::process::moduli;

    fn target(eur: Option<f64>) -> MechanicalTarget {
        MechanicalTarget {
            qf: 300.0,
            e50: 25_000.0,
            sigma_3: 100.0,
            k0: 0.5,
            c: 5.0,
            fi: 33.0,
            poissons_ratio: 0.3,
            dilatancy_angle: 6.0,
            eur,
            m: None,
            soil: SoilDescriptor::default(),
            residual: false,
        }
    }

    fn params() -> DrawParams {
        DrawParams {
            xc: 0.04,
            residual_fraction: 0.7,
            decay_width: 0.6,
            unload_fraction: 0.8,
            stop_drop: 0.1,
            dilation_onset: 0.028,
            dilation_width: 0.006,
        }
    }

    #[test]
    fn pre_peak_passes_through_half_strength() {
        let a = hardening_exponent(0.006, 0.04);
        let q = normalized_deviator(0.006 / 0.04, a, 0.7, 0.6);
        assert!((q - 0.5).abs() < 1e-12);
        assert!((normalized_deviator(1.0, a, 0.7, 0.6) - 1.0).abs() < 1e-12);
        assert!(normalized_deviator(10.0, a, 0.7, 0.6) < 0.71);
    }

    #[test]
    fn volume_curve_hits_poisson_condition() {
        let v = VolumeCurve::new(0.006, 0.3, 6.0, 0.028, 0.006, 0.04);
        assert!((v.at(0.006) + 0.4 * 0.006).abs() < 1e-12);
        let slope = (v.at(0.2) - v.at(0.199)) / 0.001;
        assert!((slope - v.dilation_rate).abs() < 1e-3);
    }

    #[test]
    fn volume_slope_at_peak_carries_dilatancy() {
        // Transition still under way at the peak: the asymptote overshoots.
        let s = 8.0_f64.to_radians().sin();
        let k = 2.0 * s / (1.0 - s);
        let v = VolumeCurve::new(0.006, 0.3, 8.0, 0.03, 0.008, 0.04);
        assert!((v.slope(0.04) - k).abs() < 1e-9, "slope={}", v.slope(0.04));
        assert!(v.dilation_rate > k);
        assert!((v.at(0.006) + 0.4 * 0.006).abs() < 1e-12);

        let h = 1e-6;
        let numeric = (v.at(0.04 + h) - v.at(0.04 - h)) / (2.0 * h);
        assert!((numeric - k).abs() < 1e-6);
    }

    #[test]
    fn hardening_branch_keeps_rising() {
        let x50 = 0.04;
        assert!((hardening_deviator(x50, x50) - 0.5).abs() < 1e-12);
        assert!((hardening_deviator(1.0, x50) - 1.0).abs() < 1e-12);
        let slope = (hardening_deviator(1.0, x50) - hardening_deviator(0.99, x50)) / 0.01;
        assert!(slope >= LINEAR_HARDENING);
        assert!(hardening_deviator(0.9, x50) < 0.99);
    }

    #[test]
    fn no_peak_curve_ends_at_its_maximum() {
        let mut t = target(None);
        t.soil = SoilDescriptor {
            density: DensityState::Loose,
            ..SoilDescriptor::default()
        };
        let p = DrawParams {
            xc: MAX_FAILURE_STRAIN,
            ..params()
        };
        let curve = build_curve(&t, &p, 1e-4);
        let n = curve.deviator.len();
        assert!((curve.strain[n - 1] - MAX_FAILURE_STRAIN).abs() < 1e-9);
        assert!((curve.deviator[n - 1] - 300.0).abs() < 1e-6);
        assert!(curve.deviator.windows(2).all(|w| w[1] > w[0]));
        // 5 % strain before the end the deviator is clearly below qf.
        let j = curve.strain.iter().position(|&e| e >= 0.1).unwrap();
        assert!(curve.deviator[j] < 0.97 * 300.0);
    }

    #[test]
    fn curve_stops_after_post_peak_drop() {
        let curve = build_curve(&target(None), &params(), 1e-4);
        let last = *curve.deviator.last().unwrap();
        assert!(last <= 0.9 * 300.0 + 1e-9);
        assert!(*curve.strain.last().unwrap() < MAX_FAILURE_STRAIN);
        let max = curve.deviator.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        assert!((max - 300.0).abs() < 1e-6);
    }

    #[test]
    fn residual_curve_is_kept_whole() {
        let mut t = target(None);
        t.residual = true;
        let curve = build_curve(&t, &params(), 1e-4);
        assert!((curve.strain.last().unwrap() - MAX_FAILURE_STRAIN).abs() < 1e-9);
    }

    #[test]
    fn loop_chord_has_target_slope() {
        let curve = build_curve(&target(Some(80_000.0)), &params(), 1e-4);
        let lp = curve.reload.unwrap();
        assert!(lp.start < lp.turn && lp.turn < lp.end);
        assert!((curve.deviator[lp.start] - 0.8 * 300.0).abs() < 2.0);
        let eur = moduli::eur(&curve.strain, &curve.deviator, curve.reload).unwrap();
        assert!((eur - 80_000.0).abs() / 80_000.0 < 0.02, "eur={eur}");
    }
}
