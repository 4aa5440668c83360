//! Strength and stiffness values of one cut curve: qf, E50, secant E and Eur.

use crate::domain::{Point, ReloadLoop, SecantModulus, UndefinedReason};
use crate::math::{first_at_or_above, polyline_intersections, x_at_level};

/// Region (fraction of qf) searched for the half-strength crossing.
const E50_SEARCH_FRACTION: f64 = 0.7;

/// Band (fraction of qf) used to re-pick the E end point.
const E_RETRY_BAND: (f64, f64) = (0.25, 0.35);

/// Peak deviator and its index. `qf` is exactly the maximum sample.
pub fn peak(deviator: &[f64]) -> (f64, usize) {
    deviator
        .iter()
        .copied()
        .enumerate()
        .fold((f64::NEG_INFINITY, 0), |(best, bi), (i, v)| {
            if v > best { (v, i) } else { (best, bi) }
        })
}

/// E50 and the strain at `qf / 2`.
///
/// The crossing is searched below `0.7 * qf` on the pre-peak branch and the
/// strain is interpolated linearly between the bracketing samples, so
/// `e50 * strain50 == qf / 2`. Degenerate curves give `(0, 0)`.
pub fn e50(strain: &[f64], deviator: &[f64], qf: f64, peak_index: usize) -> (f64, f64) {
    let pre_peak = peak_index + 1;
    let limit = first_at_or_above(deviator, E50_SEARCH_FRACTION * qf, pre_peak)
        .map(|i| i + 1)
        .unwrap_or(pre_peak);
    let half = qf / 2.0;
    match x_at_level(strain, deviator, half, limit) {
        Some(strain50) if strain50 > 0.0 && half > 0.0 => (half / strain50, strain50),
        _ => (0.0, 0.0),
    }
}

/// Secant modulus between samples `i` and `j`.
pub fn secant(strain: &[f64], deviator: &[f64], i: usize, j: usize) -> SecantModulus {
    let a = (strain[i], deviator[i]);
    let b = (strain[j], deviator[j]);
    let d_strain = b.0 - a.0;
    let value = if d_strain.abs() > 0.0 {
        (b.1 - a.1) / d_strain
    } else {
        0.0
    };
    SecantModulus {
        value: if value.is_finite() { value } else { 0.0 },
        indices: (i, j),
        points: [a, b],
    }
}

/// Default secant points from the K0 stress state.
///
/// Start at the deviator `sigma_3 * (1/K0 - 1)` reached during K0
/// consolidation, end at `end_factor` times that level.
pub fn default_e_indices(
    deviator: &[f64],
    qf: f64,
    peak_index: usize,
    sigma_3: f64,
    k0: f64,
    end_factor: f64,
) -> (usize, usize) {
    let pre_peak = peak_index + 1;
    let start_level = (sigma_3 * (1.0 / k0 - 1.0)).clamp(0.0, 0.5 * qf);
    let end_level = (end_factor * start_level).clamp(0.0, 0.9 * qf);

    let start = if start_level > 0.0 {
        first_at_or_above(deviator, start_level, pre_peak).unwrap_or(0)
    } else {
        0
    };
    let end = first_at_or_above(deviator, end_level, pre_peak)
        .filter(|&j| j > start)
        .unwrap_or_else(|| (start + 1).min(deviator.len().saturating_sub(1)));
    (start, end)
}

/// Secant E with one automatic retry.
///
/// When the secant is not stiffer than E50 the end point is re-picked inside
/// the 25–35 % qf band (stiffest secant from the start point).
pub fn e_modulus(
    strain: &[f64],
    deviator: &[f64],
    qf: f64,
    peak_index: usize,
    e50: f64,
    (start, end): (usize, usize),
) -> SecantModulus {
    let first = secant(strain, deviator, start, end);
    if first.value > e50 {
        return first;
    }

    let (lo, hi) = (E_RETRY_BAND.0 * qf, E_RETRY_BAND.1 * qf);
    let retry = (0..=peak_index.min(deviator.len() - 1))
        .filter(|&j| j != start && deviator[j] >= lo && deviator[j] <= hi)
        .map(|j| secant(strain, deviator, start.min(j), start.max(j)))
        .max_by(|a, b| a.value.total_cmp(&b.value));

    match retry {
        Some(m) if m.value > first.value => m,
        _ => first,
    }
}

/// Support points of the unload/reload modulus: the loop's minimum-stress
/// point and the highest crossing of the unloading and reloading branches.
pub fn eur_support(
    strain: &[f64],
    deviator: &[f64],
    reload: Option<ReloadLoop>,
) -> Result<[Point; 2], UndefinedReason> {
    let lp = reload.ok_or(UndefinedReason::NoReloadLoop)?;
    if lp.end >= strain.len() || lp.end >= deviator.len() {
        return Err(UndefinedReason::NoReloadLoop);
    }

    let unload: Vec<Point> = (lp.start..=lp.turn).map(|i| (strain[i], deviator[i])).collect();
    let reload: Vec<Point> = (lp.turn..=lp.end).map(|i| (strain[i], deviator[i])).collect();
    let turn = (strain[lp.turn], deviator[lp.turn]);

    let min_index = (lp.start..=lp.end)
        .min_by(|&a, &b| deviator[a].total_cmp(&deviator[b]))
        .ok_or(UndefinedReason::EmptyWindow)?;
    let min_point = (strain[min_index], deviator[min_index]);

    let stress_scale = deviator[lp.start].abs().max(1.0);
    let crossing = polyline_intersections(&unload, &reload)
        .into_iter()
        .filter(|p| (p.0 - turn.0).abs() > 1e-12 || (p.1 - turn.1).abs() > 1e-9 * stress_scale)
        .max_by(|a, b| a.1.total_cmp(&b.1))
        .ok_or(UndefinedReason::NoIntersection)?;

    let d_strain = crossing.0 - min_point.0;
    if !(d_strain > 0.0) || crossing.1 <= min_point.1 {
        return Err(UndefinedReason::DegenerateRegression);
    }
    Ok([min_point, crossing])
}

/// Unload/reload modulus from [`eur_support`].
pub fn eur(strain: &[f64], deviator: &[f64], reload: Option<ReloadLoop>) -> Result<f64, UndefinedReason> {
    let [a, b] = eur_support(strain, deviator, reload)?;
    Ok((b.1 - a.1) / (b.0 - a.0))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hardening(n: usize) -> (Vec<f64>, Vec<f64>) {
        let strain: Vec<f64> = (0..n).map(|i| i as f64 * 1e-4).collect();
        let deviator = strain
            .iter()
            .map(|e| 200.0 * (1.0 - (1.0 - (e / 0.04).min(1.0)).powi(3)))
            .collect();
        (strain, deviator)
    }

    #[test]
    fn peak_is_exact_maximum() {
        let (qf, i) = peak(&[1.0, 5.0, 3.0, 5.0]);
        assert_eq!(qf, 5.0);
        assert_eq!(i, 1);
    }

    #[test]
    fn e50_times_strain50_is_half_qf() {
        let (strain, deviator) = hardening(500);
        let (qf, pi) = peak(&deviator);
        let (e50, s50) = e50(&strain, &deviator, qf, pi);
        assert!(e50 > 0.0);
        assert!((e50 * s50 - qf / 2.0).abs() < 1e-9);
        // 1 - (1 - x)^3 = 0.5  =>  x = 1 - 0.5^(1/3)
        let exact = 0.04 * (1.0 - 0.5_f64.powf(1.0 / 3.0));
        assert!((s50 - exact).abs() < 2e-5, "s50={s50}, exact={exact}");
    }

    #[test]
    fn e50_degenerates_to_zero() {
        let (e, s) = e50(&[0.0, 0.1], &[0.0, 0.0], 0.0, 0);
        assert_eq!((e, s), (0.0, 0.0));
    }

    #[test]
    fn default_e_points_follow_k0_levels() {
        let (_, deviator) = hardening(500);
        let (qf, pi) = peak(&deviator);
        let (i, j) = default_e_indices(&deviator, qf, pi, 100.0, 0.6, 1.6);
        let start_level = 100.0 * (1.0 / 0.6 - 1.0);
        assert!(deviator[i] >= start_level && deviator[i - 1] < start_level);
        assert!(deviator[j] >= 1.6 * start_level && deviator[j - 1] < 1.6 * start_level);
    }

    #[test]
    fn e_retry_uses_band_when_secant_too_soft() {
        let (strain, deviator) = hardening(500);
        let (qf, pi) = peak(&deviator);
        let forced = e_modulus(&strain, &deviator, qf, pi, 1e12, (0, 300));
        let j = forced.indices.1;
        assert!(deviator[j] >= 0.25 * qf && deviator[j] <= 0.35 * qf);
    }

    #[test]
    fn eur_from_crossing_branches() {
        // Unload along a parabola, reload on a straight line that crosses it.
        let strain = vec![0.010, 0.009, 0.008, 0.007, 0.006, 0.007, 0.008, 0.009, 0.010, 0.011];
        let deviator = vec![100.0, 64.0, 36.0, 16.0, 4.0, 24.0, 44.0, 64.0, 84.0, 104.0];
        let lp = ReloadLoop {
            start: 0,
            turn: 4,
            end: 9,
        };
        let [min, cross] = eur_support(&strain, &deviator, Some(lp)).unwrap();
        assert_eq!(min, (0.006, 4.0));
        assert!(cross.1 > 4.0 && cross.1 < 100.0);
        let value = eur(&strain, &deviator, Some(lp)).unwrap();
        assert!((value - 20_000.0).abs() < 1e-3, "eur={value}");
    }

    #[test]
    fn eur_without_loop_is_undefined() {
        assert_eq!(eur(&[0.0], &[0.0], None), Err(UndefinedReason::NoReloadLoop));
    }
}
