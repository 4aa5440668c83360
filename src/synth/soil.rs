//! Classification rules that shape a synthetic curve.
//!
//! These are small decision tables keyed by grain class and density or
//! consistency state, not closed-form laws.

use crate::domain::{DensityState, GrainClass, MAX_FAILURE_STRAIN, MechanicalTarget, SoilDescriptor};

/// Liquidity index at or below which a cohesive soil shows a distinct peak.
const STIFF_LIQUIDITY: f64 = 0.25;

/// Liquidity index above which a cohesive soil never shows a peak.
const SOFT_LIQUIDITY: f64 = 0.5;

/// Whether the stress-strain curve has a distinct peak before `MAX_FAILURE_STRAIN`.
pub fn has_peak(soil: &SoilDescriptor) -> bool {
    if soil.grain.is_sand() {
        return match soil.density {
            DensityState::Dense => true,
            DensityState::Medium => matches!(
                soil.grain,
                GrainClass::GravellySand | GrainClass::CoarseSand | GrainClass::MediumSand
            ),
            DensityState::Loose => false,
        };
    }
    match soil.liquidity_index {
        Some(il) if il <= STIFF_LIQUIDITY => true,
        Some(il) if il > SOFT_LIQUIDITY => false,
        _ => soil.density == DensityState::Dense,
    }
}

/// Axial strain at which the deviator reaches qf.
///
/// Without a peak the curve keeps hardening to `MAX_FAILURE_STRAIN`.
pub fn failure_strain(target: &MechanicalTarget) -> f64 {
    if !has_peak(&target.soil) {
        return MAX_FAILURE_STRAIN;
    }
    let ratio = target.e50 / target.qf;
    let lower = (target.qf / target.e50).min(MAX_FAILURE_STRAIN);
    (1.37 / ratio.powf(0.8)).clamp(lower, MAX_FAILURE_STRAIN)
}

/// Residual strength (fraction of qf) and post-peak decay width (multiple of `xc`).
pub fn softening(soil: &SoilDescriptor) -> (f64, f64) {
    if soil.grain.is_sand() {
        let coarse = matches!(soil.grain, GrainClass::GravellySand | GrainClass::CoarseSand);
        return match (soil.density, coarse) {
            (DensityState::Dense, true) => (0.65, 0.5),
            (DensityState::Dense, false) => (0.72, 0.6),
            (DensityState::Medium, true) => (0.8, 0.8),
            (DensityState::Medium, false) => (0.85, 0.9),
            (DensityState::Loose, _) => (0.95, 1.5),
        };
    }
    let plastic = soil.plasticity_index.is_some_and(|ip| ip > 17.0);
    match (soil.liquidity_index, plastic) {
        (Some(il), true) if il <= STIFF_LIQUIDITY => (0.6, 0.7),
        (Some(il), false) if il <= STIFF_LIQUIDITY => (0.7, 0.7),
        (Some(il), _) if il > SOFT_LIQUIDITY => (0.95, 1.5),
        (_, true) => (0.75, 1.0),
        (_, false) => (0.82, 1.0),
    }
}

/// Deviator (fraction of qf) at which the unload/reload loop starts.
pub fn unload_fraction(soil: &SoilDescriptor) -> f64 {
    match soil.grain {
        g if g.is_sand() => 0.8,
        GrainClass::SandyLoam | GrainClass::Loam => 0.7,
        _ => 0.6,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn soil(grain: GrainClass, density: DensityState, il: Option<f64>) -> SoilDescriptor {
        SoilDescriptor {
            grain,
            density,
            plasticity_index: None,
            liquidity_index: il,
        }
    }

    fn target(soil: SoilDescriptor) -> MechanicalTarget {
        MechanicalTarget {
            qf: 300.0,
            e50: 30_000.0,
            sigma_3: 100.0,
            k0: 0.5,
            c: 1.0,
            fi: 32.0,
            poissons_ratio: 0.3,
            dilatancy_angle: 4.0,
            eur: None,
            m: None,
            soil,
            residual: false,
        }
    }

    #[test]
    fn peak_rules_by_density_and_consistency() {
        assert!(has_peak(&soil(GrainClass::FineSand, DensityState::Dense, None)));
        assert!(!has_peak(&soil(GrainClass::FineSand, DensityState::Medium, None)));
        assert!(!has_peak(&soil(GrainClass::CoarseSand, DensityState::Loose, None)));
        assert!(has_peak(&soil(GrainClass::Clay, DensityState::Medium, Some(0.1))));
        assert!(!has_peak(&soil(GrainClass::Clay, DensityState::Dense, Some(0.7))));
    }

    #[test]
    fn failure_strain_is_clamped() {
        let dense = target(soil(GrainClass::MediumSand, DensityState::Dense, None));
        let xc = failure_strain(&dense);
        assert!(xc >= dense.qf / dense.e50 && xc <= MAX_FAILURE_STRAIN);
        assert!((xc - 1.37 / 100.0_f64.powf(0.8)).abs() < 1e-12);

        let loose = target(soil(GrainClass::MediumSand, DensityState::Loose, None));
        assert_eq!(failure_strain(&loose), MAX_FAILURE_STRAIN);
    }

    #[test]
    fn denser_soils_soften_more() {
        let dense = softening(&soil(GrainClass::MediumSand, DensityState::Dense, None));
        let loose = softening(&soil(GrainClass::MediumSand, DensityState::Loose, None));
        assert!(dense.0 < loose.0);
        assert!(unload_fraction(&soil(GrainClass::Clay, DensityState::Medium, None)) < 0.8);
    }
}
