//! Piston dead-travel (seating step) detection.
//!
//! Before the piston meets the specimen the strain grows with almost no
//! deviator. On a uniform stress grid that shows up as one huge strain
//! increment followed by ordinary ones; the largest drop between successive
//! increments marks where true loading begins.

use crate::domain::{ProcessorConfig, SeatingStep, UndefinedReason};
use crate::math::{first_at_or_above, monotonize, x_at_level};

/// Stress levels in the search grid.
const GRID_STEPS: usize = 20;

/// Locate the index where loading begins.
pub fn detect_seating(strain: &[f64], deviator: &[f64], config: &ProcessorConfig) -> SeatingStep {
    let n = strain.len().min(deviator.len());
    if n < 3 {
        return SeatingStep::Failed {
            reason: UndefinedReason::EmptyWindow,
        };
    }

    let s = monotonize(&strain[..n]);
    let q = monotonize(&deviator[..n]);
    let peak = q[n - 1];

    let limit = config.seating_rule.limit(peak);
    let end = q.iter().position(|&v| v >= limit).unwrap_or(n);
    if end < 3 {
        return SeatingStep::Failed {
            reason: UndefinedReason::EmptyWindow,
        };
    }

    let q_lo = q[0];
    let q_hi = q[end - 1];
    if q_hi <= q_lo {
        return SeatingStep::Failed {
            reason: UndefinedReason::EmptyWindow,
        };
    }

    let levels: Vec<f64> = (0..=GRID_STEPS)
        .map(|k| q_lo + (q_hi - q_lo) * k as f64 / GRID_STEPS as f64)
        .collect();
    let Some(strains) = levels
        .iter()
        .map(|&lvl| x_at_level(&s, &q, lvl, end))
        .collect::<Option<Vec<f64>>>()
    else {
        return SeatingStep::Failed {
            reason: UndefinedReason::EmptyWindow,
        };
    };

    let increments: Vec<f64> = strains.windows(2).map(|w| w[1] - w[0]).collect();
    let mean = (strains[GRID_STEPS] - strains[0]) / GRID_STEPS as f64;

    let Some((k, jump)) = increments
        .windows(2)
        .map(|w| w[0] - w[1])
        .enumerate()
        .max_by(|a, b| a.1.total_cmp(&b.1))
    else {
        return SeatingStep::Failed {
            reason: UndefinedReason::EmptyWindow,
        };
    };

    if !(mean > 0.0) || jump <= config.seating_min_jump * mean {
        return SeatingStep::NotNeeded;
    }

    let boundary = first_at_or_above(&q, levels[k + 1], end).unwrap_or(0);
    let index = (boundary + config.seating_margin).min(n - 1);
    if strain[index] - strain[0] > config.unrealistic_seating_strain {
        return SeatingStep::Failed {
            reason: UndefinedReason::UnrealisticStrain,
        };
    }

    SeatingStep::Detected { index }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn curve_with_seating(seating_samples: usize) -> (Vec<f64>, Vec<f64>) {
        let mut strain = Vec::new();
        let mut deviator = Vec::new();
        for i in 0..seating_samples {
            strain.push(i as f64 * 1e-4);
            deviator.push(if i % 2 == 0 { 0.0 } else { 0.4 });
        }
        let base = seating_samples as f64 * 1e-4;
        for i in 0..300 {
            let e = i as f64 * 1e-4;
            strain.push(base + e);
            deviator.push(300.0 * (1.0 - (1.0 - (e / 0.03).min(1.0)).powf(4.0)));
        }
        (strain, deviator)
    }

    #[test]
    fn detects_dead_travel() {
        let (strain, deviator) = curve_with_seating(30);
        let step = detect_seating(&strain, &deviator, &ProcessorConfig::default());
        let SeatingStep::Detected { index } = step else {
            panic!("expected detection, got {step:?}");
        };
        assert!((28..=36).contains(&index), "index={index}");
    }

    #[test]
    fn clean_curve_needs_no_correction() {
        let (strain, deviator) = curve_with_seating(0);
        let step = detect_seating(&strain, &deviator, &ProcessorConfig::default());
        assert_eq!(step, SeatingStep::NotNeeded);
        assert_eq!(step.cut_index(), 0);
    }

    #[test]
    fn unrealistic_boundary_falls_back_to_start() {
        let (strain, deviator) = curve_with_seating(30);
        let config = ProcessorConfig {
            unrealistic_seating_strain: 1e-3,
            ..ProcessorConfig::default()
        };
        let step = detect_seating(&strain, &deviator, &config);
        assert_eq!(
            step,
            SeatingStep::Failed {
                reason: UndefinedReason::UnrealisticStrain
            }
        );
        assert_eq!(step.cut_index(), 0);
    }

    #[test]
    fn flat_curve_fails_detection() {
        let strain: Vec<f64> = (0..60).map(|i| i as f64 * 1e-4).collect();
        let deviator = vec![5.0; 60];
        let step = detect_seating(&strain, &deviator, &ProcessorConfig::default());
        assert!(matches!(step, SeatingStep::Failed { .. }));
    }
}
