//! Shared processing pipeline used by the CLI commands and integration tests.
//!
//! Keeping this in one place avoids duplicating the core workflows:
//! raw series -> processor -> results, and raw tests -> processed circles -> group fit.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::domain::{CircleSet, EngineConfig, FitResult, ProcessorConfig, RawTestSeries, TestResult};
use crate::error::TriaxError;
use crate::fit::CircleGroupFitter;
use crate::process::TestProcessor;

/// One raw test of a group, as stored in a `--tests` file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupTest {
    pub sigma_3: f64,
    #[serde(default)]
    pub k0: Option<f64>,
    pub series: RawTestSeries,
}

/// Optional caller overrides of a processing run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProcessOverrides {
    pub borders: Option<(usize, usize)>,
    pub e_points: Option<(usize, usize)>,
}

/// Process one series, applying border and E-point overrides in that order.
pub fn process_series(
    series: RawTestSeries,
    config: ProcessorConfig,
    overrides: ProcessOverrides,
) -> Result<TestProcessor, TriaxError> {
    let mut processor = TestProcessor::new(config);
    processor.set_series(series)?;
    if let Some((left, right)) = overrides.borders {
        processor.change_borders(left, right)?;
    }
    if let Some((start, end)) = overrides.e_points {
        processor.change_e_points(start, end)?;
    }
    Ok(processor)
}

/// Process every test of a group. Tests are independent and run in parallel.
pub fn process_group(tests: &[GroupTest], config: &EngineConfig) -> Result<Vec<TestResult>, TriaxError> {
    tests
        .par_iter()
        .map(|test| {
            let mut processor_config = config.processor.clone();
            processor_config.sigma_3 = test.sigma_3;
            if let Some(k0) = test.k0 {
                processor_config.k0 = k0;
            }
            let processor = process_series(test.series.clone(), processor_config, ProcessOverrides::default())?;
            processor
                .results()
                .cloned()
                .ok_or_else(|| TriaxError::InsufficientData("processor produced no results".into()))
        })
        .collect()
}

/// Process a group of raw tests and fit their circles.
pub fn fit_tests(tests: &[GroupTest], config: &EngineConfig) -> Result<(CircleSet, FitResult), TriaxError> {
    let results = process_group(tests, config)?;
    let mut fitter = CircleGroupFitter::new(config.stiffness.clone());
    for (test, result) in tests.iter().zip(&results) {
        fitter.add_test(test.sigma_3, result)?;
    }
    let fit = fitter.fit()?;
    info!(tests = tests.len(), "group processed and fitted");
    Ok((fitter.circles().clone(), fit))
}

/// Fit a ready-made circle set.
pub fn fit_circle_set(set: &CircleSet, config: &EngineConfig) -> Result<FitResult, TriaxError> {
    crate::fit::fit_circles(set, &config.stiffness)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{MechanicalTarget, NoiseConfig, PressureSchedule, SoilDescriptor, SynthConfig};
    use crate::synth::synthesize_group;

    #[test]
    fn synthesized_group_fits_back_to_target() {
        let target = MechanicalTarget {
            qf: 420.0,
            e50: 32_000.0,
            sigma_3: 200.0,
            k0: 0.5,
            c: 12.0,
            fi: 31.0,
            poissons_ratio: 0.3,
            dilatancy_angle: 3.0,
            eur: None,
            m: Some(0.5),
            soil: SoilDescriptor::default(),
            residual: false,
        };
        let noise = NoiseConfig {
            amplitude: 0.0,
            ..NoiseConfig::default()
        };
        let group = synthesize_group(&target, &PressureSchedule::Standard, &noise, &SynthConfig::default(), 3)
            .unwrap();
        let tests: Vec<GroupTest> = group
            .tests
            .iter()
            .map(|m| GroupTest {
                sigma_3: m.target.sigma_3,
                k0: Some(m.target.k0),
                series: m.series.clone(),
            })
            .collect();

        let (set, fit) = fit_tests(&tests, &EngineConfig::default()).unwrap();
        assert_eq!(set.len(), 3);
        assert!((fit.fi - 31.0).abs() < 2.0, "fi={}", fit.fi);
        assert!(fit.stiffness.plaxis.is_defined());
    }

    #[test]
    fn border_override_is_applied() {
        let n = 300;
        let strain: Vec<f64> = (0..n).map(|i| i as f64 * 1e-4).collect();
        let deviator: Vec<f64> = strain.iter().map(|e| 200.0 * (1.0 - (-e / 0.004).exp())).collect();
        let series = RawTestSeries {
            pore_volume_strain: strain.iter().map(|e| -0.3 * e).collect(),
            cell_volume_strain: vec![0.0; n],
            pore_pressure: vec![0.0; n],
            strain,
            deviator,
            reload: None,
        };
        let overrides = ProcessOverrides {
            borders: Some((5, 250)),
            e_points: None,
        };
        let p = process_series(series, ProcessorConfig::default(), overrides).unwrap();
        assert_eq!(p.window().unwrap().left, 5);
        assert_eq!(p.results().unwrap().window.right, 250);
    }
}
