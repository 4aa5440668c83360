//! Explicit configuration values.
//!
//! Nothing in the engine reads global state: each processing, synthesis or fit
//! call receives one of these records. All of them deserialize with defaults so
//! a JSON config file only needs the fields it overrides.

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Stress limit below which the seating step is searched for.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "rule", content = "value", rename_all = "snake_case")]
pub enum SeatingRule {
    /// Fixed deviator limit in kPa.
    Absolute(f64),
    /// Fraction of the observed peak deviator.
    PeakFraction(f64),
}

impl SeatingRule {
    pub fn limit(self, peak: f64) -> f64 {
        match self {
            SeatingRule::Absolute(kpa) => kpa,
            SeatingRule::PeakFraction(frac) => frac * peak,
        }
    }
}

/// Which volumetric strain channel feeds Poisson's ratio and dilatancy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum, Default)]
#[serde(rename_all = "snake_case")]
pub enum VolumeSource {
    #[default]
    Pore,
    Cell,
}

/// Settings for reducing one test.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessorConfig {
    /// Confining pressure (kPa).
    pub sigma_3: f64,
    /// At-rest earth pressure coefficient.
    pub k0: f64,
    pub seating_rule: SeatingRule,
    /// Samples added after the detected seating boundary.
    pub seating_margin: usize,
    /// A strain-increment drop must exceed this multiple of the mean increment
    /// to count as a seating step.
    pub seating_min_jump: f64,
    /// Boundary strains above this are rejected as unrealistic.
    pub unrealistic_seating_strain: f64,
    pub volume_source: VolumeSource,
    /// Degree of the volumetric strain approximation.
    pub poly_degree: usize,
    /// Half width (in axial strain) of the dilatancy regression window.
    pub dilatancy_half_window: f64,
    /// Peaks at or beyond this axial strain have no dilatancy angle.
    pub late_peak_strain: f64,
    /// End stress level of the default E secant, as a multiple of the start level.
    pub e_end_factor: f64,
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self {
            sigma_3: 100.0,
            k0: 0.5,
            seating_rule: SeatingRule::Absolute(70.0),
            seating_margin: 2,
            seating_min_jump: 3.0,
            unrealistic_seating_strain: 0.2,
            volume_source: VolumeSource::Pore,
            poly_degree: 15,
            dilatancy_half_window: 0.005,
            late_peak_strain: 0.14,
            e_end_factor: 1.6,
        }
    }
}

impl ProcessorConfig {
    pub fn for_pressure(sigma_3: f64, k0: f64) -> Self {
        Self {
            sigma_3,
            k0,
            ..Self::default()
        }
    }
}

/// Settings for single-test synthesis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SynthConfig {
    /// Axial strain between consecutive samples.
    pub strain_step: f64,
    /// Draws attempted before accepting the best one.
    pub max_attempts: usize,
    /// Accepted deviation of the recovered Poisson's ratio.
    pub poisson_tolerance: f64,
    /// Post-peak stress drop (fraction of qf) that stops the test, drawn per synthesis.
    pub drop_min: f64,
    pub drop_max: f64,
    /// Deviator noise standard deviation as a fraction of qf.
    pub deviator_noise: f64,
    /// Volumetric strain noise standard deviation.
    pub volume_noise: f64,
    /// Pore pressure noise standard deviation (kPa).
    pub pore_noise: f64,
    /// Piston dead travel prepended to the curve (axial strain).
    pub seating_strain: f64,
}

impl Default for SynthConfig {
    fn default() -> Self {
        Self {
            strain_step: 1e-4,
            max_attempts: 5,
            poisson_tolerance: 0.03,
            drop_min: 0.08,
            drop_max: 0.11,
            deviator_noise: 0.002,
            volume_noise: 2e-5,
            pore_noise: 0.5,
            seating_strain: 0.0,
        }
    }
}

/// Settings for noise injection into a circle group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NoiseConfig {
    /// Maximum relative perturbation of each qf; 0 disables noise.
    pub amplitude: f64,
    /// Weight of the friction angle error (degrees) in the objective.
    pub fi_weight: f64,
    /// Weight of the cohesion error (kPa) in the objective.
    pub c_weight: f64,
    /// Objective value above which an attempt is retried.
    pub tolerance: f64,
    pub max_attempts: usize,
    /// Minimum increase of `tau = qf / 2` between neighbouring circles (kPa).
    pub min_tau_gap: f64,
    /// Iteration ceiling of each constrained minimization.
    pub max_iterations: usize,
    /// Circle kept at its theoretical value; defaults to the middle one.
    pub anchor: Option<usize>,
}

impl Default for NoiseConfig {
    fn default() -> Self {
        Self {
            amplitude: 0.1,
            fi_weight: 100.0,
            c_weight: 1.0,
            tolerance: 5.0,
            max_attempts: 100,
            min_tau_gap: 1.0,
            max_iterations: 2000,
            anchor: None,
        }
    }
}

/// Settings for the stiffness exponent estimators.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StiffnessConfig {
    /// Reference pressure (kPa).
    pub p_ref: f64,
    pub m_min: f64,
    pub m_max: f64,
    /// Grid points for the nonlinear estimator's coarse search.
    pub grid_steps: usize,
}

impl Default for StiffnessConfig {
    fn default() -> Self {
        Self {
            p_ref: 100.0,
            m_min: 0.0,
            m_max: 2.0,
            grid_steps: 201,
        }
    }
}

/// All engine settings in one record, as read from a `--config` JSON file.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub processor: ProcessorConfig,
    pub synth: SynthConfig,
    pub noise: NoiseConfig,
    pub stiffness: StiffnessConfig,
    pub log: LogSpec,
}

/// Confining pressure schedule for a test group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum PressureSchedule {
    /// Standard laboratory pressures.
    Standard,
    /// Derived from an in-situ reference pressure (kPa).
    FromReference(f64),
    /// Caller-supplied pressures (kPa).
    Custom(Vec<f64>),
}

/// Conversion of strains into a device log time series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogSpec {
    /// Piston velocity (mm/min).
    pub velocity: f64,
    /// Initial specimen height (mm).
    pub sample_height: f64,
    /// Height lost in the previous (consolidation) stage (mm).
    pub height_reduction: f64,
}

impl Default for LogSpec {
    fn default() -> Self {
        Self {
            velocity: 0.1,
            sample_height: 76.0,
            height_reduction: 0.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_config_keeps_defaults() {
        let config: EngineConfig =
            serde_json::from_str(r#"{"noise": {"fi_weight": 50}, "processor": {"k0": 0.45}}"#).unwrap();
        assert_eq!(config.noise.fi_weight, 50.0);
        assert_eq!(config.noise.tolerance, 5.0);
        assert_eq!(config.processor.k0, 0.45);
        assert_eq!(config.processor.poly_degree, 15);
        assert_eq!(config.synth, SynthConfig::default());
    }

    #[test]
    fn seating_rule_limits() {
        assert_eq!(SeatingRule::Absolute(70.0).limit(500.0), 70.0);
        assert_eq!(SeatingRule::PeakFraction(0.3).limit(500.0), 150.0);
        let rule: SeatingRule = serde_json::from_str(r#"{"rule": "peak_fraction", "value": 0.3}"#).unwrap();
        assert_eq!(rule, SeatingRule::PeakFraction(0.3));
    }
}
