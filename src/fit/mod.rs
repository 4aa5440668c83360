//! Circle group fitting.
//!
//! Responsibilities:
//!
//! - collect Mohr circles of one test group (immutable [`CircleSet`] values)
//! - Mohr–Coulomb `c, fi` (and residual `c_res, fi_res`) by least squares
//! - stiffness exponent `m` by both estimators, side by side

pub mod mohr;
pub mod stiffness;

pub use mohr::*;
pub use stiffness::*;

use tracing::{debug, info};

use crate::domain::{
    Circle, CircleSet, FitKind, FitResult, StiffnessConfig, StiffnessReport, TestResult,
    UndefinedReason,
};
use crate::error::TriaxError;
use crate::math::fit_slope_through_origin;

/// Accumulates circles and fits the group's strength and stiffness parameters.
#[derive(Debug, Clone)]
pub struct CircleGroupFitter {
    circles: CircleSet,
    config: StiffnessConfig,
}

impl Default for CircleGroupFitter {
    fn default() -> Self {
        Self::new(StiffnessConfig::default())
    }
}

impl CircleGroupFitter {
    pub fn new(config: StiffnessConfig) -> Self {
        Self {
            circles: CircleSet::default(),
            config,
        }
    }

    pub fn config(&self) -> &StiffnessConfig {
        &self.config
    }

    pub fn circles(&self) -> &CircleSet {
        &self.circles
    }

    /// Add a bare circle at failure.
    pub fn add_circle(&mut self, sigma_3: f64, sigma_1: f64) -> Result<(), TriaxError> {
        self.push(Circle::new(sigma_3, sigma_1))
    }

    /// Add a fully described circle (residual strength and E50 optional).
    pub fn push(&mut self, circle: Circle) -> Result<(), TriaxError> {
        self.circles = self.circles.with(circle)?;
        Ok(())
    }

    /// Add the circle of a processed test, carrying its E50.
    pub fn add_test(&mut self, sigma_3: f64, result: &TestResult) -> Result<(), TriaxError> {
        self.push(Circle {
            sigma_3,
            sigma_1: sigma_3 + result.qf,
            sigma_1_residual: None,
            e50: (result.e50 > 0.0).then_some(result.e50),
        })
    }

    pub fn fit(&self) -> Result<FitResult, TriaxError> {
        fit_circles(&self.circles, &self.config)
    }
}

/// Fit a circle set.
///
/// - three or more circles: full `c, fi` regression
/// - two circles: friction angle through the origin, cohesion undefined
/// - one circle: friction ratio `(qf / 2) / sigma_3` with `c = 0`
pub fn fit_circles(set: &CircleSet, config: &StiffnessConfig) -> Result<FitResult, TriaxError> {
    let circles = set.circles();
    let n = circles.len();
    let sigma_3: Vec<f64> = circles.iter().map(|c| c.sigma_3).collect();
    let sigma_1: Vec<f64> = circles.iter().map(|c| c.sigma_1).collect();

    let (kind, c, fi) = match n {
        0 => return Err(TriaxError::InsufficientData("no circles to fit".into())),
        1 => {
            let circle = circles[0];
            if !(circle.sigma_3 > 0.0) {
                return Err(TriaxError::InvalidCircleGeometry(
                    "friction ratio needs sigma_3 > 0".into(),
                ));
            }
            (FitKind::FrictionRatio, Some(0.0), circle.radius() / circle.sigma_3)
        }
        2 => (FitKind::FrictionOnly, None, friction_only(&sigma_3, &sigma_1)?),
        _ => {
            let mc = fit_mohr_coulomb(&sigma_3, &sigma_1).ok_or_else(|| {
                TriaxError::InvalidCircleGeometry("degenerate Mohr–Coulomb regression".into())
            })?;
            (FitKind::Full, Some(mc.c), mc.fi)
        }
    };

    let (c_res, fi_res) = residual_strength(circles);

    let stiffness = match kind {
        FitKind::FrictionRatio => StiffnessReport::undefined(UndefinedReason::TooFewSamples),
        FitKind::FrictionOnly | FitKind::Full => {
            let strength = MohrCoulomb {
                c: c.unwrap_or(0.0),
                fi,
            };
            let samples: Vec<StiffnessSample> = circles
                .iter()
                .filter_map(|c| {
                    c.e50.map(|e50| StiffnessSample {
                        sigma_3: c.sigma_3,
                        e50,
                    })
                })
                .collect();
            stiffness_report(&samples, strength, config)
        }
    };

    info!(n, ?kind, ?c, fi, "circle group fitted");
    Ok(FitResult {
        kind,
        c,
        fi,
        c_res,
        fi_res,
        stiffness,
        n_circles: n,
    })
}

/// Friction angle of a cohesionless envelope through two or more circles.
fn friction_only(sigma_3: &[f64], sigma_1: &[f64]) -> Result<f64, TriaxError> {
    let (sig, tau) = stabilized(sigma_3, sigma_1);
    let k = fit_slope_through_origin(&sig, &tau)
        .filter(|k| k.abs() < 1.0)
        .ok_or_else(|| TriaxError::InvalidCircleGeometry("degenerate friction regression".into()))?;
    Ok(k.asin().to_degrees())
}

/// `c_res, fi_res` when every circle (three or more) carries a residual strength.
fn residual_strength(circles: &[Circle]) -> (Option<f64>, Option<f64>) {
    if circles.len() < 3 {
        return (None, None);
    }
    let Some(residual) = circles
        .iter()
        .map(|c| c.sigma_1_residual)
        .collect::<Option<Vec<f64>>>()
    else {
        return (None, None);
    };
    let sigma_3: Vec<f64> = circles.iter().map(|c| c.sigma_3).collect();
    match fit_mohr_coulomb(&sigma_3, &residual) {
        Some(mc) => (Some(mc.c), Some(mc.fi)),
        None => {
            debug!("residual regression degenerate");
            (None, None)
        }
    }
}
