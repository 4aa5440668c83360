//! Plot-ready point collections for an external plotting layer.

use serde::{Deserialize, Serialize};

use crate::domain::{CircleSet, FitKind, FitResult, Point, TestResult};
use crate::process::WorkingCurve;
use crate::process::moduli::eur_support;

/// Curves and highlighted support points of one processed test.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestPlot {
    /// (axial strain, deviator kPa)
    pub deviator: Vec<Point>,
    /// (axial strain, volumetric strain)
    pub volume: Vec<Point>,
    /// Smoothed volumetric strain on the same strains; empty if the fit failed.
    pub volume_fit: Vec<Point>,
    pub peak: Point,
    /// Chord from the origin to `(strain50, qf / 2)`.
    pub e50_chord: [Point; 2],
    pub e_secant: [Point; 2],
    pub eur_line: Option<[Point; 2]>,
    /// Regression line of the dilatancy angle, in (axial, volumetric) strain.
    pub dilatancy_line: Option<[Point; 2]>,
}

impl TestPlot {
    pub fn new(curve: &WorkingCurve, result: &TestResult) -> Self {
        let zip = |y: &[f64]| -> Vec<Point> { curve.strain.iter().copied().zip(y.iter().copied()).collect() };
        let volume_fit = curve
            .volume_fit
            .as_ref()
            .map(|p| zip(&p.eval_many(&curve.strain)))
            .unwrap_or_default();
        let eur_line = result
            .eur
            .is_defined()
            .then(|| eur_support(&curve.strain, &curve.deviator, curve.reload).ok())
            .flatten();

        Self {
            deviator: zip(&curve.deviator),
            volume: zip(&curve.volume),
            volume_fit,
            peak: (result.peak_strain, result.qf),
            e50_chord: [(0.0, 0.0), (result.strain50, result.qf / 2.0)],
            e_secant: result.e.points,
            eur_line,
            dilatancy_line: result.dilatancy.value().map(|d| d.points),
        }
    }
}

/// Upper half of one Mohr circle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MohrArc {
    pub centre: f64,
    pub radius: f64,
    /// (normal stress, shear stress) samples from `sigma_3` to `sigma_1`.
    pub points: Vec<Point>,
}

/// Mohr circles of a group with the fitted envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MohrPlot {
    pub circles: Vec<MohrArc>,
    /// Envelope endpoints `(0, c)` and `(sigma_max, tau_max)`; absent for a
    /// single-circle friction ratio.
    pub envelope: Option<[Point; 2]>,
}

impl MohrPlot {
    pub fn new(set: &CircleSet, fit: &FitResult, points_per_circle: usize) -> Self {
        let steps = points_per_circle.max(2);
        let circles: Vec<MohrArc> = set
            .circles()
            .iter()
            .map(|c| {
                let (centre, radius) = (c.centre(), c.radius());
                let points = (0..steps)
                    .map(|k| {
                        let theta = std::f64::consts::PI * (1.0 - k as f64 / (steps - 1) as f64);
                        (centre + radius * theta.cos(), radius * theta.sin())
                    })
                    .collect();
                MohrArc {
                    centre,
                    radius,
                    points,
                }
            })
            .collect();

        let sigma_max = set.circles().iter().map(|c| c.sigma_1).fold(0.0, f64::max);
        let envelope = match fit.kind {
            FitKind::FrictionRatio => None,
            FitKind::Full | FitKind::FrictionOnly => {
                let c = fit.c.unwrap_or(0.0);
                let tan = fit.fi.to_radians().tan();
                Some([(0.0, c), (sigma_max, c + sigma_max * tan)])
            }
        };

        Self { circles, envelope }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Circle, StiffnessConfig};
    use crate::fit::fit_circles;

    #[test]
    fn mohr_arcs_span_each_circle() {
        let set = CircleSet::new(vec![
            Circle::new(100.0, 350.0),
            Circle::new(200.0, 600.0),
            Circle::new(300.0, 850.0),
        ])
        .unwrap();
        let fit = fit_circles(&set, &StiffnessConfig::default()).unwrap();
        let plot = MohrPlot::new(&set, &fit, 33);
        assert_eq!(plot.circles.len(), 3);
        let arc = &plot.circles[0];
        assert!((arc.points[0].0 - 100.0).abs() < 1e-9);
        assert!((arc.points[32].0 - 350.0).abs() < 1e-9);
        assert!(arc.points.iter().all(|p| p.1 >= -1e-9));
        let [a, b] = plot.envelope.unwrap();
        assert_eq!(a.0, 0.0);
        assert_eq!(b.0, 850.0);
    }

    #[test]
    fn single_circle_has_no_envelope() {
        let set = CircleSet::new(vec![Circle::new(100.0, 400.0)]).unwrap();
        let fit = fit_circles(&set, &StiffnessConfig::default()).unwrap();
        assert!(MohrPlot::new(&set, &fit, 10).envelope.is_none());
    }
}
