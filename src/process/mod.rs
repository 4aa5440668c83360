//! Reduction of one triaxial test into strength and stiffness parameters.
//!
//! [`TestProcessor`] owns the raw series of one test. Every change (new
//! series, new borders, new E points) slices a fresh [`WorkingCurve`] out of
//! the raw arrays and recomputes a fresh [`TestResult`]; nothing is patched
//! incrementally.

pub mod moduli;
pub mod seating;
pub mod volume;

use tracing::{debug, warn};

use crate::domain::{
    CutWindow, Outcome, ProcessorConfig, RawTestSeries, ReloadLoop, SeatingStep, TestResult,
    VolumeSource,
};
use crate::error::TriaxError;
use crate::math::Polynomial;

pub use seating::detect_seating;

/// The cut, re-zeroed arrays that results are computed from.
#[derive(Debug, Clone)]
pub struct WorkingCurve {
    pub strain: Vec<f64>,
    pub deviator: Vec<f64>,
    /// Volumetric strain from the configured channel.
    pub volume: Vec<f64>,
    pub pore_pressure: Vec<f64>,
    pub reload: Option<ReloadLoop>,
    /// Smoothed volumetric strain (`None` if the fit failed).
    pub volume_fit: Option<Polynomial>,
}

impl WorkingCurve {
    /// Slice `window` out of `raw` and re-zero strains and deviator at its left edge.
    pub fn cut(raw: &RawTestSeries, window: CutWindow, config: &ProcessorConfig) -> WorkingCurve {
        let range = window.left..window.right;
        let volume_raw = match config.volume_source {
            VolumeSource::Pore => &raw.pore_volume_strain,
            VolumeSource::Cell => &raw.cell_volume_strain,
        };
        let rezero = |values: &[f64]| -> Vec<f64> {
            let base = values[window.left];
            values[range.clone()].iter().map(|v| v - base).collect()
        };

        let strain = rezero(&raw.strain);
        let deviator = rezero(&raw.deviator);
        let volume = rezero(volume_raw);
        let pore_pressure = raw.pore_pressure[range.clone()].to_vec();
        let reload = raw.reload.and_then(|lp| lp.shifted(window.left, window.len()));
        let volume_fit = volume::approximate(&strain, &volume, config.poly_degree);

        WorkingCurve {
            strain,
            deviator,
            volume,
            pore_pressure,
            reload,
            volume_fit,
        }
    }

    pub fn len(&self) -> usize {
        self.strain.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strain.is_empty()
    }
}

/// Compute a full result record from a working curve.
pub fn compute_results(
    curve: &WorkingCurve,
    config: &ProcessorConfig,
    e_points: Option<(usize, usize)>,
    seating: SeatingStep,
    window: CutWindow,
) -> TestResult {
    let (qf, peak_index) = moduli::peak(&curve.deviator);
    let (e50, strain50) = moduli::e50(&curve.strain, &curve.deviator, qf, peak_index);

    let e = match e_points {
        Some((i, j)) => moduli::secant(&curve.strain, &curve.deviator, i, j),
        None => {
            let indices = moduli::default_e_indices(
                &curve.deviator,
                qf,
                peak_index,
                config.sigma_3,
                config.k0,
                config.e_end_factor,
            );
            moduli::e_modulus(&curve.strain, &curve.deviator, qf, peak_index, e50, indices)
        }
    };

    let eur: Outcome<f64> = moduli::eur(&curve.strain, &curve.deviator, curve.reload).into();
    if curve.reload.is_some() {
        if let Some(reason) = eur.reason() {
            warn!(?reason, "unload/reload modulus undefined");
        }
    }

    let v50 = volume::volume_at(curve.volume_fit.as_ref(), &curve.strain, &curve.volume, strain50);
    let poissons_ratio = volume::poissons_ratio(v50, strain50);
    let dilatancy: Outcome<_> = volume::dilatancy(&curve.strain, &curve.volume, peak_index, config).into();

    let max_pore_pressure = curve
        .pore_pressure
        .iter()
        .copied()
        .fold(f64::NEG_INFINITY, f64::max);

    TestResult {
        qf,
        e50,
        strain50,
        e,
        eur,
        poissons_ratio,
        dilatancy,
        max_pore_pressure,
        peak_strain: curve.strain[peak_index],
        seating,
        window,
    }
}

/// Stateful reducer of one test (the single-test processor).
#[derive(Debug, Clone)]
pub struct TestProcessor {
    config: ProcessorConfig,
    raw: Option<RawTestSeries>,
    seating: SeatingStep,
    window: Option<CutWindow>,
    e_points: Option<(usize, usize)>,
    curve: Option<WorkingCurve>,
    results: Option<TestResult>,
}

impl TestProcessor {
    pub fn new(config: ProcessorConfig) -> Self {
        Self {
            config,
            raw: None,
            seating: SeatingStep::NotNeeded,
            window: None,
            e_points: None,
            curve: None,
            results: None,
        }
    }

    pub fn config(&self) -> &ProcessorConfig {
        &self.config
    }

    /// Take ownership of a raw series, detect the seating step and compute results.
    pub fn set_series(&mut self, raw: RawTestSeries) -> Result<(), TriaxError> {
        raw.validate()?;
        let n = raw.len();

        let mut seating = detect_seating(&raw.strain, &raw.deviator, &self.config);
        let window = match CutWindow::new(seating.cut_index(), n, n) {
            Ok(w) => w,
            Err(_) => {
                seating = SeatingStep::Failed {
                    reason: crate::domain::UndefinedReason::EmptyWindow,
                };
                CutWindow::new(0, n, n)?
            }
        };
        if let SeatingStep::Failed { reason } = seating {
            warn!(?reason, "seating step detection failed, using the uncorrected curve");
        }
        debug!(?seating, samples = n, "series accepted");

        self.raw = Some(raw);
        self.seating = seating;
        self.e_points = None;
        self.rebuild(window);
        Ok(())
    }

    /// Re-cut the curve to samples `left..right` and recompute everything.
    ///
    /// A rejected window leaves the previous state untouched.
    pub fn change_borders(&mut self, left: usize, right: usize) -> Result<(), TriaxError> {
        let n = self.raw_series()?.len();
        let window = CutWindow::new(left, right, n)?;
        self.e_points = None;
        self.rebuild(window);
        Ok(())
    }

    /// Override the secant E points (indices into the cut curve).
    pub fn change_e_points(&mut self, start: usize, end: usize) -> Result<(), TriaxError> {
        let window = self
            .window
            .ok_or_else(|| TriaxError::InsufficientData("no series loaded".into()))?;
        if !(start < end && end < window.len()) {
            return Err(TriaxError::invalid_input(format!(
                "E points ({start}, {end}) must be ordered and inside the {} cut samples",
                window.len()
            )));
        }
        self.e_points = Some((start, end));
        self.rebuild(window);
        Ok(())
    }

    pub fn results(&self) -> Option<&TestResult> {
        self.results.as_ref()
    }

    pub fn curve(&self) -> Option<&WorkingCurve> {
        self.curve.as_ref()
    }

    pub fn window(&self) -> Option<CutWindow> {
        self.window
    }

    pub fn seating(&self) -> SeatingStep {
        self.seating
    }

    fn raw_series(&self) -> Result<&RawTestSeries, TriaxError> {
        self.raw
            .as_ref()
            .ok_or_else(|| TriaxError::InsufficientData("no series loaded".into()))
    }

    fn rebuild(&mut self, window: CutWindow) {
        let Some(raw) = self.raw.as_ref() else {
            return;
        };
        let curve = WorkingCurve::cut(raw, window, &self.config);
        let results = compute_results(&curve, &self.config, self.e_points, self.seating, window);
        debug!(
            left = window.left,
            right = window.right,
            qf = results.qf,
            e50 = results.e50,
            nu = results.poissons_ratio,
            "test reprocessed"
        );
        self.window = Some(window);
        self.curve = Some(curve);
        self.results = Some(results);
    }
}
