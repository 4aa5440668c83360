//! Shared domain types.
//!
//! These types are kept lightweight and serializable so they can be:
//!
//! - passed in by the external log parser / statement loader
//! - handed back to the reporting and plotting layers
//! - exported to JSON for later comparison

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::error::TriaxError;

/// Minimum number of samples a cut window must keep.
pub const MIN_CUT_LEN: usize = 50;

/// Strain at which synthetic curves without a distinct peak stop hardening.
pub const MAX_FAILURE_STRAIN: f64 = 0.15;

/// A point on a curve (`x`, `y`), e.g. (axial strain, deviator stress).
pub type Point = (f64, f64);

/// Why a derived quantity could not be computed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UndefinedReason {
    /// A search window contained no usable samples.
    EmptyWindow,
    /// The series carries no unload/reload index triple.
    NoReloadLoop,
    /// Unloading and reloading branches never cross.
    NoIntersection,
    /// A regression had zero variance or produced a non-finite value.
    DegenerateRegression,
    /// The stress peak sits at or beyond the late-peak strain.
    LatePeak,
    /// Seating boundary landed at an unrealistic strain.
    UnrealisticStrain,
    /// Too few circles or samples for the estimator.
    TooFewSamples,
    /// A power-law base became non-positive.
    NonPositiveStress,
}

/// Result of a computation that may legitimately have no value.
///
/// This replaces silent fallbacks: callers can always see *why* a value is
/// missing, and [`Outcome::value`] gives the documented default (`None`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", content = "value", rename_all = "snake_case")]
pub enum Outcome<T> {
    Defined(T),
    Undefined(UndefinedReason),
}

impl<T> Outcome<T> {
    pub fn value(&self) -> Option<&T> {
        match self {
            Outcome::Defined(v) => Some(v),
            Outcome::Undefined(_) => None,
        }
    }

    pub fn into_value(self) -> Option<T> {
        match self {
            Outcome::Defined(v) => Some(v),
            Outcome::Undefined(_) => None,
        }
    }

    pub fn is_defined(&self) -> bool {
        matches!(self, Outcome::Defined(_))
    }

    pub fn reason(&self) -> Option<UndefinedReason> {
        match self {
            Outcome::Defined(_) => None,
            Outcome::Undefined(r) => Some(*r),
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Outcome<U> {
        match self {
            Outcome::Defined(v) => Outcome::Defined(f(v)),
            Outcome::Undefined(r) => Outcome::Undefined(r),
        }
    }
}

impl<T> From<Result<T, UndefinedReason>> for Outcome<T> {
    fn from(value: Result<T, UndefinedReason>) -> Self {
        match value {
            Ok(v) => Outcome::Defined(v),
            Err(r) => Outcome::Undefined(r),
        }
    }
}

/// Outcome of the piston dead-travel detection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SeatingStep {
    /// Loading starts at `index`.
    Detected { index: usize },
    /// The curve starts loading immediately.
    NotNeeded,
    /// Detection could not run; the curve is used uncorrected.
    Failed { reason: UndefinedReason },
}

impl SeatingStep {
    /// Index at which the working curve should start.
    pub fn cut_index(&self) -> usize {
        match self {
            SeatingStep::Detected { index } => *index,
            SeatingStep::NotNeeded | SeatingStep::Failed { .. } => 0,
        }
    }
}

/// Unload/reload loop indices: top of unloading, minimum-stress turn, end of reloading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReloadLoop {
    pub start: usize,
    pub turn: usize,
    pub end: usize,
}

impl ReloadLoop {
    /// Shift the loop into a window starting at `offset` with `len` samples.
    ///
    /// Returns `None` when the loop does not fit entirely inside the window.
    pub fn shifted(&self, offset: usize, len: usize) -> Option<ReloadLoop> {
        if self.start < offset {
            return None;
        }
        let shifted = ReloadLoop {
            start: self.start - offset,
            turn: self.turn.checked_sub(offset)?,
            end: self.end.checked_sub(offset)?,
        };
        if shifted.end >= len || !(shifted.start < shifted.turn && shifted.turn < shifted.end) {
            return None;
        }
        Some(shifted)
    }
}

/// Raw per-sample arrays of one triaxial test, as supplied by the log parser.
///
/// Strains are fractions (0.01 = 1 %), stresses and pressures kPa. Volumetric
/// strain is positive for dilation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawTestSeries {
    pub strain: Vec<f64>,
    pub deviator: Vec<f64>,
    pub pore_volume_strain: Vec<f64>,
    pub cell_volume_strain: Vec<f64>,
    pub pore_pressure: Vec<f64>,
    #[serde(default)]
    pub reload: Option<ReloadLoop>,
}

impl RawTestSeries {
    pub fn len(&self) -> usize {
        self.strain.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strain.is_empty()
    }

    /// Check that all arrays line up and hold enough finite samples.
    pub fn validate(&self) -> Result<(), TriaxError> {
        let n = self.strain.len();
        let lens = [
            ("deviator", self.deviator.len()),
            ("pore_volume_strain", self.pore_volume_strain.len()),
            ("cell_volume_strain", self.cell_volume_strain.len()),
            ("pore_pressure", self.pore_pressure.len()),
        ];
        for (name, len) in lens {
            if len != n {
                return Err(TriaxError::invalid_input(format!(
                    "array '{name}' has {len} samples, strain has {n}"
                )));
            }
        }
        if n < MIN_CUT_LEN {
            return Err(TriaxError::invalid_input(format!(
                "series has {n} samples, at least {MIN_CUT_LEN} are required"
            )));
        }
        let all_finite = self
            .strain
            .iter()
            .chain(&self.deviator)
            .chain(&self.pore_volume_strain)
            .chain(&self.cell_volume_strain)
            .chain(&self.pore_pressure)
            .all(|v| v.is_finite());
        if !all_finite {
            return Err(TriaxError::invalid_input("series contains non-finite samples"));
        }
        if let Some(lp) = self.reload {
            if lp.shifted(0, n).is_none() {
                return Err(TriaxError::invalid_input(format!(
                    "reload loop {lp:?} is not ordered inside the series"
                )));
            }
        }
        Ok(())
    }
}

/// Valid post-seating portion of a series: samples `left..right`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CutWindow {
    pub left: usize,
    pub right: usize,
}

impl CutWindow {
    pub fn new(left: usize, right: usize, series_len: usize) -> Result<Self, TriaxError> {
        let reject = |reason: String| TriaxError::InvalidCutWindow {
            left,
            right,
            reason,
        };
        if right > series_len {
            return Err(reject(format!("right bound exceeds series length {series_len}")));
        }
        if right < left || right - left < MIN_CUT_LEN {
            return Err(reject(format!("fewer than {MIN_CUT_LEN} samples")));
        }
        Ok(Self { left, right })
    }

    pub fn len(&self) -> usize {
        self.right - self.left
    }

    pub fn is_empty(&self) -> bool {
        self.right == self.left
    }
}

/// Secant modulus with the two curve points it was measured between.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SecantModulus {
    pub value: f64,
    pub indices: (usize, usize),
    pub points: [Point; 2],
}

/// Dilatancy angle (degrees) with the two (axial, volumetric) support points.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DilatancyAngle {
    pub value: f64,
    pub points: [Point; 2],
}

/// Results of one processing pass over a cut window.
///
/// Always rebuilt from scratch; never patched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestResult {
    pub qf: f64,
    pub e50: f64,
    /// Axial strain at which the deviator equals `qf / 2`.
    pub strain50: f64,
    pub e: SecantModulus,
    pub eur: Outcome<f64>,
    pub poissons_ratio: f64,
    pub dilatancy: Outcome<DilatancyAngle>,
    pub max_pore_pressure: f64,
    /// Axial strain at the stress peak.
    pub peak_strain: f64,
    pub seating: SeatingStep,
    pub window: CutWindow,
}

/// Coarse grain-size / soil-type class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum, Default)]
#[serde(rename_all = "snake_case")]
pub enum GrainClass {
    GravellySand,
    CoarseSand,
    #[default]
    MediumSand,
    FineSand,
    SiltySand,
    SandyLoam,
    Loam,
    Clay,
}

impl GrainClass {
    pub fn is_sand(self) -> bool {
        matches!(
            self,
            GrainClass::GravellySand
                | GrainClass::CoarseSand
                | GrainClass::MediumSand
                | GrainClass::FineSand
                | GrainClass::SiltySand
        )
    }
}

/// Density state (sands) or consolidation state (clays).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum, Default)]
#[serde(rename_all = "snake_case")]
pub enum DensityState {
    Dense,
    #[default]
    Medium,
    Loose,
}

/// Classification data that drives the synthetic curve shape.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct SoilDescriptor {
    #[serde(default)]
    pub grain: GrainClass,
    #[serde(default)]
    pub density: DensityState,
    #[serde(default)]
    pub plasticity_index: Option<f64>,
    #[serde(default)]
    pub liquidity_index: Option<f64>,
}

/// Target mechanical parameters for synthesis. Read-only to the engine.
///
/// Stresses and moduli in kPa, angles in degrees.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MechanicalTarget {
    pub qf: f64,
    pub e50: f64,
    pub sigma_3: f64,
    pub k0: f64,
    pub c: f64,
    pub fi: f64,
    pub poissons_ratio: f64,
    pub dilatancy_angle: f64,
    #[serde(default)]
    pub eur: Option<f64>,
    #[serde(default)]
    pub m: Option<f64>,
    #[serde(default)]
    pub soil: SoilDescriptor,
    /// Keep the full post-peak branch instead of stopping after the peak.
    #[serde(default)]
    pub residual: bool,
}

impl MechanicalTarget {
    pub fn validate(&self) -> Result<(), TriaxError> {
        let positive = [
            ("qf", self.qf),
            ("e50", self.e50),
            ("sigma_3", self.sigma_3),
            ("k0", self.k0),
        ];
        for (name, v) in positive {
            if !(v.is_finite() && v > 0.0) {
                return Err(TriaxError::invalid_input(format!(
                    "target {name} must be finite and > 0, got {v}"
                )));
            }
        }
        if self.qf / self.e50 >= MAX_FAILURE_STRAIN {
            return Err(TriaxError::invalid_input(format!(
                "target e50={} is too soft for qf={} (qf/e50 must stay below {MAX_FAILURE_STRAIN})",
                self.e50, self.qf
            )));
        }
        if !(0.0..0.5).contains(&self.poissons_ratio) {
            return Err(TriaxError::invalid_input(format!(
                "target poissons_ratio must lie in [0, 0.5), got {}",
                self.poissons_ratio
            )));
        }
        if !(0.0..45.0).contains(&self.dilatancy_angle) {
            return Err(TriaxError::invalid_input(format!(
                "target dilatancy_angle must lie in [0, 45), got {}",
                self.dilatancy_angle
            )));
        }
        if !(self.c >= 0.0 && (0.0..90.0).contains(&self.fi)) {
            return Err(TriaxError::invalid_input(format!(
                "target c/fi out of range: c={}, fi={}",
                self.c, self.fi
            )));
        }
        if let Some(eur) = self.eur {
            if !(eur.is_finite() && eur > self.e50) {
                return Err(TriaxError::invalid_input(format!(
                    "target eur must exceed e50, got eur={eur}, e50={}",
                    self.e50
                )));
            }
        }
        Ok(())
    }

    /// Strain at which the target curve reaches `qf / 2`.
    pub fn strain50(&self) -> f64 {
        self.qf / (2.0 * self.e50)
    }
}

/// One Mohr circle at failure.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Circle {
    pub sigma_3: f64,
    pub sigma_1: f64,
    #[serde(default)]
    pub sigma_1_residual: Option<f64>,
    /// Secant stiffness of the test (kPa), for the stiffness exponent fit.
    #[serde(default)]
    pub e50: Option<f64>,
}

impl Circle {
    pub fn new(sigma_3: f64, sigma_1: f64) -> Self {
        Self {
            sigma_3,
            sigma_1,
            sigma_1_residual: None,
            e50: None,
        }
    }

    pub fn qf(&self) -> f64 {
        self.sigma_1 - self.sigma_3
    }

    pub fn centre(&self) -> f64 {
        (self.sigma_1 + self.sigma_3) / 2.0
    }

    pub fn radius(&self) -> f64 {
        (self.sigma_1 - self.sigma_3) / 2.0
    }

    fn validate(&self) -> Result<(), TriaxError> {
        if !(self.sigma_3.is_finite() && self.sigma_1.is_finite() && self.sigma_3 >= 0.0) {
            return Err(TriaxError::InvalidCircleGeometry(format!(
                "non-finite or negative stresses: sigma_3={}, sigma_1={}",
                self.sigma_3, self.sigma_1
            )));
        }
        if self.sigma_1 <= self.sigma_3 {
            return Err(TriaxError::InvalidCircleGeometry(format!(
                "sigma_1={} must exceed sigma_3={}",
                self.sigma_1, self.sigma_3
            )));
        }
        if let Some(res) = self.sigma_1_residual {
            if !(res.is_finite() && res > self.sigma_3) {
                return Err(TriaxError::InvalidCircleGeometry(format!(
                    "residual sigma_1={res} must exceed sigma_3={}",
                    self.sigma_3
                )));
            }
        }
        Ok(())
    }
}

/// Circles of one test group, sorted by strictly increasing `sigma_3`.
///
/// Never mutated in place: adding a circle builds a new set.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(try_from = "Vec<Circle>", into = "Vec<Circle>")]
pub struct CircleSet {
    circles: Vec<Circle>,
}

impl TryFrom<Vec<Circle>> for CircleSet {
    type Error = TriaxError;

    fn try_from(circles: Vec<Circle>) -> Result<Self, Self::Error> {
        Self::new(circles)
    }
}

impl From<CircleSet> for Vec<Circle> {
    fn from(set: CircleSet) -> Self {
        set.circles
    }
}

impl CircleSet {
    pub fn new(mut circles: Vec<Circle>) -> Result<Self, TriaxError> {
        for c in &circles {
            c.validate()?;
        }
        circles.sort_by(|a, b| a.sigma_3.total_cmp(&b.sigma_3));
        for w in circles.windows(2) {
            if w[1].sigma_3 <= w[0].sigma_3 {
                return Err(TriaxError::InvalidCircleGeometry(format!(
                    "duplicate confining pressure sigma_3={}",
                    w[0].sigma_3
                )));
            }
        }
        Ok(Self { circles })
    }

    /// A new set with `circle` added.
    pub fn with(&self, circle: Circle) -> Result<Self, TriaxError> {
        let mut circles = self.circles.clone();
        circles.push(circle);
        Self::new(circles)
    }

    pub fn circles(&self) -> &[Circle] {
        &self.circles
    }

    pub fn len(&self) -> usize {
        self.circles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.circles.is_empty()
    }
}

/// Which Mohr–Coulomb estimate a fit could produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FitKind {
    /// Three or more circles: cohesion and friction angle.
    Full,
    /// Two circles: friction angle through the origin, no cohesion.
    FrictionOnly,
    /// One circle: friction ratio `(qf / 2) / sigma_3`.
    FrictionRatio,
}

/// Caller-selected stiffness exponent estimator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum, Default)]
#[serde(rename_all = "lowercase")]
pub enum StiffnessMethod {
    /// Nonlinear least squares on the raw E50 values.
    #[default]
    Plaxis,
    /// Linear regression after log transform.
    Approximate,
}

/// Power-law stiffness fit `E50 = e_ref * ratio^m`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StiffnessFit {
    pub m: f64,
    pub e_ref: f64,
    pub p_ref: f64,
}

/// Both stiffness exponent estimates, side by side.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StiffnessReport {
    pub plaxis: Outcome<StiffnessFit>,
    pub approximate: Outcome<StiffnessFit>,
}

impl StiffnessReport {
    pub fn undefined(reason: UndefinedReason) -> Self {
        Self {
            plaxis: Outcome::Undefined(reason),
            approximate: Outcome::Undefined(reason),
        }
    }

    pub fn select(&self, method: StiffnessMethod) -> &Outcome<StiffnessFit> {
        match method {
            StiffnessMethod::Plaxis => &self.plaxis,
            StiffnessMethod::Approximate => &self.approximate,
        }
    }
}

/// Mohr–Coulomb fit of one circle set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FitResult {
    pub kind: FitKind,
    /// Cohesion (kPa); `None` when fewer than three circles were given
    /// (except the single-circle friction ratio, which reports 0).
    pub c: Option<f64>,
    /// Friction angle (degrees), or the friction ratio for [`FitKind::FrictionRatio`].
    pub fi: f64,
    pub c_res: Option<f64>,
    pub fi_res: Option<f64>,
    pub stiffness: StiffnessReport,
    pub n_circles: usize,
}
