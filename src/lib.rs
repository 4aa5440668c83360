//! `triax-curves` library crate.
//!
//! Triaxial compression test engine:
//!
//! - `process`: reduce a raw test series to strength and stiffness parameters
//! - `synth`: generate realistic raw series and noisy test groups from targets
//! - `fit`: Mohr-Coulomb and stiffness-exponent fits over a circle group
//!
//! The binary (`triax`) is a thin wrapper so that core logic is testable
//! without spawning processes.

pub mod app;
pub mod cli;
pub mod domain;
pub mod error;
pub mod fit;
pub mod io;
pub mod math;
pub mod process;
pub mod report;
pub mod synth;
