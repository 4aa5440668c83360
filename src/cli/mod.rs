//! Command-line parsing for the `triax` binary.
//!
//! Argument parsing and command dispatch stay separate from the processing,
//! fitting and synthesis code.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

use crate::domain::{StiffnessMethod, VolumeSource};

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "triax", version, about = "Triaxial test processing, fitting and synthesis")]
pub struct Cli {
    /// Engine settings JSON (any subset of processor/synth/noise/stiffness/log).
    #[arg(long, global = true, value_name = "JSON")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Reduce one raw test series to qf, E50, E, Eur, Poisson's ratio and dilatancy.
    Process(ProcessArgs),
    /// Synthesize one raw test series from a mechanical target.
    Synth(SynthArgs),
    /// Fit c, fi and the stiffness exponent of a circle group.
    FitGroup(FitGroupArgs),
    /// Synthesize a whole test group over a confining-pressure schedule.
    SynthGroup(SynthGroupArgs),
}

#[derive(Debug, Parser, Clone)]
pub struct ProcessArgs {
    /// Raw series JSON.
    #[arg(long, value_name = "JSON")]
    pub input: PathBuf,

    /// Confining pressure (kPa).
    #[arg(long = "sigma-3")]
    pub sigma_3: Option<f64>,

    /// At-rest earth pressure coefficient.
    #[arg(long)]
    pub k0: Option<f64>,

    /// Left cut border (sample index); overrides seating detection.
    #[arg(long, requires = "right")]
    pub left: Option<usize>,

    /// Right cut border (exclusive sample index).
    #[arg(long, requires = "left")]
    pub right: Option<usize>,

    /// Secant E start index (in the cut curve).
    #[arg(long, requires = "e_end")]
    pub e_start: Option<usize>,

    /// Secant E end index (in the cut curve).
    #[arg(long, requires = "e_start")]
    pub e_end: Option<usize>,

    /// Volumetric strain channel.
    #[arg(long, value_enum)]
    pub volume_source: Option<VolumeSource>,

    /// Write results JSON.
    #[arg(long, value_name = "JSON")]
    pub json: Option<PathBuf>,

    /// Write plot-ready points JSON.
    #[arg(long, value_name = "JSON")]
    pub plot_json: Option<PathBuf>,
}

#[derive(Debug, Parser, Clone)]
pub struct SynthArgs {
    /// Mechanical target JSON.
    #[arg(long, value_name = "JSON")]
    pub target: PathBuf,

    /// Random seed (falls back to TRIAX_SEED, then 42).
    #[arg(long)]
    pub seed: Option<u64>,

    /// Keep the full post-peak branch.
    #[arg(long)]
    pub residual: bool,

    /// Piston dead travel to prepend (axial strain).
    #[arg(long)]
    pub seating_strain: Option<f64>,

    /// Write the raw series JSON.
    #[arg(long, value_name = "JSON")]
    pub out: Option<PathBuf>,

    /// Write a device log CSV.
    #[arg(long, value_name = "CSV")]
    pub log: Option<PathBuf>,

    /// Piston velocity for the log (mm/min).
    #[arg(long)]
    pub velocity: Option<f64>,

    /// Specimen height for the log (mm).
    #[arg(long)]
    pub sample_height: Option<f64>,

    /// Height lost in the previous stage (mm).
    #[arg(long)]
    pub height_reduction: Option<f64>,
}

#[derive(Debug, Parser, Clone)]
pub struct FitGroupArgs {
    /// Circles JSON: `[{"sigma_3": .., "sigma_1": .., "e50": ..}, ..]`.
    #[arg(long, value_name = "JSON", required_unless_present = "tests", conflicts_with = "tests")]
    pub input: Option<PathBuf>,

    /// Raw tests JSON: `[{"sigma_3": .., "series": {..}}, ..]`, processed before fitting.
    #[arg(long, value_name = "JSON")]
    pub tests: Option<PathBuf>,

    /// Stiffness exponent estimator to report as selected.
    #[arg(long, value_enum, default_value_t = StiffnessMethod::Plaxis)]
    pub method: StiffnessMethod,

    /// Write the fit JSON.
    #[arg(long, value_name = "JSON")]
    pub json: Option<PathBuf>,

    /// Write Mohr circle points JSON.
    #[arg(long, value_name = "JSON")]
    pub plot_json: Option<PathBuf>,
}

/// Confining-pressure schedule selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ScheduleKind {
    /// 100, 200, 300 kPa.
    Standard,
    /// p/2, p, 2p around a reference pressure.
    Reference,
    /// Pressures given with `--pressures`.
    Custom,
}

#[derive(Debug, Parser, Clone)]
pub struct SynthGroupArgs {
    /// Mechanical target JSON (qf/E50 refer to the target's sigma_3).
    #[arg(long, value_name = "JSON")]
    pub target: PathBuf,

    #[arg(long, value_enum, default_value_t = ScheduleKind::Standard)]
    pub schedule: ScheduleKind,

    /// Reference pressure (kPa); defaults to the target's sigma_3.
    #[arg(long)]
    pub reference: Option<f64>,

    /// Comma separated pressures (kPa) for the custom schedule.
    #[arg(long, value_delimiter = ',', required_if_eq("schedule", "custom"))]
    pub pressures: Vec<f64>,

    /// Relative noise amplitude on qf (0 disables noise).
    #[arg(long)]
    pub amplitude: Option<f64>,

    /// Random seed (falls back to TRIAX_SEED, then 42).
    #[arg(long)]
    pub seed: Option<u64>,

    /// Directory for one series JSON per pressure plus `group.json`.
    #[arg(long, value_name = "DIR")]
    pub out_dir: Option<PathBuf>,
}
