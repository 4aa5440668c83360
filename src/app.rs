//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - loads `.env` and sets up logging
//! - parses CLI arguments and the engine config
//! - runs processing, fitting or synthesis
//! - prints reports and writes optional exports

use std::path::{Path, PathBuf};

use clap::Parser;
use tracing::{debug, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Registry};

use crate::cli::{Command, FitGroupArgs, ProcessArgs, ScheduleKind, SynthArgs, SynthGroupArgs};
use crate::domain::{EngineConfig, PressureSchedule};
use crate::error::TriaxError;
use crate::io::{read_circles, read_json, read_series, read_target, write_export_json, write_json, write_log_csv, write_series};
use crate::report::{MohrPlot, TestPlot};
use crate::synth::{synthesize_group, to_log_series, TestSynthesizer};

pub mod pipeline;

use pipeline::{GroupTest, ProcessOverrides};

const DEFAULT_SEED: u64 = 42;
const MOHR_POINTS: usize = 90;

/// Entry point for the `triax` binary.
pub fn run() -> Result<(), TriaxError> {
    dotenvy::dotenv().ok();
    init_tracing();

    let cli = crate::cli::Cli::parse();
    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Command::Process(args) => handle_process(args, config),
        Command::Synth(args) => handle_synth(args, config),
        Command::FitGroup(args) => handle_fit_group(args, config),
        Command::SynthGroup(args) => handle_synth_group(args, config),
    }
}

/// Logs go to stderr so stdout stays clean for reports. `RUST_LOG` overrides the level.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr);
    // A second init (tests, embedding) is not an error.
    let _ = Registry::default().with(filter).with(fmt_layer).try_init();
}

fn load_config(path: Option<&Path>) -> Result<EngineConfig, TriaxError> {
    match path {
        Some(path) => {
            let config: EngineConfig = read_json(path, "config JSON")?;
            debug!(path = %path.display(), "engine config loaded");
            Ok(config)
        }
        None => Ok(EngineConfig::default()),
    }
}

/// `--seed`, then `TRIAX_SEED`, then a fixed default.
fn resolve_seed(arg: Option<u64>) -> Result<u64, TriaxError> {
    if let Some(seed) = arg {
        return Ok(seed);
    }
    match std::env::var("TRIAX_SEED") {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| TriaxError::invalid_input(format!("TRIAX_SEED='{raw}' is not an unsigned integer"))),
        Err(_) => Ok(DEFAULT_SEED),
    }
}

fn handle_process(args: ProcessArgs, config: EngineConfig) -> Result<(), TriaxError> {
    let mut processor_config = config.processor;
    if let Some(sigma_3) = args.sigma_3 {
        processor_config.sigma_3 = sigma_3;
    }
    if let Some(k0) = args.k0 {
        processor_config.k0 = k0;
    }
    if let Some(source) = args.volume_source {
        processor_config.volume_source = source;
    }
    let sigma_3 = processor_config.sigma_3;

    let series = read_series(&args.input)?;
    let overrides = ProcessOverrides {
        borders: args.left.zip(args.right),
        e_points: args.e_start.zip(args.e_end),
    };
    let processor = pipeline::process_series(series, processor_config, overrides)?;
    let (Some(result), Some(curve)) = (processor.results(), processor.curve()) else {
        return Err(TriaxError::InsufficientData("processor produced no results".into()));
    };

    println!("{}", crate::report::format_test_result(result, sigma_3));

    if let Some(path) = &args.json {
        write_export_json(path, result)?;
    }
    if let Some(path) = &args.plot_json {
        write_json(path, &TestPlot::new(curve, result), "plot JSON")?;
    }
    Ok(())
}

fn handle_synth(args: SynthArgs, config: EngineConfig) -> Result<(), TriaxError> {
    let mut target = read_target(&args.target)?;
    if args.residual {
        target.residual = true;
    }
    let mut synth_config = config.synth;
    if let Some(strain) = args.seating_strain {
        synth_config.seating_strain = strain;
    }
    let seed = resolve_seed(args.seed)?;

    let mut synthesizer = TestSynthesizer::new(synth_config, seed);
    let series = synthesizer.synthesize(&target)?;
    info!(seed, attempts = synthesizer.attempts(), samples = series.len(), "series synthesized");

    if let Some(recovered) = synthesizer.recovered() {
        println!("{}", crate::report::format_test_result(recovered, target.sigma_3));
    }

    if let Some(path) = &args.out {
        write_series(path, &series)?;
    }
    if let Some(path) = &args.log {
        let mut spec = config.log;
        if let Some(v) = args.velocity {
            spec.velocity = v;
        }
        if let Some(h) = args.sample_height {
            spec.sample_height = h;
        }
        if let Some(r) = args.height_reduction {
            spec.height_reduction = r;
        }
        let rows = to_log_series(&series, &spec)?;
        write_log_csv(path, &rows)?;
    }
    Ok(())
}

fn handle_fit_group(args: FitGroupArgs, config: EngineConfig) -> Result<(), TriaxError> {
    let (set, fit) = match (&args.input, &args.tests) {
        (Some(path), _) => {
            let set = read_circles(path)?;
            let fit = pipeline::fit_circle_set(&set, &config)?;
            (set, fit)
        }
        (None, Some(path)) => {
            let tests: Vec<GroupTest> = read_json(path, "tests JSON")?;
            pipeline::fit_tests(&tests, &config)?
        }
        (None, None) => return Err(TriaxError::invalid_input("either --input or --tests is required")),
    };

    println!("{}", crate::report::format_fit_result(&fit, args.method));

    if let Some(path) = &args.json {
        write_export_json(path, &fit)?;
    }
    if let Some(path) = &args.plot_json {
        write_json(path, &MohrPlot::new(&set, &fit, MOHR_POINTS), "plot JSON")?;
    }
    Ok(())
}

fn handle_synth_group(args: SynthGroupArgs, config: EngineConfig) -> Result<(), TriaxError> {
    let target = read_target(&args.target)?;
    let schedule = match args.schedule {
        ScheduleKind::Standard => PressureSchedule::Standard,
        ScheduleKind::Reference => PressureSchedule::FromReference(args.reference.unwrap_or(target.sigma_3)),
        ScheduleKind::Custom => PressureSchedule::Custom(args.pressures.clone()),
    };
    let mut noise = config.noise;
    if let Some(amplitude) = args.amplitude {
        noise.amplitude = amplitude;
    }
    let seed = resolve_seed(args.seed)?;

    let group = synthesize_group(&target, &schedule, &noise, &config.synth, seed)?;
    println!("{}", crate::report::format_group(&group));

    if let Some(dir) = &args.out_dir {
        std::fs::create_dir_all(dir)
            .map_err(|e| TriaxError::io(format!("failed to create '{}'", dir.display()), e))?;
        for member in &group.tests {
            write_series(&series_path(dir, member.target.sigma_3), &member.series)?;
        }
        write_json(&dir.join("group.json"), &group, "group JSON")?;
        info!(dir = %dir.display(), files = group.tests.len() + 1, "group written");
    }
    Ok(())
}

fn series_path(dir: &Path, sigma_3: f64) -> PathBuf {
    dir.join(format!("series_{}kpa.json", sigma_3.round() as i64))
}
