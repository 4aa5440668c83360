//! Formatted terminal output.
//!
//! Stresses are printed in kPa, moduli in MPa. Undefined values print as `-`
//! followed by the reason, so a missing Eur is never mistaken for zero.

use crate::domain::{
    FitKind, FitResult, Outcome, SeatingStep, StiffnessFit, StiffnessMethod, TestResult,
};
use crate::synth::GroupSynthesis;

fn mpa(kpa: f64) -> String {
    format!("{:.2}", kpa / 1000.0)
}

fn outcome<T>(value: &Outcome<T>, show: impl Fn(&T) -> String) -> String {
    match value {
        Outcome::Defined(v) => show(v),
        Outcome::Undefined(reason) => format!("- ({reason:?})"),
    }
}

fn seating(step: SeatingStep) -> String {
    match step {
        SeatingStep::Detected { index } => format!("detected at sample {index}"),
        SeatingStep::NotNeeded => "not needed".to_string(),
        SeatingStep::Failed { reason } => format!("detection failed ({reason:?}), curve uncorrected"),
    }
}

/// One processed test.
pub fn format_test_result(result: &TestResult, sigma_3: f64) -> String {
    let mut out = String::new();
    out.push_str("=== triax - single test ===\n");
    out.push_str(&format!("sigma_3          : {sigma_3:.1} kPa\n"));
    out.push_str(&format!(
        "window           : [{}, {}) ({} samples)\n",
        result.window.left,
        result.window.right,
        result.window.len()
    ));
    out.push_str(&format!("seating step     : {}\n", seating(result.seating)));
    out.push_str(&format!("qf               : {:.2} kPa\n", result.qf));
    out.push_str(&format!("peak strain      : {:.4}\n", result.peak_strain));
    out.push_str(&format!(
        "E50              : {} MPa (strain50 {:.5})\n",
        mpa(result.e50),
        result.strain50
    ));
    out.push_str(&format!(
        "E                : {} MPa (samples {}..{})\n",
        mpa(result.e.value),
        result.e.indices.0,
        result.e.indices.1
    ));
    out.push_str(&format!("Eur              : {}\n", outcome(&result.eur, |v| format!("{} MPa", mpa(*v)))));
    out.push_str(&format!("Poisson's ratio  : {:.3}\n", result.poissons_ratio));
    out.push_str(&format!(
        "dilatancy angle  : {}\n",
        outcome(&result.dilatancy, |d| format!("{:.2} deg", d.value))
    ));
    out.push_str(&format!("max pore pressure: {:.2} kPa\n", result.max_pore_pressure));
    out
}

fn stiffness_line(name: &str, fit: &Outcome<StiffnessFit>, chosen: bool) -> String {
    let mark = if chosen { "*" } else { " " };
    let body = outcome(fit, |f| {
        format!("m={:.3} Eref={} MPa (p_ref {:.0} kPa)", f.m, mpa(f.e_ref), f.p_ref)
    });
    format!("{mark} {name:<12} {body}\n")
}

/// A circle group fit with both stiffness estimates; the selected one is starred.
pub fn format_fit_result(fit: &FitResult, method: StiffnessMethod) -> String {
    let mut out = String::new();
    out.push_str("=== triax - circle group ===\n");
    out.push_str(&format!("circles : {}\n", fit.n_circles));
    match fit.kind {
        FitKind::Full => {
            out.push_str(&format!("c       : {:.2} kPa\n", fit.c.unwrap_or(0.0)));
            out.push_str(&format!("fi      : {:.2} deg\n", fit.fi));
        }
        FitKind::FrictionOnly => {
            out.push_str("c       : - (needs three circles)\n");
            out.push_str(&format!("fi      : {:.2} deg (through origin)\n", fit.fi));
        }
        FitKind::FrictionRatio => {
            out.push_str("c       : 0\n");
            out.push_str(&format!("ratio   : {:.4} (qf/2 / sigma_3)\n", fit.fi));
        }
    }
    if let (Some(c), Some(fi)) = (fit.c_res, fit.fi_res) {
        out.push_str(&format!("c_res   : {c:.2} kPa\nfi_res  : {fi:.2} deg\n"));
    }

    out.push_str("\nStiffness exponent:\n");
    out.push_str(&stiffness_line(
        "plaxis",
        &fit.stiffness.plaxis,
        method == StiffnessMethod::Plaxis,
    ));
    out.push_str(&stiffness_line(
        "approximate",
        &fit.stiffness.approximate,
        method == StiffnessMethod::Approximate,
    ));
    out
}

/// Per-pressure table of a synthesized group.
pub fn format_group(group: &GroupSynthesis) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "{:>10} {:>10} {:>10} {:>10} {:>8}\n",
        "sigma_3", "qf", "E50 MPa", "Eur MPa", "samples"
    ));
    for (i, member) in group.tests.iter().enumerate() {
        let eur = member.target.eur.map(mpa).unwrap_or_else(|| "-".to_string());
        out.push_str(&format!(
            "{:>10.1} {:>10.2} {:>10} {:>10} {:>8}\n",
            group.sigma_3[i],
            group.qf[i],
            mpa(member.target.e50),
            eur,
            member.series.len()
        ));
    }
    out
}
