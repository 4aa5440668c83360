//! Synthesis of a whole test group: one noised circle set driving one
//! synthetic test per confining pressure.

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::domain::{
    MechanicalTarget, NoiseConfig, PressureSchedule, RawTestSeries, StiffnessFit, SynthConfig,
};
use crate::error::TriaxError;
use crate::fit::mohr::MohrCoulomb;
use crate::fit::stiffness::e50_at;
use crate::synth::circles::CircleNoiser;
use crate::synth::shape::DrawParams;
use crate::synth::single::TestSynthesizer;

/// One synthesized test of a group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupMember {
    pub target: MechanicalTarget,
    pub params: DrawParams,
    pub series: RawTestSeries,
}

/// Output of [`synthesize_group`], ordered by confining pressure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupSynthesis {
    pub sigma_3: Vec<f64>,
    pub qf: Vec<f64>,
    pub tests: Vec<GroupMember>,
}

/// Per-pressure target derived from the group target.
///
/// E50 follows the power law with exponent `target.m` referenced to
/// `target.sigma_3`; without an exponent it scales with qf. Eur keeps its ratio
/// to E50.
pub fn member_target(target: &MechanicalTarget, sigma_3: f64, qf: f64) -> Result<MechanicalTarget, TriaxError> {
    let e50 = match target.m {
        Some(m) => {
            let law = StiffnessFit {
                m,
                e_ref: target.e50,
                p_ref: target.sigma_3,
            };
            let strength = MohrCoulomb {
                c: target.c,
                fi: target.fi,
            };
            e50_at(&law, strength, sigma_3).ok_or_else(|| {
                TriaxError::invalid_input(format!("stiffness law undefined at sigma_3={sigma_3}"))
            })?
        }
        None => target.e50 * qf / target.qf,
    };
    let member = MechanicalTarget {
        qf,
        e50,
        sigma_3,
        eur: target.eur.map(|eur| eur * e50 / target.e50),
        ..target.clone()
    };
    member.validate()?;
    Ok(member)
}

/// Synthesize every test of a group.
///
/// Tests get consecutive seeds after `seed`, so a group is reproducible.
pub fn synthesize_group(
    target: &MechanicalTarget,
    schedule: &PressureSchedule,
    noise: &NoiseConfig,
    synth: &SynthConfig,
    seed: u64,
) -> Result<GroupSynthesis, TriaxError> {
    target.validate()?;
    let sigma_3 = schedule.sigma_3_values()?;
    let qf = CircleNoiser::new(noise.clone(), seed).synthesize(target.c, target.fi, &sigma_3)?;

    let mut tests = Vec::with_capacity(sigma_3.len());
    for (i, (&s3, &q)) in sigma_3.iter().zip(&qf).enumerate() {
        let member = member_target(target, s3, q)?;
        let mut synthesizer = TestSynthesizer::new(synth.clone(), seed.wrapping_add(i as u64 + 1));
        let series = synthesizer.synthesize(&member)?;
        let params = synthesizer
            .draw_params()
            .copied()
            .ok_or_else(|| TriaxError::InsufficientData("synthesizer kept no draw".into()))?;
        tests.push(GroupMember {
            target: member,
            params,
            series,
        });
    }

    info!(n = tests.len(), c = target.c, fi = target.fi, "test group synthesized");
    Ok(GroupSynthesis { sigma_3, qf, tests })
}
