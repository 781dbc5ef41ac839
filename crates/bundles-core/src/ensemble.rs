//! Ensemble driver for one `(W_coh, N)` pair.
//!
//! [`run_pair`] simulates `n_ensembles` independent bundles for
//! `floor(steps_per_wcoh · W_coh)` steps each and collects the per-member
//! series into a [`RunResult`].
//!
//! # Per-step order
//!
//! For each step, *before* advancing: record the centre-of-mass position,
//! the alignment `S_v`, the sign of the mean direction, and (if enabled) the
//! phase coherence. Then advance the bundle and record the flip count, then
//! advance the phases using the *new* bundle state.
//!
//! # Randomness
//!
//! Each member draws from its own sub-stream (see [`crate::seed`]): `N`
//! direction draws, then `N` phase draws when phase dynamics is enabled,
//! then `N` draws per step. Members are independent, so
//! [`Execution::Parallel`] and [`Execution::Sequential`] yield bit-identical
//! results.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::TopLevelConfig;
use crate::error::CoreError;
use crate::kernel::{BundleKernel, BundleState, build_kernel};
use crate::lifetime::{self, Lifetime};
use crate::pair::PairKey;
use crate::persistence::{self, Persistence};
use crate::phase::{self, PhaseState};
use crate::seed;

/// How ensemble members are scheduled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Execution {
    /// One member after another on the calling thread.
    Sequential,
    /// Members spread over the rayon thread pool.
    #[default]
    Parallel,
}

/// Everything recorded for one ensemble member.
#[derive(Debug, Clone, PartialEq)]
pub struct MemberTrace {
    /// Centre-of-mass acceleration, length `steps - 2`.
    pub acceleration: Vec<f64>,
    /// Threads flipped at each step.
    pub flips: Vec<usize>,
    /// Alignment `S_v` before each step.
    pub alignment: Vec<f64>,
    /// Phase coherence before each step, when phase dynamics is enabled.
    pub phase_coherence: Option<Vec<f64>>,
    /// Phase angles after the last step, when phase dynamics is enabled.
    pub final_phases: Option<PhaseState>,
    /// Evaporation verdict.
    pub lifetime: Lifetime,
    /// Run-length statistics of the mean-direction sign.
    pub persistence: Persistence,
}

/// Raw per-member arrays for one pair.
///
/// All series of one pair share the same step count. Field names on the
/// wire follow the archive convention (`Sv`, `L_persist_mean`, ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunResult {
    /// The pair these arrays belong to.
    #[serde(flatten)]
    pub key: PairKey,
    /// Steps simulated per member.
    pub steps: usize,
    /// Acceleration series, `[n_ens][steps - 2]`.
    pub acceleration: Vec<Vec<f64>>,
    /// Flip counts, `[n_ens][steps]`.
    pub flips: Vec<Vec<usize>>,
    /// Alignment series, `[n_ens][steps]`.
    #[serde(rename = "Sv")]
    pub alignment: Vec<Vec<f64>>,
    /// Lifetime per member.
    pub lifetimes: Vec<usize>,
    /// Survival flag per member.
    pub survived: Vec<bool>,
    /// Mean persistence length per member.
    #[serde(rename = "L_persist_mean")]
    pub persistence_mean: Vec<f64>,
    /// Median persistence length per member.
    #[serde(rename = "L_persist_median")]
    pub persistence_median: Vec<f64>,
    /// Phase coherence series, `[n_ens][steps]`, only with phase dynamics.
    #[serde(rename = "Stheta", default, skip_serializing_if = "Option::is_none")]
    pub phase_coherence: Option<Vec<Vec<f64>>>,
}

impl RunResult {
    /// Assemble a result from member traces in member order.
    pub fn from_traces(key: PairKey, steps: usize, traces: Vec<MemberTrace>) -> Self {
        let n = traces.len();
        let with_phase = traces.iter().all(|t| t.phase_coherence.is_some()) && n > 0;

        let mut result = Self {
            key,
            steps,
            acceleration: Vec::with_capacity(n),
            flips: Vec::with_capacity(n),
            alignment: Vec::with_capacity(n),
            lifetimes: Vec::with_capacity(n),
            survived: Vec::with_capacity(n),
            persistence_mean: Vec::with_capacity(n),
            persistence_median: Vec::with_capacity(n),
            phase_coherence: with_phase.then(|| Vec::with_capacity(n)),
        };

        for trace in traces {
            result.acceleration.push(trace.acceleration);
            result.flips.push(trace.flips);
            result.alignment.push(trace.alignment);
            result.lifetimes.push(trace.lifetime.steps);
            result.survived.push(trace.lifetime.survived);
            result.persistence_mean.push(trace.persistence.mean);
            result.persistence_median.push(trace.persistence.median);
            if let (Some(all), Some(series)) =
                (result.phase_coherence.as_mut(), trace.phase_coherence)
            {
                all.push(series);
            }
        }
        result
    }

    /// Number of ensemble members.
    pub fn n_members(&self) -> usize {
        self.lifetimes.len()
    }
}

/// First difference `x[t+1] - x[t]`.
pub fn first_difference(series: &[f64]) -> Vec<f64> {
    series
        .iter()
        .zip(series.iter().skip(1))
        .map(|(a, b)| b - a)
        .collect()
}

/// Simulate one ensemble member.
///
/// # Errors
///
/// Returns [`CoreError::InvalidParameter`] for an empty bundle or a
/// non-positive horizon.
pub fn simulate_member(
    cfg: &TopLevelConfig,
    kernel: &dyn BundleKernel,
    key: PairKey,
    steps: usize,
    member: usize,
) -> Result<MemberTrace, CoreError> {
    let mut rng = seed::member_rng(cfg.random_seed, &key, member);
    let phase_cfg = &cfg.phase_dynamics;

    let mut bundle = BundleState::at_origin(key.bundle_size, &mut rng)?;
    let mut phases = phase_cfg
        .enabled
        .then(|| PhaseState::random(key.bundle_size, &mut rng));

    let mut com = Vec::with_capacity(steps);
    let mut alignment = Vec::with_capacity(steps);
    let mut signs = Vec::with_capacity(steps);
    let mut flips = Vec::with_capacity(steps);
    let mut coherence = phases.as_ref().map(|_| Vec::with_capacity(steps));

    for _ in 0..steps {
        com.push(bundle.center_of_mass());
        alignment.push(bundle.alignment());
        signs.push(bundle.direction_sign());
        if let (Some(series), Some(state)) = (coherence.as_mut(), phases.as_ref()) {
            series.push(state.coherence());
        }

        let (next, flipped) = kernel.step(&bundle, &mut rng);
        bundle = next;
        flips.push(flipped);

        if let Some(state) = phases.take() {
            phases = Some(phase::update(state, &bundle, key.w_coh, phase_cfg)?);
        }
    }

    let velocity = first_difference(&com);
    let acceleration = first_difference(&velocity);
    let lifetime_cfg = &cfg.analysis.lifetime;
    let lifetime = lifetime::detect(&alignment, lifetime_cfg.f_min, lifetime_cfg.evap_window);
    let persistence = persistence::analyze(&signs);

    debug!(
        w_coh = key.w_coh,
        bundle_size = key.bundle_size,
        member,
        lifetime = lifetime.steps,
        survived = lifetime.survived,
        persistence_mean = persistence.mean,
        "Member simulated"
    );

    Ok(MemberTrace {
        acceleration,
        flips,
        alignment,
        phase_coherence: coherence,
        final_phases: phases,
        lifetime,
        persistence,
    })
}

/// Simulate every ensemble member of one pair.
///
/// # Errors
///
/// Returns [`CoreError::InvalidParameter`] if the pair yields fewer than two
/// steps, has an empty bundle, or a non-positive horizon.
pub fn run_pair(
    cfg: &TopLevelConfig,
    key: PairKey,
    execution: Execution,
) -> Result<RunResult, CoreError> {
    let steps = cfg.ensemble.steps_for(key.w_coh)?;
    if key.bundle_size == 0 {
        return Err(CoreError::invalid("bundle_sizes", "bundle size must be at least 1"));
    }
    let kernel = build_kernel(key.w_coh, &cfg.kernel, &cfg.bundle_coupling)?;
    let n_ensembles = cfg.ensemble.n_ensembles;

    info!(
        w_coh = key.w_coh,
        bundle_size = key.bundle_size,
        steps,
        n_ensembles,
        coupling = %cfg.bundle_coupling.mode,
        coupling_strength = cfg.bundle_coupling.coupling_strength,
        phase_dynamics = cfg.phase_dynamics.enabled,
        ?execution,
        "Pair starting"
    );

    let simulate = |member: usize| simulate_member(cfg, kernel.as_ref(), key, steps, member);
    let traces: Vec<MemberTrace> = match execution {
        Execution::Sequential => (0..n_ensembles).map(simulate).collect::<Result<_, _>>()?,
        Execution::Parallel => (0..n_ensembles)
            .into_par_iter()
            .map(simulate)
            .collect::<Result<_, _>>()?,
    };

    let result = RunResult::from_traces(key, steps, traces);
    let survivors = result.survived.iter().filter(|&&s| s).count();
    info!(
        w_coh = key.w_coh,
        bundle_size = key.bundle_size,
        survivors,
        n_ensembles,
        "Pair complete"
    );
    Ok(result)
}
