//! Optional per-thread phase accumulation.
//!
//! Phases never feed back into positions or directions. The only coupling
//! is read-only: the increment grows with the alignment of the bundle
//! state that was just advanced.

use std::f64::consts::TAU;

use rand::Rng;

use crate::config::PhaseDynamicsConfig;
use crate::error::CoreError;
use crate::kernel::BundleState;
use crate::laws::{PhaseLaw, WcohScaling};
use crate::stats::count_as_f64;

/// Reduce an angle into `[0, 2π)`.
pub fn wrap_phase(theta: f64) -> f64 {
    let wrapped = theta.rem_euclid(TAU);
    // rem_euclid can round up to exactly TAU for tiny negative inputs.
    if wrapped >= TAU { 0.0 } else { wrapped }
}

/// Phase angles of the threads of one bundle, each in `[0, 2π)`.
#[derive(Debug, Clone, PartialEq)]
pub struct PhaseState {
    phases: Vec<f64>,
}

impl PhaseState {
    /// Build a state, reducing every angle into `[0, 2π)`.
    pub fn new(phases: impl IntoIterator<Item = f64>) -> Self {
        Self {
            phases: phases.into_iter().map(wrap_phase).collect(),
        }
    }

    /// Uniform random phases, one draw per thread in thread order.
    pub fn random<R: Rng + ?Sized>(bundle_size: usize, rng: &mut R) -> Self {
        Self::new((0..bundle_size).map(|_| rng.random_range(0.0..TAU)))
    }

    /// Phase angles.
    pub fn phases(&self) -> &[f64] {
        &self.phases
    }

    /// Phase alignment `|mean(e^{iθ})|` in `[0, 1]`.
    pub fn coherence(&self) -> f64 {
        if self.phases.is_empty() {
            return 0.0;
        }
        let (re, im) = self
            .phases
            .iter()
            .fold((0.0_f64, 0.0_f64), |(re, im), theta| (re + theta.cos(), im + theta.sin()));
        re.hypot(im) / count_as_f64(self.phases.len())
    }
}

/// Rate multiplier `f_W` for a coherence horizon.
///
/// # Errors
///
/// Returns [`CoreError::InvalidParameter`] if `w_coh` is not positive.
pub fn wcoh_factor(scaling: WcohScaling, w_coh: f64) -> Result<f64, CoreError> {
    if w_coh.is_nan() || w_coh <= 0.0 {
        return Err(CoreError::invalid(
            "w_coh",
            format!("coherence horizon must be positive, got {w_coh}"),
        ));
    }
    Ok(match scaling {
        WcohScaling::None => 1.0,
        WcohScaling::Inverse => w_coh.recip(),
        WcohScaling::SqrtInverse => w_coh.sqrt().recip(),
    })
}

/// Phase increment for one step given the current bundle alignment.
///
/// # Errors
///
/// Returns [`CoreError::InvalidParameter`] if `w_coh` is not positive.
pub fn phase_increment(
    cfg: &PhaseDynamicsConfig,
    w_coh: f64,
    alignment: f64,
) -> Result<f64, CoreError> {
    match cfg.law {
        PhaseLaw::BundleStabilityV0 => {
            let params = &cfg.params;
            let f_w = wcoh_factor(params.wcoh_scaling, w_coh)?;
            Ok(params.base_rate * f_w * params.stability_weight.mul_add(alignment, 1.0))
        }
    }
}

/// Advance the phases by one step.
///
/// Returns the input unchanged when phase dynamics is disabled. Otherwise
/// every phase gains the same increment, computed from the alignment of
/// `bundle`, which must be the already-advanced bundle state.
///
/// # Errors
///
/// Returns [`CoreError::InvalidParameter`] if `w_coh` is not positive.
pub fn update(
    phase_state: PhaseState,
    bundle: &BundleState,
    w_coh: f64,
    cfg: &PhaseDynamicsConfig,
) -> Result<PhaseState, CoreError> {
    if !cfg.enabled {
        return Ok(phase_state);
    }
    let delta = phase_increment(cfg, w_coh, bundle.alignment())?;
    Ok(PhaseState::new(
        phase_state.phases.into_iter().map(|theta| theta + delta),
    ))
}
