//! Soft-rudder thread kernel and bundle coupling.
//!
//! Each thread carries a position and a direction of exactly `+1` or `-1`.
//! Per step a thread either keeps its direction (with its stay probability)
//! or reverses it, then moves one unit along the new direction. Coupling is
//! mean-field: all threads of a bundle share one stay probability, raised
//! above the uncoupled baseline by the bundle's alignment
//! `S_v = |mean(direction)|`.
//!
//! # Draw order
//!
//! [`step`] consumes exactly one uniform `[0, 1)` draw per thread, in thread
//! order. Reproducibility of a member's trajectory rests on that contract.

use rand::Rng;

use crate::config::{BundleCouplingConfig, KernelConfig};
use crate::error::CoreError;
use crate::laws::{CouplingMode, KernelKind, SlipForm};
use crate::stats::count_as_f64;

/// Direction of one thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Moving toward increasing position.
    Forward,
    /// Moving toward decreasing position.
    Backward,
}

impl Direction {
    /// The direction as a signed unit: `+1` or `-1`.
    pub const fn sign(self) -> i64 {
        match self {
            Self::Forward => 1,
            Self::Backward => -1,
        }
    }

    /// The direction as a unit step.
    pub const fn unit(self) -> f64 {
        match self {
            Self::Forward => 1.0,
            Self::Backward => -1.0,
        }
    }

    /// The opposite direction.
    #[must_use]
    pub const fn reversed(self) -> Self {
        match self {
            Self::Forward => Self::Backward,
            Self::Backward => Self::Forward,
        }
    }

    /// Draw a direction with a fair coin.
    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Self {
        if rng.random_bool(0.5) { Self::Forward } else { Self::Backward }
    }
}

/// Positions and directions of the `N` threads of one bundle.
///
/// `N` is fixed for the lifetime of a state; advancing produces a new state.
#[derive(Debug, Clone, PartialEq)]
pub struct BundleState {
    positions: Vec<f64>,
    directions: Vec<Direction>,
}

impl BundleState {
    /// Build a state from explicit positions and directions.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidParameter`] if the bundle is empty or the
    /// two sequences differ in length.
    pub fn new(positions: Vec<f64>, directions: Vec<Direction>) -> Result<Self, CoreError> {
        if directions.is_empty() {
            return Err(CoreError::invalid("bundle_size", "a bundle needs at least one thread"));
        }
        if positions.len() != directions.len() {
            return Err(CoreError::invalid(
                "bundle_state",
                format!(
                    "{} positions but {} directions",
                    positions.len(),
                    directions.len()
                ),
            ));
        }
        Ok(Self { positions, directions })
    }

    /// All threads at the origin with fair-coin directions.
    ///
    /// Consumes one draw per thread, in thread order.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidParameter`] if `bundle_size` is zero.
    pub fn at_origin<R: Rng + ?Sized>(bundle_size: usize, rng: &mut R) -> Result<Self, CoreError> {
        let directions = (0..bundle_size).map(|_| Direction::random(rng)).collect();
        Self::new(vec![0.0; bundle_size], directions)
    }

    /// Number of threads.
    pub fn len(&self) -> usize {
        self.directions.len()
    }

    /// Always `false`: a bundle has at least one thread.
    pub fn is_empty(&self) -> bool {
        self.directions.is_empty()
    }

    /// Thread positions.
    pub fn positions(&self) -> &[f64] {
        &self.positions
    }

    /// Thread directions.
    pub fn directions(&self) -> &[Direction] {
        &self.directions
    }

    /// Sum of direction signs, exact.
    fn direction_sum(&self) -> i64 {
        self.directions.iter().map(|d| d.sign()).sum()
    }

    /// Mean direction in `[-1, 1]`.
    pub fn mean_direction(&self) -> f64 {
        #[allow(clippy::cast_precision_loss)]
        let sum = self.direction_sum() as f64;
        sum / count_as_f64(self.len())
    }

    /// Alignment indicator `S_v = |mean(direction)|` in `[0, 1]`.
    pub fn alignment(&self) -> f64 {
        self.mean_direction().abs()
    }

    /// Sign of the mean direction: `+1`, `-1`, or `0` when exactly balanced.
    pub fn direction_sign(&self) -> i8 {
        match self.direction_sum().cmp(&0) {
            std::cmp::Ordering::Greater => 1,
            std::cmp::Ordering::Less => -1,
            std::cmp::Ordering::Equal => 0,
        }
    }

    /// Centre-of-mass position.
    pub fn center_of_mass(&self) -> f64 {
        self.positions.iter().sum::<f64>() / count_as_f64(self.len())
    }
}

/// Uncoupled slip probability `q(W_coh)`, clipped to `[0, 1]`.
///
/// # Errors
///
/// Returns [`CoreError::InvalidParameter`] if `w_coh` is not positive.
pub fn slip_probability(w_coh: f64, kernel: &KernelConfig) -> Result<f64, CoreError> {
    if w_coh.is_nan() || w_coh <= 0.0 {
        return Err(CoreError::invalid(
            "w_coh",
            format!("coherence horizon must be positive, got {w_coh}"),
        ));
    }
    let slip = &kernel.slip_law;
    let q = match slip.form {
        SlipForm::PowerLaw => slip.k_prefactor / w_coh.powf(slip.alpha),
    };
    Ok(q.clamp(0.0, 1.0))
}

/// Apply the coupling rule to a base stay probability.
///
/// `bundle_size == 1` always yields the base probability.
pub fn coupled_stay_probability(
    mode: CouplingMode,
    base: f64,
    alignment: f64,
    strength: f64,
    bundle_size: usize,
) -> f64 {
    if bundle_size == 1 {
        return base;
    }
    let boost = match mode {
        CouplingMode::Independent => return base,
        CouplingMode::SharedBias => alignment,
        CouplingMode::StrongLock => alignment * alignment,
    };
    strength.mul_add(boost * (1.0 - base), base).clamp(0.0, 1.0)
}

/// Stay probability shared by every thread of `state` this step.
///
/// # Errors
///
/// Returns [`CoreError::InvalidParameter`] if `w_coh` is not positive.
pub fn shared_stay_probability(
    w_coh: f64,
    state: &BundleState,
    kernel: &KernelConfig,
    coupling: &BundleCouplingConfig,
) -> Result<f64, CoreError> {
    let base = 1.0 - slip_probability(w_coh, kernel)?;
    Ok(coupled_stay_probability(
        coupling.mode,
        base,
        state.alignment(),
        coupling.coupling_strength,
        state.len(),
    ))
}

/// Effective stay probability of each thread of `state`.
///
/// Every entry is equal; the vector form mirrors the per-thread comparison
/// performed by [`step`].
///
/// # Errors
///
/// Returns [`CoreError::InvalidParameter`] if `w_coh` is not positive.
pub fn effective_stay_probability(
    w_coh: f64,
    state: &BundleState,
    kernel: &KernelConfig,
    coupling: &BundleCouplingConfig,
) -> Result<Vec<f64>, CoreError> {
    let p_stay = shared_stay_probability(w_coh, state, kernel, coupling)?;
    Ok(vec![p_stay; state.len()])
}

/// Advance `state` one step with a given shared stay probability.
///
/// Returns the new state and the number of threads that flipped.
pub fn advance<R: Rng + ?Sized>(
    state: &BundleState,
    p_stay: f64,
    rng: &mut R,
) -> (BundleState, usize) {
    let mut flips = 0_usize;
    let mut positions = Vec::with_capacity(state.len());
    let mut directions = Vec::with_capacity(state.len());

    for (&x, &d) in state.positions.iter().zip(&state.directions) {
        let draw: f64 = rng.random();
        let next = if draw < p_stay {
            d
        } else {
            flips = flips.saturating_add(1);
            d.reversed()
        };
        positions.push(x + next.unit());
        directions.push(next);
    }

    (BundleState { positions, directions }, flips)
}

/// Advance a bundle by one step under the configured coupling.
///
/// Draws one uniform value per thread; a draw below the stay probability
/// keeps the direction, otherwise it flips. Returns the new state and the
/// flip count, which lies in `[0, N]`.
///
/// # Errors
///
/// Returns [`CoreError::InvalidParameter`] if `w_coh` is not positive.
pub fn step<R: Rng + ?Sized>(
    state: &BundleState,
    w_coh: f64,
    kernel: &KernelConfig,
    coupling: &BundleCouplingConfig,
    rng: &mut R,
) -> Result<(BundleState, usize), CoreError> {
    let p_stay = shared_stay_probability(w_coh, state, kernel, coupling)?;
    Ok(advance(state, p_stay, rng))
}

/// A bundle update rule bound to one pair's parameters.
///
/// Implementations are shared across ensemble members, possibly from
/// several threads at once.
pub trait BundleKernel: Sync {
    /// Advance `state` by one step, returning the new state and flip count.
    fn step(&self, state: &BundleState, rng: &mut dyn rand::RngCore) -> (BundleState, usize);
}

/// Soft-rudder kernel with the slip probability resolved once per pair.
#[derive(Debug, Clone)]
pub struct SoftRudderKernel {
    base_stay: f64,
    mode: CouplingMode,
    strength: f64,
}

impl SoftRudderKernel {
    /// Resolve the kernel for one coherence horizon.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidParameter`] if `w_coh` is not positive.
    pub fn new(
        w_coh: f64,
        kernel: &KernelConfig,
        coupling: &BundleCouplingConfig,
    ) -> Result<Self, CoreError> {
        let q = slip_probability(w_coh, kernel)?;
        Ok(Self {
            base_stay: 1.0 - q,
            mode: coupling.mode,
            strength: coupling.coupling_strength,
        })
    }

    /// Uncoupled stay probability `1 - q`.
    pub const fn base_stay(&self) -> f64 {
        self.base_stay
    }
}

impl BundleKernel for SoftRudderKernel {
    fn step(&self, state: &BundleState, rng: &mut dyn rand::RngCore) -> (BundleState, usize) {
        let p_stay = coupled_stay_probability(
            self.mode,
            self.base_stay,
            state.alignment(),
            self.strength,
            state.len(),
        );
        advance(state, p_stay, rng)
    }
}

/// Build the kernel named by `kernel.type`.
///
/// # Errors
///
/// Returns [`CoreError::InvalidParameter`] if `w_coh` is not positive.
pub fn build_kernel(
    w_coh: f64,
    kernel: &KernelConfig,
    coupling: &BundleCouplingConfig,
) -> Result<Box<dyn BundleKernel>, CoreError> {
    match kernel.kind {
        KernelKind::SoftRudderBundle => {
            Ok(Box::new(SoftRudderKernel::new(w_coh, kernel, coupling)?))
        }
    }
}
