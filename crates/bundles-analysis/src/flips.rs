//! Flip-count distribution `P(k)` and the effective decay rate `κ_eff`.

use bundles_core::stats::count_as_f64;

/// Regulariser added to both probabilities in `κ_eff`.
pub const EPSILON: f64 = 1e-12;

/// Empirical distribution of per-step flip counts over an ensemble.
#[derive(Debug, Clone, PartialEq)]
pub struct FlipDistribution {
    counts: Vec<usize>,
    total: usize,
}

impl FlipDistribution {
    /// Tally every member-step of `flips`.
    pub fn from_series<S: AsRef<[usize]>>(flips: &[S]) -> Self {
        let mut counts: Vec<usize> = Vec::new();
        let mut total = 0_usize;
        for &k in flips.iter().flat_map(AsRef::as_ref) {
            if k >= counts.len() {
                counts.resize(k.saturating_add(1), 0);
            }
            if let Some(slot) = counts.get_mut(k) {
                *slot = slot.saturating_add(1);
            }
            total = total.saturating_add(1);
        }
        Self { counts, total }
    }

    /// Number of member-steps tallied.
    pub const fn total(&self) -> usize {
        self.total
    }

    /// Largest flip count observed, if any step was tallied.
    pub fn max_flips(&self) -> Option<usize> {
        self.counts.len().checked_sub(1)
    }

    /// `P(k)`; zero for counts never observed or an empty tally.
    pub fn probability(&self, k: usize) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        let count = self.counts.get(k).copied().unwrap_or(0);
        count_as_f64(count) / count_as_f64(self.total)
    }

    /// `P(k)` for `k = 0..=max_flips`.
    pub fn probabilities(&self) -> Vec<f64> {
        (0..self.counts.len()).map(|k| self.probability(k)).collect()
    }

    /// `κ_eff` of this distribution.
    pub fn kappa_eff(&self) -> f64 {
        kappa_eff(self.probability(0), self.probability(1))
    }
}

/// `ln((P0 + ε) / (P1 + ε))`, or `+∞` when `P1 < ε`.
pub fn kappa_eff(p0: f64, p1: f64) -> f64 {
    if p1 < EPSILON {
        return f64::INFINITY;
    }
    ((p0 + EPSILON) / (p1 + EPSILON)).ln()
}
