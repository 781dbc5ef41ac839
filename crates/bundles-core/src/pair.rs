//! The `(W_coh, N)` pair key that names one scan cell.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// One cell of the scan: a coherence horizon and a bundle size.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PairKey {
    /// Coherence horizon.
    pub w_coh: f64,
    /// Threads per bundle.
    pub bundle_size: usize,
}

impl PairKey {
    /// Create a pair key.
    pub const fn new(w_coh: f64, bundle_size: usize) -> Self {
        Self { w_coh, bundle_size }
    }

    /// Directory name for this pair, e.g. `W20_N4` or `W12.5_N4`.
    ///
    /// Uses the shortest decimal that round-trips `w_coh`, so horizons that
    /// share an integer part never share a directory.
    pub fn dir_name(&self) -> String {
        format!("W{}_N{}", self.w_coh, self.bundle_size)
    }

    /// Key used in `summary.json`, e.g. `W20.0_N4`.
    pub fn summary_key(&self) -> String {
        format!("W{:?}_N{}", self.w_coh, self.bundle_size)
    }

    /// Parse either a directory name or a summary key.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidParameter`] if the text is not of the form
    /// `W<float>_N<integer>`.
    pub fn parse(text: &str) -> Result<Self, CoreError> {
        let malformed =
            || CoreError::invalid("pair", format!("`{text}` is not of the form W<W>_N<N>"));

        let (w_part, n_part) = text.split_once('_').ok_or_else(malformed)?;
        let w_coh: f64 = w_part
            .strip_prefix('W')
            .and_then(|w| w.parse().ok())
            .ok_or_else(malformed)?;
        let bundle_size: usize = n_part
            .strip_prefix('N')
            .and_then(|n| n.parse().ok())
            .ok_or_else(malformed)?;
        Ok(Self::new(w_coh, bundle_size))
    }

    /// Total order used to sort pairs: by `W_coh`, then by bundle size.
    pub fn cmp_scan_order(&self, other: &Self) -> std::cmp::Ordering {
        self.w_coh
            .total_cmp(&other.w_coh)
            .then(self.bundle_size.cmp(&other.bundle_size))
    }
}

impl fmt::Display for PairKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "W_coh={} N={}", self.w_coh, self.bundle_size)
    }
}
