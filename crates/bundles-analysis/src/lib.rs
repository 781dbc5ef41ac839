//! Post-processing of bundle scans.
//!
//! Consumes the [`RunResult`] arrays produced by `bundles-core` and reduces
//! them to per-pair summaries and cross-pair scaling fits.
//!
//! # Modules
//!
//! - [`spectral`] -- Welch PSD estimation and band amplitudes.
//! - [`flips`] -- Flip-count distribution and `κ_eff`.
//! - [`summary`] -- [`PairSummary`] and [`analyse_pair`].
//! - [`scaling`] -- `β_COM(N)` fits and amplitude suppression ratios.
//! - [`error`] -- [`AnalysisError`].
//!
//! [`RunResult`]: bundles_core::ensemble::RunResult
//! [`PairSummary`]: summary::PairSummary
//! [`analyse_pair`]: summary::analyse_pair
//! [`AnalysisError`]: error::AnalysisError

pub mod error;
pub mod flips;
pub mod scaling;
pub mod spectral;
pub mod summary;

pub use error::AnalysisError;
pub use scaling::{ScalingReport, scaling_report};
pub use spectral::{Spectrum, WelchEstimator, amplitude_from_band, welch_psd};
pub use summary::{PairSummary, analyse_pair};
