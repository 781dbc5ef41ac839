//! Simulation core for coupled two-state thread bundles.
//!
//! Each thread of a bundle moves one unit per step along its current
//! direction and may flip with a slip probability set by the coherence
//! horizon `W_coh`. Threads of one bundle can be coupled through their
//! mean direction, and can optionally carry a phase that accumulates at a
//! rate tied to bundle alignment.
//!
//! # Modules
//!
//! - [`config`] -- YAML configuration loading into strongly-typed structs.
//! - [`laws`] -- Closed enums for every law selector in the configuration.
//! - [`pair`] -- The `(W_coh, N)` key and its directory/summary spellings.
//! - [`kernel`] -- [`BundleKernel`] trait, bundle state, and the soft-rudder
//!   step with its coupling modes.
//! - [`phase`] -- Per-thread phase accumulation and phase coherence.
//! - [`seed`] -- Per-member random sub-streams.
//! - [`ensemble`] -- Ensemble driver producing a [`RunResult`] per pair.
//! - [`lifetime`] -- Evaporation detection on alignment series.
//! - [`persistence`] -- Run lengths of the mean-direction sign.
//! - [`stats`] -- Small descriptive statistics shared by the analysis crate.
//! - [`error`] -- [`CoreError`].
//!
//! [`BundleKernel`]: kernel::BundleKernel
//! [`RunResult`]: ensemble::RunResult
//! [`CoreError`]: error::CoreError

pub mod config;
pub mod ensemble;
pub mod error;
pub mod kernel;
pub mod laws;
pub mod lifetime;
pub mod pair;
pub mod persistence;
pub mod phase;
pub mod seed;
pub mod stats;

pub use config::TopLevelConfig;
pub use ensemble::{Execution, RunResult, run_pair};
pub use error::CoreError;
pub use pair::PairKey;
