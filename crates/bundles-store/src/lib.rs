//! Storage layer for bundle scans.
//!
//! Everything here is plain JSON on the local filesystem, laid out by
//! [`OutputLayout`].
//!
//! # Modules
//!
//! - [`layout`] -- [`OutputLayout`] and pair directory discovery.
//! - [`archive`] -- Per-pair `timeseries.json` archives.
//! - [`metadata`] -- [`RunMetadata`] and its [`RunId`].
//! - [`reports`] -- `summary.json` and `scaling.json`.
//! - [`error`] -- [`StoreError`].
//!
//! [`OutputLayout`]: layout::OutputLayout
//! [`RunMetadata`]: metadata::RunMetadata
//! [`RunId`]: metadata::RunId
//! [`StoreError`]: error::StoreError

pub mod archive;
pub mod error;
pub mod layout;
pub mod metadata;
pub mod reports;

pub use archive::{read_run, write_run};
pub use error::StoreError;
pub use layout::OutputLayout;
pub use metadata::{RunId, RunMetadata, read_metadata, write_metadata};
pub use reports::{read_scaling, read_summary, write_scaling, write_summary};
