//! Run metadata: identifier, timestamp, version, and the full configuration.
//!
//! `metadata.json` is written before any pair is simulated, so later
//! analysis steps can rebuild every parameter without the YAML file.

use bundles_core::config::TopLevelConfig;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::archive::{read_json, write_json};
use crate::error::StoreError;
use crate::layout::OutputLayout;

/// Identifier of one scan run (UUID v7, time-ordered).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RunId(pub Uuid);

impl RunId {
    /// Create a new identifier using UUID v7 (time-ordered).
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// Return the inner [`Uuid`] value.
    pub const fn into_inner(self) -> Uuid {
        self.0
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl core::fmt::Display for RunId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Contents of `metadata.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunMetadata {
    /// Run identifier.
    pub run_id: RunId,
    /// When the run started (UTC).
    pub created_at: DateTime<Utc>,
    /// Version of the package that produced the outputs.
    pub package_version: String,
    /// Configuration the run used.
    pub config: TopLevelConfig,
}

impl RunMetadata {
    /// Metadata for a run starting now.
    pub fn new(config: TopLevelConfig) -> Self {
        Self {
            run_id: RunId::new(),
            created_at: Utc::now(),
            package_version: env!("CARGO_PKG_VERSION").to_owned(),
            config,
        }
    }
}

/// Write `metadata.json`, creating the output root if needed.
///
/// # Errors
///
/// Returns [`StoreError::Io`] or [`StoreError::Json`] on write failure.
pub fn write_metadata(layout: &OutputLayout, metadata: &RunMetadata) -> Result<(), StoreError> {
    layout.create_root()?;
    write_json(&layout.metadata_path(), metadata, true)?;
    info!(
        run_id = %metadata.run_id,
        model = %metadata.config.model_name,
        root = %layout.root().display(),
        "Run metadata written"
    );
    Ok(())
}

/// Read `metadata.json`.
///
/// # Errors
///
/// Returns [`StoreError::Io`] or [`StoreError::Json`] on read failure.
pub fn read_metadata(layout: &OutputLayout) -> Result<RunMetadata, StoreError> {
    read_json(&layout.metadata_path())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn run_ids_are_time_ordered() {
        let first = RunId::new();
        let second = RunId::new();
        assert!(first <= second);
        assert_eq!(first.into_inner().get_version_num(), 7);
    }

    #[test]
    fn metadata_serializes_config_tags_as_strings() {
        let metadata = RunMetadata::new(TopLevelConfig::default());
        let json = serde_json::to_string(&metadata).unwrap();
        assert!(json.contains("\"soft_rudder_bundle\""));
        assert!(json.contains("\"package_version\""));

        let back: RunMetadata = serde_json::from_str(&json).unwrap();
        assert_eq!(back, metadata);
    }
}
