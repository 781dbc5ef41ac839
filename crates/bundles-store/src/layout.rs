//! Output directory layout.
//!
//! ```text
//! <output_dir>/
//!   metadata.json
//!   summary.json
//!   scaling.json
//!   W<W>_N<N>/timeseries.json
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use bundles_core::pair::PairKey;
use tracing::warn;

use crate::error::StoreError;

/// Run metadata file name.
pub const METADATA_FILE: &str = "metadata.json";
/// Per-pair archive file name.
pub const ARCHIVE_FILE: &str = "timeseries.json";
/// Per-pair summary table file name.
pub const SUMMARY_FILE: &str = "summary.json";
/// Scaling report file name.
pub const SCALING_FILE: &str = "scaling.json";

/// Paths of every file a scan reads or writes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputLayout {
    root: PathBuf,
}

impl OutputLayout {
    /// Layout rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Output root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// `metadata.json`.
    pub fn metadata_path(&self) -> PathBuf {
        self.root.join(METADATA_FILE)
    }

    /// `summary.json`.
    pub fn summary_path(&self) -> PathBuf {
        self.root.join(SUMMARY_FILE)
    }

    /// `scaling.json`.
    pub fn scaling_path(&self) -> PathBuf {
        self.root.join(SCALING_FILE)
    }

    /// Directory of one pair.
    pub fn pair_dir(&self, key: &PairKey) -> PathBuf {
        self.root.join(key.dir_name())
    }

    /// Archive of one pair.
    pub fn archive_path(&self, key: &PairKey) -> PathBuf {
        self.pair_dir(key).join(ARCHIVE_FILE)
    }

    /// Create the output root and any missing parents.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Io`] if the directory cannot be created.
    pub fn create_root(&self) -> Result<(), StoreError> {
        fs::create_dir_all(&self.root).map_err(|e| StoreError::io(&self.root, e))
    }

    /// Pairs with an archive under the root, sorted by `W_coh` then `N`.
    ///
    /// Directories whose name does not parse as a pair, or that hold no
    /// archive, are skipped with a warning.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Io`] if the root cannot be listed.
    pub fn discover_pairs(&self) -> Result<Vec<PairKey>, StoreError> {
        let entries = fs::read_dir(&self.root).map_err(|e| StoreError::io(&self.root, e))?;

        let mut pairs = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| StoreError::io(&self.root, e))?;
            let path = entry.path();
            if !path.is_dir() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().into_owned();
            let key = match pair_from_dir_name(&name) {
                Ok(key) => key,
                Err(e) => {
                    warn!(dir = %path.display(), error = %e, "Skipping unrecognised directory");
                    continue;
                }
            };
            if !path.join(ARCHIVE_FILE).is_file() {
                warn!(dir = %path.display(), "Skipping pair directory without an archive");
                continue;
            }
            pairs.push(key);
        }

        pairs.sort_by(PairKey::cmp_scan_order);
        Ok(pairs)
    }
}

/// Parse a pair directory name such as `W20_N4`.
///
/// # Errors
///
/// Returns [`StoreError::InvalidPairName`] if the name is not of the form
/// `W<W>_N<N>`.
pub fn pair_from_dir_name(name: &str) -> Result<PairKey, StoreError> {
    PairKey::parse(name)
        .ok()
        .ok_or_else(|| StoreError::InvalidPairName(name.to_owned()))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn paths_follow_pair_names() {
        let layout = OutputLayout::new("/tmp/scan");
        let key = PairKey::new(12.5, 4);
        assert_eq!(layout.pair_dir(&key), PathBuf::from("/tmp/scan/W12.5_N4"));
        assert_eq!(
            layout.archive_path(&key),
            PathBuf::from("/tmp/scan/W12.5_N4/timeseries.json")
        );
        assert_eq!(layout.summary_path(), PathBuf::from("/tmp/scan/summary.json"));
    }

    #[test]
    fn dir_names_parse_or_fail_cleanly() {
        assert_eq!(pair_from_dir_name("W20_N4").unwrap(), PairKey::new(20.0, 4));
        assert!(matches!(
            pair_from_dir_name("plots"),
            Err(StoreError::InvalidPairName(name)) if name == "plots"
        ));
    }
}
