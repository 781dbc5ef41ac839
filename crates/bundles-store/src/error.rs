//! Error types for the storage layer.
//!
//! Every variant carries the path involved so that a failed batch points
//! straight at the offending file.

use std::path::PathBuf;

/// Errors raised while reading or writing scan outputs.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A filesystem operation failed.
    #[error("I/O error at {}: {source}", path.display())]
    Io {
        /// File or directory involved.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// A JSON document could not be written or parsed.
    #[error("JSON error in {}: {source}", path.display())]
    Json {
        /// File involved.
        path: PathBuf,
        /// The underlying serialization error.
        source: serde_json::Error,
    },

    /// No archive exists for a requested pair.
    #[error("no archive for pair {pair} under {}", root.display())]
    MissingPair {
        /// Directory name of the pair.
        pair: String,
        /// Output root that was searched.
        root: PathBuf,
    },

    /// A directory or summary key does not name a `(W_coh, N)` pair.
    #[error("`{0}` is not a pair name of the form W<W>_N<N>")]
    InvalidPairName(String),
}

impl StoreError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn json(path: impl Into<PathBuf>, source: serde_json::Error) -> Self {
        Self::Json {
            path: path.into(),
            source,
        }
    }
}
