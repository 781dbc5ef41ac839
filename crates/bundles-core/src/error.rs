//! Error types for the `bundles-core` crate.
//!
//! Every failure in the simulation core is fail-fast and non-retryable:
//! the whole batch aborts and the caller sees which parameter was bad.

/// Errors raised by configuration loading and the simulation core.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    /// A parameter or configuration value is outside its admissible domain.
    #[error("invalid parameter `{parameter}`: {reason}")]
    InvalidParameter {
        /// Dotted path of the offending parameter (e.g. `bundle_coupling.mode`).
        parameter: String,
        /// Why the value was rejected.
        reason: String,
    },

    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },
}

impl From<serde_yml::Error> for CoreError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

impl CoreError {
    /// Build a [`CoreError::InvalidParameter`] for the named parameter.
    pub fn invalid(parameter: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidParameter {
            parameter: parameter.into(),
            reason: reason.into(),
        }
    }
}
