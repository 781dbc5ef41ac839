//! Error types for the `bundles-analysis` crate.

/// Errors raised while reducing raw arrays to summaries.
#[derive(Debug, thiserror::Error)]
pub enum AnalysisError {
    /// A parameter or input series cannot be analysed as requested.
    #[error("invalid parameter `{parameter}`: {reason}")]
    InvalidParameter {
        /// Name of the offending parameter or input.
        parameter: String,
        /// Why the value was rejected.
        reason: String,
    },
}

impl AnalysisError {
    /// Build an [`AnalysisError::InvalidParameter`] for the named parameter.
    pub fn invalid(parameter: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidParameter {
            parameter: parameter.into(),
            reason: reason.into(),
        }
    }
}
