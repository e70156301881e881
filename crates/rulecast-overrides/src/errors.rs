//! Override error types.

use std::io;

/// Errors that abort an override merge before any output is produced.
#[derive(Debug, thiserror::Error)]
pub enum OverrideError {
    /// A config field has the wrong shape or an unrecognized value.
    #[error("invalid override config at `{field}`: {message}")]
    InvalidConfig {
        /// Dotted path of the offending field.
        field: String,
        /// What is wrong with it.
        message: String,
    },

    /// Config file is not valid JSON.
    #[error("override config is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// Filesystem error reading the config file.
    #[error("override config I/O error: {0}")]
    Io(#[from] io::Error),
}

impl OverrideError {
    pub(crate) fn invalid(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Convenience alias for override results.
pub type Result<T> = std::result::Result<T, OverrideError>;
