//! Fetch error types.
//!
//! "Not found" is not an error: sources return `Ok(None)` for it. Every
//! variant here is transient from the cache's point of view and triggers
//! the stale-entry fallback.

/// Errors from a remote rule source.
#[derive(Clone, Debug, thiserror::Error, PartialEq, Eq)]
pub enum FetchError {
    /// The remote refused the request because of rate limiting.
    #[error("rate limited by remote")]
    RateLimited {
        /// Seconds until the limit resets, when the remote said so.
        retry_after_secs: Option<u64>,
    },

    /// Network failure before a response arrived.
    #[error("remote unreachable: {0}")]
    Unreachable(String),

    /// The request or the caller's deadline timed out.
    #[error("request timed out")]
    Timeout,

    /// Unexpected HTTP status.
    #[error("unexpected HTTP status {status}")]
    Http {
        /// Status code.
        status: u16,
    },
}

impl FetchError {
    /// Whether another attempt could succeed. Rate limiting is not
    /// retried: waiting out the reset would blow the request deadline.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Unreachable(_) | Self::Timeout => true,
            Self::Http { status } => *status >= 500,
            Self::RateLimited { .. } => false,
        }
    }
}

/// Convenience alias for fetch results.
pub type Result<T> = std::result::Result<T, FetchError>;
