//! Hook errors.
//!
//! These never leave the crate's public entry point: the orchestrator maps
//! each one to a degraded [`HookOutcome`](crate::types::HookOutcome).

use rulecast_selection::SelectionError;

/// Internal pipeline failure.
#[derive(Debug, thiserror::Error)]
pub enum HookError {
    /// Selection limits from settings were rejected.
    #[error("invalid selection limits: {0}")]
    InvalidLimits(#[from] SelectionError),

    /// A blocking stage panicked or was cancelled.
    #[error("pipeline task failed: {0}")]
    Task(#[from] tokio::task::JoinError),

    /// The pipeline panicked.
    #[error("pipeline panicked: {0}")]
    Panicked(String),

    /// The whole pipeline ran past its deadline.
    #[error("deadline of {deadline_ms}ms exceeded")]
    DeadlineExceeded {
        /// Configured deadline.
        deadline_ms: u64,
    },

    /// No project root in the request and no usable working directory.
    #[error("no project root: {0}")]
    NoProjectRoot(#[source] std::io::Error),
}

/// Convenience result type for the hook pipeline.
pub type Result<T> = std::result::Result<T, HookError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deadline_display() {
        let err = HookError::DeadlineExceeded { deadline_ms: 3000 };
        assert_eq!(err.to_string(), "deadline of 3000ms exceeded");
    }

    #[test]
    fn limits_error_converts() {
        let err: HookError = SelectionError::NegativeTokenBudget(-5).into();
        assert!(err.to_string().contains("-5"));
    }
}
