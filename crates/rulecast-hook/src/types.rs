//! Hook request, response and outcome types.
//!
//! The wire types use `camelCase`, except the response's `continue` flag,
//! which is a Rust keyword and renamed explicitly.

use std::path::PathBuf;

use rulecast_core::{Intent, ProjectContext};
use serde::{Deserialize, Serialize};

// ─────────────────────────────────────────────────────────────────────────────
// Wire types
// ─────────────────────────────────────────────────────────────────────────────

/// One prompt submission.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct HookRequest {
    /// The user's free-text prompt.
    pub prompt: String,
    /// Project root. Falls back to the process working directory.
    #[serde(alias = "projectRoot", skip_serializing_if = "Option::is_none")]
    pub cwd: Option<PathBuf>,
}

impl HookRequest {
    /// Build a request for `prompt` in `cwd`.
    pub fn new(prompt: impl Into<String>, cwd: impl Into<PathBuf>) -> Self {
        Self {
            prompt: prompt.into(),
            cwd: Some(cwd.into()),
        }
    }
}

/// The hook's answer. `continue` is always `true`.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HookResponse {
    /// Whether the host should proceed with the prompt.
    #[serde(rename = "continue")]
    pub continue_: bool,
    /// Rule text to inject; empty when nothing applies.
    pub additional_context: String,
    /// Diagnostics, never needed for correct operation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<HookMetadata>,
}

impl HookResponse {
    /// Proceed without injecting anything.
    #[must_use]
    pub fn continue_() -> Self {
        Self {
            continue_: true,
            additional_context: String::new(),
            metadata: None,
        }
    }
}

/// One injected rule, as reported in metadata.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppliedRule {
    /// Rule path.
    pub path: String,
    /// Relevance score; `None` for local-only rules.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<i64>,
    /// Estimated tokens; `None` for local-only rules.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub estimated_tokens: Option<u64>,
    /// How the body was produced (`central`, `extend`, `local-only`, ...).
    pub source: String,
    /// Scoring contributions.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub reasons: Vec<String>,
}

/// Per-stage wall-clock durations in milliseconds.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StageTimings {
    /// Context detection, intent analysis and override loading.
    pub detect_ms: u64,
    /// Catalog scoring and selection.
    pub select_ms: u64,
    /// Remote fetches.
    pub fetch_ms: u64,
    /// Override merge and formatting.
    pub merge_ms: u64,
    /// Whole request.
    pub total_ms: u64,
}

/// Diagnostics attached to a response.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HookMetadata {
    /// Detected project context.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<ProjectContext>,
    /// Classified intent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub intent: Option<Intent>,
    /// Rules injected, in output order.
    pub applied: Vec<AppliedRule>,
    /// Selected paths that could not be resolved.
    pub failed: Vec<String>,
    /// Catalog rules applicable at the project's maturity.
    pub considered: usize,
    /// Considered rules with a non-negative score.
    pub eligible: usize,
    /// Estimated tokens of the selected catalog rules.
    pub total_tokens: u64,
    /// Whether an eligible rule was cut by the limits.
    pub budget_exhausted: bool,
    /// Degradations (stale content, failures, ignored overrides).
    pub warnings: Vec<String>,
    /// Why nothing was injected on purpose.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skipped: Option<String>,
    /// Why the result is degraded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub degraded: Option<String>,
    /// Stage durations.
    pub timings: StageTimings,
}

// ─────────────────────────────────────────────────────────────────────────────
// Outcome
// ─────────────────────────────────────────────────────────────────────────────

/// Result of one hook invocation.
///
/// Every internal failure maps into [`HookOutcome::Degraded`]; both
/// variants convert into a valid [`HookResponse`].
#[derive(Clone, Debug)]
pub enum HookOutcome {
    /// Pipeline completed (possibly with nothing to inject).
    Success {
        /// Formatted rule text.
        context: String,
        /// Diagnostics.
        metadata: Box<HookMetadata>,
    },
    /// Pipeline failed somewhere; `context` holds whatever survived.
    Degraded {
        /// What went wrong.
        reason: String,
        /// Formatted rule text, possibly empty.
        context: String,
        /// Diagnostics gathered before the failure.
        metadata: Box<HookMetadata>,
    },
}

impl HookOutcome {
    /// Nothing injected on purpose.
    pub fn skipped(reason: impl Into<String>) -> Self {
        Self::Success {
            context: String::new(),
            metadata: Box::new(HookMetadata {
                skipped: Some(reason.into()),
                ..HookMetadata::default()
            }),
        }
    }

    /// Degraded with no partial result.
    pub fn degraded(reason: impl Into<String>) -> Self {
        Self::Degraded {
            reason: reason.into(),
            context: String::new(),
            metadata: Box::default(),
        }
    }

    /// Whether the pipeline degraded.
    #[must_use]
    pub fn is_degraded(&self) -> bool {
        matches!(self, Self::Degraded { .. })
    }

    /// Formatted rule text.
    #[must_use]
    pub fn context(&self) -> &str {
        match self {
            Self::Success { context, .. } | Self::Degraded { context, .. } => context,
        }
    }

    /// Diagnostics.
    #[must_use]
    pub fn metadata(&self) -> &HookMetadata {
        match self {
            Self::Success { metadata, .. } | Self::Degraded { metadata, .. } => metadata,
        }
    }

    /// Mutable diagnostics.
    pub fn metadata_mut(&mut self) -> &mut HookMetadata {
        match self {
            Self::Success { metadata, .. } | Self::Degraded { metadata, .. } => metadata,
        }
    }

    /// Convert into the wire response. `continue` is always `true`.
    #[must_use]
    pub fn into_response(self) -> HookResponse {
        let (context, mut metadata) = match self {
            Self::Success { context, metadata } => (context, metadata),
            Self::Degraded {
                reason,
                context,
                metadata,
            } => {
                let mut metadata = metadata;
                metadata.degraded = Some(reason);
                (context, metadata)
            }
        };
        if metadata.degraded.is_none() && metadata.skipped.is_none() && context.is_empty() {
            metadata.skipped = Some("no applicable rules".to_string());
        }
        HookResponse {
            continue_: true,
            additional_context: context,
            metadata: Some(*metadata),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_accepts_project_root_alias() {
        let req: HookRequest =
            serde_json::from_str(r#"{"prompt": "hi", "projectRoot": "/tmp/p"}"#).unwrap();
        assert_eq!(req.prompt, "hi");
        assert_eq!(req.cwd, Some(PathBuf::from("/tmp/p")));
    }

    #[test]
    fn request_tolerates_missing_fields() {
        let req: HookRequest = serde_json::from_str("{}").unwrap();
        assert!(req.prompt.is_empty());
        assert!(req.cwd.is_none());
    }

    #[test]
    fn response_uses_continue_key() {
        let json = serde_json::to_value(HookResponse::continue_()).unwrap();
        assert_eq!(json["continue"], true);
        assert_eq!(json["additionalContext"], "");
        assert!(json.get("metadata").is_none());
    }

    #[test]
    fn degraded_reason_lands_in_metadata() {
        let response = HookOutcome::degraded("boom").into_response();
        assert!(response.continue_);
        assert!(response.additional_context.is_empty());
        let metadata = response.metadata.unwrap();
        assert_eq!(metadata.degraded.as_deref(), Some("boom"));
        assert!(metadata.skipped.is_none());
    }

    #[test]
    fn skipped_outcome_is_success() {
        let outcome = HookOutcome::skipped("disabled");
        assert!(!outcome.is_degraded());
        assert_eq!(outcome.metadata().skipped.as_deref(), Some("disabled"));
        let json = serde_json::to_value(outcome.into_response()).unwrap();
        assert_eq!(json["metadata"]["skipped"], "disabled");
    }

    #[test]
    fn empty_success_reports_no_rules() {
        let outcome = HookOutcome::Success {
            context: String::new(),
            metadata: Box::default(),
        };
        let metadata = outcome.into_response().metadata.unwrap();
        assert_eq!(metadata.skipped.as_deref(), Some("no applicable rules"));
    }
}
