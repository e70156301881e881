//! Markdown rendering of the injected rules.

use std::fmt::Write as _;

use rulecast_core::{Intent, ProjectContext};
use rulecast_overrides::{MergeDecision, MergedRule};

/// Heading of the injected block.
pub const TITLE: &str = "# Engineering Rules";

/// Short label for how a body was produced.
#[must_use]
pub fn decision_label(decision: MergeDecision) -> String {
    match decision {
        MergeDecision::Central => "central".to_string(),
        MergeDecision::Excluded => "central (local override excluded)".to_string(),
        MergeDecision::Merged(strategy) => format!("{strategy} (local override)"),
        MergeDecision::LocalOnly => "local-only".to_string(),
    }
}

fn join_or_none<'a>(items: impl IntoIterator<Item = &'a String>) -> String {
    let joined: Vec<&str> = items.into_iter().map(String::as_str).collect();
    if joined.is_empty() {
        "none".to_string()
    } else {
        joined.join(", ")
    }
}

/// One-line summary of the detected project.
#[must_use]
pub fn context_summary(context: &ProjectContext) -> String {
    format!(
        "**Project:** languages: {} | frameworks: {} | cloud: {} | maturity: {} (confidence: {})",
        join_or_none(&context.languages),
        join_or_none(&context.frameworks),
        join_or_none(&context.cloud_providers),
        context.maturity,
        context.confidence,
    )
}

/// One-line summary of the classified request.
#[must_use]
pub fn intent_summary(intent: &Intent) -> String {
    let urgency = if intent.is_urgent() { "high" } else { "normal" };
    format!(
        "**Request:** {} | urgency: {urgency} | topics: {}",
        intent.category,
        join_or_none(&intent.topics),
    )
}

/// Render the rules block. Empty when `rules` is empty.
#[must_use]
pub fn format_rules(context: &ProjectContext, intent: &Intent, rules: &[MergedRule]) -> String {
    if rules.is_empty() {
        return String::new();
    }

    let mut out = String::new();
    let _ = writeln!(out, "{TITLE}\n");
    let _ = writeln!(out, "{}", context_summary(context));
    let _ = writeln!(out, "{}\n", intent_summary(intent));

    out.push_str("## Applied rules\n\n");
    for rule in rules {
        let _ = writeln!(out, "- `{}` ({})", rule.path, decision_label(rule.decision));
    }

    for rule in rules {
        let _ = write!(out, "\n---\n\n## {}\n\n{}\n", rule.path, rule.content.trim_end());
    }
    out
}
