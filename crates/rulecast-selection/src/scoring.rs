//! Relevance scoring.
//!
//! A rule's score is the sum of its matches against the project context
//! and the request intent. Only rules that list specific maturity levels
//! earn the maturity weight; unscoped rules apply everywhere and gain
//! nothing from it. Rules bound to a language, framework or cloud
//! provider the project does not use score [`INELIGIBLE`] and are never
//! selected.

use rulecast_core::{Intent, ProjectContext};
use rulecast_settings::ScoringWeights;
use serde::Serialize;

use crate::catalog::{RuleCategory, RuleDescriptor};

/// Score of a rule whose binding does not match the project.
pub const INELIGIBLE: i64 = -1;

/// A rule paired with its relevance score.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoredRule {
    /// The rule.
    pub rule: RuleDescriptor,
    /// Relevance score; negative means ineligible.
    pub score: i64,
    /// Human-readable contributions, for diagnostics.
    pub reasons: Vec<String>,
}

impl ScoredRule {
    /// Whether the rule may be selected at all.
    #[must_use]
    pub fn is_eligible(&self) -> bool {
        self.score >= 0
    }
}

/// Score one rule.
#[must_use]
pub fn score_rule(
    rule: &RuleDescriptor,
    context: &ProjectContext,
    intent: &Intent,
    weights: &ScoringWeights,
) -> ScoredRule {
    let mut score = 0;
    let mut reasons = Vec::new();

    let binding = match rule.category {
        RuleCategory::Base => {
            score += weights.base;
            reasons.push(format!("base rule +{}", weights.base));
            None
        }
        RuleCategory::Language => Some((
            context.has_language(rule.target.as_deref().unwrap_or_default()),
            weights.language,
        )),
        RuleCategory::Framework => Some((
            context.has_framework(rule.target.as_deref().unwrap_or_default()),
            weights.framework,
        )),
        RuleCategory::Cloud => Some((
            context.has_cloud_provider(rule.target.as_deref().unwrap_or_default()),
            weights.cloud,
        )),
    };

    if let Some((matched, weight)) = binding {
        let target = rule.target.as_deref().unwrap_or("?");
        if !matched {
            return ScoredRule {
                rule: rule.clone(),
                score: INELIGIBLE,
                reasons: vec![format!("{} {target} not detected", rule.category)],
            };
        }
        score += weight;
        reasons.push(format!("{} {target} +{weight}", rule.category));
    }

    if rule.is_maturity_scoped() && rule.applies_to(context.maturity) {
        score += weights.maturity;
        reasons.push(format!("maturity {} +{}", context.maturity, weights.maturity));
    }

    let shared: Vec<&str> = rule
        .topics
        .iter()
        .filter(|t| intent.has_topic(t))
        .map(String::as_str)
        .collect();
    if !shared.is_empty() {
        let gain = weights
            .topic
            .saturating_mul(i64::try_from(shared.len()).unwrap_or(i64::MAX));
        score += gain;
        reasons.push(format!("topics {} +{gain}", shared.join(", ")));
    }

    if intent.is_security_sensitive() && intent.is_urgent() && rule.topics.contains("security") {
        score += weights.security_bonus;
        reasons.push(format!("urgent security +{}", weights.security_bonus));
    }

    ScoredRule {
        rule: rule.clone(),
        score,
        reasons,
    }
}
