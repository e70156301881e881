//! Budget-constrained rule selection.
//!
//! 1. Drop rules whose maturity set excludes the project's maturity.
//! 2. Score what remains ([`score_rule`]).
//! 3. Sort by score descending, then estimated tokens ascending, then path.
//! 4. Accept greedily while both the count and the token budget hold. A
//!    rule that does not fit is skipped whole, never truncated.
//!
//! Selection is a pure function of its inputs.

use std::cmp::Ordering;

use rulecast_core::{Intent, Maturity, ProjectContext};
use rulecast_settings::ScoringWeights;
use serde::Serialize;
use tracing::debug;

use crate::catalog::{Catalog, RuleDescriptor};
use crate::errors::SelectionError;
use crate::scoring::{ScoredRule, score_rule};

// ─────────────────────────────────────────────────────────────────────────────
// Limits
// ─────────────────────────────────────────────────────────────────────────────

/// Validated selection limits.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SelectionLimits {
    max_rules: usize,
    token_budget: u64,
}

impl SelectionLimits {
    /// Validate raw limits. Negative values are rejected; zero is allowed
    /// and yields empty selections.
    pub fn new(max_rules: i64, token_budget: i64) -> Result<Self, SelectionError> {
        let max_rules =
            usize::try_from(max_rules).map_err(|_| SelectionError::NegativeMaxRules(max_rules))?;
        let token_budget = u64::try_from(token_budget)
            .map_err(|_| SelectionError::NegativeTokenBudget(token_budget))?;
        Ok(Self {
            max_rules,
            token_budget,
        })
    }

    /// Maximum number of rules.
    #[must_use]
    pub fn max_rules(&self) -> usize {
        self.max_rules
    }

    /// Maximum combined estimated tokens.
    #[must_use]
    pub fn token_budget(&self) -> u64 {
        self.token_budget
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Result
// ─────────────────────────────────────────────────────────────────────────────

/// Outcome of one selection.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectionResult {
    /// Selected rules, best first.
    pub rules: Vec<ScoredRule>,
    /// Sum of the selected rules' estimated tokens.
    pub total_tokens: u64,
    /// Whether an eligible rule was left out only because of the budget or
    /// the count limit.
    pub budget_exhausted: bool,
    /// Rules remaining after the maturity filter.
    pub considered: usize,
    /// Considered rules with a non-negative score.
    pub eligible: usize,
}

impl SelectionResult {
    /// Paths of the selected rules, best first.
    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.rules.iter().map(|r| r.rule.path.as_str())
    }

    /// Whether nothing was selected.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Number of selected rules.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rules.len()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Selector
// ─────────────────────────────────────────────────────────────────────────────

/// Rules applicable at `maturity`. Idempotent.
pub fn filter_by_maturity<'a, I>(rules: I, maturity: Maturity) -> Vec<&'a RuleDescriptor>
where
    I: IntoIterator<Item = &'a RuleDescriptor>,
{
    rules.into_iter().filter(|r| r.applies_to(maturity)).collect()
}

/// Ranking order: score desc, tokens asc, path asc.
fn rank(a: &ScoredRule, b: &ScoredRule) -> Ordering {
    b.score
        .cmp(&a.score)
        .then_with(|| a.rule.estimated_tokens.cmp(&b.rule.estimated_tokens))
        .then_with(|| a.rule.path.cmp(&b.rule.path))
}

/// Scores and selects rules.
#[derive(Clone, Debug, Default)]
pub struct RuleSelector {
    weights: ScoringWeights,
}

impl RuleSelector {
    /// Create a selector with the given weights.
    #[must_use]
    pub fn new(weights: ScoringWeights) -> Self {
        Self { weights }
    }

    /// Every maturity-applicable rule, scored and ranked (ineligible last).
    #[must_use]
    pub fn rank(&self, catalog: &Catalog, context: &ProjectContext, intent: &Intent) -> Vec<ScoredRule> {
        let mut scored: Vec<ScoredRule> = filter_by_maturity(catalog.rules(), context.maturity)
            .into_iter()
            .map(|rule| score_rule(rule, context, intent, &self.weights))
            .collect();
        scored.sort_by(rank);
        scored
    }

    /// Select the best rules within `limits`.
    #[must_use]
    pub fn select(
        &self,
        catalog: &Catalog,
        context: &ProjectContext,
        intent: &Intent,
        limits: SelectionLimits,
    ) -> SelectionResult {
        let ranked = self.rank(catalog, context, intent);
        let considered = ranked.len();
        let eligible: Vec<ScoredRule> = ranked.into_iter().filter(ScoredRule::is_eligible).collect();

        let mut result = SelectionResult {
            considered,
            eligible: eligible.len(),
            ..SelectionResult::default()
        };

        if limits.max_rules == 0 || limits.token_budget == 0 {
            result.budget_exhausted = !eligible.is_empty();
            return result;
        }

        for candidate in eligible {
            let tokens = candidate.rule.estimated_tokens;
            let fits_count = result.rules.len() < limits.max_rules;
            let fits_budget = result
                .total_tokens
                .checked_add(tokens)
                .is_some_and(|total| total <= limits.token_budget);
            if fits_count && fits_budget {
                result.total_tokens += tokens;
                result.rules.push(candidate);
            } else {
                debug!(path = %candidate.rule.path, score = candidate.score, tokens, "rule skipped for budget");
                result.budget_exhausted = true;
            }
        }

        debug!(
            selected = result.rules.len(),
            total_tokens = result.total_tokens,
            considered = result.considered,
            eligible = result.eligible,
            budget_exhausted = result.budget_exhausted,
            "rules selected"
        );
        result
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
