//! Request intent analysis.
//!
//! A single fold over a weighted pattern table. Every pattern adds its
//! weight to one category; code categories also add to the code axis and
//! [`IntentCategory::NonCode`] patterns to the non-code axis. The category
//! with the highest score wins, ties going to the earlier category in
//! [`IntentCategory::tie_break_order`]. Text matching nothing is
//! [`IntentCategory::General`].
//!
//! Non-code vocabulary (contracts, SLAs, HR, pricing) carries a higher
//! weight than any single code pattern, so one legal term outweighs an
//! incidental "API" or "error" in the same sentence.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::LazyLock;

use regex::Regex;
use rulecast_core::{ActionType, Intent, IntentCategory, Urgency};
use tracing::warn;

// ─────────────────────────────────────────────────────────────────────────────
// Pattern tables
// ─────────────────────────────────────────────────────────────────────────────

/// (pattern, weight, category). Patterns are matched case-insensitively.
const CATEGORY_PATTERNS: &[(&str, f64, IntentCategory)] = &[
    // Debugging
    (r"\b(fix|fixes|fixing|fixed)\b", 2.0, IntentCategory::Debugging),
    (r"\b(bug|bugs|buggy)\b", 2.0, IntentCategory::Debugging),
    (r"\bdebug\w*", 2.0, IntentCategory::Debugging),
    (r"\bcrash\w*", 2.0, IntentCategory::Debugging),
    (r"\b(broken|not working|doesn'?t work|stopped working)\b", 2.0, IntentCategory::Debugging),
    (r"\b(fail|fails|failing|failed|failure)\b", 1.5, IntentCategory::Debugging),
    (r"\b(error|errors|exception|stack ?trace|traceback|panic)\b", 1.5, IntentCategory::Debugging),
    (r"\b(regression|flaky)\b", 1.5, IntentCategory::Debugging),
    // Implementation
    (r"\bimplement\w*", 2.0, IntentCategory::Implementation),
    (r"\b(new feature|feature)\b", 1.5, IntentCategory::Implementation),
    (r"\brefactor\w*", 1.5, IntentCategory::Implementation),
    (r"\b(add|adding)\b", 1.0, IntentCategory::Implementation),
    (r"\b(create|creating|build|building)\b", 1.0, IntentCategory::Implementation),
    (r"\b(write|writing)\b", 1.0, IntentCategory::Implementation),
    (r"\b(integrate|integration)\b", 1.0, IntentCategory::Implementation),
    // Review
    (r"\breview\w*", 2.0, IntentCategory::Review),
    (r"\baudit\w*", 1.5, IntentCategory::Review),
    (r"\b(code quality|best practices?)\b", 1.5, IntentCategory::Review),
    (r"\b(pull request|diff|feedback|critique)\b", 1.0, IntentCategory::Review),
    // Architecture
    (r"\barchitect\w*", 2.0, IntentCategory::Architecture),
    (r"\b(design|designing|redesign)\b", 1.5, IntentCategory::Architecture),
    (r"\b(microservices?|monolith\w*)\b", 1.5, IntentCategory::Architecture),
    (r"\b(scalab\w*|scaling|trade-?offs?)\b", 1.0, IntentCategory::Architecture),
    // DevOps
    (r"\bdeploy\w*", 2.0, IntentCategory::Devops),
    (r"\b(ci/?cd|pipelines?|github actions)\b", 2.0, IntentCategory::Devops),
    (r"\b(docker\w*|kubernetes|k8s|helm)\b", 1.5, IntentCategory::Devops),
    (r"\b(terraform|infrastructure|provision\w*)\b", 1.5, IntentCategory::Devops),
    (r"\b(monitoring|alerting|observability)\b", 1.0, IntentCategory::Devops),
    // Documentation
    (r"\bdocument\w*", 2.0, IntentCategory::Documentation),
    (r"\b(readme|docs|docstrings?|changelog)\b", 2.0, IntentCategory::Documentation),
    (r"\bcomments?\b", 1.0, IntentCategory::Documentation),
    // General
    (r"\b(how (do|can|should) i|what is|what are|why does|explain)\b", 1.0, IntentCategory::General),
    // Non-code
    (r"\b(service level agreements?|sla|slas)\b", 3.0, IntentCategory::NonCode),
    (r"\b(contracts?|clauses?|indemnif\w*|liabilit\w*|warrant(y|ies))\b", 3.0, IntentCategory::NonCode),
    (r"\b(legal|lawyer|attorney|litigation|lawsuit)\b", 3.0, IntentCategory::NonCode),
    (r"\b(gdpr|hipaa|compliance|regulator\w*)\b", 3.0, IntentCategory::NonCode),
    (r"\b(human resources|employees?|hiring|payroll|performance review)\b", 3.0, IntentCategory::NonCode),
    (r"\b(invoices?|pricing|revenue|marketing|sales)\b", 3.0, IntentCategory::NonCode),
    (r"\b(nda|non-disclosure|terms of service|privacy policy)\b", 3.0, IntentCategory::NonCode),
];

/// (pattern, topic). A topic is present when its pattern matches.
const TOPIC_PATTERNS: &[(&str, &str)] = &[
    (
        r"\b(secur\w*|auth\w*|login|passwords?|jwt|oauth|csrf|xss|injection|vulnerab\w*|encrypt\w*|secrets?|permissions?)",
        "security",
    ),
    (r"\b(tests?|testing|pytest|jest|vitest|coverage|tdd|mock\w*|fixtures?)\b", "testing"),
    (r"\b(perf\w*|slow|latency|optimi[sz]\w*|cach(e|ing)|memory leak|throughput)", "performance"),
    (r"\b(database|db|sql|quer(y|ies)|migrations?|schema|postgres\w*|mysql|mongo\w*|orm)\b", "database"),
    (r"\b(api|apis|endpoints?|rest|graphql|grpc|routes?)\b", "api"),
    (r"\b(deploy\w*|ci|cd|pipelines?|docker\w*|kubernetes|k8s|release)\b", "deployment"),
    (r"\b(refactor\w*|clean ?up|lint\w*|code quality|style|readab\w*|smells?)\b", "quality"),
    (r"\b(document\w*|docs|readme|docstrings?)\b", "documentation"),
    (r"\b(architect\w*|design patterns?|microservices?|modular\w*)\b", "architecture"),
    (r"\b(error handling|exceptions?|retr(y|ies)|fallback)\b", "error-handling"),
    (r"\b(accessib\w*|a11y|aria|screen readers?)\b", "accessibility"),
];

/// (pattern, action) for verbs not implied by the dominant category.
const ACTION_PATTERNS: &[(&str, ActionType)] = &[
    (r"\brefactor\w*", ActionType::Refactor),
    (r"\b(tests?|testing)\b", ActionType::Test),
    (r"\b(fix|debug\w*)\b", ActionType::Debug),
    (r"\bimplement\w*", ActionType::Implement),
    (r"\breview\w*", ActionType::Review),
    (r"\bdeploy\w*", ActionType::Deploy),
    (r"\bdocument\w*", ActionType::Document),
];

/// Failure, defect and explicit severity vocabulary.
const URGENCY_PATTERN: &str = r"\b(fail\w*|crash\w*|broken|bugs?|regression|outage|urgent\w*|asap|critical|emergency|immediately|blocker|hotfix|sev ?[0-2]|p[01]|production (is )?down)\b";

struct CompiledTables {
    categories: Vec<(Regex, f64, IntentCategory)>,
    topics: Vec<(Regex, &'static str)>,
    actions: Vec<(Regex, ActionType)>,
    urgency: Option<Regex>,
}

fn compile(pattern: &str) -> Option<Regex> {
    match Regex::new(&format!("(?i){pattern}")) {
        Ok(re) => Some(re),
        Err(e) => {
            warn!(pattern, error = %e, "dropping invalid intent pattern");
            None
        }
    }
}

static TABLES: LazyLock<CompiledTables> = LazyLock::new(|| CompiledTables {
    categories: CATEGORY_PATTERNS
        .iter()
        .filter_map(|(p, w, c)| compile(p).map(|re| (re, *w, *c)))
        .collect(),
    topics: TOPIC_PATTERNS
        .iter()
        .filter_map(|(p, t)| compile(p).map(|re| (re, *t)))
        .collect(),
    actions: ACTION_PATTERNS
        .iter()
        .filter_map(|(p, a)| compile(p).map(|re| (re, *a)))
        .collect(),
    urgency: compile(URGENCY_PATTERN),
});

// ─────────────────────────────────────────────────────────────────────────────
// Analyzer
// ─────────────────────────────────────────────────────────────────────────────

/// Classifies request text into an [`Intent`].
#[derive(Clone, Copy, Debug, Default)]
pub struct IntentAnalyzer;

impl IntentAnalyzer {
    /// Create an analyzer.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Classify `text`.
    #[must_use]
    pub fn analyze(&self, text: &str) -> Intent {
        self.analyze_with_scores(text).0
    }

    /// Classify `text` and return the per-category scores behind it.
    #[must_use]
    pub fn analyze_with_scores(&self, text: &str) -> (Intent, BTreeMap<IntentCategory, f64>) {
        let tables = &*TABLES;
        let mut scores: BTreeMap<IntentCategory, f64> = BTreeMap::new();
        let mut code_score = 0.0_f64;
        let mut non_code_score = 0.0_f64;

        for (re, weight, category) in &tables.categories {
            if !re.is_match(text) {
                continue;
            }
            let weight = *weight;
            *scores.entry(*category).or_insert(0.0) += weight;
            match category {
                IntentCategory::NonCode => non_code_score += weight,
                IntentCategory::General => {}
                _ => code_score += weight,
            }
        }

        let category = dominant(&scores);

        let topics: BTreeSet<String> = tables
            .topics
            .iter()
            .filter(|(re, _)| re.is_match(text))
            .map(|(_, topic)| (*topic).to_string())
            .collect();

        let mut actions: BTreeSet<ActionType> = tables
            .actions
            .iter()
            .filter(|(re, _)| re.is_match(text))
            .map(|(_, action)| *action)
            .collect();
        if let Some(action) = category.action() {
            let _ = actions.insert(action);
        }

        let urgency = match &tables.urgency {
            Some(re) if re.is_match(text) => Urgency::High,
            _ => Urgency::Normal,
        };

        let intent = Intent {
            category,
            topics,
            actions,
            urgency,
            code_score,
            non_code_score,
        };
        (intent, scores)
    }
}

/// Classify `text` with the default analyzer.
#[must_use]
pub fn analyze_intent(text: &str) -> Intent {
    IntentAnalyzer::new().analyze(text)
}

/// Highest-scoring category; earlier categories win ties.
fn dominant(scores: &BTreeMap<IntentCategory, f64>) -> IntentCategory {
    let mut best = IntentCategory::General;
    let mut best_score = 0.0;
    for category in IntentCategory::tie_break_order() {
        let score = scores.get(category).copied().unwrap_or(0.0);
        if score > best_score {
            best = *category;
            best_score = score;
        }
    }
    best
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_patterns_compile() {
        assert_eq!(TABLES.categories.len(), CATEGORY_PATTERNS.len());
        assert_eq!(TABLES.topics.len(), TOPIC_PATTERNS.len());
        assert_eq!(TABLES.actions.len(), ACTION_PATTERNS.len());
        assert!(TABLES.urgency.is_some());
    }

    #[test]
    fn failing_test_is_urgent_debugging() {
        let intent = analyze_intent("fix this failing test");
        assert_eq!(intent.category, IntentCategory::Debugging);
        assert_eq!(intent.urgency, Urgency::High);
        assert!(intent.has_topic("testing"));
        assert!(intent.actions.contains(&ActionType::Debug));
        assert!(intent.actions.contains(&ActionType::Test));
    }

    #[test]
    fn service_level_agreement_is_non_code() {
        let intent = analyze_intent("Draft a service level agreement for our API customers");
        assert_eq!(intent.category, IntentCategory::NonCode);
        assert!(!intent.is_code_related());
        assert!(intent.non_code_score > intent.code_score);
    }

    #[test]
    fn legal_term_outweighs_incidental_code_word() {
        let intent = analyze_intent("Review the liability clause, the error rates are in the appendix");
        assert_eq!(intent.category, IntentCategory::NonCode);
    }

    #[test]
    fn empty_text_is_general() {
        let intent = analyze_intent("");
        assert_eq!(intent.category, IntentCategory::General);
        assert!(intent.topics.is_empty());
        assert_eq!(intent.urgency, Urgency::Normal);
        assert!(intent.is_code_related());
    }

    #[test]
    fn unmatched_text_is_general() {
        assert_eq!(analyze_intent("hello there").category, IntentCategory::General);
    }

    #[test]
    fn implementation_request() {
        let intent = analyze_intent("Implement a new REST endpoint for user signup");
        assert_eq!(intent.category, IntentCategory::Implementation);
        assert!(intent.has_topic("api"));
        assert_eq!(intent.urgency, Urgency::Normal);
    }

    #[test]
    fn security_topic_detected() {
        let intent = analyze_intent("add JWT authentication to the login route");
        assert!(intent.is_security_sensitive());
        assert!(intent.has_topic("api"));
    }

    #[test]
    fn tie_goes_to_earlier_category() {
        // one 2.0 debugging pattern vs one 2.0 review pattern
        let (intent, scores) = IntentAnalyzer::new().analyze_with_scores("review this bug");
        assert_eq!(scores.get(&IntentCategory::Debugging), Some(&2.0));
        assert_eq!(scores.get(&IntentCategory::Review), Some(&2.0));
        assert_eq!(intent.category, IntentCategory::Debugging);
    }

    #[test]
    fn case_insensitive() {
        assert_eq!(analyze_intent("DEPLOY TO KUBERNETES").category, IntentCategory::Devops);
    }

    #[test]
    fn severity_word_raises_urgency() {
        let intent = analyze_intent("urgent: the checkout page needs a new button");
        assert_eq!(intent.urgency, Urgency::High);
    }
}
