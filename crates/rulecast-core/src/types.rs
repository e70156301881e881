//! Domain types shared across the selection pipeline.
//!
//! [`ProjectContext`] and [`Intent`] are ephemeral: both are built fresh for
//! every request and never persisted. All types serialize with camelCase
//! field names (enum values in kebab-case) so they can be echoed verbatim in
//! hook diagnostics.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

// ─────────────────────────────────────────────────────────────────────────────
// Maturity
// ─────────────────────────────────────────────────────────────────────────────

/// How rigorous a project's practices should be.
///
/// Ordered from least to most mature, so `Maturity::Mvp < Maturity::Production`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Maturity {
    /// Prototype / proof of concept.
    #[default]
    Mvp,
    /// Has CI and is heading toward a release.
    PreProduction,
    /// Released, versioned, deployed with CI and infrastructure as code.
    Production,
}

impl Maturity {
    /// All maturity levels, least mature first.
    #[must_use]
    pub fn all() -> &'static [Maturity] {
        &[Self::Mvp, Self::PreProduction, Self::Production]
    }

    /// Canonical wire name (`mvp`, `pre-production`, `production`).
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Mvp => "mvp",
            Self::PreProduction => "pre-production",
            Self::Production => "production",
        }
    }

    /// Parse a maturity name, accepting a few common spellings.
    ///
    /// Returns `None` for unrecognised values.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "mvp" | "poc" | "prototype" => Some(Self::Mvp),
            "pre-production" | "pre_production" | "preproduction" | "beta" => {
                Some(Self::PreProduction)
            }
            "production" | "prod" => Some(Self::Production),
            _ => None,
        }
    }
}

impl fmt::Display for Maturity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Confidence
// ─────────────────────────────────────────────────────────────────────────────

/// How much corroborating evidence backs a detected [`ProjectContext`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    /// Exactly the minimum evidence, or nothing detected.
    #[default]
    Low,
    /// Mixed: some dimensions well corroborated, some minimal.
    Medium,
    /// At least two corroborating signals for every detected dimension.
    High,
}

impl Confidence {
    /// One step lower (`Low` stays `Low`).
    #[must_use]
    pub fn degrade(self) -> Self {
        match self {
            Self::High => Self::Medium,
            Self::Medium | Self::Low => Self::Low,
        }
    }
}

impl fmt::Display for Confidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::High => f.write_str("high"),
            Self::Medium => f.write_str("medium"),
            Self::Low => f.write_str("low"),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// ProjectContext
// ─────────────────────────────────────────────────────────────────────────────

/// Characteristics detected from the project's file system.
///
/// Language, framework and provider names are lowercase identifiers
/// (`python`, `fastapi`, `aws`) matching the catalog's keys.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectContext {
    /// Detected languages, primary first.
    pub languages: Vec<String>,
    /// Detected frameworks.
    pub frameworks: BTreeSet<String>,
    /// Detected cloud providers.
    pub cloud_providers: BTreeSet<String>,
    /// Maturity classification.
    pub maturity: Maturity,
    /// Strength of the evidence behind this context.
    pub confidence: Confidence,
}

impl ProjectContext {
    /// The primary (first) detected language.
    #[must_use]
    pub fn primary_language(&self) -> Option<&str> {
        self.languages.first().map(String::as_str)
    }

    /// Whether `language` was detected.
    #[must_use]
    pub fn has_language(&self, language: &str) -> bool {
        self.languages.iter().any(|l| l.eq_ignore_ascii_case(language))
    }

    /// Whether `framework` was detected.
    #[must_use]
    pub fn has_framework(&self, framework: &str) -> bool {
        self.frameworks.contains(&framework.to_ascii_lowercase())
    }

    /// Whether `provider` was detected.
    #[must_use]
    pub fn has_cloud_provider(&self, provider: &str) -> bool {
        self.cloud_providers.contains(&provider.to_ascii_lowercase())
    }

    /// `true` when no language, framework or provider was detected.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.languages.is_empty() && self.frameworks.is_empty() && self.cloud_providers.is_empty()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Intent
// ─────────────────────────────────────────────────────────────────────────────

/// Dominant category of a user request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum IntentCategory {
    /// Something is broken and needs fixing.
    Debugging,
    /// Build or change functionality.
    Implementation,
    /// Review or audit existing code.
    Review,
    /// Design and structure decisions.
    Architecture,
    /// Deployment, CI, infrastructure.
    Devops,
    /// Write or update documentation.
    Documentation,
    /// General question with no stronger signal.
    #[default]
    General,
    /// Legal, HR, business or compliance text unrelated to code.
    NonCode,
}

impl IntentCategory {
    /// All categories in tie-break order (earlier wins a tie).
    #[must_use]
    pub fn tie_break_order() -> &'static [IntentCategory] {
        &[
            Self::Debugging,
            Self::Implementation,
            Self::Review,
            Self::Architecture,
            Self::Devops,
            Self::Documentation,
            Self::General,
            Self::NonCode,
        ]
    }

    /// Tie-break rank; lower wins.
    #[must_use]
    pub fn priority(self) -> usize {
        Self::tie_break_order()
            .iter()
            .position(|c| *c == self)
            .unwrap_or(usize::MAX)
    }

    /// Whether this category describes a coding request.
    #[must_use]
    pub fn is_code(self) -> bool {
        self != Self::NonCode
    }

    /// The action verb implied by this category.
    #[must_use]
    pub fn action(self) -> Option<ActionType> {
        match self {
            Self::Debugging => Some(ActionType::Debug),
            Self::Implementation => Some(ActionType::Implement),
            Self::Review => Some(ActionType::Review),
            Self::Architecture => Some(ActionType::Design),
            Self::Devops => Some(ActionType::Deploy),
            Self::Documentation => Some(ActionType::Document),
            Self::General => Some(ActionType::Ask),
            Self::NonCode => None,
        }
    }
}

impl fmt::Display for IntentCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Debugging => "debugging",
            Self::Implementation => "implementation",
            Self::Review => "review",
            Self::Architecture => "architecture",
            Self::Devops => "devops",
            Self::Documentation => "documentation",
            Self::General => "general",
            Self::NonCode => "non-code",
        };
        f.write_str(name)
    }
}

/// Action verb extracted from a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionType {
    /// Build something new.
    Implement,
    /// Diagnose and fix a defect.
    Debug,
    /// Review existing work.
    Review,
    /// Restructure without changing behavior.
    Refactor,
    /// Write or run tests.
    Test,
    /// Design or plan.
    Design,
    /// Ship or operate.
    Deploy,
    /// Write documentation.
    Document,
    /// Ask a question.
    Ask,
}

/// How urgently the request should be treated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Urgency {
    /// No failure or severity vocabulary.
    #[default]
    Normal,
    /// Failure, defect or explicit severity vocabulary present.
    High,
}

/// Classified user request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Intent {
    /// Dominant category.
    pub category: IntentCategory,
    /// Topics mentioned (`security`, `testing`, ...).
    pub topics: BTreeSet<String>,
    /// Action verbs present.
    pub actions: BTreeSet<ActionType>,
    /// Urgency level.
    pub urgency: Urgency,
    /// Aggregate weight of code-related matches.
    pub code_score: f64,
    /// Aggregate weight of non-code (legal, HR, business) matches.
    pub non_code_score: f64,
}

impl Intent {
    /// Whether `topic` was mentioned.
    #[must_use]
    pub fn has_topic(&self, topic: &str) -> bool {
        self.topics.contains(topic)
    }

    /// Whether the request is about code at all.
    #[must_use]
    pub fn is_code_related(&self) -> bool {
        self.category.is_code()
    }

    /// Whether the request touches security.
    #[must_use]
    pub fn is_security_sensitive(&self) -> bool {
        self.has_topic("security")
    }

    /// Whether urgency is elevated.
    #[must_use]
    pub fn is_urgent(&self) -> bool {
        self.urgency == Urgency::High
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn maturity_ordering() {
        assert!(Maturity::Mvp < Maturity::PreProduction);
        assert!(Maturity::PreProduction < Maturity::Production);
    }

    #[test]
    fn maturity_serde_kebab_case() {
        let json = serde_json::to_string(&Maturity::PreProduction).unwrap();
        assert_eq!(json, "\"pre-production\"");
        let back: Maturity = serde_json::from_str("\"production\"").unwrap();
        assert_eq!(back, Maturity::Production);
    }

    #[test]
    fn maturity_parse_aliases() {
        assert_matches!(Maturity::parse("POC"), Some(Maturity::Mvp));
        assert_matches!(Maturity::parse("pre_production"), Some(Maturity::PreProduction));
        assert_matches!(Maturity::parse(" prod "), Some(Maturity::Production));
        assert!(Maturity::parse("enterprise").is_none());
    }

    #[test]
    fn confidence_degrade() {
        assert_eq!(Confidence::High.degrade(), Confidence::Medium);
        assert_eq!(Confidence::Medium.degrade(), Confidence::Low);
        assert_eq!(Confidence::Low.degrade(), Confidence::Low);
    }

    #[test]
    fn project_context_lookups() {
        let ctx = ProjectContext {
            languages: vec!["typescript".into(), "javascript".into()],
            frameworks: BTreeSet::from(["react".to_string()]),
            cloud_providers: BTreeSet::from(["vercel".to_string()]),
            ..ProjectContext::default()
        };
        assert_eq!(ctx.primary_language(), Some("typescript"));
        assert!(ctx.has_language("JavaScript"));
        assert!(ctx.has_framework("React"));
        assert!(ctx.has_cloud_provider("vercel"));
        assert!(!ctx.has_cloud_provider("aws"));
        assert!(!ctx.is_empty());
        assert!(ProjectContext::default().is_empty());
    }

    #[test]
    fn tie_break_order_debugging_first() {
        assert_eq!(IntentCategory::Debugging.priority(), 0);
        assert!(IntentCategory::Implementation.priority() < IntentCategory::Review.priority());
        assert!(IntentCategory::Documentation.priority() < IntentCategory::General.priority());
    }

    #[test]
    fn non_code_has_no_action() {
        assert!(IntentCategory::NonCode.action().is_none());
        assert!(!IntentCategory::NonCode.is_code());
        assert_eq!(IntentCategory::Debugging.action(), Some(ActionType::Debug));
    }

    #[test]
    fn intent_security_sensitivity() {
        let mut intent = Intent::default();
        assert!(!intent.is_security_sensitive());
        let _ = intent.topics.insert("security".into());
        assert!(intent.is_security_sensitive());
        assert!(!intent.is_urgent());
    }

    #[test]
    fn intent_serializes_camel_case() {
        let intent = Intent {
            category: IntentCategory::NonCode,
            non_code_score: 3.0,
            ..Intent::default()
        };
        let value = serde_json::to_value(&intent).unwrap();
        assert_eq!(value["category"], "non-code");
        assert_eq!(value["nonCodeScore"], 3.0);
    }
}
