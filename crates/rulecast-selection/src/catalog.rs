//! Rule catalog.
//!
//! The catalog is a JSON index of rule documents grouped by applicability:
//!
//! ```json
//! {
//!   "rules": {
//!     "base": [{ "name": "code-quality", "path": "base/code-quality.md" }],
//!     "languages": {
//!       "python": [{ "name": "testing", "path": "languages/python/testing.md",
//!                    "estimatedTokens": 900, "maturity": ["pre-production", "production"] }]
//!     },
//!     "frameworks": { "fastapi": [ ... ] },
//!     "cloud": { "aws": [ ... ] }
//!   }
//! }
//! ```
//!
//! A missing or malformed file yields an empty catalog from [`Catalog::load`].

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;
use std::path::Path;

use rulecast_core::Maturity;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::errors::CatalogError;

// ─────────────────────────────────────────────────────────────────────────────
// Constants
// ─────────────────────────────────────────────────────────────────────────────

/// Topics derived from the file stem when a rule declares none.
const STEM_TOPICS: &[(&str, &[&str])] = &[
    ("security", &["security", "auth", "jwt", "oauth"]),
    ("testing", &["testing", "test", "pytest", "jest"]),
    ("quality", &["quality", "standards", "style"]),
    ("performance", &["performance", "optimization", "cache"]),
    ("api", &["api", "rest", "graphql", "endpoint"]),
    ("database", &["database", "db", "sql", "query"]),
    ("deployment", &["deployment", "deploy", "ci", "cd"]),
];

// ─────────────────────────────────────────────────────────────────────────────
// Rule descriptor
// ─────────────────────────────────────────────────────────────────────────────

/// Applicability group of a rule.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleCategory {
    /// Always applicable.
    Base,
    /// Bound to a language.
    Language,
    /// Bound to a framework.
    Framework,
    /// Bound to a cloud provider.
    Cloud,
}

impl RuleCategory {
    /// Estimated token cost used when the catalog gives none.
    #[must_use]
    pub fn default_tokens(self) -> u64 {
        match self {
            Self::Base => 800,
            Self::Language => 1000,
            Self::Framework => 1200,
            Self::Cloud => 1400,
        }
    }
}

impl fmt::Display for RuleCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Base => "base",
            Self::Language => "language",
            Self::Framework => "framework",
            Self::Cloud => "cloud",
        })
    }
}

/// One selectable rule document. Immutable once loaded.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleDescriptor {
    /// Unique path of the document in the rules repository.
    pub path: String,
    /// Display name.
    pub name: String,
    /// Applicability group.
    pub category: RuleCategory,
    /// Language / framework / cloud provider the rule is bound to
    /// (`None` for base rules).
    pub target: Option<String>,
    /// Topic tags.
    pub topics: BTreeSet<String>,
    /// Maturity levels the rule applies to.
    pub maturity: BTreeSet<Maturity>,
    /// Estimated token cost.
    pub estimated_tokens: u64,
}

impl RuleDescriptor {
    /// Create a rule applicable at every maturity level, with the
    /// category's default token cost and topics derived from its path.
    pub fn new(path: impl Into<String>, category: RuleCategory, target: Option<&str>) -> Self {
        let path = path.into();
        let name = file_stem(&path).to_string();
        Self {
            topics: topics_from_stem(&name),
            name,
            path,
            category,
            target: target.map(str::to_lowercase),
            maturity: Maturity::all().iter().copied().collect(),
            estimated_tokens: category.default_tokens(),
        }
    }

    /// Replace the topic tags.
    #[must_use]
    pub fn with_topics<I, S>(mut self, topics: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.topics = topics.into_iter().map(|t| t.into().to_lowercase()).collect();
        self
    }

    /// Replace the maturity levels.
    #[must_use]
    pub fn with_maturity(mut self, levels: &[Maturity]) -> Self {
        self.maturity = levels.iter().copied().collect();
        self
    }

    /// Replace the estimated token cost.
    #[must_use]
    pub fn with_tokens(mut self, tokens: u64) -> Self {
        self.estimated_tokens = tokens;
        self
    }

    /// Whether the rule applies at `maturity`.
    #[must_use]
    pub fn applies_to(&self, maturity: Maturity) -> bool {
        self.maturity.contains(&maturity)
    }

    /// Whether the rule is limited to a subset of maturity levels.
    #[must_use]
    pub fn is_maturity_scoped(&self) -> bool {
        self.maturity.len() < Maturity::all().len()
    }
}

fn file_stem(path: &str) -> &str {
    let file = path.rsplit('/').next().unwrap_or(path);
    file.split_once('.').map_or(file, |(stem, _)| stem)
}

/// Topics implied by a file stem such as `jwt-auth` or `api_design`.
#[must_use]
pub fn topics_from_stem(stem: &str) -> BTreeSet<String> {
    let stem = stem.to_lowercase();
    let words: Vec<&str> = stem.split(['-', '_', '.', ' ']).filter(|w| !w.is_empty()).collect();
    STEM_TOPICS
        .iter()
        .filter(|(_, keywords)| words.iter().any(|w| keywords.contains(w)))
        .map(|(topic, _)| (*topic).to_string())
        .collect()
}

// ─────────────────────────────────────────────────────────────────────────────
// Raw file format
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawIndex {
    rules: RawRules,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawRules {
    base: Vec<RawRule>,
    languages: BTreeMap<String, Vec<RawRule>>,
    frameworks: BTreeMap<String, Vec<RawRule>>,
    cloud: BTreeMap<String, Vec<RawRule>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct RawRule {
    name: Option<String>,
    path: Option<String>,
    file: Option<String>,
    topics: Option<Vec<String>>,
    maturity: Option<Vec<String>>,
    estimated_tokens: Option<u64>,
}

impl RawRule {
    fn into_descriptor(self, category: RuleCategory, target: Option<&str>) -> Option<RuleDescriptor> {
        let Some(path) = self.path.or(self.file) else {
            warn!(name = ?self.name, %category, "catalog rule without a path skipped");
            return None;
        };
        let path = path.trim_start_matches('/').to_string();
        let mut rule = RuleDescriptor::new(path, category, target);
        if let Some(name) = self.name {
            rule.name = name;
        }
        if let Some(topics) = self.topics {
            rule = rule.with_topics(topics);
        }
        if let Some(tokens) = self.estimated_tokens {
            rule.estimated_tokens = tokens;
        }
        if let Some(levels) = self.maturity {
            let parsed: BTreeSet<Maturity> = levels
                .iter()
                .filter_map(|level| {
                    let parsed = Maturity::parse(level);
                    if parsed.is_none() {
                        warn!(path = %rule.path, level = %level, "unknown maturity level ignored");
                    }
                    parsed
                })
                .collect();
            if !parsed.is_empty() {
                rule.maturity = parsed;
            }
        }
        Some(rule)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Catalog
// ─────────────────────────────────────────────────────────────────────────────

/// Read-only inventory of rule documents, keyed by path.
#[derive(Clone, Debug, Default)]
pub struct Catalog {
    rules: Vec<RuleDescriptor>,
    index: HashMap<String, usize>,
}

impl Catalog {
    /// Build a catalog. Duplicate paths keep the first definition.
    #[must_use]
    pub fn new(rules: Vec<RuleDescriptor>) -> Self {
        let mut catalog = Self::default();
        for rule in rules {
            if catalog.index.contains_key(&rule.path) {
                debug!(path = %rule.path, "duplicate catalog path ignored");
                continue;
            }
            let _ = catalog.index.insert(rule.path.clone(), catalog.rules.len());
            catalog.rules.push(rule);
        }
        catalog
    }

    /// An empty catalog.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Parse a catalog index document.
    pub fn from_json_str(json: &str) -> Result<Self, CatalogError> {
        let raw: RawIndex = serde_json::from_str(json)?;
        let RawRules {
            base,
            languages,
            frameworks,
            cloud,
        } = raw.rules;

        let mut rules: Vec<RuleDescriptor> = base
            .into_iter()
            .filter_map(|r| r.into_descriptor(RuleCategory::Base, None))
            .collect();
        for (category, groups) in [
            (RuleCategory::Language, languages),
            (RuleCategory::Framework, frameworks),
            (RuleCategory::Cloud, cloud),
        ] {
            for (target, entries) in groups {
                rules.extend(
                    entries
                        .into_iter()
                        .filter_map(|r| r.into_descriptor(category, Some(&target))),
                );
            }
        }
        Ok(Self::new(rules))
    }

    /// Read and parse a catalog file, surfacing errors.
    pub fn try_load(path: &Path) -> Result<Self, CatalogError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json_str(&content)
    }

    /// Read a catalog file. Missing or malformed files yield an empty catalog.
    #[must_use]
    pub fn load(path: &Path) -> Self {
        match Self::try_load(path) {
            Ok(catalog) => {
                debug!(path = %path.display(), rules = catalog.len(), "catalog loaded");
                catalog
            }
            Err(CatalogError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "no catalog file, using empty catalog");
                Self::empty()
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "catalog unusable, using empty catalog");
                Self::empty()
            }
        }
    }

    /// All rules, in load order.
    #[must_use]
    pub fn rules(&self) -> &[RuleDescriptor] {
        &self.rules
    }

    /// Look up a rule by path.
    #[must_use]
    pub fn get(&self, path: &str) -> Option<&RuleDescriptor> {
        self.index.get(path).map(|i| &self.rules[*i])
    }

    /// Whether a rule with `path` exists.
    #[must_use]
    pub fn contains(&self, path: &str) -> bool {
        self.index.contains_key(path)
    }

    /// Number of rules.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Whether the catalog has no rules.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
