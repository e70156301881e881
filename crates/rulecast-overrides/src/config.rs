//! Override configuration.
//!
//! ```json
//! {
//!   "merge_strategy": "extend",
//!   "overrides": {
//!     "base/code-quality.md": "replace",
//!     "languages/python/*": "prepend"
//!   },
//!   "exclude": ["cloud/**"]
//! }
//! ```
//!
//! The whole document is validated up front; any bad field rejects the
//! config before a single path is merged. Unknown top-level keys are
//! ignored. In patterns `*` stays within one path segment and `**` crosses
//! segments.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::Path;

use globset::{GlobBuilder, GlobMatcher};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::errors::{OverrideError, Result};

// ─────────────────────────────────────────────────────────────────────────────
// Strategy
// ─────────────────────────────────────────────────────────────────────────────

/// How a local body combines with the central one.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MergeStrategy {
    /// Central body, then local body.
    #[default]
    Extend,
    /// Local body only.
    Replace,
    /// Local body, then central body.
    Prepend,
}

/// Separator between concatenated bodies.
pub const SEPARATOR: &str = "\n\n";

impl MergeStrategy {
    /// Every recognized strategy.
    #[must_use]
    pub fn all() -> &'static [MergeStrategy] {
        &[Self::Extend, Self::Replace, Self::Prepend]
    }

    /// Parse a strategy name (exact, lowercase).
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "extend" => Some(Self::Extend),
            "replace" => Some(Self::Replace),
            "prepend" => Some(Self::Prepend),
            _ => None,
        }
    }

    /// Canonical name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Extend => "extend",
            Self::Replace => "replace",
            Self::Prepend => "prepend",
        }
    }

    /// Combine `central` and `local`. Both bodies are kept whole.
    #[must_use]
    pub fn apply(self, central: &str, local: &str) -> String {
        match self {
            Self::Extend => format!("{central}{SEPARATOR}{local}"),
            Self::Replace => local.to_string(),
            Self::Prepend => format!("{local}{SEPARATOR}{central}"),
        }
    }
}

impl fmt::Display for MergeStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Patterns
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Clone, Debug)]
struct GlobRule<T> {
    pattern: String,
    matcher: GlobMatcher,
    value: T,
}

fn is_glob(pattern: &str) -> bool {
    pattern.contains(['*', '?', '[', '{'])
}

fn compile_glob(field: &str, pattern: &str) -> Result<GlobMatcher> {
    GlobBuilder::new(pattern)
        .literal_separator(true)
        .build()
        .map(|g| g.compile_matcher())
        .map_err(|e| OverrideError::invalid(field, format!("invalid pattern `{pattern}`: {e}")))
}

fn normalize(path: &str) -> &str {
    path.trim_start_matches("./").trim_start_matches('/')
}

// ─────────────────────────────────────────────────────────────────────────────
// Config
// ─────────────────────────────────────────────────────────────────────────────

/// Validated override configuration.
#[derive(Clone, Debug, Default)]
pub struct OverrideConfig {
    default_strategy: MergeStrategy,
    exact: BTreeMap<String, MergeStrategy>,
    globs: Vec<GlobRule<MergeStrategy>>,
    exclude_exact: BTreeSet<String>,
    exclude_globs: Vec<GlobRule<()>>,
}

impl OverrideConfig {
    /// Load from a file. A missing file is the default config.
    pub fn load(path: &Path) -> Result<Self> {
        match std::fs::read_to_string(path) {
            Ok(content) => Self::from_json_str(&content),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "no override config, using defaults");
                Ok(Self::default())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Parse and validate a JSON document.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(json)?;
        Self::from_value(&value)
    }

    /// Validate a parsed JSON document.
    pub fn from_value(value: &Value) -> Result<Self> {
        let root = value
            .as_object()
            .ok_or_else(|| OverrideError::invalid("$", "expected an object"))?;
        let mut config = Self::default();

        if let Some(raw) = root.get("merge_strategy").filter(|v| !v.is_null()) {
            config.default_strategy = parse_strategy("merge_strategy", raw)?;
        }

        if let Some(raw) = root.get("overrides").filter(|v| !v.is_null()) {
            let map = raw
                .as_object()
                .ok_or_else(|| OverrideError::invalid("overrides", "expected an object of pattern to strategy"))?;
            for (pattern, raw_strategy) in map {
                let field = format!("overrides.{pattern}");
                let strategy = parse_strategy(&field, raw_strategy)?;
                let pattern = normalize(pattern).to_string();
                if is_glob(&pattern) {
                    let matcher = compile_glob(&field, &pattern)?;
                    config.globs.push(GlobRule {
                        pattern,
                        matcher,
                        value: strategy,
                    });
                } else {
                    let _ = config.exact.insert(pattern, strategy);
                }
            }
        }

        if let Some(raw) = root.get("exclude").filter(|v| !v.is_null()) {
            let list = raw
                .as_array()
                .ok_or_else(|| OverrideError::invalid("exclude", "expected a list of patterns"))?;
            for (i, item) in list.iter().enumerate() {
                let field = format!("exclude[{i}]");
                let pattern = item
                    .as_str()
                    .ok_or_else(|| OverrideError::invalid(&field, "expected a string pattern"))?;
                let pattern = normalize(pattern).to_string();
                if is_glob(&pattern) {
                    let matcher = compile_glob(&field, &pattern)?;
                    config.exclude_globs.push(GlobRule {
                        pattern,
                        matcher,
                        value: (),
                    });
                } else {
                    let _ = config.exclude_exact.insert(pattern);
                }
            }
        }

        // longest pattern first, then lexicographic
        config
            .globs
            .sort_by(|a, b| b.pattern.len().cmp(&a.pattern.len()).then_with(|| a.pattern.cmp(&b.pattern)));
        Ok(config)
    }

    /// Global default strategy.
    #[must_use]
    pub fn default_strategy(&self) -> MergeStrategy {
        self.default_strategy
    }

    /// Effective strategy for `path`: exact entry, then the most specific
    /// matching glob, then the default.
    #[must_use]
    pub fn strategy_for(&self, path: &str) -> MergeStrategy {
        let path = normalize(path);
        if let Some(strategy) = self.exact.get(path) {
            return *strategy;
        }
        self.globs
            .iter()
            .find(|g| g.matcher.is_match(path))
            .map_or(self.default_strategy, |g| g.value)
    }

    /// Whether `path` matches an exclusion.
    #[must_use]
    pub fn is_excluded(&self, path: &str) -> bool {
        let path = normalize(path);
        self.exclude_exact.contains(path) || self.exclude_globs.iter().any(|g| g.matcher.is_match(path))
    }
}

fn parse_strategy(field: &str, value: &Value) -> Result<MergeStrategy> {
    let name = value
        .as_str()
        .ok_or_else(|| OverrideError::invalid(field, "expected a strategy name"))?;
    MergeStrategy::parse(name).ok_or_else(|| {
        let known: Vec<&str> = MergeStrategy::all().iter().map(|s| s.as_str()).collect();
        OverrideError::invalid(
            field,
            format!("unknown strategy `{name}` (expected one of {})", known.join(", ")),
        )
    })
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
