//! Merge engine.
//!
//! [`OverrideEngine::load`] validates the config and reads the local
//! bodies; it is the only fallible step, so an invalid config is rejected
//! before any path is merged. Merging itself cannot fail and never alters
//! a central body partially: it is kept, replaced, or concatenated whole.

use std::path::Path;

use rulecast_settings::OverrideSettings;
use serde::Serialize;
use tracing::debug;

use crate::config::{MergeStrategy, OverrideConfig};
use crate::errors::Result;
use crate::local::LocalOverrides;

/// How a final body was produced.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "strategy", rename_all = "camelCase")]
pub enum MergeDecision {
    /// Central body, no local override present.
    Central,
    /// Local override present but excluded; central body unchanged.
    Excluded,
    /// Local override merged with the given strategy.
    Merged(MergeStrategy),
    /// Local-only rule, included verbatim.
    LocalOnly,
}

/// Central side of one selected path, as resolved by the fetch stage.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CentralBody<'a> {
    /// Body fetched (or served from cache).
    Present(&'a str),
    /// The remote has no document at this path.
    Absent,
    /// The fetch failed with nothing cached; the path is not merged.
    Failed,
}

impl<'a> CentralBody<'a> {
    fn body(self) -> Option<&'a str> {
        match self {
            Self::Present(body) => Some(body),
            Self::Absent | Self::Failed => None,
        }
    }
}

/// A final rule body.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MergedRule {
    /// Rule path.
    pub path: String,
    /// Body to inject.
    pub content: String,
    /// How `content` was produced.
    pub decision: MergeDecision,
}

/// Validated config plus local bodies.
#[derive(Clone, Debug, Default)]
pub struct OverrideEngine {
    config: OverrideConfig,
    local: LocalOverrides,
}

impl OverrideEngine {
    /// Create from parts.
    #[must_use]
    pub fn new(config: OverrideConfig, local: LocalOverrides) -> Self {
        Self { config, local }
    }

    /// Load the config and local bodies for a project.
    ///
    /// # Errors
    ///
    /// Fails when the config file is unreadable or invalid.
    pub fn load(project_root: &Path, settings: &OverrideSettings) -> Result<Self> {
        let dir = project_root.join(&settings.dir);
        let config = OverrideConfig::load(&dir.join(&settings.config_file))?;
        let local = LocalOverrides::scan(&dir);
        Ok(Self::new(config, local))
    }

    /// The validated config.
    #[must_use]
    pub fn config(&self) -> &OverrideConfig {
        &self.config
    }

    /// The local bodies.
    #[must_use]
    pub fn local(&self) -> &LocalOverrides {
        &self.local
    }

    /// Final body for one path. `None` when neither side has a body, or
    /// when an excluded local-only body is all there is.
    #[must_use]
    pub fn merge(&self, path: &str, central: Option<&str>) -> Option<MergedRule> {
        let rule = |content: String, decision| MergedRule {
            path: path.to_string(),
            content,
            decision,
        };

        let Some(local) = self.local.get(path) else {
            return central.map(|c| rule(c.to_string(), MergeDecision::Central));
        };
        if self.config.is_excluded(path) {
            debug!(path, "local override excluded");
            return central.map(|c| rule(c.to_string(), MergeDecision::Excluded));
        }
        match central {
            Some(central) => {
                let strategy = self.config.strategy_for(path);
                Some(rule(strategy.apply(central, local), MergeDecision::Merged(strategy)))
            }
            None => Some(rule(local.to_string(), MergeDecision::LocalOnly)),
        }
    }

    /// Merge every selected path, then append local-only rules.
    ///
    /// `central` pairs each selected path with its fetch result. Failed
    /// paths are dropped whole, local override included; an absent path
    /// falls back to its local body. Local bodies whose path satisfies
    /// `in_catalog` are overrides and only apply to selected paths; the
    /// rest are local-only and always included unless excluded.
    pub fn merge_all<'a, I, F>(&self, central: I, in_catalog: F) -> Vec<MergedRule>
    where
        I: IntoIterator<Item = (&'a str, CentralBody<'a>)>,
        F: Fn(&str) -> bool,
    {
        let mut failed: Vec<&str> = Vec::new();
        let mut merged: Vec<MergedRule> = Vec::new();
        for (path, body) in central {
            if body == CentralBody::Failed {
                debug!(path, "central fetch failed, path not merged");
                failed.push(path);
                continue;
            }
            if let Some(rule) = self.merge(path, body.body()) {
                merged.push(rule);
            }
        }

        for path in self.local.paths() {
            if in_catalog(path)
                || failed.iter().any(|f| *f == path)
                || merged.iter().any(|m| m.path == path)
            {
                continue;
            }
            if self.config.is_excluded(path) {
                debug!(path, "local-only rule excluded");
                continue;
            }
            if let Some(rule) = self.merge(path, None) {
                merged.push(rule);
            }
        }
        merged
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::OverrideError;
    use assert_matches::assert_matches;
    use std::fs;

    const C: &str = "# Central\ncentral body";
    const L: &str = "# Local\nlocal body";

    fn engine(config: &str, local: &[(&str, &str)]) -> OverrideEngine {
        OverrideEngine::new(
            OverrideConfig::from_json_str(config).unwrap(),
            LocalOverrides::from_pairs(local.iter().copied()),
        )
    }

    #[test]
    fn extend_keeps_central_then_local() {
        let e = engine("{}", &[("a.md", L)]);
        let out = e.merge("a.md", Some(C)).unwrap();
        assert!(out.content.starts_with(C));
        assert!(out.content.ends_with(L));
        assert_eq!(out.decision, MergeDecision::Merged(MergeStrategy::Extend));
    }

    #[test]
    fn replace_drops_central() {
        let e = engine(r#"{"merge_strategy": "replace"}"#, &[("a.md", L)]);
        let out = e.merge("a.md", Some(C)).unwrap();
        assert_eq!(out.content, L);
        assert!(!out.content.contains("central body"));
    }

    #[test]
    fn prepend_keeps_local_then_central() {
        let e = engine(r#"{"overrides": {"a.md": "prepend"}}"#, &[("a.md", L)]);
        let out = e.merge("a.md", Some(C)).unwrap();
        assert!(out.content.starts_with(L));
        assert!(out.content.ends_with(C));
    }

    #[test]
    fn exclusion_returns_central_unchanged() {
        for strategy in ["extend", "replace", "prepend"] {
            let config = format!(r#"{{"merge_strategy": "{strategy}", "exclude": ["a.md"]}}"#);
            let e = engine(&config, &[("a.md", L)]);
            let out = e.merge("a.md", Some(C)).unwrap();
            assert_eq!(out.content, C);
            assert_eq!(out.decision, MergeDecision::Excluded);
        }
    }

    #[test]
    fn no_local_is_central() {
        let e = engine("{}", &[]);
        let out = e.merge("a.md", Some(C)).unwrap();
        assert_eq!(out.content, C);
        assert_eq!(out.decision, MergeDecision::Central);
        assert!(e.merge("a.md", None).is_none());
    }

    #[test]
    fn local_only_included_verbatim_regardless_of_strategy() {
        let e = engine(r#"{"merge_strategy": "replace"}"#, &[("team/conventions.md", L)]);
        let merged = e.merge_all([("a.md", CentralBody::Present(C))], |p| p == "a.md");
        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].content, C);
        assert_eq!(merged[1].path, "team/conventions.md");
        assert_eq!(merged[1].content, L);
        assert_eq!(merged[1].decision, MergeDecision::LocalOnly);
    }

    #[test]
    fn overrides_of_unselected_rules_ignored() {
        let e = engine("{}", &[("b.md", L)]);
        let merged = e.merge_all([("a.md", CentralBody::Present(C))], |p| p == "a.md" || p == "b.md");
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].path, "a.md");
    }

    #[test]
    fn excluded_local_only_dropped() {
        let e = engine(r#"{"exclude": ["drafts/**"]}"#, &[("drafts/wip.md", L)]);
        let merged = e.merge_all(std::iter::empty(), |_| false);
        assert!(merged.is_empty());
    }

    #[test]
    fn failed_central_is_not_merged() {
        for strategy in ["extend", "replace", "prepend"] {
            let config = format!(r#"{{"merge_strategy": "{strategy}"}}"#);
            let e = engine(&config, &[("a.md", L), ("b.md", L)]);
            let merged = e.merge_all(
                [("a.md", CentralBody::Failed), ("b.md", CentralBody::Present(C))],
                |p| p == "a.md" || p == "b.md",
            );
            assert_eq!(merged.len(), 1);
            assert_eq!(merged[0].path, "b.md");
        }
    }

    #[test]
    fn failed_path_outside_catalog_is_not_reinjected() {
        let e = engine("{}", &[("a.md", L)]);
        let merged = e.merge_all([("a.md", CentralBody::Failed)], |_| false);
        assert!(merged.is_empty());
    }

    #[test]
    fn absent_central_falls_back_to_local() {
        let e = engine("{}", &[("a.md", L)]);
        let merged = e.merge_all([("a.md", CentralBody::Absent)], |p| p == "a.md");
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].content, L);
        assert_eq!(merged[0].decision, MergeDecision::LocalOnly);
    }

    #[test]
    fn load_reads_config_and_bodies() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join(".claude/rules-local");
        fs::create_dir_all(dir.join("base")).unwrap();
        fs::write(dir.join("rules-config.json"), r#"{"merge_strategy": "prepend"}"#).unwrap();
        fs::write(dir.join("base/code-quality.md"), L).unwrap();

        let e = OverrideEngine::load(tmp.path(), &OverrideSettings::default()).unwrap();
        let out = e.merge("base/code-quality.md", Some(C)).unwrap();
        assert_eq!(out.content, format!("{L}\n\n{C}"));
    }

    #[test]
    fn invalid_config_aborts_load() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join(".claude/rules-local");
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("rules-config.json"), r#"{"merge_strategy": "squash"}"#).unwrap();
        fs::write(dir.join("a.md"), L).unwrap();

        let result = OverrideEngine::load(tmp.path(), &OverrideSettings::default());
        assert_matches!(result, Err(OverrideError::InvalidConfig { .. }));
    }

    #[test]
    fn missing_override_dir_is_noop() {
        let tmp = tempfile::tempdir().unwrap();
        let e = OverrideEngine::load(tmp.path(), &OverrideSettings::default()).unwrap();
        assert!(e.local().is_empty());
        assert_eq!(e.merge("a.md", Some(C)).unwrap().content, C);
    }
}
