//! Layered settings loading.
//!
//! Compiled defaults are serialized to JSON, the user file is merged over
//! them key by key, and the result is deserialized back. `RULECAST_*`
//! environment variables are applied last. Only a present-but-broken
//! settings file is an error; a missing one means defaults.

use std::path::{Path, PathBuf};

use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::errors::{Result, SettingsError};
use crate::types::RulecastSettings;

/// `$HOME`, or `/tmp` when unset.
fn home_dir() -> PathBuf {
    std::env::var_os("HOME").map_or_else(|| PathBuf::from("/tmp"), PathBuf::from)
}

/// `~/.rulecast/settings.json`.
pub fn settings_path() -> PathBuf {
    home_dir().join(".rulecast").join("settings.json")
}

/// Expand a leading `~` or `~/` to the home directory.
pub fn expand_home(path: &str) -> PathBuf {
    match path.strip_prefix("~/") {
        Some(rest) => home_dir().join(rest),
        None if path == "~" => home_dir(),
        None => PathBuf::from(path),
    }
}

/// [`load_settings_from_path`] on [`settings_path`].
pub fn load_settings() -> Result<RulecastSettings> {
    load_settings_from_path(&settings_path())
}

/// Defaults, then the file at `path` (if it exists), then the environment.
pub fn load_settings_from_path(path: &Path) -> Result<RulecastSettings> {
    let mut settings = load_file_layer(path)?;
    apply_env_overrides(&mut settings);
    Ok(settings)
}

/// Defaults with the user file merged over them, no environment.
fn load_file_layer(path: &Path) -> Result<RulecastSettings> {
    let mut layered = serde_json::to_value(RulecastSettings::default())?;

    if path.exists() {
        debug!(path = %path.display(), "reading settings file");
        let content = std::fs::read_to_string(path).map_err(|source| SettingsError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let user: Value = serde_json::from_str(&content).map_err(|source| SettingsError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        layered = deep_merge(layered, user);
    } else {
        debug!(path = %path.display(), "no settings file, using defaults");
    }

    Ok(serde_json::from_value(layered)?)
}

/// Merge `overlay` into `base`.
///
/// Two objects merge per key, recursively. Anything else in `overlay`
/// (arrays, scalars) wins outright. `null` in an overlay object leaves the
/// base value alone.
pub fn deep_merge(base: Value, overlay: Value) -> Value {
    match (base, overlay) {
        (Value::Object(mut base), Value::Object(overlay)) => {
            merge_maps(&mut base, overlay);
            Value::Object(base)
        }
        (_, overlay) => overlay,
    }
}

fn merge_maps(base: &mut Map<String, Value>, overlay: Map<String, Value>) {
    for (key, value) in overlay.into_iter().filter(|(_, v)| !v.is_null()) {
        let merged = match base.remove(&key) {
            Some(existing) => deep_merge(existing, value),
            None => value,
        };
        let _ = base.insert(key, merged);
    }
}

/// Apply `RULECAST_*` and `GITHUB_TOKEN` from the process environment.
pub fn apply_env_overrides(settings: &mut RulecastSettings) {
    apply_overrides_from(settings, |name| std::env::var(name).ok());
}

/// Apply overrides read through `lookup`.
///
/// Empty values count as unset. A value that does not parse, or falls
/// outside its allowed range, is logged and skipped so the file or default
/// value stays in effect.
pub fn apply_overrides_from<F>(settings: &mut RulecastSettings, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    let env = EnvReader { lookup };

    // ── Remote ──────────────────────────────────────────────────────
    if let Some(v) = env.string("RULECAST_REPO") {
        settings.remote.repository = v;
    }
    if let Some(v) = env.string("RULECAST_REF") {
        settings.remote.reference = v;
    }
    if let Some(v) = env.string("RULECAST_REMOTE_URL") {
        settings.remote.base_url = v;
    }
    if let Some(v) = env.string("GITHUB_TOKEN") {
        settings.remote.token = Some(v);
    }

    // ── Catalog / cache ─────────────────────────────────────────────
    if let Some(v) = env.string("RULECAST_CATALOG") {
        settings.catalog.path = v;
    }
    if let Some(v) = env.u64_in("RULECAST_CACHE_TTL_SECS", 0, 7 * 24 * 3600) {
        settings.cache.ttl_secs = v;
    }

    // ── Selection ───────────────────────────────────────────────────
    // Signed on purpose: negative limits are rejected downstream.
    if let Some(v) = env.i64("RULECAST_MAX_RULES") {
        settings.selection.max_rules = v;
    }
    if let Some(v) = env.i64("RULECAST_TOKEN_BUDGET") {
        settings.selection.token_budget = v;
    }

    // ── Hook / logging ──────────────────────────────────────────────
    if let Some(v) = env.u64_in("RULECAST_DEADLINE_MS", 100, 60_000) {
        settings.hook.deadline_ms = v;
    }
    if let Some(v) = env.bool("RULECAST_ENABLED") {
        settings.hook.enabled = v;
    }
    if let Some(v) = env.string("RULECAST_LOG_LEVEL") {
        settings.logging.level = v;
    }
}

// ── Value parsing ───────────────────────────────────────────────────────────

/// `true`/`1`/`yes`/`on` or `false`/`0`/`no`/`off`, any case.
pub fn parse_bool(val: &str) -> Option<bool> {
    match val.to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// A `u64` in `min..=max`.
pub fn parse_u64_range(val: &str, min: u64, max: u64) -> Option<u64> {
    let n: u64 = val.trim().parse().ok()?;
    (n >= min && n <= max).then_some(n)
}

// ── Lookup wrapper ──────────────────────────────────────────────────────────

struct EnvReader<F> {
    lookup: F,
}

impl<F> EnvReader<F>
where
    F: Fn(&str) -> Option<String>,
{
    fn string(&self, name: &str) -> Option<String> {
        (self.lookup)(name).filter(|v| !v.is_empty())
    }

    fn bool(&self, name: &str) -> Option<bool> {
        let val = self.string(name)?;
        parse_bool(&val).or_else(|| {
            warn!(key = name, value = %val, "ignoring non-boolean env override");
            None
        })
    }

    fn u64_in(&self, name: &str, min: u64, max: u64) -> Option<u64> {
        let val = self.string(name)?;
        parse_u64_range(&val, min, max).or_else(|| {
            warn!(key = name, value = %val, min, max, "ignoring out-of-range env override");
            None
        })
    }

    fn i64(&self, name: &str) -> Option<i64> {
        let val = self.string(name)?;
        val.trim().parse().ok().or_else(|| {
            warn!(key = name, value = %val, "ignoring non-integer env override");
            None
        })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn env_of(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |name: &str| map.get(name).cloned()
    }

    // ── deep_merge ──────────────────────────────────────────────────

    #[test]
    fn merge_nested_override() {
        let target = serde_json::json!({"cache": {"ttlSecs": 3600, "maxEntries": 256}});
        let source = serde_json::json!({"cache": {"ttlSecs": 60}});
        let merged = deep_merge(target, source);
        assert_eq!(merged["cache"]["ttlSecs"], 60);
        assert_eq!(merged["cache"]["maxEntries"], 256);
    }

    #[test]
    fn merge_null_keeps_default() {
        let base = serde_json::json!({"hook": {"enabled": true, "deadlineMs": 3000}});
        let overlay = serde_json::json!({"hook": {"enabled": null, "deadlineMs": 500}});
        let merged = deep_merge(base, overlay);
        assert_eq!(merged["hook"]["enabled"], true);
        assert_eq!(merged["hook"]["deadlineMs"], 500);
    }

    #[test]
    fn merge_scalar_over_object_replaces() {
        let base = serde_json::json!({"catalog": {"path": "~/.rulecast/catalog.json"}});
        let overlay = serde_json::json!({"catalog": "flat"});
        assert_eq!(deep_merge(base, overlay)["catalog"], "flat");
    }

    #[test]
    fn wrong_shape_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, r#"{"selection": {"maxRules": "five"}}"#).unwrap();
        let err = load_file_layer(&path).unwrap_err();
        assert!(matches!(err, SettingsError::Shape(_)));
    }

    // ── file loading ────────────────────────────────────────────────

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let settings = load_file_layer(&dir.path().join("nope.json")).unwrap();
        assert_eq!(settings.selection.max_rules, 5);
        assert_eq!(settings.remote.reference, "main");
    }

    #[test]
    fn user_file_merges_over_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(
            &path,
            r#"{"remote": {"repository": "acme/rules"}, "selection": {"weights": {"topic": 40}}}"#,
        )
        .unwrap();
        let settings = load_file_layer(&path).unwrap();
        assert_eq!(settings.remote.repository, "acme/rules");
        assert_eq!(settings.remote.reference, "main");
        assert_eq!(settings.selection.weights.topic, 40);
        assert_eq!(settings.selection.weights.language, 100);
    }

    #[test]
    fn invalid_json_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, "{not json").unwrap();
        let err = load_file_layer(&path).unwrap_err();
        assert!(matches!(err, SettingsError::Parse { .. }));
        assert!(err.to_string().contains("settings.json"));
    }

    // ── env overrides ───────────────────────────────────────────────

    #[test]
    fn env_overrides_apply() {
        let mut settings = RulecastSettings::default();
        apply_overrides_from(
            &mut settings,
            env_of(&[
                ("RULECAST_REPO", "acme/rules"),
                ("RULECAST_REF", "v2"),
                ("RULECAST_MAX_RULES", "3"),
                ("RULECAST_TOKEN_BUDGET", "1200"),
                ("RULECAST_ENABLED", "off"),
                ("GITHUB_TOKEN", "ghp_x"),
            ]),
        );
        assert_eq!(settings.remote.repository, "acme/rules");
        assert_eq!(settings.remote.reference, "v2");
        assert_eq!(settings.selection.max_rules, 3);
        assert_eq!(settings.selection.token_budget, 1200);
        assert!(!settings.hook.enabled);
        assert_eq!(settings.remote.token.as_deref(), Some("ghp_x"));
    }

    #[test]
    fn negative_budget_is_carried_through() {
        let mut settings = RulecastSettings::default();
        apply_overrides_from(&mut settings, env_of(&[("RULECAST_TOKEN_BUDGET", "-5")]));
        assert_eq!(settings.selection.token_budget, -5);
    }

    #[test]
    fn invalid_env_values_ignored() {
        let mut settings = RulecastSettings::default();
        apply_overrides_from(
            &mut settings,
            env_of(&[
                ("RULECAST_ENABLED", "maybe"),
                ("RULECAST_DEADLINE_MS", "5"),
                ("RULECAST_MAX_RULES", "lots"),
                ("RULECAST_REPO", ""),
            ]),
        );
        assert!(settings.hook.enabled);
        assert_eq!(settings.hook.deadline_ms, 3000);
        assert_eq!(settings.selection.max_rules, 5);
        assert_eq!(settings.remote.repository, RulecastSettings::default().remote.repository);
    }

    // ── parsing helpers ─────────────────────────────────────────────

    #[test]
    fn parse_bool_variants() {
        assert_eq!(parse_bool("YES"), Some(true));
        assert_eq!(parse_bool("0"), Some(false));
        assert_eq!(parse_bool("nah"), None);
    }

    #[test]
    fn parse_u64_range_bounds() {
        assert_eq!(parse_u64_range("100", 100, 200), Some(100));
        assert_eq!(parse_u64_range("201", 100, 200), None);
        assert_eq!(parse_u64_range("-1", 0, 10), None);
    }

    #[test]
    fn expand_home_prefix() {
        let expanded = expand_home("~/.rulecast/catalog.json");
        assert!(expanded.ends_with(".rulecast/catalog.json"));
        assert!(!expanded.to_string_lossy().starts_with('~'));
        assert_eq!(expand_home("/abs/path"), PathBuf::from("/abs/path"));
    }
}
