//! Per-request pipeline.
//!
//! ```text
//! intent ─┬─ detect context ─┐
//!         ├─ load overrides ─┼─ select ─ fetch ─ merge ─ format
//!         └─ load catalog ───┘
//! ```
//!
//! [`RuleHook::handle`] is the only entry point and cannot fail: errors,
//! panics and deadline overruns all become [`HookOutcome::Degraded`]
//! (fail-open). The content cache lives as long as the hook, so repeated
//! requests in one process share it.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use parking_lot::Mutex;
use rulecast_context::{ContextDetector, IntentAnalyzer};
use rulecast_core::IntentCategory;
use rulecast_fetch::{
    ContentCache, ContentCacheConfig, FetchOutcome, FetchReport, GitHubRawSource, RemoteSource,
    RetryPolicy, RuleFetcher,
};
use rulecast_overrides::{CentralBody, MergedRule, OverrideEngine};
use rulecast_selection::{CatalogStore, RuleSelector, SelectionLimits, SelectionResult};
use rulecast_settings::{RulecastSettings, expand_home};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::errors::{HookError, Result};
use crate::format::{decision_label, format_rules};
use crate::types::{AppliedRule, HookMetadata, HookOutcome, HookRequest};

/// Extra time past the deadline for the fetch stage to settle stale
/// fallbacks before the whole pipeline is abandoned.
const SETTLE_GRACE: Duration = Duration::from_millis(250);

fn elapsed_ms(since: Instant) -> u64 {
    u64::try_from(since.elapsed().as_millis()).unwrap_or(u64::MAX)
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

fn central_body<'a>(report: &'a FetchReport, path: &str) -> CentralBody<'a> {
    match report.outcome(path) {
        None | Some(FetchOutcome::Failed { .. }) => CentralBody::Failed,
        Some(outcome) => outcome.content().map_or(CentralBody::Absent, CentralBody::Present),
    }
}

fn applied_rule(merged: &MergedRule, selection: &SelectionResult) -> AppliedRule {
    let scored = selection.rules.iter().find(|r| r.rule.path == merged.path);
    AppliedRule {
        path: merged.path.clone(),
        score: scored.map(|r| r.score),
        estimated_tokens: scored.map(|r| r.rule.estimated_tokens),
        source: decision_label(merged.decision),
        reasons: scored.map(|r| r.reasons.clone()).unwrap_or_default(),
    }
}

/// The rule injection hook.
pub struct RuleHook {
    settings: RulecastSettings,
    detector: ContextDetector,
    analyzer: IntentAnalyzer,
    selector: RuleSelector,
    catalog: Arc<CatalogStore>,
    fetcher: RuleFetcher,
}

impl RuleHook {
    /// Create a hook with an explicit catalog store and remote source.
    pub fn new(
        settings: RulecastSettings,
        catalog: Arc<CatalogStore>,
        source: Arc<dyn RemoteSource>,
    ) -> Self {
        let cache = ContentCache::new(ContentCacheConfig::from_settings(&settings.cache));
        let fetcher = RuleFetcher::new(
            source,
            Arc::new(Mutex::new(cache)),
            settings.cache.max_concurrent_fetches,
        )
        .with_retry(RetryPolicy::from_settings(&settings.remote.retry));
        Self {
            detector: ContextDetector::default(),
            analyzer: IntentAnalyzer::new(),
            selector: RuleSelector::new(settings.selection.weights.clone()),
            catalog,
            fetcher,
            settings,
        }
    }

    /// Create a hook reading the catalog file and the GitHub repository
    /// named in `settings`.
    #[must_use]
    pub fn from_settings(settings: RulecastSettings) -> Self {
        let catalog = Arc::new(CatalogStore::new(expand_home(&settings.catalog.path)));
        let source: Arc<dyn RemoteSource> = Arc::new(GitHubRawSource::from_settings(&settings.remote));
        Self::new(settings, catalog, source)
    }

    /// Active settings.
    #[must_use]
    pub fn settings(&self) -> &RulecastSettings {
        &self.settings
    }

    /// The catalog store.
    #[must_use]
    pub fn catalog(&self) -> &Arc<CatalogStore> {
        &self.catalog
    }

    /// The shared content cache.
    #[must_use]
    pub fn cache(&self) -> &Arc<Mutex<ContentCache>> {
        self.fetcher.cache()
    }

    /// Handle one request. Never fails and never panics outward.
    pub async fn handle(&self, request: &HookRequest) -> HookOutcome {
        let started = Instant::now();
        let hook = &self.settings.hook;
        if !hook.enabled {
            debug!("rule injection disabled");
            return HookOutcome::skipped("disabled");
        }

        let deadline = started + Duration::from_millis(hook.deadline_ms);
        let pipeline = AssertUnwindSafe(self.run(request, deadline)).catch_unwind();

        let mut outcome = match tokio::time::timeout_at(deadline + SETTLE_GRACE, pipeline).await {
            Ok(Ok(Ok(outcome))) => outcome,
            Ok(Ok(Err(e))) => {
                warn!(error = %e, "rule injection failed (fail-open)");
                HookOutcome::degraded(e.to_string())
            }
            Ok(Err(payload)) => {
                let e = HookError::Panicked(panic_message(payload.as_ref()));
                warn!(error = %e, "rule injection panicked (fail-open)");
                HookOutcome::degraded(e.to_string())
            }
            Err(_) => {
                let e = HookError::DeadlineExceeded {
                    deadline_ms: hook.deadline_ms,
                };
                warn!(deadline_ms = hook.deadline_ms, "rule injection timed out (fail-open)");
                HookOutcome::degraded(e.to_string())
            }
        };

        let total_ms = elapsed_ms(started);
        outcome.metadata_mut().timings.total_ms = total_ms;
        if total_ms > hook.slow_warning_ms {
            warn!(total_ms, slow_warning_ms = hook.slow_warning_ms, "slow rule injection");
        } else {
            debug!(total_ms, degraded = outcome.is_degraded(), "rule injection finished");
        }
        outcome
    }

    async fn run(&self, request: &HookRequest, deadline: Instant) -> Result<HookOutcome> {
        let root: PathBuf = match &request.cwd {
            Some(cwd) => cwd.clone(),
            None => std::env::current_dir().map_err(HookError::NoProjectRoot)?,
        };
        let mut metadata = HookMetadata::default();
        let mut degraded: Option<String> = None;

        // Detect
        let stage = Instant::now();
        let intent = self.analyzer.analyze(&request.prompt);
        if self.settings.hook.skip_non_code && intent.category == IntentCategory::NonCode {
            debug!(non_code_score = intent.non_code_score, "non-code request, nothing to inject");
            let mut outcome = HookOutcome::skipped("non-code request");
            outcome.metadata_mut().intent = Some(intent);
            return Ok(outcome);
        }
        let limits = SelectionLimits::new(
            self.settings.selection.max_rules,
            self.settings.selection.token_budget,
        )?;

        let detect = {
            let detector = self.detector.clone();
            let root = root.clone();
            let prompt = request.prompt.clone();
            tokio::task::spawn_blocking(move || detector.detect(&root, Some(&prompt)))
        };
        let overrides = {
            let root = root.clone();
            let settings = self.settings.overrides.clone();
            tokio::task::spawn_blocking(move || OverrideEngine::load(&root, &settings))
        };
        let catalog = {
            let store = Arc::clone(&self.catalog);
            tokio::task::spawn_blocking(move || store.get())
        };
        let (context, overrides, catalog) = tokio::join!(detect, overrides, catalog);
        let (context, overrides, catalog) = (context?, overrides?, catalog?);

        let engine = match overrides {
            Ok(engine) => engine,
            Err(e) => {
                warn!(error = %e, root = %root.display(), "local overrides ignored");
                let reason = format!("local overrides ignored: {e}");
                metadata.warnings.push(reason.clone());
                degraded = Some(reason);
                OverrideEngine::default()
            }
        };
        metadata.timings.detect_ms = elapsed_ms(stage);
        debug!(
            ms = metadata.timings.detect_ms,
            languages = ?context.languages,
            category = %intent.category,
            "context detected"
        );

        // Select
        let stage = Instant::now();
        let selection = self.selector.select(&catalog, &context, &intent, limits);
        metadata.considered = selection.considered;
        metadata.eligible = selection.eligible;
        metadata.total_tokens = selection.total_tokens;
        metadata.budget_exhausted = selection.budget_exhausted;
        metadata.timings.select_ms = elapsed_ms(stage);
        debug!(ms = metadata.timings.select_ms, selected = selection.len(), "rules selected");

        // Fetch
        let stage = Instant::now();
        let paths: Vec<String> = selection.paths().map(str::to_string).collect();
        let report = self
            .fetcher
            .fetch_all(&paths, &self.settings.remote.reference, deadline)
            .await;
        metadata.failed = report.failed_paths().map(str::to_string).collect();
        metadata.warnings.extend(report.warnings.iter().cloned());
        metadata.timings.fetch_ms = elapsed_ms(stage);
        debug!(ms = metadata.timings.fetch_ms, failed = metadata.failed.len(), "rules fetched");

        // Merge
        let stage = Instant::now();
        let merged = engine.merge_all(
            paths.iter().map(|p| (p.as_str(), central_body(&report, p))),
            |p| catalog.contains(p),
        );
        let text = format_rules(&context, &intent, &merged);
        metadata.applied = merged.iter().map(|m| applied_rule(m, &selection)).collect();
        metadata.timings.merge_ms = elapsed_ms(stage);
        debug!(ms = metadata.timings.merge_ms, applied = merged.len(), "rules merged");

        info!(
            applied = metadata.applied.len(),
            failed = metadata.failed.len(),
            total_tokens = metadata.total_tokens,
            "rules injected"
        );

        metadata.context = Some(context);
        metadata.intent = Some(intent);
        let metadata = Box::new(metadata);
        Ok(match degraded {
            Some(reason) => HookOutcome::Degraded {
                reason,
                context: text,
                metadata,
            },
            None => HookOutcome::Success {
                context: text,
                metadata,
            },
        })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::fs;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use rulecast_fetch::FetchError;
    use rulecast_selection::{Catalog, RuleCategory, RuleDescriptor};

    use super::*;

    /// In-memory source with a call counter.
    #[derive(Default)]
    struct MapSource {
        bodies: HashMap<String, String>,
        calls: AtomicUsize,
        fail: bool,
        panic: bool,
        delay: Option<Duration>,
    }

    impl MapSource {
        fn with(bodies: &[(&str, &str)]) -> Self {
            Self {
                bodies: bodies
                    .iter()
                    .map(|(p, b)| ((*p).to_string(), (*b).to_string()))
                    .collect(),
                ..Self::default()
            }
        }
    }

    #[async_trait]
    impl RemoteSource for MapSource {
        async fn fetch(&self, path: &str, _reference: &str) -> rulecast_fetch::Result<Option<String>> {
            let _ = self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            assert!(!self.panic, "source exploded");
            if self.fail {
                return Err(FetchError::Unreachable("connection refused".into()));
            }
            Ok(self.bodies.get(path).cloned())
        }
    }

    fn catalog() -> Catalog {
        Catalog::new(vec![
            RuleDescriptor::new("base/code-quality.md", RuleCategory::Base, None).with_tokens(500),
            RuleDescriptor::new("languages/python/coding-standards.md", RuleCategory::Language, Some("python"))
                .with_tokens(900),
            RuleDescriptor::new("languages/go/coding-standards.md", RuleCategory::Language, Some("go"))
                .with_tokens(900),
        ])
    }

    fn python_project() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("pyproject.toml"), "[project]\nname = \"svc\"\n").unwrap();
        fs::write(dir.path().join("main.py"), "print('hi')\n").unwrap();
        dir
    }

    fn hook_with(settings: RulecastSettings, source: MapSource) -> (RuleHook, Arc<MapSource>) {
        let source = Arc::new(source);
        let hook = RuleHook::new(
            settings,
            Arc::new(CatalogStore::with_catalog(catalog())),
            Arc::clone(&source) as Arc<dyn RemoteSource>,
        );
        (hook, source)
    }

    fn bodies() -> MapSource {
        MapSource::with(&[
            ("base/code-quality.md", "Keep functions small."),
            ("languages/python/coding-standards.md", "Follow PEP 8."),
        ])
    }

    #[tokio::test]
    async fn injects_matching_rules() {
        let project = python_project();
        let (hook, _) = hook_with(RulecastSettings::default(), bodies());
        let outcome = hook
            .handle(&HookRequest::new("implement a new endpoint", project.path()))
            .await;

        assert!(!outcome.is_degraded());
        let text = outcome.context();
        assert!(text.contains("Follow PEP 8."));
        assert!(text.contains("Keep functions small."));
        assert!(!text.contains("languages/go"));
        let metadata = outcome.metadata();
        assert_eq!(metadata.applied[0].path, "languages/python/coding-standards.md");
        assert_eq!(metadata.total_tokens, 1400);
        assert!(metadata.context.as_ref().unwrap().has_language("python"));
    }

    #[tokio::test]
    async fn disabled_hook_injects_nothing() {
        let mut settings = RulecastSettings::default();
        settings.hook.enabled = false;
        let (hook, source) = hook_with(settings, bodies());
        let outcome = hook.handle(&HookRequest::new("fix the bug", "/nonexistent")).await;
        assert!(outcome.context().is_empty());
        assert_eq!(outcome.metadata().skipped.as_deref(), Some("disabled"));
        assert_eq!(source.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn non_code_request_is_skipped() {
        let project = python_project();
        let (hook, source) = hook_with(RulecastSettings::default(), bodies());
        let outcome = hook
            .handle(&HookRequest::new(
                "draft the SLA and NDA terms for the vendor contract",
                project.path(),
            ))
            .await;
        assert!(outcome.context().is_empty());
        assert_eq!(outcome.metadata().skipped.as_deref(), Some("non-code request"));
        assert_eq!(source.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn negative_budget_degrades() {
        let project = python_project();
        let mut settings = RulecastSettings::default();
        settings.selection.token_budget = -1;
        let (hook, _) = hook_with(settings, bodies());
        let outcome = hook.handle(&HookRequest::new("fix the bug", project.path())).await;
        assert!(outcome.is_degraded());
        assert!(outcome.context().is_empty());
        let response = outcome.into_response();
        assert!(response.continue_);
        assert!(response.metadata.unwrap().degraded.unwrap().contains("token budget"));
    }

    #[tokio::test]
    async fn remote_failure_yields_empty_but_valid_result() {
        let project = python_project();
        let source = MapSource {
            fail: true,
            ..MapSource::default()
        };
        let (hook, _) = hook_with(RulecastSettings::default(), source);
        let outcome = hook.handle(&HookRequest::new("fix the bug", project.path())).await;
        assert!(!outcome.is_degraded());
        assert!(outcome.context().is_empty());
        assert_eq!(outcome.metadata().failed.len(), 2);
        assert!(!outcome.metadata().warnings.is_empty());
    }

    #[tokio::test]
    async fn panic_in_pipeline_is_contained() {
        let project = python_project();
        let source = MapSource {
            panic: true,
            ..MapSource::default()
        };
        let (hook, _) = hook_with(RulecastSettings::default(), source);
        let outcome = hook.handle(&HookRequest::new("fix the bug", project.path())).await;
        assert!(outcome.is_degraded());
        assert!(outcome.into_response().continue_);
    }

    #[tokio::test]
    async fn slow_source_is_abandoned_at_deadline() {
        let project = python_project();
        let mut settings = RulecastSettings::default();
        settings.hook.deadline_ms = 100;
        let source = MapSource {
            delay: Some(Duration::from_secs(5)),
            ..bodies()
        };
        let (hook, _) = hook_with(settings, source);
        let started = std::time::Instant::now();
        let outcome = hook.handle(&HookRequest::new("fix the bug", project.path())).await;
        assert!(started.elapsed() < Duration::from_secs(2));
        assert!(outcome.context().is_empty());
        assert!(outcome.into_response().continue_);
    }

    #[tokio::test]
    async fn second_request_hits_cache() {
        let project = python_project();
        let (hook, source) = hook_with(RulecastSettings::default(), bodies());
        let request = HookRequest::new("implement a feature", project.path());
        let _ = hook.handle(&request).await;
        let calls = source.calls.load(Ordering::SeqCst);
        assert_eq!(calls, 2);
        let outcome = hook.handle(&request).await;
        assert_eq!(source.calls.load(Ordering::SeqCst), calls);
        assert!(outcome.context().contains("Follow PEP 8."));
    }

    #[tokio::test]
    async fn invalid_override_config_falls_back_to_central() {
        let project = python_project();
        let local = project.path().join(".claude/rules-local");
        fs::create_dir_all(local.join("base")).unwrap();
        fs::write(local.join("rules-config.json"), r#"{"merge_strategy": "mangle"}"#).unwrap();
        fs::write(local.join("base/code-quality.md"), "LOCAL").unwrap();

        let (hook, _) = hook_with(RulecastSettings::default(), bodies());
        let outcome = hook.handle(&HookRequest::new("implement a feature", project.path())).await;
        assert!(outcome.is_degraded());
        assert!(outcome.context().contains("Keep functions small."));
        assert!(!outcome.context().contains("LOCAL"));
    }

    #[tokio::test]
    async fn local_override_and_local_only_rule_are_applied() {
        let project = python_project();
        let local = project.path().join(".claude/rules-local");
        fs::create_dir_all(local.join("base")).unwrap();
        fs::create_dir_all(local.join("team")).unwrap();
        fs::write(local.join("rules-config.json"), r#"{"merge_strategy": "replace"}"#).unwrap();
        fs::write(local.join("base/code-quality.md"), "Team quality rules.").unwrap();
        fs::write(local.join("team/conventions.md"), "Use our logger.").unwrap();

        let (hook, _) = hook_with(RulecastSettings::default(), bodies());
        let outcome = hook.handle(&HookRequest::new("implement a feature", project.path())).await;
        assert!(!outcome.is_degraded());
        let text = outcome.context();
        assert!(text.contains("Team quality rules."));
        assert!(!text.contains("Keep functions small."));
        assert!(text.contains("Use our logger."));
        let applied = &outcome.metadata().applied;
        let local_only = applied.iter().find(|a| a.path == "team/conventions.md").unwrap();
        assert_eq!(local_only.source, "local-only");
        assert!(local_only.score.is_none());
    }

    #[tokio::test]
    async fn failed_fetch_does_not_inject_local_addendum() {
        let project = python_project();
        let local = project.path().join(".claude/rules-local");
        fs::create_dir_all(local.join("base")).unwrap();
        fs::write(local.join("rules-config.json"), r#"{"merge_strategy": "extend"}"#).unwrap();
        fs::write(local.join("base/code-quality.md"), "LOCAL ADDENDUM").unwrap();

        let mut settings = RulecastSettings::default();
        settings.remote.retry.max_retries = 0;
        let source = MapSource {
            fail: true,
            ..MapSource::default()
        };
        let (hook, _) = hook_with(settings, source);
        let outcome = hook.handle(&HookRequest::new("implement a feature", project.path())).await;

        let metadata = outcome.metadata();
        assert!(metadata.failed.contains(&"base/code-quality.md".to_string()));
        assert!(metadata.applied.iter().all(|a| a.path != "base/code-quality.md"));
        assert!(!outcome.context().contains("LOCAL ADDENDUM"));
    }

    #[tokio::test]
    async fn absent_central_uses_local_body() {
        let project = python_project();
        let local = project.path().join(".claude/rules-local");
        fs::create_dir_all(local.join("base")).unwrap();
        fs::write(local.join("base/code-quality.md"), "Local quality rules.").unwrap();

        let source = MapSource::with(&[("languages/python/coding-standards.md", "Follow PEP 8.")]);
        let (hook, _) = hook_with(RulecastSettings::default(), source);
        let outcome = hook.handle(&HookRequest::new("implement a feature", project.path())).await;

        assert!(outcome.metadata().failed.is_empty());
        assert!(outcome.context().contains("Local quality rules."));
        let applied = outcome
            .metadata()
            .applied
            .iter()
            .find(|a| a.path == "base/code-quality.md")
            .unwrap();
        assert_eq!(applied.source, "local-only");
    }

    #[tokio::test]
    async fn transient_failure_is_retried_before_giving_up() {
        let project = python_project();
        let (hook, source) = hook_with(
            RulecastSettings::default(),
            MapSource {
                fail: true,
                ..MapSource::default()
            },
        );
        let outcome = hook.handle(&HookRequest::new("fix the bug", project.path())).await;
        assert_eq!(outcome.metadata().failed.len(), 2);
        assert_eq!(source.calls.load(Ordering::SeqCst), 6);
    }

    #[test]
    fn panic_message_extracts_strings() {
        let payload: Box<dyn Any + Send> = Box::new("boom");
        assert_eq!(panic_message(payload.as_ref()), "boom");
        let payload: Box<dyn Any + Send> = Box::new(String::from("bang"));
        assert_eq!(panic_message(payload.as_ref()), "bang");
        let payload: Box<dyn Any + Send> = Box::new(7_u8);
        assert_eq!(panic_message(payload.as_ref()), "unknown panic");
    }
}
