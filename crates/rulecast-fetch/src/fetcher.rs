//! Bounded-concurrency fetching through the content cache.
//!
//! Fresh cache entries are served without touching the remote. Misses are
//! fetched with at most `max_concurrent` requests in flight; the rest
//! queue. Every fetch races the caller's deadline. Transient failures are
//! retried per the [`RetryPolicy`] while time remains; what still fails
//! falls back to a stale entry when one exists and is otherwise reported
//! per path.
//!
//! The cache mutex is only held for synchronous map operations, never
//! across an `.await`.

use std::collections::HashSet;
use std::sync::Arc;

use futures::stream::{self, StreamExt};
use parking_lot::Mutex;
use serde::Serialize;
use tokio::time::{Instant, timeout_at};
use tracing::{debug, warn};

use crate::cache::{ContentCache, Lookup};
use crate::errors::FetchError;
use crate::retry::RetryPolicy;
use crate::source::RemoteSource;

/// Default ceiling on simultaneous remote fetches.
pub const DEFAULT_MAX_CONCURRENT: usize = 5;

/// What happened to one requested path.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum FetchOutcome {
    /// Served from a fresh cache entry.
    Cached {
        /// Document body.
        content: String,
    },
    /// Fetched from the remote and cached.
    Fetched {
        /// Document body.
        content: String,
    },
    /// The remote failed; an expired cache entry was served instead.
    Stale {
        /// Document body.
        content: String,
        /// Why the remote fetch failed.
        reason: String,
    },
    /// The remote has no document at this path.
    Absent,
    /// The remote failed and nothing was cached.
    Failed {
        /// Why the remote fetch failed.
        reason: String,
    },
}

impl FetchOutcome {
    /// Body to use, if any.
    #[must_use]
    pub fn content(&self) -> Option<&str> {
        match self {
            Self::Cached { content } | Self::Fetched { content } | Self::Stale { content, .. } => {
                Some(content)
            }
            Self::Absent | Self::Failed { .. } => None,
        }
    }

    /// Whether the path failed outright.
    #[must_use]
    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }
}

/// Outcomes for a batch of paths, in request order.
#[derive(Clone, Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FetchReport {
    /// `(path, outcome)` in the order the paths were requested.
    pub outcomes: Vec<(String, FetchOutcome)>,
    /// Degradations worth surfacing (stale served, failures).
    pub warnings: Vec<String>,
}

impl FetchReport {
    /// Outcome for `path`.
    #[must_use]
    pub fn outcome(&self, path: &str) -> Option<&FetchOutcome> {
        self.outcomes.iter().find(|(p, _)| p == path).map(|(_, o)| o)
    }

    /// Body for `path`, if one was resolved.
    #[must_use]
    pub fn content(&self, path: &str) -> Option<&str> {
        self.outcome(path).and_then(FetchOutcome::content)
    }

    /// Paths that failed outright.
    pub fn failed_paths(&self) -> impl Iterator<Item = &str> {
        self.outcomes
            .iter()
            .filter(|(_, o)| o.is_failed())
            .map(|(p, _)| p.as_str())
    }
}

/// Fetches rule bodies through a shared [`ContentCache`].
#[derive(Clone)]
pub struct RuleFetcher {
    source: Arc<dyn RemoteSource>,
    cache: Arc<Mutex<ContentCache>>,
    max_concurrent: usize,
    retry: RetryPolicy,
}

impl RuleFetcher {
    /// Create a fetcher with the default retry policy. `max_concurrent`
    /// is clamped to at least one.
    pub fn new(
        source: Arc<dyn RemoteSource>,
        cache: Arc<Mutex<ContentCache>>,
        max_concurrent: usize,
    ) -> Self {
        Self {
            source,
            cache,
            max_concurrent: max_concurrent.max(1),
            retry: RetryPolicy::default(),
        }
    }

    /// Replace the retry policy.
    #[must_use]
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// The shared cache.
    #[must_use]
    pub fn cache(&self) -> &Arc<Mutex<ContentCache>> {
        &self.cache
    }

    /// Resolve every path at `reference` before `deadline`.
    ///
    /// Duplicate paths are resolved once. Paths still unresolved at the
    /// deadline are reported as failed (or stale, if cached).
    pub async fn fetch_all(&self, paths: &[String], reference: &str, deadline: Instant) -> FetchReport {
        let mut seen = HashSet::new();
        let unique: Vec<&str> = paths
            .iter()
            .map(String::as_str)
            .filter(|p| seen.insert(*p))
            .collect();

        let mut resolved: Vec<(String, FetchOutcome)> = Vec::with_capacity(unique.len());
        let mut misses: Vec<&str> = Vec::new();
        {
            let mut cache = self.cache.lock();
            for path in &unique {
                match cache.lookup(path, reference) {
                    Lookup::Fresh(content) => {
                        resolved.push(((*path).to_string(), FetchOutcome::Cached { content }));
                    }
                    Lookup::Expired | Lookup::Missing => misses.push(*path),
                }
            }
        }
        debug!(hits = resolved.len(), misses = misses.len(), reference, "cache lookups done");

        let fetched: Vec<(String, FetchOutcome)> = stream::iter(misses)
            .map(|path| async move {
                let result = self.fetch_with_retry(path, reference, deadline).await;
                (path.to_string(), self.settle(path, reference, result))
            })
            .buffer_unordered(self.max_concurrent)
            .collect()
            .await;
        resolved.extend(fetched);

        let mut report = FetchReport::default();
        for path in unique {
            let Some(pos) = resolved.iter().position(|(p, _)| p == path) else {
                continue;
            };
            let (path, outcome) = resolved.swap_remove(pos);
            match &outcome {
                FetchOutcome::Stale { reason, .. } => {
                    report.warnings.push(format!("{path}: served stale copy ({reason})"));
                }
                FetchOutcome::Failed { reason } => {
                    report.warnings.push(format!("{path}: fetch failed ({reason})"));
                }
                _ => {}
            }
            report.outcomes.push((path, outcome));
        }
        report
    }

    /// Resolve a single path.
    pub async fn fetch_one(&self, path: &str, reference: &str, deadline: Instant) -> FetchOutcome {
        let report = self.fetch_all(&[path.to_string()], reference, deadline).await;
        report
            .outcomes
            .into_iter()
            .next()
            .map_or(FetchOutcome::Absent, |(_, outcome)| outcome)
    }

    async fn fetch_with_retry(
        &self,
        path: &str,
        reference: &str,
        deadline: Instant,
    ) -> Result<Option<String>, FetchError> {
        let mut attempt = 0;
        loop {
            let result = match timeout_at(deadline, self.source.fetch(path, reference)).await {
                Ok(result) => result,
                Err(_) => Err(FetchError::Timeout),
            };
            let error = match result {
                Err(error) if error.is_retryable() => error,
                other => return other,
            };
            let Some(delay) = self.retry.next_delay(attempt, deadline) else {
                return Err(error);
            };
            attempt += 1;
            debug!(path, attempt, ?delay, error = %error, "retrying fetch");
            tokio::time::sleep(delay).await;
        }
    }

    fn settle(
        &self,
        path: &str,
        reference: &str,
        result: Result<Option<String>, FetchError>,
    ) -> FetchOutcome {
        match result {
            Ok(Some(content)) => {
                self.cache.lock().insert(path, reference, content.clone());
                FetchOutcome::Fetched { content }
            }
            Ok(None) => {
                debug!(path, reference, "document not found remotely");
                FetchOutcome::Absent
            }
            Err(error) => {
                let reason = error.to_string();
                let stale = self.cache.lock().get_stale(path, reference);
                match stale {
                    Some(content) => {
                        warn!(path, reference, error = %reason, "remote fetch failed, serving stale copy");
                        FetchOutcome::Stale { content, reason }
                    }
                    None => {
                        warn!(path, reference, error = %reason, "remote fetch failed");
                        FetchOutcome::Failed { reason }
                    }
                }
            }
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
