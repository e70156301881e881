//! Settings type definitions.
//!
//! All types use `#[serde(rename_all = "camelCase", default)]`, so a user
//! file only needs the keys it changes. Each type implements [`Default`]
//! with the production values.

use serde::{Deserialize, Serialize};

/// Root settings type.
///
/// ```json
/// {
///   "remote": { "repository": "acme/engineering-rules", "reference": "v2" },
///   "selection": { "maxRules": 3 }
/// }
/// ```
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RulecastSettings {
    /// Where rule bodies are fetched from.
    pub remote: RemoteSettings,
    /// Where the rule catalog is read from.
    pub catalog: CatalogSettings,
    /// Content cache sizing and TTL.
    pub cache: CacheSettings,
    /// Rule selection limits and weights.
    pub selection: SelectionSettings,
    /// Local override locations.
    pub overrides: OverrideSettings,
    /// Hook behavior and time budget.
    pub hook: HookSettings,
    /// Logging configuration.
    pub logging: LoggingSettings,
}

/// Remote rule repository.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RemoteSettings {
    /// Raw-content host.
    pub base_url: String,
    /// `owner/name` of the rules repository.
    pub repository: String,
    /// Branch, tag or commit to read.
    pub reference: String,
    /// Optional access token (usually from `GITHUB_TOKEN`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    /// Per-request timeout in milliseconds.
    pub request_timeout_ms: u64,
    /// Backoff for transient fetch failures.
    pub retry: RetrySettings,
}

impl Default for RemoteSettings {
    fn default() -> Self {
        Self {
            base_url: "https://raw.githubusercontent.com".to_string(),
            repository: "centralized-rules/centralized-rules".to_string(),
            reference: "main".to_string(),
            token: None,
            request_timeout_ms: 5000,
            retry: RetrySettings::default(),
        }
    }
}

/// Retry policy for transient remote failures.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RetrySettings {
    /// Retries after the first attempt (0 disables retrying).
    pub max_retries: u32,
    /// Delay before the first retry, doubled for each one after.
    pub base_delay_ms: u64,
    /// Ceiling on a single backoff delay.
    pub max_delay_ms: u64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_retries: 2,
            base_delay_ms: 100,
            max_delay_ms: 1000,
        }
    }
}

/// Rule catalog location.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CatalogSettings {
    /// Path to the catalog JSON file. `~` expands to the home directory.
    pub path: String,
}

impl Default for CatalogSettings {
    fn default() -> Self {
        Self {
            path: "~/.rulecast/catalog.json".to_string(),
        }
    }
}

/// Content cache settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CacheSettings {
    /// Time-to-live for fetched bodies, in seconds.
    pub ttl_secs: u64,
    /// Maximum number of cached bodies.
    pub max_entries: usize,
    /// Maximum simultaneous remote fetches.
    pub max_concurrent_fetches: usize,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            ttl_secs: 3600,
            max_entries: 256,
            max_concurrent_fetches: 5,
        }
    }
}

/// Rule selection settings.
///
/// Limits are signed: a negative value coming from a file or the
/// environment is carried through and rejected by the selector.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SelectionSettings {
    /// Maximum number of rules injected per request.
    pub max_rules: i64,
    /// Maximum combined estimated tokens per request.
    pub token_budget: i64,
    /// Scoring weights.
    pub weights: ScoringWeights,
}

impl Default for SelectionSettings {
    fn default() -> Self {
        Self {
            max_rules: 5,
            token_budget: 5000,
            weights: ScoringWeights::default(),
        }
    }
}

/// Relevance scoring weights.
///
/// Only the relative ordering is load-bearing: language and framework
/// matches dominate, then cloud, then maturity, then per-topic overlap.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ScoringWeights {
    /// Rule language matches a detected language.
    pub language: i64,
    /// Rule framework matches a detected framework.
    pub framework: i64,
    /// Rule cloud provider matches a detected provider.
    pub cloud: i64,
    /// Rule is scoped to specific maturity levels, the project's among them.
    pub maturity: i64,
    /// Per topic shared between rule and intent.
    pub topic: i64,
    /// Flat score for base (always-applicable) rules.
    pub base: i64,
    /// Extra score for security rules on urgent security requests.
    pub security_bonus: i64,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            language: 100,
            framework: 100,
            cloud: 75,
            maturity: 50,
            topic: 30,
            base: 20,
            security_bonus: 25,
        }
    }
}

/// Local override locations, relative to the project root.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OverrideSettings {
    /// Directory holding local rule bodies (mirrors catalog paths).
    pub dir: String,
    /// Override config file name inside [`dir`](Self::dir).
    pub config_file: String,
}

impl Default for OverrideSettings {
    fn default() -> Self {
        Self {
            dir: ".claude/rules-local".to_string(),
            config_file: "rules-config.json".to_string(),
        }
    }
}

/// Hook behavior.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct HookSettings {
    /// Master switch; when off the hook injects nothing.
    pub enabled: bool,
    /// Soft deadline for the whole pipeline, in milliseconds.
    pub deadline_ms: u64,
    /// Requests slower than this are logged at warn.
    pub slow_warning_ms: u64,
    /// Inject nothing for requests classified as non-code.
    pub skip_non_code: bool,
}

impl Default for HookSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            deadline_ms: 3000,
            slow_warning_ms: 2000,
            skip_non_code: true,
        }
    }
}

/// Logging configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoggingSettings {
    /// Minimum level (`error`, `warn`, `info`, `debug`, `trace`).
    pub level: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
        }
    }
}
