//! # rulecast-fetch
//!
//! Retrieves rule document bodies from the remote rules repository.
//!
//! - [`RemoteSource`] / [`GitHubRawSource`]: fetch by path and content
//!   reference; "not found" is `Ok(None)`, everything else is a
//!   [`FetchError`].
//! - [`ContentCache`]: process-wide LRU + TTL cache keyed by path and
//!   reference, with stale fallback.
//! - [`RetryPolicy`]: exponential backoff for transient failures, bounded
//!   by the caller's deadline.
//! - [`RuleFetcher`]: resolves a batch of paths through the cache with a
//!   concurrency ceiling and a wall-clock deadline.

#![deny(unsafe_code)]

pub mod cache;
pub mod errors;
pub mod fetcher;
pub mod retry;
pub mod source;

pub use cache::{CacheStats, ContentCache, ContentCacheConfig, Lookup};
pub use errors::{FetchError, Result};
pub use fetcher::{DEFAULT_MAX_CONCURRENT, FetchOutcome, FetchReport, RuleFetcher};
pub use retry::RetryPolicy;
pub use source::{GitHubRawSource, RemoteSource};
