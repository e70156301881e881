//! LRU + TTL cache for rule bodies.
//!
//! Entries are keyed by document path *and* content reference, so a body
//! fetched for one branch is never served for another. Expired entries are
//! kept until evicted so they can be served stale when the remote is down.
//! When full, expired entries go first, then the least recently used.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use rulecast_settings::CacheSettings;
use serde::Serialize;

const DEFAULT_TTL_SECS: u64 = 60 * 60;
const DEFAULT_MAX_ENTRIES: usize = 256;

/// Configuration for the content cache.
#[derive(Clone, Debug)]
pub struct ContentCacheConfig {
    /// How long a fetched body stays fresh.
    pub ttl: Duration,
    /// Maximum number of cached bodies (at least one is always kept).
    pub max_entries: usize,
}

impl Default for ContentCacheConfig {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(DEFAULT_TTL_SECS),
            max_entries: DEFAULT_MAX_ENTRIES,
        }
    }
}

impl ContentCacheConfig {
    /// Build from cache settings.
    #[must_use]
    pub fn from_settings(settings: &CacheSettings) -> Self {
        Self {
            ttl: Duration::from_secs(settings.ttl_secs),
            max_entries: settings.max_entries,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
struct CacheKey {
    path: String,
    reference: String,
}

impl CacheKey {
    fn new(path: &str, reference: &str) -> Self {
        Self {
            path: path.to_string(),
            reference: reference.to_string(),
        }
    }
}

struct CacheEntry {
    content: String,
    fetched_at: Instant,
    expires_at: Instant,
}

/// Result of a cache lookup.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Lookup {
    /// Entry present and within its TTL.
    Fresh(String),
    /// Entry present but expired.
    Expired,
    /// No entry for this path and reference.
    Missing,
}

/// LRU + TTL cache for rule bodies.
pub struct ContentCache {
    entries: HashMap<CacheKey, CacheEntry>,
    access_order: Vec<CacheKey>,
    config: ContentCacheConfig,
    hits: u64,
    misses: u64,
    stale_served: u64,
}

impl ContentCache {
    /// Empty cache sized by `config`.
    #[must_use]
    pub fn new(config: ContentCacheConfig) -> Self {
        Self {
            entries: HashMap::new(),
            access_order: Vec::new(),
            config,
            hits: 0,
            misses: 0,
            stale_served: 0,
        }
    }

    /// Look up a body, updating LRU order and hit/miss counters.
    pub fn lookup(&mut self, path: &str, reference: &str) -> Lookup {
        let key = CacheKey::new(path, reference);
        let Some(entry) = self.entries.get(&key) else {
            self.misses += 1;
            return Lookup::Missing;
        };
        if Instant::now() >= entry.expires_at {
            self.misses += 1;
            return Lookup::Expired;
        }
        let content = entry.content.clone();
        self.touch(&key);
        self.hits += 1;
        Lookup::Fresh(content)
    }

    /// Fresh body, or `None` on miss or expiry.
    pub fn get(&mut self, path: &str, reference: &str) -> Option<String> {
        match self.lookup(path, reference) {
            Lookup::Fresh(content) => Some(content),
            Lookup::Expired | Lookup::Missing => None,
        }
    }

    /// Body regardless of expiry, for serving stale when the remote fails.
    pub fn get_stale(&mut self, path: &str, reference: &str) -> Option<String> {
        let key = CacheKey::new(path, reference);
        let content = self.entries.get(&key)?.content.clone();
        self.touch(&key);
        self.stale_served += 1;
        Some(content)
    }

    /// Store a body, replacing any previous entry. Evicts if at capacity.
    pub fn insert(&mut self, path: &str, reference: &str, content: String) {
        let key = CacheKey::new(path, reference);
        self.access_order.retain(|k| k != &key);
        let replacing = self.entries.contains_key(&key);

        while !replacing && self.entries.len() >= self.config.max_entries.max(1) {
            if !self.evict_one() {
                break;
            }
        }

        let now = Instant::now();
        let entry = CacheEntry {
            content,
            fetched_at: now,
            expires_at: now + self.config.ttl,
        };
        drop(self.entries.insert(key.clone(), entry));
        self.access_order.push(key);
    }

    /// Whether a fresh entry exists (non-destructive, no stats).
    #[must_use]
    pub fn has(&self, path: &str, reference: &str) -> bool {
        self.entries
            .get(&CacheKey::new(path, reference))
            .is_some_and(|e| Instant::now() < e.expires_at)
    }

    /// Age of an entry, fresh or expired.
    #[must_use]
    pub fn age(&self, path: &str, reference: &str) -> Option<Duration> {
        self.entries
            .get(&CacheKey::new(path, reference))
            .map(|e| e.fetched_at.elapsed())
    }

    /// Number of entries, including expired ones not yet evicted.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the cache holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop every body and zero the counters.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.access_order.clear();
        self.hits = 0;
        self.misses = 0;
        self.stale_served = 0;
    }

    /// Remove expired entries. Returns how many were removed.
    pub fn cleanup(&mut self) -> usize {
        let now = Instant::now();
        let expired: Vec<CacheKey> = self
            .entries
            .iter()
            .filter(|(_, e)| now >= e.expires_at)
            .map(|(k, _)| k.clone())
            .collect();
        for key in &expired {
            drop(self.entries.remove(key));
            self.access_order.retain(|k| k != key);
        }
        expired.len()
    }

    /// Cache statistics.
    #[must_use]
    pub fn stats(&self) -> CacheStats {
        let total = self.hits + self.misses;
        CacheStats {
            size: self.entries.len(),
            hits: self.hits,
            misses: self.misses,
            stale_served: self.stale_served,
            #[allow(clippy::cast_precision_loss)]
            hit_rate: if total == 0 {
                0.0
            } else {
                self.hits as f64 / total as f64
            },
        }
    }

    fn touch(&mut self, key: &CacheKey) {
        self.access_order.retain(|k| k != key);
        self.access_order.push(key.clone());
    }

    fn evict_one(&mut self) -> bool {
        // An expired body goes before the least recently used one.
        let now = Instant::now();
        let expired_key = self
            .access_order
            .iter()
            .find(|k| self.entries.get(*k).is_some_and(|e| now >= e.expires_at))
            .cloned();

        if let Some(key) = expired_key {
            drop(self.entries.remove(&key));
            self.access_order.retain(|k| k != &key);
            return true;
        }

        if self.access_order.is_empty() {
            return false;
        }
        let oldest = self.access_order.remove(0);
        drop(self.entries.remove(&oldest));
        true
    }
}

impl Default for ContentCache {
    fn default() -> Self {
        Self::new(ContentCacheConfig::default())
    }
}

/// Cache statistics.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheStats {
    /// Cached bodies, fresh or expired.
    pub size: usize,
    /// Number of fresh hits.
    pub hits: u64,
    /// Number of misses (absent or expired).
    pub misses: u64,
    /// Number of expired bodies served after a remote failure.
    pub stale_served: u64,
    /// `hits / (hits + misses)`, or 0 before any lookup.
    pub hit_rate: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cache_with(ttl: Duration, max_entries: usize) -> ContentCache {
        ContentCache::new(ContentCacheConfig { ttl, max_entries })
    }

    #[test]
    fn insert_and_get() {
        let mut cache = ContentCache::default();
        cache.insert("base/a.md", "main", "A".into());
        assert_eq!(cache.get("base/a.md", "main").as_deref(), Some("A"));
    }

    #[test]
    fn reference_is_part_of_key() {
        let mut cache = ContentCache::default();
        cache.insert("base/a.md", "main", "A@main".into());
        assert_eq!(cache.lookup("base/a.md", "v2"), Lookup::Missing);
        assert!(cache.get_stale("base/a.md", "v2").is_none());
        assert_eq!(cache.get("base/a.md", "main").as_deref(), Some("A@main"));
    }

    #[test]
    fn expired_entry_kept_for_stale() {
        let mut cache = cache_with(Duration::from_millis(0), 10);
        cache.insert("a.md", "main", "old".into());
        std::thread::sleep(Duration::from_millis(10));
        assert_eq!(cache.lookup("a.md", "main"), Lookup::Expired);
        assert!(!cache.has("a.md", "main"));
        assert_eq!(cache.get_stale("a.md", "main").as_deref(), Some("old"));
        assert_eq!(cache.stats().stale_served, 1);
    }

    #[test]
    fn lru_eviction() {
        let mut cache = cache_with(Duration::from_secs(60), 2);
        cache.insert("a.md", "main", "a".into());
        cache.insert("b.md", "main", "b".into());
        // touch a so b becomes least recently used
        assert!(cache.get("a.md", "main").is_some());
        cache.insert("c.md", "main", "c".into());

        assert!(cache.get("b.md", "main").is_none());
        assert!(cache.get("a.md", "main").is_some());
        assert!(cache.get("c.md", "main").is_some());
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn expired_evicted_before_lru() {
        let mut cache = cache_with(Duration::from_secs(60), 2);
        cache.insert("a.md", "main", "a".into());
        cache.config.ttl = Duration::from_millis(0);
        cache.insert("b.md", "main", "b".into());
        std::thread::sleep(Duration::from_millis(10));
        cache.config.ttl = Duration::from_secs(60);
        cache.insert("c.md", "main", "c".into());

        // b was expired, so a (the LRU) survives
        assert!(cache.has("a.md", "main"));
        assert!(cache.get_stale("b.md", "main").is_none());
    }

    #[test]
    fn replacing_does_not_evict() {
        let mut cache = cache_with(Duration::from_secs(60), 2);
        cache.insert("a.md", "main", "a1".into());
        cache.insert("b.md", "main", "b".into());
        cache.insert("a.md", "main", "a2".into());
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get("a.md", "main").as_deref(), Some("a2"));
        assert!(cache.has("b.md", "main"));
    }

    #[test]
    fn zero_capacity_keeps_one() {
        let mut cache = cache_with(Duration::from_secs(60), 0);
        cache.insert("a.md", "main", "a".into());
        cache.insert("b.md", "main", "b".into());
        assert_eq!(cache.len(), 1);
        assert!(cache.has("b.md", "main"));
    }

    #[test]
    fn hit_miss_stats() {
        let mut cache = ContentCache::default();
        cache.insert("a.md", "main", "a".into());
        let _ = cache.get("a.md", "main");
        let _ = cache.get("missing.md", "main");
        let s = cache.stats();
        assert_eq!(s.hits, 1);
        assert_eq!(s.misses, 1);
        assert!((s.hit_rate - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn cleanup_removes_expired() {
        let mut cache = cache_with(Duration::from_millis(0), 10);
        cache.insert("a.md", "main", "a".into());
        std::thread::sleep(Duration::from_millis(10));
        assert_eq!(cache.cleanup(), 1);
        assert!(cache.is_empty());
    }

    #[test]
    fn clear_resets() {
        let mut cache = ContentCache::default();
        cache.insert("a.md", "main", "a".into());
        let _ = cache.get("a.md", "main");
        cache.clear();
        assert!(cache.is_empty());
        assert_eq!(cache.stats().hits, 0);
    }

    #[test]
    fn config_from_settings() {
        let config = ContentCacheConfig::from_settings(&CacheSettings::default());
        assert_eq!(config.ttl, Duration::from_secs(3600));
        assert_eq!(config.max_entries, 256);
    }

    #[test]
    fn age_tracks_fetch_time() {
        let mut cache = ContentCache::default();
        assert!(cache.age("a.md", "main").is_none());
        cache.insert("a.md", "main", "a".into());
        assert!(cache.age("a.md", "main").unwrap() < Duration::from_secs(5));
    }
}
