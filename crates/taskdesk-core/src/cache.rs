//! Time-bounded, query-fingerprinted result cache.
//!
//! An entry is only valid for the exact query that produced it: reads
//! compare the caller's current parameters structurally against the
//! fingerprint stored at write time. Expiry is evaluated lazily on read.
//! There is no eviction under memory pressure; the owner clears the store
//! on teardown.

use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::time::{Duration, Instant};

use crate::models::{EngineConfig, ViewKind};

/// What kind of endpoint produced a cached value. Decides the TTL class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EndpointKind {
    /// One server-side page of instances
    Paged,
    /// The whole light series collection
    Aggregate,
    /// A single series with its instances
    Detail,
}

impl EndpointKind {
    fn as_str(&self) -> &'static str {
        match self {
            EndpointKind::Paged => "paged",
            EndpointKind::Aggregate => "aggregate",
            EndpointKind::Detail => "detail",
        }
    }
}

/// Composite cache key: family, endpoint kind, pagination window and role scope.
///
/// Rendered as `family:kind:window:scope` so substring invalidation can
/// target a family (`"recurring:"`) or one kind (`"recurring:paged:"`).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    view: ViewKind,
    kind: EndpointKind,
    window: String,
    scope: String,
}

impl CacheKey {
    pub fn paged(view: ViewKind, page: usize, page_size: usize, scope: &str) -> Self {
        Self {
            view,
            kind: EndpointKind::Paged,
            window: format!("p{}-l{}", page, page_size),
            scope: scope.to_string(),
        }
    }

    pub fn aggregate(view: ViewKind, scope: &str) -> Self {
        Self {
            view,
            kind: EndpointKind::Aggregate,
            window: "all".to_string(),
            scope: scope.to_string(),
        }
    }

    pub fn detail(view: ViewKind, series_id: &str, scope: &str) -> Self {
        Self {
            view,
            kind: EndpointKind::Detail,
            window: series_id.to_string(),
            scope: scope.to_string(),
        }
    }

    pub fn kind(&self) -> EndpointKind {
        self.kind
    }

    /// Substring matching every key of one family
    pub fn family_prefix(view: ViewKind) -> String {
        format!("{}:", view.family())
    }

    /// Substring matching every key of one kind within a family
    pub fn kind_prefix(view: ViewKind, kind: EndpointKind) -> String {
        format!("{}:{}:", view.family(), kind.as_str())
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}:{}:{}",
            self.view.family(),
            self.kind.as_str(),
            self.window,
            self.scope
        )
    }
}

/// TTL classes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CachePolicy {
    /// Paged and detail entries
    pub short_ttl: Duration,
    /// The aggregate entry
    pub long_ttl: Duration,
}

impl Default for CachePolicy {
    fn default() -> Self {
        Self {
            short_ttl: Duration::from_secs(30 * 60),
            long_ttl: Duration::from_secs(60 * 60),
        }
    }
}

impl From<&EngineConfig> for CachePolicy {
    fn from(config: &EngineConfig) -> Self {
        Self {
            short_ttl: config.short_ttl,
            long_ttl: config.long_ttl,
        }
    }
}

impl CachePolicy {
    pub fn ttl(&self, key: &CacheKey) -> Duration {
        match key.kind() {
            EndpointKind::Aggregate => self.long_ttl,
            EndpointKind::Paged | EndpointKind::Detail => self.short_ttl,
        }
    }
}

#[derive(Debug, Clone)]
struct CacheEntry<V> {
    data: V,
    fetched_at: Instant,
    ttl: Duration,
    fingerprint: Value,
}

impl<V> CacheEntry<V> {
    fn is_expired(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.fetched_at) > self.ttl
    }
}

/// Structural fingerprint of query parameters.
pub fn fingerprint<P: Serialize + ?Sized>(params: &P) -> Value {
    serde_json::to_value(params).unwrap_or(Value::Null)
}

#[derive(Debug)]
pub struct CacheStore<V> {
    entries: HashMap<String, CacheEntry<V>>,
    policy: CachePolicy,
}

impl<V: Clone> Default for CacheStore<V> {
    fn default() -> Self {
        Self::new(CachePolicy::default())
    }
}

impl<V: Clone> CacheStore<V> {
    pub fn new(policy: CachePolicy) -> Self {
        Self {
            entries: HashMap::new(),
            policy,
        }
    }

    pub fn policy(&self) -> CachePolicy {
        self.policy
    }

    /// Store `data` for `key`, replacing any previous entry.
    pub fn set<P: Serialize + ?Sized>(&mut self, key: &CacheKey, data: V, params: &P) {
        self.set_at(key, data, params, Instant::now());
    }

    pub fn set_at<P: Serialize + ?Sized>(
        &mut self,
        key: &CacheKey,
        data: V,
        params: &P,
        now: Instant,
    ) {
        let rendered = key.to_string();
        tracing::trace!(key = %rendered, "cache set");
        self.entries.insert(
            rendered,
            CacheEntry {
                data,
                fetched_at: now,
                ttl: self.policy.ttl(key),
                fingerprint: fingerprint(params),
            },
        );
    }

    /// Cached data for `key` if it is fresh and was produced by `params`.
    pub fn get<P: Serialize + ?Sized>(&mut self, key: &CacheKey, params: &P) -> Option<V> {
        self.get_at(key, params, Instant::now())
    }

    pub fn get_at<P: Serialize + ?Sized>(
        &mut self,
        key: &CacheKey,
        params: &P,
        now: Instant,
    ) -> Option<V> {
        let rendered = key.to_string();
        let entry = self.entries.get(&rendered)?;

        if entry.is_expired(now) {
            tracing::debug!(key = %rendered, "cache entry expired");
            self.entries.remove(&rendered);
            return None;
        }
        if entry.fingerprint != fingerprint(params) {
            tracing::debug!(key = %rendered, "cache params changed");
            return None;
        }

        tracing::debug!(key = %rendered, "cache hit");
        Some(entry.data.clone())
    }

    pub fn invalidate(&mut self, key: &CacheKey) -> bool {
        self.entries.remove(&key.to_string()).is_some()
    }

    /// Drop every entry whose key contains `pattern`. Returns how many were removed.
    pub fn invalidate_by_prefix(&mut self, pattern: &str) -> usize {
        let before = self.entries.len();
        self.entries.retain(|key, _| !key.contains(pattern));
        let removed = before - self.entries.len();
        if removed > 0 {
            tracing::debug!(pattern, removed, "cache invalidated");
        }
        removed
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, key: &CacheKey) -> bool {
        self.entries.contains_key(&key.to_string())
    }
}
