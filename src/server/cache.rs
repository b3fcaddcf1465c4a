//! In-process cache of route bodies, invalidated by tag or path prefix.

use dashmap::DashMap;
use serde_json::Value;
use std::time::{Duration, Instant};

use crate::constants::ROUTE_CACHE_TTL;

#[derive(Debug, Clone)]
struct CachedBody {
    tag: &'static str,
    body: Value,
    stored_at: Instant,
}

/// Route bodies keyed by request path and query, each tagged with its route.
#[derive(Debug)]
pub struct TagCache {
    entries: DashMap<String, CachedBody>,
    ttl: Duration,
}

impl Default for TagCache {
    fn default() -> Self {
        Self::with_ttl(ROUTE_CACHE_TTL)
    }
}

impl TagCache {
    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
        }
    }

    /// A fresh body for `key`. Stale entries are dropped on read.
    pub fn get(&self, key: &str) -> Option<Value> {
        if let Some(entry) = self.entries.get(key) {
            if entry.stored_at.elapsed() < self.ttl {
                return Some(entry.body.clone());
            }
        }
        self.evict_stale(key);
        None
    }

    /// Removes `key` only if it is still stale under the shard lock, so a
    /// fresh insert racing this read survives.
    fn evict_stale(&self, key: &str) {
        self.entries
            .remove_if(key, |_, entry| entry.stored_at.elapsed() >= self.ttl);
    }

    pub fn insert(&self, key: impl Into<String>, tag: &'static str, body: Value) {
        self.entries.insert(
            key.into(),
            CachedBody {
                tag,
                body,
                stored_at: Instant::now(),
            },
        );
    }

    /// Drops every entry carrying `tag`; returns how many went.
    pub fn invalidate_tag(&self, tag: &str) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, entry| entry.tag != tag);
        before - self.entries.len()
    }

    /// Drops every entry whose key starts with `path`.
    pub fn invalidate_path(&self, path: &str) -> usize {
        let before = self.entries.len();
        self.entries.retain(|key, _| !key.starts_with(path));
        before - self.entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
