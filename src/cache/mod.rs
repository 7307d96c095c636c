// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Fingerprinted response cache
//!
//! Shared by the search service (query-level results) and the crawl engine
//! (URL-level page text). The cache is an explicitly constructed object that
//! callers hold behind an `Arc`; there is no process-wide instance.
//!
//! Bounding is an explicit [`CachePolicy`]: an optional TTL and an optional
//! entry cap. When the cap is reached the oldest inserted entry is evicted.

use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::RwLock;
use std::time::{Duration, Instant};

/// Build a stable cache key from the semantically relevant request inputs
///
/// Parts are length-prefixed before hashing so `["ab", "c"]` and
/// `["a", "bc"]` never collide.
pub fn fingerprint(parts: &[&str]) -> String {
    let mut hasher = Sha256::new();
    for part in parts {
        hasher.update((part.len() as u64).to_le_bytes());
        hasher.update(part.as_bytes());
    }
    hex::encode(hasher.finalize())
}

/// Eviction and expiry policy for a [`ResponseCache`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CachePolicy {
    /// Entries older than this are treated as misses. `None` never expires.
    pub ttl: Option<Duration>,
    /// Maximum number of live entries. `None` disables the cap.
    pub max_entries: Option<usize>,
}

impl CachePolicy {
    /// Policy with both a TTL and an entry cap
    pub fn new(ttl_secs: u64, max_entries: usize) -> Self {
        Self {
            ttl: Some(Duration::from_secs(ttl_secs)),
            max_entries: Some(max_entries),
        }
    }

    /// Entries never expire and the cache is never trimmed
    pub fn unbounded() -> Self {
        Self {
            ttl: None,
            max_entries: None,
        }
    }

    /// Keep entries until evicted by the cap; no time-based expiry
    pub fn capped(max_entries: usize) -> Self {
        Self {
            ttl: None,
            max_entries: Some(max_entries),
        }
    }

    fn is_expired(&self, created_at: Instant) -> bool {
        match self.ttl {
            Some(ttl) => created_at.elapsed() > ttl,
            None => false,
        }
    }
}

impl Default for CachePolicy {
    fn default() -> Self {
        Self::new(3600, 1000)
    }
}

/// A cached payload and when it was stored
#[derive(Debug, Clone)]
pub struct CacheEntry<V> {
    pub value: V,
    pub created_at: Instant,
}

/// Cache statistics
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheStats {
    /// Total entries in cache
    pub total: usize,
    /// Expired entries (not yet evicted)
    pub expired: usize,
    /// Maximum cache capacity, if capped
    pub max: Option<usize>,
}

/// Key/value cache safe to share across concurrent callers
///
/// Writes replace the whole entry under the write lock, so a reader never
/// observes a partially written value.
pub struct ResponseCache<V> {
    entries: RwLock<HashMap<String, CacheEntry<V>>>,
    policy: CachePolicy,
}

impl<V: Clone> ResponseCache<V> {
    /// Create a new cache with the given policy
    pub fn new(policy: CachePolicy) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            policy,
        }
    }

    /// Look up a key
    ///
    /// Returns `None` on a miss or when the entry has expired; a miss is not
    /// an error.
    pub fn get(&self, key: &str) -> Option<V> {
        let entries = self.entries.read().ok()?;
        let entry = entries.get(key)?;

        if self.policy.is_expired(entry.created_at) {
            return None;
        }

        Some(entry.value.clone())
    }

    /// Store a value, replacing any previous entry for the key
    pub fn put(&self, key: &str, value: V) {
        let mut entries = match self.entries.write() {
            Ok(e) => e,
            Err(_) => return,
        };

        if let Some(max) = self.policy.max_entries {
            if max == 0 {
                return;
            }
            if !entries.contains_key(key) && entries.len() >= max {
                // Drop expired entries first so a live one is not evicted needlessly
                let policy = self.policy;
                entries.retain(|_, e| !policy.is_expired(e.created_at));
                if entries.len() >= max {
                    Self::evict_oldest(&mut entries);
                }
            }
        }

        entries.insert(
            key.to_string(),
            CacheEntry {
                value,
                created_at: Instant::now(),
            },
        );
    }

    /// Remove a single entry, returning whether it existed
    pub fn invalidate(&self, key: &str) -> bool {
        match self.entries.write() {
            Ok(mut entries) => entries.remove(key).is_some(),
            Err(_) => false,
        }
    }

    /// Clear all entries
    pub fn clear(&self) {
        if let Ok(mut entries) = self.entries.write() {
            entries.clear();
        }
    }

    /// Remove expired entries, returning how many were dropped
    pub fn cleanup_expired(&self) -> usize {
        let policy = self.policy;
        match self.entries.write() {
            Ok(mut entries) => {
                let before = entries.len();
                entries.retain(|_, e| !policy.is_expired(e.created_at));
                before - entries.len()
            }
            Err(_) => 0,
        }
    }

    /// Get cache statistics
    pub fn stats(&self) -> CacheStats {
        let entries = match self.entries.read() {
            Ok(e) => e,
            Err(_) => {
                return CacheStats {
                    total: 0,
                    expired: 0,
                    max: self.policy.max_entries,
                }
            }
        };

        CacheStats {
            total: entries.len(),
            expired: entries
                .values()
                .filter(|e| self.policy.is_expired(e.created_at))
                .count(),
            max: self.policy.max_entries,
        }
    }

    pub fn policy(&self) -> &CachePolicy {
        &self.policy
    }

    fn evict_oldest(entries: &mut HashMap<String, CacheEntry<V>>) {
        if let Some(oldest_key) = entries
            .iter()
            .min_by_key(|(_, v)| v.created_at)
            .map(|(k, _)| k.clone())
        {
            entries.remove(&oldest_key);
        }
    }
}

impl<V: Clone> Default for ResponseCache<V> {
    fn default() -> Self {
        Self::new(CachePolicy::default())
    }
}
