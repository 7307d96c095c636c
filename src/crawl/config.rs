// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Configuration for the crawl engine

use std::env;
use std::time::Duration;

use crate::cache::CachePolicy;

use super::types::FetchLevel;

/// Configuration for the crawl engine
#[derive(Debug, Clone)]
pub struct CrawlConfig {
    /// Highest fallback level attempted by default (default: 0, HTTP only)
    pub max_level: FetchLevel,
    /// Run body extraction on HTML payloads (default: true)
    pub use_readability: bool,
    /// Timeout per backend attempt in seconds (default: 15)
    pub timeout_secs: u64,
    /// Maximum characters of returned text (default: 30000)
    pub max_chars: usize,
    /// Concurrent crawls in `crawl_many` (default: 5)
    pub concurrency: usize,
    /// Crawl cache TTL in seconds, 0 disables expiry (default: 86400)
    pub cache_ttl_secs: u64,
    /// Maximum crawl cache entries (default: 1000)
    pub cache_max_entries: usize,
    /// API key for the reader service backend
    pub jina_api_key: Option<String>,
    /// Permit loopback and private network hosts (default: false)
    pub allow_private_hosts: bool,
}

impl CrawlConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            max_level: env::var("CRAWL_LEVEL")
                .ok()
                .and_then(|v| v.parse::<u8>().ok())
                .map(FetchLevel)
                .unwrap_or(defaults.max_level),
            use_readability: env::var("CRAWL_USE_READABILITY")
                .map(|v| v.to_lowercase() != "false")
                .unwrap_or(defaults.use_readability),
            timeout_secs: env::var("CRAWL_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.timeout_secs),
            max_chars: env::var("CRAWL_MAX_CHARS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.max_chars),
            concurrency: env::var("CRAWL_CONCURRENCY")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.concurrency),
            cache_ttl_secs: env::var("CRAWL_CACHE_TTL_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.cache_ttl_secs),
            cache_max_entries: env::var("CRAWL_CACHE_MAX_ENTRIES")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.cache_max_entries),
            jina_api_key: env::var("JINA_API_KEY").ok().filter(|k| !k.is_empty()),
            allow_private_hosts: false,
        }
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), String> {
        if self.timeout_secs == 0 {
            return Err("timeout_secs must be at least 1".to_string());
        }
        if self.max_chars == 0 {
            return Err("max_chars must be at least 1".to_string());
        }
        if self.concurrency == 0 {
            return Err("concurrency must be at least 1".to_string());
        }
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Cache policy for crawled pages; a zero TTL means entries never expire
    pub fn cache_policy(&self) -> CachePolicy {
        CachePolicy {
            ttl: (self.cache_ttl_secs > 0).then(|| Duration::from_secs(self.cache_ttl_secs)),
            max_entries: Some(self.cache_max_entries),
        }
    }

    pub fn with_max_level(mut self, level: u8) -> Self {
        self.max_level = FetchLevel(level);
        self
    }

    pub fn with_readability(mut self, enabled: bool) -> Self {
        self.use_readability = enabled;
        self
    }

    pub fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    pub fn with_max_chars(mut self, max_chars: usize) -> Self {
        self.max_chars = max_chars;
        self
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    pub fn with_jina_api_key(mut self, key: impl Into<String>) -> Self {
        self.jina_api_key = Some(key.into());
        self
    }

    pub fn with_private_hosts(mut self, allow: bool) -> Self {
        self.allow_private_hosts = allow;
        self
    }
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            max_level: FetchLevel::HTTP,
            use_readability: true,
            timeout_secs: 15,
            max_chars: 30_000,
            concurrency: 5,
            cache_ttl_secs: 86_400,
            cache_max_entries: 1000,
            jina_api_key: None,
            allow_private_hosts: false,
        }
    }
}
