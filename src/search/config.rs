// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Configuration for web search functionality

use std::env;

use super::baidu::BaiduConfig;
use super::filter::ContentFilter;

/// Provider names accepted by `SEARCH_PROVIDER`
pub const KNOWN_PROVIDERS: &[&str] = &["brave", "baidu", "duckduckgo"];

/// Configuration for web search functionality
#[derive(Debug, Clone)]
pub struct SearchConfig {
    /// Whether web search is enabled
    pub enabled: bool,
    /// Provider-specific configuration
    pub providers: SearchProviderConfig,
    /// Cache TTL in seconds
    pub cache_ttl_secs: u64,
    /// Maximum cached queries
    pub cache_max_entries: usize,
    /// Rate limit (requests per minute)
    pub rate_limit_per_minute: u32,
    /// Default number of results per search
    pub default_num_results: usize,
    /// Hosts whose results are dropped (substring match)
    pub banned_sites: Vec<String>,
    /// Regex matched against titles and snippets; matches are dropped
    pub noise_pattern: Option<String>,
}

/// Provider-specific configuration
#[derive(Debug, Clone)]
pub struct SearchProviderConfig {
    /// Brave Search API key
    pub brave_api_key: Option<String>,
    /// Preferred search provider, tried before the others
    pub preferred_provider: String,
    /// Baidu scraping limits
    pub baidu: BaiduConfig,
}

fn parse_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

impl SearchConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            // DuckDuckGo and Baidu need no key, so search is on unless disabled
            enabled: env::var("WEB_SEARCH_ENABLED")
                .map(|v| v.to_lowercase() != "false")
                .unwrap_or(true),
            providers: SearchProviderConfig {
                brave_api_key: env::var("BRAVE_API_KEY").ok().filter(|k| !k.trim().is_empty()),
                preferred_provider: env::var("SEARCH_PROVIDER")
                    .map(|v| v.to_lowercase())
                    .unwrap_or(defaults.providers.preferred_provider),
                baidu: BaiduConfig::from_env(),
            },
            cache_ttl_secs: env::var("SEARCH_CACHE_TTL_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.cache_ttl_secs),
            cache_max_entries: env::var("SEARCH_CACHE_MAX_ENTRIES")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.cache_max_entries),
            rate_limit_per_minute: env::var("SEARCH_RATE_LIMIT_PER_MINUTE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.rate_limit_per_minute),
            default_num_results: env::var("SEARCH_NUM_RESULTS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.default_num_results),
            banned_sites: env::var("SEARCH_BANNED_SITES")
                .map(|v| parse_list(&v))
                .unwrap_or_default(),
            noise_pattern: env::var("SEARCH_NOISE_PATTERN")
                .ok()
                .filter(|p| !p.trim().is_empty()),
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.cache_ttl_secs == 0 {
            return Err("Cache TTL must be greater than 0".to_string());
        }
        if self.rate_limit_per_minute == 0 {
            return Err("Rate limit must be greater than 0".to_string());
        }
        if self.default_num_results == 0 {
            return Err("Default number of results must be greater than 0".to_string());
        }
        if !KNOWN_PROVIDERS.contains(&self.providers.preferred_provider.as_str()) {
            return Err(format!(
                "Unknown search provider '{}' (expected one of {})",
                self.providers.preferred_provider,
                KNOWN_PROVIDERS.join(", ")
            ));
        }
        self.content_filter()?;
        self.providers.baidu.validate()
    }

    /// Build the result filter from the banned sites and noise pattern
    pub fn content_filter(&self) -> Result<ContentFilter, String> {
        ContentFilter::new(self.banned_sites.clone(), self.noise_pattern.as_deref())
            .map_err(|e| format!("Invalid noise pattern: {}", e))
    }

    /// Check if a keyed search provider is configured
    pub fn has_api_provider(&self) -> bool {
        self.providers.brave_api_key.is_some()
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            providers: SearchProviderConfig {
                brave_api_key: None,
                preferred_provider: "brave".to_string(),
                baidu: BaiduConfig::default(),
            },
            cache_ttl_secs: 3600,
            cache_max_entries: 1000,
            rate_limit_per_minute: 60,
            default_num_results: 10,
            banned_sites: Vec::new(),
            noise_pattern: None,
        }
    }
}
