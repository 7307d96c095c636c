// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Search result filtering
//!
//! Drops unusable results before they are returned or crawled, then
//! renumbers the survivors.

use regex::Regex;
use std::collections::HashSet;
use url::Url;

use super::types::SearchResult;

/// Filters results by URL validity, duplicates, banned sites and noise
#[derive(Debug, Clone, Default)]
pub struct ContentFilter {
    banned_sites: Vec<String>,
    noise: Option<Regex>,
}

impl ContentFilter {
    /// Create a filter
    ///
    /// An invalid noise pattern is an error rather than silently disabling
    /// noise filtering.
    pub fn new(banned_sites: Vec<String>, noise_pattern: Option<&str>) -> Result<Self, regex::Error> {
        let noise = match noise_pattern {
            Some(p) if !p.trim().is_empty() => Some(Regex::new(p)?),
            _ => None,
        };
        Ok(Self {
            banned_sites: banned_sites
                .into_iter()
                .map(|s| s.trim().to_lowercase())
                .filter(|s| !s.is_empty())
                .collect(),
            noise,
        })
    }

    fn is_banned_site(&self, url: &str) -> bool {
        let host = match Url::parse(url) {
            Ok(parsed) => parsed.host_str().unwrap_or_default().to_lowercase(),
            Err(_) => return false,
        };
        self.banned_sites.iter().any(|site| host.contains(site.as_str()))
    }

    fn is_noise(&self, result: &SearchResult) -> bool {
        self.noise
            .as_ref()
            .map_or(false, |re| re.is_match(&result.title) || re.is_match(&result.snippet))
    }

    /// Keep at most `limit` results, renumbering `rank` from 1
    pub fn filter_results(&self, results: Vec<SearchResult>, limit: usize) -> Vec<SearchResult> {
        let mut kept = Vec::new();
        let mut seen = HashSet::new();

        for mut result in results {
            if kept.len() >= limit {
                break;
            }
            if !result.url.starts_with("http")
                || seen.contains(&result.url)
                || self.is_banned_site(&result.url)
                || self.is_noise(&result)
            {
                continue;
            }

            seen.insert(result.url.clone());
            result.rank = kept.len() + 1;
            kept.push(result);
        }

        kept
    }
}
