// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! DuckDuckGo search provider
//!
//! Implements web search using DuckDuckGo's HTML interface.
//! No API key required, serves as a fallback provider.

use async_trait::async_trait;
use reqwest::header::HeaderMap;
use reqwest::Client;
use scraper::{Html, Selector};
use std::time::Duration;
use url::Url;

use super::provider::{build_client, request_error, SearchProvider};
use super::types::{SearchError, SearchResult};

const DDG_HTML_URL: &str = "https://html.duckduckgo.com/html/";
const DDG_TIMEOUT_MS: u64 = 10_000;

/// DuckDuckGo search provider (no API key required)
pub struct DuckDuckGoProvider {
    endpoint: String,
    client: Client,
}

impl DuckDuckGoProvider {
    /// Create a new DuckDuckGo provider
    pub fn new() -> Result<Self, SearchError> {
        Self::with_endpoint(DDG_HTML_URL)
    }

    /// Create a provider that posts to a different endpoint
    pub fn with_endpoint(endpoint: impl Into<String>) -> Result<Self, SearchError> {
        let client = build_client(Duration::from_millis(DDG_TIMEOUT_MS), HeaderMap::new(), true)?;
        Ok(Self {
            endpoint: endpoint.into(),
            client,
        })
    }
}

#[async_trait]
impl SearchProvider for DuckDuckGoProvider {
    async fn search(
        &self,
        query: &str,
        num_results: usize,
    ) -> Result<Vec<SearchResult>, SearchError> {
        let response = self
            .client
            .post(&self.endpoint)
            .form(&[("q", query)])
            .send()
            .await
            .map_err(|e| request_error(e, DDG_TIMEOUT_MS))?;

        let status = response.status();
        if status == 429 || status == 202 {
            // 202 is served with an anomaly page when DDG throttles
            return Err(SearchError::RateLimited {
                retry_after_secs: 60,
            });
        }
        if !status.is_success() {
            return Err(SearchError::ApiError {
                status: status.as_u16(),
                message: "DuckDuckGo request failed".to_string(),
            });
        }

        let html = response
            .text()
            .await
            .map_err(|e| request_error(e, DDG_TIMEOUT_MS))?;

        Ok(parse_ddg_html(&html, num_results))
    }

    fn name(&self) -> &'static str {
        "duckduckgo"
    }

    fn is_available(&self) -> bool {
        true
    }

    fn priority(&self) -> u8 {
        50
    }
}

/// Parse the DuckDuckGo HTML results page
pub fn parse_ddg_html(html: &str, max_results: usize) -> Vec<SearchResult> {
    let document = Html::parse_document(html);
    let (Ok(result_sel), Ok(link_sel), Ok(snippet_sel)) = (
        Selector::parse(".result"),
        Selector::parse("a.result__a"),
        Selector::parse(".result__snippet"),
    ) else {
        return Vec::new();
    };

    let mut results = Vec::new();
    for block in document.select(&result_sel) {
        if results.len() >= max_results {
            break;
        }
        let Some(link) = block.select(&link_sel).next() else {
            continue;
        };

        let url = link
            .value()
            .attr("href")
            .map(extract_ddg_url)
            .unwrap_or_default();
        let title = collapse(link.text());
        if url.is_empty() || title.is_empty() {
            continue;
        }

        let snippet = block
            .select(&snippet_sel)
            .next()
            .map(|s| collapse(s.text()))
            .unwrap_or_default();

        results.push(SearchResult {
            title,
            url,
            snippet,
            rank: results.len() + 1,
            published_date: None,
            source: "duckduckgo".to_string(),
        });
    }

    results
}

fn collapse<'a>(parts: impl Iterator<Item = &'a str>) -> String {
    parts
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Extract the target URL from DuckDuckGo's redirect link
fn extract_ddg_url(href: &str) -> String {
    // Redirect links look like //duckduckgo.com/l/?uddg=https%3A%2F%2Fexample.com&rut=...
    if href.starts_with("http") && !href.contains("duckduckgo.com/l/") {
        return href.to_string();
    }

    let absolute = if href.starts_with("//") {
        format!("https:{}", href)
    } else if href.starts_with('/') {
        format!("https://duckduckgo.com{}", href)
    } else {
        href.to_string()
    };

    Url::parse(&absolute)
        .ok()
        .and_then(|u| {
            u.query_pairs()
                .find(|(k, _)| k == "uddg")
                .map(|(_, v)| v.into_owned())
        })
        .unwrap_or_default()
}
