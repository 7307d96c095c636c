// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Baidu search provider
//!
//! Scrapes the Baidu HTML results page. Result pages are fetched
//! concurrently under a semaphore and a QPS limiter, with jitter before each
//! request, exponential backoff when the captcha page appears, and a global
//! cooldown shared by all in-flight page fetches. Baidu wraps result links
//! in `link?url=` redirects; those are resolved with a HEAD request that
//! does not follow redirects.

use async_trait::async_trait;
use futures::future::join_all;
use rand::Rng;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, LOCATION, REFERER};
use reqwest::Client;
use scraper::{ElementRef, Html, Selector};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, Semaphore};
use tracing::{debug, info, warn};

use super::provider::{build_client, request_error, SearchProvider};
use super::rate_limiter::SearchRateLimiter;
use super::types::{SearchError, SearchResult};

const BAIDU_SEARCH_URL: &str = "https://www.baidu.com/s";
const CAPTCHA_MARKER: &str = "百度安全验证";
const RESULTS_PER_PAGE: usize = 10;

const ABSTRACT_SELECTORS: &[&str] = &[
    ".c-abstract",
    ".content-right_8Zs4j",
    ".content-abstract",
    ".op-se-share-content",
    ".c-span-last",
];

/// UI labels that leak into abstracts
const ABSTRACT_UI_WORDS: &[&str] = &["播报", "暂停", "查看更多", "展开全部"];

/// Minimum chars for a fallback abstract block
const MIN_FALLBACK_ABSTRACT_CHARS: usize = 20;

/// Outcome of resolving a Baidu redirect link
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UrlResolveStatus {
    /// Not a redirect link, or resolution disabled
    Skipped,
    /// Location header read
    Resolved,
    /// Tried and failed
    Failed,
}

/// Tuning for the Baidu provider
#[derive(Debug, Clone)]
pub struct BaiduConfig {
    /// Results page endpoint
    pub search_url: String,
    /// Result pages in flight at once
    pub search_concurrency: usize,
    /// Result page requests per second (may be fractional)
    pub search_qps: f64,
    /// Random delay before each page request, in ms
    pub search_jitter_ms: (u64, u64),
    /// Redirect resolutions in flight at once
    pub resolve_concurrency: usize,
    /// Redirect resolutions per second
    pub resolve_qps: f64,
    /// Random delay before each resolution, in ms
    pub resolve_jitter_ms: (u64, u64),
    /// Retries per page after a captcha
    pub max_retries: u32,
    /// Base backoff, doubled per attempt
    pub retry_backoff: Duration,
    /// Pause applied to every page fetch after a captcha
    pub cooldown: Duration,
    /// Resolve `link?url=` redirects into target URLs
    pub resolve_real_url: bool,
    pub page_timeout: Duration,
    pub resolve_timeout: Duration,
}

impl BaiduConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            resolve_real_url: std::env::var("BAIDU_RESOLVE_URLS")
                .map(|v| v.to_lowercase() != "false")
                .unwrap_or(defaults.resolve_real_url),
            search_qps: std::env::var("BAIDU_SEARCH_QPS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.search_qps),
            ..defaults
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.search_concurrency == 0 || self.resolve_concurrency == 0 {
            return Err("Baidu concurrency must be greater than 0".to_string());
        }
        if self.search_qps <= 0.0 || self.resolve_qps <= 0.0 {
            return Err("Baidu QPS must be greater than 0".to_string());
        }
        Ok(())
    }
}

impl Default for BaiduConfig {
    fn default() -> Self {
        Self {
            search_url: BAIDU_SEARCH_URL.to_string(),
            search_concurrency: 2,
            search_qps: 0.5,
            search_jitter_ms: (50, 150),
            resolve_concurrency: 15,
            resolve_qps: 10.0,
            resolve_jitter_ms: (20, 80),
            max_retries: 2,
            retry_backoff: Duration::from_secs(3),
            cooldown: Duration::from_secs(30),
            resolve_real_url: true,
            page_timeout: Duration::from_secs(5),
            resolve_timeout: Duration::from_secs(2),
        }
    }
}

/// Baidu HTML search provider (no API key required)
pub struct BaiduSearchProvider {
    config: BaiduConfig,
    client: Client,
    resolve_client: Client,
    search_sem: Semaphore,
    search_limiter: SearchRateLimiter,
    resolve_sem: Semaphore,
    resolve_limiter: SearchRateLimiter,
    cooldown_until: Mutex<Option<Instant>>,
}

impl BaiduSearchProvider {
    pub fn new(config: BaiduConfig) -> Result<Self, SearchError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static(
                "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8",
            ),
        );
        headers.insert(REFERER, HeaderValue::from_static("https://www.baidu.com/"));

        let client = build_client(config.page_timeout, headers.clone(), true)?;
        let resolve_client = build_client(config.resolve_timeout, headers, false)?;

        Ok(Self {
            search_sem: Semaphore::new(config.search_concurrency.max(1)),
            search_limiter: SearchRateLimiter::per_second(config.search_qps),
            resolve_sem: Semaphore::new(config.resolve_concurrency.max(1)),
            resolve_limiter: SearchRateLimiter::per_second(config.resolve_qps),
            cooldown_until: Mutex::new(None),
            client,
            resolve_client,
            config,
        })
    }

    pub fn config(&self) -> &BaiduConfig {
        &self.config
    }

    async fn cooldown_remaining(&self) -> Duration {
        let until = *self.cooldown_until.lock().await;
        until
            .map(|t| t.saturating_duration_since(Instant::now()))
            .unwrap_or_default()
    }

    async fn start_cooldown(&self) {
        *self.cooldown_until.lock().await = Some(Instant::now() + self.config.cooldown);
    }

    /// Fetch one results page; `Ok(None)` means the captcha page came back
    async fn fetch_page(
        &self,
        query: &str,
        page_idx: usize,
    ) -> Result<Option<Vec<SearchResult>>, SearchError> {
        let pn = (page_idx * RESULTS_PER_PAGE).to_string();
        let response = self
            .client
            .get(&self.config.search_url)
            .query(&[("wd", query), ("pn", pn.as_str()), ("ie", "utf-8")])
            .send()
            .await
            .map_err(|e| request_error(e, self.config.page_timeout.as_millis() as u64))?;

        let status = response.status();
        let html = response
            .text()
            .await
            .map_err(|e| request_error(e, self.config.page_timeout.as_millis() as u64))?;

        if html.contains(CAPTCHA_MARKER) {
            warn!("Baidu captcha on page {}", page_idx);
            self.start_cooldown().await;
            return Ok(None);
        }

        if !status.is_success() {
            return Err(SearchError::ApiError {
                status: status.as_u16(),
                message: "Baidu request failed".to_string(),
            });
        }

        Ok(Some(parse_results(&html, page_idx)))
    }

    async fn fetch_page_throttled(
        &self,
        query: &str,
        page_idx: usize,
    ) -> Result<Option<Vec<SearchResult>>, SearchError> {
        let max_retries = self.config.max_retries;

        for attempt in 0..=max_retries {
            let wait = self.cooldown_remaining().await;
            if !wait.is_zero() {
                warn!("Baidu cooldown active, waiting {:.1}s", wait.as_secs_f64());
                tokio::time::sleep(wait).await;
            }

            tokio::time::sleep(jitter(self.config.search_jitter_ms)).await;
            self.search_limiter.wait().await;
            let page = {
                let _permit = self
                    .search_sem
                    .acquire()
                    .await
                    .map_err(|_| SearchError::ProviderUnavailable {
                        provider: "baidu".to_string(),
                    })?;
                self.fetch_page(query, page_idx).await?
            };

            if page.is_some() {
                return Ok(page);
            }

            if attempt < max_retries {
                let backoff = self.config.retry_backoff * 2u32.pow(attempt);
                warn!(
                    "Baidu page {} blocked, retrying in {:.1}s ({}/{})",
                    page_idx,
                    backoff.as_secs_f64(),
                    attempt + 1,
                    max_retries
                );
                tokio::time::sleep(backoff).await;
            }
        }

        Ok(None)
    }

    /// Resolve a Baidu redirect link into its target URL
    pub async fn resolve_url(&self, url: &str) -> (String, UrlResolveStatus) {
        if url.is_empty() || !needs_resolution(url) {
            return (url.to_string(), UrlResolveStatus::Skipped);
        }

        match self.resolve_client.head(url).send().await {
            Ok(response) => match response
                .headers()
                .get(LOCATION)
                .and_then(|v| v.to_str().ok())
                .filter(|v| !v.is_empty())
            {
                Some(location) => (location.to_string(), UrlResolveStatus::Resolved),
                None => (url.to_string(), UrlResolveStatus::Failed),
            },
            Err(e) => {
                debug!("Redirect resolution failed for {}: {}", url, e);
                (url.to_string(), UrlResolveStatus::Failed)
            }
        }
    }

    async fn resolve_throttled(&self, mut result: SearchResult) -> (SearchResult, UrlResolveStatus) {
        tokio::time::sleep(jitter(self.config.resolve_jitter_ms)).await;
        self.resolve_limiter.wait().await;
        let status = match self.resolve_sem.acquire().await {
            Ok(_permit) => {
                let (url, status) = self.resolve_url(&result.url).await;
                result.url = url;
                status
            }
            Err(_) => UrlResolveStatus::Failed,
        };
        (result, status)
    }

    /// Resolve every result's link, dropping unusable failures
    ///
    /// Results whose resolution failed are kept only if their URL is still
    /// absolute. If nothing survives, the unresolved list is returned.
    pub async fn resolve_all(&self, results: Vec<SearchResult>) -> Vec<SearchResult> {
        let resolved = join_all(results.into_iter().map(|r| self.resolve_throttled(r))).await;
        let total = resolved.len();

        let kept: Vec<SearchResult> = resolved
            .iter()
            .filter(|(r, status)| *status != UrlResolveStatus::Failed || r.url.starts_with("http"))
            .map(|(r, _)| r.clone())
            .collect();

        if kept.is_empty() && total > 0 {
            warn!("All Baidu links failed to resolve, returning raw results");
            return resolved.into_iter().map(|(r, _)| r).collect();
        }
        kept
    }
}

#[async_trait]
impl SearchProvider for BaiduSearchProvider {
    async fn search(
        &self,
        query: &str,
        num_results: usize,
    ) -> Result<Vec<SearchResult>, SearchError> {
        let pages_needed = num_results.max(1).div_ceil(RESULTS_PER_PAGE);
        let start = Instant::now();

        let pages = join_all((0..pages_needed).map(|i| self.fetch_page_throttled(query, i))).await;

        let mut results = Vec::new();
        let mut blocked = 0;
        let mut last_error = None;
        for page in pages {
            match page {
                Ok(Some(items)) => results.extend(items),
                Ok(None) => blocked += 1,
                Err(e) => {
                    warn!("Baidu page fetch failed: {}", e);
                    last_error = Some(e);
                }
            }
        }

        if results.is_empty() {
            if blocked > 0 {
                return Err(SearchError::RateLimited {
                    retry_after_secs: self.config.cooldown.as_secs(),
                });
            }
            if let Some(e) = last_error {
                return Err(e);
            }
        }

        info!(
            "Baidu: {} pages -> {} results in {}ms",
            pages_needed,
            results.len(),
            start.elapsed().as_millis()
        );

        if self.config.resolve_real_url {
            results = self.resolve_all(results).await;
        }

        Ok(results)
    }

    fn name(&self) -> &'static str {
        "baidu"
    }

    fn is_available(&self) -> bool {
        true
    }

    fn priority(&self) -> u8 {
        30
    }
}

fn jitter((lo, hi): (u64, u64)) -> Duration {
    if hi <= lo {
        return Duration::from_millis(lo);
    }
    Duration::from_millis(rand::thread_rng().gen_range(lo..=hi))
}

fn needs_resolution(url: &str) -> bool {
    url.contains("link?url=") || url.contains("baidu.php")
}

/// Remove icon-font glyphs, UI labels and redundant whitespace
pub fn clean_abstract(text: &str) -> String {
    let mut cleaned: String = text
        .chars()
        .filter(|c| !('\u{E600}'..='\u{E6FF}').contains(c))
        .collect();
    for word in ABSTRACT_UI_WORDS {
        cleaned = cleaned.replace(word, "");
    }
    cleaned.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn element_text(el: ElementRef<'_>) -> String {
    el.text().collect()
}

fn extract_abstract(container: ElementRef<'_>) -> String {
    for s in ABSTRACT_SELECTORS {
        if let Ok(selector) = Selector::parse(s) {
            if let Some(node) = container.select(&selector).next() {
                return element_text(node);
            }
        }
    }

    let Ok(blocks) = Selector::parse("div, span") else {
        return String::new();
    };
    let mut best = String::new();
    let mut best_len = 0;
    for node in container.select(&blocks) {
        let text = element_text(node);
        let trimmed = text.trim();
        let len = trimmed.chars().count();
        if len > MIN_FALLBACK_ABSTRACT_CHARS && len > best_len {
            best_len = len;
            best = trimmed.to_string();
        }
    }
    best
}

/// Parse a Baidu results page
///
/// Containers without a title are skipped. Ranks follow container position
/// across pages; the result filter renumbers them later.
pub fn parse_results(html: &str, page_idx: usize) -> Vec<SearchResult> {
    let document = Html::parse_document(html);
    let (Ok(container_sel), Ok(h3_sel), Ok(t_sel), Ok(a_sel)) = (
        Selector::parse(".c-container"),
        Selector::parse("h3"),
        Selector::parse(".t"),
        Selector::parse("a"),
    ) else {
        return Vec::new();
    };

    let mut results = Vec::new();
    for (i, container) in document.select(&container_sel).enumerate() {
        let Some(title_node) = container
            .select(&h3_sel)
            .next()
            .or_else(|| container.select(&t_sel).next())
        else {
            continue;
        };

        let title: String = title_node.text().map(str::trim).collect();
        let url = title_node
            .select(&a_sel)
            .next()
            .and_then(|a| a.value().attr("href"))
            .unwrap_or_default()
            .to_string();

        results.push(SearchResult {
            title,
            url,
            snippet: clean_abstract(&extract_abstract(container)),
            rank: page_idx * RESULTS_PER_PAGE + i + 1,
            published_date: None,
            source: "baidu".to_string(),
        });
    }
    results
}
