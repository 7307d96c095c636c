// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Search service orchestration
//!
//! Coordinates search providers, result filtering, caching and rate limiting,
//! and drives the crawl engine and compressor for `search_with_content`.

use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::baidu::BaiduSearchProvider;
use super::brave::BraveSearchProvider;
use super::config::SearchConfig;
use super::duckduckgo::DuckDuckGoProvider;
use super::filter::ContentFilter;
use super::provider::SearchProvider;
use super::rate_limiter::SearchRateLimiter;
use super::types::{
    ContentStatus, SearchError, SearchResponse, SearchResponseWithContent, SearchResult,
    SearchResultWithContent,
};
use crate::cache::{fingerprint, CachePolicy, CacheStats, ResponseCache};
use crate::compress::{CompressConfig, CompressStrategy, ContextCompressor};
use crate::crawl::{CrawlConfig, CrawlEngine, CrawlError, CrawlResult};

#[derive(Debug, Clone)]
struct CachedSearch {
    results: Vec<SearchResult>,
    provider: String,
}

/// Main search service that orchestrates providers, caching, and rate limiting
pub struct SearchService {
    providers: Vec<Box<dyn SearchProvider>>,
    cache: ResponseCache<CachedSearch>,
    rate_limiter: SearchRateLimiter,
    filter: ContentFilter,
    crawler: Arc<CrawlEngine>,
    compressor: ContextCompressor,
    config: SearchConfig,
}

impl SearchService {
    /// Create a new search service from configuration
    ///
    /// Pages for `search_with_content` are crawled with a [`CrawlEngine`]
    /// built from `CrawlConfig::from_env()`.
    pub fn new(config: SearchConfig) -> Result<Self, SearchError> {
        let mut providers: Vec<Box<dyn SearchProvider>> = Vec::new();

        if let Some(ref api_key) = config.providers.brave_api_key {
            if !api_key.is_empty() {
                providers.push(Box::new(BraveSearchProvider::new(api_key.clone())?));
                debug!("Brave Search provider enabled");
            }
        }

        providers.push(Box::new(BaiduSearchProvider::new(
            config.providers.baidu.clone(),
        )?));
        debug!("Baidu provider enabled");

        providers.push(Box::new(DuckDuckGoProvider::new()?));
        debug!("DuckDuckGo provider enabled (fallback)");

        let crawler = CrawlEngine::new(CrawlConfig::from_env())
            .map_err(|e| SearchError::InvalidConfig(e.to_string()))?;

        Self::with_providers(config, providers, Arc::new(crawler))
    }

    /// Create a service with explicit providers and crawl engine
    pub fn with_providers(
        config: SearchConfig,
        mut providers: Vec<Box<dyn SearchProvider>>,
        crawler: Arc<CrawlEngine>,
    ) -> Result<Self, SearchError> {
        config.validate().map_err(SearchError::InvalidConfig)?;
        let filter = config.content_filter().map_err(SearchError::InvalidConfig)?;

        // Preferred provider first, then by priority (lower = preferred)
        let preferred = config.providers.preferred_provider.clone();
        providers.sort_by_key(|p| (p.name() != preferred, p.priority()));

        let cache = ResponseCache::new(CachePolicy::new(
            config.cache_ttl_secs,
            config.cache_max_entries,
        ));
        let rate_limiter = SearchRateLimiter::new(config.rate_limit_per_minute);

        Ok(Self {
            providers,
            cache,
            rate_limiter,
            filter,
            crawler,
            compressor: ContextCompressor::new(CompressConfig::from_env()),
            config,
        })
    }

    /// Replace the compressor used for page content
    pub fn with_compressor(mut self, config: CompressConfig) -> Result<Self, SearchError> {
        config.validate().map_err(SearchError::InvalidConfig)?;
        self.compressor = ContextCompressor::new(config);
        Ok(self)
    }

    /// Perform a search
    ///
    /// # Arguments
    /// * `query` - The search query
    /// * `num_results` - Optional number of results (uses default if None)
    ///
    /// # Returns
    /// Filtered results ranked from 1, or an error when every provider failed
    pub async fn search(
        &self,
        query: &str,
        num_results: Option<usize>,
    ) -> Result<SearchResponse, SearchError> {
        if !self.config.enabled {
            return Err(SearchError::SearchDisabled);
        }

        let query = query.trim();
        if query.is_empty() {
            return Err(SearchError::InvalidQuery {
                reason: "query is empty".to_string(),
            });
        }

        let num_results = num_results
            .unwrap_or(self.config.default_num_results)
            .max(1);
        let key = fingerprint(&["search", query, &num_results.to_string()]);

        if let Some(hit) = self.cache.get(&key) {
            debug!("Cache hit for query: {}", query);
            return Ok(SearchResponse {
                query: query.to_string(),
                result_count: hit.results.len(),
                results: hit.results,
                search_time_ms: 0,
                provider: hit.provider,
                cached: true,
            });
        }

        self.rate_limiter.check()?;

        let start = Instant::now();
        let mut empty_from = None;

        for provider in &self.providers {
            if !provider.is_available() {
                continue;
            }

            debug!("Trying search provider: {}", provider.name());

            match provider.search(query, num_results).await {
                Ok(raw) => {
                    let raw_count = raw.len();
                    let results = self.filter.filter_results(raw, num_results);
                    let elapsed_ms = start.elapsed().as_millis() as u64;

                    if results.is_empty() {
                        debug!(
                            "Provider {} returned no usable results ({} before filtering)",
                            provider.name(),
                            raw_count
                        );
                        empty_from.get_or_insert(provider.name());
                        continue;
                    }

                    self.cache.put(
                        &key,
                        CachedSearch {
                            results: results.clone(),
                            provider: provider.name().to_string(),
                        },
                    );

                    info!(
                        "Search complete: {} results ({} before filtering) from {} in {}ms",
                        results.len(),
                        raw_count,
                        provider.name(),
                        elapsed_ms
                    );

                    return Ok(SearchResponse {
                        query: query.to_string(),
                        result_count: results.len(),
                        results,
                        search_time_ms: elapsed_ms,
                        provider: provider.name().to_string(),
                        cached: false,
                    });
                }
                Err(e) => {
                    warn!(
                        "Search provider {} failed: {}, trying next",
                        provider.name(),
                        e
                    );
                }
            }
        }

        match empty_from {
            Some(provider) => Ok(SearchResponse {
                query: query.to_string(),
                results: Vec::new(),
                search_time_ms: start.elapsed().as_millis() as u64,
                provider: provider.to_string(),
                cached: false,
                result_count: 0,
            }),
            None => Err(SearchError::ProviderUnavailable {
                provider: "all".to_string(),
            }),
        }
    }

    /// Search, then crawl and compress every result page against the query
    ///
    /// Pages are crawled concurrently up to the crawl engine's concurrency
    /// bound. Each result carries a [`ContentStatus`] separating compressed,
    /// fetched, empty and unreachable pages.
    pub async fn search_with_content(
        &self,
        query: &str,
        num_results: Option<usize>,
    ) -> Result<SearchResponseWithContent, SearchError> {
        self.search_with_content_cancellable(query, num_results, &CancellationToken::new())
            .await
    }

    /// [`search_with_content`](Self::search_with_content) with a caller-owned
    /// cancellation token for the crawl phase
    pub async fn search_with_content_cancellable(
        &self,
        query: &str,
        num_results: Option<usize>,
        cancel: &CancellationToken,
    ) -> Result<SearchResponseWithContent, SearchError> {
        let response = self.search(query, num_results).await?;

        let crawl_start = Instant::now();
        let crawl_config = self.crawler.config();
        let urls: Vec<String> = response.results.iter().map(|r| r.url.clone()).collect();
        let crawled = self
            .crawler
            .crawl_many(
                &urls,
                crawl_config.max_level.0,
                crawl_config.use_readability,
                cancel,
            )
            .await;

        let results: Vec<SearchResultWithContent> = response
            .results
            .into_iter()
            .zip(crawled)
            .map(|(result, crawl)| self.attach_content(&response.query, result, crawl))
            .collect();

        let content_fetched_count = results
            .iter()
            .filter(|r| {
                matches!(r.status, ContentStatus::Compressed | ContentStatus::Fetched)
            })
            .count();
        let content_fetch_time_ms = crawl_start.elapsed().as_millis() as u64;

        info!(
            "Content for '{}': {}/{} pages in {}ms",
            response.query,
            content_fetched_count,
            results.len(),
            content_fetch_time_ms
        );

        Ok(SearchResponseWithContent {
            query: response.query,
            result_count: results.len(),
            results,
            search_time_ms: response.search_time_ms,
            content_fetch_time_ms,
            provider: response.provider,
            cached: response.cached,
            content_fetched_count,
        })
    }

    fn attach_content(
        &self,
        query: &str,
        result: SearchResult,
        crawl: Result<CrawlResult, CrawlError>,
    ) -> SearchResultWithContent {
        let crawl = match crawl {
            Ok(crawl) => crawl,
            Err(e) => {
                debug!("Skipping content for {}: {}", result.url, e);
                return SearchResultWithContent {
                    result,
                    content: None,
                    status: ContentStatus::NotFetched,
                    crawl_level: None,
                };
            }
        };

        if !crawl.is_success() {
            let status = if crawl.fetched_but_empty() {
                ContentStatus::Empty
            } else {
                ContentStatus::NotFetched
            };
            return SearchResultWithContent {
                result,
                content: None,
                status,
                crawl_level: None,
            };
        }

        let crawl_level = crawl.level().map(|l| l.0);
        let text = crawl.into_text();
        if text.trim().is_empty() {
            return SearchResultWithContent {
                result,
                content: None,
                status: ContentStatus::Empty,
                crawl_level,
            };
        }

        let (content, status) = match self.compressor.compress_detailed(query, &text) {
            Ok(compressed) => {
                let status = match compressed.strategy {
                    CompressStrategy::Ranked | CompressStrategy::TruncatedTopSegment => {
                        ContentStatus::Compressed
                    }
                    CompressStrategy::Unchanged | CompressStrategy::LeadingFallback => {
                        ContentStatus::Fetched
                    }
                };
                (compressed.text, status)
            }
            Err(e) => {
                warn!("Compression failed for {}: {}", result.url, e);
                (text, ContentStatus::Fetched)
            }
        };

        SearchResultWithContent {
            result,
            content: Some(content),
            status,
            crawl_level,
        }
    }

    /// Perform multiple searches in parallel
    pub async fn batch_search(
        &self,
        queries: Vec<String>,
        num_results_per_query: Option<usize>,
    ) -> Vec<Result<SearchResponse, SearchError>> {
        let futures: Vec<_> = queries
            .iter()
            .map(|q| self.search(q, num_results_per_query))
            .collect();

        futures::future::join_all(futures).await
    }

    /// Check if search is enabled
    pub fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    /// Available provider names, in the order they are tried
    pub fn available_providers(&self) -> Vec<&str> {
        self.providers
            .iter()
            .filter(|p| p.is_available())
            .map(|p| p.name())
            .collect()
    }

    pub fn crawler(&self) -> &Arc<CrawlEngine> {
        &self.crawler
    }

    /// Get cache statistics
    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    /// Clear the search cache
    pub fn clear_cache(&self) {
        self.cache.clear();
    }
}
