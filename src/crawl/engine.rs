// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Crawl engine with degrade-on-failure backend chain
//!
//! Backends are held in an ordered list; a backend's index is its fallback
//! level. A crawl walks the list from level 0 up to the requested maximum,
//! one attempt per level, and stops at the first attempt that yields text.
//! Failures are recorded on the result instead of being raised.

use futures::future::join_all;
use std::net::Ipv4Addr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use url::{Host, Url};

use crate::cache::{fingerprint, ResponseCache};
use crate::text::truncate_chars;

use super::backend::FetchBackend;
use super::browser::BrowserFetcher;
use super::config::CrawlConfig;
use super::extractor::{BodyExtractor, ReadabilityExtractor};
use super::http::HttpFetcher;
use super::reader::ReaderFetcher;
use super::types::{
    AttemptFailure, CachedCrawl, CrawlError, CrawlResult, FetchError, FetchLevel, PayloadFormat,
    RawPage,
};

/// How long an interrupted backend gets to release its resources
const CANCEL_GRACE: Duration = Duration::from_secs(5);

/// Why an attempt was abandoned before the backend returned
enum Interrupted {
    Cancelled,
    TimedOut,
}

/// Orchestrates fetch backends and body extraction for single URLs
pub struct CrawlEngine {
    backends: Vec<Arc<dyn FetchBackend>>,
    extractor: Arc<dyn BodyExtractor>,
    cache: Option<Arc<ResponseCache<CachedCrawl>>>,
    config: CrawlConfig,
}

impl CrawlEngine {
    /// Create an engine with the standard chain: HTTP, browser, reader service
    ///
    /// The engine owns a fresh crawl cache built from the config's policy.
    pub fn new(config: CrawlConfig) -> Result<Self, FetchError> {
        let timeout = config.timeout();
        let backends: Vec<Arc<dyn FetchBackend>> = vec![
            Arc::new(HttpFetcher::new(timeout)?),
            Arc::new(BrowserFetcher::new()),
            Arc::new(ReaderFetcher::new(config.jina_api_key.clone(), timeout)?),
        ];
        let cache = Arc::new(ResponseCache::new(config.cache_policy()));

        Ok(Self {
            backends,
            extractor: Arc::new(ReadabilityExtractor::new()),
            cache: Some(cache),
            config,
        })
    }

    /// Create an engine over a custom backend chain, without a cache
    pub fn with_backends(config: CrawlConfig, backends: Vec<Arc<dyn FetchBackend>>) -> Self {
        Self {
            backends,
            extractor: Arc::new(ReadabilityExtractor::new()),
            cache: None,
            config,
        }
    }

    /// Append a backend at the next level, returning that level
    pub fn register(&mut self, backend: Arc<dyn FetchBackend>) -> FetchLevel {
        self.backends.push(backend);
        FetchLevel((self.backends.len() - 1) as u8)
    }

    /// Replace the body extraction step
    pub fn with_extractor(mut self, extractor: Arc<dyn BodyExtractor>) -> Self {
        self.extractor = extractor;
        self
    }

    /// Share a crawl cache with other components
    pub fn with_cache(mut self, cache: Arc<ResponseCache<CachedCrawl>>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn without_cache(mut self) -> Self {
        self.cache = None;
        self
    }

    pub fn config(&self) -> &CrawlConfig {
        &self.config
    }

    pub fn cache(&self) -> Option<&Arc<ResponseCache<CachedCrawl>>> {
        self.cache.as_ref()
    }

    pub fn extractor_name(&self) -> &'static str {
        self.extractor.name()
    }

    /// Names of backends that can run in this build, in level order
    pub fn available_backends(&self) -> Vec<&'static str> {
        self.backends
            .iter()
            .filter(|b| b.is_available())
            .map(|b| b.name())
            .collect()
    }

    /// Crawl with the configured default level and extraction setting
    pub async fn crawl_default(&self, url: &str) -> Result<CrawlResult, CrawlError> {
        self.crawl(url, self.config.max_level.0, self.config.use_readability)
            .await
    }

    /// Fetch a URL through levels `0..=max_level`
    ///
    /// Only precondition violations (an invalid or blocked URL) are errors;
    /// fetch failures produce an `Exhausted` result with empty text.
    pub async fn crawl(
        &self,
        url: &str,
        max_level: u8,
        use_readability: bool,
    ) -> Result<CrawlResult, CrawlError> {
        self.crawl_with_cancel(url, max_level, use_readability, &CancellationToken::new())
            .await
    }

    /// As [`crawl`](Self::crawl), stopping the active backend when `cancel` fires
    pub async fn crawl_with_cancel(
        &self,
        url: &str,
        max_level: u8,
        use_readability: bool,
        cancel: &CancellationToken,
    ) -> Result<CrawlResult, CrawlError> {
        self.validate_url(url)?;
        let short_url = truncate_chars(url, 80);

        let cache_key = Self::cache_key(url, use_readability);
        if let Some(cache) = &self.cache {
            match cache.get(&cache_key) {
                Some(entry) if entry.level.0 <= max_level => {
                    info!("[crawl][cache hit] {} {}", entry.level, short_url);
                    return Ok(CrawlResult::cached(url, entry));
                }
                Some(entry) => {
                    debug!(
                        "[crawl] cached {} text above max level L{}, refetching {}",
                        entry.level, max_level, short_url
                    );
                }
                None => {}
            }
        }

        let mut failures: Vec<AttemptFailure> = Vec::new();
        let timeout = self.config.timeout();
        let last = (max_level as usize).min(self.backends.len().saturating_sub(1));

        for (index, backend) in self.backends.iter().enumerate().take(last + 1) {
            let level = FetchLevel(index as u8);
            let started = Instant::now();

            if !backend.is_available() {
                debug!("[crawl] {} {} unavailable, skipping", level, backend.name());
                failures.push(AttemptFailure {
                    level,
                    backend: backend.name(),
                    error: FetchError::Unavailable(backend.name().to_string()),
                    elapsed_ms: 0,
                });
                continue;
            }

            let attempt_cancel = cancel.child_token();
            let mut attempt = backend.fetch(url, &attempt_cancel);
            let interrupted = tokio::select! {
                biased;
                _ = cancel.cancelled() => Err(Interrupted::Cancelled),
                _ = tokio::time::sleep(timeout) => Err(Interrupted::TimedOut),
                result = &mut attempt => Ok(result),
            };

            let outcome = match interrupted {
                Ok(result) => result,
                Err(reason) => {
                    // Signal the backend, then let it run its own teardown
                    attempt_cancel.cancel();
                    if tokio::time::timeout(CANCEL_GRACE, &mut attempt).await.is_err() {
                        warn!(
                            "[crawl] {} {} did not stop within {}ms",
                            level,
                            backend.name(),
                            CANCEL_GRACE.as_millis()
                        );
                    }
                    Err(match reason {
                        Interrupted::Cancelled => FetchError::Cancelled(url.to_string()),
                        Interrupted::TimedOut => FetchError::Timeout {
                            url: url.to_string(),
                            timeout_ms: timeout.as_millis() as u64,
                        },
                    })
                }
            };

            let outcome = outcome.and_then(|page| self.finish(url, page, use_readability));
            let elapsed_ms = started.elapsed().as_millis() as u64;

            match outcome {
                Ok((text, degraded)) => {
                    let text = truncate_chars(&text, self.config.max_chars).to_string();
                    info!(
                        "[crawl] {} {} ok: {} | {} chars | {}ms",
                        level,
                        backend.name(),
                        short_url,
                        text.chars().count(),
                        elapsed_ms
                    );
                    let result =
                        CrawlResult::fetched(url, level, backend.name(), text, degraded, failures);
                    if let (Some(cache), Some(entry)) = (&self.cache, result.to_cached()) {
                        cache.put(&cache_key, entry);
                    }
                    return Ok(result);
                }
                Err(error) => {
                    warn!(
                        "[crawl] {} {} failed: {} | {}ms",
                        level,
                        backend.name(),
                        error,
                        elapsed_ms
                    );
                    let cancelled = matches!(error, FetchError::Cancelled(_));
                    failures.push(AttemptFailure {
                        level,
                        backend: backend.name(),
                        error,
                        elapsed_ms,
                    });
                    if cancelled {
                        break;
                    }
                }
            }
        }

        let attempted: Vec<&str> = failures.iter().map(|f| f.backend).collect();
        warn!(
            "[crawl] all attempted backends failed: {:?}, url={}",
            attempted, short_url
        );
        Ok(CrawlResult::exhausted(url, failures))
    }

    /// Crawl many URLs concurrently, bounded by the configured concurrency
    ///
    /// Results are returned in input order.
    pub async fn crawl_many(
        &self,
        urls: &[String],
        max_level: u8,
        use_readability: bool,
        cancel: &CancellationToken,
    ) -> Vec<Result<CrawlResult, CrawlError>> {
        let semaphore = Semaphore::new(self.config.concurrency.max(1));
        let semaphore = &semaphore;

        let tasks = urls.iter().map(|url| async move {
            let _permit = semaphore.acquire().await;
            self.crawl_with_cancel(url, max_level, use_readability, cancel)
                .await
        });

        join_all(tasks).await
    }

    /// Turn a raw payload into final text, flagging raw fallbacks as degraded
    fn finish(
        &self,
        url: &str,
        page: RawPage,
        use_readability: bool,
    ) -> Result<(String, bool), FetchError> {
        if page.body.trim().is_empty() {
            return Err(FetchError::EmptyPayload(url.to_string()));
        }

        if !use_readability || page.format == PayloadFormat::Text {
            return Ok((page.body, false));
        }

        match self.extractor.extract(&page.body) {
            Ok(text) if !text.trim().is_empty() => Ok((text, false)),
            Ok(_) => Err(FetchError::NoContent(url.to_string())),
            Err(e) => {
                warn!(
                    "[crawl] {} extraction failed for {}: {}, returning raw text",
                    self.extractor.name(),
                    url,
                    e
                );
                Ok((page.body, true))
            }
        }
    }

    fn cache_key(url: &str, use_readability: bool) -> String {
        let mode = if use_readability { "readability" } else { "raw" };
        fingerprint(&["crawl", url, mode])
    }

    fn validate_url(&self, url: &str) -> Result<(), CrawlError> {
        let invalid = |reason: &str| CrawlError::InvalidUrl {
            url: url.to_string(),
            reason: reason.to_string(),
        };

        if url.trim().is_empty() {
            return Err(invalid("empty URL"));
        }
        let parsed = Url::parse(url).map_err(|e| invalid(&e.to_string()))?;
        if !["http", "https"].contains(&parsed.scheme()) {
            return Err(invalid("only http and https are supported"));
        }
        let host = parsed.host().ok_or_else(|| invalid("missing host"))?;

        if !self.config.allow_private_hosts && is_private_host(&host) {
            return Err(CrawlError::UnsafeUrl(url.to_string()));
        }
        Ok(())
    }
}

/// Loopback, private, link-local and unspecified hosts
pub fn is_private_host(host: &Host<&str>) -> bool {
    match host {
        Host::Domain(domain) => {
            let domain = domain.to_lowercase();
            domain == "localhost" || domain.ends_with(".localhost")
        }
        Host::Ipv4(ip) => is_private_ipv4(ip),
        Host::Ipv6(ip) => {
            if let Some(mapped) = ip.to_ipv4_mapped() {
                return is_private_ipv4(&mapped);
            }
            let first = ip.segments()[0];
            ip.is_loopback()
                || ip.is_unspecified()
                || (first & 0xfe00) == 0xfc00
                || (first & 0xffc0) == 0xfe80
        }
    }
}

fn is_private_ipv4(ip: &Ipv4Addr) -> bool {
    ip.is_loopback()
        || ip.is_private()
        || ip.is_link_local()
        || ip.is_unspecified()
        || ip.is_broadcast()
}
