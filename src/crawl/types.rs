// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Core types for the crawl engine

use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Position of a fetch backend in the fallback chain
///
/// Lower levels are cheaper and are always tried first. The engine walks
/// levels in strictly ascending order and never returns to a lower one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct FetchLevel(pub u8);

impl FetchLevel {
    /// Plain HTTP request, no JavaScript
    pub const HTTP: FetchLevel = FetchLevel(0);
    /// Rendered in a controlled browser
    pub const BROWSER: FetchLevel = FetchLevel(1);
    /// Delegated to a remote extraction service
    pub const READER: FetchLevel = FetchLevel(2);

    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for FetchLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "L{}", self.0)
    }
}

impl From<u8> for FetchLevel {
    fn from(level: u8) -> Self {
        Self(level)
    }
}

/// Shape of a fetched payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PayloadFormat {
    /// Markup that still needs body extraction
    Html,
    /// Already-extracted text or markdown
    Text,
}

/// Raw content returned by a single successful backend attempt
#[derive(Debug, Clone)]
pub struct RawPage {
    /// Final URL after redirects
    pub url: String,
    /// HTTP status of the response (200 for non-HTTP backends)
    pub status: u16,
    /// Content type from headers, when known
    pub content_type: Option<String>,
    pub format: PayloadFormat,
    pub body: String,
}

/// Uniform failure signal shared by every backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    Timeout,
    Transport,
    Auth,
    RateLimited,
    HttpStatus,
    EmptyPayload,
    BadContent,
    NoContent,
    Cancelled,
    Unavailable,
}

/// Errors from a single backend attempt
///
/// The engine converts every one of these into "try the next level".
#[derive(Debug, Clone, Error)]
pub enum FetchError {
    /// Attempt exceeded its time budget
    #[error("Timeout after {timeout_ms}ms fetching: {url}")]
    Timeout { url: String, timeout_ms: u64 },

    /// Connection, DNS, TLS or body read failure
    #[error("Transport error: {0}")]
    Transport(String),

    /// Non-success HTTP status
    #[error("HTTP {status} for: {url}")]
    HttpStatus { status: u16, url: String },

    /// Response had no body
    #[error("Empty payload from: {0}")]
    EmptyPayload(String),

    /// Body looks like a block page or a script-only shell
    #[error("Blocked or script-only content from: {0}")]
    BadContent(String),

    /// Body extraction produced no text
    #[error("No content extracted from: {0}")]
    NoContent(String),

    /// Backend needs a credential that is not configured
    #[error("Missing credential for {backend}: set {env_var}")]
    MissingCredential { backend: String, env_var: String },

    /// Credential was rejected by the remote service
    #[error("Credential rejected by {backend}")]
    Unauthorized { backend: String },

    /// Remote service refused due to quota or rate limits
    #[error("Rate limited by {backend}")]
    RateLimited {
        backend: String,
        retry_after_secs: Option<u64>,
    },

    /// Attempt aborted by the caller
    #[error("Fetch cancelled: {0}")]
    Cancelled(String),

    /// Backend cannot run in this build or environment
    #[error("Backend unavailable: {0}")]
    Unavailable(String),
}

impl FetchError {
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::Timeout { .. } => FailureKind::Timeout,
            Self::Transport(_) => FailureKind::Transport,
            Self::HttpStatus { .. } => FailureKind::HttpStatus,
            Self::EmptyPayload(_) => FailureKind::EmptyPayload,
            Self::BadContent(_) => FailureKind::BadContent,
            Self::NoContent(_) => FailureKind::NoContent,
            Self::MissingCredential { .. } | Self::Unauthorized { .. } => FailureKind::Auth,
            Self::RateLimited { .. } => FailureKind::RateLimited,
            Self::Cancelled(_) => FailureKind::Cancelled,
            Self::Unavailable(_) => FailureKind::Unavailable,
        }
    }

    /// Map a reqwest error into the uniform taxonomy
    pub(crate) fn from_reqwest(err: &reqwest::Error, url: &str, timeout_ms: u64) -> Self {
        if err.is_timeout() {
            Self::Timeout {
                url: url.to_string(),
                timeout_ms,
            }
        } else {
            Self::Transport(err.to_string())
        }
    }
}

/// Precondition violations for a crawl call
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CrawlError {
    #[error("Invalid URL {url}: {reason}")]
    InvalidUrl { url: String, reason: String },

    /// Loopback, private or link-local host while private hosts are disallowed
    #[error("Unsafe URL blocked: {0}")]
    UnsafeUrl(String),
}

/// Overall result of a crawl call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CrawlOutcome {
    /// First level (or the cache) produced clean text
    Success,
    /// Text was obtained, but only after falling back a level or skipping extraction
    Degraded,
    /// Every attempted level failed; text is empty
    Exhausted,
}

/// One failed backend attempt
#[derive(Debug, Clone)]
pub struct AttemptFailure {
    pub level: FetchLevel,
    pub backend: &'static str,
    pub error: FetchError,
    pub elapsed_ms: u64,
}

/// Successful crawl as stored in the crawl cache
///
/// Carries the provenance of the text so a cache hit reports the same level
/// and outcome as the fetch that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedCrawl {
    pub text: String,
    pub level: FetchLevel,
    pub backend: &'static str,
    pub degraded: bool,
}

/// Outcome of a crawl call
///
/// Built once by the engine and read-only afterwards. An `Exhausted` result
/// always carries empty text, which callers must read as "could not fetch".
#[derive(Debug, Clone)]
pub struct CrawlResult {
    url: String,
    level: Option<FetchLevel>,
    backend: Option<&'static str>,
    text: String,
    outcome: CrawlOutcome,
    failures: Vec<AttemptFailure>,
    from_cache: bool,
}

impl CrawlResult {
    pub(crate) fn fetched(
        url: &str,
        level: FetchLevel,
        backend: &'static str,
        text: String,
        degraded: bool,
        failures: Vec<AttemptFailure>,
    ) -> Self {
        let outcome = if degraded || level > FetchLevel::HTTP || !failures.is_empty() {
            CrawlOutcome::Degraded
        } else {
            CrawlOutcome::Success
        };
        Self {
            url: url.to_string(),
            level: Some(level),
            backend: Some(backend),
            text,
            outcome,
            failures,
            from_cache: false,
        }
    }

    pub(crate) fn cached(url: &str, entry: CachedCrawl) -> Self {
        let outcome = if entry.degraded {
            CrawlOutcome::Degraded
        } else {
            CrawlOutcome::Success
        };
        Self {
            url: url.to_string(),
            level: Some(entry.level),
            backend: Some(entry.backend),
            text: entry.text,
            outcome,
            failures: Vec::new(),
            from_cache: true,
        }
    }

    /// Cache entry for a result that produced text
    pub(crate) fn to_cached(&self) -> Option<CachedCrawl> {
        match (self.outcome, self.level, self.backend) {
            (CrawlOutcome::Exhausted, _, _) => None,
            (outcome, Some(level), Some(backend)) => Some(CachedCrawl {
                text: self.text.clone(),
                level,
                backend,
                degraded: outcome == CrawlOutcome::Degraded,
            }),
            _ => None,
        }
    }

    pub(crate) fn exhausted(url: &str, failures: Vec<AttemptFailure>) -> Self {
        Self {
            url: url.to_string(),
            level: None,
            backend: None,
            text: String::new(),
            outcome: CrawlOutcome::Exhausted,
            failures,
            from_cache: false,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Level of the backend that produced the text, if any
    pub fn level(&self) -> Option<FetchLevel> {
        self.level
    }

    pub fn backend(&self) -> Option<&'static str> {
        self.backend
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn into_text(self) -> String {
        self.text
    }

    pub fn outcome(&self) -> CrawlOutcome {
        self.outcome
    }

    /// Failed attempts in the order they were made
    pub fn failures(&self) -> &[AttemptFailure] {
        &self.failures
    }

    pub fn from_cache(&self) -> bool {
        self.from_cache
    }

    pub fn is_success(&self) -> bool {
        self.outcome != CrawlOutcome::Exhausted
    }

    /// All levels failed, but at least one reached the page and found no text
    pub fn fetched_but_empty(&self) -> bool {
        self.outcome == CrawlOutcome::Exhausted
            && self
                .failures
                .iter()
                .any(|f| f.error.kind() == FailureKind::NoContent)
    }

    pub fn was_cancelled(&self) -> bool {
        self.failures
            .iter()
            .any(|f| f.error.kind() == FailureKind::Cancelled)
    }
}
