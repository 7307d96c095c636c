// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Search provider trait definition

use async_trait::async_trait;
use reqwest::header::HeaderMap;
use reqwest::Client;
use std::time::Duration;

use super::types::{SearchError, SearchResult};

/// Desktop browser user agent for HTML result pages
pub(crate) const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
     AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Trait for implementing search providers
///
/// Search providers implement this trait to provide web search functionality.
/// Multiple providers can be configured with automatic failover.
#[async_trait]
pub trait SearchProvider: Send + Sync {
    /// Perform a web search
    ///
    /// # Arguments
    /// * `query` - The search query string
    /// * `num_results` - Number of results wanted. Paged providers may
    ///   return up to a page more; the service filters and trims.
    ///
    /// # Returns
    /// A vector of search results or an error
    async fn search(
        &self,
        query: &str,
        num_results: usize,
    ) -> Result<Vec<SearchResult>, SearchError>;

    /// Get the provider name for logging
    fn name(&self) -> &'static str;

    /// Check if the provider is available (has API key, etc.)
    fn is_available(&self) -> bool;

    /// Get provider priority (lower = preferred)
    ///
    /// Default priority is 100. Providers with lower priority
    /// are tried first during failover.
    fn priority(&self) -> u8 {
        100
    }
}

/// Build an HTTP client for a provider
pub(crate) fn build_client(
    timeout: Duration,
    headers: HeaderMap,
    follow_redirects: bool,
) -> Result<Client, SearchError> {
    let redirect = if follow_redirects {
        reqwest::redirect::Policy::limited(5)
    } else {
        reqwest::redirect::Policy::none()
    };

    Client::builder()
        .timeout(timeout)
        .user_agent(BROWSER_USER_AGENT)
        .default_headers(headers)
        .redirect(redirect)
        .build()
        .map_err(|e| SearchError::ApiError {
            status: 0,
            message: format!("Failed to create HTTP client: {}", e),
        })
}

/// Map a transport error into a search error
pub(crate) fn request_error(err: reqwest::Error, timeout_ms: u64) -> SearchError {
    if err.is_timeout() {
        SearchError::Timeout { timeout_ms }
    } else {
        SearchError::ApiError {
            status: 0,
            message: err.to_string(),
        }
    }
}
