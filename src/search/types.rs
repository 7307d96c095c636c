// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Core types for web search functionality

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A single search result from a web search provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResult {
    /// Title of the search result
    pub title: String,
    /// URL of the search result
    pub url: String,
    /// Snippet/description of the search result
    pub snippet: String,
    /// 1-based position after filtering
    #[serde(default)]
    pub rank: usize,
    /// Published date if available
    #[serde(skip_serializing_if = "Option::is_none")]
    pub published_date: Option<String>,
    /// Source provider (e.g., "brave", "baidu", "duckduckgo")
    pub source: String,
}

/// Response from a search operation
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResponse {
    /// The original search query
    pub query: String,
    /// List of search results
    pub results: Vec<SearchResult>,
    /// Time taken for the search in milliseconds
    pub search_time_ms: u64,
    /// Provider that returned the results
    pub provider: String,
    /// Whether the result was from cache
    pub cached: bool,
    /// Number of results returned
    pub result_count: usize,
}

/// Errors that can occur during search operations
#[derive(Debug, Error)]
pub enum SearchError {
    /// Rate limited by the search provider (or challenged with a captcha)
    #[error("Rate limited, retry after {retry_after_secs}s")]
    RateLimited {
        /// Seconds to wait before retrying
        retry_after_secs: u64,
    },

    /// API error from the search provider
    #[error("Search API error: {status} - {message}")]
    ApiError {
        /// HTTP status code
        status: u16,
        /// Error message
        message: String,
    },

    /// Search request timed out
    #[error("Search timeout after {timeout_ms}ms")]
    Timeout {
        /// Timeout duration in milliseconds
        timeout_ms: u64,
    },

    /// Search provider is unavailable
    #[error("Provider unavailable: {provider}")]
    ProviderUnavailable {
        /// Name of the unavailable provider
        provider: String,
    },

    /// No API key configured for the provider
    #[error("No API key configured for {provider}")]
    NoApiKey {
        /// Name of the provider missing API key
        provider: String,
    },

    /// Result page could not be parsed into results
    #[error("Failed to parse {provider} results: {reason}")]
    ParseError {
        /// Name of the provider
        provider: String,
        /// What went wrong
        reason: String,
    },

    /// Invalid search query
    #[error("Invalid query: {reason}")]
    InvalidQuery {
        /// Reason the query is invalid
        reason: String,
    },

    /// Search is disabled on this host
    #[error("Search disabled on this host")]
    SearchDisabled,

    /// Search configuration was rejected
    #[error("Invalid search configuration: {0}")]
    InvalidConfig(String),
}

/// What happened when a result's page was crawled and compressed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentStatus {
    /// Page fetched and compressed against the query
    Compressed,
    /// Page fetched; text fit the budget unchanged or was cut to the leading chars
    Fetched,
    /// Page reached, but no readable text was found
    Empty,
    /// Every fetch level failed, or the URL was rejected
    NotFetched,
}

/// A search result with the query-relevant text of its page
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResultWithContent {
    #[serde(flatten)]
    pub result: SearchResult,
    /// Page content after compression (None unless fetched)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    pub status: ContentStatus,
    /// Fallback level that produced the page, if fetched over the network
    #[serde(skip_serializing_if = "Option::is_none")]
    pub crawl_level: Option<u8>,
}

/// Response from a search operation with content fetching
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResponseWithContent {
    /// The original search query
    pub query: String,
    /// List of search results with content
    pub results: Vec<SearchResultWithContent>,
    /// Time taken for the search in milliseconds
    pub search_time_ms: u64,
    /// Time taken for crawling and compression in milliseconds
    pub content_fetch_time_ms: u64,
    /// Provider that returned the results
    pub provider: String,
    /// Whether the search result was from cache
    pub cached: bool,
    /// Number of results returned
    pub result_count: usize,
    /// Number of results with content
    pub content_fetched_count: usize,
}
