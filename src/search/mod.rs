// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Web search
//!
//! Key features:
//! - Multiple search providers (Brave, Baidu, DuckDuckGo) with failover
//! - Result filtering (duplicates, banned sites, noise) and re-ranking
//! - TTL-based result caching
//! - Rate limiting
//! - Search + crawl + compress pipeline via `search_with_content`

pub mod baidu;
pub mod brave;
pub mod config;
pub mod duckduckgo;
pub mod filter;
pub mod provider;
pub mod rate_limiter;
pub mod service;
pub mod types;

pub use baidu::{BaiduConfig, BaiduSearchProvider, UrlResolveStatus};
pub use brave::BraveSearchProvider;
pub use config::SearchConfig;
pub use duckduckgo::DuckDuckGoProvider;
pub use filter::ContentFilter;
pub use provider::SearchProvider;
pub use service::SearchService;
pub use types::{
    ContentStatus, SearchError, SearchResponse, SearchResponseWithContent, SearchResult,
    SearchResultWithContent,
};
