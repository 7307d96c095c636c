// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Async web search with a fetch-fallback crawler and a query-relevance
//! context compressor.
//!
//! A search returns ranked results; each result URL can be crawled through
//! an ordered chain of fetch backends (plain HTTP, headless browser, remote
//! reader) that degrades to the next level on failure. Extracted page text
//! is then compressed to the passages most relevant to the query.

pub mod cache;
pub mod cli;
pub mod compress;
pub mod content;
pub mod crawl;
pub mod search;
pub mod text;

pub use cache::{fingerprint, CachePolicy, ResponseCache};
pub use compress::{compress, CompressConfig, ContextCompressor, Splitter};
pub use content::{fetch_content, ContentMode, ContentView, ViewOptions};
pub use crawl::{CrawlConfig, CrawlEngine, CrawlOutcome, CrawlResult, FetchBackend, FetchLevel};
pub use search::{SearchConfig, SearchResult, SearchService};
