// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Page crawling with a degrade-on-failure backend chain
//!
//! Levels, cheapest first:
//! - L0 `http`: plain request, no JavaScript
//! - L1 `browser`: headless Chromium (requires the `browser` feature)
//! - L2 `jina`: remote reader service (requires `JINA_API_KEY`)

pub mod backend;
pub mod browser;
pub mod config;
pub mod engine;
pub mod extractor;
pub mod http;
pub mod quality;
pub mod reader;
pub mod types;

pub use backend::FetchBackend;
pub use browser::BrowserFetcher;
pub use config::CrawlConfig;
pub use engine::CrawlEngine;
pub use extractor::{
    enhance_heading_structure, BodyExtractor, ExtractError, ReadabilityExtractor,
    TagStripExtractor,
};
pub use http::HttpFetcher;
pub use reader::ReaderFetcher;
pub use types::{
    AttemptFailure, CachedCrawl, CrawlError, CrawlOutcome, CrawlResult, FailureKind, FetchError,
    FetchLevel, PayloadFormat, RawPage,
};
