// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Views over crawled page text
//!
//! Backs the `fetch` command: crawl a URL, then return the whole text, its
//! head or tail, the paragraphs containing a keyword, or a query-aware
//! compression, each capped at a char budget.

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::compress::{CompressConfig, ContextCompressor, Splitter};
use crate::crawl::CrawlEngine;
use crate::text::{char_len, tail_chars, truncate_chars};

/// How to cut the page text down
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ContentMode {
    /// Whole text, truncated to the budget
    #[default]
    Full,
    /// First `max_chars` chars
    Head,
    /// Last `max_chars` chars
    Tail,
    /// Lines containing the keyword
    Grep,
    /// Passages most relevant to the query
    Compress,
}

/// Parameters for a content view
#[derive(Debug, Clone)]
pub struct ViewOptions {
    pub mode: ContentMode,
    pub max_chars: usize,
    /// Used by `grep`
    pub keyword: String,
    /// Used by `compress`
    pub query: String,
    pub splitter: Splitter,
}

impl Default for ViewOptions {
    fn default() -> Self {
        Self {
            mode: ContentMode::Full,
            max_chars: 1000,
            keyword: String::new(),
            query: String::new(),
            splitter: Splitter::Simple,
        }
    }
}

/// A view's text with the lengths before and after cutting (in chars)
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContentView {
    pub text: String,
    pub orig_len: usize,
    pub ret_len: usize,
}

#[derive(Debug, Error)]
pub enum ContentError {
    #[error("crawl_failed: {0}")]
    Crawl(String),

    #[error("empty_page")]
    EmptyPage,

    #[error("process_failed: {0}")]
    Process(String),
}

impl ContentError {
    /// `{"error": "..."}` payload for tool callers
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({ "error": self.to_string() })
    }
}

/// Cut already-fetched text according to `options`
pub fn render_view(text: &str, options: &ViewOptions) -> Result<ContentView, ContentError> {
    if text.trim().is_empty() {
        return Err(ContentError::EmptyPage);
    }

    let n = options.max_chars;
    let out = match options.mode {
        ContentMode::Full | ContentMode::Head => truncate_chars(text, n).to_string(),
        ContentMode::Tail => tail_chars(text, n).to_string(),
        ContentMode::Grep => {
            let hits: Vec<&str> = text
                .split('\n')
                .filter(|line| line.contains(options.keyword.as_str()))
                .collect();
            truncate_chars(&hits.join("\n"), n).to_string()
        }
        ContentMode::Compress => {
            let config = CompressConfig::default()
                .with_max_chars(n)
                .with_splitter(options.splitter);
            ContextCompressor::new(config)
                .compress(&options.query, text)
                .map_err(|e| ContentError::Process(e.to_string()))?
        }
    };

    Ok(ContentView {
        orig_len: char_len(text),
        ret_len: char_len(&out),
        text: out,
    })
}

/// Crawl `url` with the engine's defaults and render a view of its text
pub async fn fetch_content(
    engine: &CrawlEngine,
    url: &str,
    options: &ViewOptions,
) -> Result<ContentView, ContentError> {
    let result = engine
        .crawl_default(url)
        .await
        .map_err(|e| ContentError::Crawl(e.to_string()))?;

    if result.fetched_but_empty() {
        return Err(ContentError::EmptyPage);
    }
    if !result.is_success() {
        let attempted: Vec<String> = result
            .failures()
            .iter()
            .map(|f| format!("{} {}: {}", f.level, f.backend, f.error))
            .collect();
        return Err(ContentError::Crawl(if attempted.is_empty() {
            "no fetch backend attempted".to_string()
        } else {
            attempted.join("; ")
        }));
    }

    render_view(result.text(), options)
}
