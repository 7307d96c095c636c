// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Query-aware context compression
//!
//! Scores the segments of a long text against a query with BM25 and keeps
//! the best ones that fit a character budget, re-emitted in document order.

use regex::Regex;
use serde::Serialize;
use std::env;
use std::ops::Range;
use std::sync::OnceLock;
use thiserror::Error;
use tracing::debug;

use crate::text::{char_len, truncate_chars};

use super::bm25::Bm25;
use super::splitter::Splitter;
use super::tokenizer::tokenize;

/// Compressor configuration errors
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CompressError {
    /// The budget cannot hold any text
    #[error("Character budget must be positive, got {max_chars}")]
    BudgetExceeded { max_chars: usize },
}

/// Configuration for context compression
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompressConfig {
    /// Output budget in chars (default: 2000)
    pub max_chars: usize,
    /// Segmentation strategy (default: simple)
    pub splitter: Splitter,
    /// Input is cut to this many chars before scoring (default: 50000)
    pub max_input_chars: usize,
    /// Segments shorter than this (trimmed) never score (default: 10)
    pub min_segment_chars: usize,
}

impl CompressConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            max_chars: env::var("COMPRESS_MAX_CHARS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.max_chars),
            splitter: env::var("COMPRESS_SPLITTER")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.splitter),
            max_input_chars: env::var("COMPRESS_MAX_INPUT_CHARS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.max_input_chars),
            min_segment_chars: env::var("COMPRESS_MIN_SEGMENT_CHARS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.min_segment_chars),
        }
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), String> {
        if self.max_chars == 0 {
            return Err("max_chars must be at least 1".to_string());
        }
        if self.max_input_chars < self.max_chars {
            return Err("max_input_chars must not be smaller than max_chars".to_string());
        }
        Ok(())
    }

    pub fn with_max_chars(mut self, max_chars: usize) -> Self {
        self.max_chars = max_chars;
        self
    }

    pub fn with_splitter(mut self, splitter: Splitter) -> Self {
        self.splitter = splitter;
        self
    }
}

impl Default for CompressConfig {
    fn default() -> Self {
        Self {
            max_chars: 2000,
            splitter: Splitter::Simple,
            max_input_chars: 50_000,
            min_segment_chars: 10,
        }
    }
}

/// A contiguous span of the source text and its relevance to the query
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredSegment {
    /// Position in document order
    pub index: usize,
    /// Byte range in the (input-capped) source text
    pub range: Range<usize>,
    pub text: String,
    /// BM25 score, never negative
    pub score: f64,
}

/// How the output was produced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CompressStrategy {
    /// Input already fit the budget
    Unchanged,
    /// Best segments selected and re-joined in document order
    Ranked,
    /// Nothing matched the query; leading chars of the input
    LeadingFallback,
    /// The best segment alone exceeded the budget and was cut to fit
    TruncatedTopSegment,
}

/// Compression output with the segments that produced it
#[derive(Debug, Clone, Serialize)]
pub struct CompressedText {
    pub text: String,
    /// Selected segments in document order (empty unless ranked or truncated)
    pub segments: Vec<ScoredSegment>,
    pub strategy: CompressStrategy,
}

fn noise_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(
            r"(?i)大家还在搜|相关搜索|为你推荐|猜你喜欢|关注微信|扫描关注|下载APP|正在加载|点击查看|展开全部|版权所有|备案号|ICP备|related searches|recommended for you|you may also like|download (the )?app|scan to follow|loading\.\.\.|click to view|show more|all rights reserved",
        )
        .expect("noise regex is valid")
    })
}

/// Whether a segment is page chrome rather than content
pub fn is_noise(segment: &str) -> bool {
    noise_pattern().is_match(segment)
}

/// BM25 context compressor
#[derive(Debug, Clone, Default)]
pub struct ContextCompressor {
    config: CompressConfig,
}

impl ContextCompressor {
    pub fn new(config: CompressConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &CompressConfig {
        &self.config
    }

    /// Compress `text` to at most `max_chars` chars of query-relevant content
    pub fn compress(&self, query: &str, text: &str) -> Result<String, CompressError> {
        self.compress_detailed(query, text).map(|c| c.text)
    }

    /// As [`compress`](Self::compress), also returning the selected segments
    pub fn compress_detailed(
        &self,
        query: &str,
        text: &str,
    ) -> Result<CompressedText, CompressError> {
        let max_chars = self.config.max_chars;
        if max_chars == 0 {
            return Err(CompressError::BudgetExceeded { max_chars });
        }

        let text = truncate_chars(text, self.config.max_input_chars.max(max_chars));
        if char_len(text) <= max_chars {
            return Ok(CompressedText {
                text: text.to_string(),
                segments: Vec::new(),
                strategy: CompressStrategy::Unchanged,
            });
        }

        let scored = self.score_segments(query, text);
        let mut ranked: Vec<&ScoredSegment> = scored.iter().filter(|s| s.score > 0.0).collect();

        if ranked.is_empty() {
            debug!("No segment matched the query, using leading text");
            return Ok(CompressedText {
                text: truncate_chars(text, max_chars).to_string(),
                segments: Vec::new(),
                strategy: CompressStrategy::LeadingFallback,
            });
        }

        // Highest score first; equal scores keep document order
        ranked.sort_by(|a, b| b.score.total_cmp(&a.score).then(a.index.cmp(&b.index)));

        let top = ranked[0];
        if char_len(&top.text) > max_chars {
            return Ok(CompressedText {
                text: truncate_chars(&top.text, max_chars).to_string(),
                segments: vec![top.clone()],
                strategy: CompressStrategy::TruncatedTopSegment,
            });
        }

        let mut selected: Vec<ScoredSegment> = Vec::new();
        let mut total = 0;
        for segment in ranked {
            let len = char_len(&segment.text);
            if total + len > max_chars {
                break;
            }
            total += len;
            selected.push(segment.clone());
        }
        selected.sort_by_key(|s| s.index);

        debug!(
            "Compressed {} chars to {} using {} of {} segments",
            char_len(text),
            total,
            selected.len(),
            scored.len()
        );

        Ok(CompressedText {
            text: selected.iter().map(|s| s.text.as_str()).collect(),
            segments: selected,
            strategy: CompressStrategy::Ranked,
        })
    }

    /// Segment `text` and score every segment against `query`
    ///
    /// The returned segments partition `text` in document order. Noise and
    /// fragments shorter than `min_segment_chars` are kept with score zero.
    pub fn score_segments(&self, query: &str, text: &str) -> Vec<ScoredSegment> {
        let ranges = self.config.splitter.split(text);
        let eligible: Vec<bool> = ranges
            .iter()
            .map(|r| {
                let segment = &text[r.clone()];
                char_len(segment.trim()) >= self.config.min_segment_chars && !is_noise(segment)
            })
            .collect();

        let corpus: Vec<Vec<String>> = ranges
            .iter()
            .zip(&eligible)
            .filter(|(_, ok)| **ok)
            .map(|(r, _)| tokenize(&text[r.clone()]))
            .collect();
        let index = Bm25::new(&corpus);
        let query_tokens = tokenize(query);

        let mut doc = 0;
        ranges
            .into_iter()
            .zip(eligible)
            .enumerate()
            .map(|(i, (range, ok))| {
                let score = if ok && !query_tokens.is_empty() {
                    let score = index.score(&query_tokens, doc);
                    doc += 1;
                    score
                } else {
                    if ok {
                        doc += 1;
                    }
                    0.0
                };
                ScoredSegment {
                    index: i,
                    text: text[range.clone()].to_string(),
                    range,
                    score,
                }
            })
            .collect()
    }
}

/// One-shot compression with default input limits
pub fn compress(
    query: &str,
    text: &str,
    max_chars: usize,
    splitter: Splitter,
) -> Result<String, CompressError> {
    let config = CompressConfig {
        max_chars,
        splitter,
        ..CompressConfig::default()
    };
    ContextCompressor::new(config).compress(query, text)
}
