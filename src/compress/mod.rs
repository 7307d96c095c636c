// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Query-relevance text compression

pub mod bm25;
pub mod compressor;
pub mod splitter;
pub mod tokenizer;

pub use bm25::Bm25;
pub use compressor::{
    compress, is_noise, CompressConfig, CompressError, CompressStrategy, CompressedText,
    ContextCompressor, ScoredSegment,
};
pub use splitter::Splitter;
pub use tokenizer::tokenize;
