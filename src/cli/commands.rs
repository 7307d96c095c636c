// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use anyhow::{anyhow, Context, Result};
use clap::{Args, ValueEnum};
use std::io::Read;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

use crate::compress::{CompressConfig, ContextCompressor, Splitter};
use crate::content::{fetch_content, ContentMode, ViewOptions};
use crate::crawl::{
    BodyExtractor, CrawlConfig, CrawlEngine, ReadabilityExtractor, TagStripExtractor,
};
use crate::search::{SearchConfig, SearchService};

/// Body extraction strategy for HTML pages
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ExtractorKind {
    /// Content-density main text extraction
    Readability,
    /// Drop all markup, keep every text node
    Strip,
}

impl ExtractorKind {
    fn build(self) -> Arc<dyn BodyExtractor> {
        match self {
            Self::Readability => Arc::new(ReadabilityExtractor::default()),
            Self::Strip => Arc::new(TagStripExtractor),
        }
    }
}

/// Arguments for the search command
#[derive(Args, Debug)]
pub struct SearchArgs {
    /// Search query
    pub query: String,

    /// Number of results (defaults to SEARCH_NUM_RESULTS or 10)
    #[arg(long, short = 'n')]
    pub num_results: Option<usize>,

    /// Provider to try first (brave, baidu, duckduckgo)
    #[arg(long, env = "SEARCH_PROVIDER")]
    pub provider: Option<String>,

    /// Crawl each result and attach query-compressed page text
    #[arg(long)]
    pub with_content: bool,
}

/// Arguments for the crawl command
#[derive(Args, Debug)]
pub struct CrawlArgs {
    /// Page URL
    pub url: String,

    /// Highest fallback level to try (0 = http, 1 = browser, 2 = reader)
    #[arg(long)]
    pub level: Option<u8>,

    /// Return the fetched payload without body extraction
    #[arg(long)]
    pub raw: bool,

    #[arg(long, value_enum, default_value_t = ExtractorKind::Readability)]
    pub extractor: ExtractorKind,

    /// Truncate the text to this many chars
    #[arg(long)]
    pub max_chars: Option<usize>,
}

/// Arguments for the compress command
#[derive(Args, Debug)]
pub struct CompressArgs {
    /// Query to rank passages against
    #[arg(long)]
    pub query: String,

    /// Input file (reads stdin when omitted)
    #[arg(long)]
    pub file: Option<PathBuf>,

    /// Output budget in chars
    #[arg(long, default_value_t = 2000)]
    pub max_chars: usize,

    /// Segmentation strategy (simple, fine-grained)
    #[arg(long, default_value = "simple")]
    pub splitter: Splitter,
}

/// Arguments for the fetch command
#[derive(Args, Debug)]
pub struct FetchArgs {
    /// Page URL
    pub url: String,

    #[arg(long, value_enum, default_value_t = ContentMode::Full)]
    pub mode: ContentMode,

    /// Maximum chars returned
    #[arg(short = 'n', long = "max-chars", default_value_t = 1000)]
    pub max_chars: usize,

    /// Keyword for grep mode
    #[arg(long, default_value = "")]
    pub keyword: String,

    /// Query for compress mode
    #[arg(long, default_value = "")]
    pub query: String,

    /// Highest fallback level to try
    #[arg(long, default_value_t = 2)]
    pub level: u8,

    #[arg(long, default_value = "simple")]
    pub splitter: Splitter,
}

fn crawl_config(level: Option<u8>, max_chars: Option<usize>) -> Result<CrawlConfig> {
    let mut config = CrawlConfig::from_env();
    if let Some(level) = level {
        config = config.with_max_level(level);
    }
    if let Some(max_chars) = max_chars {
        config = config.with_max_chars(max_chars);
    }
    config.validate().map_err(|e| anyhow!(e))?;
    Ok(config)
}

pub async fn search(args: SearchArgs) -> Result<()> {
    let mut config = SearchConfig::from_env();
    if let Some(provider) = args.provider {
        config.providers.preferred_provider = provider.to_lowercase();
    }

    let service = SearchService::new(config)?;
    info!("Providers: {:?}", service.available_providers());

    let output = if args.with_content {
        let response = service
            .search_with_content(&args.query, args.num_results)
            .await?;
        serde_json::to_string_pretty(&response)?
    } else {
        let response = service.search(&args.query, args.num_results).await?;
        serde_json::to_string_pretty(&response)?
    };

    println!("{}", output);
    Ok(())
}

pub async fn crawl(args: CrawlArgs) -> Result<()> {
    let config = crawl_config(args.level, args.max_chars)?;
    let engine = CrawlEngine::new(config)?.with_extractor(args.extractor.build());

    let result = engine
        .crawl(&args.url, engine.config().max_level.0, !args.raw)
        .await?;

    for failure in result.failures() {
        eprintln!(
            "{} {} failed after {}ms: {}",
            failure.level, failure.backend, failure.elapsed_ms, failure.error
        );
    }

    if !result.is_success() {
        if result.fetched_but_empty() {
            return Err(anyhow!("page fetched but no readable text found: {}", args.url));
        }
        return Err(anyhow!("could not fetch {}", args.url));
    }

    eprintln!(
        "{:?} via {} ({} chars{})",
        result.outcome(),
        result.backend().unwrap_or("cache"),
        result.text().chars().count(),
        if result.from_cache() { ", cached" } else { "" }
    );
    println!("{}", result.text());
    Ok(())
}

pub async fn compress(args: CompressArgs) -> Result<()> {
    let text = match &args.file {
        Some(path) => tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("reading {}", path.display()))?,
        None => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("reading stdin")?;
            buf
        }
    };

    let config = CompressConfig::from_env()
        .with_max_chars(args.max_chars)
        .with_splitter(args.splitter);
    let compressed = ContextCompressor::new(config).compress_detailed(&args.query, &text)?;

    eprintln!(
        "{:?}: {} -> {} chars, {} segments",
        compressed.strategy,
        text.chars().count(),
        compressed.text.chars().count(),
        compressed.segments.len()
    );
    println!("{}", compressed.text);
    Ok(())
}

pub async fn fetch(args: FetchArgs) -> Result<()> {
    let config = crawl_config(Some(args.level), None)?;
    let engine = CrawlEngine::new(config)?;

    let options = ViewOptions {
        mode: args.mode,
        max_chars: args.max_chars,
        keyword: args.keyword,
        query: args.query,
        splitter: args.splitter,
    };

    // Tool callers always get JSON, including on failure
    let json = match fetch_content(&engine, &args.url, &options).await {
        Ok(view) => serde_json::to_value(&view)?,
        Err(e) => e.to_json(),
    };
    println!("{}", serde_json::to_string(&json)?);
    Ok(())
}
