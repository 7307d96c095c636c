// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
pub mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};

/// Fabstir web search CLI
#[derive(Parser, Debug)]
#[command(name = "fabstir-search")]
#[command(version)]
#[command(about = "Search the web, crawl pages and compress them against a query", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Search the web and print ranked results
    Search(commands::SearchArgs),

    /// Crawl a page through the fallback chain and print its text
    Crawl(commands::CrawlArgs),

    /// Compress text from a file or stdin against a query
    Compress(commands::CompressArgs),

    /// Crawl a page and print a JSON view of its text
    Fetch(commands::FetchArgs),
}

/// Execute CLI command
pub async fn execute(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Search(args) => commands::search(args).await,
        Commands::Crawl(args) => commands::crawl(args).await,
        Commands::Compress(args) => commands::compress(args).await,
        Commands::Fetch(args) => commands::fetch(args).await,
    }
}
