// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Brave Search API provider

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT};
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

use super::provider::{build_client, request_error, SearchProvider};
use super::types::{SearchError, SearchResult};

const BRAVE_API_URL: &str = "https://api.search.brave.com/res/v1/web/search";
const BRAVE_MAX_COUNT: usize = 20;
const BRAVE_TIMEOUT_MS: u64 = 10_000;

/// Brave Search API provider
pub struct BraveSearchProvider {
    api_key: String,
    endpoint: String,
    client: Client,
}

impl BraveSearchProvider {
    /// Create a new Brave Search provider
    pub fn new(api_key: String) -> Result<Self, SearchError> {
        Self::with_endpoint(api_key, BRAVE_API_URL)
    }

    /// Create a provider that talks to a different endpoint
    pub fn with_endpoint(api_key: String, endpoint: impl Into<String>) -> Result<Self, SearchError> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        let client = build_client(Duration::from_millis(BRAVE_TIMEOUT_MS), headers, true)?;

        Ok(Self {
            api_key,
            endpoint: endpoint.into(),
            client,
        })
    }
}

#[async_trait]
impl SearchProvider for BraveSearchProvider {
    async fn search(
        &self,
        query: &str,
        num_results: usize,
    ) -> Result<Vec<SearchResult>, SearchError> {
        let count = num_results.clamp(1, BRAVE_MAX_COUNT).to_string();
        let response = self
            .client
            .get(&self.endpoint)
            .header("X-Subscription-Token", &self.api_key)
            .query(&[("q", query), ("count", count.as_str())])
            .send()
            .await
            .map_err(|e| request_error(e, BRAVE_TIMEOUT_MS))?;

        let status = response.status();

        if status == 429 {
            let retry_after_secs = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.trim().parse().ok())
                .unwrap_or(60);
            return Err(SearchError::RateLimited { retry_after_secs });
        }

        if status == 401 || status == 403 {
            return Err(SearchError::NoApiKey {
                provider: "brave".to_string(),
            });
        }

        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(SearchError::ApiError {
                status: status.as_u16(),
                message,
            });
        }

        let data: BraveResponse = response.json().await.map_err(|e| SearchError::ParseError {
            provider: "brave".to_string(),
            reason: e.to_string(),
        })?;

        Ok(data
            .web
            .map(|web| web.results)
            .unwrap_or_default()
            .into_iter()
            .take(num_results)
            .enumerate()
            .map(|(i, r)| SearchResult {
                title: r.title,
                url: r.url,
                snippet: r.description,
                rank: i + 1,
                published_date: r.age,
                source: "brave".to_string(),
            })
            .collect())
    }

    fn name(&self) -> &'static str {
        "brave"
    }

    fn is_available(&self) -> bool {
        !self.api_key.is_empty()
    }

    fn priority(&self) -> u8 {
        10
    }
}

#[derive(Debug, Deserialize)]
struct BraveResponse {
    web: Option<BraveWebResults>,
}

#[derive(Debug, Deserialize)]
struct BraveWebResults {
    #[serde(default)]
    results: Vec<BraveResult>,
}

#[derive(Debug, Deserialize)]
struct BraveResult {
    title: String,
    url: String,
    #[serde(default)]
    description: String,
    age: Option<String>,
}
