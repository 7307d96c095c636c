// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Level 2 backend: remote extraction service (Jina Reader)
//!
//! The service fetches the page on its own infrastructure and returns
//! markdown, so its payload skips local body extraction.

use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::backend::FetchBackend;
use super::types::{FetchError, PayloadFormat, RawPage};

pub const DEFAULT_READER_URL: &str = "https://r.jina.ai";
pub const READER_API_KEY_ENV: &str = "JINA_API_KEY";

/// Jina Reader client
pub struct ReaderFetcher {
    client: Client,
    base_url: String,
    api_key: Option<String>,
    timeout: Duration,
}

impl ReaderFetcher {
    /// Create a reader client against the public endpoint
    pub fn new(api_key: Option<String>, timeout: Duration) -> Result<Self, FetchError> {
        Self::with_base_url(DEFAULT_READER_URL, api_key, timeout)
    }

    /// Create a reader client against a custom endpoint
    pub fn with_base_url(
        base_url: &str,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| FetchError::Transport(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            timeout,
        })
    }

    /// Create a reader client with the key read from `JINA_API_KEY`
    pub fn from_env(timeout: Duration) -> Result<Self, FetchError> {
        Self::new(std::env::var(READER_API_KEY_ENV).ok(), timeout)
    }

    fn target_url(&self, url: &str) -> String {
        format!("{}/{}", self.base_url, url)
    }
}

#[async_trait]
impl FetchBackend for ReaderFetcher {
    async fn fetch(&self, url: &str, cancel: &CancellationToken) -> Result<RawPage, FetchError> {
        let api_key = self
            .api_key
            .as_ref()
            .ok_or_else(|| FetchError::MissingCredential {
                backend: self.name().to_string(),
                env_var: READER_API_KEY_ENV.to_string(),
            })?;

        let timeout_ms = self.timeout.as_millis() as u64;
        let target = self.target_url(url);
        debug!("Reader fetch: {}", target);

        let request = async {
            let response = self
                .client
                .get(&target)
                .header("Authorization", format!("Bearer {}", api_key))
                .header("Accept", "text/plain")
                .send()
                .await
                .map_err(|e| FetchError::from_reqwest(&e, url, timeout_ms))?;

            let status = response.status().as_u16();
            match status {
                401 | 403 => {
                    return Err(FetchError::Unauthorized {
                        backend: self.name().to_string(),
                    })
                }
                429 => {
                    let retry_after_secs = response
                        .headers()
                        .get(reqwest::header::RETRY_AFTER)
                        .and_then(|v| v.to_str().ok())
                        .and_then(|s| s.trim().parse().ok());
                    return Err(FetchError::RateLimited {
                        backend: self.name().to_string(),
                        retry_after_secs,
                    });
                }
                s if !(200..300).contains(&s) => {
                    return Err(FetchError::HttpStatus {
                        status: s,
                        url: url.to_string(),
                    })
                }
                _ => {}
            }

            let body = response
                .text()
                .await
                .map_err(|e| FetchError::from_reqwest(&e, url, timeout_ms))?;

            Ok(RawPage {
                url: url.to_string(),
                status,
                content_type: Some("text/markdown".to_string()),
                format: PayloadFormat::Text,
                body,
            })
        };

        let page = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(FetchError::Cancelled(url.to_string())),
            page = request => page?,
        };

        if page.body.trim().is_empty() {
            return Err(FetchError::EmptyPayload(url.to_string()));
        }

        Ok(page)
    }

    fn name(&self) -> &'static str {
        "jina"
    }
}
