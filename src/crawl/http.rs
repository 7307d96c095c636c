// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Level 0 backend: plain HTTP request, no JavaScript

use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::backend::FetchBackend;
use super::quality::{is_bad_content, sniff_html};
use super::types::{FetchError, PayloadFormat, RawPage};

/// Desktop browser user agent; many sites serve block pages to bot agents
pub const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Fast request/response fetcher
pub struct HttpFetcher {
    client: Client,
    timeout: Duration,
}

impl HttpFetcher {
    /// Create a fetcher with a per-request timeout
    pub fn new(timeout: Duration) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(BROWSER_USER_AGENT)
            .redirect(reqwest::redirect::Policy::limited(5))
            .build()
            .map_err(|e| FetchError::Transport(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self { client, timeout })
    }

    /// Classify a payload by its declared type, falling back to the body
    fn detect_format(content_type: Option<&str>, body: &str) -> PayloadFormat {
        match content_type {
            Some(ct) if ct.contains("html") || ct.contains("xml") => PayloadFormat::Html,
            Some(ct) if ct.starts_with("text/") && !sniff_html(body) => PayloadFormat::Text,
            _ => PayloadFormat::Html,
        }
    }
}

#[async_trait]
impl FetchBackend for HttpFetcher {
    async fn fetch(&self, url: &str, cancel: &CancellationToken) -> Result<RawPage, FetchError> {
        let timeout_ms = self.timeout.as_millis() as u64;

        let request = async {
            let response = self
                .client
                .get(url)
                .send()
                .await
                .map_err(|e| FetchError::from_reqwest(&e, url, timeout_ms))?;

            let status = response.status();
            let final_url = response.url().to_string();
            let content_type = response
                .headers()
                .get(reqwest::header::CONTENT_TYPE)
                .and_then(|v| v.to_str().ok())
                .map(|s| s.to_lowercase());

            if status.as_u16() == 429 {
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
            if !status.is_success() {
                return Err(FetchError::HttpStatus {
                    status: status.as_u16(),
                    url: url.to_string(),
                });
            }

            let body = response
                .text()
                .await
                .map_err(|e| FetchError::from_reqwest(&e, url, timeout_ms))?;

            Ok(RawPage {
                url: final_url,
                status: status.as_u16(),
                format: Self::detect_format(content_type.as_deref(), &body),
                content_type,
                body,
            })
        };

        // Dropping the request future aborts the connection
        let page = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(FetchError::Cancelled(url.to_string())),
            page = request => page?,
        };

        if page.body.trim().is_empty() {
            return Err(FetchError::EmptyPayload(url.to_string()));
        }
        if is_bad_content(&page.body, page.status) {
            debug!("Bad content from {} ({} bytes)", url, page.body.len());
            return Err(FetchError::BadContent(url.to_string()));
        }

        Ok(page)
    }

    fn name(&self) -> &'static str {
        "http"
    }
}
