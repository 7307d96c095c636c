// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Level 1 backend: render the page in a headless browser
//!
//! Requires the `browser` feature. Without it the backend reports itself as
//! unavailable and the engine records the level as failed without calling it.

use async_trait::async_trait;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use super::backend::FetchBackend;
use super::types::{FetchError, RawPage};

/// Time to let client-side scripts populate the page after navigation
const SETTLE_DELAY: Duration = Duration::from_millis(1500);

/// Headless Chromium fetcher
pub struct BrowserFetcher {
    settle_delay: Duration,
}

impl BrowserFetcher {
    pub fn new() -> Self {
        Self {
            settle_delay: SETTLE_DELAY,
        }
    }

    /// Override how long to wait for dynamic content after navigation
    pub fn with_settle_delay(mut self, delay: Duration) -> Self {
        self.settle_delay = delay;
        self
    }
}

impl Default for BrowserFetcher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl FetchBackend for BrowserFetcher {
    async fn fetch(&self, url: &str, cancel: &CancellationToken) -> Result<RawPage, FetchError> {
        #[cfg(feature = "browser")]
        {
            headless::render(url, self.settle_delay, cancel).await
        }

        #[cfg(not(feature = "browser"))]
        {
            let _ = (cancel, self.settle_delay);
            Err(FetchError::Unavailable(format!(
                "{} backend requires the `browser` feature ({})",
                self.name(),
                url
            )))
        }
    }

    fn name(&self) -> &'static str {
        "browser"
    }

    fn is_available(&self) -> bool {
        cfg!(feature = "browser")
    }
}

#[cfg(feature = "browser")]
mod headless {
    use chromiumoxide::browser::{Browser, BrowserConfig};
    use futures::StreamExt;
    use std::time::Duration;
    use tokio_util::sync::CancellationToken;
    use tracing::{debug, warn};

    use super::super::http::BROWSER_USER_AGENT;
    use super::super::quality::is_bad_content;
    use super::super::types::{FetchError, PayloadFormat, RawPage};

    pub(super) async fn render(
        url: &str,
        settle_delay: Duration,
        cancel: &CancellationToken,
    ) -> Result<RawPage, FetchError> {
        let user_agent = format!("--user-agent={}", BROWSER_USER_AGENT);
        let config = BrowserConfig::builder()
            .args([
                "--disable-blink-features=AutomationControlled",
                "--disable-dev-shm-usage",
                "--disable-gpu",
                "--no-sandbox",
                "--no-first-run",
                user_agent.as_str(),
            ])
            .build()
            .map_err(|e| FetchError::Unavailable(format!("browser config: {}", e)))?;

        let (mut browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| FetchError::Unavailable(format!("browser launch: {}", e)))?;

        let handle = tokio::spawn(async move { while handler.next().await.is_some() {} });
        debug!("Browser launched for {}", url);

        let navigation = async {
            let page = browser
                .new_page(url)
                .await
                .map_err(|e| FetchError::Transport(format!("browser navigation: {}", e)))?;
            page.wait_for_navigation()
                .await
                .map_err(|e| FetchError::Transport(format!("browser navigation: {}", e)))?;

            tokio::time::sleep(settle_delay).await;
            page.evaluate("window.scrollTo(0, document.body.scrollHeight)")
                .await
                .ok();
            tokio::time::sleep(settle_delay / 2).await;

            let html = page
                .content()
                .await
                .map_err(|e| FetchError::Transport(format!("browser content: {}", e)))?;
            page.close().await.ok();
            Ok::<String, FetchError>(html)
        };

        let outcome = tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(FetchError::Cancelled(url.to_string())),
            html = navigation => html,
        };

        // The browser process is torn down on every path, including cancellation
        if let Err(e) = browser.close().await {
            warn!("Browser close failed: {}", e);
        }
        browser.wait().await.ok();
        handle.abort();

        let html = outcome?;
        if html.trim().is_empty() {
            return Err(FetchError::EmptyPayload(url.to_string()));
        }
        if is_bad_content(&html, 200) {
            return Err(FetchError::BadContent(url.to_string()));
        }

        Ok(RawPage {
            url: url.to_string(),
            status: 200,
            content_type: Some("text/html".to_string()),
            format: PayloadFormat::Html,
            body: html,
        })
    }
}
