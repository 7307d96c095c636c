// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Fetch backend trait

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use super::types::{FetchError, RawPage};

/// A single strategy for retrieving raw content for a URL
///
/// Backends are stored in an ordered list by the crawl engine; their
/// position in that list is their fallback level. Implementations must stop
/// work and release resources promptly once `cancel` fires. The engine fires
/// it when the caller cancels or the attempt times out, then keeps polling
/// the call for a short grace period so teardown can complete.
#[async_trait]
pub trait FetchBackend: Send + Sync {
    /// Fetch a URL, reporting failures through the uniform [`FetchError`]
    async fn fetch(&self, url: &str, cancel: &CancellationToken) -> Result<RawPage, FetchError>;

    /// Get backend name (e.g., "http", "browser", "jina")
    fn name(&self) -> &'static str;

    /// Check if the backend can run in this build and environment
    ///
    /// Unavailable backends keep their level but are skipped with an
    /// `Unavailable` failure instead of being called.
    fn is_available(&self) -> bool {
        true
    }
}
