// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Rate limiting for search requests

use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter as GovRateLimiter};
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use super::types::SearchError;

/// Rate limiter for search requests
pub struct SearchRateLimiter {
    limiter: Arc<GovRateLimiter<NotKeyed, InMemoryState, DefaultClock>>,
    retry_after_secs: u64,
}

impl SearchRateLimiter {
    /// Create a new rate limiter
    ///
    /// # Arguments
    /// * `requests_per_minute` - Maximum requests allowed per minute (0 means 60)
    pub fn new(requests_per_minute: u32) -> Self {
        let rpm = NonZeroU32::new(requests_per_minute).unwrap_or(NonZeroU32::MIN.saturating_add(59));
        Self {
            limiter: Arc::new(GovRateLimiter::direct(Quota::per_minute(rpm))),
            retry_after_secs: 60,
        }
    }

    /// Create a limiter from a requests-per-second rate
    ///
    /// Rates below one per second become one request per `1 / qps` seconds.
    pub fn per_second(qps: f64) -> Self {
        let quota = if qps >= 1.0 {
            NonZeroU32::new(qps as u32).map(Quota::per_second)
        } else if qps > 0.0 {
            Quota::with_period(Duration::from_secs_f64(1.0 / qps))
        } else {
            None
        };
        let quota = quota.unwrap_or_else(|| Quota::per_second(NonZeroU32::MIN));
        let retry_after_secs = if qps > 0.0 && qps < 1.0 {
            (1.0 / qps).ceil() as u64
        } else {
            1
        };

        Self {
            limiter: Arc::new(GovRateLimiter::direct(quota)),
            retry_after_secs,
        }
    }

    /// Check if a request is allowed
    ///
    /// Returns Ok(()) if allowed, or SearchError::RateLimited if not
    pub fn check(&self) -> Result<(), SearchError> {
        match self.limiter.check() {
            Ok(_) => Ok(()),
            Err(_) => Err(SearchError::RateLimited {
                retry_after_secs: self.retry_after_secs,
            }),
        }
    }

    /// Wait until a request is allowed
    pub async fn wait(&self) {
        self.limiter.until_ready().await;
    }
}
