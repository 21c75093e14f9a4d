// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Outbound pacing for proxied fetches

use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter as GovRateLimiter};
use std::num::NonZeroU32;
use std::sync::Arc;

const DEFAULT_PER_MINUTE: NonZeroU32 = match NonZeroU32::new(120) {
    Some(n) => n,
    None => unreachable!(),
};

/// Token bucket shared by every fetch in the process
#[derive(Clone)]
pub struct FetchRateLimiter {
    limiter: Arc<GovRateLimiter<NotKeyed, InMemoryState, DefaultClock>>,
    requests_per_minute: u32,
}

impl FetchRateLimiter {
    /// Create a new rate limiter
    ///
    /// # Arguments
    /// * `requests_per_minute` - Maximum fetches allowed per minute (0 falls back to 120)
    pub fn new(requests_per_minute: u32) -> Self {
        let rpm = NonZeroU32::new(requests_per_minute).unwrap_or(DEFAULT_PER_MINUTE);
        let limiter = Arc::new(GovRateLimiter::direct(Quota::per_minute(rpm)));

        Self {
            limiter,
            requests_per_minute: rpm.get(),
        }
    }

    /// Wait until the bucket allows another fetch
    pub async fn wait(&self) {
        self.limiter.until_ready().await;
    }

    pub fn requests_per_minute(&self) -> u32 {
        self.requests_per_minute
    }
}
