// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Batch quota gate
//!
//! One unit is consumed per accepted batch, regardless of batch size or
//! per-job outcomes. The engine itself never calls the gate. Callers either
//! check it before a run and record usage afterwards, or reserve a unit up
//! front with `try_reserve` and `release` it if the batch is rejected.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::info;

use super::config::QuotaConfig;

/// Snapshot of the gate's counters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuotaStatus {
    pub max_requests: u32,
    pub requests_used: u32,
    pub last_reset: DateTime<Utc>,
}

/// Yes/no gate plus post-hoc usage accounting
#[async_trait]
pub trait QuotaGate: Send + Sync {
    /// Whether another batch may run now
    async fn can_proceed(&self) -> bool;

    /// Record one completed batch
    async fn record_usage(&self);

    /// Current counters
    async fn status(&self) -> QuotaStatus;

    /// Check and consume one unit in a single step
    ///
    /// The default is not atomic; gates shared between concurrent callers
    /// should override it.
    async fn try_reserve(&self) -> bool {
        if self.can_proceed().await {
            self.record_usage().await;
            true
        } else {
            false
        }
    }

    /// Hand back a unit taken by `try_reserve`
    async fn release(&self);
}

#[derive(Debug)]
struct QuotaState {
    requests_used: u32,
    last_reset: DateTime<Utc>,
}

/// Process-local gate with a rolling reset period
pub struct InMemoryQuotaGate {
    max_requests: u32,
    reset_period: Duration,
    state: Mutex<QuotaState>,
}

impl InMemoryQuotaGate {
    pub fn new(max_requests: u32, reset_period: Duration) -> Self {
        Self::starting_at(max_requests, reset_period, Utc::now())
    }

    pub fn from_config(config: &QuotaConfig) -> Self {
        Self::new(config.max_requests, Duration::days(config.reset_days))
    }

    /// Gate whose current period began at `last_reset`
    pub fn starting_at(max_requests: u32, reset_period: Duration, last_reset: DateTime<Utc>) -> Self {
        Self {
            max_requests,
            reset_period,
            state: Mutex::new(QuotaState {
                requests_used: 0,
                last_reset,
            }),
        }
    }

    fn reset_if_elapsed(&self, state: &mut QuotaState, now: DateTime<Utc>) {
        if now - state.last_reset > self.reset_period {
            info!(
                "Quota period elapsed, resetting usage ({} used)",
                state.requests_used
            );
            state.requests_used = 0;
            state.last_reset = now;
        }
    }
}

#[async_trait]
impl QuotaGate for InMemoryQuotaGate {
    async fn can_proceed(&self) -> bool {
        let mut state = self.state.lock().await;
        self.reset_if_elapsed(&mut state, Utc::now());
        state.requests_used < self.max_requests
    }

    async fn record_usage(&self) {
        let mut state = self.state.lock().await;
        state.requests_used = state.requests_used.saturating_add(1);
    }

    async fn try_reserve(&self) -> bool {
        let mut state = self.state.lock().await;
        self.reset_if_elapsed(&mut state, Utc::now());
        if state.requests_used < self.max_requests {
            state.requests_used += 1;
            true
        } else {
            false
        }
    }

    async fn release(&self) {
        let mut state = self.state.lock().await;
        state.requests_used = state.requests_used.saturating_sub(1);
    }

    async fn status(&self) -> QuotaStatus {
        let mut state = self.state.lock().await;
        self.reset_if_elapsed(&mut state, Utc::now());
        QuotaStatus {
            max_requests: self.max_requests,
            requests_used: state.requests_used,
            last_reset: state.last_reset,
        }
    }
}
