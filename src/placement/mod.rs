// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Sponsored placement engine
//!
//! Determines the rank of a product among the sponsored results of a
//! search results page, for a batch of (keyword, identifier) pairs:
//!
//! ```text
//! (keyword, identifier)* → PlacementOrchestrator
//!                              ↓ per pair, bounded concurrency
//!                   PageFetcher → ParsedPage → SponsoredExtractor → IdentifierMatcher
//!                              ↓
//!                   BatchResult (input order, one outcome per pair)
//! ```
//!
//! Key features:
//! - Pages fetched through a third-party proxy with rotating user agents
//! - Three independent detection strategies merged with de-duplication
//! - Per-job fault isolation; a batch always returns one outcome per pair
//! - Run-level deadline and caller cancellation

pub mod config;
pub mod extractor;
pub mod fetcher;
pub mod matcher;
pub mod orchestrator;
pub mod pipeline;
pub mod quota;
pub mod rate_limiter;
pub mod types;
pub mod user_agent;

// Re-export commonly used types
pub use config::{DetectionConfig, PlacementConfig, QuotaConfig};
pub use extractor::{ParsedPage, SponsoredCandidate, SponsoredDetector, SponsoredExtractor};
pub use fetcher::{build_proxy_url, build_search_url, PageFetcher, ProxyFetcher};
pub use matcher::IdentifierMatcher;
pub use orchestrator::PlacementOrchestrator;
pub use pipeline::{JobState, JobTracker, PlacementPipeline};
pub use quota::{InMemoryQuotaGate, QuotaGate, QuotaStatus};
pub use rate_limiter::FetchRateLimiter;
pub use types::{
    BatchResult, FetchResult, FetchStatus, JobError, Placement, PlacementError, PlacementOutcome,
    SearchJob,
};
pub use user_agent::UserAgentPool;
