// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Configuration for sponsored placement lookups

use std::env;
use std::time::Duration;

/// Configuration for the fetch-and-extract engine
#[derive(Debug, Clone)]
pub struct PlacementConfig {
    /// Proxy fetch service endpoint
    pub proxy_endpoint: String,
    /// Access token injected into every proxied request
    pub proxy_token: Option<String>,
    /// Search results page of the target site
    pub search_base_url: String,
    /// Query parameter that carries the keyword
    pub search_query_param: String,
    /// Per-fetch timeout in seconds
    pub fetch_timeout_secs: u64,
    /// Maximum fetches in flight at once
    pub max_concurrent_fetches: usize,
    /// Run-level deadline in seconds
    pub batch_timeout_secs: u64,
    /// Outbound requests per minute towards the proxy
    pub rate_limit_per_minute: u32,
    /// Treat known bot-block statuses as errors instead of parsing them
    pub block_status_as_error: bool,
    /// Selectors and labels used by the detection strategies
    pub detection: DetectionConfig,
    /// Quota period settings for the in-memory gate
    pub quota: QuotaConfig,
}

/// Selector strings for the sponsored detection strategies
#[derive(Debug, Clone)]
pub struct DetectionConfig {
    /// Elements flagged by the page's component-type attribute
    pub structured_marker: String,
    /// Compound class signature of historical ad slots
    pub class_signature: String,
    /// Generic result containers checked for a text label
    pub result_container: String,
    /// Elements inside a container that may carry the label
    pub label_element: String,
    /// Literal label text
    pub sponsored_label: String,
    /// Attribute carrying the product identifier
    pub identifier_attribute: String,
}

/// Quota period settings
#[derive(Debug, Clone)]
pub struct QuotaConfig {
    /// Batches allowed per period
    pub max_requests: u32,
    /// Period length in days
    pub reset_days: i64,
}

/// Statuses treated as block pages when `block_status_as_error` is set
pub const BLOCK_STATUSES: &[u16] = &[403, 429, 503];

impl PlacementConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            proxy_endpoint: env::var("PROXY_ENDPOINT").unwrap_or(defaults.proxy_endpoint),
            proxy_token: env::var("PROXY_TOKEN").ok().filter(|t| !t.is_empty()),
            search_base_url: env::var("SEARCH_BASE_URL").unwrap_or(defaults.search_base_url),
            search_query_param: env::var("SEARCH_QUERY_PARAM")
                .unwrap_or(defaults.search_query_param),
            fetch_timeout_secs: env::var("FETCH_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.fetch_timeout_secs),
            max_concurrent_fetches: env::var("MAX_CONCURRENT_FETCHES")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.max_concurrent_fetches),
            batch_timeout_secs: env::var("BATCH_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.batch_timeout_secs),
            rate_limit_per_minute: env::var("FETCH_RATE_LIMIT_PER_MINUTE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.rate_limit_per_minute),
            block_status_as_error: env::var("BLOCK_STATUS_AS_ERROR")
                .map(|v| v.to_lowercase() == "true")
                .unwrap_or(false),
            detection: DetectionConfig {
                identifier_attribute: env::var("IDENTIFIER_ATTRIBUTE")
                    .unwrap_or(defaults.detection.identifier_attribute),
                ..defaults.detection
            },
            quota: QuotaConfig {
                max_requests: env::var("QUOTA_MAX_REQUESTS")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(defaults.quota.max_requests),
                reset_days: env::var("QUOTA_RESET_DAYS")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(defaults.quota.reset_days),
            },
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.proxy_token.as_deref().map_or(true, str::is_empty) {
            return Err("PROXY_TOKEN must be set".to_string());
        }
        if url::Url::parse(&self.proxy_endpoint).is_err() {
            return Err(format!("Invalid proxy endpoint: {}", self.proxy_endpoint));
        }
        if url::Url::parse(&self.search_base_url).is_err() {
            return Err(format!("Invalid search base URL: {}", self.search_base_url));
        }
        if self.fetch_timeout_secs == 0 {
            return Err("fetch_timeout_secs must be at least 1".to_string());
        }
        if self.max_concurrent_fetches == 0 {
            return Err("max_concurrent_fetches must be at least 1".to_string());
        }
        if self.batch_timeout_secs == 0 {
            return Err("batch_timeout_secs must be at least 1".to_string());
        }
        if self.rate_limit_per_minute == 0 {
            return Err("Rate limit must be greater than 0".to_string());
        }
        if self.detection.identifier_attribute.trim().is_empty() {
            return Err("identifier_attribute must not be empty".to_string());
        }
        if self.quota.reset_days <= 0 {
            return Err("quota reset_days must be positive".to_string());
        }
        Ok(())
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }

    pub fn batch_timeout(&self) -> Duration {
        Duration::from_secs(self.batch_timeout_secs)
    }

    /// Whether a response status should short-circuit to an error
    pub fn is_block_status(&self, status: u16) -> bool {
        self.block_status_as_error && BLOCK_STATUSES.contains(&status)
    }
}

impl Default for PlacementConfig {
    fn default() -> Self {
        Self {
            proxy_endpoint: "https://api.scrape.do".to_string(),
            proxy_token: None,
            search_base_url: "https://www.amazon.in/s".to_string(),
            search_query_param: "k".to_string(),
            fetch_timeout_secs: 30,
            max_concurrent_fetches: 8,
            batch_timeout_secs: 120,
            rate_limit_per_minute: 120,
            block_status_as_error: false,
            detection: DetectionConfig::default(),
            quota: QuotaConfig::default(),
        }
    }
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            structured_marker: r#"div[data-component-type="sp-sponsored-result"]"#.to_string(),
            class_signature: "div.s-result-item.AdHolder".to_string(),
            result_container: r#"div[data-component-type="s-search-result"]"#.to_string(),
            label_element: "span".to_string(),
            sponsored_label: "Sponsored".to_string(),
            identifier_attribute: "data-asin".to_string(),
        }
    }
}

impl Default for QuotaConfig {
    fn default() -> Self {
        Self {
            max_requests: 10,
            reset_days: 30,
        }
    }
}
