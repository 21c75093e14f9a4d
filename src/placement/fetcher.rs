// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Proxied fetching of search result pages
//!
//! The target site is never contacted directly: every request goes to the
//! proxy fetch service with the target URL and access token as query values.

use async_trait::async_trait;
use reqwest::header::{ACCEPT_LANGUAGE, USER_AGENT};
use reqwest::Client;
use tracing::{debug, warn};
use url::Url;

use super::config::PlacementConfig;
use super::rate_limiter::FetchRateLimiter;
use super::types::{FetchStatus, PlacementError};
use super::user_agent::UserAgentPool;

/// Source of raw search result pages
///
/// Implementations return a typed status rather than an error so every
/// job resolves deterministically.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Fetch one search results page
    async fn fetch(&self, search_url: &str) -> FetchStatus;

    /// Name used in logs
    fn name(&self) -> &'static str;
}

/// Build the target search URL for a keyword (spaces become `+`)
pub fn build_search_url(base: &str, query_param: &str, keyword: &str) -> Result<Url, PlacementError> {
    let mut url = Url::parse(base)
        .map_err(|e| PlacementError::Config(format!("Invalid search base URL '{}': {}", base, e)))?;
    url.query_pairs_mut().append_pair(query_param, keyword);
    Ok(url)
}

/// Wrap a target URL in a proxy fetch service call
pub fn build_proxy_url(endpoint: &str, token: &str, target: &str) -> Result<Url, PlacementError> {
    let mut url = Url::parse(endpoint).map_err(|e| {
        PlacementError::Config(format!("Invalid proxy endpoint '{}': {}", endpoint, e))
    })?;
    url.query_pairs_mut()
        .append_pair("token", token)
        .append_pair("url", target);
    Ok(url)
}

/// Fetcher backed by a third-party proxy fetch service
pub struct ProxyFetcher {
    client: Client,
    endpoint: String,
    token: String,
    user_agents: UserAgentPool,
    rate_limiter: FetchRateLimiter,
}

impl ProxyFetcher {
    /// Create a fetcher from configuration
    pub fn new(config: &PlacementConfig) -> Result<Self, PlacementError> {
        let token = config
            .proxy_token
            .clone()
            .filter(|t| !t.is_empty())
            .ok_or_else(|| PlacementError::Config("PROXY_TOKEN must be set".to_string()))?;

        let client = Client::builder()
            .timeout(config.fetch_timeout())
            .redirect(reqwest::redirect::Policy::limited(5))
            .build()
            .map_err(|e| PlacementError::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            endpoint: config.proxy_endpoint.clone(),
            token,
            user_agents: UserAgentPool::default(),
            rate_limiter: FetchRateLimiter::new(config.rate_limit_per_minute),
        })
    }

    /// Replace the user-agent pool
    pub fn with_user_agents(mut self, user_agents: UserAgentPool) -> Self {
        self.user_agents = user_agents;
        self
    }
}

#[async_trait]
impl PageFetcher for ProxyFetcher {
    async fn fetch(&self, search_url: &str) -> FetchStatus {
        let proxied = match build_proxy_url(&self.endpoint, &self.token, search_url) {
            Ok(url) => url,
            Err(e) => return FetchStatus::NetworkError(e.to_string()),
        };

        self.rate_limiter.wait().await;

        let user_agent = self.user_agents.pick();
        debug!("Fetching {} via proxy (ua: {})", search_url, user_agent);

        let response = match self
            .client
            .get(proxied)
            .header(USER_AGENT, user_agent)
            .header(ACCEPT_LANGUAGE, "en-US,en;q=0.9")
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) if e.is_timeout() => {
                warn!("Fetch timed out: {}", search_url);
                return FetchStatus::Timeout;
            }
            Err(e) => {
                warn!("Fetch failed for {}: {}", search_url, e);
                return FetchStatus::NetworkError(e.to_string());
            }
        };

        let status = response.status();
        let body = match response.bytes().await {
            Ok(body) => body,
            Err(e) if e.is_timeout() => return FetchStatus::Timeout,
            Err(e) => return FetchStatus::NetworkError(e.to_string()),
        };

        debug!("Fetched {} bytes (status {}) for {}", body.len(), status, search_url);

        if status.is_success() {
            FetchStatus::Success { body }
        } else {
            FetchStatus::HttpError {
                code: status.as_u16(),
                body,
            }
        }
    }

    fn name(&self) -> &'static str {
        "proxy"
    }
}
