// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use anyhow::{anyhow, Result};
use clap::Args;
use tracing::info;

use crate::placement::{BatchResult, PlacementConfig, PlacementOrchestrator};

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Search keyword (repeat once per lookup)
    #[arg(short, long = "keyword", required = true)]
    pub keywords: Vec<String>,

    /// Product identifier paired with the keyword at the same position
    #[arg(short, long = "identifier", required = true)]
    pub identifiers: Vec<String>,

    /// Proxy access token
    #[arg(long, env = "PROXY_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Maximum fetches in flight
    #[arg(long)]
    pub max_concurrency: Option<usize>,

    /// Batch deadline in seconds
    #[arg(long)]
    pub timeout_secs: Option<u64>,
}

impl RunArgs {
    /// Environment configuration with command-line overrides applied
    pub fn config(&self) -> PlacementConfig {
        let mut config = PlacementConfig::from_env();
        if let Some(ref token) = self.token {
            config.proxy_token = Some(token.clone());
        }
        if let Some(max) = self.max_concurrency {
            config.max_concurrent_fetches = max;
        }
        if let Some(secs) = self.timeout_secs {
            config.batch_timeout_secs = secs;
        }
        config
    }
}

pub async fn run_batch(args: RunArgs) -> Result<()> {
    dotenv::dotenv().ok();

    let config = args.config();
    config.validate().map_err(|e| anyhow!(e))?;

    let orchestrator = PlacementOrchestrator::from_config(&config)?;

    info!(
        "Running batch of {} lookups (max {} in flight)",
        args.keywords.len(),
        orchestrator.max_concurrency()
    );

    let batch: BatchResult = orchestrator.run_batch(args.keywords, args.identifiers).await?;
    println!("{}", serde_json::to_string_pretty(&batch)?);

    Ok(())
}
