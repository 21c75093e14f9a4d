// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
pub mod run;

use anyhow::Result;
use clap::{Parser, Subcommand};

/// Sponsored placement lookup CLI
#[derive(Parser, Debug)]
#[command(name = "sponsored-rank-cli")]
#[command(version)]
#[command(about = "Look up sponsored search placements for product identifiers", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run one batch of (keyword, identifier) lookups and print the outcomes
    Run(run::RunArgs),
}

/// Execute CLI command
pub async fn execute(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Run(args) => run::run_batch(args).await,
    }
}
