// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
pub mod api;
pub mod cli;
pub mod placement;
pub mod version;

// Re-export main types
pub use placement::{
    BatchResult, InMemoryQuotaGate, JobError, Placement, PlacementConfig, PlacementError,
    PlacementOrchestrator, PlacementOutcome, QuotaGate,
};
