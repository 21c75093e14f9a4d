// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Placement API endpoints
//!
//! Provides `/process` (run a batch) and `/quota` (usage counters).

pub mod handler;
pub mod request;
pub mod response;

pub use handler::{process_handler, quota_handler};
pub use request::ProcessRequest;
pub use response::MessageResponse;
