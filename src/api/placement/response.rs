// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Placement API response types

use serde::{Deserialize, Serialize};

/// Plain message body used for error responses
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}
