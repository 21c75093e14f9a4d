// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Placement API request types

use serde::{Deserialize, Serialize};

/// Request body for POST /process
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessRequest {
    /// Search keywords, one per lookup
    #[serde(default)]
    pub keywords: Vec<String>,

    /// Product identifiers, paired positionally with `keywords`
    #[serde(default, alias = "identifiers")]
    pub asins: Vec<String>,
}

impl ProcessRequest {
    /// Validate the request shape
    pub fn validate(&self) -> Result<(), String> {
        if self.keywords.len() != self.asins.len() {
            return Err("Keywords and ASINs must be of equal length".to_string());
        }
        Ok(())
    }
}
