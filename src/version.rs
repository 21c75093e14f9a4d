// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
// Version information for the sponsored placement service

/// Semantic version number
pub const VERSION_NUMBER: &str = env!("CARGO_PKG_VERSION");

/// Detection strategies shipped in this build, in the order they run
pub const DETECTION_STRATEGIES: &[&str] = &["structured_marker", "class_signature", "text_label"];

/// Supported features in this version
pub const FEATURES: &[&str] = &[
    "proxy-fetch",
    "user-agent-rotation",
    "sponsored-dedup",
    "identifier-fallback",
    "bounded-concurrency",
    "batch-deadline",
    "batch-quota",
];

/// Get formatted version string for logging
pub fn get_version_string() -> String {
    format!("Sponsored Rank {}", VERSION_NUMBER)
}

/// Get full version info for API responses
pub fn get_version_info() -> serde_json::Value {
    serde_json::json!({
        "version": VERSION_NUMBER,
        "strategies": DETECTION_STRATEGIES,
        "features": FEATURES,
    })
}
