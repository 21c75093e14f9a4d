// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Core types for sponsored placement lookups

use bytes::Bytes;
use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};
use thiserror::Error;

/// One (keyword, identifier) pair to look up
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchJob {
    /// Search keyword submitted to the results page
    pub keyword: String,
    /// Product identifier expected among the sponsored results
    pub identifier: String,
}

impl SearchJob {
    pub fn new(keyword: impl Into<String>, identifier: impl Into<String>) -> Self {
        Self {
            keyword: keyword.into(),
            identifier: identifier.into(),
        }
    }
}

/// Outcome of a single proxied fetch
#[derive(Debug, Clone)]
pub enum FetchStatus {
    /// 2xx response
    Success { body: Bytes },
    /// Non-2xx response; the body is still handed to extraction
    HttpError { code: u16, body: Bytes },
    /// Connection refused, DNS failure, broken body stream
    NetworkError(String),
    /// Request exceeded the per-fetch timeout
    Timeout,
}

impl FetchStatus {
    /// Page content, if the proxy delivered any
    pub fn body(&self) -> Option<&Bytes> {
        match self {
            Self::Success { body } | Self::HttpError { body, .. } => Some(body),
            Self::NetworkError(_) | Self::Timeout => None,
        }
    }

    /// HTTP status code, if a response was received
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Success { .. } => Some(200),
            Self::HttpError { code, .. } => Some(*code),
            Self::NetworkError(_) | Self::Timeout => None,
        }
    }
}

/// Fetch outcome bound to the job that produced it
#[derive(Debug, Clone)]
pub struct FetchResult {
    pub job: SearchJob,
    pub status: FetchStatus,
}

/// Per-job failures. These never abort sibling jobs.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum JobError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Fetch timed out")]
    Timeout,

    #[error("Blocked by target (status {status})")]
    Blocked { status: u16 },

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Unexpected fault: {0}")]
    UnexpectedFault(String),

    #[error("Job cancelled before completion")]
    Cancelled,
}

/// Request-level errors surfaced to the caller
#[derive(Debug, Error)]
pub enum PlacementError {
    #[error("Keywords and identifiers must be of equal length ({keywords} != {identifiers})")]
    InvalidInput { keywords: usize, identifiers: usize },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid selector '{selector}': {reason}")]
    InvalidSelector { selector: String, reason: String },

    #[error("Quota exceeded")]
    QuotaExceeded,
}

/// Where the identifier landed among the sponsored results
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Placement {
    /// 1-based position in the de-duplicated sponsored sequence
    Rank(usize),
    NotFound,
    Error(JobError),
}

impl Placement {
    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error(_))
    }

    pub fn rank(&self) -> Option<usize> {
        match self {
            Self::Rank(n) => Some(*n),
            _ => None,
        }
    }
}

impl Serialize for Placement {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Rank(n) => serializer.serialize_u64(*n as u64),
            Self::NotFound => serializer.serialize_str("Not Found"),
            Self::Error(_) => serializer.serialize_str("Error"),
        }
    }
}

/// Terminal record for one job
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlacementOutcome {
    pub keyword: String,
    pub identifier: String,
    pub placement: Placement,
}

impl PlacementOutcome {
    pub fn new(job: &SearchJob, placement: Placement) -> Self {
        Self {
            keyword: job.keyword.clone(),
            identifier: job.identifier.clone(),
            placement,
        }
    }
}

// Field names match what existing consumers of the /process endpoint read.
impl Serialize for PlacementOutcome {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut record = serializer.serialize_struct("PlacementOutcome", 3)?;
        record.serialize_field("Keyword", &self.keyword)?;
        record.serialize_field("ASIN", &self.identifier)?;
        record.serialize_field("Sponsored Placement", &self.placement)?;
        record.end()
    }
}

/// Outcomes in input order, one per submitted pair
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct BatchResult {
    pub outcomes: Vec<PlacementOutcome>,
}

impl BatchResult {
    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    /// Number of jobs that resolved to a rank
    pub fn found_count(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o.placement, Placement::Rank(_)))
            .count()
    }

    /// Number of jobs that resolved to an error
    pub fn error_count(&self) -> usize {
        self.outcomes.iter().filter(|o| o.placement.is_error()).count()
    }
}
