// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Per-job state machine and the extract/match steps
//!
//! ```text
//! Pending -> Fetching -> Extracting -> Matching -> Done(outcome)
//!               |            |
//!               +------------+--------------------> Done(Error)
//! ```

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use tracing::{debug, warn};

use super::config::PlacementConfig;
use super::extractor::{ParsedPage, SponsoredExtractor};
use super::matcher::IdentifierMatcher;
use super::types::{FetchResult, FetchStatus, JobError, Placement, PlacementError};

/// Lifecycle of one job
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobState {
    Pending,
    Fetching,
    Extracting,
    Matching,
    Done(Placement),
}

impl JobState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done(_))
    }

    /// Whether `next` is a legal successor of this state
    pub fn can_transition_to(&self, next: &JobState) -> bool {
        use JobState::*;
        matches!(
            (self, next),
            (Pending, Fetching)
                | (Pending, Done(_))
                | (Fetching, Extracting)
                | (Fetching, Done(_))
                | (Extracting, Matching)
                | (Extracting, Done(_))
                | (Matching, Done(_))
        )
    }
}

/// Tracks and logs one job's transitions
#[derive(Debug)]
pub struct JobTracker {
    index: usize,
    state: JobState,
}

impl JobTracker {
    pub fn new(index: usize) -> Self {
        Self {
            index,
            state: JobState::Pending,
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn state(&self) -> &JobState {
        &self.state
    }

    pub fn advance(&mut self, next: JobState) {
        if !self.state.can_transition_to(&next) {
            warn!(
                "Job {}: illegal transition {:?} -> {:?}",
                self.index, self.state, next
            );
        }
        debug!("Job {}: {:?} -> {:?}", self.index, self.state, next);
        self.state = next;
    }

    /// Move to `Done` and hand the placement back
    pub fn finish(&mut self, placement: Placement) -> Placement {
        self.advance(JobState::Done(placement.clone()));
        placement
    }
}

/// Extraction and matching for fetched pages
pub struct PlacementPipeline {
    extractor: SponsoredExtractor,
    matcher: IdentifierMatcher,
    config: PlacementConfig,
}

impl PlacementPipeline {
    pub fn new(config: &PlacementConfig) -> Result<Self, PlacementError> {
        Ok(Self::with_parts(
            SponsoredExtractor::new(&config.detection)?,
            IdentifierMatcher::new(&config.detection.identifier_attribute)?,
            config.clone(),
        ))
    }

    pub fn with_parts(
        extractor: SponsoredExtractor,
        matcher: IdentifierMatcher,
        config: PlacementConfig,
    ) -> Self {
        Self {
            extractor,
            matcher,
            config,
        }
    }

    /// Resolve a fetched page into a placement, driving `tracker` to `Done`.
    ///
    /// Parser and matcher faults are contained here and become `Error`.
    pub fn resolve(&self, fetch: &FetchResult, tracker: &mut JobTracker) -> Placement {
        let body = match self.deliverable_body(&fetch.status) {
            Ok(body) => body,
            Err(e) => {
                warn!("Job {} ('{}'): {}", tracker.index(), fetch.job.keyword, e);
                return tracker.finish(Placement::Error(e));
            }
        };

        tracker.advance(JobState::Extracting);

        let page = match panic::catch_unwind(AssertUnwindSafe(|| ParsedPage::parse(body))) {
            Ok(page) => page,
            Err(payload) => {
                let e = JobError::Parse(panic_message(payload.as_ref()));
                warn!("Job {} ('{}'): {}", tracker.index(), fetch.job.keyword, e);
                return tracker.finish(Placement::Error(e));
            }
        };

        let candidates = match panic::catch_unwind(AssertUnwindSafe(|| self.extractor.extract(&page))) {
            Ok(candidates) => candidates,
            Err(payload) => {
                let e = JobError::UnexpectedFault(panic_message(payload.as_ref()));
                warn!("Job {} ('{}'): {}", tracker.index(), fetch.job.keyword, e);
                return tracker.finish(Placement::Error(e));
            }
        };

        debug!(
            "Job {} ('{}'): {} sponsored candidates",
            tracker.index(),
            fetch.job.keyword,
            candidates.len()
        );
        tracker.advance(JobState::Matching);

        let target = fetch.job.identifier.as_str();
        let placement = match panic::catch_unwind(AssertUnwindSafe(|| {
            self.matcher.find_rank(&candidates, target)
        })) {
            Ok(Some(position)) => Placement::Rank(position),
            Ok(None) => Placement::NotFound,
            Err(payload) => {
                let e = JobError::UnexpectedFault(panic_message(payload.as_ref()));
                warn!("Job {} ('{}'): {}", tracker.index(), fetch.job.keyword, e);
                Placement::Error(e)
            }
        };

        tracker.finish(placement)
    }

    /// Body to parse, or the error the fetch resolves to
    fn deliverable_body<'a>(&self, status: &'a FetchStatus) -> Result<&'a [u8], JobError> {
        match status {
            FetchStatus::Success { body } => Ok(&body[..]),
            FetchStatus::HttpError { code, .. } if self.config.is_block_status(*code) => {
                Err(JobError::Blocked { status: *code })
            }
            FetchStatus::HttpError { code, body } => {
                debug!("Parsing non-2xx response (status {})", code);
                Ok(&body[..])
            }
            FetchStatus::NetworkError(msg) => Err(JobError::Network(msg.clone())),
            FetchStatus::Timeout => Err(JobError::Timeout),
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        msg.to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "panic during page processing".to_string()
    }
}
