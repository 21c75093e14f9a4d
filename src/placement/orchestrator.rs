// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Batch orchestration
//!
//! Fans out one fetch -> extract -> match pipeline per (keyword, identifier)
//! pair on a worker pool that lives only for the duration of the call.
//! Outcomes come back in input order, one per pair, whatever happens to
//! individual jobs.

use futures::future::join_all;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::config::PlacementConfig;
use super::fetcher::{build_search_url, PageFetcher, ProxyFetcher};
use super::pipeline::{JobState, JobTracker, PlacementPipeline};
use super::types::{
    BatchResult, FetchResult, JobError, Placement, PlacementError, PlacementOutcome, SearchJob,
};

/// Runs batches of placement lookups
pub struct PlacementOrchestrator {
    fetcher: Arc<dyn PageFetcher>,
    pipeline: Arc<PlacementPipeline>,
    search_base_url: String,
    search_query_param: String,
    max_concurrency: usize,
    batch_timeout: Duration,
}

impl PlacementOrchestrator {
    /// Create an orchestrator that fetches through the configured proxy service
    pub fn from_config(config: &PlacementConfig) -> Result<Self, PlacementError> {
        let fetcher = Arc::new(ProxyFetcher::new(config)?);
        Self::new(config, fetcher)
    }

    /// Create an orchestrator with an explicit page source
    pub fn new(config: &PlacementConfig, fetcher: Arc<dyn PageFetcher>) -> Result<Self, PlacementError> {
        build_search_url(&config.search_base_url, &config.search_query_param, "")?;

        Ok(Self {
            fetcher,
            pipeline: Arc::new(PlacementPipeline::new(config)?),
            search_base_url: config.search_base_url.clone(),
            search_query_param: config.search_query_param.clone(),
            max_concurrency: config.max_concurrent_fetches.max(1),
            batch_timeout: config.batch_timeout(),
        })
    }

    pub fn with_max_concurrency(mut self, max_concurrency: usize) -> Self {
        self.max_concurrency = max_concurrency.max(1);
        self
    }

    pub fn with_batch_timeout(mut self, batch_timeout: Duration) -> Self {
        self.batch_timeout = batch_timeout;
        self
    }

    pub fn max_concurrency(&self) -> usize {
        self.max_concurrency
    }

    pub fn fetcher_name(&self) -> &'static str {
        self.fetcher.name()
    }

    /// Pair keywords with identifiers, rejecting mismatched lengths
    pub fn create_jobs(
        keywords: Vec<String>,
        identifiers: Vec<String>,
    ) -> Result<Vec<SearchJob>, PlacementError> {
        if keywords.len() != identifiers.len() {
            return Err(PlacementError::InvalidInput {
                keywords: keywords.len(),
                identifiers: identifiers.len(),
            });
        }

        Ok(keywords
            .into_iter()
            .zip(identifiers)
            .map(|(keyword, identifier)| SearchJob { keyword, identifier })
            .collect())
    }

    /// Run one batch
    ///
    /// Fails only on mismatched input lengths. Every other failure is
    /// contained in the affected job's outcome.
    pub async fn run_batch(
        &self,
        keywords: Vec<String>,
        identifiers: Vec<String>,
    ) -> Result<BatchResult, PlacementError> {
        self.run_batch_with_cancel(keywords, identifiers, CancellationToken::new())
            .await
    }

    /// Run one batch that can be abandoned through `cancel`
    ///
    /// Jobs still running when `cancel` fires or the batch deadline passes
    /// resolve to `Error`; completed jobs keep their outcomes.
    pub async fn run_batch_with_cancel(
        &self,
        keywords: Vec<String>,
        identifiers: Vec<String>,
        cancel: CancellationToken,
    ) -> Result<BatchResult, PlacementError> {
        let jobs = Self::create_jobs(keywords, identifiers)?;
        if jobs.is_empty() {
            return Ok(BatchResult::default());
        }

        let start = Instant::now();
        let run_token = cancel.child_token();
        // Dropping this call cancels every job and the deadline task
        let _teardown = run_token.clone().drop_guard();
        let semaphore = Arc::new(Semaphore::new(self.max_concurrency));

        let deadline = {
            let token = run_token.clone();
            let batch_timeout = self.batch_timeout;
            tokio::spawn(async move {
                tokio::select! {
                    _ = tokio::time::sleep(batch_timeout) => {
                        warn!("Batch deadline of {:?} reached, abandoning pending jobs", batch_timeout);
                        token.cancel();
                    }
                    _ = token.cancelled() => {}
                }
            })
        };

        let handles: Vec<_> = jobs
            .iter()
            .cloned()
            .enumerate()
            .map(|(index, job)| {
                let token = run_token.clone();
                let task = JobTask {
                    index,
                    job,
                    fetcher: self.fetcher.clone(),
                    pipeline: self.pipeline.clone(),
                    semaphore: semaphore.clone(),
                    search_base_url: self.search_base_url.clone(),
                    search_query_param: self.search_query_param.clone(),
                };

                tokio::spawn(async move { task.run_until_cancelled(token).await.0 })
            })
            .collect();

        let results = join_all(handles).await;
        deadline.abort();

        let outcomes: Vec<PlacementOutcome> = jobs
            .iter()
            .zip(results)
            .enumerate()
            .map(|(index, (job, result))| {
                let placement = result.unwrap_or_else(|e| {
                    warn!("Job {} task failed: {}", index, e);
                    Placement::Error(JobError::UnexpectedFault(e.to_string()))
                });
                PlacementOutcome::new(job, placement)
            })
            .collect();

        let batch = BatchResult { outcomes };
        info!(
            "Batch complete: {} jobs, {} ranked, {} errors in {}ms",
            batch.len(),
            batch.found_count(),
            batch.error_count(),
            start.elapsed().as_millis()
        );

        Ok(batch)
    }
}

/// Everything one spawned job needs, owned
struct JobTask {
    index: usize,
    job: SearchJob,
    fetcher: Arc<dyn PageFetcher>,
    pipeline: Arc<PlacementPipeline>,
    semaphore: Arc<Semaphore>,
    search_base_url: String,
    search_query_param: String,
}

impl JobTask {
    /// Run the job unless `token` fires first. The tracker always ends in `Done`.
    async fn run_until_cancelled(self, token: CancellationToken) -> (Placement, JobTracker) {
        let mut tracker = JobTracker::new(self.index);

        let finished = tokio::select! {
            biased;
            _ = token.cancelled() => None,
            placement = self.run(&mut tracker) => Some(placement),
        };

        let placement = match finished {
            Some(placement) => placement,
            None => {
                debug!("Job {} abandoned in {:?}", tracker.index(), tracker.state());
                tracker.finish(Placement::Error(JobError::Cancelled))
            }
        };

        (placement, tracker)
    }

    async fn run(self, tracker: &mut JobTracker) -> Placement {
        let search_url = match build_search_url(
            &self.search_base_url,
            &self.search_query_param,
            &self.job.keyword,
        ) {
            Ok(url) => url,
            Err(e) => return tracker.finish(Placement::Error(JobError::UnexpectedFault(e.to_string()))),
        };

        let _permit = match self.semaphore.acquire_owned().await {
            Ok(permit) => permit,
            Err(_) => return tracker.finish(Placement::Error(JobError::Cancelled)),
        };

        tracker.advance(JobState::Fetching);
        let status = self.fetcher.fetch(search_url.as_str()).await;

        let fetch = FetchResult {
            job: self.job,
            status,
        };
        self.pipeline.resolve(&fetch, tracker)
    }
}
