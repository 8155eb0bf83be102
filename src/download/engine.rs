//! Download engine for concurrent batch fetches with per-task retry.
//!
//! This module provides the `DownloadEngine` which runs one
//! [`DownloadTask`](super::DownloadTask) per URL, all sharing a single
//! semaphore that caps simultaneously in-flight fetches.
//!
//! # Example
//!
//! ```no_run
//! use fetcher_core::download::{DownloadEngine, EngineConfig};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = EngineConfig::builder()
//!     .worker_limit(4)
//!     .save_dir("./downloads")
//!     .build()?;
//! let engine = DownloadEngine::new(config)?;
//! let report = engine
//!     .run(["https://example.com/config.json", "https://example.com/LICENSE"])
//!     .await?;
//! println!("Succeeded: {}, Failed: {}", report.succeeded(), report.failed());
//! # Ok(())
//! # }
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::Semaphore;
use tracing::{debug, error, info, instrument, warn};

use super::classify::Classification;
use super::config::{ConfigError, EngineConfig};
use super::headers::RequestDecorator;
use super::progress::{DownloadObserver, NoopObserver};
use super::retry::RetryPolicy;
use super::task::{DownloadOutcome, DownloadRequest, DownloadTask, TaskContext};
use super::transport::{ReqwestTransport, Transport};
use crate::user_agent::{RandomUserAgents, UserAgentProvider};

/// Error type for download engine operations.
///
/// Individual download failures are never reported here; they end up as
/// failed outcomes in the [`BatchReport`].
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// The configuration was rejected.
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    /// The HTTP client could not be built.
    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    /// The save directory could not be created.
    #[error("cannot create save directory {path}: {source}")]
    SaveDir {
        /// Directory that could not be created.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },
}

/// Per-URL outcomes of one engine run plus aggregate counts.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchReport {
    succeeded: usize,
    failed: usize,
    outcomes: Vec<DownloadOutcome>,
}

impl BatchReport {
    fn from_outcomes(outcomes: Vec<DownloadOutcome>) -> Self {
        let succeeded = outcomes.iter().filter(|o| o.is_success()).count();
        Self {
            succeeded,
            failed: outcomes.len() - succeeded,
            outcomes,
        }
    }

    /// Every outcome, one per submitted URL.
    #[must_use]
    pub fn outcomes(&self) -> &[DownloadOutcome] {
        &self.outcomes
    }

    /// Consumes the report, returning the outcomes.
    #[must_use]
    pub fn into_outcomes(self) -> Vec<DownloadOutcome> {
        self.outcomes
    }

    /// Failed outcomes only.
    pub fn failures(&self) -> impl Iterator<Item = &DownloadOutcome> {
        self.outcomes.iter().filter(|o| !o.is_success())
    }

    /// Outcome for `url`, if it was part of the batch.
    #[must_use]
    pub fn outcome_for(&self, url: &str) -> Option<&DownloadOutcome> {
        self.outcomes.iter().find(|o| o.url == url)
    }

    /// Number of successful downloads.
    #[must_use]
    pub fn succeeded(&self) -> usize {
        self.succeeded
    }

    /// Number of failed downloads.
    #[must_use]
    pub fn failed(&self) -> usize {
        self.failed
    }

    /// Number of URLs processed.
    #[must_use]
    pub fn total(&self) -> usize {
        self.outcomes.len()
    }

    /// Returns true when nothing failed.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.failed == 0
    }
}

/// Download engine for concurrent file downloads with retry support.
///
/// # Concurrency Model
///
/// - Each request runs in its own Tokio task
/// - A task waiting for a semaphore permit stays `Pending` (or `Retrying`)
/// - The permit is held for one attempt's fetch and body write, then released
/// - Jitter and backoff sleeps never hold a permit
/// - The engine waits for every task and never retries on its own
pub struct DownloadEngine {
    config: EngineConfig,
    transport: Arc<dyn Transport>,
    user_agents: Arc<dyn UserAgentProvider>,
    retry_policy: RetryPolicy,
    observer: Arc<dyn DownloadObserver>,
}

impl std::fmt::Debug for DownloadEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DownloadEngine")
            .field("config", &self.config)
            .field("retry_policy", &self.retry_policy)
            .finish_non_exhaustive()
    }
}

impl DownloadEngine {
    /// Creates an engine with a reqwest transport and random browser User-Agents.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Config`] if the configuration is invalid and
    /// [`EngineError::Client`] if the HTTP client cannot be built.
    #[instrument(level = "debug", skip(config))]
    pub fn new(config: EngineConfig) -> Result<Self, EngineError> {
        config.validate()?;
        let transport = ReqwestTransport::new(config.connect_timeout(), config.read_timeout())
            .map_err(EngineError::Client)?;
        Self::with_transport(config, Arc::new(transport), Arc::new(RandomUserAgents::new()))
    }

    /// Creates an engine with an explicit transport and User-Agent provider.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Config`] if the configuration is invalid.
    pub fn with_transport(
        config: EngineConfig,
        transport: Arc<dyn Transport>,
        user_agents: Arc<dyn UserAgentProvider>,
    ) -> Result<Self, EngineError> {
        config.validate()?;

        debug!(
            worker_limit = config.worker_limit(),
            min_delay_ms = config.min_delay().as_millis(),
            max_delay_ms = config.max_delay().as_millis(),
            connect_timeout_s = config.connect_timeout().as_secs(),
            read_timeout_s = config.read_timeout().as_secs(),
            save_dir = %config.save_dir().display(),
            "creating download engine"
        );

        let retry_policy = RetryPolicy::new(config.min_delay(), config.max_delay());
        Ok(Self {
            config,
            transport,
            user_agents,
            retry_policy,
            observer: Arc::new(NoopObserver),
        })
    }

    /// Replaces the retry policy derived from the configuration.
    #[must_use]
    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry_policy = policy;
        self
    }

    /// Installs a progress observer.
    #[must_use]
    pub fn with_observer(mut self, observer: Arc<dyn DownloadObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// The engine configuration.
    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// The retry policy tasks will use.
    #[must_use]
    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry_policy
    }

    /// Downloads every URL, inferring file names from the URLs.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::SaveDir`] if the save directory cannot be created.
    /// Individual download failures do NOT cause this method to error.
    pub async fn run<I, S>(&self, urls: I) -> Result<BatchReport, EngineError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let requests = urls.into_iter().map(DownloadRequest::new).collect();
        self.run_requests(requests).await
    }

    /// Downloads every request and waits for all of them to settle.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::SaveDir`] if the save directory cannot be created.
    #[instrument(skip(self, requests), fields(count = requests.len(), save_dir = %self.config.save_dir().display()))]
    pub async fn run_requests(
        &self,
        requests: Vec<DownloadRequest>,
    ) -> Result<BatchReport, EngineError> {
        let save_dir = self.config.save_dir().to_path_buf();
        tokio::fs::create_dir_all(&save_dir)
            .await
            .map_err(|source| EngineError::SaveDir {
                path: save_dir.clone(),
                source,
            })?;

        let ctx = Arc::new(TaskContext {
            transport: Arc::clone(&self.transport),
            decorator: RequestDecorator::new(Arc::clone(&self.user_agents)),
            policy: self.retry_policy.clone(),
            gate: Arc::new(Semaphore::new(self.config.worker_limit())),
            save_dir,
            observer: Arc::clone(&self.observer),
        });

        info!(
            count = requests.len(),
            worker_limit = self.config.worker_limit(),
            "starting downloads"
        );

        let handles: Vec<_> = requests
            .into_iter()
            .enumerate()
            .map(|(id, request)| {
                let url = request.url().to_string();
                let task = DownloadTask::new(id, request, &ctx.policy);
                let ctx = Arc::clone(&ctx);
                let handle = tokio::spawn(async move { task.run(&ctx).await });
                (url, handle)
            })
            .collect();

        let mut outcomes = Vec::with_capacity(handles.len());
        for (url, handle) in handles {
            match handle.await {
                Ok(outcome) => outcomes.push(outcome),
                Err(e) => {
                    warn!(url = %url, error = %e, "download task panicked");
                    outcomes.push(DownloadOutcome::failed(
                        url,
                        0,
                        Classification::unknown(&format!("download task aborted: {e}")),
                    ));
                }
            }
        }

        let report = BatchReport::from_outcomes(outcomes);
        if report.failed() > 0 {
            error!(
                failed = report.failed(),
                total = report.total(),
                "Download completed with {} errors",
                report.failed()
            );
        } else {
            info!(
                succeeded = report.succeeded(),
                total = report.total(),
                "downloads complete"
            );
        }
        Ok(report)
    }
}
