//! Per-URL download state machine.
//!
//! ```text
//! Pending -> Attempting -> Succeeded
//!                |
//!                +-> Retrying -> Attempting
//!                |
//!                +-> Exhausted
//! ```
//!
//! Each attempt yields a `Result`; [`RetryPolicy::on_failure`] decides between
//! `Retrying` and `Exhausted`. Only a fully streamed 200 response reaches
//! `Succeeded`, and a failed attempt never leaves its partial file behind.
//!
//! A task enters `Attempting` only once it holds a worker slot. The jitter
//! sleep and the wait for a slot happen in `Pending` (or `Retrying`), and the
//! slot is released as soon as the attempt settles.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use futures_util::StreamExt;
use serde::Serialize;
use tokio::fs::{File, OpenOptions};
use tokio::io::{AsyncWriteExt, BufWriter};
use tokio::sync::{Semaphore, SemaphorePermit};
use tracing::{debug, error, info, instrument, trace, warn};

use super::classify::{Classification, classify};
use super::constants::CHUNK_SIZE;
use super::headers::RequestDecorator;
use super::path::{allocate_excluding, infer_file_name};
use super::progress::DownloadObserver;
use super::retry::{RetryDecision, RetryPolicy, RetryState};
use super::transport::{BodyStream, Transport};
use super::DownloadError;

/// One URL to fetch and the file name it should be saved under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadRequest {
    url: String,
    file_name: String,
}

impl DownloadRequest {
    /// Creates a request, inferring the file name from the URL.
    pub fn new(url: impl Into<String>) -> Self {
        let url = url.into();
        let file_name = infer_file_name(&url);
        Self { url, file_name }
    }

    /// Creates a request with an explicit file name.
    pub fn with_file_name(url: impl Into<String>, file_name: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            file_name: file_name.into(),
        }
    }

    /// The URL to fetch.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// The desired file name.
    #[must_use]
    pub fn file_name(&self) -> &str {
        &self.file_name
    }
}

/// Terminal status of a download.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum OutcomeStatus {
    /// The file was fully written.
    Succeeded,
    /// Every attempt failed; carries the classified last failure.
    Failed(Classification),
}

/// Final record of one request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DownloadOutcome {
    /// The requested URL, unchanged.
    pub url: String,
    /// Where the file was saved, on success.
    pub path: Option<PathBuf>,
    /// Attempts made, including the successful one.
    pub attempts: u32,
    /// Success or classified failure.
    #[serde(flatten)]
    pub status: OutcomeStatus,
}

impl DownloadOutcome {
    /// Returns true if the download succeeded.
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self.status, OutcomeStatus::Succeeded)
    }

    /// The classified failure, if the download failed.
    #[must_use]
    pub fn failure(&self) -> Option<&Classification> {
        match &self.status {
            OutcomeStatus::Succeeded => None,
            OutcomeStatus::Failed(classification) => Some(classification),
        }
    }

    pub(crate) fn failed(url: impl Into<String>, attempts: u32, reason: Classification) -> Self {
        Self {
            url: url.into(),
            path: None,
            attempts,
            status: OutcomeStatus::Failed(reason),
        }
    }
}

/// States of a [`DownloadTask`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    /// Queued: waiting out the jitter delay and for a worker slot.
    Pending,
    /// Holding a worker slot: headers, fetch and write for the current attempt.
    Attempting,
    /// Waiting out the backoff, then jitter and a worker slot, before the next attempt.
    Retrying {
        /// Backoff delay.
        delay: Duration,
    },
    /// Terminal: the file was written.
    Succeeded,
    /// Terminal: no attempts remain.
    Exhausted,
}

impl TaskState {
    /// Returns true for `Succeeded` and `Exhausted`.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, TaskState::Succeeded | TaskState::Exhausted)
    }
}

/// Everything a task borrows from its engine run.
pub(crate) struct TaskContext {
    pub(crate) transport: Arc<dyn Transport>,
    pub(crate) decorator: RequestDecorator,
    pub(crate) policy: RetryPolicy,
    pub(crate) gate: Arc<Semaphore>,
    pub(crate) save_dir: PathBuf,
    pub(crate) observer: Arc<dyn DownloadObserver>,
}

/// Drives one [`DownloadRequest`] to a [`DownloadOutcome`].
#[derive(Debug)]
pub struct DownloadTask {
    id: usize,
    request: DownloadRequest,
    retry: RetryState,
    state: TaskState,
    saved_path: Option<PathBuf>,
    last_error: Option<DownloadError>,
}

impl DownloadTask {
    /// Creates a pending task.
    ///
    /// `id` identifies the task to observers; the engine uses the request's
    /// position in the batch.
    #[must_use]
    pub fn new(id: usize, request: DownloadRequest, policy: &RetryPolicy) -> Self {
        Self {
            id,
            request,
            retry: policy.start(),
            state: TaskState::Pending,
            saved_path: None,
            last_error: None,
        }
    }

    /// Observer-facing task id.
    #[must_use]
    pub fn id(&self) -> usize {
        self.id
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> TaskState {
        self.state
    }

    /// The request this task serves.
    #[must_use]
    pub fn request(&self) -> &DownloadRequest {
        &self.request
    }

    /// Runs the state machine to a terminal state.
    #[instrument(skip_all, fields(task = self.id, url = %self.request.url))]
    pub(crate) async fn run(mut self, ctx: &TaskContext) -> DownloadOutcome {
        let mut permit = None;
        while !self.state.is_terminal() {
            let next = match self.state {
                TaskState::Pending => self.admit(ctx, &mut permit).await,
                TaskState::Attempting => {
                    let next = self.attempt_and_decide(ctx).await;
                    drop(permit.take());
                    next
                }
                TaskState::Retrying { delay } => {
                    tokio::time::sleep(delay).await;
                    self.retry.advance();
                    self.admit(ctx, &mut permit).await
                }
                TaskState::Succeeded | TaskState::Exhausted => break,
            };
            trace!(from = ?self.state, to = ?next, attempt = self.retry.attempt(), "task transition");
            self.state = next;
        }

        let id = self.id;
        let outcome = self.into_outcome();
        ctx.observer.on_finish(id, &outcome);
        outcome
    }

    /// Sleeps the jitter delay, then waits for a worker slot.
    ///
    /// The task keeps its current state until the slot is granted.
    async fn admit<'a>(
        &mut self,
        ctx: &'a TaskContext,
        permit: &mut Option<SemaphorePermit<'a>>,
    ) -> TaskState {
        let jitter = ctx.policy.jitter_delay();
        debug!(
            attempt = self.retry.attempt(),
            jitter_ms = jitter.as_millis(),
            "waiting before request"
        );
        tokio::time::sleep(jitter).await;

        match ctx.gate.acquire().await {
            Ok(granted) => {
                *permit = Some(granted);
                TaskState::Attempting
            }
            Err(_) => {
                self.last_error = Some(DownloadError::other(
                    self.request.url.as_str(),
                    "admission gate closed",
                ));
                TaskState::Exhausted
            }
        }
    }

    async fn attempt_and_decide(&mut self, ctx: &TaskContext) -> TaskState {
        match self.attempt(ctx).await {
            Ok(path) => {
                info!(
                    path = %path.display(),
                    attempts = self.retry.attempts_made(),
                    "download completed"
                );
                self.saved_path = Some(path);
                TaskState::Succeeded
            }
            Err(e) => {
                let state = match ctx.policy.on_failure(&self.retry) {
                    RetryDecision::Retry {
                        delay,
                        next_attempt,
                    } => {
                        warn!(
                            file = %self.request.file_name,
                            attempt = next_attempt + 1,
                            max_attempts = self.retry.max_attempts(),
                            delay_ms = delay.as_millis(),
                            error = %e,
                            "retrying download"
                        );
                        ctx.observer.on_retry(
                            self.id,
                            &self.request.url,
                            next_attempt + 1,
                            delay,
                        );
                        TaskState::Retrying { delay }
                    }
                    RetryDecision::Exhausted => TaskState::Exhausted,
                };
                self.last_error = Some(e);
                state
            }
        }
    }

    /// One attempt: headers, fetch, write. The caller holds a worker slot.
    async fn attempt(&self, ctx: &TaskContext) -> Result<PathBuf, DownloadError> {
        let url = self.request.url.as_str();
        let headers = ctx.decorator.decorate()?;

        let response = ctx.transport.get(url, headers).await?;

        if response.status != 200 {
            return Err(DownloadError::http_status_with_reason(
                url,
                response.status,
                response.reason,
            ));
        }

        let (path, file) = create_destination(&ctx.save_dir, &self.request.file_name).await?;
        ctx.observer
            .on_start(self.id, url, &path, response.content_length);

        match stream_to_file(file, response.body, self.id, &path, ctx.observer.as_ref()).await {
            Ok(bytes) => {
                debug!(path = %path.display(), bytes, "body written");
                Ok(path)
            }
            Err(e) => {
                debug!(path = %path.display(), "cleaning up partial file after error");
                let _ = tokio::fs::remove_file(&path).await;
                Err(e)
            }
        }
    }

    fn into_outcome(self) -> DownloadOutcome {
        let attempts = self.retry.attempts_made();
        match (self.saved_path, self.last_error) {
            (Some(path), _) => DownloadOutcome {
                url: self.request.url,
                path: Some(path),
                attempts,
                status: OutcomeStatus::Succeeded,
            },
            (None, Some(e)) => {
                let classification = classify(&e);
                error!(
                    file = %self.request.file_name,
                    attempts,
                    code = classification.code,
                    "Failed to download {}: {}",
                    self.request.file_name,
                    classification.description
                );
                DownloadOutcome::failed(self.request.url, attempts, classification)
            }
            (None, None) => DownloadOutcome::failed(
                self.request.url,
                attempts,
                Classification::unknown("task ended without a result"),
            ),
        }
    }
}

/// Allocates a free path and creates it exclusively.
///
/// A sibling task may claim the allocated name between the probe and the
/// create; `create_new` catches that and allocation moves past the claimed
/// path. Every rejected path is remembered, so an entry the probe cannot see
/// is never offered twice.
async fn create_destination(dir: &Path, file_name: &str) -> Result<(PathBuf, File), DownloadError> {
    let mut claimed = Vec::new();
    loop {
        let path = allocate_excluding(dir, file_name, &claimed);
        match OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await
        {
            Ok(file) => return Ok((path, file)),
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                debug!(path = %path.display(), "path claimed concurrently, reallocating");
                claimed.push(path);
            }
            Err(e) => return Err(DownloadError::io(path, e)),
        }
    }
}

/// Streams the body to `file` through a fixed-size buffer, returning bytes written.
async fn stream_to_file(
    file: File,
    mut body: BodyStream,
    task: usize,
    path: &Path,
    observer: &dyn DownloadObserver,
) -> Result<u64, DownloadError> {
    let mut writer = BufWriter::with_capacity(CHUNK_SIZE, file);
    let mut bytes_written: u64 = 0;

    while let Some(chunk) = body.next().await {
        let chunk = chunk?;
        writer
            .write_all(&chunk)
            .await
            .map_err(|e| DownloadError::io(path, e))?;
        bytes_written += chunk.len() as u64;
        observer.on_progress(task, chunk.len() as u64);
    }

    writer
        .flush()
        .await
        .map_err(|e| DownloadError::io(path, e))?;

    Ok(bytes_written)
}
