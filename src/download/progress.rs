//! Hooks for observing download progress.

use std::path::Path;
use std::time::Duration;

use super::DownloadOutcome;

/// Receives progress notifications from running download tasks.
///
/// `task` identifies the download within one engine run (its position in the
/// batch), so a URL listed twice reports under two distinct ids.
///
/// Every method has a no-op default. Callbacks run on the task's thread, so
/// implementations should return quickly.
pub trait DownloadObserver: Send + Sync {
    /// A 200 response for `url` arrived and the body is about to be written to `path`.
    fn on_start(&self, _task: usize, _url: &str, _path: &Path, _content_length: Option<u64>) {}

    /// `bytes` more bytes were written.
    fn on_progress(&self, _task: usize, _bytes: u64) {}

    /// An attempt failed; attempt `next_attempt` (1-based) follows after `delay`.
    fn on_retry(&self, _task: usize, _url: &str, _next_attempt: u32, _delay: Duration) {}

    /// The task settled.
    fn on_finish(&self, _task: usize, _outcome: &DownloadOutcome) {}
}

/// Observer that ignores every notification.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl DownloadObserver for NoopObserver {}
