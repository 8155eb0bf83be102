//! Progress UI (per-file bars) for download runs.

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use fetcher_core::{DownloadObserver, DownloadOutcome};
use indicatif::{MultiProgress, ProgressBar, ProgressDrawTarget, ProgressStyle};

const BAR_TEMPLATE: &str =
    "{spinner} {wide_msg} {bytes:>10}/{total_bytes:<10} [{bar:30}] {bytes_per_sec:>12}";
const SPINNER_TEMPLATE: &str = "{spinner} {wide_msg} {bytes:>10} {bytes_per_sec:>12}";

/// Draws one progress bar per file being written.
///
/// Bars are keyed by task id, so a URL listed twice in one batch gets two
/// independent bars.
pub(crate) struct ProgressBars {
    multi: MultiProgress,
    bars: Mutex<HashMap<usize, ProgressBar>>,
}

impl ProgressBars {
    pub(crate) fn new() -> Self {
        Self::with_target(ProgressDrawTarget::stderr())
    }

    fn with_target(target: ProgressDrawTarget) -> Self {
        Self {
            multi: MultiProgress::with_draw_target(target),
            bars: Mutex::new(HashMap::new()),
        }
    }

    fn bars(&self) -> MutexGuard<'_, HashMap<usize, ProgressBar>> {
        self.bars.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn new_bar(&self, label: String, content_length: Option<u64>) -> ProgressBar {
        let bar = match content_length {
            Some(total) => {
                let bar = ProgressBar::new(total);
                bar.set_style(
                    ProgressStyle::with_template(BAR_TEMPLATE)
                        .unwrap_or_else(|_| ProgressStyle::default_bar())
                        .progress_chars("=> "),
                );
                bar
            }
            None => {
                let bar = ProgressBar::new_spinner();
                bar.set_style(
                    ProgressStyle::with_template(SPINNER_TEMPLATE)
                        .unwrap_or_else(|_| ProgressStyle::default_spinner()),
                );
                bar
            }
        };
        let bar = self.multi.add(bar);
        bar.set_message(label);
        bar.enable_steady_tick(Duration::from_millis(120));
        bar
    }

    #[cfg(test)]
    fn active(&self) -> usize {
        self.bars().len()
    }

    #[cfg(test)]
    fn position(&self, task: usize) -> Option<u64> {
        self.bars().get(&task).map(ProgressBar::position)
    }
}

impl DownloadObserver for ProgressBars {
    fn on_start(&self, task: usize, url: &str, path: &Path, content_length: Option<u64>) {
        let label = path
            .file_name()
            .map_or_else(|| url.to_string(), |name| name.to_string_lossy().into_owned());
        let bar = self.new_bar(label, content_length);
        if let Some(previous) = self.bars().insert(task, bar) {
            previous.finish_and_clear();
        }
    }

    fn on_progress(&self, task: usize, bytes: u64) {
        if let Some(bar) = self.bars().get(&task) {
            bar.inc(bytes);
        }
    }

    fn on_retry(&self, task: usize, url: &str, next_attempt: u32, delay: Duration) {
        // A failed attempt's bar is useless; the next attempt draws a fresh one.
        if let Some(bar) = self.bars().remove(&task) {
            bar.abandon_with_message(format!(
                "retrying {url} (attempt {next_attempt}) in {}s",
                delay.as_secs()
            ));
        }
    }

    fn on_finish(&self, task: usize, outcome: &DownloadOutcome) {
        let Some(bar) = self.bars().remove(&task) else {
            return;
        };
        match outcome.failure() {
            None => bar.finish(),
            Some(reason) => {
                bar.abandon_with_message(format!("{} failed: {}", outcome.url, reason.code));
            }
        }
    }
}
