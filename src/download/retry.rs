//! Retry timing for a single download: pre-request jitter and exponential backoff.
//!
//! A [`RetryPolicy`] is built once per engine run and shared by every task of
//! that run. The jitter source is injectable; tests swap in a deterministic
//! function.
//!
//! # Timeline of one task (defaults)
//!
//! ```text
//! jitter -> attempt 0 -x-> backoff 1u -> jitter -> attempt 1 -x-> backoff 2u -> jitter -> attempt 2 -x-> exhausted
//! ```
//!
//! Every attempt, the first included, is preceded by a jitter delay drawn from
//! `[min_delay, max_delay]`. Backoff only follows a failed attempt that is not
//! the last one.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use tracing::debug;

use super::constants::{BACKOFF_UNIT, DEFAULT_MAX_ATTEMPTS};

/// Function producing a jitter delay inside `[min, max]`.
pub type JitterFn = Arc<dyn Fn(Duration, Duration) -> Duration + Send + Sync>;

/// Per-task attempt bookkeeping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryState {
    attempt: u32,
    max_attempts: u32,
}

impl RetryState {
    /// Starts at attempt 0.
    #[must_use]
    pub fn new(max_attempts: u32) -> Self {
        Self {
            attempt: 0,
            max_attempts: max_attempts.max(1),
        }
    }

    /// Current attempt index (0-based).
    #[must_use]
    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    /// Attempts made so far, counting the current one.
    #[must_use]
    pub fn attempts_made(&self) -> u32 {
        self.attempt + 1
    }

    /// Maximum attempts allowed.
    #[must_use]
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Returns true when the current attempt is the last allowed one.
    #[must_use]
    pub fn is_last(&self) -> bool {
        self.attempts_made() >= self.max_attempts
    }

    pub(crate) fn advance(&mut self) {
        self.attempt += 1;
    }
}

/// What to do after a failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Sleep for `delay`, then run attempt `next_attempt` (0-based).
    Retry {
        /// Backoff delay before the next attempt.
        delay: Duration,
        /// Index of the next attempt.
        next_attempt: u32,
    },
    /// No attempts remain.
    Exhausted,
}

/// Jitter and backoff configuration for one engine run.
///
/// # Default Values
///
/// - `max_attempts`: 3
/// - `backoff_unit`: 1 second (backoffs of 1s, 2s)
/// - jitter: uniform in `[min_delay, max_delay]`
#[derive(Clone)]
pub struct RetryPolicy {
    min_delay: Duration,
    max_delay: Duration,
    max_attempts: u32,
    backoff_unit: Duration,
    jitter: JitterFn,
}

impl fmt::Debug for RetryPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryPolicy")
            .field("min_delay", &self.min_delay)
            .field("max_delay", &self.max_delay)
            .field("max_attempts", &self.max_attempts)
            .field("backoff_unit", &self.backoff_unit)
            .finish_non_exhaustive()
    }
}

impl RetryPolicy {
    /// Creates a policy with uniform random jitter in `[min_delay, max_delay]`.
    ///
    /// Bounds given in the wrong order are swapped; [`EngineConfig`](super::EngineConfig)
    /// rejects them before a policy is ever built from it.
    #[must_use]
    pub fn new(min_delay: Duration, max_delay: Duration) -> Self {
        let (min_delay, max_delay) = if min_delay <= max_delay {
            (min_delay, max_delay)
        } else {
            (max_delay, min_delay)
        };
        Self {
            min_delay,
            max_delay,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            backoff_unit: BACKOFF_UNIT,
            jitter: Arc::new(uniform_jitter),
        }
    }

    /// Sets the maximum number of attempts (minimum 1).
    #[must_use]
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    /// Sets the backoff unit; the delay after attempt `n` is `unit * 2^n`.
    #[must_use]
    pub fn with_backoff_unit(mut self, unit: Duration) -> Self {
        self.backoff_unit = unit;
        self
    }

    /// Replaces the jitter source.
    #[must_use]
    pub fn with_jitter_fn<F>(mut self, jitter: F) -> Self
    where
        F: Fn(Duration, Duration) -> Duration + Send + Sync + 'static,
    {
        self.jitter = Arc::new(jitter);
        self
    }

    /// Maximum attempts per task.
    #[must_use]
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Lower jitter bound.
    #[must_use]
    pub fn min_delay(&self) -> Duration {
        self.min_delay
    }

    /// Upper jitter bound.
    #[must_use]
    pub fn max_delay(&self) -> Duration {
        self.max_delay
    }

    /// Fresh retry state for a new task.
    #[must_use]
    pub fn start(&self) -> RetryState {
        RetryState::new(self.max_attempts)
    }

    /// Delay applied before every attempt.
    #[must_use]
    pub fn jitter_delay(&self) -> Duration {
        (self.jitter)(self.min_delay, self.max_delay)
    }

    /// Backoff after failed attempt `attempt` (0-based): `unit * 2^attempt`.
    #[must_use]
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        let factor = 1u32.checked_shl(attempt).unwrap_or(u32::MAX);
        self.backoff_unit.saturating_mul(factor)
    }

    /// Decides what follows a failed attempt.
    #[must_use]
    pub fn on_failure(&self, state: &RetryState) -> RetryDecision {
        if state.is_last() {
            debug!(
                attempts = state.attempts_made(),
                max = state.max_attempts(),
                "max attempts reached"
            );
            return RetryDecision::Exhausted;
        }

        let delay = self.backoff_delay(state.attempt());
        debug!(
            attempt = state.attempt(),
            next_attempt = state.attempt() + 1,
            delay_ms = delay.as_millis(),
            "will retry"
        );
        RetryDecision::Retry {
            delay,
            next_attempt: state.attempt() + 1,
        }
    }
}

fn uniform_jitter(min: Duration, max: Duration) -> Duration {
    if min >= max {
        return min;
    }
    rand::thread_rng().gen_range(min..=max)
}
