//! Engine configuration and its eager validation.

use std::path::{Path, PathBuf};
use std::time::Duration;

use thiserror::Error;

use super::constants::{
    CONNECT_TIMEOUT_SECS, DEFAULT_MAX_DELAY, DEFAULT_MIN_DELAY, DEFAULT_WORKERS, READ_TIMEOUT_SECS,
};

/// Rejected engine configuration.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// The worker limit must be at least 1.
    #[error("invalid worker limit {value}: must be at least 1")]
    InvalidWorkerLimit {
        /// The rejected value.
        value: usize,
    },

    /// The jitter bounds are in the wrong order.
    #[error("min_delay ({min:?}) must be <= max_delay ({max:?})")]
    InvalidDelayRange {
        /// Requested lower bound.
        min: Duration,
        /// Requested upper bound.
        max: Duration,
    },

    /// A timeout of zero would fail every request.
    #[error("{name} must be greater than zero")]
    ZeroTimeout {
        /// Which timeout was zero.
        name: &'static str,
    },
}

/// Immutable settings for one [`DownloadEngine`](super::DownloadEngine).
///
/// Built through [`EngineConfig::builder`], which validates every bound before
/// returning, so an `EngineConfig` value is always usable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    worker_limit: usize,
    min_delay: Duration,
    max_delay: Duration,
    connect_timeout: Duration,
    read_timeout: Duration,
    save_dir: PathBuf,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            worker_limit: DEFAULT_WORKERS,
            min_delay: DEFAULT_MIN_DELAY,
            max_delay: DEFAULT_MAX_DELAY,
            connect_timeout: Duration::from_secs(CONNECT_TIMEOUT_SECS),
            read_timeout: Duration::from_secs(READ_TIMEOUT_SECS),
            save_dir: PathBuf::from("."),
        }
    }
}

impl EngineConfig {
    /// Starts a builder populated with the defaults.
    #[must_use]
    pub fn builder() -> EngineConfigBuilder {
        EngineConfigBuilder {
            config: Self::default(),
        }
    }

    /// Maximum simultaneously in-flight fetches.
    #[must_use]
    pub fn worker_limit(&self) -> usize {
        self.worker_limit
    }

    /// Lower bound of the pre-request jitter.
    #[must_use]
    pub fn min_delay(&self) -> Duration {
        self.min_delay
    }

    /// Upper bound of the pre-request jitter.
    #[must_use]
    pub fn max_delay(&self) -> Duration {
        self.max_delay
    }

    /// Connect timeout for each fetch.
    #[must_use]
    pub fn connect_timeout(&self) -> Duration {
        self.connect_timeout
    }

    /// Read timeout for each fetch.
    #[must_use]
    pub fn read_timeout(&self) -> Duration {
        self.read_timeout
    }

    /// Directory downloaded files are written to.
    #[must_use]
    pub fn save_dir(&self) -> &Path {
        &self.save_dir
    }

    /// Checks every bound.
    ///
    /// # Errors
    ///
    /// Returns the first [`ConfigError`] found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.worker_limit == 0 {
            return Err(ConfigError::InvalidWorkerLimit {
                value: self.worker_limit,
            });
        }
        if self.min_delay > self.max_delay {
            return Err(ConfigError::InvalidDelayRange {
                min: self.min_delay,
                max: self.max_delay,
            });
        }
        if self.connect_timeout.is_zero() {
            return Err(ConfigError::ZeroTimeout {
                name: "connect_timeout",
            });
        }
        if self.read_timeout.is_zero() {
            return Err(ConfigError::ZeroTimeout {
                name: "read_timeout",
            });
        }
        Ok(())
    }
}

/// Builder for [`EngineConfig`].
#[derive(Debug, Clone)]
#[must_use]
pub struct EngineConfigBuilder {
    config: EngineConfig,
}

impl EngineConfigBuilder {
    /// Sets the worker limit.
    pub fn worker_limit(mut self, value: usize) -> Self {
        self.config.worker_limit = value;
        self
    }

    /// Sets both jitter bounds.
    pub fn delay_range(mut self, min: Duration, max: Duration) -> Self {
        self.config.min_delay = min;
        self.config.max_delay = max;
        self
    }

    /// Sets the lower jitter bound.
    pub fn min_delay(mut self, value: Duration) -> Self {
        self.config.min_delay = value;
        self
    }

    /// Sets the upper jitter bound.
    pub fn max_delay(mut self, value: Duration) -> Self {
        self.config.max_delay = value;
        self
    }

    /// Sets the connect timeout.
    pub fn connect_timeout(mut self, value: Duration) -> Self {
        self.config.connect_timeout = value;
        self
    }

    /// Sets the read timeout.
    pub fn read_timeout(mut self, value: Duration) -> Self {
        self.config.read_timeout = value;
        self
    }

    /// Sets the save directory.
    pub fn save_dir(mut self, value: impl Into<PathBuf>) -> Self {
        self.config.save_dir = value.into();
        self
    }

    /// Validates and returns the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if any bound is invalid.
    pub fn build(self) -> Result<EngineConfig, ConfigError> {
        self.config.validate()?;
        Ok(self.config)
    }
}
