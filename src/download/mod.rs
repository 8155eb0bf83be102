//! Concurrent download engine for batches of URLs.
//!
//! This module fetches many files at once under a bounded admission gate,
//! retrying each one independently with exponential backoff and saving it
//! to a collision-free path.
//!
//! # Features
//!
//! - Streaming downloads (memory-efficient for large files)
//! - Randomized pre-request jitter and browser User-Agent rotation
//! - Up to 3 attempts per URL with 1s, 2s backoff
//! - Failures classified into a stable taxonomy for reporting
//! - Duplicate filename handling (adds numeric suffix)
//!
//! # Example
//!
//! ```no_run
//! use fetcher_core::download::{DownloadEngine, EngineConfig};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let engine = DownloadEngine::new(EngineConfig::default())?;
//! let report = engine.run(["https://example.com/paper.pdf"]).await?;
//! for outcome in report.failures() {
//!     println!("{}: {}", outcome.url, outcome.failure().map_or("", |f| f.code));
//! }
//! # Ok(())
//! # }
//! ```

mod classify;
mod config;
pub mod constants;
mod engine;
mod error;
mod headers;
mod path;
mod progress;
mod retry;
mod task;
mod transport;

pub use classify::{Classification, ErrorCategory, classify};
pub use config::{ConfigError, EngineConfig, EngineConfigBuilder};
pub use constants::{DEFAULT_MAX_ATTEMPTS, DEFAULT_WORKERS};
pub use engine::{BatchReport, DownloadEngine, EngineError};
pub use error::{BoxError, DownloadError};
pub use headers::RequestDecorator;
pub use path::{allocate, infer_file_name};
pub use progress::{DownloadObserver, NoopObserver};
pub use retry::{JitterFn, RetryDecision, RetryPolicy, RetryState};
pub use task::{DownloadOutcome, DownloadRequest, DownloadTask, OutcomeStatus, TaskState};
pub use transport::{BodyStream, FetchResponse, ReqwestTransport, Transport};

// Note: we do NOT define module-local Result aliases.
// Use `Result<T, DownloadError>` explicitly in function signatures.
