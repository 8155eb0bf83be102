//! Fetcher Core Library
//!
//! This library provides the core functionality for the fetcher tool, which
//! downloads a batch of remote files concurrently, retrying transient failures
//! and saving each file under a collision-free name.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//! - [`download`] - Concurrent download engine, retry policy, error taxonomy
//! - [`input`] - URL list parsing from arguments, files, or stdin
//! - [`user_agent`] - User-Agent providers rotated per request

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![warn(missing_docs)]

pub mod download;
pub mod input;
pub mod user_agent;

// Re-export commonly used types
pub use download::{
    BatchReport, Classification, ConfigError, DEFAULT_MAX_ATTEMPTS, DEFAULT_WORKERS,
    DownloadEngine, DownloadError, DownloadObserver, DownloadOutcome, DownloadRequest,
    EngineConfig, EngineError, ErrorCategory, FetchResponse, OutcomeStatus, RetryPolicy,
    Transport, classify,
};
pub use input::parse_url_list;
pub use user_agent::{FixedUserAgent, RandomUserAgents, UserAgentProvider};
