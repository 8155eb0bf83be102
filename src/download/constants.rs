//! Constants for the download module (defaults, timeouts, buffer sizes).

use std::time::Duration;

/// Default number of simultaneously in-flight fetches.
pub const DEFAULT_WORKERS: usize = 8;

/// Default lower bound of the pre-request jitter delay.
pub const DEFAULT_MIN_DELAY: Duration = Duration::from_secs(1);

/// Default upper bound of the pre-request jitter delay.
pub const DEFAULT_MAX_DELAY: Duration = Duration::from_secs(5);

/// Default HTTP connect timeout (10 seconds).
pub const CONNECT_TIMEOUT_SECS: u64 = 10;

/// Default HTTP read timeout (60 seconds between body reads).
pub const READ_TIMEOUT_SECS: u64 = 60;

/// Default maximum attempts per URL, including the first.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Base unit of the exponential backoff (`unit * 2^attempt`).
pub const BACKOFF_UNIT: Duration = Duration::from_secs(1);

/// Write buffer size used while streaming a body to disk.
pub const CHUNK_SIZE: usize = 8192;

/// Maximum redirects followed before a fetch fails.
pub const MAX_REDIRECTS: usize = 10;

/// File name used when nothing usable can be inferred from a URL.
pub const FALLBACK_FILE_NAME: &str = "download.bin";
