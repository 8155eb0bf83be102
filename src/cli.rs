//! CLI argument definitions using clap derive macros.

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use fetcher_core::DEFAULT_WORKERS;
use fetcher_core::download::constants::{CONNECT_TIMEOUT_SECS, READ_TIMEOUT_SECS};
use fetcher_core::user_agent::Browser;

/// Fetch a batch of files concurrently, retrying transient failures.
///
/// URLs come from positional arguments, an --input file, or stdin (one or
/// more per line; blank lines and `#` comments are ignored).
#[derive(Parser, Debug)]
#[command(name = "fetcher")]
#[command(author, version)]
pub struct Args {
    /// URLs to download
    pub urls: Vec<String>,

    /// Read URLs from a file
    #[arg(short, long, value_name = "FILE")]
    pub input: Option<PathBuf>,

    /// Directory to save files to (created if missing; default: current directory)
    #[arg(short, long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Maximum simultaneous downloads
    #[arg(short = 'w', long, default_value_t = DEFAULT_WORKERS)]
    pub workers: usize,

    /// Minimum random delay before each request, in seconds
    #[arg(long, default_value = "1", value_parser = parse_seconds)]
    pub min_delay: Duration,

    /// Maximum random delay before each request, in seconds
    #[arg(long, default_value = "5", value_parser = parse_seconds)]
    pub max_delay: Duration,

    /// Connect timeout in seconds
    #[arg(long, default_value_t = CONNECT_TIMEOUT_SECS, value_parser = clap::value_parser!(u64).range(1..))]
    pub connect_timeout: u64,

    /// Read timeout in seconds
    #[arg(long, default_value_t = READ_TIMEOUT_SECS, value_parser = clap::value_parser!(u64).range(1..))]
    pub read_timeout: u64,

    /// Send this User-Agent instead of rotating browser strings
    #[arg(long, value_name = "UA", conflicts_with = "browser")]
    pub user_agent: Option<String>,

    /// Rotate only among these browsers (comma-separated)
    #[arg(long, value_delimiter = ',')]
    pub browser: Vec<Browser>,

    /// Print the batch report as JSON on stdout
    #[arg(long)]
    pub json: bool,

    /// Disable per-file progress bars
    #[arg(long)]
    pub no_progress: bool,

    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long)]
    pub quiet: bool,
}

/// Parses a non-negative number of seconds, fractions allowed.
fn parse_seconds(value: &str) -> Result<Duration, String> {
    let seconds: f64 = value
        .trim()
        .parse()
        .map_err(|_| format!("'{value}' is not a number of seconds"))?;
    Duration::try_from_secs_f64(seconds).map_err(|e| format!("invalid delay '{value}': {e}"))
}
