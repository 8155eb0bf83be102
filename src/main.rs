//! CLI entry point for the fetcher tool.

use std::io::{self, IsTerminal, Read};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use fetcher_core::download::ReqwestTransport;
use fetcher_core::{
    BatchReport, DownloadEngine, EngineConfig, FixedUserAgent, RandomUserAgents,
    UserAgentProvider, parse_url_list,
};
use tracing::{debug, info, warn};

mod cli;
mod progress_ui;

use cli::Args;
use progress_ui::ProgressBars;

/// Exit status when the configuration is rejected before any download starts.
const EXIT_CONFIG_ERROR: u8 = 2;

#[tokio::main]
async fn main() -> Result<ExitCode> {
    // Parse CLI arguments first (before tracing, so --help works without logs)
    let args = Args::parse();

    // Determine log level based on verbose/quiet flags
    // Priority: RUST_LOG env var > quiet flag > verbose flag > default (info)
    let default_level = if args.quiet {
        "error"
    } else {
        match args.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();

    debug!(?args, "CLI arguments parsed");

    let config = match EngineConfig::builder()
        .worker_limit(args.workers)
        .delay_range(args.min_delay, args.max_delay)
        .connect_timeout(Duration::from_secs(args.connect_timeout))
        .read_timeout(Duration::from_secs(args.read_timeout))
        .save_dir(args.output_dir.clone().unwrap_or_else(|| PathBuf::from(".")))
        .build()
    {
        Ok(config) => config,
        Err(e) => {
            eprintln!("error: {e}");
            return Ok(ExitCode::from(EXIT_CONFIG_ERROR));
        }
    };

    let Some(input_text) = read_input(&args)? else {
        info!("No input provided. Pipe URLs via stdin or pass as arguments.");
        info!("Example: echo 'https://example.com/file.pdf' | fetcher");
        return Ok(ExitCode::SUCCESS);
    };

    let urls = parse_url_list(&input_text);
    if urls.is_empty() {
        info!("No URLs found in input");
        return Ok(ExitCode::SUCCESS);
    }
    info!(urls = urls.len(), "Parsed input");

    let transport = ReqwestTransport::new(config.connect_timeout(), config.read_timeout())
        .context("failed to build HTTP client")?;
    let user_agents: Arc<dyn UserAgentProvider> = match (&args.user_agent, args.browser.as_slice()) {
        (Some(ua), _) => Arc::new(FixedUserAgent::new(ua.clone())),
        (None, []) => Arc::new(RandomUserAgents::new()),
        (None, browsers) => Arc::new(RandomUserAgents::for_browsers(browsers)),
    };

    let mut engine = DownloadEngine::with_transport(config, Arc::new(transport), user_agents)?;
    if !args.no_progress && !args.quiet && !args.json && io::stderr().is_terminal() {
        engine = engine.with_observer(Arc::new(ProgressBars::new()));
    }

    let report = engine.run(urls).await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else if !args.quiet {
        print_summary(&report);
    }

    if report.is_success() {
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::FAILURE)
    }
}

/// Gathers input text from positional args, `--input`, and piped stdin.
///
/// Returns `None` when there is nothing to read.
fn read_input(args: &Args) -> Result<Option<String>> {
    let mut text = args.urls.join("\n");

    if let Some(path) = &args.input {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("cannot read input file {}", path.display()))?;
        text.push('\n');
        text.push_str(&contents);
    }

    if args.urls.is_empty() && args.input.is_none() {
        if io::stdin().is_terminal() {
            return Ok(None);
        }
        io::stdin()
            .read_to_string(&mut text)
            .context("cannot read URLs from stdin")?;
    }

    Ok(Some(text))
}

fn print_summary(report: &BatchReport) {
    for outcome in report.outcomes() {
        match (&outcome.path, outcome.failure()) {
            (Some(path), None) => println!("saved  {} -> {}", outcome.url, path.display()),
            (_, Some(reason)) => println!(
                "failed {} [{}] {} after {} attempt(s)",
                outcome.url, reason.code, reason.description, outcome.attempts
            ),
            (None, None) => warn!(url = %outcome.url, "succeeded without a saved path"),
        }
    }
    println!(
        "{} succeeded, {} failed, {} total",
        report.succeeded(),
        report.failed(),
        report.total()
    );
}
