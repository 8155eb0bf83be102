//! In-memory `Transport` that replays scripted replies per URL.
//!
//! Pair it with `#[tokio::test(start_paused = true)]`: every call is stamped
//! with `tokio::time::Instant`, so jitter and backoff gaps can be asserted
//! exactly.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use fetcher_core::{DownloadError, FetchResponse, Transport};
use futures_util::StreamExt;
use futures_util::stream;
use reqwest::header::{HeaderMap, USER_AGENT};
use tokio::time::Instant;

/// One scripted reply.
#[derive(Clone)]
pub enum Step {
    /// Respond with a status, optional content type, and body chunks.
    Respond {
        status: u16,
        content_type: Option<&'static str>,
        chunks: Vec<Bytes>,
    },
    /// Fail before a response head arrives.
    Fail(fn(&str) -> DownloadError),
}

impl Step {
    pub fn ok(body: &'static [u8]) -> Self {
        Self::Respond {
            status: 200,
            content_type: None,
            chunks: vec![Bytes::from_static(body)],
        }
    }

    pub fn status(status: u16) -> Self {
        Self::Respond {
            status,
            content_type: None,
            chunks: Vec::new(),
        }
    }

    pub fn html() -> Self {
        Self::Respond {
            status: 200,
            content_type: Some("text/html; charset=utf-8"),
            chunks: vec![Bytes::from_static(b"<html>sign in</html>")],
        }
    }

    pub fn refused() -> Self {
        Self::Fail(|url| {
            DownloadError::connect(
                url,
                std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "connection refused"),
            )
        })
    }
}

/// A request the transport received.
#[derive(Debug, Clone)]
pub struct Call {
    pub url: String,
    pub at: Instant,
    pub user_agent: Option<String>,
}

/// Scripted transport.
///
/// Each URL replays its steps in order and then repeats the last one. URLs
/// without a script get `200 ok`.
pub struct ScriptedTransport {
    scripts: Mutex<HashMap<String, VecDeque<Step>>>,
    latency: Duration,
    calls: Mutex<Vec<Call>>,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self {
            scripts: Mutex::new(HashMap::new()),
            latency: Duration::ZERO,
            calls: Mutex::new(Vec::new()),
            in_flight: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        }
    }

    /// Every call waits `latency` before answering.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn script(self, url: &str, steps: Vec<Step>) -> Self {
        self.scripts
            .lock()
            .unwrap()
            .insert(url.to_string(), steps.into());
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_for(&self, url: &str) -> Vec<Call> {
        self.calls().into_iter().filter(|c| c.url == url).collect()
    }

    /// Highest number of `get` calls that were in progress at once.
    pub fn peak_in_flight(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    fn next_step(&self, url: &str) -> Step {
        let mut scripts = self.scripts.lock().unwrap();
        match scripts.get_mut(url) {
            Some(steps) if steps.len() > 1 => steps.pop_front().unwrap(),
            Some(steps) => steps.front().cloned().unwrap_or_else(|| Step::ok(b"ok")),
            None => Step::ok(b"ok"),
        }
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn get(&self, url: &str, headers: HeaderMap) -> Result<FetchResponse, DownloadError> {
        self.calls.lock().unwrap().push(Call {
            url: url.to_string(),
            at: Instant::now(),
            user_agent: headers
                .get(USER_AGENT)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string),
        });

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        match self.next_step(url) {
            Step::Fail(make) => Err(make(url)),
            Step::Respond {
                status,
                content_type,
                chunks,
            } => {
                let content_length = Some(chunks.iter().map(|c| c.len() as u64).sum());
                Ok(FetchResponse {
                    status,
                    reason: match status {
                        404 => Some("Not Found".to_string()),
                        500 => Some("Internal Server Error".to_string()),
                        _ => None,
                    },
                    content_type: content_type.map(str::to_string),
                    content_length,
                    body: stream::iter(chunks.into_iter().map(Ok)).boxed(),
                })
            }
        }
    }
}
