//! HTTP transport used by download tasks.
//!
//! [`Transport`] is the seam between the retry state machine and the network:
//! tasks hand it a URL and a header set and get back a status plus a streamed
//! body. [`ReqwestTransport`] is the production implementation.

use std::io;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::StreamExt;
use futures_util::stream::BoxStream;
use reqwest::header::{CONTENT_TYPE, HeaderMap};
use reqwest::{Client, redirect};
use tracing::{debug, instrument};
use url::Url;

use super::DownloadError;
use super::constants::MAX_REDIRECTS;

/// Streamed response body.
pub type BodyStream = BoxStream<'static, Result<Bytes, DownloadError>>;

/// Response head plus streamed body.
pub struct FetchResponse {
    /// HTTP status code.
    pub status: u16,
    /// Reason phrase for `status`, when known.
    pub reason: Option<String>,
    /// `Content-Type` header, when present.
    pub content_type: Option<String>,
    /// `Content-Length` header, when present.
    pub content_length: Option<u64>,
    /// Body chunks.
    pub body: BodyStream,
}

impl std::fmt::Debug for FetchResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FetchResponse")
            .field("status", &self.status)
            .field("reason", &self.reason)
            .field("content_type", &self.content_type)
            .field("content_length", &self.content_length)
            .finish_non_exhaustive()
    }
}

/// Issues GET requests with caller-supplied headers.
///
/// Implementations must enforce their own connect and read timeouts and map
/// failures onto [`DownloadError`] variants.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Sends a GET request and returns the response head with a body stream.
    ///
    /// # Errors
    ///
    /// Returns a [`DownloadError`] when the request cannot be sent or no
    /// response head arrives. Non-200 statuses are NOT errors at this layer.
    async fn get(&self, url: &str, headers: HeaderMap) -> Result<FetchResponse, DownloadError>;
}

/// [`Transport`] backed by a pooled `reqwest` client.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    /// Builds a client with the given connect and read timeouts.
    ///
    /// # Errors
    ///
    /// Returns the builder error if the TLS backend cannot be initialized.
    pub fn new(connect_timeout: Duration, read_timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .connect_timeout(connect_timeout)
            .read_timeout(read_timeout)
            .redirect(redirect::Policy::limited(MAX_REDIRECTS))
            .gzip(true)
            .build()?;
        Ok(Self { client })
    }

    /// Returns a reference to the underlying reqwest client.
    #[must_use]
    pub fn inner(&self) -> &Client {
        &self.client
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    #[instrument(level = "debug", skip(self, headers), fields(url = %url))]
    async fn get(&self, url: &str, headers: HeaderMap) -> Result<FetchResponse, DownloadError> {
        let parsed = Url::parse(url).map_err(|_| DownloadError::invalid_url(url))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(DownloadError::invalid_url(url));
        }

        let response = self
            .client
            .get(parsed)
            .headers(headers)
            .send()
            .await
            .map_err(|e| map_reqwest_error(url, e))?;

        let status = response.status();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let content_length = response.content_length();
        debug!(status = status.as_u16(), ?content_length, "response received");

        let owned_url = url.to_string();
        let body = response
            .bytes_stream()
            .map(move |chunk| chunk.map_err(|e| map_reqwest_error(&owned_url, e)))
            .boxed();

        Ok(FetchResponse {
            status: status.as_u16(),
            reason: status.canonical_reason().map(str::to_string),
            content_type,
            content_length,
            body,
        })
    }
}

/// Maps a reqwest error onto the download taxonomy.
///
/// Connection resets and premature EOFs found anywhere in the source chain
/// count as server disconnects.
pub(crate) fn map_reqwest_error(url: &str, error: reqwest::Error) -> DownloadError {
    if error.is_timeout() {
        return DownloadError::timeout(url);
    }
    if error.is_redirect() {
        return DownloadError::too_many_redirects(url);
    }
    if error.is_builder() {
        return DownloadError::invalid_url(url);
    }
    if error.is_connect() {
        return DownloadError::connect(url, error);
    }
    if is_disconnect(&error) {
        return DownloadError::disconnected(url, error);
    }
    if error.is_body() || error.is_decode() {
        return DownloadError::payload(url, error);
    }
    DownloadError::network(url, error)
}

fn is_disconnect(error: &reqwest::Error) -> bool {
    let mut source = std::error::Error::source(error);
    while let Some(err) = source {
        if let Some(io_err) = err.downcast_ref::<io::Error>()
            && matches!(
                io_err.kind(),
                io::ErrorKind::ConnectionReset
                    | io::ErrorKind::ConnectionAborted
                    | io::ErrorKind::BrokenPipe
                    | io::ErrorKind::UnexpectedEof
            )
        {
            return true;
        }
        let text = err.to_string().to_lowercase();
        if text.contains("connection closed") || text.contains("incomplete message") {
            return true;
        }
        source = err.source();
    }
    false
}
