//! Error types for the download module.
//!
//! [`DownloadError`] covers every failure a single fetch attempt can raise,
//! from the transport, the response checks, or the file system. Each variant
//! keeps the URL or path it concerns so the final log line is self-contained.

use std::path::PathBuf;

use reqwest::header::InvalidHeaderValue;
use thiserror::Error;

/// Boxed source error carried by transport-level variants.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors that can occur during a single download attempt.
#[derive(Debug, Error)]
pub enum DownloadError {
    /// The connection could not be established (refused, DNS, TLS handshake).
    #[error("connection error downloading {url}: {source}")]
    Connect {
        /// The URL that failed to connect.
        url: String,
        /// The underlying transport error.
        #[source]
        source: BoxError,
    },

    /// The server closed the connection before the response was complete.
    #[error("server disconnected downloading {url}: {source}")]
    Disconnected {
        /// The URL being downloaded.
        url: String,
        /// The underlying transport error.
        #[source]
        source: BoxError,
    },

    /// The response body could not be read or decoded.
    #[error("payload error downloading {url}: {source}")]
    Payload {
        /// The URL being downloaded.
        url: String,
        /// The underlying transport error.
        #[source]
        source: BoxError,
    },

    /// Any other network-level failure.
    #[error("network error downloading {url}: {source}")]
    Network {
        /// The URL being downloaded.
        url: String,
        /// The underlying transport error.
        #[source]
        source: BoxError,
    },

    /// Connect or read timed out.
    #[error("timeout downloading {url}")]
    Timeout {
        /// The URL that timed out.
        url: String,
    },

    /// The server answered with a status other than 200.
    #[error("HTTP {status} downloading {url}")]
    HttpStatus {
        /// The URL that returned the status.
        url: String,
        /// The HTTP status code.
        status: u16,
        /// Reason phrase or server message, when available.
        reason: Option<String>,
    },

    /// The redirect limit was exceeded.
    #[error("too many redirects downloading {url}")]
    TooManyRedirects {
        /// The URL that kept redirecting.
        url: String,
    },

    /// The response content type does not match the file the URL names.
    #[error("content type mismatch downloading {url}: expected {expected}, got {actual}")]
    ContentTypeMismatch {
        /// The URL being downloaded.
        url: String,
        /// What the URL's extension implies.
        expected: String,
        /// The `Content-Type` the server sent.
        actual: String,
    },

    /// The provided URL is malformed or uses an unsupported scheme.
    #[error("invalid URL: {url}")]
    InvalidUrl {
        /// The invalid URL string.
        url: String,
    },

    /// A request header value could not be represented.
    #[error("invalid value for header {header}: {source}")]
    InvalidHeader {
        /// Header name.
        header: &'static str,
        /// The underlying conversion error.
        #[source]
        source: InvalidHeaderValue,
    },

    /// File system error while creating or writing the destination.
    #[error("IO error writing to {path}: {source}")]
    Io {
        /// The file path where the error occurred.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// A failure that fits none of the other variants.
    #[error("unexpected error downloading {url}: {message}")]
    Other {
        /// The URL being downloaded.
        url: String,
        /// Description of what went wrong.
        message: String,
    },
}

impl DownloadError {
    /// Creates a connection error.
    pub fn connect(url: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Self::Connect {
            url: url.into(),
            source: source.into(),
        }
    }

    /// Creates a server-disconnected error.
    pub fn disconnected(url: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Self::Disconnected {
            url: url.into(),
            source: source.into(),
        }
    }

    /// Creates a payload error.
    pub fn payload(url: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Self::Payload {
            url: url.into(),
            source: source.into(),
        }
    }

    /// Creates a generic network error.
    pub fn network(url: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Self::Network {
            url: url.into(),
            source: source.into(),
        }
    }

    /// Creates a timeout error.
    pub fn timeout(url: impl Into<String>) -> Self {
        Self::Timeout { url: url.into() }
    }

    /// Creates an HTTP status error without a reason phrase.
    pub fn http_status(url: impl Into<String>, status: u16) -> Self {
        Self::HttpStatus {
            url: url.into(),
            status,
            reason: None,
        }
    }

    /// Creates an HTTP status error carrying the server's reason phrase.
    pub fn http_status_with_reason(
        url: impl Into<String>,
        status: u16,
        reason: Option<String>,
    ) -> Self {
        Self::HttpStatus {
            url: url.into(),
            status,
            reason,
        }
    }

    /// Creates a too-many-redirects error.
    pub fn too_many_redirects(url: impl Into<String>) -> Self {
        Self::TooManyRedirects { url: url.into() }
    }

    /// Creates a content type mismatch error.
    pub fn content_type_mismatch(
        url: impl Into<String>,
        expected: impl Into<String>,
        actual: impl Into<String>,
    ) -> Self {
        Self::ContentTypeMismatch {
            url: url.into(),
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    /// Creates an invalid URL error.
    pub fn invalid_url(url: impl Into<String>) -> Self {
        Self::InvalidUrl { url: url.into() }
    }

    /// Creates an invalid header error.
    pub fn invalid_header(header: &'static str, source: InvalidHeaderValue) -> Self {
        Self::InvalidHeader { header, source }
    }

    /// Creates an IO error.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Creates an error for an otherwise unrecognized failure.
    pub fn other(url: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Other {
            url: url.into(),
            message: message.into(),
        }
    }
}

// No `From<reqwest::Error>` or `From<std::io::Error>`: every variant needs the
// url or path context the source error lacks. See `transport::map_reqwest_error`.
