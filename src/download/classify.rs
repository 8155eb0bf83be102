//! Maps download failures onto a stable, human-readable taxonomy.
//!
//! Classification is purely diagnostic: it runs once a task is exhausted and
//! never feeds back into retry decisions.
//!
//! | Error | Category |
//! |-------|----------|
//! | `Connect` | Connection Error |
//! | `Disconnected` | Server Disconnected |
//! | `Payload` | Payload Error |
//! | `Network` | Network/Server Error |
//! | `Timeout` | Timeout |
//! | `HttpStatus` | HTTP Response Error (status + reason) |
//! | `TooManyRedirects` | Too Many Redirects |
//! | `ContentTypeMismatch` | Content-Type Mismatch |
//! | `InvalidUrl` | Invalid Input |
//! | `InvalidHeader` | Type Error |
//! | `Io` with an OS error code | OS Error |
//! | `Io` without one | I/O Error |
//! | `Other` | Unknown |

use std::fmt;

use serde::Serialize;

use super::DownloadError;

/// Failure category of an exhausted download.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ErrorCategory {
    /// The TCP or TLS connection could not be established.
    ConnectionError,
    /// The server closed the connection before the body was complete.
    ServerDisconnected,
    /// The body was malformed, e.g. a bad chunked or compressed encoding.
    PayloadError,
    /// Any other transport-level failure.
    NetworkError,
    /// Connect or read timeout elapsed.
    Timeout,
    /// A response arrived with a status other than 200.
    HttpError {
        /// HTTP status code.
        status: u16,
        /// Reason phrase or server message, when available.
        message: Option<String>,
    },
    /// The redirect chain exceeded the client's limit.
    TooManyRedirects,
    /// The response content type contradicts the file the URL names.
    ContentTypeMismatch,
    /// The URL could not be parsed.
    InvalidInput,
    /// A request header value was not valid.
    TypeError,
    /// A filesystem call failed with an OS error code.
    OsError,
    /// A filesystem call failed without an OS error code.
    IoError,
    /// Anything not covered above.
    Unknown,
}

impl ErrorCategory {
    /// Stable machine-readable code.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::ConnectionError => "connection_error",
            Self::ServerDisconnected => "server_disconnected",
            Self::PayloadError => "payload_error",
            Self::NetworkError => "network_error",
            Self::Timeout => "timeout",
            Self::HttpError { .. } => "http_error",
            Self::TooManyRedirects => "too_many_redirects",
            Self::ContentTypeMismatch => "content_type_mismatch",
            Self::InvalidInput => "invalid_input",
            Self::TypeError => "type_error",
            Self::OsError => "os_error",
            Self::IoError => "io_error",
            Self::Unknown => "unknown",
        }
    }

    /// Human-readable category name.
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::ConnectionError => "Connection Error",
            Self::ServerDisconnected => "Server Disconnected",
            Self::PayloadError => "Payload Error",
            Self::NetworkError => "Network/Server Error",
            Self::Timeout => "Timeout",
            Self::HttpError { .. } => "HTTP Response Error",
            Self::TooManyRedirects => "Too Many Redirects",
            Self::ContentTypeMismatch => "Content-Type Mismatch",
            Self::InvalidInput => "Invalid Input",
            Self::TypeError => "Type Error",
            Self::OsError => "OS Error",
            Self::IoError => "I/O Error",
            Self::Unknown => "Unknown Error",
        }
    }

    fn explanation(&self) -> String {
        match self {
            Self::ConnectionError => "unable to connect to the server".to_string(),
            Self::ServerDisconnected => "the server closed the connection unexpectedly".to_string(),
            Self::PayloadError => "error in the response payload".to_string(),
            Self::NetworkError => "network or server error".to_string(),
            Self::Timeout => "the request exceeded the allowed time".to_string(),
            Self::HttpError { status, message } => match message {
                Some(message) => format!("HTTP {status}: {message}"),
                None => format!("HTTP {status}"),
            },
            Self::TooManyRedirects => {
                "the request exceeded the maximum number of redirects".to_string()
            }
            Self::ContentTypeMismatch => {
                "the response content type does not match the expected type".to_string()
            }
            Self::InvalidInput => "invalid URL or other input error".to_string(),
            Self::TypeError => "a value of the wrong form was supplied".to_string(),
            Self::OsError => "operating system error, such as file access issues".to_string(),
            Self::IoError => "input/output error, such as a failed file write".to_string(),
            Self::Unknown => "an unexpected error occurred".to_string(),
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Classified failure: stable code, category, and description.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Classification {
    /// Stable machine-readable code (see [`ErrorCategory::code`]).
    pub code: &'static str,
    /// Failure category.
    pub category: ErrorCategory,
    /// Human-readable description, including the underlying error message.
    pub description: String,
}

impl Classification {
    fn new(category: ErrorCategory, error: &dyn fmt::Display) -> Self {
        let description = format!("{error} ({}: {})", category.label(), category.explanation());
        Self {
            code: category.code(),
            category,
            description,
        }
    }

    /// Classification for a failure that never produced a [`DownloadError`],
    /// such as a panicked task.
    #[must_use]
    pub fn unknown(message: &str) -> Self {
        Self::new(ErrorCategory::Unknown, &message)
    }
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.description)
    }
}

/// Classifies a download failure.
#[must_use]
pub fn classify(error: &DownloadError) -> Classification {
    Classification::new(category_of(error), error)
}

fn category_of(error: &DownloadError) -> ErrorCategory {
    match error {
        DownloadError::Connect { .. } => ErrorCategory::ConnectionError,
        DownloadError::Disconnected { .. } => ErrorCategory::ServerDisconnected,
        DownloadError::Payload { .. } => ErrorCategory::PayloadError,
        DownloadError::Network { .. } => ErrorCategory::NetworkError,
        DownloadError::Timeout { .. } => ErrorCategory::Timeout,
        DownloadError::HttpStatus { status, reason, .. } => ErrorCategory::HttpError {
            status: *status,
            message: reason.clone(),
        },
        DownloadError::TooManyRedirects { .. } => ErrorCategory::TooManyRedirects,
        DownloadError::ContentTypeMismatch { .. } => ErrorCategory::ContentTypeMismatch,
        DownloadError::InvalidUrl { .. } => ErrorCategory::InvalidInput,
        DownloadError::InvalidHeader { .. } => ErrorCategory::TypeError,
        DownloadError::Io { source, .. } => {
            if source.raw_os_error().is_some() {
                ErrorCategory::OsError
            } else {
                ErrorCategory::IoError
            }
        }
        DownloadError::Other { .. } => ErrorCategory::Unknown,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::io;

    use reqwest::header::HeaderValue;

    use super::*;

    const URL: &str = "http://example.com/file.bin";

    #[test]
    fn test_classify_connection_refused() {
        let error = DownloadError::connect(URL, "Connection refused (os error 111)");
        let classification = classify(&error);
        assert_eq!(classification.category, ErrorCategory::ConnectionError);
        assert_eq!(classification.code, "connection_error");
        assert!(classification.description.contains("Connection Error"));
    }

    #[test]
    fn test_classify_http_404_carries_status() {
        let error = DownloadError::http_status_with_reason(URL, 404, Some("Not Found".into()));
        let classification = classify(&error);
        assert_eq!(
            classification.category,
            ErrorCategory::HttpError {
                status: 404,
                message: Some("Not Found".into())
            }
        );
        assert!(classification.description.contains("HTTP 404: Not Found"));
    }

    #[test]
    fn test_classify_unrecognized_is_unknown() {
        let error = DownloadError::other(URL, "task state corrupted");
        let classification = classify(&error);
        assert_eq!(classification.category, ErrorCategory::Unknown);
        assert_eq!(classification.code, "unknown");
    }

    #[test]
    fn test_classify_transport_variants() {
        let cases = [
            (DownloadError::disconnected(URL, "reset"), "server_disconnected"),
            (DownloadError::payload(URL, "bad chunk"), "payload_error"),
            (DownloadError::network(URL, "boom"), "network_error"),
            (DownloadError::timeout(URL), "timeout"),
            (DownloadError::too_many_redirects(URL), "too_many_redirects"),
            (
                DownloadError::content_type_mismatch(URL, "application/pdf", "text/html"),
                "content_type_mismatch",
            ),
            (DownloadError::invalid_url("::nope"), "invalid_input"),
        ];
        for (error, code) in cases {
            assert_eq!(classify(&error).code, code, "for {error}");
        }
    }

    #[test]
    fn test_classify_invalid_header_is_type_error() {
        let source = HeaderValue::from_str("bad\nvalue").unwrap_err();
        let error = DownloadError::invalid_header("User-Agent", source);
        assert_eq!(classify(&error).category, ErrorCategory::TypeError);
    }

    #[test]
    fn test_classify_io_with_os_code_is_os_error() {
        let error = DownloadError::io("/tmp/x", io::Error::from_raw_os_error(13));
        assert_eq!(classify(&error).category, ErrorCategory::OsError);
    }

    #[test]
    fn test_classify_io_without_os_code_is_io_error() {
        let error = DownloadError::io("/tmp/x", io::Error::new(io::ErrorKind::WriteZero, "short"));
        assert_eq!(classify(&error).category, ErrorCategory::IoError);
    }

    #[test]
    fn test_classification_is_deterministic() {
        let a = classify(&DownloadError::timeout(URL));
        let b = classify(&DownloadError::timeout(URL));
        assert_eq!(a, b);
    }

    #[test]
    fn test_classification_serializes_with_kind_tag() {
        let classification = classify(&DownloadError::http_status(URL, 503));
        let json = serde_json::to_value(&classification).unwrap();
        assert_eq!(json["code"], "http_error");
        assert_eq!(json["category"]["kind"], "http_error");
        assert_eq!(json["category"]["status"], 503);
    }
}
