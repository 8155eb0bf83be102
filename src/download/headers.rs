//! Per-request header assembly.

use std::sync::Arc;

use reqwest::header::{ACCEPT, ACCEPT_LANGUAGE, HeaderMap, HeaderValue, USER_AGENT};

use super::DownloadError;
use crate::user_agent::UserAgentProvider;

const ACCEPT_VALUE: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8";
const ACCEPT_LANGUAGE_VALUE: &str = "en-US,en;q=0.5";

/// Builds the header set sent with every fetch.
///
/// Each call asks the provider for a new User-Agent; nothing is cached.
#[derive(Clone)]
pub struct RequestDecorator {
    provider: Arc<dyn UserAgentProvider>,
}

impl std::fmt::Debug for RequestDecorator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestDecorator").finish_non_exhaustive()
    }
}

impl RequestDecorator {
    /// Creates a decorator backed by `provider`.
    pub fn new(provider: Arc<dyn UserAgentProvider>) -> Self {
        Self { provider }
    }

    /// Returns `User-Agent`, `Accept` and `Accept-Language` headers.
    ///
    /// # Errors
    ///
    /// Returns [`DownloadError::InvalidHeader`] if the provider hands back a
    /// string that is not a valid header value.
    pub fn decorate(&self) -> Result<HeaderMap, DownloadError> {
        let user_agent = HeaderValue::from_str(&self.provider.user_agent())
            .map_err(|e| DownloadError::invalid_header("User-Agent", e))?;

        let mut headers = HeaderMap::with_capacity(3);
        headers.insert(USER_AGENT, user_agent);
        headers.insert(ACCEPT, HeaderValue::from_static(ACCEPT_VALUE));
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static(ACCEPT_LANGUAGE_VALUE));
        Ok(headers)
    }
}
