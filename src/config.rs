//! Client Configuration
//!
//! Base URL and transport settings for built clients. Everything here is
//! passed through to the transport opaquely; the binding core attaches
//! default headers to each request and nothing else.

use std::time::Duration;

use url::Url;

/// Default request timeout in seconds.
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Configuration for an API client.
///
/// When `base_url` is unset, the first `servers` entry of the document
/// is used.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: Option<Url>,
    pub default_headers: Vec<(String, String)>,
    pub timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            default_headers: Vec::new(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

impl ClientConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the base URL, overriding the document's `servers` entry.
    pub fn base_url(mut self, url: Url) -> Self {
        self.base_url = Some(url);
        self
    }

    /// Add a header sent with every request (e.g. authentication).
    pub fn default_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.default_headers.push((name.into(), value.into()));
        self
    }

    /// Set the request timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_chain() {
        let config = ClientConfig::new()
            .base_url(Url::parse("https://api.example.com/v1").unwrap())
            .default_header("Authorization", "Bearer token")
            .timeout(Duration::from_secs(5));

        assert_eq!(
            config.base_url.as_ref().map(Url::as_str),
            Some("https://api.example.com/v1")
        );
        assert_eq!(config.default_headers.len(), 1);
        assert_eq!(config.timeout, Duration::from_secs(5));
    }
}
