//! HTTP transport boundary
//!
//! The classifier needs exactly one capability from the environment: a GET
//! with redirects disabled that returns status, headers and body, or a typed
//! failure. `Transport` captures that so tests can swap the network out.

use crate::config::HttpConfig;
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, COOKIE, LOCATION};
use reqwest::{redirect::Policy, Client};
use std::sync::Arc;
use thiserror::Error;

/// The first response for a request, exactly as the server sent it
#[derive(Debug, Clone)]
pub struct HttpResponse {
    /// HTTP status code
    pub status: u16,

    /// Response headers
    pub headers: HeaderMap,

    /// Response body decoded as text
    pub body: String,
}

impl HttpResponse {
    /// Creates an empty response with the given status
    pub fn new(status: u16) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body: String::new(),
        }
    }

    /// Sets the body
    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self
    }

    /// Sets the `Location` header
    ///
    /// Values that are not valid header text are ignored.
    pub fn with_location(mut self, location: &str) -> Self {
        if let Ok(value) = HeaderValue::from_str(location) {
            self.headers.insert(LOCATION, value);
        }
        self
    }

    /// The `Location` header, if present and readable
    pub fn location(&self) -> Option<&str> {
        self.headers
            .get(LOCATION)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
    }

    /// True for 3xx statuses
    pub fn is_redirect(&self) -> bool {
        (300..400).contains(&self.status)
    }
}

/// Transport-level failure
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("request timed out")]
    Timeout,

    #[error("connection error: {0}")]
    Connection(String),
}

/// Performs a single GET with redirect following disabled
#[async_trait]
pub trait Transport: Send + Sync {
    async fn get(&self, url: &str) -> Result<HttpResponse, TransportError>;
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for Arc<T> {
    async fn get(&self, url: &str) -> Result<HttpResponse, TransportError> {
        (**self).get(url).await
    }
}

/// Builds an HTTP client with proper configuration
///
/// Redirects are never followed: the classifier must see the first
/// response itself to tell a direct redirect from the interstitial.
///
/// # Example
///
/// ```no_run
/// use shortcode_sweep::config::HttpConfig;
/// use shortcode_sweep::resolver::build_http_client;
///
/// let client = build_http_client(&HttpConfig::default()).unwrap();
/// ```
pub fn build_http_client(config: &HttpConfig) -> Result<Client, reqwest::Error> {
    let mut headers = HeaderMap::new();
    if let Some(cookie) = &config.dismiss_cookie {
        match HeaderValue::from_str(cookie) {
            Ok(value) => {
                headers.insert(COOKIE, value);
            }
            Err(_) => tracing::warn!("Ignoring dismiss cookie with invalid characters"),
        }
    }

    let timeout = config.timeout();

    Client::builder()
        .user_agent(config.user_agent.as_str())
        .default_headers(headers)
        .timeout(timeout)
        .connect_timeout(timeout)
        .redirect(Policy::none())
        .gzip(true)
        .brotli(true)
        .build()
}

/// `Transport` backed by a reqwest client
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    /// Builds a transport from the session's HTTP settings
    pub fn new(config: &HttpConfig) -> Result<Self, reqwest::Error> {
        Ok(Self::from_client(build_http_client(config)?))
    }

    /// Wraps an existing client; it must not follow redirects
    pub fn from_client(client: Client) -> Self {
        Self { client }
    }
}

/// Maps a reqwest failure to the transport taxonomy
fn classify_error(error: reqwest::Error) -> TransportError {
    if error.is_timeout() {
        TransportError::Timeout
    } else {
        TransportError::Connection(error.to_string())
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn get(&self, url: &str) -> Result<HttpResponse, TransportError> {
        let response = self.client.get(url).send().await.map_err(classify_error)?;

        let status = response.status().as_u16();
        let headers = response.headers().clone();
        let body = response.text().await.map_err(classify_error)?;

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_http_client() {
        let client = build_http_client(&HttpConfig::default());
        assert!(client.is_ok());
    }

    #[test]
    fn test_build_http_client_bad_cookie() {
        let config = HttpConfig {
            dismiss_cookie: Some("bad\ncookie".to_string()),
            ..HttpConfig::default()
        };
        assert!(build_http_client(&config).is_ok());
    }

    #[test]
    fn test_response_location() {
        let response = HttpResponse::new(302).with_location("https://example.com/");
        assert_eq!(response.location(), Some("https://example.com/"));
        assert!(response.is_redirect());

        let response = HttpResponse::new(200).with_body("hello");
        assert_eq!(response.location(), None);
        assert!(!response.is_redirect());
        assert_eq!(response.body, "hello");
    }

    #[test]
    fn test_transport_error_display() {
        assert_eq!(TransportError::Timeout.to_string(), "request timed out");
        assert_eq!(
            TransportError::Connection("refused".to_string()).to_string(),
            "connection error: refused"
        );
    }
}
