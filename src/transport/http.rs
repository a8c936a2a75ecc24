//! `reqwest`-backed HTTP transport
//!
//! [`ReqwestTransport`] is the transport used outside of tests. It applies a
//! fixed per-request timeout and reports timeouts and connection failures as
//! transport errors. It never retries.

use std::time::Duration;

use crate::error::{OAuth2Error, Result};
use crate::transport::{HttpMethod, HttpRequest, HttpResponse, HttpTransport};

/// Request timeout of the reference deployment
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(2);

/// HTTP transport backed by a shared [`reqwest::Client`]
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use twin23_oauth2::transport::ReqwestTransport;
///
/// let transport = ReqwestTransport::new(Duration::from_secs(2)).unwrap();
/// assert_eq!(transport.timeout(), Duration::from_secs(2));
/// ```
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
    timeout: Duration,
}

impl ReqwestTransport {
    /// Creates a transport whose requests fail after `timeout`
    ///
    /// # Errors
    ///
    /// Returns [`OAuth2Error::Transport`] if the underlying client cannot be
    /// built (for example when the TLS backend fails to initialize).
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("twin23-oauth2/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| OAuth2Error::Transport(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { client, timeout })
    }

    /// The per-request timeout
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Maps a send or body-read failure; timeouts and connection failures
    /// become [`OAuth2Error::Transport`].
    fn map_error(&self, url: &url::Url, e: reqwest::Error) -> OAuth2Error {
        if e.is_timeout() {
            OAuth2Error::Transport(format!(
                "request to {} timed out after {:?}",
                url.path(),
                self.timeout
            ))
        } else if e.is_connect() {
            OAuth2Error::Transport(format!(
                "failed to connect to {}: {}",
                url.origin().ascii_serialization(),
                e
            ))
        } else {
            OAuth2Error::Http(e)
        }
    }
}

#[async_trait::async_trait]
impl HttpTransport for ReqwestTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse> {
        let HttpRequest { method, url, form } = request;

        tracing::debug!("{} {}{}", method, url.origin().ascii_serialization(), url.path());

        let builder = match method {
            HttpMethod::Get => self.client.get(url.clone()),
            HttpMethod::Post => self.client.post(url.clone()).form(&form),
        };

        let resp = builder.send().await.map_err(|e| self.map_error(&url, e))?;

        let status = resp.status().as_u16();
        let body = resp.text().await.map_err(|e| self.map_error(&url, e))?;

        tracing::debug!("{} {} -> {}", method, url.path(), status);

        Ok(HttpResponse { status, body })
    }
}
