//! HTTP transport abstraction
//!
//! The OAuth2 client never talks to the network directly. Every request it
//! makes goes through an [`HttpTransport`], which lets deployments plug in
//! their own HTTP stack and lets tests observe exactly which requests were
//! issued.
//!
//! - [`http::ReqwestTransport`] -- the default implementation backed by
//!   `reqwest`, enforcing a fixed request timeout.

use url::Url;

use crate::error::Result;

pub mod http;

pub use http::ReqwestTransport;

/// HTTP methods used by the OAuth2 client
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    /// `GET`
    Get,
    /// `POST`
    Post,
}

impl std::fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Get => write!(f, "GET"),
            Self::Post => write!(f, "POST"),
        }
    }
}

/// A single request to the identity provider
///
/// # Examples
///
/// ```
/// use twin23_oauth2::transport::{HttpMethod, HttpRequest};
/// use url::Url;
///
/// let url = Url::parse("http://identity.face23.local/oauth2/token").unwrap();
/// let request = HttpRequest::post_form(url, vec![("grant_type", "authorization_code")]);
///
/// assert_eq!(request.method, HttpMethod::Post);
/// assert_eq!(request.form_value("grant_type"), Some("authorization_code"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    /// Request method
    pub method: HttpMethod,
    /// Absolute request URL, including any query string
    pub url: Url,
    /// Form fields sent as `application/x-www-form-urlencoded`, in order
    pub form: Vec<(String, String)>,
}

impl HttpRequest {
    /// Creates a `GET` request without a body
    pub fn get(url: Url) -> Self {
        Self {
            method: HttpMethod::Get,
            url,
            form: Vec::new(),
        }
    }

    /// Creates a form-encoded `POST` request
    pub fn post_form<K, V>(url: Url, form: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            method: HttpMethod::Post,
            url,
            form: form
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Returns the first form value for `key`
    pub fn form_value(&self, key: &str) -> Option<&str> {
        self.form
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// The provider's answer to an [`HttpRequest`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    /// HTTP status code
    pub status: u16,
    /// Response body decoded as text
    pub body: String,
}

impl HttpResponse {
    /// Creates a response with the given status and body
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// Returns `true` for 2xx statuses
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Performs HTTP requests on behalf of the OAuth2 client
///
/// Implementations must complete (or fail) each request before returning and
/// must not retry on their own; the caller decides whether a failure is
/// worth retrying.
///
/// Non-2xx statuses are not errors at this layer: they are returned as an
/// [`HttpResponse`] so the client can inspect a provider error body.
///
/// # Errors
///
/// Implementations return [`crate::error::OAuth2Error::Transport`] or
/// [`crate::error::OAuth2Error::Http`] when no response was received.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait HttpTransport: Send + Sync {
    /// Sends `request` and returns the provider's response
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse>;
}
