//! Provider redirect (callback) parameters
//!
//! After the user authorizes the client, the provider redirects the browser
//! back to `redirect_uri` with either `code` and `state`, or `error` and
//! `error_description` in the query string. [`CallbackParams`] extracts
//! those values so they can be checked and handed to
//! [`OAuth2Client::access_token`](crate::client::OAuth2Client::access_token).

use url::Url;

use crate::error::{OAuth2Error, Result};

/// Query parameters of a provider redirect
///
/// # Examples
///
/// ```
/// use twin23_oauth2::callback::CallbackParams;
///
/// let params = CallbackParams::from_url(
///     "http://my.website.com/redirect-page?code=abc123&state=xyz789",
/// )
/// .unwrap();
///
/// assert_eq!(params.state.as_deref(), Some("xyz789"));
/// assert_eq!(params.into_code().unwrap(), "abc123");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallbackParams {
    /// Authorization code to exchange for a token
    pub code: Option<String>,
    /// The `state` value echoed back by the provider
    pub state: Option<String>,
    /// Error code when the user or provider refused the request
    pub error: Option<String>,
    /// Human-readable error description
    pub error_description: Option<String>,
}

impl CallbackParams {
    /// Parses a raw query string (without the leading `?`)
    ///
    /// Values are percent-decoded and `+` is read as a space. Empty values
    /// count as absent; duplicate keys keep the last occurrence.
    pub fn from_query(query: &str) -> Self {
        let mut params = Self::default();

        for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
            let value = if value.is_empty() {
                None
            } else {
                Some(value.into_owned())
            };

            match key.as_ref() {
                "code" => params.code = value,
                "state" => params.state = value,
                "error" => params.error = value,
                "error_description" => params.error_description = value,
                _ => {}
            }
        }

        params
    }

    /// Parses the full redirect URL the provider sent the browser to
    ///
    /// # Errors
    ///
    /// Returns [`OAuth2Error::InvalidArgument`] when `url` is not an
    /// absolute URL.
    pub fn from_url(url: &str) -> Result<Self> {
        let url = Url::parse(url)
            .map_err(|e| OAuth2Error::InvalidArgument(format!("invalid callback URL: {}", e)))?;
        Ok(Self::from_query(url.query().unwrap_or("")))
    }

    /// Returns the authorization code
    ///
    /// # Errors
    ///
    /// - [`OAuth2Error::IdentityProvider`] when the redirect carries `error`
    /// - [`OAuth2Error::InvalidArgument`] when `code` is missing
    pub fn into_code(self) -> Result<String> {
        if let Some(error) = self.error {
            return Err(OAuth2Error::IdentityProvider {
                error,
                description: self.error_description,
            });
        }

        self.code.ok_or_else(|| {
            OAuth2Error::InvalidArgument("authorization code missing from callback".to_string())
        })
    }
}
