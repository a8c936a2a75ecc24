//! Configuration management for the Twin23 OAuth2 client
//!
//! This module holds the static client configuration and handles loading it
//! from a YAML file, applying environment variable overrides, and
//! validating the result.

use crate::error::{OAuth2Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use url::Url;

/// Base URL of the reference identity provider deployment
pub const DEFAULT_ENDPOINT: &str = "http://identity.face23.local/oauth2/";

/// Static OAuth2 client configuration
///
/// Set once when the [`OAuth2Client`](crate::client::OAuth2Client) is
/// constructed and never mutated afterwards.
///
/// # Examples
///
/// ```
/// use twin23_oauth2::config::ClientConfig;
///
/// let config: ClientConfig = serde_yaml::from_str(
///     "client_id: my-client\nclient_secret: s3cret\nredirect_uri: http://my.website.com/redirect-page\n",
/// )
/// .unwrap();
///
/// assert_eq!(config.endpoint, "http://identity.face23.local/oauth2/");
/// assert_eq!(config.timeout_seconds, 2);
/// assert!(config.scope.is_empty());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Base URL of the provider's OAuth2 endpoints
    ///
    /// The authorization URL is this value followed by the query string and
    /// the token endpoint is `{endpoint}token`.
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// The client ID assigned by the provider
    #[serde(default)]
    pub client_id: String,

    /// The client secret assigned by the provider
    #[serde(default)]
    pub client_secret: String,

    /// Where the provider redirects the user after authorization
    #[serde(default)]
    pub redirect_uri: String,

    /// Permissions to request; the built-in defaults apply when empty
    #[serde(default)]
    pub scope: Vec<String>,

    /// Request timeout for every call made to the provider
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
}

fn default_endpoint() -> String {
    DEFAULT_ENDPOINT.to_string()
}

fn default_timeout_seconds() -> u64 {
    2
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            client_id: String::new(),
            client_secret: String::new(),
            redirect_uri: String::new(),
            scope: Vec::new(),
            timeout_seconds: default_timeout_seconds(),
        }
    }
}

impl ClientConfig {
    /// Creates a configuration for the default endpoint
    ///
    /// # Examples
    ///
    /// ```
    /// use twin23_oauth2::config::ClientConfig;
    ///
    /// let config = ClientConfig::new("id", "secret", "http://localhost/cb");
    /// assert_eq!(config.client_id, "id");
    /// assert!(config.validate().is_ok());
    /// ```
    pub fn new(
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        redirect_uri: impl Into<String>,
    ) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            redirect_uri: redirect_uri.into(),
            ..Self::default()
        }
    }

    /// Replaces the provider endpoint
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    /// Replaces the requested scopes
    pub fn with_scope<I, S>(mut self, scope: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.scope = scope.into_iter().map(Into::into).collect();
        self
    }

    /// Loads configuration from `path`, then applies environment overrides
    ///
    /// A missing file is not an error: defaults are used and a warning is
    /// logged, so a deployment can be configured from the environment alone.
    ///
    /// # Errors
    ///
    /// Returns [`OAuth2Error::Config`] when the file exists but cannot be
    /// read or parsed.
    pub fn load(path: &str) -> Result<Self> {
        let mut config = if Path::new(path).exists() {
            Self::from_file(path)?
        } else {
            tracing::warn!("Config file not found at {}, using defaults", path);
            Self::default()
        };

        config.apply_env_vars();

        Ok(config)
    }

    fn from_file(path: &str) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| OAuth2Error::Config(format!("Failed to read config file: {}", e)))?;
        serde_yaml::from_str(&contents)
            .map_err(|e| OAuth2Error::Config(format!("Failed to parse config: {}", e)))
    }

    fn apply_env_vars(&mut self) {
        if let Ok(endpoint) = std::env::var("TWIN23_OAUTH2_ENDPOINT") {
            self.endpoint = endpoint;
        }

        if let Ok(client_id) = std::env::var("TWIN23_OAUTH2_CLIENT_ID") {
            self.client_id = client_id;
        }

        if let Ok(client_secret) = std::env::var("TWIN23_OAUTH2_CLIENT_SECRET") {
            self.client_secret = client_secret;
        }

        if let Ok(redirect_uri) = std::env::var("TWIN23_OAUTH2_REDIRECT_URI") {
            self.redirect_uri = redirect_uri;
        }

        if let Ok(scope) = std::env::var("TWIN23_OAUTH2_SCOPE") {
            self.scope = scope
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect();
        }

        if let Ok(timeout) = std::env::var("TWIN23_OAUTH2_TIMEOUT_SECONDS") {
            if let Ok(value) = timeout.parse() {
                self.timeout_seconds = value;
            } else {
                tracing::warn!("Invalid TWIN23_OAUTH2_TIMEOUT_SECONDS: {}", timeout);
            }
        }
    }

    /// Returns the endpoint as a URL whose path ends with `/`
    ///
    /// Relative endpoints (`token`, `/oauth2/profile`) are joined onto this
    /// URL, so the trailing slash is required for `token` to land inside the
    /// endpoint path rather than replace its last segment.
    ///
    /// # Errors
    ///
    /// Returns [`OAuth2Error::Config`] when `endpoint` is not an absolute URL.
    ///
    /// # Examples
    ///
    /// ```
    /// use twin23_oauth2::config::ClientConfig;
    ///
    /// let config = ClientConfig::default().with_endpoint("https://id.example.com/oauth2");
    /// assert_eq!(
    ///     config.endpoint_url().unwrap().as_str(),
    ///     "https://id.example.com/oauth2/"
    /// );
    /// ```
    pub fn endpoint_url(&self) -> Result<Url> {
        let mut url = Url::parse(&self.endpoint).map_err(|e| {
            OAuth2Error::Config(format!("Invalid endpoint URL {}: {}", self.endpoint, e))
        })?;

        if url.cannot_be_a_base() {
            return Err(OAuth2Error::Config(format!(
                "Endpoint URL cannot be used as a base: {}",
                self.endpoint
            )));
        }

        if !url.path().ends_with('/') {
            let path = format!("{}/", url.path());
            url.set_path(&path);
        }

        Ok(url)
    }

    /// Validates the configuration
    ///
    /// # Errors
    ///
    /// Returns [`OAuth2Error::Config`] when a credential or the redirect URI
    /// is empty, the endpoint is not a usable URL, or the timeout is zero.
    pub fn validate(&self) -> Result<()> {
        if self.client_id.is_empty() {
            return Err(OAuth2Error::Config("client_id cannot be empty".to_string()));
        }

        if self.client_secret.is_empty() {
            return Err(OAuth2Error::Config(
                "client_secret cannot be empty".to_string(),
            ));
        }

        if self.redirect_uri.is_empty() {
            return Err(OAuth2Error::Config(
                "redirect_uri cannot be empty".to_string(),
            ));
        }

        if self.timeout_seconds == 0 {
            return Err(OAuth2Error::Config(
                "timeout_seconds must be greater than 0".to_string(),
            ));
        }

        self.endpoint_url()?;

        Ok(())
    }
}
