//! OAuth 2.0 authorization code grant client
//!
//! [`OAuth2Client`] drives the three steps of the authorization code grant
//! against the identity provider:
//!
//! 1. Build the authorization URL the end user is redirected to
//!    ([`OAuth2Client::authorization_url`]). This also caches the CSRF
//!    `state` value on the client.
//! 2. Exchange the `code` the provider sends back for an [`AccessToken`]
//!    ([`OAuth2Client::access_token`]).
//! 3. Fetch the user profile with that token
//!    ([`OAuth2Client::user_profile_info`]).
//!
//! One client instance belongs to one authorization flow. The cached
//! `state` is plain mutable data, so a client must not be shared between
//! concurrent flows; create one instance per user session instead.

use std::sync::Arc;
use std::time::Duration;

use rand::RngCore as _;
use serde_json::Value;
use subtle::ConstantTimeEq;
use url::Url;

use crate::callback::CallbackParams;
use crate::config::ClientConfig;
use crate::error::{OAuth2Error, Result};
use crate::token::AccessToken;
use crate::transport::{HttpRequest, HttpResponse, HttpTransport, ReqwestTransport};

/// Scopes requested when neither the caller nor the configuration name any
pub const DEFAULT_SCOPES: [&str; 3] = ["name", "email", "photo"];

/// Separator used to join scope names into a single parameter
pub const SCOPE_SEPARATOR: &str = ",";

/// Grant type used by [`OAuth2Client::exchange_code`]
pub const AUTHORIZATION_CODE_GRANT: &str = "authorization_code";

/// Profile endpoint, resolved against the host of the configured endpoint
pub const PROFILE_PATH: &str = "/oauth2/profile";

/// Number of random bytes in a generated `state` value
const STATE_BYTES: usize = 16;

/// Parameters the client always sets itself; callers cannot pass them as
/// extra parameters.
const RESERVED_PARAMS: [&str; 5] = [
    "state",
    "scope",
    "response_type",
    "redirect_uri",
    "client_id",
];

// ---------------------------------------------------------------------------
// AuthorizationOptions
// ---------------------------------------------------------------------------

/// Caller overrides for the authorization URL
///
/// Every field is optional; unset fields fall back to the client's cached
/// state, the configured scopes and redirect URI, and `response_type=code`.
///
/// # Examples
///
/// ```
/// use twin23_oauth2::client::AuthorizationOptions;
///
/// let options = AuthorizationOptions::default()
///     .with_state("my-state")
///     .with_scope(["name", "email"])
///     .with_param("prompt", "login");
///
/// assert_eq!(options.state.as_deref(), Some("my-state"));
/// assert_eq!(options.extra, vec![("prompt".to_string(), "login".to_string())]);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthorizationOptions {
    /// CSRF state; an empty value counts as unset
    pub state: Option<String>,
    /// Scope names; empty means "use the configured or default scopes"
    pub scope: Vec<String>,
    /// Redirect URI; kept as given (even when empty) once set
    pub redirect_uri: Option<String>,
    /// Response type; defaults to `code`
    pub response_type: Option<String>,
    /// Additional query parameters, in the order given
    pub extra: Vec<(String, String)>,
}

impl AuthorizationOptions {
    /// Sets the `state` parameter
    pub fn with_state(mut self, state: impl Into<String>) -> Self {
        self.state = Some(state.into());
        self
    }

    /// Sets the requested scopes
    pub fn with_scope<I, S>(mut self, scope: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.scope = scope.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the `redirect_uri` parameter
    pub fn with_redirect_uri(mut self, redirect_uri: impl Into<String>) -> Self {
        self.redirect_uri = Some(redirect_uri.into());
        self
    }

    /// Sets the `response_type` parameter
    pub fn with_response_type(mut self, response_type: impl Into<String>) -> Self {
        self.response_type = Some(response_type.into());
        self
    }

    /// Appends an additional query parameter
    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra.push((key.into(), value.into()));
        self
    }
}

// ---------------------------------------------------------------------------
// AuthorizationParameters
// ---------------------------------------------------------------------------

/// Fully resolved authorization request parameters
///
/// `scope` holds the joined scope string. It is resolved so callers can
/// inspect it, but it is not part of [`query_pairs`](Self::query_pairs):
/// the provider's authorization endpoint is sent no `scope` parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorizationParameters {
    /// CSRF state round-tripped through the provider
    pub state: String,
    /// Scope names joined with [`SCOPE_SEPARATOR`]; not sent
    pub scope: String,
    /// Response type, `code` unless overridden
    pub response_type: String,
    /// Where the provider redirects the browser
    pub redirect_uri: String,
    /// Additional caller parameters
    pub extra: Vec<(String, String)>,
    /// The configured client ID
    pub client_id: String,
}

impl AuthorizationParameters {
    /// Query parameters in wire order
    pub fn query_pairs(&self) -> Vec<(&str, &str)> {
        let mut pairs = vec![
            ("state", self.state.as_str()),
            ("response_type", self.response_type.as_str()),
            ("redirect_uri", self.redirect_uri.as_str()),
        ];
        pairs.extend(self.extra.iter().map(|(k, v)| (k.as_str(), v.as_str())));
        pairs.push(("client_id", self.client_id.as_str()));
        pairs
    }

    /// Builds the query string with values left unescaped
    ///
    /// The provider expects literal characters in values (e.g.
    /// `redirect_uri=http://...`), which is what form-encoding followed by
    /// a full decode of the query string produces.
    ///
    /// # Examples
    ///
    /// ```
    /// use twin23_oauth2::client::AuthorizationParameters;
    ///
    /// let params = AuthorizationParameters {
    ///     state: "s1".to_string(),
    ///     scope: "name,email,photo".to_string(),
    ///     response_type: "code".to_string(),
    ///     redirect_uri: "http://my.website.com/redirect-page".to_string(),
    ///     extra: Vec::new(),
    ///     client_id: "abc".to_string(),
    /// };
    ///
    /// assert_eq!(
    ///     params.to_query_string(),
    ///     "state=s1&response_type=code&redirect_uri=http://my.website.com/redirect-page&client_id=abc"
    /// );
    /// ```
    pub fn to_query_string(&self) -> String {
        self.query_pairs()
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect::<Vec<_>>()
            .join("&")
    }
}

// ---------------------------------------------------------------------------
// TokenOptions
// ---------------------------------------------------------------------------

/// Options for [`OAuth2Client::access_token`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TokenOptions {
    /// Authorization code received on the redirect; required
    pub code: Option<String>,
}

impl TokenOptions {
    /// Options carrying the given authorization code
    pub fn with_code(code: impl Into<String>) -> Self {
        Self {
            code: Some(code.into()),
        }
    }
}

// ---------------------------------------------------------------------------
// OAuth2Client
// ---------------------------------------------------------------------------

/// OAuth 2.0 authorization code grant client for one authorization flow
///
/// # Examples
///
/// ```
/// use twin23_oauth2::client::{AuthorizationOptions, OAuth2Client};
/// use twin23_oauth2::config::ClientConfig;
///
/// let config = ClientConfig::new(
///     "YOUR_CLIENT_ID",
///     "YOUR_CLIENT_SECRET",
///     "http://my.website.com/redirect-page",
/// );
/// let mut client = OAuth2Client::new(config).unwrap();
///
/// let url = client.authorization_url(AuthorizationOptions::default());
/// let state = client.state().to_string();
///
/// assert!(url.starts_with("http://identity.face23.local/oauth2/?"));
/// assert!(url.contains(&format!("state={}", state)));
/// assert!(url.contains("client_id=YOUR_CLIENT_ID"));
/// assert!(!url.contains("scope="));
/// ```
pub struct OAuth2Client {
    config: ClientConfig,
    endpoint: Url,
    transport: Arc<dyn HttpTransport>,
    state: Option<String>,
}

impl OAuth2Client {
    /// Creates a client that talks to the provider through [`ReqwestTransport`]
    ///
    /// # Errors
    ///
    /// Returns [`OAuth2Error::Config`] when the endpoint is not a usable URL,
    /// or [`OAuth2Error::Transport`] when the HTTP client cannot be built.
    pub fn new(config: ClientConfig) -> Result<Self> {
        let transport = ReqwestTransport::new(Duration::from_secs(config.timeout_seconds))?;
        Self::with_transport(config, Arc::new(transport))
    }

    /// Creates a client using the given transport
    ///
    /// # Errors
    ///
    /// Returns [`OAuth2Error::Config`] when the endpoint is not a usable URL.
    pub fn with_transport(config: ClientConfig, transport: Arc<dyn HttpTransport>) -> Result<Self> {
        let endpoint = config.endpoint_url()?;

        Ok(Self {
            config,
            endpoint,
            transport,
            state: None,
        })
    }

    /// The configuration this client was created with
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// The provider endpoint, always ending with `/`
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Builds the URL the end user is redirected to
    ///
    /// Resolves the parameters with
    /// [`authorization_parameters`](Self::authorization_parameters) (which
    /// caches the resolved `state`) and appends them to the endpoint.
    pub fn authorization_url(&mut self, options: AuthorizationOptions) -> String {
        let params = self.authorization_parameters(options);
        format!("{}?{}", self.endpoint, params.to_query_string())
    }

    /// Resolves authorization parameters from caller overrides
    ///
    /// - `state`: the option when set, otherwise [`state`](Self::state)
    /// - `scope`: the option, else the configured scopes, else
    ///   [`DEFAULT_SCOPES`], joined with [`SCOPE_SEPARATOR`]
    ///
    /// An empty or `"0"` override counts as unset, the same rule
    /// that applies to a provider's `error` field.
    /// - `response_type`: the option, else `code`
    /// - `redirect_uri`: the option, else the configured value
    /// - `client_id`: always the configured value
    ///
    /// The resolved `state` replaces the cached one so it can be checked
    /// against the value the provider echoes back.
    pub fn authorization_parameters(
        &mut self,
        options: AuthorizationOptions,
    ) -> AuthorizationParameters {
        let AuthorizationOptions {
            state,
            scope,
            redirect_uri,
            response_type,
            extra,
        } = options;

        let state = match state {
            Some(state) if !is_unset(&state) => state,
            _ => self.state().to_string(),
        };

        let scope = [&scope, &self.config.scope]
            .into_iter()
            .map(|scopes| scopes.join(SCOPE_SEPARATOR))
            .find(|joined| !is_unset(joined))
            .unwrap_or_else(|| DEFAULT_SCOPES.join(SCOPE_SEPARATOR));

        self.state = Some(state.clone());

        let extra = extra
            .into_iter()
            .filter(|(key, _)| {
                let reserved = RESERVED_PARAMS.contains(&key.as_str());
                if reserved {
                    tracing::debug!("Ignoring reserved authorization parameter: {}", key);
                }
                !reserved
            })
            .collect();

        let params = AuthorizationParameters {
            state,
            scope,
            response_type: response_type.unwrap_or_else(|| "code".to_string()),
            redirect_uri: redirect_uri.unwrap_or_else(|| self.config.redirect_uri.clone()),
            extra,
            client_id: self.config.client_id.clone(),
        };

        tracing::debug!(
            "Built authorization parameters: client_id={}, response_type={}",
            params.client_id,
            params.response_type
        );

        params
    }

    /// Returns the CSRF state, generating and caching it on first use
    ///
    /// The state is the hex encoding of 16 bytes from a cryptographically
    /// secure generator seeded by the operating system.
    pub fn state(&mut self) -> &str {
        self.state.get_or_insert_with(generate_state)
    }

    /// Returns the cached state without generating one
    pub fn cached_state(&self) -> Option<&str> {
        self.state.as_deref()
    }

    /// Replaces the cached state
    ///
    /// Used when the state issued with the authorization URL was kept in the
    /// user's session and the callback is handled by a fresh client.
    pub fn restore_state(&mut self, state: impl Into<String>) {
        self.state = Some(state.into());
    }

    /// Checks a `state` echoed back by the provider against the cached one
    ///
    /// # Errors
    ///
    /// Returns [`OAuth2Error::StateMismatch`] when no state is cached or the
    /// values differ.
    pub fn verify_state(&self, returned: &str) -> Result<()> {
        match self.state.as_deref() {
            Some(expected) if expected.as_bytes().ct_eq(returned.as_bytes()).into() => Ok(()),
            _ => {
                tracing::warn!("OAuth callback state does not match the issued state");
                Err(OAuth2Error::StateMismatch)
            }
        }
    }

    /// Validates a provider redirect and returns its authorization code
    ///
    /// # Errors
    ///
    /// - [`OAuth2Error::IdentityProvider`] when the redirect carries `error`
    /// - [`OAuth2Error::StateMismatch`] when `state` is missing or differs
    /// - [`OAuth2Error::InvalidArgument`] when `code` is missing
    pub fn code_from_callback(&self, params: CallbackParams) -> Result<String> {
        if params.error.is_none() {
            self.verify_state(params.state.as_deref().unwrap_or(""))?;
        }
        params.into_code()
    }

    /// Exchanges an authorization code for an access token
    ///
    /// POSTs `grant_type`, `code`, `client_id`, `client_secret` and
    /// `redirect_uri` as a form to `{endpoint}token`.
    ///
    /// # Errors
    ///
    /// - [`OAuth2Error::InvalidArgument`] when `options.code` is missing; no
    ///   request is made
    /// - [`OAuth2Error::IdentityProvider`] when the response has an `error`
    /// - [`OAuth2Error::Protocol`] when the body is not a JSON object or
    ///   lacks `access_token`
    /// - transport errors as returned by the [`HttpTransport`]
    pub async fn access_token(&self, grant: &str, options: TokenOptions) -> Result<AccessToken> {
        let code = options
            .code
            .ok_or_else(|| OAuth2Error::InvalidArgument("Invalid code provided!".to_string()))?;

        let url = self.endpoint_path("token")?;
        let request = HttpRequest::post_form(
            url,
            vec![
                ("grant_type", grant),
                ("code", code.as_str()),
                ("client_id", self.config.client_id.as_str()),
                ("client_secret", self.config.client_secret.as_str()),
                ("redirect_uri", self.config.redirect_uri.as_str()),
            ],
        );

        tracing::debug!("Exchanging authorization code: grant_type={}", grant);

        let body = self.request_json(request).await?;

        if let Some(err) = provider_error(&body) {
            return Err(err);
        }

        let response = match body {
            Value::Object(map) => map,
            other => {
                return Err(OAuth2Error::Protocol(format!(
                    "token response is not a JSON object: {}",
                    other
                )))
            }
        };

        let token = AccessToken::from_response(response)?;
        tracing::info!(
            "Obtained access token: expires_in={:?}, refresh_token={}",
            token.expires(),
            token.refresh_token().is_some()
        );

        Ok(token)
    }

    /// Exchanges `code` using the `authorization_code` grant
    pub async fn exchange_code(&self, code: &str) -> Result<AccessToken> {
        self.access_token(AUTHORIZATION_CODE_GRANT, TokenOptions::with_code(code))
            .await
    }

    /// Fetches the user profile and returns the parsed JSON verbatim
    ///
    /// Issues `GET /oauth2/profile?access_token=<token>` on the endpoint's
    /// host.
    ///
    /// # Errors
    ///
    /// - [`OAuth2Error::Protocol`] when the body is not JSON
    /// - [`OAuth2Error::IdentityProvider`] for a non-2xx response carrying
    ///   an `error` body
    /// - transport errors as returned by the [`HttpTransport`]
    pub async fn user_profile_info(&self, access_token: &str) -> Result<Value> {
        let mut url = self.endpoint_path(PROFILE_PATH)?;
        url.query_pairs_mut()
            .append_pair("access_token", access_token);

        tracing::debug!("Fetching user profile");

        self.request_json(HttpRequest::get(url)).await
    }

    // -----------------------------------------------------------------------
    // Private helpers
    // -----------------------------------------------------------------------

    fn endpoint_path(&self, path: &str) -> Result<Url> {
        self.endpoint.join(path).map_err(|e| {
            OAuth2Error::InvalidArgument(format!("cannot resolve {} against endpoint: {}", path, e))
        })
    }

    /// Sends `request` and parses the response body as JSON.
    async fn request_json(&self, request: HttpRequest) -> Result<Value> {
        let response = self.transport.send(request).await?;

        if !response.is_success() {
            return Err(error_for_status(&response));
        }

        serde_json::from_str(&response.body)
            .map_err(|e| OAuth2Error::Protocol(format!("response body is not valid JSON: {}", e)))
    }
}

// ---------------------------------------------------------------------------
// Utility functions
// ---------------------------------------------------------------------------

/// Generates a fresh state value: 16 random bytes, hex encoded.
fn generate_state() -> String {
    let mut bytes = [0u8; STATE_BYTES];
    rand::rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// Maps a non-2xx response to an error, preferring the provider's own
/// error body when there is one.
fn error_for_status(response: &HttpResponse) -> OAuth2Error {
    if let Ok(body) = serde_json::from_str::<Value>(&response.body) {
        if let Some(err) = provider_error(&body) {
            return err;
        }
    }

    let mut body = response.body.clone();
    if body.len() > 200 {
        let cut = (0..=200).rev().find(|i| body.is_char_boundary(*i)).unwrap_or(0);
        body.truncate(cut);
    }

    OAuth2Error::Transport(format!("provider returned HTTP {}: {}", response.status, body))
}

/// Extracts an [`OAuth2Error::IdentityProvider`] from a response carrying a
/// non-blank `error` field.
fn provider_error(body: &Value) -> Option<OAuth2Error> {
    let error = body.get("error").filter(|v| !is_blank(v))?;

    let error = match error {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    };
    let description = match body.get("error_description") {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) => Some(s.clone()),
        Some(other) => Some(other.to_string()),
    };

    tracing::warn!("Identity provider returned error: {}", error);

    Some(OAuth2Error::IdentityProvider { error, description })
}

/// Returns `true` for an empty or `"0"` override.
fn is_unset(value: &str) -> bool {
    value.is_empty() || value == "0"
}

/// Returns `true` for values a provider uses to mean "no error": null,
/// `false`, `0`, `""`, `"0"` and empty containers.
fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty() || s == "0",
        Value::Array(a) => a.is_empty(),
        Value::Object(o) => o.is_empty(),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::{HttpMethod, MockHttpTransport};
    use serde_json::json;

    const ENDPOINT: &str = "http://identity.face23.local/oauth2/";

    fn config() -> ClientConfig {
        ClientConfig::new(
            "YOUR_CLIENT_ID",
            "YOUR_CLIENT_SECRET",
            "http://my.website.com/redirect-page",
        )
    }

    fn client_with(mock: MockHttpTransport) -> OAuth2Client {
        OAuth2Client::with_transport(config(), Arc::new(mock)).unwrap()
    }

    fn offline_client() -> OAuth2Client {
        client_with(MockHttpTransport::new())
    }

    fn respond(status: u16, body: &str) -> impl Fn(HttpRequest) -> Result<HttpResponse> {
        let body = body.to_string();
        move |_| Ok(HttpResponse::new(status, body.clone()))
    }

    // -----------------------------------------------------------------------
    // state
    // -----------------------------------------------------------------------

    #[test]
    fn test_state_is_32_hex_chars() {
        let mut client = offline_client();
        let state = client.state().to_string();
        assert_eq!(state.len(), 32);
        assert!(state.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_state_is_cached() {
        let mut client = offline_client();
        let first = client.state().to_string();
        let second = client.state().to_string();
        assert_eq!(first, second);
    }

    #[test]
    fn test_state_differs_between_clients() {
        let mut a = offline_client();
        let mut b = offline_client();
        assert_ne!(a.state(), b.state());
    }

    #[test]
    fn test_cached_state_is_none_until_generated() {
        let mut client = offline_client();
        assert!(client.cached_state().is_none());
        let state = client.state().to_string();
        assert_eq!(client.cached_state(), Some(state.as_str()));
    }

    #[test]
    fn test_verify_state() {
        let mut client = offline_client();
        assert!(matches!(
            client.verify_state("anything"),
            Err(OAuth2Error::StateMismatch)
        ));

        client.restore_state("issued");
        assert!(client.verify_state("issued").is_ok());
        assert!(matches!(
            client.verify_state("forged"),
            Err(OAuth2Error::StateMismatch)
        ));
        assert!(client.verify_state("").is_err());
    }

    // -----------------------------------------------------------------------
    // authorization_url
    // -----------------------------------------------------------------------

    #[test]
    fn test_authorization_url_exact_format() {
        let mut client = offline_client();
        let url = client.authorization_url(AuthorizationOptions::default().with_state("abc"));
        assert_eq!(
            url,
            "http://identity.face23.local/oauth2/?state=abc&response_type=code\
             &redirect_uri=http://my.website.com/redirect-page&client_id=YOUR_CLIENT_ID"
        );
    }

    #[test]
    fn test_authorization_url_without_options_uses_generated_state() {
        let mut client = offline_client();
        let url = client.authorization_url(AuthorizationOptions::default());
        let state = client.cached_state().unwrap().to_string();

        assert!(url.starts_with(ENDPOINT));
        assert!(url.contains(&format!("state={}", state)));
        assert!(url.contains("response_type=code"));
        assert!(url.contains("redirect_uri=http://my.website.com/redirect-page"));
        assert!(url.contains("client_id=YOUR_CLIENT_ID"));
        assert!(!url.contains("scope"));
    }

    #[test]
    fn test_authorization_url_reuses_cached_state() {
        let mut client = offline_client();
        let state = client.state().to_string();
        let url = client.authorization_url(AuthorizationOptions::default());
        assert!(url.contains(&format!("state={}", state)));
    }

    #[test]
    fn test_explicit_state_replaces_cached_state() {
        let mut client = offline_client();
        client.state();
        client.authorization_url(AuthorizationOptions::default().with_state("override"));
        assert_eq!(client.cached_state(), Some("override"));
        assert_eq!(client.state(), "override");
    }

    #[test]
    fn test_empty_state_option_counts_as_unset() {
        let mut client = offline_client();
        let params =
            client.authorization_parameters(AuthorizationOptions::default().with_state(""));
        assert_eq!(params.state.len(), 32);
    }

    #[test]
    fn test_zero_state_option_counts_as_unset() {
        let mut client = offline_client();
        let generated = client.state().to_string();
        let params =
            client.authorization_parameters(AuthorizationOptions::default().with_state("0"));
        assert_eq!(params.state, generated);
        assert_eq!(client.cached_state(), Some(generated.as_str()));
    }

    #[test]
    fn test_zero_scope_option_counts_as_unset() {
        let mut client = offline_client();
        let params =
            client.authorization_parameters(AuthorizationOptions::default().with_scope(["0"]));
        assert_eq!(params.scope, "name,email,photo");

        let config = config().with_scope(["profile"]);
        let mut client =
            OAuth2Client::with_transport(config, Arc::new(MockHttpTransport::new())).unwrap();
        let params =
            client.authorization_parameters(AuthorizationOptions::default().with_scope(["0"]));
        assert_eq!(params.scope, "profile");
    }

    #[test]
    fn test_scope_is_resolved_but_never_sent() {
        let mut client = offline_client();
        let params = client.authorization_parameters(
            AuthorizationOptions::default().with_scope(["name", "phone"]),
        );
        assert_eq!(params.scope, "name,phone");
        assert!(!params.to_query_string().contains("scope"));
    }

    #[test]
    fn test_scope_falls_back_to_config_then_defaults() {
        let mut client = offline_client();
        let params = client.authorization_parameters(AuthorizationOptions::default());
        assert_eq!(params.scope, "name,email,photo");

        let config = config().with_scope(["name", "email", "photo", "phone"]);
        let mut client =
            OAuth2Client::with_transport(config, Arc::new(MockHttpTransport::new())).unwrap();
        let params = client.authorization_parameters(AuthorizationOptions::default());
        assert_eq!(params.scope, "name,email,photo,phone");
    }

    #[test]
    fn test_overrides_and_client_id_always_from_config() {
        let mut client = offline_client();
        let params = client.authorization_parameters(
            AuthorizationOptions::default()
                .with_redirect_uri("http://other.example.com/cb")
                .with_response_type("token")
                .with_param("client_id", "attacker")
                .with_param("prompt", "login"),
        );

        assert_eq!(params.redirect_uri, "http://other.example.com/cb");
        assert_eq!(params.response_type, "token");
        assert_eq!(params.client_id, "YOUR_CLIENT_ID");
        assert_eq!(
            params.extra,
            vec![("prompt".to_string(), "login".to_string())]
        );

        let query = params.to_query_string();
        assert!(query.ends_with("&prompt=login&client_id=YOUR_CLIENT_ID"));
        assert!(!query.contains("attacker"));
    }

    #[test]
    fn test_query_values_are_not_escaped() {
        let mut client = offline_client();
        let url = client.authorization_url(
            AuthorizationOptions::default()
                .with_state("a b")
                .with_redirect_uri("http://x.test/cb?next=/home&x=1"),
        );
        assert!(url.contains("state=a b&"));
        assert!(url.contains("redirect_uri=http://x.test/cb?next=/home&x=1&"));
    }

    // -----------------------------------------------------------------------
    // code_from_callback
    // -----------------------------------------------------------------------

    #[test]
    fn test_code_from_callback_checks_state() {
        let mut client = offline_client();
        client.restore_state("s1");

        let ok = CallbackParams::from_query("code=c1&state=s1");
        assert_eq!(client.code_from_callback(ok).unwrap(), "c1");

        let forged = CallbackParams::from_query("code=c1&state=s2");
        assert!(matches!(
            client.code_from_callback(forged),
            Err(OAuth2Error::StateMismatch)
        ));

        let missing = CallbackParams::from_query("code=c1");
        assert!(matches!(
            client.code_from_callback(missing),
            Err(OAuth2Error::StateMismatch)
        ));
    }

    #[test]
    fn test_code_from_callback_surfaces_provider_error() {
        let client = offline_client();
        let params = CallbackParams::from_query("error=access_denied");
        assert!(matches!(
            client.code_from_callback(params),
            Err(OAuth2Error::IdentityProvider { .. })
        ));
    }

    // -----------------------------------------------------------------------
    // access_token
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn test_access_token_without_code_makes_no_request() {
        let mut mock = MockHttpTransport::new();
        mock.expect_send().never();
        let client = client_with(mock);

        let err = client
            .access_token(AUTHORIZATION_CODE_GRANT, TokenOptions::default())
            .await
            .unwrap_err();

        assert!(matches!(err, OAuth2Error::InvalidArgument(_)));
    }

    #[tokio::test]
    async fn test_access_token_posts_exact_form() {
        let mut mock = MockHttpTransport::new();
        mock.expect_send()
            .times(1)
            .withf(|request| {
                let expected: Vec<(String, String)> = vec![
                    ("grant_type", "authorization_code"),
                    ("code", "the-code"),
                    ("client_id", "YOUR_CLIENT_ID"),
                    ("client_secret", "YOUR_CLIENT_SECRET"),
                    ("redirect_uri", "http://my.website.com/redirect-page"),
                ]
                .into_iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect();

                request.method == HttpMethod::Post
                    && request.url.as_str() == "http://identity.face23.local/oauth2/token"
                    && request.form == expected
            })
            .returning(respond(
                200,
                r#"{"access_token":"abc","refresh_token":"r1","expires_in":3600}"#,
            ));
        let client = client_with(mock);

        let token = client.exchange_code("the-code").await.unwrap();

        assert_eq!(token.token(), "abc");
        assert_eq!(token.refresh_token(), Some("r1"));
        assert!(!token.has_expired());
    }

    #[tokio::test]
    async fn test_access_token_sends_custom_grant() {
        let mut mock = MockHttpTransport::new();
        mock.expect_send()
            .times(1)
            .withf(|request| request.form_value("grant_type") == Some("custom_grant"))
            .returning(respond(200, r#"{"access_token":"abc"}"#));
        let client = client_with(mock);

        let token = client
            .access_token("custom_grant", TokenOptions::with_code("c"))
            .await
            .unwrap();
        assert_eq!(token.token(), "abc");
    }

    #[tokio::test]
    async fn test_access_token_provider_error() {
        let mut mock = MockHttpTransport::new();
        mock.expect_send().times(1).returning(respond(
            200,
            r#"{"error":"invalid_grant","error_description":"bad code"}"#,
        ));
        let client = client_with(mock);

        let err = client.exchange_code("c").await.unwrap_err();
        match err {
            OAuth2Error::IdentityProvider { error, description } => {
                assert_eq!(error, "invalid_grant");
                assert_eq!(description.as_deref(), Some("bad code"));
            }
            other => panic!("expected IdentityProvider, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_access_token_provider_error_on_400() {
        let mut mock = MockHttpTransport::new();
        mock.expect_send().times(1).returning(respond(
            400,
            r#"{"error":"invalid_client","error_description":"unknown client"}"#,
        ));
        let client = client_with(mock);

        let err = client.exchange_code("c").await.unwrap_err();
        assert_eq!(err.provider_description(), Some("unknown client"));
    }

    #[tokio::test]
    async fn test_blank_error_field_is_not_an_error() {
        let mut mock = MockHttpTransport::new();
        mock.expect_send()
            .times(1)
            .returning(respond(200, r#"{"error":"","access_token":"abc"}"#));
        let client = client_with(mock);

        let token = client.exchange_code("c").await.unwrap();
        assert_eq!(token.token(), "abc");
    }

    #[tokio::test]
    async fn test_access_token_non_json_body_is_protocol_error() {
        let mut mock = MockHttpTransport::new();
        mock.expect_send()
            .times(1)
            .returning(respond(200, "<html>oops</html>"));
        let client = client_with(mock);

        let err = client.exchange_code("c").await.unwrap_err();
        assert!(matches!(err, OAuth2Error::Protocol(_)));
    }

    #[tokio::test]
    async fn test_access_token_missing_field_is_protocol_error() {
        let mut mock = MockHttpTransport::new();
        mock.expect_send()
            .times(1)
            .returning(respond(200, r#"{"token_type":"Bearer"}"#));
        let client = client_with(mock);

        let err = client.exchange_code("c").await.unwrap_err();
        assert!(matches!(err, OAuth2Error::Protocol(_)));
    }

    #[tokio::test]
    async fn test_access_token_non_object_is_protocol_error() {
        let mut mock = MockHttpTransport::new();
        mock.expect_send()
            .times(1)
            .returning(respond(200, r#"["abc"]"#));
        let client = client_with(mock);

        let err = client.exchange_code("c").await.unwrap_err();
        assert!(matches!(err, OAuth2Error::Protocol(_)));
    }

    #[tokio::test]
    async fn test_server_error_without_body_is_transport_error() {
        let mut mock = MockHttpTransport::new();
        mock.expect_send()
            .times(1)
            .returning(respond(502, "Bad Gateway"));
        let client = client_with(mock);

        let err = client.exchange_code("c").await.unwrap_err();
        assert!(err.is_transport());
        assert!(err.to_string().contains("502"));
    }

    #[tokio::test]
    async fn test_transport_failure_propagates_unchanged() {
        let mut mock = MockHttpTransport::new();
        mock.expect_send()
            .times(1)
            .returning(|_| Err(OAuth2Error::Transport("timed out".to_string())));
        let client = client_with(mock);

        let err = client.exchange_code("c").await.unwrap_err();
        assert!(matches!(err, OAuth2Error::Transport(msg) if msg == "timed out"));
    }

    // -----------------------------------------------------------------------
    // user_profile_info
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn test_user_profile_info_requests_profile_path() {
        let mut mock = MockHttpTransport::new();
        mock.expect_send()
            .times(1)
            .withf(|request| {
                request.method == HttpMethod::Get
                    && request.url.as_str()
                        == "http://identity.face23.local/oauth2/profile?access_token=abc+%2F1"
            })
            .returning(respond(200, r#"{"name":"Ada","email":"ada@example.com"}"#));
        let client = client_with(mock);

        let profile = client.user_profile_info("abc /1").await.unwrap();
        assert_eq!(profile, json!({"name": "Ada", "email": "ada@example.com"}));
    }

    #[tokio::test]
    async fn test_user_profile_info_is_idempotent() {
        let mut mock = MockHttpTransport::new();
        mock.expect_send()
            .times(2)
            .returning(respond(200, r#"{"id":7,"photo":null}"#));
        let client = client_with(mock);

        let first = client.user_profile_info("abc").await.unwrap();
        let second = client.user_profile_info("abc").await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_user_profile_info_non_json_is_protocol_error() {
        let mut mock = MockHttpTransport::new();
        mock.expect_send().times(1).returning(respond(200, "not json"));
        let client = client_with(mock);

        let err = client.user_profile_info("abc").await.unwrap_err();
        assert!(matches!(err, OAuth2Error::Protocol(_)));
    }

    // -----------------------------------------------------------------------
    // helpers
    // -----------------------------------------------------------------------

    #[test]
    fn test_is_blank() {
        let blanks = [
            json!(null),
            json!(false),
            json!(0),
            json!(""),
            json!("0"),
            json!([]),
            json!({}),
        ];
        for blank in blanks {
            assert!(is_blank(&blank), "{blank} should be blank");
        }
        for set in [json!("invalid_grant"), json!(true), json!(1), json!(["x"])] {
            assert!(!is_blank(&set), "{set} should not be blank");
        }
    }

    #[test]
    fn test_error_for_status_truncates_long_body() {
        let response = HttpResponse::new(500, "x".repeat(1000));
        let err = error_for_status(&response);
        assert!(err.to_string().len() < 300);
    }

    #[test]
    fn test_verify_state_rejects_prefix_and_extension() {
        let mut client = offline_client();
        client.restore_state("abc");
        assert!(client.verify_state("abc").is_ok());
        assert!(client.verify_state("ab").is_err());
        assert!(client.verify_state("abcd").is_err());
        assert!(client.verify_state("abd").is_err());
    }

    #[test]
    fn test_endpoint_without_trailing_slash_is_normalised() {
        let config = config().with_endpoint("http://127.0.0.1:9000/oauth2");
        let client =
            OAuth2Client::with_transport(config, Arc::new(MockHttpTransport::new())).unwrap();
        assert_eq!(client.endpoint().as_str(), "http://127.0.0.1:9000/oauth2/");
        assert_eq!(
            client.endpoint_path("token").unwrap().as_str(),
            "http://127.0.0.1:9000/oauth2/token"
        );
    }

    #[test]
    fn test_invalid_endpoint_is_rejected() {
        let config = config().with_endpoint("not a url");
        let result = OAuth2Client::with_transport(config, Arc::new(MockHttpTransport::new()));
        assert!(matches!(result, Err(OAuth2Error::Config(_))));
    }
}
