//! Access token value object
//!
//! An [`AccessToken`] is built from a successful token endpoint response and
//! is owned by the caller afterwards. It keeps the raw `expires_in` value the
//! provider sent and the moment it was issued, so expiry is computed on
//! demand rather than cached.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::{OAuth2Error, Result};

/// Response fields with a dedicated accessor; everything else ends up in
/// [`AccessToken::values`].
const KNOWN_FIELDS: [&str; 3] = ["access_token", "refresh_token", "expires_in"];

/// An OAuth 2.0 access token issued by the token endpoint.
///
/// A token without `expires_in` is never considered expired.
///
/// # Examples
///
/// ```
/// use twin23_oauth2::token::AccessToken;
///
/// let response = serde_json::json!({
///     "access_token": "abc",
///     "refresh_token": "r1",
///     "expires_in": 3600
/// });
/// let token = AccessToken::from_response(response.as_object().unwrap().clone()).unwrap();
///
/// assert_eq!(token.token(), "abc");
/// assert_eq!(token.refresh_token(), Some("r1"));
/// assert_eq!(token.expires(), Some(3600));
/// assert!(!token.has_expired());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AccessToken {
    access_token: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    refresh_token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    expires_in: Option<u64>,
    issued_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Map::is_empty")]
    values: Map<String, Value>,
}

impl AccessToken {
    /// Builds a token from a token endpoint response issued now.
    ///
    /// # Errors
    ///
    /// Returns [`OAuth2Error::Protocol`] when `access_token` is missing or
    /// not a string, or when `expires_in` is neither an integer nor a
    /// numeric string.
    pub fn from_response(response: Map<String, Value>) -> Result<Self> {
        Self::from_response_at(response, Utc::now())
    }

    /// Builds a token from a token endpoint response issued at `issued_at`.
    pub fn from_response_at(
        mut response: Map<String, Value>,
        issued_at: DateTime<Utc>,
    ) -> Result<Self> {
        let access_token = match response.get("access_token") {
            Some(Value::String(token)) if !token.is_empty() => token.clone(),
            Some(_) => {
                return Err(OAuth2Error::Protocol(
                    "access_token must be a non-empty string".to_string(),
                ))
            }
            None => {
                return Err(OAuth2Error::Protocol(
                    "token response is missing access_token".to_string(),
                ))
            }
        };

        let refresh_token = match response.get("refresh_token") {
            Some(Value::String(token)) if !token.is_empty() => Some(token.clone()),
            _ => None,
        };

        let expires_in = match response.get("expires_in") {
            None | Some(Value::Null) => None,
            Some(Value::Number(n)) => Some(n.as_u64().ok_or_else(|| {
                OAuth2Error::Protocol(format!("expires_in is not a positive integer: {}", n))
            })?),
            Some(Value::String(s)) => Some(s.trim().parse::<u64>().map_err(|_| {
                OAuth2Error::Protocol(format!("expires_in is not numeric: {}", s))
            })?),
            Some(other) => {
                return Err(OAuth2Error::Protocol(format!(
                    "expires_in has unexpected type: {}",
                    other
                )))
            }
        };

        for field in KNOWN_FIELDS {
            response.remove(field);
        }

        Ok(Self {
            access_token,
            refresh_token,
            expires_in,
            issued_at,
            values: response,
        })
    }

    /// The access token string.
    pub fn token(&self) -> &str {
        &self.access_token
    }

    /// The refresh token, when the provider issued one.
    pub fn refresh_token(&self) -> Option<&str> {
        self.refresh_token.as_deref()
    }

    /// The raw `expires_in` lifetime in seconds, relative to issuance.
    pub fn expires(&self) -> Option<u64> {
        self.expires_in
    }

    /// When the token was received from the provider.
    pub fn issued_at(&self) -> DateTime<Utc> {
        self.issued_at
    }

    /// Absolute expiry time, `None` when the provider sent no lifetime.
    ///
    /// Lifetimes too large to represent are also `None`.
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.expires_in.and_then(|secs| {
            let lifetime = Duration::try_seconds(i64::try_from(secs).ok()?)?;
            self.issued_at.checked_add_signed(lifetime)
        })
    }

    /// Returns `true` once the lifetime reported by the provider has elapsed.
    ///
    /// # Examples
    ///
    /// ```
    /// use chrono::{Duration, Utc};
    /// use twin23_oauth2::token::AccessToken;
    ///
    /// let response = serde_json::json!({"access_token": "abc", "expires_in": 60});
    /// let issued = Utc::now() - Duration::seconds(120);
    /// let token =
    ///     AccessToken::from_response_at(response.as_object().unwrap().clone(), issued).unwrap();
    /// assert!(token.has_expired());
    /// ```
    pub fn has_expired(&self) -> bool {
        self.expires_at()
            .is_some_and(|expires_at| expires_at <= Utc::now())
    }

    /// Additional, non-standard fields of the token response.
    pub fn values(&self) -> &Map<String, Value> {
        &self.values
    }
}
