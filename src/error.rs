//! Error types for the Twin23 OAuth2 client
//!
//! This module defines every failure the client can report, using
//! `thiserror` for ergonomic error handling. None of these errors are
//! recovered internally; they surface to the caller as soon as they occur.

use thiserror::Error;

/// Main error type for OAuth2 client operations
///
/// The variants fall into four classes:
///
/// - invalid caller input ([`OAuth2Error::InvalidArgument`])
/// - errors reported by the identity provider itself
///   ([`OAuth2Error::IdentityProvider`], [`OAuth2Error::StateMismatch`])
/// - transport failures ([`OAuth2Error::Transport`], [`OAuth2Error::Http`])
/// - malformed provider responses ([`OAuth2Error::Protocol`])
///
/// The remaining variants are only produced while loading configuration.
#[derive(Error, Debug)]
pub enum OAuth2Error {
    /// A required parameter was missing or malformed
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The identity provider answered with an `error` field
    #[error("Identity provider error: {}", .description.as_deref().unwrap_or(.error))]
    IdentityProvider {
        /// Machine-readable error code (e.g. `invalid_grant`)
        error: String,
        /// Human-readable `error_description`, when the provider sent one
        description: Option<String>,
    },

    /// The `state` echoed back by the provider does not match ours
    #[error("State mismatch in OAuth callback")]
    StateMismatch,

    /// Network failure, timeout, or a non-2xx status without a provider error body
    #[error("Transport error: {0}")]
    Transport(String),

    /// HTTP client errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The provider response could not be interpreted
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML parsing errors
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl OAuth2Error {
    /// Returns `true` for failures that happened below the OAuth protocol,
    /// i.e. the request never produced a usable response.
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_) | Self::Http(_))
    }

    /// Returns the provider's `error_description` (or error code) for
    /// [`OAuth2Error::IdentityProvider`], `None` otherwise.
    pub fn provider_description(&self) -> Option<&str> {
        match self {
            Self::IdentityProvider { error, description } => {
                Some(description.as_deref().unwrap_or(error))
            }
            _ => None,
        }
    }
}

/// Result type alias for OAuth2 client operations
///
/// Every fallible library operation returns this alias so callers must
/// handle the typed [`OAuth2Error`] explicitly.
pub type Result<T> = std::result::Result<T, OAuth2Error>;
