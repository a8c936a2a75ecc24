//! Twin23 OAuth2 - authorization code grant client library
//!
//! This library implements the client side of the OAuth 2.0 authorization
//! code grant against the Face23 identity provider: building the
//! authorization URL, exchanging the returned code for an access token, and
//! fetching the user profile with that token.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//!
//! - `client`: The OAuth2 client and its authorization/token options
//! - `callback`: Parsing of the provider's redirect back to the client
//! - `token`: The access token value object
//! - `transport`: HTTP transport abstraction and the `reqwest` implementation
//! - `config`: Client configuration loading and validation
//! - `error`: Error types and result aliases
//! - `cli`: Command-line interface definition for the bundled binary
//!
//! # Example
//!
//! ```no_run
//! use twin23_oauth2::{AuthorizationOptions, ClientConfig, OAuth2Client, OAuth2Error};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = ClientConfig::new(
//!         "YOUR_CLIENT_ID",
//!         "YOUR_CLIENT_SECRET",
//!         "http://my.website.com/redirect-page",
//!     );
//!     let mut client = OAuth2Client::new(config)?;
//!
//!     // Redirect the user here, keep `client.state()` in their session.
//!     let url = client.authorization_url(AuthorizationOptions::default());
//!     println!("{url}");
//!
//!     match client.exchange_code("code-from-redirect").await {
//!         Ok(token) => println!("Access Token: {}", token.token()),
//!         Err(OAuth2Error::IdentityProvider { error, description }) => {
//!             eprintln!("{}", description.unwrap_or(error));
//!         }
//!         Err(e) => return Err(e.into()),
//!     }
//!     Ok(())
//! }
//! ```

pub mod callback;
pub mod cli;
pub mod client;
pub mod config;
pub mod error;
pub mod token;
pub mod transport;

// Re-export commonly used types
pub use callback::CallbackParams;
pub use client::{AuthorizationOptions, AuthorizationParameters, OAuth2Client, TokenOptions};
pub use config::ClientConfig;
pub use error::{OAuth2Error, Result};
pub use token::AccessToken;
pub use transport::{HttpMethod, HttpRequest, HttpResponse, HttpTransport, ReqwestTransport};
