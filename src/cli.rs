//! Command-line interface definition for twin23-oauth2
//!
//! This module defines the CLI structure using clap's derive API. The
//! binary walks through the authorization code grant one step at a time:
//! print the authorization URL, exchange the returned code, fetch the
//! profile.

use clap::{Parser, Subcommand};

/// twin23-oauth2 - OAuth 2.0 authorization code grant client
///
/// Configuration is read from a YAML file and `TWIN23_OAUTH2_*`
/// environment variables.
#[derive(Parser, Debug, Clone)]
#[command(name = "twin23-oauth2")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "config/config.yaml")]
    pub config: Option<String>,

    /// Override the provider endpoint from config
    #[arg(long)]
    pub endpoint: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Command to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Print the URL the end user must visit to authorize this client
    AuthorizeUrl {
        /// Use this state instead of a freshly generated one
        #[arg(long)]
        state: Option<String>,

        /// Override the configured redirect URI
        #[arg(long)]
        redirect_uri: Option<String>,

        /// Scope to request (repeatable)
        #[arg(long)]
        scope: Vec<String>,
    },

    /// Exchange an authorization code for an access token
    Exchange {
        /// Authorization code received on the redirect
        #[arg(
            long,
            required_unless_present = "callback_url",
            conflicts_with = "callback_url"
        )]
        code: Option<String>,

        /// Full URL the provider redirected the browser to
        #[arg(long)]
        callback_url: Option<String>,

        /// Grant type to request
        #[arg(long, default_value = "authorization_code")]
        grant: String,

        /// State issued with the authorization URL; checked against the callback
        #[arg(long, requires = "callback_url")]
        expected_state: Option<String>,

        /// Print the token as JSON
        #[arg(long)]
        json: bool,
    },

    /// Fetch the user profile with an access token
    Profile {
        /// Access token returned by `exchange`
        #[arg(long)]
        access_token: String,
    },
}

impl Cli {
    /// Parse command line arguments
    ///
    /// # Returns
    ///
    /// Returns the parsed CLI structure
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
