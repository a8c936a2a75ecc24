//! twin23-oauth2 - OAuth 2.0 authorization code grant client
//!
//! Main entry point for the command-line client.

use anyhow::Result;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use twin23_oauth2::cli::{Cli, Commands};
use twin23_oauth2::{AuthorizationOptions, CallbackParams, ClientConfig, OAuth2Client, OAuth2Error};

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let cli = Cli::parse_args();

    // Initialize tracing
    init_tracing(cli.verbose);

    // Load configuration
    let config_path = cli.config.as_deref().unwrap_or("config/config.yaml");
    let mut config = ClientConfig::load(config_path)?;
    if let Some(endpoint) = &cli.endpoint {
        tracing::debug!("Using endpoint override: {}", endpoint);
        config.endpoint = endpoint.clone();
    }

    // Validate configuration
    config.validate()?;

    let mut client = OAuth2Client::new(config)?;

    match cli.command {
        Commands::AuthorizeUrl {
            state,
            redirect_uri,
            scope,
        } => {
            let options = AuthorizationOptions {
                state,
                scope,
                redirect_uri,
                ..AuthorizationOptions::default()
            };
            let url = client.authorization_url(options);
            println!("{}", url);
            println!("state={}", client.state());
            Ok(())
        }
        Commands::Exchange {
            code,
            callback_url,
            grant,
            expected_state,
            json,
        } => {
            let result = exchange(&mut client, code, callback_url, &grant, expected_state).await;

            let token = match result {
                Ok(token) => token,
                Err(OAuth2Error::IdentityProvider { error, description }) => {
                    // Failed to get the access token; report the provider's reason.
                    eprintln!("{}", description.unwrap_or(error));
                    std::process::exit(1);
                }
                Err(e) => return Err(e.into()),
            };

            if json {
                println!("{}", serde_json::to_string_pretty(&token)?);
            } else {
                println!("Access Token: {}", token.token());
                println!("Refresh Token: {}", token.refresh_token().unwrap_or(""));
                println!(
                    "Expires in: {}",
                    token.expires().map(|s| s.to_string()).unwrap_or_default()
                );
                println!(
                    "Already expired? {}",
                    if token.has_expired() {
                        "expired"
                    } else {
                        "not expired"
                    }
                );
            }
            Ok(())
        }
        Commands::Profile { access_token } => {
            let profile = client.user_profile_info(&access_token).await?;
            println!("{}", serde_json::to_string_pretty(&profile)?);
            Ok(())
        }
    }
}

/// Resolves the authorization code from the command line and exchanges it.
async fn exchange(
    client: &mut OAuth2Client,
    code: Option<String>,
    callback_url: Option<String>,
    grant: &str,
    expected_state: Option<String>,
) -> twin23_oauth2::Result<twin23_oauth2::AccessToken> {
    let code = match (code, callback_url) {
        (Some(code), _) => code,
        (None, Some(url)) => {
            let params = CallbackParams::from_url(&url)?;
            match expected_state {
                Some(state) => {
                    client.restore_state(state);
                    client.code_from_callback(params)?
                }
                None => params.into_code()?,
            }
        }
        (None, None) => {
            return Err(OAuth2Error::InvalidArgument(
                "Invalid code provided!".to_string(),
            ))
        }
    };

    client
        .access_token(grant, twin23_oauth2::TokenOptions::with_code(code))
        .await
}

/// Initialize tracing/logging to stderr
///
/// `RUST_LOG` takes precedence; otherwise `--verbose` selects `debug` and
/// the default is `warn`.
fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
