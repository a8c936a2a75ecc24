use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;
use twin23_oauth2::ClientConfig;

pub const CLIENT_ID: &str = "test-client";
pub const CLIENT_SECRET: &str = "test-secret";
pub const REDIRECT_URI: &str = "http://localhost/callback";

/// Client configuration pointing at `{base_url}/oauth2/`.
#[allow(dead_code)]
pub fn client_config(base_url: &str) -> ClientConfig {
    ClientConfig::new(CLIENT_ID, CLIENT_SECRET, REDIRECT_URI)
        .with_endpoint(format!("{}/oauth2/", base_url))
}

/// YAML configuration file equivalent to [`client_config`].
#[allow(dead_code)]
pub fn temp_config_file(base_url: &str) -> (TempDir, PathBuf) {
    let contents = format!(
        "endpoint: {}/oauth2/\nclient_id: {}\nclient_secret: {}\nredirect_uri: {}\ntimeout_seconds: 1\n",
        base_url, CLIENT_ID, CLIENT_SECRET, REDIRECT_URI
    );
    let temp_dir = TempDir::new().expect("failed to create tempdir");
    let config_path = temp_dir.path().join("config.yaml");
    fs::write(&config_path, contents).expect("failed to write config file");
    (temp_dir, config_path)
}

/// A successful token endpoint response.
#[allow(dead_code)]
pub fn token_response_body() -> serde_json::Value {
    serde_json::json!({
        "access_token": "abc",
        "refresh_token": "r1",
        "expires_in": 3600
    })
}
