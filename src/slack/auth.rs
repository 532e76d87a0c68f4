use super::api::AuthIdentity;
use super::{SlackApiClient, SlackError};
use std::time::Duration;

pub const TOKEN_ENV_VAR: &str = "SLACK_TOKEN";

pub fn load_env_token() -> Result<String, SlackError> {
    std::env::var(TOKEN_ENV_VAR)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| SlackError::MissingEnvVar(TOKEN_ENV_VAR.to_string()))
}

/// Startup probe: `auth.test` plus a one-item channel listing so missing read
/// scopes surface before any real work. Run once per invocation.
pub fn validate_startup_credentials(client: &SlackApiClient) -> Result<AuthIdentity, SlackError> {
    let identity = client.auth_test()?;
    client.list_channels(1, Duration::ZERO)?;
    Ok(identity)
}
