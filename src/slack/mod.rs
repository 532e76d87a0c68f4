use serde::{Deserialize, Serialize};

pub mod api;
pub mod auth;

pub use api::SlackApiClient;
pub use auth::{load_env_token, validate_startup_credentials};

pub const REQUIRED_SCOPES: &str =
    "channels:read, groups:read, channels:write, groups:write, chat:write";

#[derive(Debug, thiserror::Error)]
pub enum SlackError {
    #[error("missing required env var `{0}`")]
    MissingEnvVar(String),
    #[error("slack token is missing required scopes; grant {REQUIRED_SCOPES}")]
    MissingScope,
    #[error("slack rejected the token: `{0}`")]
    InvalidAuth(String),
    #[error("rate limited on `{endpoint}`; gave up after {attempts} attempts")]
    RateLimited { endpoint: String, attempts: u32 },
    #[error("slack api request failed: {0}")]
    ApiRequest(String),
    #[error("slack api responded with error `{0}`")]
    ApiResponse(String),
}

impl SlackError {
    /// Configuration errors are fatal and non-retryable; the operator has to
    /// fix the environment before another run makes sense.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            SlackError::MissingEnvVar(_) | SlackError::MissingScope | SlackError::InvalidAuth(_)
        )
    }

    pub fn api_code(&self) -> Option<&str> {
        match self {
            SlackError::ApiResponse(code) => Some(code.as_str()),
            _ => None,
        }
    }
}

/// One live channel as reported by `conversations.list`/`conversations.info`.
/// Owned by Slack; this tool only observes it and requests mutations through
/// approved actions.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Channel {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub is_private: bool,
    #[serde(default)]
    pub is_shared: bool,
    #[serde(default)]
    pub is_ext_shared: bool,
    #[serde(default)]
    pub is_org_shared: bool,
    #[serde(default)]
    pub is_archived: bool,
    #[serde(default)]
    pub is_general: bool,
    #[serde(default)]
    pub num_members: u32,
    #[serde(default)]
    pub created: i64,
    #[serde(default)]
    pub purpose: TextBlock,
    #[serde(default)]
    pub topic: TextBlock,
    #[serde(skip)]
    pub last_activity: Option<ActivitySample>,
}

impl Channel {
    /// Externally connected channels must never be archived from here;
    /// archiving has cross-organization side effects we cannot undo.
    pub fn shared_externally(&self) -> bool {
        self.is_shared || self.is_ext_shared || self.is_org_shared
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TextBlock {
    #[serde(default)]
    pub value: String,
}

/// Most recent non-system message in a channel, cached between runs.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ActivitySample {
    pub ts: String,
    pub snippet: String,
}
