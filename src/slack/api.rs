use super::{ActivitySample, Channel, SlackError};
use serde::Deserialize;
use serde_json::json;
use std::thread;
use std::time::Duration;

const DEFAULT_SLACK_API_BASE: &str = "https://slack.com/api";
const RATE_LIMIT_RETRIES: u32 = 3;
const DEFAULT_RETRY_AFTER_SECS: u64 = 1;
const HISTORY_PROBE_LIMIT: u32 = 20;
const SNIPPET_CHARS: usize = 80;

#[derive(Debug, Clone)]
pub struct SlackApiClient {
    api_base: String,
    token: String,
}

#[derive(Debug, Clone, Deserialize)]
struct SlackEnvelope<T> {
    ok: bool,
    #[serde(default)]
    error: Option<String>,
    #[serde(flatten)]
    data: T,
}

#[derive(Debug, Clone, Deserialize, Default)]
struct EmptyData {}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct AuthIdentity {
    #[serde(default)]
    pub user: String,
    #[serde(default)]
    pub team: String,
}

#[derive(Debug, Clone, Deserialize)]
struct ChannelsPageData {
    #[serde(default)]
    channels: Vec<serde_json::Value>,
    #[serde(default)]
    response_metadata: ResponseMetadata,
}

#[derive(Debug, Clone, Deserialize, Default)]
struct ResponseMetadata {
    #[serde(default)]
    next_cursor: String,
}

#[derive(Debug, Clone, Deserialize)]
struct ChannelDetailData {
    #[serde(default)]
    channel: Channel,
}

#[derive(Debug, Clone, Deserialize)]
struct HistoryData {
    #[serde(default)]
    messages: Vec<HistoryMessage>,
}

#[derive(Debug, Clone, Deserialize)]
struct HistoryMessage {
    #[serde(default)]
    ts: String,
    #[serde(default)]
    text: String,
    #[serde(default)]
    user: Option<String>,
    #[serde(default)]
    subtype: Option<String>,
    #[serde(default)]
    bot_id: Option<String>,
}

/// Result of a full pagination pass: well-formed channels plus the count of
/// records dropped for missing an id or name.
#[derive(Debug, Default)]
pub struct ChannelListing {
    pub channels: Vec<Channel>,
    pub dropped: usize,
}

impl SlackApiClient {
    pub fn new(token: String) -> Self {
        let api_base = std::env::var("CHANWARDEN_SLACK_API_BASE")
            .ok()
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_SLACK_API_BASE.to_string());
        Self { api_base, token }
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.api_base.trim_end_matches('/'), path)
    }

    fn request_with_retry<F>(&self, path: &str, send: F) -> Result<ureq::Response, SlackError>
    where
        F: Fn() -> Result<ureq::Response, ureq::Error>,
    {
        let mut attempt = 0u32;
        loop {
            match send() {
                Ok(response) => return Ok(response),
                Err(ureq::Error::Status(429, response)) => {
                    attempt += 1;
                    if attempt > RATE_LIMIT_RETRIES {
                        return Err(SlackError::RateLimited {
                            endpoint: path.to_string(),
                            attempts: attempt,
                        });
                    }
                    let suggested = response
                        .header("retry-after")
                        .and_then(|v| v.trim().parse::<u64>().ok())
                        .unwrap_or(DEFAULT_RETRY_AFTER_SECS);
                    // Scale the server hint up on repeated hits.
                    let wait = suggested.saturating_mul(1 << (attempt - 1).min(4));
                    thread::sleep(Duration::from_secs(wait));
                }
                Err(ureq::Error::Status(code, response)) => {
                    let body = response.into_string().unwrap_or_default();
                    return Err(SlackError::ApiRequest(format!(
                        "{path} returned http {code}: {body}"
                    )));
                }
                Err(err) => return Err(SlackError::ApiRequest(format!("{path}: {err}"))),
            }
        }
    }

    fn get_json<T: for<'de> Deserialize<'de>>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, SlackError> {
        let mut url = self.endpoint(path);
        if !query.is_empty() {
            let encoded = query
                .iter()
                .map(|(k, v)| format!("{k}={}", urlencoding::encode(v)))
                .collect::<Vec<_>>()
                .join("&");
            url = format!("{url}?{encoded}");
        }
        let response = self.request_with_retry(path, || {
            ureq::get(&url)
                .set("Authorization", &format!("Bearer {}", self.token))
                .call()
        })?;
        decode_envelope(path, response)
    }

    fn post_json<T: for<'de> Deserialize<'de>>(
        &self,
        path: &str,
        body: &serde_json::Value,
    ) -> Result<T, SlackError> {
        let url = self.endpoint(path);
        let response = self.request_with_retry(path, || {
            ureq::post(&url)
                .set("Authorization", &format!("Bearer {}", self.token))
                .send_json(body.clone())
        })?;
        decode_envelope(path, response)
    }

    pub fn auth_test(&self) -> Result<AuthIdentity, SlackError> {
        self.get_json("auth.test", &[])
    }

    /// Full pagination over public and private non-archived channels. Records
    /// missing an id or name are dropped per page, never fatal.
    pub fn list_channels(
        &self,
        page_size: u32,
        page_pause: Duration,
    ) -> Result<ChannelListing, SlackError> {
        let mut listing = ChannelListing::default();
        let mut cursor = String::new();
        loop {
            let mut query = vec![
                ("types", "public_channel,private_channel".to_string()),
                ("exclude_archived", "true".to_string()),
                ("limit", page_size.to_string()),
            ];
            if !cursor.is_empty() {
                query.push(("cursor", cursor.clone()));
            }
            let page: ChannelsPageData = self.get_json("conversations.list", &query)?;
            for raw in page.channels {
                match serde_json::from_value::<Channel>(raw) {
                    Ok(channel) if !channel.id.is_empty() && !channel.name.is_empty() => {
                        listing.channels.push(channel);
                    }
                    _ => listing.dropped += 1,
                }
            }
            cursor = page.response_metadata.next_cursor;
            if cursor.trim().is_empty() {
                break;
            }
            thread::sleep(page_pause);
        }
        Ok(listing)
    }

    /// Point lookup used for execution-time staleness checks. A missing
    /// channel is `Ok(None)`, not an error.
    pub fn channel_info(&self, channel_id: &str) -> Result<Option<Channel>, SlackError> {
        let query = vec![("channel", channel_id.to_string())];
        match self.get_json::<ChannelDetailData>("conversations.info", &query) {
            Ok(data) => Ok(Some(data.channel)),
            Err(err) if err.api_code() == Some("channel_not_found") => Ok(None),
            Err(err) => Err(err),
        }
    }

    /// Most recent non-system message in the channel, if any.
    pub fn latest_activity(&self, channel_id: &str) -> Result<Option<ActivitySample>, SlackError> {
        let query = vec![
            ("channel", channel_id.to_string()),
            ("limit", HISTORY_PROBE_LIMIT.to_string()),
        ];
        let data: HistoryData = self.get_json("conversations.history", &query)?;
        for message in data.messages {
            if message.ts.is_empty() || message.user.is_none() {
                continue;
            }
            if message.subtype.is_some() || message.bot_id.is_some() {
                continue;
            }
            let snippet: String = message.text.chars().take(SNIPPET_CHARS).collect();
            return Ok(Some(ActivitySample {
                ts: message.ts,
                snippet,
            }));
        }
        Ok(None)
    }

    pub fn archive_channel(&self, channel_id: &str) -> Result<(), SlackError> {
        let _: EmptyData =
            self.post_json("conversations.archive", &json!({ "channel": channel_id }))?;
        Ok(())
    }

    /// Returns the name Slack actually assigned, which may differ from the
    /// requested one.
    pub fn rename_channel(&self, channel_id: &str, new_name: &str) -> Result<String, SlackError> {
        let data: ChannelDetailData = self.post_json(
            "conversations.rename",
            &json!({ "channel": channel_id, "name": new_name }),
        )?;
        Ok(data.channel.name)
    }

    pub fn set_purpose(&self, channel_id: &str, purpose: &str) -> Result<(), SlackError> {
        let _: EmptyData = self.post_json(
            "conversations.setPurpose",
            &json!({ "channel": channel_id, "purpose": purpose }),
        )?;
        Ok(())
    }

    pub fn post_message(&self, channel_id: &str, text: &str) -> Result<(), SlackError> {
        let _: EmptyData = self.post_json(
            "chat.postMessage",
            &json!({ "channel": channel_id, "text": text }),
        )?;
        Ok(())
    }

    pub fn join_channel(&self, channel_id: &str) -> Result<(), SlackError> {
        let _: EmptyData = self.post_json("conversations.join", &json!({ "channel": channel_id }))?;
        Ok(())
    }
}

fn decode_envelope<T: for<'de> Deserialize<'de>>(
    path: &str,
    response: ureq::Response,
) -> Result<T, SlackError> {
    let envelope: SlackEnvelope<T> = response
        .into_json()
        .map_err(|e| SlackError::ApiRequest(format!("{path}: {e}")))?;
    if !envelope.ok {
        let code = envelope.error.unwrap_or_else(|| format!("{path} failed"));
        return Err(classify_api_error(code));
    }
    Ok(envelope.data)
}

fn classify_api_error(code: String) -> SlackError {
    match code.as_str() {
        "missing_scope" => SlackError::MissingScope,
        "invalid_auth" | "not_authed" | "account_inactive" | "token_revoked" => {
            SlackError::InvalidAuth(code)
        }
        _ => SlackError::ApiResponse(code),
    }
}

#[cfg(test)]
mod tests {
    use super::classify_api_error;
    use crate::slack::SlackError;

    #[test]
    fn auth_codes_map_to_configuration_errors() {
        assert!(classify_api_error("missing_scope".to_string()).is_configuration());
        assert!(classify_api_error("invalid_auth".to_string()).is_configuration());
        assert!(classify_api_error("token_revoked".to_string()).is_configuration());
    }

    #[test]
    fn provider_rejections_keep_their_code() {
        let err = classify_api_error("name_taken".to_string());
        assert_eq!(err.api_code(), Some("name_taken"));
        assert!(matches!(err, SlackError::ApiResponse(_)));
    }
}
