use super::LiveIndex;
use crate::ledger::{validate_channel_name, ChannelAction, ChannelRecord};
use crate::shared::logging::log_best_effort;
use crate::slack::{SlackApiClient, SlackError};
use std::path::Path;

/// Result of one action attempt against one channel. Never persisted; on
/// success the caller clears the ledger action, on failure the record stays
/// pending so the operator can retry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionOutcome {
    pub success: bool,
    pub message: String,
}

impl ActionOutcome {
    fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }

    fn rejected(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
        }
    }
}

/// Executes one action kind against Slack and translates provider error codes
/// into a closed set of user-facing outcomes. Errors never escape this
/// boundary; anything unexpected becomes a failure outcome.
pub struct ActionHandler<'a> {
    client: &'a SlackApiClient,
    state_root: &'a Path,
}

impl<'a> ActionHandler<'a> {
    pub fn new(client: &'a SlackApiClient, state_root: &'a Path) -> Self {
        Self { client, state_root }
    }

    pub fn execute(&self, record: &ChannelRecord, live: &LiveIndex) -> ActionOutcome {
        match record.action {
            ChannelAction::Keep | ChannelAction::New => {
                ActionOutcome::ok(format!("channel #{} kept as is", record.name))
            }
            ChannelAction::Archive => self.archive(record, live),
            ChannelAction::Rename => self.rename(record),
            ChannelAction::UpdateDescription => self.update_description(record),
        }
    }

    fn archive(&self, record: &ChannelRecord, live: &LiveIndex) -> ActionOutcome {
        let name = &record.name;
        let info = match self.client.channel_info(&record.channel_id) {
            Ok(Some(info)) => info,
            Ok(None) => return ActionOutcome::rejected(format!("#{name} no longer exists")),
            Err(err) => {
                return ActionOutcome::rejected(format!("could not verify #{name}: {err}"))
            }
        };
        if info.is_archived {
            return ActionOutcome::rejected(format!("#{name} is already archived"));
        }
        if info.is_general {
            return ActionOutcome::rejected(format!(
                "#{name} is the workspace default channel and cannot be archived"
            ));
        }
        if info.shared_externally() {
            return ActionOutcome::rejected(format!(
                "#{name} is shared with an external organization and cannot be archived from here"
            ));
        }

        let redirect = record.target_value.trim().trim_start_matches('#');
        if !redirect.is_empty() {
            match live.find_by_name(redirect) {
                None => {
                    return ActionOutcome::rejected(format!(
                        "redirect target #{redirect} not found; #{name} left untouched"
                    ))
                }
                Some(target) if target.is_archived => {
                    return ActionOutcome::rejected(format!(
                        "redirect target #{redirect} is archived; #{name} left untouched"
                    ))
                }
                Some(_) => {}
            }
            // Joining first makes the notice postable from inside; failure is
            // tolerated because the bot may already be a member.
            if let Err(err) = self.client.join_channel(&record.channel_id) {
                log_best_effort(
                    self.state_root,
                    &format!("join before redirect notice failed for #{name}: {err}"),
                );
            }
            let notice = format!(
                "This channel is being archived. Please join #{redirect} to continue the discussion."
            );
            if let Err(err) = self.client.post_message(&record.channel_id, &notice) {
                if err.api_code() == Some("not_in_channel") {
                    return ActionOutcome::rejected(format!(
                        "cannot post the redirect notice in #{name} (not a member); archive aborted"
                    ));
                }
                log_best_effort(
                    self.state_root,
                    &format!("redirect notice failed for #{name}: {err}"),
                );
            }
        }

        match self.client.archive_channel(&record.channel_id) {
            Ok(()) => {
                if redirect.is_empty() {
                    ActionOutcome::ok(format!("archived #{name}"))
                } else {
                    ActionOutcome::ok(format!("archived #{name} with redirect to #{redirect}"))
                }
            }
            Err(err) => ActionOutcome::rejected(map_archive_error(&err, name)),
        }
    }

    fn rename(&self, record: &ChannelRecord) -> ActionOutcome {
        let old = &record.name;
        let requested = record.target_value.trim();
        // Defense in depth; the ledger read and the approval loop validate
        // this already.
        if let Err(err) = validate_channel_name(requested) {
            return ActionOutcome::rejected(format!("cannot rename #{old}: {err}"));
        }
        match self.client.rename_channel(&record.channel_id, requested) {
            Ok(actual) => {
                if actual == requested || actual.is_empty() {
                    ActionOutcome::ok(format!("renamed #{old} to #{requested}"))
                } else {
                    ActionOutcome::ok(format!(
                        "renamed #{old}; slack adjusted the requested name to #{actual}"
                    ))
                }
            }
            Err(err) => ActionOutcome::rejected(map_rename_error(&err, old, requested)),
        }
    }

    fn update_description(&self, record: &ChannelRecord) -> ActionOutcome {
        let name = &record.name;
        match self
            .client
            .set_purpose(&record.channel_id, record.target_value.trim())
        {
            Ok(()) => ActionOutcome::ok(format!("updated description of #{name}")),
            Err(err) => ActionOutcome::rejected(map_purpose_error(&err, name)),
        }
    }
}

fn map_archive_error(err: &SlackError, name: &str) -> String {
    match err.api_code() {
        Some("already_archived") => format!("#{name} is already archived"),
        Some("cant_archive_general") => {
            format!("#{name} is the workspace default channel and cannot be archived")
        }
        Some("cant_archive_required") | Some("restricted_action") => {
            format!("archiving #{name} is restricted by workspace policy")
        }
        Some("not_authorized") | Some("access_denied") => {
            format!("permission denied archiving #{name}")
        }
        _ => match err {
            SlackError::MissingScope => format!("token lacks the scope to archive #{name}"),
            other => format!("failed to archive #{name}: {other}"),
        },
    }
}

fn map_rename_error(err: &SlackError, old: &str, requested: &str) -> String {
    match err.api_code() {
        Some("name_taken") => format!("channel name `{requested}` is already taken"),
        Some("invalid_name") | Some("invalid_name_specials") | Some("invalid_name_maxlength")
        | Some("invalid_name_punctuation") => {
            format!("slack rejected `{requested}` as an invalid channel name")
        }
        Some("not_in_channel") => format!("cannot rename #{old}: not a member"),
        Some("already_archived") => format!("cannot rename #{old}: channel is archived"),
        Some("not_authorized") | Some("access_denied") => {
            format!("permission denied renaming #{old}")
        }
        _ => match err {
            SlackError::MissingScope => format!("token lacks the scope to rename #{old}"),
            other => format!("failed to rename #{old}: {other}"),
        },
    }
}

fn map_purpose_error(err: &SlackError, name: &str) -> String {
    match err.api_code() {
        Some("channel_not_found") => format!("#{name} no longer exists"),
        Some("not_in_channel") => format!("cannot update #{name}: not a member"),
        Some("already_archived") => format!("cannot update #{name}: channel is archived"),
        _ => match err {
            SlackError::MissingScope => format!("token lacks the scope to update #{name}"),
            other => format!("failed to update description of #{name}: {other}"),
        },
    }
}
