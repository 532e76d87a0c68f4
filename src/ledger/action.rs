use std::fmt;

pub const MAX_CHANNEL_NAME_LEN: usize = 80;

/// Closed set of operator intents. Parsing is strict: anything else in the
/// ledger is a read error, never silently defaulted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelAction {
    /// No-op, the default for existing channels.
    Keep,
    /// Newly discovered channel awaiting triage; executes like `Keep` but is
    /// shown distinctly.
    New,
    /// Archive, optionally posting a redirect notice to another channel.
    Archive,
    /// Rename to the target value.
    Rename,
    /// Replace the channel description with the target value.
    UpdateDescription,
}

impl ChannelAction {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "keep" => Some(ChannelAction::Keep),
            "new" => Some(ChannelAction::New),
            "archive" => Some(ChannelAction::Archive),
            "rename" => Some(ChannelAction::Rename),
            "update_description" => Some(ChannelAction::UpdateDescription),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ChannelAction::Keep => "keep",
            ChannelAction::New => "new",
            ChannelAction::Archive => "archive",
            ChannelAction::Rename => "rename",
            ChannelAction::UpdateDescription => "update_description",
        }
    }

    pub fn requires_target(self) -> bool {
        matches!(
            self,
            ChannelAction::Rename | ChannelAction::UpdateDescription
        )
    }

    pub fn allows_target(self) -> bool {
        self.requires_target() || self == ChannelAction::Archive
    }

    pub fn is_pending(self) -> bool {
        !matches!(self, ChannelAction::Keep | ChannelAction::New)
    }

    /// Renames land before archives so redirect notices and name lookups see
    /// final names; description updates follow.
    pub fn priority(self) -> u8 {
        match self {
            ChannelAction::Rename => 0,
            ChannelAction::Archive => 1,
            ChannelAction::UpdateDescription => 2,
            ChannelAction::Keep | ChannelAction::New => 3,
        }
    }
}

impl fmt::Display for ChannelAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum NameError {
    #[error("channel name is empty")]
    Empty,
    #[error("channel name `{name}` is {len} characters; the limit is {MAX_CHANNEL_NAME_LEN}")]
    TooLong { name: String, len: usize },
    #[error("channel name `{name}` contains uppercase characters; names must be lowercase")]
    Uppercase { name: String },
    #[error("channel name `{name}` contains a space; spaces are not allowed")]
    Space { name: String },
    #[error("channel name `{name}` contains a period; periods are not allowed")]
    Period { name: String },
    #[error("channel name `{name}` contains `{ch}`; only lowercase letters, digits, hyphen, and underscore are allowed")]
    InvalidChar { name: String, ch: char },
}

/// Slack channel name rules: non-empty, at most 80 characters, lowercase
/// letters, digits, hyphen, underscore.
pub fn validate_channel_name(name: &str) -> Result<(), NameError> {
    if name.is_empty() {
        return Err(NameError::Empty);
    }
    let len = name.chars().count();
    if len > MAX_CHANNEL_NAME_LEN {
        return Err(NameError::TooLong {
            name: name.to_string(),
            len,
        });
    }
    for ch in name.chars() {
        if ch.is_ascii_uppercase() {
            return Err(NameError::Uppercase {
                name: name.to_string(),
            });
        }
        if ch == ' ' {
            return Err(NameError::Space {
                name: name.to_string(),
            });
        }
        if ch == '.' {
            return Err(NameError::Period {
                name: name.to_string(),
            });
        }
        if !ch.is_ascii_lowercase() && !ch.is_ascii_digit() && ch != '-' && ch != '_' {
            return Err(NameError::InvalidChar {
                name: name.to_string(),
                ch,
            });
        }
    }
    Ok(())
}
