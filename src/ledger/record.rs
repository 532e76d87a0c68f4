use super::action::ChannelAction;
use crate::slack::Channel;
use chrono::{DateTime, Utc};

pub const LEDGER_HEADERS: [&str; 11] = [
    "channel_id",
    "name",
    "description",
    "is_private",
    "is_shared",
    "member_count",
    "created_date",
    "last_activity",
    "action",
    "target_value",
    "notes",
];

/// One durable ledger row: observed channel state plus operator intent.
/// Exactly one record exists per known channel id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelRecord {
    pub channel_id: String,
    pub name: String,
    pub description: String,
    pub is_private: bool,
    pub is_shared: bool,
    pub member_count: u32,
    pub created_date: String,
    pub last_activity: String,
    pub action: ChannelAction,
    pub target_value: String,
    pub notes: String,
}

impl ChannelRecord {
    pub fn from_live(channel: &Channel, action: ChannelAction) -> Self {
        Self {
            channel_id: channel.id.clone(),
            name: channel.name.clone(),
            description: decode_entities(&channel.purpose.value),
            is_private: channel.is_private,
            is_shared: channel.shared_externally(),
            member_count: channel.num_members,
            created_date: format_epoch_date(channel.created),
            last_activity: channel
                .last_activity
                .as_ref()
                .map(|sample| slack_ts_date(&sample.ts))
                .unwrap_or_default(),
            action,
            target_value: String::new(),
            notes: String::new(),
        }
    }

    /// Refresh observed fields from the live channel. The name is refreshed
    /// too, unless a rename is pending: operator intent for the name wins
    /// until the rename executes or is cleared.
    pub fn refresh_from_live(&mut self, channel: &Channel) {
        self.description = decode_entities(&channel.purpose.value);
        self.is_private = channel.is_private;
        self.is_shared = channel.shared_externally();
        self.member_count = channel.num_members;
        self.created_date = format_epoch_date(channel.created);
        if let Some(sample) = &channel.last_activity {
            let date = slack_ts_date(&sample.ts);
            if !date.is_empty() {
                self.last_activity = date;
            }
        }
        if self.action != ChannelAction::Rename {
            self.name = channel.name.clone();
        }
    }
}

pub fn format_epoch_date(secs: i64) -> String {
    match DateTime::<Utc>::from_timestamp(secs, 0) {
        Some(dt) if secs > 0 => dt.format("%Y-%m-%d").to_string(),
        _ => String::new(),
    }
}

/// Slack message timestamps look like `1700000000.000100`. Epoch-adjacent
/// values mean "no real message" and map to empty.
pub fn slack_ts_date(ts: &str) -> String {
    let secs = match ts.split('.').next().and_then(|v| v.parse::<i64>().ok()) {
        Some(secs) => secs,
        None => return String::new(),
    };
    match DateTime::<Utc>::from_timestamp(secs, 0) {
        Some(dt) if dt.format("%Y").to_string() != "1970" => dt.format("%Y-%m-%d").to_string(),
        _ => String::new(),
    }
}

/// Purpose/topic text from the API carries HTML entities.
fn decode_entities(raw: &str) -> String {
    raw.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&")
}

#[cfg(test)]
mod tests {
    use super::{format_epoch_date, slack_ts_date, ChannelRecord};
    use crate::ledger::action::ChannelAction;
    use crate::slack::{ActivitySample, Channel, TextBlock};

    fn live(id: &str, name: &str) -> Channel {
        Channel {
            id: id.to_string(),
            name: name.to_string(),
            num_members: 7,
            created: 1_700_000_000,
            purpose: TextBlock {
                value: "Ops &amp; infra".to_string(),
            },
            ..Channel::default()
        }
    }

    #[test]
    fn from_live_formats_dates_and_decodes_entities() {
        let mut channel = live("C1", "ops");
        channel.last_activity = Some(ActivitySample {
            ts: "1701000000.000100".to_string(),
            snippet: "hi".to_string(),
        });
        let record = ChannelRecord::from_live(&channel, ChannelAction::New);
        assert_eq!(record.created_date, "2023-11-14");
        assert_eq!(record.last_activity, "2023-11-26");
        assert_eq!(record.description, "Ops & infra");
        assert_eq!(record.action, ChannelAction::New);
        assert!(record.target_value.is_empty());
    }

    #[test]
    fn refresh_keeps_name_while_rename_is_pending() {
        let channel = live("C1", "renamed-remotely");
        let mut record = ChannelRecord::from_live(&live("C1", "old-name"), ChannelAction::Keep);
        record.action = ChannelAction::Rename;
        record.target_value = "new-name".to_string();

        record.refresh_from_live(&channel);
        assert_eq!(record.name, "old-name");
        assert_eq!(record.member_count, 7);

        record.action = ChannelAction::Keep;
        record.target_value.clear();
        record.refresh_from_live(&channel);
        assert_eq!(record.name, "renamed-remotely");
    }

    #[test]
    fn epoch_timestamps_map_to_empty_dates() {
        assert_eq!(slack_ts_date("0"), "");
        assert_eq!(slack_ts_date("0.000000"), "");
        assert_eq!(slack_ts_date("garbage"), "");
        assert_eq!(format_epoch_date(0), "");
    }
}
