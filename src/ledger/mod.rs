use std::collections::BTreeSet;

pub mod action;
pub mod csv;
pub mod record;
pub mod store;

pub use action::{validate_channel_name, ChannelAction, NameError, MAX_CHANNEL_NAME_LEN};
pub use record::{ChannelRecord, LEDGER_HEADERS};
pub use store::{CsvStore, LedgerStore};

#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("failed to read ledger {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to write ledger {path}: {source}")]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("ledger {path} is missing required headers: {missing}")]
    MissingHeaders { path: String, missing: String },
    #[error("ledger {path} is malformed at line {line}: {reason}")]
    MalformedRow {
        path: String,
        line: usize,
        reason: String,
    },
    #[error("ledger {path} line {line} is missing required field `{field}`")]
    MissingField {
        path: String,
        line: usize,
        field: String,
    },
    #[error("unrecognized action `{action}` for channel `{channel}`")]
    UnknownAction { channel: String, action: String },
    #[error("action `{action}` on channel `{channel}` requires a target value")]
    TargetRequired { channel: String, action: String },
    #[error("action `{action}` on channel `{channel}` must not carry a target value")]
    TargetForbidden { channel: String, action: String },
    #[error("invalid target for channel `{channel}`: {source}")]
    InvalidTarget {
        channel: String,
        #[source]
        source: NameError,
    },
    #[error("channel `{channel}` is shared with an external organization and cannot be archived from here")]
    SharedChannelProtected { channel: String },
}

/// Row-level validation: action/target pairing, target name format, and the
/// shared-channel archive protection. Enforced before any remote call.
pub fn validate_record(record: &ChannelRecord) -> Result<(), LedgerError> {
    let target = record.target_value.trim();
    match record.action {
        ChannelAction::Keep | ChannelAction::New => {
            if !target.is_empty() {
                return Err(LedgerError::TargetForbidden {
                    channel: record.name.clone(),
                    action: record.action.to_string(),
                });
            }
        }
        ChannelAction::Rename => {
            if target.is_empty() {
                return Err(LedgerError::TargetRequired {
                    channel: record.name.clone(),
                    action: record.action.to_string(),
                });
            }
            validate_channel_name(target).map_err(|source| LedgerError::InvalidTarget {
                channel: record.name.clone(),
                source,
            })?;
        }
        ChannelAction::UpdateDescription => {
            if target.is_empty() {
                return Err(LedgerError::TargetRequired {
                    channel: record.name.clone(),
                    action: record.action.to_string(),
                });
            }
        }
        ChannelAction::Archive => {
            if record.is_shared {
                return Err(LedgerError::SharedChannelProtected {
                    channel: record.name.clone(),
                });
            }
            if !target.is_empty() {
                let redirect = target.trim_start_matches('#');
                validate_channel_name(redirect).map_err(|source| LedgerError::InvalidTarget {
                    channel: record.name.clone(),
                    source,
                })?;
            }
        }
    }
    Ok(())
}

/// Post-execution ledger maintenance: archived channels leave the ledger,
/// renames and description updates take their target value, and every
/// successfully processed record resets to `keep` with its target cleared.
pub fn apply_successful_actions(
    records: Vec<ChannelRecord>,
    successful_ids: &[String],
) -> Vec<ChannelRecord> {
    let succeeded: BTreeSet<&str> = successful_ids.iter().map(String::as_str).collect();
    let mut out = Vec::with_capacity(records.len());
    for mut record in records {
        if !succeeded.contains(record.channel_id.as_str()) {
            out.push(record);
            continue;
        }
        match record.action {
            ChannelAction::Archive => continue,
            ChannelAction::Rename => record.name = record.target_value.trim().to_string(),
            ChannelAction::UpdateDescription => {
                record.description = record.target_value.trim().to_string();
            }
            ChannelAction::Keep | ChannelAction::New => {}
        }
        record.action = ChannelAction::Keep;
        record.target_value.clear();
        out.push(record);
    }
    out
}
