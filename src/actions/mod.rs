use crate::ledger::LedgerError;
use crate::slack::Channel;

pub mod approval;
pub mod executor;
pub mod handler;

pub use approval::{ApprovalSession, BatchDecision, ItemDecision};
pub use executor::{execute_actions, ExecuteOptions, ExecutionReport};
pub use handler::{ActionHandler, ActionOutcome};

#[derive(Debug, thiserror::Error)]
pub enum ExecuteError {
    #[error("ledger validation failed: {0}")]
    Validation(#[from] LedgerError),
    #[error("prompt io failed: {0}")]
    Io(#[from] std::io::Error),
}

/// Execution-run snapshot of the live channel set, used for name-collision
/// and redirect-target checks without a remote call per record. Renames
/// applied during the run are folded in so later records see final names.
#[derive(Debug, Default)]
pub struct LiveIndex {
    channels: Vec<Channel>,
}

impl LiveIndex {
    pub fn new(channels: Vec<Channel>) -> Self {
        Self { channels }
    }

    pub fn get(&self, channel_id: &str) -> Option<&Channel> {
        self.channels.iter().find(|ch| ch.id == channel_id)
    }

    pub fn find_by_name(&self, name: &str) -> Option<&Channel> {
        self.channels.iter().find(|ch| ch.name == name)
    }

    pub fn name_in_use(&self, name: &str, exclude_id: &str) -> bool {
        self.channels
            .iter()
            .any(|ch| ch.name == name && ch.id != exclude_id)
    }

    pub fn rename(&mut self, channel_id: &str, new_name: &str) {
        if let Some(channel) = self.channels.iter_mut().find(|ch| ch.id == channel_id) {
            channel.name = new_name.to_string();
        }
    }
}
