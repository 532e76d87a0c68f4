use crate::ledger::{ChannelAction, ChannelRecord};
use crate::slack::Channel;
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileSummary {
    pub refreshed: usize,
    pub added: usize,
    pub removed: usize,
    /// Removed records whose pending archive evidently completed out of band.
    pub archives_confirmed: usize,
}

/// Merge the live channel set into the ledger without discarding pending
/// operator intent. Order-stable: surviving records keep their relative
/// order, newly discovered channels are appended in enumeration order.
/// Idempotent: reconciling the result against the same live set is a no-op.
pub fn reconcile(
    ledger: &[ChannelRecord],
    live: &[Channel],
) -> (Vec<ChannelRecord>, ReconcileSummary) {
    let live_by_id: BTreeMap<&str, &Channel> = live
        .iter()
        .map(|channel| (channel.id.as_str(), channel))
        .collect();
    let known_ids: BTreeSet<&str> = ledger
        .iter()
        .map(|record| record.channel_id.as_str())
        .collect();

    let mut summary = ReconcileSummary::default();
    let mut records = Vec::with_capacity(ledger.len());

    for record in ledger {
        match live_by_id.get(record.channel_id.as_str()) {
            Some(channel) => {
                let mut updated = record.clone();
                updated.refresh_from_live(channel);
                if updated != *record {
                    summary.refreshed += 1;
                }
                records.push(updated);
            }
            None => {
                // Gone remotely. A pending archive counts as fulfilled, not
                // as data loss.
                summary.removed += 1;
                if record.action == ChannelAction::Archive {
                    summary.archives_confirmed += 1;
                }
            }
        }
    }

    for channel in live {
        if !known_ids.contains(channel.id.as_str()) {
            records.push(ChannelRecord::from_live(channel, ChannelAction::New));
            summary.added += 1;
        }
    }

    (records, summary)
}
