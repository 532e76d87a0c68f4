use super::approval::{describe_action, display_name, ApprovalSession, BatchDecision, ItemDecision};
use super::handler::ActionHandler;
use super::{ExecuteError, LiveIndex};
use crate::ledger::{validate_record, ChannelAction, ChannelRecord, LedgerError};
use crate::slack::SlackApiClient;
use std::io::{self, BufRead, Write};
use std::path::Path;
use std::thread;
use std::time::Duration;

const DIVIDER: &str =
    "================================================================================";

#[derive(Debug, Clone)]
pub struct ExecuteOptions {
    pub dry_run: bool,
    /// Records per approval batch; 0 disables batching.
    pub batch_size: usize,
    /// Pause between successful remote-mutating calls.
    pub action_delay: Duration,
}

#[derive(Debug, Clone, Default)]
pub struct ExecutionReport {
    pub successful_ids: Vec<String>,
    pub succeeded: usize,
    pub failed: usize,
    pub skipped: usize,
    pub cancelled: bool,
    pub last_success: Option<(ChannelAction, String)>,
}

impl ExecutionReport {
    pub fn total_processed(&self) -> usize {
        self.succeeded + self.failed + self.skipped
    }
}

/// Pending records in execution order: renames land before archives so
/// redirect notices and name lookups use final names. The sort is stable, so
/// same-priority records keep their ledger order.
pub fn sort_pending(records: &[ChannelRecord]) -> Vec<ChannelRecord> {
    let mut pending: Vec<ChannelRecord> = records
        .iter()
        .filter(|record| record.action.is_pending())
        .cloned()
        .collect();
    pending.sort_by_key(|record| record.action.priority());
    pending
}

/// Runs every pending action through approval, re-verifies each channel's
/// live state immediately before mutating it, and accumulates per-channel
/// outcomes. A single record's failure never aborts the batch; quitting stops
/// remaining work but still flushes the summary.
pub fn execute_actions<R: BufRead, W: Write>(
    client: &SlackApiClient,
    state_root: &Path,
    records: &[ChannelRecord],
    live: &mut LiveIndex,
    opts: &ExecuteOptions,
    session: &mut ApprovalSession<R, W>,
) -> Result<ExecutionReport, ExecuteError> {
    let mut pending = sort_pending(records);

    // Validation happens before any remote call; a bad row fails the run with
    // enough detail to fix the ledger.
    for record in &pending {
        validate_record(record)?;
        if record.action == ChannelAction::Archive {
            if let Some(channel) = live.get(&record.channel_id) {
                if channel.shared_externally() {
                    return Err(LedgerError::SharedChannelProtected {
                        channel: record.name.clone(),
                    }
                    .into());
                }
            }
        }
    }

    let mut report = ExecutionReport::default();
    if pending.is_empty() {
        writeln!(session.output(), "no pending actions")?;
        return Ok(report);
    }

    writeln!(session.output(), "{DIVIDER}")?;
    writeln!(
        session.output(),
        "executing {} pending channel actions (renames first, then archives)",
        pending.len()
    )?;

    if opts.dry_run {
        writeln!(session.output(), "dry run; no changes will be made")?;
        for record in &pending {
            writeln!(
                session.output(),
                "[dry-run] would {}: {}",
                describe_action(record),
                display_name(record)
            )?;
            report.succeeded += 1;
        }
        write_summary(session.output(), &report)?;
        return Ok(report);
    }

    let handler = ActionHandler::new(client, state_root);
    let mut delay_pending = false;

    'run: {
        if opts.batch_size == 0 {
            for index in 0..pending.len() {
                match session.review_record(&mut pending[index], live)? {
                    ItemDecision::Quit => {
                        report.cancelled = true;
                        break 'run;
                    }
                    ItemDecision::Skip => {
                        report.skipped += 1;
                        writeln!(session.output(), "skipped {}", display_name(&pending[index]))?;
                    }
                    ItemDecision::Approve => process_one(
                        client,
                        &handler,
                        &pending[index],
                        live,
                        session,
                        opts,
                        &mut report,
                        &mut delay_pending,
                    )?,
                }
            }
            break 'run;
        }

        let total = pending.len();
        let mut start = 0;
        while start < total {
            let end = (start + opts.batch_size).min(total);
            match session.review_batch(&pending[start..end])? {
                BatchDecision::Quit => {
                    report.cancelled = true;
                    break 'run;
                }
                BatchDecision::SkipAll => {
                    report.skipped += end - start;
                    writeln!(session.output(), "skipped {} actions", end - start)?;
                }
                BatchDecision::ApproveAll => {
                    for index in start..end {
                        process_one(
                            client,
                            &handler,
                            &pending[index],
                            live,
                            session,
                            opts,
                            &mut report,
                            &mut delay_pending,
                        )?;
                    }
                }
                BatchDecision::Individually => {
                    for index in start..end {
                        match session.review_record(&mut pending[index], live)? {
                            ItemDecision::Quit => {
                                report.cancelled = true;
                                break 'run;
                            }
                            ItemDecision::Skip => {
                                report.skipped += 1;
                                writeln!(
                                    session.output(),
                                    "skipped {}",
                                    display_name(&pending[index])
                                )?;
                            }
                            ItemDecision::Approve => process_one(
                                client,
                                &handler,
                                &pending[index],
                                live,
                                session,
                                opts,
                                &mut report,
                                &mut delay_pending,
                            )?,
                        }
                    }
                }
            }
            start = end;
        }
    }

    write_summary(session.output(), &report)?;
    Ok(report)
}

#[allow(clippy::too_many_arguments)]
fn process_one<R: BufRead, W: Write>(
    client: &SlackApiClient,
    handler: &ActionHandler<'_>,
    record: &ChannelRecord,
    live: &mut LiveIndex,
    session: &mut ApprovalSession<R, W>,
    opts: &ExecuteOptions,
    report: &mut ExecutionReport,
    delay_pending: &mut bool,
) -> io::Result<()> {
    // Staleness is detected at the point of execution, not enumeration time:
    // re-fetch this channel and skip if the world moved underneath us.
    let info = match client.channel_info(&record.channel_id) {
        Ok(info) => info,
        Err(err) => {
            report.failed += 1;
            return writeln!(
                session.output(),
                "failed {}: could not verify live state: {err}",
                display_name(record)
            );
        }
    };
    let stale = match &info {
        None => Some(format!("{} no longer exists", display_name(record))),
        Some(channel) if channel.is_archived => {
            Some(format!("{} is already archived", display_name(record)))
        }
        Some(channel) if channel.name != record.name => Some(format!(
            "#{} is now #{} remotely; the ledger row is stale",
            record.name, channel.name
        )),
        Some(_) => None,
    };
    if let Some(reason) = stale {
        report.skipped += 1;
        return writeln!(session.output(), "skipped: {reason}");
    }

    if *delay_pending {
        thread::sleep(opts.action_delay);
    }
    let outcome = handler.execute(record, live);
    if outcome.success {
        report.succeeded += 1;
        report.successful_ids.push(record.channel_id.clone());
        report.last_success = Some((record.action, record.name.clone()));
        if record.action == ChannelAction::Rename {
            live.rename(&record.channel_id, record.target_value.trim());
        }
        *delay_pending = true;
        writeln!(session.output(), "ok: {}", outcome.message)
    } else {
        report.failed += 1;
        writeln!(session.output(), "failed: {}", outcome.message)
    }
}

fn write_summary<W: Write>(output: &mut W, report: &ExecutionReport) -> io::Result<()> {
    writeln!(output, "{DIVIDER}")?;
    writeln!(output, "execution summary")?;
    writeln!(output, "  successful: {}", report.succeeded)?;
    writeln!(output, "  failed: {}", report.failed)?;
    writeln!(output, "  skipped: {}", report.skipped)?;
    writeln!(output, "  total processed: {}", report.total_processed())?;
    if report.cancelled {
        writeln!(
            output,
            "cancelled by operator; already-applied actions remain applied"
        )?;
    }
    if let Some((ChannelAction::Archive, name)) = &report.last_success {
        writeln!(
            output,
            "note: to undo the archive of #{name}, open the channel in slack and choose `unarchive channel` under additional options"
        )?;
    }
    Ok(())
}
