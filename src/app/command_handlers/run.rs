use super::{
    build_client, ensure_state_root, ledger_error_message, load_settings_checked,
    slack_error_message,
};
use crate::actions::{execute_actions, ApprovalSession, ExecuteError, ExecuteOptions, LiveIndex};
use crate::ledger::{apply_successful_actions, CsvStore, LedgerStore};
use crate::shared::logging::log_best_effort;
use crate::slack::validate_startup_credentials;
use std::collections::BTreeMap;
use std::io;
use std::time::Duration;

#[derive(Debug, Default)]
struct RunArgs {
    file: Option<String>,
    dry_run: bool,
    batch: Option<usize>,
}

fn parse_args(args: &[String]) -> Result<RunArgs, String> {
    let mut parsed = RunArgs::default();
    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--file" | "-f" => {
                i += 1;
                parsed.file = Some(
                    args.get(i)
                        .cloned()
                        .ok_or_else(|| "`--file` requires a path".to_string())?,
                );
            }
            "--dry-run" | "-d" => parsed.dry_run = true,
            "--batch" | "-b" => {
                i += 1;
                let raw = args
                    .get(i)
                    .ok_or_else(|| "`--batch` requires a number".to_string())?;
                parsed.batch = Some(
                    raw.parse()
                        .map_err(|_| format!("`--batch` requires a number, got `{raw}`"))?,
                );
            }
            other => return Err(format!("unknown argument `{other}`")),
        }
        i += 1;
    }
    Ok(parsed)
}

fn execute_error_message(err: ExecuteError) -> String {
    match err {
        ExecuteError::Validation(err) => ledger_error_message(&err),
        ExecuteError::Io(err) => format!("prompt io failed: {err}"),
    }
}

pub fn cmd_run(args: &[String]) -> Result<String, String> {
    let parsed = parse_args(args)?;
    let file = parsed
        .file
        .ok_or_else(|| "usage: run --file <ledger.csv> [--batch <n>] [--dry-run]".to_string())?;

    let settings = load_settings_checked()?;
    let state_root = ensure_state_root()?;
    let client = build_client()?;
    validate_startup_credentials(&client).map_err(|err| slack_error_message(&err))?;

    let store = CsvStore::new(&file);
    let records = store.read().map_err(|err| ledger_error_message(&err))?;

    let mut action_counts: BTreeMap<&'static str, usize> = BTreeMap::new();
    for record in &records {
        if record.action.is_pending() {
            *action_counts.entry(record.action.as_str()).or_default() += 1;
        }
    }
    if action_counts.is_empty() {
        return Ok(format!(
            "no pending actions in {file}; run `chanwarden sync` to refresh the ledger"
        ));
    }
    println!("pending actions in {file}:");
    for (action, count) in &action_counts {
        println!("  {action}: {count}");
    }

    // One live snapshot per execution run; target existence and name
    // collisions validate against it instead of a remote call per record.
    let listing = client
        .list_channels(
            settings.page_size,
            Duration::from_millis(settings.page_pause_ms),
        )
        .map_err(|err| slack_error_message(&err))?;
    let mut live = LiveIndex::new(listing.channels);

    if !parsed.dry_run {
        match store.backup() {
            Some(path) => println!("ledger backed up to {}", path.display()),
            None => log_best_effort(&state_root, &format!("ledger backup skipped for {file}")),
        }
    }

    let opts = ExecuteOptions {
        dry_run: parsed.dry_run,
        batch_size: parsed.batch.unwrap_or(settings.batch_size),
        action_delay: Duration::from_millis(settings.action_delay_ms),
    };
    let report = {
        let stdin = io::stdin();
        let stdout = io::stdout();
        let mut session = ApprovalSession::new(stdin.lock(), stdout.lock());
        execute_actions(
            &client,
            &state_root,
            &records,
            &mut live,
            &opts,
            &mut session,
        )
        .map_err(execute_error_message)?
    };

    let mut lines = Vec::new();
    if !parsed.dry_run && !report.successful_ids.is_empty() {
        let updated = apply_successful_actions(records, &report.successful_ids);
        store
            .write(&updated)
            .map_err(|err| ledger_error_message(&err))?;
        lines.push(format!(
            "cleared {} completed actions in {file}",
            report.successful_ids.len()
        ));
    }
    if report.cancelled {
        lines.push("run cancelled; remaining actions are still pending in the ledger".to_string());
    } else {
        lines.push("run complete".to_string());
    }
    Ok(lines.join("\n"))
}
