use super::{
    build_client, ensure_state_root, ledger_error_message, load_settings_checked,
    slack_error_message,
};
use crate::enumerate::{enumerate_channels, EnumerateOptions};
use crate::ledger::{CsvStore, LedgerStore};
use crate::reconcile::reconcile;
use crate::slack::validate_startup_credentials;

#[derive(Debug, Default)]
struct SyncArgs {
    file: Option<String>,
    refresh: bool,
    dry_run: bool,
}

fn parse_args(args: &[String]) -> Result<SyncArgs, String> {
    let mut parsed = SyncArgs::default();
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
            "--refresh" | "-r" => parsed.refresh = true,
            "--dry-run" | "-d" => parsed.dry_run = true,
            other => return Err(format!("unknown argument `{other}`")),
        }
        i += 1;
    }
    Ok(parsed)
}

pub fn cmd_sync(args: &[String]) -> Result<String, String> {
    let parsed = parse_args(args)?;
    let file = parsed
        .file
        .ok_or_else(|| "usage: sync --file <ledger.csv> [--refresh] [--dry-run]".to_string())?;

    let settings = load_settings_checked()?;
    let state_root = ensure_state_root()?;
    let client = build_client()?;
    let identity =
        validate_startup_credentials(&client).map_err(|err| slack_error_message(&err))?;

    let store = CsvStore::new(&file);
    let existing = if store.exists() {
        store.read().map_err(|err| ledger_error_message(&err))?
    } else {
        Vec::new()
    };

    let live = enumerate_channels(
        &client,
        &settings,
        &state_root,
        EnumerateOptions {
            use_cache: true,
            force_refresh: parsed.refresh,
            dry_run: parsed.dry_run,
        },
    )
    .map_err(|err| slack_error_message(&err))?;

    let (records, summary) = reconcile(&existing, &live);

    let mut lines = vec![
        format!("connected as {} to {}", identity.user, identity.team),
        format!("live channels: {}", live.len()),
        format!(
            "ledger: {} records ({} added, {} refreshed, {} removed, {} archives confirmed)",
            records.len(),
            summary.added,
            summary.refreshed,
            summary.removed,
            summary.archives_confirmed
        ),
    ];

    if parsed.dry_run {
        lines.push("dry run; ledger not written".to_string());
        return Ok(lines.join("\n"));
    }

    store
        .write(&records)
        .map_err(|err| ledger_error_message(&err))?;
    lines.push(format!("updated {file}"));
    lines.push(String::new());
    lines.push("next steps:".to_string());
    lines.push("  1. review the ledger; `new` rows are newly discovered channels awaiting triage".to_string());
    lines.push("  2. set the action column: keep, archive, rename, or update_description".to_string());
    lines.push("  3. archive rows may name a redirect channel in target_value".to_string());
    lines.push(format!(
        "  4. run `chanwarden run --file {file}` to execute your changes"
    ));
    Ok(lines.join("\n"))
}
