use crate::app::cli::{help_text, parse_cli_verb, CliVerb};
use crate::config::{default_state_root, load_settings, Settings};
use crate::ledger::LedgerError;
use crate::slack::{load_env_token, SlackApiClient, SlackError};
use std::fs;
use std::path::PathBuf;

pub mod doctor;
pub mod run;
pub mod sync;

pub fn run_cli(args: Vec<String>) -> Result<String, String> {
    if args.is_empty() {
        return Ok(help_text());
    }
    match parse_cli_verb(args[0].as_str()) {
        CliVerb::Sync => sync::cmd_sync(&args[1..]),
        CliVerb::Run => run::cmd_run(&args[1..]),
        CliVerb::Doctor => doctor::cmd_doctor(),
        CliVerb::Help => Ok(help_text()),
        CliVerb::Unknown => Err(format!("unknown command `{}`", args[0])),
    }
}

/// Remote-API failures and configuration failures are reported as distinct
/// categories, one line each, no backtrace.
pub(crate) fn slack_error_message(err: &SlackError) -> String {
    if err.is_configuration() {
        format!("configuration error: {err}")
    } else {
        format!("slack api error: {err}")
    }
}

pub(crate) fn ledger_error_message(err: &LedgerError) -> String {
    format!("ledger error: {err}")
}

pub(crate) fn load_settings_checked() -> Result<Settings, String> {
    load_settings().map_err(|err| format!("configuration error: {err}"))
}

pub(crate) fn ensure_state_root() -> Result<PathBuf, String> {
    let root = default_state_root().map_err(|err| format!("configuration error: {err}"))?;
    fs::create_dir_all(&root)
        .map_err(|err| format!("failed to create {}: {err}", root.display()))?;
    Ok(root)
}

pub(crate) fn build_client() -> Result<SlackApiClient, String> {
    let token = load_env_token().map_err(|err| slack_error_message(&err))?;
    Ok(SlackApiClient::new(token))
}
