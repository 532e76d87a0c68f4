#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CliVerb {
    Sync,
    Run,
    Doctor,
    Help,
    Unknown,
}

pub fn parse_cli_verb(input: &str) -> CliVerb {
    match input {
        "sync" => CliVerb::Sync,
        "run" => CliVerb::Run,
        "doctor" => CliVerb::Doctor,
        "help" | "--help" | "-h" => CliVerb::Help,
        _ => CliVerb::Unknown,
    }
}

pub fn cli_help_lines() -> Vec<String> {
    vec![
        "Commands:".to_string(),
        "  sync --file <ledger.csv> [--refresh] [--dry-run]    Reconcile the ledger against live channels".to_string(),
        "  run --file <ledger.csv> [--batch <n>] [--dry-run]   Execute approved ledger actions".to_string(),
        "  doctor                                              Check credentials, scopes, and local state".to_string(),
        String::new(),
        "The ledger action column accepts: keep, new, archive, rename, update_description.".to_string(),
        "rename and update_description require target_value; archive accepts an optional".to_string(),
        "redirect channel in target_value. Set SLACK_TOKEN in the environment.".to_string(),
    ]
}

pub(crate) fn help_text() -> String {
    cli_help_lines().join("\n")
}
