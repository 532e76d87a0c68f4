use crate::config::{default_settings_path, default_state_root, load_settings};
use crate::enumerate::activity_cache::{cache_path, load_cache};
use crate::slack::{load_env_token, validate_startup_credentials, SlackApiClient};

#[derive(Debug, Clone)]
struct DoctorFinding {
    id: &'static str,
    ok: bool,
    detail: String,
}

fn finding(id: &'static str, ok: bool, detail: impl Into<String>) -> DoctorFinding {
    DoctorFinding {
        id,
        ok,
        detail: detail.into(),
    }
}

pub fn cmd_doctor() -> Result<String, String> {
    let mut findings = Vec::new();

    match default_settings_path() {
        Ok(path) if path.exists() => match load_settings() {
            Ok(_) => findings.push(finding("settings", true, path.display().to_string())),
            Err(err) => findings.push(finding("settings", false, err.to_string())),
        },
        Ok(path) => findings.push(finding(
            "settings",
            true,
            format!("{} absent; using defaults", path.display()),
        )),
        Err(err) => findings.push(finding("settings", false, err.to_string())),
    }

    let token = match load_env_token() {
        Ok(token) => {
            findings.push(finding("token", true, "SLACK_TOKEN is set"));
            Some(token)
        }
        Err(err) => {
            findings.push(finding("token", false, err.to_string()));
            None
        }
    };

    if let Some(token) = token {
        let client = SlackApiClient::new(token);
        match validate_startup_credentials(&client) {
            Ok(identity) => findings.push(finding(
                "credentials",
                true,
                format!("connected as {} to {}", identity.user, identity.team),
            )),
            Err(err) => findings.push(finding("credentials", false, err.to_string())),
        }
    }

    match default_state_root() {
        Ok(root) => {
            let path = cache_path(&root);
            if path.exists() {
                let cache = load_cache(&root, u64::MAX / 3600);
                findings.push(finding(
                    "activity-cache",
                    true,
                    format!("{} entries at {}", cache.activity.len(), path.display()),
                ));
            } else {
                findings.push(finding(
                    "activity-cache",
                    true,
                    "absent; next sync will build it",
                ));
            }
        }
        Err(err) => findings.push(finding("activity-cache", false, err.to_string())),
    }

    let mut lines = Vec::new();
    for item in &findings {
        let status = if item.ok { "ok" } else { "fail" };
        lines.push(format!("{:5} {:15} {}", status, item.id, item.detail));
    }
    if findings.iter().any(|item| !item.ok) {
        lines.push(String::new());
        lines.push("fix the failures above before running `sync` or `run`".to_string());
    }
    Ok(lines.join("\n"))
}
