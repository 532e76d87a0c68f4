use chanwarden::actions::{execute_actions, ApprovalSession, ExecuteOptions, LiveIndex};
use chanwarden::ledger::{apply_successful_actions, ChannelAction, ChannelRecord};
use chanwarden::slack::SlackApiClient;
use std::io::Cursor;
use std::time::Duration;
use tempfile::tempdir;

mod common;
use common::{set_env, MockResponse, MockSlackServer, ENV_LOCK};

fn record(id: &str, name: &str, action: ChannelAction, target: &str) -> ChannelRecord {
    ChannelRecord {
        channel_id: id.to_string(),
        name: name.to_string(),
        description: String::new(),
        is_private: false,
        is_shared: false,
        member_count: 8,
        created_date: "2024-01-01".to_string(),
        last_activity: String::new(),
        action,
        target_value: target.to_string(),
        notes: String::new(),
    }
}

fn live_index(entries: &[(&str, &str)]) -> LiveIndex {
    LiveIndex::new(
        entries
            .iter()
            .map(|(id, name)| chanwarden::slack::Channel {
                id: id.to_string(),
                name: name.to_string(),
                num_members: 3,
                ..chanwarden::slack::Channel::default()
            })
            .collect(),
    )
}

fn options(batch_size: usize) -> ExecuteOptions {
    ExecuteOptions {
        dry_run: false,
        batch_size,
        action_delay: Duration::ZERO,
    }
}

fn session(input: &str) -> ApprovalSession<Cursor<Vec<u8>>, Vec<u8>> {
    ApprovalSession::new(Cursor::new(input.as_bytes().to_vec()), Vec::new())
}

fn info_json(id: &str, name: &str) -> String {
    format!(r#"{{"ok":true,"channel":{{"id":"{id}","name":"{name}","num_members":8}}}}"#)
}

#[test]
fn renames_execute_before_archives_and_the_ledger_clears_on_success() {
    let _env = ENV_LOCK.lock().unwrap_or_else(|err| err.into_inner());
    let server = MockSlackServer::start(|request| {
        let path = request.path.as_str();
        if path.starts_with("/api/conversations.info") {
            if path.contains("channel=C-B") {
                return MockResponse::ok(info_json("C-B", "old-name"));
            }
            return MockResponse::ok(info_json("C-A", "doomed"));
        }
        if path.starts_with("/api/conversations.rename") {
            return MockResponse::ok(
                r#"{"ok":true,"channel":{"id":"C-B","name":"new-name"}}"#,
            );
        }
        if path.starts_with("/api/conversations.join")
            || path.starts_with("/api/chat.postMessage")
            || path.starts_with("/api/conversations.archive")
        {
            return MockResponse::ok(r#"{"ok":true}"#);
        }
        MockResponse::error("unexpected_path")
    });
    set_env(&server.base_url);

    let temp = tempdir().expect("tempdir");
    let client = SlackApiClient::new("xoxb-test".to_string());
    let records = vec![
        record("C-A", "doomed", ChannelAction::Archive, "new-name"),
        record("C-B", "old-name", ChannelAction::Rename, "new-name"),
    ];
    let mut live = live_index(&[("C-A", "doomed"), ("C-B", "old-name")]);
    let mut session = session("y\ny\n");

    let report = execute_actions(
        &client,
        temp.path(),
        &records,
        &mut live,
        &options(0),
        &mut session,
    )
    .expect("execute");
    let requests = server.finish();

    assert_eq!(report.succeeded, 2);
    assert_eq!(report.failed, 0);
    assert_eq!(report.successful_ids, vec!["C-B".to_string(), "C-A".to_string()]);

    // The rename must land before the archive call.
    let rename_at = requests
        .iter()
        .position(|r| r.path.starts_with("/api/conversations.rename"))
        .expect("rename requested");
    let archive_at = requests
        .iter()
        .position(|r| r.path.starts_with("/api/conversations.archive"))
        .expect("archive requested");
    assert!(rename_at < archive_at);

    // The redirect notice references the post-rename name.
    let notice = requests
        .iter()
        .find(|r| r.path.starts_with("/api/chat.postMessage"))
        .expect("notice posted");
    assert!(notice.body.contains("#new-name"), "{}", notice.body);

    // Ledger maintenance: archive row leaves, rename row takes the new name.
    let updated = apply_successful_actions(records, &report.successful_ids);
    assert_eq!(updated.len(), 1);
    assert_eq!(updated[0].name, "new-name");
    assert_eq!(updated[0].action, ChannelAction::Keep);
    assert!(updated[0].target_value.is_empty());
}

#[test]
fn remote_name_drift_is_detected_at_execution_time_and_skipped() {
    let _env = ENV_LOCK.lock().unwrap_or_else(|err| err.into_inner());
    let server = MockSlackServer::start(|request| {
        if request.path.starts_with("/api/conversations.info") {
            return MockResponse::ok(info_json("C-B", "renamed-by-someone-else"));
        }
        MockResponse::error("unexpected_path")
    });
    set_env(&server.base_url);

    let temp = tempdir().expect("tempdir");
    let client = SlackApiClient::new("xoxb-test".to_string());
    let records = vec![record("C-B", "old-name", ChannelAction::Rename, "new-name")];
    let mut live = live_index(&[("C-B", "old-name")]);
    let mut session = session("y\n");

    let report = execute_actions(
        &client,
        temp.path(),
        &records,
        &mut live,
        &options(0),
        &mut session,
    )
    .expect("execute");
    let requests = server.finish();

    assert_eq!(report.skipped, 1);
    assert_eq!(report.succeeded, 0);
    assert!(
        !requests
            .iter()
            .any(|r| r.path.starts_with("/api/conversations.rename")),
        "stale record must not be mutated"
    );
    assert!(report.successful_ids.is_empty());
}

#[test]
fn vanished_channel_is_skipped_not_failed() {
    let _env = ENV_LOCK.lock().unwrap_or_else(|err| err.into_inner());
    let server = MockSlackServer::start(|request| {
        if request.path.starts_with("/api/conversations.info") {
            return MockResponse::error("channel_not_found");
        }
        MockResponse::error("unexpected_path")
    });
    set_env(&server.base_url);

    let temp = tempdir().expect("tempdir");
    let client = SlackApiClient::new("xoxb-test".to_string());
    let records = vec![record("C-GONE", "ghost", ChannelAction::Archive, "")];
    let mut live = live_index(&[]);
    let mut session = session("y\n");

    let report = execute_actions(
        &client,
        temp.path(),
        &records,
        &mut live,
        &options(0),
        &mut session,
    )
    .expect("execute");
    server.finish();

    assert_eq!(report.skipped, 1);
    assert_eq!(report.failed, 0);
}

#[test]
fn provider_rejection_keeps_the_record_pending_and_continues_the_run() {
    let _env = ENV_LOCK.lock().unwrap_or_else(|err| err.into_inner());
    let server = MockSlackServer::start(|request| {
        let path = request.path.as_str();
        if path.starts_with("/api/conversations.info") {
            if path.contains("channel=C-A") {
                return MockResponse::ok(info_json("C-A", "restricted"));
            }
            return MockResponse::ok(info_json("C-B", "old-name"));
        }
        if path.starts_with("/api/conversations.archive") {
            return MockResponse::error("restricted_action");
        }
        if path.starts_with("/api/conversations.rename") {
            return MockResponse::ok(
                r#"{"ok":true,"channel":{"id":"C-B","name":"new-name"}}"#,
            );
        }
        MockResponse::error("unexpected_path")
    });
    set_env(&server.base_url);

    let temp = tempdir().expect("tempdir");
    let client = SlackApiClient::new("xoxb-test".to_string());
    let records = vec![
        record("C-A", "restricted", ChannelAction::Archive, ""),
        record("C-B", "old-name", ChannelAction::Rename, "new-name"),
    ];
    let mut live = live_index(&[("C-A", "restricted"), ("C-B", "old-name")]);
    // Batch mode, approve the whole batch at once.
    let mut session = session("a\n");

    let report = execute_actions(
        &client,
        temp.path(),
        &records,
        &mut live,
        &options(10),
        &mut session,
    )
    .expect("execute");
    server.finish();

    // The rename succeeded even though the archive was rejected.
    assert_eq!(report.succeeded, 1);
    assert_eq!(report.failed, 1);
    assert_eq!(report.successful_ids, vec!["C-B".to_string()]);

    let updated = apply_successful_actions(records, &report.successful_ids);
    let archive_row = updated
        .iter()
        .find(|r| r.channel_id == "C-A")
        .expect("archive row kept");
    assert_eq!(archive_row.action, ChannelAction::Archive);
}
