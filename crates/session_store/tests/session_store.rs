use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use assert_matches::assert_matches;
use hjl::HjlError;
use serde_json::json;
use session_store::{
    latest_session, session_root, SessionEntryKind, SessionStore, SessionStoreError,
};
use tempfile::TempDir;

fn write_session_file(records: &[String]) -> (TempDir, PathBuf) {
    let dir = tempfile::tempdir().expect("tempdir should be created");
    let path = dir.path().join("session.hjl");
    let mut file = File::create(&path).expect("session file should be created");

    for record in records {
        write!(file, "{record}").expect("record should be written");
    }

    (dir, path)
}

fn header_record(cwd: &Path) -> String {
    format!(
        "{}\n",
        json!({
            "type": "session",
            "version": 1,
            "session_id": "session-1",
            "created_at": "2026-02-14T00:00:00Z",
            "cwd": cwd.display().to_string(),
        })
    )
}

fn text_entry_record(
    kind: &str,
    id: &str,
    parent_id: Option<&str>,
    ts: &str,
    text: &str,
) -> String {
    format!(
        "{}\n.text = <<END0\n{text}END0\n",
        json!({
            "type": "entry",
            "id": id,
            "parent_id": parent_id,
            "ts": ts,
            "kind": kind,
        })
    )
}

fn user_entry_record(id: &str, parent_id: Option<&str>, text: &str) -> String {
    text_entry_record("user_text", id, parent_id, "2026-02-14T00:00:01Z", text)
}

fn assistant_entry_record(id: &str, parent_id: Option<&str>, text: &str) -> String {
    text_entry_record(
        "assistant_text",
        id,
        parent_id,
        "2026-02-14T00:00:02Z",
        text,
    )
}

fn absolute_tempdir() -> TempDir {
    tempfile::tempdir().expect("tempdir should be created")
}

#[test]
fn open_rejects_missing_header() {
    let (_dir, path) = write_session_file(&[]);

    let error = SessionStore::open(&path)
        .err()
        .expect("empty file must fail");
    assert_matches!(error, SessionStoreError::MissingHeader { .. });
}

#[test]
fn open_rejects_non_header_first_record() {
    let (_dir, path) = write_session_file(&[user_entry_record("entry-1", None, "hello\n")]);

    let error = SessionStore::open(&path)
        .err()
        .expect("entry as first record must fail");
    assert_matches!(error, SessionStoreError::InvalidHeaderRecord { record: 1, .. });
}

#[test]
fn open_rejects_unsupported_header_version() {
    let (_dir, path) = write_session_file(&[format!(
        "{}\n",
        json!({
            "type": "session",
            "version": 2,
            "session_id": "session-1",
            "created_at": "2026-02-14T00:00:00Z",
            "cwd": "/tmp",
        })
    )]);

    let error = SessionStore::open(&path)
        .err()
        .expect("unsupported version must fail");
    assert_matches!(
        error,
        SessionStoreError::UnsupportedVersion {
            record: 1,
            found: 2,
            ..
        }
    );
}

#[test]
fn open_rejects_unknown_header_fields() {
    let (_dir, path) = write_session_file(&[format!(
        "{}\n",
        json!({
            "type": "session",
            "version": 1,
            "session_id": "session-1",
            "created_at": "2026-02-14T00:00:00Z",
            "cwd": "/tmp",
            "unexpected": true,
        })
    )]);

    let error = SessionStore::open(&path)
        .err()
        .expect("unknown header field must fail");
    assert_matches!(error, SessionStoreError::RecordShape { record: 1, .. });
}

#[test]
fn open_rejects_relative_cwd() {
    let (_dir, path) = write_session_file(&[header_record(Path::new("relative/dir"))]);

    let error = SessionStore::open(&path)
        .err()
        .expect("relative cwd must fail");
    assert_matches!(error, SessionStoreError::NonAbsoluteCwd { record: 1, .. });
}

#[test]
fn open_rejects_malformed_record_with_record_context() {
    let temp = absolute_tempdir();
    let (_dir, path) = write_session_file(&[
        header_record(temp.path()),
        "{ this is invalid json\n".to_string(),
    ]);

    let error = SessionStore::open(&path)
        .err()
        .expect("malformed record must fail");
    assert_matches!(
        error,
        SessionStoreError::Decode {
            record: 2,
            source: HjlError::Header { .. },
            ..
        }
    );
}

#[test]
fn open_rejects_unterminated_heredoc() {
    let temp = absolute_tempdir();
    let (_dir, path) = write_session_file(&[
        header_record(temp.path()),
        "{\"type\":\"entry\",\"id\":\"e1\",\"parent_id\":null,\"ts\":\"2026-02-14T00:00:01Z\",\"kind\":\"user_text\"}\n.text = <<END0\ncut off".to_string(),
    ]);

    let error = SessionStore::open(&path)
        .err()
        .expect("truncated heredoc must fail");
    assert_matches!(
        error,
        SessionStoreError::Decode {
            record: 2,
            source: HjlError::TruncatedHeredoc { .. },
            ..
        }
    );
}

#[test]
fn open_rejects_unknown_entry_kind() {
    let temp = absolute_tempdir();
    let (_dir, path) = write_session_file(&[
        header_record(temp.path()),
        text_entry_record(
            "unknown_kind",
            "entry-1",
            None,
            "2026-02-14T00:00:01Z",
            "hi",
        ),
    ]);

    let error = SessionStore::open(&path)
        .err()
        .expect("unknown entry kind must fail");
    assert_matches!(error, SessionStoreError::RecordShape { record: 2, .. });
}

#[test]
fn open_rejects_second_session_header() {
    let temp = absolute_tempdir();
    let (_dir, path) = write_session_file(&[header_record(temp.path()), header_record(temp.path())]);

    let error = SessionStore::open(&path)
        .err()
        .expect("second header must fail");
    assert_matches!(error, SessionStoreError::InvalidEntryRecord { record: 2, .. });
}

#[test]
fn open_rejects_invalid_timestamp() {
    let temp = absolute_tempdir();
    let (_dir, path) = write_session_file(&[
        header_record(temp.path()),
        text_entry_record("user_text", "entry-1", None, "yesterday", "hi\n"),
    ]);

    let error = SessionStore::open(&path)
        .err()
        .expect("invalid timestamp must fail");
    assert_matches!(
        error,
        SessionStoreError::InvalidTimestamp {
            record: 2,
            field: "ts",
            ..
        }
    );
}

#[test]
fn open_rejects_duplicate_entry_ids() {
    let temp = absolute_tempdir();
    let (_dir, path) = write_session_file(&[
        header_record(temp.path()),
        user_entry_record("entry-1", None, "hello\n"),
        assistant_entry_record("entry-1", None, "hi\n"),
    ]);

    let error = SessionStore::open(&path)
        .err()
        .expect("duplicate ids must fail");
    assert_matches!(
        error,
        SessionStoreError::DuplicateEntryId { record: 3, ref id, .. } if id == "entry-1"
    );
}

#[test]
fn open_rejects_dangling_parent() {
    let temp = absolute_tempdir();
    let (_dir, path) = write_session_file(&[
        header_record(temp.path()),
        user_entry_record("entry-1", Some("missing"), "hello\n"),
    ]);

    let error = SessionStore::open(&path)
        .err()
        .expect("dangling parent must fail");
    assert_matches!(
        error,
        SessionStoreError::DanglingParentId { record: 2, ref parent_id, .. } if parent_id == "missing"
    );
}

#[test]
fn open_reads_heredoc_entries_and_comments() {
    let temp = absolute_tempdir();
    let (_dir, path) = write_session_file(&[
        "# session exported for review\n".to_string(),
        header_record(temp.path()),
        user_entry_record("entry-1", None, "multi\nline\n"),
        "# reply follows\n".to_string(),
        assistant_entry_record("entry-2", Some("entry-1"), "no trailing newline"),
    ]);

    let store = SessionStore::open(&path).expect("session should open");
    assert_eq!(store.header().session_id, "session-1");
    assert_eq!(store.current_leaf_id(), Some("entry-2"));
    assert_eq!(store.entries().len(), 2);
    assert_eq!(
        store.entries()[0].kind,
        SessionEntryKind::UserText {
            text: "multi\nline\n".to_string()
        }
    );
    assert_eq!(
        store.entries()[1].kind,
        SessionEntryKind::AssistantText {
            text: "no trailing newline".to_string()
        }
    );
}

#[test]
fn create_new_rejects_relative_cwd() {
    let error = SessionStore::create_new(Path::new("relative"), None)
        .err()
        .expect("relative cwd must fail");
    assert_matches!(error, SessionStoreError::NonAbsoluteCreateCwd { .. });
}

#[test]
fn create_append_and_reopen_round_trip() {
    let temp = absolute_tempdir();
    let prompt = "You are terse.\nAnswer in one line.\n".to_string();

    let path = {
        let mut store =
            SessionStore::create_new(temp.path(), Some(prompt.clone())).expect("store created");
        assert!(store.path().starts_with(session_root(temp.path())));
        assert_eq!(store.current_leaf_id(), None);

        store
            .append(SessionEntryKind::UserText {
                text: "list files\n".to_string(),
            })
            .expect("user entry appended");
        store
            .append(SessionEntryKind::ToolCall {
                call_id: "call-1".to_string(),
                tool_name: "bash".to_string(),
                arguments: b"{\"cmd\":\"ls\"}\x00\xff".to_vec(),
            })
            .expect("tool call appended");
        store
            .append(SessionEntryKind::ToolResult {
                call_id: "call-1".to_string(),
                tool_name: "bash".to_string(),
                content: "a.txt\nEND0\n".to_string(),
                is_error: false,
            })
            .expect("tool result appended");
        store.path().to_path_buf()
    };

    let raw = fs::read(&path).expect("session file readable");
    let raw_text = String::from_utf8_lossy(&raw);
    assert!(raw_text.contains(".system_prompt = <<END0\nYou are terse.\n"));
    assert!(raw_text.contains(".content = <<END1\na.txt\nEND0\nEND1\n"));
    assert!(raw
        .windows(b"{\"cmd\":\"ls\"}\x00\xff".len())
        .any(|window| window == b"{\"cmd\":\"ls\"}\x00\xff"));

    let reopened = SessionStore::open(&path).expect("session reopens");
    assert_eq!(reopened.header().system_prompt.as_deref(), Some(prompt.as_str()));
    let branch = reopened.replay_leaf(None).expect("replay succeeds");
    let kinds = branch.iter().map(|entry| &entry.kind).collect::<Vec<_>>();
    assert_eq!(
        kinds,
        vec![
            &SessionEntryKind::UserText {
                text: "list files\n".to_string()
            },
            &SessionEntryKind::ToolCall {
                call_id: "call-1".to_string(),
                tool_name: "bash".to_string(),
                arguments: b"{\"cmd\":\"ls\"}\x00\xff".to_vec(),
            },
            &SessionEntryKind::ToolResult {
                call_id: "call-1".to_string(),
                tool_name: "bash".to_string(),
                content: "a.txt\nEND0\n".to_string(),
                is_error: false,
            },
        ]
    );
    assert_eq!(branch[0].parent_id, None);
    assert_eq!(branch[1].parent_id.as_deref(), Some(branch[0].id.as_str()));
}

#[test]
fn replay_follows_branch_after_leaf_moves() {
    let temp = absolute_tempdir();
    let mut store = SessionStore::create_new(temp.path(), None).expect("store created");

    let root_id = store
        .append(SessionEntryKind::UserText {
            text: "question\n".to_string(),
        })
        .expect("root appended")
        .id
        .clone();
    let first_answer = store
        .append(SessionEntryKind::AssistantText {
            text: "first answer\n".to_string(),
        })
        .expect("first answer appended")
        .id
        .clone();

    store.set_current_leaf(&root_id).expect("leaf exists");
    let second_answer = store
        .append(SessionEntryKind::AssistantText {
            text: "second answer\n".to_string(),
        })
        .expect("second answer appended")
        .id
        .clone();

    let reopened = SessionStore::open(store.path()).expect("session reopens");
    assert_eq!(reopened.current_leaf_id(), Some(second_answer.as_str()));

    let first_branch = reopened
        .replay_leaf(Some(&first_answer))
        .expect("first branch replays")
        .into_iter()
        .map(|entry| entry.id.clone())
        .collect::<Vec<_>>();
    assert_eq!(first_branch, vec![root_id.clone(), first_answer]);

    let second_branch = reopened
        .replay_leaf(None)
        .expect("second branch replays")
        .into_iter()
        .map(|entry| entry.id.clone())
        .collect::<Vec<_>>();
    assert_eq!(second_branch, vec![root_id, second_answer]);
}

#[test]
fn replay_rejects_unknown_leaf() {
    let temp = absolute_tempdir();
    let store = SessionStore::create_new(temp.path(), None).expect("store created");

    assert!(store.replay_leaf(None).expect("empty replay").is_empty());
    let error = store.replay_leaf(Some("nope")).err().expect("unknown leaf");
    assert_matches!(error, SessionStoreError::UnknownLeafId { ref leaf_id, .. } if leaf_id == "nope");
}

#[test]
fn replay_detects_parent_cycles() {
    let temp = absolute_tempdir();
    let (_dir, path) = write_session_file(&[
        header_record(temp.path()),
        user_entry_record("entry-1", Some("entry-2"), "a\n"),
        assistant_entry_record("entry-2", Some("entry-1"), "b\n"),
    ]);

    let store = SessionStore::open(&path).expect("cycle passes parent existence checks");
    let error = store.replay_leaf(None).err().expect("cycle must fail");
    assert_matches!(error, SessionStoreError::ReplayCycle { ref leaf_id, .. } if leaf_id == "entry-2");
}

#[test]
fn latest_session_picks_newest_file_name() {
    let temp = absolute_tempdir();
    let root = session_root(temp.path());
    assert_matches!(
        latest_session(temp.path()),
        Err(SessionStoreError::NoSessionsFound { .. })
    );

    fs::create_dir_all(&root).expect("root created");
    for name in [
        "2026-02-14T00-00-00Z_a.hjl",
        "2026-02-15T00-00-00Z_b.hjl",
        "2026-02-16T00-00-00Z_c.jsonl",
    ] {
        File::create(root.join(name)).expect("file created");
    }

    assert_eq!(
        latest_session(&root).expect("latest exists"),
        root.join("2026-02-15T00-00-00Z_b.hjl")
    );
}

#[test]
fn latest_session_orders_fractional_seconds_by_time() {
    let temp = absolute_tempdir();
    let root = session_root(temp.path());
    fs::create_dir_all(&root).expect("root created");
    for name in [
        "2026-02-14T00-00-00.1Z_a.hjl",
        "2026-02-14T00-00-00.12Z_b.hjl",
        "2026-02-14T00-00-01Z_c.hjl",
        "2026-02-14T00-00-01.5Z_d.hjl",
    ] {
        File::create(root.join(name)).expect("file created");
    }

    assert_eq!(
        latest_session(&root).expect("latest exists"),
        root.join("2026-02-14T00-00-01.5Z_d.hjl")
    );

    fs::remove_file(root.join("2026-02-14T00-00-01.5Z_d.hjl")).expect("file removed");
    fs::remove_file(root.join("2026-02-14T00-00-01Z_c.hjl")).expect("file removed");
    assert_eq!(
        latest_session(&root).expect("latest exists"),
        root.join("2026-02-14T00-00-00.12Z_b.hjl")
    );
}

#[test]
fn open_rejects_unknown_entry_fields() {
    let temp = absolute_tempdir();
    let (_dir, path) = write_session_file(&[
        header_record(temp.path()),
        format!(
            "{}\n.text = <<END0\nhi\nEND0\n",
            json!({
                "type": "entry",
                "id": "entry-1",
                "parent_id": null,
                "ts": "2026-02-14T00:00:01Z",
                "kind": "user_text",
                "unexpected": true,
            })
        ),
    ]);

    let error = SessionStore::open(&path)
        .err()
        .expect("unknown entry field must fail");
    assert_matches!(
        error,
        SessionStoreError::UnknownEntryField { record: 2, ref field, .. } if field == "unexpected"
    );
}

#[test]
fn reopens_session_with_single_line_output_over_ten_mebibytes() {
    let temp = absolute_tempdir();
    let content = "x".repeat(10 * 1024 * 1024 + 1);

    let mut store = SessionStore::create_new(temp.path(), None).expect("store created");
    store
        .append(SessionEntryKind::ToolResult {
            call_id: "call-1".to_string(),
            tool_name: "bash".to_string(),
            content: content.clone(),
            is_error: false,
        })
        .expect("large result appended");

    let reopened = SessionStore::open(store.path()).expect("session reopens");
    assert_matches!(
        &reopened.entries()[0].kind,
        SessionEntryKind::ToolResult { content: read_back, .. } if *read_back == content
    );
}
