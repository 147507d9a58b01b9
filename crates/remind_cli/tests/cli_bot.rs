use assert_cmd::Command;
use predicates::prelude::*;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

fn setup() -> (TempDir, PathBuf) {
    let dir = TempDir::new().unwrap();
    let store_path = dir.path().join("tasks.json");
    (dir, store_path)
}

fn write_store(path: &Path, tasks: serde_json::Value) {
    let content = serde_json::json!({
        "schema_version": 1,
        "tasks": tasks
    });
    std::fs::write(path, serde_json::to_string_pretty(&content).unwrap()).unwrap();
}

fn bot_cmd(dir: &TempDir, store_path: &Path) -> Command {
    let mut cmd = Command::cargo_bin("remind_bot").unwrap();
    cmd.env("REMIND_STORE_PATH", store_path)
        .env("REMIND_CONFIG_PATH", dir.path().join("config.json"))
        .env("REMIND_DISABLE_NOTIFICATIONS", "1")
        .args(["--config-override", "utc_offset=Z"]);
    cmd
}

#[test]
fn chat_session_answers_each_line() {
    let (dir, store_path) = setup();

    bot_cmd(&dir, &store_path)
        .write_stdin("/add [Home] water plants\n/list\n/done water plants\n/history\nexit\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("Bot is running"))
        .stdout(predicate::str::contains("✅ Task added: water plants in Home"))
        .stdout(predicate::str::contains("📂 Home:\n1. water plants"))
        .stdout(predicate::str::contains("✅ Marked as done: water plants"))
        .stdout(predicate::str::contains("📜 Completed Tasks:\n1. water plants"));
}

#[test]
fn chat_errors_are_replies_not_failures() {
    let (dir, store_path) = setup();

    bot_cmd(&dir, &store_path)
        .write_stdin("/done ghost\n/add\n/bogus\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("⚠️ no pending task matches 'ghost'"))
        .stdout(predicate::str::contains("⚠️ please provide a task description"))
        .stdout(predicate::str::contains("⚠️ unrecognized subcommand"));
}

#[test]
fn startup_announces_missed_one_shot_tasks() {
    let (dir, store_path) = setup();
    write_store(
        &store_path,
        serde_json::json!([
            {
                "id": 1,
                "list_name": "General",
                "description": "call bank",
                "scheduled_at": "2000-01-01T10:00:00Z",
                "status": "pending",
                "created_at": "1999-12-31T08:00:00Z"
            },
            {
                "id": 2,
                "list_name": "General",
                "description": "far away",
                "scheduled_at": "2099-01-01T10:00:00Z",
                "status": "pending",
                "created_at": "1999-12-31T08:00:00Z"
            }
        ]),
    );

    bot_cmd(&dir, &store_path)
        .write_stdin("exit\n")
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "⚠️ Missed reminders while offline:\n- call bank at 2000-01-01 10:00",
        ))
        .stdout(predicate::str::contains("far away").not());
}

#[test]
fn startup_moves_stale_recurring_tasks_forward() {
    let (dir, store_path) = setup();
    write_store(
        &store_path,
        serde_json::json!([
            {
                "id": 1,
                "list_name": "General",
                "description": "standup",
                "scheduled_at": "2000-01-03T09:15:00Z",
                "repeat": "weekly",
                "status": "pending",
                "created_at": "1999-12-31T08:00:00Z"
            }
        ]),
    );

    bot_cmd(&dir, &store_path)
        .write_stdin("")
        .assert()
        .success()
        .stdout(predicate::str::contains("Missed reminders").not());

    let stored: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&store_path).unwrap()).unwrap();
    let next = OffsetDateTime::parse(
        stored["tasks"][0]["scheduled_at"].as_str().unwrap(),
        &Rfc3339,
    )
    .unwrap();
    assert!(next > OffsetDateTime::now_utc());
    assert_eq!(next.weekday(), time::Weekday::Monday);
    assert_eq!((next.hour(), next.minute()), (9, 15));
}
