use assert_cmd::Command;
use predicates::prelude::*;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

fn setup() -> (TempDir, PathBuf) {
    let dir = TempDir::new().unwrap();
    let store_path = dir.path().join("tasks.json");
    (dir, store_path)
}

fn bot_cmd(dir: &TempDir, store_path: &Path) -> Command {
    let mut cmd = Command::cargo_bin("remind_bot").unwrap();
    cmd.env("REMIND_STORE_PATH", store_path)
        .env("REMIND_CONFIG_PATH", dir.path().join("config.json"))
        .env("REMIND_DISABLE_NOTIFICATIONS", "1")
        .args(["--config-override", "utc_offset=Z"]);
    cmd
}

fn read_store(path: &Path) -> serde_json::Value {
    serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap()
}

#[test]
fn add_persists_normalized_task() {
    let (dir, store_path) = setup();

    bot_cmd(&dir, &store_path)
        .args([
            "add",
            "[Work]",
            "Finish",
            "report",
            "2099-01-01",
            "17:30",
            "repeat=daily",
            "priority=high",
        ])
        .assert()
        .success()
        .stdout(predicate::str::starts_with(
            "✅ Task added: Finish report 2099-01-01 17:30 at 2099-01-01 17:30 (daily)",
        ));

    let stored = read_store(&store_path);
    assert_eq!(stored["schema_version"], 1);
    let task = &stored["tasks"][0];
    assert_eq!(task["id"], 1);
    assert_eq!(task["list_name"], "Work");
    assert_eq!(task["description"], "Finish report 2099-01-01 17:30");
    assert_eq!(task["repeat"], "daily");
    assert_eq!(task["priority"], "high");
    assert_eq!(task["status"], "pending");
    assert_eq!(task["scheduled_at"], "2099-01-01T17:30:00Z");
}

#[test]
fn add_without_description_fails() {
    let (dir, store_path) = setup();

    bot_cmd(&dir, &store_path)
        .args(["add", "[Work]", "priority=high"])
        .assert()
        .failure()
        .stderr(predicate::str::contains(
            "ERROR: invalid_input - please provide a task description",
        ));

    assert!(!store_path.exists());
}

#[test]
fn add_with_unknown_priority_fails() {
    let (dir, store_path) = setup();

    bot_cmd(&dir, &store_path)
        .args(["add", "stuff", "priority=urgent"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("ERROR: invalid_input"));
}

#[test]
fn add_with_malformed_time_fails() {
    let (dir, store_path) = setup();

    bot_cmd(&dir, &store_path)
        .args(["add", "meeting", "25:99"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("ERROR: invalid_input - invalid time"));
}

#[test]
fn add_in_the_past_warns_that_no_reminder_follows() {
    let (dir, store_path) = setup();

    bot_cmd(&dir, &store_path)
        .args(["add", "pay", "rent", "2000-01-01", "09:00"])
        .assert()
        .success()
        .stdout(predicate::str::contains("no reminder will be sent"));

    let stored = read_store(&store_path);
    assert_eq!(stored["tasks"][0]["scheduled_at"], "2000-01-01T09:00:00Z");
}

#[test]
fn add_json_output() {
    let (dir, store_path) = setup();

    let output = bot_cmd(&dir, &store_path)
        .args(["--json", "add", "buy", "milk"])
        .output()
        .unwrap();

    assert!(output.status.success());
    let payload: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(payload["registered"], false);
    assert_eq!(payload["task"]["description"], "buy milk");
    assert_eq!(payload["task"]["list_name"], "General");
    assert_eq!(payload["task"]["scheduled_at"], serde_json::Value::Null);
}

#[test]
fn ids_keep_counting_after_clear() {
    let (dir, store_path) = setup();

    bot_cmd(&dir, &store_path).args(["add", "one"]).assert().success();
    bot_cmd(&dir, &store_path).args(["add", "two"]).assert().success();
    bot_cmd(&dir, &store_path)
        .arg("clear")
        .assert()
        .success()
        .stdout(predicate::str::contains("🧹 All tasks cleared!"));
    bot_cmd(&dir, &store_path).args(["add", "three"]).assert().success();

    let stored = read_store(&store_path);
    assert_eq!(stored["tasks"].as_array().unwrap().len(), 1);
    assert_eq!(stored["tasks"][0]["id"], 3);
}

#[test]
fn bad_config_override_fails() {
    let (dir, store_path) = setup();

    bot_cmd(&dir, &store_path)
        .args(["--config-override", "theme=dark", "list"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown config field 'theme'"));
}
