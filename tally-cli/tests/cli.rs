use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use assert_cmd::prelude::*;
use predicates::str::contains;
use tempfile::TempDir;

fn tally_cmd(home: &Path) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("tally"));
    cmd.env("HOME", home)
        .env("USERPROFILE", home)
        .env("RUST_LOG", "off")
        .env("NO_COLOR", "1");
    cmd
}

/// Writes a config rooted at `<workspace>/repo` and returns its path.
fn write_config(workspace: &TempDir) -> PathBuf {
    let repo = workspace.path().join("repo");
    fs::create_dir_all(&repo).expect("create repo");
    let path = workspace.path().join("config.yaml");
    fs::write(
        &path,
        format!(
            "repository_dir: {}\nzuora_objects: [account]\nworkflow_names: [Invoice Sync]\n",
            repo.display()
        ),
    )
    .expect("write config");
    path
}

fn write_form(workspace: &TempDir, body: &str) -> PathBuf {
    let path = workspace.path().join("form.json");
    fs::write(&path, body).expect("write form");
    path
}

fn prepare_plan_output(workspace: &TempDir) {
    let temp = workspace.path().join("repo").join("temp");
    fs::create_dir_all(temp.join("custom_fields")).expect("mkdir");
    fs::create_dir_all(temp.join("workflows")).expect("mkdir");
    fs::write(
        temp.join("plan.json"),
        r#"{"target_env": "qa", "planned_at": "2026-03-01T12:00:00Z"}"#,
    )
    .expect("manifest");
    fs::write(
        temp.join("custom_fields").join("diff.json"),
        r#"{"account": {
            "add": {"Region__c": {"type": "string"}},
            "update": {"Tier__c": {"old": {"maxLength": 10}, "new": {"maxLength": 20}}},
            "delete": {}
        }}"#,
    )
    .expect("fields diff");
    fs::write(
        temp.join("workflows").join("Invoice Sync-output-to-zuora.json"),
        "{}",
    )
    .expect("workflow payload");
}

#[test]
fn invalid_environment_in_form_fails_before_any_io() {
    let home = TempDir::new().expect("home");
    let workspace = TempDir::new().expect("workspace");
    let form = write_form(&workspace, r#"{"target_env": "sandbox", "include_custom_fields": true}"#);

    // No config exists; the form must be rejected first.
    tally_cmd(home.path())
        .args(["plan", "--form"])
        .arg(&form)
        .assert()
        .failure()
        .stderr(contains("sandbox"));
}

#[test]
fn missing_credentials_name_the_environment() {
    let home = TempDir::new().expect("home");
    let workspace = TempDir::new().expect("workspace");
    let config = write_config(&workspace);
    let form = write_form(&workspace, r#"{"target_env": "uat", "include_custom_fields": true}"#);

    tally_cmd(home.path())
        .arg("--config")
        .arg(&config)
        .args(["deploy", "--form"])
        .arg(&form)
        .assert()
        .failure()
        .stderr(contains("uat"));
}

#[test]
fn missing_default_config_is_reported() {
    let home = TempDir::new().expect("home");

    tally_cmd(home.path())
        .arg("status")
        .assert()
        .failure()
        .stderr(contains("config"));
}

#[test]
fn status_without_plan_output() {
    let home = TempDir::new().expect("home");
    let workspace = TempDir::new().expect("workspace");
    let config = write_config(&workspace);

    tally_cmd(home.path())
        .arg("--config")
        .arg(&config)
        .arg("status")
        .assert()
        .success()
        .stdout(contains("No plan manifest found."))
        .stdout(contains("Nothing to deploy"));
}

#[test]
fn status_lists_planned_changes() {
    let home = TempDir::new().expect("home");
    let workspace = TempDir::new().expect("workspace");
    let config = write_config(&workspace);
    prepare_plan_output(&workspace);

    tally_cmd(home.path())
        .arg("--config")
        .arg(&config)
        .args(["status", "--changes"])
        .assert()
        .success()
        .stdout(contains("qa"))
        .stdout(contains("account"))
        .stdout(contains("Invoice Sync"))
        .stdout(contains("account.Tier__c"))
        .stdout(contains("\"maxLength\": 20"));
}

#[test]
fn status_json_is_machine_readable() {
    let home = TempDir::new().expect("home");
    let workspace = TempDir::new().expect("workspace");
    let config = write_config(&workspace);
    prepare_plan_output(&workspace);

    let output = tally_cmd(home.path())
        .arg("--config")
        .arg(&config)
        .args(["status", "--json"])
        .output()
        .expect("run status");
    assert!(output.status.success());

    let parsed: serde_json::Value = serde_json::from_slice(&output.stdout).expect("valid JSON");
    assert_eq!(parsed["target_env"], "qa");
    let changes = parsed["changes"].as_array().expect("changes array");
    assert_eq!(changes.len(), 2);
    assert_eq!(changes[0]["unit"], "account");
    assert_eq!(changes[0]["add"], 1);
    assert_eq!(changes[0]["update"], 1);
    assert_eq!(changes[1]["kind"], "workflows");
}
