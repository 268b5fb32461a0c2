//! E2E CLI tests for the move workflow.
//!
//! Each test runs the `ferry` binary as a subprocess in an isolated temp
//! directory: seed containers, members and issues, then inspect the picker
//! and perform moves through the same commands a user would.

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::Value;
use std::path::Path;
use tempfile::TempDir;

// ---------------------------------------------------------------------------
// Test Harness
// ---------------------------------------------------------------------------

/// Build a Command targeting the ferry binary, rooted in `dir`.
fn ferry(dir: &Path) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("ferry"));
    cmd.current_dir(dir);
    cmd.env("FERRY_LOG", "error");
    cmd.env("XDG_CONFIG_HOME", dir.join(".config"));
    cmd.env_remove("FERRY_ACTOR");
    cmd.env_remove("FERRY_FORMAT");
    cmd
}

fn run_json(dir: &Path, args: &[&str]) -> Value {
    let output = ferry(dir)
        .args(args)
        .arg("--json")
        .output()
        .expect("ferry should not crash");
    assert!(
        output.status.success(),
        "{args:?} failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    serde_json::from_slice(&output.stdout).expect("--json should produce valid JSON")
}

/// Project with `acme/old` and `acme/new`; rita is a reporter in both, gus a
/// guest in `acme/old`. `acme/old#1` exists with a short reference.
fn seeded_project() -> TempDir {
    let dir = TempDir::new().expect("create temp dir");
    let root = dir.path();
    ferry(root).arg("init").assert().success();
    for path in ["old", "new"] {
        ferry(root)
            .args(["container", "add", "acme", path])
            .assert()
            .success();
        ferry(root)
            .args(["member", "add", &format!("acme/{path}"), "rita", "reporter"])
            .assert()
            .success();
    }
    ferry(root)
        .args(["member", "add", "acme/old", "gus", "guest"])
        .assert()
        .success();
    ferry(root)
        .args([
            "issue",
            "create",
            "acme/old",
            "--title",
            "Crash on save",
            "--description",
            "Text with !1",
            "--author",
            "alice",
        ])
        .assert()
        .success();
    dir
}

// ---------------------------------------------------------------------------
// Picker
// ---------------------------------------------------------------------------

#[test]
fn reporter_sees_sentinel_then_destination() {
    let dir = seeded_project();
    let report = run_json(
        dir.path(),
        &["--actor", "rita", "destinations", "acme/old#1"],
    );

    assert_eq!(report["offered"], true);
    let destinations = report["destinations"].as_array().expect("array");
    assert_eq!(destinations.len(), 2);
    assert_eq!(destinations[0]["label"], "No project");
    assert_eq!(destinations[0]["value"], "none");
    assert_eq!(destinations[1]["value"], "acme/new");
}

#[test]
fn guest_is_not_offered_the_move() {
    let dir = seeded_project();
    let report = run_json(dir.path(), &["--actor", "gus", "destinations", "acme/old#1"]);
    assert_eq!(report["offered"], false);
    assert!(report["destinations"].as_array().expect("array").is_empty());
}

#[test]
fn destinations_require_an_actor() {
    let dir = seeded_project();
    ferry(dir.path())
        .args(["destinations", "acme/old#1", "--json"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("missing_actor"));
}

// ---------------------------------------------------------------------------
// Moves
// ---------------------------------------------------------------------------

#[test]
fn move_rewrites_content_and_tombstones_original() {
    let dir = seeded_project();
    let report = run_json(
        dir.path(),
        &["--actor", "rita", "move", "acme/old#1", "--to", "acme/new"],
    );

    assert_eq!(report["from"], "acme/old#1");
    assert_eq!(report["to"], "acme/new#1");
    assert_eq!(
        report["moved"]["description"],
        "Text with acme/old!1\n\nMoved from acme/old#1"
    );
    assert_eq!(report["moved"]["author"], "alice");
    assert_eq!(report["original"]["moved_to_reference"], "acme/new#1");
    assert_eq!(report["original"]["state"], "closed");

    let shown = run_json(dir.path(), &["issue", "show", "acme/old#1"]);
    assert_eq!(shown["description"], "Text with !1");
    assert_eq!(shown["moved_to_reference"], "acme/new#1");
    let notes = shown["notes"].as_array().expect("notes");
    assert_eq!(notes.last().expect("system note")["body"], "Moved to acme/new#1");
}

#[test]
fn notes_travel_with_the_issue() {
    let dir = seeded_project();
    ferry(dir.path())
        .args([
            "issue", "note", "acme/old#1", "--body", "dup of #7", "--author", "bob",
        ])
        .assert()
        .success();

    let report = run_json(
        dir.path(),
        &["--actor", "rita", "move", "acme/old#1", "--to", "acme/new"],
    );
    assert_eq!(report["copied_notes"], 1);

    let shown = run_json(dir.path(), &["issue", "show", "acme/new#1"]);
    let bodies: Vec<&str> = shown["notes"]
        .as_array()
        .expect("notes")
        .iter()
        .filter_map(|n| n["body"].as_str())
        .collect();
    assert!(bodies.contains(&"dup of acme/old#7"), "got {bodies:?}");
    assert!(bodies.contains(&"Moved from acme/old#1"), "got {bodies:?}");
}

#[test]
fn second_move_reports_already_moved() {
    let dir = seeded_project();
    ferry(dir.path())
        .args(["--actor", "rita", "move", "acme/old#1", "--to", "acme/new"])
        .assert()
        .success();

    ferry(dir.path())
        .args(["--actor", "rita", "move", "acme/old#1", "--to", "acme/new", "--json"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("E3001"));
}

#[test]
fn guest_move_is_unauthorized() {
    let dir = seeded_project();
    ferry(dir.path())
        .args(["--actor", "gus", "move", "acme/old#1", "--to", "acme/new"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("E3002"))
        .stderr(predicate::str::contains("source"));
}

#[test]
fn sentinel_and_same_container_are_invalid_destinations() {
    let dir = seeded_project();
    for to in ["none", "acme/old"] {
        ferry(dir.path())
            .args(["--actor", "rita", "move", "acme/old#1", "--to", to])
            .assert()
            .failure()
            .stderr(predicate::str::contains("E3003"));
    }

    let shown = run_json(dir.path(), &["issue", "show", "acme/old#1"]);
    assert_eq!(shown["moved_to"], Value::Null);
    assert_eq!(shown["state"], "opened");
}

#[test]
fn unknown_and_hidden_destinations_look_the_same() {
    let dir = seeded_project();
    ferry(dir.path())
        .args(["container", "add", "acme", "secret"])
        .assert()
        .success();

    let mut errors = Vec::new();
    for to in ["acme/ghost", "acme/secret"] {
        let output = ferry(dir.path())
            .args(["--actor", "rita", "move", "acme/old#1", "--to", to, "--json"])
            .output()
            .expect("ferry should not crash");
        assert!(!output.status.success(), "move to {to} should fail");
        let value: Value = serde_json::Deserializer::from_slice(&output.stderr)
            .into_iter()
            .next()
            .expect("error document on stderr")
            .expect("JSON error");
        assert_eq!(value["error"]["error_code"], "E3003", "move to {to}");
        errors.push(
            value["error"]["message"]
                .as_str()
                .expect("message")
                .replace(to, "<path>"),
        );
    }
    assert_eq!(errors[0], errors[1], "a private container must not be revealed");

    let shown = run_json(dir.path(), &["issue", "show", "acme/old#1"]);
    assert_eq!(shown["moved_to"], Value::Null);
}

#[test]
fn guest_minimum_in_config_is_refused() {
    let dir = seeded_project();
    std::fs::write(
        dir.path().join(".ferry").join("config.toml"),
        "[move]\nmin_access = \"guest\"\n",
    )
    .expect("write config");

    ferry(dir.path())
        .args(["--actor", "gus", "move", "acme/old#1", "--to", "acme/new", "--json"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("E1002"));

    let shown = run_json(dir.path(), &["issue", "show", "acme/old#1"]);
    assert_eq!(shown["moved_to"], Value::Null);
}

#[test]
fn project_config_can_credit_the_actor() {
    let dir = seeded_project();
    std::fs::write(
        dir.path().join(".ferry").join("config.toml"),
        "[move]\nauthor = \"actor\"\nclose_original = false\n",
    )
    .expect("write config");

    let report = run_json(
        dir.path(),
        &["--actor", "rita", "move", "acme/old#1", "--to", "acme/new"],
    );
    assert_eq!(report["moved"]["author"], "rita");
    assert_eq!(report["original"]["state"], "opened");
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[test]
fn commands_before_init_fail_with_hint() {
    let dir = TempDir::new().expect("create temp dir");
    ferry(dir.path())
        .args(["container", "list"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("E1001"))
        .stderr(predicate::str::contains("ferry init"));
}

#[test]
fn unknown_issue_is_reported() {
    let dir = seeded_project();
    ferry(dir.path())
        .args(["issue", "show", "acme/old#42"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("E2002"));
}
