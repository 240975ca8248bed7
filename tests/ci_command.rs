//! End-to-end tests for `evalbox ci` — replayed events against a pipeline
//! file, exit-code mapping, and parity between ci.yaml and the built-in
//! definition.

#![allow(clippy::expect_used)]

use std::path::{Path, PathBuf};

use assert_cmd::Command;
use evalbox::ci::workflow::Workflow;
use predicates::prelude::*;
use tempfile::TempDir;

fn evalbox() -> Command {
    Command::cargo_bin("evalbox").expect("evalbox binary should exist")
}

fn write_event(dir: &Path, body: &str) -> PathBuf {
    let path = dir.join("event.json");
    std::fs::write(&path, body).expect("write event");
    path
}

/// A single-job pipeline whose one real step is `run`.
fn write_workflow(dir: &Path, run: &str) -> PathBuf {
    let path = dir.join("pipeline.yaml");
    let yaml = format!(
        "name: smoke\n\
         trigger:\n\
         \x20 branches: [main]\n\
         \x20 types: [opened, synchronize]\n\
         concurrency:\n\
         \x20 cancel-in-progress: true\n\
         jobs:\n\
         \x20 - id: check\n\
         \x20   runs-on: local\n\
         \x20   steps:\n\
         \x20     - name: main-step\n\
         \x20       run: \"{run}\"\n"
    );
    std::fs::write(&path, yaml).expect("write workflow");
    path
}

#[test]
fn test_ci_passing_pipeline_exits_zero() {
    let dir = TempDir::new().expect("tempdir");
    let event = write_event(
        dir.path(),
        r#"{"action":"opened","branch":"feature/x","base":"main"}"#,
    );
    let workflow = write_workflow(dir.path(), "true");

    evalbox()
        .args([
            "ci",
            "--event",
            &event.to_string_lossy(),
            "--workflow",
            &workflow.to_string_lossy(),
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("check passed"));
}

#[test]
fn test_ci_failing_pipeline_exits_one() {
    let dir = TempDir::new().expect("tempdir");
    let event = write_event(
        dir.path(),
        r#"{"action":"opened","branch":"feature/x","base":"main"}"#,
    );
    let workflow = write_workflow(dir.path(), "false");

    evalbox()
        .args([
            "ci",
            "--event",
            &event.to_string_lossy(),
            "--workflow",
            &workflow.to_string_lossy(),
        ])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("check failed"));
}

#[test]
fn test_ci_draft_event_skips_and_exits_zero() {
    let dir = TempDir::new().expect("tempdir");
    let event = write_event(
        dir.path(),
        r#"{"action":"opened","branch":"feature/x","base":"main","draft":true}"#,
    );
    let workflow = write_workflow(dir.path(), "false");

    evalbox()
        .args([
            "ci",
            "--event",
            &event.to_string_lossy(),
            "--workflow",
            &workflow.to_string_lossy(),
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("check skipped"));
}

#[test]
fn test_ci_non_triggering_event_exits_zero() {
    let dir = TempDir::new().expect("tempdir");
    let event = write_event(
        dir.path(),
        r#"{"action":"opened","branch":"feature/x","base":"develop"}"#,
    );
    let workflow = write_workflow(dir.path(), "false");

    evalbox()
        .args([
            "ci",
            "--event",
            &event.to_string_lossy(),
            "--workflow",
            &workflow.to_string_lossy(),
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("does not trigger"));
}

#[test]
fn test_ci_unbound_steps_do_not_inherit_secrets() {
    // Only the second step binds OPENAI_API_KEY; the first asserts the
    // variable is absent from its environment even though the evalbox
    // process itself carries it.
    let dir = TempDir::new().expect("tempdir");
    let event = write_event(
        dir.path(),
        r#"{"action":"opened","branch":"feature/x","base":"main"}"#,
    );
    let workflow = dir.path().join("pipeline.yaml");
    std::fs::write(
        &workflow,
        "name: scope\n\
         trigger:\n\
         \x20 branches: [main]\n\
         \x20 types: [opened]\n\
         concurrency:\n\
         \x20 cancel-in-progress: true\n\
         jobs:\n\
         \x20 - id: check\n\
         \x20   runs-on: local\n\
         \x20   steps:\n\
         \x20     - name: assert-unset\n\
         \x20       run: sh -c \"! printenv OPENAI_API_KEY\"\n\
         \x20     - name: assert-set\n\
         \x20       run: sh -c \"printenv OPENAI_API_KEY\"\n\
         \x20       env:\n\
         \x20         - name: OPENAI_API_KEY\n\
         \x20           secret: OPENAI_API_KEY\n",
    )
    .expect("write workflow");

    evalbox()
        .env("OPENAI_API_KEY", "sk-scoped")
        .args([
            "ci",
            "--event",
            &event.to_string_lossy(),
            "--workflow",
            &workflow.to_string_lossy(),
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("check passed"));
}

#[test]
fn test_ci_warns_about_unset_secret() {
    let dir = TempDir::new().expect("tempdir");
    let event = write_event(
        dir.path(),
        r#"{"action":"opened","branch":"feature/x","base":"main"}"#,
    );
    let workflow = dir.path().join("pipeline.yaml");
    std::fs::write(
        &workflow,
        "name: smoke\n\
         trigger:\n\
         \x20 branches: [main]\n\
         \x20 types: [opened]\n\
         concurrency:\n\
         \x20 cancel-in-progress: true\n\
         jobs:\n\
         \x20 - id: check\n\
         \x20   runs-on: local\n\
         \x20   steps:\n\
         \x20     - name: noop\n\
         \x20       run: \"true\"\n\
         \x20       env:\n\
         \x20         - name: EVALBOX_TEST_SECRET\n\
         \x20           secret: EVALBOX_TEST_SECRET\n",
    )
    .expect("write workflow");

    evalbox()
        .env_remove("EVALBOX_TEST_SECRET")
        .args([
            "ci",
            "--event",
            &event.to_string_lossy(),
            "--workflow",
            &workflow.to_string_lossy(),
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "secret 'EVALBOX_TEST_SECRET' is not set",
        ));
}

#[test]
fn test_ci_missing_event_file_is_an_error() {
    evalbox()
        .args(["ci", "--event", "/nonexistent/event.json"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("event file"));
}

#[test]
fn test_ci_invalid_workflow_is_an_error() {
    let dir = TempDir::new().expect("tempdir");
    let event = write_event(
        dir.path(),
        r#"{"action":"opened","branch":"feature/x","base":"main"}"#,
    );
    let workflow = dir.path().join("pipeline.yaml");
    std::fs::write(&workflow, "name: broken\n").expect("write workflow");

    evalbox()
        .args([
            "ci",
            "--event",
            &event.to_string_lossy(),
            "--workflow",
            &workflow.to_string_lossy(),
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("workflow file"));
}

#[test]
fn test_shipped_pipeline_file_matches_builtin_definition() {
    let path = Path::new(concat!(env!("CARGO_MANIFEST_DIR"), "/ci.yaml"));
    let shipped = Workflow::from_yaml_file(path).expect("ci.yaml parses");
    assert_eq!(shipped, Workflow::default_ci());
}
