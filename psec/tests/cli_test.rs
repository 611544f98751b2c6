//! CLI tests for the psec binary

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

const JOBS: &str = r#"
jobs:
  - key: a1
    group: alpha
    command: "true"
  - key: a2
    group: alpha
    command: "true"
  - key: b1
    group: beta
    command: "true"
"#;

fn write_jobs(dir: &TempDir, content: &str) -> std::path::PathBuf {
    let path = dir.path().join("jobs.yml");
    fs::write(&path, content).expect("Failed to write job file");
    path
}

fn psec(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("psec").expect("binary should build");
    // Keep user/project config files out of the picture
    cmd.current_dir(dir.path()).env("XDG_CONFIG_HOME", dir.path());
    cmd
}

#[test]
fn test_plan_fair_interleaves_groups() {
    let dir = TempDir::new().unwrap();
    let jobs = write_jobs(&dir, JOBS);

    psec(&dir)
        .args(["plan", "--fair", "--format", "json"])
        .arg(&jobs)
        .assert()
        .success()
        .stdout(predicate::str::is_match(r#"(?s)"a1".*"b1".*"a2""#).unwrap());
}

#[test]
fn test_plan_no_fair_keeps_file_order() {
    let dir = TempDir::new().unwrap();
    let jobs = write_jobs(&dir, JOBS);

    psec(&dir)
        .args(["plan", "--no-fair", "--format", "json"])
        .arg(&jobs)
        .assert()
        .success()
        .stdout(predicate::str::is_match(r#"(?s)"a1".*"a2".*"b1""#).unwrap());
}

#[cfg(unix)]
#[test]
fn test_run_succeeds() {
    let dir = TempDir::new().unwrap();
    let jobs = write_jobs(&dir, JOBS);

    psec(&dir)
        .args(["run", "-j", "2"])
        .arg(&jobs)
        .assert()
        .success()
        .stdout(predicate::str::contains("3 of 3 job(s) succeeded"));
}

#[cfg(unix)]
#[test]
fn test_run_fails_when_a_job_fails() {
    let dir = TempDir::new().unwrap();
    let jobs = write_jobs(
        &dir,
        r#"
jobs:
  - key: ok
    command: "true"
  - key: broken
    command: "exit 7"
"#,
    );

    psec(&dir)
        .arg("run")
        .arg(&jobs)
        .assert()
        .failure()
        .stdout(predicate::str::contains("broken"))
        .stderr(predicate::str::contains("1 job(s) failed"));
}

#[test]
fn test_missing_job_file_is_an_error() {
    let dir = TempDir::new().unwrap();

    psec(&dir)
        .args(["plan", "does-not-exist.yml"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to read job file"));
}
