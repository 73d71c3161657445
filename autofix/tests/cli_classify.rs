//! CLI tests for `autofix classify` and `autofix config`.
//!
//! Spawns the autofix binary and verifies exit codes match the verdict or
//! configuration state.

use std::fs;
use std::io::Write;
use std::process::{Command, Stdio};

use autofix::exit_codes;

fn autofix() -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_autofix"));
    cmd.env_remove("RUST_LOG");
    cmd
}

fn classify_file(contents: &str) -> (Option<i32>, String) {
    let temp = tempfile::tempdir().expect("tempdir");
    let path = temp.path().join("build.log");
    fs::write(&path, contents).expect("write log");
    let output = autofix()
        .arg("classify")
        .arg(&path)
        .output()
        .expect("autofix classify");
    (
        output.status.code(),
        String::from_utf8_lossy(&output.stdout).trim().to_string(),
    )
}

#[test]
fn classify_failure_exits_with_failure_code() {
    let (code, stdout) = classify_file("Running \"npm run build\"\nError: Build failed\n");
    assert_eq!(code, Some(exit_codes::FAILURE));
    assert_eq!(stdout, "failure");
}

#[test]
fn classify_success_exits_ok() {
    let (code, stdout) = classify_file("Build Completed in /vercel/output [32s]\n");
    assert_eq!(code, Some(exit_codes::OK));
    assert_eq!(stdout, "success");
}

#[test]
fn classify_unmarked_log_is_ambiguous() {
    let (code, stdout) = classify_file("Cloning github.com/acme/web\nInstalling dependencies...\n");
    assert_eq!(code, Some(exit_codes::AMBIGUOUS));
    assert_eq!(stdout, "ambiguous");
}

#[test]
fn classify_reads_stdin_without_file() {
    let mut child = autofix()
        .arg("classify")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .spawn()
        .expect("spawn autofix");
    child
        .stdin
        .take()
        .expect("stdin")
        .write_all(b"Deployment completed\n")
        .expect("write stdin");
    let output = child.wait_with_output().expect("wait");
    assert_eq!(output.status.code(), Some(exit_codes::OK));
}

#[test]
fn invalid_config_exits_with_invalid_code() {
    let temp = tempfile::tempdir().expect("tempdir");
    fs::write(temp.path().join("autofix.toml"), "max_iterations = 0\n").expect("write config");
    let output = autofix()
        .current_dir(temp.path())
        .env_remove("MAX_ITERATIONS")
        .arg("config")
        .output()
        .expect("autofix config");
    assert_eq!(output.status.code(), Some(exit_codes::INVALID));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("max_iterations"), "stderr: {stderr}");
}

#[test]
fn config_prints_redacted_toml() {
    let temp = tempfile::tempdir().expect("tempdir");
    let output = autofix()
        .current_dir(temp.path())
        .env("REPO_PATH", temp.path())
        .env("VERCEL_TOKEN", "secret-token")
        .env("MAX_ITERATIONS", "4")
        .arg("config")
        .output()
        .expect("autofix config");
    assert_eq!(output.status.code(), Some(exit_codes::OK));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("max_iterations = 4"), "stdout: {stdout}");
    assert!(!stdout.contains("secret-token"));
    assert!(stdout.contains("\"***\""));
}
